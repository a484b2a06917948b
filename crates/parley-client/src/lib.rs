pub mod api;
pub mod poller;

pub use api::{ApiClient, ClientError};
pub use poller::{Phase, Poller, ViewSnapshot};
