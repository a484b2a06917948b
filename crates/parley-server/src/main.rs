use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use parley_api::auth::{AppState, AppStateInner, hash_password};
use parley_api::middleware::jwt_secret;
use parley_api::routes::api_router;
use parley_db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret = jwt_secret();
    let db_path = std::env::var("PARLEY_DB_PATH").unwrap_or_else(|_| "parley.db".into());
    let host = std::env::var("PARLEY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("PARLEY_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = Database::open(&PathBuf::from(&db_path))?;
    seed_admin(&db)?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner { db, jwt_secret });

    let app = api_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Parley server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Make sure the operator account exists. On an existing account this
/// refreshes the profile fields from the environment and leaves the stored
/// credentials alone; the password is only read when the account is first
/// created.
fn seed_admin(db: &Database) -> anyhow::Result<()> {
    let email =
        std::env::var("PARLEY_ADMIN_EMAIL").unwrap_or_else(|_| "admin@parley.local".into());
    let display_name = std::env::var("PARLEY_ADMIN_NAME").unwrap_or_else(|_| "Support".into());

    match db.get_user_by_email(&email)? {
        Some(existing) => {
            db.upsert_user(
                &existing.id,
                &email,
                &display_name,
                existing.profile_image_url.as_deref(),
                &existing.password,
                &existing.role,
            )?;
        }
        None => {
            let password = std::env::var("PARLEY_ADMIN_PASSWORD")
                .unwrap_or_else(|_| "change-me-please".into());
            let id = Uuid::new_v4().to_string();
            db.create_user(&id, &email, &display_name, None, &hash_password(&password)?, "admin")?;
            info!("Seeded admin account {} ({})", email, id);
        }
    }

    Ok(())
}
