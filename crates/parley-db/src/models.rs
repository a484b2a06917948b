//! Database row types — these map directly to SQLite rows.
//! Distinct from the parley-types API models so the storage layout can move
//! without touching the wire contract; `into_model` is the one crossing point.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use parley_types::models::{
    Inquiry, InquiryStatus, Message, Notification, Role, User, UserWithLastMessage,
};

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub profile_image_url: Option<String>,
    pub password: String,
    pub role: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: i64,
    pub user_id: String,
    pub content: String,
    pub is_from_admin: bool,
    pub read: bool,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct InquiryRow {
    pub id: i64,
    pub user_id: String,
    pub subject: String,
    pub message: String,
    pub reply: Option<String>,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NotificationRow {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: String,
}

/// Result row of the users-with-chats aggregate.
#[derive(Debug, Clone)]
pub struct UserChatRow {
    pub user: UserRow,
    pub last_message_at: String,
}

/// SQLite hands timestamps back as text. Rows written by this crate parse as
/// RFC 3339; older rows may carry the bare "YYYY-MM-DD HH:MM:SS" form, which
/// is parsed as naive UTC. Corrupt values are logged and zeroed rather than
/// failing the whole listing.
pub(crate) fn parse_created_at(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

fn parse_role(raw: &str) -> Role {
    Role::parse(raw).unwrap_or_else(|| {
        warn!("Corrupt role '{}', treating as user", raw);
        Role::User
    })
}

impl UserRow {
    /// API model; the password hash never leaves the storage layer.
    pub fn into_model(self) -> User {
        User {
            role: parse_role(&self.role),
            created_at: parse_created_at(&self.created_at),
            id: self.id,
            display_name: self.display_name,
            email: self.email,
            profile_image_url: self.profile_image_url,
        }
    }
}

impl MessageRow {
    pub fn into_model(self) -> Message {
        Message {
            created_at: parse_created_at(&self.created_at),
            id: self.id,
            user_id: self.user_id,
            content: self.content,
            is_from_admin: self.is_from_admin,
            read: self.read,
        }
    }
}

impl InquiryRow {
    pub fn into_model(self) -> Inquiry {
        let status = InquiryStatus::parse(&self.status).unwrap_or_else(|| {
            warn!("Corrupt inquiry status '{}' on {}, treating as pending", self.status, self.id);
            InquiryStatus::Pending
        });
        Inquiry {
            status,
            created_at: parse_created_at(&self.created_at),
            id: self.id,
            user_id: self.user_id,
            subject: self.subject,
            message: self.message,
            reply: self.reply,
        }
    }
}

impl NotificationRow {
    pub fn into_model(self) -> Notification {
        Notification {
            created_at: parse_created_at(&self.created_at),
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            message: self.message,
            read: self.read,
        }
    }
}

impl UserChatRow {
    pub fn into_model(self) -> UserWithLastMessage {
        UserWithLastMessage {
            last_message_at: parse_created_at(&self.last_message_at),
            role: parse_role(&self.user.role),
            created_at: parse_created_at(&self.user.created_at),
            id: self.user.id,
            display_name: self.user.display_name,
            email: self.user.email,
            profile_image_url: self.user.profile_image_url,
        }
    }
}
