use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-enforced account role. Admin routes require `Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// An inquiry moves from `Pending` to `Replied` exactly once, when the admin
/// sets the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InquiryStatus {
    Pending,
    Replied,
}

impl InquiryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InquiryStatus::Pending => "pending",
            InquiryStatus::Replied => "replied",
        }
    }

    pub fn parse(s: &str) -> Option<InquiryStatus> {
        match s {
            "pending" => Some(InquiryStatus::Pending),
            "replied" => Some(InquiryStatus::Replied),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Opaque id, stable for the lifetime of the account.
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub profile_image_url: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// A chat message between a user and the administrator. The thread a message
/// belongs to is identified by `user_id`; `is_from_admin` tells the two sides
/// apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    pub user_id: String,
    pub content: String,
    pub is_from_admin: bool,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// A structured support ticket, distinct from free-form chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
    pub id: i64,
    pub user_id: String,
    pub subject: String,
    pub message: String,
    pub reply: Option<String>,
    pub status: InquiryStatus,
    pub created_at: DateTime<Utc>,
}

/// Created only as a side effect of an admin reply; the `read` flag is the
/// single mutable field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Admin user-list entry: a user plus the timestamp of their most recent
/// message. Users with no messages never appear in this list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWithLastMessage {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub profile_image_url: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
}
