use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension, params};

use crate::Database;
use crate::models::{InquiryRow, MessageRow, NotificationRow, UserChatRow, UserRow};

impl Database {
    // -- Users --

    /// Full insert, used by registration and the admin seed. Fails on a
    /// duplicate id or email.
    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        display_name: &str,
        profile_image_url: Option<&str>,
        password_hash: &str,
        role: &str,
    ) -> Result<UserRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, display_name, profile_image_url, password, role)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, email, display_name, profile_image_url, password_hash, role],
            )?;
            query_user_by_id(conn, id)?.ok_or_else(|| anyhow!("user {} vanished after insert", id))
        })
    }

    /// Insert-or-refresh keyed on id. On conflict only the profile fields
    /// change; id, password, role and created_at are left alone.
    pub fn upsert_user(
        &self,
        id: &str,
        email: &str,
        display_name: &str,
        profile_image_url: Option<&str>,
        password_hash: &str,
        role: &str,
    ) -> Result<UserRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, display_name, profile_image_url, password, role)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                     email = excluded.email,
                     display_name = excluded.display_name,
                     profile_image_url = excluded.profile_image_url",
                params![id, email, display_name, profile_image_url, password_hash, role],
            )?;
            query_user_by_id(conn, id)?.ok_or_else(|| anyhow!("user {} vanished after upsert", id))
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{USER_COLUMNS} WHERE email = ?1"))?;
            let row = stmt.query_row([email], map_user).optional()?;
            Ok(row)
        })
    }

    /// Every user with at least one message, most recently active first.
    /// A single aggregate query; the per-message id tiebreak keeps the order
    /// exact when two threads were last active in the same millisecond.
    pub fn users_with_chats(&self) -> Result<Vec<UserChatRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.email, u.display_name, u.profile_image_url, u.password, u.role,
                        u.created_at, MAX(m.created_at) AS last_message_at
                 FROM users u
                 JOIN messages m ON m.user_id = u.id
                 GROUP BY u.id
                 ORDER BY last_message_at DESC, MAX(m.id) DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(UserChatRow {
                        user: UserRow {
                            id: row.get(0)?,
                            email: row.get(1)?,
                            display_name: row.get(2)?,
                            profile_image_url: row.get(3)?,
                            password: row.get(4)?,
                            role: row.get(5)?,
                            created_at: row.get(6)?,
                        },
                        last_message_at: row.get(7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    /// One thread, oldest first. Insertion order: created_at with the row id
    /// as tiebreak.
    pub fn get_messages(&self, user_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{MESSAGE_COLUMNS} WHERE user_id = ?1 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt
                .query_map([user_id], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Non-empty content is the caller's contract; this layer stores what it
    /// is given.
    pub fn create_message(
        &self,
        user_id: &str,
        content: &str,
        is_from_admin: bool,
    ) -> Result<MessageRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (user_id, content, is_from_admin) VALUES (?1, ?2, ?3)",
                params![user_id, content, is_from_admin],
            )?;
            let id = conn.last_insert_rowid();
            query_message_by_id(conn, id)?
                .ok_or_else(|| anyhow!("message {} vanished after insert", id))
        })
    }

    /// Admin reply: the message and its notification are inserted in one
    /// transaction, so a crash can never leave a reply without its alert.
    pub fn create_admin_message(
        &self,
        user_id: &str,
        content: &str,
        notification_title: &str,
        notification_body: &str,
    ) -> Result<MessageRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (user_id, content, is_from_admin) VALUES (?1, ?2, 1)",
                params![user_id, content],
            )?;
            let id = tx.last_insert_rowid();
            insert_notification(&tx, user_id, notification_title, notification_body)?;
            let message = query_message_by_id(&tx, id)?
                .ok_or_else(|| anyhow!("message {} vanished after insert", id))?;
            tx.commit()?;
            Ok(message)
        })
    }

    // -- Inquiries --

    pub fn create_inquiry(&self, user_id: &str, subject: &str, message: &str) -> Result<InquiryRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO inquiries (user_id, subject, message) VALUES (?1, ?2, ?3)",
                params![user_id, subject, message],
            )?;
            let id = conn.last_insert_rowid();
            query_inquiry_by_id(conn, id)?
                .ok_or_else(|| anyhow!("inquiry {} vanished after insert", id))
        })
    }

    /// One user's inquiries, or all of them for the admin view. Most recent
    /// first either way.
    pub fn get_inquiries(&self, user_id: Option<&str>) -> Result<Vec<InquiryRow>> {
        self.with_conn(|conn| {
            let rows = match user_id {
                Some(user_id) => {
                    let mut stmt = conn.prepare(&format!(
                        "{INQUIRY_COLUMNS} WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
                    ))?;
                    let rows = stmt
                        .query_map([user_id], map_inquiry)?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                }
                None => {
                    let mut stmt = conn
                        .prepare(&format!("{INQUIRY_COLUMNS} ORDER BY created_at DESC, id DESC"))?;
                    let rows = stmt
                        .query_map([], map_inquiry)?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                }
            };
            Ok(rows)
        })
    }

    pub fn get_inquiry(&self, id: i64) -> Result<Option<InquiryRow>> {
        self.with_conn(|conn| query_inquiry_by_id(conn, id))
    }

    /// Sets reply and status together and inserts the owner's notification in
    /// the same transaction. The caller builds the notification text from the
    /// loaded inquiry. Returns None (with nothing written) when the id does
    /// not exist. Replying again overwrites the reply; status stays replied.
    pub fn reply_to_inquiry<F>(
        &self,
        id: i64,
        reply: &str,
        make_notification: F,
    ) -> Result<Option<InquiryRow>>
    where
        F: FnOnce(&InquiryRow) -> (String, String),
    {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(inquiry) = query_inquiry_by_id(&tx, id)? else {
                return Ok(None);
            };
            tx.execute(
                "UPDATE inquiries SET reply = ?1, status = 'replied' WHERE id = ?2",
                params![reply, id],
            )?;
            let (title, body) = make_notification(&inquiry);
            insert_notification(&tx, &inquiry.user_id, &title, &body)?;
            let updated = query_inquiry_by_id(&tx, id)?
                .ok_or_else(|| anyhow!("inquiry {} vanished mid-update", id))?;
            tx.commit()?;
            Ok(Some(updated))
        })
    }

    // -- Notifications --

    pub fn create_notification(
        &self,
        user_id: &str,
        title: &str,
        message: &str,
    ) -> Result<NotificationRow> {
        self.with_conn_mut(|conn| {
            let id = insert_notification(conn, user_id, title, message)?;
            query_notification_by_id(conn, id)?
                .ok_or_else(|| anyhow!("notification {} vanished after insert", id))
        })
    }

    pub fn get_notifications(&self, user_id: &str) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{NOTIFICATION_COLUMNS} WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
            ))?;
            let rows = stmt
                .query_map([user_id], map_notification)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns whether the id matched. Marking an already-read notification is
    /// a no-op that still reports a match.
    pub fn mark_notification_read(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("UPDATE notifications SET read = 1 WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }
}

const USER_COLUMNS: &str =
    "SELECT id, email, display_name, profile_image_url, password, role, created_at FROM users";
const MESSAGE_COLUMNS: &str =
    "SELECT id, user_id, content, is_from_admin, read, created_at FROM messages";
const INQUIRY_COLUMNS: &str =
    "SELECT id, user_id, subject, message, reply, status, created_at FROM inquiries";
const NOTIFICATION_COLUMNS: &str =
    "SELECT id, user_id, title, message, read, created_at FROM notifications";

fn map_user(row: &rusqlite::Row) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        display_name: row.get(2)?,
        profile_image_url: row.get(3)?,
        password: row.get(4)?,
        role: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_message(row: &rusqlite::Row) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        content: row.get(2)?,
        is_from_admin: row.get(3)?,
        read: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn map_inquiry(row: &rusqlite::Row) -> rusqlite::Result<InquiryRow> {
    Ok(InquiryRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        subject: row.get(2)?,
        message: row.get(3)?,
        reply: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_notification(row: &rusqlite::Row) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        message: row.get(3)?,
        read: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!("{USER_COLUMNS} WHERE id = ?1"))?;
    let row = stmt.query_row([id], map_user).optional()?;
    Ok(row)
}

fn query_message_by_id(conn: &Connection, id: i64) -> Result<Option<MessageRow>> {
    let mut stmt = conn.prepare(&format!("{MESSAGE_COLUMNS} WHERE id = ?1"))?;
    let row = stmt.query_row([id], map_message).optional()?;
    Ok(row)
}

fn query_inquiry_by_id(conn: &Connection, id: i64) -> Result<Option<InquiryRow>> {
    let mut stmt = conn.prepare(&format!("{INQUIRY_COLUMNS} WHERE id = ?1"))?;
    let row = stmt.query_row([id], map_inquiry).optional()?;
    Ok(row)
}

fn query_notification_by_id(conn: &Connection, id: i64) -> Result<Option<NotificationRow>> {
    let mut stmt = conn.prepare(&format!("{NOTIFICATION_COLUMNS} WHERE id = ?1"))?;
    let row = stmt.query_row([id], map_notification).optional()?;
    Ok(row)
}

fn insert_notification(conn: &Connection, user_id: &str, title: &str, message: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO notifications (user_id, title, message) VALUES (?1, ?2, ?3)",
        params![user_id, title, message],
    )?;
    Ok(conn.last_insert_rowid())
}
