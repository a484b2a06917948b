//! Typed client for the `/api` surface. One method per endpoint; error bodies
//! come back as [`ClientError::Api`] with the server's message.

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use parley_types::api::{
    AuthResponse, CreateInquiryRequest, LoginRequest, RegisterRequest, ReplyInquiryRequest,
    SendMessageRequest,
};
use parley_types::models::{Inquiry, Message, Notification, User, UserWithLastMessage};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{status}: {message}")]
    Api { status: StatusCode, message: String },
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            http: reqwest::Client::new(),
        }
    }

    /// Bearer token attached to every subsequent request.
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    // -- Auth --

    pub async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        self.json(Method::POST, "/api/auth/register", Some(req)).await
    }

    pub async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, ClientError> {
        self.json(Method::POST, "/api/auth/login", Some(req)).await
    }

    pub async fn current_user(&self) -> Result<User, ClientError> {
        self.json(Method::GET, "/api/auth/user", None::<&()>).await
    }

    // -- Messages --

    pub async fn messages(&self) -> Result<Vec<Message>, ClientError> {
        self.json(Method::GET, "/api/messages", None::<&()>).await
    }

    pub async fn send_message(&self, content: &str) -> Result<Message, ClientError> {
        let req = SendMessageRequest {
            content: content.to_string(),
        };
        self.json(Method::POST, "/api/messages", Some(&req)).await
    }

    // -- Inquiries --

    pub async fn inquiries(&self) -> Result<Vec<Inquiry>, ClientError> {
        self.json(Method::GET, "/api/inquiries", None::<&()>).await
    }

    pub async fn create_inquiry(&self, subject: &str, message: &str) -> Result<Inquiry, ClientError> {
        let req = CreateInquiryRequest {
            subject: subject.to_string(),
            message: message.to_string(),
        };
        self.json(Method::POST, "/api/inquiries", Some(&req)).await
    }

    // -- Notifications --

    pub async fn notifications(&self) -> Result<Vec<Notification>, ClientError> {
        self.json(Method::GET, "/api/notifications", None::<&()>).await
    }

    pub async fn mark_notification_read(&self, id: i64) -> Result<(), ClientError> {
        self.send(Method::PATCH, &format!("/api/notifications/{id}/read"), None::<&()>)
            .await?;
        Ok(())
    }

    // -- Admin console --

    pub async fn admin_users(&self) -> Result<Vec<UserWithLastMessage>, ClientError> {
        self.json(Method::GET, "/api/admin/users", None::<&()>).await
    }

    pub async fn admin_user_messages(&self, user_id: &str) -> Result<Vec<Message>, ClientError> {
        self.json(Method::GET, &format!("/api/admin/users/{user_id}/messages"), None::<&()>)
            .await
    }

    pub async fn admin_reply(&self, user_id: &str, content: &str) -> Result<Message, ClientError> {
        let req = SendMessageRequest {
            content: content.to_string(),
        };
        self.json(
            Method::POST,
            &format!("/api/admin/users/{user_id}/messages"),
            Some(&req),
        )
        .await
    }

    pub async fn admin_inquiries(&self) -> Result<Vec<Inquiry>, ClientError> {
        self.json(Method::GET, "/api/admin/inquiries", None::<&()>).await
    }

    pub async fn admin_reply_inquiry(&self, id: i64, reply: &str) -> Result<Inquiry, ClientError> {
        let req = ReplyInquiryRequest {
            reply: reply.to_string(),
        };
        self.json(Method::POST, &format!("/api/admin/inquiries/{id}/reply"), Some(&req))
            .await
    }

    // -- Plumbing --

    async fn json<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ClientError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self.send(method, path, body).await?;
        Ok(resp.json().await?)
    }

    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, ClientError>
    where
        B: serde::Serialize + ?Sized,
    {
        let mut req = self.http.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let message = resp
            .json::<ErrorBody>()
            .await
            .map(|b| b.message)
            .unwrap_or_else(|_| status.to_string());
        Err(ClientError::Api { status, message })
    }
}
