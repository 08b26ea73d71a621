//! Remote contract consumed by the session store
//!
//! This module defines the `SessionApi` trait that every backend of the
//! session store implements, together with the transport-level error type.

use crate::api::types::{ChatMessage, Session};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while talking to the SQLBot service.
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP request error (connect, timeout, reading the body).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status returned by the service.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The response body is not the expected JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The configured base URL cannot be used to build request URLs.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Request/response operations the session store relies on
///
/// Implementations own transport concerns (encoding, routing, timeouts).
/// The store only looks at whether a call succeeded.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use sqlbot::api::{ApiError, ChatMessage, Session, SessionApi};
///
/// struct Offline;
///
/// #[async_trait]
/// impl SessionApi for Offline {
///     async fn list_sessions(&self) -> Result<Vec<Session>, ApiError> {
///         Ok(Vec::new())
///     }
///     async fn create_session(
///         &self,
///         _data_source_id: i64,
///         _title: Option<&str>,
///     ) -> Result<Session, ApiError> {
///         Err(ApiError::NotFound("offline".to_string()))
///     }
///     async fn get_messages(&self, _session_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
///         Ok(Vec::new())
///     }
///     async fn send_message(
///         &self,
///         session_id: &str,
///         _content: &str,
///     ) -> Result<ChatMessage, ApiError> {
///         Err(ApiError::NotFound(session_id.to_string()))
///     }
///     async fn delete_session(&self, _session_id: &str) -> Result<(), ApiError> {
///         Ok(())
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let store = sqlbot::SessionStore::new(Offline);
/// assert!(store.refresh_sessions().await);
/// assert!(store.create_session(1, None).await.is_err());
/// assert!(store.active_session_id().is_none());
/// # });
/// ```
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Lists all known sessions, most recent first
    async fn list_sessions(&self) -> Result<Vec<Session>, ApiError>;

    /// Creates a session bound to `data_source_id`
    ///
    /// The server chooses a default title when `title` is `None`.
    async fn create_session(
        &self,
        data_source_id: i64,
        title: Option<&str>,
    ) -> Result<Session, ApiError>;

    /// Fetches the ordered message log of a session
    async fn get_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, ApiError>;

    /// Submits a question and returns the assistant's reply
    async fn send_message(&self, session_id: &str, content: &str)
        -> Result<ChatMessage, ApiError>;

    /// Deletes a session and its messages
    async fn delete_session(&self, session_id: &str) -> Result<(), ApiError>;
}

#[async_trait]
impl<T: SessionApi + ?Sized> SessionApi for std::sync::Arc<T> {
    async fn list_sessions(&self) -> Result<Vec<Session>, ApiError> {
        (**self).list_sessions().await
    }

    async fn create_session(
        &self,
        data_source_id: i64,
        title: Option<&str>,
    ) -> Result<Session, ApiError> {
        (**self).create_session(data_source_id, title).await
    }

    async fn get_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        (**self).get_messages(session_id).await
    }

    async fn send_message(
        &self,
        session_id: &str,
        content: &str,
    ) -> Result<ChatMessage, ApiError> {
        (**self).send_message(session_id, content).await
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ApiError> {
        (**self).delete_session(session_id).await
    }
}
