//! HTTP client for the SQLBot service.
//!
//! This module provides [`HttpSessionApi`], the reqwest-backed
//! implementation of [`SessionApi`], plus the data source calls used by
//! the command-line front end.
//!
//! # Example
//!
//! ```rust,no_run
//! use sqlbot::api::{HttpSessionApi, SessionApi};
//! use sqlbot::config::ApiConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api = HttpSessionApi::new(&ApiConfig::default())?;
//!     for session in api.list_sessions().await? {
//!         println!("{} {}", session.id, session.title);
//!     }
//!     Ok(())
//! }
//! ```

use crate::api::base::{ApiError, SessionApi};
use crate::api::types::{
    ChatMessage, CreateSessionRequest, DataSource, OperationStatus, SendMessageRequest, Session,
};
use crate::config::ApiConfig;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};
use url::Url;

/// SQLBot API client.
///
/// Routes every request below the configured base URL, for example
/// `http://localhost:8080/api` + `/chat/sessions`. Path segments such as
/// session ids are percent-encoded. Request timeouts come from
/// [`ApiConfig::timeout_seconds`].
#[derive(Debug, Clone)]
pub struct HttpSessionApi {
    client: Client,
    base_url: Url,
}

impl HttpSessionApi {
    /// Creates a new client.
    ///
    /// # Arguments
    ///
    /// * `config` - API configuration
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be created and
    /// `ApiError::InvalidUrl` if the base URL is empty or cannot carry a path.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let trimmed = config.base_url.trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ApiError::InvalidUrl("base URL is empty".to_string()));
        }
        let base_url =
            Url::parse(trimmed).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", trimmed, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(format!("{} cannot be a base URL", trimmed)));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Returns the base URL requests are routed under.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Appends `segments` to the base URL, encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Builds a JSON request for `segments` below the base URL.
    fn build_request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(segments)?;
        Ok(self
            .client
            .request(method, url)
            .header("Accept", "application/json"))
    }

    /// Maps a response to `T`, turning non-success statuses into errors.
    async fn read_json<T: DeserializeOwned>(
        response: Response,
        what: &str,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(response, what).await);
        }
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| {
            warn!(request = %what, error = %e, "Unexpected response body");
            ApiError::Serialization(e)
        })
    }

    async fn status_error(response: Response, what: &str) -> ApiError {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return ApiError::NotFound(what.to_string());
        }
        let body = response.text().await.unwrap_or_default();
        error!(
            status = status.as_u16(),
            body = %body,
            request = %what,
            "SQLBot API returned an error"
        );
        ApiError::Api {
            status: status.as_u16(),
            message: body,
        }
    }

    /// Lists the data sources sessions can be bound to.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` if the API returns an error.
    pub async fn list_data_sources(&self) -> Result<Vec<DataSource>, ApiError> {
        let response = self
            .build_request(Method::GET, &["datasource"])?
            .send()
            .await?;
        Self::read_json(response, "data sources").await
    }

    /// Fetches one data source.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if no data source has this id.
    pub async fn get_data_source(&self, id: i64) -> Result<DataSource, ApiError> {
        let id = id.to_string();
        let response = self
            .build_request(Method::GET, &["datasource", id.as_str()])?
            .send()
            .await?;
        Self::read_json(response, &format!("data source {}", id)).await
    }

    /// Asks the service to open a connection to a data source.
    ///
    /// A refused connection is reported through [`OperationStatus::success`],
    /// not as an error.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if no data source has this id.
    pub async fn test_data_source(&self, id: i64) -> Result<OperationStatus, ApiError> {
        let id = id.to_string();
        let response = self
            .build_request(Method::POST, &["datasource", id.as_str(), "test"])?
            .send()
            .await?;
        let status: OperationStatus =
            Self::read_json(response, &format!("data source {}", id)).await?;
        debug!(data_source_id = %id, success = status.success, "Tested data source connection");
        Ok(status)
    }

    /// Re-reads a data source's schema into the service's index.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` if the API returns an error.
    pub async fn sync_data_source_schema(&self, id: i64) -> Result<OperationStatus, ApiError> {
        let id = id.to_string();
        let response = self
            .build_request(Method::POST, &["datasource", id.as_str(), "sync-schema"])?
            .send()
            .await?;
        let status: OperationStatus =
            Self::read_json(response, &format!("data source {}", id)).await?;
        info!(data_source_id = %id, success = status.success, "Synced data source schema");
        Ok(status)
    }
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn list_sessions(&self) -> Result<Vec<Session>, ApiError> {
        let response = self
            .build_request(Method::GET, &["chat", "sessions"])?
            .send()
            .await?;
        let sessions: Vec<Session> = Self::read_json(response, "sessions").await?;
        debug!(count = sessions.len(), "Fetched sessions");
        Ok(sessions)
    }

    async fn create_session(
        &self,
        data_source_id: i64,
        title: Option<&str>,
    ) -> Result<Session, ApiError> {
        let request = CreateSessionRequest {
            data_source_id,
            title,
        };
        let response = self
            .build_request(Method::POST, &["chat", "sessions"])?
            .json(&request)
            .send()
            .await?;

        let session: Session = Self::read_json(response, "session").await?;
        info!(
            session_id = %session.id,
            data_source_id,
            "Created session"
        );
        Ok(session)
    }

    async fn get_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        let response = self
            .build_request(Method::GET, &["chat", "sessions", session_id, "messages"])?
            .send()
            .await?;
        Self::read_json(response, &format!("messages of session {}", session_id)).await
    }

    async fn send_message(
        &self,
        session_id: &str,
        content: &str,
    ) -> Result<ChatMessage, ApiError> {
        let response = self
            .build_request(Method::POST, &["chat", "sessions", session_id, "messages"])?
            .json(&SendMessageRequest { content })
            .send()
            .await?;
        Self::read_json(response, &format!("session {}", session_id)).await
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ApiError> {
        let response = self
            .build_request(Method::DELETE, &["chat", "sessions", session_id])?
            .send()
            .await?;

        if response.status().is_success() {
            info!(session_id = %session_id, "Deleted session");
            Ok(())
        } else {
            Err(Self::status_error(response, &format!("session {}", session_id)).await)
        }
    }
}
