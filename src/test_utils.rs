//! Test utilities for SQLBot
//!
//! This module provides a scripted in-memory [`SessionApi`], fixture
//! builders for sessions and messages, and assertion helpers.

use crate::api::{ApiError, ChatMessage, Role, Session, SessionApi};
use crate::error::SqlbotError;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Builds a session with a fixed creation time
pub fn sample_session(id: &str) -> Session {
    Session {
        id: id.to_string(),
        title: format!("Session {}", id),
        data_source_id: 1,
        created_at: NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .expect("valid fixture timestamp"),
    }
}

/// Builds a persisted assistant reply
pub fn assistant_reply(session_id: &str, content: &str) -> ChatMessage {
    let mut msg = ChatMessage::user(session_id, content);
    msg.role = Role::Assistant;
    msg.id = Some(1);
    msg.sql_query = Some("SELECT 1".to_string());
    msg
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: Result<T, SqlbotError>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}', got Ok", expected),
        Err(e) => {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains(expected),
                "Expected error containing '{}', got '{}'",
                expected,
                error_msg
            );
        }
    }
}

/// `SessionApi` that replays queued responses, one queue per operation
///
/// An operation with an empty queue fails with `ApiError::NotFound`.
/// Every call is recorded for later inspection.
#[derive(Default)]
pub struct ScriptedApi {
    list: Mutex<VecDeque<Result<Vec<Session>, ApiError>>>,
    create: Mutex<VecDeque<Result<Session, ApiError>>>,
    messages: Mutex<VecDeque<Result<Vec<ChatMessage>, ApiError>>>,
    send: Mutex<VecDeque<Result<ChatMessage, ApiError>>>,
    delete: Mutex<VecDeque<Result<(), ApiError>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedApi {
    /// Creates an API with no scripted responses
    pub fn new() -> Self {
        Self::default()
    }

    /// A 500 response with body `internal error`
    pub fn server_error() -> ApiError {
        ApiError::Api {
            status: 500,
            message: "internal error".to_string(),
        }
    }

    /// Queues a response for `list_sessions`
    pub fn push_list(&self, response: Result<Vec<Session>, ApiError>) {
        self.list.lock().unwrap().push_back(response);
    }

    /// Queues a response for `create_session`
    pub fn push_create(&self, response: Result<Session, ApiError>) {
        self.create.lock().unwrap().push_back(response);
    }

    /// Queues a response for `get_messages`
    pub fn push_messages(&self, response: Result<Vec<ChatMessage>, ApiError>) {
        self.messages.lock().unwrap().push_back(response);
    }

    /// Queues a response for `send_message`
    pub fn push_send(&self, response: Result<ChatMessage, ApiError>) {
        self.send.lock().unwrap().push_back(response);
    }

    /// Queues a response for `delete_session`
    pub fn push_delete(&self, response: Result<(), ApiError>) {
        self.delete.lock().unwrap().push_back(response);
    }

    /// Calls received so far, formatted as `operation(args)`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn next<T>(&self, queue: &Mutex<VecDeque<Result<T, ApiError>>>, call: String) -> Result<T, ApiError> {
        self.calls.lock().unwrap().push(call.clone());
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::NotFound(format!("no scripted response for {}", call))))
    }
}

#[async_trait]
impl SessionApi for ScriptedApi {
    async fn list_sessions(&self) -> Result<Vec<Session>, ApiError> {
        self.next(&self.list, "list_sessions()".to_string())
    }

    async fn create_session(
        &self,
        data_source_id: i64,
        title: Option<&str>,
    ) -> Result<Session, ApiError> {
        self.next(
            &self.create,
            format!("create_session({}, {:?})", data_source_id, title),
        )
    }

    async fn get_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        self.next(&self.messages, format!("get_messages({})", session_id))
    }

    async fn send_message(
        &self,
        session_id: &str,
        content: &str,
    ) -> Result<ChatMessage, ApiError> {
        self.next(&self.send, format!("send_message({}, {})", session_id, content))
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ApiError> {
        self.next(&self.delete, format!("delete_session({})", session_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_api_replays_in_order() {
        let api = ScriptedApi::new();
        api.push_list(Ok(vec![sample_session("a")]));
        api.push_list(Err(ScriptedApi::server_error()));

        assert_eq!(api.list_sessions().await.unwrap().len(), 1);
        assert!(api.list_sessions().await.is_err());
        assert!(matches!(
            api.list_sessions().await,
            Err(ApiError::NotFound(_))
        ));
        assert_eq!(api.calls().len(), 3);
    }

    #[test]
    fn test_assert_error_contains_success() {
        let result: Result<(), SqlbotError> = Err(SqlbotError::Remote("timed out".to_string()));
        assert_error_contains(result, "timed out");
    }

    #[test]
    #[should_panic(expected = "Expected error containing")]
    fn test_assert_error_contains_panics_on_ok() {
        let result: Result<(), SqlbotError> = Ok(());
        assert_error_contains(result, "anything");
    }
}
