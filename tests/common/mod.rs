use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;
use tokio::sync::oneshot;

use sqlbot::api::{ApiError, ChatMessage, Role, Session, SessionApi};

type Gate<T> = oneshot::Receiver<Result<T, ApiError>>;

#[allow(dead_code)]
pub fn session(id: &str) -> Session {
    Session {
        id: id.to_string(),
        title: format!("Session {}", id),
        data_source_id: 1,
        created_at: NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .expect("valid fixture timestamp"),
    }
}

#[allow(dead_code)]
pub fn user_message(session_id: &str, content: &str) -> ChatMessage {
    let mut msg = ChatMessage::user(session_id, content);
    msg.id = Some(1);
    msg
}

#[allow(dead_code)]
pub fn assistant_message(session_id: &str, content: &str) -> ChatMessage {
    let mut msg = ChatMessage::user(session_id, content);
    msg.id = Some(2);
    msg.role = Role::Assistant;
    msg.sql_query = Some("SELECT 1".to_string());
    msg
}

#[allow(dead_code)]
pub fn server_error() -> ApiError {
    ApiError::Api {
        status: 500,
        message: "internal error".to_string(),
    }
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// `SessionApi` whose message fetches and sends wait until the test opens their gate
///
/// Gates are registered per session id before the call is made; each call
/// consumes the oldest gate for its session. Creates, lists and deletes
/// answer immediately from their queues. A dropped gate fails the call.
#[allow(dead_code)]
#[derive(Default)]
pub struct GatedApi {
    fetch_gates: Mutex<HashMap<String, VecDeque<Gate<Vec<ChatMessage>>>>>,
    send_gates: Mutex<HashMap<String, VecDeque<Gate<ChatMessage>>>>,
    creates: Mutex<VecDeque<Result<Session, ApiError>>>,
    lists: Mutex<VecDeque<Result<Vec<Session>, ApiError>>>,
    deletes: Mutex<VecDeque<Result<(), ApiError>>>,
    calls: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl GatedApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a gate for the next `get_messages(session_id)`
    pub fn gate_fetch(&self, session_id: &str) -> oneshot::Sender<Result<Vec<ChatMessage>, ApiError>> {
        let (tx, rx) = oneshot::channel();
        self.fetch_gates
            .lock()
            .unwrap()
            .entry(session_id.to_string())
            .or_default()
            .push_back(rx);
        tx
    }

    /// Registers a gate for the next `send_message(session_id, _)`
    pub fn gate_send(&self, session_id: &str) -> oneshot::Sender<Result<ChatMessage, ApiError>> {
        let (tx, rx) = oneshot::channel();
        self.send_gates
            .lock()
            .unwrap()
            .entry(session_id.to_string())
            .or_default()
            .push_back(rx);
        tx
    }

    pub fn push_create(&self, response: Result<Session, ApiError>) {
        self.creates.lock().unwrap().push_back(response);
    }

    pub fn push_list(&self, response: Result<Vec<Session>, ApiError>) {
        self.lists.lock().unwrap().push_back(response);
    }

    pub fn push_delete(&self, response: Result<(), ApiError>) {
        self.deletes.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn take_gate<T>(
        gates: &Mutex<HashMap<String, VecDeque<Gate<T>>>>,
        session_id: &str,
    ) -> Option<Gate<T>> {
        gates
            .lock()
            .unwrap()
            .get_mut(session_id)
            .and_then(VecDeque::pop_front)
    }

    async fn wait<T>(gate: Option<Gate<T>>, what: String) -> Result<T, ApiError> {
        match gate {
            Some(rx) => rx.await.unwrap_or_else(|_| {
                Err(ApiError::Api {
                    status: 503,
                    message: format!("gate closed for {}", what),
                })
            }),
            None => Err(ApiError::NotFound(format!("no gate for {}", what))),
        }
    }

    fn pop<T>(queue: &Mutex<VecDeque<Result<T, ApiError>>>, what: &str) -> Result<T, ApiError> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::NotFound(format!("no response for {}", what))))
    }
}

#[async_trait]
impl SessionApi for GatedApi {
    async fn list_sessions(&self) -> Result<Vec<Session>, ApiError> {
        self.record("list_sessions()".to_string());
        Self::pop(&self.lists, "list_sessions")
    }

    async fn create_session(
        &self,
        data_source_id: i64,
        title: Option<&str>,
    ) -> Result<Session, ApiError> {
        self.record(format!("create_session({}, {:?})", data_source_id, title));
        Self::pop(&self.creates, "create_session")
    }

    async fn get_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        self.record(format!("get_messages({})", session_id));
        let gate = Self::take_gate(&self.fetch_gates, session_id);
        Self::wait(gate, format!("get_messages({})", session_id)).await
    }

    async fn send_message(
        &self,
        session_id: &str,
        content: &str,
    ) -> Result<ChatMessage, ApiError> {
        self.record(format!("send_message({}, {})", session_id, content));
        let gate = Self::take_gate(&self.send_gates, session_id);
        Self::wait(gate, format!("send_message({})", session_id)).await
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ApiError> {
        self.record(format!("delete_session({})", session_id));
        Self::pop(&self.deletes, "delete_session")
    }
}
