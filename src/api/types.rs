//! Wire types exchanged with the SQLBot service
//!
//! All payloads use camelCase keys. Timestamps are zone-less local
//! date-times, e.g. `2024-05-01T10:15:30.123456`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Content of the assistant message synthesized when sending fails
pub const SEND_FAILURE_CONTENT: &str = "Error: Failed to send message.";

/// A named conversation scoped to one data source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Opaque identifier assigned by the server
    pub id: String,
    /// Display title
    pub title: String,
    /// Data source the conversation queries
    pub data_source_id: i64,
    /// Creation timestamp
    pub created_at: NaiveDateTime,
}

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed by the user
    User,
    /// Produced by the assistant, or synthesized locally on failure
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One turn in a session
///
/// Assistant replies carry the server-computed fields: the generated SQL,
/// the serialized query result, an analysis, chart hints and follow-up
/// suggestions. Locally authored messages have no `id` and no `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Server-assigned id, absent for messages not persisted yet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Owning session
    pub session_id: String,
    /// Author
    pub role: Role,
    /// Text content
    pub content: String,
    /// Generated SQL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_query: Option<String>,
    /// Serialized [`QueryResult`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_result: Option<String>,
    /// Error diagnostic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    /// Natural-language analysis of the result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    /// Suggested chart type (bar, line, pie, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,
    /// Column used for the chart's x axis
    ///
    /// The server's bean serializer emits this as `xaxis`.
    #[serde(default, alias = "xaxis", skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<String>,
    /// Column used for the chart's y axis
    #[serde(default, alias = "yaxis", skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<String>,
    /// Serialized JSON array of follow-up questions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggest_questions: Option<String>,
    /// Creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
}

impl ChatMessage {
    /// Creates a local user message, not yet known to the server
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlbot::api::{ChatMessage, Role};
    ///
    /// let msg = ChatMessage::user("s-1", "top 5 products");
    /// assert_eq!(msg.role, Role::User);
    /// assert!(msg.id.is_none());
    /// ```
    pub fn user(session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::local(session_id.into(), Role::User, content.into())
    }

    /// Creates the assistant message that stands in for a failed send
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlbot::api::{ChatMessage, Role, SEND_FAILURE_CONTENT};
    ///
    /// let msg = ChatMessage::send_failure("s-1", "HTTP error: timed out");
    /// assert_eq!(msg.role, Role::Assistant);
    /// assert_eq!(msg.content, SEND_FAILURE_CONTENT);
    /// assert_eq!(msg.error_msg.as_deref(), Some("HTTP error: timed out"));
    /// ```
    pub fn send_failure(session_id: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        let mut msg = Self::local(
            session_id.into(),
            Role::Assistant,
            SEND_FAILURE_CONTENT.to_string(),
        );
        msg.error_msg = Some(diagnostic.into());
        msg
    }

    fn local(session_id: String, role: Role, content: String) -> Self {
        Self {
            id: None,
            session_id,
            role,
            content,
            sql_query: None,
            sql_result: None,
            error_msg: None,
            analysis: None,
            chart_type: None,
            x_axis: None,
            y_axis: None,
            suggest_questions: None,
            created_at: None,
        }
    }

    /// Returns the chart hint when the server suggested one
    pub fn chart(&self) -> Option<ChartHint> {
        self.chart_type.as_ref().map(|chart_type| ChartHint {
            chart_type: chart_type.clone(),
            x_axis: self.x_axis.clone(),
            y_axis: self.y_axis.clone(),
        })
    }

    /// Decodes the serialized query result, if any
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the payload is not a valid result.
    pub fn query_result(&self) -> Result<Option<QueryResult>, serde_json::Error> {
        self.sql_result
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
    }

    /// Decodes the suggested follow-up questions
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the payload is not a JSON string array.
    pub fn suggested_questions(&self) -> Result<Vec<String>, serde_json::Error> {
        match self.suggest_questions.as_deref() {
            Some(raw) => serde_json::from_str(raw),
            None => Ok(Vec::new()),
        }
    }
}

/// Chart metadata attached to an assistant reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartHint {
    /// Chart type
    pub chart_type: String,
    /// x axis column
    pub x_axis: Option<String>,
    /// y axis column
    pub y_axis: Option<String>,
}

/// Decoded form of [`ChatMessage::sql_result`]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryResult {
    /// Whether the query executed
    pub success: bool,
    /// Column labels, in select order
    pub columns: Vec<String>,
    /// Rows as column -> value maps
    pub rows: Vec<Map<String, JsonValue>>,
    /// Number of rows returned
    pub row_count: usize,
    /// SQL that produced the result
    pub sql: Option<String>,
    /// Execution error, when `success` is false
    pub error_message: Option<String>,
}

/// A database the service can query
///
/// Credentials other than the user name are never deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    /// Identifier used when creating sessions
    pub id: i64,
    /// Display name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Database flavour (mysql, postgresql)
    pub db_type: String,
    /// Database host
    pub host: String,
    /// Database port
    pub port: u16,
    /// Database name
    pub db_name: String,
    /// Login user
    pub username: String,
    /// 1 when enabled
    #[serde(default)]
    pub status: Option<i32>,
    /// Last schema synchronisation
    #[serde(default)]
    pub schema_synced_at: Option<NaiveDateTime>,
}

/// Body of `POST /chat/sessions`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest<'a> {
    /// Data source for the new session
    pub data_source_id: i64,
    /// Optional title; the server picks a default when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
}

/// Body of `POST /chat/sessions/{id}/messages`
#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    /// Question text
    pub content: &'a str,
}

/// Answer of the data source connection test and schema sync endpoints
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OperationStatus {
    /// Whether the operation succeeded
    pub success: bool,
    /// Human-readable detail from the server
    #[serde(default)]
    pub message: String,
}
