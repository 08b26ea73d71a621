//! Remote API of the SQLBot service
//!
//! - [`base`]: the `SessionApi` contract and `ApiError`
//! - [`types`]: sessions, messages, data sources and request bodies
//! - [`client`]: reqwest implementation of the contract

pub mod base;
pub mod client;
pub mod types;

pub use base::{ApiError, SessionApi};
pub use client::HttpSessionApi;
pub use types::{
    ChartHint, ChatMessage, CreateSessionRequest, DataSource, OperationStatus, QueryResult,
    Role, SendMessageRequest, Session, SEND_FAILURE_CONTENT,
};
