//! Session store
//!
//! [`SessionStore`] is the single owner of the client's conversation state:
//! the known sessions, the active session, the active session's message log
//! and the busy flag. Every operation issues one remote call through a
//! [`SessionApi`] and commits its effect in one atomic state transition.
//!
//! Failure handling differs per operation:
//!
//! | Operation | On remote failure |
//! |---|---|
//! | [`SessionStore::refresh_sessions`] | logged, state unchanged, returns `false` |
//! | [`SessionStore::create_session`] | returned to the caller, state unchanged |
//! | [`SessionStore::select_session`] | returned to the caller, active session stays switched |
//! | [`SessionStore::send_message`] | recorded in the log as a synthesized assistant message |
//! | [`SessionStore::delete_session`] | logged and returned to the caller, state unchanged |
//!
//! Operations take `&self` and may overlap. A fetched log or a reply is only
//! applied if the session it was requested for is still the active one;
//! late results are dropped instead of overwriting newer state.

pub mod metrics;
pub mod state;

use crate::api::{ChatMessage, Session, SessionApi};
use crate::error::{Result, SqlbotError};
use self::metrics::RemoteCallMetrics;
use self::state::SendTicket;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

pub use state::{DeliveryStatus, LocalId, LogEntry, StoreState};

/// Result of [`SessionStore::select_session`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The fetched log replaced the message log
    Applied {
        /// Number of messages now in the log
        count: usize,
    },
    /// Another switch happened while fetching; the result was discarded
    Superseded,
}

/// Result of [`SessionStore::send_message`]
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// No session is active; nothing was sent
    NoActiveSession,
    /// The assistant replied and the reply was appended
    Replied(ChatMessage),
    /// The call failed; a synthesized error message was appended
    Failed(String),
    /// Another session became active before the call settled; the outcome was dropped
    Superseded,
}

/// Keeps the busy flag raised while a select or send call is outstanding
///
/// Dropping the guard without calling [`BusyGuard::release_with`] still
/// lowers the flag, so cancelled operations cannot leave the store busy.
/// A cancelled send also marks its message as failed.
struct BusyGuard<'a> {
    state: &'a watch::Sender<StoreState>,
    send: Option<SendTicket>,
    released: bool,
}

impl<'a> BusyGuard<'a> {
    /// Takes over a call already counted by `StoreState::begin_call`
    fn held(state: &'a watch::Sender<StoreState>) -> Self {
        Self {
            state,
            send: None,
            released: false,
        }
    }

    /// Like [`BusyGuard::held`], for the send identified by `ticket`
    fn for_send(state: &'a watch::Sender<StoreState>, ticket: SendTicket) -> Self {
        Self {
            state,
            send: Some(ticket),
            released: false,
        }
    }

    /// Lowers the flag in the same transition as `f`
    fn release_with(mut self, f: impl FnOnce(&mut StoreState)) {
        self.released = true;
        self.state.send_modify(|s| {
            f(s);
            s.end_call();
        });
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let send = self.send.take();
        self.state.send_modify(|s| {
            if let Some(ticket) = &send {
                debug!(session_id = %ticket.session_id, "Send abandoned before it settled");
                s.abandon_send(ticket);
            }
            s.end_call();
        });
    }
}

/// Coordinator of sessions and the active conversation
///
/// # Examples
///
/// ```
/// use sqlbot::api::HttpSessionApi;
/// use sqlbot::config::ApiConfig;
/// use sqlbot::store::SessionStore;
///
/// let api = HttpSessionApi::new(&ApiConfig::default()).unwrap();
/// let store = SessionStore::new(api);
/// assert!(store.sessions().is_empty());
/// assert!(!store.is_busy());
/// ```
pub struct SessionStore<A> {
    api: A,
    state: watch::Sender<StoreState>,
}

impl<A: SessionApi> SessionStore<A> {
    /// Creates an empty store backed by `api`
    pub fn new(api: A) -> Self {
        let (state, _) = watch::channel(StoreState::default());
        Self { api, state }
    }

    /// The remote API the store issues calls through
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Applies `f` as a single transition and returns its output
    fn transition<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        let mut output = None;
        self.state.send_modify(|s| output = Some(f(s)));
        match output {
            Some(output) => output,
            None => unreachable!("send_modify always runs its closure"),
        }
    }

    /// Subscribes to state changes
    ///
    /// The receiver is notified once per committed transition.
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.state.subscribe()
    }

    /// Returns a copy of the current state
    pub fn snapshot(&self) -> StoreState {
        self.state.borrow().clone()
    }

    /// Known sessions, most recent first
    pub fn sessions(&self) -> Vec<Session> {
        self.state.borrow().sessions().to_vec()
    }

    /// Identifier of the active session
    pub fn active_session_id(&self) -> Option<String> {
        self.state.borrow().active_session_id().map(str::to_string)
    }

    /// The active session, if it is among the known sessions
    pub fn active_session(&self) -> Option<Session> {
        self.state.borrow().active_session().cloned()
    }

    /// Messages of the active session
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state.borrow().messages().cloned().collect()
    }

    /// Tagged log entries of the active session
    pub fn entries(&self) -> Vec<LogEntry> {
        self.state.borrow().entries().to_vec()
    }

    /// True while a select or send call is outstanding
    pub fn is_busy(&self) -> bool {
        self.state.borrow().is_busy()
    }

    /// Replaces the session list with the server's
    ///
    /// Failures are logged and swallowed; the current list is kept.
    /// Returns whether the list was refreshed.
    pub async fn refresh_sessions(&self) -> bool {
        let metrics = RemoteCallMetrics::start("list_sessions");
        let result = self.api.list_sessions().await;
        metrics.record(&result);

        match result {
            Ok(sessions) => {
                debug!(count = sessions.len(), "Refreshed sessions");
                self.state.send_modify(|s| s.replace_sessions(sessions));
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to list sessions");
                false
            }
        }
    }

    /// Creates a session and makes it the active one with an empty log
    ///
    /// Nothing is committed unless the remote call succeeds.
    ///
    /// # Errors
    ///
    /// Returns `SqlbotError::Remote` if the create call fails.
    pub async fn create_session(&self, data_source_id: i64, title: Option<&str>) -> Result<Session> {
        let metrics = RemoteCallMetrics::start("create_session");
        let result = self.api.create_session(data_source_id, title).await;
        metrics.record(&result);

        let session = result.map_err(|e| {
            warn!(data_source_id, error = %e, "Failed to create session");
            SqlbotError::remote(e)
        })?;

        info!(session_id = %session.id, data_source_id, "Session created and activated");
        let created = session.clone();
        self.state.send_modify(|s| s.insert_created(created));
        Ok(session)
    }

    /// Makes `session_id` active and loads its message log
    ///
    /// The active session switches immediately and the log is emptied until
    /// the fetch resolves. Selecting the active session again keeps the
    /// messages whose send is still outstanding. If a later switch happens before then, the fetched
    /// log is discarded and `LoadOutcome::Superseded` is returned.
    ///
    /// # Errors
    ///
    /// Returns `SqlbotError::Remote` if the fetch fails. The active session
    /// stays switched, with an empty log.
    pub async fn select_session(&self, session_id: &str) -> Result<LoadOutcome> {
        let ticket = self.transition(|s| {
            s.begin_call();
            s.begin_load(session_id)
        });
        let busy = BusyGuard::held(&self.state);

        let metrics = RemoteCallMetrics::start("get_messages");
        let result = self.api.get_messages(session_id).await;
        metrics.record(&result);

        match result {
            Ok(messages) => {
                let mut applied = None;
                busy.release_with(|s| applied = s.apply_loaded(&ticket, messages));
                match applied {
                    Some(count) => {
                        debug!(session_id = %session_id, count, "Loaded session messages");
                        Ok(LoadOutcome::Applied { count })
                    }
                    None => {
                        debug!(session_id = %session_id, "Discarded messages of a superseded selection");
                        Ok(LoadOutcome::Superseded)
                    }
                }
            }
            Err(e) => {
                drop(busy);
                warn!(session_id = %session_id, error = %e, "Failed to load session messages");
                Err(SqlbotError::remote(e).into())
            }
        }
    }

    /// Sends `content` to the active session
    ///
    /// The user message is appended to the log before the remote call and is
    /// never rolled back. Reloading the active session meanwhile keeps it and
    /// its reply; only switching to another session drops the outcome. A failed call is recorded as an assistant message
    /// with content [`crate::api::SEND_FAILURE_CONTENT`] and the diagnostic in
    /// `error_msg`; it is not returned as an error.
    pub async fn send_message(&self, content: &str) -> SendOutcome {
        if self.state.borrow().active_session_id().is_none() {
            debug!("Ignoring message: no active session");
            return SendOutcome::NoActiveSession;
        }
        let ticket = self.transition(|s| {
            let ticket = s.push_pending(content);
            if ticket.is_some() {
                s.begin_call();
            }
            ticket
        });
        let Some(ticket) = ticket else {
            return SendOutcome::NoActiveSession;
        };
        let busy = BusyGuard::for_send(&self.state, ticket.clone());

        let metrics = RemoteCallMetrics::start("send_message");
        let result = self.api.send_message(&ticket.session_id, content).await;
        metrics.record(&result);

        let outcome = match &result {
            Ok(reply) => SendOutcome::Replied(reply.clone()),
            Err(e) => {
                error!(session_id = %ticket.session_id, error = %e, "Failed to send message");
                SendOutcome::Failed(e.to_string())
            }
        };

        let mut applied = false;
        busy.release_with(|s| {
            applied = s.resolve_send(&ticket, result.map_err(|e| e.to_string()));
        });

        if applied {
            outcome
        } else {
            debug!(session_id = %ticket.session_id, "Dropped reply for a session that is no longer active");
            SendOutcome::Superseded
        }
    }

    /// Deletes a session
    ///
    /// On success the session is removed from the list; if it was active the
    /// active session and the log are cleared.
    ///
    /// # Errors
    ///
    /// Returns `SqlbotError::Remote` if the delete call fails; the state is
    /// left unchanged.
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        let metrics = RemoteCallMetrics::start("delete_session");
        let result = self.api.delete_session(session_id).await;
        metrics.record(&result);

        if let Err(e) = result {
            error!(session_id = %session_id, error = %e, "Failed to delete session");
            return Err(SqlbotError::remote(e).into());
        }

        let was_active = self.transition(|s| s.remove_session(session_id));
        info!(session_id = %session_id, was_active, "Session deleted");
        Ok(())
    }
}
