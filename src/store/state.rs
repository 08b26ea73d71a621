//! Observable state of the session store
//!
//! [`StoreState`] is the snapshot handed to observers. All mutation goes
//! through the crate-private methods below, each of which is applied inside a
//! single `watch::Sender::send_modify` call by the store, so a snapshot never
//! exposes a half-applied transition.
//!
//! The log is a fetched prefix followed by a local suffix. The prefix is the
//! last applied server log; the suffix holds messages sent from this client
//! and the entries their sends resolved into. A reload of the active session
//! replaces the prefix and keeps the suffix, so only a change of session
//! discards sends that are still in flight.

use crate::api::{ChatMessage, Session};

/// Identifier of a locally authored log entry
pub type LocalId = u64;

/// Delivery state of a locally authored user message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// The send call is outstanding
    Pending,
    /// The server answered the send call
    Delivered,
    /// The send call failed
    Failed,
}

/// One entry of the active session's message log
#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    /// User message authored on this client, appended before the server saw it
    Local {
        /// Client-side identity, stable for the lifetime of the log
        local_id: LocalId,
        /// Outcome of the send call that carried it
        status: DeliveryStatus,
        /// The message as shown to the user
        message: ChatMessage,
    },
    /// Message returned by the server
    Confirmed(ChatMessage),
    /// Assistant message generated by the store to surface a failed send
    Synthesized(ChatMessage),
}

impl LogEntry {
    /// The message carried by this entry
    pub fn message(&self) -> &ChatMessage {
        match self {
            LogEntry::Local { message, .. } => message,
            LogEntry::Confirmed(message) | LogEntry::Synthesized(message) => message,
        }
    }

    /// Consumes the entry and returns its message
    pub fn into_message(self) -> ChatMessage {
        match self {
            LogEntry::Local { message, .. } => message,
            LogEntry::Confirmed(message) | LogEntry::Synthesized(message) => message,
        }
    }

    /// True for entries the server has not persisted yet
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            LogEntry::Local {
                status: DeliveryStatus::Pending,
                ..
            }
        )
    }
}

/// Tag carried by an in-flight message-log fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoadTicket {
    pub(crate) session_id: String,
    epoch: u64,
}

/// Tag carried by an in-flight send
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SendTicket {
    pub(crate) session_id: String,
    local_id: LocalId,
    switch_epoch: u64,
}

/// Snapshot of the session store
///
/// Sessions are ordered most recent first. The log always belongs to the
/// active session: switching sessions empties it until the new log arrives.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    sessions: Vec<Session>,
    active_session_id: Option<String>,
    log: Vec<LogEntry>,
    // Entries at the front of `log` that came from the last applied fetch.
    fetched_len: usize,
    in_flight: usize,
    // Bumped on every select, including a reload of the active session.
    load_epoch: u64,
    // Bumped only when the active session changes.
    switch_epoch: u64,
    next_local_id: LocalId,
}

impl StoreState {
    /// Known sessions, most recent first
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Identifier of the active session
    pub fn active_session_id(&self) -> Option<&str> {
        self.active_session_id.as_deref()
    }

    /// The active session, if it is part of the known session list
    pub fn active_session(&self) -> Option<&Session> {
        let id = self.active_session_id.as_deref()?;
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Tagged log of the active session
    pub fn entries(&self) -> &[LogEntry] {
        &self.log
    }

    /// Messages of the active session, in log order
    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> + '_ {
        self.log.iter().map(LogEntry::message)
    }

    /// True while a select or send call is outstanding
    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    pub(crate) fn begin_call(&mut self) {
        self.in_flight += 1;
    }

    pub(crate) fn end_call(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub(crate) fn replace_sessions(&mut self, sessions: Vec<Session>) {
        self.sessions = sessions;
    }

    /// Inserts a freshly created session at the front and activates it
    pub(crate) fn insert_created(&mut self, session: Session) {
        let id = session.id.clone();
        self.sessions.insert(0, session);
        self.switch_active(Some(id));
    }

    /// Switches to `session_id` and returns the ticket its fetch must present
    ///
    /// Selecting the session that is already active keeps only the messages
    /// whose send is still outstanding; their replies land after the fetched
    /// log once it arrives.
    pub(crate) fn begin_load(&mut self, session_id: &str) -> LoadTicket {
        if self.active_session_id.as_deref() == Some(session_id) {
            self.log.retain(LogEntry::is_pending);
            self.fetched_len = 0;
            self.load_epoch += 1;
        } else {
            self.switch_active(Some(session_id.to_string()));
        }
        LoadTicket {
            session_id: session_id.to_string(),
            epoch: self.load_epoch,
        }
    }

    /// Replaces the fetched prefix of the log if `ticket` is still current
    ///
    /// The local suffix stays after the fetched messages; a reply the fetched
    /// log already contains is not repeated. Returns the number of messages now in the log, or `None`
    /// when a later select made the result stale.
    pub(crate) fn apply_loaded(
        &mut self,
        ticket: &LoadTicket,
        messages: Vec<ChatMessage>,
    ) -> Option<usize> {
        if !self.load_is_current(ticket) {
            return None;
        }

        let received = messages.len();
        let fetched: Vec<LogEntry> = messages
            .into_iter()
            .filter(|m| m.session_id == ticket.session_id)
            .map(LogEntry::Confirmed)
            .collect();
        if fetched.len() != received {
            tracing::warn!(
                session_id = %ticket.session_id,
                dropped = received - fetched.len(),
                "Dropped fetched messages belonging to another session"
            );
        }

        let mut local = self.log.split_off(self.fetched_len);
        local.retain(|entry| match entry {
            LogEntry::Confirmed(reply) => reply
                .id
                .map_or(true, |id| !fetched.iter().any(|f| f.message().id == Some(id))),
            _ => true,
        });

        self.fetched_len = fetched.len();
        self.log = fetched;
        self.log.append(&mut local);
        Some(self.log.len())
    }

    pub(crate) fn load_is_current(&self, ticket: &LoadTicket) -> bool {
        self.load_epoch == ticket.epoch
            && self.active_session_id.as_deref() == Some(ticket.session_id.as_str())
    }

    /// Appends a pending user message to the active session's log
    ///
    /// Returns `None` without touching the log when no session is active.
    pub(crate) fn push_pending(&mut self, content: &str) -> Option<SendTicket> {
        let session_id = self.active_session_id.clone()?;
        let local_id = self.next_local_id;
        self.next_local_id += 1;

        self.log.push(LogEntry::Local {
            local_id,
            status: DeliveryStatus::Pending,
            message: ChatMessage::user(session_id.clone(), content),
        });

        Some(SendTicket {
            session_id,
            local_id,
            switch_epoch: self.switch_epoch,
        })
    }

    fn send_is_current(&self, ticket: &SendTicket) -> bool {
        self.switch_epoch == ticket.switch_epoch
            && self.active_session_id.as_deref() == Some(ticket.session_id.as_str())
    }

    fn set_delivery(&mut self, target: LocalId, delivery: DeliveryStatus) -> bool {
        for entry in &mut self.log {
            if let LogEntry::Local {
                local_id, status, ..
            } = entry
            {
                if *local_id == target {
                    *status = delivery;
                    return true;
                }
            }
        }
        false
    }

    /// Records the outcome of a send
    ///
    /// On success the reply is appended; on failure a synthesized assistant
    /// message carrying `diagnostic` is appended. Returns `false`, leaving the
    /// state untouched, when the active session changed since the send began.
    pub(crate) fn resolve_send(
        &mut self,
        ticket: &SendTicket,
        outcome: Result<ChatMessage, String>,
    ) -> bool {
        if !self.send_is_current(ticket) {
            return false;
        }

        let delivery = if outcome.is_ok() {
            DeliveryStatus::Delivered
        } else {
            DeliveryStatus::Failed
        };
        self.set_delivery(ticket.local_id, delivery);

        let entry = match outcome {
            Ok(reply) => LogEntry::Confirmed(reply),
            Err(diagnostic) => LogEntry::Synthesized(ChatMessage::send_failure(
                ticket.session_id.clone(),
                diagnostic,
            )),
        };
        self.log.push(entry);
        true
    }

    /// Marks the message of a send that will never settle as failed
    ///
    /// No reply entry is appended since the outcome of the call is unknown.
    pub(crate) fn abandon_send(&mut self, ticket: &SendTicket) {
        if self.send_is_current(ticket) {
            self.set_delivery(ticket.local_id, DeliveryStatus::Failed);
        }
    }

    /// Removes a session; clears the active pointer and log if it was active
    ///
    /// Returns whether the removed session was the active one.
    pub(crate) fn remove_session(&mut self, session_id: &str) -> bool {
        self.sessions.retain(|s| s.id != session_id);
        let was_active = self.active_session_id.as_deref() == Some(session_id);
        if was_active {
            self.switch_active(None);
        }
        was_active
    }

    fn switch_active(&mut self, session_id: Option<String>) {
        self.active_session_id = session_id;
        self.log.clear();
        self.fetched_len = 0;
        self.load_epoch += 1;
        self.switch_epoch += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Role;

    fn session(id: &str) -> Session {
        Session {
            id: id.to_string(),
            title: format!("title {}", id),
            data_source_id: 1,
            created_at: chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
        }
    }

    fn reply(session_id: &str, content: &str) -> ChatMessage {
        let mut msg = ChatMessage::user(session_id, content);
        msg.role = Role::Assistant;
        msg.id = Some(7);
        msg
    }

    #[test]
    fn test_default_state_is_idle_and_empty() {
        let state = StoreState::default();
        assert!(state.sessions().is_empty());
        assert!(state.active_session_id().is_none());
        assert!(state.entries().is_empty());
        assert!(!state.is_busy());
    }

    #[test]
    fn test_busy_counts_outstanding_calls() {
        let mut state = StoreState::default();
        state.begin_call();
        state.begin_call();
        state.end_call();
        assert!(state.is_busy());
        state.end_call();
        assert!(!state.is_busy());
        state.end_call();
        assert!(!state.is_busy());
    }

    #[test]
    fn test_insert_created_goes_first_and_activates() {
        let mut state = StoreState::default();
        state.insert_created(session("a"));
        state.insert_created(session("b"));

        let ids: Vec<&str> = state.sessions().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(state.active_session_id(), Some("b"));
        assert_eq!(state.active_session().map(|s| s.title.as_str()), Some("title b"));
    }

    #[test]
    fn test_stale_load_is_discarded() {
        let mut state = StoreState::default();
        let first = state.begin_load("a");
        let second = state.begin_load("a");

        assert_eq!(state.apply_loaded(&second, vec![reply("a", "new")]), Some(1));
        assert_eq!(state.apply_loaded(&first, vec![reply("a", "old")]), None);
        assert_eq!(state.messages().next().unwrap().content, "new");
    }

    #[test]
    fn test_load_drops_foreign_messages() {
        let mut state = StoreState::default();
        let ticket = state.begin_load("a");
        let applied = state.apply_loaded(&ticket, vec![reply("a", "mine"), reply("b", "theirs")]);
        assert_eq!(applied, Some(1));
        assert!(state.messages().all(|m| m.session_id == "a"));
    }

    #[test]
    fn test_push_pending_requires_active_session() {
        let mut state = StoreState::default();
        assert!(state.push_pending("hello").is_none());
        assert!(state.entries().is_empty());
    }

    #[test]
    fn test_resolve_send_marks_delivery() {
        let mut state = StoreState::default();
        state.insert_created(session("a"));
        let ticket = state.push_pending("hello").unwrap();
        assert!(state.entries()[0].is_pending());

        assert!(state.resolve_send(&ticket, Ok(reply("a", "hi there"))));
        assert!(matches!(
            state.entries()[0],
            LogEntry::Local {
                status: DeliveryStatus::Delivered,
                ..
            }
        ));
        assert!(matches!(state.entries()[1], LogEntry::Confirmed(_)));
    }

    #[test]
    fn test_resolve_send_failure_synthesizes_reply() {
        let mut state = StoreState::default();
        state.insert_created(session("a"));
        let ticket = state.push_pending("hello").unwrap();

        assert!(state.resolve_send(&ticket, Err("boom".to_string())));
        assert!(matches!(
            state.entries()[0],
            LogEntry::Local {
                status: DeliveryStatus::Failed,
                ..
            }
        ));
        let last = state.entries()[1].message();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.error_msg.as_deref(), Some("boom"));
    }

    #[test]
    fn test_resolve_send_after_switch_is_ignored() {
        let mut state = StoreState::default();
        state.insert_created(session("a"));
        let ticket = state.push_pending("hello").unwrap();
        state.begin_load("b");

        assert!(!state.resolve_send(&ticket, Ok(reply("a", "late"))));
        assert!(state.entries().is_empty());
    }

    #[test]
    fn test_reload_keeps_sends_issued_while_loading() {
        let mut state = StoreState::default();
        state.insert_created(session("a"));
        let load = state.begin_load("a");
        let send = state.push_pending("top 5 products").unwrap();

        assert_eq!(state.apply_loaded(&load, vec![reply("a", "earlier")]), Some(2));
        assert!(state.resolve_send(&send, Ok(reply("a", "answer"))));

        let contents: Vec<&str> = state.messages().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["earlier", "top 5 products", "answer"]);
    }

    #[test]
    fn test_reload_drops_settled_local_entries() {
        let mut state = StoreState::default();
        state.insert_created(session("a"));
        let send = state.push_pending("hello").unwrap();
        state.resolve_send(&send, Err("boom".to_string()));

        let load = state.begin_load("a");
        assert!(state.entries().is_empty());
        let mut persisted = ChatMessage::user("a", "hello");
        persisted.id = Some(1);
        assert_eq!(state.apply_loaded(&load, vec![persisted]), Some(1));
    }

    #[test]
    fn test_reload_does_not_repeat_fetched_reply() {
        let mut state = StoreState::default();
        state.insert_created(session("a"));
        let send = state.push_pending("hello").unwrap();
        let load = state.begin_load("a");
        assert!(state.resolve_send(&send, Ok(reply("a", "hi there"))));

        let mut question = ChatMessage::user("a", "hello");
        question.id = Some(6);
        let fetched = vec![question, reply("a", "hi there")];
        assert_eq!(state.apply_loaded(&load, fetched), Some(3));
        let confirmed = state
            .entries()
            .iter()
            .filter(|e| matches!(e, LogEntry::Confirmed(_)))
            .count();
        assert_eq!(confirmed, 2);
    }

    #[test]
    fn test_abandoned_send_is_marked_failed() {
        let mut state = StoreState::default();
        state.insert_created(session("a"));
        let ticket = state.push_pending("hello").unwrap();

        state.abandon_send(&ticket);
        assert!(matches!(
            state.entries()[0],
            LogEntry::Local {
                status: DeliveryStatus::Failed,
                ..
            }
        ));
        assert_eq!(state.entries().len(), 1);
    }

    #[test]
    fn test_remove_active_session_clears_log() {
        let mut state = StoreState::default();
        state.insert_created(session("a"));
        state.insert_created(session("b"));
        state.push_pending("hello");

        assert!(!state.remove_session("a"));
        assert_eq!(state.active_session_id(), Some("b"));
        assert_eq!(state.entries().len(), 1);

        assert!(state.remove_session("b"));
        assert!(state.active_session_id().is_none());
        assert!(state.entries().is_empty());
        assert!(state.sessions().is_empty());
    }
}
