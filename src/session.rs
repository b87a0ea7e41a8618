use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ErrorKind, LookupError};
use crate::resolver::LinkageResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed,
}

/// Handed out by [`LookupSession::begin`]; only the newest ticket may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket {
    epoch: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    Committed,
    Stale,
}

#[derive(Debug, Clone, Copy)]
pub enum SessionView<'a> {
    Empty,
    Pending,
    Failed(&'a str),
    Succeeded(&'a LinkageResult),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LookupSession {
    phase: SessionPhase,
    result: Option<LinkageResult>,
    error_message: Option<String>,
    error_kind: Option<ErrorKind>,
    #[serde(skip)]
    epoch: u64,
}

impl LookupSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn result(&self) -> Option<&LinkageResult> {
        self.result.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error_kind
    }

    /// Back to `Idle`. Anything still in flight becomes stale.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.clear(SessionPhase::Idle);
    }

    pub fn begin(&mut self) -> SearchTicket {
        self.epoch += 1;
        self.clear(SessionPhase::Pending);
        SearchTicket { epoch: self.epoch }
    }

    pub fn complete(
        &mut self,
        ticket: SearchTicket,
        outcome: Result<LinkageResult, LookupError>,
    ) -> Commit {
        if ticket.epoch != self.epoch || self.phase != SessionPhase::Pending {
            debug!(
                ticket = ticket.epoch,
                current = self.epoch,
                "dropping superseded lookup outcome"
            );
            return Commit::Stale;
        }

        match outcome {
            Ok(result) => {
                self.phase = SessionPhase::Succeeded;
                self.result = Some(result);
            }
            Err(err) => {
                warn!(kind = ?err.kind(), error = %err, "lookup failed");
                let message = err.user_message();
                self.phase = SessionPhase::Failed;
                self.error_kind = Some(err.kind());
                self.error_message = Some(if message.trim().is_empty() {
                    "lookup failed".to_string()
                } else {
                    message
                });
            }
        }
        Commit::Committed
    }

    pub fn view(&self) -> SessionView<'_> {
        match (self.phase, &self.result, &self.error_message) {
            (SessionPhase::Pending, _, _) => SessionView::Pending,
            (SessionPhase::Succeeded, Some(result), _) => SessionView::Succeeded(result),
            (SessionPhase::Failed, _, Some(message)) => SessionView::Failed(message),
            _ => SessionView::Empty,
        }
    }

    fn clear(&mut self, phase: SessionPhase) {
        self.phase = phase;
        self.result = None;
        self.error_message = None;
        self.error_kind = None;
    }
}

/// Cloneable handle for driving one session from async code.
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    inner: Arc<Mutex<LookupSession>>,
}

impl SharedSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> SearchTicket {
        self.lock().begin()
    }

    pub fn complete(
        &self,
        ticket: SearchTicket,
        outcome: Result<LinkageResult, LookupError>,
    ) -> Commit {
        self.lock().complete(ticket, outcome)
    }

    pub fn reset(&self) {
        self.lock().reset();
    }

    pub fn snapshot(&self) -> LookupSession {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, LookupSession> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
