//! Focus session records and the persistence collaborator contract.

use std::collections::VecDeque;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::warn;

use crate::error::StorageError;
use crate::timer::TimerMode;

/// Identifier the store assigns to an appended record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

/// One completed work interval. Immutable once handed to a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusSession {
    pub owner_id: String,
    pub mode: TimerMode,
    pub duration_secs: u64,
    /// 0..=100
    pub focus_score: u8,
    pub completed_at: DateTime<Utc>,
}

/// Aggregates over a set of sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SessionStats {
    pub total_sessions: u64,
    pub total_focus_secs: u64,
    /// `None` when there are no sessions in range.
    pub avg_focus_score: Option<f64>,
}

/// Where completed sessions go.
///
/// The engine calls [`append_focus_session`](SessionStore::append_focus_session)
/// once per finished work interval and only logs a failure.
pub trait SessionStore {
    fn append_focus_session(&self, record: &FocusSession) -> Result<RecordId, StorageError>;

    /// Today's sessions for `owner_id`, followed by every later append.
    fn subscribe_today(
        &self,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionFeed, StorageError>;
}

/// Stream of one owner's sessions for one UTC day.
#[derive(Debug)]
pub struct SessionFeed {
    owner_id: String,
    day: NaiveDate,
    backlog: VecDeque<FocusSession>,
    live: broadcast::Receiver<FocusSession>,
}

impl SessionFeed {
    pub fn new(
        owner_id: impl Into<String>,
        day: NaiveDate,
        backlog: Vec<FocusSession>,
        live: broadcast::Receiver<FocusSession>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            day,
            backlog: backlog.into(),
            live,
        }
    }

    fn wanted(&self, session: &FocusSession) -> bool {
        session.owner_id == self.owner_id && session.completed_at.date_naive() == self.day
    }

    /// Next session, waiting for a live append once the backlog is drained.
    /// Returns `None` when the store is dropped.
    pub async fn next(&mut self) -> Option<FocusSession> {
        if let Some(session) = self.backlog.pop_front() {
            return Some(session);
        }
        loop {
            match self.live.recv().await {
                Ok(session) if self.wanted(&session) => return Some(session),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, owner = %self.owner_id, "session feed lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`next`](Self::next).
    pub fn try_next(&mut self) -> Option<FocusSession> {
        if let Some(session) = self.backlog.pop_front() {
            return Some(session);
        }
        loop {
            match self.live.try_recv() {
                Ok(session) if self.wanted(&session) => return Some(session),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, owner = %self.owner_id, "session feed lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}
