//! Per-(whale, source) ingestion cursors and the backfill job state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chain::Chain;

/// Advances atomically with the trade batch that produced it. The
/// timestamp is always `>=` the max persisted Trade.timestamp for this
/// `(whale, source)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionCheckpoint {
    pub whale_id: Uuid,
    pub chain: Chain,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub last_block_height: Option<i64>,
    pub last_position_snapshot_at: Option<DateTime<Utc>>,
    pub continuation_token: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
#[serde(rename_all = "lowercase")]
pub enum BackfillState {
    Idle,
    Running,
    Done,
    Error,
}

impl BackfillState {
    /// `idle -> running -> (done | error)`; `done`/`error` may restart to
    /// `running` on a new request. No other transition is valid.
    pub fn can_transition_to(&self, next: BackfillState) -> bool {
        use BackfillState::*;
        matches!(
            (self, next),
            (Idle, Running) | (Running, Done) | (Running, Error) | (Done, Running) | (Error, Running)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackfillStatus {
    pub whale_id: Uuid,
    pub state: BackfillState,
    pub progress: i16,
    pub message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl BackfillStatus {
    pub fn idle(whale_id: Uuid) -> Self {
        Self {
            whale_id,
            state: BackfillState::Idle,
            progress: 0,
            message: None,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_transitions() {
        assert!(BackfillState::Idle.can_transition_to(BackfillState::Running));
        assert!(BackfillState::Running.can_transition_to(BackfillState::Done));
        assert!(BackfillState::Running.can_transition_to(BackfillState::Error));
        assert!(BackfillState::Done.can_transition_to(BackfillState::Running));
        assert!(BackfillState::Error.can_transition_to(BackfillState::Running));
    }

    #[test]
    fn disallowed_transitions() {
        assert!(!BackfillState::Idle.can_transition_to(BackfillState::Done));
        assert!(!BackfillState::Done.can_transition_to(BackfillState::Error));
        assert!(!BackfillState::Running.can_transition_to(BackfillState::Idle));
    }
}
