//! BackfillStatus state-machine persistence.

use chrono::Utc;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::types::{BackfillState, BackfillStatus};
use crate::{Error, Result};

pub struct BackfillRepository {
    pool: PgPool,
}

impl BackfillRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, whale_id: Uuid) -> Result<BackfillStatus> {
        let row = sqlx::query(
            "SELECT whale_id, state, progress, message, updated_at FROM backfill_status WHERE whale_id = $1",
        )
        .bind(whale_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(r) => Self::row_to_status(r),
            None => BackfillStatus::idle(whale_id),
        })
    }

    /// Transitions the stored state, rejecting moves the state machine
    /// forbids (e.g. `idle -> done`). Callers serialize this per whale via
    /// an in-process lock; this is the last-line guard against a stray
    /// concurrent writer.
    pub async fn transition(
        &self,
        whale_id: Uuid,
        next: BackfillState,
        progress: i16,
        message: Option<String>,
    ) -> Result<BackfillStatus> {
        let current = self.get(whale_id).await?;
        if current.state != next && !current.state.can_transition_to(next) {
            return Err(Error::Invariant(format!(
                "illegal backfill transition {:?} -> {:?} for whale {whale_id}",
                current.state, next
            )));
        }

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO backfill_status (whale_id, state, progress, message, updated_at)
            VALUES ($1,$2,$3,$4,$5)
            ON CONFLICT (whale_id) DO UPDATE SET
                state = EXCLUDED.state, progress = EXCLUDED.progress,
                message = EXCLUDED.message, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(whale_id)
        .bind(next)
        .bind(progress)
        .bind(&message)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(BackfillStatus { whale_id, state: next, progress, message, updated_at: now })
    }

    fn row_to_status(r: sqlx::postgres::PgRow) -> BackfillStatus {
        BackfillStatus {
            whale_id: r.get("whale_id"),
            state: r.get("state"),
            progress: r.get("progress"),
            message: r.get("message"),
            updated_at: r.get("updated_at"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_status_has_zero_progress() {
        let s = BackfillStatus::idle(Uuid::new_v4());
        assert_eq!(s.progress, 0);
        assert_eq!(s.state, BackfillState::Idle);
    }
}
