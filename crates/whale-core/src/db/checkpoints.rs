//! Per-(whale, source) ingestion cursor store.

use chrono::Utc;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::types::{Chain, IngestionCheckpoint};
use crate::Result;

pub struct CheckpointRepository {
    pool: PgPool,
}

impl CheckpointRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, whale_id: Uuid, chain: Chain) -> Result<Option<IngestionCheckpoint>> {
        let row = sqlx::query(
            "SELECT whale_id, chain, last_timestamp, last_block_height, \
             last_position_snapshot_at, continuation_token, updated_at \
             FROM ingestion_checkpoints WHERE whale_id = $1 AND chain = $2",
        )
        .bind(whale_id)
        .bind(chain)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::row_to_checkpoint))
    }

    /// Must be called inside the same transaction as the trade batch it
    /// advances for — a crash mid-batch must either persist both or
    /// neither.
    pub async fn advance_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        checkpoint: &IngestionCheckpoint,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ingestion_checkpoints (
                whale_id, chain, last_timestamp, last_block_height,
                last_position_snapshot_at, continuation_token, updated_at
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7)
            ON CONFLICT (whale_id, chain) DO UPDATE SET
                last_timestamp = GREATEST(ingestion_checkpoints.last_timestamp, EXCLUDED.last_timestamp),
                last_block_height = GREATEST(ingestion_checkpoints.last_block_height, EXCLUDED.last_block_height),
                last_position_snapshot_at = EXCLUDED.last_position_snapshot_at,
                continuation_token = EXCLUDED.continuation_token,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(checkpoint.whale_id)
        .bind(checkpoint.chain)
        .bind(checkpoint.last_timestamp)
        .bind(checkpoint.last_block_height)
        .bind(checkpoint.last_position_snapshot_at)
        .bind(&checkpoint.continuation_token)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    fn row_to_checkpoint(r: sqlx::postgres::PgRow) -> IngestionCheckpoint {
        IngestionCheckpoint {
            whale_id: r.get("whale_id"),
            chain: r.get("chain"),
            last_timestamp: r.get("last_timestamp"),
            last_block_height: r.get("last_block_height"),
            last_position_snapshot_at: r.get("last_position_snapshot_at"),
            continuation_token: r.get("continuation_token"),
            updated_at: r.get("updated_at"),
        }
    }
}
