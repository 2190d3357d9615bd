//! Repository for whale identity, classification and labels.

use chrono::Utc;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::types::{Chain, Whale, WhaleClassification, WhaleFilters};
use crate::{Error, Result};

pub struct WhaleRepository {
    pool: PgPool,
}

impl WhaleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a whale if `(chain, address)` is new, otherwise return the
    /// existing row untouched. Whale identity is never re-derived.
    pub async fn find_or_create(
        &self,
        chain: Chain,
        address: &str,
        labels: Vec<String>,
        classification: Option<WhaleClassification>,
    ) -> Result<Whale> {
        if let Some(existing) = self.find_by_chain_address(chain, address).await? {
            return Ok(existing);
        }

        let now = Utc::now();
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO whales (id, chain, address, classification, labels, first_seen, last_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (chain, address) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(chain)
        .bind(address)
        .bind(classification.unwrap_or_default())
        .bind(&labels)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_by_chain_address(chain, address)
            .await?
            .ok_or_else(|| Error::Invariant("whale vanished immediately after insert".to_string()))
    }

    pub async fn find_by_chain_address(&self, chain: Chain, address: &str) -> Result<Option<Whale>> {
        let row = sqlx::query(
            r#"
            SELECT id, chain, address, classification, labels, first_seen, last_active
            FROM whales WHERE chain = $1 AND address = $2
            "#,
        )
        .bind(chain)
        .bind(address)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Self::row_to_whale(&r)))
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Whale>> {
        let row = sqlx::query(
            r#"
            SELECT id, chain, address, classification, labels, first_seen, last_active
            FROM whales WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Self::row_to_whale(&r)))
    }

    /// Update `last_active`; called by collectors on every tick that
    /// persists at least one trade for the whale.
    pub async fn touch_last_active(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE whales SET last_active = $2 WHERE id = $1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_classification(&self, id: Uuid, classification: WhaleClassification) -> Result<()> {
        sqlx::query("UPDATE whales SET classification = $2 WHERE id = $1")
            .bind(id)
            .bind(classification)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_labels(&self, id: Uuid, labels: Vec<String>) -> Result<()> {
        sqlx::query("UPDATE whales SET labels = $2 WHERE id = $1")
            .bind(id)
            .bind(&labels)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Deletion cascades to Trade/Event/Holding/Metrics/Checkpoint/Backfill/
    /// Session rows via `ON DELETE CASCADE` foreign keys.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM whales WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn list(&self, filters: &WhaleFilters, limit: i64, offset: i64) -> Result<(Vec<Whale>, i64)> {
        const WHERE: &str = "WHERE ($1::text IS NULL OR chain = $1) AND ($2::text IS NULL OR classification = $2)";

        let rows = sqlx::query(&format!(
            "SELECT id, chain, address, classification, labels, first_seen, last_active \
             FROM whales {WHERE} ORDER BY last_active DESC LIMIT $3 OFFSET $4"
        ))
        .bind(filters.chain.map(|c| c.as_str().to_string()))
        .bind(filters.classification)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM whales {WHERE}"))
            .bind(filters.chain.map(|c| c.as_str().to_string()))
            .bind(filters.classification)
            .fetch_one(&self.pool)
            .await?;

        Ok((rows.iter().map(Self::row_to_whale).collect(), total))
    }

    fn row_to_whale(r: &sqlx::postgres::PgRow) -> Whale {
        Whale {
            id: r.get("id"),
            chain: r.get("chain"),
            address: r.get("address"),
            classification: r.get("classification"),
            labels: r.get::<Vec<String>, _>("labels"),
            first_seen: r.get("first_seen"),
            last_active: r.get("last_active"),
        }
    }
}
