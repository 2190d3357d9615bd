//! Current holdings: replaced wholesale per refresh, no history table.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::types::{Holding, NewHolding};
use crate::Result;

pub struct HoldingRepository {
    pool: PgPool,
}

impl HoldingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Deletes the whale's existing holdings and inserts the new snapshot
    /// in one transaction — a partial replace would leave stale rows for
    /// assets the whale no longer holds.
    pub async fn replace(&self, whale_id: Uuid, holdings: Vec<NewHolding>) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM holdings WHERE whale_id = $1").bind(whale_id).execute(&mut *tx).await?;

        let total_usd: Decimal = holdings.iter().filter_map(|h| h.usd_value).sum();
        let now = Utc::now();

        for h in &holdings {
            let portfolio_percent = match (h.usd_value, total_usd) {
                (Some(v), t) if t > Decimal::ZERO => Some(v / t * Decimal::from(100)),
                _ => None,
            };
            sqlx::query(
                r#"
                INSERT INTO holdings (whale_id, asset, chain, amount, usd_value, portfolio_percent, updated_at)
                VALUES ($1,$2,$3,$4,$5,$6,$7)
                "#,
            )
            .bind(whale_id)
            .bind(&h.asset)
            .bind(h.chain)
            .bind(h.amount)
            .bind(h.usd_value)
            .bind(portfolio_percent)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn for_whale(&self, whale_id: Uuid) -> Result<Vec<Holding>> {
        let rows = sqlx::query(
            "SELECT whale_id, asset, chain, amount, usd_value, portfolio_percent, updated_at \
             FROM holdings WHERE whale_id = $1 ORDER BY usd_value DESC NULLS LAST",
        )
        .bind(whale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| Holding {
                whale_id: r.get("whale_id"),
                asset: r.get("asset"),
                chain: r.get("chain"),
                amount: r.get("amount"),
                usd_value: r.get("usd_value"),
                portfolio_percent: r.get("portfolio_percent"),
                updated_at: r.get("updated_at"),
            })
            .collect())
    }
}
