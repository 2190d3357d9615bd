//! `price_history(asset, timestamp, usd_price)` persistence — this is what
//! makes backtests reproducible: once a price is recorded for a timestamp
//! it is never refetched or overwritten.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

use whale_core::Result;

pub struct PriceHistoryRepository {
    pool: PgPool,
}

impl PriceHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, asset: &str, timestamp: DateTime<Utc>, usd_price: Decimal) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO price_history (asset, timestamp, usd_price)
            VALUES ($1, $2, $3)
            ON CONFLICT (asset, timestamp) DO NOTHING
            "#,
        )
        .bind(asset)
        .bind(timestamp)
        .bind(usd_price)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// The two rows bracketing `at`, used for linear interpolation. Either
    /// side may be absent if `at` is outside the stored range.
    pub async fn surrounding(
        &self,
        asset: &str,
        at: DateTime<Utc>,
    ) -> Result<(Option<(DateTime<Utc>, Decimal)>, Option<(DateTime<Utc>, Decimal)>)> {
        let before = sqlx::query(
            "SELECT timestamp, usd_price FROM price_history \
             WHERE asset = $1 AND timestamp <= $2 ORDER BY timestamp DESC LIMIT 1",
        )
        .bind(asset)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?
        .map(|r| (r.get("timestamp"), r.get("usd_price")));

        let after = sqlx::query(
            "SELECT timestamp, usd_price FROM price_history \
             WHERE asset = $1 AND timestamp > $2 ORDER BY timestamp ASC LIMIT 1",
        )
        .bind(asset)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?
        .map(|r| (r.get("timestamp"), r.get("usd_price")));

        Ok((before, after))
    }

    pub async fn series(
        &self,
        asset: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<(DateTime<Utc>, Decimal)>> {
        let rows = sqlx::query(
            "SELECT timestamp, usd_price FROM price_history \
             WHERE asset = $1 AND timestamp BETWEEN $2 AND $3 ORDER BY timestamp ASC",
        )
        .bind(asset)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| (r.get("timestamp"), r.get("usd_price"))).collect())
    }
}
