//! WalletMetricsDaily / CurrentWalletMetrics repository.

use chrono::{NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::types::{CurrentWalletMetrics, PortfolioPoint, RoiPoint, WalletMetricsDaily};
use crate::Result;

pub struct MetricsRepository {
    pool: PgPool,
}

impl MetricsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Full rebuild deletes and replaces the whole date range for the
    /// whale, then upserts `CurrentWalletMetrics` from the latest row.
    pub async fn replace_range(&self, whale_id: Uuid, rows: &[WalletMetricsDaily]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM wallet_metrics_daily WHERE whale_id = $1").bind(whale_id).execute(&mut *tx).await?;
        for row in rows {
            Self::upsert_daily_in_tx(&mut tx, row).await?;
        }
        if let Some(latest) = rows.last() {
            Self::upsert_current_in_tx(&mut tx, latest).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Incremental update only appends rows for dates `>=` the latest
    /// existing date — it never deletes.
    pub async fn append_incremental(&self, whale_id: Uuid, rows: &[WalletMetricsDaily]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for row in rows {
            Self::upsert_daily_in_tx(&mut tx, row).await?;
        }
        if let Some(latest) = rows.last() {
            Self::upsert_current_in_tx(&mut tx, latest).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn upsert_daily_in_tx(tx: &mut Transaction<'_, Postgres>, row: &WalletMetricsDaily) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO wallet_metrics_daily (
                whale_id, date, portfolio_value_usd, roi_percent, realized_pnl_usd,
                unrealized_pnl_usd, volume_1d_usd, trades_1d, win_rate_percent
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
            ON CONFLICT (whale_id, date) DO UPDATE SET
                portfolio_value_usd = EXCLUDED.portfolio_value_usd,
                roi_percent = EXCLUDED.roi_percent,
                realized_pnl_usd = EXCLUDED.realized_pnl_usd,
                unrealized_pnl_usd = EXCLUDED.unrealized_pnl_usd,
                volume_1d_usd = EXCLUDED.volume_1d_usd,
                trades_1d = EXCLUDED.trades_1d,
                win_rate_percent = EXCLUDED.win_rate_percent
            "#,
        )
        .bind(row.whale_id)
        .bind(row.date)
        .bind(row.portfolio_value_usd)
        .bind(row.roi_percent)
        .bind(row.realized_pnl_usd)
        .bind(row.unrealized_pnl_usd)
        .bind(row.volume_1d_usd)
        .bind(row.trades_1d)
        .bind(row.win_rate_percent)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn upsert_current_in_tx(tx: &mut Transaction<'_, Postgres>, latest: &WalletMetricsDaily) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO current_wallet_metrics (
                whale_id, as_of, portfolio_value_usd, roi_percent, realized_pnl_usd,
                unrealized_pnl_usd, volume_1d_usd, trades_1d, win_rate_percent
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
            ON CONFLICT (whale_id) DO UPDATE SET
                as_of = EXCLUDED.as_of,
                portfolio_value_usd = EXCLUDED.portfolio_value_usd,
                roi_percent = EXCLUDED.roi_percent,
                realized_pnl_usd = EXCLUDED.realized_pnl_usd,
                unrealized_pnl_usd = EXCLUDED.unrealized_pnl_usd,
                volume_1d_usd = EXCLUDED.volume_1d_usd,
                trades_1d = EXCLUDED.trades_1d,
                win_rate_percent = EXCLUDED.win_rate_percent
            "#,
        )
        .bind(latest.whale_id)
        .bind(Utc::now())
        .bind(latest.portfolio_value_usd)
        .bind(latest.roi_percent)
        .bind(latest.realized_pnl_usd)
        .bind(latest.unrealized_pnl_usd)
        .bind(latest.volume_1d_usd)
        .bind(latest.trades_1d)
        .bind(latest.win_rate_percent)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn latest_date(&self, whale_id: Uuid) -> Result<Option<NaiveDate>> {
        let date: Option<NaiveDate> =
            sqlx::query_scalar("SELECT MAX(date) FROM wallet_metrics_daily WHERE whale_id = $1")
                .bind(whale_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(date)
    }

    pub async fn current(&self, whale_id: Uuid) -> Result<Option<CurrentWalletMetrics>> {
        let row = sqlx::query(
            "SELECT whale_id, as_of, portfolio_value_usd, roi_percent, realized_pnl_usd, \
             unrealized_pnl_usd, volume_1d_usd, trades_1d, win_rate_percent \
             FROM current_wallet_metrics WHERE whale_id = $1",
        )
        .bind(whale_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| CurrentWalletMetrics {
            whale_id: r.get("whale_id"),
            as_of: r.get("as_of"),
            portfolio_value_usd: r.get("portfolio_value_usd"),
            roi_percent: r.get("roi_percent"),
            realized_pnl_usd: r.get("realized_pnl_usd"),
            unrealized_pnl_usd: r.get("unrealized_pnl_usd"),
            volume_1d_usd: r.get("volume_1d_usd"),
            trades_1d: r.get("trades_1d"),
            win_rate_percent: r.get("win_rate_percent"),
        }))
    }

    pub async fn roi_history(&self, whale_id: Uuid, since: NaiveDate) -> Result<Vec<RoiPoint>> {
        let rows = sqlx::query(
            "SELECT date, roi_percent FROM wallet_metrics_daily \
             WHERE whale_id = $1 AND date >= $2 ORDER BY date ASC",
        )
        .bind(whale_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| {
                let date: NaiveDate = r.get("date");
                RoiPoint {
                    timestamp: date.and_hms_opt(0, 0, 0).unwrap().and_utc(),
                    roi_percent: r.get("roi_percent"),
                }
            })
            .collect())
    }

    pub async fn portfolio_history(&self, whale_id: Uuid, since: NaiveDate) -> Result<Vec<PortfolioPoint>> {
        let rows = sqlx::query(
            "SELECT date, portfolio_value_usd FROM wallet_metrics_daily \
             WHERE whale_id = $1 AND date >= $2 ORDER BY date ASC",
        )
        .bind(whale_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| {
                let date: NaiveDate = r.get("date");
                PortfolioPoint {
                    timestamp: date.and_hms_opt(0, 0, 0).unwrap().and_utc(),
                    value_usd: r.get("portfolio_value_usd"),
                }
            })
            .collect())
    }
}
