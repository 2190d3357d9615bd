//! BacktestRun and CopierSession persistence.

use chrono::Utc;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::types::{BacktestParams, BacktestRun, CopierSession, CopierSessionState};
use crate::Result;

pub struct CopierRepository {
    pool: PgPool,
}

impl CopierRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn save_run(
        &self,
        whale_id: Uuid,
        params: &BacktestParams,
        roi_percent: rust_decimal::Decimal,
        max_drawdown_pct: rust_decimal::Decimal,
        trade_count: i64,
    ) -> Result<BacktestRun> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let params_json = serde_json::to_value(params)?;

        sqlx::query(
            r#"
            INSERT INTO backtest_runs (id, whale_id, params, roi_percent, max_drawdown_pct, trade_count, created_at)
            VALUES ($1,$2,$3,$4,$5,$6,$7)
            "#,
        )
        .bind(id)
        .bind(whale_id)
        .bind(&params_json)
        .bind(roi_percent)
        .bind(max_drawdown_pct)
        .bind(trade_count)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(BacktestRun { id, whale_id, params: params.clone(), roi_percent, max_drawdown_pct, trade_count, created_at })
    }

    pub async fn get_run(&self, id: Uuid) -> Result<Option<BacktestRun>> {
        let row = sqlx::query(
            "SELECT id, whale_id, params, roi_percent, max_drawdown_pct, trade_count, created_at \
             FROM backtest_runs WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| -> Result<BacktestRun> {
            let params: BacktestParams = serde_json::from_value(r.get("params"))?;
            Ok(BacktestRun {
                id: r.get("id"),
                whale_id: r.get("whale_id"),
                params,
                roi_percent: r.get("roi_percent"),
                max_drawdown_pct: r.get("max_drawdown_pct"),
                trade_count: r.get("trade_count"),
                created_at: r.get("created_at"),
            })
        })
        .transpose()
    }

    pub async fn create_session(&self, whale_id: Uuid, run_id: Uuid) -> Result<CopierSession> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO copier_sessions (id, whale_id, run_id, state, processed_trades, notifications, errors, created_at)
            VALUES ($1,$2,$3,'active',0,'[]','[]',$4)
            "#,
        )
        .bind(id)
        .bind(whale_id)
        .bind(run_id)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(CopierSession {
            id,
            whale_id,
            run_id,
            state: CopierSessionState::Active,
            processed_trades: 0,
            last_seen_trade_at: None,
            notifications: vec![],
            errors: vec![],
            created_at,
        })
    }

    pub async fn update_session(&self, session: &CopierSession) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE copier_sessions SET
                state = $2, processed_trades = $3, last_seen_trade_at = $4,
                notifications = $5, errors = $6
            WHERE id = $1
            "#,
        )
        .bind(session.id)
        .bind(session.state)
        .bind(session.processed_trades)
        .bind(session.last_seen_trade_at)
        .bind(serde_json::to_value(&session.notifications)?)
        .bind(serde_json::to_value(&session.errors)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_session(&self, id: Uuid) -> Result<Option<CopierSession>> {
        let row = sqlx::query(
            "SELECT id, whale_id, run_id, state, processed_trades, last_seen_trade_at, \
             notifications, errors, created_at FROM copier_sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_session).transpose()
    }

    pub async fn list_active(&self, whale_id: Uuid) -> Result<Vec<CopierSession>> {
        let rows = sqlx::query(
            "SELECT id, whale_id, run_id, state, processed_trades, last_seen_trade_at, \
             notifications, errors, created_at FROM copier_sessions \
             WHERE whale_id = $1 AND state = 'active' ORDER BY created_at DESC",
        )
        .bind(whale_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_session).collect()
    }

    fn row_to_session(r: sqlx::postgres::PgRow) -> Result<CopierSession> {
        Ok(CopierSession {
            id: r.get("id"),
            whale_id: r.get("whale_id"),
            run_id: r.get("run_id"),
            state: r.get("state"),
            processed_trades: r.get("processed_trades"),
            last_seen_trade_at: r.get("last_seen_trade_at"),
            notifications: serde_json::from_value(r.get("notifications"))?,
            errors: serde_json::from_value(r.get("errors"))?,
            created_at: r.get("created_at"),
        })
    }
}
