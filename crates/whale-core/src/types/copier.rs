//! Stored copier backtest configuration/results and live session records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestParams {
    pub initial_deposit: Decimal,
    pub position_pct: Decimal,
    pub fee_bps: Decimal,
    pub slippage_bps: Decimal,
    pub leverage: Decimal,
    pub assets: Option<Vec<String>>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestRun {
    pub id: Uuid,
    pub whale_id: Uuid,
    pub params: BacktestParams,
    pub roi_percent: Decimal,
    pub max_drawdown_pct: Decimal,
    pub trade_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
#[serde(rename_all = "lowercase")]
pub enum CopierSessionState {
    Created,
    Active,
    Stopped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopierSession {
    pub id: Uuid,
    pub whale_id: Uuid,
    pub run_id: Uuid,
    pub state: CopierSessionState,
    pub processed_trades: i64,
    pub last_seen_trade_at: Option<DateTime<Utc>>,
    pub notifications: Vec<String>,
    pub errors: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl CopierSession {
    /// Bounded ring buffers — the live loop pushes and truncates rather
    /// than growing these without limit across a long-lived session.
    pub const MAX_NOTIFICATIONS: usize = 100;
    pub const MAX_ERRORS: usize = 50;

    pub fn push_notification(&mut self, message: String) {
        self.notifications.push(message);
        if self.notifications.len() > Self::MAX_NOTIFICATIONS {
            self.notifications.remove(0);
        }
    }

    pub fn push_error(&mut self, message: String) {
        self.errors.push(message);
        if self.errors.len() > Self::MAX_ERRORS {
            self.errors.remove(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> CopierSession {
        CopierSession {
            id: Uuid::new_v4(),
            whale_id: Uuid::new_v4(),
            run_id: Uuid::new_v4(),
            state: CopierSessionState::Active,
            processed_trades: 0,
            last_seen_trade_at: None,
            notifications: vec![],
            errors: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn notification_ring_buffer_caps_length() {
        let mut s = session();
        for i in 0..(CopierSession::MAX_NOTIFICATIONS + 10) {
            s.push_notification(format!("n{i}"));
        }
        assert_eq!(s.notifications.len(), CopierSession::MAX_NOTIFICATIONS);
        assert_eq!(s.notifications.first().unwrap(), "n10");
    }
}
