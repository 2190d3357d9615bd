//! Append-only Trade store: upsert-on-replay, cursor-paginated reads.

use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use super::cursor::Cursor;
use crate::types::{NewTrade, Trade, TradeFilters};
use crate::Result;

pub struct TradeRepository {
    pool: PgPool,
}

impl TradeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert within a caller-supplied transaction so a batch's inserts and
    /// its checkpoint advance commit atomically. `tx_hash`-bearing trades
    /// upsert on conflict instead of erroring — replays are expected.
    pub async fn upsert_in_tx(&self, tx: &mut Transaction<'_, Postgres>, trade: &NewTrade) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let row = sqlx::query(
            r#"
            INSERT INTO trades (
                id, whale_id, timestamp, source, platform, direction, base_asset,
                quote_asset, base_amount, quote_amount, usd_notional,
                realized_pnl_usd, realized_pnl_percent, open_price, close_price,
                tx_hash, catalog_version
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17)
            ON CONFLICT (whale_id, tx_hash) WHERE tx_hash IS NOT NULL
            DO UPDATE SET
                realized_pnl_usd = EXCLUDED.realized_pnl_usd,
                realized_pnl_percent = EXCLUDED.realized_pnl_percent,
                usd_notional = EXCLUDED.usd_notional
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(trade.whale_id)
        .bind(trade.timestamp)
        .bind(trade.source)
        .bind(&trade.platform)
        .bind(trade.direction)
        .bind(&trade.base_asset)
        .bind(&trade.quote_asset)
        .bind(trade.base_amount)
        .bind(trade.quote_amount)
        .bind(trade.usd_notional)
        .bind(trade.realized_pnl_usd)
        .bind(trade.realized_pnl_percent)
        .bind(trade.open_price)
        .bind(trade.close_price)
        .bind(&trade.tx_hash)
        .bind(trade.catalog_version)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row.get("id"))
    }

    pub async fn query(
        &self,
        whale_id: Uuid,
        filters: &TradeFilters,
        cursor: Option<&str>,
        limit: i64,
    ) -> Result<(Vec<Trade>, Option<String>, i64)> {
        let cursor = cursor.map(Cursor::decode).transpose()?;

        let rows = sqlx::query(
            r#"
            SELECT id, whale_id, timestamp, source, platform, direction, base_asset,
                   quote_asset, base_amount, quote_amount, usd_notional,
                   realized_pnl_usd, realized_pnl_percent, open_price, close_price,
                   tx_hash, catalog_version
            FROM trades
            WHERE whale_id = $1
              AND ($2::text IS NULL OR source = $2)
              AND ($3::text IS NULL OR direction = $3)
              AND ($4::timestamptz IS NULL OR timestamp <= $4)
              AND ($5::uuid IS NULL OR (timestamp, id) < ($4, $5))
            ORDER BY timestamp DESC, id DESC
            LIMIT $6
            "#,
        )
        .bind(whale_id)
        .bind(filters.source)
        .bind(filters.direction)
        .bind(cursor.map(|c| c.timestamp))
        .bind(cursor.map(|c| c.id))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let trades: Vec<Trade> = rows.iter().map(Self::row_to_trade).collect();
        let next_cursor = trades.last().map(|t| Cursor { timestamp: t.timestamp, id: t.id }.encode());

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM trades WHERE whale_id = $1 \
             AND ($2::text IS NULL OR source = $2) AND ($3::text IS NULL OR direction = $3)",
        )
        .bind(whale_id)
        .bind(filters.source)
        .bind(filters.direction)
        .fetch_one(&self.pool)
        .await?;

        Ok((trades, next_cursor, total))
    }

    pub async fn all_ordered(&self, whale_id: Uuid) -> Result<Vec<Trade>> {
        let rows = sqlx::query(
            r#"
            SELECT id, whale_id, timestamp, source, platform, direction, base_asset,
                   quote_asset, base_amount, quote_amount, usd_notional,
                   realized_pnl_usd, realized_pnl_percent, open_price, close_price,
                   tx_hash, catalog_version
            FROM trades WHERE whale_id = $1 ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(whale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::row_to_trade).collect())
    }

    fn row_to_trade(r: &sqlx::postgres::PgRow) -> Trade {
        Trade {
            id: r.get("id"),
            whale_id: r.get("whale_id"),
            timestamp: r.get("timestamp"),
            source: r.get("source"),
            platform: r.get("platform"),
            direction: r.get("direction"),
            base_asset: r.get("base_asset"),
            quote_asset: r.get("quote_asset"),
            base_amount: r.get("base_amount"),
            quote_amount: r.get("quote_amount"),
            usd_notional: r.get("usd_notional"),
            realized_pnl_usd: r.get("realized_pnl_usd"),
            realized_pnl_percent: r.get("realized_pnl_percent"),
            open_price: r.get("open_price"),
            close_price: r.get("close_price"),
            tx_hash: r.get("tx_hash"),
            catalog_version: r.get("catalog_version"),
        }
    }
}
