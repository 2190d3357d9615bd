//! Event inserts and recency queries.

use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::types::{Event, NewEvent};
use crate::Result;

pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, event: &NewEvent) -> Result<Event> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO events (id, whale_id, timestamp, event_type, summary, value_usd, tx_hash, details)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
            "#,
        )
        .bind(id)
        .bind(event.whale_id)
        .bind(event.timestamp)
        .bind(event.event_type)
        .bind(&event.summary)
        .bind(event.value_usd)
        .bind(&event.tx_hash)
        .bind(&event.details)
        .execute(&self.pool)
        .await?;

        Ok(Event {
            id,
            whale_id: event.whale_id,
            timestamp: event.timestamp,
            event_type: event.event_type,
            summary: event.summary.clone(),
            value_usd: event.value_usd,
            tx_hash: event.tx_hash.clone(),
            details: event.details.clone(),
        })
    }

    pub async fn recent(&self, since: Option<chrono::DateTime<chrono::Utc>>, limit: i64) -> Result<Vec<Event>> {
        let rows = sqlx::query(
            r#"
            SELECT id, whale_id, timestamp, event_type, summary, value_usd, tx_hash, details
            FROM events
            WHERE ($1::timestamptz IS NULL OR timestamp > $1)
            ORDER BY timestamp DESC
            LIMIT $2
            "#,
        )
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::row_to_event).collect())
    }

    fn row_to_event(r: &sqlx::postgres::PgRow) -> Event {
        Event {
            id: r.get("id"),
            whale_id: r.get("whale_id"),
            timestamp: r.get("timestamp"),
            event_type: r.get("event_type"),
            summary: r.get("summary"),
            value_usd: r.get("value_usd"),
            tx_hash: r.get("tx_hash"),
            details: r.get("details"),
        }
    }
}
