//! Opaque cursor encoding for trade pagination.
//!
//! Callers must not parse the cursor; it is base64 of `(timestamp_micros,
//! id)`. The comparator is `timestamp DESC, id DESC`, so successive pages
//! are stable under concurrent inserts: a page boundary never duplicates or
//! skips a row whose timestamp preceded the first page's cursor.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub timestamp: DateTime<Utc>,
    pub id: Uuid,
}

impl Cursor {
    pub fn encode(&self) -> String {
        let raw = format!("{}:{}", self.timestamp.timestamp_micros(), self.id);
        URL_SAFE_NO_PAD.encode(raw)
    }

    pub fn decode(s: &str) -> Result<Self> {
        let raw = URL_SAFE_NO_PAD
            .decode(s)
            .map_err(|e| Error::DecodeError(format!("invalid cursor: {e}")))?;
        let raw = String::from_utf8(raw).map_err(|e| Error::DecodeError(format!("invalid cursor: {e}")))?;
        let (ts, id) = raw
            .split_once(':')
            .ok_or_else(|| Error::DecodeError("malformed cursor".to_string()))?;
        let micros: i64 = ts
            .parse()
            .map_err(|_| Error::DecodeError("malformed cursor timestamp".to_string()))?;
        let timestamp = Utc
            .timestamp_micros(micros)
            .single()
            .ok_or_else(|| Error::DecodeError("malformed cursor timestamp".to_string()))?;
        let id = Uuid::parse_str(id).map_err(|e| Error::DecodeError(format!("invalid cursor id: {e}")))?;
        Ok(Self { timestamp, id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let c = Cursor { timestamp: Utc::now(), id: Uuid::new_v4() };
        let encoded = c.encode();
        let decoded = Cursor::decode(&encoded).unwrap();
        assert_eq!(c.timestamp.timestamp_micros(), decoded.timestamp.timestamp_micros());
        assert_eq!(c.id, decoded.id);
    }

    #[test]
    fn rejects_garbage() {
        assert!(Cursor::decode("not-a-cursor!!").is_err());
    }
}
