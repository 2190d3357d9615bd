//! Error taxonomy for the whale tracker system.
//!
//! Variants map onto the kinds described in the error handling design:
//! transport failures are recoverable by the caller, decode/conflict errors
//! are per-record and must not poison a batch, and `Invariant` is fatal for
//! the operation that raised it.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("configuration error: {message}")]
    Config { message: String },

    /// Source API or price oracle transport failure. The caller retries on
    /// the next tick with backoff; never abort the batch over this.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// 429 / throttling. Tick ends without advancing its checkpoint.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// A single source record could not be parsed. The record is skipped,
    /// not the batch.
    #[error("decode error: {0}")]
    DecodeError(String),

    /// Duplicate `(whale, tx_hash)` absorbed by the unique constraint. Not
    /// surfaced as a failure to callers — kept as a variant so collectors
    /// can count it without mistaking it for a real error.
    #[error("conflict skipped: {0}")]
    ConflictSkipped(String),

    /// Whale missing on write, or unknown wallet on a read API.
    #[error("not found: {0}")]
    NotFound(String),

    /// A second backfill/reset request arrived while one is already
    /// running for this whale. Callers should surface the current status,
    /// not a failure.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An internal contract was broken (e.g. negative equity after a buy).
    /// Fatal for the operation; the caller marks whatever job raised it as
    /// `error` and carries this message forward.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, Error>;
