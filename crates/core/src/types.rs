/// Primary key type for every table (`BIGSERIAL`).
pub type DbId = i64;

/// Timestamps are always stored and exchanged in UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
