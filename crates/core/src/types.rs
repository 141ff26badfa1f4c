/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Calendar dates stored in sealed columns (`YYYY-MM-DD`).
pub type Date = chrono::NaiveDate;
