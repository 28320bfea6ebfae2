//! Represents a stored object record — the single persisted entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row of `drs_objects`.
///
/// The record describes bytes held in the object store; the bytes themselves
/// never pass through this service.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct DrsObjectRecord {
    /// Surrogate key for DB indexing.
    pub id: i64,

    /// External identifier, unique and immutable once created.
    pub drs_id: String,

    /// Object-store key of the payload.
    pub path: String,

    /// Size in bytes.
    pub size: i64,

    /// When the underlying file was created.
    pub created_time: DateTime<Utc>,

    /// Lowercase hex MD5 of the payload.
    pub checksum_md5: String,
}

/// Insert payload for a new record.
#[derive(Clone, Debug, PartialEq)]
pub struct NewDrsObject {
    pub drs_id: String,
    pub path: String,
    pub size: i64,
    pub created_time: DateTime<Utc>,
    pub checksum_md5: String,
}
