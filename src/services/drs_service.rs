//! DrsService — object lookup and access-URL issuance backed by SQLite for
//! metadata and an S3-compatible store for the payload bytes.

use crate::{
    models::{
        drs::{AccessUrl, DrsObject, S3_ACCESS_ID},
        drs_object::{DrsObjectRecord, NewDrsObject},
        event::DownloadRequested,
    },
    services::{
        events::EventPublisher,
        object_store::{ObjectStore, ObjectStoreError, rewrite_public_url},
    },
};
use sqlx::SqlitePool;
use std::{io, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DrsError {
    #[error("object `{0}` not found")]
    ObjectNotFound(String),
    #[error("access method `{0}` is not supported")]
    UnsupportedAccessMethod(String),
    #[error("object `{0}` already exists")]
    ObjectAlreadyExists(String),
    #[error(transparent)]
    ObjectStore(#[from] ObjectStoreError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type DrsResult<T> = Result<T, DrsError>;

/// Values the service needs from the configuration.
#[derive(Clone, Debug)]
pub struct DrsSettings {
    /// Prefix of every `self_uri`.
    pub drs_path: String,
    /// Storage-internal endpoint present in freshly signed URLs.
    pub s3_url: String,
    /// Endpoint clients can reach.
    pub s3_public_url: String,
    pub presign_expiry: Duration,
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct DrsService {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Store that signs download URLs.
    pub store: Arc<dyn ObjectStore>,

    pub events: EventPublisher,

    pub settings: DrsSettings,
}

const SELECT_OBJECT: &str = "SELECT id, drs_id, path, size, created_time, checksum_md5
     FROM drs_objects WHERE drs_id = ?";

impl DrsService {
    pub fn new(
        db: Arc<SqlitePool>,
        store: Arc<dyn ObjectStore>,
        events: EventPublisher,
        settings: DrsSettings,
    ) -> Self {
        Self {
            db,
            store,
            events,
            settings,
        }
    }

    /// Fetch the record for `drs_id`.
    ///
    /// Returns ObjectNotFound if no row matches.
    pub async fn fetch_object(&self, drs_id: &str) -> DrsResult<DrsObjectRecord> {
        sqlx::query_as::<_, DrsObjectRecord>(SELECT_OBJECT)
            .bind(drs_id)
            .fetch_optional(&*self.db)
            .await?
            .ok_or_else(|| DrsError::ObjectNotFound(drs_id.to_string()))
    }

    /// Metadata for `drs_id` in DRS shape.
    pub async fn get_drs_object(&self, drs_id: &str) -> DrsResult<DrsObject> {
        let record = self.fetch_object(drs_id).await?;
        Ok(DrsObject::from_record(&record, &self.settings.drs_path))
    }

    /// Issue a time-limited download URL for `drs_id` through `access_id`.
    ///
    /// - Unknown object: ObjectNotFound
    /// - Any access id but `s3`: UnsupportedAccessMethod
    /// - Publishes a download notification before signing; its outcome does
    ///   not affect the result.
    pub async fn get_access_url(
        &self,
        drs_id: &str,
        access_id: &str,
        user_id: &str,
    ) -> DrsResult<AccessUrl> {
        let record = self.fetch_object(drs_id).await?;

        if access_id != S3_ACCESS_ID {
            return Err(DrsError::UnsupportedAccessMethod(access_id.to_string()));
        }

        self.events.publish(DownloadRequested::new(
            self.events.topic(),
            drs_id,
            access_id,
            user_id,
        ));

        let signed = self
            .store
            .presign_get(&record.path, self.settings.presign_expiry)
            .await?;
        let url = rewrite_public_url(
            &signed,
            &self.settings.s3_url,
            &self.settings.s3_public_url,
        );

        debug!(drs_id = %drs_id, key = %record.path, "issued access URL");
        Ok(AccessUrl { url })
    }

    /// Insert a new record. Identifiers are never overwritten.
    pub async fn insert_object(&self, object: &NewDrsObject) -> DrsResult<DrsObjectRecord> {
        sqlx::query_as::<_, DrsObjectRecord>(
            "INSERT INTO drs_objects (drs_id, path, size, created_time, checksum_md5)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id, drs_id, path, size, created_time, checksum_md5",
        )
        .bind(&object.drs_id)
        .bind(&object.path)
        .bind(object.size)
        .bind(object.created_time)
        .bind(&object.checksum_md5)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                DrsError::ObjectAlreadyExists(object.drs_id.clone())
            } else {
                DrsError::Sqlx(err)
            }
        })
    }

    /// Delete every record, or only those whose identifier starts with `prefix`.
    pub async fn delete_objects(&self, prefix: Option<&str>) -> DrsResult<u64> {
        let result = match prefix {
            Some(prefix) => {
                sqlx::query("DELETE FROM drs_objects WHERE substr(drs_id, 1, length(?1)) = ?1")
                    .bind(prefix)
                    .execute(&*self.db)
                    .await?
            }
            None => {
                sqlx::query("DELETE FROM drs_objects")
                    .execute(&*self.db)
                    .await?
            }
        };

        debug!(prefix = ?prefix, deleted = result.rows_affected(), "deleted object records");
        Ok(result.rows_affected())
    }

    /// Cheap round trip to the database for readiness checks.
    pub async fn ping(&self) -> DrsResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;
        Ok(())
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.is_unique_violation()
    )
}
