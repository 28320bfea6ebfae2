//! Populate and cleanup utilities.
//!
//! A directory scan yields one record per regular file (non-recursive); a
//! JSON manifest lists the records directly.

use crate::{
    models::{drs_object::NewDrsObject, manifest::ManifestEntry},
    services::drs_service::{DrsError, DrsResult, DrsService},
};
use anyhow::{Context as _, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use md5::Context;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

/// A record to insert, with the local file it came from when known.
#[derive(Clone, Debug)]
pub struct PopulateEntry {
    pub object: NewDrsObject,
    pub source: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PopulateReport {
    pub inserted: usize,
    pub skipped: usize,
    pub uploaded: usize,
}

/// Lowercase hex MD5 of a file, computed while streaming it.
pub async fn md5_file(path: &Path) -> DrsResult<String> {
    let file = File::open(path).await?;
    let mut stream = ReaderStream::new(file);
    let mut digest = Context::new();

    while let Some(chunk) = stream.next().await {
        digest.consume(&chunk?);
    }

    Ok(format!("{:x}", digest.compute()))
}

/// One entry per regular file in `dir`, sorted by file name.
///
/// The identifier is the file name; the storage key is `key_prefix` + file name.
pub async fn scan_directory(dir: &Path, key_prefix: &str) -> DrsResult<Vec<PopulateEntry>> {
    let mut entries = Vec::new();
    let mut read_dir = fs::read_dir(dir).await?;

    while let Some(entry) = read_dir.next_entry().await? {
        let meta = entry.metadata().await?;
        if !meta.is_file() {
            continue;
        }

        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            warn!(path = %entry.path().display(), "skipping file with non UTF-8 name");
            continue;
        };

        let path = entry.path();
        let created: DateTime<Utc> = meta.created().or_else(|_| meta.modified())?.into();

        entries.push(PopulateEntry {
            object: NewDrsObject {
                path: format!("{}{}", key_prefix, name),
                size: meta.len() as i64,
                created_time: created,
                checksum_md5: md5_file(&path).await?,
                drs_id: name,
            },
            source: Some(path),
        });
    }

    entries.sort_by(|a, b| a.object.drs_id.cmp(&b.object.drs_id));
    Ok(entries)
}

/// Entries from a JSON manifest (an array of records).
pub async fn read_manifest(path: &Path) -> Result<Vec<PopulateEntry>> {
    let text = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading manifest `{}`", path.display()))?;
    let records: Vec<ManifestEntry> = serde_json::from_str(&text)
        .with_context(|| format!("parsing manifest `{}`", path.display()))?;

    Ok(records
        .into_iter()
        .map(|record| PopulateEntry {
            object: record.into(),
            source: None,
        })
        .collect())
}

/// Insert every entry. Existing identifiers are skipped; with `upload`, the
/// bytes are stored in the bucket before the record is inserted, so a failed
/// upload leaves no record behind and a rerun retries it.
pub async fn populate(
    service: &DrsService,
    entries: Vec<PopulateEntry>,
    upload: bool,
) -> DrsResult<PopulateReport> {
    let mut report = PopulateReport::default();

    for entry in entries {
        let drs_id = &entry.object.drs_id;
        match service.fetch_object(drs_id).await {
            Ok(_) => {
                report.skipped += 1;
                warn!(drs_id = %drs_id, "object already exists, skipping");
                continue;
            }
            Err(DrsError::ObjectNotFound(_)) => {}
            Err(err) => return Err(err),
        }

        let mut uploaded = false;
        if let (true, Some(source)) = (upload, entry.source.as_deref()) {
            let content = Bytes::from(fs::read(source).await?);
            service.store.put(&entry.object.path, content).await?;
            uploaded = true;
        }

        match service.insert_object(&entry.object).await {
            Ok(record) => {
                report.inserted += 1;
                if uploaded {
                    report.uploaded += 1;
                }
                info!(drs_id = %record.drs_id, size = record.size, uploaded, "inserted object record");
            }
            Err(DrsError::ObjectAlreadyExists(id)) => {
                report.skipped += 1;
                warn!(drs_id = %id, "object already exists, skipping");
            }
            Err(err) => return Err(err),
        }
    }

    Ok(report)
}
