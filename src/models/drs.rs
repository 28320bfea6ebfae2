//! JSON bodies of the DRS endpoints.

use super::drs_object::DrsObjectRecord;
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

/// The only access method this server issues URLs for.
pub const S3_ACCESS_ID: &str = "s3";

/// Metadata returned by `GET <api_route>/objects/{object_id}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DrsObject {
    pub id: String,
    pub self_uri: String,
    pub size: i64,
    /// ISO-8601, UTC, `Z` suffix.
    pub created_time: String,
    pub checksums: Vec<Checksum>,
    pub access_methods: Vec<AccessMethod>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Checksum {
    pub checksum: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AccessMethod {
    #[serde(rename = "type")]
    pub kind: String,
    pub access_id: String,
}

/// Body of `GET <api_route>/objects/{object_id}/access/{access_id}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AccessUrl {
    pub url: String,
}

/// Error body shared by every failing route.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorBody {
    pub msg: String,
    pub status_code: u16,
}

impl DrsObject {
    /// Build the response for `record`; `self_uri` is `drs_path` followed by the identifier.
    pub fn from_record(record: &DrsObjectRecord, drs_path: &str) -> Self {
        Self {
            id: record.drs_id.clone(),
            self_uri: format!("{}{}", drs_path, record.drs_id),
            size: record.size,
            created_time: record
                .created_time
                .to_rfc3339_opts(SecondsFormat::AutoSi, true),
            checksums: vec![Checksum {
                checksum: record.checksum_md5.clone(),
                kind: "md5".into(),
            }],
            access_methods: vec![AccessMethod {
                kind: S3_ACCESS_ID.into(),
                access_id: S3_ACCESS_ID.into(),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn serializes_in_drs_shape() {
        let record = DrsObjectRecord {
            id: 1,
            drs_id: "Test1.txt".into(),
            path: "Test1.txt".into(),
            size: 12,
            created_time: Utc.with_ymd_and_hms(2021, 8, 6, 16, 16, 12).unwrap(),
            checksum_md5: "6f5902ac237024bdd0c176cb93063dc4".into(),
        };

        let body = serde_json::to_value(DrsObject::from_record(&record, "drs://localhost:8080/"))
            .unwrap();

        assert_eq!(
            body,
            json!({
                "id": "Test1.txt",
                "self_uri": "drs://localhost:8080/Test1.txt",
                "size": 12,
                "created_time": "2021-08-06T16:16:12Z",
                "checksums": [{"checksum": "6f5902ac237024bdd0c176cb93063dc4", "type": "md5"}],
                "access_methods": [{"type": "s3", "access_id": "s3"}],
            })
        );
    }

    #[test]
    fn keeps_fractional_seconds() {
        let record = DrsObjectRecord {
            id: 1,
            drs_id: "a".into(),
            path: "a".into(),
            size: 0,
            created_time: Utc
                .with_ymd_and_hms(2021, 8, 6, 16, 16, 12)
                .unwrap()
                .checked_add_signed(chrono::Duration::microseconds(423_573))
                .unwrap(),
            checksum_md5: String::new(),
        };

        let obj = DrsObject::from_record(&record, "");
        assert_eq!(obj.created_time, "2021-08-06T16:16:12.423573Z");
    }
}
