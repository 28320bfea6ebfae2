//! JSON manifest entries consumed by `populate --manifest`.

use super::drs_object::NewDrsObject;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, de};

/// One element of the manifest array.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct ManifestEntry {
    pub drs_id: String,
    pub path: String,
    pub size: i64,
    #[serde(deserialize_with = "deserialize_created_time")]
    pub created_time: DateTime<Utc>,
    pub checksum_md5: String,
}

impl From<ManifestEntry> for NewDrsObject {
    fn from(entry: ManifestEntry) -> Self {
        Self {
            drs_id: entry.drs_id,
            path: entry.path,
            size: entry.size,
            created_time: entry.created_time,
            checksum_md5: entry.checksum_md5.to_ascii_lowercase(),
        }
    }
}

/// Accept RFC 3339, or a naive timestamp taken as UTC.
pub fn parse_created_time(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

fn deserialize_created_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_created_time(&raw)
        .ok_or_else(|| de::Error::custom(format!("invalid created_time `{}`", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_naive_and_offset_timestamps() {
        let expected = Utc.with_ymd_and_hms(2021, 8, 5, 12, 0, 0).unwrap();
        assert_eq!(parse_created_time("2021-08-05T12:00:00"), Some(expected));
        assert_eq!(parse_created_time("2021-08-05T12:00:00Z"), Some(expected));
        assert_eq!(parse_created_time("2021-08-05T14:00:00+02:00"), Some(expected));
        assert_eq!(parse_created_time("2021-08-05 12:00:00.000"), Some(expected));
        assert_eq!(parse_created_time("yesterday"), None);
    }

    #[test]
    fn manifest_rejects_bad_timestamp() {
        let raw =
            r#"[{"drs_id":"a","path":"a","size":1,"created_time":"nope","checksum_md5":"x"}]"#;
        let err = serde_json::from_str::<Vec<ManifestEntry>>(raw).unwrap_err();
        assert!(err.to_string().contains("invalid created_time"));
    }
}
