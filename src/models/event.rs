//! Notification emitted whenever an access URL is issued.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DownloadRequested {
    pub event_id: Uuid,
    pub topic: String,
    pub drs_id: String,
    pub access_id: String,
    pub user_id: String,
    pub requested_at: DateTime<Utc>,
}

impl DownloadRequested {
    pub fn new(
        topic: impl Into<String>,
        drs_id: impl Into<String>,
        access_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            topic: topic.into(),
            drs_id: drs_id.into(),
            access_id: access_id.into(),
            user_id: user_id.into(),
            requested_at: Utc::now(),
        }
    }
}
