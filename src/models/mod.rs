//! Data models for the DRS metadata server.
//!
//! `drs_object` maps the database table via `sqlx::FromRow`; the remaining
//! modules are the JSON shapes exchanged over HTTP, on the notification
//! topic, and in populate manifests.

pub mod drs;
pub mod drs_object;
pub mod event;
pub mod manifest;
