//! JSON state files.
//!
//! Session history, the memory bank and metrics are each persisted as one
//! pretty-printed JSON document that is replaced wholesale on every write.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{StorageError, StorageResult};

/// Serialize `value` and replace the file at `path`, creating parent
/// directories as needed.
pub async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> StorageResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let content = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, content).await?;
    debug!(path = %path.display(), "state file written");
    Ok(())
}

/// Read and deserialize the file at `path`.
///
/// Returns [`StorageError::NotFound`] when the file does not exist.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> StorageResult<T> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StorageError::not_found(path));
        }
        Err(e) => return Err(e.into()),
    };

    let value = serde_json::from_str(&content)?;
    debug!(path = %path.display(), "state file loaded");
    Ok(value)
}

/// Parse an RFC 3339 timestamp, or an ISO 8601 one without an offset read
/// as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| raw.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc()))
}

/// Deserialize a timestamp with [`parse_timestamp`].
///
/// Missing, null or unparseable values become the Unix epoch.
pub(crate) fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(raw.as_str().and_then(parse_timestamp).unwrap_or_default())
}
