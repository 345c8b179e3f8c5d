//! File-backed inbox collaborator.
//!
//! The engine consumes a historical SMS inbox snapshot, not a live stream;
//! on the command line that snapshot is a JSON file of
//! `{sender, body, timestamp_millis}` objects exported from the phone.

use std::path::PathBuf;

use engine::{InboxError, InboxProvider, RawSmsMessage};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct SnapshotMessage {
    sender: String,
    body: String,
    timestamp_millis: i64,
}

#[derive(Clone, Debug)]
pub struct JsonInbox {
    path: PathBuf,
}

impl JsonInbox {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl InboxProvider for JsonInbox {
    async fn list_inbox(&self, max_count: usize) -> Result<Vec<RawSmsMessage>, InboxError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|err| {
            let detail = format!("{}: {err}", self.path.display());
            match err.kind() {
                std::io::ErrorKind::PermissionDenied => InboxError::PermissionDenied(detail),
                _ => InboxError::Unavailable(detail),
            }
        })?;

        let snapshot: Vec<SnapshotMessage> = serde_json::from_str(&raw)
            .map_err(|err| InboxError::Unavailable(format!("malformed snapshot: {err}")))?;

        Ok(snapshot
            .into_iter()
            .take(max_count)
            .map(|m| RawSmsMessage {
                sender: m.sender,
                body: m.body,
                timestamp_millis: m.timestamp_millis,
            })
            .collect())
    }
}
