//! JSON persistence of a broker and its in-memory ledger.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BetBroker, InMemoryLedger};

/// Default snapshot location used by the CLI.
pub const DEFAULT_SNAPSHOT_PATH: &str = "./betbroker.json";

/// Serialized state of a broker together with the ledger it runs on.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Snapshot {
    /// When the snapshot was taken
    pub saved_at: DateTime<Utc>,

    /// Broker state, including its ledger
    pub broker: BetBroker<InMemoryLedger>,
}

impl Snapshot {
    pub fn new(broker: BetBroker<InMemoryLedger>) -> Self {
        Self {
            saved_at: Utc::now(),
            broker,
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("serializing snapshot")
    }

    /// Parses a snapshot and checks the restored broker's invariants.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let snapshot: Self = serde_json::from_str(json).context("parsing snapshot JSON")?;
        snapshot
            .broker
            .validate()
            .context("snapshot holds inconsistent broker state")?;
        Ok(snapshot)
    }
}

/// Reads a snapshot from `path`.
///
/// # Errors
///
/// Returns an `anyhow::Error` if the file cannot be read or parsed.
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> anyhow::Result<Snapshot> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("loading snapshot: {:?}", path))?;
    Snapshot::from_json(&content).with_context(|| format!("in {:?}", path))
}

/// Writes `snapshot` as pretty-printed JSON to `path`, refreshing `saved_at`.
///
/// The JSON is written and synced to [`staging_path`] first, then renamed over
/// `path`, so an interrupted save leaves the previous snapshot intact.
///
/// # Errors
///
/// Returns an `anyhow::Error` if the file cannot be created or written.
pub fn save_snapshot<P: AsRef<Path>>(path: P, snapshot: &mut Snapshot) -> anyhow::Result<()> {
    let path = path.as_ref();
    let staging = staging_path(path);
    snapshot.saved_at = Utc::now();

    let file = File::create(&staging).with_context(|| format!("creating file {:?}", staging))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &*snapshot)
        .with_context(|| format!("serializing snapshot to {:?}", staging))?;
    writer.flush()?;
    writer
        .get_ref()
        .sync_all()
        .with_context(|| format!("syncing {:?}", staging))?;
    drop(writer);

    std::fs::rename(&staging, path)
        .with_context(|| format!("replacing {:?} with {:?}", path, staging))
}

/// Sibling of `path` that a new snapshot is written to before replacing it.
pub fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| OsString::from("betbroker"));
    name.push(".tmp");
    path.with_file_name(name)
}
