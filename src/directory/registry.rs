use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use crate::error::Error;

/// Reply sent when a keyword matches no advertised description.
pub const NO_MATCH_REPLY: &str = "No files found matching search";

/// Advertised connection speed of a host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionSpeed {
    Slow,
    Medium,
    Fast,
}

impl FromStr for ConnectionSpeed {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "slow" => Ok(Self::Slow),
            "medium" => Ok(Self::Medium),
            "fast" => Ok(Self::Fast),
            other => Err(Error::Speed(other.to_string())),
        }
    }
}

impl fmt::Display for ConnectionSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Slow => "slow",
            Self::Medium => "medium",
            Self::Fast => "fast",
        };
        f.write_str(label)
    }
}

/// One advertised file. Immutable once created; duplicates are permitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub owner: String,
    /// `host:port` the owning host's transfer responder listens on
    pub transfer_address: String,
    pub connection_speed: ConnectionSpeed,
    pub file_name: String,
    pub description: String,
}

impl FileEntry {
    /// The line this entry contributes to a search reply.
    pub fn search_line(&self) -> String {
        format!(
            "Filename: {} | Description: {} | Host: {} | Connection Speed: {}",
            self.file_name, self.description, self.transfer_address, self.connection_speed
        )
    }
}

/// The shared index of advertised files. Append-only while sessions
/// register, purged in bulk by transfer address when a session ends. All
/// access is serialized behind the inner mutex; no operation holds the lock
/// across an await point.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Mutex<Vec<FileEntry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one session's advertisements in order, as a single atomic
    /// batch.
    pub fn append(&self, batch: Vec<FileEntry>) {
        self.entries.lock().unwrap().extend(batch);
    }

    /// Entries whose description contains `keyword` (case-sensitive,
    /// plain substring), in registry order.
    pub fn search(&self, keyword: &str) -> Vec<FileEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.description.contains(keyword))
            .cloned()
            .collect()
    }

    /// The full reply message for a keyword search: one formatted line per
    /// match, or the no-match sentinel.
    pub fn search_reply(&self, keyword: &str) -> String {
        let matches = self.search(keyword);
        if matches.is_empty() {
            return NO_MATCH_REPLY.to_string();
        }
        matches
            .iter()
            .map(FileEntry::search_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Drop every entry advertised from `transfer_address`. Returns how
    /// many were removed.
    pub fn purge_host(&self, transfer_address: &str) -> usize {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|entry| entry.transfer_address != transfer_address);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A point-in-time copy of every entry, in registry order.
    pub fn snapshot(&self) -> Vec<FileEntry> {
        self.entries.lock().unwrap().clone()
    }
}
