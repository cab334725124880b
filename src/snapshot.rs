//! Last-known-good channel and guide snapshots
//!
//! The store holds two independently published sequences. Each publish is a
//! single atomic pointer swap ([`ArcSwapOption`]), so a reader sees either the
//! whole previous sequence or the whole new one. Readers never block and never
//! observe a sequence under construction.
//!
//! Both datasets start out *unset* (`None`), which is distinct from a
//! published empty sequence.

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::models::{Channel, EpgEntry};

/// A published, immutable dataset plus its publish metadata
#[derive(Debug)]
pub struct Published<T> {
    pub items: Vec<T>,
    pub version: u64,
    pub published_at: DateTime<Utc>,
}

/// One atomically replaceable dataset
#[derive(Debug)]
struct Slot<T> {
    current: ArcSwapOption<Published<T>>,
    seq: AtomicU64,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
            seq: AtomicU64::new(0),
        }
    }

    fn publish(&self, items: Vec<T>) -> u64 {
        let version = self.seq.fetch_add(1, Ordering::AcqRel) + 1;
        self.current.store(Some(Arc::new(Published {
            items,
            version,
            published_at: Utc::now(),
        })));
        version
    }

    fn load(&self) -> Option<Arc<Published<T>>> {
        self.current.load_full()
    }
}

/// Shared store written by the refresh pipeline and read by the serving layer
#[derive(Debug)]
pub struct SnapshotStore {
    channels: Slot<Channel>,
    epgs: Slot<EpgEntry>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            channels: Slot::new(),
            epgs: Slot::new(),
        }
    }

    /// Create a store wrapped in [`Arc`]
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Replace the channel snapshot, returning its version
    pub fn publish_channels(&self, channels: Vec<Channel>) -> u64 {
        self.channels.publish(channels)
    }

    /// Replace the guide snapshot, returning its version
    pub fn publish_epgs(&self, entries: Vec<EpgEntry>) -> u64 {
        self.epgs.publish(entries)
    }

    /// Current channel snapshot, `None` until the first publish
    pub fn load_channels(&self) -> Option<Arc<Published<Channel>>> {
        self.channels.load()
    }

    /// Current guide snapshot, `None` until the first publish
    pub fn load_epgs(&self) -> Option<Arc<Published<EpgEntry>>> {
        self.epgs.load()
    }

    /// Point-in-time summary of both datasets
    pub fn status(&self) -> SnapshotStatus {
        SnapshotStatus {
            channels: self.load_channels().map(|p| DatasetStatus::of(&p)),
            epgs: self.load_epgs().map(|p| DatasetStatus::of(&p)),
        }
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Metadata of one published dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetStatus {
    pub version: u64,
    pub len: usize,
    pub published_at: DateTime<Utc>,
}

impl DatasetStatus {
    fn of<T>(published: &Published<T>) -> Self {
        Self {
            version: published.version,
            len: published.items.len(),
            published_at: published.published_at,
        }
    }
}

/// Summary of the store; `None` means unset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotStatus {
    pub channels: Option<DatasetStatus>,
    pub epgs: Option<DatasetStatus>,
}

impl SnapshotStatus {
    /// Format as display string
    pub fn display(&self) -> String {
        fn line(name: &str, status: &Option<DatasetStatus>) -> String {
            match status {
                Some(s) => format!(
                    "{name}: {} (version {}, published {})\n",
                    s.len,
                    s.version,
                    s.published_at.to_rfc3339()
                ),
                None => format!("{name}: unset\n"),
            }
        }

        let mut output = String::from("Snapshot Status\n");
        output.push_str(&format!("{:-<40}\n", ""));
        output.push_str(&line("Channels", &self.channels));
        output.push_str(&line("EPG entries", &self.epgs));
        output
    }
}
