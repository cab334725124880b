//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::subscriber::DefaultGuard;

use epgsync::models::ChannelId;
use epgsync::source::DataSource;
use epgsync::utils::error::FetchError;

/// In-memory data source with failure injection and concurrency accounting
#[derive(Default)]
pub struct MockSource {
    directory: Mutex<Option<String>>,
    guides: HashMap<String, String>,
    failing: HashSet<String>,
    delay: Duration,

    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    directory_calls: AtomicUsize,
    guide_calls: Mutex<Vec<String>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve this directory payload; `None` makes the directory fetch fail
    pub fn with_directory(self, body: impl Into<String>) -> Self {
        *self.directory.lock().unwrap() = Some(body.into());
        self
    }

    pub fn with_guide(mut self, channel_id: &str, body: impl Into<String>) -> Self {
        self.guides.insert(channel_id.to_string(), body.into());
        self
    }

    /// Make the guide fetch of `channel_id` fail
    pub fn failing(mut self, channel_id: &str) -> Self {
        self.failing.insert(channel_id.to_string());
        self
    }

    /// Hold every guide fetch for `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Swap the directory payload between runs; `None` breaks it
    pub fn set_directory(&self, body: Option<String>) {
        *self.directory.lock().unwrap() = body;
    }

    /// Highest number of guide fetches observed in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn directory_calls(&self) -> usize {
        self.directory_calls.load(Ordering::SeqCst)
    }

    /// Channel ids of every guide fetch, in call order
    pub fn guide_calls(&self) -> Vec<String> {
        self.guide_calls.lock().unwrap().clone()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DataSource for MockSource {
    async fn fetch_directory(&self) -> Result<Bytes, FetchError> {
        self.directory_calls.fetch_add(1, Ordering::SeqCst);
        let body = self.directory.lock().unwrap().clone();
        body.map(Bytes::from)
            .ok_or_else(|| FetchError::Unavailable("directory down".to_string()))
    }

    async fn fetch_guide(&self, channel_id: &ChannelId) -> Result<Bytes, FetchError> {
        self.guide_calls
            .lock()
            .unwrap()
            .push(channel_id.as_str().to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        } else {
            tokio::task::yield_now().await;
        }

        if self.failing.contains(channel_id.as_str()) {
            return Err(FetchError::Status(503));
        }

        Ok(Bytes::from(
            self.guides
                .get(channel_id.as_str())
                .cloned()
                .unwrap_or_else(|| "[]".to_string()),
        ))
    }
}

/// Directory payload listing `ids`
pub fn directory_json(ids: &[&str]) -> String {
    let items: Vec<String> = ids
        .iter()
        .map(|id| format!(r#"{{"id": "{id}", "name": "Channel {id}"}}"#))
        .collect();
    format!(r#"{{"channels": [{}]}}"#, items.join(","))
}

/// Guide payload with `count` one-hour programs starting at midnight UTC
pub fn guide_json(channel_id: &str, count: usize) -> String {
    let items: Vec<String> = (0..count)
        .map(|i| {
            format!(
                r#"{{"channelId": "{channel_id}", "title": "{channel_id} show {i}", "start": "2024-03-01T{i:02}:00:00Z", "end": "2024-03-01T{:02}:00:00Z"}}"#,
                i + 1
            )
        })
        .collect();
    format!(r#"{{"programs": [{}]}}"#, items.join(","))
}

/// Source serving `ids` with `per_channel` entries each
pub fn source_with_channels(ids: &[&str], per_channel: usize) -> MockSource {
    ids.iter().fold(
        MockSource::new().with_directory(directory_json(ids)),
        |source, id| source.with_guide(id, guide_json(id, per_channel)),
    )
}

/// Channel ids `ch0..chN`
pub fn channel_ids(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("ch{i}")).collect()
}

/// Formatted log output captured from the current thread
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Route `tracing` output of this thread into a buffer while the guard lives
///
/// Use with the current-thread test runtime so spawned tasks log here too.
pub fn capture_logs() -> (LogBuffer, DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(move || writer.clone())
        .finish();
    (buffer, tracing::subscriber::set_default(subscriber))
}
