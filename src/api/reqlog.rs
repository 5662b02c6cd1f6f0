//! Bounded in-memory request log.
//!
//! Replaces the global mutable log array from earlier iterations with an
//! injected ring buffer: the router owns one `Arc<RequestLog>`, middleware
//! records one entry per request, and `/logs` reads a snapshot. At capacity
//! the oldest entry is evicted.

use axum::{
    Extension,
    extract::Request,
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug)]
pub struct RequestLogEntry {
    pub method: String,
    pub path: String,
    pub status: u16,
    pub latency_ms: u64,
    /// Unix seconds when the response was produced.
    pub timestamp: i64,
}

pub struct RequestLog {
    capacity: usize,
    entries: Mutex<VecDeque<RequestLogEntry>>,
}

impl RequestLog {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn record(&self, entry: RequestLogEntry) {
        let Ok(mut entries) = self.entries.lock() else {
            // A poisoned lock means a panic mid-record; drop the entry.
            return;
        };
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Snapshot of the buffered entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<RequestLogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The log viewer's own routes are not worth logging.
    fn is_internal(path: &str) -> bool {
        matches!(path, "/logs" | "/health" | "/openapi.json")
    }
}

/// Middleware that records method, path, status, and latency per request.
pub async fn record_request(
    Extension(log): Extension<Arc<RequestLog>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    if !RequestLog::is_internal(&path) {
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        log.record(RequestLogEntry {
            method,
            path,
            status: response.status().as_u16(),
            latency_ms,
            timestamp: now_unix_seconds(),
        });
    }

    response
}

fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{RequestLog, RequestLogEntry, now_unix_seconds};

    fn entry(path: &str, status: u16) -> RequestLogEntry {
        RequestLogEntry {
            method: "GET".to_string(),
            path: path.to_string(),
            status,
            latency_ms: 1,
            timestamp: now_unix_seconds(),
        }
    }

    #[test]
    fn record_appends_in_order() {
        let log = RequestLog::with_capacity(10);
        log.record(entry("/a", 200));
        log.record(entry("/b", 404));

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, "/a");
        assert_eq!(entries[1].path, "/b");
        assert_eq!(entries[1].status, 404);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let log = RequestLog::with_capacity(3);
        for index in 0..5 {
            log.record(entry(&format!("/{index}"), 200));
        }

        let entries = log.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].path, "/2");
        assert_eq!(entries[2].path, "/4");
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let log = RequestLog::with_capacity(0);
        log.record(entry("/only", 200));
        assert_eq!(log.entries().len(), 1);
    }

    #[test]
    fn internal_paths_are_skipped() {
        assert!(RequestLog::is_internal("/logs"));
        assert!(RequestLog::is_internal("/health"));
        assert!(RequestLog::is_internal("/openapi.json"));
        assert!(!RequestLog::is_internal("/auth/signin"));
    }
}
