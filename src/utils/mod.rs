//! Common utilities and helper functions

pub mod error;
pub mod retry;

use std::time::Duration;

/// Format a duration as a short human-readable string (`1.25s`, `340ms`)
pub fn format_elapsed(elapsed: Duration) -> String {
    if elapsed.as_secs() > 0 {
        format!("{:.2}s", elapsed.as_secs_f64())
    } else {
        format!("{}ms", elapsed.as_millis())
    }
}
