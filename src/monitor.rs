//! Change detection between runs: remember the last unread count and
//! raise a desktop notification when it grows.

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cli;
use crate::core::{DmConfig, Result};
use crate::report::{self, TEXT_REPORT};
use crate::workflow;

pub const STATE_FILE: &str = "previous_instagram_state.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorState {
    pub unread_count: u32,
    pub last_check: Option<DateTime<Utc>>,
}

impl MonitorState {
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("ignoring corrupt monitor state: {}", e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}

/// Run the workflow once and compare against the previous run's state.
pub async fn check_once(config: &DmConfig) -> Result<()> {
    let state_path = state_path(config);
    let previous = MonitorState::load(&state_path);
    if let Some(last) = previous.last_check {
        cli::print_info(&format!("Last check: {}", last.format("%Y-%m-%d %H:%M:%S")));
    }

    let outcome = workflow::run(config, false).await?;

    // The scan count is authoritative; the report parse is a fallback for
    // runs where the scan degraded to empty.
    let unread = if outcome.unread_count > 0 {
        outcome.unread_count
    } else {
        report::read_unread_count(&config.output_dir.join(TEXT_REPORT)).unwrap_or(0)
    };

    info!(
        previous = previous.unread_count,
        current = unread,
        "comparing unread counts"
    );

    if unread > previous.unread_count {
        let new = unread - previous.unread_count;
        let body = format!("{} new unread message(s) on Instagram", new);
        cli::print_warning(&body);
        notify("Instagram DMs", &body);
    } else {
        cli::print_success("No new messages since last check");
    }

    let next = MonitorState {
        unread_count: unread,
        last_check: Some(Utc::now()),
    };
    next.save(&state_path)?;
    Ok(())
}

fn state_path(config: &DmConfig) -> PathBuf {
    config.output_dir.join(STATE_FILE)
}

#[cfg(target_os = "macos")]
fn notify(title: &str, body: &str) {
    let script = format!(
        "display notification {} with title {}",
        serde_json::to_string(body).unwrap_or_default(),
        serde_json::to_string(title).unwrap_or_default()
    );
    if let Err(e) = Command::new("osascript").arg("-e").arg(script).status() {
        warn!("notification failed: {}", e);
    }
}

#[cfg(target_os = "linux")]
fn notify(title: &str, body: &str) {
    if let Err(e) = Command::new("notify-send").arg(title).arg(body).status() {
        warn!("notification failed: {}", e);
    }
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn notify(title: &str, body: &str) {
    println!("[{}] {}", title, body);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STATE_FILE);

        let state = MonitorState {
            unread_count: 4,
            last_check: Some(Utc::now()),
        };
        state.save(&path).unwrap();

        let loaded = MonitorState::load(&path);
        assert_eq!(loaded.unread_count, 4);
        assert!(loaded.last_check.is_some());
    }

    #[test]
    fn missing_state_defaults_to_zero() {
        let state = MonitorState::load(Path::new("/nonexistent/state.json"));
        assert_eq!(state.unread_count, 0);
        assert!(state.last_check.is_none());
    }

    #[test]
    fn corrupt_state_defaults_to_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STATE_FILE);
        std::fs::write(&path, "not json at all").unwrap();

        let state = MonitorState::load(&path);
        assert_eq!(state.unread_count, 0);
    }
}
