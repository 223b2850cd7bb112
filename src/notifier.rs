// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Fire-and-forget desktop notifications

use std::process::{Command, Stdio};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct Notifier {
    enabled: bool,
}

impl Notifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Show a notification. Never blocks on, or reports, the outcome.
    pub fn notify(&self, title: &str, message: &str) {
        if !self.enabled {
            return;
        }

        let Some(mut command) = notification_command(title, message) else {
            return;
        };

        let spawned = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            // reap in the background so the child does not linger as a zombie
            Ok(mut child) => {
                std::thread::spawn(move || {
                    let _ = child.wait();
                });
            }
            Err(e) => debug!("Notification failed: {}", e),
        }
    }
}

#[cfg(target_os = "macos")]
fn notification_command(title: &str, message: &str) -> Option<Command> {
    let script = format!(
        "display notification \"{}\" with title \"{}\"",
        applescript_escape(message),
        applescript_escape(title)
    );
    let mut command = Command::new("osascript");
    command.arg("-e").arg(script);
    Some(command)
}

#[cfg(all(unix, not(target_os = "macos")))]
fn notification_command(title: &str, message: &str) -> Option<Command> {
    let mut command = Command::new("notify-send");
    command.arg(title).arg(message);
    Some(command)
}

#[cfg(not(unix))]
fn notification_command(_title: &str, _message: &str) -> Option<Command> {
    None
}

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn applescript_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Notification text is kept short, the status record has the full detail
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_quotes() {
        assert_eq!(applescript_escape(r#"say "hi" \ bye"#), r#"say \"hi\" \\ bye"#);
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("short", 50), "short");
    }

    #[test]
    fn test_disabled_notifier_is_silent() {
        Notifier::new(false).notify("title", "message");
    }
}
