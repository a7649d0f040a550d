//! Desktop notifications

use std::io;
use std::process::{Command, Stdio};

use tracing::{debug, info};

use super::Notifier;

pub const NOTIFICATION_TITLE: &str = "Memory Optimiser";

/// Posts notifications through the desktop's notification service
///
/// - macOS: `osascript -e 'display notification ...'`
/// - Linux: `notify-send`
/// - elsewhere, or when disabled: log only
pub struct DesktopNotifier {
    enabled: bool,
}

impl DesktopNotifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn command(message: &str) -> Option<Command> {
        if cfg!(target_os = "macos") {
            // Clean message for AppleScript
            let clean_message = message.replace('"', "'").replace('\\', "");
            let script = format!(
                r#"display notification "{}" with title "{}""#,
                clean_message, NOTIFICATION_TITLE
            );
            let mut cmd = Command::new("osascript");
            cmd.arg("-e").arg(script);
            Some(cmd)
        } else if cfg!(target_os = "linux") {
            let mut cmd = Command::new("notify-send");
            cmd.arg(NOTIFICATION_TITLE).arg(message);
            Some(cmd)
        } else {
            None
        }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&mut self, message: &str) {
        info!("Notification: {}", message);

        if !self.enabled {
            return;
        }

        let Some(mut cmd) = Self::command(message) else {
            return;
        };

        if let Err(e) = spawn_detached(&mut cmd) {
            debug!("Desktop notification unavailable: {}", e);
        }
    }
}

/// Start `cmd` without waiting for it. A short-lived thread reaps the child
/// so finished notifiers do not linger as zombies. Returns the child's pid.
fn spawn_detached(cmd: &mut Command) -> io::Result<u32> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    let pid = child.id();

    std::thread::spawn(move || {
        if let Err(e) = child.wait() {
            debug!("Notifier process {} could not be reaped: {}", pid, e);
        }
    });

    Ok(pid)
}
