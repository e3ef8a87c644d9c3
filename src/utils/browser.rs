use anyhow::{Context, Result};
use std::process::{Command, Stdio};

/// Opens URLs outside the application (the payment page, mostly).
pub trait ExternalBrowser: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

/// Uses the platform's URL handler (`open`, `start`, or `xdg-open`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl ExternalBrowser for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        let mut command = if cfg!(target_os = "macos") {
            let mut cmd = Command::new("open");
            cmd.arg(url);
            cmd
        } else if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", "start", "", url]);
            cmd
        } else {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(url);
            cmd
        };

        // Detached so the handler cannot scribble over the TUI
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to open {url} in a browser"))?;

        Ok(())
    }
}
