use crate::domain::ports::BrowserLauncher;
use crate::utils::error::{AutomationError, Result};
use std::process::{Command, Stdio};

/// Starts the browser as a detached child process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowserLauncher;

impl SystemBrowserLauncher {
    /// Program and leading arguments for `browser`, or the platform opener.
    fn command_line(browser: Option<&str>) -> Vec<String> {
        match browser.map(str::trim).filter(|b| !b.is_empty()) {
            Some(browser) => browser.split_whitespace().map(str::to_string).collect(),
            None => default_opener().iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(target_os = "windows")]
fn default_opener() -> &'static [&'static str] {
    &["cmd", "/C", "start", ""]
}

#[cfg(target_os = "macos")]
fn default_opener() -> &'static [&'static str] {
    &["open"]
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn default_opener() -> &'static [&'static str] {
    &["xdg-open"]
}

impl BrowserLauncher for SystemBrowserLauncher {
    fn open(&self, browser: Option<&str>, url: &str) -> Result<()> {
        let parts = Self::command_line(browser);
        let Some((program, args)) = parts.split_first() else {
            return Err(AutomationError::BrowserLaunchError("empty browser command".to_string()));
        };

        tracing::debug!("Launching {} {:?} {}", program, args, url);
        Command::new(program)
            .args(args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AutomationError::BrowserLaunchError(format!("{}: {}", program, e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_splits_browser_arguments() {
        assert_eq!(
            SystemBrowserLauncher::command_line(Some("firefox --new-window")),
            vec!["firefox", "--new-window"]
        );
        assert_eq!(
            SystemBrowserLauncher::command_line(Some("  ")),
            SystemBrowserLauncher::command_line(None)
        );
    }

    #[test]
    fn test_missing_program_is_launch_error() {
        let err = SystemBrowserLauncher
            .open(Some("sigajus-no-such-browser-binary"), "https://example.org")
            .unwrap_err();
        assert!(matches!(err, AutomationError::BrowserLaunchError(_)));
        assert!(err.is_fatal());
    }
}
