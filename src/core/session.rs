//! Opening SIGAJUS in a browser before the login steps run.

use crate::config::workflow_config::SessionConfig;
use crate::core::interpolate::Variables;
use crate::domain::ports::BrowserLauncher;
use crate::utils::error::{AutomationError, Result};
use reqwest::Client;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub url: String,
    pub browser: Option<String>,
    pub startup_wait: Duration,
    pub check_reachable: bool,
    pub reachability_timeout: Duration,
}

impl From<&SessionConfig> for SessionSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            url: config.url.clone(),
            browser: config.browser.clone(),
            startup_wait: Duration::from_millis(config.startup_wait_ms.unwrap_or(5_000)),
            check_reachable: config.check_reachable.unwrap_or(true),
            reachability_timeout: Duration::from_secs(config.reachability_timeout_seconds.unwrap_or(30)),
        }
    }
}

/// Values the login steps can reference: `{url}`, `{username}`, `{password}`.
pub fn session_variables(config: &SessionConfig) -> Variables {
    let mut vars = Variables::new();
    vars.insert("url".to_string(), config.url.clone());
    if let Some(username) = &config.username {
        vars.insert("username".to_string(), username.clone());
    }
    if let Some(password) = &config.password {
        vars.insert("password".to_string(), password.clone());
    }
    vars
}

/// Polls `url` until the server answers at all (any status) or `timeout` elapses.
pub async fn wait_until_reachable(url: &str, timeout: Duration, interval: Duration) -> Result<()> {
    let client = Client::builder().timeout(interval.max(Duration::from_secs(2))).build()?;
    let started = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match client.get(url).send().await {
            Ok(response) => {
                tracing::debug!(
                    "Site answered with {} after {} attempt(s)",
                    response.status(),
                    attempts
                );
                return Ok(());
            }
            Err(e) => tracing::debug!("Attempt {} to reach {} failed: {}", attempts, url, e),
        }

        if started.elapsed() >= timeout {
            return Err(AutomationError::SessionUnreachable {
                url: url.to_string(),
                timeout_secs: timeout.as_secs(),
            });
        }
        tokio::time::sleep(interval).await;
    }
}

/// Checks the site, opens the browser on it and waits for the page to settle.
pub async fn open(settings: &SessionSettings, launcher: &dyn BrowserLauncher) -> Result<()> {
    if settings.check_reachable {
        tracing::info!("🌐 Checking that {} is reachable", settings.url);
        wait_until_reachable(&settings.url, settings.reachability_timeout, Duration::from_millis(500))
            .await?;
    }

    tracing::info!(
        "🚀 Opening {} with {}",
        settings.url,
        settings.browser.as_deref().unwrap_or("the default browser")
    );
    launcher.open(settings.browser.as_deref(), &settings.url)?;

    tracing::debug!("Waiting {:?} for the browser window", settings.startup_wait);
    tokio::time::sleep(settings.startup_wait).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingLauncher {
        opened: Mutex<Vec<(Option<String>, String)>>,
    }

    impl BrowserLauncher for RecordingLauncher {
        fn open(&self, browser: Option<&str>, url: &str) -> Result<()> {
            self.opened
                .lock()
                .unwrap()
                .push((browser.map(str::to_string), url.to_string()));
            Ok(())
        }
    }

    fn session_config() -> SessionConfig {
        SessionConfig {
            url: "https://sigajus.example.jus.br".to_string(),
            browser: Some("firefox".to_string()),
            username: Some("servidor".to_string()),
            password: None,
            startup_wait_ms: Some(0),
            check_reachable: Some(false),
            reachability_timeout_seconds: None,
            login: Vec::new(),
        }
    }

    #[test]
    fn test_settings_defaults() {
        let mut config = session_config();
        config.startup_wait_ms = None;
        config.check_reachable = None;
        let settings = SessionSettings::from(&config);
        assert_eq!(settings.startup_wait, Duration::from_secs(5));
        assert!(settings.check_reachable);
        assert_eq!(settings.reachability_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_session_variables() {
        let vars = session_variables(&session_config());
        assert_eq!(vars["url"], "https://sigajus.example.jus.br");
        assert_eq!(vars["username"], "servidor");
        assert!(!vars.contains_key("password"));
    }

    #[tokio::test]
    async fn test_open_without_reachability_check() {
        let launcher = RecordingLauncher::default();
        let settings = SessionSettings::from(&session_config());

        open(&settings, &launcher).await.unwrap();

        let opened = launcher.opened.lock().unwrap();
        assert_eq!(
            *opened,
            vec![(Some("firefox".to_string()), "https://sigajus.example.jus.br".to_string())]
        );
    }
}
