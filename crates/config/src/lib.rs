use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use url::Url;

/// Environment variable that overrides `backend.url`.
pub const BACKEND_URL_ENV: &str = "AGENTFLOW_BACKEND_URL";

/// Default location of the config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/agentflow.toml";

// ── Backend connection ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// WebSocket endpoint of the workflow backend (`ws://` or `wss://`).
    pub url: String,
    /// Fixed delay between a close and the next connection attempt.
    pub reconnect_delay_ms: u64,
    /// Consecutive failed attempts before the client gives up.
    /// `0` (the default) retries forever.
    pub max_reconnect_attempts: u32,
    /// Seconds without an inbound event, while a run is processing, before
    /// the dashboard flags the run as stalled.  `0` disables the check.
    pub step_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8000/ws".to_string(),
            reconnect_delay_ms: 2000,
            max_reconnect_attempts: 0,
            step_timeout_secs: 120,
        }
    }
}

impl BackendConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn step_timeout(&self) -> Option<Duration> {
        (self.step_timeout_secs > 0).then(|| Duration::from_secs(self.step_timeout_secs))
    }

    pub fn max_attempts(&self) -> Option<u32> {
        (self.max_reconnect_attempts > 0).then_some(self.max_reconnect_attempts)
    }
}

/// Dashboard appearance settings exposed in the `[ui]` config section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Named colour theme.  Recognised values: `dark` (default), `light`.
    pub theme: String,
    /// Show the agent sidebar on startup.
    pub show_sidebar: bool,
    /// Show the navigation column on startup.
    pub show_navbar: bool,
    /// Show the evidence panel on startup.
    pub show_evidence: bool,
    /// Seed the evidence panel with the built-in sample references.
    pub sample_evidence: bool,
    /// Directory that exported reports are written to.
    pub reports_dir: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            show_sidebar: true,
            show_navbar: false,
            show_evidence: true,
            sample_evidence: true,
            reports_dir: ".agentflow/reports".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
    /// Dashboard mode writes logs here because the terminal belongs to the UI.
    pub log_dir: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: ".agentflow/logs".to_string(),
        }
    }
}

/// Display metadata for one backend agent.  Agents the backend reports that
/// are not listed here are still shown, by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tools: Vec<String>,
}

impl AgentProfile {
    fn new(id: &str, name: &str, tools: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            tools: tools.iter().map(|t| t.to_string()).collect(),
        }
    }
}

pub fn default_agents() -> Vec<AgentProfile> {
    vec![
        AgentProfile::new("research", "Research Agent", &["web_search", "web_scraper"]),
        AgentProfile::new("writer", "Writer Agent", &["text_generator", "summarizer"]),
        AgentProfile::new("reviewer", "Review Agent", &["fact_checker", "grammar_checker"]),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub ui: UiConfig,
    pub telemetry: TelemetryConfig,
    pub agents: Vec<AgentProfile>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            ui: UiConfig::default(),
            telemetry: TelemetryConfig::default(),
            agents: default_agents(),
        }
    }
}

impl AppConfig {
    /// Load config from `path`, falling back to defaults when the file does
    /// not exist, then apply environment overrides and validate.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)
                .with_context(|| format!("invalid config file {}", path.display()))?;
        }

        config.apply_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(BACKEND_URL_ENV) {
            if !url.trim().is_empty() {
                self.backend.url = url.trim().to_string();
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let parsed = Url::parse(&self.backend.url)
            .with_context(|| format!("backend.url is not a valid URL: {}", self.backend.url))?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            bail!(
                "backend.url must use ws:// or wss://, got {}://",
                parsed.scheme()
            );
        }
        for agent in &self.agents {
            if agent.id.trim().is_empty() {
                bail!("agent entries need a non-empty id");
            }
        }
        Ok(())
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }

    pub fn agent(&self, id: &str) -> Option<&AgentProfile> {
        self.agents.iter().find(|a| a.id == id)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
