//! Application Configuration
//!
//! Operator settings stored in TOML format. Detection thresholds default
//! to the tuned values and are read once per scan; nothing here is edited
//! at runtime mid-session.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::capture::sampler::SessionWindow;
use crate::vision::classifier::ClassAllowList;
use crate::vision::paper::HeuristicConfig;

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Scan window settings
    pub scan: ScanSettings,
    /// Paper heuristic thresholds
    pub heuristic: HeuristicConfig,
    /// Unauthorized class labels and confidence cutoff
    pub allow_list: ClassAllowList,
    /// Alert delivery settings
    pub alert: AlertSettings,
}

/// Scan window settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Scan duration in seconds
    pub seconds: f64,
    /// Frames sampled per second
    pub fps: u32,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            seconds: 2.0,
            fps: 4,
        }
    }
}

impl ScanSettings {
    /// Derive the per-scan sampling window
    pub fn window(&self) -> SessionWindow {
        SessionWindow::from_rate(self.seconds, self.fps)
    }
}

/// Alert delivery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSettings {
    /// Whether positive verdicts are sent out at all
    pub enabled: bool,
    /// Webhook endpoint receiving the alert payload
    pub endpoint: String,
    /// Recipient address carried in the payload
    pub recipient: String,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            recipient: String::new(),
        }
    }
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "examsentry", "ExamSentry")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    let config_dir = proj_dirs.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
