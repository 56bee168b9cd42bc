//! Jailbreak mode configuration: which of Rootless/Rootful the host device
//! is in, and the device identity used to build HTTP headers and to filter
//! repository listings.
use crate::classifier::is_rootless_compatible;
use crate::error::*;
use crate::model::Package;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JailbreakMode {
    Rootless,
    Rootful,
    Both,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JailbreakConfig {
    #[serde(default = "default_mode")]
    pub mode: JailbreakMode,
    #[serde(default = "default_device_model")]
    pub device_model: String,
    #[serde(default = "default_firmware_version")]
    pub firmware_version: String,
    #[serde(default = "default_unique_id")]
    pub unique_id: String,
    #[serde(default = "default_true")]
    pub use_sileo_headers: bool,
}

fn default_mode() -> JailbreakMode { JailbreakMode::Rootless }
fn default_device_model() -> String { "iPhone14,2".into() }
fn default_firmware_version() -> String { "16.0".into() }
fn default_unique_id() -> String { "debtool".into() }
fn default_true() -> bool { true }

impl Default for JailbreakConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            device_model: default_device_model(),
            firmware_version: default_firmware_version(),
            unique_id: default_unique_id(),
            use_sileo_headers: true,
        }
    }
}

impl JailbreakConfig {
    /// Filesystem prefix that Rootless packages install under; empty for
    /// Rootful, since those write directly under `/`.
    pub fn path_prefix(&self) -> &'static str {
        match self.mode {
            JailbreakMode::Rootless => "/var/jb",
            _ => "",
        }
    }
}

/// Filters a package list for a jailbreak mode: Rootless keeps only
/// packages that pass [`is_rootless_compatible`]; every other mode is the
/// identity (nothing else narrows the list further).
pub fn filter_packages_by_mode(mode: JailbreakMode, packages: &[Package]) -> Vec<Package> {
    match mode {
        JailbreakMode::Rootless => packages.iter().filter(|p| is_rootless_compatible(*p)).cloned().collect(),
        _ => packages.to_vec(),
    }
}

pub struct JailbreakConfigManager {
    config_file: PathBuf,
    config: RwLock<JailbreakConfig>,
}

impl JailbreakConfigManager {
    pub fn new(app_dir: &Path) -> DtResult<Self> {
        let config_file = app_dir.join("jailbreak_config.json");
        let config = if config_file.exists() {
            let data = fs::read_to_string(&config_file)?;
            serde_json::from_str(&data).unwrap_or_else(|e| {
                log::warn!("failed to parse jailbreak config, using defaults: {e}");
                JailbreakConfig::default()
            })
        } else {
            JailbreakConfig::default()
        };
        Ok(Self { config_file, config: RwLock::new(config) })
    }

    pub fn config(&self) -> JailbreakConfig {
        self.config.read().unwrap().clone()
    }

    fn save(&self) -> DtResult<()> {
        let config = self.config.read().unwrap();
        let json = serde_json::to_string_pretty(&*config)?;
        if let Some(parent) = self.config_file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.config_file, json)?;
        Ok(())
    }

    pub fn set_mode(&self, mode: JailbreakMode) -> DtResult<()> {
        self.config.write().unwrap().mode = mode;
        self.save()
    }

    pub fn set_device_info(&self, model: &str, firmware: &str) -> DtResult<()> {
        {
            let mut config = self.config.write().unwrap();
            config.device_model = model.to_string();
            config.firmware_version = firmware.to_string();
        }
        self.save()
    }

    /// Returns `true` if the change touched header-relevant fields, so the
    /// caller knows to rebuild its `HttpClient`.
    pub fn toggle_sileo_headers(&self, enabled: bool) -> DtResult<bool> {
        let changed = {
            let mut config = self.config.write().unwrap();
            let changed = config.use_sileo_headers != enabled;
            config.use_sileo_headers = enabled;
            changed
        };
        self.save()?;
        Ok(changed)
    }
}
