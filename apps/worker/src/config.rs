use std::{env, fmt, fs, path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::monitoring::{SchedulerSettings, ValidationRules};
use crate::notifier::twilio::{DEFAULT_API_BASE, TwilioSettings};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read config file: {0}")]
    ReadFailed(#[source] std::io::Error),
    #[error("Failed to write config file: {0}")]
    WriteFailed(#[source] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseFailed(String),
    #[error("No config directory available (set XDG_CONFIG_HOME or HOME)")]
    ConfigPathUnavailable,
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub workers: Workers,
    pub checks: Checks,
    pub storage: Storage,
    pub notifier: NotifierConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Workers {
    pub sweep_interval_secs: u64,
    pub rotation_interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Checks {
    pub min_timeout_seconds: u64,
    pub max_timeout_seconds: u64,
    pub require_success_codes: bool,
    /// Enforced by the API layer when checks are created
    pub max_checks_per_owner: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Storage {
    pub data_dir: path::PathBuf,
    pub log_dir: path::PathBuf,
    pub checks_category: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NotifierConfig {
    /// Alerts go to the tracing output
    #[default]
    Log,
    /// Alerts go out as SMS
    Twilio {
        account_sid: String,
        auth_token: String,
        from_phone: String,
        #[serde(default = "default_api_base")]
        api_base: String,
    },
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

impl Default for Workers {
    fn default() -> Self {
        Self { sweep_interval_secs: 60, rotation_interval_secs: 24 * 60 * 60 }
    }
}

impl Default for Checks {
    fn default() -> Self {
        Self {
            min_timeout_seconds: 1,
            max_timeout_seconds: 5,
            require_success_codes: true,
            max_checks_per_owner: 5,
        }
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            data_dir: ".data".into(),
            log_dir: ".logs".into(),
            checks_category: "checks".into(),
        }
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/uppe/worker.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, Error> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(Error::ConfigPathUnavailable);
    };

    Ok(path.join("uppe/worker.toml"))
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Workers")?;
        write_1(f, "Sweep Interval (s)", &self.workers.sweep_interval_secs)?;
        write_1(f, "Rotation Interval (s)", &self.workers.rotation_interval_secs)?;
        write_title_1(f, "Checks")?;
        write_1(
            f,
            "Timeout Bounds (s)",
            &format!("{}..={}", self.checks.min_timeout_seconds, self.checks.max_timeout_seconds),
        )?;
        write_1(f, "Require Success Codes", &self.checks.require_success_codes)?;
        write_1(f, "Max Checks Per Owner", &self.checks.max_checks_per_owner)?;
        write_title_1(f, "Storage")?;
        write_1(f, "Data Directory", &self.storage.data_dir.display())?;
        write_1(f, "Log Directory", &self.storage.log_dir.display())?;
        write_1(f, "Checks Category", &self.storage.checks_category)?;
        write_title_1(f, "Notifier")?;
        match &self.notifier {
            NotifierConfig::Log => write_1(f, "Kind", &"log")?,
            NotifierConfig::Twilio { account_sid, from_phone, api_base, .. } => {
                write_1(f, "Kind", &"twilio")?;
                write_1(f, "Account SID", account_sid)?;
                write_1(f, "From", from_phone)?;
                write_1(f, "API Base", api_base)?;
            }
        }

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/uppe/worker.toml
    ///  or the specified path, with the name worker.toml if one does not exist
    ///
    /// ```no_run
    /// # use std::path;
    /// let cfg = uppe_worker::Config::from_config(None::<&path::Path>)?;
    /// println!("{}", cfg);
    /// # Ok::<(), uppe_worker::config::Error>(())
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, Error> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        let config = if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path).map_err(Error::ReadFailed)?;
            toml::from_str(raw_string.as_str()).map_err(|err| Error::ParseFailed(err.to_string()))?
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            config
        };

        config.validate()?;
        Ok(config)
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), Error> {
        let config_str: String =
            toml::to_string_pretty(self).map_err(|err| Error::ParseFailed(err.to_string()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(Error::WriteFailed)?;
        }

        fs::write(path, config_str).map_err(Error::WriteFailed)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<(), Error> {
        if self.workers.sweep_interval_secs == 0 {
            return Err(Error::Invalid("sweep_interval_secs must be positive".into()));
        }
        if self.workers.rotation_interval_secs == 0 {
            return Err(Error::Invalid("rotation_interval_secs must be positive".into()));
        }
        if self.checks.min_timeout_seconds == 0
            || self.checks.min_timeout_seconds > self.checks.max_timeout_seconds
        {
            return Err(Error::Invalid(format!(
                "timeout bounds {}..={} are not a positive range",
                self.checks.min_timeout_seconds, self.checks.max_timeout_seconds
            )));
        }
        if self.storage.checks_category.trim().is_empty() {
            return Err(Error::Invalid("checks_category must not be empty".into()));
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.workers.sweep_interval_secs)
    }

    pub fn rotation_interval(&self) -> Duration {
        Duration::from_secs(self.workers.rotation_interval_secs)
    }

    pub fn validation_rules(&self) -> ValidationRules {
        ValidationRules {
            min_timeout_seconds: self.checks.min_timeout_seconds,
            max_timeout_seconds: self.checks.max_timeout_seconds,
            require_success_codes: self.checks.require_success_codes,
        }
    }

    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            category: self.storage.checks_category.clone(),
            interval: self.sweep_interval(),
            rules: self.validation_rules(),
        }
    }

    /// Twilio credentials, when the SMS notifier is configured
    pub fn twilio_settings(&self) -> Option<TwilioSettings> {
        match &self.notifier {
            NotifierConfig::Log => None,
            NotifierConfig::Twilio { account_sid, auth_token, from_phone, api_base } => {
                Some(TwilioSettings {
                    account_sid: account_sid.clone(),
                    auth_token: auth_token.clone(),
                    from_phone: from_phone.clone(),
                    api_base: api_base.clone(),
                })
            }
        }
    }
}
