// barometer_logger - Barometric pressure logger for router admin pages
//
// Copyright 2026 barometer_logger contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use reqwest::Url;
use serde::Deserialize;
use std::error;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_TIMEOUT_MILLIS: u64 = 10_000;
const DEFAULT_DATA_PATH: &str = "data/readings.csv";
const DEFAULT_FIELD_LABEL: &str = "Barometer Value";

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, io::Error),
    Parse(PathBuf, serde_yaml::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "unable to read {}: {}", path.display(), e),
            Self::Parse(path, e) => write!(f, "unable to parse {}: {}", path.display(), e),
            Self::Invalid(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Io(_, e) => Some(e),
            Self::Parse(_, e) => Some(e),
            _ => None,
        }
    }
}

/// Username and password for the router's admin interface.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Settings as they appear in the YAML config file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    url: String,
    username: String,
    password: String,
    wait_time: u64,
    #[serde(default = "default_timeout_millis")]
    timeout_millis: u64,
    #[serde(default = "default_data_path")]
    data_path: PathBuf,
    #[serde(default = "default_accept_invalid_certs")]
    accept_invalid_certs: bool,
    #[serde(default = "default_field_label")]
    field_label: String,
}

fn default_timeout_millis() -> u64 {
    DEFAULT_TIMEOUT_MILLIS
}

fn default_data_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_PATH)
}

fn default_accept_invalid_certs() -> bool {
    true
}

fn default_field_label() -> String {
    DEFAULT_FIELD_LABEL.to_owned()
}

/// Validated collector configuration.
///
/// Built once at startup and handed to each component that needs part of it. Nothing
/// in the crate looks settings up from anywhere else.
#[derive(Debug, Clone)]
pub struct Config {
    pub url: Url,
    pub credentials: Credentials,
    pub interval: Duration,
    pub timeout: Duration,
    pub data_path: PathBuf,
    pub accept_invalid_certs: bool,
    pub field_label: String,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_owned(), e))?;
        let raw: RawConfig = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_owned(), e))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let url = Url::parse(&raw.url).map_err(|e| ConfigError::Invalid(format!("url {}: {}", raw.url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!("url {} must be http or https", url)));
        }

        if raw.username.is_empty() {
            return Err(ConfigError::Invalid("username must not be empty".to_owned()));
        }

        if raw.wait_time == 0 {
            return Err(ConfigError::Invalid("wait_time must be at least one second".to_owned()));
        }

        if raw.timeout_millis == 0 {
            return Err(ConfigError::Invalid("timeout_millis must be greater than zero".to_owned()));
        }

        if raw.field_label.trim().is_empty() {
            return Err(ConfigError::Invalid("field_label must not be empty".to_owned()));
        }

        Ok(Config {
            url,
            credentials: Credentials {
                username: raw.username,
                password: raw.password,
            },
            interval: Duration::from_secs(raw.wait_time),
            timeout: Duration::from_millis(raw.timeout_millis),
            data_path: raw.data_path,
            accept_invalid_certs: raw.accept_invalid_certs,
            field_label: raw.field_label,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, ConfigError, RawConfig};
    use std::io::Write;
    use std::path::PathBuf;
    use std::time::Duration;

    fn parse(yaml: &str) -> Result<Config, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(yaml).unwrap();
        Config::from_raw(raw)
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let config = parse(
            "url: https://192.168.1.254/cgi-bin/sysinfo.ha\n\
             username: admin\n\
             password: secret\n\
             wait_time: 300\n",
        )
        .unwrap();

        assert_eq!("192.168.1.254", config.url.host_str().unwrap());
        assert_eq!("admin", config.credentials.username);
        assert_eq!(Duration::from_secs(300), config.interval);
        assert_eq!(Duration::from_millis(10_000), config.timeout);
        assert_eq!(PathBuf::from("data/readings.csv"), config.data_path);
        assert!(config.accept_invalid_certs);
        assert_eq!("Barometer Value", config.field_label);
    }

    #[test]
    fn overrides_are_applied() {
        let config = parse(
            "url: http://router.lan/status\n\
             username: admin\n\
             password: ''\n\
             wait_time: 60\n\
             timeout_millis: 2500\n\
             data_path: /var/lib/barometer/readings.csv\n\
             accept_invalid_certs: false\n\
             field_label: Air Pressure\n",
        )
        .unwrap();

        assert_eq!(Duration::from_secs(60), config.interval);
        assert_eq!(Duration::from_millis(2500), config.timeout);
        assert_eq!(PathBuf::from("/var/lib/barometer/readings.csv"), config.data_path);
        assert!(!config.accept_invalid_certs);
        assert_eq!("Air Pressure", config.field_label);
    }

    #[test]
    fn zero_wait_time_is_rejected() {
        let res = parse("url: http://router.lan/\nusername: admin\npassword: x\nwait_time: 0\n");
        assert!(matches!(res, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn bad_url_is_rejected() {
        let res = parse("url: not a url\nusername: admin\npassword: x\nwait_time: 5\n");
        assert!(matches!(res, Err(ConfigError::Invalid(_))));

        let res = parse("url: ftp://router.lan/\nusername: admin\npassword: x\nwait_time: 5\n");
        assert!(matches!(res, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn password_is_not_printed() {
        let config = parse("url: http://router.lan/\nusername: admin\npassword: hunter2\nwait_time: 5\n").unwrap();
        let debug = format!("{:?}", config);

        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn load_reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.yaml");
        assert!(matches!(Config::load(&missing), Err(ConfigError::Io(_, _))));

        let malformed = dir.path().join("malformed.yaml");
        let mut file = std::fs::File::create(&malformed).unwrap();
        writeln!(file, "url: [http://router.lan/").unwrap();
        assert!(matches!(Config::load(&malformed), Err(ConfigError::Parse(_, _))));

        let missing_field = dir.path().join("missing_field.yaml");
        std::fs::write(&missing_field, "url: http://router.lan/\nusername: admin\n").unwrap();
        assert!(matches!(Config::load(&missing_field), Err(ConfigError::Parse(_, _))));
    }
}
