use serde::{Deserialize, Serialize};
use std::{env, fs, io, path::Path, path::PathBuf, time::Duration};

use crate::error::ConfigError;
use crate::store::ReadPolicy;

pub const CONFIG_FILE: &str = "taskdeck.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub tenant_slug: String,
    pub data_dir: PathBuf,
    pub read_policy: ReadPolicy,
    /// Off means demo mode: tasks live in the local slot only.
    pub remote_enabled: bool,
    pub realtime_enabled: bool,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3500".to_string(),
            tenant_slug: "default".to_string(),
            data_dir: PathBuf::from(".taskdeck"),
            read_policy: ReadPolicy::Fallback,
            remote_enabled: true,
            realtime_enabled: false,
            timeout_secs: 30,
        }
    }
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" | "off" | "OFF" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Reads `path` if it exists, then applies the `TASKDECK_*` environment.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = match fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Config::default(),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        config.apply_overrides(|name| env::var(name).ok())?;
        Ok(config)
    }

    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let flag = |name: &'static str, default: bool| match lookup(name) {
            None => Ok(default),
            Some(value) => parse_bool(&value).ok_or(ConfigError::Value { name, value }),
        };

        if let Some(url) = lookup("TASKDECK_API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Some(tenant) = lookup("TASKDECK_TENANT") {
            self.tenant_slug = tenant;
        }
        if let Some(dir) = lookup("TASKDECK_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(value) = lookup("TASKDECK_READ_POLICY") {
            self.read_policy = ReadPolicy::parse(&value).ok_or(ConfigError::Value {
                name: "TASKDECK_READ_POLICY",
                value,
            })?;
        }
        self.remote_enabled = flag("TASKDECK_REMOTE", self.remote_enabled)?;
        self.realtime_enabled = flag("TASKDECK_REALTIME", self.realtime_enabled)?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn empty_file_means_defaults() {
        let mut config: Config = serde_json::from_str("{}").unwrap();
        config.apply_overrides(env_of(&[])).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn file_values_then_environment() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{"tenant_slug":"acme","read_policy":"propagate","timeout_secs":5}"#).unwrap();

        let data = fs::read_to_string(&path).unwrap();
        let mut config: Config = serde_json::from_str(&data).unwrap();
        assert_eq!(config.tenant_slug, "acme");
        assert_eq!(config.read_policy, ReadPolicy::Propagate);
        assert_eq!(config.timeout(), Duration::from_secs(5));

        config
            .apply_overrides(env_of(&[
                ("TASKDECK_TENANT", "globex"),
                ("TASKDECK_REMOTE", "no"),
                ("TASKDECK_READ_POLICY", "fallback"),
            ]))
            .unwrap();
        assert_eq!(config.tenant_slug, "globex");
        assert!(!config.remote_enabled);
        assert_eq!(config.read_policy, ReadPolicy::Fallback);
        assert!(!config.realtime_enabled);
    }

    #[test]
    fn bad_override_values_are_reported() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(env_of(&[("TASKDECK_REALTIME", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Value { name: "TASKDECK_REALTIME", .. }));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "{ nope").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }
}
