//! Loader for WPN configuration with YAML + environment overlays.
//!
//! Precedence: `WPN_`-prefixed environment variables override file values,
//! and `${VAR}` placeholders inside either source are expanded recursively
//! (with a depth cap so cycles terminate) before the merged tree is
//! deserialised into [`WpnConfig`].

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Runtime configuration for the scraper core and its collaborators.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WpnConfig {
    /// Upstream site root.
    pub base_url: String,
    /// Site-relative path of the channel directory page.
    pub directory_path: String,
    /// Per-channel page path template; `{id}` is replaced with the channel
    /// identifier.
    pub channel_path: String,
    /// Network timeout per request, in seconds.
    pub timeout_secs: u64,
    /// Upper bound on concurrently in-flight requests in a batch fetch.
    pub max_in_flight: usize,
    /// Separator between a song title and its artist, on pages and in
    /// identify queries.
    pub song_delimiter: String,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Optional explicit log directory; `WPN_LOG_DIR` still wins when set.
    pub dir: Option<String>,
    /// Duplicate log events to stderr.
    pub stderr: bool,
    /// Filter applied when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for WpnConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.whatsplayingnow.com".to_string(),
            directory_path: "/channels".to_string(),
            channel_path: "/channels/{id}".to_string(),
            timeout_secs: 10,
            max_in_flight: 8,
            song_delimiter: " by ".to_string(),
            log: LogSettings::default(),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            dir: None,
            stderr: false,
            filter: "info".to_string(),
        }
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct WpnConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for WpnConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl WpnConfigLoader {
    /// Start with sensible defaults: YAML file + `WPN_` env overrides.
    ///
    /// ```
    /// use wpn_config::WpnConfigLoader;
    ///
    /// let config = WpnConfigLoader::new()
    ///     .with_yaml_str("timeout_secs: 3")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.timeout_secs, 3);
    /// assert_eq!(config.song_delimiter, " by ");
    /// ```
    pub fn new() -> Self {
        let builder = Config::builder().add_source(
            Environment::with_prefix("WPN")
                .separator("__")
                .try_parsing(true),
        );
        Self { builder }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self.builder.add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly
    /// typed config.
    ///
    /// ```
    /// use wpn_config::WpnConfigLoader;
    ///
    /// unsafe { std::env::set_var("WPN_SITE", "https://mirror.example.com"); }
    ///
    /// let config = WpnConfigLoader::new()
    ///     .with_yaml_str("base_url: \"${WPN_SITE}\"")
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.base_url, "https://mirror.example.com");
    ///
    /// unsafe { std::env::remove_var("WPN_SITE"); }
    /// ```
    pub fn load(self) -> Result<WpnConfig, ConfigError> {
        let cfg = self.builder.build()?;

        // Convert to serde_json::Value first
        let mut v: Value = cfg.try_deserialize()?;
        // Recursively expand environment variables
        expand_env_in_value(&mut v);

        let typed: WpnConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("SITE_HOST", Some("radio.example.com"), || {
            let mut v = json!("https://${SITE_HOST}/channels");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("https://radio.example.com/channels"));
        });
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                ("SCHEME", Some("https")),
                ("HOST", Some("${SCHEME}://radio.example.com")),
            ],
            || {
                let mut v = json!("${HOST}/channels");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("https://radio.example.com/channels"));
            },
        );
    }

    #[test]
    fn stops_on_cycles_and_leaves_value_reasonable() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${DOES_NOT_EXIST}"));
    }

    #[test]
    #[serial]
    fn defaults_cover_every_field() {
        let config = WpnConfigLoader::new().load().expect("defaults load");
        assert_eq!(config.base_url, "https://www.whatsplayingnow.com");
        assert_eq!(config.directory_path, "/channels");
        assert_eq!(config.channel_path, "/channels/{id}");
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.max_in_flight, 8);
        assert_eq!(config.song_delimiter, " by ");
        assert!(!config.log.stderr);
    }

    #[test]
    #[serial]
    fn env_overrides_yaml() {
        temp_env::with_var("WPN_MAX_IN_FLIGHT", Some("2"), || {
            let config = WpnConfigLoader::new()
                .with_yaml_str("max_in_flight: 16")
                .load()
                .expect("valid config");
            assert_eq!(config.max_in_flight, 2);
        });
    }
}
