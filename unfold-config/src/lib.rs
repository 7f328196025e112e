//! Loader for workspace configuration with YAML + environment overlays.
//!
//! Sources are merged in the order they are attached; `UNFOLD_`-prefixed environment
//! variables are applied last and therefore win. A nested key is addressed with `__`,
//! e.g. `UNFOLD_BROWSER__PAGE_LOAD_TIMEOUT_SECS=45`. String values may reference other
//! environment variables as `${VAR}`; those are expanded after merging.
//!
//! Every field has a default, so an empty document (or no document at all) yields
//! [`UnfoldConfig::default`].
//!
//! ```yaml
//! browser:
//!   chromedriver_path: /usr/bin/chromedriver
//!   chromium_path: /usr/bin/chromium
//!   page_load_timeout_secs: 30
//! scrape:
//!   max_concurrent_sessions: 2
//! youtube:
//!   api_key: "${YOUTUBE_API_KEY}"
//! log:
//!   format: json
//! ```
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde_json::Value;
use std::path::Path;
use unfold_common::{UnfoldConfig, UnfoldError};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "UNFOLD";

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to read configuration: {0}")]
    Source(#[from] ConfigError),

    #[error("configuration does not match schema: {0}")]
    Schema(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] UnfoldError),
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

/// An unresolved `${VAR}` (missing variable) would otherwise end up as a literal
/// credential, so optional strings still containing a placeholder are cleared.
fn drop_unresolved_secrets(v: &mut Value) {
    if let Some(key) = v.pointer_mut("/youtube/api_key") {
        let unresolved = key
            .as_str()
            .map(|s| s.trim().is_empty() || s.contains("${"))
            .unwrap_or(false);
        if unresolved {
            *key = Value::Null;
        }
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct UnfoldConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for UnfoldConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl UnfoldConfigLoader {
    /// Start with no file sources; environment overrides are applied on [`load`](Self::load).
    ///
    /// ```
    /// use unfold_config::UnfoldConfigLoader;
    ///
    /// let config = UnfoldConfigLoader::new().load().expect("defaults are valid");
    /// assert_eq!(config.browser.page_load_timeout_secs, 30);
    /// assert!(config.youtube.api_key.is_none());
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; the format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is skipped when absent, so deployments can rely on the
    /// environment alone.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use unfold_config::UnfoldConfigLoader;
    ///
    /// let cfg = UnfoldConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// browser:
    ///   headless: false
    ///   viewport: { width: 1280, height: 720 }
    /// scrape:
    ///   scroll_step_px: 250
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert!(!cfg.browser.headless);
    /// assert_eq!(cfg.browser.viewport.width, 1280);
    /// assert_eq!(cfg.scrape.scroll_step_px, 250);
    /// assert_eq!(cfg.scrape.scroll_settle_ms, 500);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// ```
    /// use unfold_config::UnfoldConfigLoader;
    ///
    /// unsafe { std::env::set_var("DOCTEST_YT_KEY", "injected-from-env"); }
    ///
    /// let config = UnfoldConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// youtube:
    ///   api_key: "${DOCTEST_YT_KEY}"
    ///   preferred_language: de
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.youtube.api_key.as_deref(), Some("injected-from-env"));
    /// assert_eq!(config.youtube.preferred_language, "de");
    ///
    /// unsafe { std::env::remove_var("DOCTEST_YT_KEY"); }
    /// ```
    pub fn load(self) -> Result<UnfoldConfig, ConfigLoadError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        if v.is_null() {
            v = Value::Object(Default::default());
        }
        expand_env_in_value(&mut v);
        drop_unresolved_secrets(&mut v);

        let typed: UnfoldConfig = serde_json::from_value(v)?;
        typed.validate()?;
        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("FOO", Some("bar"), || {
            let mut v = json!("prefix-${FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("BIN_DIR", Some("/opt/bin")), ("BROWSER", Some("chrome"))], || {
            let mut v = json!([
                "$BIN_DIR/chromedriver",
                { "chromium_path": "${BIN_DIR}/${BROWSER}" },
                42,
                true,
                null
            ]);
            expand_env_in_value(&mut v);
            assert_eq!(
                v,
                json!(["/opt/bin/chromedriver", { "chromium_path": "/opt/bin/chrome" }, 42, true, null])
            );
        });
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                ("BAZ", Some("qux")),
                ("BAR", Some("mid-${BAZ}")),
                ("FOO", Some("start-${BAR}-end")),
            ],
            || {
                let mut v = json!("X=${FOO}");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("X=start-mid-qux-end"));
            },
        );
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unresolved_api_key_becomes_none() {
        let mut v = json!({ "youtube": { "api_key": "${DOES_NOT_EXIST}" } });
        expand_env_in_value(&mut v);
        drop_unresolved_secrets(&mut v);
        assert_eq!(v, json!({ "youtube": { "api_key": null } }));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let err = UnfoldConfigLoader::new()
            .with_yaml_str("scrape:\n  max_concurrent_sessions: 0\n")
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::Invalid(_)));
    }

    #[test]
    fn wrong_types_are_schema_errors() {
        let err = UnfoldConfigLoader::new()
            .with_yaml_str("browser:\n  headless: [1, 2]\n")
            .load()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::Schema(_) | ConfigLoadError::Source(_)
        ));
    }
}
