/// Configuration system for devwatch.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: [`schema::DevwatchConfig::default()`]
/// 2. **User global config**: `~/.devwatch/config.toml`
/// 3. **Project local config**: `.devwatch.toml` in the current directory
/// 4. **Environment variables**: `DEVWATCH_*` overrides (highest precedence)
///
/// Later layers override earlier ones key by key: a file that only sets
/// `general.api_base_url` leaves every other value from the layer below.
///
/// # Usage
///
/// ```rust,ignore
/// let loaded = devwatch::config::load();
/// logging::init(&loaded.config.logging);
/// loaded.log_warnings();
/// let client = HttpClient::from_config(&loaded.config.general);
/// ```
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

pub use schema::DevwatchConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// A resolved configuration plus the problems met while resolving it.
///
/// Config is read before the log subscriber exists, so warnings are kept
/// here and emitted with [`Loaded::log_warnings`] once logging is up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Loaded {
    pub config: DevwatchConfig,
    pub warnings: Vec<String>,
}

impl Loaded {
    pub fn log_warnings(&self) {
        for message in &self.warnings {
            warn!("{message}");
        }
    }
}

/// Load the fully resolved configuration.
///
/// Merges defaults → global TOML → project TOML → env vars.
pub fn load() -> Loaded {
    let mut loaded = load_layers(&[global_config_path(), project_config_path()]);
    apply_env_overrides(&mut loaded.config, |key| std::env::var(key).ok());
    loaded
}

/// Merge the given TOML files over the defaults, in order.
///
/// Missing files are skipped. Malformed files are skipped with a warning so
/// a typo never keeps the dashboard from starting.
pub fn load_layers(paths: &[Option<PathBuf>]) -> Loaded {
    let mut warnings = Vec::new();
    let mut merged = match toml::Value::try_from(DevwatchConfig::default()) {
        Ok(v) => v,
        Err(e) => {
            warnings.push(format!("failed to serialize default config: {e}"));
            return Loaded {
                config: DevwatchConfig::default(),
                warnings,
            };
        }
    };

    for path in paths.iter().flatten() {
        match read_toml_value(path) {
            Ok(Some(layer)) => merge_values(&mut merged, layer),
            Ok(None) => {}
            Err(message) => warnings.push(message),
        }
    }

    let config = match merged.try_into::<DevwatchConfig>() {
        Ok(config) => config,
        Err(e) => {
            warnings.push(format!("merged config has invalid values; using defaults: {e}"));
            DevwatchConfig::default()
        }
    };
    Loaded { config, warnings }
}

/// Read a TOML file as a raw value tree, so unset keys stay unset.
/// A missing file is `Ok(None)`.
fn read_toml_value(path: &Path) -> Result<Option<toml::Value>, String> {
    let Ok(content) = fs::read_to_string(path) else {
        return Ok(None);
    };
    toml::from_str::<toml::Value>(&content)
        .map(Some)
        .map_err(|e| format!("ignoring malformed config file {}: {e}", path.display()))
}

/// Recursively overlay `overlay` onto `base`. Tables merge; everything else
/// is replaced.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.devwatch/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".devwatch").join("config.toml"))
}

/// Path to the project local config: `.devwatch.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".devwatch.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `DEVWATCH_API_URL`: monitoring server base URL
/// - `DEVWATCH_TIMEOUT_MS`: request timeout
/// - `DEVWATCH_BIND`: dashboard listen address
/// - `DEVWATCH_REPORT_CONCURRENCY`: parallel device fetches per report
/// - `DEVWATCH_APPLY_DATE_RANGE`: filter reports by date range (`1`/`true`/`yes`/`on`)
/// - `DEVWATCH_LOG_LEVEL`: default log filter
///
/// `lookup` is `std::env::var` in production and a map in tests.
pub fn apply_env_overrides(config: &mut DevwatchConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("DEVWATCH_API_URL")
        && !val.is_empty()
    {
        config.general.api_base_url = val;
    }
    if let Some(val) = lookup("DEVWATCH_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.general.request_timeout_ms = ms;
    }
    if let Some(val) = lookup("DEVWATCH_BIND")
        && !val.is_empty()
    {
        config.server.bind_addr = val;
    }
    if let Some(val) = lookup("DEVWATCH_REPORT_CONCURRENCY")
        && let Ok(n) = val.parse::<usize>()
        && n > 0
    {
        config.reports.concurrency = n;
    }
    if let Some(val) = lookup("DEVWATCH_APPLY_DATE_RANGE") {
        config.reports.apply_date_range = is_truthy(&val);
    }
    if let Some(val) = lookup("DEVWATCH_LOG_LEVEL")
        && !val.is_empty()
    {
        config.logging.level = val;
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.devwatch/config.toml`.
///
/// Returns an error if the file already exists (use `force = true` to
/// overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;
    init_config_at(&path, force)?;
    Ok(path)
}

/// Write the default annotated config to `path`.
pub fn init_config_at(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }

    fs::write(path, DevwatchConfig::default_toml()).context("failed to write config file")?;
    Ok(())
}

/// Set a single config key in the global config file.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;
    set_config_value_at(&path, key, value)
}

/// Set a dotted key (e.g. `general.api_base_url`) in the config file at
/// `path`, creating it from defaults when missing.
pub fn set_config_value_at(path: &Path, key: &str, value: &str) -> Result<()> {
    let mut root: toml::Value = if path.exists() {
        let content = fs::read_to_string(path).context("failed to read config file")?;
        toml::from_str(&content).context("failed to parse config as TOML value")?
    } else {
        toml::Value::try_from(DevwatchConfig::default())
            .context("failed to serialize default config")?
    };

    set_toml_value(&mut root, key, value)?;

    // Reject values that would make the file unloadable.
    let mut check = toml::Value::try_from(DevwatchConfig::default())
        .context("failed to serialize default config")?;
    merge_values(&mut check, root.clone());
    check
        .try_into::<DevwatchConfig>()
        .with_context(|| format!("invalid value for '{key}': {value}"))?;

    let output = toml::to_string_pretty(&root).context("failed to serialize updated config")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(path, output).context("failed to write config file")?;
    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').filter(|p| !p.is_empty()).collect();
    let Some((leaf, sections)) = parts.split_last() else {
        anyhow::bail!("empty config key");
    };

    let mut current = root;
    for &part in sections {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let table = current.as_table_mut().with_context(|| {
        format!(
            "expected table at '{}'",
            key.rsplit_once('.').map(|(s, _)| s).unwrap_or("")
        )
    })?;

    let new_value = match table.get(*leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::Float(_)) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        Some(_) => toml::Value::String(raw_value.to_string()),
        None => anyhow::bail!("unknown config key '{key}'"),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load().config;
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::*;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn no_files_yields_defaults() {
        let loaded = load_layers(&[None, None]);
        assert_eq!(loaded.config, DevwatchConfig::default());
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn later_layer_overrides_only_set_keys() {
        let dir = tempfile::tempdir().unwrap();
        let global = write(
            dir.path(),
            "global.toml",
            "[general]\napi_base_url = \"http://a:1\"\nrequest_timeout_ms = 500\n",
        );
        let project = write(dir.path(), "project.toml", "[general]\napi_base_url = \"http://b:2\"\n");

        let cfg = load_layers(&[Some(global), Some(project)]).config;
        assert_eq!(cfg.general.api_base_url, "http://b:2");
        assert_eq!(cfg.general.request_timeout_ms, 500);
        assert_eq!(cfg.server.bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn malformed_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let bad = write(dir.path(), "bad.toml", "[general\napi_base_url = ");
        let loaded = load_layers(&[Some(bad.clone())]);
        assert_eq!(loaded.config, DevwatchConfig::default());
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("ignoring malformed config file"));
        assert!(loaded.warnings[0].contains(&bad.display().to_string()));
    }

    #[test]
    fn mistyped_value_falls_back_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "typed.toml", "[reports]\nconcurrency = \"lots\"\n");
        let loaded = load_layers(&[Some(path)]);
        assert_eq!(loaded.config, DevwatchConfig::default());
        assert!(loaded.warnings[0].contains("invalid values"));
    }

    /// Shared buffer the test subscriber writes into.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn deferred_warnings_reach_the_subscriber() {
        let dir = tempfile::tempdir().unwrap();
        let bad = write(dir.path(), "bad.toml", "not = [valid");
        let loaded = load_layers(&[Some(bad)]);

        let out = Captured::default();
        let writer = out.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || loaded.log_warnings());

        let text = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
        assert!(text.contains("WARN"));
        assert!(text.contains("ignoring malformed config file"));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DEVWATCH_API_URL", "http://env:9"),
            ("DEVWATCH_TIMEOUT_MS", "250"),
            ("DEVWATCH_REPORT_CONCURRENCY", "4"),
            ("DEVWATCH_APPLY_DATE_RANGE", "yes"),
        ]);
        let mut cfg = DevwatchConfig::default();
        apply_env_overrides(&mut cfg, |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.general.api_base_url, "http://env:9");
        assert_eq!(cfg.general.request_timeout_ms, 250);
        assert_eq!(cfg.reports.concurrency, 4);
        assert!(cfg.reports.apply_date_range);
    }

    #[test]
    fn env_overrides_ignore_invalid_numbers() {
        let mut cfg = DevwatchConfig::default();
        apply_env_overrides(&mut cfg, |k| match k {
            "DEVWATCH_TIMEOUT_MS" => Some("soon".to_string()),
            "DEVWATCH_REPORT_CONCURRENCY" => Some("0".to_string()),
            _ => None,
        });
        assert_eq!(cfg.general.request_timeout_ms, 10_000);
        assert_eq!(cfg.reports.concurrency, 1);
    }

    #[test]
    fn is_truthy_accepts_variants() {
        for v in ["1", "true", "TRUE", "yes", "on"] {
            assert!(is_truthy(v), "{v}");
        }
        for v in ["0", "false", "no", "off", ""] {
            assert!(!is_truthy(v), "{v}");
        }
    }

    #[test]
    fn set_value_creates_file_from_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        set_config_value_at(&path, "reports.concurrency", "3").unwrap();

        let cfg = load_layers(&[Some(path)]).config;
        assert_eq!(cfg.reports.concurrency, 3);
        assert_eq!(cfg.general.api_base_url, "http://localhost:5000");
    }

    #[test]
    fn set_value_parses_by_existing_type() {
        let mut root: toml::Value =
            toml::from_str("[server]\nopen_browser = false\nbind_addr = \"x\"\n").unwrap();
        set_toml_value(&mut root, "server.open_browser", "on").unwrap();
        set_toml_value(&mut root, "server.bind_addr", "0.0.0.0:80").unwrap();
        assert_eq!(root["server"]["open_browser"].as_bool(), Some(true));
        assert_eq!(root["server"]["bind_addr"].as_str(), Some("0.0.0.0:80"));
    }

    #[test]
    fn set_value_rejects_unknown_and_mistyped_keys() {
        let mut root = toml::Value::try_from(DevwatchConfig::default()).unwrap();
        assert!(set_toml_value(&mut root, "nonexistent.key", "v").is_err());
        assert!(set_toml_value(&mut root, "general.nope", "v").is_err());
        assert!(set_toml_value(&mut root, "charts.detail_points", "many").is_err());
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        init_config_at(&path, false).unwrap();
        assert!(init_config_at(&path, false).is_err());
        assert!(init_config_at(&path, true).is_ok());
    }
}
