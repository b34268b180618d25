use shared_types::AppConfig;
use std::sync::OnceLock;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Path to the config file, relative to the working directory.
/// Overridable with `INTAKE_CONFIG`.
const CONFIG_PATH: &str = "config.toml";

/// Read and parse the config file, falling back to defaults when it is
/// missing or unparseable.
pub fn read_config(path: &str) -> AppConfig {
    match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
            eprintln!("[config] Failed to parse {path}: {e}; using defaults");
            AppConfig::default()
        }),
        Err(e) => {
            eprintln!("[config] {path} not found ({e}); using defaults");
            AppConfig::default()
        }
    }
}

/// Load the config into the global `OnceLock`. Safe to call multiple
/// times; only the first call has effect.
pub fn load_config() -> &'static AppConfig {
    CONFIG.get_or_init(|| {
        let path = std::env::var("INTAKE_CONFIG").unwrap_or_else(|_| CONFIG_PATH.to_string());
        read_config(&path)
    })
}

/// Get the loaded config. Returns defaults if `load_config()` hasn't been
/// called yet.
pub fn app_config() -> &'static AppConfig {
    static DEFAULT: OnceLock<AppConfig> = OnceLock::new();
    CONFIG
        .get()
        .unwrap_or_else(|| DEFAULT.get_or_init(AppConfig::default))
}
