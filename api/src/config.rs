use std::env;
use std::path::PathBuf;

pub const APP_TITLE: &str = "AdventureWorks Revenue Prediction API";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub model_dir: PathBuf,
    pub model_name: String,
    pub require_model: bool,
    pub max_batch_size: usize,
    pub static_dir: PathBuf,
    pub options_path: PathBuf,
    pub strict_categories: bool,
    pub cors_origins: Vec<String>,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            model_dir: PathBuf::from("api/models"),
            model_name: "xgboost_model".to_string(),
            require_model: true,
            max_batch_size: 100,
            static_dir: PathBuf::from("web"),
            options_path: PathBuf::from("web/options.json"),
            strict_categories: false,
            cors_origins: vec!["*".to_string()],
            log_json: false,
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

fn env_string(name: &str, default: String) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        let cors_origins = env::var("CORS_ORIGINS")
            .map(|v| parse_list(&v))
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or(d.cors_origins);
        Self {
            bind_addr: env_string("API_BIND", d.bind_addr),
            model_dir: PathBuf::from(env_string("MODEL_DIR", d.model_dir.display().to_string())),
            model_name: env_string("MODEL_NAME", d.model_name),
            require_model: env_bool("REQUIRE_MODEL", d.require_model),
            max_batch_size: env_usize("MAX_BATCH_SIZE", d.max_batch_size),
            static_dir: PathBuf::from(env_string("STATIC_DIR", d.static_dir.display().to_string())),
            options_path: PathBuf::from(env_string(
                "OPTIONS_PATH",
                d.options_path.display().to_string(),
            )),
            strict_categories: env_bool("STRICT_CATEGORIES", d.strict_categories),
            cors_origins,
            log_json: env_bool("LOG_JSON", d.log_json),
        }
    }
}
