use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use signoff_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

use crate::commands::CommandResult;

/// Where a value came from, checked from the strongest layer down.
struct Sources {
    file_path: Option<PathBuf>,
    file_doc: Option<Value>,
}

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            )
        }
    };

    let file_path = resolve_config_path(options.config_path.as_deref());
    let file_doc = load_config_file_doc(file_path.as_deref());
    let sources = Sources { file_path, file_doc };

    let mut lines = vec![
        "effective config (source precedence: flag > env > file > default):".to_string(),
    ];

    lines.push(render_line(
        "storage.url",
        &config.storage.url,
        sources.field_source("storage.url", &["SIGNOFF_STORAGE_URL"], None),
    ));
    lines.push(render_line(
        "storage.profile",
        &config.storage.profile,
        sources.field_source(
            "storage.profile",
            &["SIGNOFF_STORAGE_PROFILE"],
            options.overrides.profile.as_ref().map(|_| "--profile"),
        ),
    ));
    lines.push(render_line(
        "storage.max_connections",
        &config.storage.max_connections.to_string(),
        sources.field_source(
            "storage.max_connections",
            &["SIGNOFF_STORAGE_MAX_CONNECTIONS"],
            None,
        ),
    ));
    lines.push(render_line(
        "storage.timeout_secs",
        &config.storage.timeout_secs.to_string(),
        sources.field_source("storage.timeout_secs", &["SIGNOFF_STORAGE_TIMEOUT_SECS"], None),
    ));
    lines.push(render_line(
        "storage.watch_interval_ms",
        &config.storage.watch_interval_ms.to_string(),
        sources.field_source(
            "storage.watch_interval_ms",
            &["SIGNOFF_STORAGE_WATCH_INTERVAL_MS"],
            None,
        ),
    ));
    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        sources.field_source(
            "logging.level",
            &["SIGNOFF_LOGGING_LEVEL", "SIGNOFF_LOG_LEVEL"],
            None,
        ),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format).to_ascii_lowercase(),
        sources.field_source(
            "logging.format",
            &["SIGNOFF_LOGGING_FORMAT", "SIGNOFF_LOG_FORMAT"],
            None,
        ),
    ));

    CommandResult::text(lines.join("\n"))
}

impl Sources {
    fn field_source(&self, key_path: &str, env_keys: &[&str], flag: Option<&str>) -> String {
        if let Some(flag) = flag {
            return format!("flag ({flag})");
        }

        for env_key in env_keys {
            let set = env::var(env_key).map(|value| !value.trim().is_empty()).unwrap_or(false);
            if set {
                return format!("env ({env_key})");
            }
        }

        if let Some(doc) = &self.file_doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .file_path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
