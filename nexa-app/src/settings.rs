//! Persistent application settings (JSON file in app data directory).

use std::fs;
use std::path::{Path, PathBuf};

use nexa_core::{LabelBinding, LookupEndpoints, SessionConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    pub user_id: String,
    /// Relative paths resolve against the settings file's directory.
    pub interaction_log: PathBuf,
    pub response_catalog: PathBuf,
    pub region_map: PathBuf,
    pub lists_dir: PathBuf,
    pub profile_db: PathBuf,
    pub label_binding: LabelBinding,
    pub trees: usize,
    pub holdout_ratio: f32,
    pub max_depth: Option<usize>,
    pub lookup_timeout_secs: u64,
    pub weather_api_key: Option<String>,
    pub news_api_key: Option<String>,
    pub recipe_api_key: Option<String>,
    pub endpoints: LookupEndpoints,
    /// Program that speaks text passed as its last argument (`say`, `espeak`).
    pub tts_command: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            user_id: "default_user".into(),
            interaction_log: PathBuf::from("interactions.jsonl"),
            response_catalog: PathBuf::from("response.txt"),
            region_map: PathBuf::from("countries_capitals.json"),
            lists_dir: PathBuf::from("lists"),
            profile_db: PathBuf::from("profiles.db"),
            label_binding: LabelBinding::Positional,
            trees: 100,
            holdout_ratio: 0.2,
            max_depth: None,
            lookup_timeout_secs: 10,
            weather_api_key: None,
            news_api_key: None,
            recipe_api_key: None,
            endpoints: LookupEndpoints::default(),
            tts_command: None,
        }
    }
}

impl AppSettings {
    pub fn normalize(&mut self) {
        self.user_id = self.user_id.trim().to_string();
        if self.user_id.is_empty() {
            self.user_id = "default_user".into();
        }
        self.trees = self.trees.clamp(1, 1000);
        self.holdout_ratio = if self.holdout_ratio.is_finite() {
            self.holdout_ratio.clamp(0.0, 0.9)
        } else {
            0.2
        };
        self.max_depth = self.max_depth.filter(|d| *d > 0);
        self.lookup_timeout_secs = self.lookup_timeout_secs.clamp(1, 120);
        self.weather_api_key = normalize_optional(self.weather_api_key.take());
        self.news_api_key = normalize_optional(self.news_api_key.take());
        self.recipe_api_key = normalize_optional(self.recipe_api_key.take());
        self.tts_command = normalize_optional(self.tts_command.take());
    }

    /// Override individual values from `NEXA_*` variables. Nothing is
    /// written back to disk.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(user) = lookup("NEXA_USER_ID") {
            self.user_id = user;
        }
        if let Some(key) = lookup("NEXA_WEATHER_API_KEY") {
            self.weather_api_key = Some(key);
        }
        if let Some(key) = lookup("NEXA_NEWS_API_KEY") {
            self.news_api_key = Some(key);
        }
        self.normalize();
    }

    /// Endpoints with API keys filled in.
    pub fn lookup_endpoints(&self) -> LookupEndpoints {
        let mut endpoints = self.endpoints.clone();
        let with_key = |endpoint: Option<nexa_core::EndpointConfig>, key: &Option<String>| {
            endpoint.map(|e| match e.api_key {
                Some(_) => e,
                None => e.with_key(key.clone()),
            })
        };
        endpoints.weather = with_key(endpoints.weather, &self.weather_api_key);
        endpoints.news = with_key(endpoints.news, &self.news_api_key);
        endpoints.recipe = with_key(endpoints.recipe, &self.recipe_api_key);
        endpoints
    }

    /// Session configuration with paths resolved against `base`.
    pub fn session_config(&self, base: &Path, seed: Option<u64>) -> SessionConfig {
        let mut config = SessionConfig {
            log_path: resolve(base, &self.interaction_log),
            catalog_path: resolve(base, &self.response_catalog),
            regions_path: resolve(base, &self.region_map),
            lists_dir: resolve(base, &self.lists_dir),
            label_binding: self.label_binding,
            seed,
            // Profiles come from the SQLite store.
            seed_profiles_from_log: false,
            ..SessionConfig::default()
        };
        config.trainer.forest.n_trees = self.trees;
        config.trainer.forest.max_depth = self.max_depth;
        config.trainer.holdout_ratio = self.holdout_ratio;
        config
    }

    pub fn profile_db_path(&self, base: &Path) -> PathBuf {
        resolve(base, &self.profile_db)
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Nexa")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("nexa")
            .join("settings.json")
    }
}

pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<AppSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}
