use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

static SETTINGS: OnceLock<Settings> = OnceLock::new();

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub oracle: Oracle,
    pub learning: Learning,
    pub maintenance: Maintenance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Oracle {
    pub base_url: String,
    pub model: String,
    pub probe_timeout_ms: u64,
    pub generate_timeout_secs: u64,
    pub temperature: f32,
    pub top_p: f32,
}

/// Policy knobs for the learning queries. The similarity threshold and the
/// success cutoff are historical constants carried over unchanged; they have
/// no derivation beyond "this is what the system has always used".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Learning {
    pub similarity_threshold: f64,
    pub success_engagement_rate: f64,
    pub top_hashtags_limit: usize,
    pub similar_posts_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Maintenance {
    pub backup_dir: String,
    pub clean_after_days: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            oracle: Oracle {
                base_url: "http://localhost:11434".to_string(),
                model: "llama3.2:3b".to_string(),
                probe_timeout_ms: 2000,
                generate_timeout_secs: 60,
                temperature: 0.7,
                top_p: 0.9,
            },
            learning: Learning {
                similarity_threshold: 0.2,
                success_engagement_rate: 3.0,
                top_hashtags_limit: 15,
                similar_posts_limit: 5,
            },
            maintenance: Maintenance {
                backup_dir: "backups".to_string(),
                clean_after_days: 30,
            },
        }
    }
}

impl Settings {
    pub fn load() -> &'static Settings {
        SETTINGS.get_or_init(Self::load_from_files)
    }

    fn load_from_files() -> Settings {
        let default_path = Path::new("settings.default.ron");
        let override_path = Path::new("settings.ron");

        let mut settings = if default_path.exists() {
            fs::read_to_string(default_path)
                .ok()
                .and_then(|content| ron::from_str(&content).ok())
                .unwrap_or_default()
        } else {
            Settings::default()
        };

        if override_path.exists() {
            if let Ok(content) = fs::read_to_string(override_path) {
                if let Ok(overrides) = ron::from_str::<Settings>(&content) {
                    settings = overrides;
                }
            }
        }

        settings
    }
}

pub fn settings() -> &'static Settings {
    Settings::load()
}
