use std::env;
use std::sync::OnceLock;

static CONFIG: OnceLock<Config> = OnceLock::new();

// --- CONFIG AGGREGATOR ---

#[derive(Debug, Clone)]
pub struct Config {
    pub topic_tree: TopicTreeConfig,
}

impl Config {
    pub fn global() -> &'static Config {
        CONFIG.get_or_init(Self::load)
    }

    fn load() -> Self {
        dotenv::dotenv().ok();
        Self {
            topic_tree: TopicTreeConfig::load(),
        }
    }
}

// --- MODULES ---

// TOPIC TREE
#[derive(Debug, Clone)]
pub struct TopicTreeConfig {
    /// Reject publishes whose topic contains a literal `+` or `#` segment
    /// instead of exhibiting the spec's documented undefined behavior.
    pub validate_publish_topics: bool,
}

impl TopicTreeConfig {
    fn load() -> Self {
        Self {
            validate_publish_topics: get_env("TOPIC_TREE_VALIDATE_PUBLISH_TOPICS", "true"),
        }
    }
}

impl Default for TopicTreeConfig {
    fn default() -> Self {
        Self {
            validate_publish_topics: true,
        }
    }
}

// --- PRIVATE HELPER ---

fn get_env<T: std::str::FromStr>(key: &str, default: &str) -> T {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| format!("Config error: {} must be valid", key))
        .unwrap()
}
