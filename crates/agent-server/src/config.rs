//! Process configuration read once at startup.

use std::path::PathBuf;

use agent_runtime::Lookup;

/// Settings owned by the front ends
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub index_path: PathBuf,
    pub top_k: usize,
    pub security_log_path: PathBuf,
    pub max_steps: usize,
    pub bind_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            index_path: "./office_index.json".into(),
            top_k: 3,
            security_log_path: "./security.log".into(),
            max_steps: 10,
            bind_addr: "0.0.0.0:3000".into(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(&agent_runtime::process_env)
    }

    pub fn from_lookup(lookup: &Lookup<'_>) -> Self {
        let defaults = Self::default();
        let number = |key: &str, default: usize| {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(default)
        };

        Self {
            index_path: lookup("OFFICE_INDEX_PATH").map_or(defaults.index_path, PathBuf::from),
            top_k: number("OFFICE_TOP_K", defaults.top_k),
            security_log_path: lookup("SECURITY_LOG_PATH")
                .map_or(defaults.security_log_path, PathBuf::from),
            max_steps: number("AGENT_MAX_STEPS", defaults.max_steps),
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
        }
    }
}
