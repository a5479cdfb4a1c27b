//! Environment-driven runtime configuration.

use std::path::PathBuf;
use std::sync::OnceLock;

pub const ENV_DATABASE_DIR: &str = "GLLM_BLAS_DATABASE_DIR";
pub const ENV_DISABLE_FAST_KERNELS: &str = "GLLM_BLAS_DISABLE_FAST_KERNELS";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlasConfig {
    /// Directory of extra JSON tuning tables.
    pub database_dir: Option<PathBuf>,
    /// Always launch the generic kernels, even when a fast variant applies.
    pub disable_fast_kernels: bool,
}

impl BlasConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let database_dir = lookup(ENV_DATABASE_DIR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let disable_fast_kernels = match lookup(ENV_DISABLE_FAST_KERNELS) {
            None => false,
            Some(v) => parse_flag(&v).unwrap_or_else(|| {
                log::warn!("{ENV_DISABLE_FAST_KERNELS}={v:?} is not a boolean, ignoring");
                false
            }),
        };
        BlasConfig { database_dir, disable_fast_kernels }
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

static CONFIG: OnceLock<BlasConfig> = OnceLock::new();

/// Process-wide configuration, read from the environment once.
pub fn global() -> &'static BlasConfig {
    CONFIG.get_or_init(BlasConfig::from_env)
}
