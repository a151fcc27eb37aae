use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::dashboard::DEFAULT_ACTIVITY_LIMIT;
use crate::store::Latency;

/// Sidecar configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub fixtures_dir: Option<PathBuf>,
    pub latency: Latency,
    pub activity_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            fixtures_dir: None,
            latency: Latency::none(),
            activity_limit: DEFAULT_ACTIVITY_LIMIT,
        }
    }
}

pub fn parse_latency(raw: &str) -> Result<Latency> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "none" | "0" => Ok(Latency::none()),
        "mock" => Ok(Latency::mock()),
        ms => {
            let ms: u64 = ms
                .parse()
                .with_context(|| format!("latency must be none, mock or milliseconds, got {raw:?}"))?;
            Ok(Latency::uniform(Duration::from_millis(ms)))
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let latency = match env::var("CLASSTRACKD_LATENCY") {
            Ok(raw) => parse_latency(&raw).context("CLASSTRACKD_LATENCY is invalid")?,
            Err(_) => Latency::none(),
        };
        let activity_limit = match env::var("CLASSTRACKD_ACTIVITY_LIMIT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .context("CLASSTRACKD_ACTIVITY_LIMIT must be a non-negative integer")?,
            Err(_) => DEFAULT_ACTIVITY_LIMIT,
        };
        Ok(Self {
            fixtures_dir: env::var_os("CLASSTRACKD_FIXTURES")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            latency,
            activity_limit,
        })
    }
}
