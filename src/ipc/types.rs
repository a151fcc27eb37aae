use serde::Deserialize;

use crate::config::Config;
use crate::gradebook::Gradebook;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: Config,
    pub gradebook: Gradebook,
    /// Fixture directory the stores were last seeded from.
    pub workspace: Option<std::path::PathBuf>,
}
