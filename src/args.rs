use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use crate::chart::{ChartKind, ChartOptions};
use crate::directory::USERS_ENDPOINT;
use crate::selection::PRESENCE_WEEKDAY_PREFIX;

/// Presence dashboard host
#[derive(Parser, Debug, Clone)]
#[command(name = "presence-dashboard")]
#[command(version)]
pub struct Args {
    /// Address the dashboard listens on
    #[arg(long, env = "PRESENCE_LISTEN", default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// Base URL of the presence API
    #[arg(long, env = "PRESENCE_API_BASE", default_value = "http://127.0.0.1:5000")]
    pub api_base: String,

    /// Directory endpoint, relative to the API base
    #[arg(long, env = "PRESENCE_USERS_ENDPOINT", default_value = USERS_ENDPOINT)]
    pub users_endpoint: String,

    /// Per-user data URL prefix; the user id is appended
    #[arg(long, env = "PRESENCE_DATA_PREFIX", default_value = PRESENCE_WEEKDAY_PREFIX)]
    pub data_prefix: String,

    /// How the per-user data is drawn
    #[arg(long, env = "PRESENCE_CHART", value_enum, default_value = "pie")]
    pub chart: ChartKind,

    /// Page and chart title
    #[arg(long, env = "PRESENCE_TITLE", default_value = "Presence by weekday")]
    pub title: String,

    /// Request timeout for API calls, in seconds
    #[arg(long, env = "PRESENCE_TIMEOUT_SECS", default_value = "30")]
    pub timeout_secs: u64,
}

impl Args {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn chart_options(&self) -> ChartOptions {
        ChartOptions {
            title: Some(self.title.clone()),
            ..ChartOptions::default()
        }
    }
}
