use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
    /// TLS termination happens in front of us; the port is only advertised.
    pub https_port: Option<u16>,
    /// Empty: admin eligibility is restricted to loopback peers.
    /// Non-empty: remote connections must present this PIN at upgrade.
    pub admin_pin: String,
    pub data_dir: PathBuf,
    /// URL guests should open, shown on the holding screen.
    pub public_url: Option<String>,
    /// Initial admin message for the holding screen; the persisted value
    /// wins once one exists.
    pub holding_message: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 8090,
            https_port: None,
            admin_pin: String::new(),
            data_dir: PathBuf::from("./data"),
            public_url: None,
            holding_message: String::new(),
        }
    }
}

impl ServerConfig {
    pub fn connect_url(&self) -> String {
        self.public_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.host, self.http_port))
    }
}
