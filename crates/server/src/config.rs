use serde::Deserialize;

/// Top-level configuration for the incident console backend, loaded from a
/// TOML file and overridable by CLI flags.
#[derive(Debug, Deserialize)]
pub struct IncidentConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

/// HTTP server bind configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_owned()
}

fn default_port() -> u16 {
    8090
}

/// The in-process action simulator's bind address and the address the
/// console reaches it at. These differ when the simulator runs behind a
/// different hostname than it binds (e.g. in a container).
#[derive(Debug, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default = "default_simulator_bind")]
    pub bind: String,
    #[serde(default = "default_simulator_url")]
    pub url: String,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            bind: default_simulator_bind(),
            url: default_simulator_url(),
        }
    }
}

fn default_simulator_bind() -> String {
    "127.0.0.1:8091".to_owned()
}

fn default_simulator_url() -> String {
    "http://127.0.0.1:8091".to_owned()
}

/// Knowledge store persistence configuration.
#[derive(Debug, Deserialize)]
pub struct KnowledgeConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> String {
    "./data".to_owned()
}
