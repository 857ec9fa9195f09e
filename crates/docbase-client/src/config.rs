use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Where the hosted store and identity service live.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConnection {
    pub project_id: String,
    pub api_key: Option<String>,
    pub auth_domain: Option<String>,
}

/// Local emulator endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    pub host: String,
    pub store_port: u16,
    pub auth_port: u16,
}

impl EmulatorConfig {
    pub const DEFAULT_STORE_PORT: u16 = 6969;
    pub const DEFAULT_AUTH_PORT: u16 = 4242;

    /// `host:port` of the document store emulator.
    pub fn store_endpoint(&self) -> String {
        format!("{}:{}", self.host, self.store_port)
    }

    /// Base URL of the auth emulator.
    pub fn auth_url(&self) -> String {
        format!("http://{}:{}", self.host, self.auth_port)
    }
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            store_port: Self::DEFAULT_STORE_PORT,
            auth_port: Self::DEFAULT_AUTH_PORT,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub connection: StoreConnection,
    pub use_emulator: bool,
    pub emulator: EmulatorConfig,
}

impl ClientConfig {
    /// Config for the given project, pointed at the local emulators.
    pub fn emulated(project_id: impl Into<String>) -> Self {
        Self {
            connection: StoreConnection {
                project_id: project_id.into(),
                ..Default::default()
            },
            use_emulator: true,
            emulator: EmulatorConfig::default(),
        }
    }

    pub fn from_toml_str(text: &str) -> ClientResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ClientError::Config(e.to_string()))?;
        if config.connection.project_id.trim().is_empty() {
            return Err(ClientError::Config("connection.project_id is required".into()));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_emulator_ports() {
        let c = ClientConfig::default();
        assert!(!c.use_emulator);
        assert_eq!(c.emulator.store_endpoint(), "localhost:6969");
        assert_eq!(c.emulator.auth_url(), "http://localhost:4242");
    }

    #[test]
    fn parses_partial_toml() {
        let c = ClientConfig::from_toml_str(
            r#"
            use_emulator = true

            [connection]
            project_id = "notes-app"
            api_key = "k"
            "#,
        )
        .unwrap();
        assert_eq!(c.connection.project_id, "notes-app");
        assert_eq!(c.connection.api_key.as_deref(), Some("k"));
        assert!(c.use_emulator);
        assert_eq!(c.emulator, EmulatorConfig::default());
    }

    #[test]
    fn project_id_is_required() {
        assert!(matches!(
            ClientConfig::from_toml_str("use_emulator = true"),
            Err(ClientError::Config(_))
        ));
        assert!(matches!(
            ClientConfig::from_toml_str("use_emulator = \"yes\""),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn emulated_config() {
        let c = ClientConfig::emulated("p");
        assert!(c.use_emulator);
        assert_eq!(c.connection.project_id, "p");
    }
}
