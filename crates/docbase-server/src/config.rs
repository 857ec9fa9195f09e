use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use docbase_identity::ServiceAccount;

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    pub service_account: ServiceAccount,
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8787))
}

impl ServerConfig {
    pub fn new(service_account: ServiceAccount) -> Self {
        Self {
            bind_addr: default_bind_addr(),
            service_account,
        }
    }

    /// Parse and check that the service account's key material is usable.
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))?;
        config.service_account.signing_key()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_toml(sa: &ServiceAccount) -> String {
        format!(
            "[service_account]\nproject_id = \"{}\"\nclient_email = \"{}\"\nprivate_key = \"{}\"\n",
            sa.project_id, sa.client_email, sa.private_key
        )
    }

    #[test]
    fn default_bind_addr_applies() {
        let sa = ServiceAccount::generate("proj", "svc@proj");
        let c = ServerConfig::from_toml_str(&account_toml(&sa)).unwrap();
        assert_eq!(c.bind_addr, "127.0.0.1:8787".parse::<SocketAddr>().unwrap());
        assert_eq!(c.service_account.project_id, "proj");
    }

    #[test]
    fn explicit_bind_addr() {
        let sa = ServiceAccount::generate("proj", "svc@proj");
        let text = format!("bind_addr = \"0.0.0.0:9000\"\n{}", account_toml(&sa));
        let c = ServerConfig::from_toml_str(&text).unwrap();
        assert_eq!(c.bind_addr.port(), 9000);
    }

    #[test]
    fn bad_key_material_is_a_config_error() {
        let sa = ServiceAccount {
            project_id: "p".into(),
            client_email: "e".into(),
            private_key: "zz".into(),
        };
        assert!(matches!(
            ServerConfig::from_toml_str(&account_toml(&sa)),
            Err(ServerError::Config(_))
        ));
        assert!(matches!(
            ServerConfig::from_toml_str("bind_addr = \"127.0.0.1:1\""),
            Err(ServerError::Config(_))
        ));
    }
}
