use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use docbase_identity::{IdentityGateway, LocalIdentityService, ServiceAccount};
use docbase_server::{DatabaseConfig, Server, ServerConfig};
use docbase_store::InMemoryDocumentStore;

/// Development host: serves the docbase HTTP API over in-memory backends.
#[derive(Parser)]
#[command(name = "docbase-dev", version)]
struct Cli {
    /// TOML server config. A throwaway service account is generated if absent.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured bind address.
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Sign up this email and print an id token for it.
    #[arg(long, default_value = "dev@docbase.local")]
    dev_user: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => ServerConfig::new(ServiceAccount::generate("docbase-dev", "dev@docbase-dev")),
    };
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }

    let identity = LocalIdentityService::for_service_account(&config.service_account)?;
    let session = identity.sign_up(&cli.dev_user, "docbase-dev").await?;
    if let Some(token) = identity.get_id_token(true).await? {
        info!(uid = %session.uid, "dev user signed in");
        println!("{}", token.as_str());
    }

    let store = Arc::new(InMemoryDocumentStore::new());
    let server = Server::from_config(config, store, DatabaseConfig::new())?;
    Arc::new(server).serve().await?;
    Ok(())
}
