//! TVM's server binary: load configuration, wire the storage and identity
//! layers, and serve the HTTP surface until ctrl-c.
//!
//! Usage: `tvmd [--config path/to/config.yaml]`. All settings can also come
//! from `TVM_`-prefixed environment variables (see `config::load_config`).

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use tvm::api::{start_api_server, AppState};
use tvm::config::load_config;
use tvm::identity::github::ReqwestGithubClient;
use tvm::observability::{health::DatabaseHealthProvider, init_observability, log_config_info};
use tvm::storage::{
    create_pool, SqlxHierarchyRepository, SqlxTokenRepository, SqlxUserRepository,
    SqlxUserScopeRepository,
};
use tvm::vending::VendingMachine;

#[derive(Parser, Debug)]
#[command(name = "tvmd", about = "Token Vending Machine server")]
struct Args {
    /// Path to a YAML configuration file, layered under environment variables.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;

    let health_checker = init_observability(&config.observability).await?;
    log_config_info(&config);

    info!(app_name = tvm::APP_NAME, version = tvm::VERSION, "starting TVM");

    let pool = create_pool(&config.database).await?;

    health_checker
        .register_provider("database", Box::new(DatabaseHealthProvider::new(pool.clone())))
        .await;

    let machine = VendingMachine::new(
        pool.clone(),
        Arc::new(SqlxUserRepository::new(pool.clone())),
        Arc::new(SqlxUserScopeRepository::new(pool.clone())),
        Arc::new(SqlxTokenRepository::new(pool.clone())),
        Arc::new(SqlxHierarchyRepository::new(pool.clone())),
        ReqwestGithubClient::new(),
        config.auth.clone(),
    );

    let state = AppState { machine: Arc::new(machine), health: Arc::new(health_checker) };

    if let Err(e) = start_api_server(&config.server, state).await {
        error!(error = %e, "TVM server exited with an error");
        std::process::exit(1);
    }

    Ok(())
}
