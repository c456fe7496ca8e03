//! Spawner - Entry Point
//!
//! CLI for spawning, listing and destroying benchmark VM fleets across a
//! configured set of grid farms.

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::error;

use spawner::config::Config;
use spawner::grid::http::GatewaySession;
use spawner::grid::GridSession;
use spawner::logs::{init_logging, LogLevel, LogOptions};
use spawner::models::record::VmRecord;
use spawner::ops;
use spawner::shutdown::{self, ShutdownToken};
use spawner::utils::version_info;

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().skip(1).collect();
    let mut command: Option<String> = None;
    let mut flags: HashMap<String, String> = HashMap::new();

    for arg in &args {
        if let Some(flag) = arg.strip_prefix("--") {
            if let Some((key, value)) = flag.split_once('=') {
                // Handle --key=value format
                flags.insert(key.to_string(), value.to_string());
            } else {
                // Handle standalone flags like --debug
                flags.insert(flag.to_string(), "true".to_string());
            }
        } else if command.is_none() {
            command = Some(arg.clone());
        } else {
            usage();
            std::process::exit(2);
        }
    }

    let Some(command) = command else {
        usage();
        std::process::exit(2);
    };

    // Print version and exit
    if command == "version" {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("Failed to render version info: {}", e),
        }
        return;
    }

    // Initialize logging
    let log_level = if flags.contains_key("debug") {
        LogLevel::Debug
    } else {
        flags
            .get("log-level")
            .and_then(|level| level.parse().ok())
            .unwrap_or_default()
    };
    let log_options = LogOptions {
        log_level,
        json_format: flags.contains_key("json-logs"),
    };
    if let Err(e) = init_logging(log_options) {
        eprintln!("Failed to initialize logging: {e}");
    }

    // Load the config file
    let Some(config_path) = flags.get("config") else {
        error!("required --config=<path> flag is missing");
        std::process::exit(1);
    };
    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("unable to load config file '{}': {}", config_path, e);
            std::process::exit(1);
        }
    };

    // Open the grid session
    let token = SecretString::from(config.mnemonic.expose_secret().to_string());
    let session: Arc<dyn GridSession> = match GatewaySession::new(&config.grid.gateway, token) {
        Ok(session) => Arc::new(session),
        Err(e) => {
            error!("failed to open grid session: {}", e);
            std::process::exit(1);
        }
    };

    // Cancel on SIGINT/SIGTERM
    let shutdown_token = ShutdownToken::new();
    tokio::spawn(shutdown::listen(shutdown_token.clone()));

    let result = match command.as_str() {
        "spawn" => ops::spawn(&config, session.as_ref(), &shutdown_token).await,
        "list" => match ops::list(&config, session.clone()).await {
            Ok(vms) => {
                display_vms(&vms);
                Ok(())
            }
            Err(e) => Err(e),
        },
        "destroy" => ops::destroy(&config, session.as_ref()).await,
        other => {
            error!("unknown command: {}", other);
            usage();
            std::process::exit(2);
        }
    };

    if let Err(e) = result {
        error!("{} failed: {}", command, e);
        std::process::exit(1);
    }
}

/// Print the list of VMs in a tabular format
fn display_vms(vms: &[VmRecord]) {
    println!(
        "{:<8} {:<8} {:<20} {:<12} {}",
        "Farm", "Node", "Name", "Contract", "ProjectName"
    );
    for vm in vms {
        println!(
            "{:<8} {:<8} {:<20} {:<12} {}",
            vm.farm, vm.node, vm.name, vm.contract, vm.project_name
        );
    }
}

fn usage() {
    eprintln!("Usage: spawner <spawn|list|destroy|version> --config=<path> [--debug] [--log-level=<level>] [--json-logs]");
}
