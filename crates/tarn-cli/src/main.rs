//! Tarn: VPN Client Activation CLI
//!
//! Loads the server store, runs one activation attempt for the selected
//! connection, and reports the outcome through the exit code: 0 connected,
//! 1 failed, 2 re-authentication required, 3 cancelled.

mod system;

use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use std::sync::Arc;
use tarn_core::{ActivationResult, Activator, MetaStore};
use tarn_remote::RemoteGateway;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

// Use mimalloc as the global allocator for reduced memory fragmentation
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<()> {
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .compact()
        .init();

    let mut args = std::env::args().skip(1);
    let Some(store_path) = args.next() else {
        bail!("usage: tarn <servers.(toml|json)> [uuid]");
    };
    let path = PathBuf::from(store_path);
    let store = MetaStore::from_file(&path)
        .with_context(|| format!("loading server store {}", path.display()))?;

    let mut meta = match args.next() {
        Some(uuid) => store
            .find(&uuid)
            .cloned()
            .with_context(|| format!("no server with uuid {uuid}"))?,
        None if store.servers.len() == 1 => store.servers[0].clone(),
        None => bail!(
            "store has {} servers; pass the uuid of the one to activate",
            store.servers.len()
        ),
    };

    let gateway = Arc::new(RemoteGateway::for_meta(&meta)?);
    let profile_store = Arc::new(system::FileProfileStore::new(path, store));
    let tunnel = Arc::new(system::NetworkManagerTunnel::new());
    let notifier = Arc::new(system::LogNotifier);
    let activator = Activator::new(gateway, profile_store, tunnel, notifier);

    match activator.activate(&mut meta).await {
        ActivationResult::Connected => {
            info!("'{}' is connected", meta.display_name);
            Ok(())
        }
        ActivationResult::AuthRequired => {
            error!(
                "authorization for '{}' was rejected; re-run the authorization flow and try again",
                meta.display_name
            );
            std::process::exit(2);
        }
        ActivationResult::Cancelled => {
            error!("activation of '{}' was cancelled", meta.display_name);
            std::process::exit(3);
        }
        ActivationResult::Failed { kind, detail } => {
            error!("could not connect '{}' ({kind}): {detail}", meta.display_name);
            std::process::exit(1);
        }
    }
}
