//! System Integration
//!
//! The capability implementations the CLI wires into the activation
//! engine: NetworkManager tunnel control via `nmcli`, persistence back
//! into the on-disk server store, and log-backed notifications.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Mutex;
use tarn_core::{
    CapabilityError, MetaStore, Notifier, OvpnConfig, Pem, ProfileStore, ServerMeta,
    TunnelController,
};
use tokio::process::Command;
use tracing::{debug, info};

/// Drives the system tunnel through `nmcli connection up/down`.
pub struct NetworkManagerTunnel;

impl NetworkManagerTunnel {
    pub fn new() -> Self {
        Self
    }

    async fn nmcli(&self, args: &[&str]) -> Result<(), CapabilityError> {
        debug!("nmcli {}", args.join(" "));
        let output = Command::new("nmcli")
            .args(args)
            .output()
            .await
            .map_err(|e| CapabilityError::Tunnel(format!("spawning nmcli: {e}")))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(CapabilityError::Tunnel(format!(
                "nmcli {}: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

impl Default for NetworkManagerTunnel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TunnelController for NetworkManagerTunnel {
    async fn connect(&self, uuid: &str) -> Result<(), CapabilityError> {
        self.nmcli(&["connection", "up", "uuid", uuid]).await
    }

    async fn disconnect(&self, uuid: &str) -> Result<(), CapabilityError> {
        self.nmcli(&["connection", "down", "uuid", uuid]).await
    }
}

/// Persists activation results back into the server store file.
pub struct FileProfileStore {
    path: PathBuf,
    store: Mutex<MetaStore>,
}

impl FileProfileStore {
    pub fn new(path: PathBuf, store: MetaStore) -> Self {
        Self {
            path,
            store: Mutex::new(store),
        }
    }

    fn save(&self, store: &MetaStore) -> Result<(), CapabilityError> {
        store
            .to_file(&self.path)
            .map_err(|e| CapabilityError::Store(e.to_string()))
    }
}

#[async_trait]
impl ProfileStore for FileProfileStore {
    async fn update_config(
        &self,
        meta: &ServerMeta,
        _config: &OvpnConfig,
    ) -> Result<(), CapabilityError> {
        let mut store = self.store.lock().unwrap();
        let record = store
            .find_mut(&meta.uuid)
            .ok_or_else(|| CapabilityError::Store(format!("no server with uuid {}", meta.uuid)))?;
        record.config = meta.config.clone();
        self.save(&store)
    }

    async fn update_keys(
        &self,
        uuid: &str,
        cert: &Pem,
        key: &Pem,
    ) -> Result<(), CapabilityError> {
        let mut store = self.store.lock().unwrap();
        let record = store
            .find_mut(uuid)
            .ok_or_else(|| CapabilityError::Store(format!("no server with uuid {uuid}")))?;
        record.cert = Some(cert.clone());
        record.key = Some(key.clone());
        self.save(&store)
    }
}

/// Surfaces notifications in the log; the activation engine treats
/// delivery as best-effort either way.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, message: &str) -> Result<(), CapabilityError> {
        info!("{title} {message}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarn_core::ServerMeta;

    fn sample_store() -> MetaStore {
        MetaStore {
            servers: vec![ServerMeta::new(
                "uuid-1",
                "Demo University",
                "https://vpn.example.org/api/",
                "internet",
            )],
        }
    }

    #[tokio::test]
    async fn test_update_keys_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servers.toml");
        sample_store().to_file(&path).unwrap();

        let store = FileProfileStore::new(path.clone(), MetaStore::from_file(&path).unwrap());
        store
            .update_keys("uuid-1", &Pem::new("CERT"), &Pem::new("KEY"))
            .await
            .unwrap();

        let reloaded = MetaStore::from_file(&path).unwrap();
        assert!(reloaded.servers[0].has_keypair());
        assert_eq!(reloaded.servers[0].cert.as_ref().unwrap().as_str(), "CERT");
    }

    #[tokio::test]
    async fn test_update_config_persists_raw_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servers.json");
        sample_store().to_file(&path).unwrap();

        let mut meta = sample_store().servers.remove(0);
        meta.config = Some("dev tun\nremote vpn.example.org 1194\n".into());

        let store = FileProfileStore::new(path.clone(), MetaStore::from_file(&path).unwrap());
        let parsed = tarn_core::parse_ovpn(meta.config.as_deref().unwrap()).unwrap();
        store.update_config(&meta, &parsed).await.unwrap();

        let reloaded = MetaStore::from_file(&path).unwrap();
        assert!(reloaded.servers[0].config.as_deref().unwrap().contains("dev tun"));
    }

    #[tokio::test]
    async fn test_unknown_uuid_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servers.toml");
        sample_store().to_file(&path).unwrap();

        let store = FileProfileStore::new(path.clone(), MetaStore::from_file(&path).unwrap());
        let err = store
            .update_keys("missing", &Pem::new("C"), &Pem::new("K"))
            .await
            .unwrap_err();

        assert!(matches!(err, CapabilityError::Store(_)));
    }
}
