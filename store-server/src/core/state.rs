//! Server state
//!
//! `ServerState` holds the shared handles every handler needs: the
//! configuration (immutable after startup) and the embedded store.
//! Cloning is shallow (`Arc` internally).

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::db::StoreStorage;

#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub storage: StoreStorage,
}

impl ServerState {
    pub fn new(config: Config, storage: StoreStorage) -> Self {
        Self {
            config: Arc::new(config),
            storage,
        }
    }

    /// Initialize server state: ensure the data directory exists and
    /// open the database at `<data_dir>/store.redb`.
    ///
    /// # Panics
    ///
    /// Panics when the data directory cannot be created or the database
    /// cannot be opened - the server is unusable without its store.
    pub fn initialize(config: &Config) -> Self {
        let data_dir = PathBuf::from(&config.data_dir);
        std::fs::create_dir_all(&data_dir).expect("Failed to create data directory");

        let db_path = data_dir.join("store.redb");
        let storage = StoreStorage::open(&db_path).expect("Failed to open database");

        tracing::info!(path = %db_path.display(), "Store database opened");

        Self::new(config.clone(), storage)
    }
}
