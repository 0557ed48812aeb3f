use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::TempDir;

use daybook_core::ManualClock;
use daybook_engine::{EngineError, Journal, JournalConfig};
use daybook_storage::SqliteStore;

use crate::{HookedStore, TestClient};

/// Several clients acting on one on-disk database with a shared clock.
/// Clients do not coordinate with each other.
pub struct TestNetwork {
    dir: TempDir,
    clock: ManualClock,
    config: JournalConfig,
    clients: Vec<TestClient>,
}

impl TestNetwork {
    pub fn new(today: NaiveDate) -> Result<Self, Box<dyn Error>> {
        Self::with_config(today, JournalConfig::default())
    }

    pub fn with_config(today: NaiveDate, config: JournalConfig) -> Result<Self, Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let mut config = config;
        config.database_path = dir.path().join("daybook.db");
        Ok(Self {
            dir,
            clock: ManualClock::at_noon(today),
            config,
            clients: Vec::new(),
        })
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    pub fn config(&self) -> &JournalConfig {
        &self.config
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("daybook.db")
    }

    pub fn add_client(&mut self) -> Result<usize, EngineError> {
        let client = self.detached_client()?;
        let index = self.clients.len();
        self.clients.push(client);
        Ok(index)
    }

    pub fn client(&self, index: usize) -> &TestClient {
        &self.clients[index]
    }

    pub fn client_mut(&mut self, index: usize) -> &mut TestClient {
        &mut self.clients[index]
    }

    /// A client on the shared database that the network does not keep, so it
    /// can be moved into a store hook.
    pub fn detached_client(&self) -> Result<TestClient, EngineError> {
        TestClient::open(&self.db_path(), self.clock.clone(), &self.config)
    }

    pub fn open_store(&self) -> Result<SqliteStore, EngineError> {
        Ok(SqliteStore::open_with(
            self.db_path(),
            Arc::new(self.clock.clone()),
            self.config.schema_options(),
        )?)
    }

    /// A journal whose store calls can be intercepted.
    pub fn hooked_journal(&self) -> Result<Journal<HookedStore<SqliteStore>>, EngineError> {
        let store = HookedStore::new(self.open_store()?);
        Ok(Journal::new(
            store,
            Arc::new(self.clock.clone()),
            self.config.clone(),
        ))
    }
}
