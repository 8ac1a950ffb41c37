//! Shared setup for client integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use secretary::store::MemoryBackend;
use secretary::{ClientConfig, KeyMaterial, Secretary};
use secretary_testkit::{CountingBackend, TestUser, TestWorld};

pub type Counting = Arc<CountingBackend<Arc<MemoryBackend>>>;
pub type Client = Secretary<Counting>;

/// A world of users behind one counting backend.
pub struct Harness {
    pub world: TestWorld,
    pub backend: Counting,
}

impl Harness {
    pub fn new() -> Self {
        let world = TestWorld::new();
        let backend = Arc::new(CountingBackend::new(Arc::clone(&world.backend)));
        Self { world, backend }
    }

    pub fn client(&self, user: &TestUser) -> Client {
        Secretary::new(config_for(user), Arc::clone(&self.backend))
    }
}

pub fn config_for(user: &TestUser) -> ClientConfig {
    ClientConfig {
        api_url: "memory://".into(),
        username: user.email.clone(),
        user_id: user.id,
        public_key: user.public_key_text(),
        private_key_path: PathBuf::from(format!("{}.key", user.email)),
    }
}

pub fn keys(user: &TestUser) -> KeyMaterial {
    KeyMaterial::new(user.private_key(), user.passphrase.as_str())
}
