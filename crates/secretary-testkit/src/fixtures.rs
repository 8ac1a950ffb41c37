//! Users, key files and groups for integration tests.

use std::sync::Arc;

use secretary_core::{GroupId, UserId};
use secretary_crypt::{KdfParams, ProtectedPrivateKey, X25519PublicKey, X25519StaticSecret};
use secretary_store::MemoryBackend;

/// Passphrase protecting every fixture key file.
pub const TEST_PASSPHRASE: &str = "correct horse battery staple";

/// A registered user holding a real, passphrase-protected key file.
#[derive(Debug)]
pub struct TestUser {
    pub id: UserId,
    pub email: String,
    pub secret: X25519StaticSecret,
    /// Armored private key file contents.
    pub key_file: String,
    pub passphrase: String,
}

impl TestUser {
    /// Generate a key pair and protect it with [`TEST_PASSPHRASE`].
    ///
    /// The id is a placeholder until the user is registered.
    pub fn generate(email: &str) -> Self {
        let secret = X25519StaticSecret::generate();
        let key_file = protect(&secret, TEST_PASSPHRASE);
        Self {
            id: UserId::new(0),
            email: email.to_string(),
            secret,
            key_file,
            passphrase: TEST_PASSPHRASE.to_string(),
        }
    }

    pub fn public_key(&self) -> X25519PublicKey {
        self.secret.public_key()
    }

    /// Textual public key as the Key Directory stores it.
    pub fn public_key_text(&self) -> String {
        self.public_key().to_text()
    }

    /// The key file as bytes, the way a client reads it from disk.
    pub fn private_key(&self) -> &[u8] {
        self.key_file.as_bytes()
    }
}

/// An in-memory backend with helpers to populate it.
pub struct TestWorld {
    pub backend: Arc<MemoryBackend>,
}

impl TestWorld {
    pub fn new() -> Self {
        Self::with_backend(Arc::new(MemoryBackend::new()))
    }

    /// Wrap an existing backend, e.g. one shared with a recording wrapper.
    pub fn with_backend(backend: Arc<MemoryBackend>) -> Self {
        Self { backend }
    }

    /// Register a new user with a fresh key.
    pub fn user(&self, email: &str) -> TestUser {
        let mut user = TestUser::generate(email);
        user.id = self
            .backend
            .register_user(email, &user.public_key_text())
            .expect("register fixture user");
        user
    }

    /// Register `count` users named `user{n}@example.com`.
    pub fn users(&self, count: usize) -> Vec<TestUser> {
        (1..=count)
            .map(|n| self.user(&format!("user{n}@example.com")))
            .collect()
    }

    pub fn group<'a>(&self, name: &str, members: impl IntoIterator<Item = &'a TestUser>) -> GroupId {
        self.backend
            .create_group(name, members.into_iter().map(|u| u.id))
            .expect("create fixture group")
    }

    /// Give `user` a new key pair and publish it in the Key Directory.
    ///
    /// Notes sealed before the rotation no longer open with the new key
    /// until they are resealed.
    pub fn rotate_key(&self, user: &mut TestUser) {
        let secret = X25519StaticSecret::generate();
        user.key_file = protect(&secret, &user.passphrase);
        user.secret = secret;
        self.backend
            .set_public_key(user.id, &user.public_key_text())
            .expect("publish rotated key");
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

fn protect(secret: &X25519StaticSecret, passphrase: &str) -> String {
    ProtectedPrivateKey::protect(secret, passphrase, KdfParams::fast())
        .and_then(|p| p.to_armored())
        .expect("protect fixture key")
}

#[cfg(test)]
mod tests {
    use super::*;
    use secretary_crypt::unlock_private_key;
    use secretary_store::{GroupDirectory, KeyDirectory};

    #[tokio::test]
    async fn test_user_key_is_published() {
        let world = TestWorld::new();
        let alice = world.user("alice@example.com");

        let published = world.backend.public_key(alice.id).await.unwrap();
        assert_eq!(published, alice.public_key_text());

        let unlocked = unlock_private_key(alice.private_key(), TEST_PASSPHRASE).unwrap();
        assert_eq!(unlocked.public_key(), alice.public_key());
    }

    #[tokio::test]
    async fn test_group_members() {
        let world = TestWorld::new();
        let users = world.users(3);
        let group = world.group("team", &users[..2]);

        let found = world.backend.group(group).await.unwrap();
        assert!(found.has_member(users[0].id));
        assert!(found.has_member(users[1].id));
        assert!(!found.has_member(users[2].id));
    }

    #[tokio::test]
    async fn test_rotate_key() {
        let world = TestWorld::new();
        let mut alice = world.user("alice@example.com");
        let before = alice.public_key();

        world.rotate_key(&mut alice);

        assert_ne!(alice.public_key(), before);
        assert_eq!(
            world.backend.public_key(alice.id).await.unwrap(),
            alice.public_key_text()
        );
    }
}
