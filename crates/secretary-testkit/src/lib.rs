//! # Secretary Testkit
//!
//! Testing utilities for Secretary.
//!
//! ## Overview
//!
//! - **Fixtures**: users with real key files registered in an in-memory backend
//! - **Recording**: a backend wrapper that counts collaborator calls and
//!   injects failures
//! - **Generators**: proptest strategies for titles, content and permissions
//!
//! ## Test Fixtures
//!
//! ```rust
//! use secretary_testkit::TestWorld;
//!
//! let world = TestWorld::new();
//! let alice = world.user("alice@example.com");
//! let bob = world.user("bob@example.com");
//! let team = world.group("team", [&alice, &bob]);
//! # let _ = team;
//! ```
//!
//! ## Counting Calls
//!
//! ```rust
//! use secretary_store::MemoryBackend;
//! use secretary_testkit::{CountingBackend, Op};
//!
//! let backend = CountingBackend::new(MemoryBackend::new());
//! backend.fail_wrapped_key_updates_after(1);
//! assert_eq!(backend.count(Op::UpdateWrappedKey), 0);
//! ```

pub mod fixtures;
pub mod generators;
pub mod recording;

pub use fixtures::{TestUser, TestWorld, TEST_PASSPHRASE};
pub use recording::{CountingBackend, Op};
