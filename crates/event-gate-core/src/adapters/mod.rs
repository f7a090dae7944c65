//! # Infrastructure Adapters
//!
//! Implementations of the secret store and message queue interfaces.

pub mod memory_key_vault;
pub mod memory_publisher;
pub mod pubsub_publisher;
pub mod secret_manager;

pub use memory_key_vault::InMemoryKeyVaultProvider;
pub use memory_publisher::InMemoryEventPublisher;
pub use pubsub_publisher::{PubSubConfig, PubSubEventPublisher};
pub use secret_manager::{SecretManagerConfig, SecretManagerKeyVaultProvider};
