// Remote catalog client
pub mod api;

// Configuration (file + overrides)
pub mod config;

// The filesystem core
pub mod fuse;

// Re-exports for consumers (CLI, tests)
pub use api::{CatalogClient, CatalogError, ChildRecord, HttpCatalogClient, NodeId, NodeKind};
pub use config::{CacheConfig, Config, ConfigError};
pub use fuse::{FsError, MountSession};
