//! Read-only FUSE view of the remote document catalog
//!
//! # Architecture
//!
//! - `InodeTable`: bidirectional inode ↔ catalog identity mapping
//! - `NodeStore`: catalog nodes materialized so far, per mount session
//! - `DirectoryBuilder`: lazy, session-stable directory listings
//! - `ContentCache`: document bytes with TTL, size pressure eviction and
//!   single-flight fetch coalescing
//! - `PathResolver`: path → catalog node, walking listings segment by
//!   segment
//! - `DochubFs`: the fuser operation dispatch over all of the above
//!
//! All shared state is built once per mount by [`MountSession`] and
//! handed to the adapter by `Arc`; nothing survives an unmount.

mod content;
mod dir;
mod fs;
mod inode_table;
mod node;
mod resolver;

pub use content::ContentCache;
pub use dir::{DirEntry, DirectoryBuilder};
pub use fs::{check_open, mount, write_requested, DochubFs};
pub use inode_table::InodeTable;
pub use node::{CatalogNode, NodeStore};
pub use resolver::PathResolver;

use std::sync::Arc;
use std::time::SystemTime;

use crate::api::{CatalogClient, CatalogError};
use crate::config::CacheConfig;

/// Filesystem-facing error taxonomy, mapped onto errno values at the
/// FUSE boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FsError {
    #[error("no such entry")]
    NotFound,
    #[error("not a directory")]
    NotADirectory,
    #[error("is a directory")]
    IsADirectory,
    #[error("read-only filesystem")]
    ReadOnly,
    #[error("stale file handle")]
    BadHandle,
    #[error("remote i/o error: {0}")]
    Io(Arc<CatalogError>),
}

impl FsError {
    pub fn errno(&self) -> libc::c_int {
        match self {
            FsError::NotFound => libc::ENOENT,
            FsError::NotADirectory => libc::ENOTDIR,
            FsError::IsADirectory => libc::EISDIR,
            FsError::ReadOnly => libc::EROFS,
            FsError::BadHandle => libc::EBADF,
            FsError::Io(_) => libc::EIO,
        }
    }
}

/// Shared state for one mount session.
///
/// Everything in here is rebuilt from the remote catalog on a fresh
/// mount; no local state is persisted.
#[derive(Clone)]
pub struct MountSession {
    pub inodes: Arc<InodeTable>,
    pub nodes: Arc<NodeStore>,
    pub dirs: Arc<DirectoryBuilder>,
    pub content: Arc<ContentCache>,
    pub resolver: Arc<PathResolver>,
}

impl MountSession {
    pub fn new(client: Arc<dyn CatalogClient>, cache: &CacheConfig) -> Self {
        let mount_time = SystemTime::now();
        let inodes = Arc::new(InodeTable::new());
        let nodes = Arc::new(NodeStore::with_root(mount_time));
        let dirs = Arc::new(DirectoryBuilder::new(
            client.clone(),
            inodes.clone(),
            nodes.clone(),
        ));
        let content = Arc::new(ContentCache::new(client, cache));
        let resolver = Arc::new(PathResolver::new(dirs.clone(), nodes.clone()));

        Self {
            inodes,
            nodes,
            dirs,
            content,
            resolver,
        }
    }
}
