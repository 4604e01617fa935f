//! Remote catalog client
//!
//! The catalog is the hierarchical metadata the DocHub service exposes:
//! categories contain sub-categories and courses, courses contain
//! documents. The filesystem core only depends on the [`CatalogClient`]
//! trait; [`HttpCatalogClient`] is the production implementation and
//! tests substitute scripted ones.

mod http;

pub use http::HttpCatalogClient;

use std::time::SystemTime;

use async_trait::async_trait;

/// Identity of one catalog node, opaque to the filesystem layer.
///
/// Categories carry no server-side id, so they are identified by their
/// materialized path within the tree snapshot. Courses are identified by
/// slug and documents by their numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeId {
    Root,
    Category(String),
    Course(String),
    Document(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Folder,
    Document,
}

/// One child as reported by the remote catalog.
#[derive(Debug, Clone)]
pub struct ChildRecord {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    /// Size in bytes; zero for folders.
    pub size: u64,
    pub mtime: SystemTime,
    /// Parent identity as claimed by the remote, when it reports one.
    /// Listings drop records whose claimed parent is not the node being
    /// listed.
    pub parent: Option<NodeId>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("remote returned {0}: {1}")]
    Status(reqwest::StatusCode, String),
    #[error("malformed catalog response: {0}")]
    Malformed(String),
    #[error("{0:?} is not a folder")]
    NotAFolder(NodeId),
    #[error("{0:?} is not a document")]
    NotADocument(NodeId),
    #[error("fetch task interrupted")]
    Interrupted,
}

/// Remote catalog operations the filesystem consumes.
#[async_trait]
pub trait CatalogClient: Send + Sync + 'static {
    /// List the direct children of a folder node.
    async fn list_children(&self, node: &NodeId) -> Result<Vec<ChildRecord>, CatalogError>;

    /// Fetch the complete byte content of a document node.
    async fn fetch_content(&self, node: &NodeId) -> Result<Vec<u8>, CatalogError>;
}
