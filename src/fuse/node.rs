//! Catalog nodes materialized for the mount session

use std::collections::HashMap;
use std::time::SystemTime;

use parking_lot::Mutex;

use crate::api::{NodeId, NodeKind};

/// One entry of the catalog tree as the filesystem sees it.
#[derive(Debug, Clone)]
pub struct CatalogNode {
    pub id: NodeId,
    /// Path segment, non-empty and free of separators ("/" for root).
    pub name: String,
    pub kind: NodeKind,
    /// None only for root.
    pub parent: Option<NodeId>,
    /// Size in bytes; zero for folders.
    pub size: u64,
    pub mtime: SystemTime,
}

/// Identity-keyed store of every node seen so far.
///
/// Nodes are registered when a listing first materializes them and live
/// until unmount. The first registration wins, so metadata stays stable
/// within a session.
#[derive(Debug)]
pub struct NodeStore {
    nodes: Mutex<HashMap<NodeId, CatalogNode>>,
}

impl NodeStore {
    /// Create a store with the root folder pre-registered.
    pub fn with_root(mount_time: SystemTime) -> Self {
        let root = CatalogNode {
            id: NodeId::Root,
            name: "/".to_string(),
            kind: NodeKind::Folder,
            parent: None,
            size: 0,
            mtime: mount_time,
        };
        let mut nodes = HashMap::new();
        nodes.insert(NodeId::Root, root);
        Self {
            nodes: Mutex::new(nodes),
        }
    }

    pub fn insert(&self, node: CatalogNode) {
        self.nodes.lock().entry(node.id.clone()).or_insert(node);
    }

    pub fn get(&self, id: &NodeId) -> Option<CatalogNode> {
        self.nodes.lock().get(id).cloned()
    }
}
