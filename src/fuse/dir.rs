//! Lazy directory materialization
//!
//! A folder's children are fetched from the catalog on first access and
//! the finished listing is cached for the rest of the session, so every
//! later `readdir`/`lookup` of that folder is served locally and returns
//! the same entries in the same order.

use std::collections::HashMap;
use std::sync::Arc;

use moka::future::Cache;
use tracing::{debug, warn};

use crate::api::{CatalogClient, ChildRecord, NodeId, NodeKind};

use super::inode_table::InodeTable;
use super::node::{CatalogNode, NodeStore};
use super::FsError;

/// One directory entry as returned to the FUSE layer.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub inode: u64,
    pub kind: NodeKind,
    pub id: NodeId,
}

pub struct DirectoryBuilder {
    client: Arc<dyn CatalogClient>,
    inodes: Arc<InodeTable>,
    nodes: Arc<NodeStore>,
    /// One listing per folder per session. `try_get_with` also coalesces
    /// concurrent first listings of the same folder onto one fetch.
    listings: Cache<NodeId, Arc<Vec<DirEntry>>>,
}

impl DirectoryBuilder {
    pub fn new(
        client: Arc<dyn CatalogClient>,
        inodes: Arc<InodeTable>,
        nodes: Arc<NodeStore>,
    ) -> Self {
        Self {
            client,
            inodes,
            nodes,
            listings: Cache::builder().build(),
        }
    }

    /// Ordered entries of a folder, `.` and `..` included. Entries are
    /// sorted lexicographically by name; duplicate sibling names are
    /// disambiguated with a " (2)", " (3)", … suffix in catalog order.
    pub async fn list(&self, id: &NodeId) -> Result<Arc<Vec<DirEntry>>, FsError> {
        let node = self.nodes.get(id).ok_or(FsError::NotFound)?;
        if node.kind == NodeKind::Document {
            return Err(FsError::NotADirectory);
        }

        self.listings
            .try_get_with(id.clone(), self.build(node))
            .await
            .map_err(|err: Arc<FsError>| (*err).clone())
    }

    async fn build(&self, node: CatalogNode) -> Result<Arc<Vec<DirEntry>>, FsError> {
        debug!(id = ?node.id, "materializing directory");
        let records = self
            .client
            .list_children(&node.id)
            .await
            .map_err(|err| FsError::Io(Arc::new(err)))?;

        let mut seen: HashMap<String, u32> = HashMap::new();
        let mut children = Vec::with_capacity(records.len());
        for record in records {
            let Some(name) = accepted_name(&node.id, &record, &mut seen) else {
                continue;
            };
            let inode = self.inodes.allocate(&record.id);
            self.nodes.insert(CatalogNode {
                id: record.id.clone(),
                name: name.clone(),
                kind: record.kind,
                parent: Some(node.id.clone()),
                size: record.size,
                mtime: record.mtime,
            });
            children.push(DirEntry {
                name,
                inode,
                kind: record.kind,
                id: record.id,
            });
        }
        children.sort_by(|a, b| a.name.cmp(&b.name));

        let self_inode = self.inodes.allocate(&node.id);
        let (parent_inode, parent_id) = match &node.parent {
            Some(parent) => (self.inodes.allocate(parent), parent.clone()),
            // Root's ".." points back at root.
            None => (self_inode, node.id.clone()),
        };

        let mut entries = Vec::with_capacity(children.len() + 2);
        entries.push(DirEntry {
            name: ".".to_string(),
            inode: self_inode,
            kind: NodeKind::Folder,
            id: node.id.clone(),
        });
        entries.push(DirEntry {
            name: "..".to_string(),
            inode: parent_inode,
            kind: NodeKind::Folder,
            id: parent_id,
        });
        entries.extend(children);

        Ok(Arc::new(entries))
    }
}

/// Validate a child record and settle its listed name. Returns None for
/// records that must not appear in the listing; those are logged and do
/// not abort the listing of their siblings.
fn accepted_name(
    parent: &NodeId,
    record: &ChildRecord,
    seen: &mut HashMap<String, u32>,
) -> Option<String> {
    if record.name.is_empty()
        || record.name.contains('/')
        || record.name == "."
        || record.name == ".."
    {
        warn!(?parent, name = %record.name, "skipping child with unusable name");
        return None;
    }
    if let Some(claimed) = &record.parent {
        if claimed != parent {
            warn!(?parent, ?claimed, name = %record.name, "skipping child with mismatched parent");
            return None;
        }
    }

    let occurrence = seen
        .entry(record.name.clone())
        .and_modify(|count| *count += 1)
        .or_insert(1);
    if *occurrence == 1 {
        Some(record.name.clone())
    } else {
        Some(format!("{} ({})", record.name, occurrence))
    }
}
