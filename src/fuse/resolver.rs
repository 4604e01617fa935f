//! Path → catalog node resolution
//!
//! Walks a slash-separated path from the root, one listing per segment.
//! Matching is exact and case-sensitive. The FUSE layer itself works on
//! inodes; this is the entry point for path-shaped callers such as the
//! `ls` and `cat` commands.

use std::sync::Arc;

use crate::api::{NodeId, NodeKind};

use super::dir::DirectoryBuilder;
use super::node::{CatalogNode, NodeStore};
use super::FsError;

pub struct PathResolver {
    dirs: Arc<DirectoryBuilder>,
    nodes: Arc<NodeStore>,
}

impl PathResolver {
    pub fn new(dirs: Arc<DirectoryBuilder>, nodes: Arc<NodeStore>) -> Self {
        Self { dirs, nodes }
    }

    /// Resolve a path to its catalog node. Empty segments are ignored,
    /// so "/", "" and "//a//b/" behave like their cleaned forms. The
    /// root path resolves without any catalog calls.
    pub async fn resolve(&self, path: &str) -> Result<CatalogNode, FsError> {
        let mut current = self.nodes.get(&NodeId::Root).ok_or(FsError::NotFound)?;

        for segment in path.split('/').filter(|s| !s.is_empty()) {
            // Only folders may have further segments.
            if current.kind == NodeKind::Document {
                return Err(FsError::NotFound);
            }
            let entries = self.dirs.list(&current.id).await?;
            let matched = entries
                .iter()
                .find(|entry| entry.name == segment)
                .ok_or(FsError::NotFound)?;
            current = self.nodes.get(&matched.id).ok_or(FsError::NotFound)?;
        }

        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use async_trait::async_trait;

    use crate::api::{CatalogClient, CatalogError, ChildRecord};
    use crate::fuse::inode_table::InodeTable;

    use super::*;

    struct TwoLevelCatalog;

    #[async_trait]
    impl CatalogClient for TwoLevelCatalog {
        async fn list_children(&self, node: &NodeId) -> Result<Vec<ChildRecord>, CatalogError> {
            match node {
                NodeId::Root => Ok(vec![ChildRecord {
                    id: NodeId::Course("phys".to_string()),
                    name: "phys Physique".to_string(),
                    kind: NodeKind::Folder,
                    size: 0,
                    mtime: SystemTime::UNIX_EPOCH,
                    parent: None,
                }]),
                NodeId::Course(_) => Ok(vec![ChildRecord {
                    id: NodeId::Document(1),
                    name: "notes.pdf".to_string(),
                    kind: NodeKind::Document,
                    size: 500,
                    mtime: SystemTime::UNIX_EPOCH,
                    parent: None,
                }]),
                _ => Err(CatalogError::NotAFolder(node.clone())),
            }
        }

        async fn fetch_content(&self, node: &NodeId) -> Result<Vec<u8>, CatalogError> {
            Err(CatalogError::NotADocument(node.clone()))
        }
    }

    fn resolver() -> PathResolver {
        let nodes = Arc::new(NodeStore::with_root(SystemTime::UNIX_EPOCH));
        let dirs = Arc::new(DirectoryBuilder::new(
            Arc::new(TwoLevelCatalog),
            Arc::new(InodeTable::new()),
            nodes.clone(),
        ));
        PathResolver::new(dirs, nodes)
    }

    #[tokio::test]
    async fn test_root_resolves_without_listing() {
        let resolver = resolver();
        let node = resolver.resolve("/").await.unwrap();
        assert_eq!(node.id, NodeId::Root);
    }

    #[tokio::test]
    async fn test_resolve_document() {
        let resolver = resolver();
        let node = resolver.resolve("/phys Physique/notes.pdf").await.unwrap();
        assert_eq!(node.id, NodeId::Document(1));
        assert_eq!(node.size, 500);
    }

    #[tokio::test]
    async fn test_empty_segments_ignored() {
        let resolver = resolver();
        let node = resolver.resolve("//phys Physique//").await.unwrap();
        assert_eq!(node.id, NodeId::Course("phys".to_string()));
    }

    #[tokio::test]
    async fn test_matching_is_case_sensitive() {
        let resolver = resolver();
        let err = resolver.resolve("/PHYS Physique").await.unwrap_err();
        assert!(matches!(err, FsError::NotFound));
    }

    #[tokio::test]
    async fn test_segment_below_document_not_found() {
        let resolver = resolver();
        let err = resolver
            .resolve("/phys Physique/notes.pdf/deeper")
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::NotFound));
    }
}
