//! Bidirectional inode ↔ catalog identity mapping
//!
//! FUSE identifies files and directories by 64-bit inode numbers. Inodes
//! are handed out once per catalog identity per mount session and never
//! reused while the mount is active.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::api::NodeId;

#[derive(Debug)]
pub struct InodeTable {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    id_to_inode: HashMap<NodeId, u64>,
    inode_to_id: HashMap<u64, NodeId>,
    /// Next available inode number (starts at 2, as 1 is reserved for root)
    next_inode: u64,
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeTable {
    /// Root inode number (always 1 in FUSE)
    pub const ROOT_INODE: u64 = 1;

    /// Create a new inode table with root pre-registered
    pub fn new() -> Self {
        let mut inner = Inner {
            id_to_inode: HashMap::new(),
            inode_to_id: HashMap::new(),
            next_inode: 2,
        };
        inner.id_to_inode.insert(NodeId::Root, Self::ROOT_INODE);
        inner.inode_to_id.insert(Self::ROOT_INODE, NodeId::Root);

        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Get or create the inode for an identity. Idempotent: concurrent
    /// callers for the same identity all observe the first allocation.
    pub fn allocate(&self, id: &NodeId) -> u64 {
        let mut inner = self.inner.lock();
        if let Some(&inode) = inner.id_to_inode.get(id) {
            return inode;
        }

        let inode = inner.next_inode;
        inner.next_inode += 1;
        inner.id_to_inode.insert(id.clone(), inode);
        inner.inode_to_id.insert(inode, id.clone());
        inode
    }

    /// Get the identity behind an inode if it exists
    pub fn lookup(&self, inode: u64) -> Option<NodeId> {
        self.inner.lock().inode_to_id.get(&inode).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_inode() {
        let table = InodeTable::new();
        assert_eq!(table.allocate(&NodeId::Root), InodeTable::ROOT_INODE);
        assert_eq!(table.lookup(InodeTable::ROOT_INODE), Some(NodeId::Root));
    }

    #[test]
    fn test_allocate_is_idempotent() {
        let table = InodeTable::new();

        let inode1 = table.allocate(&NodeId::Document(7));
        let inode2 = table.allocate(&NodeId::Document(7));
        let inode3 = table.allocate(&NodeId::Course("phys".to_string()));

        assert_eq!(inode1, inode2);
        assert_ne!(inode1, inode3);
        assert_ne!(inode1, InodeTable::ROOT_INODE);
    }

    #[test]
    fn test_lookup_unknown_inode() {
        let table = InodeTable::new();
        assert_eq!(table.lookup(42), None);
    }

    #[test]
    fn test_concurrent_allocation_single_winner() {
        use std::sync::Arc;

        let table = Arc::new(InodeTable::new());
        let mut threads = Vec::new();
        for _ in 0..8 {
            let table = table.clone();
            threads.push(std::thread::spawn(move || {
                table.allocate(&NodeId::Document(1))
            }));
        }

        let inodes: Vec<u64> = threads.into_iter().map(|t| t.join().unwrap()).collect();
        assert!(inodes.windows(2).all(|w| w[0] == w[1]));
    }
}
