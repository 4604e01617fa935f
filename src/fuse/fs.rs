//! FUSE operation dispatch
//!
//! `DochubFs` translates the read-only operation set (lookup, getattr,
//! readdir, open, read, release, statfs) onto the mount session's
//! structures. fuser callbacks are synchronous, so each operation
//! bridges onto the shared tokio runtime with `block_on`. Every mutating
//! operation answers EROFS.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use fuser::{
    FileAttr, FileType, Filesystem, MountOption, ReplyAttr, ReplyCreate, ReplyData,
    ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, Request,
};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::api::{NodeId, NodeKind};

use super::content::ContentCache;
use super::dir::DirectoryBuilder;
use super::inode_table::InodeTable;
use super::node::{CatalogNode, NodeStore};
use super::{FsError, MountSession};

/// Kernel-side validity of entries and attributes.
const TTL: Duration = Duration::from_secs(1);
const GENERATION: u64 = 0;

pub struct DochubFs {
    rt: Handle,
    inodes: Arc<InodeTable>,
    nodes: Arc<NodeStore>,
    dirs: Arc<DirectoryBuilder>,
    content: Arc<ContentCache>,
    /// Open file handles, fh → document identity. Cache entries outlive
    /// these.
    handles: Mutex<HashMap<u64, NodeId>>,
    next_fh: AtomicU64,
    uid: u32,
    gid: u32,
}

impl DochubFs {
    pub fn new(session: &MountSession, rt: Handle) -> Self {
        Self {
            rt,
            inodes: session.inodes.clone(),
            nodes: session.nodes.clone(),
            dirs: session.dirs.clone(),
            content: session.content.clone(),
            handles: Mutex::new(HashMap::new()),
            next_fh: AtomicU64::new(1),
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
        }
    }

    fn attr_for(&self, inode: u64, node: &CatalogNode) -> FileAttr {
        let (kind, perm) = match node.kind {
            // Read-only throughout: no write bits on anything.
            NodeKind::Folder => (FileType::Directory, 0o555),
            NodeKind::Document => (FileType::RegularFile, 0o444),
        };
        FileAttr {
            ino: inode,
            size: node.size,
            blocks: node.size.div_ceil(512),
            atime: node.mtime,
            mtime: node.mtime,
            ctime: node.mtime,
            crtime: node.mtime,
            kind,
            perm,
            nlink: 1,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: 512,
            flags: 0,
        }
    }

    fn node_for(&self, inode: u64) -> Result<CatalogNode, FsError> {
        let id = self.inodes.lookup(inode).ok_or(FsError::NotFound)?;
        self.nodes.get(&id).ok_or(FsError::NotFound)
    }
}

/// True when the open flags ask for anything beyond reading.
pub fn write_requested(flags: i32) -> bool {
    flags & libc::O_ACCMODE != libc::O_RDONLY
}

/// Admission check applied before a file handle is handed out.
pub fn check_open(node: &CatalogNode, flags: i32) -> Result<(), FsError> {
    if node.kind == NodeKind::Folder {
        return Err(FsError::IsADirectory);
    }
    if write_requested(flags) {
        return Err(FsError::ReadOnly);
    }
    Ok(())
}

impl Filesystem for DochubFs {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(name) = name.to_str() else {
            reply.error(libc::ENOENT);
            return;
        };

        let result = self.rt.block_on(async {
            let parent_id = self.inodes.lookup(parent).ok_or(FsError::NotFound)?;
            let entries = self.dirs.list(&parent_id).await?;
            let entry = entries
                .iter()
                .find(|entry| entry.name == name)
                .ok_or(FsError::NotFound)?;
            let node = self.nodes.get(&entry.id).ok_or(FsError::NotFound)?;
            Ok::<_, FsError>((entry.inode, node))
        });

        match result {
            Ok((inode, node)) => reply.entry(&TTL, &self.attr_for(inode, &node), GENERATION),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        match self.node_for(ino) {
            Ok(node) => reply.attr(&TTL, &self.attr_for(ino, &node)),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let result = self.rt.block_on(async {
            let id = self.inodes.lookup(ino).ok_or(FsError::NotFound)?;
            self.dirs.list(&id).await
        });

        let entries = match result {
            Ok(entries) => entries,
            Err(err) => {
                reply.error(err.errno());
                return;
            }
        };

        for (i, entry) in entries.iter().enumerate().skip(offset.max(0) as usize) {
            let kind = match entry.kind {
                NodeKind::Folder => FileType::Directory,
                NodeKind::Document => FileType::RegularFile,
            };
            if reply.add(entry.inode, (i + 1) as i64, kind, &entry.name) {
                break;
            }
        }
        reply.ok();
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let node = match self.node_for(ino) {
            Ok(node) => node,
            Err(err) => {
                reply.error(err.errno());
                return;
            }
        };
        if let Err(err) = check_open(&node, flags) {
            reply.error(err.errno());
            return;
        }

        let fh = self.next_fh.fetch_add(1, Ordering::SeqCst);
        self.handles.lock().insert(fh, node.id.clone());
        debug!(ino, fh, "opened document");
        reply.opened(fh, 0);
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let Some(id) = self.handles.lock().get(&fh).cloned() else {
            reply.error(FsError::BadHandle.errno());
            return;
        };

        match self
            .rt
            .block_on(self.content.read(&id, offset.max(0) as u64, size))
        {
            Ok(bytes) => reply.data(&bytes),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        self.handles.lock().remove(&fh);
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        // Static placeholders: a remote catalog has no block accounting.
        reply.statfs(0, 0, 0, 0, 0, 512, 255, 0);
    }

    fn destroy(&mut self) {
        info!("filesystem unmounted");
        self.handles.lock().clear();
    }

    // Writes are refused wholesale, whatever the kernel asks for.

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        _size: Option<u64>,
        _atime: Option<fuser::TimeOrNow>,
        _mtime: Option<fuser::TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        reply.error(libc::EROFS);
    }

    fn mknod(
        &mut self,
        _req: &Request<'_>,
        _parent: u64,
        _name: &OsStr,
        _mode: u32,
        _umask: u32,
        _rdev: u32,
        reply: ReplyEntry,
    ) {
        reply.error(libc::EROFS);
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        _parent: u64,
        _name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        reply.error(libc::EROFS);
    }

    fn unlink(&mut self, _req: &Request<'_>, _parent: u64, _name: &OsStr, reply: ReplyEmpty) {
        reply.error(libc::EROFS);
    }

    fn rmdir(&mut self, _req: &Request<'_>, _parent: u64, _name: &OsStr, reply: ReplyEmpty) {
        reply.error(libc::EROFS);
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        _parent: u64,
        _name: &OsStr,
        _newparent: u64,
        _newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        reply.error(libc::EROFS);
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        _parent: u64,
        _name: &OsStr,
        _mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        reply.error(libc::EROFS);
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _offset: i64,
        _data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        reply.error(libc::EROFS);
    }
}

/// Mount the session at `mountpoint` and block until unmounted. The
/// read-only option is always applied, whatever the caller asked for.
pub fn mount(session: MountSession, rt: Handle, mountpoint: &Path) -> std::io::Result<()> {
    let options = [
        MountOption::FSName("dochubfs".to_string()),
        MountOption::RO,
        MountOption::DefaultPermissions,
    ];
    let fs = DochubFs::new(&session, rt);
    info!(mountpoint = %mountpoint.display(), "mounting catalog");
    fuser::mount2(fs, mountpoint, &options)
}
