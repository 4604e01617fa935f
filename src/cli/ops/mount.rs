use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tokio::runtime::Handle;
use tokio::task;

use dochubfs::api::{CatalogError, HttpCatalogClient};
use dochubfs::fuse::{self, MountSession};

use crate::cli::op::{Op, OpContext};

#[derive(Args, Debug, Clone)]
pub struct Mount {
    /// Directory to mount the catalog at
    pub mountpoint: PathBuf,
}

#[derive(Debug)]
pub struct MountOutput {
    mountpoint: PathBuf,
}

impl fmt::Display for MountOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unmounted {}", self.mountpoint.display())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MountError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("mount error: {0}")]
    Mount(#[from] std::io::Error),
    #[error("mount task failed: {0}")]
    Join(#[from] task::JoinError),
}

#[async_trait::async_trait]
impl Op for Mount {
    type Error = MountError;
    type Output = MountOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        // Reaching the catalog is a precondition of mounting: connect
        // downloads the tree and fails the whole command if it cannot.
        let client =
            HttpCatalogClient::connect(ctx.config.base_url.clone(), &ctx.config.token).await?;
        let session = MountSession::new(Arc::new(client), &ctx.config.cache);

        let rt = Handle::current();
        let mountpoint = self.mountpoint.clone();
        task::spawn_blocking(move || fuse::mount(session, rt, &mountpoint)).await??;

        Ok(MountOutput {
            mountpoint: self.mountpoint.clone(),
        })
    }
}

impl fmt::Display for Mount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mount {}", self.mountpoint.display())
    }
}
