use std::fmt;
use std::sync::Arc;

use clap::Args;
use comfy_table::Table;

use dochubfs::api::{CatalogError, HttpCatalogClient, NodeKind};
use dochubfs::fuse::{DirEntry, FsError, MountSession};

use crate::cli::op::{Op, OpContext};

#[derive(Args, Debug, Clone)]
pub struct Ls {
    /// Path within the catalog (defaults to root)
    #[arg(default_value = "/")]
    pub path: String,
}

#[derive(Debug)]
pub struct LsOutput {
    entries: Vec<DirEntry>,
}

impl fmt::Display for LsOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listed: Vec<_> = self
            .entries
            .iter()
            .filter(|entry| entry.name != "." && entry.name != "..")
            .collect();
        if listed.is_empty() {
            return write!(f, "No entries");
        }

        let mut table = Table::new();
        table.set_header(vec!["TYPE", "NAME"]);
        for entry in listed {
            let kind = match entry.kind {
                NodeKind::Folder => "dir",
                NodeKind::Document => "file",
            };
            table.add_row(vec![kind.to_string(), entry.name.clone()]);
        }
        write!(f, "{table}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LsError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl Op for Ls {
    type Error = LsError;
    type Output = LsOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let client =
            HttpCatalogClient::connect(ctx.config.base_url.clone(), &ctx.config.token).await?;
        let session = MountSession::new(Arc::new(client), &ctx.config.cache);

        let node = session.resolver.resolve(&self.path).await?;
        let entries = session.dirs.list(&node.id).await?;

        Ok(LsOutput {
            entries: entries.as_ref().clone(),
        })
    }
}

impl fmt::Display for Ls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ls {}", self.path)
    }
}
