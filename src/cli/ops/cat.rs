use std::fmt;
use std::sync::Arc;

use clap::Args;
use owo_colors::OwoColorize;

use dochubfs::api::{CatalogError, HttpCatalogClient, NodeKind};
use dochubfs::fuse::{FsError, MountSession};

use crate::cli::op::{Op, OpContext};

/// Bytes of binary content shown before truncating the hex preview.
const HEX_PREVIEW: usize = 64;

#[derive(Args, Debug, Clone)]
pub struct Cat {
    /// Path of the document to read
    pub path: String,
}

#[derive(Debug)]
pub enum CatContent {
    Text(String),
    Binary(Vec<u8>),
}

#[derive(Debug)]
pub struct CatOutput {
    pub path: String,
    pub size: usize,
    pub content: CatContent,
}

impl fmt::Display for CatOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {}  {} {} bytes",
            "File:".dimmed(),
            self.path.bold(),
            "Size:".dimmed(),
            self.size
        )?;
        match &self.content {
            CatContent::Text(text) => write!(f, "{text}"),
            CatContent::Binary(bytes) => {
                let hex = bytes
                    .iter()
                    .take(HEX_PREVIEW)
                    .map(|b| format!("{:02x}", b))
                    .collect::<Vec<_>>()
                    .join(" ");
                let ellipsis = if bytes.len() > HEX_PREVIEW { " …" } else { "" };
                write!(f, "{} {hex}{ellipsis}", "Binary content (hex):".dimmed())
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl Op for Cat {
    type Error = CatError;
    type Output = CatOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let client =
            HttpCatalogClient::connect(ctx.config.base_url.clone(), &ctx.config.token).await?;
        let session = MountSession::new(Arc::new(client), &ctx.config.cache);

        let node = session.resolver.resolve(&self.path).await?;
        if node.kind == NodeKind::Folder {
            return Err(FsError::IsADirectory.into());
        }

        let size = node.size.min(u32::MAX as u64) as u32;
        let bytes = session.content.read(&node.id, 0, size).await?;

        let content = match String::from_utf8(bytes) {
            Ok(text) => CatContent::Text(text),
            Err(err) => CatContent::Binary(err.into_bytes()),
        };
        Ok(CatOutput {
            path: self.path.clone(),
            size: node.size as usize,
            content,
        })
    }
}

impl fmt::Display for Cat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cat {}", self.path)
    }
}
