use async_trait::async_trait;

use dochubfs::Config;

/// Context shared by every command: the resolved configuration.
pub struct OpContext {
    pub config: Config,
}

/// One executable subcommand. Output goes through Display so commands
/// stay printable without knowing about the terminal.
#[async_trait]
pub trait Op {
    type Error: std::error::Error + Send + Sync + 'static;
    type Output: std::fmt::Display;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}
