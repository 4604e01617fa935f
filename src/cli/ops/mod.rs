pub mod cat;
pub mod ls;
pub mod mount;
pub mod version;

pub use cat::Cat;
pub use ls::Ls;
pub use mount::Mount;
pub use version::Version;
