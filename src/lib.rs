pub mod analysis;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod host;
pub mod indexer;
pub mod model;
pub mod session;
pub mod text;
pub mod util;
pub mod watch;
pub mod workspace;

pub use config::Config;
pub use host::Host;
pub use session::Session;
