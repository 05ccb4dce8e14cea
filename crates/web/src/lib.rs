//! Notably Web Server
//!
//! Serves the note page, its script and stylesheet from a static directory.

pub mod config;
pub mod server;
pub mod static_files;

pub use config::WebConfig;
pub use server::WebServer;
pub use static_files::StaticFiles;
