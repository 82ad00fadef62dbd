pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::{cli::LocalStorage, TomlConfig};

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{BackendClient, HttpChatClient};
pub use core::{assistant::Assistant, importer::ImportEngine, Category};
pub use utils::error::{HsseError, Result};
