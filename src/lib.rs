pub mod cache;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod registry;
pub mod store;
pub mod translator;
pub mod webui;

pub use commands::{
    parse_command, AttachmentClient, AttachmentFetcher, Command, CommandHandler, Invocation, Reply,
};
pub use config::{Config, SdAuthConfig};
pub use error::{BotError, Result};
pub use models::*;
pub use registry::{ModelRegistry, RegistryConfig};
pub use store::DefaultsStore;
pub use translator::{CreateArgs, RequestTranslator};
pub use webui::{WebUiApi, WebUiClient};
