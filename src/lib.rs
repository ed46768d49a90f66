pub mod auth;
pub mod client;
pub mod config;
mod dispatch;
pub mod stats;
pub mod store;
pub mod td;

pub use auth::{CredentialPrompt, StdinPrompt};
pub use client::Client;
pub use config::ClientConfig;
pub use store::StatusStore;
