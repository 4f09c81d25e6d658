//! Courier core library: config, the Telegram auth handshake and the command relay
//! pipeline used by the `courier` CLI.

pub mod auth;
pub mod config;
pub mod error;
pub mod init;
pub mod relay;
pub mod startup;
pub mod transport;
