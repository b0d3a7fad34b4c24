//! downinthedm: Instagram DM access through a real browser.
//!
//! Drives a Chromium instance with Playwright to log into Instagram,
//! reach the DM inbox, heuristically extract conversations and messages
//! from the obfuscated DOM, and write text reports plus screenshots.
//! The same capabilities are exposed to an LLM agent as tools.

pub mod agent;
pub mod cli;
pub mod core;
pub mod extract;
pub mod monitor;
pub mod report;
pub mod session;
pub mod tools;
pub mod workflow;

pub use core::{ConfigManager, Credentials, DmConfig, DmError, Result};
pub use session::Session;
