//! Loading, editing and saving the bot's TOML configuration files.
//!
//! All file access goes through a [`ConfigStore`], either the real file
//! system ([`FsStore`]) or an in-memory map ([`MemoryStore`]). On top of it:
//!
//! - [`ConfigSession`] holds one parsed document with its raw text, tracks
//!   unsaved edits and serializes saves.
//! - [`ConfigManager`] finds the bot, model and plugin configuration files
//!   named by a [`StoreConfig`] and projects them into sections for display.
//!
//! ```
//! use config_store::{ConfigSession, MemoryStore};
//! use std::sync::Arc;
//! use toml_patchwork::Value;
//!
//! let store = Arc::new(MemoryStore::new());
//! store.insert("bot.toml", "[bot]\nnickname = \"Fox\" # shown in chat\n");
//!
//! let session = ConfigSession::open(store.clone(), "bot.toml")?;
//! session.patch_section(Some("bot"), &[("nickname", Value::from("Kit"))])?;
//! assert_eq!(
//!     store.contents("bot.toml").as_deref(),
//!     Some("[bot]\nnickname = \"Kit\" # shown in chat\n")
//! );
//! # Ok::<(), config_store::StoreError>(())
//! ```

mod error;
mod manager;
mod session;
mod settings;
mod store;

pub use error::{StoreError, StoreResult};
pub use manager::{ConfigFile, ConfigManager, PluginConfig};
pub use session::ConfigSession;
pub use settings::StoreConfig;
pub use store::{ConfigStore, FsStore, MemoryStore};
