//! Round-trip TOML configuration documents.
//!
//! A [`Document`] is an ordered tree of [`Value`]s that keeps integers and
//! floats apart, keeps integers wider than 64 bits exact and remembers which
//! of the four date/time shapes each literal had. Documents can be edited
//! through dotted paths and written back with [`to_string`].
//!
//! When the original formatting matters, [`patch_section`] edits the text of
//! a single section in place instead, leaving comments and all other
//! sections untouched.
//!
//! # Examples
//!
//! ```
//! use toml_patchwork::{Value, patch_section};
//!
//! let text = "\
//! # chat bot settings
//! [bot]
//! nickname = \"Fox\"
//!
//! [security]
//! master_users = []  # platform, id
//! ";
//!
//! let mut doc = toml_patchwork::parse(text)?;
//! assert_eq!(doc.get("bot.nickname")?.and_then(Value::as_str), Some("Fox"));
//!
//! // Structured edit: the whole document is re-rendered.
//! doc.set("bot.nickname", Value::from("Kit"))?;
//! assert!(doc.to_toml()?.contains("nickname = \"Kit\""));
//!
//! // Textual edit: only the `master_users` line changes.
//! let users = toml_patchwork::parse_value("[[\"qq\", \"111\"]]")?;
//! let patched = patch_section(text, Some("security"), &[("master_users", users)])?;
//! assert!(patched.starts_with("# chat bot settings\n[bot]\nnickname = \"Fox\"\n"));
//! assert!(patched.contains("master_users = [[\"qq\", \"111\"]]  # platform, id"));
//! # Ok::<(), toml_patchwork::Error>(())
//! ```

mod array;
mod document;
mod error;
mod parser;
mod patch;
mod ser;
mod span;
mod table;
mod time;
mod value;
mod view;

pub use array::{Array, ArrayKind};
pub use document::Document;
pub use error::{Error, ErrorCategory, ErrorKind};
pub use parser::{MAX_NESTING_DEPTH, parse, parse_value};
pub use patch::{SectionPatch, patch_section};
pub use ser::{dotted_path, to_string};
pub use span::Span;
pub use table::{Table, TableKind};
pub use time::{Date, Datetime, DatetimeKind, DatetimeParseError, Time, TimeOffset};
pub use value::{Integer, Key, Value};
pub use view::{ConfigField, ConfigSection, sections};
