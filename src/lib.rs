//! Multi-language code-intelligence extraction engine.
//!
//! Given a file's source and language, this crate walks its concrete syntax
//! tree and produces a uniform `Symbol`/`Relationship`/`TypeInfo` model
//! (C2). See `SPEC_FULL.md` and `DESIGN.md` for the full component
//! breakdown; the short version: [`parsing`] holds the Parser Manager,
//! Base Extractor and per-language extractors, [`indexing`] holds the
//! workspace-wide walking pipeline, everything else is ambient plumbing.

pub mod config;
pub mod error;
pub mod indexing;
pub mod logging;
pub mod parsing;
pub mod relationship;
pub mod symbol;
pub mod types;

pub use config::Settings;
pub use error::{ErrorContext, ExtractError, ExtractResult};
pub use parsing::Language;
pub use relationship::{Relationship, RelationshipTarget};
pub use symbol::{hash_symbol_id, Symbol};
pub use types::{FileId, Range, RelationshipKind, SymbolId, SymbolKind, TypeInfo, Visibility};
