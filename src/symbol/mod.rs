//! The uniform Symbol record (C2, §3).

use crate::parsing::Language;
use crate::types::{CompactString, Range, SymbolId, SymbolKind, Visibility};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: CompactString,
    pub kind: SymbolKind,
    pub language: Language,
    pub file_path: CompactString,
    pub range: Range,
    pub start_byte: u32,
    pub end_byte: u32,
    pub signature: Option<Box<str>>,
    pub doc_comment: Option<Box<str>>,
    pub visibility: Option<Visibility>,
    pub parent_id: Option<SymbolId>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Symbol {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: SymbolId,
        name: impl Into<CompactString>,
        kind: SymbolKind,
        language: Language,
        file_path: impl Into<CompactString>,
        range: Range,
        start_byte: u32,
        end_byte: u32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            language,
            file_path: file_path.into(),
            range,
            start_byte,
            end_byte,
            signature: None,
            doc_comment: None,
            visibility: None,
            parent_id: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_signature(mut self, signature: impl Into<Box<str>>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn with_doc(mut self, doc: impl Into<Box<str>>) -> Self {
        self.doc_comment = Some(doc.into());
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn with_parent(mut self, parent_id: SymbolId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Hashes `(file path, name, start line, start column)` into a 128-bit id
/// (§3 Identity, §4.3 Id hashing, §9 "any fixed 128-bit hash works").
///
/// `salt` perturbs the digest deterministically to resolve an in-file
/// collision (§4.3, §7 `IdCollision`); pass 0 on the first attempt.
pub fn hash_symbol_id(file_path: &str, name: &str, start_line: u32, start_column: u32, salt: u32) -> SymbolId {
    let mut hasher = Sha256::new();
    hasher.update(file_path.as_bytes());
    hasher.update([0u8]);
    hasher.update(name.as_bytes());
    hasher.update([0u8]);
    hasher.update(start_line.to_le_bytes());
    hasher.update(start_column.to_le_bytes());
    if salt != 0 {
        hasher.update(b"#collision#");
        hasher.update(salt.to_le_bytes());
    }
    let digest = hasher.finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    SymbolId::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        let a = hash_symbol_id("src/lib.rs", "foo", 10, 4, 0);
        let b = hash_symbol_id("src/lib.rs", "foo", 10, 4, 0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_differs_on_position() {
        let a = hash_symbol_id("src/lib.rs", "foo", 10, 4, 0);
        let b = hash_symbol_id("src/lib.rs", "foo", 11, 4, 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_salt_perturbs() {
        let a = hash_symbol_id("src/lib.rs", "foo", 10, 4, 0);
        let b = hash_symbol_id("src/lib.rs", "foo", 10, 4, 1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_symbol_builder() {
        let id = hash_symbol_id("a.rs", "f", 1, 0, 0);
        let symbol = Symbol::new(
            id,
            "f",
            SymbolKind::Function,
            Language::Rust,
            "a.rs",
            Range::new(1, 0, 1, 10),
            0,
            10,
        )
        .with_signature("fn f()")
        .with_visibility(Visibility::Public);

        assert_eq!(symbol.name.as_ref(), "f");
        assert_eq!(symbol.signature.as_deref(), Some("fn f()"));
        assert_eq!(symbol.visibility, Some(Visibility::Public));
        assert!(symbol.parent_id.is_none());
    }
}
