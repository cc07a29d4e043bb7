//! Core scalar types shared by the symbol/relationship model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 128-bit content-derived identifier.
///
/// Stable within a single extraction run: the same `(file path, name, start
/// line, start column)` always hashes to the same id. Not meant to be
/// stable across runs if the hashing scheme changes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId([u8; 16]);

impl SymbolId {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        let mut s = String::with_capacity(32);
        for byte in &self.0 {
            s.push_str(&format!("{byte:02x}"));
        }
        s
    }
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolId({})", self.to_hex())
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for SymbolId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SymbolId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let mut bytes = [0u8; 16];
        for (i, chunk) in s.as_bytes().chunks(2).take(16).enumerate() {
            if let Ok(text) = std::str::from_utf8(chunk) {
                if let Ok(v) = u8::from_str_radix(text, 16) {
                    bytes[i] = v;
                }
            }
        }
        Ok(SymbolId(bytes))
    }
}

/// A per-run, in-memory identifier for a walked file. Not part of the
/// external contract (§6); used internally by the workspace pipeline to key
/// intermediate maps cheaply instead of cloning paths everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(pub u32);

/// A source span: 1-based lines, 0-based columns, matching tree-sitter's own
/// `Point` convention shifted by one on the line axis (§3 Attributes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Range {
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    /// True if `(line, column)` falls within this span. Middle lines are
    /// fully contained; boundary lines restrict the column comparison
    /// (§4.3 Containment).
    pub fn contains(&self, line: u32, column: u32) -> bool {
        if line < self.start_line || line > self.end_line {
            return false;
        }
        if line == self.start_line && column < self.start_column {
            return false;
        }
        if line == self.end_line && column > self.end_column {
            return false;
        }
        true
    }

    /// True if `other` is entirely within this span (used for parent/child
    /// span-enclosure checks, invariant 2).
    pub fn encloses(&self, other: &Range) -> bool {
        self.contains(other.start_line, other.start_column)
            && self.contains(other.end_line, other.end_column)
    }

    /// A rough size metric used to break containment ties in favor of the
    /// smaller (more specific) span.
    pub fn span_size(&self) -> u64 {
        (self.end_line.saturating_sub(self.start_line) as u64) * 1000
            + (self.end_column.saturating_sub(self.start_column) as u64)
    }
}

/// The closed set of symbol kinds every extractor emits into (Glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SymbolKind {
    Class,
    Interface,
    Function,
    Method,
    Variable,
    Constant,
    Property,
    Enum,
    EnumMember,
    Module,
    Namespace,
    Type,
    Trait,
    Struct,
    Union,
    Field,
    Constructor,
    Destructor,
    Operator,
    Import,
    Export,
    Event,
    Delegate,
}

impl SymbolKind {
    /// Kinds that may validly act as a parent in `parentId` linking (§8).
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            SymbolKind::Class
                | SymbolKind::Interface
                | SymbolKind::Enum
                | SymbolKind::Namespace
                | SymbolKind::Module
                | SymbolKind::Function
                | SymbolKind::Method
        )
    }

    /// Containment-search priority: lower sorts first (§4.3, §4.4.7).
    pub fn containment_priority(&self) -> u8 {
        match self {
            SymbolKind::Function | SymbolKind::Method | SymbolKind::Constructor => 1,
            SymbolKind::Class | SymbolKind::Interface => 2,
            SymbolKind::Namespace | SymbolKind::Module => 3,
            SymbolKind::Variable | SymbolKind::Constant | SymbolKind::Property => 10,
            _ => 5,
        }
    }
}

/// The closed set of relationship kinds (Glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationshipKind {
    Calls,
    Extends,
    Implements,
    Uses,
    Returns,
    Parameter,
    Imports,
    Instantiates,
    References,
    Defines,
    Overrides,
    Contains,
    Joins,
    Includes,
}

/// The closed set of visibility values (Glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
    Protected,
    Package,
}

/// A derived type record produced by the type-inference pass (C6, §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeInfo {
    pub symbol_id: SymbolId,
    pub resolved_type: String,
    pub generic_params: Option<Vec<String>>,
    pub constraints: Option<Vec<String>>,
    pub is_inferred: bool,
    pub language: crate::parsing::Language,
    pub metadata: std::collections::HashMap<String, serde_json::Value>,
}

pub type CompactString = Box<str>;

pub fn compact_string(s: &str) -> CompactString {
    s.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_contains() {
        let range = Range::new(10, 5, 15, 20);
        assert!(range.contains(12, 10));
        assert!(range.contains(10, 5));
        assert!(range.contains(15, 20));
        assert!(!range.contains(9, 10));
        assert!(!range.contains(16, 10));
        assert!(!range.contains(10, 4));
        assert!(!range.contains(15, 21));
    }

    #[test]
    fn test_range_encloses() {
        let parent = Range::new(1, 0, 20, 1);
        let child = Range::new(5, 0, 10, 0);
        assert!(parent.encloses(&child));
        assert!(!child.encloses(&parent));
    }

    #[test]
    fn test_symbol_id_hex_roundtrip() {
        let id = SymbolId::from_bytes([1u8; 16]);
        let hex = id.to_hex();
        assert_eq!(hex.len(), 32);
        let json = serde_json::to_string(&id).unwrap();
        let back: SymbolId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn test_containment_priority_ordering() {
        assert!(SymbolKind::Method.containment_priority() < SymbolKind::Class.containment_priority());
        assert!(SymbolKind::Class.containment_priority() < SymbolKind::Namespace.containment_priority());
        assert!(SymbolKind::Namespace.containment_priority() < SymbolKind::Variable.containment_priority());
    }

    #[test]
    fn test_is_container() {
        assert!(SymbolKind::Class.is_container());
        assert!(SymbolKind::Method.is_container());
        assert!(!SymbolKind::Variable.is_container());
    }
}
