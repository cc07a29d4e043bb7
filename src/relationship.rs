//! Directed, typed edges between symbols (C2, §3).

use crate::types::{RelationshipKind, SymbolId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The target of a `Relationship`: either a Symbol known in this run, or an
/// opaque external token (`{lang}:{name}` / `module:{path}`, Glossary).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipTarget {
    Symbol(SymbolId),
    External(String),
}

impl RelationshipTarget {
    pub fn external_token(language_tag: &str, name: &str) -> Self {
        RelationshipTarget::External(format!("{language_tag}:{name}"))
    }

    pub fn module_token(path: &str) -> Self {
        RelationshipTarget::External(format!("module:{path}"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub from_symbol_id: SymbolId,
    pub to: RelationshipTarget,
    pub kind: RelationshipKind,
    pub file_path: Box<str>,
    pub line: u32,
    pub confidence: f32,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Relationship {
    pub fn new(
        from_symbol_id: SymbolId,
        to: RelationshipTarget,
        kind: RelationshipKind,
        file_path: impl Into<Box<str>>,
        line: u32,
    ) -> Self {
        Self {
            from_symbol_id,
            to,
            kind,
            file_path: file_path.into(),
            line,
            confidence: 1.0,
            metadata: HashMap::new(),
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn to_symbol(&self) -> Option<SymbolId> {
        match &self.to {
            RelationshipTarget::Symbol(id) => Some(*id),
            RelationshipTarget::External(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::hash_symbol_id;

    #[test]
    fn test_external_token_shapes() {
        assert_eq!(
            RelationshipTarget::external_token("bash", "docker"),
            RelationshipTarget::External("bash:docker".to_string())
        );
        assert_eq!(
            RelationshipTarget::module_token("java.util.Collections"),
            RelationshipTarget::External("module:java.util.Collections".to_string())
        );
    }

    #[test]
    fn test_confidence_clamped() {
        let from = hash_symbol_id("a.rs", "f", 1, 0, 0);
        let rel = Relationship::new(
            from,
            RelationshipTarget::External("x:y".into()),
            RelationshipKind::Calls,
            "a.rs",
            1,
        )
        .with_confidence(1.5);
        assert_eq!(rel.confidence, 1.0);
    }
}
