//! Cross-Language Binding Detector (C5, §4.5): a post-pass over a file's
//! already-emitted Symbols that recognizes edges leaving the language —
//! shell invocations of other runtimes, ECMAScript module imports, and
//! (per the extensible table below) whatever other languages the pack
//! needs later.

use crate::parsing::Language;
use crate::relationship::{Relationship, RelationshipTarget};
use crate::symbol::Symbol;
use crate::types::{RelationshipKind, SymbolKind};

/// `(invoker name, target language)`. Anything not in this table but still
/// containing `/` is still recognized (§4.4.5) with `targetLanguage` left
/// unset.
const SHELL_INVOKERS: &[(&str, &str)] = &[
    ("python", "python"),
    ("python3", "python"),
    ("node", "javascript"),
    ("npm", "javascript"),
    ("bun", "javascript"),
    ("go", "go"),
    ("cargo", "rust"),
    ("java", "java"),
    ("docker", "docker"),
    ("kubectl", "kubernetes"),
    ("terraform", "terraform"),
    ("git", "git"),
    ("curl", "http"),
];

fn invoker_target_language(name: &str) -> Option<&'static str> {
    SHELL_INVOKERS
        .iter()
        .find(|(invoker, _)| *invoker == name)
        .map(|(_, target)| *target)
}

/// Bindings produced for one file (§4.5). These are `Relationship`-shaped
/// records rather than a distinct schema: the closed `RelationshipKind` set
/// has no `binding` member, so bindings reuse the kind that already
/// describes the edge (`Calls` for a process invocation, `Imports` for a
/// module reference) and carry `metadata.edgeKind = "binding"` plus the
/// source/target language tags the spec calls for.
pub fn detect_bindings(language: Language, symbols: &[Symbol], file_path: &str) -> Vec<Relationship> {
    match language {
        Language::Bash => shell_bindings(symbols, file_path),
        Language::JavaScript | Language::TypeScript => ecmascript_bindings(symbols, file_path, language),
        _ => Vec::new(),
    }
}

fn shell_bindings(symbols: &[Symbol], file_path: &str) -> Vec<Relationship> {
    let mut bindings = Vec::new();
    for symbol in symbols {
        if symbol.kind != SymbolKind::Function {
            continue;
        }
        if symbol.metadata.get("type").and_then(|v| v.as_str()) != Some("external_invocation") {
            continue;
        }
        let Some(caller_id) = symbol.metadata.get("callerId").and_then(|v| serde_json::from_value(v.clone()).ok()) else {
            continue;
        };
        let target_language = invoker_target_language(&symbol.name);
        let mut relationship = Relationship::new(
            caller_id,
            RelationshipTarget::Symbol(symbol.id),
            RelationshipKind::Calls,
            file_path,
            symbol.range.start_line,
        )
        .with_metadata("edgeKind", serde_json::json!("binding"))
        .with_metadata("sourceLanguage", serde_json::json!("bash"));
        if let Some(target_language) = target_language {
            relationship = relationship.with_metadata("targetLanguage", serde_json::json!(target_language));
        }
        bindings.push(relationship);
    }
    bindings
}

fn ecmascript_bindings(symbols: &[Symbol], file_path: &str, language: Language) -> Vec<Relationship> {
    let mut bindings = Vec::new();
    for symbol in symbols {
        if symbol.kind != SymbolKind::Import {
            continue;
        }
        let Some(module_path) = symbol.metadata.get("module").and_then(|v| v.as_str()) else {
            continue;
        };
        if module_path.is_empty() {
            continue;
        }
        let relationship = Relationship::new(
            symbol.id,
            RelationshipTarget::module_token(module_path),
            RelationshipKind::Imports,
            file_path,
            symbol.range.start_line,
        )
        .with_metadata("edgeKind", serde_json::json!("binding"))
        .with_metadata("sourceLanguage", serde_json::json!(language.name()));
        bindings.push(relationship);
    }
    bindings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::hash_symbol_id;
    use crate::types::Range;
    use std::collections::HashMap;

    fn function_symbol(name: &str, caller_id: Option<crate::types::SymbolId>, with_invocation: bool) -> Symbol {
        let id = hash_symbol_id("deploy.sh", name, 1, 0, 0);
        let mut symbol = Symbol::new(id, name, SymbolKind::Function, Language::Bash, "deploy.sh", Range::new(1, 0, 1, 10), 0, 10);
        if with_invocation {
            symbol = symbol.with_metadata("type", serde_json::json!("external_invocation"));
        }
        if let Some(caller_id) = caller_id {
            symbol = symbol.with_metadata("callerId", serde_json::to_value(caller_id).unwrap());
        }
        symbol
    }

    #[test]
    fn test_shell_binding_infers_target_language() {
        let caller = function_symbol("deploy", None, false);
        let callee = function_symbol("docker", Some(caller.id), true);
        let bindings = detect_bindings(Language::Bash, &[caller.clone(), callee], "deploy.sh");
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].from_symbol_id, caller.id);
        assert_eq!(
            bindings[0].metadata.get("targetLanguage"),
            Some(&serde_json::json!("docker"))
        );
    }

    #[test]
    fn test_ecmascript_binding_targets_module_token() {
        let id = hash_symbol_id("a.js", "readFile", 1, 0, 0);
        let mut symbol = Symbol::new(id, "readFile", SymbolKind::Import, Language::JavaScript, "a.js", Range::new(1, 0, 1, 20), 0, 20);
        let mut metadata = HashMap::new();
        metadata.insert("module".to_string(), serde_json::json!("fs"));
        symbol.metadata = metadata;

        let bindings = detect_bindings(Language::JavaScript, &[symbol], "a.js");
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].to, RelationshipTarget::module_token("fs"));
    }
}
