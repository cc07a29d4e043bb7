//! Type Inference Pass (C6, §4.6): a post-pass over already-emitted Symbols.
//! It never re-parses; it reads `signature` and `metadata` with regexes.

use crate::parsing::Language;
use crate::symbol::Symbol;
use crate::types::{SymbolKind, TypeInfo};
use regex::Regex;
use std::sync::LazyLock;

static JAVA_MODIFIERS: &[&str] = &[
    "public", "private", "protected", "static", "final", "abstract", "synchronized", "native", "default",
];

static RUST_ARROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"->\s*(.+?)(?:\s+where\b.*)?$").unwrap());
static COLON_RETURN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\)\s*:\s*([A-Za-z_][\w<>,\[\]\?\.\s]*?)(?:\s*\{|\s*=|$)").unwrap());
static COLON_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\s*([A-Za-z_][\w<>,\[\]\?\. ]*?)\s*=").unwrap());
static LITERAL_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"=\s*(-?\d+\.\d+|-?\d+|true|false|"[^"]*"|'[^']*'|/[^\s]*)"#).unwrap()
});

/// Runs inference over one file's Symbols and returns the `TypeInfo` records
/// for whichever of them a signature-level regex could resolve (§4.6).
pub fn infer(symbols: &[Symbol], language: Language) -> Vec<TypeInfo> {
    symbols
        .iter()
        .filter_map(|symbol| infer_one(symbol, language))
        .collect()
}

fn infer_one(symbol: &Symbol, language: Language) -> Option<TypeInfo> {
    let signature = symbol.signature.as_deref()?;

    let resolved_type = match symbol.kind {
        SymbolKind::Function | SymbolKind::Method => infer_return_type(signature, &symbol.name, language),
        SymbolKind::Property | SymbolKind::Field | SymbolKind::Constant | SymbolKind::Variable => {
            infer_value_type(signature, language)
        }
        _ => None,
    }?;

    Some(TypeInfo {
        symbol_id: symbol.id,
        resolved_type,
        generic_params: None,
        constraints: None,
        is_inferred: true,
        language,
        metadata: Default::default(),
    })
}

fn infer_return_type(signature: &str, name: &str, language: Language) -> Option<String> {
    match language {
        Language::Rust => RUST_ARROW.captures(signature).map(|c| c[1].trim().to_string()),
        Language::Kotlin | Language::TypeScript => COLON_RETURN
            .captures(signature)
            .map(|c| c[1].trim().to_string())
            .filter(|s| !s.is_empty()),
        Language::Java => java_return_type(signature, name),
        Language::JavaScript => None,
        Language::Ruby | Language::Bash => None,
    }
}

fn java_return_type(signature: &str, name: &str) -> Option<String> {
    let marker = format!("{name}(");
    let idx = signature.find(&marker)?;
    let before = &signature[..idx];
    let tokens: Vec<&str> = before
        .split_whitespace()
        .filter(|t| !JAVA_MODIFIERS.contains(t) && !t.starts_with('@'))
        .collect();
    tokens.last().map(|t| t.to_string())
}

fn infer_value_type(signature: &str, language: Language) -> Option<String> {
    match language {
        Language::Rust | Language::Kotlin | Language::TypeScript => {
            COLON_VALUE.captures(signature).map(|c| c[1].trim().to_string())
        }
        Language::Java => java_field_type(signature),
        Language::JavaScript => None,
        Language::Ruby | Language::Bash => infer_literal_value(signature),
    }
}

fn java_field_type(signature: &str) -> Option<String> {
    let name_and_rest = signature.split('=').next()?;
    let tokens: Vec<&str> = name_and_rest
        .split_whitespace()
        .filter(|t| !JAVA_MODIFIERS.contains(t) && !t.starts_with('@'))
        .collect();
    // The declarator's name is the last token, so its type is the one before it.
    if tokens.len() < 2 {
        return None;
    }
    Some(tokens[tokens.len() - 2].to_string())
}

/// Dynamic-language fallback (§4.6): a literal-value heuristic rather than
/// any real type resolution — numeric, boolean, quoted-string, or a
/// slash-path for Bash variables.
fn infer_literal_value(signature: &str) -> Option<String> {
    let captures = LITERAL_VALUE.captures(signature)?;
    let value = captures[1].trim();
    let inferred = if value.starts_with('"') || value.starts_with('\'') {
        "string"
    } else if value == "true" || value == "false" {
        "boolean"
    } else if value.starts_with('/') {
        "path"
    } else if value.parse::<f64>().is_ok() {
        if value.contains('.') {
            "float"
        } else {
            "integer"
        }
    } else {
        return None;
    };
    Some(inferred.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::hash_symbol_id;
    use crate::types::Range;

    fn make_symbol(name: &str, kind: SymbolKind, signature: &str, language: Language) -> Symbol {
        let id = hash_symbol_id("a", name, 1, 0, 0);
        Symbol::new(id, name, kind, language, "a", Range::new(1, 0, 1, 10), 0, 10).with_signature(signature)
    }

    #[test]
    fn test_rust_return_type() {
        let symbol = make_symbol("new", SymbolKind::Function, "pub fn new() -> Self", Language::Rust);
        let types = infer(&[symbol], Language::Rust);
        assert_eq!(types[0].resolved_type, "Self");
    }

    #[test]
    fn test_java_return_type_strips_modifiers() {
        let symbol = make_symbol("isAdult", SymbolKind::Method, "public boolean isAdult()", Language::Java);
        let types = infer(&[symbol], Language::Java);
        assert_eq!(types[0].resolved_type, "boolean");
    }

    #[test]
    fn test_kotlin_colon_return_type() {
        let symbol = make_symbol("area", SymbolKind::Method, "fun area(): Double", Language::Kotlin);
        let types = infer(&[symbol], Language::Kotlin);
        assert_eq!(types[0].resolved_type, "Double");
    }

    #[test]
    fn test_bash_literal_heuristic() {
        let symbol = make_symbol("MAX_RETRIES", SymbolKind::Constant, "readonly MAX_RETRIES=3", Language::Bash);
        let types = infer(&[symbol], Language::Bash);
        assert_eq!(types[0].resolved_type, "integer");
    }
}
