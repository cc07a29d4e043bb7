//! Parser Manager (C1, §4.1).
//!
//! Loads a tree-sitter grammar for a language and produces a parse tree for
//! a file. Trees are immutable and safe to share read-only with concurrent
//! extractors; this module holds no per-file state of its own.

use crate::error::ExtractError;
use crate::parsing::Language;
use std::path::Path;
use tree_sitter::{Node, Parser, Tree};

/// The result of parsing one file: an immutable tree plus the language it
/// was parsed as.
pub struct ParsedTree {
    pub tree: Tree,
    pub language: Language,
}

/// `parseFile(path, source) -> { tree, language }` (§4.1 Contract).
///
/// Language is detected from the path extension unless `override_language`
/// is given. Parse failures that prevent any tree construction fail with
/// [`ExtractError::ParseFatal`]; every other malformation is reported
/// through error nodes within the tree itself (tree-sitter's partial-tree
/// recovery), not as a `Result` error.
pub fn parse_file(
    path: &Path,
    source: &str,
    override_language: Option<Language>,
) -> Result<ParsedTree, ExtractError> {
    let language = override_language
        .or_else(|| Language::from_path(path))
        .or_else(|| Language::from_shebang(source))
        .ok_or_else(|| ExtractError::ParseFatal {
            path: path.to_path_buf(),
            language: "unknown".to_string(),
            reason: "could not determine language from path or shebang".to_string(),
        })?;

    let mut parser = new_parser_for(language).map_err(|reason| ExtractError::ParseFatal {
        path: path.to_path_buf(),
        language: language.name().to_string(),
        reason,
    })?;

    let tree = parser.parse(source, None).ok_or_else(|| ExtractError::ParseFatal {
        path: path.to_path_buf(),
        language: language.name().to_string(),
        reason: "tree-sitter returned no tree (source too large or parser cancelled)".to_string(),
    })?;

    Ok(ParsedTree { tree, language })
}

/// Construct a fresh `tree_sitter::Parser` loaded with the grammar for
/// `language`. Cheap enough to call per worker/per file (§5 Shared
/// resources: "a `tree_sitter::Parser` instance is cheap to construct per
/// worker").
pub fn new_parser_for(language: Language) -> Result<Parser, String> {
    let mut parser = Parser::new();
    let grammar = match language {
        Language::Rust => tree_sitter_rust::LANGUAGE.into(),
        Language::Java => tree_sitter_java::LANGUAGE.into(),
        Language::Kotlin => tree_sitter_kotlin_codanna::language(),
        Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Language::Ruby => tree_sitter_ruby::LANGUAGE.into(),
        Language::Bash => tree_sitter_bash::LANGUAGE.into(),
    };
    parser
        .set_language(&grammar)
        .map_err(|e| format!("failed to load {} grammar: {e}", language.name()))?;
    Ok(parser)
}

/// Maximum recursion depth for tree traversal, guarding against stack
/// overflow on pathologically nested input (deeply nested array literals,
/// call chains). 500 levels at roughly 4KB/frame stays well under the
/// default 2MB stack.
pub const MAX_AST_DEPTH: usize = 500;

/// Returns `false` (and logs at `debug`) once `depth` exceeds
/// [`MAX_AST_DEPTH`]; callers should stop recursing into the subtree.
#[inline]
pub fn check_recursion_depth(depth: usize, node: Node) -> bool {
    if depth > MAX_AST_DEPTH {
        tracing::debug!(
            line = node.start_position().row + 1,
            column = node.start_position().column + 1,
            "max AST depth ({MAX_AST_DEPTH}) exceeded, skipping subtree"
        );
        return false;
    }
    true
}

/// Safely truncate a UTF-8 string at a character boundary.
#[inline]
pub fn safe_truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut boundary = max_bytes;
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }
    &s[..boundary]
}

/// Extract up to `window_size` bytes of `code` ending at `end_byte`,
/// respecting UTF-8 character boundaries.
pub fn safe_substring_window(code: &str, end_byte: usize, window_size: usize) -> &str {
    let end = end_byte.min(code.len());
    let start_raw = end.saturating_sub(window_size);
    let start = if start_raw > 0 && !code.is_char_boundary(start_raw) {
        (start_raw..=start_raw.saturating_add(3).min(end))
            .find(|&i| code.is_char_boundary(i))
            .unwrap_or(end)
    } else {
        start_raw
    };
    &code[start..end]
}

/// Truncate `s` to `max_bytes` for display, appending `...` if truncated.
#[inline]
pub fn truncate_for_display(s: &str, max_bytes: usize) -> String {
    let truncated = safe_truncate_str(s, max_bytes);
    if truncated.len() < s.len() {
        format!("{truncated}...")
    } else {
        truncated.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_detects_rust() {
        let parsed = parse_file(Path::new("a.rs"), "fn main() {}", None).unwrap();
        assert_eq!(parsed.language, Language::Rust);
        assert!(!parsed.tree.root_node().has_error());
    }

    #[test]
    fn test_parse_file_unknown_extension_is_fatal() {
        let result = parse_file(Path::new("a.xyz"), "whatever", None);
        assert!(matches!(result, Err(ExtractError::ParseFatal { .. })));
    }

    #[test]
    fn test_parse_file_partial_tree_on_malformed_source() {
        // tree-sitter recovers with error nodes rather than failing outright.
        let parsed = parse_file(Path::new("a.rs"), "fn main( {", None).unwrap();
        assert!(parsed.tree.root_node().has_error());
    }

    #[test]
    fn test_safe_truncate_with_emoji() {
        let text = "Status: \u{1F50D} Active";
        let result = safe_truncate_str(text, 10);
        assert_eq!(result, "Status: ");
        assert!(result.len() <= 10);
    }

    #[test]
    fn test_safe_truncate_exact_boundary() {
        let text = "Hello, World!";
        assert_eq!(safe_truncate_str(text, 7), "Hello, ");
    }

    #[test]
    fn test_truncate_for_display() {
        let text = "This is a very long string that needs truncation";
        assert_eq!(truncate_for_display(text, 10), "This is a ...");
        assert_eq!(truncate_for_display("short", 10), "short");
    }

    #[test]
    fn test_safe_substring_window_respects_boundaries() {
        let text = "Caf\u{e9} is nice";
        let window = safe_substring_window(text, text.len(), 5);
        assert!(text.ends_with(window) || window.is_empty());
        assert!(std::str::from_utf8(window.as_bytes()).is_ok());
    }
}
