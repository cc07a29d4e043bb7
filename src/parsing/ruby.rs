//! Ruby extractor (C4, §4.4.4): visibility cursor, metaprogramming forms,
//! and a line-oriented fallback for files the grammar cannot parse at all.

use crate::parsing::base::{extract_identifier, find_doc_comment, node_text, ExtractorState, LanguageExtractor};
use crate::parsing::parser::check_recursion_depth;
use crate::parsing::Language;
use crate::relationship::{Relationship, RelationshipTarget};
use crate::types::{Range, RelationshipKind, SymbolId, SymbolKind, Visibility};
use tree_sitter::Node;

#[derive(Default)]
pub struct RubyExtractor;

impl RubyExtractor {
    pub fn new() -> Self {
        Self
    }
}

fn node_range(node: Node) -> Range {
    Range::new(
        node.start_position().row as u32 + 1,
        node.start_position().column as u32,
        node.end_position().row as u32 + 1,
        node.end_position().column as u32,
    )
}

fn header_text(node: Node, source: &str) -> String {
    node_text(node, source).lines().next().unwrap_or("").trim().to_string()
}

/// Tracks the most recently seen bare `public`/`private`/`protected` call
/// within one class/module body, applied to every subsequent `def` until the
/// next such call or the end of the body (§4.4.4 Visibility cursor).
struct VisibilityCursor {
    current: Visibility,
}

fn walk(
    node: Node,
    source: &str,
    parent_id: Option<SymbolId>,
    cursor: &mut VisibilityCursor,
    state: &mut ExtractorState,
    depth: usize,
) {
    if !check_recursion_depth(depth, node) || state.deadline_exceeded() {
        return;
    }

    let mut next_parent = parent_id;

    match node.kind() {
        "class" | "module" => {
            next_parent = Some(emit_class_or_module(node, source, parent_id, state));
            // Nested bodies inherit the enclosing cursor's value only at the
            // moment they open, then track it independently from there on
            // (§4.4.4 Visibility cursor).
            let mut inner = VisibilityCursor { current: cursor.current };
            if let Some(body) = node.child_by_field_name("body") {
                let mut c = body.walk();
                for child in body.children(&mut c) {
                    walk(child, source, next_parent, &mut inner, state, depth + 1);
                }
            }
            return;
        }
        "call" => {
            if let Some(v) = bare_visibility_call(node, source) {
                cursor.current = v;
            } else if is_attr_call(node, source) {
                emit_attr_properties(node, source, parent_id, cursor.current, state);
            } else if is_include_like_call(node, source) {
                if let Some(pid) = parent_id {
                    emit_include_relationship(node, source, pid, state);
                }
            } else if is_require_call(node, source) {
                emit_require(node, source, state);
            } else if is_define_method_call(node, source) {
                emit_define_method(node, source, parent_id, cursor.current, state);
            } else if is_delegator_call(node, source) {
                emit_delegator(node, source, parent_id, cursor.current, state);
            }
        }
        "method" => {
            emit_method(node, source, parent_id, cursor.current, state);
        }
        "singleton_method" => {
            emit_singleton_method(node, source, parent_id, state);
        }
        "assignment" => {
            emit_assignment(node, source, parent_id, state);
        }
        _ => {}
    }

    let mut c = node.walk();
    for child in node.children(&mut c) {
        walk(child, source, next_parent, cursor, state, depth + 1);
    }
}

fn emit_class_or_module(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState) -> SymbolId {
    let kind = if node.kind() == "module" { SymbolKind::Module } else { SymbolKind::Class };
    let name = extract_identifier(node, source);
    let doc = find_doc_comment(node, source);
    let mut symbol = state.create_symbol(name, kind, node_range(node), node.start_byte() as u32, node.end_byte() as u32, doc);
    symbol = symbol.with_signature(header_text(node, source)).with_visibility(Visibility::Public);
    if let Some(pid) = parent_id {
        symbol = symbol.with_parent(pid);
    }
    let id = state.push_symbol(symbol);
    if let Some(superclass) = node.child_by_field_name("superclass") {
        state.push_relationship(Relationship::new(
            id,
            RelationshipTarget::external_token("ruby", node_text(superclass, source).trim_start_matches('<').trim()),
            RelationshipKind::Extends,
            state.file_path.clone(),
            node.start_position().row as u32 + 1,
        ));
    }
    id
}

fn call_method_name(node: Node, source: &str) -> Option<String> {
    node.child_by_field_name("method").map(|n| node_text(n, source).to_string())
}

fn bare_visibility_call(node: Node, source: &str) -> Option<Visibility> {
    if node.child_by_field_name("arguments").is_some() {
        return None;
    }
    match call_method_name(node, source)?.as_str() {
        "private" => Some(Visibility::Private),
        "protected" => Some(Visibility::Protected),
        "public" => Some(Visibility::Public),
        _ => None,
    }
}

fn is_attr_call(node: Node, source: &str) -> bool {
    matches!(
        call_method_name(node, source).as_deref(),
        Some("attr_reader") | Some("attr_writer") | Some("attr_accessor")
    )
}

fn emit_attr_properties(node: Node, source: &str, parent_id: Option<SymbolId>, visibility: Visibility, state: &mut ExtractorState) {
    let Some(args) = node.child_by_field_name("arguments") else {
        return;
    };
    let mut cursor = args.walk();
    for arg in args.named_children(&mut cursor) {
        if arg.kind() != "simple_symbol" {
            continue;
        }
        let name = node_text(arg, source).trim_start_matches(':').to_string();
        let symbol = state
            .create_symbol(name, SymbolKind::Property, node_range(node), node.start_byte() as u32, node.end_byte() as u32, None)
            .with_visibility(visibility);
        let symbol = match parent_id {
            Some(pid) => symbol.with_parent(pid),
            None => symbol,
        };
        state.push_symbol(symbol);
    }
}

fn is_include_like_call(node: Node, source: &str) -> bool {
    matches!(call_method_name(node, source).as_deref(), Some("include") | Some("extend") | Some("prepend"))
}

fn emit_include_relationship(node: Node, source: &str, from_id: SymbolId, state: &mut ExtractorState) {
    let method = call_method_name(node, source).unwrap_or_default();
    // `prepend` changes the ancestor chain the same way `include` does
    // (§9 Open Questions) — both map to Implements; `extend` adds the
    // module's methods as singleton methods on the receiver, which is
    // closer to Uses.
    let kind = if method == "extend" { RelationshipKind::Uses } else { RelationshipKind::Implements };
    let Some(args) = node.child_by_field_name("arguments") else {
        return;
    };
    let mut cursor = args.walk();
    for arg in args.named_children(&mut cursor) {
        let name = node_text(arg, source).to_string();
        state.push_relationship(Relationship::new(
            from_id,
            RelationshipTarget::external_token("ruby", &name),
            kind,
            state.file_path.clone(),
            node.start_position().row as u32 + 1,
        ));
    }
}

fn is_require_call(node: Node, source: &str) -> bool {
    matches!(call_method_name(node, source).as_deref(), Some("require") | Some("require_relative"))
}

fn emit_require(node: Node, source: &str, state: &mut ExtractorState) {
    let Some(args) = node.child_by_field_name("arguments") else {
        return;
    };
    let Some(arg) = args.named_child(0) else {
        return;
    };
    let path = node_text(arg, source).trim_matches(|c| c == '"' || c == '\'').to_string();
    let name = path.rsplit('/').next().unwrap_or(&path).to_string();
    let symbol = state
        .create_symbol(name, SymbolKind::Import, node_range(node), node.start_byte() as u32, node.end_byte() as u32, None)
        .with_signature(node_text(node, source).trim().to_string());
    state.push_symbol(symbol);
}

fn is_define_method_call(node: Node, source: &str) -> bool {
    call_method_name(node, source).as_deref() == Some("define_method")
}

fn emit_define_method(node: Node, source: &str, parent_id: Option<SymbolId>, visibility: Visibility, state: &mut ExtractorState) {
    let Some(args) = node.child_by_field_name("arguments") else {
        return;
    };
    let Some(arg) = args.named_child(0) else {
        return;
    };
    let name = node_text(arg, source).trim_matches(|c| c == ':' || c == '"' || c == '\'').to_string();
    let mut symbol = state
        .create_symbol(name, SymbolKind::Method, node_range(node), node.start_byte() as u32, node.end_byte() as u32, None)
        .with_visibility(visibility)
        .with_metadata("type", serde_json::json!("dynamic_method"));
    if let Some(pid) = parent_id {
        symbol = symbol.with_parent(pid);
    }
    state.push_symbol(symbol);
}

fn is_delegator_call(node: Node, source: &str) -> bool {
    matches!(call_method_name(node, source).as_deref(), Some("def_delegator") | Some("def_delegators"))
}

fn emit_delegator(node: Node, source: &str, parent_id: Option<SymbolId>, visibility: Visibility, state: &mut ExtractorState) {
    let Some(args) = node.child_by_field_name("arguments") else {
        return;
    };
    let mut cursor = args.walk();
    for arg in args.named_children(&mut cursor).skip(1) {
        if arg.kind() != "simple_symbol" {
            continue;
        }
        let name = node_text(arg, source).trim_start_matches(':').to_string();
        let mut symbol = state
            .create_symbol(name, SymbolKind::Method, node_range(node), node.start_byte() as u32, node.end_byte() as u32, None)
            .with_visibility(visibility)
            .with_metadata("type", serde_json::json!("delegated_method"));
        if let Some(pid) = parent_id {
            symbol = symbol.with_parent(pid);
        }
        state.push_symbol(symbol);
    }
}

fn emit_method(node: Node, source: &str, parent_id: Option<SymbolId>, visibility: Visibility, state: &mut ExtractorState) {
    let name = extract_identifier(node, source);
    let doc = find_doc_comment(node, source);
    let mut symbol = state.create_symbol(name, SymbolKind::Method, node_range(node), node.start_byte() as u32, node.end_byte() as u32, doc);
    symbol = symbol.with_signature(header_text(node, source)).with_visibility(visibility);
    if let Some(pid) = parent_id {
        symbol = symbol.with_parent(pid);
    }
    state.push_symbol(symbol);
}

fn emit_singleton_method(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState) {
    let name = extract_identifier(node, source);
    let doc = find_doc_comment(node, source);
    let target = node
        .child_by_field_name("object")
        .map(|n| node_text(n, source).to_string())
        .unwrap_or_default();
    let is_class_method = target == "self";

    let mut symbol = state.create_symbol(name, SymbolKind::Method, node_range(node), node.start_byte() as u32, node.end_byte() as u32, doc);
    symbol = symbol
        .with_signature(header_text(node, source))
        .with_visibility(Visibility::Public)
        .with_metadata("isSingleton", serde_json::json!(true))
        .with_metadata("target", serde_json::json!(target))
        .with_metadata("isClass", serde_json::json!(is_class_method));
    if let Some(pid) = parent_id {
        symbol = symbol.with_parent(pid);
    }
    state.push_symbol(symbol);
}

fn emit_assignment(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState) {
    let Some(lhs) = node.child_by_field_name("left") else {
        return;
    };

    // Parallel assignment (`a, b = 1, 2`): one Symbol per left-hand
    // identifier, all sharing the same range and a `variables` metadata
    // list (§4.4.4).
    if lhs.kind() == "left_assignment_list" || lhs.kind() == "mlhs" {
        let names: Vec<String> = lhs
            .named_children(&mut lhs.walk())
            .filter_map(|c| match c.kind() {
                "identifier" | "constant" => Some(node_text(c, source).to_string()),
                // `*rest` splat targets (§4.4.4: "including splat targets").
                "splat_argument" | "rest_assignment" => {
                    let inner = c.named_child(0).map(|n| node_text(n, source).to_string()).unwrap_or_default();
                    Some(format!("*{inner}"))
                }
                _ => None,
            })
            .collect();
        if names.is_empty() {
            return;
        }
        let signature = header_text(node, source);
        for name in &names {
            let kind = classify_ruby_variable(name);
            let mut symbol = state
                .create_symbol(name.clone(), kind, node_range(node), node.start_byte() as u32, node.end_byte() as u32, None)
                .with_signature(signature.clone())
                .with_visibility(Visibility::Public)
                .with_metadata("variables", serde_json::json!(names));
            if let Some(pid) = parent_id {
                symbol = symbol.with_parent(pid);
            }
            state.push_symbol(symbol);
        }
        return;
    }

    if lhs.kind() != "identifier" && lhs.kind() != "constant" {
        return;
    }
    let name = node_text(lhs, source).to_string();
    let kind = classify_ruby_variable(&name);
    let mut symbol = state
        .create_symbol(name, kind, node_range(node), node.start_byte() as u32, node.end_byte() as u32, None)
        .with_signature(header_text(node, source))
        .with_visibility(Visibility::Public);
    if let Some(pid) = parent_id {
        symbol = symbol.with_parent(pid);
    }
    state.push_symbol(symbol);
}

fn classify_ruby_variable(name: &str) -> SymbolKind {
    if name.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
        SymbolKind::Constant
    } else {
        SymbolKind::Variable
    }
}

/// Fallback for source the grammar could not usefully parse (only `ERROR`
/// nodes, or an empty tree): a line-oriented scan for `def`/`class`/`module`
/// keywords, each Symbol tagged `metadata.isFallback = true` (§4.4.4).
fn fallback_line_parse(source: &str, file_path: &str, language: Language) -> (Vec<crate::symbol::Symbol>, Vec<Relationship>) {
    let mut state = ExtractorState::new(file_path, language);
    for (idx, line) in source.lines().enumerate() {
        let trimmed = line.trim_start();
        let line_no = idx as u32 + 1;
        let (kind, rest) = if let Some(rest) = trimmed.strip_prefix("def ") {
            (SymbolKind::Method, rest)
        } else if let Some(rest) = trimmed.strip_prefix("class ") {
            (SymbolKind::Class, rest)
        } else if let Some(rest) = trimmed.strip_prefix("module ") {
            (SymbolKind::Module, rest)
        } else {
            continue;
        };
        let name = rest
            .split(|c: char| c == '(' || c == '<' || c.is_whitespace())
            .next()
            .unwrap_or(rest)
            .trim_start_matches("self.")
            .to_string();
        if name.is_empty() {
            continue;
        }
        let range = Range::new(line_no, 0, line_no, line.len() as u32);
        let symbol = state
            .create_symbol(name, kind, range, 0, 0, None)
            .with_signature(trimmed.to_string())
            .with_metadata("isFallback", serde_json::json!(true));
        state.push_symbol(symbol);
    }
    let (symbols, relationships, _truncated) = state.into_parts();
    (symbols, relationships)
}

impl LanguageExtractor for RubyExtractor {
    fn language(&self) -> Language {
        Language::Ruby
    }

    fn extract_symbols(&mut self, root: Node, source: &str, state: &mut ExtractorState) {
        let looks_unparsed = root.child_count() == 0 || (root.has_error() && !root.children(&mut root.walk()).any(|c| c.is_named() && c.kind() != "ERROR"));
        if looks_unparsed {
            let (symbols, relationships) = fallback_line_parse(source, &state.file_path, self.language());
            state.symbols.extend(symbols);
            state.relationships.extend(relationships);
            return;
        }
        let mut cursor = VisibilityCursor { current: Visibility::Public };
        walk(root, source, None, &mut cursor, state, 0);
    }

    fn extract_relationships(&mut self, _root: Node, _source: &str, _state: &mut ExtractorState) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::base::extract_file;
    use crate::parsing::parser::parse_file;
    use std::path::Path;

    fn extract(source: &str) -> Vec<crate::symbol::Symbol> {
        let parsed = parse_file(Path::new("a.rb"), source, None).unwrap();
        let mut extractor = RubyExtractor::new();
        let (symbols, _relationships, _types, _truncated) =
            extract_file(&mut extractor, &parsed.tree, source, "a.rb", None);
        symbols
    }

    #[test]
    fn test_visibility_cursor_applies_to_following_methods() {
        let symbols = extract(
            "class Widget\n  def pub_method\n  end\n\n  private\n\n  def priv_method\n  end\nend\n",
        );
        let pub_method = symbols.iter().find(|s| s.name.as_ref() == "pub_method").unwrap();
        let priv_method = symbols.iter().find(|s| s.name.as_ref() == "priv_method").unwrap();
        assert_eq!(pub_method.visibility, Some(Visibility::Public));
        assert_eq!(priv_method.visibility, Some(Visibility::Private));
    }

    #[test]
    fn test_nested_class_inherits_enclosing_cursor_at_opening() {
        let symbols = extract(
            "class Outer\n  private\n\n  class Inner\n    def m\n    end\n  end\nend\n",
        );
        let m = symbols.iter().find(|s| s.name.as_ref() == "m").unwrap();
        assert_eq!(m.visibility, Some(Visibility::Private));
    }

    #[test]
    fn test_attr_accessor_emits_properties() {
        let symbols = extract("class Widget\n  attr_accessor :name, :size\nend\n");
        let name = symbols.iter().find(|s| s.name.as_ref() == "name").unwrap();
        assert_eq!(name.kind, SymbolKind::Property);
    }

    #[test]
    fn test_parallel_assignment_includes_splat_and_signature() {
        let symbols = extract("a, *rest, c = values\n");
        let a = symbols.iter().find(|s| s.name.as_ref() == "a").unwrap();
        let rest = symbols.iter().find(|s| s.name.as_ref() == "*rest").unwrap();
        assert_eq!(a.signature.as_deref(), Some("a, *rest, c = values"));
        assert_eq!(rest.signature.as_deref(), Some("a, *rest, c = values"));
        let variables = a.metadata.get("variables").unwrap();
        assert_eq!(variables, &serde_json::json!(["a", "*rest", "c"]));
    }

    #[test]
    fn test_include_emits_relationship_not_symbol() {
        let parsed = parse_file(Path::new("a.rb"), "class Widget\n  include Comparable\nend\n", None).unwrap();
        let mut extractor = RubyExtractor::new();
        let (symbols, relationships, _types, _truncated) =
            extract_file(&mut extractor, &parsed.tree, "class Widget\n  include Comparable\nend\n", "a.rb", None);
        assert!(!symbols.iter().any(|s| s.name.as_ref() == "Comparable"));
        assert!(relationships.iter().any(|r| r.kind == RelationshipKind::Implements));
    }
}
