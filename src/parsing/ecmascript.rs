//! Shared JavaScript/TypeScript extractor (C4, §4.4.2). TypeScript adds type
//! annotations, interfaces, and enums on top of the same grammar shape;
//! `is_typescript` only gates the handful of TS-only node kinds.

use crate::parsing::base::{extract_identifier, find_doc_comment, node_text, ExtractorState, LanguageExtractor};
use crate::parsing::parser::check_recursion_depth;
use crate::parsing::Language;
use crate::relationship::{Relationship, RelationshipTarget};
use crate::types::{Range, RelationshipKind, SymbolId, SymbolKind, Visibility};
use tree_sitter::Node;

pub struct EcmaScriptExtractor {
    is_typescript: bool,
}

impl EcmaScriptExtractor {
    pub fn new(is_typescript: bool) -> Self {
        Self { is_typescript }
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
    let full = node_text(node, source);
    match full.find('{') {
        Some(idx) => full[..idx].trim().to_string(),
        None => full.trim_end_matches(';').trim().to_string(),
    }
}

fn leading_decorators(node: Node, source: &str) -> String {
    let mut sib = node.prev_named_sibling();
    let mut decorators = Vec::new();
    while let Some(n) = sib {
        if n.kind() == "decorator" {
            decorators.push(node_text(n, source).to_string());
            sib = n.prev_named_sibling();
        } else {
            break;
        }
    }
    decorators.reverse();
    decorators.join(" ")
}

fn walk(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState, is_ts: bool, depth: usize) {
    if !check_recursion_depth(depth, node) || state.deadline_exceeded() {
        return;
    }

    let mut next_parent = parent_id;

    match node.kind() {
        "class_declaration" | "abstract_class_declaration" => {
            next_parent = Some(emit_class(node, source, parent_id, state));
        }
        "interface_declaration" if is_ts => {
            next_parent = Some(emit_interface(node, source, parent_id, state));
        }
        "enum_declaration" if is_ts => {
            let id = emit_ts_enum(node, source, parent_id, state);
            next_parent = Some(id);
        }
        "function_declaration" | "generator_function_declaration" => {
            emit_function(node, source, parent_id, state, SymbolKind::Function);
        }
        "method_definition" => {
            emit_function(node, source, parent_id, state, method_kind(node, source));
        }
        "public_field_definition" | "field_definition" => {
            emit_field(node, source, parent_id, state);
        }
        "lexical_declaration" | "variable_declaration" => {
            emit_variable_declaration(node, source, parent_id, state);
        }
        "type_alias_declaration" if is_ts => {
            emit_type_alias(node, source, parent_id, state);
        }
        "import_statement" => {
            emit_import(node, source, state);
        }
        "call_expression" if is_require_call(node, source) => {
            emit_require_import(node, source, parent_id, state);
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, source, next_parent, state, is_ts, depth + 1);
    }
}

fn method_kind(node: Node, source: &str) -> SymbolKind {
    let name = node.child_by_field_name("name").map(|n| node_text(n, source)).unwrap_or("");
    if name == "constructor" {
        SymbolKind::Constructor
    } else {
        SymbolKind::Method
    }
}

fn emit_class(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState) -> SymbolId {
    let name = extract_identifier(node, source);
    let doc = find_doc_comment(node, source);
    let decorators = leading_decorators(node, source);
    let header = header_text(node, source);
    let signature = if decorators.is_empty() { header } else { format!("{decorators} {header}") };

    let mut symbol = state.create_symbol(name, SymbolKind::Class, node_range(node), node.start_byte() as u32, node.end_byte() as u32, doc);
    symbol = symbol.with_signature(signature).with_visibility(Visibility::Public);
    if let Some(pid) = parent_id {
        symbol = symbol.with_parent(pid);
    }
    let id = state.push_symbol(symbol);
    emit_heritage(node, source, id, state);
    id
}

fn emit_heritage(node: Node, source: &str, from_id: SymbolId, state: &mut ExtractorState) {
    if let Some(heritage) = node.children(&mut node.walk()).find(|c| c.kind() == "class_heritage") {
        let mut cursor = heritage.walk();
        for clause in heritage.children(&mut cursor) {
            match clause.kind() {
                "extends_clause" => {
                    if let Some(value) = clause.named_child(0) {
                        state.push_relationship(Relationship::new(
                            from_id,
                            RelationshipTarget::external_token("ecmascript", node_text(value, source)),
                            RelationshipKind::Extends,
                            state.file_path.clone(),
                            clause.start_position().row as u32 + 1,
                        ));
                    }
                }
                "implements_clause" => {
                    let mut c2 = clause.walk();
                    for t in clause.named_children(&mut c2) {
                        state.push_relationship(Relationship::new(
                            from_id,
                            RelationshipTarget::external_token("ecmascript", node_text(t, source)),
                            RelationshipKind::Implements,
                            state.file_path.clone(),
                            clause.start_position().row as u32 + 1,
                        ));
                    }
                }
                _ => {}
            }
        }
    }
}

fn emit_interface(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState) -> SymbolId {
    let name = extract_identifier(node, source);
    let doc = find_doc_comment(node, source);
    let mut symbol = state.create_symbol(name, SymbolKind::Interface, node_range(node), node.start_byte() as u32, node.end_byte() as u32, doc);
    symbol = symbol.with_signature(header_text(node, source)).with_visibility(Visibility::Public);
    if let Some(pid) = parent_id {
        symbol = symbol.with_parent(pid);
    }
    state.push_symbol(symbol)
}

fn emit_ts_enum(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState) -> SymbolId {
    let name = extract_identifier(node, source);
    let doc = find_doc_comment(node, source);
    let mut symbol = state.create_symbol(name, SymbolKind::Enum, node_range(node), node.start_byte() as u32, node.end_byte() as u32, doc);
    symbol = symbol.with_signature(header_text(node, source)).with_visibility(Visibility::Public);
    if let Some(pid) = parent_id {
        symbol = symbol.with_parent(pid);
    }
    let id = state.push_symbol(symbol);

    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            if member.kind() != "enum_assignment" && member.kind() != "property_identifier" {
                continue;
            }
            let member_name = member
                .child_by_field_name("name")
                .map(|n| node_text(n, source).to_string())
                .unwrap_or_else(|| node_text(member, source).to_string());
            let member_symbol = state
                .create_symbol(member_name, SymbolKind::EnumMember, node_range(member), member.start_byte() as u32, member.end_byte() as u32, None)
                .with_visibility(Visibility::Public)
                .with_parent(id);
            state.push_symbol(member_symbol);
        }
    }
    id
}

fn emit_function(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState, kind: SymbolKind) {
    let name = extract_identifier(node, source);
    let doc = find_doc_comment(node, source);
    let decorators = leading_decorators(node, source);
    let header = header_text(node, source);
    let signature = if decorators.is_empty() { header } else { format!("{decorators} {header}") };

    let visibility = if name.starts_with('#') {
        // Invariant 6 (§3): "private for names beginning with `#` in the
        // ECMAScript family" — a private class field/method, regardless of
        // any explicit modifier keyword.
        Visibility::Private
    } else if header.contains("private ") {
        Visibility::Private
    } else if header.contains("protected ") {
        Visibility::Protected
    } else {
        Visibility::Public
    };

    let mut symbol = state.create_symbol(name, kind, node_range(node), node.start_byte() as u32, node.end_byte() as u32, doc);
    symbol = symbol.with_signature(signature).with_visibility(visibility);
    if let Some(pid) = parent_id {
        symbol = symbol.with_parent(pid);
    }
    state.push_symbol(symbol);
}

fn emit_field(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState) {
    let name = extract_identifier(node, source);
    let doc = find_doc_comment(node, source);
    let text = node_text(node, source).trim().to_string();
    let is_readonly = text.contains("readonly ") || text.contains("static readonly");
    let kind = if is_readonly { SymbolKind::Constant } else { SymbolKind::Property };

    let visibility = if name.starts_with('#') {
        Visibility::Private
    } else if text.contains("private ") {
        Visibility::Private
    } else if text.contains("protected ") {
        Visibility::Protected
    } else {
        Visibility::Public
    };

    let mut symbol = state.create_symbol(name, kind, node_range(node), node.start_byte() as u32, node.end_byte() as u32, doc);
    symbol = symbol.with_signature(text).with_visibility(visibility);
    if let Some(pid) = parent_id {
        symbol = symbol.with_parent(pid);
    }
    state.push_symbol(symbol);
}

fn emit_variable_declaration(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState) {
    // Only top-level (module-scope) declarations become Symbols; locals
    // nested inside a function body are skipped because `parent_id` there
    // points at the enclosing Function/Method, not a container that should
    // own Variable children (§4.4.1 Containment).
    let Some(parent_kind) = parent_id.and_then(|pid| {
        state
            .symbols
            .iter()
            .find(|s| s.id == pid)
            .map(|s| s.kind)
    }) else {
        emit_declarators(node, source, parent_id, state);
        return;
    };
    if matches!(parent_kind, SymbolKind::Class | SymbolKind::Module | SymbolKind::Namespace) {
        emit_declarators(node, source, parent_id, state);
    }
}

fn emit_declarators(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState) {
    let is_const = node_text(node, source).trim_start().starts_with("const");
    let mut cursor = node.walk();
    for declarator in node.named_children(&mut cursor) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let Some(name_node) = declarator.child_by_field_name("name") else {
            continue;
        };
        let name = node_text(name_node, source).to_string();
        let kind = if is_const { SymbolKind::Constant } else { SymbolKind::Variable };
        let symbol = state
            .create_symbol(name, kind, node_range(declarator), declarator.start_byte() as u32, declarator.end_byte() as u32, None)
            .with_signature(node_text(declarator, source).trim().to_string())
            .with_visibility(Visibility::Public);
        let symbol = match parent_id {
            Some(pid) => symbol.with_parent(pid),
            None => symbol,
        };
        state.push_symbol(symbol);
    }
}

fn emit_type_alias(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState) {
    let name = extract_identifier(node, source);
    let doc = find_doc_comment(node, source);
    let signature = node_text(node, source).trim_end_matches(';').trim().to_string();
    let mut symbol = state.create_symbol(name, SymbolKind::Type, node_range(node), node.start_byte() as u32, node.end_byte() as u32, doc);
    symbol = symbol.with_signature(signature).with_visibility(Visibility::Public);
    if let Some(pid) = parent_id {
        symbol = symbol.with_parent(pid);
    }
    state.push_symbol(symbol);
}

fn emit_import(node: Node, source: &str, state: &mut ExtractorState) {
    let text = node_text(node, source);
    let path = text
        .rsplit_once("from")
        .map(|(_, rest)| rest.trim().trim_matches(|c| c == '\'' || c == '"' || c == ';'))
        .unwrap_or("");

    let clause = node.child_by_field_name("clause");
    let names: Vec<String> = match clause {
        Some(c) => node_text(c, source)
            .trim_matches(|ch| ch == '{' || ch == '}')
            .split(',')
            .map(|s| {
                s.split_once(" as ")
                    .map(|(_, alias)| alias.trim().to_string())
                    .unwrap_or_else(|| s.trim().to_string())
            })
            .filter(|s| !s.is_empty())
            .collect(),
        None => Vec::new(),
    };

    if names.is_empty() {
        let fallback = path.rsplit('/').next().unwrap_or(path).to_string();
        if fallback.is_empty() {
            return;
        }
        let symbol = state
            .create_symbol(fallback, SymbolKind::Import, node_range(node), node.start_byte() as u32, node.end_byte() as u32, None)
            .with_signature(text.trim().to_string())
            .with_metadata("module", serde_json::json!(path));
        state.push_symbol(symbol);
        return;
    }

    for name in names {
        let symbol = state
            .create_symbol(name, SymbolKind::Import, node_range(node), node.start_byte() as u32, node.end_byte() as u32, None)
            .with_signature(text.trim().to_string())
            .with_metadata("module", serde_json::json!(path));
        state.push_symbol(symbol);
    }
}

/// `require("x")` (§4.5): the CommonJS sibling of `import from "x"`, still
/// expected to produce an Import Symbol carrying `metadata.module` so the
/// binding detector can draw the same `module:x` edge.
fn is_require_call(node: Node, source: &str) -> bool {
    node.child_by_field_name("function")
        .map(|f| node_text(f, source) == "require")
        .unwrap_or(false)
}

fn emit_require_import(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState) {
    let Some(args) = node.child_by_field_name("arguments") else {
        return;
    };
    let Some(first_arg) = args.named_child(0) else {
        return;
    };
    let path = node_text(first_arg, source).trim_matches(|c| c == '\'' || c == '"' || c == '`').to_string();
    if path.is_empty() {
        return;
    }
    let name = path.rsplit('/').next().unwrap_or(&path).to_string();
    let mut symbol = state
        .create_symbol(name, SymbolKind::Import, node_range(node), node.start_byte() as u32, node.end_byte() as u32, None)
        .with_signature(node_text(node, source).trim().to_string())
        .with_metadata("module", serde_json::json!(path));
    if let Some(pid) = parent_id {
        symbol = symbol.with_parent(pid);
    }
    state.push_symbol(symbol);
}

impl LanguageExtractor for EcmaScriptExtractor {
    fn language(&self) -> Language {
        if self.is_typescript {
            Language::TypeScript
        } else {
            Language::JavaScript
        }
    }

    fn extract_symbols(&mut self, root: Node, source: &str, state: &mut ExtractorState) {
        walk(root, source, None, state, self.is_typescript, 0);
    }

    fn extract_relationships(&mut self, _root: Node, _source: &str, _state: &mut ExtractorState) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::base::extract_file;
    use crate::parsing::parser::parse_file;
    use std::path::Path;

    fn extract_js(source: &str) -> Vec<crate::symbol::Symbol> {
        let parsed = parse_file(Path::new("a.js"), source, None).unwrap();
        let mut extractor = EcmaScriptExtractor::new(false);
        let (symbols, _relationships, _types, _truncated) =
            extract_file(&mut extractor, &parsed.tree, source, "a.js", None);
        symbols
    }

    fn extract_ts(source: &str) -> Vec<crate::symbol::Symbol> {
        let parsed = parse_file(Path::new("a.ts"), source, None).unwrap();
        let mut extractor = EcmaScriptExtractor::new(true);
        let (symbols, _relationships, _types, _truncated) =
            extract_file(&mut extractor, &parsed.tree, source, "a.ts", None);
        symbols
    }

    #[test]
    fn test_class_method_is_method_kind() {
        let symbols = extract_js("class Greeter { greet() { return 'hi'; } }");
        let greeter = symbols.iter().find(|s| s.name.as_ref() == "Greeter").unwrap();
        let greet = symbols.iter().find(|s| s.name.as_ref() == "greet").unwrap();
        assert_eq!(greet.kind, SymbolKind::Method);
        assert_eq!(greet.parent_id, Some(greeter.id));
    }

    #[test]
    fn test_hash_prefixed_member_is_private() {
        let symbols = extract_js("class Counter { #count = 0; #bump() { this.#count++; } }");
        let count = symbols.iter().find(|s| s.name.as_ref() == "#count").unwrap();
        let bump = symbols.iter().find(|s| s.name.as_ref() == "#bump").unwrap();
        assert_eq!(count.visibility, Some(Visibility::Private));
        assert_eq!(bump.visibility, Some(Visibility::Private));
    }

    #[test]
    fn test_ts_interface_is_interface_kind() {
        let symbols = extract_ts("interface Shape { area(): number; }");
        let shape = symbols.iter().find(|s| s.name.as_ref() == "Shape").unwrap();
        assert_eq!(shape.kind, SymbolKind::Interface);
    }

    #[test]
    fn test_ts_enum_members_parented() {
        let symbols = extract_ts("enum Direction { Up, Down }");
        let direction = symbols.iter().find(|s| s.name.as_ref() == "Direction").unwrap();
        let up = symbols.iter().find(|s| s.name.as_ref() == "Up").unwrap();
        assert_eq!(up.kind, SymbolKind::EnumMember);
        assert_eq!(up.parent_id, Some(direction.id));
    }

    #[test]
    fn test_named_import_bindings() {
        let symbols = extract_js("import { readFile, writeFile } from 'fs';");
        let names: Vec<_> = symbols.iter().map(|s| s.name.as_ref()).collect();
        assert!(names.contains(&"readFile"));
        assert!(names.contains(&"writeFile"));
    }

    #[test]
    fn test_commonjs_require_emits_import() {
        let symbols = extract_js("const fs = require('fs');");
        let fs_import = symbols
            .iter()
            .find(|s| s.kind == SymbolKind::Import && s.name.as_ref() == "fs")
            .unwrap();
        assert_eq!(fs_import.metadata.get("module"), Some(&serde_json::json!("fs")));
    }
}
