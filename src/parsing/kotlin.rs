//! Kotlin extractor (C4, §4.4.6).

use crate::parsing::base::{
    extract_identifier, extract_visibility, find_doc_comment, node_text, ExtractorState,
    LanguageExtractor,
};
use crate::parsing::parser::check_recursion_depth;
use crate::parsing::Language;
use crate::relationship::{Relationship, RelationshipTarget};
use crate::types::{Range, RelationshipKind, SymbolId, SymbolKind, Visibility};
use tree_sitter::Node;

const VISIBILITY_KINDS: &[&str] = &["public", "private", "protected", "internal"];

#[derive(Default)]
pub struct KotlinExtractor;

impl KotlinExtractor {
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
    let full = node_text(node, source);
    match full.find('{') {
        Some(idx) => full[..idx].trim().to_string(),
        None => full.trim_end_matches(';').trim().to_string(),
    }
}

fn visibility_of(node: Node, source: &str) -> Visibility {
    match extract_visibility(node, source, VISIBILITY_KINDS) {
        Some(Visibility::Protected) => Visibility::Protected,
        Some(Visibility::Private) => Visibility::Private,
        Some(v) => v,
        None => Visibility::Public,
    }
}

fn walk(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState, depth: usize) {
    if !check_recursion_depth(depth, node) || state.deadline_exceeded() {
        return;
    }

    let mut next_parent = parent_id;

    match node.kind() {
        "class_declaration" | "object_declaration" | "companion_object" => {
            next_parent = Some(emit_class(node, source, parent_id, state));
        }
        "function_declaration" => {
            emit_function(node, source, parent_id, state);
        }
        "property_declaration" => {
            emit_property(node, source, parent_id, state);
        }
        "type_alias" => {
            emit_type_alias(node, source, parent_id, state);
        }
        "import_header" => {
            emit_import(node, source, state);
        }
        "enum_entry" => {
            // handled explicitly from emit_class; avoid double emission here.
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, source, next_parent, state, depth + 1);
    }
}

fn emit_import(node: Node, source: &str, state: &mut ExtractorState) {
    let text = node_text(node, source);
    let path = text.trim_start_matches("import").trim();
    let name = path.rsplit('.').next().unwrap_or(path).trim().to_string();
    let symbol = state
        .create_symbol(name, SymbolKind::Import, node_range(node), node.start_byte() as u32, node.end_byte() as u32, None)
        .with_signature(text.trim().to_string());
    state.push_symbol(symbol);
}

fn emit_class(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState) -> SymbolId {
    let is_companion = node.kind() == "companion_object";
    let text = node_text(node, source);
    let is_interface = text.trim_start().starts_with("interface");
    let is_enum = text.contains("enum class") || text.contains("enum ");

    let kind = if is_interface {
        SymbolKind::Interface
    } else if is_enum {
        SymbolKind::Enum
    } else {
        SymbolKind::Class
    };

    let name = if is_companion && node.child_by_field_name("name").is_none() {
        "Companion".to_string()
    } else {
        extract_identifier(node, source)
    };

    let doc = find_doc_comment(node, source);
    let mut symbol = state.create_symbol(name, kind, node_range(node), node.start_byte() as u32, node.end_byte() as u32, doc);
    symbol = symbol.with_signature(header_text(node, source)).with_visibility(visibility_of(node, source));
    if text.contains("sealed ") {
        symbol = symbol.with_metadata("type", serde_json::json!("sealed"));
    }
    if text.contains("data class") {
        symbol = symbol.with_metadata("type", serde_json::json!("data"));
    }
    if let Some(pid) = parent_id {
        symbol = symbol.with_parent(pid);
    }
    let id = state.push_symbol(symbol);

    emit_primary_constructor_properties(node, source, id, state);
    if is_enum {
        emit_enum_entries(node, source, id, state);
    }
    emit_supertypes(node, source, id, state);
    id
}

fn emit_primary_constructor_properties(node: Node, source: &str, parent_id: SymbolId, state: &mut ExtractorState) {
    let Some(ctor) = node.child_by_field_name("primaryConstructor").or_else(|| {
        node.children(&mut node.walk()).find(|c| c.kind() == "primary_constructor")
    }) else {
        return;
    };
    let Some(params) = ctor.children(&mut ctor.walk()).find(|c| c.kind() == "class_parameters") else {
        return;
    };
    let mut cursor = params.walk();
    for param in params.children(&mut cursor) {
        if param.kind() != "class_parameter" {
            continue;
        }
        let text = node_text(param, source);
        if !(text.contains("val ") || text.contains("var ")) {
            continue;
        }
        let name = param
            .child_by_field_name("name")
            .map(|n| node_text(n, source).to_string())
            .unwrap_or_else(|| "Anonymous".to_string());
        let symbol = state
            .create_symbol(name, SymbolKind::Property, node_range(param), param.start_byte() as u32, param.end_byte() as u32, None)
            .with_signature(text.trim().to_string())
            .with_visibility(visibility_of(param, source))
            .with_parent(parent_id);
        state.push_symbol(symbol);
    }
}

fn emit_enum_entries(node: Node, source: &str, parent_id: SymbolId, state: &mut ExtractorState) {
    let mut cursor = node.walk();
    for descendant in node_descendants(node, &mut cursor) {
        if descendant.kind() != "enum_entry" {
            continue;
        }
        let name = extract_identifier(descendant, source);
        let symbol = state
            .create_symbol(name, SymbolKind::EnumMember, node_range(descendant), descendant.start_byte() as u32, descendant.end_byte() as u32, None)
            .with_visibility(Visibility::Public)
            .with_parent(parent_id);
        state.push_symbol(symbol);
    }
}

fn node_descendants<'a>(node: Node<'a>, _cursor: &mut tree_sitter::TreeCursor<'a>) -> Vec<Node<'a>> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        let mut c = n.walk();
        for child in n.children(&mut c) {
            out.push(child);
            stack.push(child);
        }
    }
    out
}

fn emit_supertypes(node: Node, source: &str, from_id: SymbolId, state: &mut ExtractorState) {
    let Some(delegation) = node.children(&mut node.walk()).find(|c| c.kind() == "delegation_specifiers") else {
        return;
    };
    let mut cursor = delegation.walk();
    for spec in delegation.children(&mut cursor) {
        if !spec.is_named() {
            continue;
        }
        let name = node_text(spec, source).split('(').next().unwrap_or("").trim().to_string();
        if name.is_empty() {
            continue;
        }
        state.push_relationship(Relationship::new(
            from_id,
            RelationshipTarget::external_token("kotlin", &name),
            RelationshipKind::Extends,
            state.file_path.clone(),
            node.start_position().row as u32 + 1,
        ));
    }
}

fn emit_function(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState) {
    let name = extract_identifier(node, source);
    let doc = find_doc_comment(node, source);
    let header = header_text(node, source);

    // Extension function: `fun Receiver.name(...)` — keep the receiver in
    // the signature so `String.isPalindrome()` reads distinctly from a
    // bare `isPalindrome()` (§4.4.6).
    let kind = if parent_id.is_some() { SymbolKind::Method } else { SymbolKind::Function };

    let mut symbol = state.create_symbol(name, kind, node_range(node), node.start_byte() as u32, node.end_byte() as u32, doc);
    symbol = symbol.with_signature(header).with_visibility(visibility_of(node, source));
    if let Some(pid) = parent_id {
        symbol = symbol.with_parent(pid);
    }
    state.push_symbol(symbol);
}

fn emit_property(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState) {
    let text = node_text(node, source);
    let doc = find_doc_comment(node, source);

    let name = node
        .children(&mut node.walk())
        .find(|c| c.kind() == "variable_declaration")
        .and_then(|v| v.child_by_field_name("name"))
        .map(|n| node_text(n, source).to_string())
        .unwrap_or_else(|| extract_identifier(node, source));

    let is_const = text.trim_start().starts_with("const val");
    let is_val = text.trim_start().starts_with("val") && !is_const;
    let kind = if is_const {
        SymbolKind::Constant
    } else if parent_id.is_some() {
        SymbolKind::Property
    } else if is_val {
        SymbolKind::Constant
    } else {
        SymbolKind::Variable
    };

    let mut symbol = state.create_symbol(name, kind, node_range(node), node.start_byte() as u32, node.end_byte() as u32, doc);
    symbol = symbol.with_signature(header_text(node, source)).with_visibility(visibility_of(node, source));
    if let Some(pid) = parent_id {
        symbol = symbol.with_parent(pid);
    }
    state.push_symbol(symbol);
}

fn emit_type_alias(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState) {
    let name = extract_identifier(node, source);
    let doc = find_doc_comment(node, source);
    // The right-hand side can be split across several nodes (generic function
    // types, nullable unions); reconstruct from the full node text rather
    // than a single named child (§4.4.6).
    let signature = node_text(node, source).trim_end_matches(';').trim().to_string();

    let mut symbol = state.create_symbol(name, SymbolKind::Type, node_range(node), node.start_byte() as u32, node.end_byte() as u32, doc);
    symbol = symbol.with_signature(signature).with_visibility(visibility_of(node, source));
    if let Some(pid) = parent_id {
        symbol = symbol.with_parent(pid);
    }
    state.push_symbol(symbol);
}

impl LanguageExtractor for KotlinExtractor {
    fn language(&self) -> Language {
        Language::Kotlin
    }

    fn extract_symbols(&mut self, root: Node, source: &str, state: &mut ExtractorState) {
        walk(root, source, None, state, 0);
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
        let parsed = parse_file(Path::new("a.kt"), source, None).unwrap();
        let mut extractor = KotlinExtractor::new();
        let (symbols, _relationships, _types, _truncated) =
            extract_file(&mut extractor, &parsed.tree, source, "a.kt", None);
        symbols
    }

    #[test]
    fn test_const_val_is_constant() {
        let symbols = extract("const val MAX_SIZE: Int = 100");
        let max_size = symbols.iter().find(|s| s.name.as_ref() == "MAX_SIZE").unwrap();
        assert_eq!(max_size.kind, SymbolKind::Constant);
    }

    #[test]
    fn test_primary_constructor_val_is_property() {
        let symbols = extract("class Point(val x: Int, val y: Int)");
        let point = symbols.iter().find(|s| s.name.as_ref() == "Point").unwrap();
        let x = symbols.iter().find(|s| s.name.as_ref() == "x").unwrap();
        assert_eq!(x.kind, SymbolKind::Property);
        assert_eq!(x.parent_id, Some(point.id));
    }

    #[test]
    fn test_const_val_in_companion_object_parented_to_companion() {
        let symbols = extract("class K {\n    companion object {\n        const val MAX = 42\n    }\n}\n");
        let k = symbols.iter().find(|s| s.name.as_ref() == "K").unwrap();
        let companion = symbols.iter().find(|s| s.name.as_ref() == "Companion").unwrap();
        assert_eq!(companion.parent_id, Some(k.id));
        let max = symbols.iter().find(|s| s.name.as_ref() == "MAX").unwrap();
        assert_eq!(max.kind, SymbolKind::Constant);
        assert_eq!(max.parent_id, Some(companion.id));
    }

    #[test]
    fn test_data_class_metadata() {
        let symbols = extract("data class User(val name: String)");
        let user = symbols.iter().find(|s| s.name.as_ref() == "User").unwrap();
        assert_eq!(user.metadata.get("type"), Some(&serde_json::json!("data")));
    }
}
