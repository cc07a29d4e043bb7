//! Rust extractor (C4, §4.4.3): trait-centric language with deferred
//! impl-block processing.

use crate::parsing::base::{
    extract_identifier, extract_visibility, find_doc_comment, node_text, ExtractorState,
    LanguageExtractor,
};
use crate::parsing::parser::check_recursion_depth;
use crate::parsing::Language;
use crate::relationship::{Relationship, RelationshipTarget};
use crate::types::{Range, RelationshipKind, SymbolId, SymbolKind, Visibility};
use tree_sitter::Node;

const VISIBILITY_KINDS: &[&str] = &["visibility_modifier"];

/// An `impl` block recorded during the first walk pass, matched to its
/// target type's Symbol once the file's symbol table is complete (§4.4.3,
/// §9 Deferred impl-block processing).
struct PendingImpl<'t> {
    node: Node<'t>,
    target_type_name: String,
    trait_name: Option<String>,
}

#[derive(Default)]
pub struct RustExtractor;

impl RustExtractor {
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

fn walk<'t>(
    node: Node<'t>,
    source: &str,
    parent_id: Option<SymbolId>,
    state: &mut ExtractorState,
    pending: &mut Vec<PendingImpl<'t>>,
    depth: usize,
) {
    if !check_recursion_depth(depth, node) || state.deadline_exceeded() {
        return;
    }

    let mut next_parent = parent_id;

    match node.kind() {
        "mod_item" => {
            let name = extract_identifier(node, source);
            let doc = find_doc_comment(node, source);
            let mut symbol = state.create_symbol(
                name,
                SymbolKind::Module,
                node_range(node),
                node.start_byte() as u32,
                node.end_byte() as u32,
                doc,
            );
            symbol = symbol.with_visibility(extract_visibility(node, source, VISIBILITY_KINDS).unwrap_or(Visibility::Private));
            if let Some(pid) = parent_id {
                symbol = symbol.with_parent(pid);
            }
            next_parent = Some(state.push_symbol(symbol));
        }
        "struct_item" => {
            // §4.4.3 / scenario §8.3: struct_item maps to the Class kind
            // (the glossary's own Struct kind is not used here).
            next_parent = Some(emit_type(node, source, SymbolKind::Class, parent_id, state));
        }
        "union_item" => {
            next_parent = Some(emit_type(node, source, SymbolKind::Union, parent_id, state));
        }
        "enum_item" => {
            let id = emit_type(node, source, SymbolKind::Enum, parent_id, state);
            emit_enum_variants(node, source, id, state);
            next_parent = Some(id);
        }
        "trait_item" => {
            next_parent = Some(emit_type(node, source, SymbolKind::Interface, parent_id, state));
        }
        "impl_item" => {
            record_pending_impl(node, source, pending);
            // impl_item does not itself emit a Symbol (§4.4.3); its methods
            // are picked up in the deferred second pass below, so we do not
            // descend into the block here.
            return;
        }
        "function_item" => {
            let name = extract_identifier(node, source);
            let doc = find_doc_comment(node, source);
            let signature = rust_function_signature(node, source);
            let mut symbol = state.create_symbol(
                name,
                SymbolKind::Function,
                node_range(node),
                node.start_byte() as u32,
                node.end_byte() as u32,
                doc,
            );
            symbol = symbol
                .with_signature(signature)
                .with_visibility(extract_visibility(node, source, VISIBILITY_KINDS).unwrap_or(Visibility::Private));
            if let Some(pid) = parent_id {
                symbol = symbol.with_parent(pid);
            }
            next_parent = Some(state.push_symbol(symbol));
        }
        "macro_definition" => {
            let name = extract_identifier(node, source);
            let doc = find_doc_comment(node, source);
            let mut symbol = state.create_symbol(
                name,
                SymbolKind::Function,
                node_range(node),
                node.start_byte() as u32,
                node.end_byte() as u32,
                doc,
            );
            symbol = symbol
                .with_signature(node_text(node, source).lines().next().unwrap_or("macro_rules!").to_string())
                .with_metadata("type", serde_json::json!("macro"));
            if let Some(pid) = parent_id {
                symbol = symbol.with_parent(pid);
            }
            state.push_symbol(symbol);
        }
        "field_declaration" => {
            let name = extract_identifier(node, source);
            let doc = find_doc_comment(node, source);
            let mut symbol = state.create_symbol(
                name,
                SymbolKind::Field,
                node_range(node),
                node.start_byte() as u32,
                node.end_byte() as u32,
                doc,
            );
            symbol = symbol
                .with_signature(node_text(node, source).trim().to_string())
                .with_visibility(extract_visibility(node, source, VISIBILITY_KINDS).unwrap_or(Visibility::Private));
            if let Some(pid) = parent_id {
                symbol = symbol.with_parent(pid);
            }
            state.push_symbol(symbol);
        }
        "const_item" | "static_item" => {
            let name = extract_identifier(node, source);
            let doc = find_doc_comment(node, source);
            let mut symbol = state.create_symbol(
                name,
                SymbolKind::Constant,
                node_range(node),
                node.start_byte() as u32,
                node.end_byte() as u32,
                doc,
            );
            symbol = symbol
                .with_signature(node_text(node, source).trim().to_string())
                .with_visibility(extract_visibility(node, source, VISIBILITY_KINDS).unwrap_or(Visibility::Private));
            if let Some(pid) = parent_id {
                symbol = symbol.with_parent(pid);
            }
            state.push_symbol(symbol);
        }
        "use_declaration" => {
            emit_use(node, source, parent_id, state);
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, source, next_parent, state, pending, depth + 1);
    }
}

fn emit_type(
    node: Node,
    source: &str,
    kind: SymbolKind,
    parent_id: Option<SymbolId>,
    state: &mut ExtractorState,
) -> SymbolId {
    let name = extract_identifier(node, source);
    let doc = find_doc_comment(node, source);
    let signature = rust_type_signature(node, source);
    let mut symbol = state.create_symbol(
        name,
        kind,
        node_range(node),
        node.start_byte() as u32,
        node.end_byte() as u32,
        doc,
    );
    symbol = symbol
        .with_signature(signature)
        .with_visibility(extract_visibility(node, source, VISIBILITY_KINDS).unwrap_or(Visibility::Private));
    if let Some(pid) = parent_id {
        symbol = symbol.with_parent(pid);
    }
    state.push_symbol(symbol)
}

fn emit_enum_variants(node: Node, source: &str, parent_id: SymbolId, state: &mut ExtractorState) {
    let Some(body) = node.child_by_field_name("body") else {
        return;
    };
    let mut cursor = body.walk();
    for child in body.children(&mut cursor) {
        if child.kind() != "enum_variant" {
            continue;
        }
        let name = extract_identifier(child, source);
        let doc = find_doc_comment(child, source);
        let symbol = state
            .create_symbol(name, SymbolKind::EnumMember, node_range(child), child.start_byte() as u32, child.end_byte() as u32, doc)
            .with_visibility(Visibility::Public)
            .with_parent(parent_id);
        state.push_symbol(symbol);
    }
}

fn record_pending_impl<'t>(node: Node<'t>, source: &str, pending: &mut Vec<PendingImpl<'t>>) {
    let type_node = node.child_by_field_name("type");
    let trait_node = node.child_by_field_name("trait");
    let target_type_name = type_node
        .map(|n| base_type_name(node_text(n, source)))
        .unwrap_or_default();
    let trait_name = trait_node.map(|n| node_text(n, source).to_string());
    pending.push(PendingImpl {
        node,
        target_type_name,
        trait_name,
    });
}

/// Second pass (§4.4.3, §9): match each recorded impl block to the Symbol
/// it targets and extract its methods as children of that type.
fn resolve_pending_impls(pending: Vec<PendingImpl>, source: &str, state: &mut ExtractorState) {
    for pending_impl in pending {
        let Some(target_id) = state
            .find_symbol_by_name(&pending_impl.target_type_name)
            .filter(|s| {
                matches!(
                    s.kind,
                    SymbolKind::Class | SymbolKind::Interface | SymbolKind::Struct | SymbolKind::Enum | SymbolKind::Union
                )
            })
            .map(|s| s.id)
        else {
            continue;
        };

        if let Some(trait_name) = &pending_impl.trait_name {
            state.push_relationship(Relationship::new(
                target_id,
                RelationshipTarget::external_token("rust", trait_name),
                RelationshipKind::Implements,
                state.file_path.clone(),
                pending_impl.node.start_position().row as u32 + 1,
            ));
        }

        let Some(body) = pending_impl.node.child_by_field_name("body") else {
            continue;
        };
        let mut cursor = body.walk();
        for child in body.children(&mut cursor) {
            if child.kind() != "function_item" {
                continue;
            }
            let name = extract_identifier(child, source);
            let doc = find_doc_comment(child, source);
            let signature = rust_function_signature(child, source);
            let symbol = state
                .create_symbol(name, SymbolKind::Method, node_range(child), child.start_byte() as u32, child.end_byte() as u32, doc)
                .with_signature(signature)
                .with_visibility(extract_visibility(child, source, VISIBILITY_KINDS).unwrap_or(Visibility::Private))
                .with_parent(target_id);
            state.push_symbol(symbol);
        }
    }
}

fn emit_use(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState) {
    let text = node_text(node, source);
    let path_part = text
        .trim_start_matches("pub")
        .trim_start()
        .trim_start_matches("use")
        .trim()
        .trim_end_matches(';')
        .trim();

    let name = if let Some((_, alias)) = path_part.rsplit_once(" as ") {
        alias.trim().to_string()
    } else {
        path_part
            .rsplit("::")
            .next()
            .unwrap_or(path_part)
            .trim_matches(|c| c == '{' || c == '}')
            .to_string()
    };
    if name.is_empty() {
        return;
    }

    let mut symbol = state.create_symbol(
        name,
        SymbolKind::Import,
        node_range(node),
        node.start_byte() as u32,
        node.end_byte() as u32,
        None,
    );
    symbol = symbol.with_signature(text.trim().to_string());
    if let Some(pid) = parent_id {
        symbol = symbol.with_parent(pid);
    }
    state.push_symbol(symbol);
}

fn base_type_name(text: &str) -> String {
    // Strip leading `&`/lifetimes and trailing generic arguments so
    // `&'a Foo<T>` resolves to the same name as the `struct Foo` Symbol.
    let text = text.trim().trim_start_matches('&');
    let text = text
        .split_once('\'')
        .map(|(_, rest)| rest.trim_start())
        .unwrap_or(text);
    match text.find(['<', ' ']) {
        Some(idx) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

fn rust_type_signature(node: Node, source: &str) -> String {
    let full = node_text(node, source);
    match full.find('{') {
        Some(idx) => full[..idx].trim().to_string(),
        None => full.trim_end_matches(';').trim().to_string(),
    }
}

fn rust_function_signature(node: Node, source: &str) -> String {
    let full = node_text(node, source);
    match full.find('{') {
        Some(idx) => full[..idx].trim().to_string(),
        None => full.trim().to_string(),
    }
}

impl LanguageExtractor for RustExtractor {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn extract_symbols(&mut self, root: Node, source: &str, state: &mut ExtractorState) {
        let mut pending = Vec::new();
        walk(root, source, None, state, &mut pending, 0);
        resolve_pending_impls(pending, source, state);
    }

    fn extract_relationships(&mut self, _root: Node, _source: &str, _state: &mut ExtractorState) {
        // Implements relationships for impl blocks are emitted during the
        // deferred pass in extract_symbols, once both symbol tables exist.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::base::extract_file;
    use crate::parsing::parser::parse_file;
    use std::path::Path;

    fn extract(source: &str) -> (Vec<crate::symbol::Symbol>, Vec<Relationship>) {
        let parsed = parse_file(Path::new("a.rs"), source, None).unwrap();
        let mut extractor = RustExtractor::new();
        let (symbols, relationships, _types, _truncated) =
            extract_file(&mut extractor, &parsed.tree, source, "a.rs", None);
        (symbols, relationships)
    }

    #[test]
    fn test_impl_block_methods_parented_to_struct() {
        let (symbols, _) = extract("struct S; impl S { pub fn new() -> Self { S } }");
        let s = symbols.iter().find(|s| s.name.as_ref() == "S" && s.kind == SymbolKind::Class).unwrap();
        let new_fn = symbols.iter().find(|s| s.name.as_ref() == "new").unwrap();
        assert_eq!(new_fn.kind, SymbolKind::Method);
        assert_eq!(new_fn.parent_id, Some(s.id));
        assert!(new_fn.signature.as_deref().unwrap().contains("pub fn new() -> Self"));
    }

    #[test]
    fn test_top_level_function_is_function_kind() {
        let (symbols, _) = extract("fn main() {}");
        let main_fn = symbols.iter().find(|s| s.name.as_ref() == "main").unwrap();
        assert_eq!(main_fn.kind, SymbolKind::Function);
        assert!(main_fn.parent_id.is_none());
    }

    #[test]
    fn test_enum_variants_parented() {
        let (symbols, _) = extract("enum Color { Red, Green, Blue }");
        let e = symbols.iter().find(|s| s.name.as_ref() == "Color").unwrap();
        let red = symbols.iter().find(|s| s.name.as_ref() == "Red").unwrap();
        assert_eq!(red.kind, SymbolKind::EnumMember);
        assert_eq!(red.parent_id, Some(e.id));
    }

    #[test]
    fn test_trait_maps_to_interface() {
        let (symbols, _) = extract("trait Shape { fn area(&self) -> f64; }");
        let shape = symbols.iter().find(|s| s.name.as_ref() == "Shape").unwrap();
        assert_eq!(shape.kind, SymbolKind::Interface);
    }

    #[test]
    fn test_use_declaration_alias() {
        let (symbols, _) = extract("use std::collections::HashMap as Map;");
        let import = symbols.iter().find(|s| s.kind == SymbolKind::Import).unwrap();
        assert_eq!(import.name.as_ref(), "Map");
    }
}
