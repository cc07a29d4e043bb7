//! Java extractor (C4, §4.4.2 C-family languages).

use crate::parsing::base::{
    extract_identifier, extract_visibility, find_doc_comment, node_text, ExtractorState,
    LanguageExtractor,
};
use crate::parsing::parser::check_recursion_depth;
use crate::parsing::Language;
use crate::relationship::{Relationship, RelationshipTarget};
use crate::types::{Range, RelationshipKind, SymbolId, SymbolKind, Visibility};
use tree_sitter::Node;

const VISIBILITY_TOKENS: &[&str] = &["public", "private", "protected"];

#[derive(Default)]
pub struct JavaExtractor;

impl JavaExtractor {
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

fn leading_annotations(node: Node, source: &str) -> String {
    let mut sib = node.prev_named_sibling();
    let mut annotations = Vec::new();
    while let Some(n) = sib {
        if matches!(n.kind(), "marker_annotation" | "annotation") {
            annotations.push(node_text(n, source).to_string());
            sib = n.prev_named_sibling();
        } else {
            break;
        }
    }
    annotations.reverse();
    annotations.join(" ")
}

fn class_visibility(node: Node, source: &str, parent_is_type_body: bool) -> Visibility {
    extract_visibility(node, source, VISIBILITY_TOKENS).unwrap_or(if parent_is_type_body {
        Visibility::Package
    } else {
        Visibility::Package
    })
}

fn walk(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState, depth: usize) {
    if !check_recursion_depth(depth, node) || state.deadline_exceeded() {
        return;
    }

    let mut next_parent = parent_id;

    match node.kind() {
        "package_declaration" => {
            let name_node = node.named_child(0);
            let name = name_node
                .map(|n| node_text(n, source).to_string())
                .unwrap_or_else(|| "Anonymous".to_string());
            let symbol = state
                .create_symbol(name, SymbolKind::Namespace, node_range(node), node.start_byte() as u32, node.end_byte() as u32, None)
                .with_signature(node_text(node, source).trim().to_string());
            state.push_symbol(symbol);
        }
        "import_declaration" => {
            emit_import(node, source, state);
        }
        "class_declaration" | "record_declaration" | "interface_declaration" | "annotation_type_declaration" | "enum_declaration" => {
            next_parent = Some(emit_type_decl(node, source, parent_id, state));
        }
        "method_declaration" => {
            emit_method(node, source, parent_id, state, parent_id.is_some());
        }
        "constructor_declaration" => {
            emit_constructor(node, source, parent_id, state);
        }
        "field_declaration" => {
            emit_field(node, source, parent_id, state);
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
    let is_static = text.contains("import static");
    let path = text
        .trim_start_matches("import")
        .trim()
        .trim_start_matches("static")
        .trim()
        .trim_end_matches(';')
        .trim();

    let name = if let Some(stripped) = path.strip_suffix(".*") {
        stripped.rsplit('.').next().unwrap_or(stripped).to_string()
    } else {
        path.rsplit('.').next().unwrap_or(path).to_string()
    };

    let mut symbol = state.create_symbol(
        name,
        SymbolKind::Import,
        node_range(node),
        node.start_byte() as u32,
        node.end_byte() as u32,
        None,
    );
    symbol = symbol.with_signature(text.trim().to_string());
    if is_static {
        symbol = symbol.with_metadata("static", serde_json::json!(true));
    }
    state.push_symbol(symbol);
}

fn emit_type_decl(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState) -> SymbolId {
    let kind = match node.kind() {
        "interface_declaration" | "annotation_type_declaration" => SymbolKind::Interface,
        "enum_declaration" => SymbolKind::Enum,
        _ => SymbolKind::Class,
    };
    let name = extract_identifier(node, source);
    let doc = find_doc_comment(node, source);
    let annotations = leading_annotations(node, source);
    let header = node_text(node, source);
    let header = match header.find('{') {
        Some(idx) => &header[..idx],
        None => header,
    };
    let signature = if annotations.is_empty() {
        header.trim().to_string()
    } else {
        format!("{} {}", annotations, header.trim())
    };

    let mut symbol = state.create_symbol(name, kind, node_range(node), node.start_byte() as u32, node.end_byte() as u32, doc);
    symbol = symbol
        .with_signature(signature)
        .with_visibility(class_visibility(node, source, parent_id.is_some()));
    match node.kind() {
        "record_declaration" => symbol = symbol.with_metadata("type", serde_json::json!("record")),
        "annotation_type_declaration" => symbol = symbol.with_metadata("type", serde_json::json!("annotation")),
        _ => {}
    }
    if header.contains("sealed ") {
        symbol = symbol.with_metadata("type", serde_json::json!("sealed"));
    }
    if let Some(pid) = parent_id {
        symbol = symbol.with_parent(pid);
    }
    let id = state.push_symbol(symbol);

    if node.kind() == "record_declaration" {
        emit_record_components(node, source, id, state);
    }
    if node.kind() == "enum_declaration" {
        emit_enum_constants(node, source, id, state);
    }
    emit_inheritance_relationships(node, source, id, state);
    id
}

fn emit_record_components(node: Node, source: &str, parent_id: SymbolId, state: &mut ExtractorState) {
    let Some(params) = node.child_by_field_name("parameters") else {
        return;
    };
    let mut cursor = params.walk();
    for child in params.children(&mut cursor) {
        if child.kind() != "formal_parameter" {
            continue;
        }
        let name = child
            .child_by_field_name("name")
            .map(|n| node_text(n, source).to_string())
            .unwrap_or_else(|| "Anonymous".to_string());
        let symbol = state
            .create_symbol(name, SymbolKind::Property, node_range(child), child.start_byte() as u32, child.end_byte() as u32, None)
            .with_signature(node_text(child, source).trim().to_string())
            .with_visibility(Visibility::Public)
            .with_parent(parent_id);
        state.push_symbol(symbol);
    }
}

fn emit_enum_constants(node: Node, source: &str, parent_id: SymbolId, state: &mut ExtractorState) {
    let Some(body) = node.child_by_field_name("body") else {
        return;
    };
    let mut cursor = body.walk();
    for child in body.children(&mut cursor) {
        if child.kind() != "enum_constant" {
            continue;
        }
        let name = extract_identifier(child, source);
        let symbol = state
            .create_symbol(name, SymbolKind::EnumMember, node_range(child), child.start_byte() as u32, child.end_byte() as u32, None)
            .with_visibility(Visibility::Public)
            .with_parent(parent_id);
        state.push_symbol(symbol);
    }
}

fn emit_inheritance_relationships(node: Node, source: &str, from_id: SymbolId, state: &mut ExtractorState) {
    if let Some(superclass) = node.child_by_field_name("superclass") {
        let name = node_text(superclass, source).trim_start_matches("extends").trim().to_string();
        state.push_relationship(Relationship::new(
            from_id,
            RelationshipTarget::external_token("java", &name),
            RelationshipKind::Extends,
            state.file_path.clone(),
            node.start_position().row as u32 + 1,
        ));
    }
    if let Some(interfaces) = node.child_by_field_name("interfaces") {
        let text = node_text(interfaces, source).trim_start_matches("implements").trim();
        for name in text.split(',') {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let kind = if node.kind() == "interface_declaration" {
                RelationshipKind::Extends
            } else {
                RelationshipKind::Implements
            };
            state.push_relationship(Relationship::new(
                from_id,
                RelationshipTarget::external_token("java", name),
                kind,
                state.file_path.clone(),
                node.start_position().row as u32 + 1,
            ));
        }
    }
}

fn emit_method(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState, in_type_body: bool) {
    let name = extract_identifier(node, source);
    let doc = find_doc_comment(node, source);
    let annotations = leading_annotations(node, source);
    let header = node_text(node, source);
    let header = match header.find('{') {
        Some(idx) => &header[..idx],
        None => header,
    };
    let signature = if annotations.is_empty() {
        header.trim().to_string()
    } else {
        format!("{} {}", annotations, header.trim())
    };

    let kind = if in_type_body { SymbolKind::Method } else { SymbolKind::Function };
    let mut symbol = state.create_symbol(name, kind, node_range(node), node.start_byte() as u32, node.end_byte() as u32, doc);
    symbol = symbol
        .with_signature(signature)
        .with_visibility(class_visibility(node, source, in_type_body));
    if let Some(pid) = parent_id {
        symbol = symbol.with_parent(pid);
    }
    state.push_symbol(symbol);
}

fn emit_constructor(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState) {
    let name = extract_identifier(node, source);
    let doc = find_doc_comment(node, source);
    let header = node_text(node, source);
    let header = match header.find('{') {
        Some(idx) => &header[..idx],
        None => header,
    };
    let mut symbol = state.create_symbol(
        name,
        SymbolKind::Constructor,
        node_range(node),
        node.start_byte() as u32,
        node.end_byte() as u32,
        doc,
    );
    symbol = symbol.with_signature(header.trim().to_string()).with_visibility(class_visibility(node, source, true));
    if let Some(pid) = parent_id {
        symbol = symbol.with_parent(pid);
    }
    state.push_symbol(symbol);
}

fn emit_field(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState) {
    // Only the first declarator emits a Symbol (§9 Open Questions: source
    // behavior preserved here rather than guessed at).
    let Some(declarator) = node.child_by_field_name("declarator") else {
        return;
    };
    let Some(name_node) = declarator.child_by_field_name("name") else {
        return;
    };
    let name = node_text(name_node, source).to_string();
    let doc = find_doc_comment(node, source);
    let text = node_text(node, source).trim().to_string();
    let is_static_final = text.contains("static") && text.contains("final");
    let kind = if is_static_final { SymbolKind::Constant } else { SymbolKind::Property };

    let mut symbol = state.create_symbol(name, kind, node_range(node), node.start_byte() as u32, node.end_byte() as u32, doc);
    symbol = symbol.with_signature(text).with_visibility(class_visibility(node, source, true));
    if let Some(pid) = parent_id {
        symbol = symbol.with_parent(pid);
    }
    state.push_symbol(symbol);
}

impl LanguageExtractor for JavaExtractor {
    fn language(&self) -> Language {
        Language::Java
    }

    fn extract_symbols(&mut self, root: Node, source: &str, state: &mut ExtractorState) {
        walk(root, source, None, state, 0);
    }

    fn extract_relationships(&mut self, _root: Node, _source: &str, _state: &mut ExtractorState) {
        // Extends/Implements are emitted alongside type declarations in
        // extract_symbols, once the declaring Symbol's id is known.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::base::extract_file;
    use crate::parsing::parser::parse_file;
    use std::path::Path;

    fn extract(source: &str) -> Vec<crate::symbol::Symbol> {
        let parsed = parse_file(Path::new("A.java"), source, None).unwrap();
        let mut extractor = JavaExtractor::new();
        let (symbols, _relationships, _types, _truncated) =
            extract_file(&mut extractor, &parsed.tree, source, "A.java", None);
        symbols
    }

    #[test]
    fn test_record_with_components_and_method() {
        let symbols = extract(
            "public record Person(String name, int age) { public boolean isAdult(){return age>=18;} }",
        );
        let person = symbols.iter().find(|s| s.name.as_ref() == "Person").unwrap();
        assert_eq!(person.kind, SymbolKind::Class);
        assert!(person.signature.as_deref().unwrap().contains("record Person(String name, int age)"));

        let name_prop = symbols.iter().find(|s| s.name.as_ref() == "name").unwrap();
        assert_eq!(name_prop.kind, SymbolKind::Property);
        assert_eq!(name_prop.parent_id, Some(person.id));

        let is_adult = symbols.iter().find(|s| s.name.as_ref() == "isAdult").unwrap();
        assert_eq!(is_adult.kind, SymbolKind::Method);
        assert!(is_adult.signature.as_deref().unwrap().contains("boolean isAdult()"));
    }

    #[test]
    fn test_static_wildcard_import() {
        let symbols = extract("import static java.util.Collections.*;");
        let import = symbols.iter().find(|s| s.kind == SymbolKind::Import).unwrap();
        assert_eq!(import.name.as_ref(), "Collections");
        assert_eq!(import.signature.as_deref(), Some("import static java.util.Collections.*"));
    }

    #[test]
    fn test_enum_members_parented() {
        let symbols = extract("enum Suit { HEARTS, SPADES }");
        let suit = symbols.iter().find(|s| s.name.as_ref() == "Suit").unwrap();
        let hearts = symbols.iter().find(|s| s.name.as_ref() == "HEARTS").unwrap();
        assert_eq!(hearts.kind, SymbolKind::EnumMember);
        assert_eq!(hearts.parent_id, Some(suit.id));
    }
}
