//! Bash extractor (C4, §4.4.5): function/variable classification, cross-
//! language invoker detection, and auxiliary control-flow symbols.

use crate::parsing::base::{extract_identifier, find_doc_comment, node_text, ExtractorState, LanguageExtractor};
use crate::parsing::parser::check_recursion_depth;
use crate::parsing::Language;
use crate::relationship::Relationship;
use crate::types::{Range, SymbolId, SymbolKind, Visibility};
use tree_sitter::Node;

const CONTROL_FLOW_KINDS: &[&str] = &["if_statement", "for_statement", "while_statement", "case_statement"];

#[derive(Default)]
pub struct BashExtractor;

impl BashExtractor {
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

fn walk(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState, depth: usize) {
    if !check_recursion_depth(depth, node) || state.deadline_exceeded() {
        return;
    }

    let mut next_parent = parent_id;

    match node.kind() {
        "function_definition" => {
            next_parent = Some(emit_function(node, source, parent_id, state));
        }
        "variable_assignment" => {
            emit_variable(node, source, parent_id, state);
        }
        "declaration_command" => {
            emit_declaration_command(node, source, parent_id, state);
        }
        "command" => {
            emit_command(node, source, parent_id, state);
        }
        kind if CONTROL_FLOW_KINDS.contains(&kind) => {
            next_parent = Some(emit_control_flow(node, source, parent_id, state));
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, source, next_parent, state, depth + 1);
    }
}

fn emit_function(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState) -> SymbolId {
    let name = extract_identifier(node, source);
    let doc = find_doc_comment(node, source);
    let mut symbol = state.create_symbol(name, SymbolKind::Function, node_range(node), node.start_byte() as u32, node.end_byte() as u32, doc);
    symbol = symbol.with_signature(header_text(node, source)).with_visibility(Visibility::Public);
    if let Some(pid) = parent_id {
        symbol = symbol.with_parent(pid);
    }
    let id = state.push_symbol(symbol);
    emit_positional_parameters(node, source, id, state);
    id
}

/// `$1`..`$9` referenced in a function body become Variable symbols parented
/// to that function (§4.4.5); only the first occurrence of each is emitted.
fn emit_positional_parameters(node: Node, source: &str, parent_id: SymbolId, state: &mut ExtractorState) {
    let mut seen = [false; 9];
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        if n.kind() == "simple_expansion" || n.kind() == "expansion" {
            let text = node_text(n, source);
            let digit = text.trim_start_matches('$').trim_start_matches('{').chars().next();
            if let Some(d) = digit {
                if let Some(idx) = d.to_digit(10).filter(|v| (1..=9).contains(v)) {
                    let idx = idx as usize - 1;
                    if !seen[idx] {
                        seen[idx] = true;
                        let symbol = state
                            .create_symbol(format!("${}", idx + 1), SymbolKind::Variable, node_range(n), n.start_byte() as u32, n.end_byte() as u32, None)
                            .with_visibility(Visibility::Public)
                            .with_parent(parent_id);
                        state.push_symbol(symbol);
                    }
                }
            }
        }
        let mut cursor = n.walk();
        for child in n.children(&mut cursor) {
            stack.push(child);
        }
    }
}

fn emit_variable(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let name = node_text(name_node, source).to_string();
    let doc = find_doc_comment(node, source);
    let kind = classify_bash_variable(&name, false);
    let mut symbol = state.create_symbol(name, kind, node_range(node), node.start_byte() as u32, node.end_byte() as u32, doc);
    symbol = symbol.with_signature(header_text(node, source)).with_visibility(Visibility::Public);
    if let Some(pid) = parent_id {
        symbol = symbol.with_parent(pid);
    }
    state.push_symbol(symbol);
}

fn classify_bash_variable(name: &str, is_readonly: bool) -> SymbolKind {
    if is_readonly || name.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
        SymbolKind::Constant
    } else {
        SymbolKind::Variable
    }
}

/// `declare`/`export`/`readonly name=value` forms (§4.4.5): `readonly` and
/// `declare -r` always classify as Constant regardless of naming case.
fn emit_declaration_command(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState) {
    let text = node_text(node, source);
    let command_name = node.child_by_field_name("name").map(|n| node_text(n, source)).unwrap_or("");
    let is_readonly = command_name == "readonly" || text.contains(" -r") || text.starts_with("readonly");

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() != "variable_assignment" {
            continue;
        }
        let Some(name_node) = child.child_by_field_name("name") else {
            continue;
        };
        let name = node_text(name_node, source).to_string();
        let kind = classify_bash_variable(&name, is_readonly);
        let visibility = if command_name == "export" { Visibility::Public } else { Visibility::Private };
        let mut symbol = state.create_symbol(name, kind, node_range(child), child.start_byte() as u32, child.end_byte() as u32, None);
        symbol = symbol.with_signature(header_text(node, source)).with_visibility(visibility);
        if let Some(pid) = parent_id {
            symbol = symbol.with_parent(pid);
        }
        state.push_symbol(symbol);
    }
}

/// A fixed list of invokers known to bridge into another language's runtime
/// (§4.4.5); any command whose name is in this set, or which contains `/`
/// (a relative/absolute script path), is treated as an external invocation.
const CROSS_LANGUAGE_INVOKERS: &[&str] = &[
    "python", "python3", "node", "npm", "bun", "go", "cargo", "java", "docker", "kubectl", "terraform", "git", "curl",
];

/// A command naming another runtime or script (`docker build .`,
/// `./deploy.sh`) bridges into another process rather than a shell builtin;
/// record it as a Function-shaped external reference. The `Calls` edge from
/// the enclosing function is left to the cross-language binding detector
/// (§4.5), which is the component of record for that relationship.
fn emit_command(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let command_text = node_text(name_node, source);
    if !command_text.contains('/') && !CROSS_LANGUAGE_INVOKERS.contains(&command_text) {
        return;
    }
    let invoked_name = command_text.rsplit('/').next().unwrap_or(command_text).to_string();

    // Scenario (§8.5): the invocation Symbol stays parented to nothing (file
    // root); the calling function is recorded in metadata instead, so the
    // binding detector (§4.5) can still draw the `Calls` edge without a
    // parent/child span relationship that doesn't actually hold here.
    let mut symbol = state
        .create_symbol(invoked_name, SymbolKind::Function, node_range(node), node.start_byte() as u32, node.end_byte() as u32, None)
        .with_metadata("type", serde_json::json!("external_invocation"));
    symbol = symbol.with_signature(crate::parsing::parser::truncate_for_display(node_text(node, source).trim(), 100));
    if let Some(pid) = parent_id {
        symbol = symbol.with_metadata("callerId", serde_json::to_value(pid).expect("SymbolId serializes to a string"));
    }
    state.push_symbol(symbol);
}

fn emit_control_flow(node: Node, source: &str, parent_id: Option<SymbolId>, state: &mut ExtractorState) -> SymbolId {
    let label = match node.kind() {
        "if_statement" => "if block",
        "for_statement" => "for block",
        "while_statement" => "while block",
        "case_statement" => "case block",
        _ => "block",
    };
    let mut symbol = state.create_symbol(label, SymbolKind::Method, node_range(node), node.start_byte() as u32, node.end_byte() as u32, None);
    symbol = symbol.with_visibility(Visibility::Public).with_metadata("type", serde_json::json!("control_flow"));
    if let Some(pid) = parent_id {
        symbol = symbol.with_parent(pid);
    }
    state.push_symbol(symbol)
}

impl LanguageExtractor for BashExtractor {
    fn language(&self) -> Language {
        Language::Bash
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
    use crate::relationship::RelationshipTarget;
    use std::path::Path;

    fn extract(source: &str) -> (Vec<crate::symbol::Symbol>, Vec<Relationship>) {
        let parsed = parse_file(Path::new("deploy.sh"), source, None).unwrap();
        let mut extractor = BashExtractor::new();
        let (symbols, relationships, _types, _truncated) =
            extract_file(&mut extractor, &parsed.tree, source, "deploy.sh", None);
        (symbols, relationships)
    }

    /// Runs the full per-file pipeline (extraction plus the C5 binding
    /// detector), since the cross-language `Calls` edge is drawn by
    /// `cross_lang::detect_bindings`, not by `extract_relationships`.
    fn extract_with_bindings(source: &str) -> (Vec<crate::symbol::Symbol>, Vec<Relationship>) {
        let extraction = crate::parsing::extract_source(Path::new("deploy.sh"), source, None, None).unwrap();
        (extraction.symbols, extraction.relationships)
    }

    #[test]
    fn test_readonly_variable_is_constant() {
        let (symbols, _) = extract("readonly MAX_RETRIES=3\n");
        let max_retries = symbols.iter().find(|s| s.name.as_ref() == "MAX_RETRIES").unwrap();
        assert_eq!(max_retries.kind, SymbolKind::Constant);
    }

    #[test]
    fn test_lowercase_assignment_is_variable() {
        let (symbols, _) = extract("count=0\n");
        let count = symbols.iter().find(|s| s.name.as_ref() == "count").unwrap();
        assert_eq!(count.kind, SymbolKind::Variable);
    }

    #[test]
    fn test_cross_language_invocation_emits_calls_relationship() {
        let (symbols, relationships) = extract_with_bindings("deploy() {\n  ./run-migrations.sh\n}\n");
        let deploy = symbols.iter().find(|s| s.name.as_ref() == "deploy").unwrap();
        let invocation = symbols.iter().find(|s| s.name.as_ref() == "run-migrations.sh").unwrap();
        assert!(relationships
            .iter()
            .any(|r| r.from_symbol_id == deploy.id && r.to == RelationshipTarget::Symbol(invocation.id)));
    }

    #[test]
    fn test_positional_parameter_parented_to_function() {
        let (symbols, _) = extract("greet() {\n  echo \"hello $1\"\n}\n");
        let greet = symbols.iter().find(|s| s.name.as_ref() == "greet").unwrap();
        let param = symbols.iter().find(|s| s.name.as_ref() == "$1").unwrap();
        assert_eq!(param.parent_id, Some(greet.id));
    }
}
