//! Base Extractor (C3, §4.3): mechanics shared by every per-language
//! extractor — tree walking, id generation, doc-comment discovery,
//! containment search, and the visibility heuristic.

use crate::parsing::Language;
use crate::relationship::Relationship;
use crate::symbol::{hash_symbol_id, Symbol};
use crate::types::{CompactString, Range, SymbolId, TypeInfo, Visibility};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tree_sitter::{Node, Tree};

const COMMENT_KINDS: &[&str] = &["line_comment", "block_comment", "comment"];

/// Byte-exact slice of `source` covered by `node` (§4.3 Node text).
#[inline]
pub fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

fn is_doc_comment_text(text: &str) -> bool {
    text.starts_with("///") || text.starts_with("/**")
}

/// Doc-comment discovery (§4.3): check `node`'s immediate previous named
/// sibling first; if that is not a comment, scan the preceding siblings of
/// `node`'s parent for the last comment before `node`'s row whose text
/// opens a doc-comment (`///` or `/**`).
pub fn find_doc_comment(node: Node, source: &str) -> Option<String> {
    if let Some(prev) = node.prev_named_sibling() {
        if COMMENT_KINDS.contains(&prev.kind()) {
            return Some(node_text(prev, source).to_string());
        }
    }

    let parent = node.parent()?;
    let mut cursor = parent.walk();
    let mut candidate: Option<Node> = None;
    for child in parent.children(&mut cursor) {
        if child.start_position().row >= node.start_position().row {
            break;
        }
        if COMMENT_KINDS.contains(&child.kind()) {
            let text = node_text(child, source);
            if is_doc_comment_text(text) {
                candidate = Some(child);
            }
        }
    }
    candidate.map(|n| node_text(n, source).to_string())
}

/// Shared per-file state accumulated by a single extractor instance during
/// one tree walk (§5: one extractor instance per file; no shared mutable
/// state across files).
pub struct ExtractorState {
    pub file_path: CompactString,
    pub language: Language,
    pub symbols: Vec<Symbol>,
    pub relationships: Vec<Relationship>,
    seen_ids: HashSet<SymbolId>,
    deadline: Option<Instant>,
    truncated: bool,
}

impl ExtractorState {
    pub fn new(file_path: impl Into<CompactString>, language: Language) -> Self {
        Self {
            file_path: file_path.into(),
            language,
            symbols: Vec::new(),
            relationships: Vec::new(),
            seen_ids: HashSet::new(),
            deadline: None,
            truncated: false,
        }
    }

    /// Arm the soft per-file deadline (§5 Cancellation/timeouts, §4.8).
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(Instant::now() + deadline);
        self
    }

    /// Checked at tree-walk node boundaries, not via preemption (§5). Once
    /// it returns `true` the caller should stop descending further.
    pub fn deadline_exceeded(&mut self) -> bool {
        if self.truncated {
            return true;
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                self.truncated = true;
                tracing::warn!(file = %self.file_path, "extraction truncated: deadline exceeded");
            }
        }
        self.truncated
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Symbol creation (§4.3): hashes `(filePath, name, startRow, startCol)`
    /// into an id, perturbing deterministically on collision (§7
    /// `IdCollision`), then records the symbol and returns its id.
    #[allow(clippy::too_many_arguments)]
    pub fn create_symbol(
        &mut self,
        name: impl Into<CompactString>,
        kind: crate::types::SymbolKind,
        range: Range,
        start_byte: u32,
        end_byte: u32,
        doc_comment: Option<String>,
    ) -> Symbol {
        let name = name.into();
        let mut salt = 0u32;
        let id = loop {
            let candidate = hash_symbol_id(&self.file_path, &name, range.start_line, range.start_column, salt);
            if self.seen_ids.insert(candidate) {
                break candidate;
            }
            if salt == 0 {
                tracing::warn!(
                    file = %self.file_path,
                    name = %name,
                    "id collision, perturbing deterministically"
                );
            }
            salt += 1;
        };

        let mut symbol = Symbol::new(
            id,
            name,
            kind,
            self.language,
            self.file_path.clone(),
            range,
            start_byte,
            end_byte,
        );
        if let Some(doc) = doc_comment {
            symbol = symbol.with_doc(doc);
        }
        symbol
    }

    pub fn push_symbol(&mut self, symbol: Symbol) -> SymbolId {
        let id = symbol.id;
        self.symbols.push(symbol);
        id
    }

    pub fn push_relationship(&mut self, relationship: Relationship) {
        self.relationships.push(relationship);
    }

    /// Innermost symbol whose span encloses `(line, column)`, applying the
    /// containment priority order and breaking ties by smaller span
    /// (§4.3 Containment, §4.4.7).
    pub fn find_containing_symbol(&self, line: u32, column: u32) -> Option<&Symbol> {
        self.symbols
            .iter()
            .filter(|s| s.range.contains(line, column))
            .min_by_key(|s| (s.kind.containment_priority(), s.range.span_size()))
    }

    pub fn find_symbol_by_name(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.name.as_ref() == name)
    }

    pub fn into_parts(self) -> (Vec<Symbol>, Vec<Relationship>, bool) {
        (self.symbols, self.relationships, self.truncated)
    }
}

/// Visibility heuristic (§4.3): explicit `public|private|protected` child
/// nodes first, then substring probes on the node's own text.
pub fn extract_visibility(node: Node, source: &str, modifier_kinds: &[&str]) -> Option<Visibility> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if modifier_kinds.contains(&child.kind()) {
            if let Some(v) = visibility_from_keyword(node_text(child, source)) {
                return Some(v);
            }
        }
    }

    let text = node_text(node, source);
    if text.contains("public ") {
        Some(Visibility::Public)
    } else if text.contains("private ") {
        Some(Visibility::Private)
    } else if text.contains("protected ") {
        Some(Visibility::Protected)
    } else {
        None
    }
}

fn visibility_from_keyword(text: &str) -> Option<Visibility> {
    match text {
        "public" => Some(Visibility::Public),
        "private" => Some(Visibility::Private),
        "protected" => Some(Visibility::Protected),
        _ => None,
    }
}

/// Identifier extraction (§4.3): the `name` field, then the first named
/// child, then `"Anonymous"` as a last resort.
pub fn extract_identifier(node: Node, source: &str) -> String {
    if let Some(name_node) = node.child_by_field_name("name") {
        return node_text(name_node, source).to_string();
    }
    if let Some(first) = node.named_child(0) {
        return node_text(first, source).to_string();
    }
    "Anonymous".to_string()
}

/// The per-language extractor contract (C4, §9): one concrete type per
/// supported language, selected by a language tag rather than a class
/// hierarchy. `extract_symbols` runs first so that `extract_relationships`
/// can resolve targets against a complete per-file symbol table (§4.4.1
/// Parent linking, §5 Ordering guarantees).
pub trait LanguageExtractor: Send {
    fn language(&self) -> Language;
    fn extract_symbols(&mut self, root: Node, source: &str, state: &mut ExtractorState);
    fn extract_relationships(&mut self, root: Node, source: &str, state: &mut ExtractorState);

    /// Optional post-pass (C6); most extractors delegate to
    /// [`crate::parsing::type_inference`] instead of overriding this.
    fn infer_types(&mut self, _state: &ExtractorState) -> Vec<TypeInfo> {
        Vec::new()
    }
}

/// Drives one extractor over one already-parsed file end to end, producing
/// the `{symbols, relationships, types}` tuple handed to the index (§6).
pub fn extract_file(
    extractor: &mut dyn LanguageExtractor,
    tree: &Tree,
    source: &str,
    file_path: &str,
    deadline: Option<Duration>,
) -> (Vec<Symbol>, Vec<Relationship>, Vec<TypeInfo>, bool) {
    let mut state = ExtractorState::new(file_path, extractor.language());
    if let Some(d) = deadline {
        state = state.with_deadline(d);
    }

    extractor.extract_symbols(tree.root_node(), source, &mut state);
    extractor.extract_relationships(tree.root_node(), source, &mut state);
    let types = extractor.infer_types(&state);

    let (symbols, relationships, truncated) = state.into_parts();
    (symbols, relationships, types, truncated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SymbolKind;

    #[test]
    fn test_create_symbol_is_deterministic() {
        let mut state = ExtractorState::new("a.rs", Language::Rust);
        let a = state.create_symbol("foo", SymbolKind::Function, Range::new(1, 0, 1, 10), 0, 10, None);
        let mut state2 = ExtractorState::new("a.rs", Language::Rust);
        let b = state2.create_symbol("foo", SymbolKind::Function, Range::new(1, 0, 1, 10), 0, 10, None);
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn test_create_symbol_collision_perturbed() {
        let mut state = ExtractorState::new("a.rs", Language::Rust);
        let a = state.create_symbol("foo", SymbolKind::Function, Range::new(1, 0, 1, 10), 0, 10, None);
        state.push_symbol(a.clone());
        let b = state.create_symbol("foo", SymbolKind::Function, Range::new(1, 0, 1, 10), 0, 10, None);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_find_containing_symbol_prefers_inner_function() {
        let mut state = ExtractorState::new("a.rs", Language::Rust);
        let class_sym =
            state.create_symbol("C", SymbolKind::Class, Range::new(1, 0, 10, 1), 0, 100, None);
        let method_sym = state.create_symbol(
            "m",
            SymbolKind::Method,
            Range::new(3, 2, 5, 3),
            20,
            40,
            None,
        );
        state.push_symbol(class_sym);
        state.push_symbol(method_sym.clone());

        let found = state.find_containing_symbol(4, 2).unwrap();
        assert_eq!(found.id, method_sym.id);
    }

    #[test]
    fn test_deadline_exceeded_after_elapsed() {
        let mut state = ExtractorState::new("a.rs", Language::Rust).with_deadline(Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert!(state.deadline_exceeded());
        assert!(state.truncated());
    }
}
