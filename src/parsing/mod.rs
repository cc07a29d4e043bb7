//! Parser Manager, Base Extractor, and the per-language extractors (C1,
//! C3-C6).

pub mod base;
pub mod bash;
pub mod cross_lang;
pub mod ecmascript;
pub mod java;
pub mod kotlin;
pub mod language;
pub mod parser;
pub mod ruby;
pub mod rust;
pub mod type_inference;

pub use base::{extract_file, ExtractorState, LanguageExtractor};
pub use language::Language;
pub use parser::{new_parser_for, parse_file, ParsedTree};

use crate::relationship::Relationship;
use crate::symbol::Symbol;
use crate::types::TypeInfo;
use std::time::Duration;

/// Construct the extractor for `language`. One fresh instance per file
/// (§5): extractors hold per-file mutable state and are never shared.
pub fn extractor_for(language: Language) -> Box<dyn LanguageExtractor> {
    match language {
        Language::Rust => Box::new(rust::RustExtractor::new()),
        Language::Java => Box::new(java::JavaExtractor::new()),
        Language::Kotlin => Box::new(kotlin::KotlinExtractor::new()),
        Language::JavaScript => Box::new(ecmascript::EcmaScriptExtractor::new(false)),
        Language::TypeScript => Box::new(ecmascript::EcmaScriptExtractor::new(true)),
        Language::Ruby => Box::new(ruby::RubyExtractor::new()),
        Language::Bash => Box::new(bash::BashExtractor::new()),
    }
}

/// The full per-file pipeline: parse, extract symbols/relationships,
/// run the cross-language binding detector (C5) and type inference (C6),
/// and hand back the §6 shape for one file.
pub struct FileExtraction {
    pub symbols: Vec<Symbol>,
    pub relationships: Vec<Relationship>,
    pub types: Vec<TypeInfo>,
    pub truncated: bool,
}

pub fn extract_source(
    path: &std::path::Path,
    source: &str,
    override_language: Option<Language>,
    deadline: Option<Duration>,
) -> Result<FileExtraction, crate::error::ExtractError> {
    let parsed = parse_file(path, source, override_language)?;
    let file_path = path.to_string_lossy();
    let mut extractor = extractor_for(parsed.language);
    let (mut symbols, mut relationships, mut types, truncated) =
        extract_file(extractor.as_mut(), &parsed.tree, source, &file_path, deadline);

    let bindings = cross_lang::detect_bindings(parsed.language, &symbols, &file_path);
    relationships.extend(bindings);

    let inferred = type_inference::infer(&symbols, parsed.language);
    types.extend(inferred);

    symbols.shrink_to_fit();
    relationships.shrink_to_fit();

    Ok(FileExtraction {
        symbols,
        relationships,
        types,
        truncated,
    })
}
