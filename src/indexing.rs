//! The workspace-wide walking pipeline: discovers source files under a
//! root, then runs the per-file pipeline ([`crate::parsing::extract_source`])
//! over each one.
//!
//! This is ambient plumbing around the core (§2 C1-C6), not part of it: the
//! spec places the persistent index, its query planner, and file watching
//! out of scope (§1, §6) and treats them as external collaborators. What
//! this module owns is only the part upstream of that boundary — turning a
//! directory into the `{ path -> { symbols, relationships, types } }` shape
//! the index consumes (§6 "Exposed to the index").

use crate::config::Settings;
use crate::error::ExtractError;
use crate::parsing::{extract_source, FileExtraction, Language};
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Conventional test-directory/file markers consulted when
/// `indexing.include_tests` is `false`.
const TEST_MARKERS: &[&str] = &["/tests/", "/test/", "_test.", ".test.", "/spec/", "_spec."];

fn looks_like_test_path(path: &Path) -> bool {
    let text = path.to_string_lossy().replace('\\', "/");
    let text = format!("/{text}");
    TEST_MARKERS.iter().any(|marker| text.contains(marker))
}

/// Discovers and extracts every supported source file under a workspace
/// root (§5 "Multiple files may be extracted in parallel").
pub struct WorkspaceWalker {
    settings: Arc<Settings>,
}

/// One file's outcome: either a full extraction, or the [`ExtractError`]
/// that kept it from producing one (only `ParseFatal`/`FileRead` reach here
/// — everything else is caught and logged inside extraction itself, §7).
pub struct FileResult {
    pub path: PathBuf,
    pub outcome: Result<FileExtraction, ExtractError>,
}

/// Aggregate counts over one workspace walk (`index_workspace` /
/// `get_workspace_stats` tool shapes, §6, are owned by the query layer; this
/// is the core-side summary the CLI prints).
#[derive(Debug, Default, Clone, Serialize)]
pub struct WorkspaceStats {
    pub files_discovered: usize,
    pub files_extracted: usize,
    pub files_failed: usize,
    pub files_truncated: usize,
    pub symbols: usize,
    pub relationships: usize,
    pub types: usize,
}

impl WorkspaceStats {
    pub fn display(&self) {
        println!("Files discovered: {}", self.files_discovered);
        println!("Files extracted:  {}", self.files_extracted);
        if self.files_failed > 0 {
            println!("Files failed:     {}", self.files_failed);
        }
        if self.files_truncated > 0 {
            println!("Files truncated:  {}", self.files_truncated);
        }
        println!("Symbols:          {}", self.symbols);
        println!("Relationships:    {}", self.relationships);
        println!("Types inferred:   {}", self.types);
    }
}

impl WorkspaceWalker {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    /// Walk `root`, respecting gitignore rules and the configured extra
    /// ignore globs (§4.7-equivalent ambient concern; grounded on the
    /// teacher's file walker), yielding paths for languages enabled in
    /// config.
    pub fn discover(&self, root: &Path) -> Vec<PathBuf> {
        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false)
            .require_git(false);

        let mut override_builder = OverrideBuilder::new(root);
        for pattern in &self.settings.indexing.ignore_patterns {
            if let Err(e) = override_builder.add(&format!("!{pattern}")) {
                tracing::warn!(pattern = %pattern, error = %e, "invalid ignore pattern, skipping");
            }
        }
        if let Ok(overrides) = override_builder.build() {
            builder.overrides(overrides);
        }

        let include_tests = self.settings.indexing.include_tests;

        builder
            .build()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .filter_map(|entry| {
                let path = entry.path();
                let language = Language::from_path(path)?;
                let enabled = self
                    .settings
                    .languages
                    .get(language.config_key())
                    .map(|cfg| cfg.enabled)
                    .unwrap_or(true);
                if !enabled {
                    return None;
                }
                if !include_tests && looks_like_test_path(path) {
                    return None;
                }
                Some(path.to_path_buf())
            })
            .collect()
    }

    /// Extract every discovered file under `root`. Per §5, each file gets
    /// its own extractor instance with no shared mutable state, so the
    /// fan-out across a rayon pool sized by `indexing.parallel_threads` is
    /// safe; the Parser Manager's grammar construction is cheap enough to
    /// repeat per file (§5 Shared resources, §4.1).
    pub fn extract_workspace(&self, root: &Path) -> (Vec<FileResult>, WorkspaceStats) {
        use rayon::prelude::*;

        let files = self.discover(root);
        let deadline = Duration::from_millis(self.settings.indexing.extraction_deadline_ms);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.indexing.parallel_threads.max(1))
            .build();

        let extract_all = || -> Vec<FileResult> {
            files
                .par_iter()
                .map(|path| {
                    let outcome = std::fs::read_to_string(path)
                        .map_err(|e| ExtractError::FileRead {
                            path: path.clone(),
                            source: e,
                        })
                        .and_then(|source| extract_source(path, &source, None, Some(deadline)));
                    FileResult {
                        path: path.clone(),
                        outcome,
                    }
                })
                .collect()
        };

        let results = match pool {
            Ok(pool) => pool.install(extract_all),
            Err(_) => extract_all(),
        };

        let mut stats = WorkspaceStats {
            files_discovered: files.len(),
            ..Default::default()
        };
        for result in &results {
            match &result.outcome {
                Ok(extraction) => {
                    stats.files_extracted += 1;
                    stats.symbols += extraction.symbols.len();
                    stats.relationships += extraction.relationships.len();
                    stats.types += extraction.types.len();
                    if extraction.truncated {
                        stats.files_truncated += 1;
                    }
                }
                Err(_) => stats.files_failed += 1,
            }
        }

        (results, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn settings_enabling(langs: &[&str]) -> Arc<Settings> {
        let mut settings = Settings::default();
        for (key, cfg) in settings.languages.iter_mut() {
            cfg.enabled = langs.contains(&key.as_str());
        }
        Arc::new(settings)
    }

    #[test]
    fn test_discover_filters_by_language_and_gitignore() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("main.rs"), "fn main() {}").unwrap();
        fs::write(root.join("lib.py"), "def f(): pass").unwrap();
        fs::write(root.join(".gitignore"), "ignored.rs\n").unwrap();
        fs::write(root.join("ignored.rs"), "fn ignored() {}").unwrap();

        let walker = WorkspaceWalker::new(settings_enabling(&["rust"]));
        let files = walker.discover(root);

        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("main.rs"));
    }

    #[test]
    fn test_discover_excludes_tests_when_configured() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("tests")).unwrap();
        fs::write(root.join("tests/it.rs"), "fn it_works() {}").unwrap();
        fs::write(root.join("main.rs"), "fn main() {}").unwrap();

        let mut settings = Settings::default();
        settings.indexing.include_tests = false;
        let walker = WorkspaceWalker::new(Arc::new(settings));

        let files = walker.discover(root);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("main.rs"));
    }

    #[test]
    fn test_extract_workspace_aggregates_stats() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("a.rs"), "pub fn a() {}").unwrap();
        fs::write(root.join("b.rs"), "struct B; impl B { fn m(&self) {} }").unwrap();

        let walker = WorkspaceWalker::new(Arc::new(Settings::default()));
        let (results, stats) = walker.extract_workspace(root);

        assert_eq!(results.len(), 2);
        assert_eq!(stats.files_discovered, 2);
        assert_eq!(stats.files_extracted, 2);
        assert_eq!(stats.files_failed, 0);
        assert!(stats.symbols >= 3);
    }
}
