//! Language detection and enumeration
//!
//! This module provides language detection from file extensions
//! and language-specific configuration.

use serde::{Deserialize, Serialize};

/// Supported programming languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Rust,
    Java,
    Kotlin,
    JavaScript,
    TypeScript,
    Ruby,
    Bash,
}

impl Language {
    /// Detect language from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "rs" => Some(Language::Rust),
            "java" => Some(Language::Java),
            "kt" | "kts" => Some(Language::Kotlin),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "ts" | "tsx" | "mts" | "cts" => Some(Language::TypeScript),
            "rb" | "rake" | "gemspec" => Some(Language::Ruby),
            "sh" | "bash" | "zsh" | "bats" => Some(Language::Bash),
            _ => None,
        }
    }

    /// Detect language from file path. Falls back to well-known
    /// extension-less filenames (Ruby's `Gemfile`/`Rakefile` convention).
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        if let Some(lang) = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
        {
            return Some(lang);
        }

        match path.file_name().and_then(|n| n.to_str()) {
            Some("Gemfile") | Some("Rakefile") | Some("Vagrantfile") => Some(Language::Ruby),
            _ => None,
        }
    }

    /// Detect language from a shebang line, for extension-less scripts where
    /// path-based detection gave nothing.
    pub fn from_shebang(source: &str) -> Option<Self> {
        let first_line = source.lines().next()?;
        if !first_line.starts_with("#!") {
            return None;
        }
        if first_line.contains("bash") || first_line.contains("/sh") || first_line.contains("zsh")
        {
            Some(Language::Bash)
        } else if first_line.contains("ruby") {
            Some(Language::Ruby)
        } else {
            None
        }
    }

    /// Get default file extensions for this language
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Rust => &["rs"],
            Language::Java => &["java"],
            Language::Kotlin => &["kt", "kts"],
            Language::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Language::TypeScript => &["ts", "tsx", "mts", "cts"],
            Language::Ruby => &["rb", "rake", "gemspec"],
            Language::Bash => &["sh", "bash", "zsh", "bats"],
        }
    }

    /// Get the configuration key for this language
    pub fn config_key(&self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Ruby => "ruby",
            Language::Bash => "bash",
        }
    }

    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Language::Rust => "Rust",
            Language::Java => "Java",
            Language::Kotlin => "Kotlin",
            Language::JavaScript => "JavaScript",
            Language::TypeScript => "TypeScript",
            Language::Ruby => "Ruby",
            Language::Bash => "Bash",
        }
    }

    /// All supported languages, in a stable order.
    pub fn all() -> &'static [Language] {
        &[
            Language::Rust,
            Language::Java,
            Language::Kotlin,
            Language::JavaScript,
            Language::TypeScript,
            Language::Ruby,
            Language::Bash,
        ]
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_language_from_extension() {
        assert_eq!(Language::from_extension("rs"), Some(Language::Rust));
        assert_eq!(Language::from_extension("RS"), Some(Language::Rust));
        assert_eq!(Language::from_extension("java"), Some(Language::Java));
        assert_eq!(Language::from_extension("kt"), Some(Language::Kotlin));
        assert_eq!(Language::from_extension("js"), Some(Language::JavaScript));
        assert_eq!(Language::from_extension("jsx"), Some(Language::JavaScript));
        assert_eq!(Language::from_extension("ts"), Some(Language::TypeScript));
        assert_eq!(Language::from_extension("tsx"), Some(Language::TypeScript));
        assert_eq!(Language::from_extension("rb"), Some(Language::Ruby));
        assert_eq!(Language::from_extension("sh"), Some(Language::Bash));
        assert_eq!(Language::from_extension("txt"), None);
    }

    #[test]
    fn test_language_from_path() {
        assert_eq!(
            Language::from_path(Path::new("main.rs")),
            Some(Language::Rust)
        );
        assert_eq!(
            Language::from_path(Path::new("Gemfile")),
            Some(Language::Ruby)
        );
        assert_eq!(Language::from_path(Path::new("README.md")), None);
    }

    #[test]
    fn test_shebang_detection() {
        assert_eq!(
            Language::from_shebang("#!/usr/bin/env bash\necho hi"),
            Some(Language::Bash)
        );
        assert_eq!(
            Language::from_shebang("#!/usr/bin/env ruby\nputs 1"),
            Some(Language::Ruby)
        );
        assert_eq!(Language::from_shebang("echo hi"), None);
    }

    #[test]
    fn test_extensions() {
        assert!(Language::Rust.extensions().contains(&"rs"));
        assert!(Language::Ruby.extensions().contains(&"rb"));
        assert!(Language::Bash.extensions().contains(&"sh"));
    }
}
