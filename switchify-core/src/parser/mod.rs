//! TreeSitter-based Java front end
//!
//! Parses Java source with tree-sitter-java, lowers the concrete syntax
//! tree into the typed [`crate::tree`] model and runs the resolver that
//! backs [`crate::semantics::SemanticModel`].

pub mod lower;
pub mod resolve;

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::tree::CompilationUnit;
pub use resolve::SourceModel;

/// Supported languages and their extensions
pub static SUPPORTED_LANGUAGES: &[(&str, &[&str])] = &[("java", &["java"])];

/// A parsed, resolved Java file.
#[derive(Debug)]
pub struct ParsedFile {
    pub unit: CompilationUnit,
    pub model: SourceModel,
    pub source: String,
    /// File path or "<stdin>"
    pub file_path: String,
    /// tree-sitter reported ERROR or MISSING nodes somewhere in the file
    pub has_errors: bool,
}

/// Errors that can occur during parsing
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse: {0}")]
    Parse(String),
    #[error("TreeSitter error: {0}")]
    TreeSitter(String),
}

/// Detect language from file path extension
pub fn detect_language(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("");
    match ext.to_lowercase().as_str() {
        "java" => "java",
        _ => "unknown",
    }
}

/// Get TreeSitter language for a language name
fn get_tree_sitter_language(lang: &str) -> Result<tree_sitter::Language, ParseError> {
    match lang {
        "java" => Ok(tree_sitter_java::LANGUAGE.into()),
        _ => Err(ParseError::UnsupportedLanguage(lang.to_string())),
    }
}

/// Tree-sitter ABI version of the bundled Java grammar
pub fn java_abi_version() -> usize {
    tree_sitter::Language::from(tree_sitter_java::LANGUAGE).abi_version()
}

/// Parse a file from disk
pub fn parse_file(path: &Path) -> Result<ParsedFile, ParseError> {
    let lang = detect_language(path.to_str().unwrap_or(""));
    if lang != "java" {
        return Err(ParseError::UnsupportedLanguage(path.display().to_string()));
    }
    let source = fs::read_to_string(path)?;
    parse_string(source, path.to_string_lossy().to_string())
}

/// Parse Java source held in memory
pub fn parse_string(source: String, file_path: String) -> Result<ParsedFile, ParseError> {
    let language = get_tree_sitter_language("java")?;

    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| ParseError::TreeSitter(e.to_string()))?;

    let tree = parser
        .parse(&source, None)
        .ok_or_else(|| ParseError::Parse("Failed to parse source".to_string()))?;

    let root = tree.root_node();
    let has_errors = root.has_error();
    if has_errors {
        tracing::warn!(file = %file_path, "source contains syntax errors; affected regions are skipped");
    }

    let unit = lower::lower_program(root, &source);
    let model = SourceModel::build(&unit, &source);

    Ok(ParsedFile {
        unit,
        model,
        source,
        file_path,
        has_errors,
    })
}
