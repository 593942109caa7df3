//! Source file representation for the Spice compiler.
//!
//! A [`SourceFile`] pairs a module path with the source text it was read
//! from. It is cheap to clone (the text is behind an `Arc`) so every token,
//! AST node and diagnostic can carry its own handle back to the file it came
//! from without re-reading the text.

use std::sync::Arc;

use libspice_macros_core::SourceCode;

/// A single `.spc` source file, identified by its dotted module path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceFile {
    /// Dotted module path components, e.g. `["app", "models"]` for `app.models`.
    pub path: Arc<Vec<String>>,
    /// The full source text.
    pub code: Arc<String>,
}

impl SourceFile {
    pub fn new(path: Vec<String>, code: String) -> Self {
        Self {
            path: Arc::new(path),
            code: Arc::new(code),
        }
    }

    /// In-memory source with a synthetic path, for language-server-style use.
    pub fn in_memory(code: String) -> Self {
        Self::new(vec!["<memory>".to_string()], code)
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn display_name(&self) -> String {
        self.path.join(".")
    }
}

impl std::fmt::Display for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl From<SourceFile> for SourceCode {
    fn from(file: SourceFile) -> Self {
        SourceCode {
            source: file.code.to_string(),
            name: file.display_name(),
        }
    }
}

impl From<&SourceFile> for SourceCode {
    fn from(file: &SourceFile) -> Self {
        SourceCode {
            source: file.code.to_string(),
            name: file.display_name(),
        }
    }
}
