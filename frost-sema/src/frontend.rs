// The upstream lexer/parser seam. The import driver only ever talks to
// this trait, so tests can feed pre-built ASTs without touching disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use frost_ast as ast;
use frost_diagnostics::{Category, Diagnostic, Span};

pub trait Frontend {
    /// Whether a candidate module file exists.
    fn exists(&self, path: &Path) -> bool;

    /// Lex and parse the module at `path`.
    fn load(&self, path: &Path) -> Result<ast::File, Diagnostic>;
}

/// In-memory frontend: path -> pre-parsed AST. Used by tests and by
/// embedded-module tooling.
#[derive(Debug, Default)]
pub struct MapFrontend {
    files: HashMap<PathBuf, ast::File>,
}

impl MapFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, file: ast::File) {
        self.files.insert(path.into(), file);
    }
}

impl Frontend for MapFrontend {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn load(&self, path: &Path) -> Result<ast::File, Diagnostic> {
        self.files.get(path).cloned().ok_or_else(|| {
            Diagnostic::error(
                Category::Io,
                format!("failed to read module '{}'", path.display()),
                Span::from_path(path),
            )
        })
    }
}
