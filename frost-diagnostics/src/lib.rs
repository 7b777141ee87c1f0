// Structured error system for the Frost compiler
// Provides Rust-quality error messages with spans, colors, and suggestions

use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Source code location (line, column, file)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub length: usize, // Length of the highlighted span
}

impl Span {
    pub fn new(file: String, line: usize, column: usize, length: usize) -> Self {
        Self {
            file,
            line,
            column,
            length,
        }
    }

    pub fn from_file_and_range(file: &str, source: &str, range: std::ops::Range<usize>) -> Self {
        let before = &source[..range.start.min(source.len())];
        let line = before.chars().filter(|&c| c == '\n').count() + 1;
        let column = before
            .rfind('\n')
            .map_or(before.len() + 1, |pos| before.len() - pos);
        let length = range.end.saturating_sub(range.start).max(1);

        Self {
            file: file.to_string(),
            line,
            column,
            length,
        }
    }

    pub fn unknown() -> Self {
        Self {
            file: "<unknown>".to_string(),
            line: 0,
            column: 0,
            length: 0,
        }
    }

    /// Create a file-level span with no position information
    pub fn from_path(path: &Path) -> Self {
        Self {
            file: path.display().to_string(),
            line: 0,
            column: 0,
            length: 0,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorLevel {
    Error,
    Warning,
    Info,
    Note,
    Help,
}

impl fmt::Display for ErrorLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorLevel::Error => write!(f, "{}", "error".red().bold()),
            ErrorLevel::Warning => write!(f, "{}", "warning".yellow().bold()),
            ErrorLevel::Info => write!(f, "{}", "info".blue().bold()),
            ErrorLevel::Note => write!(f, "{}", "note".cyan().bold()),
            ErrorLevel::Help => write!(f, "{}", "help".green().bold()),
        }
    }
}

/// Diagnostic categories. Fatal categories abort transformation of the
/// current declaration; the driver continues with the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Category {
    #[error("syntax error")]
    Syntax,
    #[error("type error")]
    Type,
    #[error("name error")]
    Variable,
    #[error("import error")]
    Import,
    #[error("attribute error")]
    Attribute,
    #[error("io error")]
    Io,
    #[error("compiler bug")]
    CompilerBug,
    #[error("llvm internal error")]
    LlvmInternal,
}

impl Category {
    pub fn code(&self) -> &'static str {
        match self {
            Category::Syntax => "syntax",
            Category::Type => "type",
            Category::Variable => "variable",
            Category::Import => "import",
            Category::Attribute => "attribute",
            Category::Io => "io",
            Category::CompilerBug => "compiler-bug",
            Category::LlvmInternal => "llvm-internal",
        }
    }

    /// Whether a diagnostic of this category stops the current declaration.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Category::Io)
    }
}

/// Structured diagnostic message
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub level: ErrorLevel,
    pub category: Category,
    pub message: String,
    pub span: Span,
    /// Short label rendered under the primary span
    pub info: Option<String>,
    pub notes: Vec<String>,
    pub help: Option<String>,
    pub suggestion: Option<Suggestion>,
}

/// Code suggestion with replacement
#[derive(Debug, Clone)]
pub struct Suggestion {
    pub message: String,
    pub replacement: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(level: ErrorLevel, category: Category, message: String, span: Span) -> Self {
        Self {
            level,
            category,
            message,
            span,
            info: None,
            notes: Vec::new(),
            help: None,
            suggestion: None,
        }
    }

    pub fn error(category: Category, message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorLevel::Error, category, message.into(), span)
    }

    pub fn warning(category: Category, message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorLevel::Warning, category, message.into(), span)
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_suggestion(mut self, message: String, replacement: String, span: Span) -> Self {
        self.suggestion = Some(Suggestion {
            message,
            replacement,
            span,
        });
        self
    }

    /// Format diagnostic in Rust-style, with the source snippet
    pub fn format(&self, source_code: &str) -> String {
        let mut output = String::new();

        // Header: error[type]: message
        output.push_str(&format!(
            "{}[{}]: {}\n",
            self.level,
            self.category.code(),
            self.message.bold()
        ));

        // Location: --> file.fr:12:15
        output.push_str(&format!(
            " {} {}:{}:{}\n",
            "-->".cyan().bold(),
            self.span.file,
            self.span.line,
            self.span.column
        ));

        if let Some(snippet) = self.source_snippet(source_code) {
            output.push_str(&snippet);
        }

        if let Some(info) = &self.info {
            output.push_str(&format!(" {} {}\n", "=".cyan().bold(), info.cyan()));
        }

        for note in &self.notes {
            output.push_str(&format!(" {} {}\n", "note:".cyan().bold(), note));
        }

        if let Some(help) = &self.help {
            output.push_str(&format!(" {} {}\n", "help:".green().bold(), help));
        }

        if let Some(suggestion) = &self.suggestion {
            output.push_str(&format!(
                " {} {}: `{}`\n",
                "help:".green().bold(),
                suggestion.message,
                suggestion.replacement
            ));
        }

        output
    }

    /// Format diagnostic without source code (for Display trait)
    fn format_simple(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{}[{}]: {}\n",
            self.level,
            self.category.code(),
            self.message.bold()
        ));

        output.push_str(&format!(
            " {} {}:{}:{}\n",
            "-->".cyan().bold(),
            self.span.file,
            self.span.line,
            self.span.column
        ));

        if let Some(info) = &self.info {
            output.push_str(&format!(" {} {}\n", "=".cyan().bold(), info.cyan()));
        }

        for note in &self.notes {
            output.push_str(&format!(" {} {}\n", "note:".cyan().bold(), note));
        }

        if let Some(help) = &self.help {
            output.push_str(&format!(" {} {}\n", "help:".green().bold(), help));
        }

        output
    }

    /// Extract source code snippet with error highlight
    fn source_snippet(&self, source_code: &str) -> Option<String> {
        let lines: Vec<&str> = source_code.lines().collect();

        if self.span.line == 0 || self.span.line > lines.len() {
            return None;
        }

        let line = lines.get(self.span.line - 1)?;

        let mut snippet = String::new();
        let line_num_width = self.span.line.to_string().len().max(2);

        snippet.push_str(&format!(" {}\n", " ".repeat(line_num_width + 1).cyan()));
        snippet.push_str(&format!(
            " {} {} {}\n",
            format!("{:>width$}", self.span.line, width = line_num_width)
                .cyan()
                .bold(),
            "|".cyan().bold(),
            line
        ));

        // Error indicator (^^^)
        let padding = " ".repeat(line_num_width + 3 + self.span.column.saturating_sub(1));
        let underline = "^".repeat(self.span.length.max(1));
        snippet.push_str(&format!(
            " {} {}{}\n",
            " ".repeat(line_num_width + 1).cyan(),
            padding,
            underline.red().bold()
        ));

        Some(snippet)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

/// Default number of errors after which the unit gives up.
pub const DEFAULT_ERROR_BUDGET: usize = 20;

/// Diagnostic collection and reporting engine
#[derive(Debug)]
pub struct DiagnosticEngine {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
    error_budget: usize,
}

impl Default for DiagnosticEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticEngine {
    pub fn new() -> Self {
        Self::with_budget(DEFAULT_ERROR_BUDGET)
    }

    /// An engine that gives up after `budget` errors.
    pub fn with_budget(budget: usize) -> Self {
        Self {
            diagnostics: Vec::new(),
            error_count: 0,
            warning_count: 0,
            error_budget: budget,
        }
    }

    pub fn emit(&mut self, diagnostic: Diagnostic) {
        match diagnostic.level {
            ErrorLevel::Error => self.error_count += 1,
            ErrorLevel::Warning => self.warning_count += 1,
            _ => {}
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// The unit should stop transforming further declarations.
    pub fn over_budget(&self) -> bool {
        self.error_count >= self.error_budget
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Print all diagnostics to stderr
    pub fn print_all(&self, source_code: &str) {
        for diag in &self.diagnostics {
            eprintln!("{}", diag.format(source_code));
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        if self.error_count > 0 {
            eprintln!(
                "\n{}: {} error{} emitted",
                "error".red().bold(),
                self.error_count,
                if self.error_count == 1 { "" } else { "s" }
            );
        }

        if self.warning_count > 0 {
            eprintln!(
                "{}: {} warning{} emitted",
                "warning".yellow().bold(),
                self.warning_count,
                if self.warning_count == 1 { "" } else { "s" }
            );
        }
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
        self.error_count = 0;
        self.warning_count = 0;
    }
}

/// Helper constructors for common diagnostic patterns
impl DiagnosticEngine {
    pub fn type_mismatch(&mut self, expected: &str, found: &str, span: Span) {
        self.emit(
            Diagnostic::error(Category::Type, "mismatched types", span)
                .with_info(format!("expected `{}`, found `{}`", found, expected))
                .with_note(format!("expected `{}`, found `{}`", expected, found)),
        );
    }

    pub fn undefined_name(&mut self, name: &str, span: Span, candidates: &[String]) {
        let mut diag = Diagnostic::error(
            Category::Variable,
            format!("cannot find `{}` in this scope", name),
            span,
        )
        .with_info("this name is not defined");

        let similar = fuzzy::find_similar_names(name, candidates, 0.7, 3);
        if !similar.is_empty() {
            diag = diag.with_help(format!("did you mean `{}`?", similar.join("`, `")));
        }

        self.emit(diag);
    }
}

/// Fuzzy matching utilities for "did you mean?" suggestions
pub mod fuzzy {
    use strsim::jaro_winkler;

    /// Find similar names using fuzzy matching (Jaro-Winkler distance)
    /// Returns up to `max_suggestions` names with similarity > threshold
    pub fn find_similar_names(
        target: &str,
        candidates: &[String],
        threshold: f64,
        max_suggestions: usize,
    ) -> Vec<String> {
        let mut scored: Vec<(String, f64)> = candidates
            .iter()
            .map(|candidate| {
                let similarity = jaro_winkler(target, candidate);
                (candidate.clone(), similarity)
            })
            .filter(|(_, score)| *score > threshold)
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .into_iter()
            .take(max_suggestions)
            .map(|(name, _)| name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_format() {
        let source = "func main() i32 {\n    let x = add(42, \"hello\");\n    return 0;\n}";

        let span = Span::new("test.fr".to_string(), 2, 21, 7);
        let diag = Diagnostic::error(Category::Type, "mismatched types", span.clone())
            .with_note("expected `i32`, found `String`")
            .with_help("try converting the string to an integer");

        let formatted = diag.format(source);

        assert!(formatted.contains("error[type]"));
        assert!(formatted.contains("mismatched types"));
        assert!(formatted.contains("test.fr:2:21"));
    }

    #[test]
    fn test_error_budget() {
        let mut engine = DiagnosticEngine::with_budget(2);
        assert!(!engine.over_budget());
        engine.emit(Diagnostic::error(
            Category::Type,
            "first",
            Span::unknown(),
        ));
        assert!(!engine.over_budget());
        engine.emit(Diagnostic::error(
            Category::Variable,
            "second",
            Span::unknown(),
        ));
        assert!(engine.over_budget());
        // Warnings never count against the budget
        engine.emit(Diagnostic::warning(
            Category::Type,
            "a warning",
            Span::unknown(),
        ));
        assert_eq!(engine.error_count(), 2);
        assert_eq!(engine.warning_count(), 1);
    }

    #[test]
    fn test_span_from_range() {
        let source = "line one\nline two\nline three";
        let span = Span::from_file_and_range("x.fr", source, 9..13);
        assert_eq!(span.line, 2);
        assert_eq!(span.column, 1);
        assert_eq!(span.length, 4);
    }

    #[test]
    fn test_fuzzy_suggestions() {
        let candidates = vec![
            "length".to_string(),
            "letters".to_string(),
            "size".to_string(),
        ];
        let found = fuzzy::find_similar_names("lenght", &candidates, 0.7, 3);
        assert_eq!(found.first().map(String::as_str), Some("length"));
    }
}
