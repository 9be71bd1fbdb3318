//! Diagnostic system for errors and warnings
//!
//! Lexer, parser and compiler problems all flow through the unified
//! Diagnostic type so every host formats them the same way.

use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic schema version
pub const DIAG_VERSION: u32 = 1;

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    /// Fatal error that prevents execution
    Error,
    /// Warning that doesn't prevent execution
    Warning,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Error => write!(f, "error"),
            DiagnosticLevel::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message (error or warning)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Diagnostic schema version
    pub diag_version: u32,
    /// Severity level
    pub level: DiagnosticLevel,
    /// Error code (e.g., "MK0002")
    pub code: String,
    /// Main diagnostic message
    pub message: String,
    /// File path
    pub file: String,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
    /// Length of error span
    pub length: usize,
    /// Source line string
    pub snippet: String,
    /// Short label for caret range
    pub label: String,
    /// Additional notes (optional)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
    /// Suggested fix (optional)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub help: Option<String>,
    /// Raw source span the line/column were derived from
    #[serde(skip)]
    pub span: Span,
}

impl Diagnostic {
    fn new(level: DiagnosticLevel, code: impl Into<String>, message: impl Into<String>, span: Span) -> Self {
        Self {
            diag_version: DIAG_VERSION,
            level,
            code: code.into(),
            message: message.into(),
            file: "<input>".to_string(),
            line: 1,
            column: span.start + 1,
            length: span.len(),
            snippet: String::new(),
            label: String::new(),
            notes: Vec::new(),
            help: None,
            span,
        }
    }

    /// Create a new error diagnostic with code
    pub fn error_with_code(
        code: impl Into<String>,
        message: impl Into<String>,
        span: Span,
    ) -> Self {
        Self::new(DiagnosticLevel::Error, code, message, span)
    }

    /// Create a new warning diagnostic with code
    pub fn warning_with_code(
        code: impl Into<String>,
        message: impl Into<String>,
        span: Span,
    ) -> Self {
        Self::new(DiagnosticLevel::Warning, code, message, span)
    }

    /// Create a new error diagnostic (uses generic error code)
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self::error_with_code(error_codes::GENERIC_ERROR, message, span)
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }

    /// Set the file path
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    /// Set the line number
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    /// Set the snippet (source line)
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = snippet.into();
        self
    }

    /// Set the label (caret description)
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Add a note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Add a help message
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Resolve line, column and snippet from the span against `source`
    pub fn with_source(mut self, source: &str) -> Self {
        let mut line = 1;
        let mut line_start = 0;
        for (i, c) in source.chars().enumerate() {
            if i >= self.span.start {
                break;
            }
            if c == '\n' {
                line += 1;
                line_start = i + 1;
            }
        }

        self.line = line;
        self.column = self.span.start.saturating_sub(line_start) + 1;
        self.snippet = source.lines().nth(line - 1).unwrap_or("").to_string();
        self
    }

    /// Format as human-readable string
    pub fn to_human_string(&self) -> String {
        let mut output = String::new();

        // error[MK0002]: undefined variable x
        output.push_str(&format!(
            "{}[{}]: {}\n",
            self.level, self.code, self.message
        ));
        output.push_str(&format!(
            "  --> {}:{}:{}\n",
            self.file, self.line, self.column
        ));

        if !self.snippet.is_empty() {
            output.push_str("   |\n");
            output.push_str(&format!("{:>2} | {}\n", self.line, self.snippet));

            if self.length > 0 {
                let padding = " ".repeat(self.column.saturating_sub(1));
                let carets = "^".repeat(self.length);
                output.push_str(&format!("   | {}{}", padding, carets));

                if !self.label.is_empty() {
                    output.push_str(&format!(" {}", self.label));
                }
                output.push('\n');
            }
        }

        for note in &self.notes {
            output.push_str(&format!("   = note: {}\n", note));
        }

        if let Some(help) = &self.help {
            output.push_str(&format!("   = help: {}\n", help));
        }

        output
    }

    /// Format as JSON string
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Format as compact JSON string
    pub fn to_json_compact(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.line, self.column, self.level, self.message
        )
    }
}

/// Error code registry
pub mod error_codes {
    // MK0xxx - Compile and runtime semantic errors
    pub const TYPE_MISMATCH: &str = "MK0001";
    pub const UNDEFINED_VARIABLE: &str = "MK0002";
    pub const ASSIGN_TO_BUILTIN: &str = "MK0003";
    pub const RETURN_OUTSIDE_FUNCTION: &str = "MK0004";
    pub const DIVIDE_BY_ZERO: &str = "MK0005";
    pub const CAPTURED_LOCAL: &str = "MK0006";
    pub const LIMIT_EXCEEDED: &str = "MK0007";

    // MK1xxx - Syntax errors
    pub const SYNTAX_ERROR: &str = "MK1000";
    pub const UNEXPECTED_CHARACTER: &str = "MK1001";
    pub const UNTERMINATED_STRING: &str = "MK1002";
    pub const INVALID_ESCAPE: &str = "MK1003";
    pub const INVALID_NUMBER: &str = "MK1004";

    // MK2xxx - Warnings
    pub const SHADOWS_BUILTIN: &str = "MK2001";

    // MK3xxx - Call and index errors
    pub const ARITY_MISMATCH: &str = "MK3005";
    pub const NOT_CALLABLE: &str = "MK3006";
    pub const NOT_INDEXABLE: &str = "MK3011";

    // MK9xxx - VM resource and internal errors
    pub const FRAME_OVERFLOW: &str = "MK9990";
    pub const VM_STATE: &str = "MK9991";
    pub const BAD_OPERAND: &str = "MK9995";
    pub const STACK_OVERFLOW: &str = "MK9996";
    pub const STACK_UNDERFLOW: &str = "MK9997";
    pub const UNKNOWN_OPCODE: &str = "MK9998";
    pub const GENERIC_ERROR: &str = "MK9999";
}
