//! Error taxonomy and reporting for the Spice compiler.
//!
//! Every diagnostic kind named in the error-handling design (lexing,
//! parsing, symbol resolution, overload resolution, type checking,
//! interface conformance, final-use checking, import resolution, and
//! transformation) is its own struct carrying a message, a source position
//! and a `SourceCode` snippet. A pass that finds more than one problem in a
//! single traversal reports them together via [`CompileError::Multiple`]
//! rather than failing on the first one.

use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term::{self, termcolor::{ColorChoice, StandardStream}};
use libspice_macros::SpiceError;
use libspice_macros_core::{traits::SpiceErrorTrait, SourceCode};

use crate::file::SourceFile;

/// File extension used for Spice source files.
pub static SPICE_LANG_EXT: &str = "spc";

#[derive(Clone, Debug, thiserror::Error, SpiceError)]
#[error("{message}")]
#[diagnostic(code("spice::error::lex"))]
pub struct LexError {
    pub message: String,
    #[label("{message}")]
    pub position: Range<usize>,
    #[source_code]
    pub code: SourceCode,
}

#[derive(Clone, Debug, thiserror::Error, SpiceError)]
#[error("{message}")]
#[diagnostic(code("spice::error::parse"))]
pub struct ParseError {
    pub message: String,
    #[label("{message}")]
    pub position: Range<usize>,
    #[source_code]
    pub code: SourceCode,
    /// A small window of token lexemes around the failure, for context.
    #[help]
    pub context: String,
}

#[derive(Clone, Debug, thiserror::Error, SpiceError)]
#[error("{message}")]
#[diagnostic(code("spice::error::symbol"))]
pub struct SymbolError {
    pub message: String,
    #[label("here")]
    pub position: Range<usize>,
    #[source_code]
    pub code: SourceCode,
}

#[derive(Clone, Debug, thiserror::Error, SpiceError)]
#[error("{message}")]
#[diagnostic(code("spice::error::overload"), help("overload signatures must differ in at least one parameter type"))]
pub struct OverloadError {
    pub message: String,
    #[label("duplicate overload here")]
    pub position: Range<usize>,
    #[source_code]
    pub code: SourceCode,
}

#[derive(Clone, Debug, thiserror::Error, SpiceError)]
#[error("{message}")]
#[diagnostic(code("spice::error::type"))]
pub struct TypeCheckError {
    pub message: String,
    #[label("here")]
    pub position: Range<usize>,
    #[source_code]
    pub code: SourceCode,
}

#[derive(Clone, Debug, thiserror::Error, SpiceError)]
#[error("{message}")]
#[diagnostic(code("spice::error::interface"))]
pub struct InterfaceError {
    pub message: String,
    #[label("here")]
    pub position: Range<usize>,
    #[source_code]
    pub code: SourceCode,
}

#[derive(Clone, Debug, thiserror::Error, SpiceError)]
#[error("{message}")]
#[diagnostic(code("spice::error::final"))]
pub struct FinalError {
    pub message: String,
    #[label("here")]
    pub position: Range<usize>,
    #[source_code]
    pub code: SourceCode,
}

#[derive(Clone, Debug, thiserror::Error, SpiceError)]
#[error("{message}")]
#[diagnostic(code("spice::error::import"))]
pub struct SpiceImportError {
    pub message: String,
    #[label("here")]
    pub position: Range<usize>,
    #[source_code]
    pub code: SourceCode,
}

#[derive(Clone, Debug, thiserror::Error, SpiceError)]
#[error("{message}")]
#[diagnostic(code("spice::error::transform"), help("this indicates an earlier pass left the AST in an inconsistent state"))]
pub struct TransformError {
    pub message: String,
    #[label("here")]
    pub position: Range<usize>,
    #[source_code]
    pub code: SourceCode,
}

#[derive(Clone, Debug, thiserror::Error, SpiceError)]
#[error("{} error(s) detected", .errors.len())]
pub struct ErrorCollection {
    #[errors]
    pub errors: Vec<CompileError>,
}

/// The origin pass of a diagnostic, so a driver can decide whether later
/// passes should run (they never do once a pass reports an error, but the
/// kind still tells a caller which stage to look at).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pass {
    Lex,
    Parse,
    SymbolTable,
    Overload,
    TypeCheck,
    Interface,
    Final,
    Import,
    Transform,
}

#[derive(Clone, Debug, thiserror::Error, SpiceError)]
pub enum CompileError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Lex(Box<LexError>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(Box<ParseError>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Symbol(Box<SymbolError>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Overload(Box<OverloadError>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Type(Box<TypeCheckError>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Interface(Box<InterfaceError>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Final(Box<FinalError>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Import(Box<SpiceImportError>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Transform(Box<TransformError>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Multiple(#[from] Box<ErrorCollection>),
}

impl CompileError {
    pub fn lex(message: impl Into<String>, position: Range<usize>, file: &SourceFile) -> Self {
        CompileError::Lex(Box::new(LexError { message: message.into(), position, code: file.into() }))
    }

    pub fn parse(message: impl Into<String>, position: Range<usize>, file: &SourceFile, context: String) -> Self {
        CompileError::Parse(Box::new(ParseError { message: message.into(), position, code: file.into(), context }))
    }

    pub fn symbol(message: impl Into<String>, position: Range<usize>, file: &SourceFile) -> Self {
        CompileError::Symbol(Box::new(SymbolError { message: message.into(), position, code: file.into() }))
    }

    pub fn overload(message: impl Into<String>, position: Range<usize>, file: &SourceFile) -> Self {
        CompileError::Overload(Box::new(OverloadError { message: message.into(), position, code: file.into() }))
    }

    pub fn type_check(message: impl Into<String>, position: Range<usize>, file: &SourceFile) -> Self {
        CompileError::Type(Box::new(TypeCheckError { message: message.into(), position, code: file.into() }))
    }

    pub fn interface(message: impl Into<String>, position: Range<usize>, file: &SourceFile) -> Self {
        CompileError::Interface(Box::new(InterfaceError { message: message.into(), position, code: file.into() }))
    }

    pub fn final_check(message: impl Into<String>, position: Range<usize>, file: &SourceFile) -> Self {
        CompileError::Final(Box::new(FinalError { message: message.into(), position, code: file.into() }))
    }

    pub fn import(message: impl Into<String>, position: Range<usize>, file: &SourceFile) -> Self {
        CompileError::Import(Box::new(SpiceImportError { message: message.into(), position, code: file.into() }))
    }

    pub fn transform(message: impl Into<String>, position: Range<usize>, file: &SourceFile) -> Self {
        CompileError::Transform(Box::new(TransformError { message: message.into(), position, code: file.into() }))
    }

    /// Groups several diagnostics from one pass's single traversal into one
    /// all-or-nothing result.
    pub fn multiple(errors: Vec<CompileError>) -> Self {
        CompileError::Multiple(Box::new(ErrorCollection { errors }))
    }
}

/// Renders a [`SpiceError`] (and any nested errors/references) as rich
/// terminal diagnostics via `codespan-reporting`.
pub struct CodeSpanReportGenerator;

impl CodeSpanReportGenerator {
    fn inner_generate(files: &mut SimpleFiles<String, String>, diagnostics: &mut Vec<Diagnostic<usize>>, error: &dyn SpiceErrorTrait) {
        let mut diagnostic: Diagnostic<usize> = Diagnostic::error().with_message(error.to_string());

        if let Some(source_code) = error.source_code() {
            let file_id = files.add(format!("{}.{}", source_code.name, SPICE_LANG_EXT), source_code.source);

            if let Some(labels) = error.labels() {
                let labels = labels
                    .into_iter()
                    .map(|label| Label::primary(file_id, label.position).with_message(label.label))
                    .collect::<Vec<_>>();
                diagnostic = diagnostic.with_labels(labels);
            }
        }

        if let Some(help) = error.help() {
            diagnostic = diagnostic.with_note(help.to_string());
        }

        diagnostics.push(diagnostic);

        if let Some(references) = error.references() {
            for reference in references {
                Self::inner_generate(files, diagnostics, *reference);
            }
        }

        if let Some(errors) = error.errors() {
            for inner in errors {
                Self::inner_generate(files, diagnostics, inner);
            }
        }
    }

    /// Emits `error` (recursively flattening any nested `Multiple`) to stderr.
    pub fn generate(error: &CompileError) {
        let mut diagnostics = Vec::new();
        let mut files = SimpleFiles::new();

        Self::inner_generate(&mut files, &mut diagnostics, error);

        let writer = StandardStream::stderr(ColorChoice::Auto);
        let config = term::Config::default();

        for diagnostic in diagnostics {
            let _ = term::emit(&mut writer.lock(), &config, &files, &diagnostic);
        }
    }
}
