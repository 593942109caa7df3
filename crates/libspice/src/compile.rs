//! Driver glue: orchestrates the per-unit pass pipeline and multi-unit
//! dependency ordering.
//!
//! Everything the core needs from its environment arrives through
//! [`ModuleResolver`] and [`CompileOptions`]; file I/O, flag parsing, and
//! any native-toolchain invocation stay outside this crate. The binary
//! entry point only calls into the lex/parse/check/emit functions below.

use std::collections::HashSet;

use crate::ast::{Item, Module, Statement};
use crate::error::CompileError;
use crate::file::SourceFile;
use crate::overload::OverloadTable;
use crate::symbol_table::SymbolTable;
use crate::token::Token;
use crate::transform::{self, EmitMode, TransformOptions};
use crate::{final_checker, interface_checker, lexer, overload, parser, symbol_table, type_checker};

/// Selects the target dialect a unit is compiled to. `Exe` is equivalent to
/// `Pyx` at the core level — linking a standalone binary from the `pyx`
/// output is a driver-level post-process this crate never performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitTarget {
    Py,
    Pyx,
    Exe,
}

impl EmitTarget {
    fn mode(self) -> EmitMode {
        match self {
            EmitTarget::Py => EmitMode::Py,
            EmitTarget::Pyx | EmitTarget::Exe => EmitMode::Pyx,
        }
    }
}

/// Compiler flags supplied by the driver. The core never reads these
/// from argv or a config file itself.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub emit: EmitTarget,
    /// Run all semantic passes but stop short of the transformer.
    pub check: bool,
    pub verbose: bool,
    /// Downgrades final-checker failures to non-fatal without skipping the
    /// pass: it still runs, but its errors are logged instead of aborting.
    pub no_final_check: bool,
    /// Has the transformer wrap public top-level functions in a runtime
    /// type-check shim.
    pub runtime_checks: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self { emit: EmitTarget::Py, check: false, verbose: false, no_final_check: false, runtime_checks: false }
    }
}

/// What a [`ModuleResolver`] reports back for one module specifier.
pub enum ResolvedModule {
    /// A Spice source module: its text, ready to lex/parse.
    Source(String),
    /// An already-compiled (target-language or native) module; the core
    /// does not need to analyze it, only knows it exists.
    Native,
    Unresolved,
}

/// Pluggable import lookup the core consumes but never implements itself;
/// a real driver backs this with filesystem search-path lookup.
pub trait ModuleResolver {
    fn resolve(&self, module_path: &str) -> ResolvedModule;
}

/// A single compilation unit and everything accumulated about it through the
/// pipeline. All fields besides `path`/`source` start empty and are
/// filled in as [`compile_unit`] runs; the symbol table and overload table
/// are read-only once their producing pass returns.
pub struct CompilationUnit {
    pub path: Vec<String>,
    pub source: SourceFile,
    pub tokens: Vec<Token>,
    pub ast: Option<Module>,
    pub symbol_table: Option<SymbolTable>,
    pub overload_table: Option<OverloadTable>,
    pub spc_imports: Vec<String>,
    pub py_imports: Vec<String>,
}

impl CompilationUnit {
    pub fn new(path: Vec<String>, source: String) -> Self {
        let file = SourceFile::new(path.clone(), source);
        Self { path, source: file, tokens: Vec::new(), ast: None, symbol_table: None, overload_table: None, spc_imports: Vec::new(), py_imports: Vec::new() }
    }

    /// In-memory constructor for language-server-style callers with no
    /// backing file path.
    pub fn in_memory(source: String) -> Self {
        let file = SourceFile::in_memory(source);
        Self { path: file.path().to_vec(), source: file, tokens: Vec::new(), ast: None, symbol_table: None, overload_table: None, spc_imports: Vec::new(), py_imports: Vec::new() }
    }
}

/// Diagnostic emitted when a dependency unit failed and this one is skipped
/// without even attempting its own passes.
pub fn dependency_failed(dependency_path: &str, file: &SourceFile) -> CompileError {
    CompileError::import(format!("module '{dependency_path}' failed to compile; skipping dependents"), 0..0, file)
}

/// Runs the lex → parse → symbol-table → overload → type-check → interface
/// → final pipeline on one unit, short-circuiting at the first pass that
/// reports errors. Returns the populated unit; the AST is left in
/// place (possibly overload-decorated) whether or not later passes ran, so
/// a caller inspecting a failed unit still has whatever got built.
///
/// If `unit.ast` is already populated (as it is for a unit that
/// [`compile_graph`]'s parse phase walked for its imports), this reuses it
/// instead of re-lexing and re-parsing the same text — the walk phase and
/// this phase agree on parsing each unit exactly once.
pub fn analyze_unit(mut unit: CompilationUnit, options: &CompileOptions) -> (CompilationUnit, Result<(), CompileError>) {
    let already_parsed = unit.ast.is_some();
    let mut module = if let Some(module) = unit.ast.take() {
        module
    } else {
        let tokens = match lexer::tokenize(&unit.source) {
            Ok(tokens) => tokens,
            Err(error) => return (unit, Err(error)),
        };
        unit.tokens = tokens.clone();
        match parser::parse(tokens, &unit.source) {
            Ok(module) => module,
            Err(error) => return (unit, Err(error)),
        }
    };
    if !already_parsed {
        collect_imports(&module, &mut unit);
    }

    let table = match symbol_table::build(&module, &unit.source) {
        Ok(table) => table,
        Err(error) => {
            unit.ast = Some(module);
            return (unit, Err(error));
        }
    };

    let overloads = match overload::resolve(&mut module, &unit.source) {
        Ok(table) => table,
        Err(error) => {
            unit.ast = Some(module);
            unit.symbol_table = Some(table);
            return (unit, Err(error));
        }
    };

    if let Err(error) = type_checker::check(&module, &table, &unit.source) {
        unit.ast = Some(module);
        unit.symbol_table = Some(table);
        unit.overload_table = Some(overloads);
        return (unit, Err(error));
    }

    if let Err(error) = interface_checker::check(&module, &unit.source) {
        unit.ast = Some(module);
        unit.symbol_table = Some(table);
        unit.overload_table = Some(overloads);
        return (unit, Err(error));
    }

    let final_result = final_checker::check(&module, &unit.source);
    unit.ast = Some(module);
    unit.symbol_table = Some(table);
    unit.overload_table = Some(overloads);

    match final_result {
        Err(error) if options.no_final_check => {
            // Final checking still runs, but a failure is downgraded
            // rather than aborting the unit when the driver disabled it.
            if options.verbose {
                log::warn!("final check reported an error but no_final_check is set: {error}");
            }
            (unit, Ok(()))
        }
        other => (unit, other),
    }
}

/// Emits `unit`'s AST as target text, after [`analyze_unit`] (or the
/// `check`-only short path) succeeded. Returns [`CompileError::transform`]
/// if the overload table is missing — that can only happen if a caller
/// calls this before the analysis passes ran at all.
pub fn emit_unit(unit: &CompilationUnit, options: &CompileOptions) -> Result<String, CompileError> {
    let module = unit.ast.as_ref().ok_or_else(|| CompileError::transform("cannot emit a unit with no parsed AST", 0..0, &unit.source))?;
    let overloads = unit
        .overload_table
        .as_ref()
        .ok_or_else(|| CompileError::transform("cannot emit a unit whose overload table was never built", 0..0, &unit.source))?;
    let transform_options = TransformOptions { mode: options.emit.mode(), runtime_checks: options.runtime_checks };
    transform::transform(module, overloads, &unit.source, &transform_options)
}

/// Analyzes `unit` and, unless `options.check` is set, emits target text
/// too. This is the single entry point a driver calls per file; the
/// `check` flag is the only thing that keeps a clean unit from reaching the
/// transformer.
pub fn compile_unit(unit: CompilationUnit, options: &CompileOptions) -> (CompilationUnit, Result<Option<String>, CompileError>) {
    let (unit, analysis) = analyze_unit(unit, options);
    match analysis {
        Err(error) => (unit, Err(error)),
        Ok(()) if options.check => (unit, Ok(None)),
        Ok(()) => {
            let emitted = emit_unit(&unit, options);
            (unit, emitted.map(Some))
        }
    }
}

fn collect_imports(module: &Module, unit: &mut CompilationUnit) {
    for item in &module.items {
        if let Item::Stmt(Statement::Import(import)) = item {
            if import.module.ends_with(".py") || import.module.starts_with("py:") {
                unit.py_imports.push(import.module.clone());
            } else {
                unit.spc_imports.push(import.module.clone());
            }
        }
    }
}

/// Compiles `entry_path` and every Spice module it (transitively) imports,
/// using `resolver` to turn a module specifier into source text.
///
/// Ordering: **parse** every reachable unit depth-first
/// first (so a cycle is caught by the `visited` set rather than recursing
/// forever), then **verify-and-emit** each unit only after all of its own
/// imports have already been verified and emitted. A unit whose dependency
/// failed is skipped with [`dependency_failed`] rather than attempting its
/// own passes — the driver/resolver owns the lookup-path list and the
/// imported-path set; the core only walks the edges it is handed.
pub fn compile_graph(entry_path: &str, resolver: &dyn ModuleResolver, options: &CompileOptions) -> Vec<(String, Result<Option<String>, CompileError>)> {
    let mut parsed: Vec<(String, CompilationUnit)> = Vec::new();
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    parse_depth_first(entry_path, resolver, &mut visited, &mut parsed, &mut order);

    let mut results: Vec<(String, Result<Option<String>, CompileError>)> = Vec::new();
    let mut failed: HashSet<String> = HashSet::new();

    for path in order {
        let Some(index) = parsed.iter().position(|(p, _)| p == &path) else {
            continue;
        };
        let (_, unit) = parsed.remove(index);

        let dependency_failure = unit.spc_imports.iter().find(|dep| failed.contains(*dep)).cloned();
        if let Some(dep) = dependency_failure {
            failed.insert(path.clone());
            results.push((path, Err(dependency_failed(&dep, &unit.source))));
            continue;
        }

        let (_, outcome) = compile_unit(unit, options);
        if outcome.is_err() {
            failed.insert(path.clone());
        }
        results.push((path, outcome));
    }

    results
}

fn parse_depth_first(
    path: &str,
    resolver: &dyn ModuleResolver,
    visited: &mut HashSet<String>,
    parsed: &mut Vec<(String, CompilationUnit)>,
    order: &mut Vec<String>,
) {
    if !visited.insert(path.to_string()) {
        return;
    }

    let source = match resolver.resolve(path) {
        ResolvedModule::Source(text) => text,
        ResolvedModule::Native | ResolvedModule::Unresolved => return,
    };

    let mut unit = CompilationUnit::new(path.split('.').map(str::to_string).collect(), source);
    if let Ok(tokens) = lexer::tokenize(&unit.source) {
        if let Ok(module) = parser::parse(tokens, &unit.source) {
            collect_imports(&module, &mut unit);
            let deps = unit.spc_imports.clone();
            unit.ast = Some(module);
            parsed.push((path.to_string(), unit));
            // Post-order: recurse into dependencies first, so `order` ends
            // up dependencies-before-dependents — exactly what the
            // verify-and-emit phase in `compile_graph` needs to walk.
            for dep in deps {
                parse_depth_first(&dep, resolver, visited, parsed, order);
            }
            order.push(path.to_string());
            return;
        }
    }
    // Lex/parse failure: still register the unit so `compile_graph` can
    // report it through the normal `analyze_unit` path instead of silently
    // dropping it from the dependency graph.
    parsed.push((path.to_string(), unit));
    order.push(path.to_string());
}
