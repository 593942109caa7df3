//! Spice Language Compiler Executable
//!
//! A thin CLI shell around [`libspice`]: reads `.spc` files named on the
//! command line, runs each through the full pipeline, and writes the
//! emitted target text next to the source (or just reports diagnostics
//! under `--check`). File discovery, real import resolution, and any
//! native-toolchain invocation for `--emit exe` stay outside this binary —
//! they belong to a real driver, not to this demonstration shell.
//!
//! # Usage
//!
//! ```text
//! spicec [--emit py|pyx|exe] [--check] [--verbose] [--no-final-check] file1.spc file2.spc ...
//! ```

use std::process::exit;

use libspice::compile::{compile_unit, CompilationUnit, CompileOptions, EmitTarget};
use libspice::error::CodeSpanReportGenerator;
use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, ConfigBuilder, LevelPadding, TermLogger, TerminalMode, ThreadLogMode};

/// File extension used for Spice source files (kept in sync with
/// `libspice::error::SPICE_LANG_EXT`, which the driver does not otherwise
/// need to reference directly).
const SPICE_EXT: &str = ".spc";

fn main() {
    let config = ConfigBuilder::new()
        .set_location_level(LevelFilter::Error)
        .set_thread_mode(ThreadLogMode::Both)
        .set_level_padding(LevelPadding::Off)
        .set_thread_level(LevelFilter::Off)
        .build();
    CombinedLogger::init(vec![TermLogger::new(LevelFilter::Error, config, TerminalMode::Mixed, ColorChoice::Auto)]).unwrap();

    let args: Vec<String> = std::env::args().collect();
    let (options, paths) = parse_args(&args[1..]);

    if paths.is_empty() {
        eprintln!("Usage: {} [--emit py|pyx|exe] [--check] [--verbose] [--no-final-check] file1.spc file2.spc ...", args[0]);
        exit(1);
    }

    let mut exit_code = 0;
    for path in &paths {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(error) => {
                eprintln!("Error reading file {path}: {error}");
                exit_code = 2;
                continue;
            }
        };

        let module_name = path.strip_suffix(SPICE_EXT).unwrap_or(path).split('/').next_back().unwrap_or(path).to_string();

        let unit = CompilationUnit::new(vec![module_name], content);
        let (_, outcome) = compile_unit(unit, &options);
        match outcome {
            Ok(Some(target_text)) => {
                let out_path = output_path(path, options.emit);
                if let Err(error) = std::fs::write(&out_path, target_text) {
                    eprintln!("Error writing {out_path}: {error}");
                    exit_code = 1;
                } else if options.verbose {
                    println!("{path} -> {out_path}");
                }
            }
            Ok(None) => {
                if options.verbose {
                    println!("{path}: check passed");
                }
            }
            Err(error) => {
                CodeSpanReportGenerator::generate(&error);
                exit_code = 1;
            }
        }
    }

    exit(exit_code);
}

fn output_path(source_path: &str, emit: EmitTarget) -> String {
    let stem = source_path.strip_suffix(SPICE_EXT).unwrap_or(source_path);
    match emit {
        EmitTarget::Py => format!("{stem}.py"),
        EmitTarget::Pyx | EmitTarget::Exe => format!("{stem}.pyx"),
    }
}

fn parse_args(args: &[String]) -> (CompileOptions, Vec<String>) {
    let mut options = CompileOptions::default();
    let mut paths = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--emit" => {
                let mode = iter.next().map(String::as_str).unwrap_or("py");
                options.emit = match mode {
                    "pyx" => EmitTarget::Pyx,
                    "exe" => EmitTarget::Exe,
                    _ => EmitTarget::Py,
                };
            }
            "--check" => options.check = true,
            "--verbose" => options.verbose = true,
            "--no-final-check" => options.no_final_check = true,
            "--runtime-checks" => options.runtime_checks = true,
            other => paths.push(other.to_string()),
        }
    }
    (options, paths)
}
