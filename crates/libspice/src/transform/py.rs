//! Dynamically-typed Python emission.
//!
//! Type annotations are kept (Python accepts them as non-enforced hints),
//! generic classes become `Generic[T, ...]` subclasses with a module-level
//! `TypeVar` per type parameter, and data classes/enums import the standard
//! library modules that implement them.

use super::{identity_type_map, is_constructor, render_body, render_compiler_flags, render_expr, render_import, render_params, render_return_type, render_statement, walk_items, TransformOptions, Writer, INIT_METHOD_NAME};
use crate::ast::*;
use crate::error::CompileError;

pub(crate) fn emit(module: &Module, _options: &TransformOptions) -> Result<String, CompileError> {
    let mut w = Writer::new();
    emit_imports(&mut w, module);
    emit_type_vars(&mut w, module);

    let mut first = true;
    for item in &module.items {
        if !first {
            w.blank();
            w.blank();
        }
        first = false;
        emit_item(&mut w, item);
    }
    Ok(w.finish())
}

fn emit_imports(w: &mut Writer, module: &Module) {
    let mut all = Vec::new();
    walk_items(&module.items, &mut all);

    let has_data_class = all.iter().any(|i| matches!(i, Item::DataClass(_)));
    let enums: Vec<&EnumDecl> = all.iter().filter_map(|i| if let Item::Enum(e) = i { Some(e) } else { None }).collect();
    let has_final_var = all.iter().any(|i| matches!(i, Item::Stmt(Statement::Final(_))));
    let has_final_decl = all.iter().any(is_final_class_or_method);
    let has_abstract = all.iter().any(is_abstract_class_or_method);
    // Only an interface with no declared bases falls back to `Protocol`
    // (see `emit_interface`); one with bases needs no typing import for it.
    let needs_protocol = all.iter().any(|i| matches!(i, Item::Interface(decl) if decl.bases.is_empty()));
    let needs_generic = all.iter().any(item_type_params_nonempty);

    let mut emitted_any = false;
    if has_abstract {
        w.line("from abc import ABC, abstractmethod");
        emitted_any = true;
    }
    if has_data_class {
        w.line("from dataclasses import dataclass");
        emitted_any = true;
    }
    if !enums.is_empty() {
        let needs_auto = enums.iter().any(|e| e.members.iter().any(|m| m.args.is_empty()));
        if needs_auto {
            w.line("from enum import Enum, auto");
        } else {
            w.line("from enum import Enum");
        }
        emitted_any = true;
    }
    let typing_names = typing_import_names(needs_generic, has_final_var, has_final_decl, needs_protocol);
    if !typing_names.is_empty() {
        w.line(format!("from typing import {}", typing_names.join(", ")));
        emitted_any = true;
    }

    let mut user_imports_emitted = false;
    for item in &module.items {
        if let Item::Stmt(Statement::Import(import)) = item {
            w.line(render_import(import));
            user_imports_emitted = true;
        }
    }

    if emitted_any || user_imports_emitted {
        w.blank();
    }
}

fn typing_import_names(needs_generic: bool, has_final_var: bool, has_final_decl: bool, needs_protocol: bool) -> Vec<&'static str> {
    let mut names = Vec::new();
    if has_final_var {
        names.push("Final");
    }
    if needs_generic {
        names.push("Generic");
        names.push("TypeVar");
    }
    if has_final_decl {
        names.push("final");
    }
    if needs_protocol {
        names.push("Protocol");
    }
    names
}

fn item_type_params_nonempty(item: &Item) -> bool {
    match item {
        Item::Class(c) => !c.type_params.is_empty(),
        Item::DataClass(d) => !d.type_params.is_empty(),
        Item::Function(f) => !f.type_params.is_empty(),
        _ => false,
    }
}

fn is_final_class_or_method(item: &Item) -> bool {
    match item {
        Item::Class(c) => c.is_final,
        Item::Function(f) => f.is_final,
        _ => false,
    }
}

fn is_abstract_class_or_method(item: &Item) -> bool {
    match item {
        Item::Class(c) => c.is_abstract,
        Item::Function(f) => f.is_abstract,
        _ => false,
    }
}

/// One `TypeVar` per distinct type-parameter name used anywhere in the
/// module, in first-seen order, deduplicated so `class Box<T>` and
/// `class Pair<T>` share a single `T = TypeVar('T')`.
fn emit_type_vars(w: &mut Writer, module: &Module) {
    let mut seen = Vec::new();
    let mut all = Vec::new();
    walk_items(&module.items, &mut all);
    for item in &all {
        let params: &[TypeParameter] = match item {
            Item::Class(c) => &c.type_params,
            Item::DataClass(d) => &d.type_params,
            Item::Function(f) => &f.type_params,
            _ => &[],
        };
        for param in params {
            if !seen.iter().any(|(name, _): &(String, Option<String>)| name == &param.name) {
                seen.push((param.name.clone(), param.bound.clone()));
            }
        }
    }
    if seen.is_empty() {
        return;
    }
    for (name, bound) in &seen {
        match bound {
            Some(b) => w.line(format!("{name} = TypeVar('{name}', bound={b})")),
            None => w.line(format!("{name} = TypeVar('{name}')")),
        }
    }
    w.blank();
}

fn emit_item(w: &mut Writer, item: &Item) {
    match item {
        Item::Interface(decl) => emit_interface(w, decl),
        Item::Class(decl) => emit_class(w, decl),
        Item::DataClass(decl) => emit_data_class(w, decl),
        Item::Enum(decl) => emit_enum(w, decl),
        Item::Function(decl) => emit_function(w, decl, None),
        Item::Stmt(stmt) => emit_top_level_statement(w, stmt),
    }
}

fn emit_top_level_statement(w: &mut Writer, stmt: &Statement) {
    render_statement(w, stmt, &identity_type_map);
}

fn render_field(field: &Parameter) -> String {
    super::render_field(field, &identity_type_map)
}

fn emit_interface(w: &mut Writer, decl: &InterfaceDecl) {
    for annotation in &decl.annotations {
        w.line(annotation);
    }
    let bases = if decl.bases.is_empty() { "Protocol".to_string() } else { decl.bases.join(", ") };
    w.line(format!("class {}({bases}):", decl.name));
    w.indented(|w| {
        if decl.methods.is_empty() {
            w.line("pass");
        }
        for (i, method) in decl.methods.iter().enumerate() {
            if i > 0 {
                w.blank();
            }
            let params = render_params(&method.params, &identity_type_map);
            w.line(format!("def {}({params}){}:", method.name, render_return_type(&method.return_type, &identity_type_map)));
            w.indented(|w| w.line("..."));
        }
    });
}

fn emit_class(w: &mut Writer, decl: &ClassDecl) {
    render_compiler_flags(w, &decl.compiler_flags);
    if decl.is_final {
        w.line("@final");
    }
    w.line(format!("class {}:", class_header(decl)));
    w.indented(|w| {
        if decl.body.is_empty() {
            w.line("pass");
            return;
        }
        emit_member_list(w, &decl.body, &decl.name);
    });
}

fn class_header(decl: &ClassDecl) -> String {
    let mut bases = decl.bases.clone();
    bases.extend(decl.interfaces.clone());
    if decl.is_abstract {
        bases.push("ABC".to_string());
    }
    if !decl.type_params.is_empty() {
        let names = decl.type_params.iter().map(|p| p.name.clone()).collect::<Vec<_>>().join(", ");
        bases.push(format!("Generic[{names}]"));
    }
    if bases.is_empty() {
        decl.name.clone()
    } else {
        format!("{}({})", decl.name, bases.join(", "))
    }
}

fn emit_member_list(w: &mut Writer, body: &[Item], owner_name: &str) {
    let mut first = true;
    for member in body {
        if !first {
            w.blank();
        }
        first = false;
        match member {
            Item::Function(f) => emit_function(w, f, Some(owner_name)),
            other => emit_item(w, other),
        }
    }
}

fn emit_function(w: &mut Writer, decl: &FunctionDecl, owner_name: Option<&str>) {
    render_compiler_flags(w, &decl.compiler_flags);
    if decl.is_final {
        w.line("@final");
    }
    for decorator in &decl.decorators {
        w.line(decorator);
    }
    if decl.is_static {
        w.line("@staticmethod");
    }
    let name = match owner_name {
        Some(owner) if is_constructor(&decl.name, owner) => INIT_METHOD_NAME.to_string(),
        _ => decl.name.clone(),
    };
    let params = render_params(&decl.params, &identity_type_map);
    let generics = if decl.type_params.is_empty() {
        String::new()
    } else {
        format!("[{}]", decl.type_params.iter().map(|p| p.name.clone()).collect::<Vec<_>>().join(", "))
    };
    w.line(format!("def {name}{generics}({params}){}:", render_return_type(&decl.return_type, &identity_type_map)));
    if decl.is_abstract {
        w.indented(|w| {
            w.line("@abstractmethod");
            w.line("...");
        });
        return;
    }
    render_body(w, decl.body.as_deref(), &identity_type_map);
}

fn emit_data_class(w: &mut Writer, decl: &DataClassDecl) {
    w.line("@dataclass");
    w.line(format!("class {}:", class_header_for_data(decl)));
    w.indented(|w| {
        for field in &decl.fields {
            w.line(render_field(field));
        }
        if decl.fields.is_empty() && decl.body.is_empty() {
            w.line("pass");
            return;
        }
        if !decl.body.is_empty() {
            w.blank();
            emit_member_list(w, &decl.body, &decl.name);
        }
    });
}

fn class_header_for_data(decl: &DataClassDecl) -> String {
    let mut bases = decl.bases.clone();
    if !decl.type_params.is_empty() {
        let names = decl.type_params.iter().map(|p| p.name.clone()).collect::<Vec<_>>().join(", ");
        bases.push(format!("Generic[{names}]"));
    }
    if bases.is_empty() {
        decl.name.clone()
    } else {
        format!("{}({})", decl.name, bases.join(", "))
    }
}

fn emit_enum(w: &mut Writer, decl: &EnumDecl) {
    w.line(format!("class {}(Enum):", decl.name));
    w.indented(|w| {
        for member in &decl.members {
            if member.args.is_empty() {
                w.line(format!("{} = auto()", member.name));
            } else {
                let args = member.args.iter().map(render_expr).collect::<Vec<_>>().join(", ");
                let value = if member.args.len() == 1 { args } else { format!("({args})") };
                w.line(format!("{} = {value}", member.name));
            }
        }
        if !decl.body.is_empty() {
            w.blank();
            emit_member_list(w, &decl.body, &decl.name);
        }
    });
}
