//! Cython-annotated (`pyx`) emission.
//!
//! Generics are erased rather than rendered: a type parameter name becomes
//! `object` wherever it appears as an annotation, and no `TypeVar`/
//! `Generic[...]` machinery is emitted at all. Declarations get `cpdef`/
//! `cdef class` headers instead of plain `def`/`class`, and annotations run
//! through the primitive type mapping table first.

use std::collections::HashSet;

use super::{
    is_constructor, render_body, render_compiler_flags, render_expr, render_field, render_import, render_statement, walk_items, TransformOptions,
    TypeMap, Writer, INIT_METHOD_NAME,
};
use crate::ast::*;
use crate::error::CompileError;

pub(crate) fn emit(module: &Module, _options: &TransformOptions) -> Result<String, CompileError> {
    let mut w = Writer::new();
    w.line("# cython: language_level=3");
    w.blank();
    emit_imports(&mut w, module);

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
    let mut emitted_any = false;
    for item in &module.items {
        if let Item::Stmt(Statement::Import(import)) = item {
            w.line(render_import(import));
            emitted_any = true;
        }
    }
    if emitted_any {
        w.blank();
    }
}

fn render_field_pyx(field: &Parameter, generic_names: &HashSet<String>) -> String {
    render_field(field, &pyx_type_map(generic_names))
}

/// Generic parameter names in scope for the declaration being emitted; they
/// erase to the target's untyped object rather than any concrete mapping.
fn pyx_type_map(generic_names: &HashSet<String>) -> impl Fn(&str) -> String + '_ {
    move |ty: &str| map_type(ty, generic_names)
}

fn map_type(ty: &str, generic_names: &HashSet<String>) -> String {
    if generic_names.contains(ty) {
        return "object".to_string();
    }
    match ty {
        "int" => "int".to_string(),
        "str" => "str".to_string(),
        "bool" => "bint".to_string(),
        "float" => "double".to_string(),
        "None" => "None".to_string(),
        other => other.to_string(),
    }
}

fn emit_item(w: &mut Writer, item: &Item) {
    match item {
        Item::Interface(decl) => emit_interface(w, decl),
        Item::Class(decl) => emit_class(w, decl),
        Item::DataClass(decl) => emit_data_class(w, decl),
        Item::Enum(decl) => emit_enum(w, decl),
        Item::Function(decl) => emit_function(w, decl, None, &HashSet::new()),
        Item::Stmt(stmt) => emit_top_level_statement(w, stmt),
    }
}

fn emit_top_level_statement(w: &mut Writer, stmt: &Statement) {
    render_statement(w, stmt, &pyx_type_map(&HashSet::new()));
}

fn emit_interface(w: &mut Writer, decl: &InterfaceDecl) {
    for annotation in &decl.annotations {
        w.line(annotation);
    }
    let bases = decl.bases.join(", ");
    if bases.is_empty() {
        w.line(format!("cdef class {}:", decl.name));
    } else {
        w.line(format!("cdef class {}({bases}):", decl.name));
    }
    w.indented(|w| {
        if decl.methods.is_empty() {
            w.line("pass");
        }
        for (i, method) in decl.methods.iter().enumerate() {
            if i > 0 {
                w.blank();
            }
            let generic_names = HashSet::new();
            let map = pyx_type_map(&generic_names);
            let params = render_params_pyx(&method.params, &map);
            let ret = method.return_type.as_deref().map(|t| map(t)).unwrap_or_else(|| "object".to_string());
            w.line(format!("cpdef {ret} {}({params}):", method.name));
            w.indented(|w| w.line("pass"));
        }
    });
}

/// `render_params` from the shared module renders defaults with
/// `render_expr` already; this wraps it with the pyx-specific type map for
/// parameter annotations.
fn render_params_pyx(params: &[Parameter], map_type: &TypeMap<'_>) -> String {
    super::render_params(params, map_type)
}

fn emit_class(w: &mut Writer, decl: &ClassDecl) {
    render_compiler_flags(w, &decl.compiler_flags);
    let generic_names: HashSet<String> = decl.type_params.iter().map(|p| p.name.clone()).collect();
    w.line(format!("cdef class {}:", class_header(decl)));
    w.indented(|w| {
        if decl.body.is_empty() {
            w.line("pass");
            return;
        }
        emit_member_list(w, &decl.body, &decl.name, &generic_names);
    });
}

fn class_header(decl: &ClassDecl) -> String {
    let mut bases = decl.bases.clone();
    bases.extend(decl.interfaces.clone());
    if bases.is_empty() {
        decl.name.clone()
    } else {
        format!("{}({})", decl.name, bases.join(", "))
    }
}

fn emit_member_list(w: &mut Writer, body: &[Item], owner_name: &str, generic_names: &HashSet<String>) {
    let mut first = true;
    for member in body {
        if !first {
            w.blank();
        }
        first = false;
        match member {
            Item::Function(f) => emit_function(w, f, Some(owner_name), generic_names),
            other => emit_item(w, other),
        }
    }
}

fn emit_function(w: &mut Writer, decl: &FunctionDecl, owner_name: Option<&str>, outer_generics: &HashSet<String>) {
    render_compiler_flags(w, &decl.compiler_flags);
    let mut generic_names = outer_generics.clone();
    generic_names.extend(decl.type_params.iter().map(|p| p.name.clone()));
    let map = pyx_type_map(&generic_names);

    let name = match owner_name {
        Some(owner) if is_constructor(&decl.name, owner) => INIT_METHOD_NAME.to_string(),
        _ => decl.name.clone(),
    };
    let ret = decl.return_type.as_deref().map(|t| map(t)).unwrap_or_else(|| "void".to_string());
    let params = render_params_pyx(&decl.params, &map);
    if decl.is_static {
        w.line("@staticmethod");
    }
    w.line(format!("cpdef {ret} {name}({params}):"));
    if decl.is_abstract {
        w.indented(|w| w.line("pass"));
        return;
    }
    render_body(w, decl.body.as_deref(), &map);
}

fn emit_data_class(w: &mut Writer, decl: &DataClassDecl) {
    let generic_names: HashSet<String> = decl.type_params.iter().map(|p| p.name.clone()).collect();
    w.line(format!("cdef class {}:", class_header_for_data(decl)));
    w.indented(|w| {
        for field in &decl.fields {
            w.line(format!("cdef public {}", render_field_pyx(field, &generic_names)));
        }
        let has_ctor = decl.body.iter().any(|m| matches!(m, Item::Function(f) if is_constructor(&f.name, &decl.name)));
        if !has_ctor {
            if !decl.fields.is_empty() {
                w.blank();
            }
            emit_synthesized_constructor(w, decl, &generic_names);
        }
        if !decl.body.is_empty() {
            w.blank();
            emit_member_list(w, &decl.body, &decl.name, &generic_names);
        }
        if decl.fields.is_empty() && decl.body.is_empty() && has_ctor {
            w.line("pass");
        }
    });
}

/// A data class with no explicit constructor still needs one in `pyx` mode
/// (unlike `py` mode, where `@dataclass` synthesizes it) since `cdef class`
/// fields are typed slots with no implicit `__init__`.
fn emit_synthesized_constructor(w: &mut Writer, decl: &DataClassDecl, generic_names: &HashSet<String>) {
    let mut params = vec!["self".to_string()];
    params.extend(decl.fields.iter().map(|f| render_field_pyx(f, generic_names)));
    w.line(format!("def {INIT_METHOD_NAME}({}):", params.join(", ")));
    w.indented(|w| {
        if decl.fields.is_empty() {
            w.line("pass");
        }
        for field in &decl.fields {
            w.line(format!("self.{0} = {0}", field.name));
        }
    });
}

fn class_header_for_data(decl: &DataClassDecl) -> String {
    let bases = decl.bases.clone();
    if bases.is_empty() {
        decl.name.clone()
    } else {
        format!("{}({})", decl.name, bases.join(", "))
    }
}

fn emit_enum(w: &mut Writer, decl: &EnumDecl) {
    w.line(format!("cdef class {}:", decl.name));
    w.indented(|w| {
        for (index, member) in decl.members.iter().enumerate() {
            if member.args.is_empty() {
                w.line(format!("{} = {index}", member.name));
            } else {
                let args = member.args.iter().map(render_expr).collect::<Vec<_>>().join(", ");
                w.line(format!("{} = ({args})", member.name));
            }
        }
        if !decl.body.is_empty() {
            w.blank();
            emit_member_list(w, &decl.body, &decl.name, &HashSet::new());
        }
    });
}
