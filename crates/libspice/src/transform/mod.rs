//! AST → target source text.
//!
//! This is the only component that writes characters; every earlier pass
//! reads the AST, this one renders it. [`transform`] dispatches to [`py`] or
//! [`pyx`] depending on [`TransformOptions::mode`], but almost everything —
//! expression rendering, statement rendering, constructor/`super(...)`
//! lowering, block indentation — is mode-independent and lives here. The two
//! mode modules only differ on item headers (class/function/data-class/enum
//! declarations), the generics story, and the type mapping used inside those
//! headers.

pub mod py;
pub mod pyx;

use std::collections::HashMap;

use crate::ast::*;
use crate::error::CompileError;
use crate::file::SourceFile;
use crate::overload::OverloadTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitMode {
    Py,
    /// `exe` is equivalent to `pyx` at the core level; any
    /// binary-linking step is a driver-level post-process this crate never
    /// performs.
    Pyx,
}

#[derive(Debug, Clone)]
pub struct TransformOptions {
    pub mode: EmitMode,
    /// Injects a runtime type-check decorator around public top-level
    /// function entry points. A design choice left unspecified by the interface; see
    /// DESIGN.md.
    pub runtime_checks: bool,
}

/// Renders `module` as target source text in the mode `options` selects.
///
/// Before emitting, this checks that every method/function sharing a name
/// with a sibling actually carries the `@dispatch(...)` decorator the
/// overload resolver should have attached — if the table says an owner has
/// overloads but the AST node lacks the decorator, an earlier pass left the
/// tree inconsistent and this raises [`CompileError::transform`] rather than
/// emitting silently wrong code.
pub fn transform(module: &Module, overloads: &OverloadTable, file: &SourceFile, options: &TransformOptions) -> Result<String, CompileError> {
    verify_overload_consistency(module, overloads, file)?;
    match options.mode {
        EmitMode::Py => py::emit(module, options),
        EmitMode::Pyx => pyx::emit(module, options),
    }
}

fn verify_overload_consistency(module: &Module, overloads: &OverloadTable, file: &SourceFile) -> Result<(), CompileError> {
    let module_groups = group_by_name(&module.items);
    check_group_decorated(&module_groups, crate::overload::MODULE_OWNER, overloads, file)?;

    for item in &module.items {
        if let Item::Class(class_decl) = item {
            let class_groups = group_by_name(&class_decl.body);
            check_group_decorated(&class_groups, &class_decl.name, overloads, file)?;
        }
    }
    Ok(())
}

fn group_by_name(items: &[Item]) -> HashMap<String, Vec<&FunctionDecl>> {
    let mut groups: HashMap<String, Vec<&FunctionDecl>> = HashMap::new();
    for item in items {
        if let Item::Function(func) = item {
            groups.entry(func.name.clone()).or_default().push(func);
        }
    }
    groups
}

fn check_group_decorated(groups: &HashMap<String, Vec<&FunctionDecl>>, owner: &str, overloads: &OverloadTable, file: &SourceFile) -> Result<(), CompileError> {
    for (name, funcs) in groups {
        if funcs.len() <= 1 {
            continue;
        }
        for func in funcs {
            let type_names: Vec<String> = func.params.iter().map(|p| p.type_annotation.clone().unwrap_or_else(|| "any".to_string())).collect();
            let signature = if type_names.is_empty() { format!("{name}()") } else { format!("{name}({})", type_names.join(", ")) };
            if overloads.get(owner, &signature).is_some() && !func.decorators.iter().any(|d| d.starts_with("@dispatch")) {
                return Err(CompileError::transform(
                    format!("overload table has an entry for {owner}::{signature} but '{name}' carries no @dispatch decorator"),
                    func.span.range(),
                    file,
                ));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------
// Shared rendering: indentation, expressions, statements
// ---------------------------------------------------------------------

/// Accumulates output lines at a tracked indentation level. Four spaces per
/// level, matching the target's block-emission rule.
pub(crate) struct Writer {
    lines: Vec<String>,
    indent: usize,
}

impl Writer {
    pub(crate) fn new() -> Self {
        Self { lines: Vec::new(), indent: 0 }
    }

    pub(crate) fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if text.is_empty() {
            self.lines.push(String::new());
        } else {
            self.lines.push(format!("{}{}", "    ".repeat(self.indent), text));
        }
    }

    pub(crate) fn blank(&mut self) {
        self.lines.push(String::new());
    }

    pub(crate) fn indented(&mut self, f: impl FnOnce(&mut Self)) {
        self.indent += 1;
        f(self);
        self.indent -= 1;
    }

    pub(crate) fn finish(self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

/// A type mapping hook: `py` mode passes annotations through unchanged,
/// `pyx` mode applies the `int/str/bool/float/None` primitive mapping table and erases
/// generic parameter names to the target's untyped object.
pub(crate) type TypeMap<'a> = dyn Fn(&str) -> String + 'a;

pub(crate) fn identity_type_map(ty: &str) -> String {
    ty.to_string()
}

pub(crate) fn render_params(params: &[Parameter], map_type: &TypeMap<'_>) -> String {
    params
        .iter()
        .map(|p| {
            let mut rendered = p.name.clone();
            if let Some(ty) = &p.type_annotation {
                rendered.push_str(": ");
                rendered.push_str(&map_type(ty));
            }
            if let Some(default) = &p.default {
                rendered.push_str(if p.type_annotation.is_some() { " = " } else { "=" });
                rendered.push_str(&render_expr(default));
            }
            rendered
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders a data-class/enum field declaration: `name: Type` (or `name:
/// Type = default` / bare `name` with no annotation).
pub(crate) fn render_field(field: &Parameter, map_type: &TypeMap<'_>) -> String {
    let mut rendered = field.name.clone();
    if let Some(ty) = &field.type_annotation {
        rendered.push_str(": ");
        rendered.push_str(&map_type(ty));
    }
    if let Some(default) = &field.default {
        rendered.push_str(" = ");
        rendered.push_str(&render_expr(default));
    }
    rendered
}

pub(crate) fn render_return_type(return_type: &Option<String>, map_type: &TypeMap<'_>) -> String {
    match return_type {
        Some(ty) => format!(" -> {}", map_type(ty)),
        None => String::new(),
    }
}

/// Emits `body` (or a lone `pass` for an empty/absent one) at one indent
/// level deeper than `w`'s current level, lowering bare `super(...)` calls
/// found anywhere inside to `super().__init__(...)` along the way — the
/// shorthand is only meaningful inside a constructor, but a bare call to an
/// identifier literally named `super` cannot mean anything else in Spice.
pub(crate) fn render_body(w: &mut Writer, body: Option<&[Statement]>, map_type: &TypeMap<'_>) {
    w.indented(|w| match body {
        Some(stmts) if !stmts.is_empty() => {
            for stmt in stmts {
                render_statement(w, stmt, map_type);
            }
        }
        _ => w.line("pass"),
    });
}

pub(crate) fn render_statement(w: &mut Writer, stmt: &Statement, map_type: &TypeMap<'_>) {
    match stmt {
        Statement::Expression(s) => w.line(render_expr(&s.expr)),
        Statement::Pass(_) => w.line("pass"),
        Statement::Return(s) => match &s.value {
            Some(v) => w.line(format!("return {}", render_expr(v))),
            None => w.line("return"),
        },
        Statement::If(s) => render_if(w, s, map_type),
        Statement::While(s) => {
            w.line(format!("while {}:", render_expr(&s.condition)));
            render_body(w, Some(&s.body), map_type);
        }
        Statement::For(s) => {
            let (target, iter) = render_for_target(&s.target);
            w.line(format!("for {target} in {iter}:"));
            render_body(w, Some(&s.body), map_type);
        }
        Statement::Switch(s) => render_switch(w, s, map_type),
        Statement::Raise(s) => match &s.exception {
            Some(e) => w.line(format!("raise {}", render_expr(e))),
            None => w.line("raise"),
        },
        Statement::Import(s) => w.line(render_import(s)),
        Statement::Final(s) => w.line(render_final_declaration(s, map_type)),
    }
}

/// `if (cond) { … } else if (…) { … } else { … }` parses `else if` as a
/// single nested `If` inside `or_else` (see parser.rs's `parse_if`); render
/// that shape back out as Python `elif` rather than a nested `else: if …:`.
fn render_if(w: &mut Writer, s: &IfStatement, map_type: &TypeMap<'_>) {
    w.line(format!("if {}:", render_expr(&s.condition)));
    render_body(w, Some(&s.then), map_type);
    match s.or_else.as_deref() {
        Some([Statement::If(nested)]) => render_elif(w, nested, map_type),
        Some(stmts) => {
            w.line("else:");
            render_body(w, Some(stmts), map_type);
        }
        None => {}
    }
}

fn render_elif(w: &mut Writer, s: &IfStatement, map_type: &TypeMap<'_>) {
    w.line(format!("elif {}:", render_expr(&s.condition)));
    render_body(w, Some(&s.then), map_type);
    match s.or_else.as_deref() {
        Some([Statement::If(nested)]) => render_elif(w, nested, map_type),
        Some(stmts) => {
            w.line("else:");
            render_body(w, Some(stmts), map_type);
        }
        None => {}
    }
}

/// `ForStatement::target` is the `in`-binary expression the expression
/// parser produced for `for (x in items) { … }`; split it back into a loop
/// variable and an iterable for Python's `for x in items:` syntax.
fn render_for_target(target: &Expr) -> (String, String) {
    match target {
        Expr::Binary(b) if b.op == BinaryOp::In => (render_expr(&b.left), render_expr(&b.right)),
        other => (render_expr(other), "...".to_string()),
    }
}

/// Python has no `switch`; `match` is the structurally closest statement
/// (one `case` per clause, `case _` for `default`) so `switch`/`case`/
/// `default` lower to it directly rather than an `if`/`elif` chain. See the
/// compiler-flag/overload-strategy precedent in DESIGN.md for how open
/// questions like this one are decided and recorded.
fn render_switch(w: &mut Writer, s: &SwitchStatement, map_type: &TypeMap<'_>) {
    w.line(format!("match {}:", render_expr(&s.expr)));
    w.indented(|w| {
        for case in &s.cases {
            w.line(format!("case {}:", render_expr(&case.value)));
            render_body(w, Some(&case.body), map_type);
        }
        if let Some(default) = &s.default {
            w.line("case _:");
            render_body(w, Some(default), map_type);
        }
    });
}

pub(crate) fn render_import(s: &ImportStatement) -> String {
    if s.is_from_import {
        let parts: Vec<String> = s
            .names
            .iter()
            .zip(s.aliases.iter())
            .map(|(name, alias)| match alias {
                Some(a) => format!("{name} as {a}"),
                None => name.clone(),
            })
            .collect();
        format!("from {} import {}", s.module, parts.join(", "))
    } else {
        match s.aliases.first().and_then(|a| a.as_ref()) {
            Some(alias) => format!("import {} as {alias}", s.module),
            None => format!("import {}", s.module),
        }
    }
}

/// Final variables carry no runtime marker in `pyx` mode (the final check
/// is enforced at compile time by `final_checker` already); in `py` mode
/// they're annotated with `typing.Final` so a reader of the emitted module
/// sees the same immutability contract Spice enforced.
fn render_final_declaration(s: &FinalDeclaration, map_type: &TypeMap<'_>) -> String {
    let value = render_expr(&s.value);
    match &s.type_annotation {
        Some(ty) => format!("{}: Final[{}] = {value}", s.target, map_type(ty)),
        None => format!("{}: Final = {value}", s.target),
    }
}

pub(crate) fn render_expr(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(e) => e.name.clone(),
        Expr::Literal(e) => render_literal(e),
        Expr::Attribute(e) => format!("{}.{}", render_expr(&e.object), e.attribute),
        Expr::Call(e) => render_call(e),
        Expr::Assignment(e) => render_assignment(e),
        Expr::Logical(e) => format!("{} {} {}", render_expr(&e.left), logical_op_str(e.op), render_expr(&e.right)),
        Expr::Unary(e) => render_unary(e),
        Expr::Binary(e) => format!("{} {} {}", render_expr(&e.left), binary_op_str(e.op), render_expr(&e.right)),
        Expr::Lambda(e) => render_lambda(e),
        Expr::DictEntry(e) => render_dict_entry(e),
        Expr::Subscript(e) => format!("{}[{}]", render_expr(&e.object), render_expr(&e.index)),
        Expr::Slice(e) => render_slice(e),
        Expr::Comprehension(e) => render_comprehension(e),
        Expr::ListLiteral(e) => format!("[{}]", e.elements.iter().map(render_expr).collect::<Vec<_>>().join(", ")),
        Expr::TupleLiteral(e) => render_tuple(e),
        Expr::SetLiteral(e) => render_set(e),
        Expr::DictLiteral(e) => format!("{{{}}}", e.entries.iter().map(render_dict_entry).collect::<Vec<_>>().join(", ")),
    }
}

fn render_dict_entry(entry: &DictEntry) -> String {
    format!("{}: {}", render_expr(&entry.key), render_expr(&entry.value))
}

fn render_literal(lit: &Literal) -> String {
    match lit.literal_type {
        // `value` already carries the decoded-but-unescaped surface text,
        // quotes and any `f`/`F` prefix included — the lexer preserves it
        // verbatim exactly so the transformer can re-emit it unmodified.
        LiteralKind::Str => lit.value.clone(),
        LiteralKind::Number => lit.value.clone(),
        LiteralKind::Bool => if lit.value.eq_ignore_ascii_case("true") { "True" } else { "False" }.to_string(),
        LiteralKind::None_ => "None".to_string(),
    }
}

/// Lowers a bare `super(args)` call to `super().__init__(args)`; any
/// other call renders its callee and arguments directly.
fn render_call(call: &Call) -> String {
    if let Expr::Identifier(ident) = call.callee.as_ref() {
        if ident.name == "super" {
            return format!("super().__init__({})", render_arguments(&call.arguments));
        }
    }
    format!("{}({})", render_expr(&call.callee), render_arguments(&call.arguments))
}

fn render_arguments(args: &[Argument]) -> String {
    args.iter()
        .map(|a| match &a.name {
            Some(name) => format!("{name}={}", render_expr(&a.value)),
            None => render_expr(&a.value),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_assignment(a: &Assignment) -> String {
    let target = render_expr(&a.target);
    match (&a.type_annotation, &a.value) {
        (Some(ty), Some(value)) => format!("{target}: {ty} = {}", render_expr(value)),
        (Some(ty), None) => format!("{target}: {ty}"),
        (None, Some(value)) => format!("{target} {} {}", assign_op_str(a.operator.unwrap_or(AssignOp::Assign)), render_expr(value)),
        (None, None) => target,
    }
}

fn render_unary(u: &Unary) -> String {
    match u.op {
        UnaryOp::Neg => format!("-{}", render_expr(&u.operand)),
        UnaryOp::Not => format!("not {}", render_expr(&u.operand)),
    }
}

fn render_lambda(l: &Lambda) -> String {
    let params = l.params.iter().map(|p| p.name.clone()).collect::<Vec<_>>().join(", ");
    format!("lambda {params}: {}", render_expr(&l.body))
}

fn render_slice(s: &Slice) -> String {
    let start = s.start.as_deref().map(render_expr).unwrap_or_default();
    let stop = s.stop.as_deref().map(render_expr).unwrap_or_default();
    match &s.step {
        Some(step) => format!("{start}:{stop}:{}", render_expr(step)),
        None => format!("{start}:{stop}"),
    }
}

fn render_tuple(t: &TupleLiteral) -> String {
    if t.elements.len() == 1 {
        return format!("({},)", render_expr(&t.elements[0]));
    }
    format!("({})", t.elements.iter().map(render_expr).collect::<Vec<_>>().join(", "))
}

fn render_set(s: &SetLiteral) -> String {
    if s.elements.is_empty() {
        return "set()".to_string();
    }
    format!("{{{}}}", s.elements.iter().map(render_expr).collect::<Vec<_>>().join(", "))
}

fn render_comprehension(c: &Comprehension) -> String {
    let element = render_expr(&c.element);
    let target = render_expr(&c.target);
    let iter = render_expr(&c.iter);
    let cond = c.condition.as_deref().map(|e| format!(" if {}", render_expr(e))).unwrap_or_default();
    match c.comp_type {
        ComprehensionKind::List => format!("[{element} for {target} in {iter}{cond}]"),
        ComprehensionKind::Set => format!("{{{element} for {target} in {iter}{cond}}}"),
        ComprehensionKind::Generator => format!("({element} for {target} in {iter}{cond})"),
        ComprehensionKind::Dict => {
            let key = c.key.as_deref().map(render_expr).unwrap_or_default();
            format!("{{{key}: {element} for {target} in {iter}{cond}}}")
        }
    }
}

fn assign_op_str(op: AssignOp) -> &'static str {
    match op {
        AssignOp::Assign => "=",
        AssignOp::Add => "+=",
        AssignOp::Sub => "-=",
        AssignOp::Mul => "*=",
        AssignOp::Div => "/=",
    }
}

fn logical_op_str(op: LogicalOp) -> &'static str {
    match op {
        LogicalOp::And => "and",
        LogicalOp::Or => "or",
    }
}

fn binary_op_str(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Eq => "==",
        BinaryOp::NotEq => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Gt => ">",
        BinaryOp::LtEq => "<=",
        BinaryOp::GtEq => ">=",
        BinaryOp::In => "in",
    }
}

/// True when `method_name` is the constructor for a declaration named
/// `owner_name` — the method whose name echoes its enclosing type's name,
/// emitted as the target's init-method instead.
pub(crate) fn is_constructor(method_name: &str, owner_name: &str) -> bool {
    method_name == owner_name
}

pub(crate) const INIT_METHOD_NAME: &str = "__init__";

/// `[flag1, flag2] class/def …` compiler-flag blocks have no ascribed
/// behavior (an open question left by the distilled requirements); preserve them as a comment so the
/// information survives into the target without inventing semantics for it.
pub(crate) fn render_compiler_flags(w: &mut Writer, flags: &[String]) {
    if !flags.is_empty() {
        w.line(format!("# compiler flags: {}", flags.join(", ")));
    }
}

/// Recursively collects every nested [`Item`] appearing anywhere under
/// `items` (class/data-class/enum bodies), used by both mode modules to
/// decide which ambient imports (dataclasses, enum, typing) a module needs.
pub(crate) fn walk_items<'a>(items: &'a [Item], out: &mut Vec<&'a Item>) {
    for item in items {
        out.push(item);
        match item {
            Item::Class(c) => walk_items(&c.body, out),
            Item::DataClass(d) => walk_items(&d.body, out),
            Item::Enum(e) => walk_items(&e.body, out),
            _ => {}
        }
    }
}
