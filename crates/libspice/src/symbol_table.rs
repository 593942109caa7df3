//! Symbol table data model and the single-traversal builder pass.
//!
//! The builder walks a parsed [`Module`] once, registering a [`Scope`] for
//! every class, data class, enum, and function/method, and a
//! [`VariableSymbol`] for every parameter, annotated assignment, final
//! declaration, and data-class field. Everything else is left untyped for
//! the type checker to diagnose — this pass never rejects a program, it
//! only fails if it finds a genuine name collision.

use crate::ast::{
    Assignment, ClassDecl, DataClassDecl, EnumDecl, Expr, FinalDeclaration, FunctionDecl, Item, LiteralKind, Module, Statement,
};
use crate::error::CompileError;
use crate::file::SourceFile;
use crate::map::SpiceMap;
use crate::span::Span;

#[derive(Debug, Clone)]
pub struct VariableSymbol {
    pub name: String,
    pub type_annotation: Option<String>,
    pub span: Span,
    /// For generic types: maps type parameter names to concrete types, e.g.
    /// `{"T": "int"}` for a `Stack<int>` binding. Populated by the type
    /// checker, not this builder.
    pub generic_bindings: SpiceMap<String, String>,
}

impl VariableSymbol {
    fn new(name: String, type_annotation: Option<String>, span: Span) -> Self {
        Self { name, type_annotation, span, generic_bindings: SpiceMap::new() }
    }
}

#[derive(Debug, Clone)]
pub struct FunctionSymbol {
    pub name: String,
    pub params: Vec<crate::ast::Parameter>,
    pub return_type: Option<String>,
    pub span: Span,
    pub scope: String,
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub name: String,
    pub parent: Option<String>,
    pub variables: SpiceMap<String, VariableSymbol>,
    /// Each name maps to a list rather than a single symbol so overloaded
    /// functions/methods can coexist until the overload resolver runs.
    pub functions: SpiceMap<String, Vec<FunctionSymbol>>,
}

impl Scope {
    fn new(name: String, parent: Option<String>) -> Self {
        Self { name, parent, variables: SpiceMap::new(), functions: SpiceMap::new() }
    }
}

#[derive(Debug, Clone)]
pub struct ClassSymbol {
    pub name: String,
    pub span: Span,
    pub scope: String,
    pub methods: SpiceMap<String, Vec<FunctionSymbol>>,
    pub type_parameters: Vec<String>,
}

impl ClassSymbol {
    pub fn is_generic(&self) -> bool {
        !self.type_parameters.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct InterfaceSymbol {
    pub name: String,
    pub span: Span,
    pub scope: String,
}

#[derive(Debug, Clone)]
pub struct SymbolTable {
    pub scopes: SpiceMap<String, Scope>,
    pub classes: SpiceMap<String, ClassSymbol>,
    pub interfaces: SpiceMap<String, InterfaceSymbol>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        let mut scopes = SpiceMap::new();
        scopes.insert("global".to_string(), Scope::new("global".to_string(), None));
        Self { scopes, classes: SpiceMap::new(), interfaces: SpiceMap::new() }
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_scope(&mut self, name: &str, parent: &str) {
        if !self.scopes.contains_key(&name.to_string()) {
            self.scopes.insert(name.to_string(), Scope::new(name.to_string(), Some(parent.to_string())));
        }
    }
}

/// Builds a [`SymbolTable`] from `module` in one traversal. Fails only on a
/// genuine class/interface name collision; everything else is registered
/// best-effort, matching the "builder never rejects a program" invariant.
pub fn build(module: &Module, file: &SourceFile) -> Result<SymbolTable, CompileError> {
    let mut builder = Builder {
        table: SymbolTable::new(),
        scope_stack: vec!["global".to_string()],
        diagnostics: Vec::new(),
        file: file.clone(),
    };
    for item in &module.items {
        builder.visit_item(item, None);
    }
    if builder.diagnostics.is_empty() {
        Ok(builder.table)
    } else {
        Err(CompileError::multiple(builder.diagnostics))
    }
}

struct Builder {
    table: SymbolTable,
    scope_stack: Vec<String>,
    diagnostics: Vec<CompileError>,
    file: SourceFile,
}

impl Builder {
    fn current_scope(&self) -> String {
        self.scope_stack.last().cloned().unwrap_or_else(|| "global".to_string())
    }

    fn push_scope(&mut self, name: String) {
        let parent = self.current_scope();
        self.table.ensure_scope(&name, &parent);
        self.scope_stack.push(name);
    }

    fn pop_scope(&mut self) {
        if self.scope_stack.len() > 1 {
            self.scope_stack.pop();
        }
    }

    fn add_variable(&mut self, name: &str, type_annotation: Option<String>, span: Span) {
        let scope_name = self.current_scope();
        let symbol = VariableSymbol::new(name.to_string(), type_annotation, span);
        if let Some(scope) = self.table.scopes.get_mut(&scope_name) {
            scope.variables.insert(name.to_string(), symbol);
        }
    }

    fn add_function(&mut self, func: &FunctionDecl, owner_scope: Option<&str>) -> FunctionSymbol {
        let scope_name = owner_scope.map(str::to_string).unwrap_or_else(|| self.current_scope());
        if !self.table.scopes.contains_key(&scope_name) {
            let parent = self.current_scope();
            self.table.ensure_scope(&scope_name, &parent);
        }
        let symbol = FunctionSymbol {
            name: func.name.clone(),
            params: func.params.clone(),
            return_type: func.return_type.clone(),
            span: func.span.clone(),
            scope: scope_name.clone(),
        };
        if let Some(scope) = self.table.scopes.get_mut(&scope_name) {
            scope.functions.entry_or_default(func.name.clone()).push(symbol.clone());
        }
        symbol
    }

    fn register_class_symbol(&mut self, name: &str, span: &Span, type_parameters: Vec<String>) {
        let symbol = ClassSymbol { name: name.to_string(), span: span.clone(), scope: self.current_scope(), methods: SpiceMap::new(), type_parameters };
        if self.table.classes.insert(name.to_string(), symbol).is_some() {
            self.diagnostics.push(CompileError::symbol(format!("Class '{name}' is already defined"), span.range(), &self.file));
        }
    }

    fn visit_item(&mut self, item: &Item, owner_scope: Option<&str>) {
        match item {
            Item::Interface(decl) => self.visit_interface(decl),
            Item::Class(decl) => self.visit_class(decl),
            Item::DataClass(decl) => self.visit_data_class(decl),
            Item::Enum(decl) => self.visit_enum(decl),
            Item::Function(decl) => self.visit_function(decl, owner_scope),
            Item::Stmt(stmt) => self.visit_statement(stmt),
        }
    }

    fn visit_interface(&mut self, node: &crate::ast::InterfaceDecl) {
        let symbol = InterfaceSymbol { name: node.name.clone(), span: node.span.clone(), scope: self.current_scope() };
        if self.table.interfaces.insert(node.name.clone(), symbol).is_some() {
            self.diagnostics.push(CompileError::symbol(format!("Interface '{}' is already defined", node.name), node.span.range(), &self.file));
        }
    }

    fn visit_class(&mut self, node: &ClassDecl) {
        let type_param_names = node.type_params.iter().map(|tp| tp.name.clone()).collect();
        self.register_class_symbol(&node.name, &node.span, type_param_names);

        let class_scope = node.name.clone();
        self.push_scope(class_scope.clone());
        for member in &node.body {
            self.visit_class_member(member, &class_scope);
        }
        self.pop_scope();
    }

    fn visit_data_class(&mut self, node: &DataClassDecl) {
        let type_param_names = node.type_params.iter().map(|tp| tp.name.clone()).collect();
        self.register_class_symbol(&node.name, &node.span, type_param_names);

        let class_scope = node.name.clone();
        self.push_scope(class_scope.clone());
        for field in &node.fields {
            self.add_variable(&field.name, field.type_annotation.clone(), field.span.clone());
        }
        for member in &node.body {
            self.visit_class_member(member, &class_scope);
        }
        self.pop_scope();
    }

    fn visit_enum(&mut self, node: &EnumDecl) {
        self.register_class_symbol(&node.name, &node.span, Vec::new());

        let class_scope = node.name.clone();
        self.push_scope(class_scope.clone());
        for member in &node.body {
            self.visit_class_member(member, &class_scope);
        }
        self.pop_scope();
    }

    fn visit_class_member(&mut self, member: &Item, class_scope: &str) {
        if let Item::Function(func) = member {
            let method_symbol = self.add_function(func, Some(class_scope));
            if let Some(class_symbol) = self.table.classes.get_mut(class_scope) {
                class_symbol.methods.entry_or_default(func.name.clone()).push(method_symbol);
            }
            self.visit_function(func, Some(class_scope));
        } else {
            self.visit_item(member, Some(class_scope));
        }
    }

    fn function_scope_name(node: &FunctionDecl, owner_scope: Option<&str>) -> String {
        match owner_scope {
            Some(owner) => format!("{owner}.{}", node.name),
            None => node.name.clone(),
        }
    }

    fn visit_function(&mut self, node: &FunctionDecl, owner_scope: Option<&str>) {
        if owner_scope.is_none() {
            self.add_function(node, None);
        }

        let scope_name = Self::function_scope_name(node, owner_scope);
        self.push_scope(scope_name);
        for param in &node.params {
            self.add_variable(&param.name, param.type_annotation.clone(), param.span.clone());
        }
        if let Some(body) = &node.body {
            for stmt in body {
                self.visit_statement(stmt);
            }
        }
        self.pop_scope();
    }

    /// Recurses into control-flow bodies the way the original's generic
    /// `hasattr(node, "body")` fallback does, without opening a new scope
    /// for them — `if`/`while`/`for`/`switch` share their enclosing
    /// function's scope.
    fn visit_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Expression(expr_stmt) => self.visit_expression_statement(expr_stmt),
            Statement::Final(final_decl) => self.register_final_declaration(final_decl),
            Statement::If(s) => {
                for st in &s.then {
                    self.visit_statement(st);
                }
                if let Some(or_else) = &s.or_else {
                    for st in or_else {
                        self.visit_statement(st);
                    }
                }
            }
            Statement::While(s) => {
                for st in &s.body {
                    self.visit_statement(st);
                }
            }
            Statement::For(s) => {
                for st in &s.body {
                    self.visit_statement(st);
                }
            }
            Statement::Switch(s) => {
                for case in &s.cases {
                    for st in &case.body {
                        self.visit_statement(st);
                    }
                }
                if let Some(default) = &s.default {
                    for st in default {
                        self.visit_statement(st);
                    }
                }
            }
            Statement::Pass(_) | Statement::Return(_) | Statement::Raise(_) | Statement::Import(_) => {}
        }
    }

    fn visit_expression_statement(&mut self, stmt: &crate::ast::ExpressionStatement) {
        if let Expr::Assignment(assignment) = &stmt.expr {
            if assignment.type_annotation.is_some() {
                if let Expr::Identifier(ident) = assignment.target.as_ref() {
                    self.add_variable(&ident.name, assignment.type_annotation.clone(), assignment.span.clone());
                }
            } else {
                self.maybe_infer_assignment(assignment);
            }
        }
    }

    fn register_final_declaration(&mut self, node: &FinalDeclaration) {
        self.add_variable(&node.target, node.type_annotation.clone(), node.span.clone());
    }

    fn maybe_infer_assignment(&mut self, node: &Assignment) {
        let Expr::Identifier(target) = node.target.as_ref() else { return };
        let Some(value) = node.value.as_deref() else { return };

        let inferred_type = match value {
            Expr::Call(call) => self.infer_call_type(call),
            Expr::Literal(literal) => Self::literal_to_type(literal.literal_type),
            _ => None,
        };

        if let Some(inferred_type) = inferred_type {
            self.add_variable(&target.name, Some(inferred_type), node.span.clone());
        }
    }

    fn infer_call_type(&self, call: &crate::ast::Call) -> Option<String> {
        if let Expr::Identifier(callee) = call.callee.as_ref() {
            if self.table.classes.contains_key(&callee.name) {
                return Some(callee.name.clone());
            }
        }
        None
    }

    fn literal_to_type(kind: LiteralKind) -> Option<String> {
        match kind {
            LiteralKind::Str => Some("str".to_string()),
            LiteralKind::Number => Some("int".to_string()),
            LiteralKind::Bool => Some("bool".to_string()),
            LiteralKind::None_ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn build_table(code: &str) -> SymbolTable {
        let file = SourceFile::in_memory(code.to_string());
        let tokens = tokenize(&file).unwrap();
        let module = parse(tokens, &file).unwrap();
        build(&module, &file).unwrap()
    }

    #[test]
    fn registers_class_and_method_scope() {
        let table = build_table("class Person {\n    def greet(self) -> None {\n        pass;\n    }\n}\n");
        assert!(table.classes.contains_key(&"Person".to_string()));
        assert!(table.scopes.contains_key(&"Person".to_string()));
        assert!(table.scopes.contains_key(&"Person.greet".to_string()));
        let class_symbol = table.classes.get(&"Person".to_string()).unwrap();
        assert!(class_symbol.methods.contains_key(&"greet".to_string()));
    }

    #[test]
    fn registers_parameters_and_annotated_assignment() {
        let table = build_table("def f(x: int) -> None {\n    y: str = \"hi\";\n}\n");
        let fn_scope = table.scopes.get(&"f".to_string()).unwrap();
        assert_eq!(fn_scope.variables.get(&"x".to_string()).unwrap().type_annotation.as_deref(), Some("int"));
        assert_eq!(fn_scope.variables.get(&"y".to_string()).unwrap().type_annotation.as_deref(), Some("str"));
    }

    #[test]
    fn infers_literal_and_constructor_call_types() {
        let table = build_table("class Point {\n    def Point(self) -> None {\n        pass;\n    }\n}\ndef f() -> None {\n    a = 1;\n    p = Point();\n}\n");
        let fn_scope = table.scopes.get(&"f".to_string()).unwrap();
        assert_eq!(fn_scope.variables.get(&"a".to_string()).unwrap().type_annotation.as_deref(), Some("int"));
        assert_eq!(fn_scope.variables.get(&"p".to_string()).unwrap().type_annotation.as_deref(), Some("Point"));
    }

    #[test]
    fn duplicate_class_name_reports_symbol_error() {
        let file = SourceFile::in_memory("class A {}\nclass A {}\n".to_string());
        let tokens = tokenize(&file).unwrap();
        let module = parse(tokens, &file).unwrap();
        let err = build(&module, &file).unwrap_err();
        assert!(matches!(err, CompileError::Multiple(_)));
    }

    #[test]
    fn registers_data_class_fields_and_enum_scope() {
        let table = build_table("data class Point(x: int, y: int);\nenum Color { RED, GREEN }\n");
        let point_scope = table.scopes.get(&"Point".to_string()).unwrap();
        assert!(point_scope.variables.contains_key(&"x".to_string()));
        assert!(point_scope.variables.contains_key(&"y".to_string()));
        assert!(table.classes.contains_key(&"Color".to_string()));
    }

    #[test]
    fn final_declaration_registers_variable() {
        let table = build_table("def f() -> None {\n    final a: int = 1;\n}\n");
        let fn_scope = table.scopes.get(&"f".to_string()).unwrap();
        assert_eq!(fn_scope.variables.get(&"a".to_string()).unwrap().type_annotation.as_deref(), Some("int"));
    }
}
