//! Call-site argument checking and assignment-annotation enforcement.
//!
//! This pass reads the already-built [`SymbolTable`] (it never mutates the
//! AST or the table) and walks every call expression and every un-annotated
//! assignment in the module. A call is accepted if at least one overload
//! registered for its callee matches the inferred argument types, with
//! generic class type parameters inferred per call-site and remembered per
//! variable for later calls on the same receiver.

use std::collections::HashMap;

use crate::ast::{Assignment, Call, Expr, ExpressionStatement, Item, Module, Parameter, Statement};
use crate::error::CompileError;
use crate::file::SourceFile;
use crate::symbol_table::{FunctionSymbol, SymbolTable};

pub fn check(module: &Module, table: &SymbolTable, file: &SourceFile) -> Result<(), CompileError> {
    let mut checker = Checker {
        table,
        file: file.clone(),
        scope_stack: vec!["global".to_string()],
        generic_bindings: HashMap::new(),
        diagnostics: Vec::new(),
    };
    for item in &module.items {
        checker.visit_item(item);
    }
    if checker.diagnostics.is_empty() {
        Ok(())
    } else {
        Err(CompileError::multiple(checker.diagnostics))
    }
}

struct Checker<'a> {
    table: &'a SymbolTable,
    file: SourceFile,
    scope_stack: Vec<String>,
    generic_bindings: HashMap<String, HashMap<String, String>>,
    diagnostics: Vec<CompileError>,
}

impl<'a> Checker<'a> {
    fn current_scope(&self) -> &str {
        self.scope_stack.last().map(String::as_str).unwrap_or("global")
    }

    fn push_scope(&mut self, name: String) {
        self.scope_stack.push(name);
    }

    fn pop_scope(&mut self) {
        if self.scope_stack.len() > 1 {
            self.scope_stack.pop();
        }
    }

    fn visit_item(&mut self, item: &Item) {
        match item {
            Item::Class(c) => self.visit_container(&c.name, &c.body),
            Item::DataClass(d) => self.visit_container(&d.name, &d.body),
            Item::Enum(e) => self.visit_container(&e.name, &e.body),
            Item::Interface(_) => {}
            Item::Function(f) => self.visit_function(f),
            Item::Stmt(s) => self.visit_statement(s),
        }
    }

    fn visit_container(&mut self, name: &str, body: &[Item]) {
        self.push_scope(name.to_string());
        for item in body {
            self.visit_item(item);
        }
        self.pop_scope();
    }

    fn visit_function(&mut self, func: &crate::ast::FunctionDecl) {
        let scope_name =
            if self.current_scope() == "global" { func.name.clone() } else { format!("{}.{}", self.current_scope(), func.name) };
        self.push_scope(scope_name);
        if let Some(body) = &func.body {
            for stmt in body {
                self.visit_statement(stmt);
            }
        }
        self.pop_scope();
    }

    fn visit_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Expression(es) => self.visit_expression_statement(es),
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
            Statement::Pass(_) | Statement::Return(_) | Statement::Raise(_) | Statement::Import(_) | Statement::Final(_) => {}
        }
    }

    fn visit_expression_statement(&mut self, stmt: &ExpressionStatement) {
        match &stmt.expr {
            Expr::Call(call) => self.check_call(call, stmt),
            Expr::Assignment(assignment) if assignment.type_annotation.is_none() => self.visit_assignment(assignment, stmt),
            _ => {}
        }
    }

    fn visit_assignment(&mut self, assignment: &Assignment, stmt: &ExpressionStatement) {
        if let Some(value) = assignment.value.as_deref() {
            if let Expr::Call(call) = value {
                self.check_call(call, stmt);
            }
        }
        self.enforce_assignment_annotation(assignment, stmt);
    }

    /// `(functions, owner_class, receiver_variable)` for a call's callee, or
    /// `None` if the callee isn't something this pass tracks (e.g. a
    /// constructor call, which bare identifier resolution deliberately
    /// leaves unvalidated since class names never live in a scope's function
    /// table).
    fn resolve_callee(&self, call: &Call) -> Option<(Vec<FunctionSymbol>, Option<String>, Option<String>)> {
        match call.callee.as_ref() {
            Expr::Identifier(ident) => {
                let scope = self.table.scopes.get(&"global".to_string())?;
                let funcs = scope.functions.get(&ident.name).cloned().unwrap_or_default();
                Some((funcs, None, None))
            }
            Expr::Attribute(attr) => {
                let obj_type = self.infer_expression_type(&attr.object)?;
                let var_name = if let Expr::Identifier(ident) = attr.object.as_ref() { Some(ident.name.clone()) } else { None };
                let class_symbol = self.table.classes.get(&obj_type)?;
                let funcs = class_symbol.methods.get(&attr.attribute).cloned().unwrap_or_default();
                Some((funcs, Some(obj_type), var_name))
            }
            _ => None,
        }
    }

    fn check_call(&mut self, call: &Call, stmt: &ExpressionStatement) {
        let Some((functions, owner, var_name)) = self.resolve_callee(call) else { return };
        if functions.is_empty() {
            return;
        }

        let arg_types: Vec<Option<String>> = call.arguments.iter().map(|arg| self.infer_expression_type(&arg.value)).collect();

        let mut type_params: Vec<String> = Vec::new();
        let mut existing_bindings: HashMap<String, String> = HashMap::new();
        if let Some(owner_name) = &owner {
            if let Some(class_symbol) = self.table.classes.get(owner_name) {
                type_params = class_symbol.type_parameters.clone();
            }
            if let Some(name) = &var_name {
                if let Some(bindings) = self.generic_bindings.get(name) {
                    existing_bindings = bindings.clone();
                }
            }
        }

        for func in &functions {
            if let Some(new_bindings) = arguments_match_generic(&arg_types, &func.params, &type_params, &existing_bindings) {
                if let Some(name) = &var_name {
                    if !new_bindings.is_empty() {
                        self.generic_bindings.entry(name.clone()).or_default().extend(new_bindings);
                    }
                }
                return;
            }
        }

        let arg_desc = arg_types.iter().map(|t| t.clone().unwrap_or_else(|| "None".to_string())).collect::<Vec<_>>().join(", ");
        let owner_desc = owner.map(|o| format!("{o}.")).unwrap_or_default();
        self.diagnostics.push(CompileError::type_check(
            format!("No overload of {owner_desc}{} matches argument types ({arg_desc})", functions[0].name),
            stmt.span.range(),
            &self.file,
        ));
    }

    fn enforce_assignment_annotation(&mut self, assignment: &Assignment, stmt: &ExpressionStatement) {
        let Expr::Identifier(target) = assignment.target.as_ref() else { return };

        if let Some(symbol) = self.lookup_variable(&target.name) {
            if symbol.type_annotation.is_some() {
                return;
            }
        }

        match assignment.value.as_deref() {
            Some(Expr::Literal(_)) => return,
            Some(Expr::Call(call)) if self.is_constructor_call(call) => return,
            _ => {}
        }

        self.diagnostics.push(CompileError::type_check(
            format!("Variable '{}' must declare a type annotation when assigned from non-literal expression", target.name),
            stmt.span.range(),
            &self.file,
        ));
    }

    fn is_constructor_call(&self, call: &Call) -> bool {
        matches!(call.callee.as_ref(), Expr::Identifier(ident) if self.table.classes.contains_key(&ident.name))
    }

    fn lookup_variable(&self, name: &str) -> Option<&crate::symbol_table::VariableSymbol> {
        let mut scope_name = self.current_scope().to_string();
        loop {
            let scope = self.table.scopes.get(&scope_name)?;
            if let Some(symbol) = scope.variables.get(&name.to_string()) {
                return Some(symbol);
            }
            scope_name = scope.parent.clone()?;
        }
    }

    fn infer_expression_type(&self, expr: &Expr) -> Option<String> {
        match expr {
            Expr::Identifier(ident) => self.lookup_variable(&ident.name).and_then(|s| s.type_annotation.clone()),
            Expr::Literal(lit) => literal_to_type(lit),
            Expr::Call(call) => self.infer_call_return(call),
            Expr::Attribute(attr) => self.infer_attribute_type(attr),
            _ => None,
        }
    }

    fn infer_call_return(&self, call: &Call) -> Option<String> {
        match call.callee.as_ref() {
            Expr::Identifier(ident) => {
                if self.table.classes.contains_key(&ident.name) {
                    return Some(ident.name.clone());
                }
                let scope = self.table.scopes.get(&"global".to_string())?;
                scope.functions.get(&ident.name)?.iter().find_map(|f| f.return_type.clone())
            }
            Expr::Attribute(attr) => {
                let obj_type = self.infer_expression_type(&attr.object)?;
                let class_symbol = self.table.classes.get(&obj_type)?;
                class_symbol.methods.get(&attr.attribute)?.iter().find_map(|f| f.return_type.clone())
            }
            _ => None,
        }
    }

    fn infer_attribute_type(&self, attr: &crate::ast::Attribute) -> Option<String> {
        let obj_type = self.infer_expression_type(&attr.object)?;
        let class_symbol = self.table.classes.get(&obj_type)?;
        let vars_scope = self.table.scopes.get(&class_symbol.name)?;
        vars_scope.variables.get(&attr.attribute).and_then(|s| s.type_annotation.clone())
    }
}

fn literal_to_type(literal: &crate::ast::Literal) -> Option<String> {
    use crate::ast::LiteralKind;
    match literal.literal_type {
        LiteralKind::Str => Some("str".to_string()),
        LiteralKind::Number => Some("int".to_string()),
        LiteralKind::Bool => Some("bool".to_string()),
        LiteralKind::None_ => None,
    }
}

fn arguments_match_generic(
    arg_types: &[Option<String>],
    params: &[Parameter],
    type_params: &[String],
    existing_bindings: &HashMap<String, String>,
) -> Option<HashMap<String, String>> {
    if arg_types.len() != params.len() {
        return None;
    }

    let mut inferred = existing_bindings.clone();
    for (arg_type, param) in arg_types.iter().zip(params) {
        let param_type = param.type_annotation.as_ref()?;
        let arg_type = arg_type.as_ref()?;

        if type_params.contains(param_type) {
            match inferred.get(param_type) {
                Some(bound) if bound != arg_type => return None,
                Some(_) => {}
                None => {
                    inferred.insert(param_type.clone(), arg_type.clone());
                }
            }
        } else if arg_type != param_type {
            return None;
        }
    }

    Some(inferred.into_iter().filter(|(k, _)| !existing_bindings.contains_key(k)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use crate::symbol_table::build;

    fn check_source(source: &str) -> Result<(), CompileError> {
        let file = SourceFile::in_memory(source.to_string());
        let tokens = tokenize(&file).expect("lex");
        let module = parse(tokens, &file).expect("parse");
        let table = build(&module, &file).expect("symbol table");
        check(&module, &table, &file)
    }

    #[test]
    fn matching_call_passes() {
        let result = check_source("def greet(name: str) -> str { return name; }\ngreet(\"hi\");\n");
        assert!(result.is_ok());
    }

    #[test]
    fn mismatched_call_is_rejected() {
        let result = check_source("def greet(name: str) -> str { return name; }\ngreet(1);\n");
        assert!(result.is_err());
    }

    #[test]
    fn untyped_assignment_from_non_literal_is_rejected() {
        let result = check_source("def make() -> int { return 1; }\nx = make();\n");
        assert!(result.is_err());
    }

    #[test]
    fn untyped_assignment_from_literal_is_accepted() {
        let result = check_source("x = 1;\n");
        assert!(result.is_ok());
    }

    #[test]
    fn untyped_assignment_from_constructor_call_is_accepted() {
        let result = check_source("class Point {\n    def Point(self, x: int) {\n        self.x = x;\n    }\n}\np = Point(1);\n");
        assert!(result.is_ok());
    }
}
