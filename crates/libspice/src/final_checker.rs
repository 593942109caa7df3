//! Final-use checking: reassignment of `final` variables and overriding of
//! `final` methods.
//!
//! Two independent checks share one traversal. First, every `final x = ...`
//! declaration registers `x` in its enclosing scope (or globally, visible
//! from every nested scope); any later plain assignment to that name is
//! rejected. Second, for every class, the set of `final` methods inherited
//! from its base classes (walked transitively, cycle-safe) is compared
//! against the class's own method names.

use std::collections::{HashMap, HashSet};

use crate::ast::{ClassDecl, DataClassDecl, EnumDecl, Expr, Item, Module, Statement};
use crate::error::CompileError;
use crate::file::SourceFile;

pub fn check(module: &Module, file: &SourceFile) -> Result<(), CompileError> {
    let mut classes: HashMap<String, ClassMeta> = HashMap::new();
    collect_class_metadata(&module.items, &mut classes);

    let mut checker = Checker { file: file.clone(), final_vars: HashMap::new(), current_scope: "global".to_string(), diagnostics: Vec::new(), classes };
    for item in &module.items {
        checker.visit_item(item);
    }

    if checker.diagnostics.is_empty() {
        Ok(())
    } else {
        Err(CompileError::multiple(checker.diagnostics))
    }
}

struct ClassMeta {
    bases: Vec<String>,
    final_methods: HashSet<String>,
}

fn collect_class_metadata(items: &[Item], classes: &mut HashMap<String, ClassMeta>) {
    for item in items {
        match item {
            Item::Class(c) => {
                let final_methods = c
                    .body
                    .iter()
                    .filter_map(|member| if let Item::Function(f) = member { if f.is_final { Some(f.name.clone()) } else { None } } else { None })
                    .collect();
                classes.insert(c.name.clone(), ClassMeta { bases: c.bases.clone(), final_methods });
                collect_class_metadata(&c.body, classes);
            }
            Item::DataClass(DataClassDecl { body, .. }) => collect_class_metadata(body, classes),
            Item::Enum(EnumDecl { body, .. }) => collect_class_metadata(body, classes),
            _ => {}
        }
    }
}

fn collect_final_methods_from_base(base_name: &str, classes: &HashMap<String, ClassMeta>, visited: &mut HashSet<String>) -> HashMap<String, String> {
    if visited.contains(base_name) {
        return HashMap::new();
    }
    visited.insert(base_name.to_string());

    let mut methods = HashMap::new();
    let Some(meta) = classes.get(base_name) else { return methods };

    for name in &meta.final_methods {
        methods.insert(name.clone(), base_name.to_string());
    }
    for ancestor in &meta.bases {
        let ancestor_methods = collect_final_methods_from_base(ancestor, classes, visited);
        for (name, origin) in ancestor_methods {
            methods.entry(name).or_insert(origin);
        }
    }
    methods
}

fn collect_inherited_final_methods(class_meta: &ClassMeta, classes: &HashMap<String, ClassMeta>) -> HashMap<String, String> {
    let mut inherited = HashMap::new();
    for base in &class_meta.bases {
        let mut visited = HashSet::new();
        let base_methods = collect_final_methods_from_base(base, classes, &mut visited);
        for (name, origin) in base_methods {
            inherited.entry(name).or_insert(origin);
        }
    }
    inherited
}

struct Checker {
    file: SourceFile,
    final_vars: HashMap<String, HashSet<String>>,
    current_scope: String,
    diagnostics: Vec<CompileError>,
    classes: HashMap<String, ClassMeta>,
}

impl Checker {
    fn register_final(&mut self, name: &str) {
        self.final_vars.entry(self.current_scope.clone()).or_default().insert(name.to_string());
    }

    fn check_assignment(&mut self, name: &str, range: std::ops::Range<usize>) {
        let in_scope = self.final_vars.get(&self.current_scope).is_some_and(|names| names.contains(name));
        let in_global = self.final_vars.get("global").is_some_and(|names| names.contains(name));
        if in_scope || in_global {
            self.diagnostics.push(CompileError::final_check(format!("Cannot reassign final variable '{name}'"), range, &self.file));
        }
    }

    fn visit_item(&mut self, item: &Item) {
        match item {
            Item::Function(f) => {
                let old_scope = self.current_scope.clone();
                self.current_scope = f.name.clone();
                if let Some(body) = &f.body {
                    for stmt in body {
                        self.visit_statement(stmt);
                    }
                }
                self.current_scope = old_scope;
            }
            Item::Class(c) => {
                let old_scope = self.current_scope.clone();
                self.current_scope = c.name.clone();
                self.check_final_overrides(c);
                for member in &c.body {
                    self.visit_item(member);
                }
                self.current_scope = old_scope;
            }
            Item::DataClass(d) => {
                let old_scope = self.current_scope.clone();
                self.current_scope = d.name.clone();
                for member in &d.body {
                    self.visit_item(member);
                }
                self.current_scope = old_scope;
            }
            Item::Enum(e) => {
                let old_scope = self.current_scope.clone();
                self.current_scope = e.name.clone();
                for member in &e.body {
                    self.visit_item(member);
                }
                self.current_scope = old_scope;
            }
            Item::Interface(_) => {}
            Item::Stmt(s) => self.visit_statement(s),
        }
    }

    fn check_final_overrides(&mut self, class_decl: &ClassDecl) {
        let Some(meta) = self.classes.get(&class_decl.name) else { return };
        let inherited = collect_inherited_final_methods(meta, &self.classes);
        if inherited.is_empty() {
            return;
        }
        for member in &class_decl.body {
            if let Item::Function(f) = member {
                if let Some(origin) = inherited.get(&f.name) {
                    self.diagnostics.push(CompileError::final_check(
                        format!("Class '{}' cannot override final method '{}' defined in '{origin}'", class_decl.name, f.name),
                        f.span.range(),
                        &self.file,
                    ));
                }
            }
        }
    }

    fn visit_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Final(fd) => self.register_final(&fd.target),
            Statement::Expression(es) => self.visit_expr(&es.expr),
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

    fn visit_expr(&mut self, expr: &Expr) {
        if let Expr::Assignment(assignment) = expr {
            if let Expr::Identifier(ident) = assignment.target.as_ref() {
                self.check_assignment(&ident.name, assignment.span.range());
            }
        }

        match expr {
            Expr::Assignment(a) => {
                if let Some(value) = &a.value {
                    self.visit_expr(value);
                }
            }
            Expr::Attribute(a) => self.visit_expr(&a.object),
            Expr::Call(c) => {
                self.visit_expr(&c.callee);
                for arg in &c.arguments {
                    self.visit_expr(&arg.value);
                }
            }
            Expr::Logical(l) => {
                self.visit_expr(&l.left);
                self.visit_expr(&l.right);
            }
            Expr::Unary(u) => self.visit_expr(&u.operand),
            Expr::Binary(b) => {
                self.visit_expr(&b.left);
                self.visit_expr(&b.right);
            }
            Expr::Lambda(l) => self.visit_expr(&l.body),
            Expr::DictEntry(d) => {
                self.visit_expr(&d.key);
                self.visit_expr(&d.value);
            }
            Expr::Subscript(s) => {
                self.visit_expr(&s.object);
                self.visit_expr(&s.index);
            }
            Expr::Slice(s) => {
                if let Some(e) = &s.start {
                    self.visit_expr(e);
                }
                if let Some(e) = &s.stop {
                    self.visit_expr(e);
                }
                if let Some(e) = &s.step {
                    self.visit_expr(e);
                }
            }
            Expr::Comprehension(c) => {
                self.visit_expr(&c.element);
                self.visit_expr(&c.iter);
                if let Some(cond) = &c.condition {
                    self.visit_expr(cond);
                }
                if let Some(key) = &c.key {
                    self.visit_expr(key);
                }
            }
            Expr::ListLiteral(l) => l.elements.iter().for_each(|e| self.visit_expr(e)),
            Expr::TupleLiteral(l) => l.elements.iter().for_each(|e| self.visit_expr(e)),
            Expr::SetLiteral(l) => l.elements.iter().for_each(|e| self.visit_expr(e)),
            Expr::DictLiteral(l) => {
                for entry in &l.entries {
                    self.visit_expr(&entry.key);
                    self.visit_expr(&entry.value);
                }
            }
            Expr::Identifier(_) | Expr::Literal(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn check_source(source: &str) -> Result<(), CompileError> {
        let file = SourceFile::in_memory(source.to_string());
        let tokens = tokenize(&file).expect("lex");
        let module = parse(tokens, &file).expect("parse");
        check(&module, &file)
    }

    #[test]
    fn reassigning_final_variable_is_rejected() {
        let result = check_source("final x: int = 1;\nx = 2;\n");
        assert!(result.is_err());
    }

    #[test]
    fn reassigning_non_final_variable_is_accepted() {
        let result = check_source("x = 1;\nx = 2;\n");
        assert!(result.is_ok());
    }

    #[test]
    fn overriding_final_method_is_rejected() {
        let source = "class Base {\n    final def greet(self) -> None {\n        pass;\n    }\n}\nclass Child extends Base {\n    def greet(self) -> None {\n        pass;\n    }\n}\n";
        assert!(check_source(source).is_err());
    }
}
