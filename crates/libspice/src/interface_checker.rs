//! `implements` conformance checking.
//!
//! Interfaces and classes are collected from the module's top level in one
//! pass; a second pass checks, for every interface a class claims to
//! implement, that the class defines a method of the same name whose
//! parameter types match exactly (excluding the implicit `self` receiver)
//! and whose return type matches too.

use std::collections::HashMap;

use crate::ast::{ClassDecl, FunctionDecl, InterfaceDecl, Item, MethodSig, Module, Parameter};
use crate::error::CompileError;
use crate::file::SourceFile;

pub fn check(module: &Module, file: &SourceFile) -> Result<(), CompileError> {
    let mut interfaces: HashMap<String, &InterfaceDecl> = HashMap::new();
    let mut classes: HashMap<String, &ClassDecl> = HashMap::new();

    for item in &module.items {
        match item {
            Item::Interface(decl) => {
                interfaces.insert(decl.name.clone(), decl);
            }
            Item::Class(decl) => {
                classes.insert(decl.name.clone(), decl);
            }
            _ => {}
        }
    }

    let mut diagnostics = Vec::new();
    for class_decl in classes.values() {
        for interface_name in &class_decl.interfaces {
            check_implementation(class_decl, interface_name, &interfaces, file, &mut diagnostics);
        }
    }

    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(CompileError::multiple(diagnostics))
    }
}

fn param_signature(params: &[Parameter]) -> Vec<String> {
    params.iter().map(|p| p.type_annotation.clone().unwrap_or_else(|| "Any".to_string())).collect()
}

fn method_param_signature(method: &FunctionDecl) -> Vec<String> {
    let params: Vec<&Parameter> = method.params.iter().filter(|p| p.name != "self").collect();
    params.iter().map(|p| p.type_annotation.clone().unwrap_or_else(|| "Any".to_string())).collect()
}

fn format_params(params: &[Parameter]) -> String {
    params.iter().map(|p| format!("{}: {}", p.name, p.type_annotation.as_deref().unwrap_or("None"))).collect::<Vec<_>>().join(", ")
}

fn check_implementation(
    class_decl: &ClassDecl,
    interface_name: &str,
    interfaces: &HashMap<String, &InterfaceDecl>,
    file: &SourceFile,
    diagnostics: &mut Vec<CompileError>,
) {
    let Some(interface) = interfaces.get(interface_name) else {
        diagnostics.push(CompileError::interface(
            format!("Class '{}' implements unknown interface '{interface_name}'", class_decl.name),
            class_decl.span.range(),
            file,
        ));
        return;
    };

    let mut class_methods: HashMap<String, Vec<(Vec<String>, &FunctionDecl)>> = HashMap::new();
    for member in &class_decl.body {
        if let Item::Function(method) = member {
            class_methods.entry(method.name.clone()).or_default().push((method_param_signature(method), method));
        }
    }

    for method_sig in &interface.methods {
        check_method_implementation(class_decl, interface_name, method_sig, &class_methods, file, diagnostics);
    }
}

fn check_method_implementation(
    class_decl: &ClassDecl,
    interface_name: &str,
    method_sig: &MethodSig,
    class_methods: &HashMap<String, Vec<(Vec<String>, &FunctionDecl)>>,
    file: &SourceFile,
    diagnostics: &mut Vec<CompileError>,
) {
    let expected_param_sig = param_signature(&method_sig.params);

    let Some(candidates) = class_methods.get(&method_sig.name) else {
        diagnostics.push(CompileError::interface(
            format!("Class '{}' does not implement method '{}' required by interface '{interface_name}'", class_decl.name, method_sig.name),
            class_decl.span.range(),
            file,
        ));
        return;
    };

    let matching_impl = candidates.iter().find(|(sig, _)| sig == &expected_param_sig).map(|(_, method)| *method);

    let Some(matching_impl) = matching_impl else {
        diagnostics.push(CompileError::interface(
            format!(
                "Class '{}' does not implement method '{}({})' required by interface '{interface_name}'",
                class_decl.name,
                method_sig.name,
                format_params(&method_sig.params),
            ),
            class_decl.span.range(),
            file,
        ));
        return;
    };

    if matching_impl.return_type != method_sig.return_type {
        diagnostics.push(CompileError::interface(
            format!(
                "Method '{}.{}({})' has return type '{}' but interface '{interface_name}' expects '{}'",
                class_decl.name,
                method_sig.name,
                format_params(&method_sig.params),
                matching_impl.return_type.as_deref().unwrap_or("None"),
                method_sig.return_type.as_deref().unwrap_or("None"),
            ),
            matching_impl.span.range(),
            file,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::SourceFile;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn check_source(source: &str) -> Result<(), CompileError> {
        let file = SourceFile::in_memory(source.to_string());
        let tokens = tokenize(&file).expect("lex");
        let module = parse(tokens, &file).expect("parse");
        check(&module, &file)
    }

    #[test]
    fn conforming_class_passes() {
        let source = "interface Greeter {\n    def greet(name: str) -> str;\n}\nclass Person implements Greeter {\n    def greet(self, name: str) -> str {\n        return name;\n    }\n}\n";
        assert!(check_source(source).is_ok());
    }

    #[test]
    fn missing_method_is_rejected() {
        let source = "interface Greeter {\n    def greet(name: str) -> str;\n}\nclass Person implements Greeter {\n}\n";
        assert!(check_source(source).is_err());
    }

    #[test]
    fn wrong_return_type_is_rejected() {
        let source = "interface Greeter {\n    def greet(name: str) -> str;\n}\nclass Person implements Greeter {\n    def greet(self, name: str) -> int {\n        return 1;\n    }\n}\n";
        assert!(check_source(source).is_err());
    }

    #[test]
    fn unknown_interface_is_rejected() {
        let source = "class Person implements Nope {\n}\n";
        assert!(check_source(source).is_err());
    }
}
