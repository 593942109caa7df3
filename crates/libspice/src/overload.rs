//! Overload resolution: the `@dispatch` decorator strategy.
//!
//! Functions and methods sharing a name are grouped per owner (`__module__`
//! for module-level functions, the class name for methods) and given a
//! signature key built from their parameter type annotations (`any` for an
//! unannotated parameter). Each distinct signature gets a `@dispatch(...)`
//! decorator appended to its declaration so the transformer's target runtime
//! can pick the right overload at call time; a repeated signature within one
//! owner is a compile error rather than a silent shadow.

use indexmap::IndexMap;

use crate::ast::{ClassDecl, DataClassDecl, EnumDecl, FunctionDecl, Item, Module, Parameter};
use crate::error::CompileError;
use crate::file::SourceFile;
use crate::map::SpiceMap;

/// Owner key used for module-level (non-method) functions.
pub const MODULE_OWNER: &str = "__module__";

/// Maps owner name -> signature key -> the `@dispatch(...)` decorator text
/// assigned to that signature.
#[derive(Debug, Clone, Default)]
pub struct OverloadTable {
    owners: SpiceMap<String, SpiceMap<String, String>>,
}

impl OverloadTable {
    pub fn get(&self, owner: &str, signature_key: &str) -> Option<&String> {
        self.owners.get(&owner.to_string())?.get(&signature_key.to_string())
    }
}

/// Mutates `module`, appending a `@dispatch(...)` decorator to every
/// function/method that shares its name with at least one sibling, and
/// returns the table those decorators were drawn from.
pub fn resolve(module: &mut Module, file: &SourceFile) -> Result<OverloadTable, CompileError> {
    let mut table = OverloadTable::default();
    let mut diagnostics = Vec::new();

    let module_groups = group_by_name(&module.items);
    apply_overload_decorators(&mut module.items, module_groups, MODULE_OWNER, &mut table, &mut diagnostics, file);

    for item in module.items.iter_mut() {
        process_node(item, &mut table, &mut diagnostics, file);
    }

    if diagnostics.is_empty() {
        Ok(table)
    } else {
        Err(CompileError::multiple(diagnostics))
    }
}

fn group_by_name(items: &[Item]) -> IndexMap<String, Vec<usize>> {
    let mut groups: IndexMap<String, Vec<usize>> = IndexMap::new();
    for (index, item) in items.iter().enumerate() {
        if let Item::Function(func) = item {
            groups.entry(func.name.clone()).or_default().push(index);
        }
    }
    groups
}

/// Recurses looking for classes (the only owners the resolver groups
/// methods under), descending into any container body along the way so
/// nested classes are found too.
fn process_node(item: &mut Item, table: &mut OverloadTable, diagnostics: &mut Vec<CompileError>, file: &SourceFile) {
    if let Item::Class(class_decl) = item {
        process_class(class_decl, table, diagnostics, file);
    }
    if let Some(body) = item_body_mut(item) {
        for child in body.iter_mut() {
            process_node(child, table, diagnostics, file);
        }
    }
}

fn item_body_mut(item: &mut Item) -> Option<&mut Vec<Item>> {
    match item {
        Item::Class(ClassDecl { body, .. }) => Some(body),
        Item::DataClass(DataClassDecl { body, .. }) => Some(body),
        Item::Enum(EnumDecl { body, .. }) => Some(body),
        _ => None,
    }
}

fn process_class(class_decl: &mut ClassDecl, table: &mut OverloadTable, diagnostics: &mut Vec<CompileError>, file: &SourceFile) {
    let groups = group_by_name(&class_decl.body);
    apply_overload_decorators(&mut class_decl.body, groups, &class_decl.name, table, diagnostics, file);
}

fn apply_overload_decorators(
    items: &mut [Item],
    groups: IndexMap<String, Vec<usize>>,
    owner_name: &str,
    table: &mut OverloadTable,
    diagnostics: &mut Vec<CompileError>,
    file: &SourceFile,
) {
    for (method_name, indices) in groups {
        if indices.len() <= 1 {
            continue;
        }

        let signature_map = table.owners.entry_or_default(owner_name.to_string());
        let mut seen_signatures: Vec<String> = Vec::new();

        for index in indices {
            let Item::Function(method) = &mut items[index] else { continue };
            let (signature_key, type_names) = signature_key(&method_name, &method.params);

            if seen_signatures.contains(&signature_key) {
                let prefix = if owner_name != MODULE_OWNER { format!("{owner_name}.") } else { String::new() };
                diagnostics.push(CompileError::overload(
                    format!("Duplicate overload for {prefix}{method_name} with signature {signature_key}"),
                    method.span.range(),
                    file,
                ));
                continue;
            }
            seen_signatures.push(signature_key.clone());

            let decorator = build_dispatch_decorator(&type_names);
            if !method.decorators.contains(&decorator) {
                method.decorators.push(decorator.clone());
            }
            signature_map.insert(signature_key, decorator);
        }
    }
}

fn signature_key(base_name: &str, params: &[Parameter]) -> (String, Vec<String>) {
    let type_names: Vec<String> = params.iter().map(param_type_name).collect();
    let signature = if type_names.is_empty() {
        format!("{base_name}()")
    } else {
        format!("{base_name}({})", type_names.join(", "))
    };
    (signature, type_names)
}

fn param_type_name(param: &Parameter) -> String {
    param.type_annotation.clone().unwrap_or_else(|| "any".to_string())
}

fn build_dispatch_decorator(type_names: &[String]) -> String {
    if type_names.is_empty() {
        return "@dispatch()".to_string();
    }
    let args = type_names.iter().map(|name| dispatch_type_expr(name)).collect::<Vec<_>>().join(", ");
    format!("@dispatch({args})")
}

fn dispatch_type_expr(type_name: &str) -> String {
    if type_name.eq_ignore_ascii_case("any") {
        "object".to_string()
    } else if type_name == "None" {
        "type(None)".to_string()
    } else {
        type_name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::SourceFile;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn parse_module(source: &str) -> (Module, SourceFile) {
        let file = SourceFile::in_memory(source.to_string());
        let tokens = tokenize(&file).expect("lex");
        let module = parse(tokens, &file).expect("parse");
        (module, file)
    }

    #[test]
    fn distinct_signatures_each_get_a_dispatch_decorator() {
        let (mut module, file) = parse_module(
            "def describe(x: int) -> str { return \"int\"; }\ndef describe(x: str) -> str { return \"str\"; }\n",
        );
        let table = resolve(&mut module, &file).expect("resolve");
        assert!(table.get(MODULE_OWNER, "describe(int)").is_some());
        assert!(table.get(MODULE_OWNER, "describe(str)").is_some());

        let mut decorators = Vec::new();
        for item in &module.items {
            if let Item::Function(f) = item {
                decorators.extend(f.decorators.clone());
            }
        }
        assert!(decorators.contains(&"@dispatch(int)".to_string()));
        assert!(decorators.contains(&"@dispatch(str)".to_string()));
    }

    #[test]
    fn duplicate_signature_is_a_compile_error() {
        let (mut module, file) = parse_module(
            "def describe(x: int) -> str { return \"a\"; }\ndef describe(x: int) -> str { return \"b\"; }\n",
        );
        let result = resolve(&mut module, &file);
        assert!(result.is_err());
    }

    #[test]
    fn single_definition_gets_no_decorator() {
        let (mut module, file) = parse_module("def greet(name: str) -> str { return name; }\n");
        let table = resolve(&mut module, &file).expect("resolve");
        assert!(table.get(MODULE_OWNER, "greet(str)").is_none());
    }

    #[test]
    fn untyped_parameter_falls_back_to_any() {
        let (mut module, file) = parse_module(
            "def describe(x) -> str { return \"a\"; }\ndef describe(x: int) -> str { return \"b\"; }\n",
        );
        let table = resolve(&mut module, &file).expect("resolve");
        assert!(table.get(MODULE_OWNER, "describe(any)").is_some());
        assert!(table.get(MODULE_OWNER, "describe(int)").is_some());
    }
}
