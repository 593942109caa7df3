//! Integration tests for the Spice compiler
//!
//! These exercise the complete pipeline — lex, parse, every semantic pass,
//! and the `py`/`pyx` transformer — end to end from source text to target
//! text, the way a real `.spc` file would be compiled by `spicec`.

use libspice::compile::{compile_unit, CompilationUnit, CompileOptions, EmitTarget};
use libspice::error::CompileError;

fn compile_py(source: &str) -> String {
    compile(source, EmitTarget::Py)
}

fn compile_pyx(source: &str) -> String {
    compile(source, EmitTarget::Pyx)
}

fn compile(source: &str, emit: EmitTarget) -> String {
    let unit = CompilationUnit::in_memory(source.to_string());
    let options = CompileOptions { emit, ..CompileOptions::default() };
    let (_, outcome) = compile_unit(unit, &options);
    outcome.unwrap().expect("check was not requested, so output text was expected")
}

fn compile_err(source: &str) -> CompileError {
    let unit = CompilationUnit::in_memory(source.to_string());
    let options = CompileOptions::default();
    let (_, outcome) = compile_unit(unit, &options);
    outcome.unwrap_err()
}

#[test]
fn constructor_rename() {
    let out = compile_py("class Person {\n    def Person(self, name: str) -> None {\n        self.name = name;\n    }\n}\n");
    assert!(out.contains("def __init__(self, name: str) -> None:"), "{out}");
    assert!(!out.contains("def Person(self"), "{out}");
}

#[test]
fn super_shorthand_lowers_to_dunder_init() {
    let out = compile_py(
        "class Child extends Parent {\n    def Child(self, x: int, y: int) -> None {\n        super(x);\n        self.y = y;\n    }\n}\n",
    );
    assert!(out.contains("super().__init__(x)"), "{out}");
    assert!(!out.contains("super(x)"), "{out}");
}

#[test]
fn simple_enum_emits_python_enum() {
    let out = compile_py("enum Color {\n    RED,\n    GREEN,\n    BLUE\n}\n");
    assert!(out.contains("from enum import Enum, auto"), "{out}");
    assert!(out.contains("class Color(Enum):"), "{out}");
    assert!(out.contains("RED = auto()"), "{out}");
    assert!(out.contains("GREEN = auto()"), "{out}");
    assert!(out.contains("BLUE = auto()"), "{out}");
}

#[test]
fn generic_class_in_py_mode_gets_generic_and_typevar() {
    let out = compile_py("class Box<T> {\n    def get(self) -> T {\n        return self.value;\n    }\n}\n");
    assert!(out.contains("T = TypeVar('T')"), "{out}");
    assert!(out.contains("class Box(Generic[T]):"), "{out}");
}

#[test]
fn generic_class_in_pyx_mode_erases_generics() {
    let out = compile_pyx("class Box<T> {\n    def get(self) -> T {\n        return self.value;\n    }\n}\n");
    assert!(!out.contains("TypeVar"), "{out}");
    assert!(!out.contains("Generic["), "{out}");
    assert!(out.contains("cdef class Box:"), "{out}");
    assert!(out.contains("cpdef object get(self):"), "{out}");
}

#[test]
fn overload_mismatch_is_rejected_at_call_site() {
    let source = r#"
class A {
    def func(a: int, b: str) -> None {
        return;
    }
    def func(a: int, b: int) -> None {
        return;
    }
}
a: A = A();
b: str = "b";
c: str = "c";
a.func(b, c);
"#;
    let error = compile_err(source);
    let debug = format!("{error:?}");
    assert!(debug.contains("func") && debug.contains("str, str"), "{debug}");
}

#[test]
fn final_reassignment_is_rejected() {
    let source = "final a: int = 1;\na = 2;\n";
    let error = compile_err(source);
    assert!(format!("{error:?}").contains("Cannot reassign final variable 'a'"));
}

#[test]
fn empty_interface_emits_pass_body() {
    let out = compile_py("interface Empty {\n}\n");
    assert!(out.contains("class Empty(Protocol):"), "{out}");
    assert!(out.contains("pass"), "{out}");
}

#[test]
fn import_forms_round_trip() {
    let out = compile_py("from math import sqrt as square_root;\nimport os as operating_system;\n");
    assert!(out.contains("from math import sqrt as square_root"), "{out}");
    assert!(out.contains("import os as operating_system"), "{out}");
}

#[test]
fn data_class_emits_dataclass_decorator_in_py_mode() {
    let out = compile_py("data class Point(x: int, y: int);\n");
    assert!(out.contains("@dataclass"), "{out}");
    assert!(out.contains("class Point:"), "{out}");
    assert!(out.contains("x: int"), "{out}");
    assert!(out.contains("y: int"), "{out}");
}

#[test]
fn data_class_in_pyx_mode_synthesizes_constructor() {
    let out = compile_pyx("data class Point(x: int, y: int);\n");
    assert!(out.contains("cdef class Point:"), "{out}");
    assert!(out.contains("cdef public x: int"), "{out}");
    assert!(out.contains("def __init__(self, x: int, y: int):"), "{out}");
    assert!(out.contains("self.x = x"), "{out}");
}

#[test]
fn check_only_mode_returns_no_output() {
    let unit = CompilationUnit::in_memory("class Fine {}\n".to_string());
    let options = CompileOptions { check: true, ..CompileOptions::default() };
    let (_, outcome) = compile_unit(unit, &options);
    assert_eq!(outcome.unwrap(), None);
}

#[test]
fn interface_conformance_failure_reports_missing_method() {
    let source = r#"
interface Drawable {
    def draw() -> None;
}
class Square implements Drawable {
    def Square(self) -> None {
        pass;
    }
}
"#;
    let error = compile_err(source);
    assert!(format!("{error:?}").to_lowercase().contains("draw"));
}
