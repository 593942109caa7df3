//! Abstract syntax tree produced by the [`parser`](crate::parser) and
//! consumed by every later pass.
//!
//! Every node owns its [`Span`] directly rather than borrowing from the
//! source text: tokens and identifiers are already owned `String`s, so nodes
//! are too, which lets diagnostics and later passes hold onto AST nodes well
//! past the lexer's lifetime.

use strum_macros::EnumIs;

use crate::span::Span;

/// An entire compilation unit: an ordered list of top-level items.
#[derive(Debug, Clone)]
pub struct Module {
    pub items: Vec<Item>,
    pub span: Span,
}

/// Anything that can appear at module scope or inside a class/data-class/enum
/// body. Function bodies use the narrower [`Statement`] instead, since
/// nested declarations are not part of the grammar there.
///
/// `EnumIs` derives `is_class()`, `is_function()`, etc. for callers that only
/// need a cheap shape check without a full match.
#[derive(EnumIs, Debug, Clone)]
pub enum Item {
    Interface(InterfaceDecl),
    Class(ClassDecl),
    DataClass(DataClassDecl),
    Enum(EnumDecl),
    Function(FunctionDecl),
    Stmt(Statement),
}

impl Item {
    pub fn span(&self) -> &Span {
        match self {
            Item::Interface(d) => &d.span,
            Item::Class(d) => &d.span,
            Item::DataClass(d) => &d.span,
            Item::Enum(d) => &d.span,
            Item::Function(d) => &d.span,
            Item::Stmt(s) => s.span(),
        }
    }
}

// ---------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct InterfaceDecl {
    pub name: String,
    pub methods: Vec<MethodSig>,
    pub bases: Vec<String>,
    pub annotations: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub type_params: Vec<TypeParameter>,
    pub bases: Vec<String>,
    pub interfaces: Vec<String>,
    pub body: Vec<Item>,
    pub is_abstract: bool,
    pub is_final: bool,
    pub compiler_flags: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct DataClassDecl {
    pub name: String,
    pub type_params: Vec<TypeParameter>,
    pub fields: Vec<Parameter>,
    pub body: Vec<Item>,
    pub bases: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: String,
    pub members: Vec<EnumMember>,
    pub body: Vec<Item>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Parameter>,
    /// `None` for an abstract/interface signature lowered to a single
    /// `pass` statement for uniform downstream handling.
    pub body: Option<Vec<Statement>>,
    pub return_type: Option<String>,
    pub type_params: Vec<TypeParameter>,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_final: bool,
    pub decorators: Vec<String>,
    pub compiler_flags: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct MethodSig {
    pub name: String,
    pub params: Vec<Parameter>,
    pub return_type: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub type_annotation: Option<String>,
    pub default: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TypeParameter {
    pub name: String,
    pub bound: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct EnumMember {
    pub name: String,
    pub args: Vec<Expr>,
    pub span: Span,
}

// ---------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------

#[derive(EnumIs, Debug, Clone)]
pub enum Statement {
    Expression(ExpressionStatement),
    Pass(PassStatement),
    Return(ReturnStatement),
    If(IfStatement),
    While(WhileStatement),
    For(ForStatement),
    Switch(SwitchStatement),
    Raise(RaiseStatement),
    Import(ImportStatement),
    Final(FinalDeclaration),
}

impl Statement {
    pub fn span(&self) -> &Span {
        match self {
            Statement::Expression(s) => &s.span,
            Statement::Pass(s) => &s.span,
            Statement::Return(s) => &s.span,
            Statement::If(s) => &s.span,
            Statement::While(s) => &s.span,
            Statement::For(s) => &s.span,
            Statement::Switch(s) => &s.span,
            Statement::Raise(s) => &s.span,
            Statement::Import(s) => &s.span,
            Statement::Final(s) => &s.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExpressionStatement {
    pub expr: Expr,
    pub has_semicolon: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct PassStatement {
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ReturnStatement {
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IfStatement {
    pub condition: Expr,
    pub then: Vec<Statement>,
    pub or_else: Option<Vec<Statement>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct WhileStatement {
    pub condition: Expr,
    pub body: Vec<Statement>,
    pub span: Span,
}

/// `target` is the binary `in`-expression produced by the expression parser
/// (e.g. `x in items`), not a separate loop-variable/iterable pair.
#[derive(Debug, Clone)]
pub struct ForStatement {
    pub target: Expr,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct SwitchStatement {
    pub expr: Expr,
    pub cases: Vec<CaseClause>,
    pub default: Option<Vec<Statement>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct CaseClause {
    pub value: Expr,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct RaiseStatement {
    pub exception: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ImportStatement {
    pub module: String,
    pub names: Vec<String>,
    pub aliases: Vec<Option<String>>,
    pub is_from_import: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FinalDeclaration {
    pub target: String,
    pub value: Expr,
    pub type_annotation: Option<String>,
    pub span: Span,
}

// ---------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Expr {
    Identifier(Identifier),
    Literal(Literal),
    Attribute(Attribute),
    Call(Call),
    Assignment(Assignment),
    Logical(Logical),
    Unary(Unary),
    Binary(Binary),
    Lambda(Lambda),
    DictEntry(DictEntry),
    Subscript(Subscript),
    Slice(Slice),
    Comprehension(Comprehension),
    /// `[elem, …]`. Not part of the distilled node set but required by the
    /// list-literal-vs-compiler-flag-block grammar rule; the
    /// transformer re-emits it verbatim.
    ListLiteral(ListLiteral),
    TupleLiteral(TupleLiteral),
    SetLiteral(SetLiteral),
    DictLiteral(DictLiteral),
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::Identifier(e) => &e.span,
            Expr::Literal(e) => &e.span,
            Expr::Attribute(e) => &e.span,
            Expr::Call(e) => &e.span,
            Expr::Assignment(e) => &e.span,
            Expr::Logical(e) => &e.span,
            Expr::Unary(e) => &e.span,
            Expr::Binary(e) => &e.span,
            Expr::Lambda(e) => &e.span,
            Expr::DictEntry(e) => &e.span,
            Expr::Subscript(e) => &e.span,
            Expr::Slice(e) => &e.span,
            Expr::Comprehension(e) => &e.span,
            Expr::ListLiteral(e) => &e.span,
            Expr::TupleLiteral(e) => &e.span,
            Expr::SetLiteral(e) => &e.span,
            Expr::DictLiteral(e) => &e.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListLiteral {
    pub elements: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TupleLiteral {
    pub elements: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct SetLiteral {
    pub elements: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct DictLiteral {
    pub entries: Vec<DictEntry>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

/// The literal kinds the type checker maps to surface types: `string→str`,
/// `number→int`, `boolean→bool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Str,
    Number,
    Bool,
    /// `none`/`None`; not one of the three kinds the type checker maps
    /// argument types from, but still a literal token the parser must
    /// produce a node for.
    None_,
}

#[derive(Debug, Clone)]
pub struct Literal {
    pub value: String,
    pub literal_type: LiteralKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub object: Box<Expr>,
    pub attribute: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Argument {
    pub name: Option<String>,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub callee: Box<Expr>,
    pub arguments: Vec<Argument>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
}

/// Unifies simple assignment, compound assignment, and annotated
/// assignment; `operator` is `None` for a bare `target: T` declaration with
/// no initializer.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub target: Box<Expr>,
    pub value: Option<Box<Expr>>,
    pub operator: Option<AssignOp>,
    pub type_annotation: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone)]
pub struct Logical {
    pub op: LogicalOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone)]
pub struct Unary {
    pub op: UnaryOp,
    pub operand: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    In,
}

#[derive(Debug, Clone)]
pub struct Binary {
    pub op: BinaryOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Lambda {
    pub params: Vec<Parameter>,
    pub body: Box<Expr>,
    pub return_type: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct DictEntry {
    pub key: Box<Expr>,
    pub value: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Subscript {
    pub object: Box<Expr>,
    pub index: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Slice {
    pub start: Option<Box<Expr>>,
    pub stop: Option<Box<Expr>>,
    pub step: Option<Box<Expr>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComprehensionKind {
    List,
    Set,
    Dict,
    Generator,
}

#[derive(Debug, Clone)]
pub struct Comprehension {
    pub element: Box<Expr>,
    pub target: Box<Expr>,
    pub iter: Box<Expr>,
    pub condition: Option<Box<Expr>>,
    pub comp_type: ComprehensionKind,
    /// Present only for `comp_type == Dict`, the key expression paired with
    /// `element` as the value.
    pub key: Option<Box<Expr>>,
    pub span: Span,
}
