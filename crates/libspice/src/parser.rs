//! Recursive-descent parser: `&[Token]` → [`Module`](crate::ast::Module).
//!
//! Rather than running `nom` combinators directly over source spans, this
//! walks a materialized token slice with an index cursor (see
//! [`crate::lexer`] for why). Two grammar productions need more than
//! one token of lookahead and resolve it by speculatively parsing, then
//! rewinding the cursor on mismatch, rather than threading extra lookahead
//! state through every call site: compiler-flag blocks vs. list literals,
//! and lambda parameter lists vs. parenthesized/tuple expressions.

use crate::ast::*;
use crate::error::CompileError;
use crate::file::SourceFile;
use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Tokenizing is a separate step; this only walks an already-produced stream.
pub fn parse(tokens: Vec<Token>, file: &SourceFile) -> Result<Module, CompileError> {
    let mut parser = Parser::new(tokens, file.clone());
    let module_start = parser.current().span.clone();
    let mut items = Vec::new();

    parser.skip_newlines();
    while !parser.is_at_end() {
        items.push(parser.parse_item()?);
        parser.skip_newlines();
    }

    let end_span = items.last().map(|i| i.span().clone()).unwrap_or_else(|| module_start.clone());
    Ok(Module { items, span: module_start.merge(&end_span) })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file: SourceFile,
}

impl Parser {
    fn new(tokens: Vec<Token>, file: SourceFile) -> Self {
        // Comments carry no grammatical meaning once lexed; drop them here so
        // every other production can ignore them entirely.
        let tokens: Vec<Token> = tokens.into_iter().filter(|t| !matches!(t.kind, TokenKind::Comment)).collect();
        Self { tokens, pos: 0, file }
    }

    // -- cursor primitives -------------------------------------------------

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if !tok.is_eof() {
            self.pos += 1;
        }
        tok
    }

    fn is_at_end(&self) -> bool {
        self.current().is_eof()
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    fn skip_newlines(&mut self) {
        while matches!(self.current().kind, TokenKind::Newline) {
            self.advance();
        }
    }

    /// Skips `newline`/(already-filtered) `comment` tokens starting at
    /// `from` and returns the kind of the next semantically meaningful
    /// token, or `Eof` if none remains.
    fn peek_next_non_newline_type(&self, from: usize) -> TokenKind {
        let mut i = from;
        while i < self.tokens.len() && matches!(self.tokens[i].kind, TokenKind::Newline) {
            i += 1;
        }
        self.tokens.get(i).map(|t| t.kind.clone()).unwrap_or(TokenKind::Eof)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, CompileError> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error(format!("expected {:?}, found {:?}", kind, self.current().kind)))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, CompileError> {
        Ok(self.expect(TokenKind::Identifier)?.lexeme)
    }

    fn consume_optional_semicolon(&mut self) -> bool {
        if self.check(&TokenKind::Semicolon) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Builds a `ParseError` whose `context` is the surrounding ±5 tokens,
    /// per the grammar's diagnostic rule.
    fn error(&self, message: impl Into<String>) -> CompileError {
        let idx = self.pos.min(self.tokens.len() - 1);
        let token = &self.tokens[idx];
        let lo = idx.saturating_sub(5);
        let hi = (idx + 5).min(self.tokens.len() - 1);
        let context = self.tokens[lo..=hi]
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let marker = if lo + i == idx { "*" } else { "" };
                format!("{marker}{:?}:{:?}", t.kind, t.lexeme)
            })
            .collect::<Vec<_>>()
            .join(" ");
        CompileError::parse(message.into(), token.span.range(), &self.file, context)
    }

    // -- compiler-flag blocks -----------------------------------------------

    /// A `[` at statement/item start is a compiler-flag block iff the token
    /// after the matching `]` is one of `abstract, final, class, def,
    /// static`; otherwise it is a list literal and this rewinds so the
    /// caller can reparse it as an expression.
    fn try_parse_compiler_flags(&mut self) -> Result<Vec<String>, CompileError> {
        if !self.check(&TokenKind::LBracket) {
            return Ok(Vec::new());
        }

        let checkpoint = self.pos;
        let mut depth = 0i32;
        let mut i = self.pos;
        loop {
            if i >= self.tokens.len() {
                return Ok(Vec::new());
            }
            match self.tokens[i].kind {
                TokenKind::LBracket => depth += 1,
                TokenKind::RBracket => {
                    depth -= 1;
                    if depth == 0 {
                        i += 1;
                        break;
                    }
                }
                TokenKind::Eof => return Ok(Vec::new()),
                _ => {}
            }
            i += 1;
        }

        let next = self.peek_next_non_newline_type(i);
        let is_flags = matches!(
            next,
            TokenKind::Abstract | TokenKind::Final | TokenKind::Class | TokenKind::Def | TokenKind::Static
        );
        if !is_flags {
            self.pos = checkpoint;
            return Ok(Vec::new());
        }

        self.advance(); // '['
        let mut flags = Vec::new();
        self.skip_newlines();
        if !self.check(&TokenKind::RBracket) {
            loop {
                self.skip_newlines();
                let tok = match &self.current().kind {
                    TokenKind::Identifier | TokenKind::String { .. } => self.advance(),
                    _ => return Err(self.error("expected identifier or string in compiler-flag block")),
                };
                flags.push(tok.lexeme);
                self.skip_newlines();
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.skip_newlines();
        self.expect(TokenKind::RBracket)?;
        Ok(flags)
    }

    // -- items: declarations + statements ------------------------------------

    /// Parses one top-level construct: a declaration (interface/class/data
    /// class/enum/function, each allowed a leading compiler-flag block and
    /// `abstract`/`final`/`static` modifiers) or, failing all of those, a
    /// plain statement.
    fn parse_item(&mut self) -> Result<Item, CompileError> {
        self.skip_newlines();
        let compiler_flags = self.try_parse_compiler_flags()?;
        self.skip_newlines();

        let modifiers_start = self.pos;
        let mut is_abstract = false;
        let mut is_final = false;
        let mut is_static = false;
        loop {
            match self.current().kind {
                TokenKind::Abstract => {
                    is_abstract = true;
                    self.advance();
                }
                TokenKind::Final => {
                    is_final = true;
                    self.advance();
                }
                TokenKind::Static => {
                    is_static = true;
                    self.advance();
                }
                _ => break,
            }
        }

        match &self.current().kind {
            TokenKind::Interface => self.parse_interface(compiler_flags),
            TokenKind::Data => self.parse_data_class(compiler_flags),
            TokenKind::Class => self.parse_class(compiler_flags, is_abstract, is_final),
            TokenKind::Enum => self.parse_enum(),
            TokenKind::Def => self.parse_function(compiler_flags, is_abstract, is_final, is_static),
            _ if self.pos != modifiers_start => Err(self.error("expected 'class', 'def', 'enum' or 'data class' after modifier")),
            _ => Ok(Item::Stmt(self.parse_statement()?)),
        }
    }

    fn parse_interface(&mut self, annotations: Vec<String>) -> Result<Item, CompileError> {
        let start = self.expect(TokenKind::Interface)?.span;
        let name = self.expect_identifier()?;
        let mut bases = Vec::new();
        if self.check(&TokenKind::Extends) {
            self.advance();
            bases.push(self.expect_identifier()?);
            while self.check(&TokenKind::Comma) {
                self.advance();
                bases.push(self.expect_identifier()?);
            }
        }
        self.skip_newlines();
        self.expect(TokenKind::LBrace)?;
        let mut methods = Vec::new();
        loop {
            self.skip_newlines();
            if self.check(&TokenKind::RBrace) {
                break;
            }
            methods.push(self.parse_method_sig()?);
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(Item::Interface(InterfaceDecl { name, methods, bases, annotations, span: start.merge(&end) }))
    }

    fn parse_method_sig(&mut self) -> Result<MethodSig, CompileError> {
        let start = self.expect(TokenKind::Def)?.span;
        let name = self.expect_identifier()?;
        let params = self.parse_parameter_list()?;
        let mut return_type = None;
        if self.check(&TokenKind::Arrow) {
            self.advance();
            return_type = Some(self.parse_type_annotation()?);
        }
        self.skip_newlines();
        let end = self.expect(TokenKind::Semicolon)?.span;
        Ok(MethodSig { name, params, return_type, span: start.merge(&end) })
    }

    fn parse_class(&mut self, compiler_flags: Vec<String>, is_abstract: bool, is_final: bool) -> Result<Item, CompileError> {
        let start = self.expect(TokenKind::Class)?.span;
        let name = self.expect_identifier()?;
        let type_params = self.parse_optional_type_parameters()?;

        let mut bases = Vec::new();
        if self.check(&TokenKind::LParen) {
            self.advance();
            if !self.check(&TokenKind::RParen) {
                bases.push(self.expect_identifier()?);
                while self.check(&TokenKind::Comma) {
                    self.advance();
                    bases.push(self.expect_identifier()?);
                }
            }
            self.expect(TokenKind::RParen)?;
        } else if self.check(&TokenKind::Extends) {
            self.advance();
            bases.push(self.expect_identifier()?);
        }

        let mut interfaces = Vec::new();
        if self.check(&TokenKind::Implements) {
            self.advance();
            interfaces.push(self.expect_identifier()?);
            while self.check(&TokenKind::Comma) {
                self.advance();
                interfaces.push(self.expect_identifier()?);
            }
        }

        let body = self.parse_item_block()?;
        let end = self.tokens[self.pos - 1].span.clone();
        Ok(Item::Class(ClassDecl {
            name,
            type_params,
            bases,
            interfaces,
            body,
            is_abstract,
            is_final,
            compiler_flags,
            span: start.merge(&end),
        }))
    }

    fn parse_data_class(&mut self, compiler_flags: Vec<String>) -> Result<Item, CompileError> {
        let _ = &compiler_flags; // data classes don't carry compiler-flag metadata in this grammar
        let start = self.expect(TokenKind::Data)?.span;
        self.expect(TokenKind::Class)?;
        let name = self.expect_identifier()?;
        let type_params = self.parse_optional_type_parameters()?;
        let fields = self.parse_parameter_list()?;

        let mut bases = Vec::new();
        if self.check(&TokenKind::Extends) {
            self.advance();
            bases.push(self.expect_identifier()?);
        } else if self.check(&TokenKind::LParen) {
            self.advance();
            if !self.check(&TokenKind::RParen) {
                bases.push(self.expect_identifier()?);
                while self.check(&TokenKind::Comma) {
                    self.advance();
                    bases.push(self.expect_identifier()?);
                }
            }
            self.expect(TokenKind::RParen)?;
        }

        self.skip_newlines();
        let (body, end) = if self.check(&TokenKind::Semicolon) {
            let tok = self.advance();
            (Vec::new(), tok.span)
        } else {
            let body = self.parse_item_block()?;
            let end = self.tokens[self.pos - 1].span.clone();
            (body, end)
        };

        Ok(Item::DataClass(DataClassDecl { name, type_params, fields, body, bases, span: start.merge(&end) }))
    }

    /// `enum Name '{' member (',' member)* (';' body)? '}'`. Not present in
    /// the original parser at all (see DESIGN.md) — derived from the
    /// original test suite's expected AST shapes and transformer output.
    fn parse_enum(&mut self) -> Result<Item, CompileError> {
        let start = self.expect(TokenKind::Enum)?.span;
        let name = self.expect_identifier()?;
        self.skip_newlines();
        self.expect(TokenKind::LBrace)?;

        let mut members = Vec::new();
        self.skip_newlines();
        if !self.check(&TokenKind::Semicolon) && !self.check(&TokenKind::RBrace) {
            loop {
                self.skip_newlines();
                members.push(self.parse_enum_member()?);
                self.skip_newlines();
                if self.check(&TokenKind::Comma) {
                    self.advance();
                    self.skip_newlines();
                    if self.check(&TokenKind::Semicolon) || self.check(&TokenKind::RBrace) {
                        break;
                    }
                } else {
                    break;
                }
            }
        }

        self.skip_newlines();
        let mut body = Vec::new();
        if self.check(&TokenKind::Semicolon) {
            self.advance();
            loop {
                self.skip_newlines();
                if self.check(&TokenKind::RBrace) {
                    break;
                }
                body.push(self.parse_item()?);
            }
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(Item::Enum(EnumDecl { name, members, body, span: start.merge(&end) }))
    }

    fn parse_enum_member(&mut self) -> Result<EnumMember, CompileError> {
        let tok = self.expect(TokenKind::Identifier)?;
        let mut args = Vec::new();
        let mut end = tok.span.clone();
        if self.check(&TokenKind::LParen) {
            self.advance();
            self.skip_newlines();
            if !self.check(&TokenKind::RParen) {
                args.push(self.parse_expr()?);
                self.skip_newlines();
                while self.check(&TokenKind::Comma) {
                    self.advance();
                    self.skip_newlines();
                    if self.check(&TokenKind::RParen) {
                        break;
                    }
                    args.push(self.parse_expr()?);
                    self.skip_newlines();
                }
            }
            end = self.expect(TokenKind::RParen)?.span;
        }
        Ok(EnumMember { name: tok.lexeme, args, span: tok.span.merge(&end) })
    }

    fn parse_function(
        &mut self,
        compiler_flags: Vec<String>,
        is_abstract: bool,
        is_final: bool,
        is_static: bool,
    ) -> Result<Item, CompileError> {
        let start = self.expect(TokenKind::Def)?.span;
        let name = self.expect_identifier()?;
        let type_params = self.parse_optional_type_parameters()?;
        let params = self.parse_parameter_list()?;
        let mut return_type = None;
        if self.check(&TokenKind::Arrow) {
            self.advance();
            return_type = Some(self.parse_type_annotation()?);
        }
        self.skip_newlines();

        let (body, end) = if self.check(&TokenKind::Semicolon) {
            let tok = self.advance();
            (None, tok.span)
        } else {
            let stmts = self.parse_block()?;
            let end = self.tokens[self.pos - 1].span.clone();
            (Some(stmts), end)
        };

        Ok(Item::Function(FunctionDecl {
            name,
            params,
            body,
            return_type,
            type_params,
            is_static,
            is_abstract,
            is_final,
            decorators: Vec::new(),
            compiler_flags,
            span: start.merge(&end),
        }))
    }

    fn parse_optional_type_parameters(&mut self) -> Result<Vec<TypeParameter>, CompileError> {
        if !self.check(&TokenKind::Lt) {
            return Ok(Vec::new());
        }
        self.advance();
        let mut params = Vec::new();
        loop {
            let tok = self.expect(TokenKind::Identifier)?;
            let mut bound = None;
            if self.check(&TokenKind::Extends) {
                self.advance();
                bound = Some(self.parse_type_annotation()?);
            }
            params.push(TypeParameter { name: tok.lexeme, bound, span: tok.span });
            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::Gt)?;
        Ok(params)
    }

    fn parse_parameter_list(&mut self) -> Result<Vec<Parameter>, CompileError> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        self.skip_newlines();
        if !self.check(&TokenKind::RParen) {
            loop {
                self.skip_newlines();
                params.push(self.parse_parameter()?);
                self.skip_newlines();
                if self.check(&TokenKind::Comma) {
                    self.advance();
                    self.skip_newlines();
                } else {
                    break;
                }
            }
        }
        self.skip_newlines();
        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    fn parse_parameter(&mut self) -> Result<Parameter, CompileError> {
        let tok = self.expect(TokenKind::Identifier)?;
        let mut type_annotation = None;
        if self.check(&TokenKind::Colon) {
            self.advance();
            type_annotation = Some(self.parse_type_annotation()?);
        }
        let mut default = None;
        let mut end = tok.span.clone();
        if self.check(&TokenKind::Assign) {
            self.advance();
            let value = self.parse_expr()?;
            end = value.span().clone();
            default = Some(value);
        }
        Ok(Parameter { name: tok.lexeme, type_annotation, default, span: tok.span.merge(&end) })
    }

    /// Longest run of `identifier . [ ] ,` (commas only while inside a
    /// bracket) until a terminator (`= ; newline }` or an unbalanced `]`).
    fn parse_type_annotation(&mut self) -> Result<String, CompileError> {
        let mut text = String::new();
        let mut depth: i32 = 0;
        loop {
            match &self.current().kind {
                TokenKind::Identifier => {
                    text.push_str(&self.advance().lexeme);
                }
                TokenKind::Dot => {
                    text.push('.');
                    self.advance();
                }
                TokenKind::Comma if depth > 0 => {
                    text.push_str(", ");
                    self.advance();
                }
                TokenKind::LBracket => {
                    depth += 1;
                    text.push('[');
                    self.advance();
                }
                TokenKind::RBracket => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                    text.push(']');
                    self.advance();
                }
                _ => break,
            }
        }
        if text.is_empty() {
            return Err(self.error("expected a type annotation"));
        }
        Ok(text)
    }

    /// Parses `{ item* }` for class/data-class bodies (methods, fields,
    /// nested declarations all share `Item`).
    fn parse_item_block(&mut self) -> Result<Vec<Item>, CompileError> {
        self.skip_newlines();
        self.expect(TokenKind::LBrace)?;
        let mut items = Vec::new();
        loop {
            self.skip_newlines();
            if self.check(&TokenKind::RBrace) {
                break;
            }
            items.push(self.parse_item()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(items)
    }

    fn parse_block(&mut self) -> Result<Vec<Statement>, CompileError> {
        self.skip_newlines();
        self.expect(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        loop {
            self.skip_newlines();
            if self.check(&TokenKind::RBrace) {
                break;
            }
            stmts.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(stmts)
    }

    // -- statements -----------------------------------------------------------

    fn parse_statement(&mut self) -> Result<Statement, CompileError> {
        self.skip_newlines();
        match &self.current().kind {
            TokenKind::Pass => self.parse_pass(),
            TokenKind::Return => self.parse_return(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Raise => self.parse_raise(),
            TokenKind::Import | TokenKind::From => self.parse_import(),
            TokenKind::Final => self.parse_final_declaration(),
            TokenKind::Identifier if self.is_typed_declaration_start() => self.parse_typed_declaration(),
            _ => self.parse_expression_statement(),
        }
    }

    fn is_typed_declaration_start(&self) -> bool {
        matches!(self.tokens.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::Colon))
    }

    fn parse_pass(&mut self) -> Result<Statement, CompileError> {
        let tok = self.advance();
        let span = tok.span;
        self.consume_optional_semicolon();
        Ok(Statement::Pass(PassStatement { span }))
    }

    fn parse_return(&mut self) -> Result<Statement, CompileError> {
        let tok = self.advance();
        let mut value = None;
        if !matches!(self.current().kind, TokenKind::Semicolon | TokenKind::Newline | TokenKind::RBrace | TokenKind::Eof) {
            value = Some(self.parse_expr()?);
        }
        let span = value.as_ref().map(|v| tok.span.merge(v.span())).unwrap_or_else(|| tok.span.clone());
        self.consume_optional_semicolon();
        Ok(Statement::Return(ReturnStatement { value, span }))
    }

    fn parse_if(&mut self) -> Result<Statement, CompileError> {
        let start = self.expect(TokenKind::If)?.span;
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let then = self.parse_block()?;

        let checkpoint = self.pos;
        self.skip_newlines();
        let or_else = if self.check(&TokenKind::Else) {
            self.advance();
            if self.check(&TokenKind::If) {
                Some(vec![self.parse_if()?])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            self.pos = checkpoint;
            None
        };

        let end = self.tokens[self.pos - 1].span.clone();
        Ok(Statement::If(IfStatement { condition, then, or_else, span: start.merge(&end) }))
    }

    fn parse_while(&mut self) -> Result<Statement, CompileError> {
        let start = self.expect(TokenKind::While)?.span;
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_block()?;
        let end = self.tokens[self.pos - 1].span.clone();
        Ok(Statement::While(WhileStatement { condition, body, span: start.merge(&end) }))
    }

    fn parse_for(&mut self) -> Result<Statement, CompileError> {
        let start = self.expect(TokenKind::For)?.span;
        self.expect(TokenKind::LParen)?;
        let target = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_block()?;
        let end = self.tokens[self.pos - 1].span.clone();
        Ok(Statement::For(ForStatement { target, body, span: start.merge(&end) }))
    }

    fn parse_switch(&mut self) -> Result<Statement, CompileError> {
        let start = self.expect(TokenKind::Switch)?.span;
        self.expect(TokenKind::LParen)?;
        let expr = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        self.skip_newlines();
        self.expect(TokenKind::LBrace)?;

        let mut cases = Vec::new();
        let mut default = None;
        loop {
            self.skip_newlines();
            if self.check(&TokenKind::RBrace) {
                break;
            }
            if self.check(&TokenKind::Case) {
                let case_start = self.advance().span;
                let value = self.parse_expr()?;
                self.expect(TokenKind::Colon)?;
                let body = self.parse_case_body()?;
                let end = body.last().map(|s| s.span().clone()).unwrap_or_else(|| case_start.clone());
                cases.push(CaseClause { value, body, span: case_start.merge(&end) });
            } else if self.check(&TokenKind::Default) {
                self.advance();
                self.expect(TokenKind::Colon)?;
                default = Some(self.parse_case_body()?);
            } else {
                return Err(self.error("expected 'case' or 'default' in switch body"));
            }
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(Statement::Switch(SwitchStatement { expr, cases, default, span: start.merge(&end) }))
    }

    fn parse_case_body(&mut self) -> Result<Vec<Statement>, CompileError> {
        let mut stmts = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.current().kind, TokenKind::Case | TokenKind::Default | TokenKind::RBrace) {
                break;
            }
            stmts.push(self.parse_statement()?);
        }
        Ok(stmts)
    }

    fn parse_raise(&mut self) -> Result<Statement, CompileError> {
        let tok = self.advance();
        let mut exception = None;
        if !matches!(self.current().kind, TokenKind::Semicolon | TokenKind::Newline | TokenKind::RBrace | TokenKind::Eof) {
            exception = Some(self.parse_expr()?);
        }
        let span = exception.as_ref().map(|e| tok.span.merge(e.span())).unwrap_or_else(|| tok.span.clone());
        self.consume_optional_semicolon();
        Ok(Statement::Raise(RaiseStatement { exception, span }))
    }

    fn parse_dotted_name(&mut self) -> Result<(String, Span), CompileError> {
        let first = self.expect(TokenKind::Identifier)?;
        let mut text = first.lexeme;
        let mut span = first.span;
        while self.check(&TokenKind::Dot) {
            self.advance();
            let part = self.expect(TokenKind::Identifier)?;
            text.push('.');
            text.push_str(&part.lexeme);
            span = span.merge(&part.span);
        }
        Ok((text, span))
    }

    fn parse_import(&mut self) -> Result<Statement, CompileError> {
        if self.check(&TokenKind::From) {
            let start = self.advance().span;
            let (module, _) = self.parse_dotted_name()?;
            self.expect(TokenKind::Import)?;
            let mut names = Vec::new();
            let mut aliases = Vec::new();
            loop {
                names.push(self.expect_identifier()?);
                if self.check(&TokenKind::As) {
                    self.advance();
                    aliases.push(Some(self.expect_identifier()?));
                } else {
                    aliases.push(None);
                }
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
            let end = self.tokens[self.pos - 1].span.clone();
            self.consume_optional_semicolon();
            Ok(Statement::Import(ImportStatement { module, names, aliases, is_from_import: true, span: start.merge(&end) }))
        } else {
            let start = self.expect(TokenKind::Import)?.span;
            let (module, module_span) = self.parse_dotted_name()?;
            let mut aliases = vec![None];
            let mut end = module_span;
            if self.check(&TokenKind::As) {
                self.advance();
                let alias_tok = self.expect(TokenKind::Identifier)?;
                end = alias_tok.span.clone();
                aliases = vec![Some(alias_tok.lexeme)];
            }
            self.consume_optional_semicolon();
            Ok(Statement::Import(ImportStatement { module, names: Vec::new(), aliases, is_from_import: false, span: start.merge(&end) }))
        }
    }

    fn parse_final_declaration(&mut self) -> Result<Statement, CompileError> {
        let start = self.expect(TokenKind::Final)?.span;
        let target = self.expect_identifier()?;
        let mut type_annotation = None;
        if self.check(&TokenKind::Colon) {
            self.advance();
            type_annotation = Some(self.parse_type_annotation()?);
        }
        self.expect(TokenKind::Assign)?;
        let value = self.parse_expr()?;
        let span = start.merge(value.span());
        self.consume_optional_semicolon();
        Ok(Statement::Final(FinalDeclaration { target, value, type_annotation, span }))
    }

    fn parse_typed_declaration(&mut self) -> Result<Statement, CompileError> {
        let name_tok = self.expect(TokenKind::Identifier)?;
        let target = Expr::Identifier(Identifier { name: name_tok.lexeme.clone(), span: name_tok.span.clone() });
        self.expect(TokenKind::Colon)?;
        let type_annotation = Some(self.parse_type_annotation()?);

        let mut value = None;
        let mut operator = None;
        if self.check(&TokenKind::Assign) {
            self.advance();
            let v = self.parse_expr()?;
            operator = Some(AssignOp::Assign);
            value = Some(Box::new(v));
        }

        let end = value.as_ref().map(|v| v.span().clone()).unwrap_or_else(|| name_tok.span.clone());
        let span = name_tok.span.merge(&end);
        let has_semicolon = self.consume_optional_semicolon();

        let assignment = Assignment { target: Box::new(target), value, operator, type_annotation, span: span.clone() };
        Ok(Statement::Expression(ExpressionStatement { expr: Expr::Assignment(assignment), has_semicolon, span }))
    }

    fn parse_expression_statement(&mut self) -> Result<Statement, CompileError> {
        let expr = self.parse_expr()?;
        let span = expr.span().clone();
        let has_semicolon = self.consume_optional_semicolon();
        Ok(Statement::Expression(ExpressionStatement { expr, has_semicolon, span }))
    }

    // -- expressions (precedence, lowest to highest) -------------------------

    fn parse_expr(&mut self) -> Result<Expr, CompileError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, CompileError> {
        let target = self.parse_logical_or()?;
        if let Some(op) = self.match_assign_op() {
            let value = self.parse_assignment()?;
            let span = target.span().merge(value.span());
            return Ok(Expr::Assignment(Assignment {
                target: Box::new(target),
                value: Some(Box::new(value)),
                operator: Some(op),
                type_annotation: None,
                span,
            }));
        }
        Ok(target)
    }

    fn match_assign_op(&mut self) -> Option<AssignOp> {
        let op = match self.current().kind {
            TokenKind::Assign => AssignOp::Assign,
            TokenKind::PlusAssign => AssignOp::Add,
            TokenKind::MinusAssign => AssignOp::Sub,
            TokenKind::StarAssign => AssignOp::Mul,
            TokenKind::SlashAssign => AssignOp::Div,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn parse_logical_or(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_logical_and()?;
        while self.check(&TokenKind::Or) {
            self.advance();
            let right = self.parse_logical_and()?;
            let span = left.span().merge(right.span());
            left = Expr::Logical(Logical { op: LogicalOp::Or, left: Box::new(left), right: Box::new(right), span });
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_not()?;
        while self.check(&TokenKind::And) {
            self.advance();
            let right = self.parse_not()?;
            let span = left.span().merge(right.span());
            left = Expr::Logical(Logical { op: LogicalOp::And, left: Box::new(left), right: Box::new(right), span });
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, CompileError> {
        if self.check(&TokenKind::Not) {
            let tok = self.advance();
            let operand = self.parse_not()?;
            let span = tok.span.merge(operand.span());
            return Ok(Expr::Unary(Unary { op: UnaryOp::Not, operand: Box::new(operand), span }));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::LtEq => BinaryOp::LtEq,
                TokenKind::GtEq => BinaryOp::GtEq,
                TokenKind::In => BinaryOp::In,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            let span = left.span().merge(right.span());
            left = Expr::Binary(Binary { op, left: Box::new(left), right: Box::new(right), span });
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            let span = left.span().merge(right.span());
            left = Expr::Binary(Binary { op, left: Box::new(left), right: Box::new(right), span });
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            let span = left.span().merge(right.span());
            left = Expr::Binary(Binary { op, left: Box::new(left), right: Box::new(right), span });
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, CompileError> {
        if self.check(&TokenKind::Minus) {
            let tok = self.advance();
            let operand = self.parse_unary()?;
            let span = tok.span.merge(operand.span());
            return Ok(Expr::Unary(Unary { op: UnaryOp::Neg, operand: Box::new(operand), span }));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.parse_primary()?;
        loop {
            match &self.current().kind {
                TokenKind::Dot => {
                    self.advance();
                    let name_tok = self.expect(TokenKind::Identifier)?;
                    let span = expr.span().merge(&name_tok.span);
                    expr = Expr::Attribute(Attribute { object: Box::new(expr), attribute: name_tok.lexeme, span });
                }
                TokenKind::LParen => {
                    let arguments = self.parse_argument_list()?;
                    let end = self.tokens[self.pos - 1].span.clone();
                    let span = expr.span().merge(&end);
                    expr = Expr::Call(Call { callee: Box::new(expr), arguments, span });
                }
                TokenKind::LBracket => {
                    self.advance();
                    expr = self.parse_subscript_or_slice(expr)?;
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_argument_list(&mut self) -> Result<Vec<Argument>, CompileError> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        self.skip_newlines();
        if !self.check(&TokenKind::RParen) {
            loop {
                self.skip_newlines();
                args.push(self.parse_argument()?);
                self.skip_newlines();
                if self.check(&TokenKind::Comma) {
                    self.advance();
                    self.skip_newlines();
                } else {
                    break;
                }
            }
        }
        self.skip_newlines();
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_argument(&mut self) -> Result<Argument, CompileError> {
        if matches!(self.current().kind, TokenKind::Identifier)
            && matches!(self.tokens.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::Assign))
        {
            let name_tok = self.advance();
            self.advance(); // '='
            let value = self.parse_logical_or()?;
            let span = name_tok.span.merge(value.span());
            return Ok(Argument { name: Some(name_tok.lexeme), value, span });
        }
        let value = self.parse_assignment()?;
        let span = value.span().clone();
        Ok(Argument { name: None, value, span })
    }

    fn parse_subscript_or_slice(&mut self, object: Expr) -> Result<Expr, CompileError> {
        let mut start = None;
        if !self.check(&TokenKind::Colon) && !self.check(&TokenKind::RBracket) {
            start = Some(Box::new(self.parse_expr()?));
        }

        if self.check(&TokenKind::Colon) {
            self.advance();
            let mut stop = None;
            if !self.check(&TokenKind::Colon) && !self.check(&TokenKind::RBracket) {
                stop = Some(Box::new(self.parse_expr()?));
            }
            let mut step = None;
            if self.check(&TokenKind::Colon) {
                self.advance();
                if !self.check(&TokenKind::RBracket) {
                    step = Some(Box::new(self.parse_expr()?));
                }
            }
            let end = self.expect(TokenKind::RBracket)?.span;
            let span = object.span().merge(&end);
            let slice = Expr::Slice(Slice { start, stop, step, span: span.clone() });
            return Ok(Expr::Subscript(Subscript { object: Box::new(object), index: Box::new(slice), span }));
        }

        let index = start.ok_or_else(|| self.error("expected an index expression"))?;
        let end = self.expect(TokenKind::RBracket)?.span;
        let span = object.span().merge(&end);
        Ok(Expr::Subscript(Subscript { object: Box::new(object), index, span }))
    }

    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        match &self.current().kind {
            TokenKind::Number => {
                let tok = self.advance();
                Ok(Expr::Literal(Literal { value: tok.lexeme, literal_type: LiteralKind::Number, span: tok.span }))
            }
            TokenKind::String { .. } => {
                let tok = self.advance();
                Ok(Expr::Literal(Literal { value: tok.lexeme, literal_type: LiteralKind::Str, span: tok.span }))
            }
            TokenKind::Boolean => {
                let tok = self.advance();
                Ok(Expr::Literal(Literal { value: tok.lexeme, literal_type: LiteralKind::Bool, span: tok.span }))
            }
            TokenKind::None_ => {
                let tok = self.advance();
                Ok(Expr::Literal(Literal { value: tok.lexeme, literal_type: LiteralKind::None_, span: tok.span }))
            }
            TokenKind::Identifier => {
                let tok = self.advance();
                Ok(Expr::Identifier(Identifier { name: tok.lexeme, span: tok.span }))
            }
            TokenKind::LParen => self.parse_paren_or_lambda(),
            TokenKind::LBracket => self.parse_list_literal_or_comprehension(),
            TokenKind::LBrace => self.parse_set_or_dict_literal_or_comprehension(),
            other => Err(self.error(format!("unexpected token {other:?} in expression"))),
        }
    }

    /// `(params) => expr` or `(params) -> Type => expr`, disambiguated from a
    /// parenthesized expression / tuple literal by speculatively parsing a
    /// parameter list and rewinding if no `=>` follows.
    fn parse_paren_or_lambda(&mut self) -> Result<Expr, CompileError> {
        let checkpoint = self.pos;
        if let Some(lambda) = self.try_parse_lambda()? {
            return Ok(lambda);
        }
        self.pos = checkpoint;

        let start = self.expect(TokenKind::LParen)?.span;
        self.skip_newlines();
        if self.check(&TokenKind::RParen) {
            let end = self.advance().span;
            return Ok(Expr::TupleLiteral(TupleLiteral { elements: Vec::new(), span: start.merge(&end) }));
        }

        let first = self.parse_expr()?;
        self.skip_newlines();
        if self.check(&TokenKind::For) {
            return self.parse_comprehension_tail(first, ComprehensionKind::Generator, start, TokenKind::RParen);
        }

        if self.check(&TokenKind::Comma) {
            let mut elements = vec![first];
            while self.check(&TokenKind::Comma) {
                self.advance();
                self.skip_newlines();
                if self.check(&TokenKind::RParen) {
                    break;
                }
                elements.push(self.parse_expr()?);
                self.skip_newlines();
            }
            let end = self.expect(TokenKind::RParen)?.span;
            return Ok(Expr::TupleLiteral(TupleLiteral { elements, span: start.merge(&end) }));
        }

        self.skip_newlines();
        self.expect(TokenKind::RParen)?;
        Ok(first)
    }

    fn try_parse_lambda(&mut self) -> Result<Option<Expr>, CompileError> {
        let start_span = self.current().span.clone();
        let checkpoint = self.pos;
        let params = match self.parse_parameter_list() {
            Ok(params) => params,
            Err(_) => {
                self.pos = checkpoint;
                return Ok(None);
            }
        };

        let mut return_type = None;
        if self.check(&TokenKind::Arrow) {
            self.advance();
            return_type = Some(self.parse_type_annotation()?);
        }
        if !self.check(&TokenKind::FatArrow) {
            self.pos = checkpoint;
            return Ok(None);
        }
        self.advance();
        let body = self.parse_assignment()?;
        let span = start_span.merge(body.span());
        Ok(Some(Expr::Lambda(Lambda { params, body: Box::new(body), return_type, span })))
    }

    fn parse_list_literal_or_comprehension(&mut self) -> Result<Expr, CompileError> {
        let start = self.expect(TokenKind::LBracket)?.span;
        self.skip_newlines();
        if self.check(&TokenKind::RBracket) {
            let end = self.advance().span;
            return Ok(Expr::ListLiteral(ListLiteral { elements: Vec::new(), span: start.merge(&end) }));
        }

        let first = self.parse_expr()?;
        self.skip_newlines();
        if self.check(&TokenKind::For) {
            return self.parse_comprehension_tail(first, ComprehensionKind::List, start, TokenKind::RBracket);
        }

        let mut elements = vec![first];
        self.skip_newlines();
        while self.check(&TokenKind::Comma) {
            self.advance();
            self.skip_newlines();
            if self.check(&TokenKind::RBracket) {
                break;
            }
            elements.push(self.parse_expr()?);
            self.skip_newlines();
        }
        let end = self.expect(TokenKind::RBracket)?.span;
        Ok(Expr::ListLiteral(ListLiteral { elements, span: start.merge(&end) }))
    }

    fn parse_set_or_dict_literal_or_comprehension(&mut self) -> Result<Expr, CompileError> {
        let start = self.expect(TokenKind::LBrace)?.span;
        self.skip_newlines();
        if self.check(&TokenKind::RBrace) {
            let end = self.advance().span;
            return Ok(Expr::DictLiteral(DictLiteral { entries: Vec::new(), span: start.merge(&end) }));
        }

        let first_key = self.parse_expr()?;
        self.skip_newlines();
        if self.check(&TokenKind::Colon) {
            self.advance();
            let first_value = self.parse_expr()?;
            let entry_span = first_key.span().merge(first_value.span());

            self.skip_newlines();
            if self.check(&TokenKind::For) {
                self.advance();
                let target = self.parse_logical_or()?;
                self.expect(TokenKind::In)?;
                let iter = self.parse_logical_or()?;
                let mut condition = None;
                self.skip_newlines();
                if self.check(&TokenKind::If) {
                    self.advance();
                    condition = Some(Box::new(self.parse_logical_or()?));
                }
                self.skip_newlines();
                let end = self.expect(TokenKind::RBrace)?.span;
                let span = start.merge(&end);
                return Ok(Expr::Comprehension(Comprehension {
                    element: Box::new(first_value),
                    target: Box::new(target),
                    iter: Box::new(iter),
                    condition,
                    comp_type: ComprehensionKind::Dict,
                    key: Some(Box::new(first_key)),
                    span,
                }));
            }

            let mut entries = vec![DictEntry { key: Box::new(first_key), value: Box::new(first_value), span: entry_span }];
            self.skip_newlines();
            while self.check(&TokenKind::Comma) {
                self.advance();
                self.skip_newlines();
                if self.check(&TokenKind::RBrace) {
                    break;
                }
                let key = self.parse_expr()?;
                self.expect(TokenKind::Colon)?;
                let value = self.parse_expr()?;
                let span = key.span().merge(value.span());
                entries.push(DictEntry { key: Box::new(key), value: Box::new(value), span });
                self.skip_newlines();
            }
            let end = self.expect(TokenKind::RBrace)?.span;
            return Ok(Expr::DictLiteral(DictLiteral { entries, span: start.merge(&end) }));
        }

        self.skip_newlines();
        if self.check(&TokenKind::For) {
            return self.parse_comprehension_tail(first_key, ComprehensionKind::Set, start, TokenKind::RBrace);
        }

        let mut elements = vec![first_key];
        self.skip_newlines();
        while self.check(&TokenKind::Comma) {
            self.advance();
            self.skip_newlines();
            if self.check(&TokenKind::RBrace) {
                break;
            }
            elements.push(self.parse_expr()?);
            self.skip_newlines();
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(Expr::SetLiteral(SetLiteral { elements, span: start.merge(&end) }))
    }

    fn parse_comprehension_tail(&mut self, element: Expr, kind: ComprehensionKind, start: Span, closing: TokenKind) -> Result<Expr, CompileError> {
        self.expect(TokenKind::For)?;
        let target = self.parse_logical_or()?;
        self.expect(TokenKind::In)?;
        let iter = self.parse_logical_or()?;
        let mut condition = None;
        self.skip_newlines();
        if self.check(&TokenKind::If) {
            self.advance();
            condition = Some(Box::new(self.parse_logical_or()?));
        }
        self.skip_newlines();
        let end = self.expect(closing)?.span;
        let span = start.merge(&end);
        Ok(Expr::Comprehension(Comprehension {
            element: Box::new(element),
            target: Box::new(target),
            iter: Box::new(iter),
            condition,
            comp_type: kind,
            key: None,
            span,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_source(code: &str) -> Module {
        let file = SourceFile::in_memory(code.to_string());
        let tokens = tokenize(&file).unwrap();
        parse(tokens, &file).unwrap()
    }

    fn parse_source_err(code: &str) -> CompileError {
        let file = SourceFile::in_memory(code.to_string());
        let tokens = tokenize(&file).unwrap();
        parse(tokens, &file).unwrap_err()
    }

    #[test]
    fn parses_empty_class() {
        let module = parse_source("class Foo {}\n");
        assert_eq!(module.items.len(), 1);
        match &module.items[0] {
            Item::Class(c) => {
                assert_eq!(c.name, "Foo");
                assert!(c.body.is_empty());
                assert!(!c.is_abstract && !c.is_final);
            }
            other => panic!("expected class, got {other:?}"),
        }
    }

    #[test]
    fn parses_abstract_final_modifiers() {
        let module = parse_source("abstract class A {}\nfinal class B {}\n");
        match &module.items[0] {
            Item::Class(c) => assert!(c.is_abstract),
            other => panic!("{other:?}"),
        }
        match &module.items[1] {
            Item::Class(c) => assert!(c.is_final),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn compiler_flag_block_is_distinguished_from_list_literal() {
        let module = parse_source("[deprecated] class Old {}\n[1, 2, 3];\n");
        match &module.items[0] {
            Item::Class(c) => assert_eq!(c.compiler_flags, vec!["deprecated".to_string()]),
            other => panic!("expected class with flags, got {other:?}"),
        }
        match &module.items[1] {
            Item::Stmt(Statement::Expression(e)) => match &e.expr {
                Expr::ListLiteral(l) => assert_eq!(l.elements.len(), 3),
                other => panic!("expected list literal, got {other:?}"),
            },
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn typed_declaration_vs_expression_statement() {
        let module = parse_source("x: int = 1;\ny = 2;\n");
        match &module.items[0] {
            Item::Stmt(Statement::Expression(e)) => match &e.expr {
                Expr::Assignment(a) => assert_eq!(a.type_annotation.as_deref(), Some("int")),
                other => panic!("{other:?}"),
            },
            other => panic!("{other:?}"),
        }
        match &module.items[1] {
            Item::Stmt(Statement::Expression(e)) => match &e.expr {
                Expr::Assignment(a) => assert!(a.type_annotation.is_none()),
                other => panic!("{other:?}"),
            },
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn parses_class_with_generics_extends_and_implements() {
        let module = parse_source("class Box<T extends Comparable> extends Container implements Sized {\n}\n");
        match &module.items[0] {
            Item::Class(c) => {
                assert_eq!(c.type_params.len(), 1);
                assert_eq!(c.type_params[0].name, "T");
                assert_eq!(c.type_params[0].bound.as_deref(), Some("Comparable"));
                assert_eq!(c.bases, vec!["Container".to_string()]);
                assert_eq!(c.interfaces, vec!["Sized".to_string()]);
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn parses_data_class() {
        let module = parse_source("data class Point(x: int, y: int);\n");
        match &module.items[0] {
            Item::DataClass(d) => {
                assert_eq!(d.fields.len(), 2);
                assert_eq!(d.fields[0].name, "x");
                assert!(d.body.is_empty());
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn parses_simple_enum() {
        let module = parse_source("enum Color {\n    RED,\n    GREEN,\n    BLUE\n}\n");
        match &module.items[0] {
            Item::Enum(e) => {
                assert_eq!(e.members.len(), 3);
                assert_eq!(e.members[0].name, "RED");
                assert!(e.members[0].args.is_empty());
                assert!(e.body.is_empty());
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn parses_enum_with_payload_and_constructor_body() {
        let module = parse_source(
            "enum Planet {\n    EARTH(1.0, 5.97),\n    MARS(1.52, 0.64);\n    def Planet(self, distance: float, mass: float) -> None {\n        self.distance = distance;\n    }\n}\n",
        );
        match &module.items[0] {
            Item::Enum(e) => {
                assert_eq!(e.members.len(), 2);
                assert_eq!(e.members[0].args.len(), 2);
                assert_eq!(e.body.len(), 1);
                assert!(matches!(&e.body[0], Item::Function(f) if f.name == "Planet"));
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn parses_interface_with_method_signatures() {
        let module = parse_source("interface Sized {\n    def len() -> int;\n}\n");
        match &module.items[0] {
            Item::Interface(i) => {
                assert_eq!(i.methods.len(), 1);
                assert_eq!(i.methods[0].name, "len");
                assert_eq!(i.methods[0].return_type.as_deref(), Some("int"));
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn abstract_method_without_body_lowers_to_none() {
        let module = parse_source("abstract class Shape {\n    abstract def area() -> float;\n}\n");
        match &module.items[0] {
            Item::Class(c) => match &c.body[0] {
                Item::Function(f) => {
                    assert!(f.is_abstract);
                    assert!(f.body.is_none());
                }
                other => panic!("{other:?}"),
            },
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn parses_final_declaration_and_super_call() {
        let module = parse_source(
            "class Child extends Parent {\n    def Child(self, x: int) -> None {\n        super(x);\n        final y: int = 1;\n    }\n}\n",
        );
        match &module.items[0] {
            Item::Class(c) => match &c.body[0] {
                Item::Function(f) => {
                    let body = f.body.as_ref().unwrap();
                    assert!(matches!(&body[0], Statement::Expression(e) if matches!(&e.expr, Expr::Call(_))));
                    assert!(matches!(&body[1], Statement::Final(_)));
                }
                other => panic!("{other:?}"),
            },
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn parses_if_else_while_for_switch() {
        let module = parse_source(
            "def f() -> None {\n    if (x > 0) {\n        pass;\n    } else if (x < 0) {\n        pass;\n    } else {\n        pass;\n    }\n    while (x) {\n        pass;\n    }\n    for (i in items) {\n        pass;\n    }\n    switch (x) {\n        case 1:\n            pass;\n        default:\n            pass;\n    }\n}\n",
        );
        match &module.items[0] {
            Item::Function(f) => {
                let body = f.body.as_ref().unwrap();
                assert!(matches!(&body[0], Statement::If(_)));
                assert!(matches!(&body[1], Statement::While(_)));
                assert!(matches!(&body[2], Statement::For(_)));
                assert!(matches!(&body[3], Statement::Switch(_)));
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn parses_lambda_and_disambiguates_from_tuple() {
        let module = parse_source("f = (x: int) => x + 1;\nt = (1, 2, 3);\n");
        match &module.items[0] {
            Item::Stmt(Statement::Expression(e)) => match &e.expr {
                Expr::Assignment(a) => match a.value.as_deref().unwrap() {
                    Expr::Lambda(l) => assert_eq!(l.params.len(), 1),
                    other => panic!("{other:?}"),
                },
                other => panic!("{other:?}"),
            },
            other => panic!("{other:?}"),
        }
        match &module.items[1] {
            Item::Stmt(Statement::Expression(e)) => match &e.expr {
                Expr::Assignment(a) => match a.value.as_deref().unwrap() {
                    Expr::TupleLiteral(t) => assert_eq!(t.elements.len(), 3),
                    other => panic!("{other:?}"),
                },
                other => panic!("{other:?}"),
            },
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn parses_list_and_dict_comprehensions() {
        let module = parse_source("a = [x for x in items if x > 0];\nb = {k: v for k, v in pairs};\n");
        match &module.items[0] {
            Item::Stmt(Statement::Expression(e)) => match &e.expr {
                Expr::Assignment(asn) => match asn.value.as_deref().unwrap() {
                    Expr::Comprehension(c) => {
                        assert_eq!(c.comp_type, ComprehensionKind::List);
                        assert!(c.condition.is_some());
                    }
                    other => panic!("{other:?}"),
                },
                other => panic!("{other:?}"),
            },
            other => panic!("{other:?}"),
        }
        match &module.items[1] {
            Item::Stmt(Statement::Expression(e)) => match &e.expr {
                Expr::Assignment(asn) => match asn.value.as_deref().unwrap() {
                    Expr::Comprehension(c) => {
                        assert_eq!(c.comp_type, ComprehensionKind::Dict);
                        assert!(c.key.is_some());
                    }
                    other => panic!("{other:?}"),
                },
                other => panic!("{other:?}"),
            },
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn parses_slice_subscript() {
        let module = parse_source("a = items[1:10:2];\n");
        match &module.items[0] {
            Item::Stmt(Statement::Expression(e)) => match &e.expr {
                Expr::Assignment(asn) => match asn.value.as_deref().unwrap() {
                    Expr::Subscript(s) => assert!(matches!(s.index.as_ref(), Expr::Slice(_))),
                    other => panic!("{other:?}"),
                },
                other => panic!("{other:?}"),
            },
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn parse_error_reports_context_window() {
        let err = parse_source_err("class {}\n");
        match err {
            CompileError::Parse(boxed) => assert!(!boxed.context.is_empty()),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn import_forms_round_trip_shape() {
        let module = parse_source("import mod.sub as m;\nfrom pkg import a as b, c;\n");
        match &module.items[0] {
            Item::Stmt(Statement::Import(i)) => {
                assert_eq!(i.module, "mod.sub");
                assert_eq!(i.aliases, vec![Some("m".to_string())]);
                assert!(!i.is_from_import);
            }
            other => panic!("{other:?}"),
        }
        match &module.items[1] {
            Item::Stmt(Statement::Import(i)) => {
                assert_eq!(i.module, "pkg");
                assert_eq!(i.names, vec!["a".to_string(), "c".to_string()]);
                assert_eq!(i.aliases, vec![Some("b".to_string()), None]);
                assert!(i.is_from_import);
            }
            other => panic!("{other:?}"),
        }
    }
}
