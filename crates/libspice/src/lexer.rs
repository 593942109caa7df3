//! Tokenizer for Spice source text.
//!
//! Built on `nom`/`nom_locate` combinators ([`crate::span`] plays the role
//! `nom_locate`'s `LocatedSpan` usually plays), but unlike a combinator parser
//! that runs directly over the source text, this materializes a full
//! [`Vec<Token>`] up front. The parser then walks that slice with bounded
//! lookahead rather than re-deriving tokens as it goes.

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{alpha1, alphanumeric1, char, none_of, one_of, satisfy};
use nom::combinator::{map, opt, recognize, value};
use nom::multi::{many0, many0_count, many1};
use nom::sequence::{pair, preceded, terminated};
use nom::{IResult, Parser};
use nom_locate::LocatedSpan;

use crate::error::CompileError;
use crate::file::SourceFile;
use crate::span::{Position, Span};
use crate::token::{Token, TokenKind};

type NomSpan<'a> = LocatedSpan<&'a str>;

/// Tokenizes an entire source file, returning a stream terminated by `Eof`.
///
/// Whitespace other than newlines is discarded; newlines and comments are kept
/// as tokens so the parser can use them for statement-boundary heuristics and
/// skip them explicitly where they are not significant.
pub fn tokenize(file: &SourceFile) -> Result<Vec<Token>, CompileError> {
    let mut tokens = Vec::new();
    let mut rest = NomSpan::new(file.code());

    loop {
        let (next, skipped_spaces) = inline_whitespace(rest).expect("inline_whitespace never fails");
        rest = next;
        let _ = skipped_spaces;

        if rest.fragment().is_empty() {
            break;
        }

        let start_line = rest.location_line() as usize;
        let start_column = rest.get_utf8_column() - 1;
        let start_offset = rest.location_offset();

        if starts_string(rest) && string_tok(rest).is_err() {
            let rest_len = rest.fragment().len();
            return Err(CompileError::lex(
                "unterminated string literal".to_string(),
                start_offset..start_offset + rest_len,
                file,
            ));
        }

        let (next, (kind, lexeme)) = match lex_one(rest) {
            Ok(result) => result,
            Err(_) => {
                let c = rest.fragment().chars().next().unwrap_or('\0');
                return Err(CompileError::lex(
                    format!("unexpected character '{c}'"),
                    start_offset..start_offset + c.len_utf8(),
                    file,
                ));
            }
        };

        let position = Position::new(start_line, start_column, start_offset);
        let span = Span::new(file.clone(), position, lexeme.len());
        tokens.push(Token::new(kind, lexeme, span));
        rest = next;
    }

    let eof_line = rest.location_line() as usize;
    let eof_column = rest.get_utf8_column() - 1;
    let eof_offset = rest.location_offset();
    tokens.push(Token::new(
        TokenKind::Eof,
        String::new(),
        Span::new(file.clone(), Position::new(eof_line, eof_column, eof_offset), 0),
    ));

    Ok(tokens)
}

/// Consumes spaces and tabs, but not newlines (those are significant tokens).
fn inline_whitespace(input: NomSpan<'_>) -> IResult<NomSpan<'_>, ()> {
    value((), many0_count(one_of(" \t\r"))).parse(input)
}

fn lex_one<'a>(input: NomSpan<'a>) -> IResult<NomSpan<'a>, (TokenKind, String)> {
    alt((
        newline_tok,
        comment_tok,
        string_tok,
        number_tok,
        keyword_or_identifier_tok,
        operator_tok,
        punctuation_tok,
    ))
    .parse(input)
}

fn newline_tok(input: NomSpan<'_>) -> IResult<NomSpan<'_>, (TokenKind, String)> {
    map(char('\n'), |_| (TokenKind::Newline, "\n".to_string())).parse(input)
}

fn comment_tok(input: NomSpan<'_>) -> IResult<NomSpan<'_>, (TokenKind, String)> {
    map(
        recognize(preceded(char('#'), many0(none_of("\n")))),
        |span: NomSpan<'_>| (TokenKind::Comment, span.fragment().to_string()),
    )
    .parse(input)
}

/// True if `input` begins a string literal (an optional `f`/`F` prefix
/// immediately followed by `"`). Used to report unterminated strings with a
/// dedicated message instead of falling through to "unexpected character".
fn starts_string(input: NomSpan<'_>) -> bool {
    let mut chars = input.fragment().chars();
    match chars.next() {
        Some('"') => true,
        Some('f') | Some('F') => chars.next() == Some('"'),
        _ => false,
    }
}

/// String literals, with an optional `f` prefix preserved for the transformer.
/// Fails (rather than tolerating an unclosed literal) so the caller can
/// distinguish "unterminated string" from other lexical errors.
fn string_tok(input: NomSpan<'_>) -> IResult<NomSpan<'_>, (TokenKind, String)> {
    let (input, prefix) = opt(satisfy(|c| c == 'f' || c == 'F')).parse(input)?;
    let (input, _) = char('"')(input)?;
    let (input, body) = recognize(many0(string_char)).parse(input)?;
    let (input, _) = char('"')(input)?;

    let mut lexeme = String::new();
    if let Some(p) = prefix {
        lexeme.push(p);
    }
    lexeme.push('"');
    lexeme.push_str(body.fragment());
    lexeme.push('"');

    Ok((input, (TokenKind::String { prefix }, lexeme)))
}

fn string_char(input: NomSpan<'_>) -> IResult<NomSpan<'_>, char> {
    let (input, c) = none_of("\"\n")(input)?;
    if c == '\\' {
        alt((
            value('\n', char('n')),
            value('\r', char('r')),
            value('\t', char('t')),
            value('\\', char('\\')),
            value('"', char('"')),
            value('/', char('/')),
        ))
        .parse(input)
    } else {
        Ok((input, c))
    }
}

/// Numeric literals keep their surface text verbatim; normalization happens
/// later (the type checker only needs the `number` literal kind).
fn number_tok(input: NomSpan<'_>) -> IResult<NomSpan<'_>, (TokenKind, String)> {
    let digits = |i| recognize(many1(terminated(one_of("0123456789"), many0(char('_'))))).parse(i);

    let (input, text) = recognize(pair(
        digits,
        opt(pair(
            char('.'),
            pair(digits, opt(pair(one_of("eE"), pair(opt(one_of("+-")), digits)))),
        )),
    ))
    .parse(input)?;

    Ok((input, (TokenKind::Number, text.fragment().to_string())))
}

fn keyword_or_identifier_tok(input: NomSpan<'_>) -> IResult<NomSpan<'_>, (TokenKind, String)> {
    let (input, text) = recognize(pair(alt((alpha1, tag("_"))), many0(alt((alphanumeric1, tag("_")))))).parse(input)?;
    let text = text.fragment().to_string();

    let kind = match text.as_str() {
        "class" => TokenKind::Class,
        "def" => TokenKind::Def,
        "interface" => TokenKind::Interface,
        "extends" => TokenKind::Extends,
        "implements" => TokenKind::Implements,
        "abstract" => TokenKind::Abstract,
        "final" => TokenKind::Final,
        "static" => TokenKind::Static,
        "pass" => TokenKind::Pass,
        "return" => TokenKind::Return,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "for" => TokenKind::For,
        "in" => TokenKind::In,
        "switch" => TokenKind::Switch,
        "case" => TokenKind::Case,
        "default" => TokenKind::Default,
        "raise" => TokenKind::Raise,
        "import" => TokenKind::Import,
        "from" => TokenKind::From,
        "as" => TokenKind::As,
        "data" => TokenKind::Data,
        "enum" => TokenKind::Enum,
        "none" | "None" => TokenKind::None_,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "true" | "false" => TokenKind::Boolean,
        _ => TokenKind::Identifier,
    };

    Ok((input, (kind, text)))
}

/// Multi-character operators must be tried before their single-character prefixes.
fn operator_tok(input: NomSpan<'_>) -> IResult<NomSpan<'_>, (TokenKind, String)> {
    alt((
        value((TokenKind::Arrow, "->".to_string()), tag("->")),
        value((TokenKind::FatArrow, "=>".to_string()), tag("=>")),
        value((TokenKind::PlusAssign, "+=".to_string()), tag("+=")),
        value((TokenKind::MinusAssign, "-=".to_string()), tag("-=")),
        value((TokenKind::StarAssign, "*=".to_string()), tag("*=")),
        value((TokenKind::SlashAssign, "/=".to_string()), tag("/=")),
        value((TokenKind::Eq, "==".to_string()), tag("==")),
        value((TokenKind::NotEq, "!=".to_string()), tag("!=")),
        value((TokenKind::LtEq, "<=".to_string()), tag("<=")),
        value((TokenKind::GtEq, ">=".to_string()), tag(">=")),
        value((TokenKind::Assign, "=".to_string()), tag("=")),
        value((TokenKind::Plus, "+".to_string()), tag("+")),
        value((TokenKind::Minus, "-".to_string()), tag("-")),
        value((TokenKind::Star, "*".to_string()), tag("*")),
        value((TokenKind::Slash, "/".to_string()), tag("/")),
        value((TokenKind::Percent, "%".to_string()), tag("%")),
        value((TokenKind::Lt, "<".to_string()), tag("<")),
        value((TokenKind::Gt, ">".to_string()), tag(">")),
    ))
    .parse(input)
}

fn punctuation_tok(input: NomSpan<'_>) -> IResult<NomSpan<'_>, (TokenKind, String)> {
    alt((
        value((TokenKind::LBrace, "{".to_string()), tag("{")),
        value((TokenKind::RBrace, "}".to_string()), tag("}")),
        value((TokenKind::LParen, "(".to_string()), tag("(")),
        value((TokenKind::RParen, ")".to_string()), tag(")")),
        value((TokenKind::LBracket, "[".to_string()), tag("[")),
        value((TokenKind::RBracket, "]".to_string()), tag("]")),
        value((TokenKind::Comma, ",".to_string()), tag(",")),
        value((TokenKind::Dot, ".".to_string()), tag(".")),
        value((TokenKind::Colon, ":".to_string()), tag(":")),
        value((TokenKind::Semicolon, ";".to_string()), tag(";")),
    ))
    .parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(code: &str) -> SourceFile {
        SourceFile::in_memory(code.to_string())
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind.clone()).collect()
    }

    #[test]
    fn tokenizes_class_header() {
        let f = file("class Foo {\n}\n");
        let tokens = tokenize(&f).unwrap();
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Class,
                TokenKind::Identifier,
                TokenKind::LBrace,
                TokenKind::Newline,
                TokenKind::RBrace,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tokenizes_f_string_prefix() {
        let f = file(r#"f"hello {name}""#);
        let tokens = tokenize(&f).unwrap();
        match &tokens[0].kind {
            TokenKind::String { prefix } => assert_eq!(*prefix, Some('f')),
            other => panic!("expected string token, got {other:?}"),
        }
        assert_eq!(tokens[0].lexeme, r#"f"hello {name}""#);
    }

    #[test]
    fn tokenizes_number_with_separators_and_exponent() {
        let f = file("1_000.25e-3");
        let tokens = tokenize(&f).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].lexeme, "1_000.25e-3");
    }

    #[test]
    fn reports_unterminated_string() {
        let f = file("\"abc");
        let err = tokenize(&f).unwrap_err();
        assert!(matches!(err, CompileError::Lex(_)));
    }

    #[test]
    fn reports_unknown_character() {
        let f = file("class Foo { $ }");
        let err = tokenize(&f).unwrap_err();
        assert!(matches!(err, CompileError::Lex(_)));
    }

    #[test]
    fn comments_and_compound_operators() {
        let f = file("x += 1 # note\n");
        let tokens = tokenize(&f).unwrap();
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Identifier,
                TokenKind::PlusAssign,
                TokenKind::Number,
                TokenKind::Comment,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }
}
