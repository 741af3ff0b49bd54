use core::fmt;

use logos::{FilterResult, Lexer, Logos, Skip};
use num_bigint::BigInt;

use crate::error::{LexErrorKind, ModlError};


// Line tracking shared with the callbacks that swallow newlines
#[derive(Debug)]
struct ScanState {
    line: usize,
}

// Raw lexemes as recognised by logos. Longest match decides between the
// overlapping patterns, so e.g. `-5` is a number while `-` or `-.` are
// symbolic, and `/*` opens a comment rather than starting a symbol.
#[derive(Debug, Logos)]
#[logos(error = LexErrorKind, extras = ScanState)]
#[logos(skip r"[ \t\r\f]+")]
enum RawToken {
    #[token("\n", newline)]
    Newline,

    #[token("/*", comment)]
    Comment,

    #[regex(r#"([^ \t\r\n\f\p{Alphabetic}\p{N}(){},;"/*]|/+[^ \t\r\n\f\p{Alphabetic}\p{N}(){},;"/*]|\*+[^ \t\r\n\f\p{Alphabetic}\p{N}(){},;"/*])*\*+/"#, unopened_comment)]
    UnopenedComment,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,

    #[token("(")]
    OpenParen,

    #[token(")")]
    CloseParen,

    #[token("{")]
    OpenBrace,

    #[token("}")]
    CloseBrace,

    #[token("use")]
    Use,

    #[token("let")]
    Let,

    #[token("end")]
    End,

    #[token("cond")]
    Cond,

    #[regex(r"\{#[\p{Alphabetic}\p{N}'_]+!?\}", builtin)]
    Builtin(String),

    #[regex(r"\{#[\p{Alphabetic}\p{N}'_]*!?", unterminated_builtin)]
    UnterminatedBuiltin,

    #[regex(r"[\p{Alphabetic}--\p{Lu}][\p{Alphabetic}\p{N}'_]*!?", identifier)]
    Identifier,

    #[regex(r"\p{Lu}[\p{Alphabetic}\p{N}'_]*!?")]
    Typename,

    #[regex(r"-?[0-9]+", integer)]
    Integer(BigInt),

    #[regex(r"-?([0-9]+\.[0-9]*|\.[0-9]+)", float)]
    Float(f64),

    #[regex(r"-?([0-9]+\.[0-9]*|\.[0-9]+)\.[0-9.]*", malformed_number)]
    MalformedNumber,

    #[token("\"", string)]
    String(String),

    // Any run of symbol characters that contains neither `/*` nor `*/`
    #[regex(r#"([^ \t\r\n\f\p{Alphabetic}\p{N}(){},;"/*]|/+[^ \t\r\n\f\p{Alphabetic}\p{N}(){},;"/*]|\*+[^ \t\r\n\f\p{Alphabetic}\p{N}(){},;"/*])+(/+|\*+)?|/+|\*+"#)]
    Symbolic,
}

fn newline(lex: &mut Lexer<RawToken>) -> Skip {
    lex.extras.line += 1;
    Skip
}

fn comment(lex: &mut Lexer<RawToken>) -> FilterResult<(), LexErrorKind> {
    // Comments do not nest: the first `*/` closes the comment
    let remainder = lex.remainder();
    match remainder.find("*/") {
        Some(end) => {
            lex.extras.line += remainder[..end].matches('\n').count();
            lex.bump(end + 2);
            FilterResult::Skip
        }
        None => {
            lex.extras.line += remainder.matches('\n').count();
            FilterResult::Error(LexErrorKind::UnterminatedComment)
        }
    }
}

fn unopened_comment(_lex: &mut Lexer<RawToken>) -> Result<(), LexErrorKind> {
    Err(LexErrorKind::UnopenedComment)
}

fn builtin(lex: &mut Lexer<RawToken>) -> String {
    let slice = lex.slice();
    slice[2..slice.len() - 1].to_owned()
}

fn unterminated_builtin(_lex: &mut Lexer<RawToken>) -> Result<(), LexErrorKind> {
    Err(LexErrorKind::UnterminatedBuiltin)
}

fn identifier(lex: &mut Lexer<RawToken>) -> Result<(), LexErrorKind> {
    match lex.slice().strip_suffix('!') {
        Some(word @ ("use" | "let" | "end" | "cond")) => Err(LexErrorKind::ReservedBang(word.to_owned())),
        _ => Ok(()),
    }
}

fn integer(lex: &mut Lexer<RawToken>) -> Result<BigInt, LexErrorKind> {
    lex.slice().parse().map_err(|_| LexErrorKind::MalformedNumber)
}

fn float(lex: &mut Lexer<RawToken>) -> Result<f64, LexErrorKind> {
    lex.slice().parse().map_err(|_| LexErrorKind::MalformedNumber)
}

fn malformed_number(_lex: &mut Lexer<RawToken>) -> Result<(), LexErrorKind> {
    Err(LexErrorKind::MalformedNumber)
}

fn string(lex: &mut Lexer<RawToken>) -> Result<String, LexErrorKind> {
    let body = scan_string_body(lex.remainder());
    match body {
        Ok(body) => {
            lex.extras.line += body.newlines;
            lex.bump(body.length);
            Ok(body.literal)
        }
        Err(kind) => {
            lex.extras.line += lex.remainder().matches('\n').count();
            Err(kind)
        }
    }
}

struct StringBody {
    literal: String,
    // Bytes consumed, closing quote included
    length: usize,
    newlines: usize,
}

fn scan_string_body(text: &str) -> Result<StringBody, LexErrorKind> {
    let mut literal = String::new();
    let mut newlines = 0;
    let mut chars = text.char_indices();

    while let Some((offset, c)) = chars.next() {
        match c {
            '"' => return Ok(StringBody { literal, length: offset + 1, newlines }),
            '\\' => {
                let (_, escape) = chars.next().ok_or(LexErrorKind::UnterminatedString)?;
                match escape {
                    'n' => literal.push('\n'),
                    'r' => literal.push('\r'),
                    't' => literal.push('\t'),
                    '\\' => literal.push('\\'),
                    '"' => literal.push('"'),
                    'x' => {
                        let mut codepoint = 0;
                        for _ in 0..4 {
                            let digit = chars.next()
                                .and_then(|(_, c)| c.to_digit(16))
                                .ok_or(LexErrorKind::TruncatedUnicodeEscape)?;
                            codepoint = codepoint * 16 + digit;
                        }
                        literal.push(char::from_u32(codepoint).ok_or(LexErrorKind::InvalidCodepoint(codepoint))?);
                    }
                    other => return Err(LexErrorKind::InvalidEscape(other)),
                }
            }
            '\n' => {
                newlines += 1;
                literal.push('\n');
            }
            c => literal.push(c),
        }
    }

    Err(LexErrorKind::UnterminatedString)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Semicolon,
    Comma,
    Colon,
    Pipe,
    Bang,
    OpenBrace,
    CloseBrace,
    OpenParen,
    CloseParen,
    LeftArrow,
    RightArrow,
    Symbolic,

    Use,
    Let,
    End,
    Cond,

    Identifier,
    Typename,
    String,
    Integer,
    Float,
    Builtin,

    Eof,
}

/// Literal payloads carried by string, number and builtin tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Integer(BigInt),
    Float(f64),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(value) => write!(f, "{:?}", value),
            Self::Integer(value) => write!(f, "{}", value),
            Self::Float(value) => write!(f, "{:?}", value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub literal: Option<Literal>,
    pub line: usize,
}

impl Token {
    fn from_raw(raw: RawToken, lexeme: &str, line: usize) -> Self {
        let (kind, literal) = match raw {
            RawToken::Semicolon => (TokenKind::Semicolon, None),
            RawToken::Comma => (TokenKind::Comma, None),
            RawToken::OpenParen => (TokenKind::OpenParen, None),
            RawToken::CloseParen => (TokenKind::CloseParen, None),
            RawToken::OpenBrace => (TokenKind::OpenBrace, None),
            RawToken::CloseBrace => (TokenKind::CloseBrace, None),
            RawToken::Use => (TokenKind::Use, None),
            RawToken::Let => (TokenKind::Let, None),
            RawToken::End => (TokenKind::End, None),
            RawToken::Cond => (TokenKind::Cond, None),
            RawToken::Identifier => (TokenKind::Identifier, None),
            RawToken::Typename => (TokenKind::Typename, None),
            RawToken::Builtin(name) => (TokenKind::Builtin, Some(Literal::String(name))),
            RawToken::Integer(value) => (TokenKind::Integer, Some(Literal::Integer(value))),
            RawToken::Float(value) => (TokenKind::Float, Some(Literal::Float(value))),
            RawToken::String(value) => (TokenKind::String, Some(Literal::String(value))),
            // Reserved symbols are whole symbolic runs that happen to be in the table
            RawToken::Symbolic => (match lexeme {
                "->" => TokenKind::RightArrow,
                "<-" => TokenKind::LeftArrow,
                "!" => TokenKind::Bang,
                "|" => TokenKind::Pipe,
                ":" => TokenKind::Colon,
                _ => TokenKind::Symbolic,
            }, None),
            // Filtered out or turned into errors by their callbacks
            RawToken::Newline | RawToken::Comment | RawToken::UnopenedComment
            | RawToken::UnterminatedBuiltin | RawToken::MalformedNumber
                => unreachable!("skipped or rejected by the lexer callbacks"),
        };

        Self { kind, lexeme: lexeme.to_owned(), literal, line }
    }

    fn eof(line: usize) -> Self {
        Self { kind: TokenKind::Eof, lexeme: String::new(), literal: None, line }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.literal {
            Some(literal) => write!(f, "{:?} '{}' {}", self.kind, self.lexeme, literal),
            None => write!(f, "{:?} '{}'", self.kind, self.lexeme),
        }
    }
}

/// Scans `source` into tokens, always terminated by a single [`TokenKind::Eof`].
pub fn scan(source: &str) -> Result<Vec<Token>, ModlError> {
    let mut tokens = vec![];
    let mut lexer = RawToken::lexer_with_extras(source, ScanState { line: 1 });

    while let Some(result) = lexer.next() {
        let line = lexer.extras.line;
        match result {
            Ok(raw) => tokens.push(Token::from_raw(raw, lexer.slice(), line)),
            Err(kind) => return Err(ModlError::Lex { line, kind }),
        }
    }

    tokens.push(Token::eof(lexer.extras.line));
    tracing::trace!(count = tokens.len(), "scanned source");
    Ok(tokens)
}
