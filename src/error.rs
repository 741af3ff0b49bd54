use thiserror::Error;


/// Reasons the scanner can reject a piece of source text.
///
/// `logos` needs its error type to be `Default`, which is why the catch-all
/// for input no pattern accepts is the default variant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
pub enum LexErrorKind {
    #[default]
    #[error("unexpected character")]
    UnexpectedCharacter,

    #[error("unterminated string")]
    UnterminatedString,

    #[error("unterminated comment")]
    UnterminatedComment,

    #[error("unopened comment")]
    UnopenedComment,

    #[error("unterminated builtin literal")]
    UnterminatedBuiltin,

    #[error("\\{0} is not an escape sequence")]
    InvalidEscape(char),

    #[error("\\x escape needs exactly 4 hex digits")]
    TruncatedUnicodeEscape,

    #[error("{0:#06x} is not a unicode scalar value")]
    InvalidCodepoint(u32),

    #[error("wrong number literal")]
    MalformedNumber,

    #[error("reserved word '{0}' cannot end in '!'")]
    ReservedBang(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModlError {
    #[error("[line {line}] LexError: {kind}")]
    Lex { line: usize, kind: LexErrorKind },

    #[error("[line {line}] ParseError at '{lexeme}': {message}")]
    Parse { line: usize, lexeme: String, message: String },

    #[error("NameError: '{0}' is not bound")]
    Name(String),

    #[error("TypeError: {0}")]
    Type(String),

    #[error("NoMatchError: no case of the conditional matched")]
    NoMatch,

    #[error("NotCallableError: {0} is not a function")]
    NotCallable(String),

    #[error("ModuleLoadError: cannot load '{module}': {reason}")]
    ModuleLoad { module: String, reason: String },

    #[error("UnknownBuiltinError: no builtin named '{0}'")]
    UnknownBuiltin(String),

    #[error("ArityError: {name} expects {expected} argument(s), got {found}")]
    Arity { name: String, expected: usize, found: usize },

    #[error("IoError: {0}")]
    Io(String),

    #[error("CallLimitError: more than {0} function calls in one statement")]
    CallLimit(usize),
}

impl ModlError {
    /// The taxonomy name of the error, as used in test expectations and reports.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Lex { .. } => "LexError",
            Self::Parse { .. } => "ParseError",
            Self::Name(_) => "NameError",
            Self::Type(_) => "TypeError",
            Self::NoMatch => "NoMatchError",
            Self::NotCallable(_) => "NotCallableError",
            Self::ModuleLoad { .. } => "ModuleLoadError",
            Self::UnknownBuiltin(_) => "UnknownBuiltinError",
            Self::Arity { .. } => "ArityError",
            Self::Io(_) => "IoError",
            Self::CallLimit(_) => "CallLimitError",
        }
    }
}
