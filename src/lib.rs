mod ast;
mod builtin;
mod context;
mod environment;
mod error;
mod interpreter;
mod loader;
mod parser;
mod scanner;

#[cfg(test)]
mod test_utils;

pub use ast::{Binding, Case, Expr, ExprKind, FunctionLiteral, Statement, Typename};
pub use builtin::BuiltinTable;
pub use context::{EvaluationContext, Host};
pub use environment::Environment;
pub use error::{LexErrorKind, ModlError};
pub use interpreter::{apply, evaluate, Builtin, BuiltinFn, Closure, EvaluationResult, Value};
pub use loader::{FileSystemLoader, MemoryLoader, ModuleLoader, PRELUDE};
pub use parser::{parse, parse_source};
pub use scanner::{scan, Literal, Token, TokenKind};
