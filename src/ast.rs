use core::fmt;
use std::rc::Rc;

use itertools::Itertools;

pub use crate::scanner::Literal;


/// A type name from an annotation. Annotations are carried on the tree but
/// never checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Typename(pub String);

// Top-level units of a program and of function or case bodies
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Use(String),
    Let(Vec<Binding>),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub signature: Vec<Typename>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Symchain { left: Box<Expr>, operator: String, right: Box<Expr> },
    Identifier(String),
    Application(Vec<Expr>),
    Function(Rc<FunctionLiteral>),
    Literal(Literal),
    Builtin(String),
    Conditional(Vec<Case>),
}

/// `{ a b | body }`. Both lists are non-empty once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionLiteral {
    pub parameters: Vec<String>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub condition: Expr,
    pub body: Vec<Statement>,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self { kind, signature: Vec::new() }
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Identifier(name.into()))
    }
}

fn fmt_body(body: &[Statement]) -> String {
    body.iter().map(|statement| format!("{};", statement)).join(" ")
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Use(module) => write!(f, "use {:?}", module),
            Self::Let(bindings) => {
                let bindings = bindings.iter()
                    .map(|binding| format!("{} <- {}", binding.name, binding.value))
                    .join(", ");
                write!(f, "let {}", bindings)
            }
            Self::Expr(expr) => expr.fmt(f),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ExprKind::Symchain { left, operator, right } => write!(f, "({} {} {})", left, operator, right)?,
            ExprKind::Identifier(name) => write!(f, "{}", name)?,
            ExprKind::Application(elements) => write!(f, "({})", elements.iter().join(" "))?,
            ExprKind::Function(function)
                => write!(f, "{{ {} | {} }}", function.parameters.join(" "), fmt_body(&function.body))?,
            ExprKind::Literal(literal) => write!(f, "{}", literal)?,
            ExprKind::Builtin(name) => write!(f, "{{#{}}}", name)?,
            ExprKind::Conditional(cases) => {
                write!(f, "cond")?;
                for case in cases {
                    write!(f, " | {} -> {}", case.condition, fmt_body(&case.body))?;
                }
                write!(f, " end")?;
            }
        }

        if !self.signature.is_empty() {
            write!(f, ": {}", self.signature.iter().map(|typename| &typename.0).join(" -> "))?;
        }
        Ok(())
    }
}
