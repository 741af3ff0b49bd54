#![no_main]

use core::fmt;
use std::io::{empty, sink, BufReader};

use itertools::Itertools;
use libfuzzer_sys::{arbitrary::Arbitrary, fuzz_target};
use modl::{EvaluationContext, MemoryLoader};

// Prelude operators, constants and names a program may have bound
#[derive(Arbitrary, Debug)]
enum ModlAtom {
    Add, Sub, Eq, Greater, If,
    True, False, Otherwise,
    Print, Read,

    Identifier(u8),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ModlAtom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", match self {
            ModlAtom::Add => "(+)",
            ModlAtom::Sub => "(-)",
            ModlAtom::Eq => "(=)",
            ModlAtom::Greater => "(>)",
            ModlAtom::If => "if",
            ModlAtom::True => "true",
            ModlAtom::False => "false",
            ModlAtom::Otherwise => "otherwise",
            ModlAtom::Print => "print!",
            ModlAtom::Read => "read!",
            ModlAtom::Identifier(index) => return write!(f, "v{}", index % 8),
            ModlAtom::Integer(value) => return write!(f, "{}", value),
            ModlAtom::Float(value) if value.is_finite() => return write!(f, "{:?}", value),
            ModlAtom::Float(_) => "0.0",
            ModlAtom::Text(text) => return write!(f, "{:?}", text.replace(['\\', '"'], "")),
        })
    }
}

#[derive(Arbitrary, Debug)]
enum ModlExpr {
    Application(Vec<ModlExpr>),
    Operator(u8, Box<ModlExpr>, Box<ModlExpr>),
    Function(Vec<u8>, Vec<ModlStatement>),
    Cond(Vec<(ModlExpr, Vec<ModlStatement>)>),

    Atom(ModlAtom),
}

#[derive(Arbitrary, Debug)]
enum ModlStatement {
    Let(Vec<(u8, ModlExpr)>),
    Expr(ModlExpr),
}

fn stringify_body(body: &[ModlStatement]) -> String {
    body.iter()
        .map(ModlStatement::to_string)
        .join(" ")
}

impl fmt::Display for ModlExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModlExpr::Atom(atom) => atom.fmt(f),
            ModlExpr::Application(elements) => write!(f, "({})", elements.iter().join(" ")),
            ModlExpr::Operator(operator, left, right) => {
                let operator = ["+", "-", "=", ">"][*operator as usize % 4];
                write!(f, "({} {} {})", left, operator, right)
            }
            ModlExpr::Function(parameters, body) => {
                let parameters = parameters.iter().map(|index| format!("v{}", index % 8)).join(" ");
                write!(f, "{{ {} | {} }}", parameters, stringify_body(body))
            }
            ModlExpr::Cond(cases) => {
                let cases = cases.iter()
                    .map(|(condition, body)| format!("| {} -> {}", condition, stringify_body(body)))
                    .join(" ");
                write!(f, "cond {} end", cases)
            }
        }
    }
}

impl fmt::Display for ModlStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModlStatement::Let(bindings) => {
                let bindings = bindings.iter()
                    .map(|(index, value)| format!("v{} <- {}", index % 8, value))
                    .join(", ");
                write!(f, "let {};", bindings)
            }
            ModlStatement::Expr(expr) => write!(f, "{};", expr),
        }
    }
}

fuzz_target!(|statements: Vec<ModlStatement>| {
    // Generated programs can apply functions to themselves and never finish
    let Ok(mut context) = EvaluationContext::new()
        .with_loader(MemoryLoader::new())
        .with_io(BufReader::new(empty()), sink())
        .with_call_limit(1_000)
        .with_prelude() else { return };

    for statement in statements {
        let _ = context.evaluate_str(&statement.to_string());
    }
});
