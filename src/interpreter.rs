use core::fmt;
use std::{collections::HashMap, rc::Rc};

use num_bigint::BigInt;
use num_traits::FromPrimitive;

use crate::{
    ast::{Binding, Case, Expr, ExprKind, FunctionLiteral, Literal, Statement},
    context::Host,
    environment::Environment,
    error::ModlError,
    parser::parse_source,
};

pub type EvaluationResult = Result<Value, ModlError>;

pub type BuiltinFn = fn(Vec<Value>, &mut Host) -> EvaluationResult;


/// A primitive supplied by the host, see [`crate::BuiltinTable`].
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub function: BuiltinFn,
}

/// A function literal together with the environment it was created in.
///
/// Partial application does not copy the literal: it binds the supplied
/// arguments in a new frame and remembers how many parameters are used up.
#[derive(Clone)]
pub struct Closure {
    function: Rc<FunctionLiteral>,
    applied: usize,
    environment: Environment,
}

impl Closure {
    fn parameters(&self) -> &[String] {
        &self.function.parameters[self.applied..]
    }

    /// Number of arguments still needed before the body runs.
    pub fn arity(&self) -> usize {
        self.parameters().len()
    }

    fn bind(&self, arguments: Vec<Value>) -> Environment {
        let bindings = self.parameters().iter().cloned().zip(arguments).collect();
        self.environment.extend(bindings)
    }

    fn partial(self, arguments: Vec<Value>) -> Self {
        let applied = self.applied + arguments.len();
        let environment = self.bind(arguments);
        Self { function: self.function, applied, environment }
    }
}

#[derive(Clone)]
pub enum Value {
    String(Rc<str>),
    Integer(BigInt),
    Float(f64),
    Boolean(bool),
    // What `!` is bound to
    Bang,
    // Produced by `let`, `use` and side-effecting builtins
    Nothing,
    Closure(Closure),
    Builtin(Builtin),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Boolean(_) => "boolean",
            Self::Bang => "bang",
            Self::Nothing => "nothing",
            Self::Closure(_) => "function",
            Self::Builtin(_) => "builtin",
        }
    }

    /// Structural equality on scalars. Integers and floats compare by numeric
    /// value; functions are not equal to anything, themselves included.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            // Exact: the float must be a whole number equal to the integer
            (Self::Integer(a), Self::Float(b)) | (Self::Float(b), Self::Integer(a))
                => b.fract() == 0.0 && BigInt::from_f64(*b).is_some_and(|b| *a == b),
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Bang, Self::Bang) | (Self::Nothing, Self::Nothing) => true,
            _ => false,
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::String(value) => Self::String(value.as_str().into()),
            Literal::Integer(value) => Self::Integer(value.clone()),
            Literal::Float(value) => Self::Float(*value),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(value) => write!(f, "{}", value),
            Self::Integer(value) => write!(f, "{}", value),
            Self::Float(value) => write!(f, "{:?}", value),
            Self::Boolean(value) => write!(f, "{}", value),
            Self::Bang => write!(f, "!"),
            Self::Nothing => write!(f, "nothing"),
            Self::Closure(closure) => write!(f, "<function/{}>", closure.arity()),
            Self::Builtin(builtin) => write!(f, "<builtin {}>", builtin.name),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(value) => write!(f, "{:?}", value),
            other => fmt::Display::fmt(other, f),
        }
    }
}

// What evaluating in tail position produces. A pending call is handed back
// to the loop in `apply` instead of being made here, so tail calls never
// nest on the native stack.
enum Outcome {
    Value(Value),
    TailCall { callee: Value, arguments: Vec<Value> },
}

/// Calls `callee` with `arguments`, running tail calls made by closure
/// bodies in a loop rather than by recursion.
#[tracing::instrument(level = "trace", skip_all, fields(arguments = arguments.len()))]
pub fn apply(mut callee: Value, mut arguments: Vec<Value>, host: &mut Host) -> EvaluationResult {
    loop {
        match callee {
            Value::Closure(closure) => {
                let arity = closure.arity();
                if arguments.len() < arity {
                    return Ok(Value::Closure(closure.partial(arguments)));
                }

                host.count_call()?;
                let leftover = arguments.split_off(arity);
                let scope = closure.bind(arguments);
                let outcome = evaluate_body(&closure.function.body, &scope, host)?;

                match (outcome, leftover.is_empty()) {
                    (Outcome::Value(value), true) => return Ok(value),
                    (Outcome::TailCall { callee: next, arguments: next_arguments }, true) => {
                        tracing::trace!(arguments = next_arguments.len(), "tail call");
                        callee = next;
                        arguments = next_arguments;
                    }
                    // Extra arguments go to whatever the body returned
                    (Outcome::Value(value), false) => {
                        callee = value;
                        arguments = leftover;
                    }
                    (Outcome::TailCall { callee: next, arguments: next_arguments }, false) => {
                        callee = apply(next, next_arguments, host)?;
                        arguments = leftover;
                    }
                }
            }
            Value::Builtin(builtin) => return (builtin.function)(arguments, host),
            other => return Err(ModlError::NotCallable(other.to_string())),
        }
    }
}

fn evaluate_literal(literal: &Literal) -> EvaluationResult {
    Ok(Value::from(literal))
}

fn evaluate_function(function: &Rc<FunctionLiteral>, environment: &Environment) -> EvaluationResult {
    Ok(Value::Closure(Closure {
        function: function.clone(),
        applied: 0,
        environment: environment.clone(),
    }))
}

fn evaluate_list(list: &[Expr], environment: &Environment, host: &mut Host) -> Result<Vec<Value>, ModlError> {
    list.iter()
        .map(|expr| evaluate_expr(expr, environment, host))
        .collect()
}

fn evaluate_symchain(left: &Expr, operator: &str, right: &Expr, environment: &Environment, host: &mut Host) -> Result<Outcome, ModlError> {
    // Operands are siblings: each one sees the incoming environment only
    let left = evaluate_expr(left, environment, host)?;
    let callee = environment.get(operator)?;
    let right = evaluate_expr(right, environment, host)?;

    Ok(Outcome::TailCall { callee, arguments: vec![left, right] })
}

fn evaluate_application(elements: &[Expr], environment: &Environment, host: &mut Host) -> Result<Outcome, ModlError> {
    let (head, rest) = elements.split_first()
        .ok_or_else(|| ModlError::Type("empty application".to_owned()))?;

    let callee = evaluate_expr(head, environment, host)?;
    let arguments = evaluate_list(rest, environment, host)?;
    Ok(Outcome::TailCall { callee, arguments })
}

fn evaluate_conditional(cases: &[Case], environment: &Environment, host: &mut Host) -> Result<Outcome, ModlError> {
    // Every test runs against the environment the conditional started in, and
    // whatever the chosen body binds stays inside the body
    for case in cases {
        match evaluate_expr(&case.condition, environment, host)? {
            Value::Boolean(true) => return evaluate_body(&case.body, environment, host),
            Value::Boolean(false) => {}
            other => return Err(ModlError::Type(format!(
                "condition must be a boolean, got {} {}", other.type_name(), other
            ))),
        }
    }

    Err(ModlError::NoMatch)
}

// Runs a function or case body. The last statement is evaluated in tail
// position, so a call there is returned rather than made.
fn evaluate_body(body: &[Statement], environment: &Environment, host: &mut Host) -> Result<Outcome, ModlError> {
    let Some((last, init)) = body.split_last() else { return Ok(Outcome::Value(Value::Nothing)) };

    let mut environment = environment.clone();
    for statement in init {
        let (_, next) = evaluate(statement, &environment, host)?;
        environment = next;
    }

    match last {
        Statement::Expr(expr) => evaluate_tail(expr, &environment, host),
        statement => evaluate(statement, &environment, host).map(|(value, _)| Outcome::Value(value)),
    }
}

fn evaluate_tail(expr: &Expr, environment: &Environment, host: &mut Host) -> Result<Outcome, ModlError> {
    match &expr.kind {
        ExprKind::Symchain { left, operator, right } => evaluate_symchain(left, operator, right, environment, host),
        ExprKind::Application(elements) => evaluate_application(elements, environment, host),
        ExprKind::Conditional(cases) => evaluate_conditional(cases, environment, host),
        _ => evaluate_expr(expr, environment, host).map(Outcome::Value),
    }
}

pub(crate) fn evaluate_expr(expr: &Expr, environment: &Environment, host: &mut Host) -> EvaluationResult {
    match &expr.kind {
        ExprKind::Literal(literal) => evaluate_literal(literal),
        ExprKind::Identifier(name) => environment.get(name),
        ExprKind::Function(function) => evaluate_function(function, environment),
        ExprKind::Builtin(name) => host.builtins.lookup(name).map(Value::Builtin),
        ExprKind::Symchain { .. } | ExprKind::Application(_) | ExprKind::Conditional(_) => {
            match evaluate_tail(expr, environment, host)? {
                Outcome::Value(value) => Ok(value),
                Outcome::TailCall { callee, arguments } => apply(callee, arguments, host),
            }
        }
    }
}

fn evaluate_let(bindings: &[Binding], environment: &Environment, host: &mut Host) -> Result<(Value, Environment), ModlError> {
    // All bindings land in one new frame, but each value only sees the ones
    // before it, through a snapshot of the frame so far
    let mut frame = HashMap::new();

    for binding in bindings {
        let scope = if frame.is_empty() { environment.clone() } else { environment.extend(frame.clone()) };
        let value = evaluate_expr(&binding.value, &scope, host)?;
        frame.insert(binding.name.clone(), value);
    }

    Ok((Value::Nothing, environment.extend(frame)))
}

#[tracing::instrument(level = "debug", skip(environment, host))]
fn evaluate_use(module: &str, environment: &Environment, host: &mut Host) -> Result<(Value, Environment), ModlError> {
    let source = host.loader.load(module)?;
    let statements = parse_source(&source).map_err(|error| ModlError::ModuleLoad {
        module: module.to_owned(),
        reason: error.to_string(),
    })?;

    let mut environment = environment.clone();
    for statement in &statements {
        let (_, next) = evaluate(statement, &environment, host)?;
        environment = next;
    }

    tracing::debug!(statements = statements.len(), "module evaluated");
    Ok((Value::Nothing, environment))
}

/// Evaluates one statement, returning its value and the environment the
/// statements after it should run in.
pub fn evaluate(statement: &Statement, environment: &Environment, host: &mut Host) -> Result<(Value, Environment), ModlError> {
    match statement {
        Statement::Use(module) => evaluate_use(module, environment, host),
        Statement::Let(bindings) => evaluate_let(bindings, environment, host),
        Statement::Expr(expr) => Ok((evaluate_expr(expr, environment, host)?, environment.clone())),
    }
}
