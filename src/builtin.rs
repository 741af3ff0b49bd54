use std::{collections::HashMap, io::{BufRead, Write}};

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::{context::Host, error::ModlError, interpreter::{Builtin, BuiltinFn, EvaluationResult, Value}};


/// The primitives `{#name}` literals can refer to.
///
/// Lookups happen when the literal is evaluated, so a table without some
/// entry only fails for programs that actually reach it.
#[derive(Clone)]
pub struct BuiltinTable {
    builtins: HashMap<&'static str, Builtin>,
}

impl BuiltinTable {
    pub fn empty() -> Self {
        Self { builtins: HashMap::new() }
    }

    pub fn insert(&mut self, name: &'static str, function: BuiltinFn) -> &mut Self {
        self.builtins.insert(name, Builtin { name, function });
        self
    }

    pub fn lookup(&self, name: &str) -> Result<Builtin, ModlError> {
        self.builtins.get(name)
            .copied()
            .ok_or_else(|| ModlError::UnknownBuiltin(name.to_owned()))
    }
}

impl Default for BuiltinTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table
            .insert("print", builtin_print)
            .insert("read", builtin_read)
            .insert("add", builtin_add)
            .insert("sub", builtin_sub)
            .insert("eq", builtin_eq)
            .insert("gt", builtin_gt)
            .insert("if", builtin_if);
        table
    }
}

fn expect_arguments<const N: usize>(name: &str, values: Vec<Value>) -> Result<[Value; N], ModlError> {
    let found = values.len();
    values.try_into().map_err(|_| ModlError::Arity { name: name.to_owned(), expected: N, found })
}

fn type_error(name: &str, a: &Value, b: &Value) -> ModlError {
    ModlError::Type(format!("{} is not defined for {} and {}", name, a.type_name(), b.type_name()))
}

fn to_float(value: &BigInt) -> Result<f64, ModlError> {
    value.to_f64()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ModlError::Type(format!("{} does not fit in a float", value)))
}

// Mixed integer/float arithmetic promotes the integer
fn arithmetic(name: &str, values: Vec<Value>, integer: fn(BigInt, BigInt) -> BigInt, float: fn(f64, f64) -> f64) -> EvaluationResult {
    let [a, b] = expect_arguments(name, values)?;
    match (a, b) {
        (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(integer(a, b))),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(float(a, b))),
        (Value::Integer(a), Value::Float(b)) => Ok(Value::Float(float(to_float(&a)?, b))),
        (Value::Float(a), Value::Integer(b)) => Ok(Value::Float(float(a, to_float(&b)?))),
        (a, b) => Err(type_error(name, &a, &b)),
    }
}

fn builtin_add(values: Vec<Value>, _host: &mut Host) -> EvaluationResult {
    if let [Value::String(a), Value::String(b)] = values.as_slice() {
        return Ok(Value::String(format!("{}{}", a, b).into()));
    }
    arithmetic("add", values, |a, b| a + b, |a, b| a + b)
}

fn builtin_sub(values: Vec<Value>, _host: &mut Host) -> EvaluationResult {
    arithmetic("sub", values, |a, b| a - b, |a, b| a - b)
}

fn builtin_eq(values: Vec<Value>, _host: &mut Host) -> EvaluationResult {
    let [a, b] = expect_arguments("eq", values)?;
    Ok(Value::Boolean(a.equals(&b)))
}

fn builtin_gt(values: Vec<Value>, _host: &mut Host) -> EvaluationResult {
    let [a, b] = expect_arguments("gt", values)?;
    let greater = match (&a, &b) {
        (Value::Integer(x), Value::Integer(y)) => x > y,
        (Value::Float(x), Value::Float(y)) => x > y,
        (Value::Integer(x), Value::Float(y)) => to_float(x)? > *y,
        (Value::Float(x), Value::Integer(y)) => *x > to_float(y)?,
        (Value::String(x), Value::String(y)) => x > y,
        _ => return Err(type_error("gt", &a, &b)),
    };
    Ok(Value::Boolean(greater))
}

fn builtin_if(values: Vec<Value>, _host: &mut Host) -> EvaluationResult {
    let [condition, then, otherwise] = expect_arguments("if", values)?;
    match condition {
        Value::Boolean(true) => Ok(then),
        Value::Boolean(false) => Ok(otherwise),
        other => Err(ModlError::Type(format!("if needs a boolean, got {}", other.type_name()))),
    }
}

fn builtin_print(values: Vec<Value>, host: &mut Host) -> EvaluationResult {
    let [value] = expect_arguments("print", values)?;
    writeln!(host.output, "{}", value).map_err(|error| ModlError::Io(error.to_string()))?;
    Ok(Value::Nothing)
}

// Arguments are only there to trigger the call
fn builtin_read(_values: Vec<Value>, host: &mut Host) -> EvaluationResult {
    let mut line = String::new();
    host.input.read_line(&mut line).map_err(|error| ModlError::Io(error.to_string()))?;

    let line = line.trim_end_matches(['\n', '\r']);
    Ok(Value::String(line.into()))
}
