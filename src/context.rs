use std::io::{BufRead, BufReader, Write};

use crate::{
    ast::Statement,
    builtin::BuiltinTable,
    environment::Environment,
    error::ModlError,
    interpreter::{evaluate, Value},
    loader::{FileSystemLoader, ModuleLoader},
    parser::parse_source,
};


/// Everything outside the program that evaluation can reach: the builtin
/// table, module loading and the streams `print` and `read` use.
pub struct Host {
    pub builtins: BuiltinTable,
    pub loader: Box<dyn ModuleLoader>,
    pub input: Box<dyn BufRead>,
    pub output: Box<dyn Write>,
    /// Closure calls allowed per top-level statement, unbounded when `None`.
    pub call_limit: Option<usize>,
    calls: usize,
}

impl Host {
    pub(crate) fn count_call(&mut self) -> Result<(), ModlError> {
        if let Some(limit) = self.call_limit {
            if self.calls >= limit {
                return Err(ModlError::CallLimit(limit));
            }
            self.calls += 1;
        }
        Ok(())
    }
}

impl Default for Host {
    fn default() -> Self {
        Self {
            builtins: BuiltinTable::default(),
            loader: Box::new(FileSystemLoader::new(".")),
            input: Box::new(BufReader::new(std::io::stdin())),
            output: Box::new(std::io::stdout()),
            call_limit: None,
            calls: 0,
        }
    }
}

/// An evaluation context that takes source text or statements and evaluates
/// them to give values.
///
/// Bindings made by one statement are visible to the next. A statement that
/// fails leaves the environment exactly as it was before it started.
#[derive(Default)]
pub struct EvaluationContext {
    environment: Environment,
    host: Host,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loader(mut self, loader: impl ModuleLoader + 'static) -> Self {
        self.host.loader = Box::new(loader);
        self
    }

    pub fn with_builtins(mut self, builtins: BuiltinTable) -> Self {
        self.host.builtins = builtins;
        self
    }

    pub fn with_io(mut self, input: impl BufRead + 'static, output: impl Write + 'static) -> Self {
        self.host.input = Box::new(input);
        self.host.output = Box::new(output);
        self
    }

    /// Fails any statement that makes more than `limit` closure calls.
    pub fn with_call_limit(mut self, limit: usize) -> Self {
        self.host.call_limit = Some(limit);
        self
    }

    /// Evaluates `use "std";`, binding the operators and bang functions.
    pub fn with_prelude(mut self) -> Result<Self, ModlError> {
        self.evaluate_str("use \"std\";")?;
        Ok(self)
    }

    pub fn evaluate_statement(&mut self, statement: &Statement) -> Result<Value, ModlError> {
        tracing::debug!(%statement, "evaluating statement");
        self.host.calls = 0;
        let (value, environment) = evaluate(statement, &self.environment, &mut self.host)?;
        self.environment = environment;
        Ok(value)
    }

    /// Evaluates every statement in `input` in order and returns the value of
    /// the last one. Statements before a failing one stay committed.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn evaluate_str(&mut self, input: &str) -> Result<Value, ModlError> {
        let statements = parse_source(input)?;

        let mut value = Value::Nothing;
        for statement in &statements {
            value = self.evaluate_statement(statement)?;
        }
        Ok(value)
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn lookup(&self, name: &str) -> Result<Value, ModlError> {
        self.environment.get(name)
    }
}
