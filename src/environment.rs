use core::fmt;
use std::{collections::HashMap, rc::Rc};

use crate::{error::ModlError, interpreter::Value};


// One layer of bindings introduced together by a `let` or a call. Frames are
// never modified once built; extending an environment always allocates a new
// frame in front of the shared chain.
struct Frame {
    bindings: HashMap<String, Value>,
    parent: Option<Environment>,
}

/// A chain of frames, innermost first. Cloning only bumps a reference count.
#[derive(Clone)]
pub struct Environment(Rc<Frame>);

impl Environment {
    pub fn root(bindings: HashMap<String, Value>) -> Self {
        Self(Rc::new(Frame { bindings, parent: None }))
    }

    /// The environment every program starts from.
    pub fn global() -> Self {
        Self::root(HashMap::from([
            ("!".to_owned(), Value::Bang),
            ("true".to_owned(), Value::Boolean(true)),
            ("false".to_owned(), Value::Boolean(false)),
            ("otherwise".to_owned(), Value::Boolean(true)),
        ]))
    }

    pub fn extend(&self, bindings: HashMap<String, Value>) -> Self {
        Self(Rc::new(Frame { bindings, parent: Some(self.clone()) }))
    }

    pub fn get(&self, name: &str) -> Result<Value, ModlError> {
        let mut frame = &self.0;
        loop {
            if let Some(value) = frame.bindings.get(name) {
                return Ok(value.clone())
            }
            match &frame.parent {
                Some(parent) => frame = &parent.0,
                None => return Err(ModlError::Name(name.to_owned())),
            }
        }
    }

    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut frame = &self.0;
        while let Some(parent) = &frame.parent {
            depth += 1;
            frame = &parent.0;
        }
        depth
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::global()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Environment(depth {})", self.depth())
    }
}
