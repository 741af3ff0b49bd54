use std::{collections::HashMap, path::{Path, PathBuf}};

use crate::error::ModlError;


/// Source of the prelude, reachable as `use "std";`.
pub const PRELUDE: &str = include_str!("../std/prelude.modl");

const PRELUDE_MODULE: &str = "std";

/// Resolves the string of a `use` statement to program text.
pub trait ModuleLoader {
    fn load(&self, module: &str) -> Result<String, ModlError>;
}

/// Reads modules from files below a root directory. A reference without an
/// extension gets `.modl` appended.
#[derive(Debug, Clone)]
pub struct FileSystemLoader {
    root: PathBuf,
}

impl FileSystemLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, module: &str) -> PathBuf {
        let path = Path::new(module);
        let path = if path.extension().is_none() { path.with_extension("modl") } else { path.to_owned() };
        self.root.join(path)
    }
}

impl ModuleLoader for FileSystemLoader {
    fn load(&self, module: &str) -> Result<String, ModlError> {
        if module == PRELUDE_MODULE {
            return Ok(PRELUDE.to_owned());
        }

        let path = self.resolve(module);
        tracing::debug!(module, path = %path.display(), "loading module");

        std::fs::read_to_string(&path).map_err(|error| ModlError::ModuleLoad {
            module: module.to_owned(),
            reason: error.to_string(),
        })
    }
}

/// Serves modules from a fixed map, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    modules: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, module: impl Into<String>, source: impl Into<String>) -> Self {
        self.modules.insert(module.into(), source.into());
        self
    }
}

impl ModuleLoader for MemoryLoader {
    fn load(&self, module: &str) -> Result<String, ModlError> {
        if let Some(source) = self.modules.get(module) {
            return Ok(source.clone());
        }
        if module == PRELUDE_MODULE {
            return Ok(PRELUDE.to_owned());
        }

        Err(ModlError::ModuleLoad { module: module.to_owned(), reason: "no such module".to_owned() })
    }
}
