use std::{cell::RefCell, io::{BufRead, Cursor, Write}, path::{Path, PathBuf}, rc::Rc};

use anyhow::bail;
use itertools::Itertools;
use serde::{de::{Visitor, Error}, Deserialize, Serialize};

use crate::{context::EvaluationContext, loader::FileSystemLoader};

const ERROR_KINDS: [&str; 11] = [
    "LexError", "ParseError", "NameError", "TypeError", "NoMatchError",
    "NotCallableError", "ModuleLoadError", "UnknownBuiltinError", "ArityError", "IoError",
    "CallLimitError",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TestOutput {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    // Compared against the displayed value, "*" accepts anything
    Text(String),
}

#[derive(Debug, Clone)]
pub struct TestEvaluationResult(Result<TestOutput, String>);

impl From<TestEvaluationResult> for Result<TestOutput, String> {
    fn from(value: TestEvaluationResult) -> Self {
        value.0
    }
}

struct TestEvaluationResultVisitor {}

impl<'de> Deserialize<'de> for TestEvaluationResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: serde::Deserializer<'de> {

        deserializer.deserialize_map(TestEvaluationResultVisitor {})
    }
}

impl<'de> Visitor<'de> for TestEvaluationResultVisitor {
    type Value = TestEvaluationResult;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "A structure containing the boolean key 'ok'. If it's okay, contains the key 'output', otherwise the key 'type'")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: serde::de::MapAccess<'de>, {

        if map.next_key::<String>()? != Some("ok".to_owned()) {
            return Err(A::Error::custom("First key should be 'ok'"))
        }

        let ok: bool = map.next_value()?;
        let second_key = if ok { "output" } else { "type" };
        if map.next_key::<String>()?.as_deref().ok_or(A::Error::custom("Must have two keys"))? != second_key {
            return Err(A::Error::custom(format!("Second key should be '{}'", second_key)))
        }

        let result = if ok {
            TestEvaluationResult(Ok(map.next_value::<TestOutput>()?))
        } else {
            let kind = map.next_value::<String>()?;
            if !ERROR_KINDS.contains(&kind.as_str()) {
                return Err(A::Error::custom(format!("Unrecognized modl error: {}", kind)))
            }
            TestEvaluationResult(Err(kind))
        };

        if map.next_key::<String>()?.is_some() {
            return Err(A::Error::custom("Only two keys should be present"));
        }

        Ok(result)
    }
}

/// An in-memory output stream that can still be inspected after a clone of
/// it was handed to a context.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn base_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// The context fixtures run in: modules come from `test_inputs/modules`,
/// `read` always sees the same line and printed output is discarded.
pub fn test_context() -> EvaluationContext {
    EvaluationContext::new()
        .with_loader(FileSystemLoader::new(base_path().join("test_inputs").join("modules")))
        .with_io(Cursor::new("typed line\n".repeat(16)), std::io::sink())
}

fn load_input_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<String>> {
    let source = std::fs::read(path)?;
    Ok(source.lines().collect::<Result<Vec<String>, _>>()?)
}

fn load_output_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<TestEvaluationResult>> {
    let source = std::fs::read(path)?;
    let result: Vec<TestEvaluationResult> = serde_json::from_slice(&source)?;
    Ok(result)
}

pub fn load_test_pair(testcase: usize) -> anyhow::Result<Vec<(String, TestEvaluationResult)>> {
    if !all_testcases().any(|known| known == testcase) { bail!("Testcase out of bounds"); }

    let input = load_input_file(base_path().join("test_inputs").join(format!("{}.modl", testcase)))?;
    let output = load_output_file(base_path().join("test_outputs").join(format!("{}.json", testcase)))?;

    if input.len() != output.len() { bail!("Input and output of testcase {} do not match", testcase); }
    Ok(input.into_iter().zip(output).collect_vec())
}

pub fn all_testcases() -> impl Iterator<Item = usize> {
    1..=8
}
