#![allow(dead_code)]

use schema_studio_core::{
    FormatMode, PanelController, PanelMessage, PanelViewState, RawToolResult, SchemaTool,
    SessionOptions, ToolError,
};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

pub const CLEAN_LINT: &str = r#"{"health":100,"valid":true,"errors":[]}"#;

pub const TWO_LINT_FINDINGS: &str = r#"{"health":60,"valid":false,"errors":[
    {"id":"top_level_description","message":"Set a top-level description","description":"Documenting the schema helps consumers","path":"","schemaLocation":"/description","position":[1,1,12,1]},
    {"id":"top_level_examples","message":"Set top-level examples","path":"","schemaLocation":"/examples","position":[3,5,3,21]}
]}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Lint,
    Metaschema,
    Check,
    Rewrite,
}

struct Step {
    delay: Duration,
    result: Result<RawToolResult, ToolError>,
}

/// A [`SchemaTool`] that replays queued responses per `(operation, path)`.
///
/// Unscripted calls succeed with clean output.
#[derive(Default)]
pub struct ScriptedTool {
    steps: RefCell<HashMap<(Op, PathBuf), VecDeque<Step>>>,
    calls: RefCell<Vec<(Op, PathBuf)>>,
    version: Option<String>,
    version_calls: Cell<usize>,
}

impl ScriptedTool {
    pub fn new() -> Self {
        Self {
            version: Some("11.2.0\n".to_string()),
            ..Self::default()
        }
    }

    pub fn without_version(mut self) -> Self {
        self.version = None;
        self
    }

    pub fn respond(self, op: Op, path: &str, output: &str, exit_code: i32) -> Self {
        self.respond_after(op, path, Duration::ZERO, output, exit_code)
    }

    pub fn respond_after(
        self,
        op: Op,
        path: &str,
        delay: Duration,
        output: &str,
        exit_code: i32,
    ) -> Self {
        self.push(
            op,
            path,
            Step {
                delay,
                result: Ok(RawToolResult::new(output, exit_code)),
            },
        )
    }

    pub fn fail(self, op: Op, path: &str, error: ToolError) -> Self {
        self.push(
            op,
            path,
            Step {
                delay: Duration::ZERO,
                result: Err(error),
            },
        )
    }

    pub fn calls(&self, op: Op) -> usize {
        self.calls.borrow().iter().filter(|(o, _)| *o == op).count()
    }

    pub fn version_calls(&self) -> usize {
        self.version_calls.get()
    }

    fn push(self, op: Op, path: &str, step: Step) -> Self {
        self.steps
            .borrow_mut()
            .entry((op, PathBuf::from(path)))
            .or_default()
            .push_back(step);
        self
    }

    async fn run(&self, op: Op, path: &Path) -> Result<RawToolResult, ToolError> {
        self.calls.borrow_mut().push((op, path.to_path_buf()));
        let step = self
            .steps
            .borrow_mut()
            .get_mut(&(op, path.to_path_buf()))
            .and_then(VecDeque::pop_front);

        match step {
            Some(step) => {
                if !step.delay.is_zero() {
                    tokio::time::sleep(step.delay).await;
                }
                step.result
            }
            None if op == Op::Lint => Ok(RawToolResult::new(CLEAN_LINT, 0)),
            None => Ok(RawToolResult::new("", 0)),
        }
    }
}

impl SchemaTool for ScriptedTool {
    async fn lint(&self, path: &Path) -> Result<RawToolResult, ToolError> {
        self.run(Op::Lint, path).await
    }

    async fn metaschema(&self, path: &Path) -> Result<RawToolResult, ToolError> {
        self.run(Op::Metaschema, path).await
    }

    async fn format(&self, path: &Path, mode: FormatMode) -> Result<RawToolResult, ToolError> {
        let op = match mode {
            FormatMode::Check => Op::Check,
            FormatMode::Rewrite => Op::Rewrite,
        };
        self.run(op, path).await
    }

    async fn version(&self) -> Result<String, ToolError> {
        self.version_calls.set(self.version_calls.get() + 1);
        self.version.clone().ok_or_else(|| ToolError::NotFound {
            program: "jsonschema".to_string(),
        })
    }
}

pub fn controller(tool: ScriptedTool) -> PanelController<ScriptedTool> {
    PanelController::new(
        tool,
        SessionOptions {
            extension_version: "0.1.0-test".to_string(),
            ..SessionOptions::default()
        },
    )
}

/// Record every pushed state.
pub fn record_updates<T: SchemaTool>(
    controller: &PanelController<T>,
) -> Rc<RefCell<Vec<PanelViewState>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    controller.subscribe(move |message| {
        let PanelMessage::Update { state } = message;
        sink.borrow_mut().push(state.clone());
    });
    log
}
