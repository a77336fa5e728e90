//! Lifecycle execution
//!
//! The [`Engine`] walks the instruction list strictly in order. Each hook gets
//! its own settings; a non-empty return value is shallow-merged into the
//! manifest. The first failure aborts the run.

use super::assembler::InstructionList;
use super::record::HookRecord;
use stagecraft_core::{Error, Manifest, Result};

/// Progress callback invoked before each hook runs
pub trait ProgressReporter {
    /// `index` is 1-based over the whole instruction list
    fn hook_started(&self, index: usize, record: &HookRecord);
}

/// Reporter that ignores progress
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReporter;

impl ProgressReporter for NoOpReporter {
    fn hook_started(&self, _index: usize, _record: &HookRecord) {}
}

/// Implement ProgressReporter for closures
impl<F> ProgressReporter for F
where
    F: Fn(usize, &HookRecord),
{
    fn hook_started(&self, index: usize, record: &HookRecord) {
        self(index, record);
    }
}

/// Engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Not started
    Idle,
    /// Running hooks
    Running,
    /// Every hook ran
    Completed,
    /// A hook failed
    Aborted,
}

/// Sequential hook runner
pub struct Engine<R = NoOpReporter>
where
    R: ProgressReporter,
{
    instructions: InstructionList,
    state: EngineState,
    manifest: Manifest,
    processed: usize,
    reporter: R,
}

impl Engine<NoOpReporter> {
    /// Create an engine for `instructions`
    #[must_use]
    pub fn new(instructions: InstructionList) -> Self {
        Self {
            instructions,
            state: EngineState::Idle,
            manifest: Manifest::new(),
            processed: 0,
            reporter: NoOpReporter,
        }
    }
}

impl<R> Engine<R>
where
    R: ProgressReporter,
{
    /// Report progress through `reporter`
    #[must_use]
    pub fn reporter<R2: ProgressReporter>(self, reporter: R2) -> Engine<R2> {
        Engine {
            instructions: self.instructions,
            state: self.state,
            manifest: self.manifest,
            processed: self.processed,
            reporter,
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Manifest accumulated so far (kept after an abort for diagnostics)
    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Number of instructions processed, including skipped ones
    #[must_use]
    pub fn processed(&self) -> usize {
        self.processed
    }

    /// Run every instruction and return the final manifest
    ///
    /// # Errors
    ///
    /// Returns the first hook failure. [`Error::CommandExecution`] is passed
    /// through unchanged; other failures are reported as
    /// [`Error::HookExecution`] naming the hook. Running an engine twice is
    /// an error.
    #[tracing::instrument(skip(self), fields(instructions = self.instructions.len()))]
    pub fn run(&mut self) -> Result<Manifest> {
        if self.state != EngineState::Idle {
            return Err(Error::Message(format!(
                "Engine cannot run from state {:?}",
                self.state
            )));
        }
        self.state = EngineState::Running;

        for (index, record) in self.instructions.iter().enumerate() {
            self.processed += 1;

            if record.method.is_none() {
                tracing::debug!(hook = %record.hook, plugin = %record.name, "No method, skipping");
                continue;
            }
            self.reporter.hook_started(index + 1, record);

            let span = tracing::debug_span!(
                "hook_execution",
                hook = %record.hook,
                plugin = %record.name,
                source = %record.source,
            );
            let _guard = span.enter();

            match record.invoke() {
                Some(Ok(Some(values))) => {
                    tracing::debug!(keys = values.len(), "Hook returned values");
                    self.manifest.extend(values);
                }
                Some(Ok(None)) | None => {}
                Some(Err(e)) => {
                    tracing::error!(error = %e, "Hook failed, aborting");
                    self.state = EngineState::Aborted;
                    return Err(wrap_error(e, record));
                }
            }
        }

        self.state = EngineState::Completed;
        Ok(self.manifest.clone())
    }
}

fn wrap_error(error: Error, record: &HookRecord) -> Error {
    match error {
        e @ (Error::CommandExecution { .. } | Error::HookExecution { .. }) => e,
        other => Error::HookExecution {
            name: record.name.clone(),
            hook: record.hook.clone(),
            message: other.to_string(),
        },
    }
}
