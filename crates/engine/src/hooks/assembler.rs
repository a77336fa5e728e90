//! Lifecycle assembly
//!
//! Expands the fixed stage list into `pre<Stage>`, `<stage>`, `post<Stage>`
//! and builds the flat [`InstructionList`]: for every expanded name, the
//! `build.lifecycle` command hook (if any) followed by the plugin hooks
//! registered under that name.

use super::record::{HookFn, HookRecord, LifecycleHookTable, hook_fn};
use crate::command::CommandRunner;
use stagecraft_config::{LifecycleCommand, LifecycleCommands};
use stagecraft_core::{Error, lifecycle};
use std::collections::HashSet;
use std::sync::Arc;

/// Ordered hooks of one run
///
/// Holds at most one config-command record per lifecycle name, always ahead
/// of the plugin records for that name.
#[derive(Debug, Clone, Default)]
pub struct InstructionList {
    records: Vec<HookRecord>,
    config_hooks: HashSet<String>,
}

impl InstructionList {
    /// Create an empty list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a plugin record
    pub fn push(&mut self, record: HookRecord) {
        if record.is_config() {
            self.push_config(record);
        } else {
            self.records.push(record);
        }
    }

    /// Add a config-command record ahead of the records for its hook
    ///
    /// Returns `false` (and drops the record) if one is already present.
    pub fn push_config(&mut self, record: HookRecord) -> bool {
        if !self.config_hooks.insert(record.hook.clone()) {
            tracing::debug!(hook = %record.hook, "Config command already assembled, skipping");
            return false;
        }

        match self.records.iter().position(|r| r.hook == record.hook) {
            Some(index) => self.records.insert(index, record),
            None => self.records.push(record),
        }
        true
    }

    /// Records in execution order
    #[must_use]
    pub fn records(&self) -> &[HookRecord] {
        &self.records
    }

    /// Iterate records in execution order
    pub fn iter(&self) -> std::slice::Iter<'_, HookRecord> {
        self.records.iter()
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there is nothing to run
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Dry-run listing, one line per record
    ///
    /// `1. "prebuild" from config "config"`
    #[must_use]
    pub fn plan(&self) -> Vec<String> {
        self.records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                format!(
                    "{}. {:?} from {} {:?}",
                    index + 1,
                    record.hook,
                    record.source,
                    record.name
                )
            })
            .collect()
    }
}

impl IntoIterator for InstructionList {
    type Item = HookRecord;
    type IntoIter = std::vec::IntoIter<HookRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a InstructionList {
    type Item = &'a HookRecord;
    type IntoIter = std::slice::Iter<'a, HookRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Merges `build.lifecycle` commands with collected plugin hooks
pub struct LifecycleAssembler<'a> {
    lifecycle: &'a LifecycleCommands,
    table: &'a LifecycleHookTable,
    runner: Arc<dyn CommandRunner>,
}

impl<'a> LifecycleAssembler<'a> {
    /// Create an assembler; `runner` executes config commands
    pub fn new(
        lifecycle: &'a LifecycleCommands,
        table: &'a LifecycleHookTable,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            lifecycle,
            table,
            runner,
        }
    }

    /// Build the instruction list
    #[tracing::instrument(skip(self))]
    pub fn assemble(&self) -> InstructionList {
        self.warn_unknown_hooks();

        let mut list = InstructionList::new();
        for name in lifecycle::expand() {
            if let Some(command) = self.lifecycle.get(&name) {
                list.push_config(HookRecord::config(
                    name.clone(),
                    config_command(&name, command, &self.runner),
                ));
            }

            if let Some(records) = self.table.get(&name) {
                for record in records {
                    list.push(record.clone());
                }
            }
        }

        tracing::debug!(instructions = list.len(), "Lifecycle assembled");
        list
    }

    fn warn_unknown_hooks(&self) {
        for (hook, records) in self.table {
            if lifecycle::is_lifecycle_hook(hook) {
                continue;
            }
            for record in records {
                tracing::warn!(
                    plugin = %record.name,
                    "Plugin {} registers unknown lifecycle hook {:?}; it will not run",
                    record.name,
                    hook
                );
            }
        }

        for hook in self.lifecycle.keys() {
            if !lifecycle::is_lifecycle_hook(hook) {
                tracing::warn!(
                    "build.lifecycle.{} is not a lifecycle hook; it will not run",
                    hook
                );
            }
        }
    }
}

/// Hook running a `build.lifecycle` entry
///
/// The entry's commands run concurrently; the hook finishes once all of them
/// have. The first failure (in declaration order) is reported with the
/// entry's original text.
pub fn config_command(
    stage: &str,
    command: &LifecycleCommand,
    runner: &Arc<dyn CommandRunner>,
) -> HookFn {
    use rayon::prelude::*;

    let stage = stage.to_string();
    let original = command.original();
    let commands = command.commands();
    let runner = Arc::clone(runner);

    hook_fn(move |_settings| {
        tracing::debug!(stage = %stage, count = commands.len(), "Running config commands");

        let results: Vec<_> = commands
            .par_iter()
            .map(|command| runner.run(command, &[]))
            .collect();

        if let Some(failure) = results.into_iter().find_map(std::result::Result::err) {
            tracing::error!(stage = %stage, error = %failure, "Config command failed");
            return Err(Error::CommandExecution {
                stage: stage.clone(),
                command: original.clone(),
                output: failure.output(),
            });
        }

        Ok(None)
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::command::CommandError;
    use stagecraft_core::Settings;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRunner {
        commands: Mutex<Vec<String>>,
    }

    impl CommandRunner for RecordingRunner {
        fn run(
            &self,
            command: &str,
            _env: &[(&str, &str)],
        ) -> std::result::Result<String, CommandError> {
            self.commands.lock().unwrap().push(command.to_string());
            if command.starts_with("false") {
                return Err(CommandError::Failed {
                    command: command.to_string(),
                    status: Some(1),
                    output: "permission denied".to_string(),
                });
            }
            Ok(String::new())
        }
    }

    fn plugin(name: &str, hook: &str) -> HookRecord {
        HookRecord::plugin(name, hook, Settings::new(), hook_fn(|_| Ok(None)))
    }

    fn table(records: Vec<HookRecord>) -> LifecycleHookTable {
        let mut table = LifecycleHookTable::new();
        for record in records {
            table.entry(record.hook.clone()).or_default().push(record);
        }
        table
    }

    fn lifecycle_of(entries: &[(&str, &str)]) -> LifecycleCommands {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), LifecycleCommand::Script((*v).to_string())))
            .collect()
    }

    fn hooks(list: &InstructionList) -> Vec<(String, String)> {
        list.iter()
            .map(|r| (r.hook.clone(), r.name.clone()))
            .collect()
    }

    #[test]
    fn test_order_follows_lifecycle_not_registration() {
        let lifecycle = lifecycle_of(&[("postbuild", "echo post"), ("prebuild", "echo pre")]);
        let table = table(vec![
            plugin("p", "postdeploy"),
            plugin("p", "build"),
            plugin("q", "init"),
        ]);
        let runner: Arc<dyn CommandRunner> = Arc::new(RecordingRunner::default());

        let list = LifecycleAssembler::new(&lifecycle, &table, runner).assemble();

        assert_eq!(
            hooks(&list),
            vec![
                ("init".to_string(), "q".to_string()),
                ("prebuild".to_string(), "config".to_string()),
                ("build".to_string(), "p".to_string()),
                ("postbuild".to_string(), "config".to_string()),
                ("postdeploy".to_string(), "p".to_string()),
            ]
        );
    }

    #[test]
    fn test_config_command_comes_first_for_its_stage() {
        let lifecycle = lifecycle_of(&[("build", "make")]);
        let table = table(vec![plugin("a", "build"), plugin("b", "build")]);
        let runner: Arc<dyn CommandRunner> = Arc::new(RecordingRunner::default());

        let list = LifecycleAssembler::new(&lifecycle, &table, runner).assemble();
        let names: Vec<_> = list.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["config", "a", "b"]);
    }

    #[test]
    fn test_unknown_hooks_never_run() {
        let lifecycle = lifecycle_of(&[("onBuild", "echo nope")]);
        let table = table(vec![plugin("a", "onBuild"), plugin("a", "build")]);
        let runner: Arc<dyn CommandRunner> = Arc::new(RecordingRunner::default());

        let list = LifecycleAssembler::new(&lifecycle, &table, runner).assemble();
        assert_eq!(hooks(&list), vec![("build".to_string(), "a".to_string())]);
    }

    #[test]
    fn test_push_config_dedups() {
        let mut list = InstructionList::new();
        list.push(plugin("a", "build"));

        assert!(list.push_config(HookRecord::config("build", hook_fn(|_| Ok(None)))));
        assert!(!list.push_config(HookRecord::config("build", hook_fn(|_| Ok(None)))));
        list.push(HookRecord::config("build", hook_fn(|_| Ok(None))));

        assert_eq!(list.len(), 2);
        assert!(list.records()[0].is_config());
    }

    #[test]
    fn test_plan_lines() {
        let lifecycle = lifecycle_of(&[("prebuild", "echo pre")]);
        let table = table(vec![plugin("./plugins/zip", "postbuild")]);
        let runner: Arc<dyn CommandRunner> = Arc::new(RecordingRunner::default());

        let list = LifecycleAssembler::new(&lifecycle, &table, runner).assemble();
        assert_eq!(
            list.plan(),
            vec![
                r#"1. "prebuild" from config "config""#.to_string(),
                r#"2. "postbuild" from plugin "./plugins/zip""#.to_string(),
            ]
        );
    }

    #[test]
    fn test_config_command_runs_every_line() {
        let recorder = Arc::new(RecordingRunner::default());
        let runner: Arc<dyn CommandRunner> = recorder.clone();
        let command = LifecycleCommand::Script("echo one\n\necho two".to_string());

        let hook = config_command("build", &command, &runner);
        assert_eq!(hook(&Settings::new()).unwrap(), None);

        let mut ran = recorder.commands.lock().unwrap().clone();
        ran.sort();
        assert_eq!(ran, vec!["echo one", "echo two"]);
    }

    #[test]
    fn test_config_command_failure() {
        let recorder = Arc::new(RecordingRunner::default());
        let runner: Arc<dyn CommandRunner> = recorder.clone();
        let command =
            LifecycleCommand::List(vec!["echo ok".to_string(), "false deploy".to_string()]);

        let hook = config_command("deploy", &command, &runner);
        let err = hook(&Settings::new()).unwrap_err();

        match err {
            Error::CommandExecution {
                stage,
                command,
                output,
            } => {
                assert_eq!(stage, "deploy");
                assert_eq!(command, "echo ok\nfalse deploy");
                assert_eq!(output, "permission denied");
            }
            other => panic!("unexpected error: {other}"),
        }
        // Both commands still ran
        assert_eq!(recorder.commands.lock().unwrap().len(), 2);
    }
}
