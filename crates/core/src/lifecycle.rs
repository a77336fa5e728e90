//! Build lifecycle stages
//!
//! The lifecycle is a fixed list of stages. Each stage `S` expands into three
//! slots, `preS`, `S` and `postS`, and the full lifecycle is the concatenation
//! of those triples in stage order.

/// Stages of a build, in execution order
pub const STAGES: [&str; 10] = [
    "init",
    "configParse",
    "getCache",
    "install",
    "build",
    "package",
    "deploy",
    "saveCache",
    "manifest",
    "finally",
];

/// Slot within a stage triple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Runs before the stage
    Pre,
    /// The stage itself
    Main,
    /// Runs after the stage
    Post,
}

impl Phase {
    /// Prefix added to the stage name for this phase
    #[must_use]
    pub fn prefix(&self) -> &'static str {
        match self {
            Phase::Pre => "pre",
            Phase::Main => "",
            Phase::Post => "post",
        }
    }

    /// Lifecycle name of `stage` in this phase (`build` → `prebuild`)
    #[must_use]
    pub fn hook_name(&self, stage: &str) -> String {
        format!("{}{stage}", self.prefix())
    }
}

/// Expand the stage list into the full ordered list of lifecycle names
#[must_use]
pub fn expand() -> Vec<String> {
    STAGES
        .iter()
        .flat_map(|stage| {
            [Phase::Pre, Phase::Main, Phase::Post]
                .into_iter()
                .map(move |phase| phase.hook_name(stage))
        })
        .collect()
}

/// Check whether `name` is one of the expanded lifecycle names
#[must_use]
pub fn is_lifecycle_hook(name: &str) -> bool {
    STAGES.iter().any(|stage| {
        name == *stage
            || name.strip_prefix("pre") == Some(stage)
            || name.strip_prefix("post") == Some(stage)
    })
}
