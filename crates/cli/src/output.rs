//! Console output for lifecycle runs
//!
//! User-facing lines go to stdout with `owo-colors`; diagnostics stay in
//! `tracing`.

use owo_colors::OwoColorize;
use stagecraft_engine::hooks::HookSource;
use stagecraft_engine::{HookRecord, InstructionList, Manifest};

/// Header printed before plugins are loaded
pub fn print_loading_plugins(names: &[&str]) {
    if names.is_empty() {
        return;
    }
    println!("{}", "Loading plugins".bold());
    for name in names {
        println!("  - {}", name.cyan());
    }
    println!();
}

/// Dry-run listing of the instruction list
pub fn print_plan(list: &InstructionList) {
    println!("{}", "Build lifecycle (dry run)".bold());
    if list.is_empty() {
        println!("{}", "No hooks to run.".yellow());
        return;
    }
    println!();
    for line in list.plan() {
        println!("{line}");
    }
}

/// Progress line printed before a hook runs
pub fn print_hook_started(index: usize, record: &HookRecord) {
    let line = hook_started_line(index, record);
    println!("{}", line.cyan().bold());
}

fn hook_started_line(index: usize, record: &HookRecord) -> String {
    match record.source {
        HookSource::Config => format!(
            "> {index}. Running build.lifecycle.{} from config",
            record.hook
        ),
        HookSource::Plugin => format!(
            "> {index}. Running {:?} lifecycle from {:?} plugin",
            record.hook, record.name
        ),
    }
}

/// Summary after a successful run
pub fn print_build_complete(manifest: &Manifest) {
    println!();
    println!("{}", "Build complete".green().bold());

    if manifest.is_empty() {
        return;
    }
    match serde_json::to_string_pretty(manifest) {
        Ok(json) => {
            println!("{}", "Manifest:".bold());
            println!("{json}");
        }
        Err(e) => tracing::warn!("Failed to render manifest: {}", e),
    }
}

/// Report for a failed `build.lifecycle` command
pub fn print_command_failure(stage: &str, command: &str, output: &str) {
    eprintln!();
    eprintln!(
        "{}",
        format!("Error from config build.lifecycle.{stage} hook from command:").red()
    );
    eprintln!("{}", format!("\"{command}\"").red());
    if !output.trim().is_empty() {
        eprintln!();
        eprintln!("{}", "Error output:".red().bold());
        eprintln!("{}", output.trim_end().red());
    }
}
