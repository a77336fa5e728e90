//! Stagecraft CLI application entry point
//!
//! This is the minimal main entry point that delegates to the library.

use clap::Parser;

fn main() {
    // Configure miette for error reporting
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(false)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))
    .ok();

    let cli = stagecraft::Cli::parse();

    if let Err(e) = stagecraft::run(cli) {
        // Failed lifecycle commands get their own report with the captured output
        if let Some(stagecraft_core::Error::CommandExecution {
            stage,
            command,
            output,
        }) = e.downcast_ref::<stagecraft_core::Error>()
        {
            stagecraft::output::print_command_failure(stage, command, output);
        } else {
            let miette_error = miette::Report::msg(format!("{e:#}"));
            eprintln!("{miette_error:?}");
        }
        std::process::exit(1);
    }
}
