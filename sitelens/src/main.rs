use commands::command_argument_builder;
use sitelens::handlers::{handle_analysis, init_logging};
use sitelens_core::{AnalysisMode, print_banner};

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");
    let verbose = chosen_command.get_flag("verbose");

    init_logging(verbose);

    // json and csv output must stay machine-readable
    let text_output = chosen_command
        .subcommand()
        .and_then(|(_, sub)| sub.get_one::<String>("format"))
        .is_none_or(|format| format == "text");
    if !quiet && text_output {
        print_banner();
    }

    match chosen_command.subcommand() {
        Some(("index", primary_command)) => {
            handle_analysis(AnalysisMode::Index, primary_command, quiet).await
        }
        Some(("sitemaps", primary_command)) => {
            handle_analysis(AnalysisMode::Sitemaps, primary_command, quiet).await
        }
        None => {
            // No subcommand provided, just show the banner
        }
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
