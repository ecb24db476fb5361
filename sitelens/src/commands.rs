use crate::CLAP_STYLING;
use clap::{Arg, arg, command};
use url::Url;

/// Arguments shared by both analysis subcommands
fn analysis_args() -> Vec<Arg> {
    vec![
        arg!(-u --"url" <URL>)
            .required(false)
            .help("A URL to analyze. Repeat the flag for several URLs")
            .value_parser(clap::value_parser!(Url))
            .action(clap::ArgAction::Append),
        arg!(-i --"input-file" <PATH>)
            .required(false)
            .help("Path to a newline-delimited file of URLs")
            .value_parser(clap::value_parser!(std::path::PathBuf)),
        arg!(-t --"threads" <NUM_WORKERS>)
            .required(false)
            .help("The number of async workers fetching page metadata.")
            .value_parser(clap::value_parser!(usize))
            .default_value("10"),
        arg!(--"timeout" <SECONDS>)
            .required(false)
            .help("Page request timeout in seconds")
            .value_parser(clap::value_parser!(u64))
            .default_value("15"),
        arg!(--"sitemap-timeout" <SECONDS>)
            .required(false)
            .help("Sitemap request timeout in seconds")
            .value_parser(clap::value_parser!(u64))
            .default_value("60"),
        arg!(-o --"output" <PATH>)
            .required(false)
            .help("Where to write the CSV export of every URL")
            .value_parser(clap::value_parser!(std::path::PathBuf))
            .default_value("sitemap_urls.csv"),
        arg!(-f --"format" <FORMAT>)
            .required(false)
            .help("Report format printed to stdout: text, json, csv")
            .value_parser(["text", "json", "csv"])
            .default_value("text"),
        arg!(--"preview" <ROWS>)
            .required(false)
            .help("Number of URLs shown in the text report")
            .value_parser(clap::value_parser!(usize))
            .default_value("200"),
    ]
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitelens")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitelens")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner, status lines and progress bars").required(false))
        .arg(arg!(-v --"verbose" "Enable debug logging").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("index")
                .about(
                    "Resolve one or more sitemap indexes into their sitemaps, then analyze \
                every URL they list.",
                )
                .args(analysis_args())
                .arg(
                    arg!(-x --"exclude" <PATTERN>)
                        .required(false)
                        .help("Skip sitemaps whose URL contains this text (case-insensitive)"),
                ),
        )
        .subcommand(
            command!("sitemaps")
                .about("Analyze one or more sitemap files directly.")
                .args(analysis_args()),
        )
}
