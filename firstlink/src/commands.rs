use clap::{arg, command};
use firstlink_scanner::config::DEFAULT_CONFIG_PATH;

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("firstlink")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("firstlink")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner, progress and summary output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" ...)
                .help("Increase log verbosity (-v info, -vv every walk step, -vvv trace)")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-c --"config" <PATH>)
                .help(format!(
                    "Site configuration file (default: {} when present)",
                    DEFAULT_CONFIG_PATH
                ))
                .required(false)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Writes the default site configuration to your filesystem")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Where to write the site configuration")
                        .default_value(DEFAULT_CONFIG_PATH),
                )
                .arg(
                    arg!(-f --"force")
                        .help("Overwrite an existing configuration file at the specified location.")
                        .required(false),
                ),
        )
        .subcommand(
            command!("run")
                .about(
                    "Start many walks from random articles. Every walk follows first links \
                until it reaches a page another walk has already seen.",
                )
                .arg(
                    arg!(-n --"walks" <NUM_WALKS>)
                        .required(false)
                        .help("Number of random walks to launch")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("100"),
                )
                .arg(
                    arg!(-t --"threads" <LIMIT>)
                        .required(false)
                        .help("Maximum walks in flight (default: all at once)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"fail-fast")
                        .required(false)
                        .help("Abort the whole run on the first failed walk")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"merge-timeout" <SECONDS>)
                        .required(false)
                        .help("Give up a merge that waits longer than this for another walk")
                        .value_parser(clap::value_parser!(u64)),
                )
                .args(report_args()),
        )
        .subcommand(
            command!("follow")
                .about("Follow a single chain of first links from the given article")
                .arg(
                    arg!(<URL>)
                        .required(true)
                        .help("Article address, absolute or relative to the site's base URL"),
                )
                .args(report_args()),
        )
        .subcommand(
            command!("inspect")
                .about("Fetch one article and show its title and first link, without walking")
                .arg(
                    arg!(<URL>)
                        .required(true)
                        .help("Article address, absolute or relative to the site's base URL"),
                )
                .arg(
                    arg!(--"json")
                        .required(false)
                        .help("Print the extracted page as JSON")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}

fn report_args() -> Vec<clap::Arg> {
    vec![
        arg!(-o --"output" <PATH>)
            .required(false)
            .help("Save report to file (default: stdout)")
            .value_parser(clap::value_parser!(std::path::PathBuf)),
        arg!(-f --"format" <FORMAT>)
            .required(false)
            .help("Report format: text, json")
            .value_parser(["text", "json"])
            .default_value("text"),
        arg!(--"attractors")
            .required(false)
            .help("Append the cycles every chain ends in to the text report")
            .action(clap::ArgAction::SetTrue),
    ]
}
