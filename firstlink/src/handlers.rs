use anyhow::{Context, bail};
use clap::ArgMatches;
use colored::Colorize;
use firstlink_core::crawl::{RunOptions, RunResult, execute_run};
use firstlink_core::report::{
    ReportData, ReportFormat, gather_report_data, generate_attractor_summary,
    generate_json_report, generate_run_summary, generate_text_report,
};
use firstlink_scanner::config::{DEFAULT_CONFIG_PATH, expand_path};
use firstlink_scanner::{NextLink, PageSource, SiteConfig, WikiFetcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

/// Flags shared by every subcommand. Global arguments only propagate down,
/// so these are read from the innermost matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalArgs {
    pub quiet: bool,
    pub verbosity: u8,
    pub config: Option<String>,
}

impl GlobalArgs {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let leaf = match matches.subcommand() {
            Some((_, sub)) => sub,
            None => matches,
        };
        Self {
            quiet: leaf.get_flag("quiet"),
            verbosity: leaf.get_count("verbose"),
            config: leaf.get_one::<String>("config").cloned(),
        }
    }
}

pub fn log_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

pub fn init_tracing(verbosity: u8) {
    tracing_subscriber::fmt()
        .with_max_level(log_level(verbosity))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub fn load_site_config(globals: &GlobalArgs) -> anyhow::Result<SiteConfig> {
    SiteConfig::load_or_default(globals.config.as_deref()).context("Could not load site configuration")
}

/// How a finished run should be written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    pub format: ReportFormat,
    pub output: Option<PathBuf>,
    pub attractors: bool,
}

impl ReportOptions {
    pub fn from_matches(args: &ArgMatches) -> anyhow::Result<Self> {
        let format_name = args
            .get_one::<String>("format")
            .map(String::as_str)
            .unwrap_or("text");
        let Some(format) = ReportFormat::from_str(format_name) else {
            bail!("Unknown report format '{}'", format_name);
        };
        Ok(Self {
            format,
            output: args.get_one::<PathBuf>("output").cloned(),
            attractors: args.get_flag("attractors"),
        })
    }
}

pub fn run_options_from_matches(args: &ArgMatches, quiet: bool) -> RunOptions {
    RunOptions {
        walks: args.get_one::<usize>("walks").copied().unwrap_or(100),
        concurrency: args.get_one::<usize>("threads").copied(),
        start: None,
        fail_fast: args.get_flag("fail-fast"),
        merge_timeout: args
            .get_one::<u64>("merge-timeout")
            .map(|secs| Duration::from_secs(*secs)),
        show_progress_bars: !quiet,
    }
}

pub fn render_report(data: &ReportData, options: &ReportOptions) -> anyhow::Result<String> {
    match options.format {
        ReportFormat::Text => {
            let mut report = generate_text_report(&data.ranking);
            if options.attractors {
                report.push('\n');
                report.push_str(&generate_attractor_summary(&data.attractors));
            }
            Ok(report)
        }
        ReportFormat::Json => {
            let mut report = generate_json_report(data).context("Could not serialize report")?;
            report.push('\n');
            Ok(report)
        }
    }
}

pub fn write_report(report: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Could not create {}", parent.display()))?;
            }
            fs::write(path, report)
                .with_context(|| format!("Could not write report to {}", path.display()))?;
        }
        None => print!("{}", report),
    }
    Ok(())
}

async fn finish_run(result: &RunResult, options: &ReportOptions, quiet: bool) -> anyhow::Result<()> {
    let data = gather_report_data(result).await;
    let report = render_report(&data, options)?;
    write_report(&report, options.output.as_deref())?;

    if !quiet {
        eprintln!();
        eprint!("{}", generate_run_summary(&data));
        if let Some(ref path) = options.output {
            eprintln!(
                "{} Report written to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            );
        }
    }
    Ok(())
}

pub async fn handle_run(args: &ArgMatches, globals: &GlobalArgs) -> anyhow::Result<()> {
    let config = load_site_config(globals)?;
    let options = run_options_from_matches(args, globals.quiet);
    let report_options = ReportOptions::from_matches(args)?;

    if !globals.quiet {
        eprintln!(
            "{} Walking {} random articles on {}",
            "→".blue(),
            options.walks.to_string().cyan(),
            config.base_url.bright_white()
        );
        match options.concurrency {
            Some(limit) => eprintln!("{} At most {} walks in flight", "→".blue(), limit),
            None => eprintln!("{} All walks start at once", "→".blue()),
        }
        eprintln!();
    }

    let fetcher = Arc::new(WikiFetcher::new(&config)?);
    let result = execute_run(options, fetcher, None).await?;
    finish_run(&result, &report_options, globals.quiet).await
}

pub async fn handle_follow(args: &ArgMatches, globals: &GlobalArgs) -> anyhow::Result<()> {
    let config = load_site_config(globals)?;
    let Some(start) = args.get_one::<String>("URL") else {
        bail!("An article address is required");
    };
    let report_options = ReportOptions::from_matches(args)?;

    if !globals.quiet {
        eprintln!("{} Following first links from {}", "→".blue(), start.bright_white());
        eprintln!();
    }

    let options = RunOptions {
        walks: 1,
        start: Some(start.clone()),
        show_progress_bars: false,
        ..RunOptions::default()
    };
    let fetcher = Arc::new(WikiFetcher::new(&config)?);
    let result = execute_run(options, fetcher, None).await?;
    finish_run(&result, &report_options, globals.quiet).await
}

pub async fn handle_inspect(args: &ArgMatches, globals: &GlobalArgs) -> anyhow::Result<()> {
    let config = load_site_config(globals)?;
    let Some(address) = args.get_one::<String>("URL") else {
        bail!("An article address is required");
    };

    let fetcher = WikiFetcher::new(&config)?;
    let page = fetcher
        .page(address)
        .await
        .with_context(|| format!("Could not inspect {}", address))?;

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    println!("{} {}", "Address:".blue(), page.address.bright_white());
    println!("{} {}", "Title:  ".blue(), page.title.bright_white().bold());
    match page.next {
        NextLink::Article(ref next) => println!("{} {}", "Next:   ".blue(), next.green()),
        NextLink::NotFound => println!("{} {}", "Next:   ".blue(), page.next.describe().yellow()),
        NextLink::MissingContent => println!("{} {}", "Next:   ".blue(), "no content container".red()),
    }
    Ok(())
}

pub fn handle_init(args: &ArgMatches) -> anyhow::Result<()> {
    let raw_path = args
        .get_one::<String>("PATH")
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG_PATH);
    let force = args.get_flag("force");
    let path = expand_path(raw_path);

    let written = init_site_config(&path, force)?;
    if !written {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("Configuration already exists:");
        println!("  {} {}", "•".yellow(), path.display().to_string().bright_white());
        println!();
        println!("Re-run with {} to overwrite it.", "--force".bright_white());
        return Ok(());
    }

    println!(
        "{} Site configuration written to {}",
        "✓".green().bold(),
        path.display().to_string().bright_white()
    );
    Ok(())
}

/// Write the default site configuration to `path`. Returns false when a
/// file is already there and `force` is not set.
pub fn init_site_config(path: &Path, force: bool) -> anyhow::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    SiteConfig::default()
        .write(path)
        .with_context(|| format!("Could not write {}", path.display()))?;
    Ok(true)
}
