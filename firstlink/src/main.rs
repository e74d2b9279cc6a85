use colored::Colorize;
use firstlink::commands::command_argument_builder;
use firstlink::handlers::{
    GlobalArgs, handle_follow, handle_init, handle_inspect, handle_run, init_tracing,
};
use firstlink_core::print_banner;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let globals = GlobalArgs::from_matches(&chosen_command);

    // Show banner unless --quiet flag is set
    if !globals.quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return;
    }

    init_tracing(globals.verbosity);

    let outcome = match chosen_command.subcommand() {
        Some(("init", primary_command)) => handle_init(primary_command),
        Some(("run", primary_command)) => handle_run(primary_command, &globals).await,
        Some(("follow", primary_command)) => handle_follow(primary_command, &globals).await,
        Some(("inspect", primary_command)) => handle_inspect(primary_command, &globals).await,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = outcome {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}
