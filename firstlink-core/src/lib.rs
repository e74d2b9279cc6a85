pub mod attractor;
pub mod crawl;
pub mod graph;
pub mod report;
pub mod walk;

use colored::Colorize;

pub use crawl::{RunError, RunOptions, RunResult, execute_run};
pub use graph::{GraphError, NextEdge, NodeSummary, PageGraph};
pub use walk::{WalkError, WalkOutcome, WalkStart, WalkSummary, Walker};

pub fn print_banner() {
    let banner = r#"
   __ _          _   _ _       _
  / _(_)_ __ ___| |_| (_)_ __ | | __
 | |_| | '__/ __| __| | | '_ \| |/ /
 |  _| | |  \__ \ |_| | | | | |   <
 |_| |_|_|  |___/\__|_|_|_| |_|_|\_\
"#;
    eprintln!("{}", banner.bright_cyan().bold());
    eprintln!(
        "  {} {}\n",
        "every article leads somewhere".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
