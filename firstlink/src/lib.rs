pub mod commands;
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use commands::command_argument_builder;
pub use handlers::{
    GlobalArgs, ReportOptions, init_site_config, log_level, render_report,
    run_options_from_matches, write_report,
};
