pub mod commands;
pub mod prompt;
pub mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use signoff_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};
use signoff_core::domain::approval::ApprovalStatus;

use crate::prompt::CliPrompt;

#[derive(Debug, Parser)]
#[command(
    name = "signoff",
    about = "Track human approval requests",
    long_about = "Request, approve, reject and watch approval requests kept per profile in SQLite.",
    after_help = "Examples:\n  signoff request --title \"Push to main\"\n  signoff list --all\n  \
                  signoff approve <ID>\n  signoff watch"
)]
pub struct Cli {
    #[arg(long, global = true, value_name = "PATH", help = "Read configuration from PATH")]
    config: Option<PathBuf>,
    #[arg(long, global = true, value_name = "NAME", help = "Profile whose approvals to use")]
    profile: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Record a new pending approval, prompting for anything not given")]
    Request {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        details: Option<String>,
    },
    #[command(about = "Approve a pending approval")]
    Approve { id: String },
    #[command(about = "Reject a pending approval")]
    Reject { id: String },
    #[command(about = "Remove every approval in the profile")]
    Clear,
    #[command(about = "Show approvals with counts (pending only unless --all)")]
    List {
        #[arg(long, help = "Include approved and rejected items")]
        all: bool,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Re-render the list whenever approvals change, until Ctrl-C")]
    Watch {
        #[arg(long, help = "Include approved and rejected items")]
        all: bool,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, storage connectivity and migration state")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            require_file: self.config.is_some(),
            config_path: self.config.clone(),
            overrides: ConfigOverrides { profile: self.profile.clone(), ..Default::default() },
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();
    init_logging(&options);

    let result = match cli.command {
        Command::Request { title, details } => {
            commands::request::run(&options, CliPrompt::new(title, details))
        }
        Command::Approve { id } => commands::decide::run(&options, &id, ApprovalStatus::Approved),
        Command::Reject { id } => commands::decide::run(&options, &id, ApprovalStatus::Rejected),
        Command::Clear => commands::clear::run(&options),
        Command::List { all, json } => commands::list::run(&options, all, json),
        Command::Watch { all } => commands::watch::run(&options, all),
        Command::Config => commands::config::run(&options),
        Command::Doctor { json } => {
            commands::CommandResult::text(commands::doctor::run(&options, json))
        }
        Command::Migrate => commands::migrate::run(&options),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so command output on stdout stays parseable. An invalid config
/// falls back to defaults here; the command itself reports the config error.
fn init_logging(options: &LoadOptions) {
    use tracing::Level;

    let config = AppConfig::load(options.clone()).unwrap_or_default();
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
