use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "startup-jobs")]
#[command(about = "Registers a recurring audit job at startup from remote configuration")]
pub struct Cli {
    /// Path to TOML configuration file (defaults apply when missing)
    #[arg(short, long, global = true, default_value = "startup-jobs.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Boot the registry and run the startup job until Ctrl-C (default)
    Run,
    /// Read records written by the audit job
    Audit {
        #[command(subcommand)]
        action: AuditCommand,
    },
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum AuditCommand {
    /// Print all audit records as JSON
    List,
    /// Print {"count": n}
    Count,
}

impl Cli {
    pub fn resolved_command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}
