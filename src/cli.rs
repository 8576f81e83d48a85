//! Command-line interface: `setup` writes the connection configuration,
//! `start` validates it and launches the scheduler.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "aioptim", about = "Closed-loop performance remediation service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write the connection configuration file.
    Setup {
        #[arg(long = "tenant")]
        tenant: String,
        #[arg(long = "unit")]
        unit: String,
        #[arg(long = "api")]
        api: String,
        #[arg(long = "label")]
        label: String,
        #[arg(long = "pat")]
        pat: String,
        #[arg(long = "repo")]
        repo: String,
        #[arg(long = "branch", default_value = "main")]
        branch: String,
        #[arg(long = "model", default_value = "codellama")]
        model: String,
        #[arg(long = "ollama", default_value = "http://localhost:11434")]
        ollama: String,
    },
    /// Validate configuration and start the scheduler.
    Start {
        #[arg(default_value_t = 500)]
        threshold: u64,
        #[arg(default_value_t = 10)]
        delay: u64,
    },
}
