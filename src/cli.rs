//! CLI argument parsing for the sta binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "sta",
    version,
    about = "Import field-service job and invoice reports and compute profitability"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Import a jobs report and an invoices report as one batch
    Import {
        /// Jobs report CSV
        jobs: PathBuf,
        /// Invoices report CSV
        invoices: PathBuf,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show import history, newest first
    List {
        /// Maximum number of batches to show
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Run database migrations and exit
    Migrate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_import_command_parses() {
        let cli = Cli::parse_from(["sta", "import", "jobs.csv", "invoices.csv"]);
        match cli.command {
            Some(Command::Import { jobs, invoices, json }) => {
                assert_eq!(jobs, PathBuf::from("jobs.csv"));
                assert_eq!(invoices, PathBuf::from("invoices.csv"));
                assert!(!json);
            }
            _ => panic!("expected import command"),
        }
    }

    #[test]
    fn test_cli_import_json_flag() {
        let cli = Cli::parse_from(["sta", "import", "j.csv", "i.csv", "--json"]);
        assert!(matches!(cli.command, Some(Command::Import { json: true, .. })));
    }

    #[test]
    fn test_cli_import_requires_both_files() {
        assert!(Cli::try_parse_from(["sta", "import", "jobs.csv"]).is_err());
    }

    #[test]
    fn test_cli_list_limit_defaults() {
        let cli = Cli::parse_from(["sta", "list"]);
        assert!(matches!(cli.command, Some(Command::List { limit: 20 })));

        let cli = Cli::parse_from(["sta", "list", "--limit", "5"]);
        assert!(matches!(cli.command, Some(Command::List { limit: 5 })));
    }

    #[test]
    fn test_cli_migrate_command_parses() {
        let cli = Cli::parse_from(["sta", "migrate"]);
        assert!(matches!(cli.command, Some(Command::Migrate)));
    }

    #[test]
    fn test_cli_no_command_defaults_to_none() {
        let cli = Cli::parse_from(["sta"]);
        assert!(cli.command.is_none());
    }
}
