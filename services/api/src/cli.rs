use crate::demo::{run_classify, run_demo, run_find_workers, ClassifyArgs, DemoArgs, FindWorkersArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tenant_maintenance::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Tenant Maintenance Desk",
    about = "Run the tenant maintenance request service or explore worker matching from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Show which trade a tenant's description maps to
    Classify(ClassifyArgs),
    /// Query a worker roster export
    Workers {
        #[command(subcommand)]
        command: WorkersCommand,
    },
    /// Walk a plumbing request from intake to closure against an in-memory roster
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum WorkersCommand {
    /// Rank roster workers for a target date
    Find(FindWorkersArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Seed the worker store from a roster CSV export
    #[arg(long, value_name = "PATH")]
    pub(crate) roster: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Classify(args) => {
            run_classify(args);
            Ok(())
        }
        Command::Workers {
            command: WorkersCommand::Find(args),
        } => run_find_workers(args),
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_defaults_to_serve() {
        let cli = Cli::try_parse_from(["tenant-maintenance-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn workers_find_parses_roster_and_date() {
        let cli = Cli::try_parse_from([
            "tenant-maintenance-api",
            "workers",
            "find",
            "--roster",
            "roster.csv",
            "--title",
            "Leaking pipe",
            "--date",
            "2025-11-03",
            "--emergency",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Workers {
                command: WorkersCommand::Find(args),
            }) => {
                assert_eq!(args.roster, PathBuf::from("roster.csv"));
                assert!(args.emergency);
                assert_eq!(
                    args.date,
                    chrono::NaiveDate::from_ymd_opt(2025, 11, 3)
                );
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn workers_find_rejects_malformed_date() {
        let result = Cli::try_parse_from([
            "tenant-maintenance-api",
            "workers",
            "find",
            "--roster",
            "roster.csv",
            "--date",
            "11/03/2025",
        ]);
        assert!(result.is_err());
    }
}
