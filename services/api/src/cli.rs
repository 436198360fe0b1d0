use crate::demo::{run_demo, run_sweep_command, DemoArgs, SweepArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use leasewatch::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Leasewatch",
    about = "Run the waitlist match and alert coordinator from the command line",
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
    /// Run one match sweep and print the notification report
    Sweep(SweepArgs),
    /// Run an end-to-end demo: two sweeps showing the alert ledger holding
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Availability export CSV to load as the unit feed at startup
    #[arg(long)]
    pub(crate) feed_csv: Option<PathBuf>,
    /// Seed demo waitlist entries, units, and agents at startup
    #[arg(long)]
    pub(crate) demo: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Sweep(args) => run_sweep_command(args),
        Command::Demo(args) => run_demo(args),
    }
}
