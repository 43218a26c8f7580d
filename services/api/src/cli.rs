use crate::demo::{run_demo, run_recommend, DemoArgs, RecommendArgs};
use crate::infra::RosterArgs;
use crate::server;
use clap::{Args, Parser, Subcommand};
use mentorship_engine::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Mentorship Matching Service",
    about = "Match at-risk students with mentors and counselors from the command line",
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
    /// Rank mentors or counselors for one student
    Recommend(RecommendArgs),
    /// Walk through eligibility, matching and assignment on a roster
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
    /// Reject assignments to staff at capacity instead of warning
    #[arg(long)]
    pub(crate) strict_capacity: bool,
    #[command(flatten)]
    pub(crate) roster: RosterArgs,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Recommend(args) => run_recommend(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
