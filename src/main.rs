use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use cup_tracker::clock::FixedOffsetClock;
use cup_tracker::config::TrackerConfig;
use cup_tracker::io::WorkbookStore;
use cup_tracker::logging::init_logging;
use cup_tracker::service::{
    CheckInPayload, Operation, RankingPayload, Response, Service, TranscriptPayload,
    TransferPayload,
};
use cup_tracker::Result;
use tracing::debug;

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            eprintln!("error: {error}");
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    init_logging()?;

    let config = TrackerConfig::load(cli.config.as_deref())?;
    let clock: FixedOffsetClock = config.clock()?;
    let store = WorkbookStore::open(cli.workbook)?;
    debug!(workbook = %store.path().display(), "store opened");
    let service = Service::new(&store, &config, &clock);

    let response = match cli.command {
        Command::CheckIn { entity } => service.check_in(&CheckInPayload {
            entity_id: Some(entity),
        }),
        Command::Transfer {
            actor,
            recipient,
            amount,
            action,
            reason,
        } => service.transfer(&TransferPayload {
            actor_id: Some(actor),
            recipient_id: Some(recipient),
            amount: Some(amount),
            reason,
            action: Some(action.to_string()),
        }),
        Command::Ranking { week, mode } => service.ranking(&RankingPayload {
            week: Some(week),
            mode: Some(mode.to_string()),
        }),
        Command::Transcript { date } => service.transcript(&TranscriptPayload { date: Some(date) }),
        Command::Request { operation, body } => service.handle(operation.into(), &body),
    };

    print_response(&response)
}

fn print_response(response: &Response) -> Result<i32> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(match response.code {
        200 => 0,
        400 => 2,
        _ => 1,
    })
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Attendance check-ins and point rankings over a weekly workbook."
)]
struct Cli {
    /// Workbook holding the weekly, balance and audit sheets.
    #[arg(long)]
    workbook: PathBuf,

    /// Optional TOML configuration overriding the built-in schedule and layout.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record attendance for the event open right now.
    CheckIn {
        /// Participant id as listed in the weekly sheet.
        #[arg(long)]
        entity: String,
    },

    /// Grant or revoke points, consuming the actor's balance.
    Transfer {
        #[arg(long)]
        actor: String,

        #[arg(long)]
        recipient: String,

        #[arg(long)]
        amount: i64,

        #[arg(long, value_enum)]
        action: ActionArg,

        #[arg(long)]
        reason: Option<String>,
    },

    /// Rank participants or groups for one week or `total`.
    Ranking {
        #[arg(long)]
        week: String,

        #[arg(long, value_enum)]
        mode: ModeArg,
    },

    /// List the audit log entries of one day, most recent first.
    Transcript {
        #[arg(long)]
        date: String,
    },

    /// Dispatch a raw JSON request body.
    Request {
        #[arg(long, value_enum)]
        operation: OperationArg,

        #[arg(long)]
        body: String,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ActionArg {
    Add,
    Remove,
}

impl std::fmt::Display for ActionArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionArg::Add => write!(f, "add"),
            ActionArg::Remove => write!(f, "remove"),
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ModeArg {
    Entity,
    Group,
}

impl std::fmt::Display for ModeArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModeArg::Entity => write!(f, "entity"),
            ModeArg::Group => write!(f, "group"),
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OperationArg {
    CheckIn,
    Transfer,
    Ranking,
    Transcript,
}

impl From<OperationArg> for Operation {
    fn from(arg: OperationArg) -> Self {
        match arg {
            OperationArg::CheckIn => Operation::CheckIn,
            OperationArg::Transfer => Operation::Transfer,
            OperationArg::Ranking => Operation::Ranking,
            OperationArg::Transcript => Operation::Transcript,
        }
    }
}
