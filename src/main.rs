use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;

use shongo_scheduler::domain::request::reservation_request::{AllocationState, ReservationRequestState};
use shongo_scheduler::domain::scheduler::notification::LoggingNotificationExecutor;
use shongo_scheduler::domain::scheduler::persistence::Persistence;
use shongo_scheduler::domain::scheduler::report::MessageType;
use shongo_scheduler::domain::utils::clock::{SystemClock, WallClock};
use shongo_scheduler::domain::utils::interval::{INFINITE_START, Interval};
use shongo_scheduler::{generate_scenario, run_scenario};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Verbosity {
    User,
    DomainAdmin,
}

/// Allocates the reservation requests of a scenario file and prints the outcome.
#[derive(Debug, Parser)]
#[command(name = "shongo_scheduler", version)]
struct Cli {
    /// Scenario JSON with resources, value providers and reservation requests.
    scenario: String,

    /// Start of the scheduling interval (ms since the epoch), defaults to now for
    /// scenarios without an interval.
    #[arg(long)]
    start: Option<i64>,

    /// End of the scheduling interval (ms since the epoch).
    #[arg(long)]
    end: Option<i64>,

    /// Audience of the printed allocation reports.
    #[arg(long, value_enum)]
    verbosity: Option<Verbosity>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut scenario = generate_scenario(&cli.scenario).with_context(|| format!("Failed to load scenario '{}'", cli.scenario))?;
    if cli.start.is_some() || cli.end.is_some() {
        let start = cli.start.unwrap_or(scenario.interval.start);
        let end = cli.end.unwrap_or(scenario.interval.end);
        scenario.interval = Interval::new(start, end)?;
    } else if scenario.interval.start == INFINITE_START {
        // Nothing is allocated into the past.
        let now = WallClock.get_current_time_in_ms();
        scenario.interval = Interval::new(now, scenario.interval.end)?;
    }
    if let Some(verbosity) = cli.verbosity {
        scenario.config.report_verbosity = match verbosity {
            Verbosity::User => MessageType::User,
            Verbosity::DomainAdmin => MessageType::DomainAdmin,
        };
    }

    let mut notification_executor = LoggingNotificationExecutor;
    let (preprocessor_result, scheduler_result) = run_scenario(&mut scenario, &mut notification_executor)?;
    log::info!(
        "Run finished (children created: {}, allocated: {}, failed: {}, deleted: {}).",
        preprocessor_result.created,
        scheduler_result.allocated,
        scheduler_result.failed,
        scheduler_result.deleted
    );

    for reservation_request in scenario.persistence.list_reservation_requests() {
        let id = scenario.config.format_id("req", reservation_request.id.as_str());
        let state = match (reservation_request.state, reservation_request.allocation_state) {
            (ReservationRequestState::Deleted, _) => "DELETED".dimmed(),
            (_, AllocationState::Allocated) => "ALLOCATED".green(),
            (_, AllocationState::AllocationFailed) => "FAILED".red(),
            (_, AllocationState::NotAllocated) => "NOT ALLOCATED".yellow(),
        };
        println!("{} {} {}", id.bold(), state, reservation_request.slot);
        if let Some(report) = &reservation_request.allocation_report {
            for line in report.lines() {
                println!("    {}", line);
            }
        }
    }

    Ok(())
}
