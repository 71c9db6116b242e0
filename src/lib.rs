use crate::domain::scheduler::notification::NotificationExecutor;
use crate::domain::scheduler::preprocessor::{Preprocessor, PreprocessorResult};
use crate::domain::scheduler::scheduler::{Scheduler, SchedulerResult};
use crate::error::Result;
use crate::loader::scenario_loader::{Scenario, load_scenario};

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

/// Loads the scenario stored in `file_path` into a cache and a persistence.
pub fn generate_scenario(file_path: &str) -> Result<Scenario> {
    logger::init();
    log::info!("Logger initialized. Starting scenario construction.");

    let scenario = load_scenario(file_path)?;
    log::info!("Scenario constructed successfully.");

    Ok(scenario)
}

/// Runs the preprocessor and then the scheduler over the interval of the scenario.
pub fn run_scenario(scenario: &mut Scenario, notification_executor: &mut dyn NotificationExecutor) -> Result<(PreprocessorResult, SchedulerResult)> {
    let preprocessor = Preprocessor::new(scenario.config.clone());
    let preprocessor_result = preprocessor.run(&scenario.interval, &mut scenario.persistence)?;

    let scheduler = Scheduler::new(scenario.config.clone());
    let scheduler_result = scheduler.run(&scenario.interval, &mut scenario.cache, &mut scenario.persistence, notification_executor)?;

    Ok((preprocessor_result, scheduler_result))
}
