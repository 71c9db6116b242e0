pub mod parser;
pub mod scenario_loader;
