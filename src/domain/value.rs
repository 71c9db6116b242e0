pub mod pattern;
pub mod value_provider;
