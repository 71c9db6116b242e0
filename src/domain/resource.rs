pub mod capability;
pub mod resource;
pub mod resource_store;
