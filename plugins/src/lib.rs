pub mod engine;
pub mod factory;
