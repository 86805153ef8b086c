//! CFADS scenario input supplied by an external scenario generator

mod matrix;
pub mod loader;

pub use matrix::ScenarioMatrix;
pub use loader::{load_scenarios, read_scenarios};
