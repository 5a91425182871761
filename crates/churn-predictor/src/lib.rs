pub mod config;
pub mod error;
pub mod features;
pub mod prediction;
pub mod service;
pub mod telemetry;

pub use service::ChurnService;
