pub mod config;
pub mod tracking;
pub mod feed;
pub mod pipeline;
pub mod simulator;

pub use tracking::*;
pub use config::*;
