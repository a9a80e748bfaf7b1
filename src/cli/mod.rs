//! Terminal commands

pub mod log;
pub mod rates;
pub mod setup;
pub mod ui;
