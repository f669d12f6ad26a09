pub mod chrome;
pub mod config;
pub mod filters;
pub mod report;
