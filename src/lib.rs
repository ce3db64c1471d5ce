pub mod analysis;
pub mod cli;
pub mod config;
pub mod history;
pub mod mapping;
pub mod model;
pub mod session;
pub mod source;
