pub mod cli;
pub mod commands;
pub mod pipeline;
pub mod utils;
