pub mod cli;
pub mod commands;
pub mod session;
pub mod tui;
