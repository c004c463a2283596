// ABOUTME: Library module for npconv
// ABOUTME: Exports backup conversion, paste processing and the session they run in

pub mod backup;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod ids;
pub mod paste;
pub mod session;
pub mod utils;
