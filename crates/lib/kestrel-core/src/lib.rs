#[macro_use]
extern crate log as _log; // to avoid name collision with my log module

pub mod log;
pub mod console;
pub mod config;
