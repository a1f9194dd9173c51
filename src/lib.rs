//! timeboard library
//!
//! Task lifecycle and time-allocation engine: task status with derived
//! completion, a single running timer per owner, idempotent recurring task
//! generation and a Monday..Friday weekly board with carry-over.

pub mod cli;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod planner;
pub mod types;
pub mod week;
