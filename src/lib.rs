//! Harvest system prompts and tool definitions from a CLI agent
//!
//! The agent is pointed at a local mock of its messages API
//! ([`capture`]); the first real request of each published version is
//! frozen and written to disk by the harvest loop ([`collect`]).

pub mod capture;
pub mod cli;
pub mod collect;
pub mod commands;
