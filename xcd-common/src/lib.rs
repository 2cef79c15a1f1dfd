//! # XC Draft Common Library
//!
//! Shared code for the XC Draft services:
//! - Timing entry and roster models
//! - Name/school normalization and fuzzy matching (live scoring and historical import)
//! - Race time parsing and formatting
//! - Configuration loading
//! - Database schema bootstrap and roster queries
//! - Admin secret validation

pub mod api;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod matching;
pub mod models;
pub mod race_time;

pub use error::{Error, Result};
pub use models::{DraftTeam, Gender, RosterAthlete, SplitMark, TimingEntry};
