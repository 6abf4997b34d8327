#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Where leaderboard rows come from.
//!
//! The tracked club is described by a [`club::ClubDefinition`]. The
//! [`pipeline`] turns it into a ranked [`leaderboard_stats_models::Snapshot`]
//! by scraping the squad and profile pages; [`paste`] builds the same rows
//! from a manually pasted members dataset.

pub mod club;
pub mod paste;
pub mod pipeline;
pub mod progress;
