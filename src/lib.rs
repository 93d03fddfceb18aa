//! Braintrust experiment-tracking API exposed as spreadsheet-style sync tables and actions.
//!
//! Every operation takes a [`api::BraintrustApi`] built over a [`fetcher::Fetcher`], the
//! host-provided HTTP capability. Nothing is cached or persisted between calls.

pub mod actions;
pub mod api;
pub mod blob;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod identity;
pub mod output;
pub mod tables;
