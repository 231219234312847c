//! Domain logic shared by the API server and the import worker.
//!
//! Nothing in this crate touches the database; repositories and handlers call
//! into these helpers so the rules can be unit tested in isolation.

pub mod activity;
pub mod api_keys;
pub mod error;
pub mod importer;
pub mod outreach;
pub mod pipeline;
pub mod roles;
pub mod search;
pub mod tasks;
pub mod types;
pub mod validation;
