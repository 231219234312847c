//! CSV import worker.
//!
//! [`processor::ImportProcessor`] turns a job's pending rows into people;
//! [`dispatcher::ImportDispatcher`] claims jobs from the database queue and
//! feeds them to the processor. The API server can run the dispatcher
//! in-process, and the `crm-worker` binary runs it standalone.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod processor;
