//! LeetCode-style question generation and grading service.
//!
//! The server binary (`leetgen`) exposes the HTTP API and runs generation jobs in the
//! background; the batch binary (`leetgen-batch`) handles object-store notifications.

pub mod batch;
pub mod catalog;
pub mod config;
pub mod document;
pub mod domain;
pub mod error;
pub mod grading;
pub mod jobs;
pub mod judge;
pub mod layout;
pub mod metadata;
pub mod openai;
pub mod pipeline;
pub mod ports;
pub mod protocol;
pub mod records;
pub mod routes;
pub mod state;
pub mod storage;
pub mod telemetry;
pub mod util;

#[cfg(test)]
mod fakes;
