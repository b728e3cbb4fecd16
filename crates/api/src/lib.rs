//! HTTP API: job submission and result views over the dispatch core.

pub mod app;
