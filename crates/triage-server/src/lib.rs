//! Triage HTTP server library (gateway layer for the `triage` binary).

pub mod gateway;
