//! predictboard: a dashboard client for a remote prediction service.
//!
//! Collects a feature vector, submits it to `POST /predict`, and shows the
//! returned prediction next to the distribution and request log served by
//! `GET /metrics`.

pub mod cli;
pub mod client;
pub mod config;
pub mod controller;
pub mod diagnostics;
pub mod features;
pub mod render;
pub mod web;
