//! This crate provides an adaptive data-serving engine for large scatter-plot
//! datasets (volcano and principal-component visualizations). Rather than
//! shipping every generated point to the browser, the server decides from the
//! client's pan/zoom viewport and point budget how many and which points to
//! return, preserving statistically significant points under aggressive
//! downsampling and reusing generated datasets across requests through a
//! bounded in-memory cache.
//!
//! The server is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team on top of various
//!   popular components, including the [hyper] HTTP library.
//! * [Serde](serde) performs (de)serialisation of JSON request and response
//!   data.
//! * [validator] checks request parameters against their allowed ranges at
//!   the API boundary.
//! * [rand] provides the seeded generators that make dataset generation and
//!   downsampling deterministic.

pub mod app;
pub mod app_state;
pub mod assemble;
pub mod cache;
pub mod classify;
pub mod cli;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod generate;
pub mod lod;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod resource_manager;
pub mod sample;
pub mod server;
pub mod tracing;
pub mod validated_json;
