//! Hotscope - hotspot profiler with resource sampling and regression checks
//!
//! This library provides the building blocks for measuring one run of a
//! target: a call tracer aggregating per-function cost, a background
//! resource sampler, an orchestrator tying both to the run window, and a
//! regression analyzer over the persisted run history.

pub mod call_tracer;
pub mod cli;
pub mod clock;
pub mod config;
pub mod html_output;
pub mod orchestrator;
pub mod regression;
pub mod report;
pub mod sampler;
pub mod suggestions;
pub mod target;
pub mod timer;
pub mod trace_protocol;
