//! Hardware-independent core library for plugwatch
//!
//! This crate contains all platform-agnostic logic of the power-strip
//! dashboard: the in-memory sample store and its wire format, the stacked
//! chart and its scene renderer, brush zoom, the poll scheduler and the
//! dashboard task that ties them together.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod chart;
pub mod config;
pub mod dashboard;
pub mod poll;
pub mod storage;
pub mod zoom;
