#[macro_use]
extern crate tracing;

pub mod backend;
pub mod config;
pub mod controller;
pub mod task;
pub mod telemetry;
pub mod timer;
pub mod trail;
pub mod view;
