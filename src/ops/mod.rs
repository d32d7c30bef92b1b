//! Ops helpers: sample data and the demo run

pub mod demo;
pub mod sample;

pub use demo::{probe_keys, run_demo, DemoReport};
pub use sample::{generate_sample_documents, sample_key};
