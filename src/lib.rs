//! mkvbatch - Batch Audio Merge Workflow
//!
//! Pairs episode videos with the audio tracks carrying the same episode
//! number and merges them into Matroska containers with mkvmerge.

pub mod cli;
pub mod config;
pub mod error;
pub mod matcher;
pub mod media;
pub mod mux;
pub mod workflow;
