//! Core pipeline orchestration and domain logic for Blogwright.
//!
//! This crate ties together topic discovery, outline planning, model-backed
//! generation, and the text passes into one end-to-end run
//! ([`pipeline::generate_blog`]).

pub mod generation;
pub mod output;
pub mod pipeline;
pub mod planner;
