//! # Prompt Templates
//!
//! System and user prompts sent to the hosted models, grouped by the feature that uses them.

pub mod assistant;
pub mod media;
pub mod research;
