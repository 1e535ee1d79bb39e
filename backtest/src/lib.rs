//! Search-grounded dollar-cost averaging backtests.
//!
//! A scenario becomes a prompt, the prompt goes to Gemini with Google Search
//! grounding, and the answer is validated into an [`analyzer::AnalysisResult`]
//! before a [`session::Session`] exposes it to a renderer.

pub mod analyzer;
pub mod chart;
pub mod config;
pub mod report;
pub mod session;
pub mod types;
