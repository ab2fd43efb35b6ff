//! Prism LLM - Analyzer Abstraction
//!
//! This crate provides the analyzer integration for Prism:
//! - Analyzer: trait mapping a rendered prompt to an analysis text
//! - Http: OpenAI-compatible chat-completions provider
//! - Mock: canned analyzer for tests and offline development

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod analyzer;
pub mod error;
pub mod http;
pub mod mock;
mod util;

pub use analyzer::{AnalysisRequest, AnalysisResponse, Analyzer};
pub use error::{Error, Result};
pub use http::{HttpAnalyzer, HttpAnalyzerConfig};
pub use mock::MockAnalyzer;
