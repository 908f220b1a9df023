//! AI extraction of lab values from report images and PDFs.
//!
//! This crate provides the extraction prompt, validation of the model's JSON
//! answer, a canned [`MockExtractor`], and (with the `gemini` feature) a
//! Gemini API client. All extractors implement
//! [`lab_companion_core::ReportExtractor`].

pub mod extraction;
#[cfg(feature = "gemini")]
pub mod gemini;
pub mod prompts;

pub use extraction::*;
#[cfg(feature = "gemini")]
pub use gemini::GeminiExtractor;
pub use prompts::*;
