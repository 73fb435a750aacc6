//! Formly Engine - Template-driven guided form filling
//!
//! This crate drives a step-by-step conversation over a declarative form
//! template. Each user utterance goes through a tiered extraction chain
//! (language model, retrieval, rules), proposals are validated against the
//! field schema, and conditional logic decides the next question.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod logging;
pub mod ports;
