//! examforge-core — exam session state machine, answers, timer and history.
//!
//! This crate defines the exam document model and everything needed to take
//! an exam: flattening sections into a navigable sequence, capturing answers,
//! driving the countdown, and handing a submission to a grading agent.

pub mod answers;
pub mod error;
pub mod generation;
pub mod grading;
pub mod history;
pub mod model;
pub mod parser;
pub mod report;
pub mod result;
pub mod sequencer;
pub mod session;
pub mod timer;
pub mod traits;
