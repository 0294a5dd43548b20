//! Core library for the vehicle-lease subscriber onboarding service.
//!
//! The interesting machinery lives in [`workflows::onboarding`]: the
//! subscriber lifecycle state machine, the deterministic credit-risk scoring
//! engine, the in-process domain event bus, and the welcome-notification
//! retry scheduler.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
