//! Floodgate - In-memory Attempt Limiting
//!
//! This crate throttles abuse-prone user actions (login, registration,
//! contact forms, API calls) per caller identifier. Each limiter counts
//! attempts in a sliding window and locks the identifier out for a while
//! once the cap is exceeded. State lives in process memory only.

pub mod command;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod guard;
pub mod ratelimit;
