//! # borealis-model
//!
//! Core data model for the Borealis mining and referral-reward accounting
//! core.
//!
//! This crate provides:
//! - The flat `User` record with the full balance/session/bookkeeping block
//! - The `Referral` subset used for T0 / T-1 eligibility and session checks
//! - The `Timestamp` optional-time type with a canonical zero
//! - The `Clock` collaborator trait

mod clock;
mod time;
mod user;

pub use clock::{Clock, SystemClock};
pub use time::Timestamp;
pub use user::{referral_username, KycState, Referral, User, BOGUS_USERNAME};
