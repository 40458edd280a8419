//! Eventi Gare - Event Registration Payments
//!
//! Registration lifecycle, hosted checkout sessions, cash payments,
//! idempotent payment webhooks and sponsor slot/module purchases for
//! sporting event organizers.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
