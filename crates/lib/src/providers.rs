//! Clients for remote services.

pub mod ai;
