//! Aggregated ingredient totals over a user's shopping cart.

pub mod repo;
pub mod services;
