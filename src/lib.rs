//! Warehouse slotting and pick-route engine.
//!
//! The core assigns storage locations to inbound items ([`slotting`]), maps location keys to
//! floor-plan cells ([`codec`]) and plans pick routes for outbound orders ([`routing`]). All
//! three are synchronous passes over caller-owned data. [`api`] exposes them over HTTP.

pub mod api;
pub mod codec;
pub mod config;
pub mod error;
pub mod highlight;
pub mod model;
pub mod routing;
pub mod slotting;
pub mod types;
