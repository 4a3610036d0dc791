//! # Domain Models
//!
//! This crate contains pure vault types with minimal dependencies (`serde`, `bitflags`).
//! Keep it lean: no I/O, networking, or heavy logic, just data and simple helpers.

pub mod capabilities;
pub mod config;
pub mod constants;
pub mod records;
