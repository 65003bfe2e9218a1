//! Core business logic for Cimiento.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `projection` - Scenario cash-flow projection, financial metrics,
//!   baseline comparison, and sensitivity analysis

pub mod projection;
