//! API handlers for the Treina auth service.
//!
//! This module organizes the service's route handlers: the health probe, the
//! root banner, and the password-reset endpoints.

pub mod health;
pub mod reset;
pub mod root;
