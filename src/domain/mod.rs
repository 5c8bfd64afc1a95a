//! Domain types and DTOs
//!
//! These types define the scheduling entities exchanged with the data store and
//! the conflict engine.

#![allow(dead_code)]

pub mod assignments;
pub mod conflicts;
pub mod installations;
pub mod recommendations;
pub mod team_members;

// Re-export commonly used types
pub use assignments::*;
pub use conflicts::*;
pub use installations::*;
pub use recommendations::*;
pub use team_members::*;
