//! Route handlers organized by resource

pub mod commentary;
pub mod games;
pub mod health;
pub mod stats;
pub mod status;
