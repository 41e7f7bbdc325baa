//! Core fuzzy modules.

pub mod algebra;
pub mod membership;
pub mod value;
