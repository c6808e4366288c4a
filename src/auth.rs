//! Assertion signing and token snapshot models.

pub mod assertion;
pub mod token;

pub use assertion::*;
pub use token::{secret::*, snapshot::*};
