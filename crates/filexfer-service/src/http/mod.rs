//! HTTP download semantics independent of any web framework.

pub mod conditional;
pub mod range;

pub use conditional::{Precondition, Validators};
pub use range::ByteRange;
