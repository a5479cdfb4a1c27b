//! Routines outside the classic BLAS levels.

mod xomatcopy;

pub use xomatcopy::Xomatcopy;
