//! Concrete BLAS routines, grouped by level.
//!
//! Each routine wraps a [`Routine`](crate::routine::Routine) that holds the
//! tuned parameters for its kernel families, and exposes one `do_*` method
//! performing validation, kernel selection and launch.

pub mod level1;
pub mod level2;
pub mod levelx;

pub use level1::{Xasum, Xaxpy, Xcopy, Xdot, Xnrm2, Xrot, Xscal, Xswap};
pub use level2::{Xgemv, Xger, Xhpr, Xher, Xspr, Xsyr, Xtbmv, Xtpmv, Xtpsv, Xtrmv};
pub use levelx::Xomatcopy;
