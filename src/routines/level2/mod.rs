//! Matrix-vector routines.
//!
//! Two shared launchers carry the work: the mat-vec launcher of [`Xgemv`]
//! (also used by the triangular multiplications) and the Hermitian rank-1
//! update of [`Xher`] (also used by the packed and symmetric updates).
//! [`Xtpsv`] launches its own single work-group solve.

mod xgemv;
mod xger;
mod xher;
mod xhpr;
mod xspr;
mod xsyr;
mod xtbmv;
mod xtpmv;
mod xtpsv;
mod xtrmv;

pub use xgemv::Xgemv;
pub use xger::Xger;
pub use xher::Xher;
pub use xhpr::Xhpr;
pub use xspr::Xspr;
pub use xsyr::Xsyr;
pub use xtbmv::Xtbmv;
pub use xtpmv::Xtpmv;
pub use xtpsv::Xtpsv;
pub use xtrmv::Xtrmv;

use crate::types::{Diagonal, Layout, Triangle};

/// Whether the referenced triangle is the upper one in column-major storage
/// order. A row-major upper triangle is a column-major lower one.
#[inline]
pub(crate) fn storage_upper(layout: Layout, triangle: Triangle) -> bool {
    matches!(
        (layout, triangle),
        (Layout::ColMajor, Triangle::Upper) | (Layout::RowMajor, Triangle::Lower)
    )
}

/// Triangular access selector passed to the mat-vec kernel.
#[inline]
pub(crate) fn triangular_parameter(layout: Layout, triangle: Triangle, diagonal: Diagonal) -> usize {
    usize::from(storage_upper(layout, triangle)) + 2 * usize::from(diagonal == Diagonal::Unit)
}
