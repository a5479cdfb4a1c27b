//! One function per BLAS operation.
//!
//! Each call builds the routine for `T` against `context`, runs it and returns
//! the event of its last stage. Buffers stay owned by the caller, who must not
//! touch them until that event has completed.

use crate::context::Context;
use crate::error::BlasResult;
use crate::routines::{
    Xasum, Xaxpy, Xcopy, Xdot, Xgemv, Xger, Xhpr, Xher, Xnrm2, Xomatcopy, Xrot, Xscal, Xspr, Xswap, Xsyr,
    Xtbmv, Xtpmv, Xtpsv, Xtrmv,
};
use crate::runtime::{Backend, Buffer};
use crate::types::{Diagonal, Element, Layout, Transpose, Triangle};

// ── Level 1 ──

/// `y := x`
#[allow(clippy::too_many_arguments)]
pub fn copy<T: Element, B: Backend>(
    context: &Context<B>,
    n: usize,
    x: &Buffer<T, B>,
    x_offset: usize,
    x_inc: usize,
    y: &Buffer<T, B>,
    y_offset: usize,
    y_inc: usize,
) -> BlasResult<B::Event> {
    Xcopy::new(context)?.do_copy(n, x, x_offset, x_inc, y, y_offset, y_inc)
}

/// Exchanges `x` and `y`.
#[allow(clippy::too_many_arguments)]
pub fn swap<T: Element, B: Backend>(
    context: &Context<B>,
    n: usize,
    x: &Buffer<T, B>,
    x_offset: usize,
    x_inc: usize,
    y: &Buffer<T, B>,
    y_offset: usize,
    y_inc: usize,
) -> BlasResult<B::Event> {
    Xswap::new(context)?.do_swap(n, x, x_offset, x_inc, y, y_offset, y_inc)
}

/// Applies the plane rotation `(c, s)` to the pairs `(x_i, y_i)`. Real types
/// only; complex precisions return `InvalidPrecision`.
#[allow(clippy::too_many_arguments)]
pub fn rot<T: Element, B: Backend>(
    context: &Context<B>,
    n: usize,
    x: &Buffer<T, B>,
    x_offset: usize,
    x_inc: usize,
    y: &Buffer<T, B>,
    y_offset: usize,
    y_inc: usize,
    c: T,
    s: T,
) -> BlasResult<B::Event> {
    Xrot::new(context)?.do_rot(n, x, x_offset, x_inc, y, y_offset, y_inc, c, s)
}

/// `x := alpha * x`
pub fn scal<T: Element, B: Backend>(
    context: &Context<B>,
    n: usize,
    alpha: T,
    x: &Buffer<T, B>,
    x_offset: usize,
    x_inc: usize,
) -> BlasResult<B::Event> {
    Xscal::new(context)?.do_scal(n, alpha, x, x_offset, x_inc)
}

/// `y := alpha * x + y`
#[allow(clippy::too_many_arguments)]
pub fn axpy<T: Element, B: Backend>(
    context: &Context<B>,
    n: usize,
    alpha: T,
    x: &Buffer<T, B>,
    x_offset: usize,
    x_inc: usize,
    y: &Buffer<T, B>,
    y_offset: usize,
    y_inc: usize,
) -> BlasResult<B::Event> {
    Xaxpy::new(context)?.do_axpy(n, alpha, x, x_offset, x_inc, y, y_offset, y_inc)
}

/// `dot := x^T * y`
#[allow(clippy::too_many_arguments)]
pub fn dot<T: Element, B: Backend>(
    context: &Context<B>,
    n: usize,
    dot: &Buffer<T, B>,
    dot_offset: usize,
    x: &Buffer<T, B>,
    x_offset: usize,
    x_inc: usize,
    y: &Buffer<T, B>,
    y_offset: usize,
    y_inc: usize,
) -> BlasResult<B::Event> {
    Xdot::new(context)?.do_dot(n, dot, dot_offset, x, x_offset, x_inc, y, y_offset, y_inc, false)
}

/// Unconjugated complex dot product.
#[allow(clippy::too_many_arguments)]
pub fn dotu<T: Element, B: Backend>(
    context: &Context<B>,
    n: usize,
    dot: &Buffer<T, B>,
    dot_offset: usize,
    x: &Buffer<T, B>,
    x_offset: usize,
    x_inc: usize,
    y: &Buffer<T, B>,
    y_offset: usize,
    y_inc: usize,
) -> BlasResult<B::Event> {
    Xdot::named(context, "Xdotu")?.do_dot(n, dot, dot_offset, x, x_offset, x_inc, y, y_offset, y_inc, false)
}

/// `dot := x^H * y`
#[allow(clippy::too_many_arguments)]
pub fn dotc<T: Element, B: Backend>(
    context: &Context<B>,
    n: usize,
    dot: &Buffer<T, B>,
    dot_offset: usize,
    x: &Buffer<T, B>,
    x_offset: usize,
    x_inc: usize,
    y: &Buffer<T, B>,
    y_offset: usize,
    y_inc: usize,
) -> BlasResult<B::Event> {
    Xdot::named(context, "Xdotc")?.do_dot(n, dot, dot_offset, x, x_offset, x_inc, y, y_offset, y_inc, true)
}

pub fn nrm2<T: Element, B: Backend>(
    context: &Context<B>,
    n: usize,
    nrm2: &Buffer<T, B>,
    nrm2_offset: usize,
    x: &Buffer<T, B>,
    x_offset: usize,
    x_inc: usize,
) -> BlasResult<B::Event> {
    Xnrm2::new(context)?.do_nrm2(n, nrm2, nrm2_offset, x, x_offset, x_inc)
}

pub fn asum<T: Element, B: Backend>(
    context: &Context<B>,
    n: usize,
    asum: &Buffer<T, B>,
    asum_offset: usize,
    x: &Buffer<T, B>,
    x_offset: usize,
    x_inc: usize,
) -> BlasResult<B::Event> {
    Xasum::new(context)?.do_asum(n, asum, asum_offset, x, x_offset, x_inc)
}

// ── Level 2 ──

/// `y := alpha * op(A) * x + beta * y`
#[allow(clippy::too_many_arguments)]
pub fn gemv<T: Element, B: Backend>(
    context: &Context<B>,
    layout: Layout,
    a_transpose: Transpose,
    m: usize,
    n: usize,
    alpha: T,
    a: &Buffer<T, B>,
    a_offset: usize,
    a_ld: usize,
    x: &Buffer<T, B>,
    x_offset: usize,
    x_inc: usize,
    beta: T,
    y: &Buffer<T, B>,
    y_offset: usize,
    y_inc: usize,
) -> BlasResult<B::Event> {
    Xgemv::new(context)?.do_gemv(
        layout, a_transpose, m, n, alpha, a, a_offset, a_ld, x, x_offset, x_inc, beta, y, y_offset, y_inc,
    )
}

/// `x := op(A) * x`, `A` triangular.
#[allow(clippy::too_many_arguments)]
pub fn trmv<T: Element, B: Backend>(
    context: &Context<B>,
    layout: Layout,
    triangle: Triangle,
    a_transpose: Transpose,
    diagonal: Diagonal,
    n: usize,
    a: &Buffer<T, B>,
    a_offset: usize,
    a_ld: usize,
    x: &Buffer<T, B>,
    x_offset: usize,
    x_inc: usize,
) -> BlasResult<B::Event> {
    Xtrmv::new(context)?.do_trmv(layout, triangle, a_transpose, diagonal, n, a, a_offset, a_ld, x, x_offset, x_inc)
}

/// `x := op(A) * x`, `A` triangular banded with `k` off-diagonals.
#[allow(clippy::too_many_arguments)]
pub fn tbmv<T: Element, B: Backend>(
    context: &Context<B>,
    layout: Layout,
    triangle: Triangle,
    a_transpose: Transpose,
    diagonal: Diagonal,
    n: usize,
    k: usize,
    a: &Buffer<T, B>,
    a_offset: usize,
    a_ld: usize,
    x: &Buffer<T, B>,
    x_offset: usize,
    x_inc: usize,
) -> BlasResult<B::Event> {
    Xtbmv::new(context)?.do_tbmv(layout, triangle, a_transpose, diagonal, n, k, a, a_offset, a_ld, x, x_offset, x_inc)
}

/// `x := op(A) * x`, `A` triangular packed.
#[allow(clippy::too_many_arguments)]
pub fn tpmv<T: Element, B: Backend>(
    context: &Context<B>,
    layout: Layout,
    triangle: Triangle,
    a_transpose: Transpose,
    diagonal: Diagonal,
    n: usize,
    ap: &Buffer<T, B>,
    ap_offset: usize,
    x: &Buffer<T, B>,
    x_offset: usize,
    x_inc: usize,
) -> BlasResult<B::Event> {
    Xtpmv::new(context)?.do_tpmv(layout, triangle, a_transpose, diagonal, n, ap, ap_offset, x, x_offset, x_inc)
}

/// Solves `op(A) * x = b` for packed triangular `A`; `x` holds `b` on entry.
#[allow(clippy::too_many_arguments)]
pub fn tpsv<T: Element, B: Backend>(
    context: &Context<B>,
    layout: Layout,
    triangle: Triangle,
    a_transpose: Transpose,
    diagonal: Diagonal,
    n: usize,
    ap: &Buffer<T, B>,
    ap_offset: usize,
    x: &Buffer<T, B>,
    x_offset: usize,
    x_inc: usize,
) -> BlasResult<B::Event> {
    Xtpsv::new(context)?.do_tpsv(layout, triangle, a_transpose, diagonal, n, ap, ap_offset, x, x_offset, x_inc)
}

/// `A := alpha * x * y^T + A`
#[allow(clippy::too_many_arguments)]
pub fn ger<T: Element, B: Backend>(
    context: &Context<B>,
    layout: Layout,
    m: usize,
    n: usize,
    alpha: T,
    x: &Buffer<T, B>,
    x_offset: usize,
    x_inc: usize,
    y: &Buffer<T, B>,
    y_offset: usize,
    y_inc: usize,
    a: &Buffer<T, B>,
    a_offset: usize,
    a_ld: usize,
) -> BlasResult<B::Event> {
    Xger::new(context)?.do_ger(layout, m, n, alpha, x, x_offset, x_inc, y, y_offset, y_inc, a, a_offset, a_ld)
}

/// `A := alpha * x * x^H + A`, `A` Hermitian.
#[allow(clippy::too_many_arguments)]
pub fn her<T: Element, B: Backend>(
    context: &Context<B>,
    layout: Layout,
    triangle: Triangle,
    n: usize,
    alpha: T::Real,
    x: &Buffer<T, B>,
    x_offset: usize,
    x_inc: usize,
    a: &Buffer<T, B>,
    a_offset: usize,
    a_ld: usize,
) -> BlasResult<B::Event> {
    Xher::new(context)?.do_her(layout, triangle, n, alpha, x, x_offset, x_inc, a, a_offset, a_ld)
}

/// Packed variant of [`her`].
#[allow(clippy::too_many_arguments)]
pub fn hpr<T: Element, B: Backend>(
    context: &Context<B>,
    layout: Layout,
    triangle: Triangle,
    n: usize,
    alpha: T::Real,
    x: &Buffer<T, B>,
    x_offset: usize,
    x_inc: usize,
    ap: &Buffer<T, B>,
    ap_offset: usize,
) -> BlasResult<B::Event> {
    Xhpr::new(context)?.do_hpr(layout, triangle, n, alpha, x, x_offset, x_inc, ap, ap_offset)
}

/// `A := alpha * x * x^T + A`, `A` symmetric.
#[allow(clippy::too_many_arguments)]
pub fn syr<T: Element<Real = T>, B: Backend>(
    context: &Context<B>,
    layout: Layout,
    triangle: Triangle,
    n: usize,
    alpha: T,
    x: &Buffer<T, B>,
    x_offset: usize,
    x_inc: usize,
    a: &Buffer<T, B>,
    a_offset: usize,
    a_ld: usize,
) -> BlasResult<B::Event> {
    Xsyr::new(context)?.do_syr(layout, triangle, n, alpha, x, x_offset, x_inc, a, a_offset, a_ld)
}

/// Packed variant of [`syr`].
#[allow(clippy::too_many_arguments)]
pub fn spr<T: Element<Real = T>, B: Backend>(
    context: &Context<B>,
    layout: Layout,
    triangle: Triangle,
    n: usize,
    alpha: T,
    x: &Buffer<T, B>,
    x_offset: usize,
    x_inc: usize,
    ap: &Buffer<T, B>,
    ap_offset: usize,
) -> BlasResult<B::Event> {
    Xspr::new(context)?.do_spr(layout, triangle, n, alpha, x, x_offset, x_inc, ap, ap_offset)
}

// ── Extensions ──

/// `B := alpha * op(A)`, out of place.
#[allow(clippy::too_many_arguments)]
pub fn omatcopy<T: Element, B: Backend>(
    context: &Context<B>,
    layout: Layout,
    a_transpose: Transpose,
    m: usize,
    n: usize,
    alpha: T,
    a: &Buffer<T, B>,
    a_offset: usize,
    a_ld: usize,
    b: &Buffer<T, B>,
    b_offset: usize,
    b_ld: usize,
) -> BlasResult<B::Event> {
    Xomatcopy::new(context)?.do_omatcopy(layout, a_transpose, m, n, alpha, a, a_offset, a_ld, b, b_offset, b_ld)
}
