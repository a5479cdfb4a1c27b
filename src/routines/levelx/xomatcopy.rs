use std::marker::PhantomData;

use crate::context::Context;
use crate::error::{BlasResult, Operand};
use crate::routine::{ceil, ceil_div, is_multiple, Routine};
use crate::runtime::{Backend, Buffer, KernelArg};
use crate::types::{Element, Layout, Transpose};

/// Out-of-place scaled copy `B := alpha * op(A)`, where `op` may transpose
/// and conjugate.
///
/// Untransposed copies between identically shaped, unoffset matrices whose
/// sizes divide the tile take the `CopyMatrixFast` kernel; everything else
/// goes through `CopyMatrix`.
pub struct Xomatcopy<'a, T: Element, B: Backend> {
    routine: Routine<'a, B>,
    _elem: PhantomData<T>,
}

impl<'a, T: Element, B: Backend> Xomatcopy<'a, T, B> {
    pub fn new(context: &'a Context<B>) -> BlasResult<Self> {
        let routine = Routine::new(context, "Xomatcopy", "levelx/copy", &["Copy"], T::PRECISION)?;
        Ok(Xomatcopy { routine, _elem: PhantomData })
    }

    pub fn routine(&self) -> &Routine<'a, B> {
        &self.routine
    }

    #[allow(clippy::too_many_arguments)]
    pub fn do_omatcopy(
        &self,
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
        let r = &self.routine;
        let rotated = layout == Layout::RowMajor;
        let transpose = a_transpose != Transpose::No;
        let conjugate = a_transpose == Transpose::Conjugate;
        let a_one = if rotated { n } else { m };
        let a_two = if rotated { m } else { n };
        let b_one = if transpose { a_two } else { a_one };
        let b_two = if transpose { a_one } else { a_two };

        r.test_matrix(a_one, a_two, a, a_offset, a_ld, Operand::A)?;
        r.test_matrix(b_one, b_two, b, b_offset, b_ld, Operand::B)?;
        r.validated();

        let dimx = r.param("COPY_DIMX")?;
        let dimy = r.param("COPY_DIMY")?;
        let vw = r.param("COPY_VW")?;
        let wpt = r.param("COPY_WPT")?;
        let alpha = KernelArg::Scalar(alpha.to_scalar());

        let fast = r.fast_kernels_enabled()
            && !transpose
            && a_offset == 0
            && b_offset == 0
            && a_ld == b_ld
            && is_multiple(a_ld, vw)
            && is_multiple(a_one, vw * dimx)
            && is_multiple(a_two, wpt * dimy);

        let event = if fast {
            let kernel = r.kernel("CopyMatrixFast")?;
            r.run_kernel(
                &kernel,
                &[
                    KernelArg::usize(a_ld),
                    KernelArg::Memory(a.memory()),
                    KernelArg::Memory(b.memory()),
                    alpha,
                ],
                &[a_one / vw, a_two / wpt],
                &[dimx, dimy],
                &[],
            )?
        } else {
            let kernel = r.kernel("CopyMatrix")?;
            r.run_kernel(
                &kernel,
                &[
                    KernelArg::usize(a_one),
                    KernelArg::usize(a_two),
                    KernelArg::usize(a_ld),
                    KernelArg::usize(a_offset),
                    KernelArg::Memory(a.memory()),
                    KernelArg::usize(b_one),
                    KernelArg::usize(b_two),
                    KernelArg::usize(b_ld),
                    KernelArg::usize(b_offset),
                    KernelArg::Memory(b.memory()),
                    alpha,
                    KernelArg::flag(transpose),
                    KernelArg::flag(conjugate),
                ],
                &[ceil(b_one, dimx), ceil(ceil_div(b_two, wpt), dimy)],
                &[dimx, dimy],
                &[],
            )?
        };
        r.complete(event)
    }
}
