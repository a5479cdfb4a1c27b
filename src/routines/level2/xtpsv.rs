use std::marker::PhantomData;

use super::triangular_parameter;
use crate::context::Context;
use crate::error::{BlasResult, Operand};
use crate::routine::Routine;
use crate::runtime::{Backend, Buffer, KernelArg};
use crate::types::{Diagonal, Element, Layout, Transpose, Triangle};

/// Solves `op(A) * x = b` for a packed triangular matrix, overwriting `b`
/// (passed as `x`) with the solution.
pub struct Xtpsv<'a, T: Element, B: Backend> {
    routine: Routine<'a, B>,
    _elem: PhantomData<T>,
}

impl<'a, T: Element, B: Backend> Xtpsv<'a, T, B> {
    pub fn new(context: &'a Context<B>) -> BlasResult<Self> {
        let routine = Routine::new(context, "Xtpsv", "level2/xtpsv", &["Xgemv"], T::PRECISION)?;
        Ok(Xtpsv { routine, _elem: PhantomData })
    }

    pub fn routine(&self) -> &Routine<'a, B> {
        &self.routine
    }

    #[allow(clippy::too_many_arguments)]
    pub fn do_tpsv(
        &self,
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
        let r = &self.routine;
        r.test_matrix_packed(n, ap, ap_offset, Operand::Ap)?;
        r.test_vector(n, x, x_offset, x_inc, Operand::X)?;
        r.validated();

        let rotated = (layout == Layout::ColMajor && a_transpose != Transpose::No)
            || (layout == Layout::RowMajor && a_transpose == Transpose::No);
        let args = [
            KernelArg::usize(n),
            KernelArg::Memory(ap.memory()),
            KernelArg::usize(ap_offset),
            KernelArg::Memory(x.memory()),
            KernelArg::usize(x_offset),
            KernelArg::usize(x_inc),
            KernelArg::flag(rotated),
            KernelArg::flag(a_transpose == Transpose::Conjugate),
            KernelArg::usize(triangular_parameter(layout, triangle, diagonal)),
        ];
        // every unknown depends on the ones solved before it: one work-group
        let wgs1 = r.param("WGS1")?;
        let kernel = r.kernel("Xtpsv")?;
        let event = r.run_kernel(&kernel, &args, &[wgs1], &[wgs1], &[])?;
        r.complete(event)
    }
}
