use std::marker::PhantomData;

use super::triangular_parameter;
use super::xgemv::{MatVec, MatrixStorage};
use crate::context::Context;
use crate::error::{BlasResult, Operand};
use crate::routine::Routine;
use crate::runtime::{Backend, Buffer};
use crate::types::{Diagonal, Element, Layout, Transpose, Triangle};

/// `x := op(A) * x` for a triangular band matrix with `k` off-diagonals.
pub struct Xtbmv<'a, T: Element, B: Backend> {
    routine: Routine<'a, B>,
    _elem: PhantomData<T>,
}

impl<'a, T: Element, B: Backend> Xtbmv<'a, T, B> {
    pub fn new(context: &'a Context<B>) -> BlasResult<Self> {
        let routine = Routine::new(context, "Xtbmv", "level2/xgemv", &["Xgemv"], T::PRECISION)?;
        Ok(Xtbmv { routine, _elem: PhantomData })
    }

    pub fn routine(&self) -> &Routine<'a, B> {
        &self.routine
    }

    #[allow(clippy::too_many_arguments)]
    pub fn do_tbmv(
        &self,
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
        let r = &self.routine;
        let (kl, ku) = match triangle {
            Triangle::Upper => (0, k),
            Triangle::Lower => (k, 0),
        };
        r.test_matrix_banded(n, n, kl, ku, a, a_offset, a_ld, Operand::A)?;
        r.test_vector(n, x, x_offset, x_inc, Operand::X)?;
        r.validated();
        r.program()?;

        let scratch = r.temp_buffer::<T>(x.len())?;
        let copy_event = r.copy_buffer(x.memory(), 0, scratch.memory(), 0, x.len(), &[])?;
        let event = MatVec {
            layout,
            a_transpose,
            m: n,
            n,
            alpha: T::one(),
            a,
            a_offset,
            a_ld,
            x: &scratch,
            x_offset,
            x_inc,
            beta: T::zero(),
            y: x,
            y_offset: x_offset,
            y_inc: x_inc,
            fast_kernel: false,
            fast_kernel_rot: false,
            parameter: triangular_parameter(layout, triangle, diagonal),
            storage: MatrixStorage::Banded { kl, ku },
            wait_for: vec![copy_event],
        }
        .launch(r)?;
        r.complete(event)
    }
}
