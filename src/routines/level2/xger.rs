use std::marker::PhantomData;

use crate::context::Context;
use crate::error::{BlasResult, Operand};
use crate::routine::{ceil, ceil_div, Routine};
use crate::runtime::{Backend, Buffer, KernelArg};
use crate::types::{Element, Layout};

/// Rank-1 update `A := alpha * x * y^T + A`.
pub struct Xger<'a, T: Element, B: Backend> {
    routine: Routine<'a, B>,
    _elem: PhantomData<T>,
}

impl<'a, T: Element, B: Backend> Xger<'a, T, B> {
    pub fn new(context: &'a Context<B>) -> BlasResult<Self> {
        let routine = Routine::new(context, "Xger", "level2/xger", &["Xger"], T::PRECISION)?;
        Ok(Xger { routine, _elem: PhantomData })
    }

    pub fn routine(&self) -> &Routine<'a, B> {
        &self.routine
    }

    #[allow(clippy::too_many_arguments)]
    pub fn do_ger(
        &self,
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
        let r = &self.routine;
        let a_is_rowmajor = layout == Layout::RowMajor;
        let a_one = if a_is_rowmajor { n } else { m };
        let a_two = if a_is_rowmajor { m } else { n };

        r.test_matrix(a_one, a_two, a, a_offset, a_ld, Operand::A)?;
        r.test_vector(m, x, x_offset, x_inc, Operand::X)?;
        r.test_vector(n, y, y_offset, y_inc, Operand::Y)?;
        r.validated();

        let wpt = r.param("WPT")?;
        let wgs1 = r.param("WGS1")?;
        let wgs2 = r.param("WGS2")?;
        let global = [ceil(ceil_div(a_one, wpt), wgs1), ceil(ceil_div(a_two, wpt), wgs2)];

        let kernel = r.kernel("Xger")?;
        let event = r.run_kernel(
            &kernel,
            &[
                KernelArg::usize(a_one),
                KernelArg::usize(a_two),
                KernelArg::Scalar(alpha.to_scalar()),
                KernelArg::Memory(x.memory()),
                KernelArg::usize(x_offset),
                KernelArg::usize(x_inc),
                KernelArg::Memory(y.memory()),
                KernelArg::usize(y_offset),
                KernelArg::usize(y_inc),
                KernelArg::Memory(a.memory()),
                KernelArg::usize(a_offset),
                KernelArg::usize(a_ld),
                KernelArg::flag(a_is_rowmajor),
            ],
            &global,
            &[wgs1, wgs2],
            &[],
        )?;
        r.complete(event)
    }
}
