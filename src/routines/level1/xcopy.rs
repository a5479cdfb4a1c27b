use std::marker::PhantomData;

use super::elementwise_launch;
use crate::context::Context;
use crate::error::{BlasResult, Operand};
use crate::routine::Routine;
use crate::runtime::{Backend, Buffer, KernelArg};
use crate::types::Element;

/// `y := x`
pub struct Xcopy<'a, T: Element, B: Backend> {
    routine: Routine<'a, B>,
    _elem: PhantomData<T>,
}

impl<'a, T: Element, B: Backend> Xcopy<'a, T, B> {
    pub fn new(context: &'a Context<B>) -> BlasResult<Self> {
        let routine = Routine::new(context, "Xcopy", "level1/xcopy", &["Xaxpy"], T::PRECISION)?;
        Ok(Xcopy { routine, _elem: PhantomData })
    }

    pub fn routine(&self) -> &Routine<'a, B> {
        &self.routine
    }

    #[allow(clippy::too_many_arguments)]
    pub fn do_copy(
        &self,
        n: usize,
        x: &Buffer<T, B>,
        x_offset: usize,
        x_inc: usize,
        y: &Buffer<T, B>,
        y_offset: usize,
        y_inc: usize,
    ) -> BlasResult<B::Event> {
        let r = &self.routine;
        r.test_vector(n, x, x_offset, x_inc, Operand::X)?;
        r.test_vector(n, y, y_offset, y_inc, Operand::Y)?;
        r.validated();

        let contiguous = x_offset == 0 && x_inc == 1 && y_offset == 0 && y_inc == 1;
        let launch = elementwise_launch(r, n, contiguous)?;
        let event = if launch.fast {
            let kernel = r.kernel("XcopyFast")?;
            r.run_kernel(
                &kernel,
                &[KernelArg::usize(n), KernelArg::Memory(x.memory()), KernelArg::Memory(y.memory())],
                &[launch.global],
                &[launch.local],
                &[],
            )?
        } else {
            let kernel = r.kernel("Xcopy")?;
            r.run_kernel(
                &kernel,
                &[
                    KernelArg::usize(n),
                    KernelArg::Memory(x.memory()),
                    KernelArg::usize(x_offset),
                    KernelArg::usize(x_inc),
                    KernelArg::Memory(y.memory()),
                    KernelArg::usize(y_offset),
                    KernelArg::usize(y_inc),
                ],
                &[launch.global],
                &[launch.local],
                &[],
            )?
        };
        r.complete(event)
    }
}
