use std::marker::PhantomData;

use super::elementwise_launch;
use crate::context::Context;
use crate::error::{BlasResult, Operand};
use crate::routine::Routine;
use crate::runtime::{Backend, Buffer, KernelArg};
use crate::types::Element;

/// `x := alpha * x`
pub struct Xscal<'a, T: Element, B: Backend> {
    routine: Routine<'a, B>,
    _elem: PhantomData<T>,
}

impl<'a, T: Element, B: Backend> Xscal<'a, T, B> {
    pub fn new(context: &'a Context<B>) -> BlasResult<Self> {
        let routine = Routine::new(context, "Xscal", "level1/xscal", &["Xaxpy"], T::PRECISION)?;
        Ok(Xscal { routine, _elem: PhantomData })
    }

    pub fn routine(&self) -> &Routine<'a, B> {
        &self.routine
    }

    pub fn do_scal(&self, n: usize, alpha: T, x: &Buffer<T, B>, x_offset: usize, x_inc: usize) -> BlasResult<B::Event> {
        let r = &self.routine;
        r.test_vector(n, x, x_offset, x_inc, Operand::X)?;
        r.validated();

        let launch = elementwise_launch(r, n, x_offset == 0 && x_inc == 1)?;
        let alpha = KernelArg::Scalar(alpha.to_scalar());
        let (name, args) = if launch.fast {
            ("XscalFast", vec![KernelArg::usize(n), alpha, KernelArg::Memory(x.memory())])
        } else {
            (
                "Xscal",
                vec![
                    KernelArg::usize(n),
                    alpha,
                    KernelArg::Memory(x.memory()),
                    KernelArg::usize(x_offset),
                    KernelArg::usize(x_inc),
                ],
            )
        };
        let kernel = r.kernel(name)?;
        let event = r.run_kernel(&kernel, &args, &[launch.global], &[launch.local], &[])?;
        r.complete(event)
    }
}
