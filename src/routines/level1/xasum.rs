use std::marker::PhantomData;

use super::Reduction;
use crate::context::Context;
use crate::error::{BlasResult, Operand};
use crate::routine::Routine;
use crate::runtime::{Backend, Buffer, KernelArg};
use crate::types::Element;

/// Sum of absolute values; `|re| + |im|` per complex element.
pub struct Xasum<'a, T: Element, B: Backend> {
    routine: Routine<'a, B>,
    _elem: PhantomData<T>,
}

impl<'a, T: Element, B: Backend> Xasum<'a, T, B> {
    pub fn new(context: &'a Context<B>) -> BlasResult<Self> {
        let routine = Routine::new(context, "Xasum", "level1/xasum", &["Xdot"], T::PRECISION)?;
        Ok(Xasum { routine, _elem: PhantomData })
    }

    pub fn routine(&self) -> &Routine<'a, B> {
        &self.routine
    }

    pub fn do_asum(
        &self,
        n: usize,
        asum: &Buffer<T, B>,
        asum_offset: usize,
        x: &Buffer<T, B>,
        x_offset: usize,
        x_inc: usize,
    ) -> BlasResult<B::Event> {
        let r = &self.routine;
        r.test_vector(n, x, x_offset, x_inc, Operand::X)?;
        r.test_scalar(asum, asum_offset, Operand::Asum)?;
        r.validated();

        let reduction = Reduction::resolve(r)?;
        let temp = r.temp_buffer::<T>(reduction.temp_size())?;
        let kernel = r.kernel("Xasum")?;
        let main_event = r.run_kernel(
            &kernel,
            &[
                KernelArg::usize(n),
                KernelArg::Memory(x.memory()),
                KernelArg::usize(x_offset),
                KernelArg::usize(x_inc),
                KernelArg::Memory(temp.memory()),
            ],
            &[reduction.main_global()],
            &[reduction.wgs1],
            &[],
        )?;
        let event = reduction.run_epilogue(r, "XasumEpilogue", &temp, asum, asum_offset, main_event)?;
        r.complete(event)
    }
}
