use std::marker::PhantomData;

use super::Reduction;
use crate::context::Context;
use crate::error::{BlasResult, Operand};
use crate::routine::Routine;
use crate::runtime::{Backend, Buffer, KernelArg};
use crate::types::Element;

/// Euclidean norm of `x`. Complex inputs store the norm in the real part.
pub struct Xnrm2<'a, T: Element, B: Backend> {
    routine: Routine<'a, B>,
    _elem: PhantomData<T>,
}

impl<'a, T: Element, B: Backend> Xnrm2<'a, T, B> {
    pub fn new(context: &'a Context<B>) -> BlasResult<Self> {
        let routine = Routine::new(context, "Xnrm2", "level1/xnrm2", &["Xdot"], T::PRECISION)?;
        Ok(Xnrm2 { routine, _elem: PhantomData })
    }

    pub fn routine(&self) -> &Routine<'a, B> {
        &self.routine
    }

    pub fn do_nrm2(
        &self,
        n: usize,
        nrm2: &Buffer<T, B>,
        nrm2_offset: usize,
        x: &Buffer<T, B>,
        x_offset: usize,
        x_inc: usize,
    ) -> BlasResult<B::Event> {
        let r = &self.routine;
        r.test_vector(n, x, x_offset, x_inc, Operand::X)?;
        r.test_scalar(nrm2, nrm2_offset, Operand::Nrm2)?;
        r.validated();

        let reduction = Reduction::resolve(r)?;
        let temp = r.temp_buffer::<T>(reduction.temp_size())?;
        let kernel = r.kernel("Xnrm2")?;
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
        let event = reduction.run_epilogue(r, "Xnrm2Epilogue", &temp, nrm2, nrm2_offset, main_event)?;
        r.complete(event)
    }
}
