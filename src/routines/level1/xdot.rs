use std::marker::PhantomData;

use super::Reduction;
use crate::context::Context;
use crate::error::{BlasResult, Operand};
use crate::routine::Routine;
use crate::runtime::{Backend, Buffer, KernelArg};
use crate::types::Element;

/// Dot product of two vectors, optionally conjugating `x`.
///
/// Serves `dot`, `dotu` and `dotc`; they differ only in the conjugation flag
/// and the routine name.
pub struct Xdot<'a, T: Element, B: Backend> {
    routine: Routine<'a, B>,
    _elem: PhantomData<T>,
}

impl<'a, T: Element, B: Backend> Xdot<'a, T, B> {
    pub fn new(context: &'a Context<B>) -> BlasResult<Self> {
        Self::named(context, "Xdot")
    }

    /// Same kernels under another routine name (`Xdotu`, `Xdotc`).
    pub fn named(context: &'a Context<B>, name: &'static str) -> BlasResult<Self> {
        let routine = Routine::new(context, name, "level1/xdot", &["Xdot"], T::PRECISION)?;
        Ok(Xdot { routine, _elem: PhantomData })
    }

    pub fn routine(&self) -> &Routine<'a, B> {
        &self.routine
    }

    #[allow(clippy::too_many_arguments)]
    pub fn do_dot(
        &self,
        n: usize,
        dot: &Buffer<T, B>,
        dot_offset: usize,
        x: &Buffer<T, B>,
        x_offset: usize,
        x_inc: usize,
        y: &Buffer<T, B>,
        y_offset: usize,
        y_inc: usize,
        do_conjugate: bool,
    ) -> BlasResult<B::Event> {
        let r = &self.routine;
        r.test_vector(n, x, x_offset, x_inc, Operand::X)?;
        r.test_vector(n, y, y_offset, y_inc, Operand::Y)?;
        r.test_scalar(dot, dot_offset, Operand::Dot)?;
        r.validated();

        let reduction = Reduction::resolve(r)?;
        let temp = r.temp_buffer::<T>(reduction.temp_size())?;
        let kernel = r.kernel("Xdot")?;
        let main_event = r.run_kernel(
            &kernel,
            &[
                KernelArg::usize(n),
                KernelArg::Memory(x.memory()),
                KernelArg::usize(x_offset),
                KernelArg::usize(x_inc),
                KernelArg::Memory(y.memory()),
                KernelArg::usize(y_offset),
                KernelArg::usize(y_inc),
                KernelArg::Memory(temp.memory()),
                KernelArg::flag(do_conjugate),
            ],
            &[reduction.main_global()],
            &[reduction.wgs1],
            &[],
        )?;
        let event = reduction.run_epilogue(r, "XdotEpilogue", &temp, dot, dot_offset, main_event)?;
        r.complete(event)
    }
}
