use std::marker::PhantomData;

use super::elementwise_launch;
use crate::context::Context;
use crate::error::{BlasResult, Operand, StatusCode};
use crate::routine::Routine;
use crate::runtime::{Backend, Buffer, KernelArg};
use crate::types::Element;

/// Plane rotation `(x, y) := (c * x + s * y, c * y - s * x)`, real types only.
pub struct Xrot<'a, T: Element, B: Backend> {
    routine: Routine<'a, B>,
    _elem: PhantomData<T>,
}

impl<'a, T: Element, B: Backend> Xrot<'a, T, B> {
    pub fn new(context: &'a Context<B>) -> BlasResult<Self> {
        let routine = Routine::new(context, "Xrot", "level1/xrot", &["Xaxpy"], T::PRECISION)?;
        if T::PRECISION.is_complex() {
            log::error!("Xrot {}: no complex rotation", T::PRECISION);
            return Err(routine.fail(StatusCode::InvalidPrecision));
        }
        Ok(Xrot { routine, _elem: PhantomData })
    }

    pub fn routine(&self) -> &Routine<'a, B> {
        &self.routine
    }

    #[allow(clippy::too_many_arguments)]
    pub fn do_rot(
        &self,
        n: usize,
        x: &Buffer<T, B>,
        x_offset: usize,
        x_inc: usize,
        y: &Buffer<T, B>,
        y_offset: usize,
        y_inc: usize,
        cos: T,
        sin: T,
    ) -> BlasResult<B::Event> {
        let r = &self.routine;
        r.test_vector(n, x, x_offset, x_inc, Operand::X)?;
        r.test_vector(n, y, y_offset, y_inc, Operand::Y)?;
        r.validated();

        let contiguous = x_offset == 0 && x_inc == 1 && y_offset == 0 && y_inc == 1;
        let launch = elementwise_launch(r, n, contiguous)?;
        let mut args = vec![
            KernelArg::usize(n),
            KernelArg::Scalar(cos.to_scalar()),
            KernelArg::Scalar(sin.to_scalar()),
        ];
        let name = if launch.fast {
            args.extend([KernelArg::Memory(x.memory()), KernelArg::Memory(y.memory())]);
            "XrotFast"
        } else {
            args.extend([
                KernelArg::Memory(x.memory()),
                KernelArg::usize(x_offset),
                KernelArg::usize(x_inc),
                KernelArg::Memory(y.memory()),
                KernelArg::usize(y_offset),
                KernelArg::usize(y_inc),
            ]);
            "Xrot"
        };
        let kernel = r.kernel(name)?;
        let event = r.run_kernel(&kernel, &args, &[launch.global], &[launch.local], &[])?;
        r.complete(event)
    }
}
