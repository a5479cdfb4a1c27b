use std::marker::PhantomData;

use super::storage_upper;
use crate::context::Context;
use crate::error::{BlasResult, Operand, StatusCode};
use crate::routine::{ceil, ceil_div, Routine};
use crate::runtime::{Backend, Buffer, KernelArg};
use crate::types::{Element, Layout, Triangle};

/// Arguments of one Hermitian rank-1 update `A := alpha * x * x^H + A`.
///
/// With a real element type this is the symmetric update. Packed storage is
/// selected by the routine name (`Xhpr`, `Xspr`) and needs no leading
/// dimension.
pub(crate) struct RankOneUpdate<'b, T: Element, B: Backend> {
    pub layout: Layout,
    pub triangle: Triangle,
    pub n: usize,
    pub alpha: T,
    pub x: &'b Buffer<T, B>,
    pub x_offset: usize,
    pub x_inc: usize,
    pub a: &'b Buffer<T, B>,
    pub a_offset: usize,
    pub a_ld: usize,
    pub packed: bool,
}

impl<T: Element, B: Backend> RankOneUpdate<'_, T, B> {
    pub fn launch(self, r: &Routine<'_, B>) -> BlasResult<B::Event> {
        if self.n == 0 {
            return Err(r.fail(StatusCode::InvalidDimension));
        }
        let is_upper = storage_upper(self.layout, self.triangle);
        let is_rowmajor = self.layout == Layout::RowMajor;

        if self.packed {
            r.test_matrix_packed(self.n, self.a, self.a_offset, Operand::Ap)?;
        } else {
            r.test_matrix(self.n, self.n, self.a, self.a_offset, self.a_ld, Operand::A)?;
        }
        r.test_vector(self.n, self.x, self.x_offset, self.x_inc, Operand::X)?;
        r.validated();

        let wpt = r.param("WPT")?;
        let wgs1 = r.param("WGS1")?;
        let wgs2 = r.param("WGS2")?;
        let global = [ceil(ceil_div(self.n, wpt), wgs1), ceil(ceil_div(self.n, wpt), wgs2)];

        let kernel = r.kernel("Xher")?;
        r.run_kernel(
            &kernel,
            &[
                KernelArg::usize(self.n),
                KernelArg::Scalar(self.alpha.to_scalar()),
                KernelArg::Memory(self.x.memory()),
                KernelArg::usize(self.x_offset),
                KernelArg::usize(self.x_inc),
                KernelArg::Memory(self.a.memory()),
                KernelArg::usize(self.a_offset),
                KernelArg::usize(self.a_ld),
                KernelArg::flag(is_upper),
                KernelArg::flag(is_rowmajor),
            ],
            &global,
            &[wgs1, wgs2],
            &[],
        )
    }
}

/// Hermitian rank-1 update with a real `alpha`.
pub struct Xher<'a, T: Element, B: Backend> {
    routine: Routine<'a, B>,
    _elem: PhantomData<T>,
}

impl<'a, T: Element, B: Backend> Xher<'a, T, B> {
    pub fn new(context: &'a Context<B>) -> BlasResult<Self> {
        let routine = Routine::new(context, "Xher", "level2/xher", &["Xger"], T::PRECISION)?;
        Ok(Xher { routine, _elem: PhantomData })
    }

    pub fn routine(&self) -> &Routine<'a, B> {
        &self.routine
    }

    #[allow(clippy::too_many_arguments)]
    pub fn do_her(
        &self,
        layout: Layout,
        triangle: Triangle,
        n: usize,
        alpha: T::Real,
        x: &Buffer<T, B>,
        x_offset: usize,
        x_inc: usize,
        a: &Buffer<T, B>,
        a_offset: usize,
        a_ld: usize,
    ) -> BlasResult<B::Event> {
        let event = RankOneUpdate {
            layout,
            triangle,
            n,
            alpha: T::from_real(alpha),
            x,
            x_offset,
            x_inc,
            a,
            a_offset,
            a_ld,
            packed: false,
        }
        .launch(&self.routine)?;
        self.routine.complete(event)
    }
}
