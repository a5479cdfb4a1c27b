use std::marker::PhantomData;

use super::xher::RankOneUpdate;
use crate::context::Context;
use crate::error::BlasResult;
use crate::routine::Routine;
use crate::runtime::{Backend, Buffer};
use crate::types::{Element, Layout, Triangle};

/// Symmetric rank-1 update `A := alpha * x * x^T + A` for real types.
pub struct Xsyr<'a, T: Element<Real = T>, B: Backend> {
    routine: Routine<'a, B>,
    _elem: PhantomData<T>,
}

impl<'a, T: Element<Real = T>, B: Backend> Xsyr<'a, T, B> {
    pub fn new(context: &'a Context<B>) -> BlasResult<Self> {
        let routine = Routine::new(context, "Xsyr", "level2/xher", &["Xger"], T::PRECISION)?;
        Ok(Xsyr { routine, _elem: PhantomData })
    }

    pub fn routine(&self) -> &Routine<'a, B> {
        &self.routine
    }

    #[allow(clippy::too_many_arguments)]
    pub fn do_syr(
        &self,
        layout: Layout,
        triangle: Triangle,
        n: usize,
        alpha: T,
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
            alpha,
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
