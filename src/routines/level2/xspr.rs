use std::marker::PhantomData;

use super::xher::RankOneUpdate;
use crate::context::Context;
use crate::error::BlasResult;
use crate::routine::Routine;
use crate::runtime::{Backend, Buffer};
use crate::types::{Element, Layout, Triangle};

/// Symmetric rank-1 update of a packed matrix, real types only.
pub struct Xspr<'a, T: Element<Real = T>, B: Backend> {
    routine: Routine<'a, B>,
    _elem: PhantomData<T>,
}

impl<'a, T: Element<Real = T>, B: Backend> Xspr<'a, T, B> {
    pub fn new(context: &'a Context<B>) -> BlasResult<Self> {
        let routine = Routine::new(context, "Xspr", "level2/xher", &["Xger"], T::PRECISION)?;
        Ok(Xspr { routine, _elem: PhantomData })
    }

    pub fn routine(&self) -> &Routine<'a, B> {
        &self.routine
    }

    #[allow(clippy::too_many_arguments)]
    pub fn do_spr(
        &self,
        layout: Layout,
        triangle: Triangle,
        n: usize,
        alpha: T,
        x: &Buffer<T, B>,
        x_offset: usize,
        x_inc: usize,
        ap: &Buffer<T, B>,
        ap_offset: usize,
    ) -> BlasResult<B::Event> {
        let event = RankOneUpdate {
            layout,
            triangle,
            n,
            alpha,
            x,
            x_offset,
            x_inc,
            a: ap,
            a_offset: ap_offset,
            a_ld: n,
            packed: true,
        }
        .launch(&self.routine)?;
        self.routine.complete(event)
    }
}
