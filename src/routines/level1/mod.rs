//! Vector-vector routines.
//!
//! The element-wise routines (rotation included) share the `Xaxpy` tuning family and launch a
//! fast kernel when the vectors are contiguous, unoffset and a multiple of
//! `WGS * WPT * VW` long. The reductions share the `Xdot` family and run in two
//! stages: a main kernel writing `2 * WGS2` partial results, then an epilogue
//! reducing those to a single value.

mod xasum;
mod xaxpy;
mod xcopy;
mod xdot;
mod xnrm2;
mod xrot;
mod xscal;
mod xswap;

pub use xasum::Xasum;
pub use xaxpy::Xaxpy;
pub use xcopy::Xcopy;
pub use xdot::Xdot;
pub use xnrm2::Xnrm2;
pub use xrot::Xrot;
pub use xscal::Xscal;
pub use xswap::Xswap;

use crate::error::BlasResult;
use crate::routine::{ceil, is_multiple, Routine};
use crate::runtime::{Backend, Buffer, KernelArg};
use crate::types::Element;

/// Kernel choice and 1-D geometry of an element-wise launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ElementwiseLaunch {
    pub fast: bool,
    pub global: usize,
    pub local: usize,
}

pub(crate) fn elementwise_launch<B: Backend>(
    routine: &Routine<'_, B>,
    n: usize,
    contiguous: bool,
) -> BlasResult<ElementwiseLaunch> {
    let wgs = routine.param("WGS")?;
    let wpt = routine.param("WPT")?;
    let vw = routine.param("VW")?;
    let fast = routine.fast_kernels_enabled() && contiguous && is_multiple(n, wgs.saturating_mul(wpt).saturating_mul(vw));
    let global = if fast { n / wpt / vw } else { ceil(n, wgs.saturating_mul(wpt)) / wpt };
    Ok(ElementwiseLaunch { fast, global, local: wgs })
}

/// Geometry shared by the two stages of a reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Reduction {
    pub wgs1: usize,
    pub wgs2: usize,
}

impl Reduction {
    pub fn resolve<B: Backend>(routine: &Routine<'_, B>) -> BlasResult<Self> {
        Ok(Reduction { wgs1: routine.param("WGS1")?, wgs2: routine.param("WGS2")? })
    }

    /// Elements of the partial-results buffer.
    #[inline]
    pub fn temp_size(&self) -> usize {
        2 * self.wgs2
    }

    #[inline]
    pub fn main_global(&self) -> usize {
        self.wgs1 * self.temp_size()
    }

    /// Runs the epilogue once `main_event` has completed.
    pub fn run_epilogue<T: Element, B: Backend>(
        &self,
        routine: &Routine<'_, B>,
        kernel_name: &str,
        temp: &Buffer<T, B>,
        out: &Buffer<T, B>,
        out_offset: usize,
        main_event: B::Event,
    ) -> BlasResult<B::Event> {
        let kernel = routine.kernel(kernel_name)?;
        routine.run_kernel(
            &kernel,
            &[KernelArg::Memory(temp.memory()), KernelArg::Memory(out.memory()), KernelArg::usize(out_offset)],
            &[self.wgs2],
            &[self.wgs2],
            &[main_event],
        )
    }
}
