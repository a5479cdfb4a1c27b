use std::marker::PhantomData;

use crate::context::Context;
use crate::error::{BlasResult, Operand, StatusCode};
use crate::routine::{ceil, ceil_div, is_multiple, Routine};
use crate::runtime::{Backend, Buffer, KernelArg};
use crate::types::{Element, Layout, Transpose};

/// How matrix `A` is laid out in its buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MatrixStorage {
    Full,
    Packed,
    /// Band storage; `kl`/`ku` count the sub- and super-diagonals.
    Banded { kl: usize, ku: usize },
}

/// Arguments of one matrix-vector launch `y := alpha * op(A) * x + beta * y`.
pub(crate) struct MatVec<'b, T: Element, B: Backend> {
    pub layout: Layout,
    pub a_transpose: Transpose,
    pub m: usize,
    pub n: usize,
    pub alpha: T,
    pub a: &'b Buffer<T, B>,
    pub a_offset: usize,
    pub a_ld: usize,
    pub x: &'b Buffer<T, B>,
    pub x_offset: usize,
    pub x_inc: usize,
    pub beta: T,
    pub y: &'b Buffer<T, B>,
    pub y_offset: usize,
    pub y_inc: usize,
    pub fast_kernel: bool,
    pub fast_kernel_rot: bool,
    /// Triangular variants: `is_upper + 2 * unit_diagonal`.
    pub parameter: usize,
    pub storage: MatrixStorage,
    pub wait_for: Vec<B::Event>,
}

impl<T: Element, B: Backend> MatVec<'_, T, B> {
    /// Validates and launches. Shared by gemv and the triangular variants,
    /// which select their matrix access through the routine name.
    pub fn launch(self, r: &Routine<'_, B>) -> BlasResult<B::Event> {
        if self.m == 0 || self.n == 0 {
            return Err(r.fail(StatusCode::InvalidDimension));
        }

        // A stored with rows contiguous relative to op(A)
        let a_altlayout = self.layout == Layout::RowMajor;
        let a_one = if a_altlayout { self.n } else { self.m };
        let a_two = if a_altlayout { self.m } else { self.n };
        let a_rotated = (self.layout == Layout::ColMajor && self.a_transpose != Transpose::No)
            || (self.layout == Layout::RowMajor && self.a_transpose == Transpose::No);
        let a_conjugate = self.a_transpose == Transpose::Conjugate;
        let transposed = self.a_transpose != Transpose::No;
        let n_real = if transposed { self.m } else { self.n };
        let m_real = if transposed { self.n } else { self.m };

        let (kl, ku) = match self.storage {
            MatrixStorage::Full => {
                r.test_matrix(a_one, a_two, self.a, self.a_offset, self.a_ld, Operand::A)?;
                (0, 0)
            }
            MatrixStorage::Packed => {
                r.test_matrix_packed(self.n, self.a, self.a_offset, Operand::Ap)?;
                (0, 0)
            }
            MatrixStorage::Banded { kl, ku } => {
                r.test_matrix_banded(self.m, self.n, kl, ku, self.a, self.a_offset, self.a_ld, Operand::A)?;
                // band offsets as seen in column-major storage order
                if a_altlayout {
                    (ku, kl)
                } else {
                    (kl, ku)
                }
            }
        };
        r.test_vector(n_real, self.x, self.x_offset, self.x_inc, Operand::X)?;
        r.test_vector(m_real, self.y, self.y_offset, self.y_inc, Operand::Y)?;
        r.validated();

        let plain = self.a_offset == 0 && !a_conjugate && r.fast_kernels_enabled();
        let fast_kernel = self.fast_kernel
            && plain
            && !a_rotated
            && is_multiple(m_real, r.param("WGS2")? * r.param("WPT2")?)
            && is_multiple(n_real, r.param("WGS2")?)
            && is_multiple(self.a_ld, r.param("VW2")?);
        let fast_kernel_rot = self.fast_kernel_rot
            && plain
            && a_rotated
            && is_multiple(m_real, r.param("WGS3")? * r.param("WPT3")?)
            && is_multiple(n_real, r.param("WGS3")?)
            && is_multiple(self.a_ld, r.param("VW3")?);

        let (kernel_name, global, local) = if fast_kernel {
            ("XgemvFast", m_real / r.param("WPT2")?, r.param("WGS2")?)
        } else if fast_kernel_rot {
            ("XgemvFastRot", m_real / r.param("WPT3")?, r.param("WGS3")?)
        } else {
            let wgs1 = r.param("WGS1")?;
            ("Xgemv", ceil(ceil_div(m_real, r.param("WPT1")?), wgs1), wgs1)
        };

        let kernel = r.kernel(kernel_name)?;
        r.run_kernel(
            &kernel,
            &[
                KernelArg::usize(m_real),
                KernelArg::usize(n_real),
                KernelArg::Scalar(self.alpha.to_scalar()),
                KernelArg::Scalar(self.beta.to_scalar()),
                KernelArg::flag(a_rotated),
                KernelArg::Memory(self.a.memory()),
                KernelArg::usize(self.a_offset),
                KernelArg::usize(self.a_ld),
                KernelArg::Memory(self.x.memory()),
                KernelArg::usize(self.x_offset),
                KernelArg::usize(self.x_inc),
                KernelArg::Memory(self.y.memory()),
                KernelArg::usize(self.y_offset),
                KernelArg::usize(self.y_inc),
                KernelArg::flag(a_conjugate),
                KernelArg::usize(self.parameter),
                KernelArg::usize(kl),
                KernelArg::usize(ku),
            ],
            &[global],
            &[local],
            &self.wait_for,
        )
    }
}

/// General matrix-vector multiplication.
pub struct Xgemv<'a, T: Element, B: Backend> {
    routine: Routine<'a, B>,
    _elem: PhantomData<T>,
}

impl<'a, T: Element, B: Backend> Xgemv<'a, T, B> {
    pub fn new(context: &'a Context<B>) -> BlasResult<Self> {
        let routine = Routine::new(context, "Xgemv", "level2/xgemv", &["Xgemv"], T::PRECISION)?;
        Ok(Xgemv { routine, _elem: PhantomData })
    }

    pub fn routine(&self) -> &Routine<'a, B> {
        &self.routine
    }

    #[allow(clippy::too_many_arguments)]
    pub fn do_gemv(
        &self,
        layout: Layout,
        a_transpose: Transpose,
        m: usize,
        n: usize,
        alpha: T,
        a: &Buffer<T, B>,
        a_offset: usize,
        a_ld: usize,
        x: &Buffer<T, B>,
        x_offset: usize,
        x_inc: usize,
        beta: T,
        y: &Buffer<T, B>,
        y_offset: usize,
        y_inc: usize,
    ) -> BlasResult<B::Event> {
        let event = MatVec {
            layout,
            a_transpose,
            m,
            n,
            alpha,
            a,
            a_offset,
            a_ld,
            x,
            x_offset,
            x_inc,
            beta,
            y,
            y_offset,
            y_inc,
            fast_kernel: true,
            fast_kernel_rot: true,
            parameter: 0,
            storage: MatrixStorage::Full,
            wait_for: Vec::new(),
        }
        .launch(&self.routine)?;
        self.routine.complete(event)
    }
}
