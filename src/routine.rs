//! Shared base of every routine.
//!
//! A [`Routine`] is built per call. Construction resolves the tuned
//! parameters for the context's device; the `do_*` method of the concrete
//! routine then validates its buffers, fetches the program, and launches the
//! kernels. Every low-level failure past validation, panics included, becomes
//! `InvalidKernel`.

use std::any::Any;
use std::cell::{Cell, OnceCell};
use std::fmt::Write as _;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::cache::{source_hash, ProgramKey};
use crate::context::Context;
use crate::database::ParameterSet;
use crate::error::{BlasResult, Operand, StatusCode};
use crate::runtime::{Backend, Buffer, KernelArg, RuntimeError, RuntimeResult};
use crate::types::{Element, Precision};
use crate::validation;

/// Progress of one routine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Constructed,
    ParametersResolved,
    Validated,
    ProgramReady,
    /// `n` kernels or copies enqueued so far.
    Launched(usize),
    Completed,
    Failed,
}

pub struct Routine<'a, B: Backend> {
    context: &'a Context<B>,
    name: &'static str,
    program_name: &'static str,
    precision: Precision,
    parameters: ParameterSet,
    state: Cell<CallState>,
    program: OnceCell<Arc<B::Program>>,
}

impl<'a, B: Backend> Routine<'a, B> {
    /// Resolves the parameters of `families` for the context's device.
    ///
    /// `name` labels the routine in logs, cache keys and the generated
    /// `ROUTINE_*` define; `program_name` selects the backend source.
    pub fn new(
        context: &'a Context<B>,
        name: &'static str,
        program_name: &'static str,
        families: &[&str],
        precision: Precision,
    ) -> BlasResult<Self> {
        let routine = Routine {
            context,
            name,
            program_name,
            precision,
            parameters: ParameterSet::new(),
            state: Cell::new(CallState::Constructed),
            program: OnceCell::new(),
        };
        let parameters = context.parameters(families, precision).map_err(|e| routine.fail(e))?;
        let routine = Routine { parameters, ..routine };
        routine.transition(CallState::ParametersResolved);
        Ok(routine)
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn precision(&self) -> Precision {
        self.precision
    }

    #[inline]
    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    #[inline]
    pub fn state(&self) -> CallState {
        self.state.get()
    }

    #[inline]
    pub fn context(&self) -> &'a Context<B> {
        self.context
    }

    #[inline]
    pub fn backend(&self) -> &'a B {
        self.context.backend()
    }

    /// Whether fast kernel variants may be picked at all.
    pub fn fast_kernels_enabled(&self) -> bool {
        !self.context.config().disable_fast_kernels
    }

    fn transition(&self, next: CallState) {
        let prev = self.state.replace(next);
        log::trace!("{} {}: {:?} -> {:?}", self.name, self.precision, prev, next);
    }

    /// Marks the call failed and hands `status` back.
    pub fn fail(&self, status: StatusCode) -> StatusCode {
        if self.state.get() != CallState::Failed {
            self.transition(CallState::Failed);
        }
        status
    }

    fn check(&self, result: BlasResult<()>) -> BlasResult<()> {
        result.map_err(|e| self.fail(e))
    }

    /// Tuned parameter `key`. A missing key is a configuration error.
    /// A tuning parameter by name; missing or zero values fail the call.
    pub fn param(&self, key: &str) -> BlasResult<usize> {
        match self.parameters.get(key) {
            Some(0) => {
                log::error!("{} {}: tuning parameter {key} is zero", self.name, self.precision);
                Err(self.fail(StatusCode::InvalidKernel))
            }
            Some(value) => Ok(value),
            None => {
                log::error!("{} {}: missing tuning parameter {key}", self.name, self.precision);
                Err(self.fail(StatusCode::InvalidKernel))
            }
        }
    }

    pub fn test_vector<T: Element>(
        &self,
        n: usize,
        buffer: &Buffer<T, B>,
        offset: usize,
        inc: usize,
        operand: Operand,
    ) -> BlasResult<()> {
        let elem = T::PRECISION.element_size();
        self.check(validation::validate_vector(n, buffer.size_bytes(), offset, inc, elem, operand))
    }

    pub fn test_matrix<T: Element>(
        &self,
        one: usize,
        two: usize,
        buffer: &Buffer<T, B>,
        offset: usize,
        ld: usize,
        operand: Operand,
    ) -> BlasResult<()> {
        let elem = T::PRECISION.element_size();
        self.check(validation::validate_matrix(one, two, buffer.size_bytes(), offset, ld, elem, operand))
    }

    pub fn test_matrix_packed<T: Element>(
        &self,
        n: usize,
        buffer: &Buffer<T, B>,
        offset: usize,
        operand: Operand,
    ) -> BlasResult<()> {
        let elem = T::PRECISION.element_size();
        self.check(validation::validate_matrix_packed(n, buffer.size_bytes(), offset, elem, operand))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn test_matrix_banded<T: Element>(
        &self,
        m: usize,
        n: usize,
        kl: usize,
        ku: usize,
        buffer: &Buffer<T, B>,
        offset: usize,
        ld: usize,
        operand: Operand,
    ) -> BlasResult<()> {
        let elem = T::PRECISION.element_size();
        self.check(validation::validate_matrix_banded(
            m,
            n,
            kl,
            ku,
            buffer.size_bytes(),
            offset,
            ld,
            elem,
            operand,
        ))
    }

    pub fn test_scalar<T: Element>(&self, buffer: &Buffer<T, B>, offset: usize, operand: Operand) -> BlasResult<()> {
        let elem = T::PRECISION.element_size();
        self.check(validation::validate_scalar(buffer.size_bytes(), offset, elem, operand))
    }

    /// Called once every argument check has passed. Later stages re-running
    /// shared validation leave the state alone.
    pub fn validated(&self) {
        if self.state.get() == CallState::ParametersResolved {
            self.transition(CallState::Validated);
        }
    }

    /// Header injected in front of the backend source: precision, routine
    /// marker and every tuned parameter as a compile-time constant.
    pub fn source_header(&self) -> String {
        let mut header = String::new();
        let _ = writeln!(header, "#define PRECISION {}", self.precision.define_value());
        let _ = writeln!(header, "#define ROUTINE_{}", self.name.to_ascii_uppercase());
        for (key, value) in self.parameters.iter() {
            let _ = writeln!(header, "#define {key} {value}");
        }
        header
    }

    /// Compiled program of this routine, shared through the context's cache.
    pub fn program(&self) -> BlasResult<Arc<B::Program>> {
        if let Some(program) = self.program.get() {
            return Ok(Arc::clone(program));
        }
        let backend = self.backend();
        let body = self.guarded("program source lookup", || backend.program_source(self.program_name))?;
        let source = format!("{}{}", self.source_header(), body);
        let key = ProgramKey {
            device: backend.device_key(),
            routine: self.name.to_string(),
            precision: self.precision,
            parameters: self.parameters.clone(),
            source_hash: source_hash(&source),
        };
        let program = self
            .context
            .cache()
            .get_or_compile(&key, || {
                panic::catch_unwind(AssertUnwindSafe(|| backend.compile(&source))).unwrap_or_else(|payload| {
                    Err(RuntimeError::Compile(format!("backend panicked: {}", panic_message(payload.as_ref()))))
                })
            })
            .map_err(|e| {
                log::error!("{} {}: compilation failed: {e}", self.name, self.precision);
                self.fail(StatusCode::InvalidKernel)
            })?;
        let _ = self.program.set(Arc::clone(&program));
        self.transition(CallState::ProgramReady);
        Ok(program)
    }

    pub fn kernel(&self, name: &str) -> BlasResult<B::Kernel> {
        let program = self.program()?;
        self.guarded("kernel creation", || self.backend().create_kernel(&program, name))
    }

    /// Enqueues `kernel` and returns its completion event.
    pub fn run_kernel(
        &self,
        kernel: &B::Kernel,
        args: &[KernelArg<'_, B>],
        global: &[usize],
        local: &[usize],
        wait_for: &[B::Event],
    ) -> BlasResult<B::Event> {
        log::trace!("{} {}: launch global={global:?} local={local:?}", self.name, self.precision);
        let event = self.guarded("kernel launch", || {
            self.backend().enqueue_kernel(kernel, args, global, local, wait_for)
        })?;
        self.launched();
        Ok(event)
    }

    /// Enqueues an element copy between two buffers of this precision.
    pub fn copy_buffer(
        &self,
        src: &B::Memory,
        src_offset: usize,
        dst: &B::Memory,
        dst_offset: usize,
        len: usize,
        wait_for: &[B::Event],
    ) -> BlasResult<B::Event> {
        let event = self.guarded("buffer copy", || {
            self.backend().enqueue_copy(src, src_offset, dst, dst_offset, len, wait_for)
        })?;
        self.launched();
        Ok(event)
    }

    /// Scratch buffer living for the rest of the call.
    pub fn temp_buffer<T: Element>(&self, len: usize) -> BlasResult<Buffer<T, B>> {
        self.guarded("temporary allocation", || Buffer::allocate(self.backend(), len))
    }

    /// Marks the call completed and returns the final event.
    pub fn complete(&self, event: B::Event) -> BlasResult<B::Event> {
        self.transition(CallState::Completed);
        Ok(event)
    }

    fn launched(&self) {
        let count = match self.state.get() {
            CallState::Launched(k) => k + 1,
            _ => 1,
        };
        self.transition(CallState::Launched(count));
    }

    fn guarded<T>(&self, what: &str, f: impl FnOnce() -> RuntimeResult<T>) -> BlasResult<T> {
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                log::error!("{} {}: {what} failed: {e}", self.name, self.precision);
                Err(self.fail(StatusCode::InvalidKernel))
            }
            Err(payload) => {
                log::error!(
                    "{} {}: {what} panicked: {}",
                    self.name,
                    self.precision,
                    panic_message(payload.as_ref())
                );
                Err(self.fail(StatusCode::InvalidKernel))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Rounds `x` up to a multiple of `y`.
#[inline]
pub fn ceil(x: usize, y: usize) -> usize {
    ceil_div(x, y).saturating_mul(y)
}

/// Zero when `y` is zero; the backend rejects the resulting empty range.
#[inline]
pub fn ceil_div(x: usize, y: usize) -> usize {
    if y == 0 {
        0
    } else {
        x.div_ceil(y)
    }
}

#[inline]
pub fn is_multiple(x: usize, y: usize) -> bool {
    y != 0 && x % y == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostBackend;

    fn context() -> Context<HostBackend> {
        Context::new(HostBackend::new()).unwrap()
    }

    #[test]
    fn test_construction_resolves_parameters() {
        let ctx = context();
        let r = Routine::new(&ctx, "Xaxpy", "level1/xaxpy", &["Xaxpy"], Precision::Single).unwrap();
        assert_eq!(r.state(), CallState::ParametersResolved);
        assert_eq!(r.param("WGS"), Ok(128));
        assert_eq!(r.param("NOPE"), Err(StatusCode::InvalidKernel));
        assert_eq!(r.state(), CallState::Failed);
    }

    #[test]
    fn test_unknown_family_and_precision() {
        let ctx = context();
        assert_eq!(
            Routine::new(&ctx, "Xfoo", "level1/xfoo", &["Xfoo"], Precision::Single).err(),
            Some(StatusCode::NotImplemented)
        );
        assert_eq!(
            Routine::new(&ctx, "Xdot", "level1/xdot", &["Xdot"], Precision::Half).err(),
            Some(StatusCode::InvalidPrecision)
        );
    }

    #[test]
    fn test_source_header_is_sorted() {
        let ctx = context();
        let r = Routine::new(&ctx, "Xdot", "level1/xdot", &["Xdot"], Precision::Double).unwrap();
        assert_eq!(
            r.source_header(),
            "#define PRECISION 64\n#define ROUTINE_XDOT\n#define WGS1 128\n#define WGS2 32\n"
        );
    }

    #[test]
    fn test_program_is_cached_per_context() {
        let ctx = context();
        let a = Routine::new(&ctx, "Xaxpy", "level1/xaxpy", &["Xaxpy"], Precision::Single).unwrap();
        a.program().unwrap();
        assert_eq!(a.state(), CallState::ProgramReady);
        let b = Routine::new(&ctx, "Xaxpy", "level1/xaxpy", &["Xaxpy"], Precision::Single).unwrap();
        b.program().unwrap();
        assert_eq!(ctx.cache().len(), 1);
        assert_eq!(ctx.backend().compilations(), 1);
    }

    #[test]
    fn test_missing_source_is_invalid_kernel() {
        let ctx = context();
        let r = Routine::new(&ctx, "Xaxpy", "level1/missing", &["Xaxpy"], Precision::Single).unwrap();
        assert_eq!(r.program().err(), Some(StatusCode::InvalidKernel));
        assert_eq!(r.state(), CallState::Failed);
    }

    #[test]
    fn test_ceil_helpers() {
        assert_eq!(ceil(10, 4), 12);
        assert_eq!(ceil(8, 4), 8);
        assert_eq!(ceil_div(1, 64), 1);
        assert!(is_multiple(256, 64));
        assert!(!is_multiple(4, 0));
        assert_eq!(ceil_div(10, 0), 0);
        assert_eq!(ceil(10, 0), 0);
        assert_eq!(ceil(usize::MAX, 64), usize::MAX);
    }

    #[test]
    fn test_zero_parameter_is_invalid_kernel() {
        let ctx = context();
        let mut r = Routine::new(&ctx, "Xaxpy", "level1/xaxpy", &["Xaxpy"], Precision::Single).unwrap();
        r.parameters.insert("WPT", 0);
        assert_eq!(r.param("WGS"), Ok(128));
        assert_eq!(r.param("WPT"), Err(StatusCode::InvalidKernel));
        assert_eq!(r.state(), CallState::Failed);
    }
}
