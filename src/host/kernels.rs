//! Reference implementations of every kernel the routines launch.
//!
//! Each kernel reads its arguments in launch order, checks that the launch
//! geometry covers the problem the way the device kernel would need it to,
//! and computes the result on the host. Inputs are snapshotted before any
//! output is written, so aliased buffers behave like separate reads and
//! writes.

use rayon::prelude::*;

use super::element::HostElement;
use super::{HostKernel, HostMemory};
use crate::runtime::{RuntimeError, RuntimeResult};
use crate::types::{Precision, Scalar};
use half::f16;
use num_complex::{Complex32, Complex64};

/// Owned kernel argument, kept alive until the command runs.
#[derive(Debug, Clone)]
pub(crate) enum HostArg {
    Int(i64),
    Scalar(Scalar),
    Memory(HostMemory),
}

struct Args<'a> {
    kernel: &'a str,
    args: &'a [HostArg],
    next: usize,
}

impl<'a> Args<'a> {
    fn new(kernel: &'a str, args: &'a [HostArg]) -> Self {
        Args { kernel, args, next: 0 }
    }

    fn take(&mut self) -> RuntimeResult<&'a HostArg> {
        let arg = self.args.get(self.next).ok_or_else(|| {
            RuntimeError::InvalidArgument(format!("{}: missing argument {}", self.kernel, self.next))
        })?;
        self.next += 1;
        Ok(arg)
    }

    fn mismatch(&self, expected: &str) -> RuntimeError {
        RuntimeError::InvalidArgument(format!("{}: argument {} is not {expected}", self.kernel, self.next - 1))
    }

    fn usize(&mut self) -> RuntimeResult<usize> {
        match self.take()? {
            HostArg::Int(v) => usize::try_from(*v).map_err(|_| self.mismatch("a non-negative integer")),
            _ => Err(self.mismatch("an integer")),
        }
    }

    fn flag(&mut self) -> RuntimeResult<bool> {
        Ok(self.usize()? != 0)
    }

    fn scalar<T: HostElement>(&mut self) -> RuntimeResult<T> {
        match self.take()? {
            HostArg::Scalar(s) => T::from_scalar(*s).ok_or_else(|| self.mismatch("a scalar of the program precision")),
            _ => Err(self.mismatch("a scalar")),
        }
    }

    fn memory(&mut self) -> RuntimeResult<&'a HostMemory> {
        match self.take()? {
            HostArg::Memory(m) => Ok(m),
            _ => Err(self.mismatch("a buffer")),
        }
    }

    fn done(&self) -> RuntimeResult<()> {
        if self.next == self.args.len() {
            Ok(())
        } else {
            Err(RuntimeError::InvalidArgument(format!(
                "{}: expected {} arguments, got {}",
                self.kernel,
                self.next,
                self.args.len()
            )))
        }
    }
}

/// Geometry of one launch plus access to the program's defines.
struct Launch<'a> {
    kernel: &'a HostKernel,
    global: &'a [usize],
    local: &'a [usize],
}

impl Launch<'_> {
    fn param(&self, key: &str) -> RuntimeResult<usize> {
        self.kernel.program.param(key)
    }

    fn require(&self, ok: bool, what: impl FnOnce() -> String) -> RuntimeResult<()> {
        if ok {
            Ok(())
        } else {
            Err(RuntimeError::Execution(format!("{}: {}", self.kernel.name, what())))
        }
    }

    /// Dimension `dim` of the global size, times `per_item`, reaches `n`.
    fn covers(&self, dim: usize, per_item: usize, n: usize) -> RuntimeResult<()> {
        let have = self.global.get(dim).copied().unwrap_or(0) * per_item;
        self.require(have >= n, || format!("global size covers {have} of {n} elements in dimension {dim}"))
    }

    fn global0(&self) -> usize {
        self.global.first().copied().unwrap_or(0)
    }

    fn local0(&self) -> usize {
        self.local.first().copied().unwrap_or(0)
    }
}

#[inline]
fn at<T: Copy>(data: &[T], i: usize) -> RuntimeResult<T> {
    data.get(i)
        .copied()
        .ok_or_else(|| RuntimeError::Execution(format!("read index {i} out of bounds ({})", data.len())))
}

#[inline]
fn put<T>(data: &mut [T], i: usize, value: T) -> RuntimeResult<()> {
    let len = data.len();
    let slot = data
        .get_mut(i)
        .ok_or_else(|| RuntimeError::Execution(format!("write index {i} out of bounds ({len})")))?;
    *slot = value;
    Ok(())
}

/// Runs `kernel` with the element type of its program.
pub(crate) fn execute(kernel: &HostKernel, args: &[HostArg], global: &[usize], local: &[usize]) -> RuntimeResult<()> {
    let launch = Launch { kernel, global, local };
    match kernel.program.precision {
        Precision::Half => run::<f16>(&launch, args),
        Precision::Single => run::<f32>(&launch, args),
        Precision::Double => run::<f64>(&launch, args),
        Precision::ComplexSingle => run::<Complex32>(&launch, args),
        Precision::ComplexDouble => run::<Complex64>(&launch, args),
    }
}

fn run<T: HostElement>(launch: &Launch<'_>, args: &[HostArg]) -> RuntimeResult<()> {
    let name = launch.kernel.name.as_str();
    let mut a = Args::new(name, args);
    match name {
        "Xcopy" | "XcopyFast" | "Xswap" | "XswapFast" => pairwise::<T>(launch, &mut a),
        "Xscal" | "XscalFast" => scal::<T>(launch, &mut a),
        "Xaxpy" | "XaxpyFast" => axpy::<T>(launch, &mut a),
        "Xrot" | "XrotFast" => rot::<T>(launch, &mut a),
        "Xdot" => dot_main::<T>(launch, &mut a),
        "Xnrm2" | "Xasum" => norm_main::<T>(launch, &mut a),
        "XdotEpilogue" | "Xnrm2Epilogue" | "XasumEpilogue" => epilogue::<T>(launch, &mut a),
        "Xgemv" | "XgemvFast" | "XgemvFastRot" => gemv::<T>(launch, &mut a),
        "Xtpsv" => tpsv::<T>(launch, &mut a),
        "Xger" => ger::<T>(launch, &mut a),
        "Xher" => her::<T>(launch, &mut a),
        "CopyMatrixFast" => copy_matrix_fast::<T>(launch, &mut a),
        "CopyMatrix" => copy_matrix::<T>(launch, &mut a),
        other => Err(RuntimeError::KernelNotFound(other.to_string())),
    }?;
    a.done()
}

// ── Level 1 ──

/// A strided vector argument.
struct Strided<'a> {
    mem: &'a HostMemory,
    offset: usize,
    inc: usize,
}

impl Strided<'_> {
    #[inline]
    fn index(&self, i: usize) -> usize {
        self.offset + i * self.inc
    }
}

/// Reads `n` plus either `(buffer)` or `(buffer, offset, inc)` per vector,
/// depending on whether the kernel is a fast variant.
fn vector<'a>(launch: &Launch<'_>, a: &mut Args<'a>) -> RuntimeResult<Strided<'a>> {
    let mem = a.memory()?;
    if launch.kernel.name.ends_with("Fast") {
        Ok(Strided { mem, offset: 0, inc: 1 })
    } else {
        Ok(Strided { mem, offset: a.usize()?, inc: a.usize()? })
    }
}

fn elementwise_coverage(launch: &Launch<'_>, n: usize) -> RuntimeResult<()> {
    let wpt = launch.param("WPT")?;
    if launch.kernel.name.ends_with("Fast") {
        let vw = launch.param("VW")?;
        let handled = launch.global0() * wpt * vw;
        launch.require(handled == n, || format!("fast launch handles {handled} elements, n = {n}"))
    } else {
        launch.covers(0, wpt, n)
    }
}

fn pairwise<T: HostElement>(launch: &Launch<'_>, a: &mut Args<'_>) -> RuntimeResult<()> {
    let n = a.usize()?;
    let x = vector(launch, a)?;
    let y = vector(launch, a)?;
    elementwise_coverage(launch, n)?;

    let xs = x.mem.snapshot::<T>()?;
    let ys = y.mem.snapshot::<T>()?;
    let swap = launch.kernel.name.starts_with("Xswap");
    if swap {
        x.mem.update::<T, _>(|xd| (0..n).try_for_each(|i| put(xd, x.index(i), at(&ys, y.index(i))?)))?;
    }
    y.mem.update::<T, _>(|yd| (0..n).try_for_each(|i| put(yd, y.index(i), at(&xs, x.index(i))?)))
}

fn scal<T: HostElement>(launch: &Launch<'_>, a: &mut Args<'_>) -> RuntimeResult<()> {
    let n = a.usize()?;
    let alpha = a.scalar::<T>()?;
    let x = vector(launch, a)?;
    elementwise_coverage(launch, n)?;
    x.mem.update::<T, _>(|xd| {
        (0..n).try_for_each(|i| {
            let idx = x.index(i);
            let value = alpha.mul(at(xd, idx)?);
            put(xd, idx, value)
        })
    })
}

fn axpy<T: HostElement>(launch: &Launch<'_>, a: &mut Args<'_>) -> RuntimeResult<()> {
    let n = a.usize()?;
    let alpha = a.scalar::<T>()?;
    let x = vector(launch, a)?;
    let y = vector(launch, a)?;
    elementwise_coverage(launch, n)?;

    let xs = x.mem.snapshot::<T>()?;
    y.mem.update::<T, _>(|yd| {
        (0..n).try_for_each(|i| {
            let idx = y.index(i);
            let value = alpha.mul(at(&xs, x.index(i))?).add(at(yd, idx)?);
            put(yd, idx, value)
        })
    })
}

/// Plane rotation of the pairs `(x_i, y_i)` by `(c, s)`.
fn rot<T: HostElement>(launch: &Launch<'_>, a: &mut Args<'_>) -> RuntimeResult<()> {
    let n = a.usize()?;
    let c = a.scalar::<T>()?;
    let s = a.scalar::<T>()?;
    let x = vector(launch, a)?;
    let y = vector(launch, a)?;
    elementwise_coverage(launch, n)?;

    let xs = x.mem.snapshot::<T>()?;
    let ys = y.mem.snapshot::<T>()?;
    let pairs: Vec<(T, T)> = (0..n)
        .map(|i| Ok((at(&xs, x.index(i))?, at(&ys, y.index(i))?)))
        .collect::<RuntimeResult<_>>()?;
    x.mem.update::<T, _>(|xd| {
        pairs.iter().enumerate().try_for_each(|(i, &(xv, yv))| put(xd, x.index(i), c.mul(xv).add(s.mul(yv))))
    })?;
    y.mem.update::<T, _>(|yd| {
        pairs.iter().enumerate().try_for_each(|(i, &(xv, yv))| put(yd, y.index(i), c.mul(yv).sub(s.mul(xv))))
    })
}

/// Work-group of the thread that handles element `i` in a grid-strided loop.
#[inline]
fn group_of(i: usize, global: usize, local: usize) -> usize {
    (i % global) / local
}

/// Number of work-groups in the main reduction stage, one partial each.
fn partial_groups(launch: &Launch<'_>, temp: &HostMemory) -> RuntimeResult<usize> {
    let groups = launch.global0() / launch.local0().max(1);
    let len = temp.len();
    launch.require(len >= groups, || format!("partials buffer holds {len} of {groups} groups"))?;
    Ok(groups)
}

fn dot_main<T: HostElement>(launch: &Launch<'_>, a: &mut Args<'_>) -> RuntimeResult<()> {
    let n = a.usize()?;
    let x = Strided { mem: a.memory()?, offset: a.usize()?, inc: a.usize()? };
    let y = Strided { mem: a.memory()?, offset: a.usize()?, inc: a.usize()? };
    let temp = a.memory()?;
    let conjugate = a.flag()?;
    let groups = partial_groups(launch, temp)?;

    let xs = x.mem.snapshot::<T>()?;
    let ys = y.mem.snapshot::<T>()?;
    let mut partials = vec![T::zero(); groups];
    for i in 0..n {
        let xv = at(&xs, x.index(i))?;
        let xv = if conjugate { xv.conj() } else { xv };
        let g = group_of(i, launch.global0(), launch.local0());
        partials[g] = partials[g].add(xv.mul(at(&ys, y.index(i))?));
    }
    temp.update::<T, _>(|t| {
        t[..groups].copy_from_slice(&partials);
        Ok(())
    })
}

fn norm_main<T: HostElement>(launch: &Launch<'_>, a: &mut Args<'_>) -> RuntimeResult<()> {
    let n = a.usize()?;
    let x = Strided { mem: a.memory()?, offset: a.usize()?, inc: a.usize()? };
    let temp = a.memory()?;
    let groups = partial_groups(launch, temp)?;
    let squares = launch.kernel.name == "Xnrm2";

    let xs = x.mem.snapshot::<T>()?;
    let mut partials = vec![0.0f64; groups];
    for i in 0..n {
        let v = at(&xs, x.index(i))?;
        let g = group_of(i, launch.global0(), launch.local0());
        partials[g] += if squares { v.norm_sqr() } else { v.abs_sum() };
    }
    temp.update::<T, _>(|t| {
        for (slot, p) in t.iter_mut().zip(partials) {
            *slot = T::from_f64(p);
        }
        Ok(())
    })
}

/// Second stage: one work-group folds `2 * local` partials into the result.
fn epilogue<T: HostElement>(launch: &Launch<'_>, a: &mut Args<'_>) -> RuntimeResult<()> {
    let temp = a.memory()?;
    let out = a.memory()?;
    let out_offset = a.usize()?;
    let local = launch.local0();
    launch.require(launch.global0() == local, || "epilogue must run as a single work-group".to_string())?;
    let needed = 2 * local;
    let have = temp.len();
    launch.require(have >= needed, || format!("partials buffer holds {have} of {needed} elements"))?;

    let partials = temp.snapshot::<T>()?;
    let value = if launch.kernel.name == "Xnrm2Epilogue" {
        T::from_f64(partials[..needed].iter().map(|p| p.real()).sum::<f64>().sqrt())
    } else {
        partials[..needed].iter().fold(T::zero(), |acc, p| acc.add(*p))
    };
    out.update::<T, _>(|o| put(o, out_offset, value))
}

// ── Level 2 ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    General,
    Triangular,
    TriangularBanded,
    TriangularPacked,
}

/// Element access into `A` as the mat-vec kernel sees it.
struct MatrixView {
    access: Access,
    rotated: bool,
    conjugate: bool,
    offset: usize,
    ld: usize,
    n: usize,
    upper: bool,
    unit: bool,
    kl: usize,
    ku: usize,
}

impl MatrixView {
    /// Element `(i, j)` of `op(A)`.
    fn get<T: HostElement>(&self, a: &[T], i: usize, j: usize) -> RuntimeResult<T> {
        let (r, c) = if self.rotated { (j, i) } else { (i, j) };
        let value = match self.access {
            Access::General => at(a, self.offset + r + c * self.ld)?,
            _ => {
                if (self.upper && r > c) || (!self.upper && r < c) {
                    return Ok(T::zero());
                }
                if self.unit && r == c {
                    return Ok(T::one());
                }
                match self.access {
                    Access::TriangularBanded => {
                        if r + self.ku < c || r > c + self.kl {
                            return Ok(T::zero());
                        }
                        at(a, self.offset + self.ku + r - c + c * self.ld)?
                    }
                    Access::TriangularPacked => at(a, self.offset + packed_index(self.upper, r, c, self.n))?,
                    _ => at(a, self.offset + r + c * self.ld)?,
                }
            }
        };
        Ok(if self.conjugate { value.conj() } else { value })
    }
}

/// Position of stored element `(r, c)` in column-major packed storage.
#[inline]
fn packed_index(upper: bool, r: usize, c: usize, n: usize) -> usize {
    if upper {
        c * (c + 1) / 2 + r
    } else {
        r - c + c * (2 * n - c + 1) / 2
    }
}

fn gemv<T: HostElement>(launch: &Launch<'_>, a: &mut Args<'_>) -> RuntimeResult<()> {
    let m = a.usize()?;
    let n = a.usize()?;
    let alpha = a.scalar::<T>()?;
    let beta = a.scalar::<T>()?;
    let rotated = a.flag()?;
    let a_mem = a.memory()?;
    let a_offset = a.usize()?;
    let a_ld = a.usize()?;
    let x = Strided { mem: a.memory()?, offset: a.usize()?, inc: a.usize()? };
    let y = Strided { mem: a.memory()?, offset: a.usize()?, inc: a.usize()? };
    let conjugate = a.flag()?;
    let parameter = a.usize()?;
    let kl = a.usize()?;
    let ku = a.usize()?;

    match launch.kernel.name.as_str() {
        "XgemvFast" => {
            let handled = launch.global0() * launch.param("WPT2")?;
            launch.require(handled == m && !rotated, || format!("fast launch handles {handled} rows, m = {m}"))?
        }
        "XgemvFastRot" => {
            let handled = launch.global0() * launch.param("WPT3")?;
            launch.require(handled == m && rotated, || format!("rotated launch handles {handled} rows, m = {m}"))?
        }
        _ => launch.covers(0, launch.param("WPT1")?, m)?,
    }

    let program = &launch.kernel.program;
    let access = if program.has_define("ROUTINE_XTBMV") {
        Access::TriangularBanded
    } else if program.has_define("ROUTINE_XTPMV") {
        Access::TriangularPacked
    } else if program.has_define("ROUTINE_XTRMV") {
        Access::Triangular
    } else {
        Access::General
    };
    let view = MatrixView {
        access,
        rotated,
        conjugate,
        offset: a_offset,
        ld: a_ld,
        n,
        upper: parameter & 1 == 1,
        unit: parameter & 2 == 2,
        kl,
        ku,
    };

    let am = a_mem.snapshot::<T>()?;
    let xs = x.mem.snapshot::<T>()?;
    let ys = y.mem.snapshot::<T>()?;
    let skip_y = beta == T::zero();
    let rows: Vec<T> = (0..m)
        .into_par_iter()
        .map(|i| {
            let mut acc = T::zero();
            for j in 0..n {
                acc = acc.add(view.get(&am, i, j)?.mul(at(&xs, x.index(j))?));
            }
            let scaled = alpha.mul(acc);
            if skip_y {
                Ok(scaled)
            } else {
                Ok(scaled.add(beta.mul(at(&ys, y.index(i))?)))
            }
        })
        .collect::<RuntimeResult<_>>()?;
    y.mem.update::<T, _>(|yd| rows.iter().enumerate().try_for_each(|(i, v)| put(yd, y.index(i), *v)))
}

/// Solves `op(A) * x = b` in place for packed triangular `A`. The whole solve
/// runs in one work-group since every element depends on the previous ones.
fn tpsv<T: HostElement>(launch: &Launch<'_>, a: &mut Args<'_>) -> RuntimeResult<()> {
    let n = a.usize()?;
    let a_mem = a.memory()?;
    let a_offset = a.usize()?;
    let x = Strided { mem: a.memory()?, offset: a.usize()?, inc: a.usize()? };
    let rotated = a.flag()?;
    let conjugate = a.flag()?;
    let parameter = a.usize()?;
    let local = launch.local0();
    launch.require(launch.global0() == local, || "triangular solve must run as a single work-group".to_string())?;
    let wgs = launch.param("WGS1")?;
    launch.require(local == wgs, || format!("work-group size {local}, WGS1 = {wgs}"))?;

    let view = MatrixView {
        access: Access::TriangularPacked,
        rotated,
        conjugate,
        offset: a_offset,
        ld: n,
        n,
        upper: parameter & 1 == 1,
        unit: parameter & 2 == 2,
        kl: 0,
        ku: 0,
    };
    // op(A) is upper triangular when exactly one of storage and rotation flips it
    let backward = view.upper != rotated;

    let am = a_mem.snapshot::<T>()?;
    let xs = x.mem.snapshot::<T>()?;
    let mut solution = (0..n).map(|i| at(&xs, x.index(i))).collect::<RuntimeResult<Vec<T>>>()?;
    for step in 0..n {
        let i = if backward { n - 1 - step } else { step };
        let known = if backward { i + 1..n } else { 0..i };
        let mut acc = solution[i];
        for j in known {
            acc = acc.sub(view.get(&am, i, j)?.mul(solution[j]));
        }
        solution[i] = acc.div(view.get(&am, i, i)?);
    }
    x.mem.update::<T, _>(|xd| solution.iter().enumerate().try_for_each(|(i, v)| put(xd, x.index(i), *v)))
}

fn ger<T: HostElement>(launch: &Launch<'_>, a: &mut Args<'_>) -> RuntimeResult<()> {
    let a_one = a.usize()?;
    let a_two = a.usize()?;
    let alpha = a.scalar::<T>()?;
    let x = Strided { mem: a.memory()?, offset: a.usize()?, inc: a.usize()? };
    let y = Strided { mem: a.memory()?, offset: a.usize()?, inc: a.usize()? };
    let a_mem = a.memory()?;
    let a_offset = a.usize()?;
    let a_ld = a.usize()?;
    let rowmajor = a.flag()?;
    let wpt = launch.param("WPT")?;
    launch.covers(0, wpt, a_one)?;
    launch.covers(1, wpt, a_two)?;

    let xs = x.mem.snapshot::<T>()?;
    let ys = y.mem.snapshot::<T>()?;
    a_mem.update::<T, _>(|ad| {
        for q in 0..a_two {
            for p in 0..a_one {
                let (i, j) = if rowmajor { (q, p) } else { (p, q) };
                let idx = a_offset + p + q * a_ld;
                let delta = alpha.mul(at(&xs, x.index(i))?).mul(at(&ys, y.index(j))?);
                let value = at(ad, idx)?.add(delta);
                put(ad, idx, value)?;
            }
        }
        Ok(())
    })
}

fn her<T: HostElement>(launch: &Launch<'_>, a: &mut Args<'_>) -> RuntimeResult<()> {
    let n = a.usize()?;
    let alpha = a.scalar::<T>()?;
    let x = Strided { mem: a.memory()?, offset: a.usize()?, inc: a.usize()? };
    let a_mem = a.memory()?;
    let a_offset = a.usize()?;
    let a_ld = a.usize()?;
    let upper = a.flag()?;
    let rowmajor = a.flag()?;
    let wpt = launch.param("WPT")?;
    launch.covers(0, wpt, n)?;
    launch.covers(1, wpt, n)?;

    let program = &launch.kernel.program;
    let packed = program.has_define("ROUTINE_XHPR") || program.has_define("ROUTINE_XSPR");
    let xs = x.mem.snapshot::<T>()?;
    a_mem.update::<T, _>(|ad| {
        for c in 0..n {
            let rows = if upper { 0..c + 1 } else { c..n };
            for r in rows {
                let (i, j) = if rowmajor { (c, r) } else { (r, c) };
                let delta = alpha.mul(at(&xs, x.index(i))?).mul(at(&xs, x.index(j))?.conj());
                let idx = if packed { a_offset + packed_index(upper, r, c, n) } else { a_offset + r + c * a_ld };
                let mut value = at(ad, idx)?.add(delta);
                if r == c {
                    value = value.real_part();
                }
                put(ad, idx, value)?;
            }
        }
        Ok(())
    })
}

// ── Matrix copies ──

fn copy_matrix_fast<T: HostElement>(launch: &Launch<'_>, a: &mut Args<'_>) -> RuntimeResult<()> {
    let ld = a.usize()?;
    let a_mem = a.memory()?;
    let b_mem = a.memory()?;
    let alpha = a.scalar::<T>()?;
    let one = launch.global0() * launch.param("COPY_VW")?;
    let two = launch.global.get(1).copied().unwrap_or(0) * launch.param("COPY_WPT")?;
    launch.require(one <= ld, || format!("tile width {one} exceeds leading dimension {ld}"))?;

    let src = a_mem.snapshot::<T>()?;
    b_mem.update::<T, _>(|b| {
        for q in 0..two {
            for p in 0..one {
                let idx = p + q * ld;
                put(b, idx, alpha.mul(at(&src, idx)?))?;
            }
        }
        Ok(())
    })
}

fn copy_matrix<T: HostElement>(launch: &Launch<'_>, a: &mut Args<'_>) -> RuntimeResult<()> {
    let _a_one = a.usize()?;
    let _a_two = a.usize()?;
    let a_ld = a.usize()?;
    let a_offset = a.usize()?;
    let a_mem = a.memory()?;
    let b_one = a.usize()?;
    let b_two = a.usize()?;
    let b_ld = a.usize()?;
    let b_offset = a.usize()?;
    let b_mem = a.memory()?;
    let alpha = a.scalar::<T>()?;
    let transpose = a.flag()?;
    let conjugate = a.flag()?;
    launch.covers(0, 1, b_one)?;
    launch.covers(1, launch.param("COPY_WPT")?, b_two)?;

    let src = a_mem.snapshot::<T>()?;
    b_mem.update::<T, _>(|b| {
        for q in 0..b_two {
            for p in 0..b_one {
                let from = if transpose { a_offset + q + p * a_ld } else { a_offset + p + q * a_ld };
                let v = at(&src, from)?;
                let v = if conjugate { v.conj() } else { v };
                put(b, b_offset + p + q * b_ld, alpha.mul(v))?;
            }
        }
        Ok(())
    })
}
