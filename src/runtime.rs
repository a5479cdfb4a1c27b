//! Device runtime seam.
//!
//! Routines never talk to a device API directly. They go through [`Backend`],
//! which supplies device properties, memory, program compilation and an
//! asynchronous command queue with explicit wait lists.

use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;

use thiserror::Error;

use crate::database::DeviceType;
use crate::types::{Element, Precision, Scalar};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("program build failed: {0}")]
    Compile(String),
    #[error("no program source named {0}")]
    SourceNotFound(String),
    #[error("kernel {0} not found in program")]
    KernelNotFound(String),
    #[error("allocation of {len} {precision} elements failed")]
    Allocation { precision: Precision, len: usize },
    #[error("invalid launch geometry: {0}")]
    InvalidGeometry(String),
    #[error("invalid kernel argument: {0}")]
    InvalidArgument(String),
    #[error("command failed: {0}")]
    Execution(String),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Maps the vendor strings devices report onto the names used in the tuning
/// tables. Unknown vendors are returned trimmed but otherwise unchanged.
pub fn normalize_vendor(raw: &str) -> String {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    let canonical = if lower.starts_with("advanced micro devices") || lower == "amd" {
        "AMD"
    } else if lower.starts_with("nvidia") {
        "NVIDIA"
    } else if lower.starts_with("intel") || lower == "genuineintel" {
        "Intel"
    } else if lower.starts_with("arm") {
        "ARM"
    } else if lower.starts_with("apple") {
        "Apple"
    } else if lower.starts_with("qualcomm") {
        "QUALCOMM"
    } else {
        return trimmed.to_string();
    };
    canonical.to_string()
}

/// Properties of the device a backend drives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceInfo {
    pub device_type: DeviceType,
    /// Normalized vendor name.
    pub vendor: String,
    pub name: String,
    pub max_work_group_size: usize,
}

impl DeviceInfo {
    pub fn new(device_type: DeviceType, vendor: &str, name: &str, max_work_group_size: usize) -> Self {
        DeviceInfo {
            device_type,
            vendor: normalize_vendor(vendor),
            name: name.trim().to_string(),
            max_work_group_size,
        }
    }

    pub fn key(&self) -> DeviceKey {
        DeviceKey {
            device_type: self.device_type,
            vendor: self.vendor.clone(),
            name: self.name.clone(),
        }
    }
}

/// Identity of a device inside a program cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceKey {
    pub device_type: DeviceType,
    pub vendor: String,
    pub name: String,
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{}/{}", self.device_type, self.vendor, self.name)
    }
}

/// One kernel argument.
pub enum KernelArg<'a, B: Backend + ?Sized> {
    Int(i64),
    Scalar(Scalar),
    Memory(&'a B::Memory),
}

impl<B: Backend + ?Sized> Clone for KernelArg<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: Backend + ?Sized> Copy for KernelArg<'_, B> {}

impl<B: Backend + ?Sized> fmt::Debug for KernelArg<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelArg::Int(v) => write!(f, "Int({v})"),
            KernelArg::Scalar(s) => write!(f, "Scalar({s:?})"),
            KernelArg::Memory(_) => f.write_str("Memory"),
        }
    }
}

impl<B: Backend + ?Sized> KernelArg<'_, B> {
    /// Values past `i64::MAX` become -1, which no size argument accepts.
    pub fn usize(v: usize) -> Self {
        KernelArg::Int(i64::try_from(v).unwrap_or(-1))
    }

    pub fn isize(v: isize) -> Self {
        KernelArg::Int(i64::try_from(v).unwrap_or(if v < 0 { i64::MIN } else { i64::MAX }))
    }

    pub fn flag(v: bool) -> Self {
        KernelArg::Int(i64::from(v))
    }
}

/// Device runtime used by the routines.
///
/// Enqueue operations are asynchronous: they return an event that completes
/// once the command and everything in its wait list has run.
pub trait Backend: Send + Sync {
    type Memory: Send + Sync;
    type Program: Send + Sync;
    type Kernel;
    type Event: Clone + Send + Sync;

    fn device(&self) -> &DeviceInfo;

    fn device_key(&self) -> DeviceKey {
        self.device().key()
    }

    /// Allocates `len` elements of `precision`.
    fn allocate(&self, precision: Precision, len: usize) -> RuntimeResult<Self::Memory>;

    /// Size of `memory` in bytes.
    fn memory_size(&self, memory: &Self::Memory) -> usize;

    /// Kernel source text of the named program.
    fn program_source(&self, program: &str) -> RuntimeResult<Cow<'static, str>>;

    fn compile(&self, source: &str) -> RuntimeResult<Self::Program>;

    fn create_kernel(&self, program: &Self::Program, name: &str) -> RuntimeResult<Self::Kernel>;

    fn enqueue_kernel(
        &self,
        kernel: &Self::Kernel,
        args: &[KernelArg<'_, Self>],
        global: &[usize],
        local: &[usize],
        wait_for: &[Self::Event],
    ) -> RuntimeResult<Self::Event>;

    /// Copies `len` elements; offsets are in elements.
    fn enqueue_copy(
        &self,
        src: &Self::Memory,
        src_offset: usize,
        dst: &Self::Memory,
        dst_offset: usize,
        len: usize,
        wait_for: &[Self::Event],
    ) -> RuntimeResult<Self::Event>;

    /// Blocks until `event` has completed.
    fn wait(&self, event: &Self::Event) -> RuntimeResult<()>;

    /// Blocks until every enqueued command has completed.
    fn finish(&self) -> RuntimeResult<()>;
}

/// Typed device buffer. The caller owns it; routines only borrow it.
pub struct Buffer<T: Element, B: Backend> {
    memory: B::Memory,
    len: usize,
    _elem: PhantomData<T>,
}

impl<T: Element, B: Backend> Buffer<T, B> {
    pub fn allocate(backend: &B, len: usize) -> RuntimeResult<Self> {
        let memory = backend.allocate(T::PRECISION, len)?;
        Ok(Buffer { memory, len, _elem: PhantomData })
    }

    /// Wraps memory that already holds `T` elements.
    pub fn from_memory(backend: &B, memory: B::Memory) -> Self {
        let len = backend.memory_size(&memory) / T::PRECISION.element_size();
        Buffer { memory, len, _elem: PhantomData }
    }

    #[inline]
    pub fn memory(&self) -> &B::Memory {
        &self.memory
    }

    /// Length in elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn size_bytes(&self) -> usize {
        self.len * T::PRECISION.element_size()
    }

    pub fn into_memory(self) -> B::Memory {
        self.memory
    }
}

impl<T: Element, B: Backend> fmt::Debug for Buffer<T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("precision", &T::PRECISION)
            .field("len", &self.len)
            .finish()
    }
}
