//! gllm-blas: BLAS routine dispatch with a device tuning database.
//!
//! Every routine resolves its tuning parameters for the device behind a
//! [`Context`], validates its buffers, compiles (or reuses) a program
//! specialized for those parameters, and enqueues its kernels through the
//! [`Backend`] seam. The [`host`] backend runs the same kernels on the CPU.
//!
//! ```ignore
//! use gllm_blas::{api, host::HostBackend, Context};
//!
//! let ctx = Context::new(HostBackend::new())?;
//! let x = ctx.backend().upload(&[1.0f32, 2.0, 3.0]);
//! let y = ctx.backend().upload(&[1.0f32; 3]);
//! api::axpy(&ctx, 3, 2.0, &x, 0, 1, &y, 0, 1)?;
//! assert_eq!(ctx.backend().download(&y)?, vec![3.0, 5.0, 7.0]);
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod host;
pub mod routine;
pub mod routines;
pub mod runtime;
pub mod types;
pub mod validation;

pub use cache::{ProgramCache, ProgramKey};
pub use config::BlasConfig;
pub use context::Context;
pub use database::{Database, DatabaseError, DeviceType, ParameterSet};
pub use error::{BlasResult, Operand, StatusCode};
pub use routine::{CallState, Routine};
pub use runtime::{Backend, Buffer, DeviceInfo, DeviceKey, KernelArg, RuntimeError, RuntimeResult};
pub use types::{Diagonal, Element, Layout, Precision, Scalar, Transpose, Triangle};
