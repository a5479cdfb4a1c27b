//! Status codes returned by every routine.

use std::fmt;

use thiserror::Error;

/// Routine argument a validation status refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    A,
    B,
    X,
    Y,
    Ap,
    Dot,
    Nrm2,
    Asum,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operand::A => "A",
            Operand::B => "B",
            Operand::X => "x",
            Operand::Y => "y",
            Operand::Ap => "AP",
            Operand::Dot => "dot",
            Operand::Nrm2 => "nrm2",
            Operand::Asum => "asum",
        };
        f.write_str(name)
    }
}

/// Failure outcome of a routine call. Success is `Ok`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    #[error("invalid dimension: sizes must be greater than zero")]
    InvalidDimension,
    #[error("invalid increment for {0}: must be nonzero")]
    InvalidIncrement(Operand),
    #[error("invalid leading dimension for {0}")]
    InvalidLeadDimension(Operand),
    #[error("insufficient memory in buffer {0}")]
    InsufficientMemory(Operand),
    #[error("kernel compilation, creation or launch failed")]
    InvalidKernel,
    #[error("routine or kernel family not implemented")]
    NotImplemented,
    #[error("precision not supported by this routine")]
    InvalidPrecision,
}

impl StatusCode {
    /// Stable numeric code of the status.
    pub const fn code(self) -> i32 {
        match self {
            StatusCode::InvalidKernel => -48,
            StatusCode::NotImplemented => -1024,
            StatusCode::InvalidDimension => -1017,
            StatusCode::InvalidLeadDimension(Operand::B) => -1015,
            StatusCode::InvalidLeadDimension(_) => -1016,
            StatusCode::InvalidIncrement(Operand::Y) => -1012,
            StatusCode::InvalidIncrement(_) => -1013,
            StatusCode::InsufficientMemory(Operand::A) => -1011,
            StatusCode::InsufficientMemory(Operand::Ap) => -1011,
            StatusCode::InsufficientMemory(Operand::B) => -1010,
            StatusCode::InsufficientMemory(Operand::X) => -1008,
            StatusCode::InsufficientMemory(Operand::Y) => -1007,
            StatusCode::InsufficientMemory(Operand::Dot) => -2050,
            StatusCode::InsufficientMemory(Operand::Nrm2) => -2050,
            StatusCode::InsufficientMemory(Operand::Asum) => -2050,
            StatusCode::InvalidPrecision => -2045,
        }
    }
}

pub type BlasResult<T> = Result<T, StatusCode>;
