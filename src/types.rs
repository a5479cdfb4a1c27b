//! Element precisions and BLAS argument enums shared by the database, the
//! routines and the backends.

use std::fmt;

use half::f16;
use num_complex::{Complex32, Complex64};
use serde::{Deserialize, Serialize};

/// Numeric element type tag.
///
/// Serialized in the tuning tables as `half`, `single`, `double`,
/// `complex_single` and `complex_double`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    Half,
    Single,
    Double,
    ComplexSingle,
    ComplexDouble,
}

impl Precision {
    pub const ALL: [Precision; 5] = [
        Precision::Half,
        Precision::Single,
        Precision::Double,
        Precision::ComplexSingle,
        Precision::ComplexDouble,
    ];

    /// Value of the `PRECISION` define injected into kernel sources.
    #[inline]
    pub const fn define_value(self) -> u32 {
        match self {
            Precision::Half => 16,
            Precision::Single => 32,
            Precision::Double => 64,
            Precision::ComplexSingle => 3232,
            Precision::ComplexDouble => 6464,
        }
    }

    /// Inverse of [`Precision::define_value`].
    pub const fn from_define_value(v: u32) -> Option<Self> {
        match v {
            16 => Some(Precision::Half),
            32 => Some(Precision::Single),
            64 => Some(Precision::Double),
            3232 => Some(Precision::ComplexSingle),
            6464 => Some(Precision::ComplexDouble),
            _ => None,
        }
    }

    /// Size of one element in bytes.
    #[inline]
    pub const fn element_size(self) -> usize {
        match self {
            Precision::Half => 2,
            Precision::Single => 4,
            Precision::Double => 8,
            Precision::ComplexSingle => 8,
            Precision::ComplexDouble => 16,
        }
    }

    #[inline]
    pub const fn is_complex(self) -> bool {
        matches!(self, Precision::ComplexSingle | Precision::ComplexDouble)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Precision::Half => "half",
            Precision::Single => "single",
            Precision::Double => "double",
            Precision::ComplexSingle => "complex_single",
            Precision::ComplexDouble => "complex_double",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A scalar coefficient passed by value to a kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Half(f16),
    Single(f32),
    Double(f64),
    ComplexSingle(Complex32),
    ComplexDouble(Complex64),
}

impl Scalar {
    pub const fn precision(&self) -> Precision {
        match self {
            Scalar::Half(_) => Precision::Half,
            Scalar::Single(_) => Precision::Single,
            Scalar::Double(_) => Precision::Double,
            Scalar::ComplexSingle(_) => Precision::ComplexSingle,
            Scalar::ComplexDouble(_) => Precision::ComplexDouble,
        }
    }
}

/// Element types the routines are generic over.
///
/// `PRECISION` replaces per-type specialization: a routine reads it once at
/// construction and keeps the resulting [`Precision`] for the rest of the call.
pub trait Element: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Real counterpart (`f32` for `Complex32`, `Self` for real types).
    type Real: Element<Real = Self::Real>;

    const PRECISION: Precision;

    fn zero() -> Self;
    fn one() -> Self;
    fn from_real(r: Self::Real) -> Self;
    fn to_scalar(self) -> Scalar;
    fn from_scalar(s: Scalar) -> Option<Self>;
}

impl Element for f16 {
    type Real = f16;
    const PRECISION: Precision = Precision::Half;

    #[inline]
    fn zero() -> Self { f16::ZERO }
    #[inline]
    fn one() -> Self { f16::ONE }
    #[inline]
    fn from_real(r: f16) -> Self { r }
    #[inline]
    fn to_scalar(self) -> Scalar { Scalar::Half(self) }
    #[inline]
    fn from_scalar(s: Scalar) -> Option<Self> {
        match s { Scalar::Half(v) => Some(v), _ => None }
    }
}

impl Element for f32 {
    type Real = f32;
    const PRECISION: Precision = Precision::Single;

    #[inline]
    fn zero() -> Self { 0.0 }
    #[inline]
    fn one() -> Self { 1.0 }
    #[inline]
    fn from_real(r: f32) -> Self { r }
    #[inline]
    fn to_scalar(self) -> Scalar { Scalar::Single(self) }
    #[inline]
    fn from_scalar(s: Scalar) -> Option<Self> {
        match s { Scalar::Single(v) => Some(v), _ => None }
    }
}

impl Element for f64 {
    type Real = f64;
    const PRECISION: Precision = Precision::Double;

    #[inline]
    fn zero() -> Self { 0.0 }
    #[inline]
    fn one() -> Self { 1.0 }
    #[inline]
    fn from_real(r: f64) -> Self { r }
    #[inline]
    fn to_scalar(self) -> Scalar { Scalar::Double(self) }
    #[inline]
    fn from_scalar(s: Scalar) -> Option<Self> {
        match s { Scalar::Double(v) => Some(v), _ => None }
    }
}

impl Element for Complex32 {
    type Real = f32;
    const PRECISION: Precision = Precision::ComplexSingle;

    #[inline]
    fn zero() -> Self { Complex32::new(0.0, 0.0) }
    #[inline]
    fn one() -> Self { Complex32::new(1.0, 0.0) }
    #[inline]
    fn from_real(r: f32) -> Self { Complex32::new(r, 0.0) }
    #[inline]
    fn to_scalar(self) -> Scalar { Scalar::ComplexSingle(self) }
    #[inline]
    fn from_scalar(s: Scalar) -> Option<Self> {
        match s { Scalar::ComplexSingle(v) => Some(v), _ => None }
    }
}

impl Element for Complex64 {
    type Real = f64;
    const PRECISION: Precision = Precision::ComplexDouble;

    #[inline]
    fn zero() -> Self { Complex64::new(0.0, 0.0) }
    #[inline]
    fn one() -> Self { Complex64::new(1.0, 0.0) }
    #[inline]
    fn from_real(r: f64) -> Self { Complex64::new(r, 0.0) }
    #[inline]
    fn to_scalar(self) -> Scalar { Scalar::ComplexDouble(self) }
    #[inline]
    fn from_scalar(s: Scalar) -> Option<Self> {
        match s { Scalar::ComplexDouble(v) => Some(v), _ => None }
    }
}

/// Storage order of a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    RowMajor,
    ColMajor,
}

/// Operation applied to a matrix operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transpose {
    No,
    Yes,
    Conjugate,
}

/// Which triangle of a triangular/symmetric matrix is referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Triangle {
    Upper,
    Lower,
}

/// Whether the diagonal of a triangular matrix is implicitly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Diagonal {
    NonUnit,
    Unit,
}
