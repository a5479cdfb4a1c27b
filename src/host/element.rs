//! Host-side storage and arithmetic for every precision.

use half::f16;
use num_complex::{Complex32, Complex64};

use crate::types::{Element, Precision};

/// Contents of one host allocation.
#[derive(Debug, Clone, PartialEq)]
pub enum HostData {
    Half(Vec<f16>),
    Single(Vec<f32>),
    Double(Vec<f64>),
    ComplexSingle(Vec<Complex32>),
    ComplexDouble(Vec<Complex64>),
}

impl HostData {
    pub fn zeroed(precision: Precision, len: usize) -> Self {
        match precision {
            Precision::Half => HostData::Half(vec![f16::ZERO; len]),
            Precision::Single => HostData::Single(vec![0.0; len]),
            Precision::Double => HostData::Double(vec![0.0; len]),
            Precision::ComplexSingle => HostData::ComplexSingle(vec![Complex32::new(0.0, 0.0); len]),
            Precision::ComplexDouble => HostData::ComplexDouble(vec![Complex64::new(0.0, 0.0); len]),
        }
    }

    pub fn precision(&self) -> Precision {
        match self {
            HostData::Half(_) => Precision::Half,
            HostData::Single(_) => Precision::Single,
            HostData::Double(_) => Precision::Double,
            HostData::ComplexSingle(_) => Precision::ComplexSingle,
            HostData::ComplexDouble(_) => Precision::ComplexDouble,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            HostData::Half(v) => v.len(),
            HostData::Single(v) => v.len(),
            HostData::Double(v) => v.len(),
            HostData::ComplexSingle(v) => v.len(),
            HostData::ComplexDouble(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies `len` elements from `src[src_offset..]` into `self[dst_offset..]`.
    /// Returns `false` on a precision mismatch or an out-of-range span.
    pub fn copy_from(&mut self, dst_offset: usize, src: &HostData, src_offset: usize, len: usize) -> bool {
        fn span<T: Copy>(dst: &mut [T], d: usize, src: &[T], s: usize, len: usize) -> bool {
            match (dst.get_mut(d..d + len), src.get(s..s + len)) {
                (Some(to), Some(from)) => {
                    to.copy_from_slice(from);
                    true
                }
                _ => false,
            }
        }
        match (self, src) {
            (HostData::Half(d), HostData::Half(s)) => span(d, dst_offset, s, src_offset, len),
            (HostData::Single(d), HostData::Single(s)) => span(d, dst_offset, s, src_offset, len),
            (HostData::Double(d), HostData::Double(s)) => span(d, dst_offset, s, src_offset, len),
            (HostData::ComplexSingle(d), HostData::ComplexSingle(s)) => span(d, dst_offset, s, src_offset, len),
            (HostData::ComplexDouble(d), HostData::ComplexDouble(s)) => span(d, dst_offset, s, src_offset, len),
            _ => false,
        }
    }
}

/// Arithmetic the reference kernels need, plus typed access to [`HostData`].
pub trait HostElement: Element {
    fn add(self, rhs: Self) -> Self;
    fn sub(self, rhs: Self) -> Self;
    fn mul(self, rhs: Self) -> Self;
    fn div(self, rhs: Self) -> Self;
    fn conj(self) -> Self;
    /// `|re| + |im|`
    fn abs_sum(self) -> f64;
    fn norm_sqr(self) -> f64;
    fn real(self) -> f64;
    /// Drops the imaginary part.
    fn real_part(self) -> Self;
    fn from_f64(v: f64) -> Self;

    fn view(data: &HostData) -> Option<&[Self]>;
    fn view_mut(data: &mut HostData) -> Option<&mut [Self]>;
    fn into_data(values: Vec<Self>) -> HostData;
}

macro_rules! host_data_access {
    ($variant:ident) => {
        fn view(data: &HostData) -> Option<&[Self]> {
            match data {
                HostData::$variant(v) => Some(v),
                _ => None,
            }
        }

        fn view_mut(data: &mut HostData) -> Option<&mut [Self]> {
            match data {
                HostData::$variant(v) => Some(v),
                _ => None,
            }
        }

        fn into_data(values: Vec<Self>) -> HostData {
            HostData::$variant(values)
        }
    };
}

macro_rules! host_real {
    ($t:ty, $variant:ident) => {
        impl HostElement for $t {
            #[inline]
            fn add(self, rhs: Self) -> Self { self + rhs }
            #[inline]
            fn sub(self, rhs: Self) -> Self { self - rhs }
            #[inline]
            fn mul(self, rhs: Self) -> Self { self * rhs }
            #[inline]
            fn div(self, rhs: Self) -> Self { self / rhs }
            #[inline]
            fn conj(self) -> Self { self }
            #[inline]
            fn abs_sum(self) -> f64 { f64::from(self).abs() }
            #[inline]
            fn norm_sqr(self) -> f64 { let v = f64::from(self); v * v }
            #[inline]
            fn real(self) -> f64 { f64::from(self) }
            #[inline]
            fn real_part(self) -> Self { self }
            #[inline]
            fn from_f64(v: f64) -> Self { v as $t }

            host_data_access!($variant);
        }
    };
}

macro_rules! host_complex {
    ($t:ty, $r:ty, $variant:ident) => {
        impl HostElement for $t {
            #[inline]
            fn add(self, rhs: Self) -> Self { self + rhs }
            #[inline]
            fn sub(self, rhs: Self) -> Self { self - rhs }
            #[inline]
            fn mul(self, rhs: Self) -> Self { self * rhs }
            #[inline]
            fn div(self, rhs: Self) -> Self { self / rhs }
            #[inline]
            fn conj(self) -> Self { <$t>::conj(&self) }
            #[inline]
            fn abs_sum(self) -> f64 { f64::from(self.re).abs() + f64::from(self.im).abs() }
            #[inline]
            fn norm_sqr(self) -> f64 { f64::from(<$t>::norm_sqr(&self)) }
            #[inline]
            fn real(self) -> f64 { f64::from(self.re) }
            #[inline]
            fn real_part(self) -> Self { <$t>::new(self.re, 0.0) }
            #[inline]
            fn from_f64(v: f64) -> Self { <$t>::new(v as $r, 0.0) }

            host_data_access!($variant);
        }
    };
}

host_real!(f32, Single);
host_real!(f64, Double);
host_complex!(Complex32, f32, ComplexSingle);
host_complex!(Complex64, f64, ComplexDouble);

// f16 arithmetic rounds through f32 after every operation.
impl HostElement for f16 {
    #[inline]
    fn add(self, rhs: Self) -> Self {
        f16::from_f32(self.to_f32() + rhs.to_f32())
    }
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        f16::from_f32(self.to_f32() - rhs.to_f32())
    }
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        f16::from_f32(self.to_f32() * rhs.to_f32())
    }
    #[inline]
    fn div(self, rhs: Self) -> Self {
        f16::from_f32(self.to_f32() / rhs.to_f32())
    }
    #[inline]
    fn conj(self) -> Self {
        self
    }
    #[inline]
    fn abs_sum(self) -> f64 {
        self.to_f64().abs()
    }
    #[inline]
    fn norm_sqr(self) -> f64 {
        let v = self.to_f64();
        v * v
    }
    #[inline]
    fn real(self) -> f64 {
        self.to_f64()
    }
    #[inline]
    fn real_part(self) -> Self {
        self
    }
    #[inline]
    fn from_f64(v: f64) -> Self {
        f16::from_f64(v)
    }

    host_data_access!(Half);
}
