//! Buffer and argument validation shared by all routines.
//!
//! Every check runs on the host before any device work is issued. Sizes are
//! given in bytes for the buffer and in elements for everything else, so the
//! checks stay independent of the element type.
//!
//! - dimensions are checked first: a zero size is `InvalidDimension` whatever
//!   the other arguments are
//! - overflowing size computations count as insufficient memory

use crate::error::{BlasResult, Operand, StatusCode};

#[inline]
fn require_bytes(elements: Option<usize>, elem_size: usize, buffer_bytes: usize, operand: Operand) -> BlasResult<()> {
    match elements.and_then(|e| e.checked_mul(elem_size)) {
        Some(required) if required <= buffer_bytes => Ok(()),
        _ => Err(StatusCode::InsufficientMemory(operand)),
    }
}

/// Vector of `n` elements read with stride `inc` from `offset`.
///
/// The buffer must hold `offset + (n - 1) * inc + 1` elements.
#[inline]
pub fn validate_vector(
    n: usize,
    buffer_bytes: usize,
    offset: usize,
    inc: usize,
    elem_size: usize,
    operand: Operand,
) -> BlasResult<()> {
    if n == 0 {
        return Err(StatusCode::InvalidDimension);
    }
    if inc == 0 {
        return Err(StatusCode::InvalidIncrement(operand));
    }
    let required = (n - 1)
        .checked_mul(inc)
        .and_then(|v| v.checked_add(offset))
        .and_then(|v| v.checked_add(1));
    require_bytes(required, elem_size, buffer_bytes, operand)
}

/// Dense matrix stored as `two` runs of `one` contiguous elements spaced `ld`
/// apart.
#[inline]
pub fn validate_matrix(
    one: usize,
    two: usize,
    buffer_bytes: usize,
    offset: usize,
    ld: usize,
    elem_size: usize,
    operand: Operand,
) -> BlasResult<()> {
    if one == 0 || two == 0 {
        return Err(StatusCode::InvalidDimension);
    }
    if ld < one {
        return Err(StatusCode::InvalidLeadDimension(operand));
    }
    let required = ld
        .checked_mul(two - 1)
        .and_then(|v| v.checked_add(one))
        .and_then(|v| v.checked_add(offset));
    require_bytes(required, elem_size, buffer_bytes, operand)
}

/// Packed triangular matrix of order `n`: `n * (n + 1) / 2` elements.
#[inline]
pub fn validate_matrix_packed(
    n: usize,
    buffer_bytes: usize,
    offset: usize,
    elem_size: usize,
    operand: Operand,
) -> BlasResult<()> {
    if n == 0 {
        return Err(StatusCode::InvalidDimension);
    }
    // halve the even factor first so large orders do not overflow early
    let elements = n.checked_add(1).and_then(|next| {
        if n % 2 == 0 {
            (n / 2).checked_mul(next)
        } else {
            n.checked_mul(next / 2)
        }
    });
    let required = elements.and_then(|v| v.checked_add(offset));
    require_bytes(required, elem_size, buffer_bytes, operand)
}

/// Banded matrix with `n` columns of `ld` elements holding `kl` sub- and `ku`
/// super-diagonals.
#[inline]
#[allow(clippy::too_many_arguments)]
pub fn validate_matrix_banded(
    m: usize,
    n: usize,
    kl: usize,
    ku: usize,
    buffer_bytes: usize,
    offset: usize,
    ld: usize,
    elem_size: usize,
    operand: Operand,
) -> BlasResult<()> {
    if m == 0 || n == 0 {
        return Err(StatusCode::InvalidDimension);
    }
    let band = kl.checked_add(ku).and_then(|v| v.checked_add(1));
    if band.map_or(true, |b| ld < b) {
        return Err(StatusCode::InvalidLeadDimension(operand));
    }
    let required = ld.checked_mul(n).and_then(|v| v.checked_add(offset));
    require_bytes(required, elem_size, buffer_bytes, operand)
}

/// Single result element at `offset`.
#[inline]
pub fn validate_scalar(buffer_bytes: usize, offset: usize, elem_size: usize, operand: Operand) -> BlasResult<()> {
    require_bytes(offset.checked_add(1), elem_size, buffer_bytes, operand)
}
