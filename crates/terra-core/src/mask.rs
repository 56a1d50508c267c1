//! Masked pixel algebra (§4.9): a validity channel `v ∈ {0, MAX}` riding
//! alongside a base pixel's color channels, plus the unary/binary/in-place
//! wrappers that propagate it.
//!
//! The algebra here is expressed over a pixel's validity scalar directly
//! rather than over a `MaskedPixel<P, N>` generic type, since every call
//! site already has the validity channel decoded as a `ChannelValue` (it's
//! the trailing storage slot `convert`/view sampling reads independently of
//! the color channels).

use crate::channel::{max_channel_value, zero_channel_value, ChannelKind, ChannelValue};
use crate::error::Result;

/// `true` iff `validity` equals its kind's max value. Mirrors `is_opaque`,
/// which is defined identically in §4.9.
pub fn is_valid(validity: ChannelValue) -> Result<bool> {
    let max = max_channel_value(validity.kind())?;
    Ok(validity.as_f64_raw() == max.as_f64_raw())
}

pub fn is_opaque(validity: ChannelValue) -> Result<bool> {
    is_valid(validity)
}

/// The fully-valid sentinel for `kind` — what a freshly-masked pixel (or a
/// non-masked source gaining a mask channel via `add_alpha`-style promotion)
/// gets.
pub fn valid_sentinel(kind: ChannelKind) -> Result<ChannelValue> {
    max_channel_value(kind)
}

pub fn invalid_sentinel(kind: ChannelKind) -> ChannelValue {
    zero_channel_value(kind)
}

pub fn validate(kind: ChannelKind) -> Result<ChannelValue> {
    valid_sentinel(kind)
}

pub fn invalidate(kind: ChannelKind) -> ChannelValue {
    invalid_sentinel(kind)
}

/// Flips a validity scalar between its valid and invalid sentinel.
pub fn toggle(validity: ChannelValue) -> Result<ChannelValue> {
    Ok(if is_valid(validity)? {
        invalid_sentinel(validity.kind())
    } else {
        valid_sentinel(validity.kind())?
    })
}

/// Unary elementwise wrapper: the validity channel passes through
/// unchanged; only the caller's per-channel color operation varies.
pub fn unary_result_validity(operand_validity: ChannelValue) -> ChannelValue {
    operand_validity
}

/// Binary elementwise wrapper: result validity is the AND of both operands'.
pub fn binary_result_validity(a: ChannelValue, b: ChannelValue) -> Result<ChannelValue> {
    let valid = is_valid(a)? && is_valid(b)?;
    Ok(if valid { valid_sentinel(a.kind())? } else { invalid_sentinel(a.kind()) })
}

/// In-place binary wrapper (`arg1 ∘= arg2`): `arg1` becomes invalid if
/// `arg2` is invalid; otherwise `arg1`'s validity is unchanged.
pub fn in_place_binary_result_validity(arg1_validity: ChannelValue, arg2_validity: ChannelValue) -> Result<ChannelValue> {
    if is_valid(arg2_validity)? {
        Ok(arg1_validity)
    } else {
        Ok(invalid_sentinel(arg1_validity.kind()))
    }
}

/// Strips the validity channel, returning the underlying base pixel's color
/// channels (§4.9 `remove_mask`). In this representation the validity
/// channel already lives in its own trailing storage slot, separate from
/// `color_channels`, so there is nothing to split off here — this is a
/// pass-through kept for parity with the spec's enumerated operation list.
pub fn remove_mask(color_channels: &[ChannelValue]) -> &[ChannelValue] {
    color_channels
}

/// Safe quotient over masked scalars: if the divisor's base value is zero,
/// the quotient's base is zero (not NaN/inf); validity is still the AND of
/// both operands' validity.
pub fn safe_quotient_validity(
    divisor_base_is_zero: bool,
    dividend_validity: ChannelValue,
    divisor_validity: ChannelValue,
) -> Result<(bool, ChannelValue)> {
    let validity = binary_result_validity(dividend_validity, divisor_validity)?;
    Ok((divisor_base_is_zero, validity))
}
