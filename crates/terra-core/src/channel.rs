//! Channel kinds and bit-exact per-element conversion.
//!
//! `ChannelKind` is the tagged variant from the data model; `ChannelValue` is
//! a runtime scalar carrying its kind, used as the dispatch key for
//! conversion the way the original's `(src_kind, dst_kind)` enum pair lookup
//! worked, but realized here as a single `match` rather than a populated
//! table, since the table in this rendition is a total, pure function.

use crate::error::{Error, Result};

/// The scalar numeric type of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    U8,
    U12,
    U14,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    /// Like `F32` but without the library's usual `[0, 1]` normalized-range
    /// assumption (e.g. HDR data carrying its own range). Storage-compatible
    /// with `F32`; see the rescale rules below for how it differs.
    F32Free,
    /// As `F32Free`, but double precision.
    F64Free,
    Unknown,
}

impl ChannelKind {
    /// Storage size in bytes, or `None` for `Unknown`.
    pub const fn byte_size(self) -> Option<usize> {
        use ChannelKind::*;
        match self {
            U8 | I8 => Some(1),
            U12 | U14 | U16 | I16 => Some(2),
            U32 | I32 | F32 | F32Free => Some(4),
            U64 | I64 | F64 | F64Free => Some(8),
            Unknown => None,
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self, ChannelKind::F32 | ChannelKind::F64 | ChannelKind::F32Free | ChannelKind::F64Free)
    }

    pub const fn is_integer(self) -> bool {
        use ChannelKind::*;
        matches!(self, U8 | U12 | U14 | U16 | U32 | U64 | I8 | I16 | I32 | I64)
    }

    pub const fn is_signed(self) -> bool {
        use ChannelKind::*;
        matches!(self, I8 | I16 | I32 | I64 | F32 | F64 | F32Free | F64Free)
    }

    /// Native max value of the underlying integer representation, or `None`
    /// for float kinds (whose max-for-rescale is always `1.0`) and `Unknown`.
    pub const fn max_int_value(self) -> Option<u64> {
        use ChannelKind::*;
        match self {
            U8 => Some(u8::MAX as u64),
            U12 => Some(4095),
            U14 => Some(16383),
            U16 => Some(u16::MAX as u64),
            U32 => Some(u32::MAX as u64),
            U64 => Some(u64::MAX),
            I8 => Some(i8::MAX as u64),
            I16 => Some(i16::MAX as u64),
            I32 => Some(i32::MAX as u64),
            I64 => Some(i64::MAX as u64),
            F32 | F64 | F32Free | F64Free | Unknown => None,
        }
    }

    /// "Max value for kind" per §4.1: native integer max, or `1.0` for floats.
    /// Used by `add_alpha` and integer/float rescale.
    pub fn max_value_for_kind(self) -> Result<f64> {
        if self.is_float() {
            Ok(1.0)
        } else {
            self.max_int_value()
                .map(|v| v as f64)
                .ok_or_else(|| Error::invalid_channel_type("Unknown channel kind has no max value"))
        }
    }

    /// Effective bit width, used only to drive the widening-shift rule in
    /// rescaled integer-to-integer conversion. Signed kinds use the bit
    /// width of their positive range; this is intentionally a coarse model
    /// since the spec's worked examples only exercise unsigned kinds.
    const fn bits(self) -> u32 {
        use ChannelKind::*;
        match self {
            U8 | I8 => 8,
            U12 => 12,
            U14 => 14,
            U16 | I16 => 16,
            U32 | I32 => 32,
            U64 | I64 => 64,
            F32 | F32Free => 32,
            F64 | F64Free => 64,
            Unknown => 0,
        }
    }
}

/// A runtime channel scalar tagged with its kind.
///
/// `U12`/`U14` are stored in a `u16`; their restricted range is enforced only
/// by the conversion functions below, not by the storage type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelValue {
    U8(u8),
    U12(u16),
    U14(u16),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    F32Free(f32),
    F64Free(f64),
}

impl ChannelValue {
    pub const fn kind(self) -> ChannelKind {
        match self {
            ChannelValue::U8(_) => ChannelKind::U8,
            ChannelValue::U12(_) => ChannelKind::U12,
            ChannelValue::U14(_) => ChannelKind::U14,
            ChannelValue::U16(_) => ChannelKind::U16,
            ChannelValue::U32(_) => ChannelKind::U32,
            ChannelValue::U64(_) => ChannelKind::U64,
            ChannelValue::I8(_) => ChannelKind::I8,
            ChannelValue::I16(_) => ChannelKind::I16,
            ChannelValue::I32(_) => ChannelKind::I32,
            ChannelValue::I64(_) => ChannelKind::I64,
            ChannelValue::F32(_) => ChannelKind::F32,
            ChannelValue::F64(_) => ChannelKind::F64,
            ChannelValue::F32Free(_) => ChannelKind::F32Free,
            ChannelValue::F64Free(_) => ChannelKind::F64Free,
        }
    }

    /// The value as `f64`, with no normalization — i.e. the same numeric
    /// value a C-style `(double) src` cast would produce.
    pub(crate) fn as_f64_raw(self) -> f64 {
        match self {
            ChannelValue::U8(v) => v as f64,
            ChannelValue::U12(v) | ChannelValue::U14(v) | ChannelValue::U16(v) => v as f64,
            ChannelValue::U32(v) => v as f64,
            ChannelValue::U64(v) => v as f64,
            ChannelValue::I8(v) => v as f64,
            ChannelValue::I16(v) => v as f64,
            ChannelValue::I32(v) => v as f64,
            ChannelValue::I64(v) => v as f64,
            ChannelValue::F32(v) | ChannelValue::F32Free(v) => v as f64,
            ChannelValue::F64(v) | ChannelValue::F64Free(v) => v,
        }
    }

    /// Decodes a little-endian scalar of `kind` from the front of `bytes`.
    pub fn read(kind: ChannelKind, bytes: &[u8]) -> Result<ChannelValue> {
        let size = kind
            .byte_size()
            .ok_or_else(|| Error::invalid_channel_type("Unknown channel kind has no byte size"))?;
        if bytes.len() < size {
            return Err(Error::invalid_config("buffer too short to decode a channel scalar"));
        }
        Ok(match kind {
            ChannelKind::U8 => ChannelValue::U8(bytes[0]),
            ChannelKind::U12 => ChannelValue::U12(u16::from_le_bytes([bytes[0], bytes[1]])),
            ChannelKind::U14 => ChannelValue::U14(u16::from_le_bytes([bytes[0], bytes[1]])),
            ChannelKind::U16 => ChannelValue::U16(u16::from_le_bytes([bytes[0], bytes[1]])),
            ChannelKind::U32 => ChannelValue::U32(u32::from_le_bytes(bytes[0..4].try_into().unwrap())),
            ChannelKind::U64 => ChannelValue::U64(u64::from_le_bytes(bytes[0..8].try_into().unwrap())),
            ChannelKind::I8 => ChannelValue::I8(bytes[0] as i8),
            ChannelKind::I16 => ChannelValue::I16(i16::from_le_bytes([bytes[0], bytes[1]])),
            ChannelKind::I32 => ChannelValue::I32(i32::from_le_bytes(bytes[0..4].try_into().unwrap())),
            ChannelKind::I64 => ChannelValue::I64(i64::from_le_bytes(bytes[0..8].try_into().unwrap())),
            ChannelKind::F32 => ChannelValue::F32(f32::from_le_bytes(bytes[0..4].try_into().unwrap())),
            ChannelKind::F64 => ChannelValue::F64(f64::from_le_bytes(bytes[0..8].try_into().unwrap())),
            ChannelKind::F32Free => ChannelValue::F32Free(f32::from_le_bytes(bytes[0..4].try_into().unwrap())),
            ChannelKind::F64Free => ChannelValue::F64Free(f64::from_le_bytes(bytes[0..8].try_into().unwrap())),
            ChannelKind::Unknown => unreachable!("Unknown has no byte_size, handled above"),
        })
    }

    /// Encodes this scalar little-endian into the front of `out`.
    pub fn write(self, out: &mut [u8]) -> Result<()> {
        let size = self
            .kind()
            .byte_size()
            .ok_or_else(|| Error::invalid_channel_type("Unknown channel kind has no byte size"))?;
        if out.len() < size {
            return Err(Error::invalid_config("buffer too short to encode a channel scalar"));
        }
        match self {
            ChannelValue::U8(v) => out[0] = v,
            ChannelValue::U12(v) | ChannelValue::U14(v) | ChannelValue::U16(v) => {
                out[0..2].copy_from_slice(&v.to_le_bytes())
            }
            ChannelValue::U32(v) => out[0..4].copy_from_slice(&v.to_le_bytes()),
            ChannelValue::U64(v) => out[0..8].copy_from_slice(&v.to_le_bytes()),
            ChannelValue::I8(v) => out[0] = v as u8,
            ChannelValue::I16(v) => out[0..2].copy_from_slice(&v.to_le_bytes()),
            ChannelValue::I32(v) => out[0..4].copy_from_slice(&v.to_le_bytes()),
            ChannelValue::I64(v) => out[0..8].copy_from_slice(&v.to_le_bytes()),
            ChannelValue::F32(v) | ChannelValue::F32Free(v) => out[0..4].copy_from_slice(&v.to_le_bytes()),
            ChannelValue::F64(v) | ChannelValue::F64Free(v) => out[0..8].copy_from_slice(&v.to_le_bytes()),
        }
        Ok(())
    }

    /// Constructs a value of `dst_kind` from a raw (non-normalized) `f64`,
    /// truncating toward zero for float-to-integer (matches a C-style cast).
    pub(crate) fn from_f64_raw(dst_kind: ChannelKind, v: f64) -> Self {
        use ChannelKind::*;
        match dst_kind {
            U8 => ChannelValue::U8(v.trunc() as u8),
            U12 => ChannelValue::U12((v.trunc() as i64).clamp(0, 4095) as u16),
            U14 => ChannelValue::U14((v.trunc() as i64).clamp(0, 16383) as u16),
            U16 => ChannelValue::U16(v.trunc() as u16),
            U32 => ChannelValue::U32(v.trunc() as u32),
            U64 => ChannelValue::U64(v.trunc() as u64),
            I8 => ChannelValue::I8(v.trunc() as i8),
            I16 => ChannelValue::I16(v.trunc() as i16),
            I32 => ChannelValue::I32(v.trunc() as i32),
            I64 => ChannelValue::I64(v.trunc() as i64),
            F32 => ChannelValue::F32(v as f32),
            F64 => ChannelValue::F64(v),
            F32Free => ChannelValue::F32Free(v as f32),
            F64Free => ChannelValue::F64Free(v),
            Unknown => unreachable!("Unknown is not a constructible channel kind"),
        }
    }
}

/// Converts one channel scalar to another kind, per the §4.1 rules.
///
/// `rescale = false`: plain numeric cast (`(DstT) src`), truncating toward
/// zero for float-to-integer.
///
/// `rescale = true`:
///   - integer -> integer: the 8<->16 pair uses the exact `65535/255 = 257`
///     ratio; every other pair is a truncating cast when narrowing (or
///     equal width) and a zero-filled left shift when widening.
///   - integer -> float: `dst = src / max_int(src_kind)`.
///   - float -> integer: clamp to `[0, 1]`, then `dst = round(src * max_int(dst_kind))`.
///   - float -> float: plain cast, never clamped (this differs intentionally
///     from float -> integer; see the Open Question decision in DESIGN.md).
pub fn convert_channel(src: ChannelValue, dst_kind: ChannelKind, rescale: bool) -> Result<ChannelValue> {
    let src_kind = src.kind();

    if src_kind == dst_kind {
        return Ok(src);
    }

    if !rescale {
        return Ok(ChannelValue::from_f64_raw(dst_kind, src.as_f64_raw()));
    }

    match (src_kind.is_float(), dst_kind.is_float()) {
        (false, false) => convert_int_to_int_rescale(src, dst_kind),
        (false, true) => convert_int_to_float_rescale(src, dst_kind),
        (true, false) => convert_float_to_int_rescale(src, dst_kind),
        (true, true) => Ok(ChannelValue::from_f64_raw(dst_kind, src.as_f64_raw())),
    }
}

/// The maximum representable value of `kind`, as a value of that kind: the
/// native integer max, or `1.0` for floats. Used for `add_alpha` and for the
/// masked-pixel validity sentinel (§4.9: `v ∈ {0, MAX}`).
pub fn max_channel_value(kind: ChannelKind) -> Result<ChannelValue> {
    let max = kind.max_value_for_kind()?;
    Ok(ChannelValue::from_f64_raw(kind, max))
}

/// The zero value of `kind`, used as the invalid-mask sentinel.
pub fn zero_channel_value(kind: ChannelKind) -> ChannelValue {
    ChannelValue::from_f64_raw(kind, 0.0)
}

fn convert_int_to_int_rescale(src: ChannelValue, dst_kind: ChannelKind) -> Result<ChannelValue> {
    let src_kind = src.kind();

    if let (ChannelKind::U16, ChannelKind::U8) = (src_kind, dst_kind) {
        let v = match src {
            ChannelValue::U16(v) => v,
            _ => unreachable!(),
        };
        return Ok(ChannelValue::U8((v / 257) as u8));
    }
    if let (ChannelKind::U8, ChannelKind::U16) = (src_kind, dst_kind) {
        let v = match src {
            ChannelValue::U8(v) => v,
            _ => unreachable!(),
        };
        return Ok(ChannelValue::U16((v as u16) * 257));
    }

    let src_bits = src_kind.bits();
    let dst_bits = dst_kind.bits();
    let raw = src.as_f64_raw();
    if dst_bits > src_bits {
        let shifted = (raw as i128) << (dst_bits - src_bits);
        Ok(ChannelValue::from_f64_raw(dst_kind, shifted as f64))
    } else {
        Ok(ChannelValue::from_f64_raw(dst_kind, raw))
    }
}

fn convert_int_to_float_rescale(src: ChannelValue, dst_kind: ChannelKind) -> Result<ChannelValue> {
    let src_max = src.kind().max_value_for_kind()?;
    let raw = src.as_f64_raw();
    Ok(ChannelValue::from_f64_raw(dst_kind, raw / src_max))
}

fn convert_float_to_int_rescale(src: ChannelValue, dst_kind: ChannelKind) -> Result<ChannelValue> {
    let dst_max = dst_kind.max_value_for_kind()?;
    let clamped = src.as_f64_raw().clamp(0.0, 1.0);
    Ok(ChannelValue::from_f64_raw(dst_kind, (clamped * dst_max).round()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn identity_without_rescale_is_plain_cast() {
        let v = convert_channel(ChannelValue::U8(200), ChannelKind::F32, false).unwrap();
        assert_eq!(v, ChannelValue::F32(200.0));
    }

    #[test]
    fn u16_to_u8_rescale_uses_257_ratio() {
        let v = convert_channel(ChannelValue::U16(32896), ChannelKind::U8, true).unwrap();
        assert_eq!(v, ChannelValue::U8(128));
    }

    #[test]
    fn u8_to_u16_rescale_uses_257_ratio() {
        let v = convert_channel(ChannelValue::U8(128), ChannelKind::U16, true).unwrap();
        assert_eq!(v, ChannelValue::U16(32896));
    }

    #[test]
    fn int_to_float_rescale_divides_by_max() {
        let v = convert_channel(ChannelValue::U8(255), ChannelKind::F32, true).unwrap();
        match v {
            ChannelValue::F32(f) => assert_abs_diff_eq!(f, 1.0, epsilon = 1e-6),
            _ => panic!("wrong kind"),
        }
    }

    #[test]
    fn float_to_int_rescale_clamps_negative_to_zero() {
        let v = convert_channel(ChannelValue::F32(-0.5), ChannelKind::U8, true).unwrap();
        assert_eq!(v, ChannelValue::U8(0));
    }

    #[test]
    fn float_to_int_rescale_clamps_above_one() {
        let v = convert_channel(ChannelValue::F32(2.0), ChannelKind::U8, true).unwrap();
        assert_eq!(v, ChannelValue::U8(255));
    }

    #[test]
    fn float_to_float_rescale_is_plain_cast_not_clamped() {
        let v = convert_channel(ChannelValue::F32(2.0), ChannelKind::F64, true).unwrap();
        assert_eq!(v, ChannelValue::F64(2.0));
    }

    #[test]
    fn same_kind_is_identity_regardless_of_rescale() {
        let v = convert_channel(ChannelValue::U16(1234), ChannelKind::U16, true).unwrap();
        assert_eq!(v, ChannelValue::U16(1234));
    }

    #[test]
    fn byte_encoding_round_trips() {
        let v = ChannelValue::U16(4660);
        let mut buf = [0u8; 2];
        v.write(&mut buf).unwrap();
        assert_eq!(ChannelValue::read(ChannelKind::U16, &buf).unwrap(), v);
    }

    #[test]
    fn round_trip_rescale_stays_within_quantization_step() {
        for x in [0u8, 1, 17, 128, 254, 255] {
            let up = convert_channel(ChannelValue::U8(x), ChannelKind::U16, true).unwrap();
            let back = convert_channel(up, ChannelKind::U8, true).unwrap();
            match back {
                ChannelValue::U8(v) => assert!((v as i32 - x as i32).abs() <= 1),
                _ => panic!("wrong kind"),
            }
        }
    }
}
