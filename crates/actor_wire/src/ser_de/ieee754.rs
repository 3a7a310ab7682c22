//! Canonical IEEE-754 bit patterns for floating point values.
//!
//! Floats never reach the wire in their in-memory form. They are converted to
//! an unsigned integer of matching width first, which is then written like any
//! other integer. NaN payloads are collapsed to one quiet NaN so that equal
//! encodings do not depend on where the NaN came from.

use super::consts::{CANONICAL_NAN_F32, CANONICAL_NAN_F64};

/// Conversion between a float and its canonical IEEE-754 bit pattern.
pub trait Ieee754: Copy {
    /// Unsigned integer of the same width.
    type Packed: Copy;

    fn pack754(self) -> Self::Packed;

    fn unpack754(packed: Self::Packed) -> Self;
}

impl Ieee754 for f32 {
    type Packed = u32;

    fn pack754(self) -> u32 {
        match self.is_nan() {
            true => CANONICAL_NAN_F32,
            false => self.to_bits(),
        }
    }

    fn unpack754(packed: u32) -> Self {
        f32::from_bits(packed)
    }
}

impl Ieee754 for f64 {
    type Packed = u64;

    fn pack754(self) -> u64 {
        match self.is_nan() {
            true => CANONICAL_NAN_F64,
            false => self.to_bits(),
        }
    }

    fn unpack754(packed: u64) -> Self {
        f64::from_bits(packed)
    }
}

/// Pack a float into its canonical bit pattern.
pub fn pack754<F: Ieee754>(value: F) -> F::Packed {
    value.pack754()
}

/// Restore a float from its canonical bit pattern.
pub fn unpack754<F: Ieee754>(packed: F::Packed) -> F {
    F::unpack754(packed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_f32() {
        let f1 = 3.1415925_f32;
        let p1 = pack754(f1);
        assert_eq!(p1, 0x40490FDA);
        assert_eq!(unpack754::<f32>(p1), f1);
    }

    #[test]
    fn test_pack_f64() {
        #[allow(clippy::excessive_precision)]
        let f2 = 3.14159265358979311600_f64;
        let p2 = pack754(f2);
        assert_eq!(p2, 0x400921FB54442D18);
        assert_eq!(unpack754::<f64>(p2), f2);
    }

    #[test]
    fn test_signed_zero_and_extremes() {
        for x in [0.0_f64, -0.0, f64::MIN, f64::MAX, f64::MIN_POSITIVE, f64::INFINITY] {
            let back = unpack754::<f64>(pack754(x));
            assert_eq!(back.to_bits(), x.to_bits());
        }

        // subnormal
        let tiny = f32::from_bits(1);
        assert_eq!(unpack754::<f32>(pack754(tiny)).to_bits(), 1);
    }

    #[test]
    fn test_nan_is_canonical() {
        let odd_nan = f64::from_bits(0x7FF0_0000_0000_0001);
        assert!(odd_nan.is_nan());
        assert_eq!(pack754(odd_nan), CANONICAL_NAN_F64);
        assert_eq!(pack754(-f32::NAN), CANONICAL_NAN_F32);
        assert!(unpack754::<f32>(CANONICAL_NAN_F32).is_nan());
    }
}
