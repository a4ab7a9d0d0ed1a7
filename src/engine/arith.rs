// Fixed-Width Arithmetic
// Two's-complement wrap/truncate helpers at parameterized bit widths.

/// Reduces `value` modulo `2^width` and reinterprets the low `width` bits
/// as a signed two's-complement quantity.
///
/// This is the single arithmetic primitive the datapath is allowed to use
/// for width semantics: registers in the modeled hardware are exactly
/// `width` bits wide, so every assignment to one must pass through here.
/// `width` of 64 degenerates to the host integer.
pub fn wrap_signed(value: i64, width: u32) -> i64 {
    debug_assert!((1..=64).contains(&width));
    if width == 64 {
        return value;
    }
    let masked = (value as u64) & (u64::MAX >> (64 - width));
    if masked >> (width - 1) & 1 != 0 {
        (masked | (u64::MAX << width)) as i64
    } else {
        masked as i64
    }
}

/// One multiply-accumulate step of the dot product:
/// `acc' = wrap(acc + pixel * weight)` at the accumulator width.
///
/// The product itself never overflows the host integer (operands are at
/// most 32-bit quantities), but the running sum wraps at `acc_width` on
/// every step, exactly as an `acc_width`-bit register would.
pub fn mac_step(acc: i64, pixel: i64, weight: i64, acc_width: u32) -> i64 {
    wrap_signed(acc.wrapping_add(pixel.wrapping_mul(weight)), acc_width)
}

/// ReLU with output truncation: negative accumulators clamp to zero,
/// non-negative ones keep only their low `data_width` bits. Truncation is
/// bit-level, so a large positive accumulator can come out negative once
/// its high-order magnitude bits are dropped.
pub fn relu_truncate(acc: i64, data_width: u32) -> i64 {
    if acc < 0 {
        0
    } else {
        wrap_signed(acc, data_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_passes_in_range_values() {
        assert_eq!(wrap_signed(7, 4), 7);
        assert_eq!(wrap_signed(-8, 4), -8);
        assert_eq!(wrap_signed(0, 1), 0);
        assert_eq!(wrap_signed(-1, 1), -1);
    }

    #[test]
    fn wrap_folds_out_of_range_values() {
        assert_eq!(wrap_signed(8, 4), -8);
        assert_eq!(wrap_signed(9, 4), -7);
        assert_eq!(wrap_signed(16, 4), 0);
        assert_eq!(wrap_signed(-9, 4), 7);
        assert_eq!(wrap_signed(200, 8), -56);
        // 2^63 - 1 is all ones in the low 63 bits.
        assert_eq!(wrap_signed(i64::MAX, 63), -1);
    }

    #[test]
    fn wrap_width_64_is_identity() {
        assert_eq!(wrap_signed(i64::MAX, 64), i64::MAX);
        assert_eq!(wrap_signed(i64::MIN, 64), i64::MIN);
    }

    #[test]
    fn mac_wraps_every_step() {
        // Four products of 9 at a 4-bit accumulator: 9 -> -7 -> 2 -> -5 -> 4.
        let mut acc = 0;
        for _ in 0..4 {
            acc = mac_step(acc, 3, 3, 4);
        }
        assert_eq!(acc, 4);
        // Same result as a single wrap of the true sum (modular arithmetic).
        assert_eq!(acc, wrap_signed(36, 4));
    }

    #[test]
    fn relu_clamps_and_truncates() {
        assert_eq!(relu_truncate(-1, 8), 0);
        assert_eq!(relu_truncate(-128, 8), 0);
        assert_eq!(relu_truncate(100, 8), 100);
        // 200 keeps its low 8 bits and turns negative.
        assert_eq!(relu_truncate(200, 8), -56);
        assert_eq!(relu_truncate(256, 8), 0);
    }
}
