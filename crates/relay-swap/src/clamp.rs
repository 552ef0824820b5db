//! The amount safety clamp (invariant I4): downstream AMM SDK code may
//! convert amounts to a floating-point integer and silently lose precision
//! past `2^53 - 1`; this relay clamps before ever handing an amount to a
//! pool-type-specific builder.

pub const MAX_SAFE_AMOUNT: u64 = (1u64 << 53) - 1;

pub struct ClampedAmount {
    pub amount: u64,
    pub was_clamped: bool,
}

/// Converts to a big-integer domain first (`u128`), then clamps, so no
/// arithmetic before the clamp can itself lose information.
pub fn clamp_amount(amount_in: u128) -> ClampedAmount {
    if amount_in > MAX_SAFE_AMOUNT as u128 {
        tracing::warn!(
            requested = %amount_in,
            clamped_to = MAX_SAFE_AMOUNT,
            "swap amount exceeds 2^53-1, clamping"
        );
        ClampedAmount {
            amount: MAX_SAFE_AMOUNT,
            was_clamped: true,
        }
    } else {
        ClampedAmount {
            amount: amount_in as u64,
            was_clamped: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_amounts_above_2_53() {
        let clamped = clamp_amount(1u128 << 60);
        assert_eq!(clamped.amount, MAX_SAFE_AMOUNT);
        assert!(clamped.was_clamped);
    }

    #[test]
    fn passes_through_small_amounts() {
        let clamped = clamp_amount(10_000_000);
        assert_eq!(clamped.amount, 10_000_000);
        assert!(!clamped.was_clamped);
    }
}
