//! Fee estimation
//!
//! Simple size heuristic: a flat overhead plus per-input and per-output
//! costs. Not a byte-exact wire measurement, but stable and monotonic in
//! both dimensions, which is what the fee slider needs.

/// Size weights used by the estimator, in approximate bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    /// Fixed transaction overhead
    pub overhead: u64,
    /// Cost per input (note + spend + signature)
    pub per_input: u64,
    /// Cost per output (seed)
    pub per_output: u64,
}

impl FeeSchedule {
    pub const DEFAULT: FeeSchedule = FeeSchedule {
        overhead: 100,
        per_input: 200,
        per_output: 150,
    };
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Estimate the serialized size of a transaction with the given shape
pub fn estimate_transaction_size(
    schedule: &FeeSchedule,
    input_count: usize,
    output_count: usize,
) -> u64 {
    schedule.overhead
        + schedule.per_input * input_count as u64
        + schedule.per_output * output_count as u64
}

/// Recommended fee for a transaction shape at a given rate (nicks per byte)
pub fn calculate_recommended_fee(
    schedule: &FeeSchedule,
    input_count: usize,
    output_count: usize,
    fee_per_byte: u64,
) -> u64 {
    estimate_transaction_size(schedule, input_count, output_count) * fee_per_byte
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_matches_schedule() {
        let schedule = FeeSchedule::default();
        // 100 + 2*200 + 3*150
        assert_eq!(estimate_transaction_size(&schedule, 2, 3), 950);
    }

    #[test]
    fn test_estimate_monotonic() {
        let schedule = FeeSchedule::default();
        let base = estimate_transaction_size(&schedule, 1, 1);
        assert!(estimate_transaction_size(&schedule, 2, 1) > base);
        assert!(estimate_transaction_size(&schedule, 1, 2) > base);
    }

    #[test]
    fn test_recommended_fee_scales_with_rate() {
        let schedule = FeeSchedule::default();
        let low = calculate_recommended_fee(&schedule, 1, 2, 1);
        let high = calculate_recommended_fee(&schedule, 1, 2, 3);
        assert_eq!(high, low * 3);
    }
}
