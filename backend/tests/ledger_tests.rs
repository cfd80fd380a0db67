//! Device number ledger tests
//!
//! Tests for the per-line-item allocation counters:
//! - reservations carve contiguous ranges above the high-water mark
//! - releases return units to stock without reusing issued numbers
//! - the movement log replays to the stored counters

use chrono::Utc;
use proptest::prelude::*;
use uuid::Uuid;

use shared::{
    find_overlaps, fold_movements, issued_ranges, IssuedRange, LineItemState, MovementKind,
    StockError, StockMovement,
};

/// Helper to build a movement log entry
fn movement(kind: MovementKind, quantity: i32, range: Option<(i32, i32)>) -> StockMovement {
    StockMovement {
        id: Uuid::new_v4(),
        bill_item_id: Uuid::new_v4(),
        allocation_id: Some(Uuid::new_v4()),
        kind,
        quantity,
        start_number: range.map(|(start, _)| start),
        end_number: range.map(|(_, end)| end),
        created_at: Utc::now(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Test fresh line item counters
    #[test]
    fn test_new_state_starts_empty() {
        let state = LineItemState::new(10);

        assert_eq!(state.quantity, 10);
        assert_eq!(state.allocated_quantity, 0);
        assert_eq!(state.last_allocated_number, 0);
        assert_eq!(state.available_quantity(), 10);
    }

    /// Test first reservation issues numbers from 1
    #[test]
    fn test_first_reserve_starts_at_one() {
        let state = LineItemState::new(10);
        let (state, range) = state.reserve(4).unwrap();

        assert_eq!(range, IssuedRange::new(1, 4));
        assert_eq!(range.quantity(), 4);
        assert_eq!(state.allocated_quantity, 4);
        assert_eq!(state.last_allocated_number, 4);
        assert_eq!(state.available_quantity(), 6);
    }

    /// Test successive reservations continue above the high-water mark
    #[test]
    fn test_reserve_continues_above_high_water() {
        let state = LineItemState::new(10);
        let (state, first) = state.reserve(4).unwrap();
        let (state, second) = state.reserve(6).unwrap();

        assert_eq!(first, IssuedRange::new(1, 4));
        assert_eq!(second, IssuedRange::new(5, 10));
        assert_eq!(state.allocated_quantity, 10);
        assert_eq!(state.available_quantity(), 0);
    }

    /// Test reservation quantity must be at least 1
    #[test]
    fn test_reserve_rejects_non_positive_quantity() {
        let state = LineItemState::new(10);

        assert_eq!(
            state.reserve(0),
            Err(StockError::InvalidQuantity { requested: 0 })
        );
        assert_eq!(
            state.reserve(-3),
            Err(StockError::InvalidQuantity { requested: -3 })
        );
    }

    /// Test reservation fails when stock is short
    #[test]
    fn test_reserve_rejects_over_available() {
        let state = LineItemState::new(10);
        let (state, _) = state.reserve(4).unwrap();

        assert_eq!(
            state.reserve(7),
            Err(StockError::Insufficient {
                requested: 7,
                available: 6,
            })
        );
    }

    /// Test a failed reservation leaves the counters untouched
    #[test]
    fn test_failed_reserve_changes_nothing() {
        let state = LineItemState::new(5);
        let (state, _) = state.reserve(3).unwrap();

        let before = state;
        assert!(state.reserve(99).is_err());
        assert_eq!(state, before);
    }

    /// Test release returns units but keeps the high-water mark
    #[test]
    fn test_release_keeps_high_water_mark() {
        let state = LineItemState::new(10);
        let (state, _) = state.reserve(10).unwrap();

        let state = state.release(4);
        assert_eq!(state.allocated_quantity, 6);
        assert_eq!(state.available_quantity(), 4);
        assert_eq!(state.last_allocated_number, 10);
    }

    /// Test release clamps the allocated count at zero
    #[test]
    fn test_release_clamps_at_zero() {
        let state = LineItemState::new(10);
        let (state, _) = state.reserve(3).unwrap();

        let state = state.release(50);
        assert_eq!(state.allocated_quantity, 0);
        assert_eq!(state.last_allocated_number, 3);
    }

    /// Test negative release quantities are ignored
    #[test]
    fn test_release_ignores_negative_quantity() {
        let state = LineItemState::new(10);
        let (state, _) = state.reserve(3).unwrap();

        let state = state.release(-5);
        assert_eq!(state.allocated_quantity, 3);
    }

    /// Test released numbers are retired, not reissued
    #[test]
    fn test_released_numbers_never_reissued() {
        let state = LineItemState::new(10);
        let (state, first) = state.reserve(10).unwrap();
        assert_eq!(first, IssuedRange::new(1, 10));

        // Four units come back, but their numbers stay retired
        let state = state.release(4);
        let (state, second) = state.reserve(3).unwrap();

        assert_eq!(second, IssuedRange::new(11, 13));
        assert!(!second.overlaps(&first));
        assert_eq!(state.allocated_quantity, 9);
        assert_eq!(state.available_quantity(), 1);
    }

    /// Test a full allocate/fail/allocate/return cycle on one line item
    #[test]
    fn test_allocation_churn_walkthrough() {
        // Ten units purchased
        let state = LineItemState::new(10);

        // First allocation takes four, numbered 1-4
        let (state, first) = state.reserve(4).unwrap();
        assert_eq!(first, IssuedRange::new(1, 4));

        // Seven more is one too many
        assert_eq!(
            state.reserve(7),
            Err(StockError::Insufficient {
                requested: 7,
                available: 6,
            })
        );

        // Six fits exactly, numbered 5-10
        let (state, second) = state.reserve(6).unwrap();
        assert_eq!(second, IssuedRange::new(5, 10));
        assert_eq!(state.available_quantity(), 0);

        // Dissolving the first allocation frees four units; the counter
        // stays at 10 so numbers 1-4 are never handed out again
        let state = state.release(first.quantity());
        assert_eq!(state.allocated_quantity, 6);
        assert_eq!(state.last_allocated_number, 10);
        assert_eq!(state.available_quantity(), 4);
    }

    /// Test issued range bounds
    #[test]
    fn test_range_contains_bounds() {
        let range = IssuedRange::new(5, 10);

        assert!(range.contains(5));
        assert!(range.contains(10));
        assert!(!range.contains(4));
        assert!(!range.contains(11));
        assert_eq!(range.quantity(), 6);
    }

    /// Test adjacent ranges do not overlap
    #[test]
    fn test_adjacent_ranges_do_not_overlap() {
        let a = IssuedRange::new(1, 4);
        let b = IssuedRange::new(5, 10);

        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    /// Test overlap detection on shared numbers
    #[test]
    fn test_overlapping_ranges_detected() {
        let a = IssuedRange::new(1, 5);
        let b = IssuedRange::new(5, 8);
        let c = IssuedRange::new(2, 3);

        assert!(a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(!b.overlaps(&c));
    }

    /// Test movement kind string round trip
    #[test]
    fn test_movement_kind_round_trip() {
        assert_eq!(MovementKind::Reserve.as_str(), "reserve");
        assert_eq!(MovementKind::Release.as_str(), "release");
        assert_eq!("reserve".parse::<MovementKind>(), Ok(MovementKind::Reserve));
        assert_eq!("release".parse::<MovementKind>(), Ok(MovementKind::Release));
        assert!("refund".parse::<MovementKind>().is_err());
    }

    /// Test replaying a movement log reproduces the counters
    #[test]
    fn test_fold_replays_to_stored_counters() {
        let log = vec![
            movement(MovementKind::Reserve, 4, Some((1, 4))),
            movement(MovementKind::Reserve, 6, Some((5, 10))),
            movement(MovementKind::Release, 4, None),
        ];

        let state = fold_movements(10, &log);
        assert_eq!(state.allocated_quantity, 6);
        assert_eq!(state.last_allocated_number, 10);
    }

    /// Test folding an empty log gives a fresh state
    #[test]
    fn test_fold_empty_log() {
        let state = fold_movements(7, &[]);
        assert_eq!(state, LineItemState::new(7));
    }

    /// Test issued ranges come from reserve entries only
    #[test]
    fn test_issued_ranges_skip_releases() {
        let log = vec![
            movement(MovementKind::Reserve, 4, Some((1, 4))),
            movement(MovementKind::Release, 4, None),
            movement(MovementKind::Reserve, 2, Some((5, 6))),
        ];

        let ranges = issued_ranges(&log);
        assert_eq!(ranges, vec![IssuedRange::new(1, 4), IssuedRange::new(5, 6)]);
    }

    /// Test a healthy log has no overlapping ranges
    #[test]
    fn test_healthy_log_has_no_overlaps() {
        let ranges = vec![
            IssuedRange::new(1, 4),
            IssuedRange::new(5, 10),
            IssuedRange::new(11, 13),
        ];
        assert!(find_overlaps(&ranges).is_empty());
    }

    /// Test double-issued numbers are reported pairwise
    #[test]
    fn test_double_issued_numbers_reported() {
        let ranges = vec![
            IssuedRange::new(1, 4),
            IssuedRange::new(3, 6),
            IssuedRange::new(7, 9),
        ];

        let overlaps = find_overlaps(&ranges);
        assert_eq!(
            overlaps,
            vec![(IssuedRange::new(1, 4), IssuedRange::new(3, 6))]
        );
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for line item sizes
    fn quantity_strategy() -> impl Strategy<Value = i32> {
        1i32..=200
    }

    /// Strategy for a sequence of requested operations. Positive values
    /// reserve, negative values release their absolute value.
    fn op_strategy() -> impl Strategy<Value = Vec<i32>> {
        prop::collection::vec((-20i32..=20).prop_filter("zero is a no-op", |v| *v != 0), 0..30)
    }

    /// Drive a state through an op sequence, recording successful movements
    fn run_ops(quantity: i32, ops: &[i32]) -> (LineItemState, Vec<StockMovement>) {
        let mut state = LineItemState::new(quantity);
        let mut log = Vec::new();

        for &op in ops {
            if op > 0 {
                if let Ok((next, range)) = state.reserve(op) {
                    state = next;
                    log.push(movement(
                        MovementKind::Reserve,
                        op,
                        Some((range.start_number, range.end_number)),
                    ));
                }
            } else {
                state = state.release(-op);
                log.push(movement(MovementKind::Release, -op, None));
            }
        }

        (state, log)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The allocated count never leaves [0, quantity] and the
        /// high-water mark never decreases
        #[test]
        fn prop_counters_stay_in_bounds(
            quantity in quantity_strategy(),
            ops in op_strategy()
        ) {
            let mut state = LineItemState::new(quantity);
            let mut previous_high_water = 0;

            for op in ops {
                if op > 0 {
                    if let Ok((next, _)) = state.reserve(op) {
                        state = next;
                    }
                } else {
                    state = state.release(-op);
                }

                prop_assert!(state.allocated_quantity >= 0);
                prop_assert!(state.allocated_quantity <= state.quantity);
                prop_assert!(state.last_allocated_number >= previous_high_water);
                previous_high_water = state.last_allocated_number;
            }
        }

        /// Every successful reservation issues exactly the requested count,
        /// starting one past the previous high-water mark
        #[test]
        fn prop_reserve_issues_contiguous_ranges(
            quantity in quantity_strategy(),
            requests in prop::collection::vec(1i32..=20, 1..20)
        ) {
            let mut state = LineItemState::new(quantity);

            for request in requests {
                let before = state;
                match state.reserve(request) {
                    Ok((next, range)) => {
                        prop_assert_eq!(range.start_number, before.last_allocated_number + 1);
                        prop_assert_eq!(range.quantity(), request);
                        prop_assert_eq!(next.allocated_quantity, before.allocated_quantity + request);
                        prop_assert_eq!(next.last_allocated_number, range.end_number);
                        state = next;
                    }
                    Err(_) => {
                        prop_assert!(request > before.available_quantity());
                    }
                }
            }
        }

        /// Ranges issued over a line item's lifetime never share a number,
        /// no matter how reservations and releases interleave
        #[test]
        fn prop_issued_ranges_disjoint(
            quantity in quantity_strategy(),
            ops in op_strategy()
        ) {
            let (_, log) = run_ops(quantity, &ops);
            let ranges = issued_ranges(&log);

            prop_assert!(find_overlaps(&ranges).is_empty());
        }

        /// Replaying the movement log always lands on the live counters
        #[test]
        fn prop_fold_matches_live_state(
            quantity in quantity_strategy(),
            ops in op_strategy()
        ) {
            let (state, log) = run_ops(quantity, &ops);

            prop_assert_eq!(fold_movements(quantity, &log), state);
        }

        /// Releasing never lowers the high-water mark
        #[test]
        fn prop_release_keeps_high_water(
            quantity in quantity_strategy(),
            reserve in 1i32..=20,
            release in 0i32..=40
        ) {
            let state = LineItemState::new(quantity.max(reserve));
            let (state, _) = state.reserve(reserve).unwrap();
            let high_water = state.last_allocated_number;

            let state = state.release(release);
            prop_assert_eq!(state.last_allocated_number, high_water);
        }
    }
}
