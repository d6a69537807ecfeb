//! Capacity-reduction planning.
//!
//! When a hotel owner shrinks `total_rooms` below current demand, some
//! confirmed reservations have to go. The planner is pure: it looks at
//! the confirmed bookings of one room type and decides which ones to
//! cancel. Applying the plan (status flips, parent cascade,
//! notifications, the capacity write itself) happens in the store
//! layer inside a single transaction.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::stay::StayRange;

/// A confirmed reservation as the planner sees it.
#[derive(Debug, Clone)]
pub struct ReservationWindow {
    pub hotel_booking_id: Uuid,
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub stay: StayRange,
    pub rooms_booked: i32,
    pub created_at: DateTime<Utc>,
}

/// An exact `(check_in, check_out)` key whose summed demand exceeds
/// the new capacity, and by how much.
#[derive(Debug, Clone, PartialEq)]
pub struct OverbookedRange {
    pub stay: StayRange,
    pub overbooked: i32,
}

#[derive(Debug, Default)]
pub struct CapacityPlan {
    pub to_cancel: Vec<ReservationWindow>,
    pub rooms_freed: i32,
}

impl CapacityPlan {
    pub fn is_noop(&self) -> bool {
        self.to_cancel.is_empty()
    }
}

/// Find the exact stay keys whose total confirmed demand exceeds
/// `new_total`. Bookings for the same key are summed; partially
/// overlapping keys are deliberately not merged.
pub fn overbooked_ranges(new_total: i32, confirmed: &[ReservationWindow]) -> Vec<OverbookedRange> {
    let mut per_range: HashMap<StayRange, i32> = HashMap::new();
    for r in confirmed {
        *per_range.entry(r.stay).or_insert(0) += r.rooms_booked;
    }

    let mut ranges: Vec<OverbookedRange> = per_range
        .into_iter()
        .filter(|(_, booked)| *booked > new_total)
        .map(|(stay, booked)| OverbookedRange {
            stay,
            overbooked: booked - new_total,
        })
        .collect();
    // Deterministic output for callers and tests.
    ranges.sort_by_key(|r| (r.stay.check_in(), r.stay.check_out()));
    ranges
}

/// Decide which reservations to cancel so the capacity invariant holds
/// again after `total_rooms` drops from `old_total` to `new_total`.
///
/// Last-in-first-cancelled: candidates are taken newest booking first,
/// and only candidates overlapping an overbooked range qualify.
/// Cancellation stops once `old_total - new_total` rooms are freed or
/// no candidates remain; in the latter case the capacity write still
/// proceeds and the room type stays overbooked.
pub fn plan_capacity_reduction(
    old_total: i32,
    new_total: i32,
    confirmed: &[ReservationWindow],
) -> CapacityPlan {
    if new_total >= old_total {
        return CapacityPlan::default();
    }

    let overbooked = overbooked_ranges(new_total, confirmed);
    if overbooked.is_empty() {
        return CapacityPlan::default();
    }

    let rooms_to_free = old_total - new_total;

    let mut candidates: Vec<&ReservationWindow> = confirmed.iter().collect();
    candidates.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut plan = CapacityPlan::default();
    for candidate in candidates {
        if plan.rooms_freed >= rooms_to_free {
            break;
        }
        if overbooked.iter().any(|r| r.stay.overlaps(&candidate.stay)) {
            plan.rooms_freed += candidate.rooms_booked;
            plan.to_cancel.push(candidate.clone());
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn range(a: &str, b: &str) -> StayRange {
        StayRange::new(a.parse::<NaiveDate>().unwrap(), b.parse::<NaiveDate>().unwrap())
            .unwrap()
    }

    fn reservation(stay: StayRange, rooms: i32, created_minute: u32) -> ReservationWindow {
        ReservationWindow {
            hotel_booking_id: Uuid::new_v4(),
            booking_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            stay,
            rooms_booked: rooms,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, created_minute, 0).unwrap(),
        }
    }

    #[test]
    fn raising_capacity_never_cancels() {
        let confirmed = vec![reservation(range("2024-06-01", "2024-06-05"), 5, 0)];
        assert!(plan_capacity_reduction(5, 8, &confirmed).is_noop());
        assert!(plan_capacity_reduction(5, 5, &confirmed).is_noop());
    }

    #[test]
    fn reduction_with_no_overbooked_range_cancels_nothing() {
        let confirmed = vec![
            reservation(range("2024-06-01", "2024-06-05"), 2, 0),
            reservation(range("2024-07-01", "2024-07-03"), 3, 1),
        ];
        assert!(plan_capacity_reduction(10, 4, &confirmed).is_noop());
    }

    #[test]
    fn newest_booking_is_cancelled_first() {
        // totalRooms 5 -> 4 with a 3-room (older) and a 2-room (newer)
        // booking on the same stay: the 2-room booking alone covers the
        // deficit of 1 and the older booking survives.
        let stay = range("2024-06-01", "2024-06-05");
        let older = reservation(stay, 3, 0);
        let newer = reservation(stay, 2, 30);
        let confirmed = vec![older.clone(), newer.clone()];

        let plan = plan_capacity_reduction(5, 4, &confirmed);
        assert_eq!(plan.rooms_freed, 2);
        assert_eq!(plan.to_cancel.len(), 1);
        assert_eq!(plan.to_cancel[0].hotel_booking_id, newer.hotel_booking_id);
    }

    #[test]
    fn cancels_until_the_deficit_is_covered() {
        let stay = range("2024-06-01", "2024-06-05");
        let confirmed = vec![
            reservation(stay, 4, 0),
            reservation(stay, 3, 10),
            reservation(stay, 2, 20),
            reservation(stay, 1, 30),
        ];

        // 10 -> 6: free 4 rooms, newest first (1 + 2 + 3 >= 4).
        let plan = plan_capacity_reduction(10, 6, &confirmed);
        assert_eq!(
            plan.to_cancel.iter().map(|r| r.rooms_booked).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(plan.rooms_freed, 6);
    }

    #[test]
    fn non_overlapping_reservations_are_never_touched() {
        let overbooked_stay = range("2024-06-01", "2024-06-05");
        let elsewhere = reservation(range("2024-08-01", "2024-08-04"), 2, 50);
        let confirmed = vec![
            reservation(overbooked_stay, 3, 0),
            reservation(overbooked_stay, 2, 10),
            elsewhere.clone(),
        ];

        let plan = plan_capacity_reduction(5, 3, &confirmed);
        assert!(plan
            .to_cancel
            .iter()
            .all(|r| r.hotel_booking_id != elsewhere.hotel_booking_id));
    }

    #[test]
    fn invariant_holds_after_applying_the_plan() {
        let stay_a = range("2024-06-01", "2024-06-05");
        let stay_b = range("2024-06-03", "2024-06-07");
        let confirmed = vec![
            reservation(stay_a, 3, 0),
            reservation(stay_a, 2, 10),
            reservation(stay_b, 2, 20),
        ];

        let new_total = 4;
        let plan = plan_capacity_reduction(7, new_total, &confirmed);

        let cancelled: Vec<Uuid> =
            plan.to_cancel.iter().map(|r| r.hotel_booking_id).collect();
        let survivors: Vec<&ReservationWindow> = confirmed
            .iter()
            .filter(|r| !cancelled.contains(&r.hotel_booking_id))
            .collect();

        // Every exact stay key must fit within the new capacity.
        for r in &survivors {
            let demand: i32 = survivors
                .iter()
                .filter(|s| s.stay == r.stay)
                .map(|s| s.rooms_booked)
                .sum();
            assert!(demand <= new_total, "stay {:?} still overbooked", r.stay);
        }
    }

    #[test]
    fn runs_out_of_candidates_without_panicking() {
        let stay = range("2024-06-01", "2024-06-05");
        let confirmed = vec![reservation(stay, 6, 0)];

        // 6 -> 1: the single booking frees 6 which clears the deficit.
        let plan = plan_capacity_reduction(6, 1, &confirmed);
        assert_eq!(plan.to_cancel.len(), 1);

        // No confirmed bookings at all: nothing to do.
        assert!(plan_capacity_reduction(6, 1, &[]).is_noop());
    }

    #[test]
    fn overbooked_ranges_group_by_exact_key() {
        let stay_a = range("2024-06-01", "2024-06-05");
        let stay_b = range("2024-06-02", "2024-06-06");
        let confirmed = vec![
            reservation(stay_a, 3, 0),
            reservation(stay_a, 2, 1),
            reservation(stay_b, 1, 2),
        ];

        let ranges = overbooked_ranges(4, &confirmed);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].stay, stay_a);
        assert_eq!(ranges[0].overbooked, 1);
    }
}
