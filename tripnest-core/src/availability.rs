use crate::stay::StayRange;

/// Sum of rooms held by confirmed bookings that overlap `requested`.
///
/// This is the conservative "every overlapping booking counts for its
/// full quantity" figure, not a sweep-line peak. Two bookings that
/// overlap the requested range without overlapping each other are both
/// counted, so the result can over-state concurrent usage and the
/// derived availability can under-report. Intentional: it matches the
/// observed production behavior (see DESIGN.md).
pub fn overlapping_rooms(requested: &StayRange, confirmed: &[(StayRange, i32)]) -> i32 {
    confirmed
        .iter()
        .filter(|(stay, _)| stay.overlaps(requested))
        .map(|(_, rooms)| rooms)
        .sum()
}

/// Rooms still bookable for `requested`. Can go negative if the room
/// type is already overbooked (e.g. right after a capacity reduction
/// that could not free enough rooms).
pub fn rooms_available(
    total_rooms: i32,
    requested: &StayRange,
    confirmed: &[(StayRange, i32)],
) -> i32 {
    total_rooms - overlapping_rooms(requested, confirmed)
}

#[derive(Debug, thiserror::Error)]
#[error("insufficient availability: requested {requested}, available {available}")]
pub struct InsufficientAvailability {
    pub requested: i32,
    pub available: i32,
}

/// A booking request for `requested` rooms is valid iff availability
/// covers it. Cancelled bookings must already be filtered out of
/// `confirmed` by the caller.
pub fn check_request(
    total_rooms: i32,
    stay: &StayRange,
    requested: i32,
    confirmed: &[(StayRange, i32)],
) -> Result<i32, InsufficientAvailability> {
    let available = rooms_available(total_rooms, stay, confirmed);
    if available >= requested {
        Ok(available)
    } else {
        Err(InsufficientAvailability {
            requested,
            available,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn range(a: &str, b: &str) -> StayRange {
        StayRange::new(a.parse::<NaiveDate>().unwrap(), b.parse::<NaiveDate>().unwrap())
            .unwrap()
    }

    #[test]
    fn one_overlapping_booking_of_four_leaves_six_of_ten() {
        let requested = range("2024-06-01", "2024-06-05");
        let confirmed = vec![(range("2024-06-03", "2024-06-07"), 4)];
        assert_eq!(rooms_available(10, &requested, &confirmed), 6);
    }

    #[test]
    fn non_overlapping_bookings_do_not_count() {
        let requested = range("2024-06-01", "2024-06-05");
        let confirmed = vec![
            (range("2024-06-05", "2024-06-09"), 4),
            (range("2024-05-01", "2024-06-01"), 2),
        ];
        assert_eq!(rooms_available(10, &requested, &confirmed), 10);
    }

    #[test]
    fn availability_plus_overlap_sum_equals_capacity() {
        let requested = range("2024-06-01", "2024-06-10");
        let confirmed = vec![
            (range("2024-06-02", "2024-06-04"), 3),
            (range("2024-06-08", "2024-06-12"), 2),
            (range("2024-05-20", "2024-05-25"), 5),
        ];
        let total = 12;
        let overlap = overlapping_rooms(&requested, &confirmed);
        assert_eq!(rooms_available(total, &requested, &confirmed) + overlap, total);
    }

    #[test]
    fn request_rejected_when_demand_exceeds_availability() {
        let stay = range("2024-06-01", "2024-06-05");
        let confirmed = vec![(range("2024-06-01", "2024-06-05"), 8)];
        let err = check_request(10, &stay, 3, &confirmed).unwrap_err();
        assert_eq!(err.available, 2);
        assert_eq!(err.requested, 3);

        assert_eq!(check_request(10, &stay, 2, &confirmed).unwrap(), 2);
    }

    #[test]
    fn availability_can_go_negative_when_overbooked() {
        let stay = range("2024-06-01", "2024-06-05");
        let confirmed = vec![(range("2024-06-01", "2024-06-05"), 7)];
        assert_eq!(rooms_available(5, &stay, &confirmed), -2);
    }
}
