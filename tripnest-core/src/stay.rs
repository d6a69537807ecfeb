use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{DomainError, DomainResult};

/// Half-open stay interval: the guest occupies [check_in, check_out).
///
/// The constructor is the only way to build one (deserialization goes
/// through it too), so an inverted or zero-length range cannot exist
/// past the validation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawStayRange")]
pub struct StayRange {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStayRange {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl TryFrom<RawStayRange> for StayRange {
    type Error = DomainError;

    fn try_from(raw: RawStayRange) -> DomainResult<Self> {
        StayRange::new(raw.check_in, raw.check_out)
    }
}

impl StayRange {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> DomainResult<Self> {
        if check_out <= check_in {
            return Err(DomainError::Validation(format!(
                "check-out {} must be after check-in {}",
                check_out, check_in
            )));
        }
        Ok(Self { check_in, check_out })
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    /// Strict half-open overlap: two stays share at least one night.
    /// Back-to-back stays (one checks out the day the other checks in)
    /// do not overlap.
    pub fn overlaps(&self, other: &StayRange) -> bool {
        self.check_in < other.check_out && self.check_out > other.check_in
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn range(a: &str, b: &str) -> StayRange {
        StayRange::new(d(a), d(b)).unwrap()
    }

    #[test]
    fn rejects_inverted_and_zero_length_ranges() {
        assert!(StayRange::new(d("2024-06-05"), d("2024-06-01")).is_err());
        assert!(StayRange::new(d("2024-06-01"), d("2024-06-01")).is_err());
    }

    #[test]
    fn overlapping_stays() {
        let a = range("2024-06-01", "2024-06-05");
        assert!(a.overlaps(&range("2024-06-04", "2024-06-08")));
        assert!(a.overlaps(&range("2024-05-30", "2024-06-02")));
        assert!(a.overlaps(&range("2024-06-02", "2024-06-03")));
        assert!(a.overlaps(&a));
    }

    #[test]
    fn back_to_back_stays_do_not_overlap() {
        let a = range("2024-06-01", "2024-06-05");
        assert!(!a.overlaps(&range("2024-06-05", "2024-06-09")));
        assert!(!a.overlaps(&range("2024-05-28", "2024-06-01")));
    }

    #[test]
    fn nights_counts_the_half_open_span() {
        assert_eq!(range("2024-06-01", "2024-06-05").nights(), 4);
        assert_eq!(range("2024-06-01", "2024-06-02").nights(), 1);
    }
}
