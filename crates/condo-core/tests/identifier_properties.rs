//! # Identifier Property Tests
//!
//! Movement ids, billing periods and house numbers are read back from
//! hand-edited spreadsheet cells. These properties check that parsing
//! accepts everything the service writes and never panics on junk.

use condo_core::{BillingPeriod, HouseId, MovementId};
use proptest::prelude::*;

proptest! {
    /// Every id the service writes parses back to the same number.
    #[test]
    fn movement_id_display_parses_back(n in 0u32..10_000_000) {
        let id = MovementId::new(n);
        let parsed: MovementId = id.to_string().parse().unwrap();
        prop_assert_eq!(parsed, id);
        prop_assert!(id.to_string().len() >= 5);
    }

    /// Allocation always lands after the highest valid id.
    #[test]
    fn next_after_exceeds_every_valid_id(ns in prop::collection::vec(0u32..100_000, 0..20)) {
        let ids: Vec<String> = ns.iter().map(|n| MovementId::new(*n).to_string()).collect();
        let next = MovementId::next_after(ids.iter().map(String::as_str));
        let max = ns.iter().copied().max().unwrap_or(0);
        prop_assert_eq!(next.number(), max + 1);
    }

    /// Arbitrary text never panics the id parser.
    #[test]
    fn movement_id_parse_never_panics(s in ".{0,12}") {
        let _ = s.parse::<MovementId>();
    }

    /// Periods round-trip through their `YYYY-MM` rendering.
    #[test]
    fn billing_period_display_parses_back(year in 1000i32..9999, month in 1u32..=12) {
        let period = BillingPeriod::new(year, month).unwrap();
        let parsed: BillingPeriod = period.to_string().parse().unwrap();
        prop_assert_eq!(parsed, period);
    }

    /// Due days up to 28 exist in every month.
    #[test]
    fn early_due_days_always_exist(year in 1000i32..9999, month in 1u32..=12, day in 1u32..=28) {
        let period = BillingPeriod::new(year, month).unwrap();
        prop_assert!(period.due_date(day).is_ok());
    }

    /// House cells rendered as floats read back as the same house.
    #[test]
    fn house_id_accepts_float_rendering(n in 0u32..100_000) {
        prop_assert_eq!(HouseId::from_cell(&format!("{n}.0")), Some(HouseId::new(n)));
        prop_assert_eq!(HouseId::from_cell(&n.to_string()), Some(HouseId::new(n)));
    }
}
