//! Last-writer-wins ordering between two copies of the record.

use std::cmp::Ordering;

use crate::models::Record;

/// Which argument of [`compare`] is newer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    A,
    B,
}

/// Order two records by revision, then by body timestamp.
///
/// An exact tie goes to `b`. The engine always passes `(local, remote)`, so a
/// tie adopts the remote copy, which never triggers a write.
#[must_use]
pub fn compare(a: &Record, b: &Record) -> Winner {
    let ordering = a
        .revision
        .cmp(&b.revision)
        .then_with(|| a.body_updated_at.cmp(&b.body_updated_at));

    match ordering {
        Ordering::Greater => Winner::A,
        Ordering::Less | Ordering::Equal => Winner::B,
    }
}

/// Return whichever record is newer, unmodified.
#[must_use]
pub fn resolve<'a>(a: &'a Record, b: &'a Record) -> &'a Record {
    match compare(a, b) {
        Winner::A => a,
        Winner::B => b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn base_time() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn record(revision: u64, body: &str, offset_ms: i64) -> Record {
        let mut record = Record::new(base_time());
        record.body = body.to_string();
        record.revision = revision;
        record.body_updated_at = base_time() + Duration::milliseconds(offset_ms);
        record
    }

    #[test]
    fn higher_revision_wins_over_newer_timestamp() {
        let older_but_more_edits = record(5, "B", 0);
        let newer_but_fewer_edits = record(3, "A", 60_000);

        assert_eq!(resolve(&newer_but_fewer_edits, &older_but_more_edits).body, "B");
        assert_eq!(resolve(&older_but_more_edits, &newer_but_fewer_edits).body, "B");
    }

    #[test]
    fn equal_revision_falls_back_to_timestamp() {
        let local = record(4, "C", 1_000);
        let remote = record(4, "D", 0);

        assert_eq!(compare(&local, &remote), Winner::A);
        assert_eq!(compare(&remote, &local), Winner::B);
    }

    #[test]
    fn exact_tie_picks_second_argument() {
        let a = record(2, "a", 0);
        let b = record(2, "b", 0);

        assert_eq!(compare(&a, &b), Winner::B);
        assert!(std::ptr::eq(resolve(&a, &b), &b));
    }

    fn arb_record() -> impl Strategy<Value = Record> {
        (0u64..20, -5_000i64..5_000, "[a-z]{0,8}")
            .prop_map(|(revision, offset, body)| record(revision, &body, offset))
    }

    proptest! {
        #[test]
        fn greater_revision_wins_in_either_order(a in arb_record(), b in arb_record()) {
            prop_assume!(a.revision != b.revision);
            let expected = if a.revision > b.revision { &a } else { &b };

            prop_assert!(std::ptr::eq(resolve(&a, &b), expected));
            prop_assert!(std::ptr::eq(resolve(&b, &a), expected));
        }

        #[test]
        fn equal_revision_later_timestamp_wins(
            revision in 0u64..20,
            earlier in -5_000i64..0,
            later in 1i64..5_000,
        ) {
            let a = record(revision, "a", later);
            let b = record(revision, "b", earlier);

            prop_assert_eq!(compare(&a, &b), Winner::A);
            prop_assert_eq!(compare(&b, &a), Winner::B);
        }

        #[test]
        fn resolve_returns_one_input_unchanged(a in arb_record(), b in arb_record()) {
            let (a_before, b_before) = (a.clone(), b.clone());
            let winner = resolve(&a, &b);

            prop_assert!(*winner == a_before || *winner == b_before);
            prop_assert_eq!(a, a_before);
            prop_assert_eq!(b, b_before);
        }
    }
}
