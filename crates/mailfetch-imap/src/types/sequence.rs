//! UID sets as used in `UID FETCH` and `UID` search keys.

use super::Uid;

/// A set of UIDs written in compact IMAP form (`1:4,7,9:10`).
///
/// Ranges preserve the order they were built in; the server treats the set
/// as unordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UidSet {
    ranges: Vec<(Uid, Uid)>,
}

impl UidSet {
    /// A set containing exactly one UID.
    #[must_use]
    pub fn single(uid: Uid) -> Self {
        Self {
            ranges: vec![(uid, uid)],
        }
    }

    /// An inclusive range.
    #[must_use]
    pub fn range(start: Uid, end: Uid) -> Self {
        Self {
            ranges: vec![(start.min(end), start.max(end))],
        }
    }

    /// Builds a set from explicit UIDs, merging consecutive runs.
    ///
    /// Returns `None` for an empty slice: IMAP has no empty set syntax.
    #[must_use]
    pub fn from_uids(uids: &[Uid]) -> Option<Self> {
        let mut sorted = uids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut ranges: Vec<(Uid, Uid)> = Vec::new();
        for uid in sorted {
            match ranges.last_mut() {
                Some((_, end)) if end.get().checked_add(1) == Some(uid.get()) => *end = uid,
                _ => ranges.push((uid, uid)),
            }
        }

        if ranges.is_empty() {
            None
        } else {
            Some(Self { ranges })
        }
    }

    /// Total number of UIDs covered.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.ranges
            .iter()
            .map(|(start, end)| u64::from(end.get() - start.get()) + 1)
            .sum()
    }

    /// Always false; an empty set cannot be constructed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Returns true if `uid` falls inside the set.
    #[must_use]
    pub fn contains(&self, uid: Uid) -> bool {
        self.ranges
            .iter()
            .any(|(start, end)| *start <= uid && uid <= *end)
    }
}

impl std::fmt::Display for UidSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (start, end)) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if start == end {
                write!(f, "{start}")?;
            } else {
                write!(f, "{start}:{end}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn uids(values: &[u32]) -> Vec<Uid> {
        values.iter().map(|&v| Uid::new(v).unwrap()).collect()
    }

    #[test]
    fn test_from_uids_compacts_runs() {
        let set = UidSet::from_uids(&uids(&[4, 3, 2, 1, 9, 7, 10])).unwrap();
        assert_eq!(set.to_string(), "1:4,7,9:10");
        assert_eq!(set.len(), 7);
    }

    #[test]
    fn test_from_uids_empty() {
        assert!(UidSet::from_uids(&[]).is_none());
    }

    #[test]
    fn test_single_and_range() {
        assert_eq!(UidSet::single(Uid::new(5).unwrap()).to_string(), "5");
        let range = UidSet::range(Uid::new(9).unwrap(), Uid::new(3).unwrap());
        assert_eq!(range.to_string(), "3:9");
        assert!(range.contains(Uid::new(4).unwrap()));
        assert!(!range.contains(Uid::new(10).unwrap()));
    }

    #[test]
    fn test_from_uids_at_u32_max() {
        let set = UidSet::from_uids(&uids(&[u32::MAX, u32::MAX - 1])).unwrap();
        assert_eq!(set.to_string(), format!("{}:{}", u32::MAX - 1, u32::MAX));
    }

    proptest! {
        #[test]
        fn prop_set_covers_exactly_the_input(values in proptest::collection::vec(1u32..500, 1..60)) {
            let input = uids(&values);
            let set = UidSet::from_uids(&input).unwrap();
            for uid in &input {
                prop_assert!(set.contains(*uid));
            }
            let mut distinct = values.clone();
            distinct.sort_unstable();
            distinct.dedup();
            prop_assert_eq!(set.len(), distinct.len() as u64);
        }
    }
}
