//! Ordered union of a parent iterator and a cache overlay snapshot.
//!
//! [`MergeIterator`] drives two iterators in the same direction: the parent
//! store's range iterator and a snapshot of the overlay's dirty entries in
//! range. On a key collision the overlay entry wins; tombstoned keys are
//! suppressed entirely, hiding any parent value underneath.

use std::cmp::Ordering;
use std::iter::Peekable;

/// Iteration direction. Both input iterators must already be ordered in the
/// requested direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ascending byte-lexicographic order.
    Forward,
    /// Descending byte-lexicographic order.
    Reverse,
}

/// An overlay snapshot entry: `None` marks a tombstone.
pub type OverlayItem = (Vec<u8>, Option<Vec<u8>>);

/// Yields the ordered union of a parent iterator and an overlay snapshot.
pub struct MergeIterator<'a> {
    parent: Peekable<Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a>>,
    overlay: Peekable<std::vec::IntoIter<OverlayItem>>,
    direction: Direction,
}

impl<'a> MergeIterator<'a> {
    /// Build a merge iterator from a parent iterator and a snapshot of dirty
    /// overlay entries, both ordered in `direction`.
    pub fn new(
        parent: Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a>,
        overlay: Vec<OverlayItem>,
        direction: Direction,
    ) -> Self {
        Self {
            parent: parent.peekable(),
            overlay: overlay.into_iter().peekable(),
            direction,
        }
    }

    /// Compare two keys in the given iteration order, without borrowing `self`.
    fn order_in(direction: Direction, a: &[u8], b: &[u8]) -> Ordering {
        match direction {
            Direction::Forward => a.cmp(b),
            Direction::Reverse => b.cmp(a),
        }
    }
}

impl Iterator for MergeIterator<'_> {
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match (self.parent.peek(), self.overlay.peek()) {
                (None, None) => return None,
                (Some(_), None) => return self.parent.next(),
                (None, Some(_)) => {
                    let (key, value) = self.overlay.next().expect("peeked entry exists");
                    match value {
                        Some(value) => return Some((key, value)),
                        None => continue, // tombstone with nothing to cover
                    }
                }
                (Some((pk, _)), Some((ok, _))) => match Self::order_in(self.direction, pk, ok) {
                    Ordering::Less => return self.parent.next(),
                    Ordering::Greater => {
                        let (key, value) = self.overlay.next().expect("peeked entry exists");
                        match value {
                            Some(value) => return Some((key, value)),
                            None => continue,
                        }
                    }
                    Ordering::Equal => {
                        // Overlay shadows the parent: advance past the parent
                        // entry, then expose the overlay value (or skip both
                        // on a tombstone).
                        self.parent.next();
                        let (key, value) = self.overlay.next().expect("peeked entry exists");
                        match value {
                            Some(value) => return Some((key, value)),
                            None => continue,
                        }
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(entries: &[(&[u8], &[u8])]) -> Vec<(Vec<u8>, Vec<u8>)> {
        entries
            .iter()
            .map(|(k, v)| (k.to_vec(), v.to_vec()))
            .collect()
    }

    fn overlay(entries: &[(&[u8], Option<&[u8]>)]) -> Vec<OverlayItem> {
        entries
            .iter()
            .map(|(k, v)| (k.to_vec(), v.map(|v| v.to_vec())))
            .collect()
    }

    fn merge(
        parent: Vec<(Vec<u8>, Vec<u8>)>,
        dirty: Vec<OverlayItem>,
        direction: Direction,
    ) -> Vec<(Vec<u8>, Vec<u8>)> {
        MergeIterator::new(Box::new(parent.into_iter()), dirty, direction).collect()
    }

    #[test]
    fn test_interleaves_in_order() {
        let got = merge(
            pairs(&[(b"a", b"1"), (b"c", b"3")]),
            overlay(&[(b"b", Some(b"2"))]),
            Direction::Forward,
        );
        assert_eq!(got, pairs(&[(b"a", b"1"), (b"b", b"2"), (b"c", b"3")]));
    }

    #[test]
    fn test_reverse_interleaves_in_order() {
        let got = merge(
            pairs(&[(b"c", b"3"), (b"a", b"1")]),
            overlay(&[(b"b", Some(b"2"))]),
            Direction::Reverse,
        );
        assert_eq!(got, pairs(&[(b"c", b"3"), (b"b", b"2"), (b"a", b"1")]));
    }

    #[test]
    fn test_overlay_shadows_parent_on_collision() {
        let got = merge(
            pairs(&[(b"a", b"old"), (b"b", b"2")]),
            overlay(&[(b"a", Some(b"new"))]),
            Direction::Forward,
        );
        assert_eq!(got, pairs(&[(b"a", b"new"), (b"b", b"2")]));
    }

    #[test]
    fn test_tombstone_hides_parent_value() {
        let got = merge(
            pairs(&[(b"a", b"1"), (b"b", b"2"), (b"c", b"3")]),
            overlay(&[(b"b", None)]),
            Direction::Forward,
        );
        assert_eq!(got, pairs(&[(b"a", b"1"), (b"c", b"3")]));
    }

    #[test]
    fn test_tombstone_without_parent_entry_is_skipped() {
        let got = merge(
            pairs(&[(b"a", b"1")]),
            overlay(&[(b"b", None), (b"c", Some(b"3"))]),
            Direction::Forward,
        );
        assert_eq!(got, pairs(&[(b"a", b"1"), (b"c", b"3")]));
    }

    #[test]
    fn test_parent_exhausted_first() {
        let got = merge(
            pairs(&[(b"a", b"1")]),
            overlay(&[(b"x", Some(b"24")), (b"y", None), (b"z", Some(b"26"))]),
            Direction::Forward,
        );
        assert_eq!(got, pairs(&[(b"a", b"1"), (b"x", b"24"), (b"z", b"26")]));
    }

    #[test]
    fn test_overlay_exhausted_first() {
        let got = merge(
            pairs(&[(b"m", b"13"), (b"n", b"14")]),
            overlay(&[(b"a", Some(b"1"))]),
            Direction::Forward,
        );
        assert_eq!(got, pairs(&[(b"a", b"1"), (b"m", b"13"), (b"n", b"14")]));
    }

    #[test]
    fn test_both_empty() {
        let got = merge(vec![], vec![], Direction::Forward);
        assert!(got.is_empty());
    }

    #[test]
    fn test_all_tombstones_yields_nothing() {
        let got = merge(
            pairs(&[(b"a", b"1"), (b"b", b"2")]),
            overlay(&[(b"a", None), (b"b", None)]),
            Direction::Forward,
        );
        assert!(got.is_empty());
    }

    #[test]
    fn test_reverse_collision_and_tombstone() {
        let got = merge(
            pairs(&[(b"c", b"3"), (b"b", b"2"), (b"a", b"1")]),
            overlay(&[(b"c", None), (b"a", Some(b"9"))]),
            Direction::Reverse,
        );
        assert_eq!(got, pairs(&[(b"b", b"2"), (b"a", b"9")]));
    }
}
