// Round-trip verification of a freshly loaded document.

/// Outcome flags of the last sanity check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanityStatus {
    pub finished: bool,
    pub verified: bool,
}

/// Compare two child lists positionally. Stops at the first difference.
///
/// Whole bodies are not compared because the conversion drops the
/// attributes of `<body>`; only its children are expected to survive.
pub fn compare_children<N: PartialEq>(old: &[N], new: &[N]) -> bool {
    if old.len() != new.len() {
        return false;
    }
    old.iter().zip(new).all(|(a, b)| a == b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Counted<'a> {
        value: u8,
        comparisons: &'a Cell<usize>,
    }

    impl PartialEq for Counted<'_> {
        fn eq(&self, other: &Self) -> bool {
            self.comparisons.set(self.comparisons.get() + 1);
            self.value == other.value
        }
    }

    fn nodes<'a>(values: &[u8], counter: &'a Cell<usize>) -> Vec<Counted<'a>> {
        values.iter().map(|&value| Counted { value, comparisons: counter }).collect()
    }

    #[test]
    fn length_mismatch_fails_without_comparing() {
        let counter = Cell::new(0);
        assert!(!compare_children(&nodes(&[1, 2], &counter), &nodes(&[1], &counter)));
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn stops_at_first_difference() {
        let counter = Cell::new(0);
        let (edited, original) = (nodes(&[1, 9, 3, 4], &counter), nodes(&[1, 2, 3, 4], &counter));
        assert!(!compare_children(&edited, &original));
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn equal_lists_verify() {
        let counter = Cell::new(0);
        assert!(compare_children(&nodes(&[1, 2, 3], &counter), &nodes(&[1, 2, 3], &counter)));
        assert_eq!(counter.get(), 3);
        assert!(compare_children::<u8>(&[], &[]));
    }
}
