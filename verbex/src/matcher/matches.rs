use std::ops::Range;

/// The byte offsets of a match, `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    pub(crate) start: usize,
    pub(crate) end: usize,
}

impl Match {
    pub(crate) fn new(start: usize, end: usize) -> Match {
        Match { start, end }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Returns a new match with `offset` added to this match's `start` and
    /// `end` values.
    #[inline]
    pub fn offset(&self, offset: usize) -> Match {
        Match {
            start: self.start + offset,
            end: self.end + offset,
        }
    }
}

/// The capture groups of one successful match.
///
/// Group 0 is the whole match. A group inside an optional branch that did
/// not participate reports `None`, never an empty range.
#[derive(Clone, Debug)]
pub struct Captures {
    pub(crate) slots: Vec<Option<usize>>,
    pub(crate) group_count: u32,
}

impl Captures {
    pub(crate) fn new(group_count: u32, slots: Vec<Option<usize>>) -> Captures {
        Captures { slots, group_count }
    }

    /// The overall match. Present on every `Captures` handed out by a
    /// search; absent only on a hand-rolled empty value.
    pub fn get_match(&self) -> Option<Match> {
        self.get_group(0)
    }

    /// The extent of capture group `index`, if it participated in the
    /// match. Group 0 is the whole match.
    pub fn get_group(&self, index: u32) -> Option<Match> {
        if index > self.group_count {
            return None;
        }
        let start = *self.slots.get(2 * index as usize)?;
        let end = *self.slots.get(2 * index as usize + 1)?;
        Some(Match::new(start?, end?))
    }

    /// The text of capture group `index` within `haystack`.
    pub fn group_str<'h>(&self, haystack: &'h str, index: u32) -> Option<&'h str> {
        self.get_group(index).map(|m| &haystack[m.range()])
    }

    /// Number of capture groups, excluding group 0.
    pub fn group_count(&self) -> u32 {
        self.group_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_accessors() {
        let m = Match::new(3, 7);
        assert_eq!(m.start(), 3);
        assert_eq!(m.end(), 7);
        assert_eq!(m.range(), 3..7);
        assert_eq!(m.len(), 4);
        assert!(m.is_empty() == false);
        assert_eq!(m.offset(2), Match::new(5, 9));
        assert!(Match::new(5, 5).is_empty());
    }

    #[test]
    fn unset_group_is_absent() {
        let caps = Captures::new(1, vec![Some(0), Some(2), None, None]);
        assert_eq!(caps.get_match(), Some(Match::new(0, 2)));
        assert_eq!(caps.get_group(1), None);
        assert_eq!(caps.get_group(2), None);
        assert_eq!(caps.group_str("ab", 0), Some("ab"));
        assert_eq!(caps.group_str("ab", 1), None);
    }
}
