/*!
The compiled matcher.

A [`Regex`] owns a compiled [`Program`](crate::compile::Program) and a
[`Config`](crate::vm::Config); it is built from a
[`VerbEx`](crate::builder::VerbEx) chain via
[`VerbEx::compile`](crate::builder::VerbEx::compile). All searching is
unanchored unless the pattern itself carries anchors, and uses
leftmost-first semantics: the earliest start position wins, and within a
position the compiled branch order decides.

# Cheap clones

The compiled program is reference counted, so a `Regex` is cheap to clone
and can be handed to other threads. Search scratch state is allocated per
call and never shared, which is why `&self` search methods are safe to
invoke concurrently.

# Fallible searches

The backtracker charges one budget unit per executed instruction, so
pathological patterns fail with a
[`MatchError`](crate::vm::MatchError) instead of running away. The `try_*`
methods surface that error; their panicking counterparts are fine whenever
the step limit is sized for the workload.

# Example

```
use verbex::VerbEx;

let re = VerbEx::new()
    .start_of_line(true)
    .then("http")
    .maybe("s")
    .then("://")
    .compile()?;
assert!(re.is_match("https://example.org"));
assert!(re.is_match("ftp://example.org") == false);
# Ok::<(), verbex::Error>(())
```
*/

use std::{fmt, sync::Arc};

#[cfg(feature = "perf-literal")]
use memchr::memmem;

use crate::{
    compile::Program,
    replace::{self, Template},
    syntax::Flags,
    vm::{self, Config, MatchError},
};

mod input;
mod matches;

pub use input::Input;
pub use matches::{Captures, Match};

/// A compiled pattern, ready to search.
#[derive(Clone, Debug)]
pub struct Regex {
    pattern: Box<str>,
    program: Arc<Program>,
    config: Config,
    #[cfg(feature = "perf-literal")]
    prefilter: Option<memmem::Finder<'static>>,
}

impl Regex {
    pub(crate) fn new(pattern: String, program: Program, config: Config) -> Regex {
        #[cfg(feature = "perf-literal")]
        let prefilter = program
            .prefix
            .as_deref()
            .map(|p| memmem::Finder::new(p.as_bytes()).into_owned());
        Regex {
            pattern: pattern.into_boxed_str(),
            program: Arc::new(program),
            config,
            #[cfg(feature = "perf-literal")]
            prefilter,
        }
    }

    /// The pattern in standard regex syntax, as rendered by
    /// [`VerbEx::pattern`](crate::builder::VerbEx::pattern).
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn flags(&self) -> Flags {
        self.program.flags()
    }

    /// Number of capture groups, excluding the whole match.
    pub fn group_count(&self) -> u32 {
        self.program.group_count()
    }

    /// Whether a match exists anywhere in the haystack.
    ///
    /// Panics if the step budget is exhausted; see [`Regex::try_is_match`].
    pub fn is_match<'h, I: Into<Input<'h>>>(&self, input: I) -> bool {
        self.try_is_match(input)
            .unwrap_or_else(|err| panic!("{err}; use try_is_match to handle the error"))
    }

    pub fn try_is_match<'h, I: Into<Input<'h>>>(&self, input: I) -> Result<bool, MatchError> {
        Ok(self.try_search(&input.into())?.is_some())
    }

    /// The leftmost match, if any.
    ///
    /// Panics if the step budget is exhausted; see [`Regex::try_find`].
    pub fn find<'h, I: Into<Input<'h>>>(&self, input: I) -> Option<Match> {
        self.try_find(input)
            .unwrap_or_else(|err| panic!("{err}; use try_find to handle the error"))
    }

    pub fn try_find<'h, I: Into<Input<'h>>>(&self, input: I) -> Result<Option<Match>, MatchError> {
        Ok(self.try_search(&input.into())?.and_then(|caps| caps.get_match()))
    }

    /// The leftmost match with all capture groups resolved.
    ///
    /// Panics if the step budget is exhausted; see [`Regex::try_captures`].
    pub fn captures<'h, I: Into<Input<'h>>>(&self, input: I) -> Option<Captures> {
        self.try_captures(input)
            .unwrap_or_else(|err| panic!("{err}; use try_captures to handle the error"))
    }

    pub fn try_captures<'h, I: Into<Input<'h>>>(
        &self,
        input: I,
    ) -> Result<Option<Captures>, MatchError> {
        self.try_search(&input.into())
    }

    /// An iterator over all non-overlapping matches, left to right.
    ///
    /// The iterator panics if the step budget is exhausted; see
    /// [`Regex::try_find_iter`].
    pub fn find_iter<'r, 'h>(&'r self, haystack: &'h str) -> FindMatches<'r, 'h> {
        FindMatches { it: TryFindMatches::new(self, haystack) }
    }

    pub fn try_find_iter<'r, 'h>(&'r self, haystack: &'h str) -> TryFindMatches<'r, 'h> {
        TryFindMatches::new(self, haystack)
    }

    /// Like [`Regex::find_iter`], but yielding [`Captures`].
    pub fn captures_iter<'r, 'h>(&'r self, haystack: &'h str) -> CapturesIter<'r, 'h> {
        CapturesIter { it: TryFindMatches::new(self, haystack) }
    }

    pub fn try_captures_iter<'r, 'h>(&'r self, haystack: &'h str) -> TryCapturesMatches<'r, 'h> {
        TryCapturesMatches { it: TryFindMatches::new(self, haystack) }
    }

    /// Replace the leftmost match with the expansion of `template`.
    ///
    /// Panics if the step budget is exhausted; see
    /// [`Regex::try_replace_first`].
    pub fn replace_first(&self, haystack: &str, template: &Template) -> String {
        self.try_replace_first(haystack, template)
            .unwrap_or_else(|err| panic!("{err}; use try_replace_first to handle the error"))
    }

    pub fn try_replace_first(
        &self,
        haystack: &str,
        template: &Template,
    ) -> Result<String, MatchError> {
        replace::replacen(self, haystack, template, 1)
    }

    /// Replace every non-overlapping match with the expansion of
    /// `template`.
    ///
    /// Panics if the step budget is exhausted; see
    /// [`Regex::try_replace_all`].
    pub fn replace_all(&self, haystack: &str, template: &Template) -> String {
        self.try_replace_all(haystack, template)
            .unwrap_or_else(|err| panic!("{err}; use try_replace_all to handle the error"))
    }

    pub fn try_replace_all(
        &self,
        haystack: &str,
        template: &Template,
    ) -> Result<String, MatchError> {
        replace::replacen(self, haystack, template, 0)
    }

    /// The search driver: try each candidate start position in order and
    /// return the first success. One step budget covers the whole call.
    pub(crate) fn try_search(&self, input: &Input<'_>) -> Result<Option<Captures>, MatchError> {
        let haystack = input.haystack();
        debug_assert!(haystack.is_char_boundary(input.start()));
        let mut cache = vm::Cache::new(&self.program);
        let limit = self.config.step_limit();
        let mut steps = limit;
        let mut at = input.start();
        loop {
            let Some(candidate) = self.next_candidate(haystack, at) else {
                return Ok(None);
            };
            if vm::backtrack(&self.program, haystack, candidate, &mut cache, &mut steps, limit)? {
                return Ok(Some(Captures::new(
                    self.program.group_count(),
                    cache.slots.clone(),
                )));
            }
            if candidate >= haystack.len() {
                return Ok(None);
            }
            at = candidate + next_char_len(haystack, candidate);
        }
    }

    /// The next start position worth attempting at or after `at`: position
    /// 0 only for a start-anchored single-line pattern, line starts for an
    /// anchored multiline one, prefilter hits when a mandatory literal
    /// prefix is known, and otherwise every position.
    fn next_candidate(&self, haystack: &str, at: usize) -> Option<usize> {
        if at > haystack.len() {
            return None;
        }
        if self.program.anchored_start {
            if !self.program.flags().contains(Flags::MULTI_LINE) {
                return (at == 0).then_some(0);
            }
            if at == 0 {
                return Some(0);
            }
            return haystack.as_bytes()[at - 1..]
                .iter()
                .position(|&b| b == b'\n')
                .map(|i| at + i);
        }
        #[cfg(feature = "perf-literal")]
        if let Some(finder) = &self.prefilter {
            return finder.find(&haystack.as_bytes()[at..]).map(|i| at + i);
        }
        Some(at)
    }
}

impl fmt::Display for Regex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

fn next_char_len(haystack: &str, at: usize) -> usize {
    haystack[at..].chars().next().map_or(1, char::len_utf8)
}

/// Iterator over all matches, yielding `Result` so step-budget exhaustion
/// is observable. Ends after the first error.
#[derive(Debug)]
pub struct TryFindMatches<'r, 'h> {
    re: &'r Regex,
    haystack: &'h str,
    at: usize,
    done: bool,
}

impl<'r, 'h> TryFindMatches<'r, 'h> {
    fn new(re: &'r Regex, haystack: &'h str) -> TryFindMatches<'r, 'h> {
        TryFindMatches { re, haystack, at: 0, done: false }
    }

    fn next_caps(&mut self) -> Option<Result<Captures, MatchError>> {
        if self.done || self.at > self.haystack.len() {
            return None;
        }
        let input = Input::builder(self.haystack).start(self.at).build();
        match self.re.try_search(&input) {
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Ok(Some(caps)) => {
                let m = caps.get_match()?;
                // Step past empty matches to guarantee progress.
                self.at = if m.is_empty() {
                    m.end() + next_char_len(self.haystack, m.end().min(self.haystack.len()))
                } else {
                    m.end()
                };
                Some(Ok(caps))
            }
        }
    }
}

impl Iterator for TryFindMatches<'_, '_> {
    type Item = Result<Match, MatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_caps()
            .map(|r| r.map(|caps| caps.get_match().unwrap_or(Match::new(0, 0))))
    }
}

/// Iterator over all matches. Panics on step-budget exhaustion; see
/// [`Regex::try_find_iter`].
#[derive(Debug)]
pub struct FindMatches<'r, 'h> {
    it: TryFindMatches<'r, 'h>,
}

impl Iterator for FindMatches<'_, '_> {
    type Item = Match;

    fn next(&mut self) -> Option<Self::Item> {
        self.it
            .next()
            .map(|r| r.unwrap_or_else(|err| panic!("{err}; use try_find_iter to handle the error")))
    }
}

/// Iterator over the [`Captures`] of all matches, yielding `Result` so
/// step-budget exhaustion is observable. Ends after the first error.
#[derive(Debug)]
pub struct TryCapturesMatches<'r, 'h> {
    it: TryFindMatches<'r, 'h>,
}

impl Iterator for TryCapturesMatches<'_, '_> {
    type Item = Result<Captures, MatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.it.next_caps()
    }
}

/// Iterator over the [`Captures`] of all matches. Panics on step-budget
/// exhaustion.
#[derive(Debug)]
pub struct CapturesIter<'r, 'h> {
    it: TryFindMatches<'r, 'h>,
}

impl Iterator for CapturesIter<'_, '_> {
    type Item = Captures;

    fn next(&mut self) -> Option<Self::Item> {
        self.it
            .next_caps()
            .map(|r| r.unwrap_or_else(|err| panic!("{err}; use try_find_iter to handle the error")))
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::VerbEx;
    use crate::vm::Config;

    use super::*;

    #[test]
    fn leftmost_first() {
        let re = VerbEx::new().then("aa").compile().unwrap();
        assert_eq!(re.find("baaaa"), Some(Match::new(1, 3)));
    }

    #[test]
    fn anchored_candidates() {
        let re = VerbEx::new()
            .start_of_line(true)
            .then("a")
            .search_one_line(true)
            .compile()
            .unwrap();
        assert!(re.is_match("abc"));
        assert!(re.is_match("bac") == false);

        // Multiline: line starts are candidates again.
        let re = VerbEx::new().start_of_line(true).then("a").compile().unwrap();
        assert!(re.is_match("b\nabc"));
        assert_eq!(re.find("b\nabc"), Some(Match::new(2, 3)));
    }

    #[test]
    fn prefilter_skips_ahead() {
        let re = VerbEx::new().then("needle").compile().unwrap();
        let hay = "xxxxxxxxxxxxxxxxxxxxneedlexxx";
        assert_eq!(re.find(hay), Some(Match::new(20, 26)));
        assert!(re.is_match("haystack with no match") == false);
    }

    #[test]
    fn find_iter_non_overlapping() {
        let re = VerbEx::new().then("aa").compile().unwrap();
        let matches: Vec<_> = re.find_iter("aaaa aa").collect();
        assert_eq!(
            matches,
            vec![Match::new(0, 2), Match::new(2, 4), Match::new(5, 7)]
        );
    }

    #[test]
    fn find_iter_empty_match_advances() {
        let re = VerbEx::new().maybe("x").compile().unwrap();
        // One empty match per position, plus the real one over `x`.
        let matches: Vec<_> = re.find_iter("axé").collect();
        assert_eq!(
            matches,
            vec![Match::new(0, 0), Match::new(1, 2), Match::new(2, 2), Match::new(4, 4)]
        );
    }

    #[test]
    fn captures_iter_reports_groups() {
        let re = VerbEx::new()
            .begin_capture()
            .word()
            .end_capture()
            .unwrap()
            .compile()
            .unwrap();
        let hay = "one two";
        let words: Vec<_> = re
            .captures_iter(hay)
            .map(|caps| caps.group_str(hay, 1).unwrap().to_string())
            .collect();
        assert_eq!(words, vec!["one", "two"]);
    }

    #[test]
    fn step_budget_is_per_call() {
        let expr = VerbEx::new()
            .begin_capture()
            .something()
            .end_capture()
            .unwrap()
            .repeat(1, None)
            .unwrap()
            .then("!");
        let hay = "a".repeat(30);

        let tight = expr.compile_with(Config::builder().step_limit(1_000).build()).unwrap();
        assert!(tight.try_is_match(hay.as_str()).is_err());

        // A budget large enough to exhaust the search space reports a
        // plain no-match instead.
        let roomy = expr
            .compile_with(Config::builder().step_limit(usize::MAX).build())
            .unwrap();
        assert!(matches!(roomy.try_is_match("aaa!x"), Ok(true)));
    }

    #[test]
    fn same_regex_is_reusable() {
        let re = VerbEx::new().then("a").compile().unwrap();
        assert!(re.is_match("cat"));
        assert!(re.is_match("dog") == false);
        assert!(re.is_match("cat"));
        let clone = re.clone();
        assert!(clone.is_match("bar"));
    }
}
