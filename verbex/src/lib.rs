/*!
A fluent, verbal-expression-style pattern builder backed by a small,
self-contained backtracking regex engine.

## Features
- A chainable, immutable [`VerbEx`] builder: `then`, `maybe`, `or`,
  `any_of`, captures, anchors, modifiers. Every call returns a new value,
  so chains can be forked freely and shared across threads.
- An in-process engine: patterns compile to an instruction program and run
  on a backtracking VM with leftmost-first, greedy-by-default semantics.
  No host regex engine is involved.
- A step budget bounds worst-case backtracking: pathological patterns
  report a recoverable [`MatchError`] instead of hanging.
- Replacement with `$N` templates or verbatim text, lazy `find_all`
  iteration, and capture groups with absent-vs-empty distinction.
- [`VerbEx::pattern`] renders the equivalent pattern in standard regex
  syntax for debugging and for cross-checking against other engines.
*/
//! ## Usage
//! ```
//! use verbex::VerbEx;
//!
//! let expr = VerbEx::new()
//!     .start_of_line(true)
//!     .then("http")
//!     .maybe("s")
//!     .then("://")
//!     .maybe("www.")
//!     .anything_but(" ")
//!     .end_of_line(true);
//! assert!(expr.test("https://www.google.com")?);
//! assert!(expr.test("http://goo gle.com")? == false);
//! # Ok::<(), verbex::Error>(())
//! ```
/*!
## Captures and replacement
```
use verbex::VerbEx;

let re = VerbEx::new()
    .begin_capture()
    .word()
    .end_capture()?
    .then("@")
    .begin_capture()
    .word()
    .end_capture()?
    .compile()?;

let hay = "mail me: user@host";
let caps = re.captures(hay).unwrap();
assert_eq!(caps.group_str(hay, 1), Some("user"));
assert_eq!(caps.group_str(hay, 2), Some("host"));
assert_eq!(re.replace_all(hay, &"$2".into()), "mail me: host");
# Ok::<(), verbex::Error>(())
```

## Bounded backtracking
Compile with an explicit [`vm::Config`] to size the step budget, and use
the `try_*` search methods to observe exhaustion:
```
use verbex::{vm::Config, VerbEx};

let re = VerbEx::new()
    .something()
    .repeat(1, None)?
    .then("!")
    .compile_with(Config::builder().step_limit(10_000).build())?;
assert!(re.try_is_match("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").is_err());
# Ok::<(), verbex::Error>(())
```
*/

pub mod builder;
pub mod compile;
pub mod matcher;
pub mod replace;
pub mod syntax;
pub mod vm;

pub use builder::{FindAll, VerbEx};
pub use compile::{PatternError, PatternErrorKind};
pub use matcher::{Captures, Input, Match, Regex};
pub use replace::Template;
pub use vm::{MatchError, MatchErrorKind};

/// Start a new, empty [`VerbEx`] chain.
pub fn verbex() -> VerbEx {
    VerbEx::new()
}

/// Any error this crate can produce: a malformed pattern or a search that
/// exceeded its step budget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    Pattern(PatternError),
    Match(MatchError),
}

impl From<PatternError> for Error {
    fn from(err: PatternError) -> Error {
        Error::Pattern(err)
    }
}

impl From<MatchError> for Error {
    fn from(err: MatchError) -> Error {
        Error::Match(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Pattern(err) => err.fmt(f),
            Error::Match(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Pattern(err) => Some(err),
            Error::Match(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{verbex, VerbEx};

    #[test]
    fn url() {
        let expr = VerbEx::new()
            .start_of_line(true)
            .then("http")
            .maybe("s")
            .then("://")
            .maybe("www.")
            .anything_but(" ")
            .end_of_line(true);

        assert!(expr.test("http://google.com").unwrap());
        assert!(expr.test("https://www.google.com").unwrap());
        assert!(expr.test("ws://google.com").unwrap() == false);
        assert!(expr.test("http://goo gle.com").unwrap() == false);
    }

    #[test]
    fn hello() {
        assert_eq!(
            verbex().find("a").replace_with("hallo", "e").unwrap(),
            "hello"
        );
    }

    #[test]
    fn replacement_round_trip() {
        // "ab" -> strip the "a" -> put it back.
        let strip = VerbEx::new()
            .then("a")
            .begin_capture()
            .then("b")
            .end_capture()
            .unwrap();
        let stripped = strip.replace("ab", "$1").unwrap();
        assert_eq!(stripped, "b");

        let restore = VerbEx::new().begin_capture().then("b").end_capture().unwrap();
        assert_eq!(restore.replace(&stripped, "a$1").unwrap(), "ab");
    }

    #[test]
    fn pattern_text_agrees_with_the_regex_crate() {
        let expr = VerbEx::new()
            .start_of_line(true)
            .then("http")
            .maybe("s")
            .then("://")
            .maybe("www.")
            .anything_but(" ")
            .end_of_line(true);
        let oracle = regex::RegexBuilder::new(&expr.pattern())
            .multi_line(true)
            .build()
            .unwrap();
        for hay in [
            "http://google.com",
            "https://www.google.com",
            "ws://google.com",
            "http://goo gle.com",
            "prefix https://www.google.com",
        ] {
            assert_eq!(expr.test(hay).unwrap(), oracle.is_match(hay), "{hay:?}");
        }
    }

    #[test]
    fn capture_extents_agree_with_the_regex_crate() {
        let expr = VerbEx::new()
            .begin_capture()
            .word()
            .end_capture()
            .unwrap()
            .then("-")
            .begin_capture()
            .digit()
            .end_capture()
            .unwrap();
        let oracle = regex::RegexBuilder::new(&expr.pattern())
            .multi_line(true)
            .build()
            .unwrap();
        let re = expr.compile().unwrap();
        for hay in ["abc-1", "xx a9-5 yy", "no match here", "-3"] {
            let ours = re.captures(hay);
            let theirs = oracle.captures(hay);
            match (ours, theirs) {
                (None, None) => {}
                (Some(ours), Some(theirs)) => {
                    for i in 0..=2u32 {
                        assert_eq!(
                            ours.get_group(i).map(|m| m.range()),
                            theirs.get(i as usize).map(|m| m.range()),
                            "{hay:?} group {i}"
                        );
                    }
                }
                (ours, theirs) => panic!("{hay:?}: ours {ours:?} vs oracle {theirs:?}"),
            }
        }
    }

    #[test]
    fn escaped_literals_agree_with_the_regex_crate() {
        for text in ["a.b", "1+1=2", "[x](y)", "c:\\path\\{x}", "$^|?*"] {
            let expr = VerbEx::new().then(text);
            let oracle = regex::Regex::new(&expr.pattern()).unwrap();
            assert!(expr.test(text).unwrap());
            assert!(oracle.is_match(text));
            assert_eq!(
                expr.test("something else entirely").unwrap(),
                oracle.is_match("something else entirely"),
            );
        }
    }
}
