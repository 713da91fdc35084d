/*!
The backtracking executor.

A single attempt runs the compiled program against the haystack from one
start offset, with an explicit stack of continuation frames instead of
recursion. Every `Split` pushes the untried branch; every `Save` pushes a
restore frame so capture slots rewind correctly on backtrack.

Exploration is bounded: one budget unit is charged per executed
instruction, and exhausting the budget aborts the whole search call with a
recoverable [`MatchError`] instead of hanging on pathological patterns.
The budget is cooperative and checked synchronously, so an aborted search
never leaves shared state behind; all scratch space lives in a per-call
[`Cache`].
*/

use std::fmt;

use bon::Builder;

use crate::{
    compile::{Inst, Program},
    syntax::{is_word_char, simple_fold, Flags, Look},
};

/// Matcher configuration.
///
/// ```
/// use verbex::vm::Config;
///
/// let config = Config::builder().step_limit(10_000).build();
/// assert_eq!(config.step_limit(), 10_000);
/// ```
#[derive(Builder, Clone, Copy, Debug)]
pub struct Config {
    /// Maximum number of instructions one search call may execute, across
    /// all candidate start positions. Exceeding it yields a
    /// [`MatchError`] with [`MatchErrorKind::StepLimitExceeded`].
    #[builder(default = Config::DEFAULT_STEP_LIMIT)]
    step_limit: usize,
}

impl Config {
    pub const DEFAULT_STEP_LIMIT: usize = 1 << 20;

    pub fn step_limit(&self) -> usize {
        self.step_limit
    }
}

impl Default for Config {
    fn default() -> Config {
        Config::builder().build()
    }
}

/// An error that can occur during a search.
///
/// A failed match is not an error; the only failure mode of this engine is
/// exceeding the configured step budget. The error is recoverable: retry
/// with a larger [`Config::step_limit`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchError {
    kind: MatchErrorKind,
}

#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchErrorKind {
    /// The search gave up after charging `limit` instruction steps.
    StepLimitExceeded { limit: usize },
}

impl MatchError {
    pub fn step_limit_exceeded(limit: usize) -> MatchError {
        MatchError { kind: MatchErrorKind::StepLimitExceeded { limit } }
    }

    pub fn kind(&self) -> &MatchErrorKind {
        &self.kind
    }
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MatchErrorKind::StepLimitExceeded { limit } => {
                write!(f, "backtracking gave up after exceeding the step limit of {limit}")
            }
        }
    }
}

impl std::error::Error for MatchError {}

/// Scratch space for one search call: the backtrack stack and the capture
/// slot table. Allocated per call and exclusively owned by it, which is
/// what makes one compiled program safely usable from many threads.
#[derive(Clone, Debug)]
pub(crate) struct Cache {
    stack: Vec<Frame>,
    pub(crate) slots: Vec<Option<usize>>,
}

impl Cache {
    pub(crate) fn new(program: &Program) -> Cache {
        Cache {
            stack: Vec::new(),
            slots: vec![None; program.slot_count()],
        }
    }

    fn reset(&mut self) {
        self.stack.clear();
        self.slots.fill(None);
    }
}

#[derive(Clone, Copy, Debug)]
enum Frame {
    /// Resume execution at `pc` with the haystack at `at`.
    Step { pc: usize, at: usize },
    /// Undo a capture slot write on the way back.
    RestoreCapture { slot: usize, offset: Option<usize> },
}

/// Run one anchored attempt of `program` against `haystack` at `start`.
///
/// On success the capture slots in `cache` hold the match. `steps` is the
/// remaining budget, shared across attempts of the same search call;
/// `limit` is the configured total, reported when the budget runs out.
pub(crate) fn backtrack(
    program: &Program,
    haystack: &str,
    start: usize,
    cache: &mut Cache,
    steps: &mut usize,
    limit: usize,
) -> Result<bool, MatchError> {
    let flags = program.flags();
    cache.reset();
    cache.stack.push(Frame::Step { pc: 0, at: start });

    while let Some(frame) = cache.stack.pop() {
        let (mut pc, mut at) = match frame {
            Frame::RestoreCapture { slot, offset } => {
                cache.slots[slot] = offset;
                continue;
            }
            Frame::Step { pc, at } => (pc, at),
        };
        // One thread of execution; falls back to the stack on failure.
        loop {
            if *steps == 0 {
                return Err(MatchError::step_limit_exceeded(limit));
            }
            *steps -= 1;
            match &program.insts[pc] {
                Inst::Char(want) => match next_char(haystack, at) {
                    Some(have) if char_eq(have, *want, flags) => {
                        at += have.len_utf8();
                        pc += 1;
                    }
                    _ => break,
                },
                Inst::Class(set) => match next_char(haystack, at) {
                    Some(have) if set.matches(have, flags) => {
                        at += have.len_utf8();
                        pc += 1;
                    }
                    _ => break,
                },
                Inst::Any => match next_char(haystack, at) {
                    Some(have) if have != '\n' || flags.contains(Flags::DOT_MATCHES_NEWLINE) => {
                        at += have.len_utf8();
                        pc += 1;
                    }
                    _ => break,
                },
                Inst::Split { primary, secondary } => {
                    cache.stack.push(Frame::Step { pc: *secondary, at });
                    pc = *primary;
                }
                Inst::Jump(target) => pc = *target,
                Inst::Save(slot) => {
                    cache.stack.push(Frame::RestoreCapture {
                        slot: *slot,
                        offset: cache.slots[*slot],
                    });
                    cache.slots[*slot] = Some(at);
                    pc += 1;
                }
                Inst::Look(look) => {
                    if look_matches(*look, haystack, at, flags) {
                        pc += 1;
                    } else {
                        break;
                    }
                }
                Inst::Match => return Ok(true),
            }
        }
    }
    Ok(false)
}

fn next_char(haystack: &str, at: usize) -> Option<char> {
    haystack[at..].chars().next()
}

fn char_eq(have: char, want: char, flags: Flags) -> bool {
    have == want
        || (flags.contains(Flags::IGNORE_CASE) && simple_fold(have) == simple_fold(want))
}

pub(crate) fn look_matches(look: Look, haystack: &str, at: usize, flags: Flags) -> bool {
    match look {
        Look::Start => {
            at == 0
                || (flags.contains(Flags::MULTI_LINE) && haystack.as_bytes()[at - 1] == b'\n')
        }
        Look::End => {
            at == haystack.len()
                || (flags.contains(Flags::MULTI_LINE) && haystack.as_bytes()[at] == b'\n')
        }
        Look::WordBoundary => {
            let before = haystack[..at]
                .chars()
                .next_back()
                .is_some_and(|c| is_word_char(c, flags));
            let after = haystack[at..]
                .chars()
                .next()
                .is_some_and(|c| is_word_char(c, flags));
            before != after
        }
    }
}
