/*!
Lowering of a pattern [`Ast`](crate::syntax::Ast) into an executable
instruction [`Program`].

The emitter is a recursive descent over the tree. Alternation and
repetition compile to `Split`/`Jump` pairs whose branch order is the single
authoritative backtracking-preference rule: the branch stored in
`Split::primary` is tried first, so a greedy repetition puts its body there
and a lazy one puts the exit there.
*/

use std::fmt;

use itertools::Itertools;

use crate::syntax::{Ast, ClassItem, ClassSet, Flags, Look};

/// One matching instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Inst {
    /// Match a single character, honoring `IGNORE_CASE`.
    Char(char),
    /// Match one character against a class.
    Class(ClassSet),
    /// Match any character (`\n` only under `DOT_MATCHES_NEWLINE`).
    Any,
    /// Try `primary` first; on failure resume at `secondary`.
    Split { primary: usize, secondary: usize },
    Jump(usize),
    /// Record the current offset in a capture slot.
    Save(usize),
    /// Zero-width assertion.
    Look(Look),
    /// Overall success.
    Match,
}

/// A compiled pattern: the instruction list plus everything the matcher
/// needs to run it.
#[derive(Clone, Debug)]
pub struct Program {
    pub(crate) insts: Vec<Inst>,
    pub(crate) flags: Flags,
    /// Capture groups, excluding the implicit group 0.
    pub(crate) group_count: u32,
    /// Mandatory literal text at the start of every match, if any.
    /// Drives the memmem prefilter.
    pub(crate) prefix: Option<String>,
    /// Whether every match must begin with a `Look::Start` assertion.
    pub(crate) anchored_start: bool,
}

impl Program {
    pub(crate) fn slot_count(&self) -> usize {
        2 * (self.group_count as usize + 1)
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn group_count(&self) -> u32 {
        self.group_count
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.insts
                .iter()
                .enumerate()
                .format_with("\n", |(pc, inst), g| g(&format_args!("{pc:04}: {inst:?}")))
        )
    }
}

/// An error produced while assembling or compiling a pattern.
///
/// The kind distinguishes build-time misuse of the builder (unbalanced
/// captures) from compile-time rejection of a malformed tree (inverted
/// repetition or class bounds, unknown modifiers).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternError {
    kind: PatternErrorKind,
}

#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatternErrorKind {
    /// `end_capture` without a matching `begin_capture`.
    UnbalancedCapture,
    /// `begin_capture` never closed before compiling.
    UnclosedCapture,
    /// A repetition applied to nothing.
    DanglingRepetition,
    /// `min > max`.
    InvalidRepetition { min: u32, max: u32 },
    /// A class range with inverted bounds.
    InvalidClassRange { start: char, end: char },
    /// A modifier character outside the recognized set.
    UnknownModifier { modifier: char },
}

impl PatternError {
    pub fn kind(&self) -> &PatternErrorKind {
        &self.kind
    }

    pub(crate) fn unbalanced_capture() -> PatternError {
        PatternError { kind: PatternErrorKind::UnbalancedCapture }
    }

    pub(crate) fn unclosed_capture() -> PatternError {
        PatternError { kind: PatternErrorKind::UnclosedCapture }
    }

    pub(crate) fn dangling_repetition() -> PatternError {
        PatternError { kind: PatternErrorKind::DanglingRepetition }
    }

    pub(crate) fn invalid_repetition(min: u32, max: u32) -> PatternError {
        PatternError { kind: PatternErrorKind::InvalidRepetition { min, max } }
    }

    pub(crate) fn invalid_class_range(start: char, end: char) -> PatternError {
        PatternError { kind: PatternErrorKind::InvalidClassRange { start, end } }
    }

    pub(crate) fn unknown_modifier(modifier: char) -> PatternError {
        PatternError { kind: PatternErrorKind::UnknownModifier { modifier } }
    }
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PatternErrorKind::UnbalancedCapture => {
                write!(f, "end_capture called without a matching begin_capture")
            }
            PatternErrorKind::UnclosedCapture => {
                write!(f, "begin_capture was never closed by end_capture")
            }
            PatternErrorKind::DanglingRepetition => {
                write!(f, "repetition applied to an empty pattern")
            }
            PatternErrorKind::InvalidRepetition { min, max } => {
                write!(f, "invalid repetition bounds: min {min} exceeds max {max}")
            }
            PatternErrorKind::InvalidClassRange { start, end } => {
                write!(f, "invalid class range: {start:?}-{end:?}")
            }
            PatternErrorKind::UnknownModifier { modifier } => {
                write!(f, "unrecognized modifier {modifier:?}")
            }
        }
    }
}

impl std::error::Error for PatternError {}

/// Compile `ast` under `flags` into a [`Program`].
pub fn compile(ast: &Ast, flags: Flags) -> Result<Program, PatternError> {
    let mut c = Compiler { insts: Vec::new(), group_count: 0 };
    if flags.contains(Flags::LITERAL) {
        // Verbatim mode: the rendered pattern text is the pattern.
        let text = ast.to_regex();
        c.push(Inst::Save(0));
        for ch in text.chars() {
            c.push(Inst::Char(ch));
        }
        c.push(Inst::Save(1));
        c.push(Inst::Match);
        let prefix = (!flags.contains(Flags::IGNORE_CASE) && !text.is_empty()).then_some(text);
        let program = Program {
            insts: c.insts,
            flags,
            group_count: 0,
            prefix,
            anchored_start: false,
        };
        log::trace!("compiled literal program:\n{program}");
        return Ok(program);
    }

    c.push(Inst::Save(0));
    c.emit(ast)?;
    c.push(Inst::Save(1));
    c.push(Inst::Match);

    let anchored_start = matches!(
        c.insts.iter().find(|inst| !matches!(inst, Inst::Save(_))),
        Some(Inst::Look(Look::Start))
    );
    let prefix = if flags.contains(Flags::IGNORE_CASE) {
        None
    } else {
        literal_prefix(ast)
    };
    let program = Program {
        insts: c.insts,
        flags,
        group_count: c.group_count,
        prefix,
        anchored_start,
    };
    log::trace!("compiled program:\n{program}");
    Ok(program)
}

struct Compiler {
    insts: Vec<Inst>,
    group_count: u32,
}

impl Compiler {
    fn push(&mut self, inst: Inst) -> usize {
        self.insts.push(inst);
        self.insts.len() - 1
    }

    fn next_pc(&self) -> usize {
        self.insts.len()
    }

    fn patch_split(&mut self, pc: usize, primary: usize, secondary: usize) {
        self.insts[pc] = Inst::Split { primary, secondary };
    }

    fn emit(&mut self, ast: &Ast) -> Result<(), PatternError> {
        match ast {
            Ast::Empty => {}
            Ast::Literal(s) => {
                for ch in s.chars() {
                    self.push(Inst::Char(ch));
                }
            }
            Ast::Class(set) => {
                validate_class(set)?;
                self.push(Inst::Class(set.clone()));
            }
            Ast::Any => {
                self.push(Inst::Any);
            }
            Ast::Concat(asts) => {
                for ast in asts {
                    self.emit(ast)?;
                }
            }
            Ast::Alternation(branches) => self.emit_alternation(branches)?,
            Ast::Repeat { ast, min, max, greedy } => self.emit_repeat(ast, *min, *max, *greedy)?,
            Ast::Group { ast, capture } => match capture {
                Some(index) => {
                    self.group_count = self.group_count.max(*index);
                    self.push(Inst::Save(2 * *index as usize));
                    self.emit(ast)?;
                    self.push(Inst::Save(2 * *index as usize + 1));
                }
                None => self.emit(ast)?,
            },
            Ast::Look(look) => {
                self.push(Inst::Look(*look));
            }
        }
        Ok(())
    }

    fn emit_alternation(&mut self, branches: &[Ast]) -> Result<(), PatternError> {
        let mut jumps = Vec::with_capacity(branches.len().saturating_sub(1));
        for (i, branch) in branches.iter().enumerate() {
            if i + 1 == branches.len() {
                self.emit(branch)?;
            } else {
                let split = self.push(Inst::Jump(0));
                self.emit(branch)?;
                jumps.push(self.push(Inst::Jump(0)));
                let next = self.next_pc();
                self.patch_split(split, split + 1, next);
            }
        }
        let end = self.next_pc();
        for jump in jumps {
            self.insts[jump] = Inst::Jump(end);
        }
        Ok(())
    }

    fn emit_repeat(
        &mut self,
        ast: &Ast,
        min: u32,
        max: Option<u32>,
        greedy: bool,
    ) -> Result<(), PatternError> {
        if let Some(max) = max {
            if max < min {
                return Err(PatternError::invalid_repetition(min, max));
            }
        }
        for _ in 0..min {
            self.emit(ast)?;
        }
        match max {
            Some(max) => {
                // `max - min` optional copies, each with its own exit.
                let mut splits = Vec::with_capacity((max - min) as usize);
                for _ in min..max {
                    splits.push(self.push(Inst::Jump(0)));
                    self.emit(ast)?;
                }
                let end = self.next_pc();
                for split in splits {
                    if greedy {
                        self.patch_split(split, split + 1, end);
                    } else {
                        self.patch_split(split, end, split + 1);
                    }
                }
            }
            None => {
                let split = self.push(Inst::Jump(0));
                self.emit(ast)?;
                self.push(Inst::Jump(split));
                let end = self.next_pc();
                if greedy {
                    self.patch_split(split, split + 1, end);
                } else {
                    self.patch_split(split, end, split + 1);
                }
            }
        }
        Ok(())
    }
}

fn validate_class(set: &ClassSet) -> Result<(), PatternError> {
    for item in &set.items {
        if let ClassItem::Range(lo, hi) = *item {
            if hi < lo {
                return Err(PatternError::invalid_class_range(lo, hi));
            }
        }
    }
    Ok(())
}

/// The longest literal text every match must start with, if any.
fn literal_prefix(ast: &Ast) -> Option<String> {
    let mut out = String::new();
    collect_prefix(ast, &mut out);
    (!out.is_empty()).then_some(out)
}

/// Append to `out` while the front of `ast` is mandatory literal text.
/// Returns `false` once scanning must stop.
fn collect_prefix(ast: &Ast, out: &mut String) -> bool {
    match ast {
        Ast::Empty | Ast::Look(Look::Start) => true,
        Ast::Literal(s) => {
            out.push_str(s);
            true
        }
        Ast::Group { ast, .. } => collect_prefix(ast, out),
        Ast::Concat(asts) => asts.iter().all(|ast| collect_prefix(ast, out)),
        Ast::Repeat { ast, min, .. } if *min >= 1 => {
            // One copy is mandatory; nothing after it is certain.
            collect_prefix(ast, out);
            false
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::ClassSet;

    fn lit(s: &str) -> Ast {
        Ast::Literal(s.into())
    }

    #[test]
    fn literal_chain() {
        let program = compile(&lit("ab"), Flags::default()).unwrap();
        assert_eq!(
            program.insts,
            vec![
                Inst::Save(0),
                Inst::Char('a'),
                Inst::Char('b'),
                Inst::Save(1),
                Inst::Match,
            ]
        );
        assert_eq!(program.prefix.as_deref(), Some("ab"));
        assert!(program.anchored_start == false);
    }

    #[test]
    fn greedy_star_loop() {
        // a* => 1: Split{2, 4}; 2: 'a'; 3: Jump(1); 4: Save(1)
        let program = compile(&Ast::repeat(lit("a"), 0, None), Flags::default()).unwrap();
        assert_eq!(
            program.insts,
            vec![
                Inst::Save(0),
                Inst::Split { primary: 2, secondary: 4 },
                Inst::Char('a'),
                Inst::Jump(1),
                Inst::Save(1),
                Inst::Match,
            ]
        );
    }

    #[test]
    fn lazy_star_prefers_exit() {
        let mut ast = Ast::repeat(lit("a"), 0, None);
        if let Ast::Repeat { greedy, .. } = &mut ast {
            *greedy = false;
        }
        let program = compile(&ast, Flags::default()).unwrap();
        assert_eq!(program.insts[1], Inst::Split { primary: 4, secondary: 2 });
    }

    #[test]
    fn bounded_repeat_unrolls() {
        // a{1,3}: one mandatory copy, two optional ones.
        let program = compile(&Ast::repeat(lit("a"), 1, Some(3)), Flags::default()).unwrap();
        let chars = program
            .insts
            .iter()
            .filter(|i| matches!(i, Inst::Char('a')))
            .count();
        assert_eq!(chars, 3);
        let splits = program
            .insts
            .iter()
            .filter(|i| matches!(i, Inst::Split { .. }))
            .count();
        assert_eq!(splits, 2);
    }

    #[test]
    fn alternation_branch_order() {
        let ast = Ast::Alternation(vec![lit("a"), lit("b"), lit("c")]);
        let program = compile(&ast, Flags::default()).unwrap();
        // First split must try the first branch first.
        let &Inst::Split { primary, secondary } = &program.insts[1] else {
            panic!("expected split, got {:?}", program.insts[1]);
        };
        assert_eq!(primary, 2);
        assert!(secondary > primary);
    }

    #[test]
    fn capture_slots_bracket_group_body() {
        let ast = Ast::concat(vec![lit("a"), Ast::capture(1, lit("b")), lit("c")]);
        let program = compile(&ast, Flags::default()).unwrap();
        assert_eq!(program.group_count, 1);
        assert_eq!(program.slot_count(), 4);
        assert_eq!(
            program.insts,
            vec![
                Inst::Save(0),
                Inst::Char('a'),
                Inst::Save(2),
                Inst::Char('b'),
                Inst::Save(3),
                Inst::Char('c'),
                Inst::Save(1),
                Inst::Match,
            ]
        );
    }

    #[test]
    fn rejects_inverted_bounds() {
        let err = compile(&Ast::repeat(lit("a"), 3, Some(2)), Flags::default()).unwrap_err();
        assert_eq!(*err.kind(), PatternErrorKind::InvalidRepetition { min: 3, max: 2 });

        let class = Ast::Class(ClassSet::ranges(&[('z', 'a')]));
        let err = compile(&class, Flags::default()).unwrap_err();
        assert_eq!(*err.kind(), PatternErrorKind::InvalidClassRange { start: 'z', end: 'a' });
    }

    #[test]
    fn prefix_extraction() {
        // http s? ://  => mandatory "http"
        let ast = Ast::concat(vec![
            Ast::group(lit("http")),
            Ast::repeat(Ast::group(lit("s")), 0, Some(1)),
            Ast::group(lit("://")),
        ]);
        let program = compile(&ast, Flags::default()).unwrap();
        assert_eq!(program.prefix.as_deref(), Some("http"));

        // Case folding defeats the prefilter.
        let program = compile(&ast, Flags::default() | Flags::IGNORE_CASE).unwrap();
        assert_eq!(program.prefix, None);

        // A leading anchor is transparent.
        let ast = Ast::concat(vec![Ast::Look(Look::Start), Ast::group(lit("ab"))]);
        let program = compile(&ast, Flags::default()).unwrap();
        assert_eq!(program.prefix.as_deref(), Some("ab"));
        assert!(program.anchored_start);

        // A mandatory repetition contributes one copy, then stops.
        let ast = Ast::concat(vec![Ast::repeat(lit("ab"), 1, None), lit("cd")]);
        let program = compile(&ast, Flags::default()).unwrap();
        assert_eq!(program.prefix.as_deref(), Some("ab"));
    }

    #[test]
    fn literal_mode_matches_rendered_text() {
        let ast = Ast::group(lit("a.b"));
        let program = compile(&ast, Flags::default() | Flags::LITERAL).unwrap();
        // The rendered text `(?:a\.b)` itself becomes the pattern.
        let chars: String = program
            .insts
            .iter()
            .filter_map(|i| match i {
                Inst::Char(c) => Some(*c),
                _ => None,
            })
            .collect();
        assert_eq!(chars, r"(?:a\.b)");
    }

    #[test]
    fn display_lists_instructions() {
        let program = compile(&lit("ab"), Flags::default()).unwrap();
        let text = program.to_string();
        assert!(text.contains("0000: Save(0)"));
        assert!(text.contains("0001: Char('a')"));
    }
}
