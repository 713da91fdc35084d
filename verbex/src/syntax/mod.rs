/*!
The pattern tree assembled by the [`VerbEx`](crate::builder::VerbEx) builder,
plus the modifier flags and the rendering of a tree back to standard regex
syntax.

The tree is the single source of truth for a pattern: the
[compiler](crate::compile) lowers it to an instruction program, and
[`Ast::to_regex`] renders it to a regex string that other engines accept,
which is how `pattern()` output can be cross-checked against them.
*/

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Modifier flags attached to a pattern.
    ///
    /// `MULTI_LINE` is on by default: line anchors match at line boundaries
    /// until `search_one_line(true)` removes it.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Flags: u8 {
        /// `i`: case-insensitive literal and class comparisons.
        const IGNORE_CASE = 1 << 0;
        /// `m`: `^`/`$` also match after/before `\n`.
        const MULTI_LINE = 1 << 1;
        /// `s`: `.` also matches `\n`.
        const DOT_MATCHES_NEWLINE = 1 << 2;
        /// `u`: word characters are Unicode alphanumerics instead of ASCII.
        const UNICODE_WORD = 1 << 3;
        /// `U`: the rendered pattern text is matched verbatim.
        const LITERAL = 1 << 4;
    }
}

impl Default for Flags {
    fn default() -> Flags {
        Flags::MULTI_LINE
    }
}

/// The closed set of recognized modifiers.
///
/// Unknown modifier characters are rejected with a
/// [`PatternError`](crate::compile::PatternError) at the API boundary
/// instead of aborting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Modifier {
    /// `i`
    IgnoreCase,
    /// `m`
    MultiLine,
    /// `s`
    DotMatchesNewline,
    /// `u`
    UnicodeWord,
    /// `U`
    Literal,
}

impl Modifier {
    pub fn from_char(c: char) -> Option<Modifier> {
        match c {
            'i' => Some(Modifier::IgnoreCase),
            'm' => Some(Modifier::MultiLine),
            's' => Some(Modifier::DotMatchesNewline),
            'u' => Some(Modifier::UnicodeWord),
            'U' => Some(Modifier::Literal),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Modifier::IgnoreCase => 'i',
            Modifier::MultiLine => 'm',
            Modifier::DotMatchesNewline => 's',
            Modifier::UnicodeWord => 'u',
            Modifier::Literal => 'U',
        }
    }

    pub fn flag(self) -> Flags {
        match self {
            Modifier::IgnoreCase => Flags::IGNORE_CASE,
            Modifier::MultiLine => Flags::MULTI_LINE,
            Modifier::DotMatchesNewline => Flags::DOT_MATCHES_NEWLINE,
            Modifier::UnicodeWord => Flags::UNICODE_WORD,
            Modifier::Literal => Flags::LITERAL,
        }
    }
}

/// A zero-width assertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Look {
    /// `^`: offset 0, or after `\n` under `MULTI_LINE`.
    Start,
    /// `$`: end of haystack, or before `\n` under `MULTI_LINE`.
    End,
    /// `\b`: a word/non-word transition.
    WordBoundary,
}

/// One member of a character class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassItem {
    Char(char),
    Range(char, char),
    /// `\w`
    Word,
    /// `\d`
    Digit,
}

/// A character class: a set of [`ClassItem`]s, possibly negated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassSet {
    pub(crate) items: Vec<ClassItem>,
    pub(crate) negated: bool,
}

impl ClassSet {
    /// A class matching exactly the characters of `chars`, verbatim.
    pub fn chars(chars: &str) -> ClassSet {
        ClassSet {
            items: chars.chars().map(ClassItem::Char).collect(),
            negated: false,
        }
    }

    /// A class matching any character within one of the given ranges,
    /// bounds inclusive. Inverted bounds are rejected at compile time.
    pub fn ranges(ranges: &[(char, char)]) -> ClassSet {
        ClassSet {
            items: ranges.iter().map(|&(lo, hi)| ClassItem::Range(lo, hi)).collect(),
            negated: false,
        }
    }

    pub fn word() -> ClassSet {
        ClassSet { items: vec![ClassItem::Word], negated: false }
    }

    pub fn digit() -> ClassSet {
        ClassSet { items: vec![ClassItem::Digit], negated: false }
    }

    pub fn negate(mut self) -> ClassSet {
        self.negated = !self.negated;
        self
    }

    /// Whether `c` is a member, honoring `IGNORE_CASE` and `UNICODE_WORD`.
    pub(crate) fn matches(&self, c: char, flags: Flags) -> bool {
        let fold = flags.contains(Flags::IGNORE_CASE);
        let hit = self.items.iter().any(|item| {
            match *item {
                ClassItem::Char(m) => c == m || (fold && simple_fold(c) == simple_fold(m)),
                ClassItem::Range(lo, hi) => {
                    (lo <= c && c <= hi) || {
                        let f = simple_fold(c);
                        fold && lo <= f && f <= hi
                    }
                }
                ClassItem::Word => is_word_char(c, flags),
                ClassItem::Digit => c.is_ascii_digit(),
            }
        });
        hit != self.negated
    }

    fn write_regex(&self, out: &mut String) {
        // A lone `\w`/`\d` renders bare instead of bracketed.
        if !self.negated {
            match self.items.as_slice() {
                [ClassItem::Word] => return out.push_str(r"\w"),
                [ClassItem::Digit] => return out.push_str(r"\d"),
                _ => {}
            }
        }
        out.push('[');
        if self.negated {
            out.push('^');
        }
        for item in &self.items {
            match *item {
                ClassItem::Char(c) => escape_class_char(c, out),
                ClassItem::Range(lo, hi) => {
                    escape_class_char(lo, out);
                    out.push('-');
                    escape_class_char(hi, out);
                }
                ClassItem::Word => out.push_str(r"\w"),
                ClassItem::Digit => out.push_str(r"\d"),
            }
        }
        out.push(']');
    }
}

/// The pattern tree.
///
/// Acyclic by construction; capture indices are assigned left-to-right by
/// open order, starting at 1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ast {
    Empty,
    /// A literal character sequence, matched verbatim (escaped on render).
    Literal(String),
    Class(ClassSet),
    /// `.`: any character, `\n` only under `DOT_MATCHES_NEWLINE`.
    Any,
    Concat(Vec<Ast>),
    Alternation(Vec<Ast>),
    Repeat {
        ast: Box<Ast>,
        min: u32,
        max: Option<u32>,
        greedy: bool,
    },
    Group {
        ast: Box<Ast>,
        /// `Some(i)` for capture group `i`, `None` for `(?:…)`.
        capture: Option<u32>,
    },
    Look(Look),
}

impl Ast {
    /// A concatenation, flattening the trivial cases.
    pub fn concat(mut asts: Vec<Ast>) -> Ast {
        asts.retain(|a| !matches!(a, Ast::Empty));
        match asts.len() {
            0 => Ast::Empty,
            1 => asts.pop().unwrap(),
            _ => Ast::Concat(asts),
        }
    }

    pub fn group(ast: Ast) -> Ast {
        Ast::Group { ast: Box::new(ast), capture: None }
    }

    pub fn capture(index: u32, ast: Ast) -> Ast {
        Ast::Group { ast: Box::new(ast), capture: Some(index) }
    }

    pub fn repeat(ast: Ast, min: u32, max: Option<u32>) -> Ast {
        Ast::Repeat { ast: Box::new(ast), min, max, greedy: true }
    }

    /// Render to standard regex syntax.
    pub fn to_regex(&self) -> String {
        let mut out = String::new();
        self.write_regex(&mut out);
        out
    }

    fn write_regex(&self, out: &mut String) {
        match self {
            Ast::Empty => {}
            Ast::Literal(s) => {
                for c in s.chars() {
                    escape_char(c, out);
                }
            }
            Ast::Class(set) => set.write_regex(out),
            Ast::Any => out.push('.'),
            Ast::Concat(asts) => {
                for ast in asts {
                    // Alternation binds looser than concatenation.
                    if matches!(ast, Ast::Alternation(_)) {
                        out.push_str("(?:");
                        ast.write_regex(out);
                        out.push(')');
                    } else {
                        ast.write_regex(out);
                    }
                }
            }
            Ast::Alternation(branches) => {
                for (i, branch) in branches.iter().enumerate() {
                    if i > 0 {
                        out.push('|');
                    }
                    branch.write_regex(out);
                }
            }
            Ast::Repeat { ast, min, max, greedy } => {
                if ast.needs_group_under_repeat() {
                    out.push_str("(?:");
                    ast.write_regex(out);
                    out.push(')');
                } else {
                    ast.write_regex(out);
                }
                match (*min, *max) {
                    (0, Some(1)) => out.push('?'),
                    (0, None) => out.push('*'),
                    (1, None) => out.push('+'),
                    (m, Some(n)) if m == n => out.push_str(&format!("{{{m}}}")),
                    (m, None) => out.push_str(&format!("{{{m},}}")),
                    (m, Some(n)) => out.push_str(&format!("{{{m},{n}}}")),
                }
                if !greedy {
                    out.push('?');
                }
            }
            Ast::Group { ast, capture } => {
                out.push_str(if capture.is_some() { "(" } else { "(?:" });
                ast.write_regex(out);
                out.push(')');
            }
            Ast::Look(look) => out.push_str(match look {
                Look::Start => "^",
                Look::End => "$",
                Look::WordBoundary => r"\b",
            }),
        }
    }

    fn needs_group_under_repeat(&self) -> bool {
        match self {
            Ast::Literal(s) => s.chars().count() != 1,
            Ast::Class(_) | Ast::Any | Ast::Group { .. } => false,
            _ => true,
        }
    }
}

impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_regex())
    }
}

/// Whether `c` has special meaning in regex syntax and must be escaped when
/// inserted as a literal.
pub fn is_meta_character(c: char) -> bool {
    matches!(
        c,
        '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$'
            | '#' | '&' | '-' | '~'
    )
}

/// Escape `text` so that it matches itself when handed to a regex engine.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        escape_char(c, &mut out);
    }
    out
}

fn escape_char(c: char, out: &mut String) {
    match c {
        '\n' => out.push_str(r"\n"),
        '\r' => out.push_str(r"\r"),
        '\t' => out.push_str(r"\t"),
        c if is_meta_character(c) => {
            out.push('\\');
            out.push(c);
        }
        c => out.push(c),
    }
}

fn escape_class_char(c: char, out: &mut String) {
    match c {
        '\n' => out.push_str(r"\n"),
        '\r' => out.push_str(r"\r"),
        '\t' => out.push_str(r"\t"),
        '\\' | ']' | '^' | '-' | '[' => {
            out.push('\\');
            out.push(c);
        }
        c => out.push(c),
    }
}

/// Word characters are `[0-9A-Za-z_]`, or Unicode alphanumerics plus `_`
/// under `UNICODE_WORD`.
pub(crate) fn is_word_char(c: char, flags: Flags) -> bool {
    if flags.contains(Flags::UNICODE_WORD) {
        c.is_alphanumeric() || c == '_'
    } else {
        c.is_ascii_alphanumeric() || c == '_'
    }
}

/// Simple one-to-one case folding: the first lowercase mapping of `c`.
/// Not full Unicode special-casing.
pub(crate) fn simple_fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}
