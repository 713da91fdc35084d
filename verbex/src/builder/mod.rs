/*!
The fluent pattern builder.

[`VerbEx`] assembles a pattern [`Ast`](crate::syntax::Ast) one call at a
time, in the verbal-expression style: every method consumes the builder and
returns a new value, so chains never share mutable state and a `clone()`
forks an independent chain.

```
use verbex::VerbEx;

let expr = VerbEx::new()
    .start_of_line(true)
    .then("http")
    .maybe("s")
    .then("://")
    .maybe("www.")
    .anything_but(" ")
    .end_of_line(true);

assert!(expr.test("https://www.google.com")?);
assert!(expr.test("http://goo gle.com")? == false);
assert_eq!(expr.pattern(), r"^(?:http)(?:s)?(?:://)(?:www\.)?(?:[^ ]*)$");
# Ok::<(), verbex::Error>(())
```

Text arguments are always taken verbatim: metacharacters are escaped on
render and have no meaning to the engine, so `then("a.b")` matches the
three characters `a.b` and nothing else.

Anchors are builder state rather than appended fragments, which is what
lets `start_of_line(false)` undo an earlier `start_of_line(true)` at any
point in the chain. Modifiers are an independent flag set; multiline is on
by default and [`search_one_line`](VerbEx::search_one_line) removes it.
*/

use std::fmt;

use crate::{
    compile::{self, PatternError},
    matcher::{Captures, Input, Regex},
    replace::Template,
    syntax::{Ast, ClassSet, Flags, Look, Modifier},
    vm::Config,
    Error,
};

/// An open alternation scope: completed branches plus the sequence being
/// accumulated.
#[derive(Clone, Debug, Default)]
struct Scope {
    branches: Vec<Ast>,
    seq: Vec<Ast>,
}

impl Scope {
    fn push(&mut self, ast: Ast) {
        self.seq.push(ast);
    }

    fn into_ast(self) -> Ast {
        let tail = Ast::concat(self.seq);
        if self.branches.is_empty() {
            tail
        } else {
            let mut branches = self.branches;
            branches.push(tail);
            Ast::Alternation(branches)
        }
    }
}

/// A verbal expression in progress.
///
/// See the [module docs](self) for an overview. Build one with
/// [`VerbEx::new`] (or [`verbex()`](crate::verbex)), chain pattern pieces,
/// then either [`compile`](VerbEx::compile) it into a reusable
/// [`Regex`] or use the one-shot terminal operations ([`test`](VerbEx::test),
/// [`captures`](VerbEx::captures), [`find_all`](VerbEx::find_all),
/// [`replace`](VerbEx::replace), [`replace_with`](VerbEx::replace_with)).
#[derive(Clone, Debug)]
pub struct VerbEx {
    root: Scope,
    /// Open capture groups, innermost last, each with its 1-based index.
    open: Vec<(u32, Scope)>,
    start_of_line: bool,
    end_of_line: bool,
    flags: Flags,
    next_group: u32,
}

impl Default for VerbEx {
    fn default() -> VerbEx {
        VerbEx {
            root: Scope::default(),
            open: Vec::new(),
            start_of_line: false,
            end_of_line: false,
            flags: Flags::default(),
            next_group: 1,
        }
    }
}

impl VerbEx {
    pub fn new() -> VerbEx {
        VerbEx::default()
    }

    fn scope_mut(&mut self) -> &mut Scope {
        match self.open.last_mut() {
            Some((_, scope)) => scope,
            None => &mut self.root,
        }
    }

    fn push(mut self, ast: Ast) -> VerbEx {
        self.scope_mut().push(ast);
        self
    }

    /// Anchor the match to the start of a line.
    pub fn start_of_line(mut self, enabled: bool) -> VerbEx {
        self.start_of_line = enabled;
        self
    }

    /// Anchor the match to the end of a line.
    pub fn end_of_line(mut self, enabled: bool) -> VerbEx {
        self.end_of_line = enabled;
        self
    }

    /// Match `text` literally.
    pub fn then(self, text: impl AsRef<str>) -> VerbEx {
        self.push(Ast::group(Ast::Literal(text.as_ref().to_owned())))
    }

    /// Alias for [`then`](VerbEx::then).
    pub fn find(self, text: impl AsRef<str>) -> VerbEx {
        self.then(text)
    }

    /// Optionally match `text` literally.
    pub fn maybe(self, text: impl AsRef<str>) -> VerbEx {
        self.push(Ast::repeat(
            Ast::group(Ast::Literal(text.as_ref().to_owned())),
            0,
            Some(1),
        ))
    }

    /// Match anything, including nothing.
    pub fn anything(self) -> VerbEx {
        self.push(Ast::group(Ast::repeat(Ast::Any, 0, None)))
    }

    /// Match any run (possibly empty) of characters outside `chars`.
    pub fn anything_but(self, chars: impl AsRef<str>) -> VerbEx {
        self.push(Ast::group(Ast::repeat(
            Ast::Class(ClassSet::chars(chars.as_ref()).negate()),
            0,
            None,
        )))
    }

    /// Match at least one character.
    pub fn something(self) -> VerbEx {
        self.push(Ast::group(Ast::repeat(Ast::Any, 1, None)))
    }

    /// Match a non-empty run of characters outside `chars`.
    pub fn something_but(self, chars: impl AsRef<str>) -> VerbEx {
        self.push(Ast::group(Ast::repeat(
            Ast::Class(ClassSet::chars(chars.as_ref()).negate()),
            1,
            None,
        )))
    }

    /// Match exactly one of the characters in `chars`.
    pub fn any_of(self, chars: impl AsRef<str>) -> VerbEx {
        self.push(Ast::group(Ast::Class(ClassSet::chars(chars.as_ref()))))
    }

    /// Alias for [`any_of`](VerbEx::any_of).
    pub fn any(self, chars: impl AsRef<str>) -> VerbEx {
        self.any_of(chars)
    }

    /// Match one character within the given inclusive ranges, e.g.
    /// `range(&[('a', 'z'), ('0', '9')])`. Inverted bounds are rejected
    /// when the pattern is compiled.
    pub fn range(self, ranges: &[(char, char)]) -> VerbEx {
        self.push(Ast::Class(ClassSet::ranges(ranges)))
    }

    /// Match a line break: `\n` or `\r\n`.
    pub fn line_break(self) -> VerbEx {
        self.push(Ast::group(Ast::Alternation(vec![
            Ast::group(Ast::Literal("\n".to_owned())),
            Ast::group(Ast::Literal("\r\n".to_owned())),
        ])))
    }

    /// Alias for [`line_break`](VerbEx::line_break).
    pub fn br(self) -> VerbEx {
        self.line_break()
    }

    /// Match a tab character.
    pub fn tab(self) -> VerbEx {
        self.push(Ast::Literal("\t".to_owned()))
    }

    /// Match one or more word characters (`\w+`).
    pub fn word(self) -> VerbEx {
        self.push(Ast::repeat(Ast::Class(ClassSet::word()), 1, None))
    }

    /// Assert a word boundary (`\b`) without consuming anything.
    pub fn word_boundary(self) -> VerbEx {
        self.push(Ast::Look(Look::WordBoundary))
    }

    /// Match a single decimal digit (`\d`).
    pub fn digit(self) -> VerbEx {
        self.push(Ast::Class(ClassSet::digit()))
    }

    /// Repeat the previous piece between `min` and `max` times (`None` =
    /// unbounded), greedily.
    pub fn repeat(mut self, min: u32, max: Option<u32>) -> Result<VerbEx, PatternError> {
        if let Some(max) = max {
            if max < min {
                return Err(PatternError::invalid_repetition(min, max));
            }
        }
        let scope = self.scope_mut();
        let Some(last) = scope.seq.pop() else {
            return Err(PatternError::dangling_repetition());
        };
        scope.push(Ast::repeat(last, min, max));
        Ok(self)
    }

    /// Open a capture group. Groups are numbered from 1 in opening order
    /// and may nest.
    pub fn begin_capture(mut self) -> VerbEx {
        let index = self.next_group;
        self.next_group += 1;
        self.open.push((index, Scope::default()));
        self
    }

    /// Close the innermost open capture group.
    ///
    /// Fails immediately with a [`PatternError`] (kind
    /// `UnbalancedCapture`) when no group is open.
    pub fn end_capture(mut self) -> Result<VerbEx, PatternError> {
        let Some((index, scope)) = self.open.pop() else {
            return Err(PatternError::unbalanced_capture());
        };
        let ast = Ast::capture(index, scope.into_ast());
        Ok(self.push(ast))
    }

    /// Turn the current scope into an alternation: everything accumulated
    /// so far becomes the left branch, and `text` (matched literally)
    /// starts the right branch. Applies to the innermost open capture
    /// group, so alternations nest correctly inside captures.
    pub fn or(mut self, text: impl AsRef<str>) -> VerbEx {
        let scope = self.scope_mut();
        let prior = Ast::concat(std::mem::take(&mut scope.seq));
        scope.branches.push(prior);
        self.then(text)
    }

    /// Toggle case-insensitive matching (the `i` modifier).
    pub fn with_any_case(self, enabled: bool) -> VerbEx {
        self.set_modifier(Modifier::IgnoreCase, enabled)
    }

    /// When enabled, `^`/`$` match only at the ends of the whole haystack
    /// (removes the `m` modifier, which is on by default).
    pub fn search_one_line(self, enabled: bool) -> VerbEx {
        self.set_modifier(Modifier::MultiLine, !enabled)
    }

    /// Enable a modifier by character, from the closed set `i m s u U`.
    pub fn add_modifier(self, modifier: char) -> Result<VerbEx, PatternError> {
        Modifier::from_char(modifier)
            .map(|m| self.set_modifier(m, true))
            .ok_or_else(|| PatternError::unknown_modifier(modifier))
    }

    /// Disable a modifier by character, from the closed set `i m s u U`.
    pub fn remove_modifier(self, modifier: char) -> Result<VerbEx, PatternError> {
        Modifier::from_char(modifier)
            .map(|m| self.set_modifier(m, false))
            .ok_or_else(|| PatternError::unknown_modifier(modifier))
    }

    fn set_modifier(mut self, modifier: Modifier, enabled: bool) -> VerbEx {
        if enabled {
            self.flags.insert(modifier.flag());
        } else {
            self.flags.remove(modifier.flag());
        }
        self
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// The finalized pattern tree. Fails when a capture group is still
    /// open.
    fn finalize(&self) -> Result<Ast, PatternError> {
        if !self.open.is_empty() {
            return Err(PatternError::unclosed_capture());
        }
        Ok(self.wrap_anchors(self.root.clone().into_ast()))
    }

    fn wrap_anchors(&self, body: Ast) -> Ast {
        let mut items = Vec::new();
        if self.start_of_line {
            items.push(Ast::Look(Look::Start));
        }
        items.push(body);
        if self.end_of_line {
            items.push(Ast::Look(Look::End));
        }
        Ast::concat(items)
    }

    /// The pattern in standard regex syntax. Open capture groups are
    /// rendered as if closed here, so this is always available for
    /// debugging; [`compile`](VerbEx::compile) still rejects them.
    pub fn pattern(&self) -> String {
        let mut this = self.clone();
        while let Some((index, scope)) = this.open.pop() {
            let ast = Ast::capture(index, scope.into_ast());
            match this.open.last_mut() {
                Some((_, outer)) => outer.push(ast),
                None => this.root.push(ast),
            }
        }
        let body = this.root.clone().into_ast();
        this.wrap_anchors(body).to_regex()
    }

    /// Compile with the default matcher [`Config`].
    pub fn compile(&self) -> Result<Regex, PatternError> {
        self.compile_with(Config::default())
    }

    /// Compile with an explicit matcher [`Config`] (e.g. a custom step
    /// limit).
    pub fn compile_with(&self, config: Config) -> Result<Regex, PatternError> {
        let ast = self.finalize()?;
        let pattern = ast.to_regex();
        log::debug!("compiling pattern {pattern:?}");
        let program = compile::compile(&ast, self.flags)?;
        Ok(Regex::new(pattern, program, config))
    }

    /// Whether the pattern matches anywhere in `haystack`.
    ///
    /// One-shot: compiles on every call. Compile once via
    /// [`compile`](VerbEx::compile) when matching repeatedly.
    pub fn test(&self, haystack: &str) -> Result<bool, Error> {
        Ok(self.compile()?.try_is_match(haystack)?)
    }

    /// The leftmost match with capture groups resolved, or `None`.
    pub fn captures(&self, haystack: &str) -> Result<Option<Captures>, Error> {
        Ok(self.compile()?.try_captures(haystack)?)
    }

    /// A lazy left-to-right iterator over all matched substrings.
    pub fn find_all<'h>(&self, haystack: &'h str) -> Result<FindAll<'h>, Error> {
        Ok(FindAll {
            re: self.compile()?,
            haystack,
            at: 0,
            done: false,
        })
    }

    /// Replace every match with the expansion of `template` (`$N` group
    /// references, `$0` = whole match).
    pub fn replace(&self, haystack: &str, template: &str) -> Result<String, Error> {
        Ok(self
            .compile()?
            .try_replace_all(haystack, &Template::new(template))?)
    }

    /// Replace every match with `replacement`, verbatim.
    pub fn replace_with(&self, haystack: &str, replacement: &str) -> Result<String, Error> {
        Ok(self
            .compile()?
            .try_replace_all(haystack, &Template::literal(replacement))?)
    }
}

impl fmt::Display for VerbEx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern())
    }
}

/// Iterator returned by [`VerbEx::find_all`]: owns its compiled [`Regex`]
/// and yields the matched substrings, left to right. Panics on step-budget
/// exhaustion; compile explicitly and use
/// [`Regex::try_find_iter`](crate::Regex::try_find_iter) to observe that
/// error instead.
#[derive(Debug)]
pub struct FindAll<'h> {
    re: Regex,
    haystack: &'h str,
    at: usize,
    done: bool,
}

impl<'h> Iterator for FindAll<'h> {
    type Item = &'h str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.at > self.haystack.len() {
            return None;
        }
        let input = Input::builder(self.haystack).start(self.at).build();
        let found = self
            .re
            .try_find(input)
            .unwrap_or_else(|err| panic!("{err}; compile() and use try_find_iter instead"));
        let Some(m) = found else {
            self.done = true;
            return None;
        };
        self.at = if m.is_empty() {
            m.end()
                + self.haystack[m.end()..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8)
        } else {
            m.end()
        };
        Some(&self.haystack[m.range()])
    }
}
