/*!
Replacement of matches with a template.

A [`Template`] comes in two modes. [`Template::new`] parses `$N` group
references (`$0` is the whole match, multi-digit indices are taken
greedily, `$$` is a literal dollar); [`Template::literal`] inserts its text
verbatim with no expansion at all. A group that did not participate in a
match expands to the empty string.

```
use verbex::VerbEx;

let re = VerbEx::new()
    .begin_capture()
    .word()
    .end_capture()?
    .then("-")
    .begin_capture()
    .word()
    .end_capture()?
    .compile()?;
assert_eq!(re.replace_all("ab-cd ef-gh", &"$2_$1".into()), "cd_ab gh_ef");
# Ok::<(), verbex::Error>(())
```
*/

use crate::matcher::{Captures, Regex};
use crate::vm::MatchError;

/// A parsed replacement string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    parts: Vec<Part>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Part {
    Literal(String),
    Group(u32),
}

impl Template {
    /// Parse `template`, recognizing `$N` and `$$`. A `$` followed by
    /// anything else is kept verbatim.
    pub fn new(template: &str) -> Template {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '$' {
                literal.push(c);
                continue;
            }
            match chars.peek() {
                Some('$') => {
                    chars.next();
                    literal.push('$');
                }
                Some(d) if d.is_ascii_digit() => {
                    let mut index = 0u32;
                    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                        index = index.saturating_mul(10).saturating_add(d);
                        chars.next();
                    }
                    if !literal.is_empty() {
                        parts.push(Part::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(Part::Group(index));
                }
                _ => literal.push('$'),
            }
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }
        Template { parts }
    }

    /// A template that inserts `text` verbatim, with no `$N` expansion.
    pub fn literal(text: &str) -> Template {
        Template { parts: vec![Part::Literal(text.to_owned())] }
    }

    fn expand(&self, haystack: &str, caps: &Captures, out: &mut String) {
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Group(index) => {
                    // Non-participating groups expand to nothing.
                    if let Some(text) = caps.group_str(haystack, *index) {
                        out.push_str(text);
                    }
                }
            }
        }
    }
}

impl From<&str> for Template {
    fn from(template: &str) -> Template {
        Template::new(template)
    }
}

/// Replace up to `limit` matches (0 = all), scanning left to right without
/// overlap and stepping one character past empty matches.
pub(crate) fn replacen(
    re: &Regex,
    haystack: &str,
    template: &Template,
    limit: usize,
) -> Result<String, MatchError> {
    let mut out = String::with_capacity(haystack.len());
    let mut last = 0;
    let mut replaced = 0;
    for caps in re.try_captures_iter(haystack) {
        let caps = caps?;
        let Some(m) = caps.get_match() else { break };
        out.push_str(&haystack[last..m.start()]);
        template.expand(haystack, &caps, &mut out);
        last = m.end();
        replaced += 1;
        if limit != 0 && replaced >= limit {
            break;
        }
    }
    out.push_str(&haystack[last..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use crate::builder::VerbEx;

    use super::*;

    #[test]
    fn template_parse() {
        let t = Template::new("a$1b$$c$x$23");
        assert_eq!(
            t,
            Template {
                parts: vec![
                    Part::Literal("a".into()),
                    Part::Group(1),
                    Part::Literal("b$c$x".into()),
                    Part::Group(23),
                ]
            }
        );
    }

    #[test]
    fn literal_mode_has_no_expansion() {
        let re = VerbEx::new().then("a").compile().unwrap();
        assert_eq!(re.replace_all("a", &Template::literal("$0")), "$0");
        assert_eq!(re.replace_all("a", &Template::new("$0")), "a");
    }

    #[test]
    fn replace_first_and_all() {
        let re = VerbEx::new().then("a").compile().unwrap();
        assert_eq!(re.replace_first("banana", &Template::literal("o")), "bonana");
        assert_eq!(re.replace_all("banana", &Template::literal("o")), "bonono");
        // No match leaves the haystack untouched.
        assert_eq!(re.replace_all("xyz", &Template::literal("o")), "xyz");
    }

    #[test]
    fn whole_match_reference() {
        let re = VerbEx::new().then("ha").compile().unwrap();
        assert_eq!(re.replace_all("ha ha", &"<$0>".into()), "<ha> <ha>");
    }

    #[test]
    fn absent_group_expands_empty() {
        // a(b)?c with $1 keeps only what group 1 consumed.
        let re = VerbEx::new()
            .then("a")
            .begin_capture()
            .maybe("b")
            .end_capture()
            .unwrap()
            .then("c")
            .compile()
            .unwrap();
        assert_eq!(re.replace_all("abc ac", &"[$1]".into()), "[b] []");
    }

    #[test]
    fn empty_match_advances_a_full_char() {
        let re = VerbEx::new().maybe("x").compile().unwrap();
        assert_eq!(re.replace_all("éx", &Template::literal("-")), "-é--");
    }
}
