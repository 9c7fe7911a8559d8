//! Backtracking regular expressions over UTF-16 code units.
//!
//! A pattern is compiled once into a [`Node`] tree; matching walks the tree with
//! an explicit continuation chain so that ordered choice, greedy and lazy
//! repetition and lookahead all backtrack the same way.

mod compiler;
mod matcher;

use std::fmt;

pub use matcher::Captures;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegexError {
    #[error("Invalid regular expression: /{pattern}/: {message}")]
    Syntax { pattern: String, message: String },
    #[error("Invalid regular expression flags '{0}'")]
    Flags(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub global: bool,
    pub ignore_case: bool,
    pub multiline: bool,
}

impl Flags {
    /// Each of `g`, `i`, `m` at most once; anything else is rejected.
    pub fn parse(text: &str) -> Result<Self, RegexError> {
        let mut flags = Flags::default();
        for c in text.chars() {
            let slot = match c {
                'g' => &mut flags.global,
                'i' => &mut flags.ignore_case,
                'm' => &mut flags.multiline,
                _ => return Err(RegexError::Flags(text.to_string())),
            };
            if *slot {
                return Err(RegexError::Flags(text.to_string()));
            }
            *slot = true;
        }
        Ok(flags)
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.global {
            f.write_str("g")?;
        }
        if self.ignore_case {
            f.write_str("i")?;
        }
        if self.multiline {
            f.write_str("m")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Char(u16),
    /// `.`: anything but a line terminator.
    Any,
    /// Inclusive code unit ranges; an empty, non-negated class never matches.
    Class {
        ranges: Vec<(u16, u16)>,
        negate: bool,
    },
    Start,
    End,
    WordBoundary {
        negate: bool,
    },
    /// `index` is the 1-based capture number of a capturing group.
    Group {
        index: Option<usize>,
        alternatives: Vec<Vec<Node>>,
    },
    BackRef(usize),
    Look {
        negate: bool,
        alternatives: Vec<Vec<Node>>,
    },
    Repeat(Box<Repeat>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Repeat {
    pub atom: Node,
    pub min: u32,
    /// `None` is unbounded.
    pub max: Option<u32>,
    pub greedy: bool,
    /// Capturing groups opened before the atom, and inside it.
    pub paren_index: usize,
    pub paren_count: usize,
}

#[derive(Debug, Clone)]
pub struct Regex {
    pattern: Vec<u16>,
    source: Vec<u16>,
    flags: Flags,
    alternatives: Vec<Vec<Node>>,
    capture_count: usize,
}

impl Regex {
    pub fn new(pattern: &[u16], flags: &str) -> Result<Self, RegexError> {
        let flags = Flags::parse(flags)?;
        let (alternatives, capture_count) = compiler::compile(pattern)?;
        tracing::trace!(
            pattern = %String::from_utf16_lossy(pattern),
            captures = capture_count,
            "compiled regexp"
        );
        Ok(Self {
            pattern: pattern.to_vec(),
            source: escape_source(pattern),
            flags,
            alternatives,
            capture_count,
        })
    }

    /// The pattern text as written.
    pub fn pattern(&self) -> &[u16] {
        &self.pattern
    }

    /// The pattern text as it appears between slashes: `/` escaped, empty as `(?:)`.
    pub fn source(&self) -> &[u16] {
        &self.source
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn capture_count(&self) -> usize {
        self.capture_count
    }

    /// Attempts a match starting exactly at `index`. On success slot 0 holds the
    /// whole match and slot n the n-th capture, `None` where a group did not
    /// participate.
    pub fn match_at(&self, input: &[u16], index: usize) -> Option<Captures> {
        if index > input.len() {
            return None;
        }
        let m = matcher::Matcher::new(input, self.flags.ignore_case, self.flags.multiline);
        m.run(&self.alternatives, self.capture_count, index)
    }

    /// First match at or after `start`, advancing one code unit at a time.
    pub fn find_from(&self, input: &[u16], start: usize) -> Option<Captures> {
        (start..=input.len()).find_map(|i| self.match_at(input, i))
    }
}

fn escape_source(pattern: &[u16]) -> Vec<u16> {
    if pattern.is_empty() {
        return "(?:)".encode_utf16().collect();
    }
    let slash = u16::from(b'/');
    let backslash = u16::from(b'\\');
    let mut out = Vec::with_capacity(pattern.len());
    let mut in_class = false;
    let mut i = 0;
    while i < pattern.len() {
        let c = pattern[i];
        if c == backslash && i + 1 < pattern.len() {
            out.extend_from_slice(&pattern[i..i + 2]);
            i += 2;
            continue;
        }
        if c == u16::from(b'[') {
            in_class = true;
        } else if c == u16::from(b']') {
            in_class = false;
        } else if c == slash && !in_class {
            out.push(backslash);
        }
        out.push(c);
        i += 1;
    }
    out
}

pub(crate) fn is_line_terminator(c: u16) -> bool {
    matches!(c, 0x0A | 0x0D | 0x2028 | 0x2029)
}

pub(crate) fn is_word_char(c: u16) -> bool {
    matches!(c, 0x30..=0x39 | 0x41..=0x5A | 0x5F | 0x61..=0x7A)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn units(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    fn exec(pattern: &str, flags: &str, input: &str) -> Option<Vec<Option<String>>> {
        let re = Regex::new(&units(pattern), flags).unwrap();
        let input = units(input);
        let caps = re.find_from(&input, 0)?;
        Some(
            caps.iter()
                .map(|c| c.map(|(s, e)| String::from_utf16_lossy(&input[s..e])))
                .collect(),
        )
    }

    fn strs(items: &[Option<&str>]) -> Option<Vec<Option<String>>> {
        Some(items.iter().map(|s| s.map(str::to_string)).collect())
    }

    #[test]
    fn ordered_choice_backtracks() {
        assert_eq!(
            exec("(a|ab)(c|bcd)(d*)", "", "abcd"),
            strs(&[Some("abcd"), Some("a"), Some("bcd"), Some("")])
        );
    }

    #[test]
    fn nested_plus_terminates_and_fails() {
        let input = format!("{}b", "a".repeat(16));
        assert_eq!(exec("^(a+)+$", "", &input), None);
        assert!(exec("^(a+)+$", "", "aaaa").is_some());
    }

    #[test]
    fn repeat_clears_inner_captures() {
        assert_eq!(
            exec("(z)((a+)?(b+)?(c))*", "", "zaacbbbcac"),
            strs(&[
                Some("zaacbbbcac"),
                Some("z"),
                Some("ac"),
                Some("a"),
                None,
                Some("c"),
            ])
        );
    }

    #[test]
    fn empty_iterations_stop_the_loop() {
        assert_eq!(exec("(a*)*", "", "b"), strs(&[Some(""), None]));
        assert_eq!(exec("(a*)b\\1+", "", "baaaac"), strs(&[Some("b"), Some("")]));
    }

    #[test]
    fn lookahead_captures() {
        assert_eq!(exec("(?=(a+))", "", "baaabac"), strs(&[Some(""), Some("aaa")]));
        assert_eq!(
            exec("(.*?)a(?!(a+)b\\2c)\\2(.*)", "", "baaabaac"),
            strs(&[Some("baaabaac"), Some("ba"), None, Some("abaac")])
        );
    }

    #[test]
    fn greedy_and_lazy_bounds() {
        assert_eq!(exec("a[a-z]{2,4}", "", "abcdefghi"), strs(&[Some("abcde")]));
        assert_eq!(exec("a[a-z]{2,4}?", "", "abcdefghi"), strs(&[Some("abc")]));
        assert_eq!(exec("x{3}", "", "xxxx"), strs(&[Some("xxx")]));
        assert_eq!(exec("x{2,}", "", "xxxx"), strs(&[Some("xxxx")]));
    }

    #[test]
    fn unset_backreference_matches_empty() {
        assert_eq!(exec("(?:(a)|b)\\1c", "", "bc"), strs(&[Some("bc"), None]));
    }

    #[test]
    fn ignore_case() {
        assert_eq!(exec("ABC", "i", "xabcx"), strs(&[Some("abc")]));
        assert_eq!(exec("[a-z]+", "i", "HeLLo!"), strs(&[Some("HeLLo")]));
        // long s uppercases into ASCII and is left alone
        assert_eq!(exec("s", "i", "\u{17F}"), None);
        assert_eq!(exec("(a)\\1", "i", "aA"), strs(&[Some("aA"), Some("a")]));
    }

    #[test]
    fn anchors_and_boundaries() {
        assert_eq!(exec("^b", "", "a\nb"), None);
        assert_eq!(exec("^b", "m", "a\nb"), strs(&[Some("b")]));
        assert_eq!(exec("a$", "m", "a\nb"), strs(&[Some("a")]));
        assert_eq!(exec("\\bfoo\\b", "", "a foo b"), strs(&[Some("foo")]));
        assert_eq!(exec("\\Boo", "", "foo"), strs(&[Some("oo")]));
        assert_eq!(exec("a.c", "", "a\nc"), None);
    }

    #[test]
    fn character_classes() {
        assert_eq!(exec("[^\\d]+", "", "12ab3"), strs(&[Some("ab")]));
        assert_eq!(exec("[\\b]", "", "x\u{8}"), strs(&[Some("\u{8}")]));
        assert_eq!(exec("\\s+", "", "a \t\u{a0}b"), strs(&[Some(" \t\u{a0}")]));
        assert_eq!(exec("\\w+", "", "--a_1--"), strs(&[Some("a_1")]));
        assert_eq!(exec("[a-]+", "", "x-a-"), strs(&[Some("-a-")]));
        assert_eq!(exec("[]", "", "a"), None);
        assert_eq!(exec("[^]", "", "\n"), strs(&[Some("\n")]));
        assert_eq!(exec("\\x41\\u0042", "", "AB"), strs(&[Some("AB")]));
        assert_eq!(exec("\\cJ", "", "\n"), strs(&[Some("\n")]));
    }

    #[test]
    fn syntax_errors() {
        for bad in ["a{2,1}", "(", ")", "[b-a]", "*", "a**", "\\2(a)", "[a", "(?<a)", "a\\"] {
            assert!(
                matches!(Regex::new(&units(bad), ""), Err(RegexError::Syntax { .. })),
                "{bad}"
            );
        }
        assert!(Regex::new(&units("\\1(a)"), "").is_ok());
        assert!(Regex::new(&units("a]}"), "").is_ok());
    }

    #[test]
    fn flag_errors() {
        assert_eq!(
            Flags::parse("gim"),
            Ok(Flags {
                global: true,
                ignore_case: true,
                multiline: true
            })
        );
        assert!(matches!(Flags::parse("gg"), Err(RegexError::Flags(_))));
        assert!(matches!(Flags::parse("x"), Err(RegexError::Flags(_))));
        assert_eq!(Flags::parse("mg").unwrap().to_string(), "gm");
    }

    #[test]
    fn source_escaping() {
        let re = Regex::new(&units("a/b[/]"), "").unwrap();
        assert_eq!(String::from_utf16_lossy(re.source()), "a\\/b[/]");
        let re = Regex::new(&[], "").unwrap();
        assert_eq!(String::from_utf16_lossy(re.source()), "(?:)");
    }

    #[test]
    fn capture_count_includes_nested_groups() {
        let re = Regex::new(&units("(a(b)(?:c)(?=(d)))[(]\\("), "").unwrap();
        assert_eq!(re.capture_count(), 3);
    }

    #[test]
    fn long_input_does_not_overflow() {
        let input = "a".repeat(50_000);
        assert_eq!(exec("a*", "", &input).unwrap()[0].as_ref().map(String::len), Some(50_000));
    }
}
