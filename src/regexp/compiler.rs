use super::{Node, RegexError, Repeat};

/// Compiles pattern text into the alternatives of the top-level disjunction and
/// the number of capturing groups.
pub(super) fn compile(pattern: &[u16]) -> Result<(Vec<Vec<Node>>, usize), RegexError> {
    let mut p = PatternParser {
        src: pattern,
        pos: 0,
        capture_count: count_capturing_groups(pattern),
        groups_opened: 0,
    };
    let alternatives = p.parse_disjunction()?;
    if p.pos < p.src.len() {
        return Err(p.error("Unmatched ')'"));
    }
    debug_assert_eq!(p.groups_opened, p.capture_count);
    Ok((alternatives, p.capture_count))
}

/// Left-to-right count of `(` not followed by `?`, skipping escapes and classes.
fn count_capturing_groups(src: &[u16]) -> usize {
    let mut count = 0;
    let mut i = 0;
    while i < src.len() {
        match unit_char(src[i]) {
            '\\' => i += 2,
            '(' => {
                if src.get(i + 1).map(|&c| unit_char(c)) != Some('?') {
                    count += 1;
                }
                i += 1;
            }
            '[' => {
                i += 1;
                while i < src.len() && unit_char(src[i]) != ']' {
                    i += if unit_char(src[i]) == '\\' { 2 } else { 1 };
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    count
}

fn unit_char(c: u16) -> char {
    char::from_u32(u32::from(c)).unwrap_or('\u{FFFD}')
}

// ============================================================================
// Predefined classes
// ============================================================================

const DIGIT: &[(u16, u16)] = &[(0x30, 0x39)];
const WORD: &[(u16, u16)] = &[(0x30, 0x39), (0x41, 0x5A), (0x5F, 0x5F), (0x61, 0x7A)];
const SPACE: &[(u16, u16)] = &[
    (0x09, 0x0D),
    (0x20, 0x20),
    (0xA0, 0xA0),
    (0x1680, 0x1680),
    (0x180E, 0x180E),
    (0x2000, 0x200A),
    (0x2028, 0x2029),
    (0x202F, 0x202F),
    (0x205F, 0x205F),
    (0x3000, 0x3000),
    (0xFEFF, 0xFEFF),
];

/// Ranges for `\d \D \s \S \w \W`.
fn class_escape(c: char) -> Option<Vec<(u16, u16)>> {
    let (base, negate) = match c {
        'd' => (DIGIT, false),
        'D' => (DIGIT, true),
        's' => (SPACE, false),
        'S' => (SPACE, true),
        'w' => (WORD, false),
        'W' => (WORD, true),
        _ => return None,
    };
    Some(if negate { complement(base) } else { base.to_vec() })
}

/// Complement over the whole code unit space; `ranges` must be sorted and disjoint.
fn complement(ranges: &[(u16, u16)]) -> Vec<(u16, u16)> {
    let mut out = Vec::new();
    let mut next: u32 = 0;
    for &(lo, hi) in ranges {
        if u32::from(lo) > next {
            out.push((next as u16, lo - 1));
        }
        next = u32::from(hi) + 1;
    }
    if next <= 0xFFFF {
        out.push((next as u16, 0xFFFF));
    }
    out
}

enum ClassAtom {
    Char(u16),
    Set(Vec<(u16, u16)>),
}

// ============================================================================
// Pattern parser
// ============================================================================

struct PatternParser<'a> {
    src: &'a [u16],
    pos: usize,
    capture_count: usize,
    groups_opened: usize,
}

impl PatternParser<'_> {
    fn error(&self, message: &str) -> RegexError {
        RegexError::Syntax {
            pattern: String::from_utf16_lossy(self.src),
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.src.get(self.pos + n).map(|&c| unit_char(c))
    }

    fn bump(&mut self) -> Option<u16> {
        let c = self.src.get(self.pos).copied();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char, message: &str) -> Result<(), RegexError> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn parse_disjunction(&mut self) -> Result<Vec<Vec<Node>>, RegexError> {
        let mut alternatives = vec![self.parse_alternative()?];
        while self.eat('|') {
            alternatives.push(self.parse_alternative()?);
        }
        Ok(alternatives)
    }

    fn parse_alternative(&mut self) -> Result<Vec<Node>, RegexError> {
        let mut terms = Vec::new();
        while let Some(c) = self.peek() {
            if c == '|' || c == ')' {
                break;
            }
            terms.push(self.parse_term()?);
        }
        Ok(terms)
    }

    fn parse_term(&mut self) -> Result<Node, RegexError> {
        match (self.peek(), self.peek_at(1), self.peek_at(2)) {
            (Some('^'), _, _) => {
                self.pos += 1;
                return Ok(Node::Start);
            }
            (Some('$'), _, _) => {
                self.pos += 1;
                return Ok(Node::End);
            }
            (Some('\\'), Some(b @ ('b' | 'B')), _) => {
                self.pos += 2;
                return Ok(Node::WordBoundary { negate: b == 'B' });
            }
            (Some('('), Some('?'), Some(l @ ('=' | '!'))) => {
                self.pos += 3;
                let alternatives = self.parse_disjunction()?;
                self.expect(')', "Unterminated group")?;
                return Ok(Node::Look {
                    negate: l == '!',
                    alternatives,
                });
            }
            _ => {}
        }
        let paren_index = self.groups_opened;
        let atom = self.parse_atom()?;
        self.parse_quantifier(atom, paren_index)
    }

    fn parse_quantifier(&mut self, atom: Node, paren_index: usize) -> Result<Node, RegexError> {
        let (min, max) = match self.peek() {
            Some('*') => {
                self.pos += 1;
                (0, None)
            }
            Some('+') => {
                self.pos += 1;
                (1, None)
            }
            Some('?') => {
                self.pos += 1;
                (0, Some(1))
            }
            Some('{') => {
                self.pos += 1;
                let min = self.parse_decimal_digits()?;
                let max = if self.eat('}') {
                    Some(min)
                } else if self.eat(',') {
                    if self.eat('}') {
                        None
                    } else {
                        let max = self.parse_decimal_digits()?;
                        self.expect('}', "Incomplete quantifier")?;
                        Some(max)
                    }
                } else {
                    return Err(self.error("Incomplete quantifier"));
                };
                (min, max)
            }
            _ => return Ok(atom),
        };
        let greedy = !self.eat('?');
        if let Some(max) = max
            && max < min
        {
            return Err(self.error("numbers out of order in {} quantifier"));
        }
        Ok(Node::Repeat(Box::new(Repeat {
            atom,
            min,
            max,
            greedy,
            paren_index,
            paren_count: self.groups_opened - paren_index,
        })))
    }

    fn parse_decimal_digits(&mut self) -> Result<u32, RegexError> {
        let mut value: u32 = 0;
        let mut any = false;
        while let Some(d) = self.peek().and_then(|c| c.to_digit(10)) {
            value = value.saturating_mul(10).saturating_add(d);
            self.pos += 1;
            any = true;
        }
        if any {
            Ok(value)
        } else {
            Err(self.error("Incomplete quantifier"))
        }
    }

    fn parse_atom(&mut self) -> Result<Node, RegexError> {
        let Some(c) = self.peek() else {
            return Err(self.error("Unexpected end of pattern"));
        };
        match c {
            '.' => {
                self.pos += 1;
                Ok(Node::Any)
            }
            '\\' => {
                self.pos += 1;
                self.parse_atom_escape()
            }
            '[' => {
                self.pos += 1;
                self.parse_class()
            }
            '(' => {
                self.pos += 1;
                let index = if self.eat('?') {
                    if !self.eat(':') {
                        return Err(self.error("Invalid group"));
                    }
                    None
                } else {
                    self.groups_opened += 1;
                    Some(self.groups_opened)
                };
                let alternatives = self.parse_disjunction()?;
                self.expect(')', "Unterminated group")?;
                Ok(Node::Group {
                    index,
                    alternatives,
                })
            }
            '*' | '+' | '?' | '{' => Err(self.error("Nothing to repeat")),
            _ => {
                self.pos += 1;
                Ok(Node::Char(self.src[self.pos - 1]))
            }
        }
    }

    fn parse_atom_escape(&mut self) -> Result<Node, RegexError> {
        match self.peek() {
            None => Err(self.error("\\ at end of pattern")),
            Some('0') => {
                self.pos += 1;
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    return Err(self.error("Invalid decimal escape"));
                }
                Ok(Node::Char(0))
            }
            Some(c) if c.is_ascii_digit() => {
                let mut n: usize = 0;
                while let Some(d) = self.peek().and_then(|c| c.to_digit(10)) {
                    n = n.saturating_mul(10).saturating_add(d as usize);
                    self.pos += 1;
                }
                if n > self.capture_count {
                    return Err(self.error("Invalid back reference"));
                }
                Ok(Node::BackRef(n))
            }
            Some(c) => {
                if let Some(ranges) = class_escape(c) {
                    self.pos += 1;
                    return Ok(Node::Class {
                        ranges,
                        negate: false,
                    });
                }
                Ok(Node::Char(self.parse_character_escape()?))
            }
        }
    }

    /// The character after a backslash, consumed. A `\c` without a control letter
    /// stands for the backslash itself and leaves the `c` to be read as a literal.
    fn parse_character_escape(&mut self) -> Result<u16, RegexError> {
        let Some(c) = self.peek() else {
            return Err(self.error("\\ at end of pattern"));
        };
        let unit = match c {
            't' => 0x09,
            'n' => 0x0A,
            'v' => 0x0B,
            'f' => 0x0C,
            'r' => 0x0D,
            'c' => match self.peek_at(1) {
                Some(l) if l.is_ascii_alphabetic() => {
                    self.pos += 2;
                    return Ok(l as u16 % 32);
                }
                _ => return Ok(u16::from(b'\\')),
            },
            'x' => {
                if let Some(v) = self.hex_digits(1, 2) {
                    self.pos += 3;
                    return Ok(v);
                }
                0x78
            }
            'u' => {
                if let Some(v) = self.hex_digits(1, 4) {
                    self.pos += 5;
                    return Ok(v);
                }
                0x75
            }
            _ => self.src[self.pos],
        };
        self.pos += 1;
        Ok(unit)
    }

    /// `count` hex digits starting `offset` units ahead, if all present.
    fn hex_digits(&self, offset: usize, count: usize) -> Option<u16> {
        let mut v: u16 = 0;
        for i in 0..count {
            let d = self.peek_at(offset + i)?.to_digit(16)?;
            v = (v << 4) | d as u16;
        }
        Some(v)
    }

    fn parse_class(&mut self) -> Result<Node, RegexError> {
        let negate = self.eat('^');
        let mut ranges = Vec::new();
        loop {
            match self.peek() {
                None => return Err(self.error("Unterminated character class")),
                Some(']') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {}
            }
            let a = self.parse_class_atom()?;
            let is_range = self.peek() == Some('-') && !matches!(self.peek_at(1), None | Some(']'));
            if !is_range {
                push_class_atom(&mut ranges, a);
                continue;
            }
            self.pos += 1;
            let b = self.parse_class_atom()?;
            match (a, b) {
                (ClassAtom::Char(lo), ClassAtom::Char(hi)) => {
                    if lo > hi {
                        return Err(self.error("Range out of order in character class"));
                    }
                    ranges.push((lo, hi));
                }
                (a, b) => {
                    push_class_atom(&mut ranges, a);
                    ranges.push((0x2D, 0x2D));
                    push_class_atom(&mut ranges, b);
                }
            }
        }
        Ok(Node::Class { ranges, negate })
    }

    fn parse_class_atom(&mut self) -> Result<ClassAtom, RegexError> {
        let Some(c) = self.bump() else {
            return Err(self.error("Unterminated character class"));
        };
        if c != u16::from(b'\\') {
            return Ok(ClassAtom::Char(c));
        }
        match self.peek() {
            None => Err(self.error("\\ at end of pattern")),
            Some('0') => {
                self.pos += 1;
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    return Err(self.error("Invalid class escape"));
                }
                Ok(ClassAtom::Char(0))
            }
            Some(c) if c.is_ascii_digit() => {
                // legacy octal
                let mut v: u32 = 0;
                while let Some(d) = self.peek().filter(|c| c.is_ascii_digit()) {
                    let Some(d) = d.to_digit(8) else {
                        return Err(self.error("Invalid class escape"));
                    };
                    v = (v * 8 + d).min(0xFFFF);
                    self.pos += 1;
                }
                Ok(ClassAtom::Char(v as u16))
            }
            Some('b') => {
                self.pos += 1;
                Ok(ClassAtom::Char(0x08))
            }
            Some('B') => Err(self.error("Invalid class escape")),
            Some(c) => {
                if let Some(set) = class_escape(c) {
                    self.pos += 1;
                    return Ok(ClassAtom::Set(set));
                }
                Ok(ClassAtom::Char(self.parse_character_escape()?))
            }
        }
    }
}

fn push_class_atom(ranges: &mut Vec<(u16, u16)>, atom: ClassAtom) {
    match atom {
        ClassAtom::Char(c) => ranges.push((c, c)),
        ClassAtom::Set(set) => ranges.extend(set),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    #[test]
    fn counts_groups_outside_classes() {
        assert_eq!(count_capturing_groups(&units("(a)(?:b)\\((c)[(]")), 2);
        assert_eq!(count_capturing_groups(&units("[\\]]((d))")), 2);
    }

    #[test]
    fn complement_covers_the_gaps() {
        assert_eq!(complement(DIGIT), vec![(0, 0x2F), (0x3A, 0xFFFF)]);
        assert_eq!(complement(&[(0, 0xFFFF)]), vec![]);
    }

    #[test]
    fn quantifier_records_inner_groups() {
        let (alts, count) = compile(&units("x((a)|(b))*")).unwrap();
        assert_eq!(count, 3);
        let Node::Repeat(rep) = &alts[0][1] else {
            panic!("expected a repeat, got {:?}", alts[0][1]);
        };
        assert_eq!((rep.paren_index, rep.paren_count), (0, 3));
        assert_eq!((rep.min, rep.max, rep.greedy), (0, None, true));
    }

    #[test]
    fn class_with_escape_ends_keeps_the_dash() {
        let (alts, _) = compile(&units("[\\d-z]")).unwrap();
        assert_eq!(
            alts[0][0],
            Node::Class {
                ranges: vec![(0x30, 0x39), (0x2D, 0x2D), (0x7A, 0x7A)],
                negate: false
            }
        );
    }

    #[test]
    fn control_escape_without_letter_is_a_backslash() {
        let (alts, _) = compile(&units("\\c1")).unwrap();
        assert_eq!(alts[0], vec![Node::Char(0x5C), Node::Char(0x63), Node::Char(0x31)]);
    }

    #[test]
    fn quantifier_bounds() {
        assert!(compile(&units("a{1,}")).is_ok());
        assert!(compile(&units("a{,1}")).is_err());
        assert!(compile(&units("a{1")).is_err());
        assert!(compile(&units("^*")).is_err());
    }
}
