use super::{Node, Repeat, is_line_terminator, is_word_char};

/// Slot 0 is the whole match; slot n the n-th capture as a code unit range.
pub type Captures = Vec<Option<(usize, usize)>>;

const RED_ZONE: usize = 64 * 1024;
const STACK_GROWTH: usize = 1024 * 1024;

#[derive(Debug, Clone)]
struct State {
    pos: usize,
    caps: Captures,
}

/// What to match after the current node succeeds.
enum Cont<'c> {
    Accept,
    /// The remaining terms of an alternative.
    Seq { nodes: &'c [Node], next: &'c Cont<'c> },
    /// Record a capturing group that opened at `start`.
    Close {
        index: usize,
        start: usize,
        next: &'c Cont<'c>,
    },
    /// Try another iteration of `rep`; `start` is where the last one began.
    Repeat {
        rep: &'c Repeat,
        min: u32,
        max: Option<u32>,
        start: usize,
        next: &'c Cont<'c>,
    },
}

pub(super) struct Matcher<'i> {
    input: &'i [u16],
    ignore_case: bool,
    multiline: bool,
}

impl<'i> Matcher<'i> {
    pub(super) fn new(input: &'i [u16], ignore_case: bool, multiline: bool) -> Self {
        Self {
            input,
            ignore_case,
            multiline,
        }
    }

    pub(super) fn run(
        &self,
        alternatives: &[Vec<Node>],
        capture_count: usize,
        index: usize,
    ) -> Option<Captures> {
        let start = State {
            pos: index,
            caps: vec![None; capture_count + 1],
        };
        let mut end = self.match_alternatives(alternatives, start, &Cont::Accept)?;
        end.caps[0] = Some((index, end.pos));
        Some(end.caps)
    }

    fn match_alternatives<'c>(
        &self,
        alternatives: &'c [Vec<Node>],
        st: State,
        k: &'c Cont<'c>,
    ) -> Option<State> {
        let (last, rest) = alternatives.split_last()?;
        for alt in rest {
            if let Some(r) = self.match_seq(alt, st.clone(), k) {
                return Some(r);
            }
        }
        self.match_seq(last, st, k)
    }

    fn match_seq<'c>(&self, nodes: &'c [Node], st: State, k: &'c Cont<'c>) -> Option<State> {
        match nodes.split_first() {
            None => self.run_cont(k, st),
            Some((first, [])) => self.match_node(first, st, k),
            Some((first, rest)) => self.match_node(first, st, &Cont::Seq { nodes: rest, next: k }),
        }
    }

    fn run_cont<'c>(&self, k: &'c Cont<'c>, mut st: State) -> Option<State> {
        match k {
            Cont::Accept => Some(st),
            Cont::Seq { nodes, next } => self.match_seq(nodes, st, next),
            Cont::Close { index, start, next } => {
                st.caps[*index] = Some((*start, st.pos));
                self.run_cont(next, st)
            }
            Cont::Repeat {
                rep,
                min,
                max,
                start,
                next,
            } => {
                if *min == 0 && st.pos == *start {
                    return None;
                }
                let min = min.saturating_sub(1);
                let max = max.map(|m| m - 1);
                self.repeat(rep, min, max, st, next)
            }
        }
    }

    fn repeat<'c>(
        &self,
        rep: &'c Repeat,
        min: u32,
        max: Option<u32>,
        st: State,
        k: &'c Cont<'c>,
    ) -> Option<State> {
        if max == Some(0) {
            return self.run_cont(k, st);
        }
        let mut xr = st.clone();
        for slot in &mut xr.caps[rep.paren_index + 1..=rep.paren_index + rep.paren_count] {
            *slot = None;
        }
        let d = Cont::Repeat {
            rep,
            min,
            max,
            start: st.pos,
            next: k,
        };
        if min != 0 {
            return self.match_node(&rep.atom, xr, &d);
        }
        if rep.greedy {
            self.match_node(&rep.atom, xr, &d)
                .or_else(|| self.run_cont(k, st))
        } else {
            self.run_cont(k, st)
                .or_else(|| self.match_node(&rep.atom, xr, &d))
        }
    }

    fn match_node<'c>(&self, node: &'c Node, st: State, k: &'c Cont<'c>) -> Option<State> {
        stacker::maybe_grow(RED_ZONE, STACK_GROWTH, || self.match_node_inner(node, st, k))
    }

    fn match_node_inner<'c>(&self, node: &'c Node, mut st: State, k: &'c Cont<'c>) -> Option<State> {
        match node {
            Node::Char(c) => {
                let ch = *self.input.get(st.pos)?;
                if self.canonicalize(ch) != self.canonicalize(*c) {
                    return None;
                }
                st.pos += 1;
                self.run_cont(k, st)
            }
            Node::Any => {
                let ch = *self.input.get(st.pos)?;
                if is_line_terminator(ch) {
                    return None;
                }
                st.pos += 1;
                self.run_cont(k, st)
            }
            Node::Class { ranges, negate } => {
                let ch = *self.input.get(st.pos)?;
                if self.class_matches(ranges, ch) == *negate {
                    return None;
                }
                st.pos += 1;
                self.run_cont(k, st)
            }
            Node::Start => {
                let ok = st.pos == 0
                    || (self.multiline && is_line_terminator(self.input[st.pos - 1]));
                if ok { self.run_cont(k, st) } else { None }
            }
            Node::End => {
                let ok = st.pos == self.input.len()
                    || (self.multiline && is_line_terminator(self.input[st.pos]));
                if ok { self.run_cont(k, st) } else { None }
            }
            Node::WordBoundary { negate } => {
                let before = st.pos > 0 && is_word_char(self.input[st.pos - 1]);
                let after = self.input.get(st.pos).is_some_and(|&c| is_word_char(c));
                if (before != after) != *negate {
                    self.run_cont(k, st)
                } else {
                    None
                }
            }
            Node::Group {
                index: Some(index),
                alternatives,
            } => {
                let close = Cont::Close {
                    index: *index,
                    start: st.pos,
                    next: k,
                };
                self.match_alternatives(alternatives, st, &close)
            }
            Node::Group {
                index: None,
                alternatives,
            } => self.match_alternatives(alternatives, st, k),
            Node::BackRef(n) => {
                let Some((s, e)) = st.caps[*n] else {
                    return self.run_cont(k, st);
                };
                let len = e - s;
                if st.pos + len > self.input.len() {
                    return None;
                }
                let same = (0..len).all(|i| {
                    self.canonicalize(self.input[s + i]) == self.canonicalize(self.input[st.pos + i])
                });
                if !same {
                    return None;
                }
                st.pos += len;
                self.run_cont(k, st)
            }
            Node::Look {
                negate: false,
                alternatives,
            } => {
                let inner = self.match_alternatives(alternatives, st.clone(), &Cont::Accept)?;
                self.run_cont(
                    k,
                    State {
                        pos: st.pos,
                        caps: inner.caps,
                    },
                )
            }
            Node::Look {
                negate: true,
                alternatives,
            } => {
                if self
                    .match_alternatives(alternatives, st.clone(), &Cont::Accept)
                    .is_some()
                {
                    return None;
                }
                self.run_cont(k, st)
            }
            Node::Repeat(rep) => self.repeat(rep, rep.min, rep.max, st, k),
        }
    }

    fn canonicalize(&self, ch: u16) -> u16 {
        if !self.ignore_case {
            return ch;
        }
        canonicalize(ch)
    }

    fn class_matches(&self, ranges: &[(u16, u16)], ch: u16) -> bool {
        let contains = |c: u16| ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi);
        if contains(ch) {
            return true;
        }
        if !self.ignore_case {
            return false;
        }
        let cc = canonicalize(ch);
        if contains(cc) {
            return true;
        }
        single_unit(char::from_u32(u32::from(cc)).map(|c| c.to_lowercase()))
            .is_some_and(|lower| canonicalize(lower) == cc && contains(lower))
    }
}

/// Uppercase mapping, kept only when it is a single code unit that does not
/// move a non-ASCII character into ASCII.
fn canonicalize(ch: u16) -> u16 {
    let Some(upper) = single_unit(char::from_u32(u32::from(ch)).map(|c| c.to_uppercase())) else {
        return ch;
    };
    if ch >= 128 && upper < 128 {
        return ch;
    }
    upper
}

fn single_unit(mapped: Option<impl Iterator<Item = char>>) -> Option<u16> {
    let mut it = mapped?;
    let c = it.next()?;
    if it.next().is_some() {
        return None;
    }
    u16::try_from(u32::from(c)).ok()
}
