//! Arena-Allocated Terms for the Sequence Signature.
//!
//! Terms are hash-consed: structurally identical terms share one
//! [`TermId`], and creation is monotone — a term is never freed during a
//! search, so raw indices stay valid for the lifetime of the manager.
//!
//! The operator enumeration is closed at compile time. Every traversal
//! dispatches with a `match` on [`TermKind`]; adding an operator requires
//! coordinated edits in the rewriter, the axiom module and the model
//! constructor.

use crate::sort::Sort;
use lasso::{Rodeo, Spur};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::fmt::Write as _;

/// Identifier of a term in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TermId(pub u32);

impl TermId {
    /// Create a term id from a raw index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Raw index of this id.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A union of inclusive code-point ranges, used as a predicated
/// transition label and as the payload of character-class atoms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CharRanges(pub SmallVec<[(u32, u32); 2]>);

impl CharRanges {
    /// The class containing a single code point.
    #[must_use]
    pub fn singleton(c: u32) -> Self {
        Self(SmallVec::from_slice(&[(c, c)]))
    }

    /// The class covering every code point.
    #[must_use]
    pub fn any() -> Self {
        Self(SmallVec::from_slice(&[(0, char::MAX as u32)]))
    }

    /// Membership test.
    #[must_use]
    pub fn contains(&self, c: u32) -> bool {
        self.0.iter().any(|&(lo, hi)| lo <= c && c <= hi)
    }

    /// True iff no code point is covered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&(lo, hi)| lo > hi)
    }

    /// Some covered code point, if any.
    #[must_use]
    pub fn witness(&self) -> Option<u32> {
        self.0.iter().find(|&&(lo, hi)| lo <= hi).map(|&(lo, _)| lo)
    }

    /// Intersection with another class.
    #[must_use]
    pub fn intersect(&self, other: &CharRanges) -> CharRanges {
        let mut out = SmallVec::new();
        for &(a, b) in &self.0 {
            for &(c, d) in &other.0 {
                let lo = a.max(c);
                let hi = b.min(d);
                if lo <= hi {
                    out.push((lo, hi));
                }
            }
        }
        CharRanges(out)
    }

    /// Complement of the class within the code-point space.
    #[must_use]
    pub fn complement(&self) -> CharRanges {
        let mut ranges: Vec<(u32, u32)> = self.0.iter().copied().filter(|&(lo, hi)| lo <= hi).collect();
        ranges.sort_unstable();
        let mut out = SmallVec::new();
        let mut next = 0u32;
        for (lo, hi) in ranges {
            if lo > next {
                out.push((next, lo - 1));
            }
            next = next.max(hi.saturating_add(1));
            if next > char::MAX as u32 {
                return CharRanges(out);
            }
        }
        if next <= char::MAX as u32 {
            out.push((next, char::MAX as u32));
        }
        CharRanges(out)
    }
}

/// The skolem families introduced by the theory. Their semantics are
/// pinned down by the axiom module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkolemKind {
    /// `tail(s, i)`: suffix of `s` starting at position `i + 1`.
    Tail,
    /// `pre(s, i)`: prefix of `s` of length `i`.
    Pre,
    /// `post(s, i)`: suffix of `s` starting at position `i`.
    Post,
    /// `indexof_left(s, t)`: prefix of `s` before the first match of `t`.
    IndexOfLeft,
    /// `indexof_right(s, t)`: suffix of `s` after the first match of `t`.
    IndexOfRight,
    /// `prefix_inv(a, b)`: continuation making `a` a prefix of `b`.
    PrefixInv,
    /// `suffix_inv(a, b)`: prolongation making `a` a suffix of `b`.
    SuffixInv,
    /// `seq_first(s)`: first element of a non-empty `s`.
    SeqFirst,
    /// `digit2int(c)`: numeric value of a decimal digit unit.
    Digit2Int,
    /// `accept(s, i, re, q)`: automaton acceptance from state `q` at `i`.
    Accept,
    /// `step(s, i, re, q, q', guard)`: one automaton transition.
    Step,
    /// `max_unfolding(d)`: budget literal at unfolding depth `d`.
    MaxUnfolding,
    /// `length_limit(s, k)`: budget literal bounding `|s| <= k`.
    LengthLimit,
}

/// Operator of a term. Payload ids refer back into the same arena.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TermKind {
    /// Boolean constant true.
    True,
    /// Boolean constant false.
    False,
    /// Free variable of a given sort.
    Var(Spur, Sort),
    /// Integer constant.
    IntConst(BigInt),
    /// Alphabet element constant (code point).
    CharConst(u32),
    /// The empty sequence.
    Empty,
    /// Singleton sequence holding one element.
    Unit(TermId),
    /// Sequence literal (a string constant).
    SeqLit(String),
    /// Concatenation of two sequences.
    Concat(TermId, TermId),
    /// Length of a sequence.
    Length(TermId),
    /// `extract(s, i, l)`: subsequence of `s` at offset `i`, length `l`.
    Extract(TermId, TermId, TermId),
    /// `at(s, i)`: singleton subsequence at `i` (empty out of range).
    At(TermId, TermId),
    /// `nth(s, i)`: element at `i` (unconstrained out of range).
    Nth(TermId, TermId),
    /// `contains(s, t)`: `t` occurs inside `s`.
    Contains(TermId, TermId),
    /// `prefix(a, b)`: `a` is a prefix of `b`.
    Prefix(TermId, TermId),
    /// `suffix(a, b)`: `a` is a suffix of `b`.
    Suffix(TermId, TermId),
    /// `indexof(s, t, i)`: first occurrence of `t` in `s` from `i`.
    IndexOf(TermId, TermId, TermId),
    /// `replace(s, t, r)`: `s` with the first occurrence of `t` replaced.
    Replace(TermId, TermId, TermId),
    /// `itos(n)`: decimal rendering of a non-negative integer.
    Itos(TermId),
    /// `stoi(s)`: numeric value of a digit string (-1 otherwise).
    Stoi(TermId),
    /// Strict lexicographic order.
    StrLt(TermId, TermId),
    /// Non-strict lexicographic order.
    StrLe(TermId, TermId),
    /// Regular-language membership.
    InRe(TermId, TermId),
    /// Injection of a sequence into a regular expression.
    ToRe(TermId),
    /// Regex matching one element within a code-point range.
    ReRange(u32, u32),
    /// Regex matching no word.
    ReNone,
    /// Regex matching any single element.
    ReAllChar,
    /// Regex concatenation.
    ReConcat(TermId, TermId),
    /// Regex union.
    ReUnion(TermId, TermId),
    /// Regex intersection.
    ReInter(TermId, TermId),
    /// Kleene star.
    ReStar(TermId),
    /// Regex complement.
    ReComp(TermId),
    /// Integer addition.
    Add(TermId, TermId),
    /// Integer subtraction.
    Sub(TermId, TermId),
    /// Integer multiplication.
    Mul(TermId, TermId),
    /// Integer comparison `a <= b`.
    Le(TermId, TermId),
    /// Equality atom (arguments ordered by id).
    Eq(TermId, TermId),
    /// If-then-else.
    Ite(TermId, TermId, TermId),
    /// Character-class atom: the element lies in the class.
    CharPred(TermId, CharRanges),
    /// Skolem application.
    Skolem(SkolemKind, Vec<TermId>),
}

/// A term: operator plus its computed sort.
#[derive(Debug, Clone)]
pub struct Term {
    /// Operator and children.
    pub kind: TermKind,
    /// Sort of the term.
    pub sort: Sort,
}

/// Arena of hash-consed terms.
pub struct TermManager {
    terms: Vec<Term>,
    table: FxHashMap<TermKind, TermId>,
    names: Rodeo,
    fresh_counter: u32,
}

impl Default for TermManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TermManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            terms: Vec::new(),
            table: FxHashMap::default(),
            names: Rodeo::default(),
            fresh_counter: 0,
        }
    }

    /// Number of terms allocated so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// True iff no term has been created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Get a term by id.
    #[must_use]
    pub fn get(&self, id: TermId) -> &Term {
        &self.terms[id.index()]
    }

    /// Operator of a term.
    #[must_use]
    pub fn kind(&self, id: TermId) -> &TermKind {
        &self.terms[id.index()].kind
    }

    /// Sort of a term.
    #[must_use]
    pub fn sort(&self, id: TermId) -> Sort {
        self.terms[id.index()].sort
    }

    /// Intern a kind, computing its sort.
    pub fn mk(&mut self, kind: TermKind) -> TermId {
        if let Some(&id) = self.table.get(&kind) {
            return id;
        }
        let sort = self.sort_of(&kind);
        let id = TermId::new(self.terms.len() as u32);
        self.table.insert(kind.clone(), id);
        self.terms.push(Term { kind, sort });
        id
    }

    fn sort_of(&self, kind: &TermKind) -> Sort {
        use TermKind::*;
        match kind {
            True | False | Contains(..) | Prefix(..) | Suffix(..) | StrLt(..) | StrLe(..)
            | InRe(..) | Le(..) | Eq(..) | CharPred(..) => Sort::Bool,
            Var(_, s) => *s,
            IntConst(_) | Length(_) | IndexOf(..) | Stoi(_) | Add(..) | Sub(..) | Mul(..) => {
                Sort::Int
            }
            CharConst(_) | Nth(..) => Sort::Char,
            Empty | Unit(_) | SeqLit(_) | Concat(..) | Extract(..) | At(..) | Replace(..)
            | Itos(_) => Sort::Seq,
            ToRe(_) | ReRange(..) | ReNone | ReAllChar | ReConcat(..) | ReUnion(..)
            | ReInter(..) | ReStar(_) | ReComp(_) => Sort::Re,
            Ite(_, t, _) => self.sort(*t),
            Skolem(k, args) => match k {
                SkolemKind::Tail
                | SkolemKind::Pre
                | SkolemKind::Post
                | SkolemKind::IndexOfLeft
                | SkolemKind::IndexOfRight
                | SkolemKind::PrefixInv
                | SkolemKind::SuffixInv => Sort::Seq,
                SkolemKind::SeqFirst => Sort::Char,
                SkolemKind::Digit2Int => Sort::Int,
                SkolemKind::Accept
                | SkolemKind::Step
                | SkolemKind::MaxUnfolding
                | SkolemKind::LengthLimit => Sort::Bool,
            },
        }
    }

    // ------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------

    /// Boolean constant.
    pub fn mk_bool(&mut self, b: bool) -> TermId {
        self.mk(if b { TermKind::True } else { TermKind::False })
    }

    /// Named variable of a sort.
    pub fn mk_var(&mut self, name: &str, sort: Sort) -> TermId {
        let spur = self.names.get_or_intern(name);
        self.mk(TermKind::Var(spur, sort))
    }

    /// Fresh variable with a reserved name prefix.
    pub fn mk_fresh_var(&mut self, prefix: &str, sort: Sort) -> TermId {
        self.fresh_counter += 1;
        let name = format!("{prefix}!{}", self.fresh_counter);
        self.mk_var(&name, sort)
    }

    /// Integer constant.
    pub fn mk_int<I: Into<BigInt>>(&mut self, n: I) -> TermId {
        self.mk(TermKind::IntConst(n.into()))
    }

    /// Alphabet element constant.
    pub fn mk_char(&mut self, c: u32) -> TermId {
        self.mk(TermKind::CharConst(c))
    }

    /// The empty sequence.
    pub fn mk_empty(&mut self) -> TermId {
        self.mk(TermKind::Empty)
    }

    /// Singleton sequence.
    pub fn mk_unit(&mut self, c: TermId) -> TermId {
        self.mk(TermKind::Unit(c))
    }

    /// Sequence literal.
    pub fn mk_seq_lit(&mut self, s: &str) -> TermId {
        if s.is_empty() {
            return self.mk_empty();
        }
        self.mk(TermKind::SeqLit(s.to_string()))
    }

    /// Concatenation; the empty sequence is a neutral element.
    pub fn mk_concat(&mut self, a: TermId, b: TermId) -> TermId {
        if matches!(self.kind(a), TermKind::Empty) {
            return b;
        }
        if matches!(self.kind(b), TermKind::Empty) {
            return a;
        }
        self.mk(TermKind::Concat(a, b))
    }

    /// Right-folded concatenation of a slice.
    pub fn mk_concat_many(&mut self, parts: &[TermId]) -> TermId {
        match parts {
            [] => self.mk_empty(),
            [single] => *single,
            [head, rest @ ..] => {
                let tail = self.mk_concat_many(rest);
                self.mk_concat(*head, tail)
            }
        }
    }

    /// Length of a sequence.
    pub fn mk_length(&mut self, s: TermId) -> TermId {
        self.mk(TermKind::Length(s))
    }

    /// `a <= b` over integers.
    pub fn mk_le(&mut self, a: TermId, b: TermId) -> TermId {
        self.mk(TermKind::Le(a, b))
    }

    /// `a >= b` over integers, encoded as `b <= a`.
    pub fn mk_ge(&mut self, a: TermId, b: TermId) -> TermId {
        self.mk(TermKind::Le(b, a))
    }

    /// Integer addition.
    pub fn mk_add(&mut self, a: TermId, b: TermId) -> TermId {
        self.mk(TermKind::Add(a, b))
    }

    /// Integer subtraction.
    pub fn mk_sub(&mut self, a: TermId, b: TermId) -> TermId {
        self.mk(TermKind::Sub(a, b))
    }

    /// Equality with argument ordering, so `eq(a, b)` and `eq(b, a)`
    /// intern to the same term.
    pub fn mk_eq(&mut self, a: TermId, b: TermId) -> TermId {
        if a == b {
            return self.mk_bool(true);
        }
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        self.mk(TermKind::Eq(a, b))
    }

    /// If-then-else.
    pub fn mk_ite(&mut self, c: TermId, t: TermId, e: TermId) -> TermId {
        self.mk(TermKind::Ite(c, t, e))
    }

    /// `nth(s, i)`.
    pub fn mk_nth(&mut self, s: TermId, i: TermId) -> TermId {
        self.mk(TermKind::Nth(s, i))
    }

    /// Skolem application.
    pub fn mk_skolem(&mut self, kind: SkolemKind, args: Vec<TermId>) -> TermId {
        self.mk(TermKind::Skolem(kind, args))
    }

    // ------------------------------------------------------------------
    // Inspection helpers
    // ------------------------------------------------------------------

    /// Integer value of an `IntConst`, if any.
    #[must_use]
    pub fn int_val(&self, id: TermId) -> Option<&BigInt> {
        match self.kind(id) {
            TermKind::IntConst(n) => Some(n),
            _ => None,
        }
    }

    /// Integer value as `i64`, if representable.
    #[must_use]
    pub fn int_val_i64(&self, id: TermId) -> Option<i64> {
        self.int_val(id).and_then(ToPrimitive::to_i64)
    }

    /// Code point of a `CharConst`, if any.
    #[must_use]
    pub fn char_val(&self, id: TermId) -> Option<u32> {
        match self.kind(id) {
            TermKind::CharConst(c) => Some(*c),
            _ => None,
        }
    }

    /// String payload of a sequence literal.
    #[must_use]
    pub fn seq_lit_str(&self, id: TermId) -> Option<&str> {
        match self.kind(id) {
            TermKind::SeqLit(s) => Some(s),
            _ => None,
        }
    }

    /// Name of a variable.
    #[must_use]
    pub fn var_name(&self, id: TermId) -> Option<&str> {
        match self.kind(id) {
            TermKind::Var(spur, _) => Some(self.names.resolve(spur)),
            _ => None,
        }
    }

    /// A "solver variable" in the sense of the equation solver: a
    /// sequence-sorted term that is not a constructor application the
    /// solver can decompose further.
    #[must_use]
    pub fn is_seq_var(&self, id: TermId) -> bool {
        self.sort(id) == Sort::Seq
            && !matches!(
                self.kind(id),
                TermKind::Concat(..)
                    | TermKind::Empty
                    | TermKind::SeqLit(_)
                    | TermKind::Unit(_)
                    | TermKind::Itos(_)
                    | TermKind::Ite(..)
            )
    }

    /// Flatten nested concatenations into a list of leaves. The empty
    /// sequence disappears; sequence literals explode into units.
    pub fn get_concat_units(&mut self, id: TermId, out: &mut Vec<TermId>) {
        match self.kind(id).clone() {
            TermKind::Concat(a, b) => {
                self.get_concat_units(a, out);
                self.get_concat_units(b, out);
            }
            TermKind::Empty => {}
            TermKind::SeqLit(s) => {
                for ch in s.chars() {
                    let c = self.mk_char(ch as u32);
                    let u = self.mk_unit(c);
                    out.push(u);
                }
            }
            _ => out.push(id),
        }
    }

    /// Explode a string into a chain of units.
    pub fn str_to_units(&mut self, s: &str) -> TermId {
        let mut parts = Vec::with_capacity(s.chars().count());
        for ch in s.chars() {
            let c = self.mk_char(ch as u32);
            parts.push(self.mk_unit(c));
        }
        self.mk_concat_many(&parts)
    }

    /// Ground word denoted by a sequence term, if it is one: a
    /// combination of literals, units of character constants and `ε`.
    #[must_use]
    pub fn ground_word(&self, id: TermId) -> Option<Vec<u32>> {
        match self.kind(id) {
            TermKind::Empty => Some(Vec::new()),
            TermKind::SeqLit(s) => Some(s.chars().map(|c| c as u32).collect()),
            TermKind::Unit(c) => self.char_val(*c).map(|c| vec![c]),
            TermKind::Concat(a, b) => {
                let mut l = self.ground_word(*a)?;
                let r = self.ground_word(*b)?;
                l.extend(r);
                Some(l)
            }
            _ => None,
        }
    }

    /// Ground integer value of an arithmetic term built from constants.
    #[must_use]
    pub fn ground_int(&self, id: TermId) -> Option<BigInt> {
        match self.kind(id) {
            TermKind::IntConst(n) => Some(n.clone()),
            TermKind::Add(a, b) => Some(self.ground_int(*a)? + self.ground_int(*b)?),
            TermKind::Sub(a, b) => Some(self.ground_int(*a)? - self.ground_int(*b)?),
            TermKind::Mul(a, b) => Some(self.ground_int(*a)? * self.ground_int(*b)?),
            TermKind::Length(s) => {
                let w = self.ground_word(*s)?;
                Some(BigInt::from(w.len()))
            }
            _ => None,
        }
    }

    /// Render a ground word as a string (best effort for display).
    #[must_use]
    pub fn word_to_string(word: &[u32]) -> String {
        word.iter()
            .map(|&c| char::from_u32(c).unwrap_or('\u{fffd}'))
            .collect()
    }

    /// S-expression rendering for diagnostics.
    #[must_use]
    pub fn display(&self, id: TermId) -> String {
        let mut out = String::new();
        self.write_term(&mut out, id);
        out
    }

    fn write_term(&self, out: &mut String, id: TermId) {
        use TermKind::*;
        match self.kind(id) {
            True => out.push_str("true"),
            False => out.push_str("false"),
            Var(spur, _) => out.push_str(self.names.resolve(spur)),
            IntConst(n) => {
                let _ = write!(out, "{n}");
            }
            CharConst(c) => {
                let _ = match char::from_u32(*c) {
                    Some(ch) => write!(out, "'{ch}'"),
                    None => write!(out, "char#{c}"),
                };
            }
            Empty => out.push_str("\"\""),
            SeqLit(s) => {
                let _ = write!(out, "{s:?}");
            }
            Unit(c) => self.write_app(out, "seq.unit", &[*c]),
            Concat(a, b) => self.write_app(out, "seq.++", &[*a, *b]),
            Length(s) => self.write_app(out, "seq.len", &[*s]),
            Extract(s, i, l) => self.write_app(out, "seq.extract", &[*s, *i, *l]),
            At(s, i) => self.write_app(out, "seq.at", &[*s, *i]),
            Nth(s, i) => self.write_app(out, "seq.nth", &[*s, *i]),
            Contains(s, t) => self.write_app(out, "seq.contains", &[*s, *t]),
            Prefix(a, b) => self.write_app(out, "seq.prefixof", &[*a, *b]),
            Suffix(a, b) => self.write_app(out, "seq.suffixof", &[*a, *b]),
            IndexOf(s, t, i) => self.write_app(out, "seq.indexof", &[*s, *t, *i]),
            Replace(s, t, r) => self.write_app(out, "seq.replace", &[*s, *t, *r]),
            Itos(n) => self.write_app(out, "str.from_int", &[*n]),
            Stoi(s) => self.write_app(out, "str.to_int", &[*s]),
            StrLt(a, b) => self.write_app(out, "str.<", &[*a, *b]),
            StrLe(a, b) => self.write_app(out, "str.<=", &[*a, *b]),
            InRe(s, r) => self.write_app(out, "str.in_re", &[*s, *r]),
            ToRe(s) => self.write_app(out, "str.to_re", &[*s]),
            ReRange(lo, hi) => {
                let _ = write!(out, "(re.range {lo} {hi})");
            }
            ReNone => out.push_str("re.none"),
            ReAllChar => out.push_str("re.allchar"),
            ReConcat(a, b) => self.write_app(out, "re.++", &[*a, *b]),
            ReUnion(a, b) => self.write_app(out, "re.union", &[*a, *b]),
            ReInter(a, b) => self.write_app(out, "re.inter", &[*a, *b]),
            ReStar(r) => self.write_app(out, "re.*", &[*r]),
            ReComp(r) => self.write_app(out, "re.comp", &[*r]),
            Add(a, b) => self.write_app(out, "+", &[*a, *b]),
            Sub(a, b) => self.write_app(out, "-", &[*a, *b]),
            Mul(a, b) => self.write_app(out, "*", &[*a, *b]),
            Le(a, b) => self.write_app(out, "<=", &[*a, *b]),
            Eq(a, b) => self.write_app(out, "=", &[*a, *b]),
            Ite(c, t, e) => self.write_app(out, "ite", &[*c, *t, *e]),
            CharPred(e, ranges) => {
                out.push_str("(in-class ");
                self.write_term(out, *e);
                let _ = write!(out, " {:?})", ranges.0.as_slice());
            }
            Skolem(kind, args) => {
                let name = match kind {
                    SkolemKind::Tail => "seq.tail",
                    SkolemKind::Pre => "seq.pre",
                    SkolemKind::Post => "seq.post",
                    SkolemKind::IndexOfLeft => "seq.idx_left",
                    SkolemKind::IndexOfRight => "seq.idx_right",
                    SkolemKind::PrefixInv => "seq.prefix_inv",
                    SkolemKind::SuffixInv => "seq.suffix_inv",
                    SkolemKind::SeqFirst => "seq.first",
                    SkolemKind::Digit2Int => "seq.digit2int",
                    SkolemKind::Accept => "re.accept",
                    SkolemKind::Step => "re.step",
                    SkolemKind::MaxUnfolding => "seq.max_unfolding",
                    SkolemKind::LengthLimit => "seq.length_limit",
                };
                self.write_app(out, name, args);
            }
        }
    }

    fn write_app(&self, out: &mut String, name: &str, args: &[TermId]) {
        out.push('(');
        out.push_str(name);
        for &a in args {
            out.push(' ');
            self.write_term(out, a);
        }
        out.push(')');
    }

    /// True iff `needle` occurs (structurally) inside `hay`.
    #[must_use]
    pub fn occurs(&self, needle: TermId, hay: TermId) -> bool {
        if needle == hay {
            return true;
        }
        let mut todo = vec![hay];
        while let Some(t) = todo.pop() {
            if t == needle {
                return true;
            }
            self.for_each_child(t, |c| todo.push(c));
        }
        false
    }

    /// Visit the immediate children of a term.
    pub fn for_each_child<F: FnMut(TermId)>(&self, id: TermId, mut f: F) {
        use TermKind::*;
        match self.kind(id) {
            True | False | Var(..) | IntConst(_) | CharConst(_) | Empty | SeqLit(_)
            | ReRange(..) | ReNone | ReAllChar => {}
            Unit(a) | Length(a) | Itos(a) | Stoi(a) | ToRe(a) | ReStar(a) | ReComp(a) => f(*a),
            Concat(a, b) | At(a, b) | Nth(a, b) | Contains(a, b) | Prefix(a, b)
            | Suffix(a, b) | StrLt(a, b) | StrLe(a, b) | InRe(a, b) | ReConcat(a, b)
            | ReUnion(a, b) | ReInter(a, b) | Add(a, b) | Sub(a, b) | Mul(a, b) | Le(a, b)
            | Eq(a, b) => {
                f(*a);
                f(*b);
            }
            Extract(a, b, c) | IndexOf(a, b, c) | Replace(a, b, c) | Ite(a, b, c) => {
                f(*a);
                f(*b);
                f(*c);
            }
            CharPred(e, _) => f(*e),
            Skolem(_, args) => {
                for &a in args {
                    f(a);
                }
            }
        }
    }

    /// True iff an integer constant is a non-negative value.
    #[must_use]
    pub fn is_nonneg_int(&self, id: TermId) -> bool {
        self.int_val(id).is_some_and(|n| !n.is_negative())
    }

    /// True iff the term is the integer zero.
    #[must_use]
    pub fn is_zero_int(&self, id: TermId) -> bool {
        self.int_val(id).is_some_and(Zero::is_zero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_consing() {
        let mut tm = TermManager::new();
        let x1 = tm.mk_var("x", Sort::Seq);
        let x2 = tm.mk_var("x", Sort::Seq);
        assert_eq!(x1, x2);

        let a = tm.mk_seq_lit("ab");
        let b = tm.mk_seq_lit("ab");
        assert_eq!(a, b);
    }

    #[test]
    fn test_concat_neutral() {
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", Sort::Seq);
        let e = tm.mk_empty();
        assert_eq!(tm.mk_concat(e, x), x);
        assert_eq!(tm.mk_concat(x, e), x);
    }

    #[test]
    fn test_eq_orientation() {
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", Sort::Seq);
        let y = tm.mk_var("y", Sort::Seq);
        assert_eq!(tm.mk_eq(x, y), tm.mk_eq(y, x));
        let t = tm.mk_eq(x, x);
        assert!(matches!(tm.kind(t), TermKind::True));
    }

    #[test]
    fn test_ground_word() {
        let mut tm = TermManager::new();
        let lit = tm.mk_seq_lit("hi");
        assert_eq!(tm.ground_word(lit), Some(vec!['h' as u32, 'i' as u32]));

        let c = tm.mk_char('a' as u32);
        let u = tm.mk_unit(c);
        let w = tm.mk_concat(u, lit);
        assert_eq!(
            tm.ground_word(w),
            Some(vec!['a' as u32, 'h' as u32, 'i' as u32])
        );
    }

    #[test]
    fn test_concat_units_explodes_literals() {
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", Sort::Seq);
        let lit = tm.mk_seq_lit("ab");
        let t = tm.mk_concat(x, lit);
        let mut parts = Vec::new();
        tm.get_concat_units(t, &mut parts);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], x);
        assert!(matches!(tm.kind(parts[1]), TermKind::Unit(_)));
    }

    #[test]
    fn test_occurs() {
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", Sort::Seq);
        let y = tm.mk_var("y", Sort::Seq);
        let t = tm.mk_concat(x, y);
        assert!(tm.occurs(x, t));
        let z = tm.mk_var("z", Sort::Seq);
        assert!(!tm.occurs(z, t));
    }

    #[test]
    fn test_char_ranges() {
        let a = CharRanges::singleton('a' as u32);
        assert!(a.contains('a' as u32));
        assert!(!a.contains('b' as u32));

        let comp = a.complement();
        assert!(!comp.contains('a' as u32));
        assert!(comp.contains('b' as u32));

        let both = a.intersect(&comp);
        assert!(both.is_empty());
    }
}
