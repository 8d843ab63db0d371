//! Index-expression mini-language.
//!
//! A label is one character optionally followed by decimal digits, so `i1 i2 k1` names three
//! labels. Every distinct token is interned into a [`Label`]; operations that need extra labels
//! (conjugate copies, delta legs) allocate them past [`LabelTable::len`], so they never collide with
//! the labels written by the caller.
//!
//! Three shapes of expression are understood:
//!
//! - contraction: `"ab,bc->ac"` ([`EinsumExpr`]),
//! - grouping: `"(ab)(cd)"` or `"ab|cd"` ([`GroupingExpr`]),
//! - partition: a grouping with exactly two groups ([`PartitionExpr`]).

use alloc::{
    format,
    string::{String, ToString},
    vec,
    vec::Vec,
};

use crate::error::ExprError;

/// Characters that delimit groups in the flat grouping form.
pub const SEPARATORS: [char; 6] = ['|', ':', ';', ',', '.', ' '];

/// An interned index label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label(u32);

impl Label {
    /// Label with the given id.
    pub fn new(id: u32) -> Self {
        Label(id)
    }
    /// Id of the label.
    pub fn id(self) -> u32 {
        self.0
    }
}

/// Token names of the labels of one expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    names: Vec<String>,
}

impl LabelTable {
    /// Returns the label of `name`, interning it if it is new.
    pub fn intern(&mut self, name: &str) -> Label {
        match self.names.iter().position(|n| n == name) {
            Some(p) => Label(p as u32),
            None => {
                self.names.push(name.to_string());
                Label(self.names.len() as u32 - 1)
            }
        }
    }
    /// Token name of an interned label.
    pub fn name(&self, label: Label) -> Option<&str> {
        self.names.get(label.0 as usize).map(String::as_str)
    }
    /// Token name, or `#id` for labels allocated after parsing.
    pub fn display(&self, label: Label) -> String {
        match self.name(label) {
            Some(n) => n.to_string(),
            None => format!("#{}", label.0),
        }
    }
    /// Number of interned labels. Ids from this value upward are free.
    pub fn len(&self) -> usize {
        self.names.len()
    }
    /// Returns true if nothing was interned.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Allocator of labels that cannot collide with the labels of a parsed expression.
#[derive(Debug, Clone)]
pub struct LabelSupply {
    next: u32,
}

impl LabelSupply {
    /// Supply starting right after the interned labels of `table`.
    pub fn after(table: &LabelTable) -> Self {
        LabelSupply {
            next: table.len() as u32,
        }
    }
    /// A label never handed out before.
    pub fn fresh(&mut self) -> Label {
        let label = Label(self.next);
        self.next += 1;
        label
    }
}

/// Splits a segment into label tokens. Whitespace must already be removed.
fn tokenize(segment: &str, offset: usize) -> Result<Vec<&str>, ExprError> {
    let mut tokens: Vec<&str> = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in segment.char_indices() {
        if c.is_ascii_digit() {
            if start.is_none() {
                return Err(ExprError::LeadingDigit(offset + i));
            }
            continue;
        }
        if matches!(c, '-' | '>' | '(' | ')') || SEPARATORS.contains(&c) {
            return Err(ExprError::UnexpectedChar(c));
        }
        if let Some(s) = start {
            tokens.push(&segment[s..i]);
        }
        start = Some(i);
    }
    if let Some(s) = start {
        tokens.push(&segment[s..]);
    }
    Ok(tokens)
}

/// Single-character labels of a segment, ignoring whitespace.
pub fn tokenize_chars(segment: &str) -> Result<Vec<char>, ExprError> {
    segment
        .chars()
        .filter(|c| !c.is_whitespace())
        .enumerate()
        .map(|(i, c)| {
            if c.is_ascii_digit() {
                Err(ExprError::LeadingDigit(i))
            } else {
                Ok(c)
            }
        })
        .collect()
}

/// Parsed contraction expression `"op1,op2,...->out"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EinsumExpr {
    inputs: Vec<Vec<Label>>,
    output: Option<Vec<Label>>,
    table: LabelTable,
}

impl EinsumExpr {
    /// Parses a contraction expression. Whitespace is insignificant.
    pub fn parse(expr: &str) -> Result<Self, ExprError> {
        let compact: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
        let arrows = compact.matches("->").count();
        if arrows > 1 {
            return Err(ExprError::MultipleArrows(arrows));
        }
        let (lhs, rhs) = match compact.split_once("->") {
            Some((l, r)) => (l, Some(r)),
            None => (compact.as_str(), None),
        };

        let mut table = LabelTable::default();
        let mut inputs = Vec::new();
        let mut offset = 0;
        for segment in lhs.split(',') {
            let labels = tokenize(segment, offset)?
                .into_iter()
                .map(|t| table.intern(t))
                .collect();
            inputs.push(labels);
            offset += segment.len() + 1;
        }

        let output = match rhs {
            Some(r) => {
                if r.contains(',') {
                    return Err(ExprError::OutputComma);
                }
                let labels = tokenize(r, lhs.len() + 2)?
                    .into_iter()
                    .map(|t| table.intern(t))
                    .collect();
                Some(labels)
            }
            None => None,
        };

        Ok(EinsumExpr {
            inputs,
            output,
            table,
        })
    }

    /// Label sequences of the operands.
    pub fn inputs(&self) -> &[Vec<Label>] {
        &self.inputs
    }
    /// Requested output labels, `None` when the expression has no `->`.
    pub fn output(&self) -> Option<&[Label]> {
        self.output.as_deref()
    }
    /// Token names.
    pub fn table(&self) -> &LabelTable {
        &self.table
    }
}

/// Parsed grouping expression, either `"(ab)(cd)e"` or `"ab|cd|e"`.
///
/// In the parenthesized form a token outside parentheses is a group of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupingExpr {
    groups: Vec<Vec<Label>>,
    parenthesized: bool,
    loose: usize,
    table: LabelTable,
}

impl GroupingExpr {
    /// Parses a grouping expression.
    pub fn parse(expr: &str) -> Result<Self, ExprError> {
        let expr = expr.trim();
        let parenthesized = expr.contains(['(', ')']);

        let mut raw: Vec<Vec<String>> = Vec::new();
        let mut loose = 0;
        if parenthesized {
            if expr.contains(SEPARATORS) {
                return Err(ExprError::MixedForms);
            }
            let mut inside = false;
            let mut token_open = false;
            for (i, c) in expr.char_indices() {
                match c {
                    '(' => {
                        if inside {
                            return Err(ExprError::NestedParentheses);
                        }
                        inside = true;
                        token_open = false;
                        raw.push(Vec::new());
                    }
                    ')' => {
                        if !inside {
                            return Err(ExprError::UnmatchedParenthesis);
                        }
                        inside = false;
                        token_open = false;
                    }
                    c if c.is_ascii_digit() => {
                        let last = raw.last_mut().and_then(|g| g.last_mut());
                        match (token_open, last) {
                            (true, Some(token)) => token.push(c),
                            _ => return Err(ExprError::LeadingDigit(i)),
                        }
                    }
                    '-' | '>' => return Err(ExprError::UnexpectedChar(c)),
                    c => {
                        if inside {
                            if let Some(group) = raw.last_mut() {
                                group.push(c.to_string());
                            }
                        } else {
                            raw.push(vec![c.to_string()]);
                            loose += 1;
                        }
                        token_open = true;
                    }
                }
            }
            if inside {
                return Err(ExprError::UnmatchedParenthesis);
            }
        } else {
            let mut offset = 0;
            for segment in expr.split(SEPARATORS) {
                raw.push(
                    tokenize(segment, offset)?
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                );
                offset += segment.len() + 1;
            }
        }

        let mut table = LabelTable::default();
        let mut groups = Vec::with_capacity(raw.len());
        for (g, tokens) in raw.iter().enumerate() {
            if tokens.is_empty() {
                return Err(ExprError::EmptyGroup(g));
            }
            let mut group = Vec::with_capacity(tokens.len());
            for t in tokens {
                if table.names.iter().any(|n| n == t) {
                    return Err(ExprError::DuplicateLabel(t.clone()));
                }
                group.push(table.intern(t));
            }
            groups.push(group);
        }

        Ok(GroupingExpr {
            groups,
            parenthesized,
            loose,
            table,
        })
    }

    /// Labels of each group.
    pub fn groups(&self) -> &[Vec<Label>] {
        &self.groups
    }
    /// Number of axes in each group.
    pub fn sizes(&self) -> Vec<usize> {
        self.groups.iter().map(Vec::len).collect()
    }
    /// Total number of axes named.
    pub fn axis_count(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }
    /// Token names.
    pub fn table(&self) -> &LabelTable {
        &self.table
    }
}

/// A grouping with exactly two groups, used by decompositions and conjugation.
///
/// The flat form must contain exactly one separator; the parenthesized form must be exactly two
/// parenthesized groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionExpr {
    grouping: GroupingExpr,
}

impl PartitionExpr {
    /// Parses a partition expression.
    pub fn parse(expr: &str) -> Result<Self, ExprError> {
        let grouping = GroupingExpr::parse(expr)?;
        let count = grouping.groups.len();
        if count != 2 || (grouping.parenthesized && grouping.loose > 0) {
            return Err(ExprError::PartitionCount(count));
        }
        Ok(PartitionExpr { grouping })
    }

    /// Labels of the left group.
    pub fn left(&self) -> &[Label] {
        &self.grouping.groups[0]
    }
    /// Labels of the right group.
    pub fn right(&self) -> &[Label] {
        &self.grouping.groups[1]
    }
    /// The partition seen as a grouping.
    pub fn grouping(&self) -> &GroupingExpr {
        &self.grouping
    }
}
