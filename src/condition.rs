//! Level conditions used to filter writes
//!
//! A [`Condition`] is plain data: an immutable expression tree shared through
//! `Arc`. Combinators allocate a single node pointing at both operands, so
//! operands are never mutated and combining costs the same at any depth.
//! Evaluation and teardown walk the tree with explicit stacks.
//!
//! A condition may be *absent*, the analogue of a missing predicate. Absent
//! conditions never accept a level. Combining with an absent operand follows
//! fixed rules:
//!
//! | operation | both present | one absent        | both absent |
//! |-----------|--------------|-------------------|-------------|
//! | `and`     | `p && q`     | `false`           | `false`     |
//! | `or`      | `p \|\| q`   | the present one   | `false`     |

use crate::level::Level;
use std::sync::Arc;

type Operand = Option<Arc<Expr>>;

#[derive(Debug)]
enum Expr {
    Below(Level),
    AtLeast(Level),
    Exactly(Level),
    Always,
    And(Operand, Operand),
    Or(Operand, Operand),
}

impl Expr {
    fn take_operands(&mut self) -> [Operand; 2] {
        match self {
            Expr::And(a, b) | Expr::Or(a, b) => [a.take(), b.take()],
            _ => [None, None],
        }
    }
}

// Unlinks operands iteratively so long chains don't exhaust the stack.
impl Drop for Expr {
    fn drop(&mut self) {
        let mut stack: Vec<Arc<Expr>> = self.take_operands().into_iter().flatten().collect();
        while let Some(expr) = stack.pop() {
            if let Ok(mut owned) = Arc::try_unwrap(expr) {
                stack.extend(owned.take_operands().into_iter().flatten());
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Join {
    And,
    Or,
}

/// Immutable boolean function of a [`Level`].
#[derive(Debug, Clone)]
pub struct Condition {
    root: Operand,
}

impl Condition {
    fn leaf(expr: Expr) -> Self {
        Condition {
            root: Some(Arc::new(expr)),
        }
    }

    /// Accepts levels strictly below `level`.
    pub fn below(level: Level) -> Self {
        Self::leaf(Expr::Below(level))
    }

    /// Accepts `level` and everything above it.
    pub fn at_least(level: Level) -> Self {
        Self::leaf(Expr::AtLeast(level))
    }

    pub fn exactly(level: Level) -> Self {
        Self::leaf(Expr::Exactly(level))
    }

    pub fn always() -> Self {
        Self::leaf(Expr::Always)
    }

    /// A missing condition. Evaluates to `false` for every level.
    pub fn absent() -> Self {
        Condition { root: None }
    }

    pub fn is_present(&self) -> bool {
        self.root.is_some()
    }

    /// Requires both this condition and `other`. Fails closed when either is absent.
    pub fn and(&self, other: &Condition) -> Condition {
        Self::leaf(Expr::And(self.root.clone(), other.root.clone()))
    }

    /// Requires this condition or `other`. A single absent operand is ignored;
    /// two absent operands fail closed.
    pub fn or(&self, other: &Condition) -> Condition {
        Self::leaf(Expr::Or(self.root.clone(), other.root.clone()))
    }

    pub fn evaluate(&self, level: Level) -> bool {
        let Some(root) = self.root.as_deref() else {
            return false;
        };

        // right operands still to be joined with the value of their left side
        let mut pending: Vec<(Join, &Expr)> = Vec::new();
        let mut expr = root;
        loop {
            let value = loop {
                match expr {
                    Expr::Below(bound) => break level < *bound,
                    Expr::AtLeast(bound) => break level >= *bound,
                    Expr::Exactly(bound) => break level == *bound,
                    Expr::Always => break true,
                    Expr::And(Some(a), Some(b)) => {
                        pending.push((Join::And, b.as_ref()));
                        expr = a.as_ref();
                    }
                    Expr::And(_, _) => break false,
                    Expr::Or(Some(a), Some(b)) => {
                        pending.push((Join::Or, b.as_ref()));
                        expr = a.as_ref();
                    }
                    Expr::Or(Some(only), None) | Expr::Or(None, Some(only)) => {
                        expr = only.as_ref();
                    }
                    Expr::Or(None, None) => break false,
                }
            };

            loop {
                match pending.pop() {
                    None => return value,
                    Some((Join::And, right)) if value => {
                        expr = right;
                        break;
                    }
                    Some((Join::Or, right)) if !value => {
                        expr = right;
                        break;
                    }
                    // short-circuited: the left value is the result
                    Some(_) => {}
                }
            }
        }
    }
}
