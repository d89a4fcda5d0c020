use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

use crate::token::Token;

/// Identity of an expression node.
///
/// The resolver records lexical distances against this id rather than against
/// the node's structure: two textually identical `x` references in different
/// scopes must resolve independently.  Ids are unique for the whole process so
/// that REPL lines and imported modules can share one distance map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ExprId(usize);

impl ExprId {
    pub fn fresh() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(0);

        ExprId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LiteralValue {
    Number(f64),
    Str(String),
    True,
    False,
    Nil,
}

/// One piece of an interpolated `f"…"` string.
#[derive(Debug, Clone, Serialize)]
pub enum Segment {
    Text(String),
    Expr(Expr),
}

#[derive(Debug, Clone, Serialize)]
pub enum Expr {
    Literal(LiteralValue),

    /// Prefix operator: `!ready`, `-42`.
    Unary {
        operator: Token,
        right: Box<Expr>,
    },

    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    Grouping(Box<Expr>),

    Variable {
        id: ExprId,
        name: Token,
    },

    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    Call {
        callee: Box<Expr>,
        /// The closing `)` token, retained for error reporting.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// object.property
    Get {
        object: Box<Expr>,
        name: Token,
    },

    /// object.property = value
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    This {
        id: ExprId,
        keyword: Token,
    },

    /// `super.method`
    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },

    /// `f"text {expr} text"`
    Interpolation {
        segments: Vec<Segment>,
        line: usize,
    },

    /// `[n]`, `[n][m]`, … one length per dimension.
    ArrayCreation {
        lengths: Vec<Expr>,
        bracket: Token,
    },

    /// `array[index]`
    Index {
        array: Box<Expr>,
        index: Box<Expr>,
        bracket: Token,
    },

    /// `array[index] = value`
    IndexSet {
        array: Box<Expr>,
        index: Box<Expr>,
        value: Box<Expr>,
        bracket: Token,
    },

    /// `(a, b + 1, f())`
    Tuple(Vec<Expr>),

    /// `(a, (obj.b, arr[0])) = value`
    TupleUnpack {
        targets: Vec<Expr>,
        value: Box<Expr>,
        equal: Token,
    },

    /// The `native` keyword: the holder of built‑in callables.
    Native(Token),
}

impl Expr {
    pub fn line(&self) -> usize {
        match self {
            Expr::Literal(_) => 0,
            Expr::Unary { operator, .. } => operator.line,
            Expr::Binary { operator, .. } => operator.line,
            Expr::Logical { operator, .. } => operator.line,
            Expr::Grouping(expr) => expr.line(),
            Expr::Variable { name, .. } => name.line,
            Expr::Assign { name, .. } => name.line,
            Expr::Call { paren, .. } => paren.line,
            Expr::Get { name, .. } => name.line,
            Expr::Set { name, .. } => name.line,
            Expr::This { keyword, .. } => keyword.line,
            Expr::Super { keyword, .. } => keyword.line,
            Expr::Interpolation { line, .. } => *line,
            Expr::ArrayCreation { bracket, .. } => bracket.line,
            Expr::Index { bracket, .. } => bracket.line,
            Expr::IndexSet { bracket, .. } => bracket.line,
            Expr::Tuple(elements) => elements.first().map_or(0, Expr::line),
            Expr::TupleUnpack { equal, .. } => equal.line,
            Expr::Native(keyword) => keyword.line,
        }
    }

    /// Assignments are not echoed by the REPL.
    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            Expr::Assign { .. } | Expr::Set { .. } | Expr::IndexSet { .. } | Expr::TupleUnpack { .. }
        )
    }

    pub fn variable(name: Token) -> Self {
        Expr::Variable {
            id: ExprId::fresh(),
            name,
        }
    }

    /// Deep copy with new ids on every variable‑referencing node, so the copy
    /// and the original are resolved as distinct references.
    pub fn fresh_copy(&self) -> Expr {
        let mut copy: Expr = self.clone();
        copy.refresh_ids();
        copy
    }

    fn refresh_ids(&mut self) {
        match self {
            Expr::Literal(_) | Expr::Native(_) => {}
            Expr::Variable { id, .. } | Expr::This { id, .. } | Expr::Super { id, .. } => {
                *id = ExprId::fresh();
            }
            Expr::Assign { id, value, .. } => {
                *id = ExprId::fresh();
                value.refresh_ids();
            }
            Expr::Unary { right, .. } => right.refresh_ids(),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                left.refresh_ids();
                right.refresh_ids();
            }
            Expr::Grouping(inner) => inner.refresh_ids(),
            Expr::Call {
                callee, arguments, ..
            } => {
                callee.refresh_ids();
                arguments.iter_mut().for_each(Expr::refresh_ids);
            }
            Expr::Get { object, .. } => object.refresh_ids(),
            Expr::Set { object, value, .. } => {
                object.refresh_ids();
                value.refresh_ids();
            }
            Expr::Interpolation { segments, .. } => {
                for segment in segments {
                    if let Segment::Expr(e) = segment {
                        e.refresh_ids();
                    }
                }
            }
            Expr::ArrayCreation { lengths, .. } => lengths.iter_mut().for_each(Expr::refresh_ids),
            Expr::Index { array, index, .. } => {
                array.refresh_ids();
                index.refresh_ids();
            }
            Expr::IndexSet {
                array,
                index,
                value,
                ..
            } => {
                array.refresh_ids();
                index.refresh_ids();
                value.refresh_ids();
            }
            Expr::Tuple(elements) => elements.iter_mut().for_each(Expr::refresh_ids),
            Expr::TupleUnpack { targets, value, .. } => {
                targets.iter_mut().for_each(Expr::refresh_ids);
                value.refresh_ids();
            }
        }
    }
}
