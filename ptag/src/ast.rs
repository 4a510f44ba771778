use std::ops::Range;

/// A syntax tree node of the ptag grammar, shared by the pattern compiler,
/// the expression builder and the guard evaluator.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // Literals
    Name(String),
    Number(f64),
    Str(String),
    Bool(bool),

    /// `~name`
    Capture(String),

    // Operations
    Negate(Box<Node>),
    Not(Box<Node>),
    And(Vec<Node>),
    Or(Vec<Node>),
    Compare {
        op: CompareOp,
        left: Box<Node>,
        right: Box<Node>,
    },

    // Containers
    List(Vec<Node>),
    /// `*expr`, only meaningful as a list pattern element.
    Starred(Box<Node>),
    Record(Vec<RecordEntry>),

    // Postfix forms
    Call {
        function: Box<Node>,
        args: Vec<Node>,
    },
    /// `name=value` inside a call's argument list.
    Keyword {
        name: String,
        value: Box<Node>,
    },
    /// `target[a, b, ...]`; `P[...]` is the guard escape.
    Subscript {
        target: Box<Node>,
        items: Vec<Node>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordEntry {
    Pair(Node, Node),
    /// `**expr`
    Splat(Node),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    NotIn,
}

impl Node {
    pub fn new(kind: NodeKind, span: Range<usize>) -> Self {
        Node { kind, span }
    }

    /// Human-readable name of the grammar form, for error messages.
    pub fn describe(&self) -> &'static str {
        match &self.kind {
            NodeKind::Name(_) => "name",
            NodeKind::Number(_) => "number",
            NodeKind::Str(_) => "string",
            NodeKind::Bool(_) => "boolean",
            NodeKind::Capture(_) => "capture",
            NodeKind::Negate(_) => "negation",
            NodeKind::Not(_) => "'not'",
            NodeKind::And(_) => "'and'",
            NodeKind::Or(_) => "'or'",
            NodeKind::Compare { .. } => "comparison",
            NodeKind::List(_) => "list",
            NodeKind::Starred(_) => "starred element",
            NodeKind::Record(_) => "record",
            NodeKind::Call { .. } => "call",
            NodeKind::Keyword { .. } => "keyword argument",
            NodeKind::Subscript { .. } => "subscript",
        }
    }

    /// True for `P[...]`.
    pub fn is_guard(&self) -> bool {
        matches!(
            &self.kind,
            NodeKind::Subscript { target, .. } if matches!(&target.kind, NodeKind::Name(n) if n == "P")
        )
    }
}
