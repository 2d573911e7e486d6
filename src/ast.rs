//! Abstract syntax tree for compiled FDQL queries.
//!
//! A [`Query`] is the validated, typed form of an incoming JSON query
//! document. It is built once by the parser, is immutable afterwards, and is
//! the only shape the executor ever sees: every downstream stage matches
//! exhaustively over these variants, so no untyped field access survives past
//! compilation.

/// A compiled query. All field-keys referenced anywhere inside share the
/// single `dataset_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Filter tree from WHERE. `None` means every record matches.
    pub filter: Option<Filter>,
    /// Projection and ordering from OPTIONS.
    pub options: Options,
    /// Optional grouping/aggregation step from TRANSFORMATIONS.
    pub transformation: Option<Transformation>,
    /// Dataset identifier inferred from the referenced field-keys.
    pub dataset_id: String,
}

/// Boolean predicate tree evaluated per record.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Logical AND over a non-empty child list.
    And(Vec<Filter>),
    /// Logical OR over a non-empty child list.
    Or(Vec<Filter>),
    /// Logical negation.
    Not(Box<Filter>),
    /// Numeric comparison against a literal.
    Comparison {
        op: ComparisonOp,
        key: String,
        value: f64,
    },
    /// Wildcard string match against a text field.
    Wildcard { key: String, pattern: WildcardPattern },
}

/// Numeric comparison operators (LT, GT, EQ).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Lt,
    Gt,
    Eq,
}

impl ComparisonOp {
    /// The query-document key for this operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOp::Lt => "LT",
            ComparisonOp::Gt => "GT",
            ComparisonOp::Eq => "EQ",
        }
    }
}

/// A compiled IS pattern. The `*` wildcard may anchor the pattern on either
/// end; interior wildcards are rejected by the parser, so matching never has
/// to consider them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WildcardPattern {
    /// No wildcard: exact equality.
    Exact(String),
    /// Trailing `*`: the text must start with the stem.
    Prefix(String),
    /// Leading `*`: the text must end with the stem.
    Suffix(String),
    /// Wildcards on both ends: the text must contain the stem.
    Contains(String),
}

impl WildcardPattern {
    /// Test a text value against this pattern.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            WildcardPattern::Exact(s) => text == s,
            WildcardPattern::Prefix(s) => text.starts_with(s),
            WildcardPattern::Suffix(s) => text.ends_with(s),
            WildcardPattern::Contains(s) => text.contains(s),
        }
    }
}

/// Projection columns and result ordering from OPTIONS.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Output keys to retain on every result row. Never empty.
    pub columns: Vec<String>,
    /// Result ordering. `None` leaves the pipeline order untouched, which is
    /// implementation-defined (filter order, or group-discovery order when a
    /// transformation ran).
    pub order: Option<Order>,
}

/// Result ordering.
#[derive(Debug, Clone, PartialEq)]
pub enum Order {
    /// Single key, ascending.
    Single(String),
    /// Multiple keys compared in listed order, one direction for all keys.
    Multi { dir: Direction, keys: Vec<String> },
}

/// Sort direction for multi-key ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Grouping/aggregation step from TRANSFORMATIONS.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformation {
    /// Field-keys whose value tuple defines a group. Never empty.
    pub group: Vec<String>,
    /// Aggregates computed per group. May be empty, in which case grouping
    /// only collapses duplicate group tuples.
    pub apply: Vec<ApplyRule>,
}

/// One synthesized aggregate column.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyRule {
    /// Name of the synthesized column. Contains no underscore and is not
    /// bound to any dataset.
    pub output_key: String,
    pub token: ApplyToken,
    /// Key the aggregate reads from each group member.
    pub source_key: String,
}

/// Aggregation operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyToken {
    Max,
    Min,
    Avg,
    Count,
    Sum,
}

impl ApplyToken {
    /// Parse a token name from a query document. Returns `None` for
    /// unrecognized tokens.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "MAX" => Some(ApplyToken::Max),
            "MIN" => Some(ApplyToken::Min),
            "AVG" => Some(ApplyToken::Avg),
            "COUNT" => Some(ApplyToken::Count),
            "SUM" => Some(ApplyToken::Sum),
            _ => None,
        }
    }

    /// The query-document name of this token.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyToken::Max => "MAX",
            ApplyToken::Min => "MIN",
            ApplyToken::Avg => "AVG",
            ApplyToken::Count => "COUNT",
            ApplyToken::Sum => "SUM",
        }
    }
}
