//! PromQL abstract syntax tree
//!
//! A closed sum type over the node kinds the analyzer cares about. All
//! recursive algorithms (rule shape-matching, cost estimation) are pure
//! functions over this enum; there is no open dispatch.

/// Label matcher operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOp {
    Equal,
    NotEqual,
    Regex,
    NotRegex,
}

impl std::fmt::Display for MatchOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchOp::Equal => write!(f, "="),
            MatchOp::NotEqual => write!(f, "!="),
            MatchOp::Regex => write!(f, "=~"),
            MatchOp::NotRegex => write!(f, "!~"),
        }
    }
}

/// A single label matcher, e.g. `job="api"` or `path=~"/v1/.*"`.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMatcher {
    pub name: String,
    pub op: MatchOp,
    pub value: String,
}

/// An instant vector selector, e.g. `http_requests_total{job="api"}`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VectorSelector {
    /// Metric name; `None` for pure matcher selectors like `{__name__="up"}`.
    pub name: Option<String>,
    pub matchers: Vec<LabelMatcher>,
    pub offset_secs: Option<f64>,
}

impl VectorSelector {
    /// The metric name, falling back to an explicit `__name__` matcher.
    pub fn metric_name(&self) -> Option<&str> {
        if let Some(name) = &self.name {
            return Some(name);
        }
        self.matchers
            .iter()
            .find(|m| m.name == "__name__")
            .map(|m| m.value.as_str())
    }

    /// Count of matchers excluding the implicit `__name__` matcher.
    pub fn real_matcher_count(&self) -> usize {
        self.matchers.iter().filter(|m| m.name != "__name__").count()
    }
}

/// Binary operator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    And,
    Or,
    Unless,
}

impl BinOp {
    /// Set-membership operators always vector-match; the ambiguous-matching
    /// rule skips them.
    pub fn is_set_op(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or | BinOp::Unless)
    }
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "^",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Gt => ">",
            BinOp::Lt => "<",
            BinOp::Ge => ">=",
            BinOp::Le => "<=",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Unless => "unless",
        };
        write!(f, "{s}")
    }
}

/// Explicit vector-matching clause on a binary operation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VectorMatching {
    /// True for `on(...)`, false for `ignoring(...)`.
    pub on: bool,
    pub labels: Vec<String>,
}

/// A parsed PromQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `metric{label="v"}`
    Selector(VectorSelector),
    /// `metric{...}[5m]`
    Matrix {
        selector: VectorSelector,
        range_secs: f64,
    },
    /// `expr[1h:30s]`
    Subquery {
        expr: Box<Expr>,
        range_secs: f64,
        step_secs: Option<f64>,
    },
    /// `rate(...)`, `histogram_quantile(0.9, ...)`
    Call { func: String, args: Vec<Expr> },
    /// `sum by (job) (...)`, `topk(5, ...)`
    Aggregate {
        op: String,
        expr: Box<Expr>,
        param: Option<Box<Expr>>,
        grouping: Vec<String>,
        without: bool,
    },
    /// `a / b`, `x > bool 0`
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        matching: Option<VectorMatching>,
    },
    /// `-expr`
    Unary(Box<Expr>),
    /// `(expr)`
    Paren(Box<Expr>),
    NumberLiteral(f64),
    StringLiteral(String),
}

impl Expr {
    /// Pre-order traversal: calls `f` on this node, then on every child.
    pub fn walk<'a, F: FnMut(&'a Expr)>(&'a self, f: &mut F) {
        f(self);
        match self {
            Expr::Selector(_) | Expr::Matrix { .. } => {}
            Expr::Subquery { expr, .. } | Expr::Unary(expr) | Expr::Paren(expr) => {
                expr.walk(f);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.walk(f);
                }
            }
            Expr::Aggregate { expr, param, .. } => {
                if let Some(p) = param {
                    p.walk(f);
                }
                expr.walk(f);
            }
            Expr::Binary { lhs, rhs, .. } => {
                lhs.walk(f);
                rhs.walk(f);
            }
            Expr::NumberLiteral(_) | Expr::StringLiteral(_) => {}
        }
    }

    /// True if any node in the tree satisfies the predicate.
    pub fn any(&self, pred: impl Fn(&Expr) -> bool) -> bool {
        let mut found = false;
        self.walk(&mut |node| {
            if pred(node) {
                found = true;
            }
        });
        found
    }

    /// The metric name of the first selector found in pre-order, descending
    /// through matrix selectors, calls, parens, and unary wrappers.
    pub fn first_metric_name(&self) -> Option<&str> {
        let mut name = None;
        self.walk(&mut |node| {
            if name.is_some() {
                return;
            }
            match node {
                Expr::Selector(vs) | Expr::Matrix { selector: vs, .. } => {
                    name = vs.metric_name();
                }
                _ => {}
            }
        });
        name
    }
}
