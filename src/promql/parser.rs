//! Pratt parser for PromQL
//!
//! Covers the subset of the grammar the rule catalog and cost estimator
//! inspect: selectors with matchers, range and subquery brackets,
//! aggregations with by/without in either position, function calls, binary
//! operators with on/ignoring and group modifiers, offsets, and literals.

use super::ast::{BinOp, Expr, LabelMatcher, MatchOp, VectorMatching, VectorSelector};
use super::lexer::{tokenize, Token};
use super::ParseError;

const AGGREGATION_OPS: &[&str] = &[
    "sum", "avg", "min", "max", "count", "stddev", "stdvar", "topk", "bottomk", "quantile",
    "count_values", "group",
];

/// Aggregation ops that take a scalar parameter before the expression.
const PARAMETERIZED_AGGS: &[&str] = &["topk", "bottomk", "quantile", "count_values"];

/// Parse a (substituted) PromQL expression into an AST.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }
    let mut p = Parser { tokens, pos: 0 };
    let expr = p.parse_expr(0)?;
    if p.pos < p.tokens.len() {
        return Err(ParseError::TrailingInput);
    }
    Ok(expr)
}

/// Strip redundant paren layers so range brackets see the selector inside.
fn unwrap_parens(expr: Expr) -> Expr {
    match expr {
        Expr::Paren(inner) => unwrap_parens(*inner),
        other => other,
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, want: &Token) -> Result<(), ParseError> {
        match self.next() {
            Some(tok) if &tok == want => Ok(()),
            other => Err(ParseError::Unexpected(format!(
                "expected {want:?}, found {other:?}"
            ))),
        }
    }

    fn eat_ident(&mut self, word: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(s)) if s == word) {
            self.pos += 1;
            return true;
        }
        false
    }

    /// Binding power for infix operators; 0 means "not an operator here".
    fn binary_op(&self) -> Option<(BinOp, u8)> {
        let op = match self.peek()? {
            Token::Ident(s) => match s.as_str() {
                "or" => (BinOp::Or, 1),
                "and" => (BinOp::And, 2),
                "unless" => (BinOp::Unless, 2),
                _ => return None,
            },
            Token::EqEq => (BinOp::Eq, 3),
            Token::Ne => (BinOp::Ne, 3),
            Token::Gt => (BinOp::Gt, 3),
            Token::Lt => (BinOp::Lt, 3),
            Token::Ge => (BinOp::Ge, 3),
            Token::Le => (BinOp::Le, 3),
            Token::Plus => (BinOp::Add, 4),
            Token::Minus => (BinOp::Sub, 4),
            Token::Star => (BinOp::Mul, 5),
            Token::Slash => (BinOp::Div, 5),
            Token::Percent => (BinOp::Mod, 5),
            Token::Caret => (BinOp::Pow, 6),
            _ => return None,
        };
        Some(op)
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;

        while let Some((op, bp)) = self.binary_op() {
            if bp < min_bp {
                break;
            }
            self.pos += 1;

            // `bool` modifier on comparisons; the analyzer ignores it.
            self.eat_ident("bool");

            let matching = self.parse_vector_matching()?;

            // ^ is right-associative, everything else left.
            let next_bp = if op == BinOp::Pow { bp } else { bp + 1 };
            let rhs = self.parse_expr(next_bp)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                matching,
            };
        }

        Ok(lhs)
    }

    fn parse_vector_matching(&mut self) -> Result<Option<VectorMatching>, ParseError> {
        let on = if self.eat_ident("on") {
            true
        } else if self.eat_ident("ignoring") {
            false
        } else {
            return Ok(None);
        };
        let labels = self.parse_label_list()?;

        // group_left/group_right with optional label list.
        if self.eat_ident("group_left") || self.eat_ident("group_right") {
            if matches!(self.peek(), Some(Token::LParen)) {
                self.parse_label_list()?;
            }
        }
        Ok(Some(VectorMatching { on, labels }))
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::Unary(Box::new(self.parse_unary()?)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.parse_unary()
            }
            _ => self.parse_postfix(),
        }
    }

    /// A primary expression followed by `[range]`, `[range:step]`, and
    /// `offset` modifiers.
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek() {
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let range_secs = match self.next() {
                        Some(Token::Duration(d)) => d,
                        other => {
                            return Err(ParseError::Unexpected(format!(
                                "expected duration in range brackets, found {other:?}"
                            )))
                        }
                    };
                    if matches!(self.peek(), Some(Token::Colon)) {
                        self.pos += 1;
                        let step_secs = match self.peek() {
                            Some(Token::Duration(d)) => {
                                let d = *d;
                                self.pos += 1;
                                Some(d)
                            }
                            _ => None,
                        };
                        self.expect(&Token::RBracket)?;
                        expr = Expr::Subquery {
                            expr: Box::new(expr),
                            range_secs,
                            step_secs,
                        };
                    } else {
                        self.expect(&Token::RBracket)?;
                        // Parens around the selector are legal: (m)[5m].
                        match unwrap_parens(expr) {
                            Expr::Selector(selector) => {
                                expr = Expr::Matrix {
                                    selector,
                                    range_secs,
                                };
                            }
                            _ => {
                                return Err(ParseError::Unexpected(
                                    "range brackets on a non-selector expression".into(),
                                ))
                            }
                        }
                    }
                }
                Some(Token::Ident(s)) if s == "offset" => {
                    self.pos += 1;
                    let negate = if matches!(self.peek(), Some(Token::Minus)) {
                        self.pos += 1;
                        true
                    } else {
                        false
                    };
                    let dur = match self.next() {
                        Some(Token::Duration(d)) => d,
                        other => {
                            return Err(ParseError::Unexpected(format!(
                                "expected duration after offset, found {other:?}"
                            )))
                        }
                    };
                    let offset = if negate { -dur } else { dur };
                    match &mut expr {
                        Expr::Selector(vs) | Expr::Matrix { selector: vs, .. } => {
                            vs.offset_secs = Some(offset);
                        }
                        // Subquery offsets are legal but carry no analysis
                        // signal; consumed and dropped.
                        _ => {}
                    }
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::NumberLiteral(n)),
            Some(Token::Str(s)) => Ok(Expr::StringLiteral(s)),
            Some(Token::LParen) => {
                let inner = self.parse_expr(0)?;
                self.expect(&Token::RParen)?;
                Ok(Expr::Paren(Box::new(inner)))
            }
            Some(Token::LBrace) => {
                let matchers = self.parse_matchers()?;
                Ok(Expr::Selector(VectorSelector {
                    name: None,
                    matchers,
                    offset_secs: None,
                }))
            }
            Some(Token::Ident(name)) => self.parse_ident(name),
            other => Err(ParseError::Unexpected(format!(
                "expected expression, found {other:?}"
            ))),
        }
    }

    /// An identifier begins an aggregation, a function call, or a selector.
    fn parse_ident(&mut self, name: String) -> Result<Expr, ParseError> {
        if AGGREGATION_OPS.contains(&name.as_str()) {
            return self.parse_aggregate(name);
        }

        if matches!(self.peek(), Some(Token::LParen)) {
            self.pos += 1;
            let mut args = Vec::new();
            if !matches!(self.peek(), Some(Token::RParen)) {
                loop {
                    args.push(self.parse_expr(0)?);
                    if matches!(self.peek(), Some(Token::Comma)) {
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
            }
            self.expect(&Token::RParen)?;
            return Ok(Expr::Call { func: name, args });
        }

        let matchers = if matches!(self.peek(), Some(Token::LBrace)) {
            self.pos += 1;
            self.parse_matchers()?
        } else {
            Vec::new()
        };
        Ok(Expr::Selector(VectorSelector {
            name: Some(name),
            matchers,
            offset_secs: None,
        }))
    }

    /// `sum by (a,b) (expr)`, `sum(expr) by (a,b)`, `topk(5, expr)`.
    fn parse_aggregate(&mut self, op: String) -> Result<Expr, ParseError> {
        let mut grouping = Vec::new();
        let mut without = false;

        if self.eat_ident("by") {
            grouping = self.parse_label_list()?;
        } else if self.eat_ident("without") {
            without = true;
            grouping = self.parse_label_list()?;
        }

        self.expect(&Token::LParen)?;
        let first = self.parse_expr(0)?;
        let (param, expr) = if matches!(self.peek(), Some(Token::Comma)) {
            self.pos += 1;
            let second = self.parse_expr(0)?;
            if !PARAMETERIZED_AGGS.contains(&op.as_str()) {
                return Err(ParseError::Unexpected(format!(
                    "aggregation {op} takes a single argument"
                )));
            }
            (Some(Box::new(first)), second)
        } else {
            (None, first)
        };
        self.expect(&Token::RParen)?;

        // Trailing by/without clause.
        if grouping.is_empty() {
            if self.eat_ident("by") {
                grouping = self.parse_label_list()?;
            } else if self.eat_ident("without") {
                without = true;
                grouping = self.parse_label_list()?;
            }
        }

        Ok(Expr::Aggregate {
            op,
            expr: Box::new(expr),
            param,
            grouping,
            without,
        })
    }

    fn parse_label_list(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect(&Token::LParen)?;
        let mut labels = Vec::new();
        loop {
            match self.next() {
                Some(Token::Ident(l)) => labels.push(l),
                Some(Token::RParen) if labels.is_empty() => return Ok(labels),
                other => {
                    return Err(ParseError::Unexpected(format!(
                        "expected label name, found {other:?}"
                    )))
                }
            }
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(labels),
                other => {
                    return Err(ParseError::Unexpected(format!(
                        "expected ',' or ')' in label list, found {other:?}"
                    )))
                }
            }
        }
    }

    /// Matcher list after `{`; consumes the closing `}`.
    fn parse_matchers(&mut self) -> Result<Vec<LabelMatcher>, ParseError> {
        let mut matchers = Vec::new();
        if matches!(self.peek(), Some(Token::RBrace)) {
            self.pos += 1;
            return Ok(matchers);
        }
        loop {
            let name = match self.next() {
                Some(Token::Ident(n)) => n,
                other => {
                    return Err(ParseError::Unexpected(format!(
                        "expected label name in matchers, found {other:?}"
                    )))
                }
            };
            let op = match self.next() {
                Some(Token::Eq) => MatchOp::Equal,
                Some(Token::Ne) => MatchOp::NotEqual,
                Some(Token::EqRegex) => MatchOp::Regex,
                Some(Token::NeRegex) => MatchOp::NotRegex,
                other => {
                    return Err(ParseError::Unexpected(format!(
                        "expected matcher operator, found {other:?}"
                    )))
                }
            };
            let value = match self.next() {
                Some(Token::Str(v)) => v,
                other => {
                    return Err(ParseError::Unexpected(format!(
                        "expected quoted matcher value, found {other:?}"
                    )))
                }
            };
            matchers.push(LabelMatcher { name, op, value });

            match self.next() {
                Some(Token::Comma) => {
                    // Trailing comma before `}` is legal.
                    if matches!(self.peek(), Some(Token::RBrace)) {
                        self.pos += 1;
                        return Ok(matchers);
                    }
                }
                Some(Token::RBrace) => return Ok(matchers),
                other => {
                    return Err(ParseError::Unexpected(format!(
                        "expected ',' or '}}' in matchers, found {other:?}"
                    )))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_selector() {
        let expr = parse("up").unwrap();
        match expr {
            Expr::Selector(vs) => {
                assert_eq!(vs.name.as_deref(), Some("up"));
                assert!(vs.matchers.is_empty());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn selector_with_matchers() {
        let expr = parse(r#"http_requests_total{job="api", path=~"/v1/.*"}"#).unwrap();
        match expr {
            Expr::Selector(vs) => {
                assert_eq!(vs.real_matcher_count(), 2);
                assert_eq!(vs.matchers[1].op, MatchOp::Regex);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn rate_over_matrix() {
        let expr = parse("rate(http_requests_total[5m])").unwrap();
        match expr {
            Expr::Call { func, args } => {
                assert_eq!(func, "rate");
                assert!(matches!(&args[0], Expr::Matrix { range_secs, .. } if *range_secs == 300.0));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn aggregate_by_prefix_and_suffix() {
        for q in [
            "sum by (job, instance) (rate(m[5m]))",
            "sum(rate(m[5m])) by (job, instance)",
        ] {
            match parse(q).unwrap() {
                Expr::Aggregate { op, grouping, without, .. } => {
                    assert_eq!(op, "sum");
                    assert_eq!(grouping, vec!["job", "instance"]);
                    assert!(!without);
                }
                other => panic!("unexpected for {q}: {other:?}"),
            }
        }
    }

    #[test]
    fn aggregate_without() {
        match parse("sum without (pod) (m)").unwrap() {
            Expr::Aggregate { without, grouping, .. } => {
                assert!(without);
                assert_eq!(grouping, vec!["pod"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parameterized_aggregate() {
        match parse("topk(5, rate(m[1m]))").unwrap() {
            Expr::Aggregate { op, param, .. } => {
                assert_eq!(op, "topk");
                assert!(matches!(param.as_deref(), Some(Expr::NumberLiteral(n)) if *n == 5.0));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn binary_with_matching() {
        match parse("a / on(job) group_left b").unwrap() {
            Expr::Binary { op, matching, .. } => {
                assert_eq!(op, BinOp::Div);
                let m = matching.unwrap();
                assert!(m.on);
                assert_eq!(m.labels, vec!["job"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn comparison_with_bool() {
        match parse("up == bool 1").unwrap() {
            Expr::Binary { op, .. } => assert_eq!(op, BinOp::Eq),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn subquery_with_step() {
        match parse("max_over_time(rate(m[1m])[1h:30s])").unwrap() {
            Expr::Call { args, .. } => match &args[0] {
                Expr::Subquery { range_secs, step_secs, .. } => {
                    assert_eq!(*range_secs, 3600.0);
                    assert_eq!(*step_secs, Some(30.0));
                }
                other => panic!("unexpected: {other:?}"),
            },
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn subquery_without_step() {
        match parse("avg_over_time(m[1h:])").unwrap() {
            Expr::Call { args, .. } => {
                assert!(matches!(&args[0], Expr::Subquery { step_secs: None, .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn offset_modifier() {
        match parse("rate(m[5m] offset 1h)").unwrap() {
            Expr::Call { args, .. } => match &args[0] {
                Expr::Matrix { selector, .. } => {
                    assert_eq!(selector.offset_secs, Some(3600.0));
                }
                other => panic!("unexpected: {other:?}"),
            },
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn precedence() {
        // a + b * c parses as a + (b * c)
        match parse("a + b * c").unwrap() {
            Expr::Binary { op: BinOp::Add, rhs, .. } => {
                assert!(matches!(*rhs, Expr::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn set_operators() {
        match parse("up and on(instance) node_up").unwrap() {
            Expr::Binary { op, matching, .. } => {
                assert_eq!(op, BinOp::And);
                assert!(op.is_set_op());
                assert!(matching.unwrap().on);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn name_only_matchers() {
        match parse(r#"{__name__="up"}"#).unwrap() {
            Expr::Selector(vs) => {
                assert_eq!(vs.metric_name(), Some("up"));
                assert_eq!(vs.real_matcher_count(), 0);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn recording_rule_name() {
        match parse("job:http_requests:rate5m").unwrap() {
            Expr::Selector(vs) => assert_eq!(vs.name.as_deref(), Some("job:http_requests:rate5m")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn range_on_parenthesized_selector() {
        match parse("rate((http_requests_total)[5m])").unwrap() {
            Expr::Call { args, .. } => match &args[0] {
                Expr::Matrix { selector, range_secs } => {
                    assert_eq!(selector.name.as_deref(), Some("http_requests_total"));
                    assert_eq!(*range_secs, 300.0);
                }
                other => panic!("unexpected: {other:?}"),
            },
            other => panic!("unexpected: {other:?}"),
        }
        // Only selectors may carry plain range brackets, parens or not.
        assert!(parse("(a + b)[5m]").is_err());
    }

    #[test]
    fn parse_errors_are_errors() {
        assert!(parse("").is_err());
        assert!(parse("rate(").is_err());
        assert!(parse("up{job=}").is_err());
        assert!(parse("sum by (123) (m)").is_err());
        assert!(parse("(m[5m])[1m]").is_err());
    }
}
