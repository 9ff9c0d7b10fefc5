//! Threshold evaluation
//!
//! Rules are checked once, against the final snapshot. A breach only
//! affects the exit status; it never touches metrics or stops a phase.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::results::Snapshot;

const STATS: [&str; 8] = ["p(90)", "p(95)", "avg", "min", "med", "max", "count", "rate"];

/// Threshold errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ThresholdError {
    #[error("unknown statistic in threshold '{0}'")]
    UnknownStat(String),

    #[error("missing comparison operator in threshold '{0}'")]
    MissingOperator(String),

    #[error("invalid bound in threshold '{0}'")]
    InvalidBound(String),
}

/// Comparison operator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl Op {
    pub fn holds(self, value: f64, bound: f64) -> bool {
        match self {
            Op::Lt => value < bound,
            Op::Le => value <= bound,
            Op::Gt => value > bound,
            Op::Ge => value >= bound,
            Op::Eq => (value - bound).abs() < f64::EPSILON,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Eq => "==",
        }
    }
}

/// Parsed `<stat><op><number>` expression
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub stat: &'static str,
    pub op: Op,
    pub bound: f64,
}

impl FromStr for Expr {
    type Err = ThresholdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();

        let stat = STATS
            .iter()
            .find(|name| compact.starts_with(*name))
            .copied()
            .ok_or_else(|| ThresholdError::UnknownStat(s.to_string()))?;
        let rest = &compact[stat.len()..];

        // two-character operators first
        let (op, bound) = [
            ("<=", Op::Le),
            (">=", Op::Ge),
            ("==", Op::Eq),
            ("<", Op::Lt),
            (">", Op::Gt),
        ]
        .iter()
        .find_map(|(sym, op)| rest.strip_prefix(sym).map(|b| (*op, b)))
        .ok_or_else(|| ThresholdError::MissingOperator(s.to_string()))?;

        let bound = bound
            .parse::<f64>()
            .ok()
            .filter(|b| b.is_finite())
            .ok_or_else(|| ThresholdError::InvalidBound(s.to_string()))?;

        Ok(Self { stat, op, bound })
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.stat, self.op.symbol(), self.bound)
    }
}

/// Pass/fail rule on one metric
#[derive(Clone, Debug, PartialEq)]
pub struct Threshold {
    pub metric: String,
    pub expr: Expr,
}

impl Threshold {
    pub fn parse(metric: &str, expr: &str) -> Result<Self, ThresholdError> {
        Ok(Self {
            metric: metric.to_string(),
            expr: expr.parse()?,
        })
    }

    pub fn evaluate(&self, snapshot: &Snapshot) -> Outcome {
        match snapshot.stat(&self.metric, self.expr.stat) {
            Some(value) if self.expr.op.holds(value, self.expr.bound) => Outcome::Pass(value),
            Some(value) => Outcome::Fail(value),
            None => Outcome::NoData,
        }
    }
}

/// Result of one rule
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Outcome {
    Pass(f64),
    Fail(f64),
    /// Metric or statistic absent from the snapshot
    NoData,
}

impl Outcome {
    pub fn is_breach(&self) -> bool {
        matches!(self, Outcome::Fail(_))
    }
}

/// Rule paired with its outcome
#[derive(Clone, Debug, PartialEq)]
pub struct Verdict {
    pub threshold: Threshold,
    pub outcome: Outcome,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = &self.threshold;
        match self.outcome {
            Outcome::Pass(v) => write!(f, "✓ {} {} (actual {:.4})", t.metric, t.expr, v),
            Outcome::Fail(v) => write!(f, "✗ {} {} (actual {:.4})", t.metric, t.expr, v),
            Outcome::NoData => write!(f, "- {} {} (no data)", t.metric, t.expr),
        }
    }
}

/// Evaluate every rule against a snapshot
pub fn evaluate(thresholds: &[Threshold], snapshot: &Snapshot) -> Vec<Verdict> {
    thresholds
        .iter()
        .map(|threshold| Verdict {
            threshold: threshold.clone(),
            outcome: threshold.evaluate(snapshot),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::MetricSummary;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn snapshot() -> Snapshot {
        let mut metrics = BTreeMap::new();
        metrics.insert(
            "http_req_duration".to_string(),
            MetricSummary {
                min: Some(3.0),
                avg: Some(120.0),
                med: Some(100.0),
                p90: Some(900.0),
                p95: Some(1500.0),
                max: Some(2400.0),
                ..Default::default()
            },
        );
        metrics.insert(
            "rest_http_errors".to_string(),
            MetricSummary {
                count: Some(200.0),
                rate: Some(0.12),
                ..Default::default()
            },
        );
        Snapshot {
            label: "REST Waterfall".to_string(),
            timestamp: Utc::now(),
            metrics,
        }
    }

    #[test]
    fn test_parse_expressions() {
        let e: Expr = "p(95)<2000".parse().unwrap();
        assert_eq!((e.stat, e.op, e.bound), ("p(95)", Op::Lt, 2000.0));

        let e: Expr = "rate <= 0.1".parse().unwrap();
        assert_eq!((e.stat, e.op, e.bound), ("rate", Op::Le, 0.1));

        let e: Expr = "count>=10".parse().unwrap();
        assert_eq!(e.op, Op::Ge);
        assert_eq!(e.to_string(), "count>=10");
    }

    #[test]
    fn test_reject_bad_expressions() {
        assert!(matches!(
            "p(99)<10".parse::<Expr>(),
            Err(ThresholdError::UnknownStat(_))
        ));
        assert!(matches!(
            "avg 10".parse::<Expr>(),
            Err(ThresholdError::MissingOperator(_))
        ));
        assert!(matches!(
            "avg<fast".parse::<Expr>(),
            Err(ThresholdError::InvalidBound(_))
        ));
    }

    #[test]
    fn test_evaluate_against_snapshot() {
        let rules = vec![
            Threshold::parse("http_req_duration", "p(95)<2000").unwrap(),
            Threshold::parse("rest_http_errors", "rate<0.1").unwrap(),
            Threshold::parse("graphql_errors", "rate<0.1").unwrap(),
        ];

        let verdicts = evaluate(&rules, &snapshot());

        assert_eq!(verdicts[0].outcome, Outcome::Pass(1500.0));
        assert_eq!(verdicts[1].outcome, Outcome::Fail(0.12));
        assert!(verdicts[1].outcome.is_breach());
        assert_eq!(verdicts[2].outcome, Outcome::NoData);
        assert!(!verdicts[2].outcome.is_breach());
    }

    #[test]
    fn test_absent_stat_is_no_data() {
        // counter-only metrics carry no percentiles
        let rule = Threshold::parse("rest_http_errors", "p(95)<10").unwrap();
        assert_eq!(rule.evaluate(&snapshot()), Outcome::NoData);
    }
}
