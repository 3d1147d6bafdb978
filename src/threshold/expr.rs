use std::fmt;
use std::str::FromStr;

use crate::error::ThresholdError;
use crate::metrics::{MetricKind, MetricValue};

/// Left-hand side of a threshold expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregation {
    Percentile(f64),
    Avg,
    Min,
    Max,
    Med,
    Count,
    Rate,
    Value,
}

impl Aggregation {
    /// Whether this aggregation is defined for a metric of `kind`.
    #[must_use]
    pub const fn applies_to(self, kind: MetricKind) -> bool {
        match kind {
            MetricKind::Trend => matches!(
                self,
                Aggregation::Percentile(_)
                    | Aggregation::Avg
                    | Aggregation::Min
                    | Aggregation::Max
                    | Aggregation::Med
                    | Aggregation::Count
            ),
            MetricKind::Rate => matches!(self, Aggregation::Rate),
            MetricKind::Counter => matches!(self, Aggregation::Count | Aggregation::Rate),
            MetricKind::Gauge => matches!(self, Aggregation::Value),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Percentile(p) => write!(f, "p({p})"),
            Aggregation::Avg => f.write_str("avg"),
            Aggregation::Min => f.write_str("min"),
            Aggregation::Max => f.write_str("max"),
            Aggregation::Med => f.write_str("med"),
            Aggregation::Count => f.write_str("count"),
            Aggregation::Rate => f.write_str("rate"),
            Aggregation::Value => f.write_str("value"),
        }
    }
}

impl FromStr for Aggregation {
    type Err = ThresholdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        match value {
            "avg" => return Ok(Aggregation::Avg),
            "min" => return Ok(Aggregation::Min),
            "max" => return Ok(Aggregation::Max),
            "med" => return Ok(Aggregation::Med),
            "count" => return Ok(Aggregation::Count),
            "rate" => return Ok(Aggregation::Rate),
            "value" => return Ok(Aggregation::Value),
            _ => {}
        }
        let Some(inner) = value
            .strip_prefix("p(")
            .and_then(|rest| rest.strip_suffix(')'))
        else {
            return Err(ThresholdError::UnknownAggregation {
                value: value.to_owned(),
            });
        };
        let percentile: f64 = inner
            .trim()
            .parse()
            .map_err(|_parse_err| ThresholdError::InvalidPercentile {
                value: inner.to_owned(),
            })?;
        if !(0.0..=100.0).contains(&percentile) {
            return Err(ThresholdError::InvalidPercentile {
                value: inner.to_owned(),
            });
        }
        Ok(Aggregation::Percentile(percentile))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Operator {
    /// Two-character operators first so `<=` is not read as `<`.
    const TOKENS: [(&'static str, Operator); 6] = [
        ("<=", Operator::Le),
        (">=", Operator::Ge),
        ("==", Operator::Eq),
        ("!=", Operator::Ne),
        ("<", Operator::Lt),
        (">", Operator::Gt),
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Eq => "==",
            Operator::Ne => "!=",
        }
    }

    #[must_use]
    pub fn holds(self, observed: MetricValue, limit: MetricValue) -> bool {
        match self {
            Operator::Lt => observed < limit,
            Operator::Le => observed <= limit,
            Operator::Gt => observed > limit,
            Operator::Ge => observed >= limit,
            Operator::Eq => observed == limit,
            Operator::Ne => observed != limit,
        }
    }
}

/// A parsed `<aggregation> <operator> <number>` expression, e.g. `p(95)<500`.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdExpr {
    pub aggregation: Aggregation,
    pub operator: Operator,
    pub limit: MetricValue,
}

impl ThresholdExpr {
    #[must_use]
    pub fn passes(&self, observed: MetricValue) -> bool {
        self.operator.holds(observed, self.limit)
    }
}

impl fmt::Display for ThresholdExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.aggregation, self.operator.as_str(), self.limit)
    }
}

impl FromStr for ThresholdExpr {
    type Err = ThresholdError;

    fn from_str(expr: &str) -> Result<Self, Self::Err> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Err(ThresholdError::EmptyExpression);
        }
        let Some(op_start) = expr.find(['<', '>', '=', '!']) else {
            return Err(ThresholdError::MissingOperator {
                expr: expr.to_owned(),
            });
        };
        let (lhs, rest) = expr.split_at(op_start);
        let Some((operator, rhs)) = Operator::TOKENS
            .iter()
            .find_map(|(token, op)| rest.strip_prefix(token).map(|rhs| (*op, rhs)))
        else {
            return Err(ThresholdError::MissingOperator {
                expr: expr.to_owned(),
            });
        };
        let aggregation: Aggregation = lhs.parse()?;
        let limit: MetricValue = rhs
            .trim()
            .parse()
            .map_err(|source| ThresholdError::InvalidNumber {
                expr: expr.to_owned(),
                source,
            })?;
        Ok(Self {
            aggregation,
            operator,
            limit,
        })
    }
}
