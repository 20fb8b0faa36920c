//! Parser for textual MTL expressions
//!
//! The grammar lives in `mtl_format.pest`; see the comments there for the
//! accepted syntax. Parsing reports errors through `anyhow` with enough
//! context to point at the offending part of the input.

use anyhow::{Context, Error, anyhow, bail};
use log::trace;
use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

use crate::interval::{BoundKind, TimeInterval};
use crate::MTLFormula;

#[allow(missing_docs)]
#[derive(Parser)]
#[grammar = "./mtl_format.pest"]
struct PestMtlParser;

/// Parse an MTL expression.
///
/// # Example
///
/// ```
/// use vigil_logic::parser::parse_formula;
/// use vigil_logic::MTLFormula;
/// use vigil_logic::interval::TimeInterval;
///
/// let formula = parse_formula("p U[0,2] q").unwrap();
/// let expected = MTLFormula::ap("p").until(MTLFormula::ap("q"), TimeInterval::closed(0, 2));
/// assert_eq!(formula, expected);
/// ```
pub fn parse_formula(input: &str) -> Result<MTLFormula, Error> {
    let mut pairs = PestMtlParser::parse(Rule::mtl, input)
        .with_context(|| format!("failed to parse MTL expression '{input}'"))?;
    let mtl = pairs.next().ok_or_else(|| anyhow!("empty parse result"))?;
    let expr = mtl
        .into_inner()
        .find(|pair| pair.as_rule() == Rule::expr)
        .ok_or_else(|| anyhow!("parse result misses the expression"))?;
    let formula = parse_expr(expr)?;
    trace!("Parsed MTL expression '{input}' into {formula}");
    Ok(formula)
}

fn parse_expr(pair: Pair<'_, Rule>) -> Result<MTLFormula, Error> {
    let until = pair
        .into_inner()
        .next()
        .ok_or_else(|| anyhow!("expression without content"))?;
    parse_until(until)
}

fn parse_until(pair: Pair<'_, Rule>) -> Result<MTLFormula, Error> {
    let mut inner = pair.into_inner();
    let lhs = parse_or(inner.next().ok_or_else(|| anyhow!("missing left operand"))?)?;
    let Some(op) = inner.next() else {
        return Ok(lhs);
    };
    let is_dual = op.as_str() == "D";
    let mut interval = TimeInterval::unbounded();
    let mut rhs_pair = inner.next().ok_or_else(|| anyhow!("missing right operand"))?;
    if rhs_pair.as_rule() == Rule::interval {
        interval = parse_interval(rhs_pair)?;
        rhs_pair = inner.next().ok_or_else(|| anyhow!("missing right operand"))?;
    }
    let rhs = parse_or(rhs_pair)?;
    if is_dual {
        Ok(lhs.dual_until(rhs, interval))
    } else {
        Ok(lhs.until(rhs, interval))
    }
}

fn parse_or(pair: Pair<'_, Rule>) -> Result<MTLFormula, Error> {
    let mut result: Option<MTLFormula> = None;
    for operand in pair.into_inner() {
        let parsed = parse_and(operand)?;
        result = Some(match result {
            None => parsed,
            Some(acc) => acc | parsed,
        });
    }
    result.ok_or_else(|| anyhow!("disjunction without operands"))
}

fn parse_and(pair: Pair<'_, Rule>) -> Result<MTLFormula, Error> {
    let mut result: Option<MTLFormula> = None;
    for operand in pair.into_inner() {
        let parsed = parse_unary(operand)?;
        result = Some(match result {
            None => parsed,
            Some(acc) => acc & parsed,
        });
    }
    result.ok_or_else(|| anyhow!("conjunction without operands"))
}

fn parse_unary(pair: Pair<'_, Rule>) -> Result<MTLFormula, Error> {
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| anyhow!("unary expression without content"))?;
    match inner.as_rule() {
        Rule::not_expr => {
            let operand = inner
                .into_inner()
                .next()
                .ok_or_else(|| anyhow!("negation without operand"))?;
            Ok(!parse_unary(operand)?)
        }
        Rule::finally_expr => {
            let (interval, operand) = parse_temporal_operands(inner)?;
            Ok(MTLFormula::finally(operand, interval))
        }
        Rule::globally_expr => {
            let (interval, operand) = parse_temporal_operands(inner)?;
            Ok(MTLFormula::globally(operand, interval))
        }
        Rule::primary => parse_primary(inner),
        rule => bail!("unexpected rule {rule:?} in unary expression"),
    }
}

fn parse_temporal_operands(pair: Pair<'_, Rule>) -> Result<(TimeInterval, MTLFormula), Error> {
    let mut interval = TimeInterval::unbounded();
    let mut operand = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::interval => interval = parse_interval(inner)?,
            Rule::unary_expr => operand = Some(parse_unary(inner)?),
            rule => bail!("unexpected rule {rule:?} in temporal operator"),
        }
    }
    let operand = operand.ok_or_else(|| anyhow!("temporal operator without operand"))?;
    Ok((interval, operand))
}

fn parse_primary(pair: Pair<'_, Rule>) -> Result<MTLFormula, Error> {
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| anyhow!("empty primary expression"))?;
    match inner.as_rule() {
        Rule::boolean_true => Ok(MTLFormula::True),
        Rule::boolean_false => Ok(MTLFormula::False),
        Rule::identifier => Ok(MTLFormula::ap(inner.as_str())),
        Rule::expr => parse_expr(inner),
        rule => bail!("unexpected rule {rule:?} in primary expression"),
    }
}

fn parse_interval(pair: Pair<'_, Rule>) -> Result<TimeInterval, Error> {
    let mut lower_kind = BoundKind::Weak;
    let mut lower = 0;
    let mut upper_kind = BoundKind::Weak;
    let mut upper = 0;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::lower_bracket => {
                lower_kind = if inner.as_str() == "[" { BoundKind::Weak } else { BoundKind::Strict };
            }
            Rule::number => {
                lower = inner
                    .as_str()
                    .parse()
                    .with_context(|| format!("invalid interval bound '{}'", inner.as_str()))?;
            }
            Rule::upper_value => {
                let value = inner
                    .into_inner()
                    .next()
                    .ok_or_else(|| anyhow!("interval misses its upper bound"))?;
                match value.as_rule() {
                    Rule::infinity => upper_kind = BoundKind::Unbounded,
                    Rule::number => {
                        upper = value
                            .as_str()
                            .parse()
                            .with_context(|| format!("invalid interval bound '{}'", value.as_str()))?;
                    }
                    rule => bail!("unexpected rule {rule:?} in interval bound"),
                }
            }
            Rule::upper_bracket => {
                if upper_kind != BoundKind::Unbounded && inner.as_str() == ")" {
                    upper_kind = BoundKind::Strict;
                }
            }
            rule => bail!("unexpected rule {rule:?} in interval"),
        }
    }
    let interval = TimeInterval::new(lower, lower_kind, upper, upper_kind);
    if interval.is_empty() {
        bail!("interval {interval} is empty");
    }
    Ok(interval)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_boolean_connectives() {
        let formula = parse_formula("p && !q || r").unwrap();
        let expected =
            (MTLFormula::ap("p") & !MTLFormula::ap("q")) | MTLFormula::ap("r");
        assert_eq!(formula, expected);
    }

    #[test]
    fn parses_temporal_operators_with_intervals() {
        let formula = parse_formula("F[0,2] p").unwrap();
        assert_eq!(formula, MTLFormula::finally(MTLFormula::ap("p"), TimeInterval::closed(0, 2)));

        let formula = parse_formula("G p").unwrap();
        assert_eq!(formula, MTLFormula::globally(MTLFormula::ap("p"), TimeInterval::unbounded()));
    }

    #[test]
    fn parses_until_and_dual_until() {
        let formula = parse_formula("p U[0,1] q").unwrap();
        assert_eq!(
            formula,
            MTLFormula::ap("p").until(MTLFormula::ap("q"), TimeInterval::closed(0, 1))
        );
        let formula = parse_formula("move D[0,2] !release").unwrap();
        assert_eq!(
            formula,
            MTLFormula::ap("move").dual_until(!MTLFormula::ap("release"), TimeInterval::closed(0, 2))
        );
    }

    #[test]
    fn parses_open_and_infinite_bounds() {
        let formula = parse_formula("F[0,inf) p").unwrap();
        assert_eq!(
            formula,
            MTLFormula::finally(
                MTLFormula::ap("p"),
                TimeInterval::new(0, BoundKind::Weak, 0, BoundKind::Unbounded)
            )
        );
        let formula = parse_formula("F(1,3) p").unwrap();
        assert_eq!(
            formula,
            MTLFormula::finally(
                MTLFormula::ap("p"),
                TimeInterval::new(1, BoundKind::Strict, 3, BoundKind::Strict)
            )
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_formula("p &&").is_err());
        assert!(parse_formula("U p").is_err());
        assert!(parse_formula("F[2,1] p").is_err());
    }
}
