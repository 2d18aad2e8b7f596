//! Split definitions and their resolution into exact per-member amounts.
//!
//! Every strategy resolves to a list of [`Split`]s whose amounts are
//! whole minor units and sum exactly to the expense total.

use crate::core::currency::CurrencyCode;
use crate::core::member::MemberId;
use crate::core::validation::ValidationError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The portion of one expense owed by one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub member: MemberId,
    pub amount: Decimal,
}

impl Split {
    pub fn new(member: MemberId, amount: Decimal) -> Self {
        Self { member, amount }
    }
}

/// How an expense total is divided among participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SplitStrategy {
    /// Divide equally. Leftover minor units go one each to the
    /// lowest member ids.
    Equal { members: Vec<MemberId> },
    /// Explicit amounts supplied by the creator.
    Exact { amounts: Vec<(MemberId, Decimal)> },
    /// Percentages that must add up to exactly 100.
    Percentage { percents: Vec<(MemberId, Decimal)> },
    /// Integer weights, e.g. 2 shares for a couple and 1 for a single.
    Shares { shares: Vec<(MemberId, u32)> },
}

impl SplitStrategy {
    pub fn equal<I, M>(members: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MemberId>,
    {
        SplitStrategy::Equal {
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    /// Member ids named by this strategy, in the order given.
    pub fn members(&self) -> Vec<&MemberId> {
        match self {
            SplitStrategy::Equal { members } => members.iter().collect(),
            SplitStrategy::Exact { amounts } => amounts.iter().map(|(m, _)| m).collect(),
            SplitStrategy::Percentage { percents } => percents.iter().map(|(m, _)| m).collect(),
            SplitStrategy::Shares { shares } => shares.iter().map(|(m, _)| m).collect(),
        }
    }

    /// Resolve into concrete splits for `total` in `currency`.
    ///
    /// `tolerance_minor_units` only applies to [`SplitStrategy::Exact`]:
    /// a mismatch within the tolerance is absorbed by the payer's split
    /// (or the largest split when the payer cannot absorb it) so the
    /// stored splits still sum exactly to `total`.
    pub fn resolve(
        &self,
        total: Decimal,
        currency: &CurrencyCode,
        payer: &MemberId,
        tolerance_minor_units: u32,
    ) -> Result<Vec<Split>, ValidationError> {
        check_members(&self.members())?;
        if !currency.is_representable(total) {
            return Err(ValidationError::ExcessPrecision {
                amount: total,
                currency: currency.clone(),
            });
        }
        let total_units = currency
            .to_minor_units(total)
            .ok_or(ValidationError::AmountOutOfRange(total))?;

        let splits = match self {
            SplitStrategy::Equal { members } => {
                let weights: Vec<(MemberId, Decimal)> =
                    members.iter().map(|m| (m.clone(), Decimal::ONE)).collect();
                to_splits(currency, &weights, apportion(total, total_units, &weights)?)
            }
            SplitStrategy::Percentage { percents } => {
                for (member, pct) in percents {
                    if *pct < Decimal::ZERO {
                        return Err(ValidationError::NegativeSplit {
                            member: member.clone(),
                            amount: *pct,
                        });
                    }
                }
                let pct_sum = checked_sum(percents.iter().map(|(_, p)| *p))
                    .ok_or(ValidationError::AmountOutOfRange(total))?;
                if pct_sum != Decimal::ONE_HUNDRED {
                    return Err(ValidationError::PercentageSum(pct_sum));
                }
                to_splits(currency, percents, apportion(total, total_units, percents)?)
            }
            SplitStrategy::Shares { shares } => {
                let weights: Vec<(MemberId, Decimal)> = shares
                    .iter()
                    .map(|(m, s)| (m.clone(), Decimal::from(*s)))
                    .collect();
                if weights.iter().all(|(_, w)| w.is_zero()) {
                    return Err(ValidationError::ZeroShares);
                }
                to_splits(currency, &weights, apportion(total, total_units, &weights)?)
            }
            SplitStrategy::Exact { amounts } => {
                resolve_exact(total, currency, payer, amounts, tolerance_minor_units)?
            }
        };

        let sum = checked_sum(splits.iter().map(|s| s.amount))
            .ok_or(ValidationError::AmountOutOfRange(total))?;
        if sum != total {
            return Err(ValidationError::SplitSumMismatch {
                expected: total,
                actual: sum,
            });
        }
        Ok(splits)
    }
}

fn check_members(members: &[&MemberId]) -> Result<(), ValidationError> {
    if members.is_empty() {
        return Err(ValidationError::EmptySplit);
    }
    let mut seen = BTreeSet::new();
    for member in members {
        if !seen.insert(*member) {
            return Err(ValidationError::DuplicateSplitMember((*member).clone()));
        }
    }
    Ok(())
}

fn to_splits(
    currency: &CurrencyCode,
    weights: &[(MemberId, Decimal)],
    units: Vec<Decimal>,
) -> Vec<Split> {
    weights
        .iter()
        .zip(units)
        .map(|((member, _), u)| Split::new(member.clone(), currency.from_minor_units(u)))
        .collect()
}

/// Sum that reports overflow instead of panicking.
fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
}

/// Largest-remainder apportionment of `total_units` by weight.
///
/// Returns whole units per entry, in input order, summing to
/// `total_units`. Ties on the fractional remainder go to the lower
/// member id. Fails with `AmountOutOfRange` when an intermediate
/// product does not fit in a `Decimal`.
fn apportion(
    total: Decimal,
    total_units: Decimal,
    weights: &[(MemberId, Decimal)],
) -> Result<Vec<Decimal>, ValidationError> {
    let out_of_range = || ValidationError::AmountOutOfRange(total);
    let weight_sum = checked_sum(weights.iter().map(|(_, w)| *w)).ok_or_else(out_of_range)?;
    let mut units = Vec::with_capacity(weights.len());
    let mut remainders = Vec::with_capacity(weights.len());

    for (idx, (member, weight)) in weights.iter().enumerate() {
        let exact = total_units
            .checked_mul(*weight)
            .and_then(|product| product.checked_div(weight_sum))
            .ok_or_else(out_of_range)?;
        let floor = exact.floor();
        units.push(floor);
        remainders.push((exact - floor, member, idx));
    }

    let allocated: Decimal = units.iter().copied().sum();
    let mut leftover = total_units - allocated;
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    for (_, _, idx) in remainders {
        if leftover <= Decimal::ZERO {
            break;
        }
        units[idx] += Decimal::ONE;
        leftover -= Decimal::ONE;
    }
    Ok(units)
}

fn resolve_exact(
    total: Decimal,
    currency: &CurrencyCode,
    payer: &MemberId,
    amounts: &[(MemberId, Decimal)],
    tolerance_minor_units: u32,
) -> Result<Vec<Split>, ValidationError> {
    for (member, amount) in amounts {
        if *amount < Decimal::ZERO {
            return Err(ValidationError::NegativeSplit {
                member: member.clone(),
                amount: *amount,
            });
        }
        if !currency.is_representable(*amount) {
            return Err(ValidationError::ExcessPrecision {
                amount: *amount,
                currency: currency.clone(),
            });
        }
    }

    let mut splits: Vec<Split> = amounts
        .iter()
        .map(|(m, a)| Split::new(m.clone(), *a))
        .collect();
    let sum = checked_sum(splits.iter().map(|s| s.amount))
        .ok_or(ValidationError::AmountOutOfRange(total))?;
    let residual = total
        .checked_sub(sum)
        .ok_or(ValidationError::AmountOutOfRange(total))?;
    if residual.is_zero() {
        return Ok(splits);
    }

    let tolerance = currency.from_minor_units(Decimal::from(tolerance_minor_units));
    if residual.abs() > tolerance {
        return Err(ValidationError::SplitSumMismatch {
            expected: total,
            actual: sum,
        });
    }

    let absorber = splits
        .iter()
        .position(|s| &s.member == payer && s.amount + residual >= Decimal::ZERO)
        .or_else(|| {
            splits
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| {
                    a.amount
                        .cmp(&b.amount)
                        .then_with(|| b.member.cmp(&a.member))
                })
                .map(|(idx, _)| idx)
        });

    match absorber {
        Some(idx) if splits[idx].amount + residual >= Decimal::ZERO => {
            log::debug!(
                "absorbing split residual {} {} into {}",
                residual,
                currency,
                splits[idx].member
            );
            splits[idx].amount += residual;
            Ok(splits)
        }
        _ => Err(ValidationError::SplitSumMismatch {
            expected: total,
            actual: sum,
        }),
    }
}
