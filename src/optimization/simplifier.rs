//! Debt simplification: turn net balances into a short list of payments.
//!
//! # Algorithm
//!
//! 1. Split members into creditors (balance > 0) and debtors (balance < 0).
//! 2. Take the debtor owing the most and the creditor owed the most.
//! 3. Transfer `min(|debt|, credit)` from the debtor to the creditor.
//! 4. Drop whoever reached zero; put the other back with the remainder.
//! 5. Repeat until nobody is left.
//!
//! Equal magnitudes are ordered by ascending member id, so the output is
//! fully deterministic.
//!
//! Every step zeroes at least one party and the last step zeroes two, so
//! the result never has more than `nonzero_members - 1` payments. This is
//! a greedy heuristic: it is not guaranteed to find the minimum number of
//! payments (that problem is NP-hard in general), but it is optimal in
//! the common case and always correct.

use crate::core::currency::CurrencyCode;
use crate::core::member::MemberId;
use crate::core::pot::PotId;
use crate::core::settlement::Settlement;
use crate::error::{EngineError, Result};
use crate::ledger::aggregator::Balances;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};
use std::fmt;

/// A suggested payment: `from` should pay `to` `amount`.
///
/// Debts are derived from balances on demand and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debt {
    pub from: MemberId,
    pub to: MemberId,
    pub amount: Decimal,
    pub currency: CurrencyCode,
}

impl Debt {
    /// The settlement that pays off this debt in full.
    pub fn to_settlement(&self, pot_id: PotId) -> Settlement {
        Settlement::new(
            pot_id,
            self.from.clone(),
            self.to.clone(),
            self.amount,
            self.currency.clone(),
        )
    }
}

impl fmt::Display for Debt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} owes {} {:.*} {}",
            self.from,
            self.to,
            self.currency.minor_units() as usize,
            self.amount,
            self.currency
        )
    }
}

/// Heap entry: largest magnitude first, lowest member id on ties.
#[derive(Debug, PartialEq, Eq)]
struct Party {
    magnitude: Decimal,
    member: MemberId,
}

impl Ord for Party {
    fn cmp(&self, other: &Self) -> Ordering {
        self.magnitude
            .cmp(&other.magnitude)
            .then_with(|| other.member.cmp(&self.member))
    }
}

impl PartialOrd for Party {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct DebtSimplifier;

impl DebtSimplifier {
    /// Simplify the balances of a single currency.
    ///
    /// All-zero input yields an empty list. Input that does not sum to
    /// zero (including a lone non-zero member) is rejected with
    /// [`EngineError::InvariantViolation`].
    pub fn simplify(
        balances: &BTreeMap<MemberId, Decimal>,
        currency: &CurrencyCode,
    ) -> Result<Vec<Debt>> {
        let sum = balances
            .values()
            .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v));
        match sum {
            Some(sum) if sum.is_zero() => {}
            Some(sum) => {
                return Err(EngineError::invariant(format!(
                    "cannot simplify {} balances summing to {}",
                    currency, sum
                )))
            }
            None => {
                return Err(EngineError::invariant(format!(
                    "cannot simplify {} balances: sum overflows",
                    currency
                )))
            }
        }

        let mut creditors = BinaryHeap::new();
        let mut debtors = BinaryHeap::new();
        for (member, amount) in balances {
            if *amount > Decimal::ZERO {
                creditors.push(Party {
                    magnitude: *amount,
                    member: member.clone(),
                });
            } else if *amount < Decimal::ZERO {
                debtors.push(Party {
                    magnitude: -*amount,
                    member: member.clone(),
                });
            }
        }

        let mut debts = Vec::new();
        while let (Some(mut debtor), Some(mut creditor)) = (debtors.pop(), creditors.pop()) {
            let transfer = debtor.magnitude.min(creditor.magnitude);
            debts.push(Debt {
                from: debtor.member.clone(),
                to: creditor.member.clone(),
                amount: transfer,
                currency: currency.clone(),
            });

            debtor.magnitude -= transfer;
            creditor.magnitude -= transfer;
            if !debtor.magnitude.is_zero() {
                debtors.push(debtor);
            }
            if !creditor.magnitude.is_zero() {
                creditors.push(creditor);
            }
        }

        if !debtors.is_empty() || !creditors.is_empty() {
            return Err(EngineError::invariant(format!(
                "{} debtors and {} creditors left unmatched in {}",
                debtors.len(),
                creditors.len(),
                currency
            )));
        }

        let residual = Self::residual(balances, &debts);
        if residual.values().any(|v| !v.is_zero()) {
            return Err(EngineError::invariant(format!(
                "simplified {} debts do not reproduce the balances",
                currency
            )));
        }

        log::debug!(
            "simplified {} {} balances into {} payments",
            balances.len(),
            currency,
            debts.len()
        );
        Ok(debts)
    }

    /// Simplify every currency of a balance sheet, currencies in
    /// ascending code order.
    pub fn simplify_all(balances: &Balances) -> Result<Vec<Debt>> {
        let mut debts = Vec::new();
        for currency in balances.currencies() {
            if let Some(positions) = balances.for_currency(currency) {
                debts.extend(Self::simplify(positions, currency)?);
            }
        }
        Ok(debts)
    }

    /// Balances left after every debt is paid: each debtor's balance goes
    /// up by what they pay, each creditor's down by what they receive.
    /// A correct simplification leaves all zeros.
    pub fn residual(
        balances: &BTreeMap<MemberId, Decimal>,
        debts: &[Debt],
    ) -> BTreeMap<MemberId, Decimal> {
        let mut remaining = balances.clone();
        for debt in debts {
            *remaining.entry(debt.from.clone()).or_insert(Decimal::ZERO) += debt.amount;
            *remaining.entry(debt.to.clone()).or_insert(Decimal::ZERO) -= debt.amount;
        }
        remaining
    }
}
