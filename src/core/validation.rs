//! Entity invariants, exposed as data rather than control flow.
//!
//! Constructors return the first violated rule as a [`ValidationError`].
//! The `validate_*` functions collect every violation into a
//! [`ValidationReport`] so callers can check a whole batch before
//! committing any of it.

use crate::core::currency::CurrencyCode;
use crate::core::expense::Expense;
use crate::core::member::{MemberId, Roster};
use crate::core::pot::PotId;
use crate::core::settlement::Settlement;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;
use uuid::Uuid;

/// A violated structural rule.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationError {
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),
    #[error("amount {amount} has more precision than {currency} allows")]
    ExcessPrecision {
        amount: Decimal,
        currency: CurrencyCode,
    },
    #[error("amount {0} is too large to split or aggregate")]
    AmountOutOfRange(Decimal),
    #[error("split for {member} is negative ({amount})")]
    NegativeSplit { member: MemberId, amount: Decimal },
    #[error("expense must be split among at least one member")]
    EmptySplit,
    #[error("member {0} appears more than once in the split")]
    DuplicateSplitMember(MemberId),
    #[error("splits sum to {actual} but the expense total is {expected}")]
    SplitSumMismatch { expected: Decimal, actual: Decimal },
    #[error("percentages sum to {0}, expected 100")]
    PercentageSum(Decimal),
    #[error("at least one share must be non-zero")]
    ZeroShares,
    #[error("member {0} cannot settle with themselves")]
    SelfSettlement(MemberId),
    #[error("member {0} is not part of the pot")]
    UnknownMember(MemberId),
    #[error("member {0} is already part of the pot")]
    DuplicateMember(MemberId),
    #[error("entry belongs to pot {found}, expected {expected}")]
    PotMismatch { expected: PotId, found: PotId },
    #[error("expense {0} is already recorded")]
    DuplicateExpense(Uuid),
    #[error("settlement {0} is already recorded")]
    DuplicateSettlement(Uuid),
    #[error("settlement {0} has already been superseded")]
    AlreadySuperseded(Uuid),
}

impl ValidationError {
    /// Stable rule name, suitable for mapping to user-facing messages.
    pub fn rule(&self) -> &'static str {
        match self {
            ValidationError::NonPositiveAmount(_) => "non_positive_amount",
            ValidationError::ExcessPrecision { .. } => "excess_precision",
            ValidationError::AmountOutOfRange(_) => "amount_out_of_range",
            ValidationError::NegativeSplit { .. } => "negative_split",
            ValidationError::EmptySplit => "empty_split",
            ValidationError::DuplicateSplitMember(_) => "duplicate_split_member",
            ValidationError::SplitSumMismatch { .. } => "split_sum_mismatch",
            ValidationError::PercentageSum(_) => "percentage_sum",
            ValidationError::ZeroShares => "zero_shares",
            ValidationError::SelfSettlement(_) => "self_settlement",
            ValidationError::UnknownMember(_) => "unknown_member",
            ValidationError::DuplicateMember(_) => "duplicate_member",
            ValidationError::PotMismatch { .. } => "pot_mismatch",
            ValidationError::DuplicateExpense(_) => "duplicate_expense",
            ValidationError::DuplicateSettlement(_) => "duplicate_settlement",
            ValidationError::AlreadySuperseded(_) => "already_superseded",
        }
    }
}

/// Every violation found while validating one or more entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Collapse into the first violation, if any.
    pub fn into_result(self) -> Result<(), ValidationError> {
        match self.errors.into_iter().next() {
            Some(first) => Err(first),
            None => Ok(()),
        }
    }
}

/// Check an expense against its own invariants and the pot's roster.
pub fn validate_expense(expense: &Expense, pot: &PotId, roster: &Roster) -> ValidationReport {
    let mut report = ValidationReport::new();
    let currency = expense.currency();

    if expense.pot_id() != pot {
        report.push(ValidationError::PotMismatch {
            expected: pot.clone(),
            found: expense.pot_id().clone(),
        });
    }
    if expense.total() <= Decimal::ZERO {
        report.push(ValidationError::NonPositiveAmount(expense.total()));
    }
    if !currency.is_representable(expense.total()) {
        report.push(ValidationError::ExcessPrecision {
            amount: expense.total(),
            currency: currency.clone(),
        });
    }
    if !roster.contains(expense.payer()) {
        report.push(ValidationError::UnknownMember(expense.payer().clone()));
    }
    if expense.splits().is_empty() {
        report.push(ValidationError::EmptySplit);
    }

    let mut seen = BTreeSet::new();
    for split in expense.splits() {
        if !seen.insert(&split.member) {
            report.push(ValidationError::DuplicateSplitMember(split.member.clone()));
        }
        if split.amount < Decimal::ZERO {
            report.push(ValidationError::NegativeSplit {
                member: split.member.clone(),
                amount: split.amount,
            });
        }
        if !currency.is_representable(split.amount) {
            report.push(ValidationError::ExcessPrecision {
                amount: split.amount,
                currency: currency.clone(),
            });
        }
        if !roster.contains(&split.member) {
            report.push(ValidationError::UnknownMember(split.member.clone()));
        }
    }

    let split_sum = expense
        .splits()
        .iter()
        .try_fold(Decimal::ZERO, |acc, s| acc.checked_add(s.amount));
    match split_sum {
        Some(sum) if expense.splits().is_empty() || sum == expense.total() => {}
        Some(sum) => report.push(ValidationError::SplitSumMismatch {
            expected: expense.total(),
            actual: sum,
        }),
        None => report.push(ValidationError::AmountOutOfRange(expense.total())),
    }
    report
}

/// Check a settlement's amount, parties, and roster membership.
pub fn validate_settlement(
    settlement: &Settlement,
    pot: &PotId,
    roster: &Roster,
) -> ValidationReport {
    let mut report = ValidationReport::new();

    if settlement.pot_id() != pot {
        report.push(ValidationError::PotMismatch {
            expected: pot.clone(),
            found: settlement.pot_id().clone(),
        });
    }
    if settlement.amount() <= Decimal::ZERO {
        report.push(ValidationError::NonPositiveAmount(settlement.amount()));
    }
    if !settlement.currency().is_representable(settlement.amount()) {
        report.push(ValidationError::ExcessPrecision {
            amount: settlement.amount(),
            currency: settlement.currency().clone(),
        });
    }
    if settlement.from() == settlement.to() {
        report.push(ValidationError::SelfSettlement(settlement.from().clone()));
    }
    for party in [settlement.from(), settlement.to()] {
        if !roster.contains(party) {
            report.push(ValidationError::UnknownMember(party.clone()));
        }
    }
    report
}

/// Validate a batch of pending entries together, including duplicate ids
/// within the batch.
pub fn validate_batch(
    pot: &PotId,
    roster: &Roster,
    expenses: &[Expense],
    settlements: &[Settlement],
) -> ValidationReport {
    let mut report = ValidationReport::new();

    let mut expense_ids = BTreeSet::new();
    for expense in expenses {
        if !expense_ids.insert(expense.id()) {
            report.push(ValidationError::DuplicateExpense(expense.id()));
        }
        report.merge(validate_expense(expense, pot, roster));
    }

    let mut settlement_ids = BTreeSet::new();
    for settlement in settlements {
        if !settlement_ids.insert(settlement.id()) {
            report.push(ValidationError::DuplicateSettlement(settlement.id()));
        }
        report.merge(validate_settlement(settlement, pot, roster));
    }
    report
}
