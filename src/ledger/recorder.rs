use crate::core::expense::Expense;
use crate::core::pot::{Pot, PotId};
use crate::core::settlement::{PaymentMethod, Settlement};
use crate::core::validation::{validate_settlement, ValidationError};
use crate::error::{EngineError, ReferenceError, Result};
use crate::ledger::aggregator::Balances;
use crate::ledger::repository::{PotRepository, RepositoryError};
use crate::optimization::plan::SettlementPlan;
use crate::optimization::simplifier::Debt;
use uuid::Uuid;

/// Validate a settlement and append it to a copy of `pot`.
///
/// The input snapshot is left untouched; the returned snapshot has the
/// settlement at the end of its log and a bumped version. Rejected
/// settlements fail with [`EngineError::Validation`] naming the first
/// violated rule.
///
/// Settlements are never edited or removed. A settlement with
/// `supersedes` set must point at an existing settlement that has not
/// been superseded already.
pub fn apply_settlement(settlement: Settlement, pot: &Pot) -> Result<Pot> {
    if pot.settlement(settlement.id()).is_some() {
        return Err(ValidationError::DuplicateSettlement(settlement.id()).into());
    }

    let mut report = validate_settlement(&settlement, pot.id(), &pot.roster());
    if let Some(target) = settlement.supersedes() {
        if pot.settlement(target).is_none() {
            return Err(ReferenceError::settlement(target).into());
        }
        if pot
            .settlements()
            .iter()
            .any(|s| s.supersedes() == Some(target))
        {
            report.push(ValidationError::AlreadySuperseded(target));
        }
    }

    for error in report.errors() {
        log::warn!(
            "pot {}: rejected settlement {}: {}",
            pot.id(),
            settlement.id(),
            error
        );
    }
    report.into_result()?;

    log::info!(
        "pot {}: {} paid {} {} {}",
        pot.id(),
        settlement.from(),
        settlement.to(),
        settlement.amount(),
        settlement.currency()
    );
    let mut next = pot.clone();
    next.push_settlement(settlement);
    Ok(next)
}

/// Load-mutate-save workflow over an injected [`PotRepository`].
///
/// Every write carries the version the caller based its decision on;
/// a stale version fails with [`RepositoryError::VersionConflict`]
/// instead of overwriting a concurrent change.
pub struct SettlementRecorder<R: PotRepository> {
    repository: R,
}

impl<R: PotRepository> SettlementRecorder<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn into_inner(self) -> R {
        self.repository
    }

    /// Store a brand-new pot.
    pub fn create_pot(&mut self, pot: &Pot) -> Result<()> {
        self.repository.save(pot, None)?;
        Ok(())
    }

    pub fn load(&self, pot_id: &PotId) -> Result<Pot> {
        self.repository
            .load(pot_id)?
            .ok_or_else(|| RepositoryError::NotFound(pot_id.clone()).into())
    }

    /// Record a settlement against the pot at `expected_version`.
    pub fn record(
        &mut self,
        pot_id: &PotId,
        settlement: Settlement,
        expected_version: u64,
    ) -> Result<Pot> {
        self.mutate(pot_id, expected_version, |pot| {
            apply_settlement(settlement, pot)
        })
    }

    /// Turn a suggested debt into a recorded payment.
    pub fn settle_debt(
        &mut self,
        pot_id: &PotId,
        debt: &Debt,
        method: Option<PaymentMethod>,
        expected_version: u64,
    ) -> Result<Pot> {
        let mut settlement = debt.to_settlement(pot_id.clone());
        if let Some(method) = method {
            settlement = settlement.with_method(method);
        }
        self.record(pot_id, settlement, expected_version)
    }

    /// Record the offsetting counterpart of an earlier settlement.
    pub fn reverse(
        &mut self,
        pot_id: &PotId,
        settlement_id: Uuid,
        expected_version: u64,
    ) -> Result<Pot> {
        self.mutate(pot_id, expected_version, |pot| {
            let original = pot
                .settlement(settlement_id)
                .ok_or_else(|| ReferenceError::settlement(settlement_id))?;
            apply_settlement(original.offsetting(), pot)
        })
    }

    pub fn add_expense(
        &mut self,
        pot_id: &PotId,
        expense: Expense,
        expected_version: u64,
    ) -> Result<Pot> {
        self.mutate(pot_id, expected_version, |pot| {
            let mut next = pot.clone();
            next.add_expense(expense)?;
            Ok(next)
        })
    }

    pub fn replace_expense(
        &mut self,
        pot_id: &PotId,
        expense: Expense,
        expected_version: u64,
    ) -> Result<Pot> {
        self.mutate(pot_id, expected_version, |pot| {
            let mut next = pot.clone();
            next.replace_expense(expense)?;
            Ok(next)
        })
    }

    pub fn remove_expense(
        &mut self,
        pot_id: &PotId,
        expense_id: Uuid,
        expected_version: u64,
    ) -> Result<Pot> {
        self.mutate(pot_id, expected_version, |pot| {
            let mut next = pot.clone();
            next.remove_expense(expense_id)?;
            Ok(next)
        })
    }

    /// Current balances, recomputed from the stored snapshot.
    pub fn balances(&self, pot_id: &PotId) -> Result<Balances> {
        self.load(pot_id)?.balances()
    }

    /// Current settlement plan, recomputed from the stored snapshot.
    pub fn plan(&self, pot_id: &PotId) -> Result<SettlementPlan> {
        SettlementPlan::build(&self.load(pot_id)?)
    }

    fn mutate<F>(&mut self, pot_id: &PotId, expected_version: u64, change: F) -> Result<Pot>
    where
        F: FnOnce(&Pot) -> Result<Pot>,
    {
        let current = self.load(pot_id)?;
        if current.version() != expected_version {
            return Err(EngineError::Repository(RepositoryError::VersionConflict {
                pot: pot_id.clone(),
                expected: expected_version,
                found: current.version(),
            }));
        }
        let next = change(&current)?;
        self.repository.save(&next, Some(expected_version))?;
        Ok(next)
    }
}
