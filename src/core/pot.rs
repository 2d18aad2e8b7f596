use crate::core::currency::CurrencyCode;
use crate::core::expense::Expense;
use crate::core::member::{Member, MemberId, Roster};
use crate::core::settlement::Settlement;
use crate::core::validation::{validate_expense, ValidationError};
use crate::error::{EngineError, ReferenceError, Result};
use crate::ledger::aggregator::{compute_balances, Balances};
use crate::optimization::simplifier::{Debt, DebtSimplifier};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a pot (a trip, a flat, any group sharing costs).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PotId(String);

impl PotId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PotId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A consistent snapshot of one pot: members, expenses, and the
/// append-only settlement log.
///
/// Balances and debts are never stored here; they are recomputed from
/// the snapshot on every call. `version` increases with each accepted
/// mutation and serves as an optimistic concurrency token for
/// repositories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pot {
    id: PotId,
    name: String,
    base_currency: CurrencyCode,
    members: Vec<Member>,
    expenses: Vec<Expense>,
    settlements: Vec<Settlement>,
    version: u64,
}

impl Pot {
    pub fn new(id: PotId, name: impl Into<String>, base_currency: CurrencyCode) -> Self {
        Self {
            id,
            name: name.into(),
            base_currency,
            members: Vec::new(),
            expenses: Vec::new(),
            settlements: Vec::new(),
            version: 0,
        }
    }

    // --- Accessors ---

    pub fn id(&self) -> &PotId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_currency(&self) -> &CurrencyCode {
        &self.base_currency
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member(&self, id: &MemberId) -> Option<&Member> {
        self.members.iter().find(|m| m.id() == id)
    }

    pub fn is_member(&self, id: &MemberId) -> bool {
        self.member(id).is_some()
    }

    pub fn roster(&self) -> Roster {
        Roster::from_members(&self.members)
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn expense(&self, id: Uuid) -> Option<&Expense> {
        self.expenses.iter().find(|e| e.id() == id)
    }

    pub fn settlements(&self) -> &[Settlement] {
        &self.settlements
    }

    pub fn settlement(&self, id: Uuid) -> Option<&Settlement> {
        self.settlements.iter().find(|s| s.id() == id)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    // --- Mutations ---

    pub fn add_member(&mut self, member: Member) -> Result<()> {
        if self.is_member(member.id()) {
            return Err(ValidationError::DuplicateMember(member.id().clone()).into());
        }
        log::debug!("pot {}: adding member {}", self.id, member.id());
        self.members.push(member);
        self.bump();
        Ok(())
    }

    /// Add a validated expense. Every violated rule is logged; the first
    /// one is returned.
    pub fn add_expense(&mut self, expense: Expense) -> Result<()> {
        if self.expense(expense.id()).is_some() {
            return Err(ValidationError::DuplicateExpense(expense.id()).into());
        }
        self.check_expense(&expense)?;
        log::debug!(
            "pot {}: adding expense {} ({} {})",
            self.id,
            expense.id(),
            expense.total(),
            expense.currency()
        );
        self.expenses.push(expense);
        self.bump();
        Ok(())
    }

    /// Replace an existing expense with an edited version carrying the
    /// same id.
    pub fn replace_expense(&mut self, expense: Expense) -> Result<()> {
        let idx = self
            .expenses
            .iter()
            .position(|e| e.id() == expense.id())
            .ok_or_else(|| ReferenceError::expense(expense.id()))?;
        self.check_expense(&expense)?;
        log::debug!("pot {}: replacing expense {}", self.id, expense.id());
        self.expenses[idx] = expense;
        self.bump();
        Ok(())
    }

    /// Remove an expense. Balances computed afterwards no longer include it.
    pub fn remove_expense(&mut self, id: Uuid) -> Result<Expense> {
        let idx = self
            .expenses
            .iter()
            .position(|e| e.id() == id)
            .ok_or_else(|| ReferenceError::expense(id))?;
        log::debug!("pot {}: removing expense {}", self.id, id);
        let removed = self.expenses.remove(idx);
        self.bump();
        Ok(removed)
    }

    /// Append to the settlement log. Callers go through
    /// [`apply_settlement`](crate::ledger::recorder::apply_settlement),
    /// which validates first.
    pub(crate) fn push_settlement(&mut self, settlement: Settlement) {
        self.settlements.push(settlement);
        self.bump();
    }

    // --- Derived state ---

    /// Net balances of this snapshot.
    pub fn balances(&self) -> Result<Balances> {
        compute_balances(&self.members, &self.expenses, &self.settlements)
    }

    /// Simplified debts that would settle every balance.
    pub fn suggested_debts(&self) -> Result<Vec<Debt>> {
        DebtSimplifier::simplify_all(&self.balances()?)
    }

    fn check_expense(&self, expense: &Expense) -> Result<()> {
        let report = validate_expense(expense, &self.id, &self.roster());
        for error in report.errors() {
            log::warn!("pot {}: rejected expense {}: {}", self.id, expense.id(), error);
        }
        // A payer or split member outside the pot is a dangling reference,
        // reported the same way `compute_balances` reports it.
        let unknown = report.errors().iter().find_map(|error| match error {
            ValidationError::UnknownMember(member) => Some(member.clone()),
            _ => None,
        });
        if let Some(member) = unknown {
            return Err(ReferenceError::member(&member, format!("expense {}", expense.id())).into());
        }
        report.into_result().map_err(EngineError::from)
    }

    fn bump(&mut self) {
        self.version += 1;
    }
}
