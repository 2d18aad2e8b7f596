use crate::core::currency::CurrencyCode;
use crate::core::member::MemberId;
use crate::core::pot::{Pot, PotId};
use crate::error::Result;
use crate::graph::debt_graph::DebtGraph;
use crate::ledger::aggregator::Balances;
use crate::optimization::simplifier::{Debt, DebtSimplifier};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-currency totals of a settlement plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrencySummary {
    pub currency: CurrencyCode,
    /// Money that has to change hands to settle everyone.
    pub total_to_settle: Decimal,
    /// Payments after simplification.
    pub payments: usize,
    /// Payments if every pair settled directly.
    pub pairwise_payments: usize,
}

/// What one member pays and receives under the plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemberFlow {
    pub pays: Decimal,
    pub receives: Decimal,
}

/// Everything needed to present "settle all balances" for a pot.
#[derive(Debug, Clone, Serialize)]
pub struct SettlementPlan {
    pot_id: PotId,
    balances: Balances,
    debts: Vec<Debt>,
    pairwise_debt_count: usize,
    currencies: BTreeMap<CurrencyCode, CurrencySummary>,
    flows: BTreeMap<MemberId, BTreeMap<CurrencyCode, MemberFlow>>,
}

impl SettlementPlan {
    /// Recompute balances and debts for the pot snapshot.
    pub fn build(pot: &Pot) -> Result<Self> {
        let balances = pot.balances()?;
        let debts = DebtSimplifier::simplify_all(&balances)?;
        let pairwise = DebtGraph::build(pot.expenses(), pot.settlements()).pairwise_debts();

        let mut currencies = BTreeMap::new();
        for currency in balances.currencies() {
            currencies.insert(
                currency.clone(),
                CurrencySummary {
                    currency: currency.clone(),
                    total_to_settle: balances.total_owed(currency),
                    payments: debts.iter().filter(|d| &d.currency == currency).count(),
                    pairwise_payments: pairwise.iter().filter(|d| &d.currency == currency).count(),
                },
            );
        }

        let mut flows: BTreeMap<MemberId, BTreeMap<CurrencyCode, MemberFlow>> = BTreeMap::new();
        for debt in &debts {
            flows
                .entry(debt.from.clone())
                .or_default()
                .entry(debt.currency.clone())
                .or_default()
                .pays += debt.amount;
            flows
                .entry(debt.to.clone())
                .or_default()
                .entry(debt.currency.clone())
                .or_default()
                .receives += debt.amount;
        }

        Ok(SettlementPlan {
            pot_id: pot.id().clone(),
            balances,
            debts,
            pairwise_debt_count: pairwise.len(),
            currencies,
            flows,
        })
    }

    pub fn pot_id(&self) -> &PotId {
        &self.pot_id
    }

    pub fn balances(&self) -> &Balances {
        &self.balances
    }

    pub fn debts(&self) -> &[Debt] {
        &self.debts
    }

    pub fn currency_summary(&self, currency: &CurrencyCode) -> Option<&CurrencySummary> {
        self.currencies.get(currency)
    }

    /// Debts where `member` is the payer.
    pub fn payments_by(&self, member: &MemberId) -> Vec<&Debt> {
        self.debts.iter().filter(|d| &d.from == member).collect()
    }

    pub fn flow(&self, member: &MemberId, currency: &CurrencyCode) -> MemberFlow {
        self.flows
            .get(member)
            .and_then(|f| f.get(currency))
            .cloned()
            .unwrap_or_default()
    }

    /// Payments avoided compared with settling every pair directly.
    pub fn payments_saved(&self) -> usize {
        self.pairwise_debt_count.saturating_sub(self.debts.len())
    }

    pub fn is_settled(&self) -> bool {
        self.debts.is_empty()
    }
}

impl std::fmt::Display for SettlementPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Settlement Plan: {} ===", self.pot_id)?;
        if self.is_settled() {
            return writeln!(f, "Everyone is settled up.");
        }

        for summary in self.currencies.values() {
            writeln!(f, "\n--- {} ---", summary.currency)?;
            writeln!(f, "  To settle: {}", summary.total_to_settle)?;
            writeln!(f, "  Payments:  {} (pairwise: {})", summary.payments, summary.pairwise_payments)?;
        }

        writeln!(f, "\nPayments:")?;
        for debt in &self.debts {
            writeln!(f, "  {} → {}: {} {}", debt.from, debt.to, debt.amount, debt.currency)?;
        }
        writeln!(f, "\nPayments saved by simplification: {}", self.payments_saved())?;
        Ok(())
    }
}
