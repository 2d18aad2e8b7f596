use crate::core::currency::CurrencyCode;
use crate::core::expense::Expense;
use crate::core::member::MemberId;
use crate::core::settlement::Settlement;
use crate::optimization::simplifier::Debt;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

/// Raw who-owes-whom edges, before any simplification.
///
/// Every split member owes the payer their share of an expense; a
/// settlement adds an edge from the receiver back to the payer, which
/// cancels against the original debt when the pair is netted.
///
/// This is what a group would pay if everybody settled each expense
/// directly with whoever paid for it. Comparing its pair count with the
/// simplified debt list shows how many payments simplification saves.
///
/// # Examples
///
/// ```
/// use potsplit_engine::core::currency::CurrencyCode;
/// use potsplit_engine::core::expense::Expense;
/// use potsplit_engine::core::member::MemberId;
/// use potsplit_engine::core::pot::PotId;
/// use potsplit_engine::core::split::SplitStrategy;
/// use potsplit_engine::graph::debt_graph::DebtGraph;
/// use rust_decimal_macros::dec;
///
/// let expense = Expense::new(
///     PotId::new("trip"), "Fuel", MemberId::new("a"), dec!(60),
///     CurrencyCode::new("USD"), SplitStrategy::equal(["a", "b", "c"]),
/// ).unwrap();
///
/// let graph = DebtGraph::build(&[expense], &[]);
/// assert_eq!(graph.pairwise_debts().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DebtGraph {
    /// (debtor, creditor, currency) -> total owed along that edge.
    edges: BTreeMap<(MemberId, MemberId, CurrencyCode), Decimal>,
    members: BTreeSet<MemberId>,
    currencies: BTreeSet<CurrencyCode>,
}

impl DebtGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(expenses: &[Expense], settlements: &[Settlement]) -> Self {
        let mut graph = Self::new();
        for expense in expenses {
            graph.add_expense(expense);
        }
        for settlement in settlements {
            graph.add_settlement(settlement);
        }
        graph
    }

    pub fn add_expense(&mut self, expense: &Expense) {
        for split in expense.splits() {
            if &split.member != expense.payer() && !split.amount.is_zero() {
                self.add_edge(&split.member, expense.payer(), expense.currency(), split.amount);
            }
        }
    }

    pub fn add_settlement(&mut self, settlement: &Settlement) {
        self.add_edge(
            settlement.to(),
            settlement.from(),
            settlement.currency(),
            settlement.amount(),
        );
    }

    fn add_edge(&mut self, debtor: &MemberId, creditor: &MemberId, currency: &CurrencyCode, amount: Decimal) {
        let key = (debtor.clone(), creditor.clone(), currency.clone());
        *self.edges.entry(key).or_insert(Decimal::ZERO) += amount;
        self.members.insert(debtor.clone());
        self.members.insert(creditor.clone());
        self.currencies.insert(currency.clone());
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn currencies(&self) -> &BTreeSet<CurrencyCode> {
        &self.currencies
    }

    /// Gross amount owed from `debtor` to `creditor` in `currency`.
    pub fn edge_amount(
        &self,
        debtor: &MemberId,
        creditor: &MemberId,
        currency: &CurrencyCode,
    ) -> Decimal {
        self.edges
            .get(&(debtor.clone(), creditor.clone(), currency.clone()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Sum of every edge.
    pub fn gross_total(&self) -> Decimal {
        self.edges.values().copied().sum()
    }

    /// Net each pair of members against each other.
    ///
    /// If A owes B 100 and B owes A 60, the result contains a single
    /// debt of 40 from A to B. Pairs that cancel out are omitted. The
    /// list is ordered by currency, then debtor, then creditor.
    pub fn pairwise_debts(&self) -> Vec<Debt> {
        let mut netted: BTreeMap<(CurrencyCode, MemberId, MemberId), Decimal> = BTreeMap::new();
        for ((debtor, creditor, currency), amount) in &self.edges {
            // Orient every pair as (lower id, higher id).
            let (low, high, signed) = if debtor < creditor {
                (debtor, creditor, *amount)
            } else {
                (creditor, debtor, -*amount)
            };
            *netted
                .entry((currency.clone(), low.clone(), high.clone()))
                .or_insert(Decimal::ZERO) += signed;
        }

        let mut debts: Vec<Debt> = netted
            .into_iter()
            .filter(|(_, net)| !net.is_zero())
            .map(|((currency, low, high), net)| {
                if net > Decimal::ZERO {
                    Debt { from: low, to: high, amount: net, currency }
                } else {
                    Debt { from: high, to: low, amount: -net, currency }
                }
            })
            .collect();
        debts.sort_by(|a, b| {
            a.currency
                .cmp(&b.currency)
                .then_with(|| a.from.cmp(&b.from))
                .then_with(|| a.to.cmp(&b.to))
        });
        debts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pot::PotId;
    use crate::core::split::SplitStrategy;
    use rust_decimal_macros::dec;

    fn usd() -> CurrencyCode {
        CurrencyCode::new("USD")
    }

    fn expense(payer: &str, total: Decimal, split: &[&str]) -> Expense {
        Expense::new(
            PotId::new("trip"),
            "expense",
            MemberId::new(payer),
            total,
            usd(),
            SplitStrategy::equal(split.iter().copied()),
        )
        .unwrap()
    }

    #[test]
    fn test_payer_share_is_not_an_edge() {
        let graph = DebtGraph::build(&[expense("a", dec!(90), &["a", "b", "c"])], &[]);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.member_count(), 3);
        assert_eq!(
            graph.edge_amount(&MemberId::new("b"), &MemberId::new("a"), &usd()),
            dec!(30)
        );
        assert_eq!(graph.gross_total(), dec!(60));
    }

    #[test]
    fn test_bilateral_netting() {
        let graph = DebtGraph::build(
            &[
                expense("b", dec!(200), &["a", "b"]),
                expense("a", dec!(120), &["a", "b"]),
            ],
            &[],
        );
        let debts = graph.pairwise_debts();
        assert_eq!(debts.len(), 1);
        assert_eq!(debts[0].from.as_str(), "a");
        assert_eq!(debts[0].to.as_str(), "b");
        assert_eq!(debts[0].amount, dec!(40));
    }

    #[test]
    fn test_settlement_cancels_edge() {
        let settlement = Settlement::new(
            PotId::new("trip"),
            MemberId::new("c"),
            MemberId::new("a"),
            dec!(30),
            usd(),
        );
        let graph = DebtGraph::build(&[expense("a", dec!(90), &["a", "b", "c"])], &[settlement]);
        let debts = graph.pairwise_debts();
        assert_eq!(debts.len(), 1);
        assert_eq!(debts[0].from.as_str(), "b");
    }

    #[test]
    fn test_cycle_stays_pairwise() {
        // a owes b, b owes c, c owes a: three pairwise debts that
        // simplification would cancel entirely.
        let graph = DebtGraph::build(
            &[
                expense("b", dec!(10), &["a"]),
                expense("c", dec!(10), &["b"]),
                expense("a", dec!(10), &["c"]),
            ],
            &[],
        );
        assert_eq!(graph.pairwise_debts().len(), 3);
    }
}
