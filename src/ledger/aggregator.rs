use crate::core::currency::{CurrencyCode, FxRateTable};
use crate::core::expense::Expense;
use crate::core::member::{Member, MemberId, Roster};
use crate::core::settlement::Settlement;
use crate::core::validation::ValidationError;
use crate::error::{EngineError, ReferenceError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Net position of each member in each currency.
///
/// A positive balance means the member is owed money (net creditor).
/// A negative balance means the member owes money (net debtor).
///
/// Every pot member appears in every currency that occurs in the
/// snapshot, with an explicit zero where they are square. Maps are
/// ordered by currency code and member id so output is reproducible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Balances {
    by_currency: BTreeMap<CurrencyCode, BTreeMap<MemberId, Decimal>>,
}

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Net position of a member in one currency (zero if absent).
    pub fn get(&self, member: &MemberId, currency: &CurrencyCode) -> Decimal {
        self.by_currency
            .get(currency)
            .and_then(|m| m.get(member))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// All member balances in one currency.
    pub fn for_currency(&self, currency: &CurrencyCode) -> Option<&BTreeMap<MemberId, Decimal>> {
        self.by_currency.get(currency)
    }

    pub fn currencies(&self) -> impl Iterator<Item = &CurrencyCode> {
        self.by_currency.keys()
    }

    /// Positions of one member across every currency.
    pub fn for_member(&self, member: &MemberId) -> BTreeMap<CurrencyCode, Decimal> {
        self.by_currency
            .iter()
            .filter_map(|(c, m)| m.get(member).map(|v| (c.clone(), *v)))
            .collect()
    }

    /// Sum of all positions per currency must be exactly zero.
    pub fn is_balanced(&self) -> bool {
        self.by_currency
            .values()
            .all(|m| m.values().copied().sum::<Decimal>().is_zero())
    }

    /// True when nobody owes anybody anything.
    pub fn is_settled(&self) -> bool {
        self.by_currency
            .values()
            .all(|m| m.values().all(|v| v.is_zero()))
    }

    /// Total amount creditors are owed in one currency; equal to the
    /// total debtors owe when the sheet is balanced.
    pub fn total_owed(&self, currency: &CurrencyCode) -> Decimal {
        self.by_currency
            .get(currency)
            .map(|m| m.values().filter(|v| **v > Decimal::ZERO).sum())
            .unwrap_or(Decimal::ZERO)
    }

    /// Number of members with a non-zero position in one currency.
    pub fn nonzero_count(&self, currency: &CurrencyCode) -> usize {
        self.by_currency
            .get(currency)
            .map(|m| m.values().filter(|v| !v.is_zero()).count())
            .unwrap_or(0)
    }

    /// Express every position in `target` for display.
    ///
    /// Each member's converted total is rounded to the target's minor
    /// units. The rounding residual is assigned to the member with the
    /// largest absolute position (lowest id on ties), so the result still
    /// sums to zero.
    pub fn consolidate(
        &self,
        target: &CurrencyCode,
        rates: &FxRateTable,
    ) -> Result<BTreeMap<MemberId, Decimal>> {
        let mut converted: BTreeMap<MemberId, Decimal> = BTreeMap::new();
        for (currency, members) in &self.by_currency {
            for (member, amount) in members {
                let value = rates.convert(*amount, currency, target)?;
                *converted.entry(member.clone()).or_insert(Decimal::ZERO) += value;
            }
        }

        for value in converted.values_mut() {
            *value = target.round(*value);
        }

        let residual = -converted.values().copied().sum::<Decimal>();
        if !residual.is_zero() {
            let absorber = converted
                .iter()
                .max_by(|(a_id, a), (b_id, b)| a.abs().cmp(&b.abs()).then_with(|| b_id.cmp(a_id)))
                .map(|(id, _)| id.clone());
            if let Some(id) = absorber {
                log::debug!("consolidation residual {} {} assigned to {}", residual, target, id);
                if let Some(value) = converted.get_mut(&id) {
                    *value += residual;
                }
            }
        }
        Ok(converted)
    }

    fn open_currency(&mut self, currency: &CurrencyCode, roster: &Roster) {
        self.by_currency
            .entry(currency.clone())
            .or_insert_with(|| roster.iter().map(|m| (m.clone(), Decimal::ZERO)).collect());
    }

    fn adjust(&mut self, member: &MemberId, currency: &CurrencyCode, delta: Decimal) -> Result<()> {
        let position = self
            .by_currency
            .entry(currency.clone())
            .or_default()
            .entry(member.clone())
            .or_insert(Decimal::ZERO);
        *position = position
            .checked_add(delta)
            .ok_or(ValidationError::AmountOutOfRange(delta))?;
        Ok(())
    }
}

/// Fold expenses and settlements into net balances.
///
/// - An expense credits its payer with the total and debits every split
///   member with their share. The payer is not special-cased: if they
///   are in the split, their own share is debited as well.
/// - A settlement credits the member who paid and debits the member who
///   received, cancelling the equivalent part of an earlier debt.
///
/// This is a pure function of its inputs. Unknown member ids fail with a
/// [`ReferenceError`]; a non-zero sum in any currency fails with
/// [`EngineError::InvariantViolation`].
pub fn compute_balances(
    members: &[Member],
    expenses: &[Expense],
    settlements: &[Settlement],
) -> Result<Balances> {
    let roster = Roster::from_members(members);
    let mut balances = Balances::new();

    for expense in expenses {
        for member in expense.participants() {
            if !roster.contains(member) {
                return Err(ReferenceError::member(member, format!("expense {}", expense.id())).into());
            }
        }
        let currency = expense.currency();
        balances.open_currency(currency, &roster);
        balances.adjust(expense.payer(), currency, expense.total())?;
        for split in expense.splits() {
            balances.adjust(&split.member, currency, -split.amount)?;
        }
    }

    for settlement in settlements {
        for member in [settlement.from(), settlement.to()] {
            if !roster.contains(member) {
                return Err(
                    ReferenceError::member(member, format!("settlement {}", settlement.id())).into(),
                );
            }
        }
        let currency = settlement.currency();
        balances.open_currency(currency, &roster);
        balances.adjust(settlement.from(), currency, settlement.amount())?;
        balances.adjust(settlement.to(), currency, -settlement.amount())?;
    }

    for (currency, positions) in &balances.by_currency {
        let sum = positions
            .values()
            .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v));
        match sum {
            Some(sum) if sum.is_zero() => {}
            Some(sum) => {
                return Err(EngineError::invariant(format!(
                    "balances in {} sum to {} instead of zero",
                    currency, sum
                )))
            }
            None => {
                return Err(EngineError::invariant(format!(
                    "balances in {} overflow when summed",
                    currency
                )))
            }
        }
    }

    log::debug!(
        "computed balances for {} members over {} expenses and {} settlements",
        roster.len(),
        expenses.len(),
        settlements.len()
    );
    Ok(balances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pot::PotId;
    use crate::core::split::SplitStrategy;
    use rust_decimal_macros::dec;

    fn members(ids: &[&str]) -> Vec<Member> {
        ids.iter()
            .map(|id| Member::new(MemberId::new(*id), *id, CurrencyCode::new("USD")))
            .collect()
    }

    fn expense(payer: &str, total: Decimal, currency: &str, split: &[&str]) -> Expense {
        Expense::new(
            PotId::new("trip"),
            "expense",
            MemberId::new(payer),
            total,
            CurrencyCode::new(currency),
            SplitStrategy::equal(split.iter().copied()),
        )
        .unwrap()
    }

    #[test]
    fn test_payer_in_own_split() {
        let balances = compute_balances(
            &members(&["a", "b", "c"]),
            &[expense("a", dec!(90), "USD", &["a", "b", "c"])],
            &[],
        )
        .unwrap();
        let usd = CurrencyCode::new("USD");
        assert_eq!(balances.get(&MemberId::new("a"), &usd), dec!(60));
        assert_eq!(balances.get(&MemberId::new("b"), &usd), dec!(-30));
        assert_eq!(balances.get(&MemberId::new("c"), &usd), dec!(-30));
        assert!(balances.is_balanced());
        assert_eq!(balances.total_owed(&usd), dec!(60));
        assert_eq!(balances.nonzero_count(&usd), 3);
    }

    #[test]
    fn test_zero_members_are_listed() {
        let balances = compute_balances(
            &members(&["a", "b", "c"]),
            &[expense("a", dec!(20), "USD", &["a", "b"])],
            &[],
        )
        .unwrap();
        let usd_map = balances.for_currency(&CurrencyCode::new("USD")).unwrap();
        assert_eq!(usd_map.len(), 3);
        assert_eq!(usd_map[&MemberId::new("c")], Decimal::ZERO);
    }

    #[test]
    fn test_currencies_kept_apart() {
        let balances = compute_balances(
            &members(&["a", "b"]),
            &[
                expense("a", dec!(100), "USD", &["a", "b"]),
                expense("b", dec!(100), "EUR", &["a", "b"]),
            ],
            &[],
        )
        .unwrap();
        let a = MemberId::new("a");
        assert_eq!(balances.get(&a, &CurrencyCode::new("USD")), dec!(50));
        assert_eq!(balances.get(&a, &CurrencyCode::new("EUR")), dec!(-50));
        assert_eq!(balances.for_member(&a).len(), 2);
        assert!(!balances.is_settled());
    }

    #[test]
    fn test_unknown_split_member_is_reference_error() {
        let err = compute_balances(
            &members(&["a", "b"]),
            &[expense("a", dec!(30), "USD", &["a", "ghost"])],
            &[],
        )
        .unwrap_err();
        match err {
            EngineError::Reference(r) => assert_eq!(r.id, "ghost"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_settlement_member_is_reference_error() {
        let settlement = Settlement::new(
            PotId::new("trip"),
            MemberId::new("a"),
            MemberId::new("nobody"),
            dec!(5),
            CurrencyCode::new("USD"),
        );
        let err = compute_balances(&members(&["a"]), &[], &[settlement]).unwrap_err();
        assert!(err.is_reference());
    }

    #[test]
    fn test_overflowing_position_is_out_of_range() {
        let huge = expense("a", Decimal::MAX, "JPY", &["b"]);
        let err = compute_balances(&members(&["a", "b"]), &[huge.clone(), huge], &[]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::AmountOutOfRange(_))
        ));
    }

    #[test]
    fn test_consolidate_sums_to_zero() {
        let balances = compute_balances(
            &members(&["a", "b", "c"]),
            &[
                expense("a", dec!(100), "USD", &["a", "b", "c"]),
                expense("b", dec!(10), "EUR", &["a", "b", "c"]),
            ],
            &[],
        )
        .unwrap();

        let mut rates = FxRateTable::new();
        rates
            .set_rate(CurrencyCode::new("EUR"), CurrencyCode::new("USD"), dec!(1.0837))
            .unwrap();
        let consolidated = balances
            .consolidate(&CurrencyCode::new("USD"), &rates)
            .unwrap();

        let sum: Decimal = consolidated.values().copied().sum();
        assert_eq!(sum, Decimal::ZERO);
        for value in consolidated.values() {
            assert!(CurrencyCode::new("USD").is_representable(*value));
        }
    }

    #[test]
    fn test_consolidate_missing_rate() {
        let balances = compute_balances(
            &members(&["a", "b"]),
            &[expense("a", dec!(10), "GBP", &["a", "b"])],
            &[],
        )
        .unwrap();
        let err = balances
            .consolidate(&CurrencyCode::new("USD"), &FxRateTable::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::Fx(_)));
    }
}
