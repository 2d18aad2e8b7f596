use potsplit_engine::core::currency::CurrencyCode;
use potsplit_engine::core::expense::Expense;
use potsplit_engine::core::member::{Member, MemberId};
use potsplit_engine::core::pot::{Pot, PotId};
use potsplit_engine::core::settlement::Settlement;
use potsplit_engine::core::split::SplitStrategy;
use potsplit_engine::ledger::aggregator::compute_balances;
use potsplit_engine::ledger::recorder::apply_settlement;
use potsplit_engine::optimization::simplifier::DebtSimplifier;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

const MEMBERS: [&str; 6] = ["A", "B", "C", "D", "E", "F"];

fn pot_id() -> PotId {
    PotId::new("prop")
}

/// A member from a small pool, so expenses overlap heavily.
fn arb_member() -> impl Strategy<Value = MemberId> {
    prop::sample::select(MEMBERS.to_vec()).prop_map(|id| MemberId::new(id))
}

/// A currency from a small pool with differing minor units.
fn arb_currency() -> impl Strategy<Value = CurrencyCode> {
    prop::sample::select(vec![
        CurrencyCode::new("USD"),
        CurrencyCode::new("JPY"),
        CurrencyCode::new("KWD"),
    ])
}

/// A non-empty subset of the pool.
fn arb_participants() -> impl Strategy<Value = Vec<MemberId>> {
    prop::sample::subsequence(MEMBERS.to_vec(), 1..=MEMBERS.len())
        .prop_map(|ids| ids.into_iter().map(|id| MemberId::new(id)).collect())
}

fn arb_strategy() -> impl Strategy<Value = SplitStrategy> {
    prop_oneof![
        arb_participants().prop_map(|members| SplitStrategy::Equal { members }),
        arb_participants()
            .prop_flat_map(|members| {
                let n = members.len();
                (Just(members), prop::collection::vec(1u32..5, n))
            })
            .prop_map(|(members, weights)| SplitStrategy::Shares {
                shares: members.into_iter().zip(weights).collect(),
            }),
    ]
}

/// A valid expense: 1 to 1,000,000 minor units.
fn arb_expense() -> impl Strategy<Value = Expense> {
    (arb_member(), arb_currency(), 1i64..1_000_000, arb_strategy()).prop_filter_map(
        "expense must validate",
        |(payer, currency, units, strategy)| {
            let total = currency.from_minor_units(Decimal::from(units));
            Expense::new(pot_id(), "prop", payer, total, currency, strategy).ok()
        },
    )
}

fn arb_expenses() -> impl Strategy<Value = Vec<Expense>> {
    prop::collection::vec(arb_expense(), 1..30)
}

/// A peer-to-peer payment between two distinct pool members.
fn arb_settlement() -> impl Strategy<Value = Settlement> {
    (
        (arb_member(), arb_member()).prop_filter("payer and payee differ", |(from, to)| from != to),
        arb_currency(),
        1i64..1_000_000,
    )
        .prop_map(|((from, to), currency, units)| {
            let amount = currency.from_minor_units(Decimal::from(units));
            Settlement::new(pot_id(), from, to, amount, currency)
        })
}

fn arb_settlements() -> impl Strategy<Value = Vec<Settlement>> {
    prop::collection::vec(arb_settlement(), 0..15)
}

/// Arbitrary signed USD positions for A to E, with F balancing the sheet.
fn arb_balance_map() -> impl Strategy<Value = BTreeMap<MemberId, Decimal>> {
    prop::collection::vec(-1_000_000i64..1_000_000, MEMBERS.len() - 1).prop_map(|units| {
        let usd = CurrencyCode::new("USD");
        let mut positions: BTreeMap<MemberId, Decimal> = MEMBERS
            .iter()
            .zip(&units)
            .map(|(id, u)| (MemberId::new(*id), usd.from_minor_units(Decimal::from(*u))))
            .collect();
        let balancing = -usd.from_minor_units(Decimal::from(units.iter().sum::<i64>()));
        positions.insert(MemberId::new(MEMBERS[MEMBERS.len() - 1]), balancing);
        positions
    })
}

fn roster() -> Vec<Member> {
    MEMBERS
        .iter()
        .map(|id| Member::new(MemberId::new(*id), *id, CurrencyCode::new("USD")))
        .collect()
}

fn pot_from(expenses: Vec<Expense>) -> Pot {
    let mut pot = Pot::new(pot_id(), "prop", CurrencyCode::new("USD"));
    for member in roster() {
        pot.add_member(member).unwrap();
    }
    for expense in expenses {
        pot.add_expense(expense).unwrap();
    }
    pot
}

proptest! {
    // ===================================================================
    // INVARIANT 1: Balances sum to exactly zero per currency.
    // ===================================================================
    #[test]
    fn balances_sum_to_zero(expenses in arb_expenses(), settlements in arb_settlements()) {
        let balances = compute_balances(&roster(), &expenses, &settlements).unwrap();
        for currency in balances.currencies() {
            let sum: Decimal = balances.for_currency(currency).unwrap().values().copied().sum();
            prop_assert_eq!(sum, Decimal::ZERO);
        }
        prop_assert!(balances.is_balanced());
    }

    // ===================================================================
    // INVARIANT 2: Aggregation is a pure function of its inputs.
    // ===================================================================
    #[test]
    fn aggregation_is_idempotent(expenses in arb_expenses(), settlements in arb_settlements()) {
        let first = compute_balances(&roster(), &expenses, &settlements).unwrap();
        let second = compute_balances(&roster(), &expenses, &settlements).unwrap();
        prop_assert_eq!(first, second);
    }

    // ===================================================================
    // INVARIANT 3: Every member appears in every currency present.
    // ===================================================================
    #[test]
    fn every_member_has_a_position(expenses in arb_expenses(), settlements in arb_settlements()) {
        let balances = compute_balances(&roster(), &expenses, &settlements).unwrap();
        for currency in balances.currencies() {
            prop_assert_eq!(balances.for_currency(currency).unwrap().len(), MEMBERS.len());
        }
    }

    // ===================================================================
    // INVARIANT 4: Paying every suggested debt zeroes the balances.
    // ===================================================================
    #[test]
    fn debts_reproduce_balances(positions in arb_balance_map()) {
        let usd = CurrencyCode::new("USD");
        let debts = DebtSimplifier::simplify(&positions, &usd).unwrap();
        let residual = DebtSimplifier::residual(&positions, &debts);
        prop_assert!(residual.values().all(|v| v.is_zero()));
        for debt in &debts {
            prop_assert!(debt.amount > Decimal::ZERO);
            prop_assert!(debt.from != debt.to);
            prop_assert!(usd.is_representable(debt.amount));
            // Debtors only pay, creditors only receive.
            prop_assert!(positions[&debt.from] < Decimal::ZERO);
            prop_assert!(positions[&debt.to] > Decimal::ZERO);
        }
    }

    // ===================================================================
    // INVARIANT 5: At most nonzero - 1 payments per currency.
    // ===================================================================
    #[test]
    fn debt_count_is_bounded(positions in arb_balance_map()) {
        let debts = DebtSimplifier::simplify(&positions, &CurrencyCode::new("USD")).unwrap();
        let nonzero = positions.values().filter(|v| !v.is_zero()).count();
        prop_assert!(debts.len() <= nonzero.saturating_sub(1));
    }

    // ===================================================================
    // INVARIANT 6: Same input, same ordered output.
    // ===================================================================
    #[test]
    fn simplification_is_deterministic(positions in arb_balance_map()) {
        let usd = CurrencyCode::new("USD");
        let a = DebtSimplifier::simplify(&positions, &usd).unwrap();
        let b = DebtSimplifier::simplify(&positions.clone(), &usd).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn simplification_ignores_expense_order(expenses in arb_expenses()) {
        let mut reversed = expenses.clone();
        reversed.reverse();
        let a = DebtSimplifier::simplify_all(&compute_balances(&roster(), &expenses, &[]).unwrap()).unwrap();
        let b = DebtSimplifier::simplify_all(&compute_balances(&roster(), &reversed, &[]).unwrap()).unwrap();
        prop_assert_eq!(a, b);
    }

    // ===================================================================
    // INVARIANT 7: Recording every suggested debt settles the pot.
    // ===================================================================
    #[test]
    fn settle_up_round_trip(expenses in arb_expenses()) {
        let mut pot = pot_from(expenses);
        for debt in pot.suggested_debts().unwrap() {
            pot = apply_settlement(debt.to_settlement(pot_id()), &pot).unwrap();
        }
        prop_assert!(pot.balances().unwrap().is_settled());
        prop_assert!(pot.suggested_debts().unwrap().is_empty());
    }

    // ===================================================================
    // INVARIANT 8: Settling one debt zeroes exactly that pair's transfer.
    // ===================================================================
    #[test]
    fn single_settlement_moves_two_balances(expenses in arb_expenses()) {
        let pot = pot_from(expenses);
        let before = pot.balances().unwrap();
        let debts = pot.suggested_debts().unwrap();
        prop_assume!(!debts.is_empty());

        let debt = &debts[0];
        let after = apply_settlement(debt.to_settlement(pot_id()), &pot)
            .unwrap()
            .balances()
            .unwrap();
        prop_assert_eq!(
            after.get(&debt.from, &debt.currency),
            before.get(&debt.from, &debt.currency) + debt.amount
        );
        prop_assert_eq!(
            after.get(&debt.to, &debt.currency),
            before.get(&debt.to, &debt.currency) - debt.amount
        );
        prop_assert!(after.is_balanced());
    }

    // ===================================================================
    // INVARIANT 9: Splits always add up to the expense total.
    // ===================================================================
    #[test]
    fn splits_sum_to_total(expense in arb_expense()) {
        let sum: Decimal = expense.splits().iter().map(|s| s.amount).sum();
        prop_assert_eq!(sum, expense.total());
        for split in expense.splits() {
            prop_assert!(expense.currency().is_representable(split.amount));
        }
    }

    // ===================================================================
    // INVARIANT 10: Settlements with a member outside the pot never land.
    // ===================================================================
    #[test]
    fn outsider_settlement_is_rejected(expenses in arb_expenses(), from in arb_member()) {
        let pot = pot_from(expenses);
        let settlement = Settlement::new(
            pot_id(),
            from,
            MemberId::new("outsider"),
            Decimal::ONE,
            CurrencyCode::new("USD"),
        );
        prop_assert!(apply_settlement(settlement, &pot).is_err());
    }
}
