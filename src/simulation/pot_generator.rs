//! Random pot generation for load testing and demos.
//!
//! Every generated expense and settlement passes validation, so the
//! resulting pot exercises the full aggregation and simplification path.

use crate::core::currency::CurrencyCode;
use crate::core::expense::Expense;
use crate::core::member::{Member, MemberId};
use crate::core::pot::{Pot, PotId};
use crate::core::settlement::Settlement;
use crate::core::split::SplitStrategy;
use crate::ledger::recorder::apply_settlement;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Configuration for generating a random pot.
#[derive(Debug, Clone)]
pub struct PotConfig {
    pub member_count: usize,
    pub expense_count: usize,
    /// Random peer-to-peer settlements recorded after the expenses.
    pub settlement_count: usize,
    pub currencies: Vec<CurrencyCode>,
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    /// Fixed seed for reproducible pots.
    pub seed: Option<u64>,
}

impl Default for PotConfig {
    fn default() -> Self {
        Self {
            member_count: 6,
            expense_count: 20,
            settlement_count: 0,
            currencies: vec![CurrencyCode::new("USD")],
            min_amount: Decimal::from(1),
            max_amount: Decimal::from(500),
            seed: None,
        }
    }
}

pub fn member_id(index: usize) -> MemberId {
    MemberId::new(format!("member-{:03}", index))
}

/// Generate a random, valid pot.
pub fn generate_random_pot(config: &PotConfig) -> Pot {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let base = config
        .currencies
        .first()
        .cloned()
        .unwrap_or_else(|| CurrencyCode::new("USD"));
    let pot_id = PotId::new("generated");
    let mut pot = Pot::new(pot_id.clone(), "Generated pot", base.clone());

    let members: Vec<MemberId> = (0..config.member_count.max(2)).map(member_id).collect();
    for id in &members {
        let name = format!("Member {}", id);
        if let Err(e) = pot.add_member(Member::new(id.clone(), name, base.clone())) {
            log::warn!("skipping generated member {}: {}", id, e);
        }
    }

    for n in 0..config.expense_count {
        let currency = config
            .currencies
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| base.clone());
        let total = random_amount(&mut rng, &currency, config.min_amount, config.max_amount);
        let payer = members[rng.gen_range(0..members.len())].clone();
        let strategy = random_strategy(&mut rng, &members);

        let expense = Expense::new(
            pot_id.clone(),
            format!("Expense #{}", n + 1),
            payer,
            total,
            currency,
            strategy,
        );
        match expense {
            Ok(expense) => {
                if let Err(e) = pot.add_expense(expense) {
                    log::warn!("skipping generated expense: {}", e);
                }
            }
            Err(e) => log::warn!("skipping generated expense: {}", e),
        }
    }

    for _ in 0..config.settlement_count {
        let from_idx = rng.gen_range(0..members.len());
        let mut to_idx = rng.gen_range(0..members.len());
        while to_idx == from_idx {
            to_idx = rng.gen_range(0..members.len());
        }
        let currency = config
            .currencies
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| base.clone());
        let amount = random_amount(&mut rng, &currency, config.min_amount, config.max_amount);
        let settlement = Settlement::new(
            pot_id.clone(),
            members[from_idx].clone(),
            members[to_idx].clone(),
            amount,
            currency,
        );
        match apply_settlement(settlement, &pot) {
            Ok(next) => pot = next,
            Err(e) => log::warn!("skipping generated settlement: {}", e),
        }
    }

    pot
}

fn random_amount<R: Rng>(
    rng: &mut R,
    currency: &CurrencyCode,
    min: Decimal,
    max: Decimal,
) -> Decimal {
    let to_units = |amount: Decimal| {
        currency
            .to_minor_units(currency.round(amount))
            .and_then(|u| u.to_i64())
            .unwrap_or(1)
    };
    let low = to_units(min).max(1);
    let high = to_units(max).max(low);
    currency.from_minor_units(Decimal::from(rng.gen_range(low..=high)))
}

fn random_strategy<R: Rng>(rng: &mut R, members: &[MemberId]) -> SplitStrategy {
    let count = rng.gen_range(1..=members.len());
    let participants: Vec<MemberId> = members.choose_multiple(rng, count).cloned().collect();
    if rng.gen_bool(0.7) {
        SplitStrategy::Equal {
            members: participants,
        }
    } else {
        SplitStrategy::Shares {
            shares: participants
                .into_iter()
                .map(|m| (m, rng.gen_range(1..=3)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_pot_is_consistent() {
        let config = PotConfig {
            member_count: 5,
            expense_count: 30,
            settlement_count: 5,
            currencies: vec![CurrencyCode::new("USD"), CurrencyCode::new("JPY")],
            seed: Some(7),
            ..Default::default()
        };
        let pot = generate_random_pot(&config);
        assert_eq!(pot.members().len(), 5);
        assert_eq!(pot.expenses().len(), 30);
        assert_eq!(pot.settlements().len(), 5);
        assert!(pot.balances().unwrap().is_balanced());
    }

    #[test]
    fn test_seed_is_reproducible() {
        let config = PotConfig {
            seed: Some(42),
            ..Default::default()
        };
        let a = generate_random_pot(&config);
        let b = generate_random_pot(&config);
        let totals = |p: &Pot| p.expenses().iter().map(|e| e.total()).collect::<Vec<_>>();
        assert_eq!(totals(&a), totals(&b));
        assert_eq!(a.balances().unwrap(), b.balances().unwrap());
    }
}
