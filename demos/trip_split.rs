//! Splitting a weekend trip four ways.
//!
//! Shows the different split strategies, per-member balances and the
//! simplified list of payments that settles everyone up.

use potsplit_engine::core::currency::CurrencyCode;
use potsplit_engine::core::expense::Expense;
use potsplit_engine::core::member::{Member, MemberId};
use potsplit_engine::core::pot::{Pot, PotId};
use potsplit_engine::core::split::SplitStrategy;
use potsplit_engine::error::Result;
use potsplit_engine::optimization::plan::SettlementPlan;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn main() -> Result<()> {
    println!("╔══════════════════════════════════════════╗");
    println!("║  potsplit-engine: Weekend Trip Example   ║");
    println!("╚══════════════════════════════════════════╝\n");

    let eur = CurrencyCode::new("EUR");
    let pot_id = PotId::new("porto-weekend");
    let mut pot = Pot::new(pot_id.clone(), "Porto weekend", eur.clone());

    let ana = MemberId::new("ana");
    let ben = MemberId::new("ben");
    let cleo = MemberId::new("cleo");
    let dev = MemberId::new("dev");
    for (id, name) in [(&ana, "Ana"), (&ben, "Ben"), (&cleo, "Cleo"), (&dev, "Dev")] {
        pot.add_member(Member::new(id.clone(), name, eur.clone()))?;
    }

    // --- Equal split, with a leftover cent ---
    pot.add_expense(Expense::new(
        pot_id.clone(),
        "Apartment",
        ana.clone(),
        dec!(310.01),
        eur.clone(),
        SplitStrategy::equal(["ana", "ben", "cleo", "dev"]),
    )?)?;

    // --- Shares: Ben and Cleo are a couple ---
    pot.add_expense(Expense::new(
        pot_id.clone(),
        "Port tasting",
        ben.clone(),
        dec!(96),
        eur.clone(),
        SplitStrategy::Shares {
            shares: vec![(ana.clone(), 1), (ben.clone(), 2), (dev.clone(), 1)],
        },
    )?)?;

    // --- Exact amounts ---
    pot.add_expense(Expense::new(
        pot_id.clone(),
        "Dinner",
        cleo.clone(),
        dec!(142.50),
        eur.clone(),
        SplitStrategy::Exact {
            amounts: vec![
                (ana.clone(), dec!(30)),
                (ben.clone(), dec!(40.50)),
                (cleo.clone(), dec!(37)),
                (dev.clone(), dec!(35)),
            ],
        },
    )?)?;

    // --- Percentages ---
    pot.add_expense(Expense::new(
        pot_id.clone(),
        "Car rental",
        dev.clone(),
        dec!(120),
        eur.clone(),
        SplitStrategy::Percentage {
            percents: vec![(ana.clone(), dec!(25)), (dev.clone(), dec!(75))],
        },
    )?)?;

    println!("━━━ Expenses ━━━\n");
    for expense in pot.expenses() {
        println!(
            "  {:<14} paid by {:<5} {:>8} {}",
            expense.description(),
            expense.payer(),
            expense.total(),
            expense.currency()
        );
    }

    println!("\n━━━ Balances ━━━\n");
    let balances = pot.balances()?;
    for member in pot.members() {
        let amount = balances.get(member.id(), &eur);
        let status = if amount > Decimal::ZERO {
            "is owed"
        } else if amount < Decimal::ZERO {
            "owes"
        } else {
            "settled"
        };
        println!("  {:<6} {:>10} EUR  [{}]", member.display_name(), amount, status);
    }
    println!();

    let plan = SettlementPlan::build(&pot)?;
    println!("{}", plan);
    Ok(())
}
