//! Recording payments through the settlement recorder.
//!
//! Follows a pot from its first expense to fully settled, including a
//! mistaken payment that gets reversed and a stale write that is refused.

use potsplit_engine::core::currency::CurrencyCode;
use potsplit_engine::core::expense::Expense;
use potsplit_engine::core::member::{Member, MemberId};
use potsplit_engine::core::pot::{Pot, PotId};
use potsplit_engine::core::settlement::{PaymentMethod, Settlement};
use potsplit_engine::core::split::SplitStrategy;
use potsplit_engine::error::Result;
use potsplit_engine::ledger::recorder::SettlementRecorder;
use potsplit_engine::ledger::repository::InMemoryPotRepository;
use rust_decimal_macros::dec;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("╔══════════════════════════════════════════╗");
    println!("║  potsplit-engine: Settle Up Example      ║");
    println!("╚══════════════════════════════════════════╝\n");

    let usd = CurrencyCode::new("USD");
    let pot_id = PotId::new("flat-42");
    let mut pot = Pot::new(pot_id.clone(), "Flat 42", usd.clone());
    for id in ["A", "B", "C"] {
        pot.add_member(Member::new(MemberId::new(id), id, usd.clone()))?;
    }

    let mut recorder = SettlementRecorder::new(InMemoryPotRepository::new());
    recorder.create_pot(&pot)?;

    let groceries = Expense::new(
        pot_id.clone(),
        "Groceries",
        MemberId::new("A"),
        dec!(90),
        usd.clone(),
        SplitStrategy::equal(["A", "B", "C"]),
    )?;
    let pot = recorder.add_expense(&pot_id, groceries, pot.version())?;

    println!("━━━ Before settling ━━━\n");
    println!("{}", recorder.plan(&pot_id)?);

    // --- A mistaken payment, then its reversal ---
    let mistake = Settlement::new(
        pot_id.clone(),
        MemberId::new("B"),
        MemberId::new("C"),
        dec!(30),
        usd.clone(),
    )
    .with_method(PaymentMethod::Cash);
    let mistake_id = mistake.id();
    let pot = recorder.record(&pot_id, mistake, pot.version())?;
    let stale_version = pot.version();
    let pot = recorder.reverse(&pot_id, mistake_id, pot.version())?;
    println!("Reversed settlement {}; log now has {} entries.\n", mistake_id, pot.settlements().len());

    // --- A write based on an outdated snapshot is refused ---
    let late = Settlement::new(
        pot_id.clone(),
        MemberId::new("C"),
        MemberId::new("A"),
        dec!(30),
        usd.clone(),
    );
    match recorder.record(&pot_id, late, stale_version) {
        Ok(_) => println!("Stale write was accepted (unexpected)."),
        Err(e) => println!("Stale write refused: {}\n", e),
    }

    // --- Pay every suggested debt ---
    let mut pot = pot;
    for debt in recorder.plan(&pot_id)?.debts().to_vec() {
        println!("  {}", debt);
        pot = recorder.settle_debt(&pot_id, &debt, Some(PaymentMethod::BankTransfer), pot.version())?;
    }

    println!("\n━━━ After settling ━━━\n");
    println!("{}", recorder.plan(&pot_id)?);
    Ok(())
}
