//! # potsplit-engine
//!
//! Balance and settlement engine for shared expense pots.
//!
//! Members of a pot record who paid for what and how each expense is
//! split. The engine derives every member's net balance per currency and
//! turns those balances into a short list of payments that squares
//! everyone up.
//!
//! ## Architecture
//!
//! - **core**: Members, currencies, expenses, splits, settlements, pots and validation
//! - **ledger**: Balance aggregation, the settlement recorder and pot storage
//! - **graph**: Pairwise who-owes-whom graph before simplification
//! - **optimization**: Debt simplification and settlement plans
//! - **simulation**: Random pot generation for tests and benchmarks

pub mod config;
pub mod core;
pub mod error;
pub mod graph;
pub mod ledger;
pub mod optimization;
pub mod simulation;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::core::currency::CurrencyCode;
    pub use crate::core::expense::{Expense, ExpenseDraft};
    pub use crate::core::member::{Member, MemberId};
    pub use crate::core::pot::{Pot, PotId};
    pub use crate::core::settlement::{PaymentMethod, Settlement};
    pub use crate::core::split::{Split, SplitStrategy};
    pub use crate::error::{EngineError, Result};
    pub use crate::ledger::aggregator::{compute_balances, Balances};
    pub use crate::ledger::recorder::{apply_settlement, SettlementRecorder};
    pub use crate::ledger::repository::{InMemoryPotRepository, PotRepository};
    pub use crate::optimization::plan::SettlementPlan;
    pub use crate::optimization::simplifier::{Debt, DebtSimplifier};
}
