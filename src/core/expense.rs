use crate::core::currency::CurrencyCode;
use crate::core::member::MemberId;
use crate::core::pot::PotId;
use crate::core::split::{Split, SplitStrategy};
use crate::core::validation::ValidationError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default tolerance, in minor units, when explicit splits do not add up.
pub const DEFAULT_SPLIT_TOLERANCE: u32 = 1;

/// A shared cost paid by one member and split among several.
///
/// The splits always sum exactly to `total`. Expenses are immutable;
/// [`Expense::revise`] produces an edited copy that is re-validated.
///
/// # Examples
///
/// ```
/// use potsplit_engine::core::currency::CurrencyCode;
/// use potsplit_engine::core::expense::Expense;
/// use potsplit_engine::core::member::MemberId;
/// use potsplit_engine::core::pot::PotId;
/// use potsplit_engine::core::split::SplitStrategy;
/// use rust_decimal_macros::dec;
///
/// let dinner = Expense::new(
///     PotId::new("lisbon-2026"),
///     "Dinner",
///     MemberId::new("ana"),
///     dec!(90),
///     CurrencyCode::new("EUR"),
///     SplitStrategy::equal(["ana", "ben", "cleo"]),
/// )
/// .unwrap();
///
/// assert_eq!(dinner.share_of(&MemberId::new("ben")), dec!(30));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    id: Uuid,
    pot_id: PotId,
    description: String,
    payer: MemberId,
    total: Decimal,
    currency: CurrencyCode,
    splits: Vec<Split>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl Expense {
    /// Create an expense using [`DEFAULT_SPLIT_TOLERANCE`].
    pub fn new(
        pot_id: PotId,
        description: impl Into<String>,
        payer: MemberId,
        total: Decimal,
        currency: CurrencyCode,
        strategy: SplitStrategy,
    ) -> Result<Self, ValidationError> {
        Self::with_tolerance(
            pot_id,
            description,
            payer,
            total,
            currency,
            strategy,
            DEFAULT_SPLIT_TOLERANCE,
        )
    }

    pub fn with_tolerance(
        pot_id: PotId,
        description: impl Into<String>,
        payer: MemberId,
        total: Decimal,
        currency: CurrencyCode,
        strategy: SplitStrategy,
        tolerance_minor_units: u32,
    ) -> Result<Self, ValidationError> {
        if total <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount(total));
        }
        let splits = strategy.resolve(total, &currency, &payer, tolerance_minor_units)?;
        Ok(Self {
            id: Uuid::new_v4(),
            pot_id,
            description: description.into(),
            payer,
            total,
            currency,
            splits,
            created_at: Utc::now(),
            updated_at: None,
        })
    }

    /// Produce an edited copy with a new total and split, keeping the id
    /// and payer. The new split is validated like a fresh expense.
    pub fn revise(
        &self,
        total: Decimal,
        strategy: SplitStrategy,
        tolerance_minor_units: u32,
    ) -> Result<Self, ValidationError> {
        if total <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount(total));
        }
        let splits = strategy.resolve(total, &self.currency, &self.payer, tolerance_minor_units)?;
        Ok(Self {
            total,
            splits,
            updated_at: Some(Utc::now()),
            ..self.clone()
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    // --- Accessors ---

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pot_id(&self) -> &PotId {
        &self.pot_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn payer(&self) -> &MemberId {
        &self.payer
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    pub fn splits(&self) -> &[Split] {
        &self.splits
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Amount `member` owes toward this expense (zero if not split in).
    pub fn share_of(&self, member: &MemberId) -> Decimal {
        self.splits
            .iter()
            .filter(|s| &s.member == member)
            .map(|s| s.amount)
            .sum()
    }

    /// Every member touched by this expense: payer first, then splits.
    pub fn participants(&self) -> impl Iterator<Item = &MemberId> {
        std::iter::once(&self.payer).chain(self.splits.iter().map(|s| &s.member))
    }
}

/// Unvalidated expense input as it arrives from a form or a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseDraft {
    #[serde(default)]
    pub description: String,
    pub payer: MemberId,
    pub total: Decimal,
    #[serde(default)]
    pub currency: Option<CurrencyCode>,
    pub split: SplitStrategy,
}

impl ExpenseDraft {
    /// Build the expense, falling back to `default_currency` when the
    /// draft does not name one.
    pub fn into_expense(
        self,
        pot_id: PotId,
        default_currency: &CurrencyCode,
        tolerance_minor_units: u32,
    ) -> Result<Expense, ValidationError> {
        let currency = self.currency.unwrap_or_else(|| default_currency.clone());
        Expense::with_tolerance(
            pot_id,
            self.description,
            self.payer,
            self.total,
            currency,
            self.split,
            tolerance_minor_units,
        )
    }
}
