use crate::core::currency::CurrencyCode;
use crate::core::member::MemberId;
use crate::core::pot::PotId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// How a settlement payment was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Card,
    Other(String),
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::BankTransfer => write!(f, "bank transfer"),
            PaymentMethod::Card => write!(f, "card"),
            PaymentMethod::Other(name) => write!(f, "{}", name),
        }
    }
}

/// A payment actually made from one member to another.
///
/// Settlements are ground truth and never change after being recorded.
/// A mistaken settlement is corrected by recording its
/// [`offsetting`](Settlement::offsetting) counterpart.
///
/// Construction does not validate; the recorder checks amount, parties,
/// and membership before appending to a pot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    id: Uuid,
    pot_id: PotId,
    /// The member handing over money.
    from: MemberId,
    /// The member receiving it.
    to: MemberId,
    amount: Decimal,
    currency: CurrencyCode,
    recorded_at: DateTime<Utc>,
    method: Option<PaymentMethod>,
    confirmation: Option<String>,
    /// The earlier settlement this one reverses, if any.
    supersedes: Option<Uuid>,
}

impl Settlement {
    pub fn new(
        pot_id: PotId,
        from: MemberId,
        to: MemberId,
        amount: Decimal,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            pot_id,
            from,
            to,
            amount,
            currency,
            recorded_at: Utc::now(),
            method: None,
            confirmation: None,
            supersedes: None,
        }
    }

    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.method = Some(method);
        self
    }

    /// Attach an external confirmation, e.g. a bank reference.
    pub fn with_confirmation(mut self, confirmation: impl Into<String>) -> Self {
        self.confirmation = Some(confirmation.into());
        self
    }

    pub fn with_recorded_at(mut self, recorded_at: DateTime<Utc>) -> Self {
        self.recorded_at = recorded_at;
        self
    }

    /// A settlement that exactly reverses this one.
    pub fn offsetting(&self) -> Settlement {
        Settlement {
            id: Uuid::new_v4(),
            pot_id: self.pot_id.clone(),
            from: self.to.clone(),
            to: self.from.clone(),
            amount: self.amount,
            currency: self.currency.clone(),
            recorded_at: Utc::now(),
            method: self.method.clone(),
            confirmation: None,
            supersedes: Some(self.id),
        }
    }

    // --- Accessors ---

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pot_id(&self) -> &PotId {
        &self.pot_id
    }

    pub fn from(&self) -> &MemberId {
        &self.from
    }

    pub fn to(&self) -> &MemberId {
        &self.to
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn method(&self) -> Option<&PaymentMethod> {
        self.method.as_ref()
    }

    pub fn confirmation(&self) -> Option<&str> {
        self.confirmation.as_deref()
    }

    pub fn supersedes(&self) -> Option<Uuid> {
        self.supersedes
    }
}
