use crate::core::currency::CurrencyCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Opaque identifier for a member of a pot.
///
/// Every other entity refers to members by id only, so display names
/// and preferences live in exactly one place.
///
/// # Examples
///
/// ```
/// use potsplit_engine::core::member::MemberId;
///
/// let alice = MemberId::new("alice");
/// let bob = MemberId::new("bob");
/// assert!(alice < bob);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MemberId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A participant in a pot. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    id: MemberId,
    display_name: String,
    preferred_currency: CurrencyCode,
}

impl Member {
    pub fn new(
        id: MemberId,
        display_name: impl Into<String>,
        preferred_currency: CurrencyCode,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            preferred_currency,
        }
    }

    pub fn id(&self) -> &MemberId {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn preferred_currency(&self) -> &CurrencyCode {
        &self.preferred_currency
    }
}

/// The set of member ids currently belonging to a pot.
///
/// Used by validation and aggregation to reject references to
/// members that are not part of the pot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster(BTreeSet<MemberId>);

impl Roster {
    pub fn from_members(members: &[Member]) -> Self {
        Self(members.iter().map(|m| m.id().clone()).collect())
    }

    pub fn contains(&self, id: &MemberId) -> bool {
        self.0.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemberId> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<MemberId> for Roster {
    fn from_iter<T: IntoIterator<Item = MemberId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_id_display() {
        let id = MemberId::new("carol");
        assert_eq!(format!("{}", id), "carol");
    }

    #[test]
    fn test_member_accessors() {
        let m = Member::new(MemberId::new("a"), "Alice", CurrencyCode::new("EUR"));
        assert_eq!(m.id().as_str(), "a");
        assert_eq!(m.display_name(), "Alice");
        assert_eq!(m.preferred_currency().as_str(), "EUR");
    }

    #[test]
    fn test_roster_membership() {
        let members = vec![
            Member::new(MemberId::new("a"), "A", CurrencyCode::new("USD")),
            Member::new(MemberId::new("b"), "B", CurrencyCode::new("USD")),
        ];
        let roster = Roster::from_members(&members);
        assert_eq!(roster.len(), 2);
        assert!(roster.contains(&MemberId::new("b")));
        assert!(!roster.contains(&MemberId::new("z")));
    }
}
