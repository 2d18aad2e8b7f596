//! Persistence seam for pot snapshots.
//!
//! The engine itself keeps no state between calls. Anything that needs
//! to outlive a computation goes through a [`PotRepository`] supplied by
//! the caller.

use crate::core::pot::{Pot, PotId};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("pot {0} not found")]
    NotFound(PotId),
    #[error("pot {pot} changed concurrently: expected version {expected}, found {found}")]
    VersionConflict {
        pot: PotId,
        expected: u64,
        found: u64,
    },
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Storage of pot snapshots with optimistic concurrency.
///
/// `save` must reject the write when the stored version differs from
/// `expected_version`, so two writers working from the same snapshot
/// cannot silently overwrite each other.
pub trait PotRepository {
    fn load(&self, id: &PotId) -> Result<Option<Pot>, RepositoryError>;

    /// Persist `pot`. `expected_version` is the version the caller read,
    /// or `None` when creating a new pot.
    fn save(&mut self, pot: &Pot, expected_version: Option<u64>) -> Result<(), RepositoryError>;
}

/// Repository backed by a `HashMap`, for tests and single-process use.
#[derive(Debug, Default)]
pub struct InMemoryPotRepository {
    pots: HashMap<PotId, Pot>,
}

impl InMemoryPotRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pots.is_empty()
    }
}

impl PotRepository for InMemoryPotRepository {
    fn load(&self, id: &PotId) -> Result<Option<Pot>, RepositoryError> {
        Ok(self.pots.get(id).cloned())
    }

    fn save(&mut self, pot: &Pot, expected_version: Option<u64>) -> Result<(), RepositoryError> {
        let stored = self.pots.get(pot.id()).map(|p| p.version());
        match (stored, expected_version) {
            (None, None) => {}
            (Some(found), Some(expected)) if found == expected => {}
            (Some(found), expected) => {
                return Err(RepositoryError::VersionConflict {
                    pot: pot.id().clone(),
                    expected: expected.unwrap_or(0),
                    found,
                });
            }
            (None, Some(_)) => return Err(RepositoryError::NotFound(pot.id().clone())),
        }
        self.pots.insert(pot.id().clone(), pot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::CurrencyCode;

    fn pot() -> Pot {
        Pot::new(PotId::new("flat"), "Flat", CurrencyCode::new("GBP"))
    }

    #[test]
    fn test_create_and_load() {
        let mut repo = InMemoryPotRepository::new();
        repo.save(&pot(), None).unwrap();
        let loaded = repo.load(&PotId::new("flat")).unwrap().unwrap();
        assert_eq!(loaded.name(), "Flat");
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_create_twice_conflicts() {
        let mut repo = InMemoryPotRepository::new();
        repo.save(&pot(), None).unwrap();
        assert!(matches!(
            repo.save(&pot(), None),
            Err(RepositoryError::VersionConflict { .. })
        ));
    }

    #[test]
    fn test_stale_version_conflicts() {
        let mut repo = InMemoryPotRepository::new();
        repo.save(&pot(), None).unwrap();
        let err = repo.save(&pot(), Some(7)).unwrap_err();
        assert_eq!(
            err,
            RepositoryError::VersionConflict {
                pot: PotId::new("flat"),
                expected: 7,
                found: 0,
            }
        );
    }

    #[test]
    fn test_update_missing_pot() {
        let mut repo = InMemoryPotRepository::new();
        assert_eq!(
            repo.save(&pot(), Some(0)),
            Err(RepositoryError::NotFound(PotId::new("flat")))
        );
    }
}
