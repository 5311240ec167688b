use crate::types::{Person, ReferenceNumber};
use std::collections::HashMap;
use thiserror::Error;

/// Reference number collision on `register`. The colliding entry is still
/// retained under a synthetic key so no data is lost; the caller decides
/// whether to log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("duplicate reference number {0}")]
pub struct DuplicateReference(pub ReferenceNumber);

/// Append-only store populated during the parsing pass. Frozen into a
/// read-only [`PersonRegistry`] before the linking pass starts — the
/// ownership handoff is the only synchronization discipline the pipeline
/// needs.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: Vec<Person>,
    by_reference: HashMap<ReferenceNumber, usize>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a finalized person. On a reference collision the person is
    /// kept in document order (reachable through iteration, a synthetic
    /// positional key) but does not displace the first holder of the number.
    pub fn register(&mut self, person: Person) -> Result<(), DuplicateReference> {
        let reference = person.reference;
        let index = self.entries.len();
        self.entries.push(person);

        match reference {
            Some(r) => {
                if self.by_reference.contains_key(&r) {
                    Err(DuplicateReference(r))
                } else {
                    self.by_reference.insert(r, index);
                    Ok(())
                }
            }
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hand off to the linking pass. No mutation is possible afterwards.
    pub fn freeze(self) -> PersonRegistry {
        PersonRegistry {
            entries: self.entries,
            by_reference: self.by_reference,
        }
    }
}

/// Immutable view of all parsed persons, keyed by reference number with
/// insertion order preserved for fallback iteration.
#[derive(Debug)]
pub struct PersonRegistry {
    entries: Vec<Person>,
    by_reference: HashMap<ReferenceNumber, usize>,
}

impl PersonRegistry {
    pub fn lookup(&self, reference: ReferenceNumber) -> Option<&Person> {
        self.by_reference.get(&reference).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, reference: ReferenceNumber) -> bool {
        self.by_reference.contains_key(&reference)
    }

    /// All persons in document order, duplicates included
    pub fn iter(&self) -> impl Iterator<Item = &Person> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
