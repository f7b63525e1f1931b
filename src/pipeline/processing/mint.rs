//! Surrogate identifier minting.
//!
//! One sequential counter per entity kind, owned by the run that created
//! it. Dedup happens in the callers, so identical logical entities reach
//! the minter once and IDs within a table never collide or change.

use std::collections::HashMap;

use crate::domain::{CompanyId, ContactId, DealId, EntityKind, ParticipantId};
use crate::error::{PipelineError, Result};
use crate::observability::metrics::mint as mint_metrics;
use crate::registry::IdOverrides;

#[derive(Debug)]
pub struct IdMinter {
    next: HashMap<EntityKind, u64>,
    caps: HashMap<EntityKind, Option<u64>>,
    counts: HashMap<EntityKind, u64>,
}

const ALL_KINDS: [EntityKind; 4] = [
    EntityKind::Deal,
    EntityKind::Company,
    EntityKind::Contact,
    EntityKind::Participant,
];

impl IdMinter {
    pub fn new(overrides: &IdOverrides) -> Self {
        let mut next = HashMap::new();
        let mut caps = HashMap::new();
        for kind in ALL_KINDS {
            let policy = overrides.for_kind(kind);
            next.insert(kind, policy.offset.unwrap_or(1));
            caps.insert(kind, policy.cap);
        }
        Self {
            next,
            caps,
            counts: HashMap::new(),
        }
    }

    fn next_id(&mut self, kind: EntityKind) -> Result<u64> {
        let counter = self.next.entry(kind).or_insert(1);
        if let Some(cap) = self.caps.get(&kind).copied().flatten() {
            if *counter > cap {
                return Err(PipelineError::IdentifierExhaustion { kind, cap });
            }
        }
        let id = *counter;
        *counter += 1;
        *self.counts.entry(kind).or_insert(0) += 1;
        mint_metrics::ids_assigned(1);
        Ok(id)
    }

    pub fn next_deal(&mut self) -> Result<DealId> {
        Ok(DealId(self.next_id(EntityKind::Deal)?))
    }

    pub fn next_company(&mut self) -> Result<CompanyId> {
        Ok(CompanyId(self.next_id(EntityKind::Company)?))
    }

    pub fn next_contact(&mut self) -> Result<ContactId> {
        Ok(ContactId(self.next_id(EntityKind::Contact)?))
    }

    pub fn next_participant(&mut self) -> Result<ParticipantId> {
        Ok(ParticipantId(self.next_id(EntityKind::Participant)?))
    }

    /// Never hand out a value at or below `floor`. Called when a supplied
    /// master table already occupies the low end of the ID space.
    pub fn advance_past(&mut self, kind: EntityKind, floor: u64) {
        let counter = self.next.entry(kind).or_insert(1);
        if *counter <= floor {
            *counter = floor + 1;
        }
    }

    /// How many identifiers this run has handed out for a kind.
    pub fn minted(&self, kind: EntityKind) -> u64 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }
}

impl Default for IdMinter {
    fn default() -> Self {
        Self::new(&IdOverrides::default())
    }
}
