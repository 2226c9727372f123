//! Two-phase reveal pipeline: a slot goes `Hidden -> Pending -> Revealed`.
//!
//! [`RevealPipeline::start`] hands out a ticket; [`RevealPipeline::commit`] only accepts the
//! ticket of the pending reveal, so a commit scheduled by a session that has since been reset
//! or rehydrated cannot land on the wrong slot.

use indexmap::IndexSet;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{dao::models::PendingRevealEntity, error::Rejection};

/// Identifier of a started reveal.
pub type RevealId = Uuid;

/// Visibility of a single fact slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FactSlot {
    /// Not opened yet.
    Hidden,
    /// Opening animation running, not committed.
    Pending,
    /// Committed; never reverts.
    Revealed,
}

/// Reveal that was started and awaits its commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReveal {
    /// Ticket to present on commit.
    pub id: RevealId,
    /// Slot being revealed.
    pub fact_index: usize,
    /// When the reveal started.
    pub started_at: OffsetDateTime,
}

/// Slot bookkeeping for one challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealPipeline {
    slots: Vec<FactSlot>,
    revealed: IndexSet<usize>,
    pending: Option<PendingReveal>,
}

impl RevealPipeline {
    /// Create a pipeline with `fact_count` hidden slots.
    pub fn new(fact_count: usize) -> Self {
        Self {
            slots: vec![FactSlot::Hidden; fact_count],
            revealed: IndexSet::new(),
            pending: None,
        }
    }

    /// Rebuild a pipeline from persisted data. Indices outside the slot range are dropped.
    pub fn restore(
        fact_count: usize,
        revealed: impl IntoIterator<Item = usize>,
        pending: Option<PendingReveal>,
    ) -> Self {
        let mut pipeline = Self::new(fact_count);
        for index in revealed {
            if index < fact_count {
                pipeline.slots[index] = FactSlot::Revealed;
                pipeline.revealed.insert(index);
            }
        }

        pipeline.pending = pending.filter(|pending| {
            pipeline
                .slots
                .get(pending.fact_index)
                .is_some_and(|slot| *slot == FactSlot::Hidden)
        });
        if let Some(pending) = &pipeline.pending {
            pipeline.slots[pending.fact_index] = FactSlot::Pending;
        }

        pipeline
    }

    /// All slots in index order.
    pub fn slots(&self) -> &[FactSlot] {
        &self.slots
    }

    /// Committed indices in reveal order.
    pub fn revealed(&self) -> &IndexSet<usize> {
        &self.revealed
    }

    /// The reveal awaiting its commit, if any.
    pub fn pending(&self) -> Option<&PendingReveal> {
        self.pending.as_ref()
    }

    /// Move `fact_index` to pending and return the ticket for its commit.
    pub fn start(
        &mut self,
        fact_index: usize,
        now: OffsetDateTime,
    ) -> Result<PendingReveal, Rejection> {
        let count = self.slots.len();
        let Some(slot) = self.slots.get(fact_index).copied() else {
            return Err(Rejection::FactOutOfRange {
                index: fact_index,
                count,
            });
        };

        if let Some(pending) = &self.pending {
            return Err(Rejection::RevealAlreadyPending(pending.fact_index));
        }

        if slot != FactSlot::Hidden {
            return Err(Rejection::SlotNotHidden(fact_index));
        }

        let pending = PendingReveal {
            id: Uuid::new_v4(),
            fact_index,
            started_at: now,
        };
        self.slots[fact_index] = FactSlot::Pending;
        self.pending = Some(pending.clone());

        Ok(pending)
    }

    /// Commit the pending reveal identified by `id`, returning the committed slot.
    pub fn commit(&mut self, id: RevealId) -> Result<usize, Rejection> {
        let pending = self.pending.take().ok_or(Rejection::NoPendingReveal)?;

        if pending.id != id {
            let expected = pending.id;
            self.pending = Some(pending);
            return Err(Rejection::RevealTicketMismatch { expected, got: id });
        }

        self.slots[pending.fact_index] = FactSlot::Revealed;
        self.revealed.insert(pending.fact_index);
        Ok(pending.fact_index)
    }

    /// Commit whatever reveal is pending, regardless of its ticket.
    pub fn commit_pending(&mut self) -> Option<usize> {
        let id = self.pending.as_ref()?.id;
        self.commit(id).ok()
    }
}

impl From<PendingRevealEntity> for PendingReveal {
    fn from(value: PendingRevealEntity) -> Self {
        Self {
            id: value.id,
            fact_index: value.fact_index,
            started_at: value.started_at,
        }
    }
}

impl From<PendingReveal> for PendingRevealEntity {
    fn from(value: PendingReveal) -> Self {
        Self {
            id: value.id,
            fact_index: value.fact_index,
            started_at: value.started_at,
        }
    }
}
