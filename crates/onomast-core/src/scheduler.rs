//! Bounded fan-out over items with order-preserving collection.
//!
//! At most `budget` items are in flight; as soon as one finishes the next
//! queued item starts. Records come back in completion order and are slotted
//! into their input position, so the output order always matches the input
//! regardless of which request returned first.
//!
//! Cancelling the token stops dispatch. Items already running are allowed
//! to finish and their records are kept.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::ConcurrencyBudget;
use crate::error::SchedulingError;
use crate::pipeline::ItemProcessor;
use crate::types::{EnrichmentRecord, Item, ItemId};

/// How a batch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// One record per input item, in input order.
    Complete(Vec<EnrichmentRecord>),
    /// Dispatch was cancelled. Records of the items that ran, in input order.
    Aborted(Vec<EnrichmentRecord>),
}

impl BatchOutcome {
    pub fn records(&self) -> &[EnrichmentRecord] {
        match self {
            BatchOutcome::Complete(records) | BatchOutcome::Aborted(records) => records,
        }
    }
}

pub struct BatchScheduler {
    processor: Arc<dyn ItemProcessor>,
    budget: ConcurrencyBudget,
}

/// Input-position bookkeeping for one run.
struct Slots {
    position: HashMap<ItemId, usize>,
    ids: Vec<ItemId>,
    names: Vec<String>,
    records: Vec<Option<EnrichmentRecord>>,
    done: usize,
}

impl Slots {
    fn new(items: &[Item]) -> Result<Self, SchedulingError> {
        let mut position = HashMap::with_capacity(items.len());
        for (pos, item) in items.iter().enumerate() {
            if position.insert(item.id, pos).is_some() {
                return Err(SchedulingError::DuplicateItemId(item.id));
            }
        }
        Ok(Self {
            position,
            ids: items.iter().map(|i| i.id).collect(),
            names: items.iter().map(|i| i.payload.clone()).collect(),
            records: (0..items.len()).map(|_| None).collect(),
            done: 0,
        })
    }

    fn store(&mut self, joined: Result<EnrichmentRecord, JoinError>) -> Result<(), SchedulingError> {
        let record = joined?;
        let id = record.item_id;
        let pos = *self
            .position
            .get(&id)
            .ok_or(SchedulingError::UnexpectedRecord(id))?;
        if self.records[pos].is_some() {
            return Err(SchedulingError::UnexpectedRecord(id));
        }

        self.done += 1;
        info!(
            item_id = id,
            category = %record.category,
            "[{}/{}] {}: {}",
            self.done,
            self.ids.len(),
            self.names[pos].trim(),
            record.category
        );
        self.records[pos] = Some(record);
        Ok(())
    }

    fn into_complete(self) -> Result<Vec<EnrichmentRecord>, SchedulingError> {
        self.records
            .into_iter()
            .zip(self.ids)
            .map(|(slot, id)| slot.ok_or(SchedulingError::MissingRecord(id)))
            .collect()
    }

    fn into_partial(self) -> Vec<EnrichmentRecord> {
        self.records.into_iter().flatten().collect()
    }
}

impl BatchScheduler {
    pub fn new(processor: Arc<dyn ItemProcessor>, budget: ConcurrencyBudget) -> Self {
        Self { processor, budget }
    }

    pub fn budget(&self) -> ConcurrencyBudget {
        self.budget
    }

    /// Process every item with at most `budget` in flight.
    ///
    /// # Errors
    ///
    /// Duplicate item ids are rejected before anything starts. A panicking
    /// processor task, or a record for an unknown or already-recorded id,
    /// fails the whole batch.
    pub async fn run(
        &self,
        items: Vec<Item>,
        cancel: &CancellationToken,
    ) -> Result<BatchOutcome, SchedulingError> {
        let mut slots = Slots::new(&items)?;
        let semaphore = Arc::new(Semaphore::new(self.budget.get()));
        let mut tasks: JoinSet<EnrichmentRecord> = JoinSet::new();
        let mut aborted = false;

        'dispatch: for item in items {
            let permit = loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        aborted = true;
                        break 'dispatch;
                    }
                    Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                        slots.store(joined)?;
                    }
                    permit = Arc::clone(&semaphore).acquire_owned() => {
                        break permit.map_err(|e| SchedulingError::TaskFailed(e.to_string()))?;
                    }
                }
            };

            debug!(item_id = item.id, in_flight = tasks.len() + 1, "dispatching item");
            let processor = Arc::clone(&self.processor);
            tasks.spawn(async move {
                let _permit = permit;
                processor.process(item).await
            });
        }

        if aborted {
            info!(in_flight = tasks.len(), "dispatch cancelled, draining in-flight items");
        }
        while let Some(joined) = tasks.join_next().await {
            slots.store(joined)?;
        }

        if aborted {
            Ok(BatchOutcome::Aborted(slots.into_partial()))
        } else {
            slots.into_complete().map(BatchOutcome::Complete)
        }
    }
}
