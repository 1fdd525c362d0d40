//! Activity log service
//!
//! Append-only audit trail over the storage tables. Exactly one entry is
//! written per effective workflow transition, inside the same transaction
//! that commits the transition; rejected and no-op operations write
//! nothing.

use redb::WriteTransaction;
use shared::models::ActivityEntry;

use crate::workflow::context::{ActivityDraft, Actor};
use crate::workflow::storage::{StorageResult, WorkflowStorage};

#[derive(Clone, Debug)]
pub struct ActivityLog {
    storage: WorkflowStorage,
}

impl ActivityLog {
    pub fn new(storage: WorkflowStorage) -> Self {
        Self { storage }
    }

    /// Materialize a draft into a persisted entry within the caller's
    /// transaction.
    pub fn record(
        &self,
        txn: &WriteTransaction,
        booking_id: i64,
        actor: &Actor,
        draft: ActivityDraft,
        now_millis: i64,
    ) -> StorageResult<ActivityEntry> {
        let entry = ActivityEntry {
            id: self.storage.next_activity_seq(txn)?,
            booking_id,
            user_id: actor.user_id(),
            action: draft.action,
            description: draft.description,
            old_value: draft.old_value,
            new_value: draft.new_value,
            ip_address: actor.ip_address.clone(),
            user_agent: actor.user_agent.clone(),
            created_at: now_millis,
        };
        self.storage.append_activity(txn, &entry)?;
        Ok(entry)
    }

    /// Entries for one booking in creation order.
    pub fn for_booking(&self, booking_id: i64) -> StorageResult<Vec<ActivityEntry>> {
        self.storage.activity_for_booking(booking_id)
    }

    pub fn count_for_booking(&self, booking_id: i64) -> StorageResult<usize> {
        self.storage.activity_count(booking_id)
    }
}
