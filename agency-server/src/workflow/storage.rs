//! redb-based storage layer for the document record store
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `bookings` | `id` | `Booking` | Aggregate roots |
//! | `booking_refs` | `booking_reference` | `id` | Unique reference index |
//! | `quotes` | `id` | `Quote` | Issued quotes |
//! | `quote_numbers` | `quote_number` | `id` | Unique number index (also the allocator scan target) |
//! | `invoices` | `id` | `Invoice` | Issued invoices |
//! | `invoice_numbers` | `invoice_number` | `id` | Unique number index |
//! | `activity_log` | `(booking_id, seq)` | `ActivityEntry` | Append-only audit trail |
//! | `counters` | `&str` | `u64` | Activity sequence |
//! | `users` | `id` | `User` | Back-office users |
//! | `usernames` / `user_emails` | `&str` | `id` | Unique user indexes |
//! | `role_permissions` | role name | `RolePermission` | Per-role defaults |
//! | `user_permissions` | `user_id` | `UserPermission` | Per-user overrides |
//! | `customers` / `suppliers` | `id` | record | Reference entities |
//! | `pending_renders` | `booking_id` | `PendingRender` | Deferred artifact queue |
//!
//! # Concurrency
//!
//! redb serializes write transactions, so every workflow operation commits
//! atomically and identifier scans inside a write transaction cannot race.
//! Cross-request staleness is still possible (read outside, write later),
//! which is why entity updates go through a compare-and-set on
//! `updated_at`; a mismatch surfaces as [`StorageError::StaleWrite`].

use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::{de::DeserializeOwned, Serialize};
use shared::models::{
    ActivityEntry, Booking, Customer, Invoice, Quote, Role, RolePermission, Supplier, User,
    UserPermission,
};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::render::PendingRender;

const BOOKINGS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("bookings");
const BOOKING_REFS_TABLE: TableDefinition<&str, i64> = TableDefinition::new("booking_refs");
const QUOTES_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("quotes");
const QUOTE_NUMBERS_TABLE: TableDefinition<&str, i64> = TableDefinition::new("quote_numbers");
const INVOICES_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("invoices");
const INVOICE_NUMBERS_TABLE: TableDefinition<&str, i64> = TableDefinition::new("invoice_numbers");
const ACTIVITY_TABLE: TableDefinition<(i64, u64), &[u8]> = TableDefinition::new("activity_log");
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");
const USERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("users");
const USERNAMES_TABLE: TableDefinition<&str, i64> = TableDefinition::new("usernames");
const USER_EMAILS_TABLE: TableDefinition<&str, i64> = TableDefinition::new("user_emails");
const ROLE_PERMISSIONS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("role_permissions");
const USER_PERMISSIONS_TABLE: TableDefinition<i64, &[u8]> =
    TableDefinition::new("user_permissions");
const CUSTOMERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("customers");
const SUPPLIERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("suppliers");
const PENDING_RENDERS_TABLE: TableDefinition<i64, &[u8]> =
    TableDefinition::new("pending_renders");

const ACTIVITY_SEQ_KEY: &str = "activity_seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Optimistic-concurrency failure: the row changed since it was read.
    #[error("Stale write on {entity} {id}: expected updated_at {expected}, found {found}")]
    StaleWrite {
        entity: &'static str,
        id: i64,
        expected: i64,
        found: i64,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Which unique-number index an allocator scan targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberIndex {
    Quote,
    Invoice,
}

fn to_bytes<T: Serialize>(value: &T) -> StorageResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> StorageResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Document record store backed by redb.
#[derive(Clone)]
pub struct WorkflowStorage {
    db: Arc<Database>,
}

impl WorkflowStorage {
    /// Open or create the database at the given path.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    /// Open an in-memory database (hermetic tests).
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    fn init_tables(&self) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let _ = txn.open_table(BOOKINGS_TABLE)?;
            let _ = txn.open_table(BOOKING_REFS_TABLE)?;
            let _ = txn.open_table(QUOTES_TABLE)?;
            let _ = txn.open_table(QUOTE_NUMBERS_TABLE)?;
            let _ = txn.open_table(INVOICES_TABLE)?;
            let _ = txn.open_table(INVOICE_NUMBERS_TABLE)?;
            let _ = txn.open_table(ACTIVITY_TABLE)?;
            let _ = txn.open_table(USERS_TABLE)?;
            let _ = txn.open_table(USERNAMES_TABLE)?;
            let _ = txn.open_table(USER_EMAILS_TABLE)?;
            let _ = txn.open_table(ROLE_PERMISSIONS_TABLE)?;
            let _ = txn.open_table(USER_PERMISSIONS_TABLE)?;
            let _ = txn.open_table(CUSTOMERS_TABLE)?;
            let _ = txn.open_table(SUPPLIERS_TABLE)?;
            let _ = txn.open_table(PENDING_RENDERS_TABLE)?;
            let mut counters = txn.open_table(COUNTERS_TABLE)?;
            if counters.get(ACTIVITY_SEQ_KEY)?.is_none() {
                counters.insert(ACTIVITY_SEQ_KEY, 0u64)?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction (serialized by redb).
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Bookings ==========

    /// Insert a new booking and index its reference. Fails on duplicate
    /// reference (the allocator retries with a fresh suffix).
    pub fn insert_booking(&self, txn: &WriteTransaction, booking: &Booking) -> StorageResult<()> {
        let mut refs = txn.open_table(BOOKING_REFS_TABLE)?;
        if refs.get(booking.booking_reference.as_str())?.is_some() {
            return Err(StorageError::DuplicateKey(booking.booking_reference.clone()));
        }
        refs.insert(booking.booking_reference.as_str(), booking.id)?;
        drop(refs);

        let mut table = txn.open_table(BOOKINGS_TABLE)?;
        table.insert(booking.id, to_bytes(booking)?.as_slice())?;
        Ok(())
    }

    /// Load a booking inside a write transaction.
    pub fn booking_txn(&self, txn: &WriteTransaction, id: i64) -> StorageResult<Option<Booking>> {
        let table = txn.open_table(BOOKINGS_TABLE)?;
        let found = match table.get(id)? {
            Some(guard) => Some(from_bytes(guard.value())?),
            None => None,
        };
        Ok(found)
    }

    /// Compare-and-set update: the stored row's `updated_at` must match
    /// `expected_updated_at`. On success the booking is stamped with
    /// `now_millis` and written back.
    pub fn update_booking_cas(
        &self,
        txn: &WriteTransaction,
        booking: &mut Booking,
        expected_updated_at: i64,
        now_millis: i64,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(BOOKINGS_TABLE)?;
        let stored_updated_at = match table.get(booking.id)? {
            Some(guard) => from_bytes::<Booking>(guard.value())?.updated_at,
            None => return Err(StorageError::NotFound(format!("booking {}", booking.id))),
        };
        if stored_updated_at != expected_updated_at {
            return Err(StorageError::StaleWrite {
                entity: "booking",
                id: booking.id,
                expected: expected_updated_at,
                found: stored_updated_at,
            });
        }
        booking.updated_at = now_millis;
        table.insert(booking.id, to_bytes(booking)?.as_slice())?;
        Ok(())
    }

    /// Load a booking outside any transaction.
    pub fn get_booking(&self, id: i64) -> StorageResult<Option<Booking>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(BOOKINGS_TABLE)?;
        let found = match table.get(id)? {
            Some(guard) => Some(from_bytes(guard.value())?),
            None => None,
        };
        Ok(found)
    }

    pub fn find_booking_by_reference(&self, reference: &str) -> StorageResult<Option<Booking>> {
        let txn = self.db.begin_read()?;
        let refs = txn.open_table(BOOKING_REFS_TABLE)?;
        let id = match refs.get(reference)? {
            Some(guard) => guard.value(),
            None => return Ok(None),
        };
        drop(refs);
        let table = txn.open_table(BOOKINGS_TABLE)?;
        let found = match table.get(id)? {
            Some(guard) => Some(from_bytes(guard.value())?),
            None => None,
        };
        Ok(found)
    }

    pub fn booking_reference_exists(
        &self,
        txn: &WriteTransaction,
        reference: &str,
    ) -> StorageResult<bool> {
        let refs = txn.open_table(BOOKING_REFS_TABLE)?;
        let found = refs.get(reference)?.is_some();
        Ok(found)
    }

    /// All bookings (list views, auto-completion sweep). Fine at
    /// back-office scale; revisit if the table grows past tens of
    /// thousands of rows.
    pub fn list_bookings(&self) -> StorageResult<Vec<Booking>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(BOOKINGS_TABLE)?;
        let mut out = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            out.push(from_bytes(value.value())?);
        }
        Ok(out)
    }

    // ========== Quotes ==========

    pub fn insert_quote(&self, txn: &WriteTransaction, quote: &Quote) -> StorageResult<()> {
        let mut numbers = txn.open_table(QUOTE_NUMBERS_TABLE)?;
        if numbers.get(quote.quote_number.as_str())?.is_some() {
            return Err(StorageError::DuplicateKey(quote.quote_number.clone()));
        }
        numbers.insert(quote.quote_number.as_str(), quote.id)?;
        drop(numbers);

        let mut table = txn.open_table(QUOTES_TABLE)?;
        table.insert(quote.id, to_bytes(quote)?.as_slice())?;
        Ok(())
    }

    pub fn quote_txn(&self, txn: &WriteTransaction, id: i64) -> StorageResult<Option<Quote>> {
        let table = txn.open_table(QUOTES_TABLE)?;
        let found = match table.get(id)? {
            Some(guard) => Some(from_bytes(guard.value())?),
            None => None,
        };
        Ok(found)
    }

    pub fn update_quote_cas(
        &self,
        txn: &WriteTransaction,
        quote: &mut Quote,
        expected_updated_at: i64,
        now_millis: i64,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(QUOTES_TABLE)?;
        let stored_updated_at = match table.get(quote.id)? {
            Some(guard) => from_bytes::<Quote>(guard.value())?.updated_at,
            None => return Err(StorageError::NotFound(format!("quote {}", quote.id))),
        };
        if stored_updated_at != expected_updated_at {
            return Err(StorageError::StaleWrite {
                entity: "quote",
                id: quote.id,
                expected: expected_updated_at,
                found: stored_updated_at,
            });
        }
        quote.updated_at = now_millis;
        table.insert(quote.id, to_bytes(quote)?.as_slice())?;
        Ok(())
    }

    pub fn get_quote(&self, id: i64) -> StorageResult<Option<Quote>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(QUOTES_TABLE)?;
        let found = match table.get(id)? {
            Some(guard) => Some(from_bytes(guard.value())?),
            None => None,
        };
        Ok(found)
    }

    // ========== Invoices ==========

    pub fn insert_invoice(&self, txn: &WriteTransaction, invoice: &Invoice) -> StorageResult<()> {
        let mut numbers = txn.open_table(INVOICE_NUMBERS_TABLE)?;
        if numbers.get(invoice.invoice_number.as_str())?.is_some() {
            return Err(StorageError::DuplicateKey(invoice.invoice_number.clone()));
        }
        numbers.insert(invoice.invoice_number.as_str(), invoice.id)?;
        drop(numbers);

        let mut table = txn.open_table(INVOICES_TABLE)?;
        table.insert(invoice.id, to_bytes(invoice)?.as_slice())?;
        Ok(())
    }

    pub fn invoice_txn(&self, txn: &WriteTransaction, id: i64) -> StorageResult<Option<Invoice>> {
        let table = txn.open_table(INVOICES_TABLE)?;
        let found = match table.get(id)? {
            Some(guard) => Some(from_bytes(guard.value())?),
            None => None,
        };
        Ok(found)
    }

    pub fn update_invoice_cas(
        &self,
        txn: &WriteTransaction,
        invoice: &mut Invoice,
        expected_updated_at: i64,
        now_millis: i64,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(INVOICES_TABLE)?;
        let stored_updated_at = match table.get(invoice.id)? {
            Some(guard) => from_bytes::<Invoice>(guard.value())?.updated_at,
            None => return Err(StorageError::NotFound(format!("invoice {}", invoice.id))),
        };
        if stored_updated_at != expected_updated_at {
            return Err(StorageError::StaleWrite {
                entity: "invoice",
                id: invoice.id,
                expected: expected_updated_at,
                found: stored_updated_at,
            });
        }
        invoice.updated_at = now_millis;
        table.insert(invoice.id, to_bytes(invoice)?.as_slice())?;
        Ok(())
    }

    pub fn get_invoice(&self, id: i64) -> StorageResult<Option<Invoice>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(INVOICES_TABLE)?;
        let found = match table.get(id)? {
            Some(guard) => Some(from_bytes(guard.value())?),
            None => None,
        };
        Ok(found)
    }

    // ========== Identifier scans ==========

    /// Highest 4-digit serial among existing numbers with the given
    /// prefix (e.g. `QT2501`). Runs inside the write transaction so a
    /// concurrent allocation cannot interleave.
    pub fn max_serial_for_prefix(
        &self,
        txn: &WriteTransaction,
        index: NumberIndex,
        prefix: &str,
    ) -> StorageResult<Option<u32>> {
        let table = match index {
            NumberIndex::Quote => txn.open_table(QUOTE_NUMBERS_TABLE)?,
            NumberIndex::Invoice => txn.open_table(INVOICE_NUMBERS_TABLE)?,
        };
        let mut max: Option<u32> = None;
        for result in table.range(prefix..)? {
            let (key, _) = result?;
            let number = key.value();
            if !number.starts_with(prefix) {
                break;
            }
            if let Ok(serial) = number[prefix.len()..].parse::<u32>() {
                max = Some(max.map_or(serial, |m| m.max(serial)));
            }
        }
        Ok(max)
    }

    pub fn number_exists(
        &self,
        txn: &WriteTransaction,
        index: NumberIndex,
        number: &str,
    ) -> StorageResult<bool> {
        let table = match index {
            NumberIndex::Quote => txn.open_table(QUOTE_NUMBERS_TABLE)?,
            NumberIndex::Invoice => txn.open_table(INVOICE_NUMBERS_TABLE)?,
        };
        let found = table.get(number)?.is_some();
        Ok(found)
    }

    // ========== Activity log ==========

    /// Increment and return the global activity sequence.
    pub fn next_activity_seq(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        let mut counters = txn.open_table(COUNTERS_TABLE)?;
        let next = counters
            .get(ACTIVITY_SEQ_KEY)?
            .map(|g| g.value())
            .unwrap_or(0)
            + 1;
        counters.insert(ACTIVITY_SEQ_KEY, next)?;
        Ok(next)
    }

    /// Append one activity row. There is deliberately no update or delete
    /// counterpart.
    pub fn append_activity(
        &self,
        txn: &WriteTransaction,
        entry: &ActivityEntry,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVITY_TABLE)?;
        table.insert((entry.booking_id, entry.id), to_bytes(entry)?.as_slice())?;
        Ok(())
    }

    /// Entries for one booking, ordered by creation (sequence ascending).
    pub fn activity_for_booking(&self, booking_id: i64) -> StorageResult<Vec<ActivityEntry>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ACTIVITY_TABLE)?;
        let mut out = Vec::new();
        for result in table.range((booking_id, 0u64)..=(booking_id, u64::MAX))? {
            let (_, value) = result?;
            out.push(from_bytes(value.value())?);
        }
        Ok(out)
    }

    pub fn activity_count(&self, booking_id: i64) -> StorageResult<usize> {
        Ok(self.activity_for_booking(booking_id)?.len())
    }

    // ========== Users, roles, overrides ==========

    pub fn put_user(&self, user: &User) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut usernames = txn.open_table(USERNAMES_TABLE)?;
            if let Some(existing) = usernames.get(user.username.as_str())? {
                if existing.value() != user.id {
                    return Err(StorageError::DuplicateKey(user.username.clone()));
                }
            }
            usernames.insert(user.username.as_str(), user.id)?;
            drop(usernames);

            let mut emails = txn.open_table(USER_EMAILS_TABLE)?;
            if let Some(existing) = emails.get(user.email.as_str())? {
                if existing.value() != user.id {
                    return Err(StorageError::DuplicateKey(user.email.clone()));
                }
            }
            emails.insert(user.email.as_str(), user.id)?;
            drop(emails);

            let mut table = txn.open_table(USERS_TABLE)?;
            table.insert(user.id, to_bytes(user)?.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_user(&self, id: i64) -> StorageResult<Option<User>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(USERS_TABLE)?;
        let found = match table.get(id)? {
            Some(guard) => Some(from_bytes(guard.value())?),
            None => None,
        };
        Ok(found)
    }

    pub fn find_user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        let txn = self.db.begin_read()?;
        let usernames = txn.open_table(USERNAMES_TABLE)?;
        let id = match usernames.get(username)? {
            Some(guard) => guard.value(),
            None => return Ok(None),
        };
        drop(usernames);
        let table = txn.open_table(USERS_TABLE)?;
        let found = match table.get(id)? {
            Some(guard) => Some(from_bytes(guard.value())?),
            None => None,
        };
        Ok(found)
    }

    pub fn put_role_permission(&self, record: &RolePermission) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(ROLE_PERMISSIONS_TABLE)?;
            table.insert(record.role.as_str(), to_bytes(record)?.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_role_permission(&self, role: Role) -> StorageResult<Option<RolePermission>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ROLE_PERMISSIONS_TABLE)?;
        let found = match table.get(role.as_str())? {
            Some(guard) => Some(from_bytes(guard.value())?),
            None => None,
        };
        Ok(found)
    }

    pub fn put_user_permission(&self, record: &UserPermission) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(USER_PERMISSIONS_TABLE)?;
            table.insert(record.user_id, to_bytes(record)?.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_user_permission(&self, user_id: i64) -> StorageResult<Option<UserPermission>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(USER_PERMISSIONS_TABLE)?;
        let found = match table.get(user_id)? {
            Some(guard) => Some(from_bytes(guard.value())?),
            None => None,
        };
        Ok(found)
    }

    pub fn remove_user_permission(&self, user_id: i64) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(USER_PERMISSIONS_TABLE)?;
            table.remove(user_id)?;
        }
        txn.commit()?;
        Ok(())
    }

    // ========== Customers / suppliers ==========

    pub fn put_customer(&self, customer: &Customer) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(CUSTOMERS_TABLE)?;
            table.insert(customer.id, to_bytes(customer)?.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_customer(&self, id: i64) -> StorageResult<Option<Customer>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CUSTOMERS_TABLE)?;
        let found = match table.get(id)? {
            Some(guard) => Some(from_bytes(guard.value())?),
            None => None,
        };
        Ok(found)
    }

    pub fn put_supplier(&self, supplier: &Supplier) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SUPPLIERS_TABLE)?;
            table.insert(supplier.id, to_bytes(supplier)?.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    // ========== Deferred render queue ==========

    pub fn enqueue_render(&self, pending: &PendingRender) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PENDING_RENDERS_TABLE)?;
            table.insert(pending.booking_id, to_bytes(pending)?.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_pending_render(&self, booking_id: i64) -> StorageResult<Option<PendingRender>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(PENDING_RENDERS_TABLE)?;
        let found = match table.get(booking_id)? {
            Some(guard) => Some(from_bytes(guard.value())?),
            None => None,
        };
        Ok(found)
    }

    pub fn list_pending_renders(&self) -> StorageResult<Vec<PendingRender>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(PENDING_RENDERS_TABLE)?;
        let mut out = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            out.push(from_bytes(value.value())?);
        }
        Ok(out)
    }

    pub fn remove_pending_render(&self, booking_id: i64) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PENDING_RENDERS_TABLE)?;
            table.remove(booking_id)?;
        }
        txn.commit()?;
        Ok(())
    }
}

impl std::fmt::Debug for WorkflowStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowStorage").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use shared::models::BookingStatus;

    fn sample_booking(id: i64, reference: &str) -> Booking {
        Booking {
            id,
            booking_reference: reference.to_string(),
            customer_id: 1,
            supplier_id: None,
            created_by_user_id: Some(7),
            quote_id: None,
            invoice_id: None,
            status: BookingStatus::Draft,
            confirmed_at: None,
            quoted_at: None,
            invoiced_at: None,
            paid_at: None,
            vouchered_at: None,
            completed_at: None,
            booking_type: None,
            total_amount: Decimal::from(10_000),
            currency: "THB".into(),
            tax_rate: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            time_limit: 2_000_000,
            departure_date: NaiveDate::from_ymd_opt(2025, 3, 1),
            return_date: NaiveDate::from_ymd_opt(2025, 3, 7),
            quote_number: None,
            quote_status: None,
            invoice_number: None,
            invoice_status: None,
            invoice_amount: None,
            is_paid: false,
            invoice_paid_date: None,
            share_locked_at: None,
            guest_list: vec![],
            products: vec![],
            daily_services: vec![],
            flight_info: None,
            voucher_images: vec![],
            voucher_album_ids: vec![],
            created_at: 1_000,
            updated_at: 1_000,
        }
    }

    #[test]
    fn booking_round_trip_and_reference_index() {
        let storage = WorkflowStorage::open_in_memory().unwrap();
        let booking = sample_booking(1, "BK250101ABCD");

        let txn = storage.begin_write().unwrap();
        storage.insert_booking(&txn, &booking).unwrap();
        txn.commit().unwrap();

        let loaded = storage.get_booking(1).unwrap().unwrap();
        assert_eq!(loaded, booking);
        let by_ref = storage
            .find_booking_by_reference("BK250101ABCD")
            .unwrap()
            .unwrap();
        assert_eq!(by_ref.id, 1);
    }

    #[test]
    fn duplicate_booking_reference_rejected() {
        let storage = WorkflowStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage
            .insert_booking(&txn, &sample_booking(1, "BK250101AAAA"))
            .unwrap();
        let err = storage
            .insert_booking(&txn, &sample_booking(2, "BK250101AAAA"))
            .unwrap_err();
        assert!(matches!(err, StorageError::DuplicateKey(_)));
    }

    #[test]
    fn cas_update_detects_stale_writer() {
        let storage = WorkflowStorage::open_in_memory().unwrap();
        let booking = sample_booking(1, "BK250101ABCE");

        let txn = storage.begin_write().unwrap();
        storage.insert_booking(&txn, &booking).unwrap();
        txn.commit().unwrap();

        // First writer succeeds
        let mut first = storage.get_booking(1).unwrap().unwrap();
        let txn = storage.begin_write().unwrap();
        storage
            .update_booking_cas(&txn, &mut first, 1_000, 2_000)
            .unwrap();
        txn.commit().unwrap();

        // Second writer read the old row and must fail
        let mut second = booking.clone();
        let txn = storage.begin_write().unwrap();
        let err = storage
            .update_booking_cas(&txn, &mut second, 1_000, 3_000)
            .unwrap_err();
        assert!(matches!(err, StorageError::StaleWrite { .. }));
    }

    #[test]
    fn max_serial_scans_only_matching_prefix() {
        let storage = WorkflowStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        {
            let mut table = txn.open_table(QUOTE_NUMBERS_TABLE).unwrap();
            table.insert("QT25010001", 1i64).unwrap();
            table.insert("QT25010007", 2i64).unwrap();
            table.insert("QT25020003", 3i64).unwrap();
        }
        assert_eq!(
            storage
                .max_serial_for_prefix(&txn, NumberIndex::Quote, "QT2501")
                .unwrap(),
            Some(7)
        );
        assert_eq!(
            storage
                .max_serial_for_prefix(&txn, NumberIndex::Quote, "QT2502")
                .unwrap(),
            Some(3)
        );
        assert_eq!(
            storage
                .max_serial_for_prefix(&txn, NumberIndex::Quote, "QT2503")
                .unwrap(),
            None
        );
    }

    #[test]
    fn activity_is_ordered_per_booking() {
        let storage = WorkflowStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        for (i, booking_id) in [(1u64, 5i64), (2, 9), (3, 5)] {
            let entry = ActivityEntry {
                id: i,
                booking_id,
                user_id: None,
                action: shared::models::ActivityAction::BookingCreated,
                description: format!("entry {i}"),
                old_value: None,
                new_value: None,
                ip_address: None,
                user_agent: None,
                created_at: i as i64,
            };
            storage.append_activity(&txn, &entry).unwrap();
        }
        txn.commit().unwrap();

        let entries = storage.activity_for_booking(5).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, 1);
        assert_eq!(entries[1].id, 3);
        assert_eq!(storage.activity_count(9).unwrap(), 1);
    }
}
