//! Identifier allocation
//!
//! Three identifier streams, all derived from the business-timezone
//! calendar:
//!
//! - quote numbers: `QT` + YYMM + 4-digit serial, monotonic per month
//! - invoice numbers: `INV` + YYMM + 4-digit serial, monotonic per month
//! - booking references: `BK` + YYMMDD + 4 random base-36 chars
//!
//! Serials are allocated by scanning the unique-number index inside the
//! caller's write transaction, so concurrent allocations serialize on the
//! transaction and can never produce duplicates. A month holds at most
//! 9999 documents per stream; the 10000th allocation fails with
//! [`WorkflowError::AllocationExhausted`].

use chrono_tz::Tz;
use redb::WriteTransaction;
use shared::util::random_base36;

use crate::utils::time::{period_yymm, period_yymmdd};
use crate::workflow::error::{WorkflowError, WorkflowResult};
use crate::workflow::storage::{NumberIndex, WorkflowStorage};

const MAX_SERIAL: u32 = 9999;

/// Collision retries for the random booking-reference suffix.
const REFERENCE_ATTEMPTS: u32 = 16;

/// Next quote number for the current period, e.g. `QT25010042`.
pub fn next_quote_number(
    storage: &WorkflowStorage,
    txn: &WriteTransaction,
    now_millis: i64,
    tz: Tz,
) -> WorkflowResult<String> {
    next_number(storage, txn, NumberIndex::Quote, "QT", now_millis, tz)
}

/// Next invoice number for the current period, e.g. `INV25010042`.
pub fn next_invoice_number(
    storage: &WorkflowStorage,
    txn: &WriteTransaction,
    now_millis: i64,
    tz: Tz,
) -> WorkflowResult<String> {
    next_number(storage, txn, NumberIndex::Invoice, "INV", now_millis, tz)
}

fn next_number(
    storage: &WorkflowStorage,
    txn: &WriteTransaction,
    index: NumberIndex,
    stream: &str,
    now_millis: i64,
    tz: Tz,
) -> WorkflowResult<String> {
    let prefix = format!("{stream}{}", period_yymm(now_millis, tz));
    let serial = storage
        .max_serial_for_prefix(txn, index, &prefix)?
        .unwrap_or(0)
        + 1;
    if serial > MAX_SERIAL {
        return Err(WorkflowError::AllocationExhausted(prefix));
    }
    Ok(format!("{prefix}{serial:04}"))
}

/// Fresh booking reference, e.g. `BK250131X7Q2`. Regenerates the random
/// suffix on collision; exhausting all attempts would take a day with
/// more bookings than base-36^4 allows and is treated as allocation
/// exhaustion.
pub fn next_booking_reference(
    storage: &WorkflowStorage,
    txn: &WriteTransaction,
    now_millis: i64,
    tz: Tz,
) -> WorkflowResult<String> {
    let prefix = format!("BK{}", period_yymmdd(now_millis, tz));
    for _ in 0..REFERENCE_ATTEMPTS {
        let candidate = format!("{prefix}{}", random_base36(4));
        if !storage.booking_reference_exists(txn, &candidate)? {
            return Ok(candidate);
        }
    }
    Err(WorkflowError::AllocationExhausted(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn jan_2025_millis() -> i64 {
        chrono::Utc
            .with_ymd_and_hms(2025, 1, 15, 8, 0, 0)
            .unwrap()
            .timestamp_millis()
    }

    #[test]
    fn quote_numbers_are_monotonic_within_period() {
        let storage = WorkflowStorage::open_in_memory().unwrap();
        let tz = chrono_tz::Asia::Bangkok;
        let now = jan_2025_millis();

        let txn = storage.begin_write().unwrap();
        let first = next_quote_number(&storage, &txn, now, tz).unwrap();
        assert_eq!(first, "QT25010001");

        // Simulate the allocation being taken
        let mut quote = crate::workflow::engine::tests_support::sample_quote(1, 1, &first);
        storage.insert_quote(&txn, &quote).unwrap();
        let second = next_quote_number(&storage, &txn, now, tz).unwrap();
        assert_eq!(second, "QT25010002");

        // A new month restarts the serial
        quote.id = 2;
        quote.quote_number = second.clone();
        storage.insert_quote(&txn, &quote).unwrap();
        let feb = chrono::Utc
            .with_ymd_and_hms(2025, 2, 3, 8, 0, 0)
            .unwrap()
            .timestamp_millis();
        assert_eq!(
            next_quote_number(&storage, &txn, feb, tz).unwrap(),
            "QT25020001"
        );
    }

    #[test]
    fn serial_space_exhausts_at_9999() {
        let storage = WorkflowStorage::open_in_memory().unwrap();
        let tz = chrono_tz::Asia::Bangkok;
        let now = jan_2025_millis();

        let txn = storage.begin_write().unwrap();
        let quote =
            crate::workflow::engine::tests_support::sample_quote(1, 1, "QT25019999");
        storage.insert_quote(&txn, &quote).unwrap();

        let err = next_quote_number(&storage, &txn, now, tz).unwrap_err();
        assert!(matches!(err, WorkflowError::AllocationExhausted(p) if p == "QT2501"));
    }

    #[test]
    fn invoice_stream_is_independent() {
        let storage = WorkflowStorage::open_in_memory().unwrap();
        let tz = chrono_tz::Asia::Bangkok;
        let now = jan_2025_millis();

        let txn = storage.begin_write().unwrap();
        let quote =
            crate::workflow::engine::tests_support::sample_quote(1, 1, "QT25010005");
        storage.insert_quote(&txn, &quote).unwrap();

        assert_eq!(
            next_invoice_number(&storage, &txn, now, tz).unwrap(),
            "INV25010001"
        );
    }

    #[test]
    fn booking_reference_has_expected_shape() {
        let storage = WorkflowStorage::open_in_memory().unwrap();
        let tz = chrono_tz::Asia::Bangkok;
        let now = jan_2025_millis();

        let txn = storage.begin_write().unwrap();
        let reference = next_booking_reference(&storage, &txn, now, tz).unwrap();
        assert_eq!(reference.len(), 2 + 6 + 4);
        assert!(reference.starts_with("BK250115"));
        assert!(reference[8..]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }
}
