use super::*;
use crate::utils::time::Clock;
use shared::models::{ActivityAction, InvoiceStatus, PaymentStatus, QuoteStatus};

// ------------------------------------------------------------------------
// Full lifecycle: create → confirm → quote → send → accept → invoice →
// pay → voucher → complete
// ------------------------------------------------------------------------
#[test]
fn happy_path_runs_the_full_state_machine() {
    let h = harness();
    let actor = admin();

    // 1. Create
    let booking = h
        .engine
        .create_booking(&actor, booking_input(10_000))
        .unwrap()
        .booking;
    let id = booking.id;
    assert_eq!(booking.status, BookingStatus::Draft);
    assert!(booking.booking_reference.starts_with("BK250115"));
    assert_eq!(booking.booking_reference.len(), 12);

    // 2. Confirm
    let booking = h.engine.confirm(&actor, id).unwrap().booking;
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_invariants(&h, id);

    // 3. Quote
    let outcome = h.engine.quote(&actor, id).unwrap();
    let quote = outcome.quote.unwrap();
    assert_eq!(quote.quote_number, "QT25010001");
    assert_eq!(outcome.booking.status, BookingStatus::Quoted);
    assert_eq!(outcome.booking.quote_status, Some(QuoteStatus::Draft));
    assert_invariants(&h, id);

    // 4. Send and accept
    let outcome = h.engine.send_quote(&actor, id).unwrap();
    let sent = outcome.quote.unwrap();
    assert_eq!(sent.status, QuoteStatus::Sent);
    assert!(sent.is_public);
    assert!(sent.share_token.is_some());

    let accepted = h.engine.accept_quote(&actor, id).unwrap().quote.unwrap();
    assert_eq!(accepted.status, QuoteStatus::Accepted);

    // 5. Invoice
    let outcome = h.engine.apply_invoice(&actor, id).unwrap();
    let invoice = outcome.invoice.unwrap();
    assert_eq!(invoice.invoice_number, "INV25010001");
    assert_eq!(outcome.booking.status, BookingStatus::Invoiced);
    assert_eq!(outcome.quote.unwrap().status, QuoteStatus::Converted);
    assert_invariants(&h, id);

    // 6. Full payment
    let outcome = h.engine.add_payment(&actor, invoice.id, payment(10_000)).unwrap();
    assert_eq!(outcome.booking.status, BookingStatus::Paid);
    assert!(outcome.booking.is_paid);
    assert_eq!(
        outcome.booking.invoice_status,
        Some(InvoiceStatus::Paid)
    );
    assert_invariants(&h, id);

    // 7. Voucher
    let booking = h.engine.voucher(&actor, id).unwrap().booking;
    assert_eq!(booking.status, BookingStatus::Vouchered);

    // 8. Complete once the trip is over (clock jumps past the return date)
    h.clock.advance_secs(90 * 24 * 3600);
    let booking = h.engine.complete(&actor, id).unwrap().booking;
    assert_eq!(booking.status, BookingStatus::Completed);
    assert_invariants(&h, id);

    // One activity entry per effective transition, in order
    let actions: Vec<ActivityAction> = h
        .engine
        .activity(id)
        .unwrap()
        .iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(
        actions,
        vec![
            ActivityAction::BookingCreated,
            ActivityAction::BookingConfirmed,
            ActivityAction::QuoteCreated,
            ActivityAction::QuoteSent,
            ActivityAction::QuoteAccepted,
            ActivityAction::InvoiceCreated,
            ActivityAction::PaymentAdded,
            ActivityAction::VoucherIssued,
            ActivityAction::BookingCompleted,
        ]
    );
}

// ------------------------------------------------------------------------
// Partial payments accumulate; only the clearing payment advances
// ------------------------------------------------------------------------
#[test]
fn partial_then_final_payment() {
    let h = harness();
    let actor = admin();
    let id = advance_to(&h, &actor, BookingStatus::Invoiced);
    let invoice_id = h.engine.booking(id).unwrap().invoice_id.unwrap();

    let outcome = h.engine.add_payment(&actor, invoice_id, payment(4_000)).unwrap();
    let invoice = outcome.invoice.unwrap();
    assert_eq!(invoice.payment_status, PaymentStatus::Partial);
    assert_eq!(invoice.balance_due, Decimal::from(6_000));
    assert_eq!(outcome.booking.status, BookingStatus::Invoiced);
    assert_invariants(&h, id);

    let outcome = h.engine.add_payment(&actor, invoice_id, payment(6_000)).unwrap();
    assert_eq!(outcome.invoice.unwrap().payment_status, PaymentStatus::Paid);
    assert_eq!(outcome.booking.status, BookingStatus::Paid);
    assert_invariants(&h, id);
}

// ------------------------------------------------------------------------
// One-shot mark-paid from quoted (Manager role)
// ------------------------------------------------------------------------
#[test]
fn manager_marks_quoted_booking_paid_in_one_shot() {
    let h = harness();
    let actor = manager();
    let id = advance_to(&h, &actor, BookingStatus::Quoted);

    let outcome = h
        .engine
        .mark_paid(
            &actor,
            id,
            "bank transfer".into(),
            NaiveDate::from_ymd_opt(2025, 1, 16).unwrap(),
            Some("KBANK-1".into()),
        )
        .unwrap();

    let invoice = outcome.invoice.unwrap();
    assert!(invoice.invoice_number.starts_with("INV2501"));
    assert!(invoice.is_fully_paid());
    assert_eq!(outcome.booking.status, BookingStatus::Paid);
    assert_eq!(outcome.booking.quote_status, Some(QuoteStatus::Converted));
    assert_invariants(&h, id);

    let actions: Vec<ActivityAction> = h
        .engine
        .activity(id)
        .unwrap()
        .iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(actions.last(), Some(&ActivityAction::MarkedPaid));
}

// ------------------------------------------------------------------------
// Staff lacks the mark-paid role even with financial.edit granted
// ------------------------------------------------------------------------
#[test]
fn staff_cannot_mark_paid() {
    let h = harness();
    let id = advance_to(&h, &admin(), BookingStatus::Quoted);
    let before = h.engine.activity(id).unwrap().len();

    let err = h
        .engine
        .mark_paid(
            &staff(),
            id,
            "cash".into(),
            NaiveDate::from_ymd_opt(2025, 1, 16).unwrap(),
            None,
        )
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Forbidden(_)));

    // Nothing mutated, nothing logged
    let booking = h.engine.booking(id).unwrap();
    assert_eq!(booking.status, BookingStatus::Quoted);
    assert!(booking.invoice_id.is_none());
    assert_eq!(h.engine.activity(id).unwrap().len(), before);
}

// ------------------------------------------------------------------------
// Permission refusal leaves no trace
// ------------------------------------------------------------------------
#[test]
fn forbidden_payment_mutates_and_logs_nothing() {
    let h = harness();
    let id = advance_to(&h, &admin(), BookingStatus::Invoiced);
    let invoice_id = h.engine.booking(id).unwrap().invoice_id.unwrap();
    let before = h.engine.activity(id).unwrap().len();

    // Staff has no financial.edit
    let err = h
        .engine
        .add_payment(&staff(), invoice_id, payment(1_000))
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Forbidden(_)));

    let invoice = h.engine.invoice_document(invoice_id).unwrap();
    assert!(invoice.payments.is_empty());
    assert_eq!(h.engine.activity(id).unwrap().len(), before);
}

// ------------------------------------------------------------------------
// Idempotent transitions succeed silently
// ------------------------------------------------------------------------
#[test]
fn repeated_quote_allocates_nothing_and_logs_nothing() {
    let h = harness();
    let actor = admin();
    let id = advance_to(&h, &actor, BookingStatus::Quoted);
    let first_number = h.engine.booking(id).unwrap().quote_number.unwrap();
    let log_before = h.engine.activity(id).unwrap().len();
    let renders_before = h.renderer.calls();

    let outcome = h.engine.quote(&actor, id).unwrap();
    assert!(outcome.is_no_op());
    assert_eq!(outcome.quote.unwrap().quote_number, first_number);
    assert_eq!(h.engine.activity(id).unwrap().len(), log_before);
    // No fresh artifact for a no-op
    assert_eq!(h.renderer.calls(), renders_before);

    // The serial was not consumed: the next booking still gets 0002
    let other = advance_to(&h, &actor, BookingStatus::Quoted);
    assert_eq!(
        h.engine.booking(other).unwrap().quote_number.as_deref(),
        Some("QT25010002")
    );
}

// ------------------------------------------------------------------------
// Expired time limit: confirm refused, cancel still possible
// ------------------------------------------------------------------------
#[test]
fn expired_draft_refuses_confirm_but_cancels() {
    let h = harness();
    let actor = admin();
    let mut input = booking_input(10_000);
    input.time_limit = NOW_MILLIS + 1_000;
    let id = h.engine.create_booking(&actor, input).unwrap().booking.id;

    h.clock.advance_secs(60);
    let err = h.engine.confirm(&actor, id).unwrap_err();
    assert!(matches!(err, WorkflowError::TimeLimitElapsed));

    let booking = h.engine.cancel(&actor, id).unwrap().booking;
    assert_eq!(booking.status, BookingStatus::Cancelled);
}

// ------------------------------------------------------------------------
// Auto-completion sweep
// ------------------------------------------------------------------------
#[test]
fn complete_due_sweeps_only_finished_trips() {
    let h = harness();
    let actor = admin();
    let due = advance_to(&h, &actor, BookingStatus::Vouchered);
    let not_due = advance_to(&h, &actor, BookingStatus::Vouchered);
    let unpaid = advance_to(&h, &actor, BookingStatus::Invoiced);

    // Push only the first booking's trip into the past
    h.clock.advance_secs(60 * 24 * 3600);
    {
        let txn = h.storage.begin_write().unwrap();
        let mut b = h.storage.booking_txn(&txn, not_due).unwrap().unwrap();
        let expected = b.updated_at;
        b.return_date = NaiveDate::from_ymd_opt(2025, 12, 31);
        h.storage
            .update_booking_cas(&txn, &mut b, expected, h.clock.now_millis())
            .unwrap();
        txn.commit().unwrap();
    }

    assert_eq!(h.engine.complete_due().unwrap(), 1);
    assert_eq!(h.engine.booking(due).unwrap().status, BookingStatus::Completed);
    assert_eq!(
        h.engine.booking(not_due).unwrap().status,
        BookingStatus::Vouchered
    );
    assert_eq!(
        h.engine.booking(unpaid).unwrap().status,
        BookingStatus::Invoiced
    );

    // The sweep logs as the system actor
    let entry = h.engine.activity(due).unwrap().into_iter().last().unwrap();
    assert_eq!(entry.action, ActivityAction::BookingCompleted);
    assert_eq!(entry.user_id, None);
}
