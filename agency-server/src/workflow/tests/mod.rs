use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::models::{
    BookingStatus, NewBooking, PaymentInput, ProductLine, Role, User,
};

use crate::auth::evaluator::seed_default_role_permissions;
use crate::config::Config;
use crate::render::{ArtifactHandle, DocumentRenderer, DocumentSnapshot, RenderError};
use crate::utils::time::FixedClock;
use crate::workflow::context::Actor;
use crate::workflow::engine::tests_support::NOW_MILLIS;
use crate::workflow::engine::WorkflowEngine;
use crate::workflow::error::WorkflowError;
use crate::workflow::storage::WorkflowStorage;

mod test_flows;

/// Renderer stub: counts calls and fails on demand.
struct StubRenderer {
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl StubRenderer {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        })
    }

    fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DocumentRenderer for StubRenderer {
    fn render(&self, snapshot: &DocumentSnapshot) -> Result<ArtifactHandle, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(RenderError::Unavailable("stub offline".into()));
        }
        Ok(ArtifactHandle {
            path: format!("/tmp/{}", crate::render::artifact_file_name(&snapshot.request)).into(),
            rendered_at: 0,
        })
    }
}

fn test_config() -> Config {
    Config {
        work_dir: ".".into(),
        timezone: chrono_tz::Asia::Bangkok,
        share_token_secret: "workflow-test-secret".into(),
        share_token_ttl_days: 120,
        public_base_url: "http://127.0.0.1:5002".into(),
        artifact_max_age_hours: 24,
        request_timeout_ms: 30_000,
    }
}

struct TestHarness {
    engine: WorkflowEngine,
    storage: WorkflowStorage,
    clock: Arc<FixedClock>,
    renderer: Arc<StubRenderer>,
}

fn make_user(id: i64, username: &str, role: Role) -> User {
    User {
        id,
        username: username.to_string(),
        email: format!("{username}@agency.test"),
        password_hash: "x".into(),
        role,
        is_2fa_enabled: false,
        totp_secret: None,
        backup_codes: vec![],
        assigned_counter: None,
        is_active: true,
    }
}

/// Engine with in-memory storage, fixed clock at 2025-01-15T08:00:00Z,
/// default role maps and three seeded users.
fn harness() -> TestHarness {
    let storage = WorkflowStorage::open_in_memory().unwrap();
    seed_default_role_permissions(&storage).unwrap();
    for (id, name, role) in [
        (1, "admin", Role::Administrator),
        (2, "manager", Role::Manager),
        (3, "staff", Role::Staff),
    ] {
        storage.put_user(&make_user(id, name, role)).unwrap();
    }

    let clock = Arc::new(FixedClock::new(NOW_MILLIS));
    let renderer = StubRenderer::new();
    let engine = WorkflowEngine::new(
        storage.clone(),
        renderer.clone(),
        clock.clone(),
        &test_config(),
    );
    TestHarness {
        engine,
        storage,
        clock,
        renderer,
    }
}

fn admin() -> Actor {
    Actor::of_user(make_user(1, "admin", Role::Administrator))
}

fn manager() -> Actor {
    Actor::of_user(make_user(2, "manager", Role::Manager))
}

fn staff() -> Actor {
    Actor::of_user(make_user(3, "staff", Role::Staff))
}

fn booking_input(total: i64) -> NewBooking {
    NewBooking {
        customer_id: 10,
        supplier_id: None,
        booking_type: Some("package".into()),
        currency: None,
        tax_rate: None,
        discount_amount: None,
        time_limit: NOW_MILLIS + 86_400_000,
        departure_date: NaiveDate::from_ymd_opt(2025, 3, 1),
        return_date: NaiveDate::from_ymd_opt(2025, 3, 7),
        guest_list: vec![],
        products: vec![ProductLine {
            name: "Package".into(),
            quantity: 1,
            unit_price: Decimal::from(total),
        }],
        daily_services: vec![],
    }
}

fn payment(amount: i64) -> PaymentInput {
    PaymentInput {
        amount: Decimal::from(amount),
        payment_method: "bank".into(),
        reference: Some("ref1".into()),
        payment_date: NaiveDate::from_ymd_opt(2025, 1, 20).unwrap(),
        notes: None,
    }
}

/// Walk a fresh booking up to `target` and return its id.
fn advance_to(h: &TestHarness, actor: &Actor, target: BookingStatus) -> i64 {
    let booking = h
        .engine
        .create_booking(actor, booking_input(10_000))
        .unwrap()
        .booking;
    let id = booking.id;
    if target == BookingStatus::Draft {
        return id;
    }
    h.engine.confirm(actor, id).unwrap();
    if target == BookingStatus::Confirmed {
        return id;
    }
    h.engine.quote(actor, id).unwrap();
    if target == BookingStatus::Quoted {
        return id;
    }
    let invoice_id = h
        .engine
        .apply_invoice(actor, id)
        .unwrap()
        .invoice
        .unwrap()
        .id;
    if target == BookingStatus::Invoiced {
        return id;
    }
    h.engine.add_payment(actor, invoice_id, payment(10_000)).unwrap();
    if target == BookingStatus::Paid {
        return id;
    }
    h.engine.voucher(actor, id).unwrap();
    assert_eq!(target, BookingStatus::Vouchered);
    id
}

/// Cross-entity invariants that must hold after every operation.
fn assert_invariants(h: &TestHarness, booking_id: i64) {
    let booking = h.engine.booking(booking_id).unwrap();

    if booking.status.has_reached(BookingStatus::Quoted) {
        let quote_id = booking.quote_id.expect("quoted booking must link a quote");
        let quote = h.engine.quote_document(quote_id).unwrap();
        assert_eq!(quote.booking_id, booking.id);
        assert_eq!(booking.quote_number.as_deref(), Some(quote.quote_number.as_str()));
    }

    if let Some(invoice_id) = booking.invoice_id {
        let invoice = h.engine.invoice_document(invoice_id).unwrap();
        assert_eq!(invoice.balance_due, invoice.total_amount - invoice.paid_amount);
        assert_eq!(
            invoice.payment_status == shared::models::PaymentStatus::Paid,
            invoice.paid_amount >= invoice.total_amount
        );
        assert_eq!(booking.is_paid, invoice.is_fully_paid());
    } else {
        assert!(!booking.is_paid);
    }
}
