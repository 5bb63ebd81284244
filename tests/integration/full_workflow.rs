//! Integration test: full end-to-end workflow.
//!
//! Tests the complete lifecycle:
//! 1. Mint passports
//! 2. Register an event with a designated signer
//! 3. Sign a claim off-ledger and ship it as a link
//! 4. Redeem the claim for a stamp
//! 5. Reject replays, duplicates, and transfers
//! 6. Persist and restore the ledger

use std::sync::Arc;

use stampbook::storage::LedgerFile;
use stampbook::{
    ClaimPayload, EventDraft, EventId, IdentityId, ManualClock, Nonce, SignerKeyPair, StampId,
    Stampbook, StampbookConfig, StampbookError,
};

const T0: u64 = 1_700_000_000;

fn ledger() -> (Stampbook, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(T0));
    let book = Stampbook::with_clock(StampbookConfig::default(), clock.clone());
    (book, clock)
}

#[test]
fn full_workflow_mint_to_stamp() {
    let (book, clock) = ledger();
    let context = book.config().context_id;

    // ── Step 1: A mints identity #1 ─────────────────────────────────────
    let a = SignerKeyPair::generate();
    let b = SignerKeyPair::generate();
    let passport = book.mint_passport(a.principal()).unwrap();
    assert_eq!(passport, IdentityId(1));
    assert_eq!(book.owner_of(passport), Some(a.principal()));

    // ── Step 2: B registers event #1 with signer = B ────────────────────
    let event = book
        .create_event(
            b.principal(),
            EventDraft::new("RustConf", "Annual gathering", "", b.principal()),
        )
        .unwrap();
    assert_eq!(event, EventId(1));

    // ── Step 3: B signs (1, 0x00…01, now+3600, context) ─────────────────
    let payload = ClaimPayload::sign(&b, event, Nonce::from_u64(1), T0 + 3600, context);
    assert_eq!(
        payload.nonce.to_string(),
        format!("0x{}01", "0".repeat(62))
    );
    let link = payload.to_link("https://stamps.example").unwrap();

    // ── Step 4: A claims with the scanned link ──────────────────────────
    clock.advance(60);
    let scanned = ClaimPayload::from_link(&link).unwrap();
    let stamp = book.claim_payload(a.principal(), passport, &scanned).unwrap();
    assert_eq!(stamp, StampId(1));
    assert!(book.has_stamp(IdentityId(1), EventId(1)));
    assert_eq!(book.list_stamps(a.principal()), vec![StampId(1)]);

    let record = book.get_stamp(stamp).unwrap();
    assert_eq!(record.owner, a.principal());
    assert_eq!(record.claimed_at, T0 + 60);

    // ── Step 5: replay, duplicate, transfer ─────────────────────────────
    let replay = book.claim_payload(a.principal(), passport, &scanned);
    assert!(matches!(replay, Err(StampbookError::NonceReused(_))));

    let second = ClaimPayload::sign(&b, event, Nonce::from_u64(2), T0 + 3600, context);
    let duplicate = book.claim_payload(a.principal(), passport, &second);
    assert!(matches!(duplicate, Err(StampbookError::AlreadyClaimed { .. })));
    assert!(!book.is_nonce_used(&Nonce::from_u64(2)));

    assert!(matches!(
        book.transfer_stamp(a.principal(), stamp, b.principal()),
        Err(StampbookError::NonTransferable(_))
    ));
    assert!(matches!(
        book.transfer_identity(a.principal(), passport, b.principal()),
        Err(StampbookError::NonTransferable(_))
    ));
    assert_eq!(book.owner_of(passport), Some(a.principal()));
    assert_eq!(book.total_stamps(), 1);

    // ── Step 6: persist and restore ─────────────────────────────────────
    let dir = tempfile::tempdir().unwrap();
    let file = LedgerFile::new(dir.path().join("ledger.json"));
    file.save(&book.snapshot()).unwrap();

    let restored = Stampbook::from_snapshot(
        StampbookConfig::default(),
        Arc::new(ManualClock::new(T0 + 120)),
        file.load().unwrap(),
    )
    .unwrap();
    assert!(restored.has_stamp(passport, event));
    assert!(matches!(
        restored.claim_payload(a.principal(), passport, &scanned),
        Err(StampbookError::NonceReused(_))
    ));
    // Cooldown survives the restart.
    assert!(!restored.can_create_event(b.principal()));
}

#[test]
fn rate_limit_window() {
    let clock = Arc::new(ManualClock::new(0));
    let book = Stampbook::with_clock(StampbookConfig::default(), clock.clone());
    let organizer = SignerKeyPair::generate().principal();
    let draft = |name: &str| EventDraft::new(name, "", "", organizer);

    assert!(book.can_create_event(organizer));
    book.create_event(organizer, draft("first")).unwrap();

    clock.set(1800);
    match book.create_event(organizer, draft("second")) {
        Err(StampbookError::RateLimited { retry_after_secs }) => {
            assert_eq!(retry_after_secs, 1800)
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
    assert_eq!(book.event_cooldown_remaining(organizer), 1800);
    assert_eq!(book.total_events(), 1);

    clock.set(3601);
    assert_eq!(book.event_cooldown_remaining(organizer), 0);
    assert_eq!(book.create_event(organizer, draft("second")).unwrap(), EventId(2));
}

#[test]
fn expiration_window() {
    let (book, clock) = ledger();
    let context = book.config().context_id;
    let holder = SignerKeyPair::generate().principal();
    let signer = SignerKeyPair::generate();
    let passport = book.mint_passport(holder).unwrap();
    let event = book
        .create_event(holder, EventDraft::new("expo", "", "", signer.principal()))
        .unwrap();

    let stale = ClaimPayload::sign(&signer, event, Nonce::from_u64(1), T0 - 1, context);
    match book.claim_payload(holder, passport, &stale) {
        Err(StampbookError::Expired {
            expired_for_secs, ..
        }) => assert_eq!(expired_for_secs, 1),
        other => panic!("expected Expired, got {other:?}"),
    }
    assert!(!book.is_nonce_used(&Nonce::from_u64(1)));

    let fresh = ClaimPayload::sign(&signer, event, Nonce::from_u64(2), T0 + 3600, context);
    clock.set(T0 + 3600);
    book.claim_payload(holder, passport, &fresh).unwrap();
}

#[test]
fn many_holders_one_event() {
    let (book, _clock) = ledger();
    let context = book.config().context_id;
    let signer = SignerKeyPair::generate();
    let organizer = SignerKeyPair::generate().principal();
    let event = book
        .create_event(organizer, EventDraft::new("meetup", "", "", signer.principal()))
        .unwrap();

    for i in 0..20u64 {
        let holder = SignerKeyPair::generate().principal();
        let passport = book.mint_passport(holder).unwrap();
        let payload = ClaimPayload::sign(&signer, event, Nonce::from_u64(i), T0 + 10, context);
        let stamp = book.claim_payload(holder, passport, &payload).unwrap();
        assert_eq!(stamp, StampId(i + 1));
    }
    assert_eq!(book.total_identities(), 20);
    assert_eq!(book.total_stamps(), 20);
}
