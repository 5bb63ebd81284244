//! Edge-case tests: signature binding, boundaries, re-entrance, and
//! malformed payloads.

use std::sync::{Arc, Mutex, OnceLock};

use stampbook::crypto::{claim_digest, Ed25519Recovery, SignerRecovery};
use stampbook::{
    ClaimPayload, ClaimRequest, ClaimSignature, ClaimStage, EventDraft, EventId, IdentityId,
    IdentityMode, LedgerEvent, ManualClock, Nonce, Principal, SignerKeyPair, Stampbook,
    StampbookConfig, StampbookError,
};

const NOW: u64 = 50_000;
const CONTEXT: u64 = 8453;

struct World {
    book: Stampbook,
    holder: Principal,
    passport: IdentityId,
    signer: SignerKeyPair,
    event: EventId,
}

fn world_with(book: Stampbook) -> World {
    let holder = SignerKeyPair::generate().principal();
    let signer = SignerKeyPair::generate();
    let passport = book.mint_passport(holder).unwrap();
    let event = book
        .create_event(holder, EventDraft::new("edge", "", "", signer.principal()))
        .unwrap();
    World {
        book,
        holder,
        passport,
        signer,
        event,
    }
}

fn world() -> World {
    let config = StampbookConfig::default().with_context_id(CONTEXT);
    world_with(Stampbook::with_clock(config, Arc::new(ManualClock::new(NOW))))
}

fn request(w: &World, event: EventId, nonce: Nonce, expiration: u64) -> ClaimRequest {
    ClaimPayload::sign(&w.signer, event, nonce, expiration, CONTEXT).to_request(w.passport)
}

fn assert_invalid_signature(result: stampbook::Result<stampbook::StampId>) {
    assert!(
        matches!(result, Err(StampbookError::InvalidSignature { .. })),
        "expected InvalidSignature, got {result:?}"
    );
}

// ── Signature binding ────────────────────────────────────────────────────────

#[test]
fn edge_altered_nonce_fails() {
    let w = world();
    let mut req = request(&w, w.event, Nonce::from_u64(1), NOW + 10);
    req.nonce = Nonce::from_u64(2);
    assert_invalid_signature(w.book.claim_stamp(w.holder, &req));
}

#[test]
fn edge_altered_expiration_fails() {
    let w = world();
    let mut req = request(&w, w.event, Nonce::from_u64(1), NOW + 10);
    req.expiration = NOW + 11;
    assert_invalid_signature(w.book.claim_stamp(w.holder, &req));
}

#[test]
fn edge_altered_event_fails() {
    // A second event with the same signer.
    let book = Stampbook::with_clock(
        StampbookConfig::default()
            .with_context_id(CONTEXT)
            .with_event_cooldown(0),
        Arc::new(ManualClock::new(NOW)),
    );
    let w = world_with(book);
    let other = w
        .book
        .create_event(w.holder, EventDraft::new("other", "", "", w.signer.principal()))
        .unwrap();
    let mut req = request(&w, w.event, Nonce::from_u64(1), NOW + 10);
    req.event_id = other;
    assert_invalid_signature(w.book.claim_stamp(w.holder, &req));
}

#[test]
fn edge_foreign_context_fails() {
    let w = world();
    let payload = ClaimPayload::sign(&w.signer, w.event, Nonce::from_u64(1), NOW + 10, CONTEXT + 1);
    assert_invalid_signature(w.book.claim_payload(w.holder, w.passport, &payload));

    // Relabelling the payload does not help; the ledger's context is used.
    let mut relabelled = payload.clone();
    relabelled.context_id = CONTEXT;
    assert_invalid_signature(w.book.claim_payload(w.holder, w.passport, &relabelled));
}

#[test]
fn edge_invalid_signature_reports_both_signers() {
    let w = world();
    let impostor = SignerKeyPair::generate();
    let payload = ClaimPayload::sign(&impostor, w.event, Nonce::from_u64(1), NOW + 10, CONTEXT);
    match w.book.claim_payload(w.holder, w.passport, &payload) {
        Err(StampbookError::InvalidSignature {
            expected,
            recovered,
        }) => {
            assert_eq!(expected, w.signer.principal());
            assert_eq!(recovered, Some(impostor.principal()));
        }
        other => panic!("expected InvalidSignature, got {other:?}"),
    }
}

#[test]
fn edge_truncated_signature_fails() {
    let w = world();
    let mut req = request(&w, w.event, Nonce::from_u64(1), NOW + 10);
    req.signature = ClaimSignature::from_bytes(req.signature.as_bytes()[..64].to_vec());
    assert_invalid_signature(w.book.claim_stamp(w.holder, &req));
}

// ── Boundaries ───────────────────────────────────────────────────────────────

#[test]
fn edge_expiration_equal_to_now_is_valid() {
    let w = world();
    let req = request(&w, w.event, Nonce::from_u64(1), NOW);
    w.book.claim_stamp(w.holder, &req).unwrap();
}

#[test]
fn edge_expiration_zero() {
    let w = world();
    let req = request(&w, w.event, Nonce::from_u64(1), 0);
    assert!(matches!(
        w.book.claim_stamp(w.holder, &req),
        Err(StampbookError::Expired {
            expired_for_secs: NOW,
            ..
        })
    ));
}

#[test]
fn edge_zero_nonce_is_an_ordinary_nonce() {
    let w = world();
    let zero = Nonce::from_bytes([0u8; 32]);
    w.book
        .claim_stamp(w.holder, &request(&w, w.event, zero, NOW + 1))
        .unwrap();
    assert!(w.book.is_nonce_used(&zero));
}

#[test]
fn edge_unknown_event_and_identity() {
    let w = world();
    let req = request(&w, EventId(99), Nonce::from_u64(1), NOW + 1);
    assert!(matches!(
        w.book.claim_stamp(w.holder, &req),
        Err(StampbookError::EventNotFound(EventId(99)))
    ));

    let mut req = request(&w, w.event, Nonce::from_u64(1), NOW + 1);
    req.identity_id = IdentityId(0);
    assert!(matches!(
        w.book.claim_stamp(w.holder, &req),
        Err(StampbookError::NotOwner { .. })
    ));
}

#[test]
fn edge_event_draft_limits() {
    let book = Stampbook::new(StampbookConfig::default().with_event_cooldown(0));
    let creator = SignerKeyPair::generate().principal();

    let name_100 = "é".repeat(100);
    book.create_event(creator, EventDraft::new(name_100, "", "", creator))
        .unwrap();

    for draft in [
        EventDraft::new("", "", "", creator),
        EventDraft::new("x".repeat(101), "", "", creator),
        EventDraft::new("ok", "d".repeat(501), "", creator),
        EventDraft::new("ok", "", "", Principal::ZERO),
    ] {
        assert!(matches!(
            book.create_event(creator, draft),
            Err(StampbookError::InvalidInput { .. })
        ));
    }
    assert_eq!(book.total_events(), 1);
}

#[test]
fn edge_unrestricted_mode_one_stamp_per_owner() {
    let book = Stampbook::with_clock(
        StampbookConfig::default()
            .with_context_id(CONTEXT)
            .with_identity_mode(IdentityMode::Unrestricted),
        Arc::new(ManualClock::new(NOW)),
    );
    let w = world_with(book);
    let second = w.book.mint_passport(w.holder).unwrap();
    assert_eq!(w.book.identities_of(w.holder), vec![w.passport, second]);

    w.book
        .claim_stamp(w.holder, &request(&w, w.event, Nonce::from_u64(1), NOW + 1))
        .unwrap();
    let mut req = request(&w, w.event, Nonce::from_u64(2), NOW + 1);
    req.identity_id = second;
    assert!(matches!(
        w.book.claim_stamp(w.holder, &req),
        Err(StampbookError::AlreadyClaimed { .. })
    ));
    assert!(w.book.has_stamp(second, w.event));
}

// ── Re-entrance ──────────────────────────────────────────────────────────────

#[test]
fn edge_hook_cannot_mutate_but_can_read() {
    let w = world();
    let book = Arc::new(w.book);
    let slot: Arc<OnceLock<Arc<Stampbook>>> = Arc::new(OnceLock::new());
    let _ = slot.set(Arc::clone(&book));
    let observed = Arc::new(Mutex::new(Vec::new()));

    let hook_slot = Arc::clone(&slot);
    let hook_observed = Arc::clone(&observed);
    book.subscribe(Arc::new(move |event: &LedgerEvent| {
        if let (LedgerEvent::StampClaimed { owner, .. }, Some(book)) = (event, hook_slot.get()) {
            let nested = book.mint_passport(SignerKeyPair::generate().principal());
            let total = book.total_stamps();
            hook_observed.lock().unwrap().push((nested, total, *owner));
        }
    }));

    let req = ClaimPayload::sign(&w.signer, w.event, Nonce::from_u64(1), NOW + 1, CONTEXT)
        .to_request(w.passport);
    book.claim_stamp(w.holder, &req).unwrap();

    let observed = observed.lock().unwrap();
    assert_eq!(observed.len(), 1);
    let (nested, total, owner) = &observed[0];
    assert!(matches!(nested, Err(StampbookError::Reentrant)));
    assert_eq!(*total, 1);
    assert_eq!(*owner, w.holder);
    assert_eq!(book.total_identities(), 1);
}

/// Recovery that tries to create an event mid-claim.
struct MeddlingRecovery {
    book: Arc<OnceLock<Arc<Stampbook>>>,
    attempts: Arc<Mutex<Vec<bool>>>,
}

impl SignerRecovery for MeddlingRecovery {
    fn recover(&self, digest: &[u8; 32], signature: &ClaimSignature) -> Option<Principal> {
        if let Some(book) = self.book.get() {
            let caller = Principal::from_bytes([7u8; 32]);
            let nested = book.create_event(caller, EventDraft::new("sneaky", "", "", caller));
            self.attempts
                .lock()
                .unwrap()
                .push(matches!(nested, Err(StampbookError::Reentrant)));
        }
        Ed25519Recovery.recover(digest, signature)
    }
}

#[test]
fn edge_reentrant_signer_recovery_is_refused() {
    let slot: Arc<OnceLock<Arc<Stampbook>>> = Arc::new(OnceLock::new());
    let attempts = Arc::new(Mutex::new(Vec::new()));
    let book = Stampbook::with_clock(
        StampbookConfig::default().with_context_id(CONTEXT),
        Arc::new(ManualClock::new(NOW)),
    )
    .with_recovery(MeddlingRecovery {
        book: Arc::clone(&slot),
        attempts: Arc::clone(&attempts),
    });
    let w = world_with(book);
    let book = Arc::new(w.book);
    let _ = slot.set(Arc::clone(&book));

    let req = ClaimPayload::sign(&w.signer, w.event, Nonce::from_u64(1), NOW + 1, CONTEXT)
        .to_request(w.passport);
    book.claim_stamp(w.holder, &req).unwrap();

    assert_eq!(*attempts.lock().unwrap(), vec![true]);
    assert_eq!(book.total_events(), 1);
    assert_eq!(book.total_stamps(), 1);
}

/// Recovery that reads the ledger it is verifying for.
struct ReadingRecovery {
    book: Arc<OnceLock<Arc<Stampbook>>>,
    seen_totals: Arc<Mutex<Vec<u64>>>,
}

impl SignerRecovery for ReadingRecovery {
    fn recover(&self, digest: &[u8; 32], signature: &ClaimSignature) -> Option<Principal> {
        if let Some(book) = self.book.get() {
            let total = book.total_stamps() + book.snapshot().nonces.len() as u64;
            self.seen_totals.lock().unwrap().push(total);
        }
        Ed25519Recovery.recover(digest, signature)
    }
}

#[test]
fn edge_signer_recovery_may_read_the_ledger() {
    let slot: Arc<OnceLock<Arc<Stampbook>>> = Arc::new(OnceLock::new());
    let seen_totals = Arc::new(Mutex::new(Vec::new()));
    let book = Stampbook::with_clock(
        StampbookConfig::default().with_context_id(CONTEXT),
        Arc::new(ManualClock::new(NOW)),
    )
    .with_recovery(ReadingRecovery {
        book: Arc::clone(&slot),
        seen_totals: Arc::clone(&seen_totals),
    });
    let w = world_with(book);
    let book = Arc::new(w.book);
    let _ = slot.set(Arc::clone(&book));

    let first = ClaimPayload::sign(&w.signer, w.event, Nonce::from_u64(1), NOW + 1, CONTEXT)
        .to_request(w.passport);
    assert!(book.preflight_claim(w.holder, &first).is_valid);
    book.claim_stamp(w.holder, &first).unwrap();
    assert!(matches!(
        book.claim_stamp(w.holder, &first),
        Err(StampbookError::AlreadyClaimed { .. })
    ));

    // preflight, claim, then the rejected replay, each seeing the ledger as it stood.
    assert_eq!(*seen_totals.lock().unwrap(), vec![0, 0, 2]);
    assert_eq!(book.total_stamps(), 1);
}

// ── Preflight and payloads ───────────────────────────────────────────────────

#[test]
fn edge_preflight_matches_claim_outcome() {
    let w = world();
    let req = request(&w, w.event, Nonce::from_u64(1), NOW + 1);
    let report = w.book.preflight_claim(w.holder, &req);
    assert!(report.is_valid);
    assert_eq!(report.reached, ClaimStage::SignatureValid);

    w.book.claim_stamp(w.holder, &req).unwrap();
    let report = w.book.preflight_claim(w.holder, &req);
    assert!(!report.is_valid);
    assert!(!report.not_claimed);
    assert!(!report.nonce_unused);
    assert_eq!(report.reached, ClaimStage::EventResolved);
}

#[test]
fn edge_garbage_payloads_rejected_before_ledger() {
    for input in ["", "https://stamps.example/claim/", "%%%", "e30"] {
        assert!(
            ClaimPayload::from_link(input).is_err(),
            "{input:?} should not decode"
        );
    }
}

#[test]
fn edge_digest_is_deterministic() {
    let n = Nonce::from_u64(5);
    assert_eq!(
        claim_digest(EventId(1), &n, 10, CONTEXT),
        claim_digest(EventId(1), &n, 10, CONTEXT)
    );
    assert_ne!(
        claim_digest(EventId(1), &n, 10, CONTEXT),
        claim_digest(EventId(1), &n, 10, CONTEXT + 1)
    );
}
