//! End-to-end ledger scenarios
//!
//! Every transition goes through a real statement: build the witness, prove
//! with the attestation backend, submit the public inputs to the ledger.

use std::sync::Barrier;

use arcana_circuit::{
    AttestationBackend, CircuitKind, Deck, DrawStatement, Fr, Keypair, LootBoxStatement, Note,
    NoteFields, ProofSystem, RarityStatement, ShuffleStatement, Statement, Thresholds,
    TradeStatement, TransferStatement, Verifier,
};
use arcana_ledger::{CommitmentState, Ledger, LedgerConfig, LedgerError, ReasonCode, Transition};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn backend() -> AttestationBackend {
    AttestationBackend::new([42u8; 32])
}

fn ledger() -> Ledger<AttestationBackend> {
    init_tracing();
    Ledger::new(backend(), &LedgerConfig::default())
}

#[test]
fn test_transfer_then_replay() {
    let mut rng = ChaCha20Rng::seed_from_u64(1);
    let alice = Keypair::generate(&mut rng);
    let bob = Keypair::generate(&mut rng);
    let ledger = ledger();

    let h1 = Note::asset(alice.pk, Fr::from(1001u64), Fr::from(1u64), &mut rng);
    let h2 = h1.transfer_to(bob.pk, &mut rng);
    ledger.register(h1.commit()).unwrap();

    let statement = TransferStatement::new(h1.clone(), alice.sk, h2.clone()).unwrap();
    let proof = backend().prove_statement(&statement).unwrap();
    let applied = ledger.submit_transfer(&statement.public, &proof, None).unwrap();
    assert_eq!(
        applied,
        Transition::Spent {
            old: h1.commit(),
            new: h2.commit(),
            nullifier: statement.public.nullifier,
        }
    );

    assert_eq!(ledger.get_state(h1.commit().0), CommitmentState::Spent);
    assert_eq!(ledger.get_state(h2.commit().0), CommitmentState::Valid);
    assert!(ledger.is_nullifier_used(&statement.public.nullifier));

    // the identical proof a second time
    let replay = ledger.submit_transfer(&statement.public, &proof, None).unwrap_err();
    assert!(matches!(
        replay.reason(),
        ReasonCode::AlreadySpent | ReasonCode::NullifierUsed
    ));

    // bob moves it on
    let h3 = h2.transfer_to(alice.pk, &mut rng);
    let statement = TransferStatement::new(h2, bob.sk, h3.clone()).unwrap();
    let proof = backend().prove_statement(&statement).unwrap();
    ledger.submit_transfer(&statement.public, &proof, None).unwrap();
    assert_eq!(ledger.get_state(h3.commit().0), CommitmentState::Valid);
}

#[test]
fn test_tampered_public_inputs_rejected() {
    let mut rng = ChaCha20Rng::seed_from_u64(2);
    let alice = Keypair::generate(&mut rng);
    let bob = Keypair::generate(&mut rng);
    let ledger = ledger();

    let old = Note::asset(alice.pk, Fr::from(5u64), Fr::from(1u64), &mut rng);
    ledger.register(old.commit()).unwrap();
    let statement = TransferStatement::new(old.clone(), alice.sk, old.transfer_to(bob.pk, &mut rng)).unwrap();
    let proof = backend().prove_statement(&statement).unwrap();

    let mut public = statement.public;
    public.new_commitment.0 += Fr::from(1u64);
    assert_eq!(
        ledger.submit_transfer(&public, &proof, None),
        Err(LedgerError::InvalidProof(CircuitKind::Transfer))
    );
    assert_eq!(ledger.get_state(old.commit().0), CommitmentState::Valid);
}

#[test]
fn test_shuffle_and_draws() {
    let mut rng = ChaCha20Rng::seed_from_u64(3);
    let ledger = ledger();
    let game = Fr::from(7u64);

    let shuffle = ShuffleStatement::new(game, Fr::from(0x5eedu64), Fr::from(0x5a17u64));
    let proof = backend().prove_statement(&shuffle).unwrap();
    ledger.submit_shuffle(&shuffle.public, &proof).unwrap();
    let d = shuffle.public.deck_commitment;
    assert_eq!(ledger.deck(game), Some(d));

    let deck = shuffle.deck();
    for index in [0u8, 1] {
        let draw = DrawStatement::new(deck.clone(), game, index, arcana_circuit::field::random(&mut rng)).unwrap();
        let proof = backend().prove_statement(&draw).unwrap();
        assert_eq!(
            ledger.submit_draw(&draw.public, &proof).unwrap(),
            Transition::Drawn { game_id: game, index }
        );
    }

    assert_eq!(ledger.get_state(d.0), CommitmentState::Valid);
    assert!(ledger.is_drawn(game, 0));
    assert!(ledger.is_drawn(game, 1));
    assert!(!ledger.is_drawn(game, 2));

    // a fresh proof for an index already drawn
    let again = DrawStatement::new(deck.clone(), game, 0, Fr::from(99u64)).unwrap();
    let proof = backend().prove_statement(&again).unwrap();
    assert_eq!(
        ledger.submit_draw(&again.public, &proof),
        Err(LedgerError::AlreadyDrawn { game_id: game, index: 0 })
    );

    // a valid draw from some other deck
    let other = Deck::shuffled(Fr::from(1u64), Fr::from(2u64));
    let stray = DrawStatement::new(other, game, 3, Fr::from(4u64)).unwrap();
    let proof = backend().prove_statement(&stray).unwrap();
    assert_eq!(ledger.submit_draw(&stray.public, &proof), Err(LedgerError::DeckMismatch(game)));

    // second shuffle for the same game
    let reshuffle = ShuffleStatement::new(game, Fr::from(1u64), Fr::from(2u64));
    let proof = backend().prove_statement(&reshuffle).unwrap();
    assert_eq!(
        ledger.submit_shuffle(&reshuffle.public, &proof),
        Err(LedgerError::DeckAlreadyRegistered(game))
    );
}

#[test]
fn test_draw_before_shuffle() {
    let ledger = ledger();
    let game = Fr::from(9u64);
    let draw = DrawStatement::new(Deck::shuffled(Fr::from(1u64), Fr::from(2u64)), game, 0, Fr::from(3u64)).unwrap();
    let proof = backend().prove_statement(&draw).unwrap();
    assert_eq!(ledger.submit_draw(&draw.public, &proof), Err(LedgerError::DeckNotRegistered(game)));
}

#[test]
fn test_loot_box_then_trade() {
    let mut rng = ChaCha20Rng::seed_from_u64(4);
    let alice = Keypair::generate(&mut rng);
    let bob = Keypair::generate(&mut rng);
    let ledger = ledger();
    let game = Fr::from(7u64);

    let box_note = Note::asset(alice.pk, Fr::from(77u64), game, &mut rng);
    ledger.register(box_note.commit()).unwrap();

    let open = LootBoxStatement::open(box_note.clone(), alice.sk, Fr::from(2024u64), Thresholds::default(), &mut rng).unwrap();
    let proof = backend().prove_statement(&open).unwrap();
    ledger.submit_loot_box(&open.public, &proof, None).unwrap();

    let item = open.item_note();
    assert_eq!(ledger.get_state(box_note.commit().0), CommitmentState::Spent);
    assert_eq!(ledger.get_state(item.commit().0), CommitmentState::Valid);
    match item.fields {
        NoteFields::Item { item_type, .. } => assert_eq!(item_type, Fr::from(open.public.tier)),
        NoteFields::Asset { .. } => panic!("loot box must mint an item"),
    }

    // gift the item to bob
    let gifted = item.transfer_to(bob.pk, &mut rng);
    let trade = TradeStatement::new(item.clone(), alice.sk, gifted.clone(), 0, Fr::from(1u64), Fr::from(0u64)).unwrap();
    assert!(trade.public.is_gift());
    let proof = backend().prove_statement(&trade).unwrap();
    ledger
        .submit_trade(&trade.public, &proof, Some(arcana_circuit::EncryptedPayload(vec![0xab; 48])))
        .unwrap();
    assert_eq!(ledger.get_state(item.commit().0), CommitmentState::Spent);
    assert_eq!(ledger.payload(gifted.commit().0).map(|p| p.len()), Some(48));
}

#[test]
fn test_rarity_roll_changes_nothing() {
    let mut rng = ChaCha20Rng::seed_from_u64(5);
    let alice = Keypair::generate(&mut rng);
    let ledger = ledger();

    let roll = RarityStatement::new(alice.sk, Fr::from(31337u64), Thresholds::default());
    let proof = backend().prove_statement(&roll).unwrap();
    assert!(backend().verify(CircuitKind::RarityRoll, &roll.public_inputs(), &proof));
    assert_eq!(
        ledger.submit_rarity(&roll.public, &proof).unwrap(),
        Transition::Verified(CircuitKind::RarityRoll)
    );
    assert_eq!(ledger.stats(), Default::default());
}

#[test]
fn test_concurrent_double_spend() {
    const RACERS: usize = 8;

    let mut rng = ChaCha20Rng::seed_from_u64(6);
    let alice = Keypair::generate(&mut rng);
    let ledger = Ledger::new(backend(), &LedgerConfig { shards: 4 });

    let old = Note::asset(alice.pk, Fr::from(1u64), Fr::from(2u64), &mut rng);
    ledger.register(old.commit()).unwrap();

    // same note, same nullifier, a different recipient each time
    let submissions: Vec<_> = (0..RACERS)
        .map(|_| {
            let to = Keypair::generate(&mut rng);
            let statement = TransferStatement::new(old.clone(), alice.sk, old.transfer_to(to.pk, &mut rng)).unwrap();
            let proof = backend().prove_statement(&statement).unwrap();
            (statement.public, proof)
        })
        .collect();

    let barrier = Barrier::new(RACERS);
    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = submissions
            .iter()
            .map(|(public, proof)| {
                let ledger = &ledger;
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    ledger.submit_transfer(public, proof, None)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(matches!(
            err.reason(),
            ReasonCode::AlreadySpent | ReasonCode::NullifierUsed
        ));
    }
    assert_eq!(ledger.stats().notes, 2);
    assert_eq!(ledger.stats().nullifiers, 1);
}

#[test]
fn test_unrelated_spends_all_apply() {
    let mut rng = ChaCha20Rng::seed_from_u64(7);
    let ledger = Ledger::new(backend(), &LedgerConfig { shards: 2 });
    let spends: Vec<_> = (0..16u64)
        .map(|i| {
            let owner = Keypair::generate(&mut rng);
            let old = Note::asset(owner.pk, Fr::from(i), Fr::from(0u64), &mut rng);
            ledger.register(old.commit()).unwrap();
            let statement = TransferStatement::new(old.clone(), owner.sk, old.transfer_to(owner.pk, &mut rng)).unwrap();
            let proof = backend().prove_statement(&statement).unwrap();
            (statement.public, proof)
        })
        .collect();

    std::thread::scope(|s| {
        for (public, proof) in &spends {
            let ledger = &ledger;
            s.spawn(move || ledger.submit_transfer(public, proof, None).unwrap());
        }
    });
    assert_eq!(ledger.stats().spent, 16);
}
