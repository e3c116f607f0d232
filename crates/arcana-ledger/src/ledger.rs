//! verify-then-apply ledger
//!
//! state per key:
//!
//! - commitment: `Invalid -> Valid` on registration, `Valid -> Spent` on a
//!   verified spend with an unused nullifier. decks never leave `Valid`.
//! - nullifier: unused -> used, permanently.
//! - `(game_id, draw_index)`: undrawn -> drawn, permanently.
//!
//! proofs are checked before any lock is taken; the checks and writes of a
//! transition happen under the locks of every key it touches, so of two
//! concurrent submissions sharing a note or nullifier exactly one applies.

use arcana_circuit::{
    field, CircuitKind, DeckCommitment, DrawPublic, EncryptedPayload, Fr, LootBoxPublic,
    NoteCommitment, Nullifier, Proof, RarityPublic, ShufflePublic, TradePublic, TransferPublic,
    Verifier, DECK_SIZE,
};
use serde::Serialize;

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::state::{CommitmentState, DeckRecord, GameRecord, NoteRecord, Resource};
use crate::store::{Key, ShardedStore};

/// what an accepted submission changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Registered(NoteCommitment),
    Spent {
        old: NoteCommitment,
        new: NoteCommitment,
        nullifier: Nullifier,
    },
    DeckRegistered {
        game_id: Fr,
        deck: DeckCommitment,
    },
    Drawn {
        game_id: Fr,
        index: u8,
    },
    /// proof accepted, no state attached (rarity rolls)
    Verified(CircuitKind),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub notes: usize,
    pub spent: usize,
    pub nullifiers: usize,
    pub decks: usize,
    pub draws: usize,
}

pub struct Ledger<V> {
    verifier: V,
    store: ShardedStore,
}

impl<V: Verifier> Ledger<V> {
    pub fn new(verifier: V, config: &LedgerConfig) -> Self {
        Self {
            verifier,
            store: ShardedStore::new(config.shards),
        }
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    pub fn num_shards(&self) -> usize {
        self.store.num_shards()
    }

    // state operations

    pub fn register(&self, commitment: NoteCommitment) -> Result<()> {
        self.register_note(commitment, None)
    }

    /// create a note, fails if the commitment was ever seen
    pub fn register_note(&self, commitment: NoteCommitment, payload: Option<EncryptedPayload>) -> Result<()> {
        traced("register", self.apply_register(commitment, payload)).map(|_| ())
    }

    pub fn spend(&self, old: NoteCommitment, new: NoteCommitment, nullifier: Nullifier) -> Result<()> {
        self.spend_with_payload(old, new, nullifier, None)
    }

    pub fn spend_with_payload(
        &self,
        old: NoteCommitment,
        new: NoteCommitment,
        nullifier: Nullifier,
        payload: Option<EncryptedPayload>,
    ) -> Result<()> {
        traced("spend", self.apply_spend(old, new, nullifier, payload)).map(|_| ())
    }

    /// one deck per game, registered once and never consumed
    pub fn register_deck(&self, game_id: Fr, deck: DeckCommitment) -> Result<()> {
        traced("register_deck", self.apply_register_deck(game_id, deck)).map(|_| ())
    }

    pub fn mark_drawn(&self, game_id: Fr, index: u8) -> Result<()> {
        traced("mark_drawn", self.apply_draw(game_id, None, index as u64)).map(|_| ())
    }

    // submissions

    /// verify a proof against raw public inputs, then apply its transition
    pub fn submit(
        &self,
        kind: CircuitKind,
        public_inputs: &[Fr],
        proof: &Proof,
        payload: Option<EncryptedPayload>,
    ) -> Result<Transition> {
        traced(kind.as_str(), self.verify_and_apply(kind, public_inputs, proof, payload))
    }

    pub fn submit_transfer(
        &self,
        public: &TransferPublic,
        proof: &Proof,
        payload: Option<EncryptedPayload>,
    ) -> Result<Transition> {
        self.submit(CircuitKind::Transfer, &public.to_field_vec(), proof, payload)
    }

    pub fn submit_trade(
        &self,
        public: &TradePublic,
        proof: &Proof,
        payload: Option<EncryptedPayload>,
    ) -> Result<Transition> {
        self.submit(CircuitKind::Trade, &public.to_field_vec(), proof, payload)
    }

    pub fn submit_rarity(&self, public: &RarityPublic, proof: &Proof) -> Result<Transition> {
        self.submit(CircuitKind::RarityRoll, &public.to_field_vec(), proof, None)
    }

    pub fn submit_loot_box(
        &self,
        public: &LootBoxPublic,
        proof: &Proof,
        payload: Option<EncryptedPayload>,
    ) -> Result<Transition> {
        self.submit(CircuitKind::LootBox, &public.to_field_vec(), proof, payload)
    }

    pub fn submit_shuffle(&self, public: &ShufflePublic, proof: &Proof) -> Result<Transition> {
        self.submit(CircuitKind::Shuffle, &public.to_field_vec(), proof, None)
    }

    pub fn submit_draw(&self, public: &DrawPublic, proof: &Proof) -> Result<Transition> {
        self.submit(CircuitKind::Draw, &public.to_field_vec(), proof, None)
    }

    // reads

    pub fn get_state(&self, commitment: Fr) -> CommitmentState {
        self.store.read(Key::Commitment(commitment), |shard| {
            shard
                .resources
                .get(&commitment)
                .map_or(CommitmentState::Invalid, Resource::state)
        })
    }

    pub fn resource(&self, commitment: Fr) -> Option<Resource> {
        self.store
            .read(Key::Commitment(commitment), |shard| shard.resources.get(&commitment).cloned())
    }

    pub fn is_nullifier_used(&self, nullifier: &Nullifier) -> bool {
        self.store
            .read(Key::Nullifier(nullifier.0), |shard| shard.nullifiers.contains(&nullifier.0))
    }

    pub fn is_drawn(&self, game_id: Fr, index: u8) -> bool {
        self.store.read(Key::Game(game_id), |shard| {
            shard.games.get(&game_id).is_some_and(|game| game.is_drawn(index))
        })
    }

    pub fn deck(&self, game_id: Fr) -> Option<DeckCommitment> {
        self.store
            .read(Key::Game(game_id), |shard| shard.games.get(&game_id).map(|game| game.deck))
    }

    pub fn payload(&self, commitment: Fr) -> Option<EncryptedPayload> {
        match self.resource(commitment)? {
            Resource::Consumable(note) => note.payload,
            Resource::Persistent(_) => None,
        }
    }

    pub fn stats(&self) -> LedgerStats {
        let mut stats = LedgerStats::default();
        self.store.for_each(|shard| {
            for resource in shard.resources.values() {
                match resource {
                    Resource::Consumable(note) => {
                        stats.notes += 1;
                        stats.spent += note.spent as usize;
                    }
                    Resource::Persistent(_) => stats.decks += 1,
                }
            }
            stats.nullifiers += shard.nullifiers.len();
            stats.draws += shard.games.values().map(|g| g.num_drawn() as usize).sum::<usize>();
        });
        stats
    }

    fn verify_and_apply(
        &self,
        kind: CircuitKind,
        p: &[Fr],
        proof: &Proof,
        payload: Option<EncryptedPayload>,
    ) -> Result<Transition> {
        if p.len() != kind.num_public() {
            return Err(LedgerError::MalformedPublicInputs {
                kind,
                reason: "wrong number of public inputs",
            });
        }
        if !self.verifier.verify(kind, p, proof) {
            return Err(LedgerError::InvalidProof(kind));
        }

        match kind {
            CircuitKind::Transfer => {
                self.apply_spend(NoteCommitment(p[0]), NoteCommitment(p[1]), Nullifier(p[4]), payload)
            }
            CircuitKind::Trade => {
                self.apply_spend(NoteCommitment(p[0]), NoteCommitment(p[1]), Nullifier(p[2]), payload)
            }
            CircuitKind::LootBox => {
                self.apply_spend(NoteCommitment(p[0]), NoteCommitment(p[6]), Nullifier(p[1]), payload)
            }
            CircuitKind::RarityRoll => {
                tracing::info!(%kind, "proof accepted");
                Ok(Transition::Verified(kind))
            }
            CircuitKind::Shuffle => self.apply_register_deck(p[0], DeckCommitment(p[2])),
            CircuitKind::Draw => {
                let index = field::to_u64(&p[2]).ok_or(LedgerError::MalformedPublicInputs {
                    kind,
                    reason: "draw index is not a small integer",
                })?;
                self.apply_draw(p[1], Some(DeckCommitment(p[0])), index)
            }
        }
    }

    fn apply_register(&self, commitment: NoteCommitment, payload: Option<EncryptedPayload>) -> Result<Transition> {
        let mut locked = self.store.lock([Key::Commitment(commitment.0)]);
        let shard = locked.at(0);
        if shard.resources.contains_key(&commitment.0) {
            return Err(LedgerError::AlreadyExists(commitment.0));
        }
        shard
            .resources
            .insert(commitment.0, Resource::Consumable(NoteRecord::new(payload)));
        tracing::info!(commitment = %commitment.to_hex(), "note registered");
        Ok(Transition::Registered(commitment))
    }

    fn apply_spend(
        &self,
        old: NoteCommitment,
        new: NoteCommitment,
        nullifier: Nullifier,
        payload: Option<EncryptedPayload>,
    ) -> Result<Transition> {
        const OLD: usize = 0;
        const NEW: usize = 1;
        const NULLIFIER: usize = 2;

        let mut locked = self.store.lock([
            Key::Commitment(old.0),
            Key::Commitment(new.0),
            Key::Nullifier(nullifier.0),
        ]);

        match locked.at(OLD).resources.get_mut(&old.0) {
            None => return Err(LedgerError::NotFound(old.0)),
            Some(Resource::Persistent(_)) => return Err(LedgerError::NotConsumable(old.0)),
            Some(Resource::Consumable(note)) if note.spent => return Err(LedgerError::AlreadySpent(old.0)),
            Some(Resource::Consumable(_)) => {}
        }
        if locked.at(NULLIFIER).nullifiers.contains(&nullifier.0) {
            return Err(LedgerError::NullifierUsed(nullifier.0));
        }
        if locked.at(NEW).resources.contains_key(&new.0) {
            return Err(LedgerError::AlreadyExists(new.0));
        }

        if let Some(Resource::Consumable(note)) = locked.at(OLD).resources.get_mut(&old.0) {
            note.spent = true;
        }
        locked.at(NULLIFIER).nullifiers.insert(nullifier.0);
        locked
            .at(NEW)
            .resources
            .insert(new.0, Resource::Consumable(NoteRecord::new(payload)));

        tracing::info!(
            old = %old.to_hex(),
            new = %new.to_hex(),
            nullifier = %nullifier.to_hex(),
            "note spent"
        );
        Ok(Transition::Spent { old, new, nullifier })
    }

    fn apply_register_deck(&self, game_id: Fr, deck: DeckCommitment) -> Result<Transition> {
        const GAME: usize = 0;
        const DECK: usize = 1;

        let mut locked = self.store.lock([Key::Game(game_id), Key::Commitment(deck.0)]);
        if locked.at(GAME).games.contains_key(&game_id) {
            return Err(LedgerError::DeckAlreadyRegistered(game_id));
        }
        if locked.at(DECK).resources.contains_key(&deck.0) {
            return Err(LedgerError::AlreadyExists(deck.0));
        }
        locked.at(GAME).games.insert(game_id, GameRecord::new(deck));
        locked
            .at(DECK)
            .resources
            .insert(deck.0, Resource::Persistent(DeckRecord { game_id }));

        tracing::info!(game = %field::to_hex(&game_id), deck = %deck.to_hex(), "deck registered");
        Ok(Transition::DeckRegistered { game_id, deck })
    }

    fn apply_draw(&self, game_id: Fr, deck: Option<DeckCommitment>, index: u64) -> Result<Transition> {
        let index = u8::try_from(index)
            .ok()
            .filter(|i| (*i as usize) < DECK_SIZE)
            .ok_or(LedgerError::IndexOutOfRange(index))?;

        let mut locked = self.store.lock([Key::Game(game_id)]);
        let game = locked
            .at(0)
            .games
            .get_mut(&game_id)
            .ok_or(LedgerError::DeckNotRegistered(game_id))?;
        if deck.is_some_and(|deck| deck != game.deck) {
            return Err(LedgerError::DeckMismatch(game_id));
        }
        if !game.mark(index) {
            return Err(LedgerError::AlreadyDrawn { game_id, index });
        }

        tracing::info!(game = %field::to_hex(&game_id), index, "card drawn");
        Ok(Transition::Drawn { game_id, index })
    }
}

fn traced<T>(op: &'static str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        tracing::warn!(op, reason = %e.reason(), error = %e, "rejected");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcana_circuit::AttestationBackend;

    fn ledger() -> Ledger<AttestationBackend> {
        Ledger::new(AttestationBackend::new([1u8; 32]), &LedgerConfig { shards: 4 })
    }

    fn h(x: u64) -> NoteCommitment {
        NoteCommitment(Fr::from(x))
    }

    fn n(x: u64) -> Nullifier {
        Nullifier(Fr::from(x))
    }

    #[test]
    fn test_register_once() {
        let ledger = ledger();
        assert_eq!(ledger.get_state(Fr::from(1u64)), CommitmentState::Invalid);
        ledger.register(h(1)).unwrap();
        assert_eq!(ledger.get_state(Fr::from(1u64)), CommitmentState::Valid);
        assert_eq!(ledger.register(h(1)), Err(LedgerError::AlreadyExists(Fr::from(1u64))));
    }

    #[test]
    fn test_spend_lifecycle() {
        let ledger = ledger();
        assert_eq!(ledger.spend(h(1), h(2), n(3)), Err(LedgerError::NotFound(Fr::from(1u64))));

        ledger.register(h(1)).unwrap();
        ledger.spend(h(1), h(2), n(3)).unwrap();
        assert_eq!(ledger.get_state(Fr::from(1u64)), CommitmentState::Spent);
        assert_eq!(ledger.get_state(Fr::from(2u64)), CommitmentState::Valid);
        assert!(ledger.is_nullifier_used(&n(3)));

        assert_eq!(ledger.spend(h(1), h(4), n(5)), Err(LedgerError::AlreadySpent(Fr::from(1u64))));
        // fresh note, reused nullifier
        ledger.register(h(6)).unwrap();
        assert_eq!(ledger.spend(h(6), h(7), n(3)), Err(LedgerError::NullifierUsed(Fr::from(3u64))));
        // output collides with an existing note
        assert_eq!(ledger.spend(h(6), h(2), n(8)), Err(LedgerError::AlreadyExists(Fr::from(2u64))));
        assert_eq!(ledger.get_state(Fr::from(6u64)), CommitmentState::Valid);
        assert!(!ledger.is_nullifier_used(&n(8)));
    }

    #[test]
    fn test_deck_not_consumable() {
        let ledger = ledger();
        let game = Fr::from(7u64);
        let deck = DeckCommitment(Fr::from(70u64));
        ledger.register_deck(game, deck).unwrap();
        assert_eq!(
            ledger.spend(NoteCommitment(deck.0), h(2), n(3)),
            Err(LedgerError::NotConsumable(deck.0))
        );
        assert_eq!(ledger.get_state(deck.0), CommitmentState::Valid);
        assert_eq!(ledger.register_deck(game, DeckCommitment(Fr::from(71u64))), Err(LedgerError::DeckAlreadyRegistered(game)));
        assert_eq!(ledger.register_deck(Fr::from(8u64), deck), Err(LedgerError::AlreadyExists(deck.0)));
    }

    #[test]
    fn test_draw_marks() {
        let ledger = ledger();
        let game = Fr::from(7u64);
        assert_eq!(ledger.mark_drawn(game, 0), Err(LedgerError::DeckNotRegistered(game)));
        ledger.register_deck(game, DeckCommitment(Fr::from(70u64))).unwrap();
        ledger.mark_drawn(game, 0).unwrap();
        assert!(ledger.is_drawn(game, 0));
        assert!(!ledger.is_drawn(game, 1));
        assert_eq!(ledger.mark_drawn(game, 0), Err(LedgerError::AlreadyDrawn { game_id: game, index: 0 }));
        assert_eq!(ledger.mark_drawn(game, 52), Err(LedgerError::IndexOutOfRange(52)));
    }

    #[test]
    fn test_payload_kept() {
        let ledger = ledger();
        ledger.register_note(h(1), Some(EncryptedPayload(vec![1, 2, 3]))).unwrap();
        ledger
            .spend_with_payload(h(1), h(2), n(3), Some(EncryptedPayload(vec![4])))
            .unwrap();
        assert_eq!(ledger.payload(Fr::from(1u64)), Some(EncryptedPayload(vec![1, 2, 3])));
        assert_eq!(ledger.payload(Fr::from(2u64)), Some(EncryptedPayload(vec![4])));
        assert_eq!(ledger.payload(Fr::from(9u64)), None);
    }

    #[test]
    fn test_stats() {
        let ledger = ledger();
        ledger.register(h(1)).unwrap();
        ledger.spend(h(1), h(2), n(3)).unwrap();
        ledger.register_deck(Fr::from(7u64), DeckCommitment(Fr::from(70u64))).unwrap();
        ledger.mark_drawn(Fr::from(7u64), 5).unwrap();
        assert_eq!(
            ledger.stats(),
            LedgerStats {
                notes: 2,
                spent: 1,
                nullifiers: 1,
                decks: 1,
                draws: 1,
            }
        );
    }

    #[test]
    fn test_unverified_proof_rejected() {
        let ledger = ledger();
        ledger.register(h(1)).unwrap();
        let forged = Proof::new(CircuitKind::Transfer, vec![0u8; 32]);
        let inputs = [Fr::from(1u64), Fr::from(2u64), Fr::from(0u64), Fr::from(0u64), Fr::from(3u64)];
        assert_eq!(
            ledger.submit(CircuitKind::Transfer, &inputs, &forged, None),
            Err(LedgerError::InvalidProof(CircuitKind::Transfer))
        );
        assert_eq!(
            ledger.submit(CircuitKind::Transfer, &inputs[..3], &forged, None).map_err(|e| e.reason()),
            Err(crate::ReasonCode::MalformedPublicInputs)
        );
        assert_eq!(ledger.get_state(Fr::from(1u64)), CommitmentState::Valid);
    }
}
