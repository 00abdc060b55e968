//! In-memory host
//!
//! A complete set of collaborators backed by plain collections. Used by the
//! integration tests and the interactive runner; also a reference for what a
//! real host has to provide.

use crate::cards::{ActionDeck, Card};
use crate::combat::combatant::{Combatant, CombatantUpdate};
use crate::combat::effects::ActiveEffect;
use crate::core::error::HostError;
use crate::core::types::{ActorId, CardId, CombatId, CombatantId, DeckId, EffectId, PileId};
use crate::host::{
    ActorDirectory, ActorProfile, CardChoice, CardPrompt, CombatStore, CombatUpdate, DeckStore,
    EffectStore, Host, HostResult, PickRequest,
};
use ahash::AHashMap;
use std::collections::VecDeque;
use std::sync::RwLock;
use tokio::sync::Mutex;

// ============================================================================
// Decks
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryDeckStore {
    decks: Mutex<AHashMap<DeckId, ActionDeck>>,
}

impl MemoryDeckStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deck(deck_id: DeckId, deck: ActionDeck) -> Self {
        let mut decks = AHashMap::new();
        decks.insert(deck_id, deck);
        Self {
            decks: Mutex::new(decks),
        }
    }

    pub async fn insert(&self, deck_id: DeckId, deck: ActionDeck) {
        self.decks.lock().await.insert(deck_id, deck);
    }

    /// Copy of a deck's current state
    pub async fn snapshot(&self, deck_id: &DeckId) -> Option<ActionDeck> {
        self.decks.lock().await.get(deck_id).cloned()
    }
}

fn missing_deck(deck: &DeckId) -> HostError {
    HostError::new(format!("no deck named {deck}"))
}

fn short_deck(deck: &DeckId, n: usize) -> HostError {
    HostError::new(format!("deck {deck} cannot deal {n} cards"))
}

impl DeckStore for MemoryDeckStore {
    async fn contains(&self, deck: &DeckId) -> bool {
        self.decks.lock().await.contains_key(deck)
    }

    async fn available(&self, deck: &DeckId) -> HostResult<usize> {
        let decks = self.decks.lock().await;
        decks
            .get(deck)
            .map(ActionDeck::available)
            .ok_or_else(|| missing_deck(deck))
    }

    async fn draw(&self, deck: &DeckId, n: usize) -> HostResult<Vec<Card>> {
        let mut decks = self.decks.lock().await;
        let cards = decks.get_mut(deck).ok_or_else(|| missing_deck(deck))?;
        cards.draw(n).ok_or_else(|| short_deck(deck, n))
    }

    async fn deal_to(&self, deck: &DeckId, pile: &PileId, n: usize) -> HostResult<Vec<Card>> {
        let mut decks = self.decks.lock().await;
        let cards = decks.get_mut(deck).ok_or_else(|| missing_deck(deck))?;
        cards.deal_to(pile, n).ok_or_else(|| short_deck(deck, n))
    }

    async fn reset(&self, deck: &DeckId) -> HostResult<()> {
        let mut decks = self.decks.lock().await;
        decks
            .get_mut(deck)
            .ok_or_else(|| missing_deck(deck))?
            .reset();
        Ok(())
    }

    async fn card(&self, deck: &DeckId, id: CardId) -> HostResult<Option<Card>> {
        let decks = self.decks.lock().await;
        let cards = decks.get(deck).ok_or_else(|| missing_deck(deck))?;
        Ok(cards.card(id).cloned())
    }
}

// ============================================================================
// Combat documents
// ============================================================================

#[derive(Debug, Default)]
struct StoreState {
    combatant_batches: Vec<(CombatId, Vec<CombatantUpdate>)>,
    combat_updates: Vec<(CombatId, CombatUpdate)>,
    created: Vec<CombatantId>,
    deleted: Vec<CombatantId>,
    deleted_combats: Vec<CombatId>,
    world_time: u64,
    fail_next: Option<String>,
}

impl StoreState {
    fn check_failure(&mut self) -> HostResult<()> {
        match self.fail_next.take() {
            Some(message) => Err(HostError::new(message)),
            None => Ok(()),
        }
    }
}

/// Records every write so tests can inspect what reached the host
#[derive(Debug, Default)]
pub struct MemoryCombatStore {
    state: Mutex<StoreState>,
}

impl MemoryCombatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next write fail with the given message
    pub async fn fail_next(&self, message: impl Into<String>) {
        self.state.lock().await.fail_next = Some(message.into());
    }

    /// Each accepted combatant write, one entry per batch
    pub async fn combatant_batches(&self) -> Vec<(CombatId, Vec<CombatantUpdate>)> {
        self.state.lock().await.combatant_batches.clone()
    }

    pub async fn combat_updates(&self) -> Vec<(CombatId, CombatUpdate)> {
        self.state.lock().await.combat_updates.clone()
    }

    pub async fn created(&self) -> Vec<CombatantId> {
        self.state.lock().await.created.clone()
    }

    pub async fn deleted(&self) -> Vec<CombatantId> {
        self.state.lock().await.deleted.clone()
    }

    pub async fn deleted_combats(&self) -> Vec<CombatId> {
        self.state.lock().await.deleted_combats.clone()
    }

    /// Seconds of world time advanced so far
    pub async fn world_time(&self) -> u64 {
        self.state.lock().await.world_time
    }
}

impl CombatStore for MemoryCombatStore {
    async fn update(&self, combat: CombatId, update: &CombatantUpdate) -> HostResult<()> {
        let mut state = self.state.lock().await;
        state.check_failure()?;
        state.combatant_batches.push((combat, vec![update.clone()]));
        Ok(())
    }

    async fn update_many(&self, combat: CombatId, updates: &[CombatantUpdate]) -> HostResult<()> {
        let mut state = self.state.lock().await;
        state.check_failure()?;
        state.combatant_batches.push((combat, updates.to_vec()));
        Ok(())
    }

    async fn update_combat(&self, combat: CombatId, update: CombatUpdate) -> HostResult<()> {
        let mut state = self.state.lock().await;
        state.check_failure()?;
        state.world_time += u64::from(update.advance_time);
        state.combat_updates.push((combat, update));
        Ok(())
    }

    async fn create_combatant(&self, _combat: CombatId, combatant: &Combatant) -> HostResult<()> {
        let mut state = self.state.lock().await;
        state.check_failure()?;
        state.created.push(combatant.id);
        Ok(())
    }

    async fn delete_combatant(&self, _combat: CombatId, id: CombatantId) -> HostResult<()> {
        let mut state = self.state.lock().await;
        state.check_failure()?;
        state.deleted.push(id);
        Ok(())
    }

    async fn delete_combat(&self, combat: CombatId) -> HostResult<()> {
        let mut state = self.state.lock().await;
        state.check_failure()?;
        state.deleted_combats.push(combat);
        Ok(())
    }
}

// ============================================================================
// Prompts
// ============================================================================

/// How a scripted prompt answers a card choice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptAnswer {
    Keep(CardId),
    /// Keep the candidate at this position
    KeepIndex(usize),
    KeepBest,
    KeepWorst,
    Redraw,
    Cancel,
}

impl PromptAnswer {
    fn resolve(self, request: &PickRequest) -> CardChoice {
        let pick = |card: Option<&Card>| card.map_or(CardChoice::Cancelled, |c| CardChoice::Keep(c.id));
        match self {
            PromptAnswer::Keep(id) => CardChoice::Keep(id),
            PromptAnswer::KeepIndex(i) => pick(request.candidates.get(i)),
            PromptAnswer::KeepBest => pick(
                request
                    .candidates
                    .iter()
                    .max_by_key(|c| (c.value, c.suit)),
            ),
            PromptAnswer::KeepWorst => pick(
                request
                    .candidates
                    .iter()
                    .min_by_key(|c| (c.value, c.suit)),
            ),
            PromptAnswer::Redraw => CardChoice::Redraw,
            PromptAnswer::Cancel => CardChoice::Cancelled,
        }
    }
}

/// Answers prompts from a script, then falls back to a fixed answer
#[derive(Debug)]
pub struct ScriptedPrompt {
    script: Mutex<VecDeque<PromptAnswer>>,
    when_empty: PromptAnswer,
    requests: Mutex<Vec<PickRequest>>,
}

impl ScriptedPrompt {
    /// Every prompt is closed without a choice
    pub fn cancelling() -> Self {
        Self::new(Vec::new(), PromptAnswer::Cancel)
    }

    pub fn new(script: Vec<PromptAnswer>, when_empty: PromptAnswer) -> Self {
        Self {
            script: Mutex::new(script.into()),
            when_empty,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub async fn push(&self, answer: PromptAnswer) {
        self.script.lock().await.push_back(answer);
    }

    /// Every request shown so far
    pub async fn requests(&self) -> Vec<PickRequest> {
        self.requests.lock().await.clone()
    }
}

impl Default for ScriptedPrompt {
    fn default() -> Self {
        Self::cancelling()
    }
}

impl CardPrompt for ScriptedPrompt {
    async fn choose(&self, request: &PickRequest) -> CardChoice {
        self.requests.lock().await.push(request.clone());
        let answer = self
            .script
            .lock()
            .await
            .pop_front()
            .unwrap_or(self.when_empty);
        answer.resolve(request)
    }
}

// ============================================================================
// Effects
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryEffectStore {
    effects: Mutex<AHashMap<EffectId, ActiveEffect>>,
    prompted: Mutex<Vec<EffectId>>,
}

impl MemoryEffectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, effect: ActiveEffect) -> EffectId {
        let id = effect.id;
        self.effects.lock().await.insert(id, effect);
        id
    }

    pub async fn get(&self, id: EffectId) -> Option<ActiveEffect> {
        self.effects.lock().await.get(&id).cloned()
    }

    /// Effects the GM was asked about
    pub async fn prompted(&self) -> Vec<EffectId> {
        self.prompted.lock().await.clone()
    }
}

impl EffectStore for MemoryEffectStore {
    async fn effects_for(&self, actor: ActorId) -> HostResult<Vec<ActiveEffect>> {
        let effects = self.effects.lock().await;
        let mut found: Vec<ActiveEffect> = effects
            .values()
            .filter(|e| e.actor == actor)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn delete_effect(&self, id: EffectId) -> HostResult<()> {
        self.effects
            .lock()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| HostError::new(format!("no effect {id}")))
    }

    async fn prompt_delete(&self, id: EffectId) -> HostResult<()> {
        self.prompted.lock().await.push(id);
        Ok(())
    }

    async fn set_remaining_rounds(&self, id: EffectId, rounds: u32) -> HostResult<()> {
        let mut effects = self.effects.lock().await;
        let effect = effects
            .get_mut(&id)
            .ok_or_else(|| HostError::new(format!("no effect {id}")))?;
        effect.duration.rounds = Some(rounds);
        Ok(())
    }
}

// ============================================================================
// Actors
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryActors {
    profiles: RwLock<AHashMap<ActorId, ActorProfile>>,
}

impl MemoryActors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, actor: ActorId, profile: ActorProfile) {
        self.profiles
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(actor, profile);
    }

    /// Register an actor with the given edges and return its id
    pub fn add(&self, swids: &[&str], player_owned: bool) -> ActorId {
        let actor = ActorId::new();
        self.insert(
            actor,
            ActorProfile {
                swids: swids.iter().map(|s| s.to_string()).collect(),
                player_owned,
            },
        );
        actor
    }
}

impl ActorDirectory for MemoryActors {
    fn profile(&self, actor: ActorId) -> Option<ActorProfile> {
        self.profiles
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&actor)
            .cloned()
    }
}

// ============================================================================
// Host bundle
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryHost {
    pub decks: MemoryDeckStore,
    pub store: MemoryCombatStore,
    pub prompt: ScriptedPrompt,
    pub effects: MemoryEffectStore,
    pub actors: MemoryActors,
}

impl MemoryHost {
    /// Host with a single action deck registered under `deck_id`
    pub fn with_deck(deck_id: DeckId, deck: ActionDeck) -> Self {
        Self {
            decks: MemoryDeckStore::with_deck(deck_id, deck),
            ..Self::default()
        }
    }

    pub fn with_prompt(mut self, prompt: ScriptedPrompt) -> Self {
        self.prompt = prompt;
        self
    }
}

impl Host for MemoryHost {
    type Deck = MemoryDeckStore;
    type Store = MemoryCombatStore;
    type Prompt = ScriptedPrompt;
    type Effects = MemoryEffectStore;
    type Actors = MemoryActors;

    fn deck(&self) -> &Self::Deck {
        &self.decks
    }

    fn store(&self) -> &Self::Store {
        &self.store
    }

    fn prompt(&self) -> &Self::Prompt {
        &self.prompt
    }

    fn effects(&self) -> &Self::Effects {
        &self.effects
    }

    fn actors(&self) -> &Self::Actors {
        &self.actors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Suit;

    fn request(cards: Vec<Card>) -> PickRequest {
        PickRequest {
            combatant: CombatantId::new(),
            combatant_name: "Test".into(),
            candidates: cards,
            enable_redraw: false,
            is_quick_draw: false,
            old_card_id: None,
        }
    }

    #[tokio::test]
    async fn test_scripted_prompt_answers_in_order_then_falls_back() {
        let low = Card::ranked(3, Suit::Clubs);
        let high = Card::ranked(12, Suit::Spades);
        let prompt = ScriptedPrompt::new(vec![PromptAnswer::KeepWorst], PromptAnswer::KeepBest);
        let req = request(vec![high.clone(), low.clone()]);

        assert_eq!(prompt.choose(&req).await, CardChoice::Keep(low.id));
        assert_eq!(prompt.choose(&req).await, CardChoice::Keep(high.id));
        assert_eq!(prompt.requests().await.len(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_is_one_shot() {
        let store = MemoryCombatStore::new();
        store.fail_next("disk full").await;
        let err = store.update_many(CombatId::new(), &[]).await.unwrap_err();
        assert_eq!(err, HostError::new("disk full"));
        assert!(store.update_many(CombatId::new(), &[]).await.is_ok());
    }

    #[tokio::test]
    async fn test_deck_store_reports_missing_deck() {
        let decks = MemoryDeckStore::new();
        assert!(!decks.contains(&DeckId::new("nope")).await);
        assert!(decks.available(&DeckId::new("nope")).await.is_err());
    }

    #[tokio::test]
    async fn test_effect_rounds_update() {
        let store = MemoryEffectStore::new();
        let actor = ActorId::new();
        let id = store
            .insert(ActiveEffect::new(
                actor,
                "Defend",
                None,
                crate::combat::effects::EffectDuration::new(1, 0, Some(2)),
            ))
            .await;
        store.set_remaining_rounds(id, 1).await.unwrap();
        assert_eq!(store.get(id).await.unwrap().duration.rounds, Some(1));
        assert_eq!(store.effects_for(actor).await.unwrap().len(), 1);
    }
}
