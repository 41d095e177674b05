// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Card sets, the study cursor, and card editing.

use reqwest::Method;
use thiserror::Error;

use crate::api::CARDS_PATH;
use crate::api::card_path;
use crate::api::error::ApiError;
use crate::api::types::CardEnvelope;
use crate::api::types::CardPayload;
use crate::api::types::RemoteCard;
use crate::auth::AuthManager;

pub const SERVER_SET_NAME: &str = "My Cards (Server)";
pub const SERVER_OWNER: &str = "server";
pub const LOCAL_OWNER: &str = "local";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub japanese: String,
    pub english: String,
    /// The server's id for this card. `None` means the card only exists
    /// locally.
    pub remote_id: Option<i64>,
}

impl Card {
    pub fn local(japanese: impl Into<String>, english: impl Into<String>) -> Self {
        Self {
            japanese: japanese.into(),
            english: english.into(),
            remote_id: None,
        }
    }
}

impl From<RemoteCard> for Card {
    fn from(card: RemoteCard) -> Self {
        Self {
            japanese: card.front,
            english: card.back,
            remote_id: Some(card.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSet {
    pub name: String,
    pub cards: Vec<Card>,
    pub owner_id: String,
}

impl CardSet {
    fn server(cards: Vec<Card>) -> Self {
        Self {
            name: SERVER_SET_NAME.to_string(),
            cards,
            owner_id: SERVER_OWNER.to_string(),
        }
    }

    pub fn is_server_backed(&self) -> bool {
        self.owner_id == SERVER_OWNER
    }
}

#[derive(Debug, Error)]
pub enum DeckError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("no card set is selected")]
    NoActiveSet,

    #[error("there is no card set #{0}")]
    NoSuchSet(usize),

    #[error("there is no card #{0}")]
    NoSuchCard(usize),
}

/// The contents of the edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditBuffers {
    pub japanese: String,
    pub english: String,
}

/// Card sets plus navigation and edit state. Operations that talk to the
/// server borrow the [`AuthManager`] for the duration of the call.
#[derive(Debug, Default)]
pub struct CardManager {
    sets: Vec<CardSet>,
    current_set: Option<usize>,
    current_card: usize,
    flipped: bool,
    editing: Option<usize>,
    buffers: EditBuffers,
}

impl CardManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sets(&self) -> &[CardSet] {
        &self.sets
    }

    pub fn current_set_index(&self) -> Option<usize> {
        self.current_set
    }

    pub fn active_set(&self) -> Option<&CardSet> {
        self.current_set.and_then(|index| self.sets.get(index))
    }

    pub fn current_card_index(&self) -> usize {
        self.current_card
    }

    pub fn current_card(&self) -> Option<&Card> {
        self.active_set()
            .and_then(|set| set.cards.get(self.current_card))
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn editing(&self) -> Option<usize> {
        self.editing
    }

    pub fn edit_buffers(&self) -> &EditBuffers {
        &self.buffers
    }

    pub fn edit_buffers_mut(&mut self) -> &mut EditBuffers {
        &mut self.buffers
    }

    /// Creates an empty local-only set and returns its index.
    pub fn create_set(&mut self, name: impl Into<String>) -> usize {
        self.sets.push(CardSet {
            name: name.into(),
            cards: Vec::new(),
            owner_id: LOCAL_OWNER.to_string(),
        });
        self.sets.len() - 1
    }

    /// Replaces every set with the server's collection.
    pub async fn load_from_server(&mut self, auth: &mut AuthManager) -> Result<(), DeckError> {
        let response = auth.authenticated_empty(Method::GET, CARDS_PATH).await?;
        let remote: Vec<RemoteCard> = response.json()?;
        log::debug!("Loaded {} cards from the server.", remote.len());
        let cards: Vec<Card> = remote.into_iter().map(Card::from).collect();
        self.sets = vec![CardSet::server(cards)];
        // The server set is the only one left.
        self.current_set = Some(0);
        self.editing = None;
        self.clamp_cursor();
        Ok(())
    }

    /// Adds a card. Logged in, the server creates it and it goes to the
    /// front of the server set. Logged out, it is appended to the active set.
    pub async fn add_card(
        &mut self,
        auth: &mut AuthManager,
        japanese: &str,
        english: &str,
    ) -> Result<(), DeckError> {
        if auth.is_logged_in() {
            let payload = CardPayload {
                front: japanese,
                back: english,
            };
            let response = auth
                .authenticated_request(Method::POST, CARDS_PATH, Some(&payload))
                .await?;
            let envelope: CardEnvelope = response.json()?;
            let card = Card::from(envelope.into_result()?);
            if self.sets.is_empty() {
                self.sets.push(CardSet::server(Vec::new()));
            }
            let shifted = !self.sets[0].cards.is_empty();
            self.sets[0].cards.insert(0, card);
            // Keep the edit and the cursor on the cards they pointed at.
            if self.current_set.unwrap_or(0) == 0 {
                self.editing = self.editing.map(|editing| editing + 1);
            }
            if shifted && self.current_set == Some(0) {
                self.current_card += 1;
            }
        } else {
            let index = self.current_set.ok_or(DeckError::NoActiveSet)?;
            let set = self
                .sets
                .get_mut(index)
                .ok_or(DeckError::NoSuchSet(index))?;
            set.cards.push(Card::local(japanese, english));
        }
        Ok(())
    }

    /// Deletes a card from the active set. Logged in, a card without a
    /// remote id is left alone.
    pub async fn delete_card(
        &mut self,
        auth: &mut AuthManager,
        index: usize,
    ) -> Result<(), DeckError> {
        let set_index = self.current_set.unwrap_or(0);
        let remote_id = self.card(set_index, index)?.remote_id;
        if auth.is_logged_in() {
            let Some(id) = remote_id else {
                log::warn!("Card #{index} has no remote id; not deleting.");
                return Ok(());
            };
            auth.authenticated_empty(Method::DELETE, &card_path(id))
                .await?;
        }
        self.sets[set_index].cards.remove(index);
        self.editing = match self.editing {
            Some(editing) if editing == index => None,
            Some(editing) if editing > index => Some(editing - 1),
            other => other,
        };
        self.clamp_cursor();
        Ok(())
    }

    pub fn start_edit(&mut self, index: usize) -> Result<(), DeckError> {
        let set_index = self.current_set.unwrap_or(0);
        let card = self.card(set_index, index)?;
        self.buffers = EditBuffers {
            japanese: card.japanese.clone(),
            english: card.english.clone(),
        };
        self.editing = Some(index);
        Ok(())
    }

    /// Commits the edit buffers, trimmed. If the server rejects the change
    /// the edit stays open.
    pub async fn save_edit(&mut self, auth: &mut AuthManager) -> Result<(), DeckError> {
        let Some(index) = self.editing else {
            return Ok(());
        };
        let set_index = self.current_set.unwrap_or(0);
        let remote_id = self.card(set_index, index)?.remote_id;
        let japanese = self.buffers.japanese.trim().to_string();
        let english = self.buffers.english.trim().to_string();
        let updated = match remote_id {
            Some(id) if auth.is_logged_in() => {
                let payload = CardPayload {
                    front: &japanese,
                    back: &english,
                };
                let response = auth
                    .authenticated_request(Method::PATCH, &card_path(id), Some(&payload))
                    .await?;
                let envelope: CardEnvelope = response.json()?;
                Card::from(envelope.into_result()?)
            }
            _ => Card {
                japanese,
                english,
                remote_id,
            },
        };
        let card = self
            .sets
            .get_mut(set_index)
            .and_then(|set| set.cards.get_mut(index))
            .ok_or(DeckError::NoSuchCard(index))?;
        *card = updated;
        self.editing = None;
        Ok(())
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    pub fn select_set(&mut self, index: usize) -> Result<(), DeckError> {
        if index >= self.sets.len() {
            return Err(DeckError::NoSuchSet(index));
        }
        self.current_set = Some(index);
        self.current_card = 0;
        self.flipped = false;
        Ok(())
    }

    pub fn exit_set(&mut self) {
        self.current_set = None;
    }

    pub fn next_card(&mut self) {
        self.flipped = false;
        let count = self.active_len();
        if count > 0 {
            self.current_card = (self.current_card + 1) % count;
        }
    }

    pub fn prev_card(&mut self) {
        self.flipped = false;
        let count = self.active_len();
        if count > 0 {
            self.current_card = (self.current_card + count - 1) % count;
        }
    }

    pub fn flip(&mut self) {
        self.flipped = !self.flipped;
    }

    fn active_len(&self) -> usize {
        self.active_set().map_or(0, |set| set.cards.len())
    }

    fn card(&self, set_index: usize, index: usize) -> Result<&Card, DeckError> {
        let set = self
            .sets
            .get(set_index)
            .ok_or(DeckError::NoSuchSet(set_index))?;
        set.cards.get(index).ok_or(DeckError::NoSuchCard(index))
    }

    fn clamp_cursor(&mut self) {
        let count = self.active_len();
        if count == 0 {
            self.current_card = 0;
        } else if self.current_card >= count {
            self.current_card = count - 1;
        }
    }
}
