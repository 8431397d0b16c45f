//! Card synchronization store.
//!
//! [`CardStore`] owns the client-side view of the cards table: an ordered
//! collection (newest first), an optional selection, and a [`StoreStatus`]
//! published on a `watch` channel for passive observers.
//!
//! Every remote-touching operation follows the same shape: mark loading,
//! await the remote call, then mutate the collection synchronously. On
//! failure the collection is left as it was, the full error is logged, and a
//! generic message is placed in `StoreStatus::error`. Mutations additionally
//! return the error; `fetch_all` only reports it through the status.
//!
//! All operations take `&mut self`, so one store never interleaves two
//! mutations. Separate stores (or processes) writing the same card are not
//! coordinated: the last response wins.

use std::sync::Arc;

use tokio::sync::watch;

use crate::card::mapping::{card_from_row, new_card_to_row, patch_to_row};
use crate::card::{Card, CardField, CardPatch, NewCard};
use crate::error::RemoteError;
use crate::remote::{Filter, Order, Query, RemoteService};

pub const DEFAULT_CARDS_TABLE: &str = "cards";

const LOAD_FAILED: &str = "Failed to load cards";
const CREATE_FAILED: &str = "Failed to create card";
const UPDATE_FAILED: &str = "Failed to update card";
const DELETE_FAILED: &str = "Failed to delete card";
const NOT_FOUND: &str = "Card not found";

/// Status flags for UI binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStatus {
    /// A remote call is in flight.
    pub is_loading: bool,
    /// User-facing message from the last failed operation.
    pub error: Option<String>,
    /// Incremented whenever the collection or the selection changes.
    pub revision: u64,
}

/// Client-side card collection mirrored against a [`RemoteService`].
pub struct CardStore<R: RemoteService> {
    remote: Arc<R>,
    table: String,
    cards: Vec<Card>,
    selected_id: Option<String>,
    status: watch::Sender<StoreStatus>,
}

impl<R: RemoteService> CardStore<R> {
    pub fn new(remote: Arc<R>) -> Self {
        Self::with_table(remote, DEFAULT_CARDS_TABLE)
    }

    pub fn with_table(remote: Arc<R>, table: impl Into<String>) -> Self {
        let (status, _) = watch::channel(StoreStatus::default());
        Self {
            remote,
            table: table.into(),
            cards: Vec::new(),
            selected_id: None,
            status,
        }
    }

    /// Cards, newest first after a fetch or insert.
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn get(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected_id.as_deref()
    }

    /// The selected card, or `None` if nothing is selected or the selected id
    /// no longer exists.
    pub fn selected_card(&self) -> Option<&Card> {
        self.selected_id.as_deref().and_then(|id| self.get(id))
    }

    /// Select a card by id. The id is not checked against the collection.
    pub fn select(&mut self, id: impl Into<String>) {
        self.selected_id = Some(id.into());
        self.bump_revision();
    }

    pub fn clear_selection(&mut self) {
        if self.selected_id.take().is_some() {
            self.bump_revision();
        }
    }

    pub fn status(&self) -> StoreStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StoreStatus> {
        self.status.subscribe()
    }

    pub fn clear_error(&mut self) {
        self.status.send_if_modified(|s| s.error.take().is_some());
    }

    fn bump_revision(&self) {
        self.status.send_modify(|s| s.revision += 1);
    }

    fn begin(&self) {
        self.status.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });
    }

    fn succeed(&self, changed: bool) {
        self.status.send_modify(|s| {
            s.is_loading = false;
            if changed {
                s.revision += 1;
            }
        });
    }

    fn fail(&self, message: &str, operation: &str, error: &RemoteError) {
        tracing::error!(table = %self.table, operation, error = ?error, "{message}");
        self.status.send_modify(|s| {
            s.is_loading = false;
            s.error = Some(message.to_string());
        });
    }

    /// Replace the collection with every remote card, newest first.
    ///
    /// On failure the previous collection is kept and `status().error` is
    /// set. Returns whether the refresh succeeded.
    pub async fn fetch_all(&mut self) -> bool {
        self.begin();
        match self.fetch_remote().await {
            Ok(mut cards) => {
                // Stable: rows with equal timestamps keep the remote order.
                cards.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                tracing::debug!(table = %self.table, count = cards.len(), "fetched cards");
                self.cards = cards;
                self.succeed(true);
                true
            }
            Err(e) => {
                self.fail(LOAD_FAILED, "fetch", &e);
                false
            }
        }
    }

    /// Rows that do not decode are skipped so one malformed row cannot hide
    /// the rest of the table.
    async fn fetch_remote(&self) -> Result<Vec<Card>, RemoteError> {
        let query = Query::new().order(Order::desc(CardField::CreatedAt.remote_column()));
        let rows = self.remote.select(&self.table, &query).await?;
        let mut cards = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.get(CardField::Id.remote_column()).cloned();
            match card_from_row(row) {
                Ok(card) => cards.push(card),
                Err(e) => tracing::warn!(
                    table = %self.table,
                    id = ?id,
                    error = %e,
                    "skipping undecodable card row"
                ),
            }
        }
        Ok(cards)
    }

    /// Create a card remotely and prepend the persisted row.
    pub async fn insert(&mut self, card: NewCard) -> Result<Card, RemoteError> {
        self.begin();
        match self.insert_remote(&card).await {
            Ok(created) => {
                tracing::info!(table = %self.table, id = %created.id, "created card");
                self.cards.retain(|c| c.id != created.id);
                self.cards.insert(0, created.clone());
                self.succeed(true);
                Ok(created)
            }
            Err(e) => {
                self.fail(CREATE_FAILED, "insert", &e);
                Err(e)
            }
        }
    }

    async fn insert_remote(&self, card: &NewCard) -> Result<Card, RemoteError> {
        let row = new_card_to_row(card)?;
        let created = self.remote.insert(&self.table, row).await?;
        card_from_row(created)
    }

    /// Send the fields present in `patch` and overwrite the local entry with
    /// the persisted row.
    ///
    /// If the card is not in the local collection the response is discarded
    /// and the persisted card is still returned. An empty patch makes no
    /// remote call.
    pub async fn update(&mut self, id: &str, patch: CardPatch) -> Result<Card, RemoteError> {
        if patch.is_empty() {
            return match self.get(id) {
                Some(card) => Ok(card.clone()),
                None => {
                    let e = RemoteError::NotFound;
                    self.fail(NOT_FOUND, "update", &e);
                    Err(e)
                }
            };
        }

        self.begin();
        match self.update_remote(id, &patch).await {
            Ok(updated) => {
                let changed = match self.cards.iter_mut().find(|c| c.id == updated.id) {
                    Some(slot) => {
                        *slot = updated.clone();
                        true
                    }
                    None => {
                        tracing::debug!(id, "updated card is not loaded locally");
                        false
                    }
                };
                tracing::info!(table = %self.table, id, "updated card");
                self.succeed(changed);
                Ok(updated)
            }
            Err(e) => {
                let message = if e.is_not_found() { NOT_FOUND } else { UPDATE_FAILED };
                self.fail(message, "update", &e);
                Err(e)
            }
        }
    }

    async fn update_remote(&self, id: &str, patch: &CardPatch) -> Result<Card, RemoteError> {
        let row = patch_to_row(patch)?;
        let filters = [Filter::eq(CardField::Id.remote_column(), id)];
        let updated = self
            .remote
            .update(&self.table, &filters, row)
            .await?
            .into_iter()
            .next()
            .ok_or(RemoteError::NotFound)?;
        card_from_row(updated)
    }

    /// Delete a card remotely, then drop it locally and clear a matching
    /// selection. Deleting an unknown id succeeds without changes.
    pub async fn delete(&mut self, id: &str) -> Result<(), RemoteError> {
        self.begin();
        let filters = [Filter::eq(CardField::Id.remote_column(), id)];
        match self.remote.delete(&self.table, &filters).await {
            Ok(()) => {
                let before = self.cards.len();
                self.cards.retain(|c| c.id != id);
                let mut changed = self.cards.len() != before;
                if self.selected_id.as_deref() == Some(id) {
                    self.selected_id = None;
                    changed = true;
                }
                tracing::info!(table = %self.table, id, "deleted card");
                self.succeed(changed);
                Ok(())
            }
            Err(e) => {
                self.fail(DELETE_FAILED, "delete", &e);
                Err(e)
            }
        }
    }
}
