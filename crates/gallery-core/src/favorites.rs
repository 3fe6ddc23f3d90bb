//! Favorites cache and the per-identifier toggle lock.
//!
//! # Design
//! - The cache mirrors acknowledged server state only. A toggle takes a
//!   [`ToggleTicket`] before the request goes out and applies its mutation
//!   when the server acknowledges it; a failed request changes nothing.
//! - While a ticket for an identifier is outstanding, further toggles on that
//!   identifier are refused.
//! - Clearing the cache (logout, expiry) bumps a generation counter. Tickets
//!   from an older generation apply nothing when they finish, so favorites
//!   never leak into the next session.
//! - A refresh takes a [`RefreshMark`] before the list request goes out.
//!   Acknowledgments that land while it is in flight are logged and replayed
//!   on top of the fetched list, which may predate them. A refresh that
//!   started before an already applied one is discarded.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::Template;

/// A favorited identifier, with its catalog record when one was known.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Favorite {
    /// Template identifier.
    pub id: String,
    /// Template record for display; `None` when the catalog had no entry.
    pub template: Option<Template>,
}

impl From<Template> for Favorite {
    fn from(template: Template) -> Self {
        Self {
            id: template.id.clone(),
            template: Some(template),
        }
    }
}

/// Per-identifier lock state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleState {
    /// No request outstanding.
    #[default]
    Idle,
    /// An add request is in flight.
    PendingAdd,
    /// A remove request is in flight.
    PendingRemove,
}

/// Direction of a toggle, decided from local membership when it starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleIntent {
    /// The identifier was not a favorite.
    Add,
    /// The identifier was a favorite.
    Remove,
}

/// Result of a toggle as seen by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleOutcome {
    /// The server acknowledged an add.
    Added,
    /// The server acknowledged a remove.
    Removed,
    /// Another toggle for the identifier was still in flight; nothing was sent.
    Ignored,
}

/// Exclusive right to toggle one identifier. Consumed by
/// [`FavoritesCache::finish`].
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a ticket holds the toggle lock until it is finished"]
pub struct ToggleTicket {
    id: String,
    intent: ToggleIntent,
    generation: u64,
}

impl ToggleTicket {
    /// Identifier being toggled.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether this toggle adds or removes.
    #[must_use]
    pub const fn intent(&self) -> ToggleIntent {
        self.intent
    }
}

/// Position of a favorites refresh relative to sessions, other refreshes and
/// acknowledged toggles. Consumed by [`FavoritesCache::apply_refresh`] or
/// [`FavoritesCache::abandon_refresh`].
#[derive(Debug, PartialEq, Eq)]
#[must_use = "an outstanding refresh keeps acknowledgments logged until it is applied or abandoned"]
pub struct RefreshMark {
    generation: u64,
    refresh: u64,
    ack_seq: u64,
}

#[derive(Debug, Clone)]
struct Acknowledged {
    seq: u64,
    id: String,
    intent: ToggleIntent,
    record: Option<Template>,
}

/// Ordered favorites plus outstanding toggle locks.
#[derive(Debug, Default)]
pub struct FavoritesCache {
    entries: Vec<Favorite>,
    pending: HashMap<String, ToggleIntent>,
    generation: u64,
    acks: Vec<Acknowledged>,
    ack_seq: u64,
    refresh_seq: u64,
    applied_refresh: u64,
    refreshes_in_flight: usize,
}

impl FavoritesCache {
    /// Empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Favorites in display order.
    #[must_use]
    pub fn entries(&self) -> &[Favorite] {
        &self.entries
    }

    /// Favorited identifiers in display order.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.id.as_str()).collect()
    }

    /// Membership test against the local set.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    /// Number of favorites.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no favorites.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counter bumped by every [`FavoritesCache::clear`].
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether there is anything to clear: favorites or outstanding tickets.
    #[must_use]
    pub fn has_state(&self) -> bool {
        !self.entries.is_empty() || !self.pending.is_empty()
    }

    /// Replace the set with the server's list. Outstanding tickets are kept.
    pub fn replace(&mut self, templates: Vec<Template>) {
        let mut entries: Vec<Favorite> = Vec::with_capacity(templates.len());
        for template in templates {
            if entries.iter().any(|entry| entry.id == template.id) {
                tracing::warn!(template_id = %template.id, "duplicate favorite from server");
                continue;
            }
            entries.push(Favorite::from(template));
        }
        self.entries = entries;
    }

    /// Drop every favorite and invalidate outstanding tickets and refreshes.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.pending.clear();
        self.acks.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    /// Note that a favorites list request is about to go out.
    pub fn begin_refresh(&mut self) -> RefreshMark {
        self.refresh_seq += 1;
        self.refreshes_in_flight += 1;
        RefreshMark {
            generation: self.generation,
            refresh: self.refresh_seq,
            ack_seq: self.ack_seq,
        }
    }

    /// Replace the set with `templates` fetched under `mark`, then replay the
    /// acknowledgments that landed after the mark. Returns `false`, leaving
    /// the set alone, when the session changed or a newer refresh already
    /// applied.
    pub fn apply_refresh(&mut self, mark: RefreshMark, templates: Vec<Template>) -> bool {
        self.refreshes_in_flight = self.refreshes_in_flight.saturating_sub(1);
        let current = mark.generation == self.generation && mark.refresh > self.applied_refresh;
        if current {
            self.replace(templates);
            self.applied_refresh = mark.refresh;
            let replay: Vec<Acknowledged> = self
                .acks
                .iter()
                .filter(|ack| ack.seq > mark.ack_seq)
                .cloned()
                .collect();
            for ack in replay {
                tracing::debug!(
                    template_id = %ack.id,
                    intent = ?ack.intent,
                    "replaying acknowledged toggle"
                );
                self.apply_acknowledged(ack.id, ack.intent, ack.record);
            }
            self.acks.retain(|ack| ack.seq > mark.ack_seq);
        }
        self.forget_acks_when_idle();
        current
    }

    /// Release `mark` after its list request failed.
    pub fn abandon_refresh(&mut self, _mark: RefreshMark) {
        self.refreshes_in_flight = self.refreshes_in_flight.saturating_sub(1);
        self.forget_acks_when_idle();
    }

    fn forget_acks_when_idle(&mut self) {
        if self.refreshes_in_flight == 0 {
            self.acks.clear();
        }
    }

    /// Lock state for `id`.
    #[must_use]
    pub fn state(&self, id: &str) -> ToggleState {
        match self.pending.get(id) {
            None => ToggleState::Idle,
            Some(ToggleIntent::Add) => ToggleState::PendingAdd,
            Some(ToggleIntent::Remove) => ToggleState::PendingRemove,
        }
    }

    /// Whether a toggle for `id` is in flight.
    #[must_use]
    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    /// Take the toggle lock for `id`; `None` while another toggle holds it.
    pub fn begin_toggle(&mut self, id: &str) -> Option<ToggleTicket> {
        if self.is_pending(id) {
            return None;
        }
        let intent = if self.contains(id) {
            ToggleIntent::Remove
        } else {
            ToggleIntent::Add
        };
        self.pending.insert(id.to_string(), intent);
        Some(ToggleTicket {
            id: id.to_string(),
            intent,
            generation: self.generation,
        })
    }

    /// Release the lock held by `ticket`, applying its mutation when the
    /// server `acknowledged` it. `record` is the catalog entry to show for an
    /// added favorite. Returns whether the set changed.
    pub fn finish(&mut self, ticket: ToggleTicket, acknowledged: bool, record: Option<Template>) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!(template_id = %ticket.id, "discarding toggle from a previous session");
            return false;
        }
        self.pending.remove(&ticket.id);
        if !acknowledged {
            return false;
        }
        if self.refreshes_in_flight > 0 {
            self.ack_seq += 1;
            self.acks.push(Acknowledged {
                seq: self.ack_seq,
                id: ticket.id.clone(),
                intent: ticket.intent,
                record: record.clone(),
            });
        }
        self.apply_acknowledged(ticket.id, ticket.intent, record)
    }

    fn apply_acknowledged(
        &mut self,
        id: String,
        intent: ToggleIntent,
        record: Option<Template>,
    ) -> bool {
        match intent {
            ToggleIntent::Add => {
                if self.contains(&id) {
                    return false;
                }
                self.entries.push(Favorite {
                    id,
                    template: record,
                });
                true
            }
            ToggleIntent::Remove => {
                let before = self.entries.len();
                self.entries.retain(|entry| entry.id != id);
                before != self.entries.len()
            }
        }
    }
}
