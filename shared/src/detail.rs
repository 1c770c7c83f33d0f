use std::collections::BTreeSet;

use tracing::debug;

use crate::model::{ImageId, Item, ItemId};
use crate::AppError;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DetailPhase {
    #[default]
    Closed,
    Loading,
    Loaded(Box<Item>),
    Failed(AppError),
}

/// What the caller should do after asking for the dialog to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenDecision {
    Fetch { id: ItemId, generation: u64 },
    AlreadyFetched,
    AuthRequired,
}

/// State behind the item detail dialog.
///
/// The id of the last fetch is remembered so repeated opens with the same id
/// do not refetch. Closing forgets it and bumps the generation, which also
/// invalidates any response still in flight.
#[derive(Debug, Default)]
pub struct DetailController {
    open: bool,
    target: Option<ItemId>,
    fetched: Option<ItemId>,
    generation: u64,
    phase: DetailPhase,
    hidden_images: BTreeSet<ImageId>,
}

impl DetailController {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn target(&self) -> Option<ItemId> {
        self.target
    }

    pub fn phase(&self) -> &DetailPhase {
        &self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_image_hidden(&self, id: ImageId) -> bool {
        self.hidden_images.contains(&id)
    }

    pub fn open(&mut self, id: ItemId, authenticated: bool) -> OpenDecision {
        if !authenticated {
            self.close();
            return OpenDecision::AuthRequired;
        }

        self.open = true;
        self.target = Some(id);

        if self.fetched == Some(id) {
            debug!(%id, "detail already fetched");
            return OpenDecision::AlreadyFetched;
        }

        self.begin_fetch(id)
    }

    /// Force a fresh fetch of the current target.
    pub fn retry(&mut self) -> Option<OpenDecision> {
        if !self.open {
            return None;
        }
        let id = self.target?;
        Some(self.begin_fetch(id))
    }

    fn begin_fetch(&mut self, id: ItemId) -> OpenDecision {
        self.generation += 1;
        self.fetched = Some(id);
        self.phase = DetailPhase::Loading;
        self.hidden_images.clear();
        OpenDecision::Fetch {
            id,
            generation: self.generation,
        }
    }

    pub fn close(&mut self) {
        self.open = false;
        self.target = None;
        self.fetched = None;
        self.generation += 1;
        self.phase = DetailPhase::Closed;
        self.hidden_images.clear();
    }

    /// Apply a fetch result. Returns false when it no longer matters.
    pub fn settle(&mut self, id: ItemId, generation: u64, outcome: Result<Item, AppError>) -> bool {
        if !self.open || generation != self.generation || self.target != Some(id) {
            debug!(%id, generation, current = self.generation, "dropping stale detail response");
            return false;
        }
        self.phase = match outcome {
            Ok(item) => DetailPhase::Loaded(Box::new(item)),
            Err(err) => DetailPhase::Failed(err),
        };
        true
    }

    pub fn hide_image(&mut self, id: ImageId) {
        self.hidden_images.insert(id);
    }
}
