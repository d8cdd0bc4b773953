use crate::{MediaItem, Playback, RequestError, Timestamp};

/// Whether an operation actually modified the playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Changed,
    Unchanged,
}

/// A room's media items along with what is loaded and how far it got.
///
/// Every operation keeps `playback` pointing at a valid index of `media`,
/// or at nothing when `media` is empty.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Playlist {
    pub media: Vec<MediaItem>,
    pub playback: Playback,
}

impl Playlist {
    /// Appends an item, loading it if it is the first one
    pub fn add(&mut self, item: MediaItem) {
        if self.media.is_empty() {
            self.playback = Playback::load(0);
        }

        self.media.push(item);
    }

    /// Loads the item of the given id, paused at its beginning
    pub fn load(&mut self, id: &str) -> Result<(), RequestError> {
        let index = self
            .index_of(id)
            .ok_or_else(|| RequestError::client_confused("Chosen media item does not exist"))?;

        self.playback = Playback::load(index);
        Ok(())
    }

    /// Plays the loaded item since `start`, which may be in the future to schedule playback
    pub fn play(&mut self, start: Timestamp) -> Result<(), RequestError> {
        let loaded = self
            .playback
            .loaded()
            .ok_or_else(|| RequestError::client_confused("No media item to play"))?;

        self.playback = Playback::Playing { loaded, start };
        Ok(())
    }

    /// Pauses the loaded item `offset` ms in
    pub fn pause(&mut self, offset: f64) -> Result<(), RequestError> {
        if offset < 0. {
            return Err(RequestError::client_error(
                "Value for 'paused' cannot be negative",
            ));
        }

        let loaded = self
            .playback
            .loaded()
            .ok_or_else(|| RequestError::client_confused("No media item to pause"))?;

        self.playback = Playback::Paused { loaded, offset };
        Ok(())
    }

    /// Swaps two items so `before` ends up in front of `after`.
    ///
    /// Nothing happens if either item is gone or the order is already right, so a
    /// lagging client repeating the request is harmless.
    pub fn rearrange(&mut self, before: &str, after: &str) -> Result<Change, RequestError> {
        if before == after {
            return Err(RequestError::client_error("Cannot rearrange the same item"));
        }

        let (Some(before_index), Some(after_index)) = (self.index_of(before), self.index_of(after))
        else {
            return Ok(Change::Unchanged);
        };

        if before_index < after_index {
            return Ok(Change::Unchanged);
        }

        self.media.swap(before_index, after_index);

        // The loaded item follows its slot
        if let Some(loaded) = self.playback.loaded() {
            if loaded == before_index {
                self.playback = self.playback.with_loaded(after_index);
            } else if loaded == after_index {
                self.playback = self.playback.with_loaded(before_index);
            }
        }

        Ok(Change::Changed)
    }

    /// Removes an item, keeping the loaded index on the same item where possible
    pub fn remove(&mut self, id: &str) -> Change {
        let Some(index) = self.index_of(id) else {
            // Already removed
            return Change::Unchanged;
        };

        self.media.remove(index);

        if self.media.is_empty() {
            self.playback = Playback::Unloaded;
            return Change::Changed;
        }

        match self.playback.loaded() {
            // Load whatever took its place, or the new last item
            Some(loaded) if loaded == index => {
                self.playback = Playback::load(index.min(self.media.len() - 1));
            }
            Some(loaded) if index < loaded => {
                self.playback = self.playback.with_loaded(loaded - 1);
            }
            _ => {}
        }

        Change::Changed
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.media.iter().position(|item| item.id == id)
    }

    /// Returns the currently loaded item, if any
    pub fn loaded_item(&self) -> Option<&MediaItem> {
        self.playback.loaded().and_then(|i| self.media.get(i))
    }
}
