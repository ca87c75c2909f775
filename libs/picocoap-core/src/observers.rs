//! Observer registry
//!
//! Fixed-capacity table of active subscriptions.
//!
//! # Design
//!
//! Observers live in a slot array. A handle is the pair (slot, generation);
//! freeing a slot bumps its generation, so a handle kept by a pending
//! notification can never remove a later subscription that reused the slot.
//! Entries never move, which makes [`ObserverRegistry::next`] resumable after
//! the entry it just returned has been unregistered.

use crate::error::ServerError;
use crate::protocol::{ContentFormat, Remote, Token};
use crate::resource::ResourceId;

/// Handle to one registered observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ObserverHandle {
    slot: u16,
    generation: u16,
}

impl ObserverHandle {
    pub const fn slot(self) -> usize {
        self.slot as usize
    }
}

impl core::fmt::Display for ObserverHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.slot, self.generation)
    }
}

/// Iteration position for [`ObserverRegistry::next`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor(usize);

impl Cursor {
    pub const START: Cursor = Cursor(0);
}

/// A subscription of one remote endpoint to one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observer {
    pub remote: Remote,
    pub token: Token,
    pub resource: ResourceId,
    pub content_format: ContentFormat,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Slot {
    generation: u16,
    observer: Option<Observer>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverRegistry<const MAX_OBSERVERS: usize> {
    slots: [Slot; MAX_OBSERVERS],
}

impl<const MAX_OBSERVERS: usize> Default for ObserverRegistry<MAX_OBSERVERS> {
    fn default() -> Self {
        Self {
            slots: core::array::from_fn(|_| Slot::default()),
        }
    }
}

impl<const MAX_OBSERVERS: usize> ObserverRegistry<MAX_OBSERVERS> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer
    ///
    /// An existing subscription of the same remote to the same resource is
    /// replaced in place and keeps its handle.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::MaxObserversReached` when every slot is taken.
    pub fn register(&mut self, observer: Observer) -> Result<ObserverHandle, ServerError> {
        if let Some(handle) = self.find(&observer.remote, observer.resource) {
            self.slots[handle.slot()].observer = Some(observer);
            return Ok(handle);
        }

        let index = self
            .slots
            .iter()
            .position(|s| s.observer.is_none())
            .ok_or(ServerError::MaxObserversReached {
                max_observers: MAX_OBSERVERS,
            })?;

        let slot = &mut self.slots[index];
        slot.observer = Some(observer);
        Ok(ObserverHandle {
            slot: index as u16,
            generation: slot.generation,
        })
    }

    /// Remove the observer behind `handle`
    pub fn unregister(&mut self, handle: ObserverHandle) -> Result<Observer, ServerError> {
        let slot = self
            .slots
            .get_mut(handle.slot())
            .filter(|s| s.generation == handle.generation)
            .ok_or(ServerError::ObserverNotFound)?;
        let observer = slot.observer.take().ok_or(ServerError::ObserverNotFound)?;
        slot.generation = slot.generation.wrapping_add(1);
        Ok(observer)
    }

    /// Remove every subscription held by `remote`. Returns how many were removed.
    pub fn unregister_remote(&mut self, remote: &Remote) -> usize {
        let mut removed = 0;
        for slot in self.slots.iter_mut() {
            if slot.observer.as_ref().is_some_and(|o| o.remote == *remote) {
                slot.observer = None;
                slot.generation = slot.generation.wrapping_add(1);
                removed += 1;
            }
        }
        removed
    }

    /// Handle of the subscription of `remote` to `resource`
    pub fn find(&self, remote: &Remote, resource: ResourceId) -> Option<ObserverHandle> {
        self.slots.iter().enumerate().find_map(|(index, slot)| {
            slot.observer
                .as_ref()
                .filter(|o| o.remote == *remote && o.resource == resource)
                .map(|_| ObserverHandle {
                    slot: index as u16,
                    generation: slot.generation,
                })
        })
    }

    pub fn get(&self, handle: ObserverHandle) -> Option<&Observer> {
        self.slots
            .get(handle.slot())
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.observer.as_ref())
    }

    /// Next observer of `resource` at or after `cursor`
    ///
    /// Returns the observer with its handle and the cursor to resume from.
    /// Unregistering the returned observer before the next call is allowed.
    pub fn next(
        &self,
        cursor: Cursor,
        resource: ResourceId,
    ) -> Option<(ObserverHandle, &Observer, Cursor)> {
        self.slots
            .iter()
            .enumerate()
            .skip(cursor.0)
            .find_map(|(index, slot)| {
                slot.observer
                    .as_ref()
                    .filter(|o| o.resource == resource)
                    .map(|o| {
                        let handle = ObserverHandle {
                            slot: index as u16,
                            generation: slot.generation,
                        };
                        (handle, o, Cursor(index + 1))
                    })
            })
    }

    /// Number of observers of `resource`
    pub fn count(&self, resource: ResourceId) -> usize {
        self.iter().filter(|(_, o)| o.resource == resource).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObserverHandle, &Observer)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.observer.as_ref().map(|o| {
                (
                    ObserverHandle {
                        slot: index as u16,
                        generation: slot.generation,
                    },
                    o,
                )
            })
        })
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.observer.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == MAX_OBSERVERS
    }

    pub const fn capacity(&self) -> usize {
        MAX_OBSERVERS
    }
}
