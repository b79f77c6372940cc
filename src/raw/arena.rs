use alloc::vec::Vec;

use super::handle::Handle;

/// Slot storage with a free list and a per-slot generation counter.
///
/// The generation is bumped every time a slot is vacated, so a `(Handle, generation)` pair
/// taken before an element was freed never matches the slot again, even after the slot is
/// reused. Clearing the arena raises the starting generation of new slots above every
/// generation handed out so far, which keeps the guarantee across `clear`.
#[derive(Clone)]
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<Handle>,
    // Generation given to freshly pushed slots.
    floor: u32,
    // Highest generation any slot has reached.
    ceiling: u32,
}

#[derive(Clone)]
struct Slot<T> {
    generation: u32,
    element: Option<T>,
}

impl<T> Arena<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            floor: 0,
            ceiling: 0,
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            floor: 0,
            ceiling: 0,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub(crate) const fn len(&self) -> usize {
        self.slots.len().saturating_sub(self.free.len())
    }

    /// One past the highest slot index ever handed out.
    pub(crate) const fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn alloc(&mut self, element: T) -> Handle {
        if let Some(h) = self.free.pop() {
            // Reuse a free slot/handle; its generation was bumped when it was vacated.
            self.slots[h.to_index()].element = Some(element);
            h
        } else {
            assert!(
                self.slots.len() <= Handle::MAX,
                "`Arena::alloc()` - arena is at maximum capacity ({})",
                Handle::MAX
            );
            self.slots.push(Slot {
                generation: self.floor,
                element: Some(element),
            });
            Handle::from_index(self.slots.len() - 1)
        }
    }

    #[inline]
    pub(crate) fn get(&self, handle: Handle) -> &T {
        self.slots[handle.to_index()].element.as_ref().expect("`Arena::get()` - `handle` is invalid!")
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, handle: Handle) -> &mut T {
        self.slots[handle.to_index()].element.as_mut().expect("`Arena::get_mut()` - `handle` is invalid!")
    }

    /// Returns the current generation of the slot behind `handle`.
    #[inline]
    pub(crate) fn generation(&self, handle: Handle) -> u32 {
        self.slots[handle.to_index()].generation
    }

    /// Returns true if `handle` is occupied and was allocated in `generation`.
    pub(crate) fn contains(&self, handle: Handle, generation: u32) -> bool {
        self.slots
            .get(handle.to_index())
            .is_some_and(|slot| slot.generation == generation && slot.element.is_some())
    }

    pub(crate) fn take(&mut self, handle: Handle) -> T {
        let slot = &mut self.slots[handle.to_index()];
        let element = slot.element.take().expect("`Arena::take()` - `handle` is invalid!");
        slot.generation = slot.generation.wrapping_add(1);
        self.ceiling = self.ceiling.max(slot.generation);
        self.free.push(handle);
        element
    }

    /// Mutable references to every live element, in slot order.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (Handle, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| slot.element.as_mut().map(|element| (Handle::from_index(index), element)))
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.floor = self.ceiling.wrapping_add(1);
        self.ceiling = self.floor;
    }
}
