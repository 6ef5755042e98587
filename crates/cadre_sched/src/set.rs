/// Index-stable collection backing one callback registry.
///
/// Items keep their slot index until removed, so owners can cache it.
/// Removal outside a traversal swaps the last occupied slot into the
/// vacated one and reports the moved item; removal during a traversal
/// leaves a hole in place so the in-flight pass can skip it without
/// any slot it has not yet visited being moved. Holes are reclaimed by
/// [`garbage_collect`](SlotList::garbage_collect).
pub struct SlotList<T> {
  slots: Vec<Option<T>>,
  holes: usize,
  looping: bool,
}

impl<T> Default for SlotList<T> {
  fn default() -> Self {
    SlotList {
      slots: Vec::new(),
      holes: 0,
      looping: false,
    }
  }
}

impl<T> SlotList<T> {
  pub fn new() -> Self {
    SlotList::default()
  }

  /// Physical length, the upper bound a traversal iterates to.
  #[inline]
  pub fn len(&self) -> usize {
    self.slots.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.slots.len() == self.holes
  }

  /// Number of occupied slots.
  #[inline]
  pub fn live(&self) -> usize {
    self.slots.len() - self.holes
  }

  #[inline]
  pub fn get(&self, index: usize) -> Option<&T> {
    self.slots.get(index).and_then(|slot| slot.as_ref())
  }

  pub fn add(&mut self, item: T) -> usize {
    self.slots.push(Some(item));
    self.slots.len() - 1
  }

  pub fn begin_loop(&mut self) {
    assert!(!self.looping, "traversal already active");
    self.looping = true;
  }

  pub fn end_loop(&mut self) {
    assert!(self.looping, "no active traversal");
    self.looping = false;
  }

  /// Removes the item at `index`.
  ///
  /// Outside a traversal this is a swap-removal: the last occupied
  /// item moves into `index` and is returned so the caller can update
  /// its cached slot, or `None` if `index` was the last occupied slot.
  /// During a traversal the slot is vacated in place and `None` is
  /// returned; nothing moves.
  ///
  /// Panics if `index` is out of range or already vacant.
  pub fn delete_by_index(&mut self, index: usize) -> Option<&T> {
    assert!(index < self.slots.len(), "slot {index} out of range");
    assert!(self.slots[index].is_some(), "slot {index} already vacant");

    if self.looping {
      self.slots[index] = None;
      self.holes += 1;
      return None;
    }

    // drop trailing holes so the swap partner is occupied
    while matches!(self.slots.last(), Some(None)) {
      self.slots.pop();
      self.holes -= 1;
    }

    if index + 1 == self.slots.len() {
      self.slots.pop();
      None
    } else {
      let last = self.slots.pop().unwrap();
      self.slots[index] = last;
      self.slots[index].as_ref()
    }
  }

  /// Compacts holes left by removals that happened during traversals,
  /// pulling the last occupied slot into each hole. Every move is
  /// reported through `on_moved(&item, new_index)` so cached slots can
  /// be repaired. No-op when there are no holes.
  ///
  /// Panics if a traversal is active.
  pub fn garbage_collect(&mut self, mut on_moved: impl FnMut(&T, usize)) {
    assert!(!self.looping, "garbage_collect during active traversal");
    if self.holes == 0 {
      return;
    }

    let mut index = 0;
    while index < self.slots.len() {
      if self.slots[index].is_some() {
        index += 1;
        continue;
      }
      while matches!(self.slots.last(), Some(None)) {
        self.slots.pop();
      }
      if index >= self.slots.len() {
        break;
      }
      let last = self.slots.pop().unwrap();
      self.slots[index] = last;
      on_moved(self.slots[index].as_ref().unwrap(), index);
      index += 1;
    }
    self.holes = 0;
  }

  /// Resets to empty without releasing capacity.
  pub fn clear(&mut self) {
    assert!(!self.looping, "clear during active traversal");
    self.slots.clear();
    self.holes = 0;
  }
}
