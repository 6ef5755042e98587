/// Free stack of reusable scratch lists.
///
/// Released lists are cleared, not freed, so per-frame cascades stop
/// allocating once the pool is warm. Borrow/return pairing is caller
/// discipline; the scheduler is single-threaded.
pub struct ListPool<T> {
  free: Vec<Vec<T>>,
}

impl<T> Default for ListPool<T> {
  fn default() -> Self {
    ListPool { free: Vec::new() }
  }
}

impl<T> ListPool<T> {
  pub fn new() -> Self {
    ListPool::default()
  }

  pub fn acquire(&mut self) -> Vec<T> {
    self.free.pop().unwrap_or_default()
  }

  pub fn release(&mut self, mut list: Vec<T>) {
    list.clear();
    self.free.push(list);
  }

  /// Number of lists currently sitting in the pool.
  pub fn idle(&self) -> usize {
    self.free.len()
  }
}
