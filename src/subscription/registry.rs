use smallvec::SmallVec;

/// Live entries keyed by ids that are handed out once and never reused.
///
/// Subjects file their subscriber records here and FlatMap its inner
/// subscriptions; an entry is dropped by id when it cancels or finishes.
/// An entry that has to know its own id before it is built takes one from
/// [`Registry::reserve_id`] and is stored later with [`Registry::insert`].
///
/// # Examples
///
/// ```rust
/// use rxflow::subscription::Registry;
///
/// let mut entries: Registry<&str> = Registry::default();
/// let a = entries.add("a");
/// let b = entries.reserve_id();
/// entries.insert(b, "b");
/// assert_eq!(entries.len(), 2);
///
/// assert_eq!(entries.remove(a), Some("a"));
/// assert_eq!(entries.get(b), Some(&"b"));
/// assert!(!entries.contains(a));
/// ```
pub struct Registry<U> {
  next_id: usize,
  items: SmallVec<[(usize, U); 2]>,
}

impl<U> Default for Registry<U> {
  fn default() -> Self { Self { next_id: 0, items: SmallVec::new() } }
}

impl<U> Registry<U> {
  #[inline]
  pub fn new() -> Self { Self::default() }

  /// Stores `item` under a fresh id.
  #[inline]
  pub fn add(&mut self, item: U) -> usize {
    let id = self.reserve_id();
    self.items.push((id, item));
    id
  }

  /// Takes an id without storing anything yet.
  #[inline]
  pub fn reserve_id(&mut self) -> usize {
    let id = self.next_id;
    self.next_id += 1;
    id
  }

  /// Stores `item` under an id from [`Registry::reserve_id`].
  #[inline]
  pub fn insert(&mut self, id: usize, item: U) { self.items.push((id, item)); }

  pub fn remove(&mut self, id: usize) -> Option<U> {
    self
      .items
      .iter()
      .position(|(i, _)| *i == id)
      .map(|pos| self.items.remove(pos).1)
  }

  #[inline]
  pub fn contains(&self, id: usize) -> bool { self.items.iter().any(|(i, _)| *i == id) }

  pub fn get(&self, id: usize) -> Option<&U> {
    self.items.iter().find(|(i, _)| *i == id).map(|(_, item)| item)
  }

  pub fn get_mut(&mut self, id: usize) -> Option<&mut U> {
    self
      .items
      .iter_mut()
      .find(|(i, _)| *i == id)
      .map(|(_, item)| item)
  }

  #[inline]
  pub fn len(&self) -> usize { self.items.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  /// Empties the registry, oldest entry first.
  #[inline]
  pub fn drain(&mut self) -> impl Iterator<Item = U> + '_ {
    self.items.drain(..).map(|(_, item)| item)
  }

  #[inline]
  pub fn iter(&self) -> impl Iterator<Item = &U> { self.items.iter().map(|(_, item)| item) }

  #[inline]
  pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut U> {
    self.items.iter_mut().map(|(_, item)| item)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ids_are_never_reused() {
    let mut reg = Registry::new();
    let a = reg.add(1);
    reg.remove(a);
    let b = reg.add(2);
    assert_ne!(a, b);
  }

  #[test]
  fn keeps_insertion_order() {
    let mut reg = Registry::new();
    for v in 0..5 {
      reg.add(v);
    }
    reg.remove(2);
    assert_eq!(reg.iter().copied().collect::<Vec<_>>(), vec![0, 1, 3, 4]);
    assert_eq!(reg.drain().count(), 4);
    assert!(reg.is_empty());
  }

  #[test]
  fn reserved_id_is_addressable_after_insert() {
    let mut reg = Registry::new();
    let id = reg.reserve_id();
    assert!(!reg.contains(id));
    reg.insert(id, "late");
    *reg.get_mut(id).unwrap() = "updated";
    assert_eq!(reg.get(id), Some(&"updated"));
  }
}
