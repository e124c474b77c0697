use std::sync::Arc;

use smallvec::SmallVec;

use super::subject_subscription::Conduit;
use crate::{subscriber::Completion, subscription::Registry};

pub(crate) type Record<O, E> = Arc<dyn Conduit<O, E>>;

/// The records of a subject, addressed by id.
///
/// Broadcasting happens on a snapshot taken under the subject lock and
/// delivered after the lock is released, so records may cancel (and remove
/// themselves) or subscribers may send again while a broadcast is running.
pub(crate) struct Subscribers<O, E> {
  pub(crate) inner: Registry<Record<O, E>>,
}

impl<O, E> Default for Subscribers<O, E> {
  fn default() -> Self { Self { inner: Registry::default() } }
}

pub(crate) type Snapshot<O, E> = SmallVec<[Record<O, E>; 2]>;

impl<O, E> Subscribers<O, E> {
  #[inline]
  pub(crate) fn reserve_id(&mut self) -> usize { self.inner.reserve_id() }

  #[inline]
  pub(crate) fn insert(&mut self, id: usize, record: Record<O, E>) { self.inner.insert(id, record) }

  #[inline]
  pub(crate) fn remove(&mut self, id: usize) -> Option<Record<O, E>> { self.inner.remove(id) }

  #[inline]
  pub(crate) fn len(&self) -> usize { self.inner.len() }

  pub(crate) fn snapshot(&self) -> Snapshot<O, E> { self.inner.iter().cloned().collect() }

  /// Empties the registry, handing back every record for the final signal.
  pub(crate) fn take_all(&mut self) -> Snapshot<O, E> { self.inner.drain().collect() }
}

/// Offers `value` to every record, cloning for all but the last one.
pub(crate) fn broadcast_value<O: Clone, E>(records: Snapshot<O, E>, value: O) {
  let mut iter = records.into_iter().peekable();
  while let Some(record) = iter.next() {
    if iter.peek().is_some() {
      record.offer(value.clone());
    } else {
      record.offer(value);
      break;
    }
  }
}

pub(crate) fn broadcast_completion<O, E: Clone>(
  records: Snapshot<O, E>,
  completion: Completion<E>,
) {
  let mut iter = records.into_iter().peekable();
  while let Some(record) = iter.next() {
    if iter.peek().is_some() {
      record.finish(completion.clone());
    } else {
      record.finish(completion);
      break;
    }
  }
}
