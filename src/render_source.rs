use log::debug;

use crate::store::DisplaySubset;

/// Identifies a subscription for `RenderSource::unsubscribe`.
pub type SubscriptionId = u64;

type Subscriber = Box<dyn FnMut(&DisplaySubset)>;

/// Holds the trees that are drawn. Every replacement of the contents is pushed synchronously to
/// all subscribers, in subscription order.
pub struct RenderSource {
  contents: DisplaySubset,
  subscribers: Vec<(SubscriptionId, Subscriber)>,
  next_id: SubscriptionId,
  version: u64,
}

impl RenderSource {
  #[must_use]
  pub fn new(initial: DisplaySubset) -> Self {
    Self {
      contents: initial,
      subscribers: Vec::new(),
      next_id: 0,
      version: 0,
    }
  }

  #[must_use]
  pub fn contents(&self) -> &DisplaySubset {
    &self.contents
  }

  /// Incremented once per `replace_contents`.
  #[must_use]
  pub fn version(&self) -> u64 {
    self.version
  }

  /// Registers a callback for future replacements. It is not called with the current contents.
  pub fn subscribe(&mut self, subscriber: impl FnMut(&DisplaySubset) + 'static) -> SubscriptionId {
    let id = self.next_id;
    self.next_id += 1;
    self.subscribers.push((id, Box::new(subscriber)));
    id
  }

  /// Returns false if there was no such subscription.
  pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
    let before = self.subscribers.len();
    self.subscribers.retain(|(sid, _)| *sid != id);
    before != self.subscribers.len()
  }

  /// Swaps in `contents` as a whole and notifies the subscribers.
  pub fn replace_contents(&mut self, contents: DisplaySubset) {
    self.contents = contents;
    self.version += 1;
    debug!(
      "Render source v{}: {} trees, notifying {} subscribers",
      self.version,
      self.contents.count(),
      self.subscribers.len()
    );
    for (_, subscriber) in &mut self.subscribers {
      subscriber(&self.contents);
    }
  }
}

impl std::fmt::Debug for RenderSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RenderSource")
      .field("count", &self.contents.count())
      .field("subscribers", &self.subscribers.len())
      .field("version", &self.version)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, rc::Rc, sync::Arc};

  use super::*;
  use crate::store::{RawRow, RecordStore, build_store};

  fn store() -> Arc<RecordStore> {
    let rows = (0..4)
      .map(|i| RawRow {
        line: i + 2,
        address: format!("Carrer {i}"),
        scientific_name: format!("Species {i}"),
        longitude: "2.1".to_string(),
        latitude: "41.4".to_string(),
      })
      .collect();
    Arc::new(build_store(rows).unwrap())
  }

  #[test]
  fn notifies_all_subscribers_in_order() {
    let store = store();
    let mut source = RenderSource::new(DisplaySubset::all(store.clone()));
    let seen = Rc::new(RefCell::new(Vec::new()));

    let first = seen.clone();
    source.subscribe(move |subset| first.borrow_mut().push(("first", subset.count())));
    let second = seen.clone();
    source.subscribe(move |subset| second.borrow_mut().push(("second", subset.count())));

    assert!(seen.borrow().is_empty());
    source.replace_contents(DisplaySubset::empty(store.clone()));
    assert_eq!(*seen.borrow(), vec![("first", 0), ("second", 0)]);
    assert_eq!(source.version(), 1);
    assert!(source.contents().is_empty());
  }

  #[test]
  fn subscribers_see_new_contents() {
    let store = store();
    let mut source = RenderSource::new(DisplaySubset::empty(store.clone()));
    let last = Rc::new(RefCell::new(None));
    let sink = last.clone();
    source.subscribe(move |subset| *sink.borrow_mut() = Some(subset.clone()));

    let all = DisplaySubset::all(store);
    source.replace_contents(all.clone());
    assert_eq!(last.borrow().as_ref(), Some(&all));
    assert_eq!(source.contents(), &all);
  }

  #[test]
  fn unsubscribe() {
    let store = store();
    let mut source = RenderSource::new(DisplaySubset::empty(store.clone()));
    let calls = Rc::new(RefCell::new(0));
    let counter = calls.clone();
    let id = source.subscribe(move |_| *counter.borrow_mut() += 1);

    source.replace_contents(DisplaySubset::all(store.clone()));
    assert!(source.unsubscribe(id));
    assert!(!source.unsubscribe(id));
    source.replace_contents(DisplaySubset::empty(store));
    assert_eq!(*calls.borrow(), 1);
    assert_eq!(source.version(), 2);
  }
}
