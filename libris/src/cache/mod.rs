//! The query cache shared by a client and its cache exchange.
//!
//! A [`QueryCache`] is an ordinary value: the client builder creates one (or takes one you
//! created), the cache exchange writes to it, and it goes away with the last client handle.
//! Tests get their own instance instead of sharing global state.

mod tag_index;

use crate::{exchange::OperationKey, Tag};
use parking_lot::Mutex;
use std::{any::Any, collections::HashMap, sync::Arc};
pub use tag_index::TagIndex;

/// Lifecycle of a cache entry.
///
/// `Uninitialized -> Loading -> Ready | Errored`, back to `Loading` on a rerun, and
/// `Ready -> Stale` when a mutation invalidates one of the entry's tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryStatus {
    Uninitialized,
    Loading,
    Ready,
    Errored,
    Stale
}

/// What to do with an entry once nobody is subscribed to it anymore.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvictionPolicy {
    KeepUnused,
    EvictUnsubscribed
}

#[derive(Clone, Debug)]
pub struct CacheOptions {
    pub eviction: EvictionPolicy
}

impl Default for CacheOptions {
    fn default() -> Self {
        CacheOptions {
            eviction: EvictionPolicy::KeepUnused
        }
    }
}

struct CacheEntry {
    data: Option<Arc<dyn Any + Send + Sync>>,
    tags: Vec<Tag>,
    status: EntryStatus,
    // The invalidation epoch the current load started in
    loading_since: Option<u64>
}

impl CacheEntry {
    fn new() -> Self {
        CacheEntry {
            data: None,
            tags: Vec::new(),
            status: EntryStatus::Uninitialized,
            loading_since: None
        }
    }
}

#[derive(Default)]
struct Inner {
    entries: HashMap<OperationKey, CacheEntry>,
    tags: TagIndex,
    epoch: u64,
    // Invalidations a load that is still in flight may have missed
    missed: Vec<(u64, Vec<Tag>)>
}

impl Inner {
    /// Finish the load of `key`. Returns `true` if one of `tags` or the entry's previous tags
    /// was invalidated after the load started.
    fn settle(&mut self, key: &OperationKey, tags: &[Tag]) -> bool {
        let Inner { entries, missed, .. } = self;
        let invalidated = match entries.get_mut(key) {
            Some(entry) => match entry.loading_since.take() {
                Some(since) => missed.iter().any(|(epoch, invalidated)| {
                    *epoch > since
                        && invalidated
                            .iter()
                            .any(|tag| tags.contains(tag) || entry.tags.contains(tag))
                }),
                None => false
            },
            None => false
        };

        let oldest = entries
            .values()
            .filter_map(|entry| entry.loading_since)
            .min();
        match oldest {
            Some(oldest) => missed.retain(|(epoch, _)| *epoch > oldest),
            None => missed.clear()
        }
        invalidated
    }
}

#[derive(Default)]
pub struct QueryCache {
    inner: Mutex<Inner>,
    options: CacheOptions
}

impl QueryCache {
    pub fn new(options: CacheOptions) -> Self {
        QueryCache {
            inner: Mutex::new(Inner::default()),
            options
        }
    }

    pub fn status(&self, key: &OperationKey) -> EntryStatus {
        self.inner
            .lock()
            .entries
            .get(key)
            .map(|entry| entry.status)
            .unwrap_or(EntryStatus::Uninitialized)
    }

    /// The cached result for `key`, if it's `Ready`. Stale and errored entries are never served.
    pub fn get<R: Clone + 'static>(&self, key: &OperationKey) -> Option<R> {
        let inner = self.inner.lock();
        let entry = inner.entries.get(key)?;
        if entry.status != EntryStatus::Ready {
            return None;
        }
        entry
            .data
            .as_ref()
            .and_then(|data| data.downcast_ref::<R>())
            .cloned()
    }

    /// The last data written for `key`, whatever its status. Used to keep showing
    /// previous results while a rerun is loading.
    pub fn peek<R: Clone + 'static>(&self, key: &OperationKey) -> Option<R> {
        let inner = self.inner.lock();
        inner
            .entries
            .get(key)?
            .data
            .as_ref()
            .and_then(|data| data.downcast_ref::<R>())
            .cloned()
    }

    pub fn begin_loading(&self, key: &OperationKey) {
        let mut inner = self.inner.lock();
        let epoch = inner.epoch;
        let entry = inner
            .entries
            .entry(key.clone())
            .or_insert_with(CacheEntry::new);
        entry.status = EntryStatus::Loading;
        entry.loading_since.get_or_insert(epoch);
    }

    /// Store a successful result and replace the tags the entry provides.
    ///
    /// Returns `true` if a matching invalidation happened while the entry was loading. The
    /// data is stored anyway but the entry is left `Stale`, and the caller should rerun the query.
    pub fn write<R: Send + Sync + 'static>(
        &self,
        key: &OperationKey,
        data: R,
        tags: Vec<Tag>
    ) -> bool {
        let mut inner = self.inner.lock();
        let invalidated = inner.settle(key, &tags);
        let Inner { entries, tags: index, .. } = &mut *inner;
        let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::new);

        index.unregister(key, &entry.tags);
        index.register(key, &tags);
        tracing::trace!(
            %key,
            tags = %tags.iter().map(ToString::to_string).collect::<Vec<_>>().join(","),
            "cache entry written"
        );

        entry.data = Some(Arc::new(data));
        entry.tags = tags;
        if invalidated {
            tracing::debug!(%key, "result arrived after an invalidation, marking stale");
            entry.status = EntryStatus::Stale;
            true
        } else {
            entry.status = EntryStatus::Ready;
            false
        }
    }

    /// Record a failed load. Returns `true` if the entry was invalidated while it was loading.
    pub fn fail(&self, key: &OperationKey) -> bool {
        let mut inner = self.inner.lock();
        let invalidated = inner.settle(key, &[]);
        inner
            .entries
            .entry(key.clone())
            .or_insert_with(CacheEntry::new)
            .status = EntryStatus::Errored;
        invalidated
    }

    /// Give up on a load that will never settle. The entry goes back to `Stale` if it has
    /// data, `Uninitialized` otherwise.
    pub fn abandon(&self, key: &OperationKey) {
        let mut inner = self.inner.lock();
        inner.settle(key, &[]);
        if let Some(entry) = inner.entries.get_mut(key) {
            if entry.status == EntryStatus::Loading {
                entry.status = if entry.data.is_some() {
                    EntryStatus::Stale
                } else {
                    EntryStatus::Uninitialized
                };
            }
        }
    }

    /// Mark every settled entry providing one of `tags` as stale and return their keys.
    ///
    /// Entries that are still loading keep loading, but a result providing one of `tags` is
    /// marked stale as soon as it's written. See [`write`](#method.write).
    pub fn invalidate(&self, tags: &[Tag]) -> Vec<OperationKey> {
        let mut inner = self.inner.lock();
        let Inner {
            entries,
            tags: index,
            epoch,
            missed
        } = &mut *inner;

        *epoch += 1;
        if entries.values().any(|entry| entry.loading_since.is_some()) {
            missed.push((*epoch, tags.to_vec()));
        }

        let mut invalidated: Vec<OperationKey> = index
            .lookup(tags)
            .into_iter()
            .filter(|key| match entries.get_mut(key) {
                Some(entry)
                    if entry.status == EntryStatus::Ready
                        || entry.status == EntryStatus::Errored =>
                {
                    entry.status = EntryStatus::Stale;
                    true
                }
                _ => false
            })
            .collect();
        invalidated.sort_unstable();
        tracing::debug!(
            tags = %tags.iter().map(ToString::to_string).collect::<Vec<_>>().join(","),
            count = invalidated.len(),
            "invalidated cache entries"
        );
        invalidated
    }

    /// Called by the client when the last subscriber of `key` goes away.
    pub fn release(&self, key: &OperationKey) {
        if self.options.eviction == EvictionPolicy::EvictUnsubscribed {
            self.evict(key);
        }
    }

    pub fn evict(&self, key: &OperationKey) {
        let mut inner = self.inner.lock();
        let Inner { entries, tags, .. } = &mut *inner;
        if let Some(entry) = entries.remove(key) {
            tags.unregister(key, &entry.tags);
        }
    }

    pub fn tags_for(&self, key: &OperationKey) -> Vec<Tag> {
        self.inner
            .lock()
            .entries
            .get(key)
            .map(|entry| entry.tags.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry and tag.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.tags.clear();
        inner.missed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::operation_key;

    fn key(n: u32) -> OperationKey {
        operation_key("GetBooks", &n).unwrap()
    }

    #[test]
    fn follows_entry_lifecycle() {
        let cache = QueryCache::default();
        let key = key(1);
        assert_eq!(cache.status(&key), EntryStatus::Uninitialized);

        cache.begin_loading(&key);
        assert_eq!(cache.status(&key), EntryStatus::Loading);
        assert_eq!(cache.get::<String>(&key), None);

        assert!(!cache.write(&key, "first".to_string(), vec![Tag::list("book")]));
        assert_eq!(cache.status(&key), EntryStatus::Ready);
        assert_eq!(cache.get::<String>(&key).as_deref(), Some("first"));

        assert_eq!(cache.invalidate(&[Tag::list("book")]), vec![key.clone()]);
        assert_eq!(cache.status(&key), EntryStatus::Stale);
        assert_eq!(cache.get::<String>(&key), None, "Stale data was served");
        assert_eq!(cache.peek::<String>(&key).as_deref(), Some("first"));

        cache.begin_loading(&key);
        assert!(!cache.fail(&key));
        assert_eq!(cache.status(&key), EntryStatus::Errored);
        assert_eq!(cache.get::<String>(&key), None, "Errored entry was served");
    }

    #[test]
    fn rewriting_replaces_tags() {
        let cache = QueryCache::default();
        cache.write(&key(1), 1u32, vec![Tag::id("book", "a")]);
        cache.write(&key(1), 2u32, vec![Tag::id("book", "b")]);

        assert!(cache.invalidate(&[Tag::id("book", "a")]).is_empty());
        assert_eq!(cache.invalidate(&[Tag::id("book", "b")]), vec![key(1)]);
    }

    #[test]
    fn invalidation_while_loading_marks_the_result_stale() {
        let cache = QueryCache::default();
        let key = key(1);
        cache.write(&key, 1u32, vec![Tag::list("book")]);
        cache.begin_loading(&key);

        assert!(cache.invalidate(&[Tag::list("book")]).is_empty());
        assert_eq!(cache.status(&key), EntryStatus::Loading);

        assert!(cache.write(&key, 2u32, vec![Tag::list("book")]), "Invalidation was lost");
        assert_eq!(cache.status(&key), EntryStatus::Stale);
        assert_eq!(cache.get::<u32>(&key), None);
        assert_eq!(cache.peek::<u32>(&key), Some(2));

        // Consumed by the write, the next load settles normally
        cache.begin_loading(&key);
        assert!(!cache.write(&key, 3u32, vec![Tag::list("book")]));
        assert_eq!(cache.get::<u32>(&key), Some(3));
    }

    #[test]
    fn first_load_sees_invalidations_of_the_tags_it_provides() {
        let cache = QueryCache::default();
        cache.begin_loading(&key(1));
        cache.begin_loading(&key(2));

        cache.invalidate(&[Tag::list("book")]);

        assert!(cache.write(&key(1), 1u32, vec![Tag::list("book")]));
        assert_eq!(cache.status(&key(1)), EntryStatus::Stale);
        assert!(
            !cache.write(&key(2), 2u32, vec![Tag::list("borrow")]),
            "Unrelated load was invalidated"
        );
        assert_eq!(cache.status(&key(2)), EntryStatus::Ready);
    }

    #[test]
    fn invalidations_before_a_load_starts_dont_count() {
        let cache = QueryCache::default();
        cache.begin_loading(&key(1));
        cache.invalidate(&[Tag::list("book")]);

        cache.begin_loading(&key(2));
        assert!(!cache.write(&key(2), 2u32, vec![Tag::list("book")]));
        assert!(cache.write(&key(1), 1u32, vec![Tag::list("book")]));
    }

    #[test]
    fn failed_load_reports_pending_invalidation() {
        let cache = QueryCache::default();
        let key = key(1);
        cache.write(&key, 1u32, vec![Tag::list("book")]);
        cache.begin_loading(&key);
        cache.invalidate(&[Tag::list("book")]);

        assert!(cache.fail(&key));
        assert_eq!(cache.status(&key), EntryStatus::Errored);
    }

    #[test]
    fn abandoned_load_stops_holding_invalidations() {
        let cache = QueryCache::default();
        cache.begin_loading(&key(1));
        cache.abandon(&key(1));
        assert_eq!(cache.status(&key(1)), EntryStatus::Uninitialized);

        cache.write(&key(2), 2u32, vec![Tag::list("book")]);
        cache.begin_loading(&key(2));
        cache.abandon(&key(2));
        assert_eq!(cache.status(&key(2)), EntryStatus::Stale);
        assert_eq!(cache.peek::<u32>(&key(2)), Some(2));

        cache.invalidate(&[Tag::list("book")]);
        assert!(cache.inner.lock().missed.is_empty());
    }

    #[test]
    fn release_respects_eviction_policy() {
        let keep = QueryCache::default();
        keep.write(&key(1), 1u32, vec![Tag::list("book")]);
        keep.release(&key(1));
        assert_eq!(keep.len(), 1);

        let evict = QueryCache::new(CacheOptions {
            eviction: EvictionPolicy::EvictUnsubscribed
        });
        evict.write(&key(1), 1u32, vec![Tag::list("book")]);
        evict.release(&key(1));
        assert!(evict.is_empty());
        assert!(evict.invalidate(&[Tag::list("book")]).is_empty());
    }

    #[test]
    fn clear_drops_everything() {
        let cache = QueryCache::default();
        cache.write(&key(1), 1u32, vec![Tag::list("book")]);
        cache.write(&key(2), 2u32, vec![Tag::list("borrow")]);
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.tags_for(&key(1)).is_empty());
    }
}
