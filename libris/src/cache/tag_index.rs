use crate::{exchange::OperationKey, Tag};
use std::collections::{HashMap, HashSet};

/// Maps each tag to the cache keys whose results provide it.
#[derive(Debug, Default)]
pub struct TagIndex {
    by_tag: HashMap<Tag, HashSet<OperationKey>>
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: &OperationKey, tags: &[Tag]) {
        for tag in tags {
            self.by_tag
                .entry(tag.clone())
                .and_modify(|entry| {
                    entry.insert(key.clone());
                })
                .or_insert_with(|| {
                    let mut set = HashSet::with_capacity(1);
                    set.insert(key.clone());
                    set
                });
        }
    }

    pub fn unregister(&mut self, key: &OperationKey, tags: &[Tag]) {
        for tag in tags {
            let now_empty = match self.by_tag.get_mut(tag) {
                Some(keys) => {
                    keys.remove(key);
                    keys.is_empty()
                }
                None => false
            };
            if now_empty {
                self.by_tag.remove(tag);
            }
        }
    }

    /// Every key that provides at least one of `tags`.
    pub fn lookup<'a, I>(&self, tags: I) -> HashSet<OperationKey>
    where
        I: IntoIterator<Item = &'a Tag>
    {
        let mut keys = HashSet::new();
        for tag in tags {
            if let Some(keys_for_tag) = self.by_tag.get(tag) {
                keys.extend(keys_for_tag.iter().cloned());
            }
        }
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_tag.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::operation_key;

    fn key(n: u32) -> OperationKey {
        operation_key("GetBook", &n).unwrap()
    }

    #[test]
    fn looks_up_keys_across_tags() {
        let mut index = TagIndex::new();
        index.register(&key(1), &[Tag::list("book"), Tag::id("book", "a")]);
        index.register(&key(2), &[Tag::id("book", "a")]);
        index.register(&key(3), &[Tag::list("borrow")]);

        let keys = index.lookup(&[Tag::id("book", "a")]);
        assert_eq!(keys, vec![key(1), key(2)].into_iter().collect());

        let keys = index.lookup(&[Tag::list("book"), Tag::list("borrow")]);
        assert_eq!(keys, vec![key(1), key(3)].into_iter().collect());

        assert!(index.lookup(&[Tag::id("book", "b")]).is_empty());
    }

    #[test]
    fn unregister_drops_empty_tags() {
        let mut index = TagIndex::new();
        let tags = [Tag::list("book")];
        index.register(&key(1), &tags);
        index.unregister(&key(1), &tags);
        assert!(index.is_empty());
    }
}
