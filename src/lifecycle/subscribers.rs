use std::{collections::HashSet, sync::Arc};

/// Subscriber identities registered against one destination.
///
/// Membership is exact: an identity stays until it is removed, and adding it
/// again changes nothing.
#[derive(Debug, Default, Clone)]
pub struct SubscriberSet {
    members: HashSet<Arc<str>>,
}

impl SubscriberSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `id`. Returns `false` if it was already a member.
    pub fn insert(
        &mut self,
        id: &str,
    ) -> bool {
        if self.members.contains(id) {
            return false;
        }
        self.members.insert(Arc::from(id))
    }

    /// Removes `id`. Returns `false` if it was not a member.
    pub fn remove(
        &mut self,
        id: &str,
    ) -> bool {
        self.members.remove(id)
    }

    pub fn contains(
        &self,
        id: &str,
    ) -> bool {
        self.members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Sorted copy of the current members.
    pub fn snapshot(&self) -> Vec<Arc<str>> {
        let mut ids: Vec<Arc<str>> = self.members.iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<str>> {
        self.members.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_idempotent() {
        let mut set = SubscriberSet::new();
        assert!(set.insert("a"));
        assert!(!set.insert("a"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_remove_absent_member() {
        let mut set = SubscriberSet::new();
        set.insert("a");
        assert!(!set.remove("b"));
        assert!(set.remove("a"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let mut set = SubscriberSet::new();
        for id in ["c", "a", "b"] {
            set.insert(id);
        }
        let snapshot = set.snapshot();
        let ids: Vec<&str> = snapshot.iter().map(|s| &**s).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
