//! Per-channel duplicate detection for one run
//!
//! State lives only as long as the registry value; nothing is persisted.

use crate::types::Channel;
use std::collections::{HashMap, HashSet};

/// Admits each `(channel, image_id)` pair at most once
#[derive(Debug, Default)]
pub struct DedupRegistry {
    seen: HashMap<Channel, HashSet<String>>,
}

impl DedupRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the channel's slot if it does not exist yet
    pub fn ensure_channel(&mut self, channel: &Channel) {
        if !self.seen.contains_key(channel) {
            self.seen.insert(channel.clone(), HashSet::new());
        }
    }

    /// Record `image_id` for `channel`
    ///
    /// Returns `false` for an empty id or one already admitted for this channel.
    pub fn admit(&mut self, channel: &Channel, image_id: &str) -> bool {
        if image_id.is_empty() {
            return false;
        }
        self.ensure_channel(channel);
        self.seen
            .get_mut(channel)
            .is_some_and(|ids| ids.insert(image_id.to_string()))
    }

    /// Forget an admitted id so a later run can admit it again
    ///
    /// Returns whether the id was recorded.
    pub fn release(&mut self, channel: &Channel, image_id: &str) -> bool {
        self.seen
            .get_mut(channel)
            .is_some_and(|ids| ids.remove(image_id))
    }

    /// Whether the pair was already admitted
    pub fn contains(&self, channel: &Channel, image_id: &str) -> bool {
        self.seen
            .get(channel)
            .is_some_and(|ids| ids.contains(image_id))
    }

    /// Number of ids admitted for `channel`
    pub fn seen_count(&self, channel: &Channel) -> usize {
        self.seen.get(channel).map_or(0, HashSet::len)
    }

    /// Whether the channel has a slot
    pub fn has_channel(&self, channel: &Channel) -> bool {
        self.seen.contains_key(channel)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn channel(name: &str) -> Channel {
        Channel::new(name).unwrap()
    }

    #[test]
    fn test_admit_once_per_channel() {
        let mut registry = DedupRegistry::new();
        let cats = channel("cats");

        assert!(registry.admit(&cats, "abc123"));
        assert!(!registry.admit(&cats, "abc123"));
        assert!(!registry.admit(&cats, "abc123"));
        assert!(registry.admit(&cats, "def456"));
        assert_eq!(registry.seen_count(&cats), 2);
        assert!(registry.contains(&cats, "abc123"));
    }

    #[test]
    fn test_channels_are_independent() {
        let mut registry = DedupRegistry::new();
        let cats = channel("cats");
        let dogs = channel("dogs");

        assert!(registry.admit(&cats, "abc123"));
        assert!(registry.admit(&dogs, "abc123"));
        assert!(!registry.contains(&dogs, "zzz"));
        assert_eq!(registry.seen_count(&cats), 1);
        assert_eq!(registry.seen_count(&dogs), 1);
    }

    #[test]
    fn test_release_allows_readmission() {
        let mut registry = DedupRegistry::new();
        let cats = channel("cats");
        let dogs = channel("dogs");

        assert!(!registry.release(&cats, "abc123"));
        assert!(registry.admit(&cats, "abc123"));
        assert!(registry.release(&cats, "abc123"));
        assert!(!registry.contains(&cats, "abc123"));
        assert!(registry.admit(&cats, "abc123"));
        assert!(!registry.release(&dogs, "abc123"));
    }

    #[test]
    fn test_empty_id_rejected_and_not_recorded() {
        let mut registry = DedupRegistry::new();
        let cats = channel("cats");

        assert!(!registry.admit(&cats, ""));
        assert_eq!(registry.seen_count(&cats), 0);
    }

    #[test]
    fn test_ensure_channel_is_lazy_and_idempotent() {
        let mut registry = DedupRegistry::new();
        let cats = channel("cats");
        assert!(!registry.has_channel(&cats));

        registry.ensure_channel(&cats);
        registry.admit(&cats, "abc");
        registry.ensure_channel(&cats);

        assert!(registry.has_channel(&cats));
        assert_eq!(registry.seen_count(&cats), 1);
    }
}
