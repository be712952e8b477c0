//! Topic prefix index for publishers.
//!
//! Prefixes are kept in a `Vec` sorted by bytes, so a topic lookup is a
//! forward scan that stops at the first prefix greater than the topic.
//! Each prefix carries the set of subscriber peers that asked for it.

use bytes::Bytes;
use smallvec::SmallVec;

/// Identifier of a subscribing peer (its Transport handle value).
pub type PeerKey = u64;

#[derive(Debug, Clone)]
struct Entry {
    prefix: Bytes,
    /// Low fan-out is the common case; keep it inline.
    peers: SmallVec<[PeerKey; 4]>,
}

#[derive(Debug, Default)]
pub struct SubscriptionIndex {
    entries: Vec<Entry>,
}

impl SubscriptionIndex {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct prefixes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Register `prefix` for `peer`. An empty prefix matches every topic.
    pub fn subscribe(&mut self, peer: PeerKey, prefix: Bytes) {
        match self.entries.binary_search_by(|e| e.prefix.cmp(&prefix)) {
            Ok(idx) => {
                let peers = &mut self.entries[idx].peers;
                if !peers.contains(&peer) {
                    peers.push(peer);
                }
            }
            Err(idx) => {
                let mut peers = SmallVec::new();
                peers.push(peer);
                self.entries.insert(idx, Entry { prefix, peers });
            }
        }
    }

    /// Drop `prefix` for `peer`; unknown pairs are ignored.
    pub fn unsubscribe(&mut self, peer: PeerKey, prefix: &[u8]) {
        let Ok(idx) = self
            .entries
            .binary_search_by(|e| e.prefix.as_ref().cmp(prefix))
        else {
            return;
        };
        let peers = &mut self.entries[idx].peers;
        if let Some(pos) = peers.iter().position(|p| *p == peer) {
            peers.swap_remove(pos);
        }
        if peers.is_empty() {
            self.entries.remove(idx);
        }
    }

    /// Forget `peer` entirely (used when it disconnects).
    pub fn remove_peer(&mut self, peer: PeerKey) {
        self.entries.retain_mut(|e| {
            e.peers.retain(|p| *p != peer);
            !e.peers.is_empty()
        });
    }

    /// Deduplicated, sorted peers with at least one prefix of `topic`.
    #[must_use]
    pub fn match_topic(&self, topic: &[u8]) -> SmallVec<[PeerKey; 16]> {
        let mut out: SmallVec<[PeerKey; 16]> = SmallVec::new();

        for entry in &self.entries {
            let prefix = entry.prefix.as_ref();
            // Sorted order: nothing past here can be a prefix of `topic`.
            if prefix > topic {
                break;
            }
            if topic.starts_with(prefix) {
                out.extend_from_slice(&entry.peers);
            }
        }

        if out.len() > 1 {
            out.sort_unstable();
            out.dedup();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_and_match() {
        let mut idx = SubscriptionIndex::new();

        idx.subscribe(1, Bytes::from_static(b"A"));
        idx.subscribe(2, Bytes::from_static(b"AB"));
        idx.subscribe(3, Bytes::from_static(b"B"));

        assert_eq!(idx.match_topic(b"ABC").as_slice(), &[1, 2]);
        assert_eq!(idx.match_topic(b"BANANA").as_slice(), &[3]);
        assert!(idx.match_topic(b"C").is_empty());
    }

    #[test]
    fn empty_prefix_matches_everything() {
        let mut idx = SubscriptionIndex::new();
        idx.subscribe(9, Bytes::new());
        assert_eq!(idx.match_topic(b"").as_slice(), &[9]);
        assert_eq!(idx.match_topic(b"anything").as_slice(), &[9]);
    }

    #[test]
    fn nested_prefixes_are_deduplicated() {
        let mut idx = SubscriptionIndex::new();
        idx.subscribe(7, Bytes::from_static(b"A"));
        idx.subscribe(7, Bytes::from_static(b"AB"));
        assert_eq!(idx.match_topic(b"ABCD").as_slice(), &[7]);
    }

    #[test]
    fn unsubscribe_removes_empty_entries() {
        let mut idx = SubscriptionIndex::new();
        idx.subscribe(1, Bytes::from_static(b"A"));
        idx.unsubscribe(1, b"A");
        idx.unsubscribe(1, b"missing");
        assert!(idx.is_empty());
    }

    #[test]
    fn remove_peer_cleans_everywhere() {
        let mut idx = SubscriptionIndex::new();
        idx.subscribe(1, Bytes::from_static(b"A"));
        idx.subscribe(2, Bytes::from_static(b"A"));
        idx.subscribe(1, Bytes::from_static(b"AB"));

        idx.remove_peer(1);

        assert_eq!(idx.len(), 1);
        assert_eq!(idx.match_topic(b"ABCD").as_slice(), &[2]);
    }
}
