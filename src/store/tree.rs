// src/store/tree.rs
//
// Order-statistics treap backing one leaderboard: a binary search tree over
// (score DESC, player ASC) keys, heap-ordered by a deterministic per-key
// priority, with subtree sizes maintained so rank and select run in
// O(log n) expected time and ordered range scans in O(log n + k).

use std::cmp::Ordering;

use crate::models::PlayerId;

/// Ordering key for ranked entries: higher scores first, ties broken by the
/// lexicographically smaller player id. Iteration order equals rank order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryKey {
    pub score: i64,
    pub player: PlayerId,
}

impl Ord for EntryKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then_with(|| self.player.cmp(&other.player))
    }
}

impl PartialOrd for EntryKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug)]
struct Node {
    key: EntryKey,
    prio: u64,
    size: usize,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
}

impl Node {
    fn leaf(key: EntryKey, prio: u64) -> Box<Node> {
        Box::new(Node { key, prio, size: 1, left: None, right: None })
    }

    fn update(&mut self) {
        self.size = 1 + size(&self.left) + size(&self.right);
    }
}

fn size(link: &Option<Box<Node>>) -> usize {
    link.as_ref().map_or(0, |n| n.size)
}

/// Deterministic heap priority: FNV-1a over the player id mixed with the
/// score through a splitmix64 finalizer. Stable across runs, so tests and
/// rebuilds shape identical trees.
fn priority(key: &EntryKey) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for b in key.player.as_str().bytes() {
        h ^= b as u64;
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    let mut z = h ^ (key.score as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

fn rotate_right(mut n: Box<Node>) -> Box<Node> {
    // Caller guarantees n.left is populated.
    let mut l = n.left.take().unwrap();
    n.left = l.right.take();
    n.update();
    l.right = Some(n);
    l.update();
    l
}

fn rotate_left(mut n: Box<Node>) -> Box<Node> {
    let mut r = n.right.take().unwrap();
    n.right = r.left.take();
    n.update();
    r.left = Some(n);
    r.update();
    r
}

fn insert_node(link: Option<Box<Node>>, key: EntryKey, prio: u64) -> Box<Node> {
    let Some(mut n) = link else {
        return Node::leaf(key, prio);
    };
    if key < n.key {
        n.left = Some(insert_node(n.left.take(), key, prio));
        n.update();
        if n.left.as_ref().map_or(0, |c| c.prio) > n.prio {
            n = rotate_right(n);
        }
    } else {
        n.right = Some(insert_node(n.right.take(), key, prio));
        n.update();
        if n.right.as_ref().map_or(0, |c| c.prio) > n.prio {
            n = rotate_left(n);
        }
    }
    n
}

fn merge(a: Option<Box<Node>>, b: Option<Box<Node>>) -> Option<Box<Node>> {
    match (a, b) {
        (None, b) => b,
        (a, None) => a,
        (Some(mut a), Some(mut b)) => {
            if a.prio >= b.prio {
                a.right = merge(a.right.take(), Some(b));
                a.update();
                Some(a)
            } else {
                b.left = merge(Some(a), b.left.take());
                b.update();
                Some(b)
            }
        }
    }
}

fn remove_node(link: Option<Box<Node>>, key: &EntryKey) -> (Option<Box<Node>>, bool) {
    let Some(mut n) = link else {
        return (None, false);
    };
    match key.cmp(&n.key) {
        Ordering::Less => {
            let (left, removed) = remove_node(n.left.take(), key);
            n.left = left;
            n.update();
            (Some(n), removed)
        }
        Ordering::Greater => {
            let (right, removed) = remove_node(n.right.take(), key);
            n.right = right;
            n.update();
            (Some(n), removed)
        }
        Ordering::Equal => (merge(n.left.take(), n.right.take()), true),
    }
}

fn collect<'a>(
    node: Option<&'a Node>,
    skip: &mut usize,
    limit: usize,
    out: &mut Vec<&'a EntryKey>,
) {
    let Some(n) = node else { return };
    if out.len() == limit {
        return;
    }
    let left_size = size(&n.left);
    if *skip >= left_size {
        // The whole left subtree falls inside the skipped prefix.
        *skip -= left_size;
    } else {
        collect(n.left.as_deref(), skip, limit, out);
    }
    if out.len() == limit {
        return;
    }
    if *skip > 0 {
        *skip -= 1;
    } else {
        out.push(&n.key);
    }
    collect(n.right.as_deref(), skip, limit, out);
}

/// The ordered ranking structure. Keys are unique; callers remove a player's
/// old key before inserting the repositioned one.
#[derive(Debug, Default)]
pub struct RankTree {
    root: Option<Box<Node>>,
}

impl RankTree {
    pub fn new() -> Self {
        Self { root: None }
    }

    pub fn len(&self) -> usize {
        size(&self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn insert(&mut self, key: EntryKey) {
        let prio = priority(&key);
        self.root = Some(insert_node(self.root.take(), key, prio));
    }

    pub fn remove(&mut self, key: &EntryKey) -> bool {
        let (root, removed) = remove_node(self.root.take(), key);
        self.root = root;
        removed
    }

    /// 1-based rank of an exact key: the count of entries ordered strictly
    /// before it, plus one.
    pub fn rank_of(&self, key: &EntryKey) -> Option<u64> {
        let mut node = self.root.as_deref();
        let mut before = 0usize;
        while let Some(n) = node {
            match key.cmp(&n.key) {
                Ordering::Less => node = n.left.as_deref(),
                Ordering::Equal => return Some((before + size(&n.left) + 1) as u64),
                Ordering::Greater => {
                    before += size(&n.left) + 1;
                    node = n.right.as_deref();
                }
            }
        }
        None
    }

    /// The key at a 1-based rank.
    pub fn select(&self, rank: u64) -> Option<&EntryKey> {
        if rank == 0 {
            return None;
        }
        let mut remaining = rank as usize;
        let mut node = self.root.as_deref();
        while let Some(n) = node {
            let left = size(&n.left);
            if remaining <= left {
                node = n.left.as_deref();
            } else if remaining == left + 1 {
                return Some(&n.key);
            } else {
                remaining -= left + 1;
                node = n.right.as_deref();
            }
        }
        None
    }

    /// Keys at ranks `offset+1 ..= offset+limit`, in rank order.
    pub fn range(&self, offset: usize, limit: usize) -> Vec<&EntryKey> {
        let available = self.len().saturating_sub(offset);
        let mut out = Vec::with_capacity(limit.min(available));
        let mut skip = offset;
        collect(self.root.as_deref(), &mut skip, limit, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    use super::*;

    fn key(score: i64, player: &str) -> EntryKey {
        EntryKey { score, player: PlayerId::from(player) }
    }

    fn keys(tree: &RankTree) -> Vec<(i64, String)> {
        tree.range(0, tree.len())
            .into_iter()
            .map(|k| (k.score, k.player.as_str().to_string()))
            .collect()
    }

    #[test]
    fn test_orders_by_score_desc_then_player_asc() {
        let mut tree = RankTree::new();
        tree.insert(key(100, "carol"));
        tree.insert(key(300, "alice"));
        tree.insert(key(100, "bob"));
        tree.insert(key(200, "dave"));

        assert_eq!(
            keys(&tree),
            vec![
                (300, "alice".to_string()),
                (200, "dave".to_string()),
                (100, "bob".to_string()),
                (100, "carol".to_string()),
            ]
        );
    }

    #[test]
    fn test_rank_and_select_round_trip() {
        let mut tree = RankTree::new();
        for (score, player) in [(50, "a"), (40, "b"), (30, "c"), (20, "d"), (10, "e")] {
            tree.insert(key(score, player));
        }

        for rank in 1..=5u64 {
            let k = tree.select(rank).cloned().unwrap();
            assert_eq!(tree.rank_of(&k), Some(rank));
        }
        assert_eq!(tree.select(0), None);
        assert_eq!(tree.select(6), None);
        assert_eq!(tree.rank_of(&key(99, "nobody")), None);
    }

    #[test]
    fn test_remove_closes_rank_gaps() {
        let mut tree = RankTree::new();
        for (score, player) in [(30, "a"), (20, "b"), (10, "c")] {
            tree.insert(key(score, player));
        }

        assert!(tree.remove(&key(20, "b")));
        assert!(!tree.remove(&key(20, "b")));
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.rank_of(&key(10, "c")), Some(2));
    }

    #[test]
    fn test_range_skips_and_limits() {
        let mut tree = RankTree::new();
        for i in 1..=20i64 {
            tree.insert(key(1000 - i, &format!("p{:02}", i)));
        }

        let page = tree.range(10, 5);
        let scores: Vec<i64> = page.iter().map(|k| k.score).collect();
        assert_eq!(scores, vec![989, 988, 987, 986, 985]);

        assert!(tree.range(20, 5).is_empty());
        assert_eq!(tree.range(18, 5).len(), 2);
    }

    #[test]
    fn test_matches_sorted_reference_under_shuffled_inserts() {
        let mut reference: Vec<EntryKey> =
            (0..500).map(|i| key((i % 37) * 10, &format!("player-{:03}", i))).collect();
        let mut inserts = reference.clone();
        let mut rng = StdRng::seed_from_u64(42);
        inserts.shuffle(&mut rng);

        let mut tree = RankTree::new();
        for k in inserts {
            tree.insert(k);
        }
        reference.sort();

        assert_eq!(tree.len(), reference.len());
        for (i, expected) in reference.iter().enumerate() {
            assert_eq!(tree.select((i + 1) as u64), Some(expected));
            assert_eq!(tree.rank_of(expected), Some((i + 1) as u64));
        }

        // Remove every third entry and re-check ordering.
        for k in reference.iter().step_by(3) {
            assert!(tree.remove(k));
        }
        let survivors: Vec<&EntryKey> =
            reference.iter().enumerate().filter(|(i, _)| i % 3 != 0).map(|(_, k)| k).collect();
        assert_eq!(tree.len(), survivors.len());
        for (i, expected) in survivors.iter().enumerate() {
            assert_eq!(tree.select((i + 1) as u64), Some(*expected));
        }
    }
}
