//! The stride node of the multibit trie.
//!
//! A node is one 8-bit level of the trie and holds two popcount-compressed
//! tables:
//!
//! - routes terminating in this stride, keyed by their base index (see
//!   [`crate::base_index`]), with values stored in ascending index order;
//! - children for the next stride, keyed by the raw octet, stored in
//!   ascending octet order.
//!
//! Neither table pre-allocates slots. The slot of a present entry is
//! `rank(index) - 1` in the companion bit-set, so memory stays proportional
//! to the actual content. The price is that the in-stride longest-prefix
//! match must backtrack through the complete binary tree of base indexes
//! instead of reading a fully allotted table; thanks to the heap layout the
//! backtracking is a right-shift loop of at most nine bit tests.

use std::net::{Ipv4Addr, Ipv6Addr};

use ipnet::{IpNet, Ipv4Net, Ipv6Net};

use crate::base_index::{
    base_index_to_prefix, host_range, octet_to_base_index, prefix_len_from_index,
    prefix_to_base_index, FIRST_HOST_INDEX, HOST_MASKS, LAST_HOST_INDEX, MAX_NODE_CHILDREN,
    MAX_NODE_PREFIXES,
};
use crate::bitset::BitSet;

#[derive(Clone, PartialEq, Eq)]
pub(crate) struct Node<V> {
    prefix_bits: BitSet,
    child_bits: BitSet,
    prefixes: Vec<V>,
    children: Vec<Box<Node<V>>>,
}

impl<V> Default for Node<V> {
    fn default() -> Self {
        Self {
            prefix_bits: BitSet::default(),
            child_bits: BitSet::default(),
            prefixes: Vec::new(),
            children: Vec::new(),
        }
    }
}

impl<V> Node<V> {
    /// True if the node holds neither routes nor children.
    pub(crate) fn is_empty(&self) -> bool {
        self.prefixes.is_empty() && self.children.is_empty()
    }

    /// Slot of the present base index `idx` in the prefix slice.
    #[inline(always)]
    fn prefix_rank(&self, idx: u16) -> usize {
        self.prefix_bits.rank(idx) - 1
    }

    /// Slot of the present `octet` in the child slice.
    #[inline(always)]
    fn child_rank(&self, octet: u8) -> usize {
        self.child_bits.rank(octet as u16) - 1
    }

    // ---------- routes ----------------------------------------------------

    /// Store `value` at base index `idx`, returning the replaced value if
    /// the route already existed.
    pub(crate) fn insert_prefix(&mut self, idx: u16, value: V) -> Option<V> {
        let old = if self.prefix_bits.test(idx) {
            let rank = self.prefix_rank(idx);
            Some(std::mem::replace(&mut self.prefixes[rank], value))
        } else {
            self.prefix_bits.set(idx);
            let rank = self.prefix_rank(idx);
            self.prefixes.insert(rank, value);
            None
        };
        debug_assert_eq!(self.prefixes.len(), self.prefix_bits.count());
        old
    }

    /// Remove the route at base index `idx`, compacting the backing
    /// storage.
    pub(crate) fn remove_prefix(&mut self, idx: u16) -> Option<V> {
        if !self.prefix_bits.test(idx) {
            return None;
        }
        let rank = self.prefix_rank(idx);
        let value = self.prefixes.remove(rank);
        self.prefix_bits.clear(idx);
        self.prefix_bits.compact();
        debug_assert_eq!(self.prefixes.len(), self.prefix_bits.count());
        Some(value)
    }

    /// Replace the route at `idx` with `f(Some(old))`, or insert
    /// `f(None)`. Returns the stored value and whether the route existed.
    pub(crate) fn update_prefix<F: FnOnce(Option<V>) -> V>(
        &mut self,
        idx: u16,
        f: F,
    ) -> (&mut V, bool) {
        let (rank, present) = if self.prefix_bits.test(idx) {
            let rank = self.prefix_rank(idx);
            let old = self.prefixes.remove(rank);
            self.prefixes.insert(rank, f(Some(old)));
            (rank, true)
        } else {
            let value = f(None);
            self.prefix_bits.set(idx);
            let rank = self.prefix_rank(idx);
            self.prefixes.insert(rank, value);
            (rank, false)
        };
        (&mut self.prefixes[rank], present)
    }

    /// The route at `idx`, inserting `default()` first if absent. Returns
    /// whether an insertion happened.
    pub(crate) fn get_or_insert_prefix_with<F: FnOnce() -> V>(
        &mut self,
        idx: u16,
        default: F,
    ) -> (&mut V, bool) {
        let inserted = if self.prefix_bits.test(idx) {
            false
        } else {
            self.prefix_bits.set(idx);
            let rank = self.prefix_rank(idx);
            self.prefixes.insert(rank, default());
            true
        };
        let rank = self.prefix_rank(idx);
        (&mut self.prefixes[rank], inserted)
    }

    /// The value stored at exactly `idx`.
    #[inline(always)]
    pub(crate) fn prefix(&self, idx: u16) -> Option<&V> {
        if self.prefix_bits.test(idx) {
            Some(&self.prefixes[self.prefix_rank(idx)])
        } else {
            None
        }
    }

    /// Mutable access to the value stored at exactly `idx`.
    pub(crate) fn prefix_mut(&mut self, idx: u16) -> Option<&mut V> {
        if self.prefix_bits.test(idx) {
            let rank = self.prefix_rank(idx);
            Some(&mut self.prefixes[rank])
        } else {
            None
        }
    }

    /// Longest-prefix match within this stride, starting at `idx`.
    ///
    /// Backtracking to the next less specific route is a shift in the
    /// complete binary tree; the cost is at most nine bit tests plus one
    /// rank on a hit.
    #[inline(always)]
    pub(crate) fn lpm(&self, mut idx: u16) -> Option<(u16, &V)> {
        while idx > 0 {
            if self.prefix_bits.test(idx) {
                return Some((idx, &self.prefixes[self.prefix_rank(idx)]));
            }
            idx >>= 1;
        }
        None
    }

    /// Like [`Node::lpm`], but only reports whether any match exists.
    /// Skips the rank, so the hot `contains` path stays bit tests only.
    #[inline(always)]
    pub(crate) fn lpm_test(&self, mut idx: u16) -> bool {
        while idx > 0 {
            if self.prefix_bits.test(idx) {
                return true;
            }
            idx >>= 1;
        }
        false
    }

    /// All present base indexes covering `idx`, in ascending order (least
    /// specific first).
    pub(crate) fn covering_indexes(&self, idx: u16) -> Vec<u16> {
        let mut result = Vec::new();
        if self.prefixes.is_empty() {
            return result;
        }
        let mut i = idx;
        while i > 0 {
            if self.prefix_bits.test(i) {
                result.push(i);
            }
            i >>= 1;
        }
        // collected along a strictly descending ancestor chain
        result.reverse();
        result
    }

    /// The smallest present base index `>= from`. Cursor form of the
    /// in-node iteration for iterators that must not borrow the node.
    pub(crate) fn next_prefix_index(&self, from: u16) -> Option<u16> {
        self.prefix_bits.next_set(from)
    }

    pub(crate) fn prefix_count(&self) -> usize {
        self.prefixes.len()
    }

    // ---------- children --------------------------------------------------

    /// Attach `child` at `octet`, replacing any existing child.
    pub(crate) fn insert_child(&mut self, octet: u8, child: Node<V>) {
        if self.child_bits.test(octet as u16) {
            let rank = self.child_rank(octet);
            self.children[rank] = Box::new(child);
        } else {
            self.child_bits.set(octet as u16);
            let rank = self.child_rank(octet);
            self.children.insert(rank, Box::new(child));
        }
        debug_assert_eq!(self.children.len(), self.child_bits.count());
    }

    /// Detach the child at `octet`. Removing a missing child is a no-op.
    pub(crate) fn remove_child(&mut self, octet: u8) {
        if !self.child_bits.test(octet as u16) {
            return;
        }
        let rank = self.child_rank(octet);
        self.children.remove(rank);
        self.child_bits.clear(octet as u16);
        self.child_bits.compact();
        debug_assert_eq!(self.children.len(), self.child_bits.count());
    }

    #[inline(always)]
    pub(crate) fn child(&self, octet: u8) -> Option<&Node<V>> {
        if self.child_bits.test(octet as u16) {
            Some(&self.children[self.child_rank(octet)])
        } else {
            None
        }
    }

    pub(crate) fn child_mut(&mut self, octet: u8) -> Option<&mut Node<V>> {
        if self.child_bits.test(octet as u16) {
            let rank = self.child_rank(octet);
            Some(&mut self.children[rank])
        } else {
            None
        }
    }

    /// The child at `octet`, creating an empty one if absent.
    pub(crate) fn get_or_insert_child(&mut self, octet: u8) -> &mut Node<V> {
        if !self.child_bits.test(octet as u16) {
            self.child_bits.set(octet as u16);
            let rank = self.child_rank(octet);
            self.children.insert(rank, Box::new(Node::default()));
        }
        let rank = self.child_rank(octet);
        &mut self.children[rank]
    }

    /// Ascending iterator over the present child octets.
    pub(crate) fn child_octets(&self) -> impl Iterator<Item = u8> + '_ {
        self.child_bits.iter().map(|i| i as u8)
    }

    /// The smallest present child octet `>= from` (as `u16`, so a cursor
    /// may run past octet 255).
    pub(crate) fn next_child_octet(&self, from: u16) -> Option<u8> {
        self.child_bits.next_set(from).map(|i| i as u8)
    }

    /// Decompose the node into its ordered parts for consuming iteration.
    pub(crate) fn into_parts(self) -> (Vec<u16>, Vec<V>, Vec<u8>, Vec<Box<Node<V>>>) {
        let indexes: Vec<u16> = self.prefix_bits.iter().collect();
        let octets: Vec<u8> = self.child_bits.iter().map(|i| i as u8).collect();
        (indexes, self.prefixes, octets, self.children)
    }

    // ---------- whole-subtree operations ----------------------------------

    /// Remove the route described by `octets`/`len_in_stride` from the
    /// subtree, pruning children that become empty on the way back up.
    pub(crate) fn remove_rec(
        &mut self,
        octets: &[u8],
        depth: usize,
        last_depth: usize,
        len_in_stride: u8,
    ) -> Option<V> {
        if depth == last_depth {
            return self.remove_prefix(prefix_to_base_index(octets[depth], len_in_stride));
        }
        let octet = octets[depth];
        let (removed, now_empty) = {
            let child = self.child_mut(octet)?;
            let removed = child.remove_rec(octets, depth + 1, last_depth, len_in_stride)?;
            (removed, child.is_empty())
        };
        if now_empty {
            self.remove_child(octet);
        }
        Some(removed)
    }

    /// True if any address is covered by routes of both `self` and
    /// `other`.
    ///
    /// The prefix sets are compared by expanding each route on the fly into
    /// the host indexes it covers (its allotment), turning the test into a
    /// set intersection. Both sets are consumed zig-zag so that a hit in
    /// either direction returns before the expansion completes. Children
    /// are then checked against the opposite allotment, and finally the
    /// test recurses for octets where both nodes have children.
    pub(crate) fn overlaps(&self, other: &Node<V>) -> bool {
        let mut self_allot = [false; MAX_NODE_PREFIXES];
        let mut other_allot = [false; MAX_NODE_PREFIXES];

        // 1. do any routes overlap?

        let self_has_routes = !self.prefixes.is_empty();
        let other_has_routes = !other.prefixes.is_empty();

        let mut self_cursor = 0u16;
        let mut other_cursor = 0u16;
        let mut self_ok = self_has_routes;
        let mut other_ok = other_has_routes;
        while self_ok || other_ok {
            if self_ok {
                match self.prefix_bits.next_set(self_cursor) {
                    Some(idx) => {
                        let (lo, hi) = host_range(idx);
                        for i in lo..=hi {
                            if other_allot[i as usize] {
                                return true;
                            }
                            self_allot[i as usize] = true;
                        }
                        self_cursor = idx + 1;
                    }
                    None => self_ok = false,
                }
            }
            if other_ok {
                match other.prefix_bits.next_set(other_cursor) {
                    Some(idx) => {
                        let (lo, hi) = host_range(idx);
                        for i in lo..=hi {
                            if self_allot[i as usize] {
                                return true;
                            }
                            other_allot[i as usize] = true;
                        }
                        other_cursor = idx + 1;
                    }
                    None => other_ok = false,
                }
            }
        }

        // the zig-zag early exit only sees routes added before the other
        // side finished, so finish with a full scan of the host indexes
        if self_has_routes && other_has_routes {
            for i in FIRST_HOST_INDEX..=LAST_HOST_INDEX {
                if self_allot[i as usize] && other_allot[i as usize] {
                    return true;
                }
            }
        }

        // 2. does any child fall under a route of the other node?

        let mut self_octets = [false; MAX_NODE_CHILDREN];
        let mut other_octets = [false; MAX_NODE_CHILDREN];

        let mut self_cursor = 0u16;
        let mut other_cursor = 0u16;
        let mut self_ok = !self.children.is_empty();
        let mut other_ok = !other.children.is_empty();
        while self_ok || other_ok {
            if self_ok {
                match self.child_bits.next_set(self_cursor) {
                    Some(octet) => {
                        if other_allot[(octet + FIRST_HOST_INDEX) as usize] {
                            return true;
                        }
                        self_octets[octet as usize] = true;
                        self_cursor = octet + 1;
                    }
                    None => self_ok = false,
                }
            }
            if other_ok {
                match other.child_bits.next_set(other_cursor) {
                    Some(octet) => {
                        if self_allot[(octet + FIRST_HOST_INDEX) as usize] {
                            return true;
                        }
                        other_octets[octet as usize] = true;
                        other_cursor = octet + 1;
                    }
                    None => other_ok = false,
                }
            }
        }

        // 3. recurse where both nodes have children

        if !self.children.is_empty() && !other.children.is_empty() {
            for octet in 0..MAX_NODE_CHILDREN {
                if self_octets[octet] && other_octets[octet] {
                    if let (Some(a), Some(b)) =
                        (self.child(octet as u8), other.child(octet as u8))
                    {
                        if a.overlaps(b) {
                            return true;
                        }
                    }
                }
            }
        }

        false
    }

    /// True if any route or child of this node overlaps the stride-local
    /// prefix `octet/len`.
    pub(crate) fn overlaps_prefix(&self, octet: u8, len: u8) -> bool {
        // 1. a less specific route covers the prefix
        let pfx_idx = prefix_to_base_index(octet, len);
        if self.lpm_test(pfx_idx) {
            return true;
        }

        let pfx_lo = octet_to_base_index(octet);
        let pfx_hi = octet_to_base_index(octet | HOST_MASKS[len as usize]);

        // 2. a more specific route falls inside the prefix; pfx_idx itself
        // was already tested above, so start below it
        let mut cursor = pfx_idx << 1;
        while let Some(idx) = self.prefix_bits.next_set(cursor) {
            let (lo, hi) = host_range(idx);
            if lo >= pfx_lo && hi <= pfx_hi {
                return true;
            }
            cursor = idx + 1;
        }

        // 3. a child subtree starts inside the prefix
        let mut cursor = octet as u16;
        while let Some(child_octet) = self.child_bits.next_set(cursor) {
            let host_idx = child_octet + FIRST_HOST_INDEX;
            if host_idx >= pfx_lo && host_idx <= pfx_hi {
                return true;
            }
            cursor = child_octet + 1;
        }

        false
    }

    /// Recursively collect all `(prefix, value)` pairs of the subtree,
    /// routes of a node before its children, aborting on the first
    /// callback error.
    pub(crate) fn walk_rec<E, F>(
        &self,
        path: &mut Vec<u8>,
        is_v4: bool,
        f: &mut F,
    ) -> Result<(), E>
    where
        F: FnMut(IpNet, &V) -> Result<(), E>,
    {
        for idx in self.prefix_bits.iter() {
            f(cidr_from_path(path, idx, is_v4), &self.prefixes[self.prefix_rank(idx)])?;
        }
        for octet in self.child_octets() {
            if let Some(child) = self.child(octet) {
                path.push(octet);
                let result = child.walk_rec(path, is_v4, f);
                path.pop();
                result?;
            }
        }
        Ok(())
    }

    /// Append every CIDR of the subtree to `out`, in walk order.
    fn collect_rec(&self, path: &mut Vec<u8>, is_v4: bool, out: &mut Vec<IpNet>) {
        for idx in self.prefix_bits.iter() {
            out.push(cidr_from_path(path, idx, is_v4));
        }
        for octet in self.child_octets() {
            if let Some(child) = self.child(octet) {
                path.push(octet);
                child.collect_rec(path, is_v4, out);
                path.pop();
            }
        }
    }

    /// Append every CIDR of the subtree covered by the route whose base
    /// index at this node is `parent` to `out`.
    pub(crate) fn subnets_into(
        &self,
        path: &mut Vec<u8>,
        parent: u16,
        is_v4: bool,
        out: &mut Vec<IpNet>,
    ) {
        for idx in self.prefix_bits.iter() {
            if is_covered(idx, parent) {
                out.push(cidr_from_path(path, idx, is_v4));
            }
        }
        for octet in self.child_octets() {
            if is_covered(octet_to_base_index(octet), parent) {
                if let Some(child) = self.child(octet) {
                    // everything below this child is covered
                    path.push(octet);
                    child.collect_rec(path, is_v4, out);
                    path.pop();
                }
            }
        }
    }

    /// Merge all routes and children of `other` into `self`. On duplicate
    /// routes the value of `other` wins. Returns the number of duplicates,
    /// so the caller can keep its length bookkeeping without a recount.
    pub(crate) fn union_with(&mut self, other: &Node<V>) -> usize
    where
        V: Clone,
    {
        let mut duplicates = 0;
        for idx in other.prefix_bits.iter() {
            if let Some(value) = other.prefix(idx) {
                if self.insert_prefix(idx, value.clone()).is_some() {
                    duplicates += 1;
                }
            }
        }
        for octet in other.child_octets() {
            if let Some(other_child) = other.child(octet) {
                match self.child_mut(octet) {
                    Some(child) => duplicates += child.union_with(other_child),
                    None => self.insert_child(octet, other_child.clone()),
                }
            }
        }
        duplicates
    }
}

/// Whether the base index `idx` lies in the binary subtree rooted at
/// `parent`, i.e. whether the route `parent` covers the route `idx` within
/// one stride.
#[inline(always)]
pub(crate) fn is_covered(idx: u16, parent: u16) -> bool {
    let mut i = idx;
    while i >= parent {
        if i == parent {
            return true;
        }
        i >>= 1;
    }
    false
}

/// Reassemble the CIDR for the base index `idx` of the node reached over
/// `path`. The address bits beyond the prefix length are zero by
/// construction, so the result is canonical.
pub(crate) fn cidr_from_path(path: &[u8], idx: u16, is_v4: bool) -> IpNet {
    let (octet, _) = base_index_to_prefix(idx);
    let bits = prefix_len_from_index(idx, path.len());
    if is_v4 {
        let mut addr = [0u8; 4];
        addr[..path.len()].copy_from_slice(path);
        addr[path.len()] = octet;
        IpNet::V4(Ipv4Net::new(Ipv4Addr::from(addr), bits).unwrap())
    } else {
        let mut addr = [0u8; 16];
        addr[..path.len()].copy_from_slice(path);
        addr[path.len()] = octet;
        IpNet::V6(Ipv6Net::new(Ipv6Addr::from(addr), bits).unwrap())
    }
}
