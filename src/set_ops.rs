//! Overlap tests and the in-place union of two tables.

use ipnet::IpNet;

use crate::base_index::{octet_to_base_index, stride_position};
use crate::node::Node;
use crate::RoutingTable;

impl<V> RoutingTable<V> {
    /// Whether any route of `self` overlaps any route of `other`, i.e.
    /// whether some address is covered by both tables. The test is
    /// symmetric.
    ///
    /// ```
    /// # use stride_trie::RoutingTable;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut a: RoutingTable<u32> = RoutingTable::new();
    /// let mut b: RoutingTable<u32> = RoutingTable::new();
    /// a.insert("10.0.0.0/8".parse()?, 1);
    /// b.insert("10.1.0.0/16".parse()?, 2);
    /// assert!(a.overlaps(&b));
    /// assert!(b.overlaps(&a));
    ///
    /// let mut c: RoutingTable<u32> = RoutingTable::new();
    /// c.insert("11.0.0.0/8".parse()?, 3);
    /// assert!(!a.overlaps(&c));
    /// # Ok(())
    /// # }
    /// ```
    pub fn overlaps(&self, other: &Self) -> bool {
        self.root(true).overlaps(other.root(true)) || self.root(false).overlaps(other.root(false))
    }

    /// Whether any route of `self` overlaps `prefix`: either a stored
    /// route contains `prefix`, or `prefix` contains a stored route.
    ///
    /// ```
    /// # use stride_trie::RoutingTable;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut table: RoutingTable<u32> = RoutingTable::new();
    /// table.insert("10.1.0.0/16".parse()?, 1);
    /// assert!(table.overlaps_prefix(&"10.0.0.0/8".parse()?));
    /// assert!(table.overlaps_prefix(&"10.1.2.0/24".parse()?));
    /// assert!(!table.overlaps_prefix(&"10.2.0.0/16".parse()?));
    /// # Ok(())
    /// # }
    /// ```
    pub fn overlaps_prefix(&self, prefix: &IpNet) -> bool {
        match prefix.trunc() {
            IpNet::V4(p) => {
                overlaps_prefix_in(self.root(true), &p.addr().octets(), p.prefix_len())
            }
            IpNet::V6(p) => {
                overlaps_prefix_in(self.root(false), &p.addr().octets(), p.prefix_len())
            }
        }
    }

    /// Merge all routes of `other` into `self`. On prefixes present in
    /// both tables the value of `other` wins. Subtrees missing in `self`
    /// are deep-cloned; `other` is left untouched.
    ///
    /// ```
    /// # use stride_trie::RoutingTable;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut a: RoutingTable<u32> = RoutingTable::new();
    /// let mut b: RoutingTable<u32> = RoutingTable::new();
    /// a.insert("10.0.0.0/8".parse()?, 1);
    /// b.insert("10.0.0.0/8".parse()?, 2);
    /// b.insert("192.168.0.0/16".parse()?, 3);
    /// a.union(&b);
    /// assert_eq!(a.get(&"10.0.0.0/8".parse()?), Some(&2));
    /// assert_eq!(a.get(&"192.168.0.0/16".parse()?), Some(&3));
    /// assert_eq!(a.len(), 2);
    /// # Ok(())
    /// # }
    /// ```
    pub fn union(&mut self, other: &Self)
    where
        V: Clone,
    {
        let duplicates4 = self.root4.union_with(&other.root4);
        let duplicates6 = self.root6.union_with(&other.root6);
        self.len4 += other.len4 - duplicates4;
        self.len6 += other.len6 - duplicates6;
    }
}

/// Walk towards the stride holding the prefix. In every stride above it
/// the prefix spans the full octet, so a single in-stride match on the
/// host index decides; the final stride needs the three-phase node test.
fn overlaps_prefix_in<V>(root: &Node<V>, octets: &[u8], bits: u8) -> bool {
    let (last_depth, len_in_stride) = stride_position(bits);
    let mut node = root;
    for &octet in &octets[..last_depth] {
        if node.lpm_test(octet_to_base_index(octet)) {
            return true;
        }
        match node.child(octet) {
            Some(child) => node = child,
            None => return false,
        }
    }
    node.overlaps_prefix(octets[last_depth], len_in_stride)
}
