//! Longest-prefix-match queries by address and by prefix.

use std::net::IpAddr;

use ipnet::IpNet;

use crate::base_index::{octet_to_base_index, prefix_to_base_index, stride_position};
use crate::node::{cidr_from_path, Node};
use crate::RoutingTable;

impl<V> RoutingTable<V> {
    /// Whether any route covers the address. Cheaper than
    /// [`RoutingTable::lookup`]: the descent only performs bit tests and
    /// never touches the value slices.
    ///
    /// ```
    /// # use stride_trie::RoutingTable;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut table: RoutingTable<u32> = RoutingTable::new();
    /// table.insert("192.168.0.0/16".parse()?, 1);
    /// assert!(table.contains(&"192.168.255.1".parse()?));
    /// assert!(!table.contains(&"192.169.0.1".parse()?));
    /// # Ok(())
    /// # }
    /// ```
    pub fn contains(&self, addr: &IpAddr) -> bool {
        match addr {
            IpAddr::V4(a) => contains_in(self.root(true), &a.octets()),
            IpAddr::V6(a) => contains_in(self.root(false), &a.octets()),
        }
    }

    /// Get the value of the most specific route covering the address.
    ///
    /// ```
    /// # use stride_trie::RoutingTable;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut table: RoutingTable<&str> = RoutingTable::new();
    /// table.insert("10.0.0.0/8".parse()?, "a");
    /// table.insert("10.1.0.0/16".parse()?, "b");
    /// assert_eq!(table.lookup(&"10.1.2.3".parse()?), Some(&"b"));
    /// assert_eq!(table.lookup(&"10.2.2.3".parse()?), Some(&"a"));
    /// assert_eq!(table.lookup(&"11.0.0.1".parse()?), None);
    /// # Ok(())
    /// # }
    /// ```
    pub fn lookup(&self, addr: &IpAddr) -> Option<&V> {
        match addr {
            IpAddr::V4(a) => lookup_in(self.root(true), &a.octets()),
            IpAddr::V6(a) => lookup_in(self.root(false), &a.octets()),
        }
    }

    /// Get the value of the most specific route covering the whole
    /// `prefix`. In contrast to [`RoutingTable::lookup`], a route more
    /// specific than `prefix` does not match.
    ///
    /// ```
    /// # use stride_trie::RoutingTable;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut table: RoutingTable<u32> = RoutingTable::new();
    /// table.insert("10.1.0.0/16".parse()?, 1);
    /// assert_eq!(table.lookup_prefix(&"10.1.2.0/24".parse()?), Some(&1));
    /// assert_eq!(table.lookup_prefix(&"10.1.0.0/16".parse()?), Some(&1));
    /// assert_eq!(table.lookup_prefix(&"10.0.0.0/8".parse()?), None);
    /// # Ok(())
    /// # }
    /// ```
    pub fn lookup_prefix(&self, prefix: &IpNet) -> Option<&V> {
        self.lookup_prefix_lpm(prefix).map(|(_, value)| value)
    }

    /// Like [`RoutingTable::lookup_prefix`], but also returns the CIDR of
    /// the matched route.
    ///
    /// ```
    /// # use stride_trie::RoutingTable;
    /// # use ipnet::IpNet;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut table: RoutingTable<u32> = RoutingTable::new();
    /// table.insert("10.0.0.0/8".parse()?, 1);
    /// let lpm = table.lookup_prefix_lpm(&"10.1.0.0/16".parse()?);
    /// assert_eq!(lpm, Some(("10.0.0.0/8".parse::<IpNet>()?, &1)));
    /// # Ok(())
    /// # }
    /// ```
    pub fn lookup_prefix_lpm(&self, prefix: &IpNet) -> Option<(IpNet, &V)> {
        match prefix.trunc() {
            IpNet::V4(p) => {
                lookup_prefix_in(self.root(true), &p.addr().octets(), p.prefix_len(), true)
            }
            IpNet::V6(p) => {
                lookup_prefix_in(self.root(false), &p.addr().octets(), p.prefix_len(), false)
            }
        }
    }

    /// All stored routes covering `prefix`, from least to most specific.
    /// The result includes `prefix` itself when it is stored.
    ///
    /// ```
    /// # use stride_trie::RoutingTable;
    /// # use ipnet::IpNet;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut table: RoutingTable<u32> = RoutingTable::new();
    /// table.insert("0.0.0.0/0".parse()?, 0);
    /// table.insert("10.0.0.0/8".parse()?, 1);
    /// table.insert("10.1.0.0/16".parse()?, 2);
    /// table.insert("10.2.0.0/16".parse()?, 3);
    /// assert_eq!(
    ///     table.supernets(&"10.1.2.0/24".parse()?),
    ///     vec![
    ///         "0.0.0.0/0".parse::<IpNet>()?,
    ///         "10.0.0.0/8".parse::<IpNet>()?,
    ///         "10.1.0.0/16".parse::<IpNet>()?,
    ///     ],
    /// );
    /// # Ok(())
    /// # }
    /// ```
    pub fn supernets(&self, prefix: &IpNet) -> Vec<IpNet> {
        match prefix.trunc() {
            IpNet::V4(p) => {
                supernets_in(self.root(true), &p.addr().octets(), p.prefix_len(), true)
            }
            IpNet::V6(p) => {
                supernets_in(self.root(false), &p.addr().octets(), p.prefix_len(), false)
            }
        }
    }
}

fn contains_in<V>(root: &Node<V>, octets: &[u8]) -> bool {
    let mut node = root;
    for &octet in octets {
        if node.lpm_test(octet_to_base_index(octet)) {
            return true;
        }
        match node.child(octet) {
            Some(child) => node = child,
            None => return false,
        }
    }
    false
}

/// Descend as deep as children exist, remembering the visited nodes, then
/// backtrack from the deepest stride. The first in-stride match on the way
/// up is the overall longest match, since any deeper stride is more
/// specific than every route of the strides above it.
fn lookup_in<'a, V>(root: &'a Node<V>, octets: &[u8]) -> Option<&'a V> {
    let mut stack: Vec<&'a Node<V>> = Vec::with_capacity(octets.len());
    let mut node = root;
    for &octet in octets {
        stack.push(node);
        match node.child(octet) {
            Some(child) => node = child,
            None => break,
        }
    }
    for depth in (0..stack.len()).rev() {
        let node = stack[depth];
        if node.prefix_count() != 0 {
            if let Some((_, value)) = node.lpm(octet_to_base_index(octets[depth])) {
                return Some(value);
            }
        }
    }
    None
}

/// Like [`lookup_in`], but the descent stops at the stride holding the
/// prefix, and the match there starts at the prefix's own base index
/// instead of a host index.
fn lookup_prefix_in<'a, V>(
    root: &'a Node<V>,
    octets: &[u8],
    bits: u8,
    is_v4: bool,
) -> Option<(IpNet, &'a V)> {
    let (last_depth, len_in_stride) = stride_position(bits);
    let mut stack: Vec<&'a Node<V>> = Vec::with_capacity(last_depth + 1);
    let mut node = root;
    for depth in 0..=last_depth {
        stack.push(node);
        if depth == last_depth {
            break;
        }
        match node.child(octets[depth]) {
            Some(child) => node = child,
            None => break,
        }
    }
    for depth in (0..stack.len()).rev() {
        let node = stack[depth];
        if node.prefix_count() == 0 {
            continue;
        }
        let idx = if depth == last_depth {
            prefix_to_base_index(octets[depth], len_in_stride)
        } else {
            octet_to_base_index(octets[depth])
        };
        if let Some((base, value)) = node.lpm(idx) {
            return Some((cidr_from_path(&octets[..depth], base, is_v4), value));
        }
    }
    None
}

fn supernets_in<V>(root: &Node<V>, octets: &[u8], bits: u8, is_v4: bool) -> Vec<IpNet> {
    let (last_depth, len_in_stride) = stride_position(bits);
    let mut result = Vec::new();
    let mut node = root;
    for depth in 0..=last_depth {
        let idx = if depth == last_depth {
            prefix_to_base_index(octets[depth], len_in_stride)
        } else {
            octet_to_base_index(octets[depth])
        };
        for base in node.covering_indexes(idx) {
            result.push(cidr_from_path(&octets[..depth], base, is_v4));
        }
        if depth == last_depth {
            break;
        }
        match node.child(octets[depth]) {
            Some(child) => node = child,
            None => break,
        }
    }
    result
}
