//! Iterators and whole-table enumeration.
//!
//! All iterators traverse the trie depth-first, routes of a node before
//! its children, IPv4 before IPv6. Within one stride this yields shorter
//! prefixes before longer ones, so the order is deterministic but not the
//! canonical CIDR order; [`RoutingTable::subnets`] is the sorted surface.

use ipnet::IpNet;

use crate::base_index::{prefix_to_base_index, stride_position};
use crate::node::{cidr_from_path, Node};
use crate::RoutingTable;

impl<V> RoutingTable<V> {
    /// Iterate over all routes and their values.
    ///
    /// ```
    /// # use stride_trie::RoutingTable;
    /// # use ipnet::IpNet;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let table: RoutingTable<u32> = RoutingTable::from_iter([
    ///     ("10.0.0.0/8".parse()?, 1),
    ///     ("10.1.0.0/16".parse()?, 2),
    ///     ("10.2.0.0/16".parse()?, 3),
    ///     ("192.168.0.0/16".parse()?, 4),
    /// ]);
    /// assert_eq!(
    ///     table.iter().collect::<Vec<_>>(),
    ///     vec![
    ///         ("10.0.0.0/8".parse::<IpNet>()?, &1),
    ///         ("10.1.0.0/16".parse::<IpNet>()?, &2),
    ///         ("10.2.0.0/16".parse::<IpNet>()?, &3),
    ///         ("192.168.0.0/16".parse::<IpNet>()?, &4),
    ///     ],
    /// );
    /// # Ok(())
    /// # }
    /// ```
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            frames: vec![
                Frame::new(&self.root6, Vec::new(), false),
                Frame::new(&self.root4, Vec::new(), true),
            ],
        }
    }

    /// Iterate over all routes.
    pub fn keys(&self) -> Keys<'_, V> {
        Keys { inner: self.iter() }
    }

    /// Iterate over all values, in the order of their routes.
    pub fn values(&self) -> Values<'_, V> {
        Values { inner: self.iter() }
    }

    /// Call `f` for every route and value, aborting with the callback's
    /// error if it returns one.
    ///
    /// ```
    /// # use stride_trie::RoutingTable;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut table: RoutingTable<u32> = RoutingTable::new();
    /// table.insert("10.0.0.0/8".parse()?, 1);
    /// table.insert("10.1.0.0/16".parse()?, 2);
    ///
    /// let mut sum = 0;
    /// table.walk(|_, value| {
    ///     sum += *value;
    ///     Ok::<(), ()>(())
    /// }).unwrap();
    /// assert_eq!(sum, 3);
    ///
    /// // the first error stops the traversal
    /// let mut seen = 0;
    /// let result = table.walk(|prefix, _| {
    ///     seen += 1;
    ///     Err(prefix)
    /// });
    /// assert_eq!(result, Err("10.0.0.0/8".parse()?));
    /// assert_eq!(seen, 1);
    /// # Ok(())
    /// # }
    /// ```
    pub fn walk<E, F>(&self, mut f: F) -> Result<(), E>
    where
        F: FnMut(IpNet, &V) -> Result<(), E>,
    {
        self.root4.walk_rec(&mut Vec::new(), true, &mut f)?;
        self.root6.walk_rec(&mut Vec::new(), false, &mut f)
    }

    /// All stored routes covered by `prefix` (including `prefix` itself
    /// when stored), sorted by address and then by prefix length.
    ///
    /// ```
    /// # use stride_trie::RoutingTable;
    /// # use ipnet::IpNet;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut table: RoutingTable<u32> = RoutingTable::new();
    /// table.insert("10.1.0.0/16".parse()?, 1);
    /// table.insert("10.1.2.0/24".parse()?, 2);
    /// table.insert("11.0.0.0/8".parse()?, 3);
    /// assert_eq!(
    ///     table.subnets(&"10.0.0.0/8".parse()?),
    ///     vec![
    ///         "10.1.0.0/16".parse::<IpNet>()?,
    ///         "10.1.2.0/24".parse::<IpNet>()?,
    ///     ],
    /// );
    /// # Ok(())
    /// # }
    /// ```
    pub fn subnets(&self, prefix: &IpNet) -> Vec<IpNet> {
        let mut result = match prefix.trunc() {
            IpNet::V4(p) => subnets_in(&self.root4, &p.addr().octets(), p.prefix_len(), true),
            IpNet::V6(p) => subnets_in(&self.root6, &p.addr().octets(), p.prefix_len(), false),
        };
        result.sort_by(cmp_prefix);
        result
    }
}

/// Canonical CIDR order: by address, then by prefix length.
fn cmp_prefix(a: &IpNet, b: &IpNet) -> std::cmp::Ordering {
    a.addr()
        .cmp(&b.addr())
        .then_with(|| a.prefix_len().cmp(&b.prefix_len()))
}

fn subnets_in<V>(root: &Node<V>, octets: &[u8], bits: u8, is_v4: bool) -> Vec<IpNet> {
    let (last_depth, len_in_stride) = stride_position(bits);
    let mut node = root;
    for &octet in &octets[..last_depth] {
        match node.child(octet) {
            Some(child) => node = child,
            // nothing stored below this prefix
            None => return Vec::new(),
        }
    }
    let mut result = Vec::new();
    let mut path = octets[..last_depth].to_vec();
    node.subnets_into(
        &mut path,
        prefix_to_base_index(octets[last_depth], len_in_stride),
        is_v4,
        &mut result,
    );
    result
}

/// One level of the depth-first traversal: the node, the octets leading to
/// it, and the two bit-set cursors.
struct Frame<'a, V> {
    node: &'a Node<V>,
    path: Vec<u8>,
    is_v4: bool,
    prefix_cursor: u16,
    child_cursor: u16,
}

impl<'a, V> Frame<'a, V> {
    fn new(node: &'a Node<V>, path: Vec<u8>, is_v4: bool) -> Self {
        Self {
            node,
            path,
            is_v4,
            prefix_cursor: 0,
            child_cursor: 0,
        }
    }
}

impl<V> Clone for Frame<'_, V> {
    fn clone(&self) -> Self {
        Self {
            node: self.node,
            path: self.path.clone(),
            is_v4: self.is_v4,
            prefix_cursor: self.prefix_cursor,
            child_cursor: self.child_cursor,
        }
    }
}

/// An iterator over all routes of a [`RoutingTable`].
pub struct Iter<'a, V> {
    frames: Vec<Frame<'a, V>>,
}

impl<V> Clone for Iter<'_, V> {
    fn clone(&self) -> Self {
        Self {
            frames: self.frames.clone(),
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (IpNet, &'a V);

    fn next(&mut self) -> Option<(IpNet, &'a V)> {
        loop {
            let frame = self.frames.last_mut()?;
            if let Some(idx) = frame.node.next_prefix_index(frame.prefix_cursor) {
                frame.prefix_cursor = idx + 1;
                let prefix = cidr_from_path(&frame.path, idx, frame.is_v4);
                return Some((prefix, frame.node.prefix(idx)?));
            }
            if let Some(octet) = frame.node.next_child_octet(frame.child_cursor) {
                frame.child_cursor = octet as u16 + 1;
                let child = frame.node.child(octet)?;
                let mut path = frame.path.clone();
                path.push(octet);
                let is_v4 = frame.is_v4;
                self.frames.push(Frame::new(child, path, is_v4));
                continue;
            }
            self.frames.pop();
        }
    }
}

/// An iterator over all routes (the keys) of a [`RoutingTable`].
pub struct Keys<'a, V> {
    pub(crate) inner: Iter<'a, V>,
}

impl<V> Clone for Keys<'_, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V> Iterator for Keys<'_, V> {
    type Item = IpNet;

    fn next(&mut self) -> Option<IpNet> {
        self.inner.next().map(|(prefix, _)| prefix)
    }
}

/// An iterator over all values of a [`RoutingTable`], in the order of
/// their routes.
pub struct Values<'a, V> {
    pub(crate) inner: Iter<'a, V>,
}

impl<V> Clone for Values<'_, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, V> Iterator for Values<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, value)| value)
    }
}

impl<'a, V> IntoIterator for &'a RoutingTable<V> {
    type Item = (IpNet, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Iter<'a, V> {
        self.iter()
    }
}

/// One level of the consuming traversal, with the node decomposed into its
/// ordered parts.
struct OwnedFrame<V> {
    path: Vec<u8>,
    is_v4: bool,
    prefixes: std::iter::Zip<std::vec::IntoIter<u16>, std::vec::IntoIter<V>>,
    children: std::iter::Zip<std::vec::IntoIter<u8>, std::vec::IntoIter<Box<Node<V>>>>,
}

impl<V> OwnedFrame<V> {
    fn new(node: Node<V>, path: Vec<u8>, is_v4: bool) -> Self {
        let (indexes, values, octets, children) = node.into_parts();
        Self {
            path,
            is_v4,
            prefixes: indexes.into_iter().zip(values),
            children: octets.into_iter().zip(children),
        }
    }
}

/// An owning iterator over all routes of a [`RoutingTable`].
pub struct IntoIter<V> {
    frames: Vec<OwnedFrame<V>>,
}

impl<V> Iterator for IntoIter<V> {
    type Item = (IpNet, V);

    fn next(&mut self) -> Option<(IpNet, V)> {
        loop {
            let frame = self.frames.last_mut()?;
            if let Some((idx, value)) = frame.prefixes.next() {
                return Some((cidr_from_path(&frame.path, idx, frame.is_v4), value));
            }
            if let Some((octet, child)) = frame.children.next() {
                let mut path = frame.path.clone();
                path.push(octet);
                let is_v4 = frame.is_v4;
                self.frames.push(OwnedFrame::new(*child, path, is_v4));
                continue;
            }
            self.frames.pop();
        }
    }
}

impl<V> IntoIterator for RoutingTable<V> {
    type Item = (IpNet, V);
    type IntoIter = IntoIter<V>;

    fn into_iter(self) -> IntoIter<V> {
        IntoIter {
            frames: vec![
                OwnedFrame::new(self.root6, Vec::new(), false),
                OwnedFrame::new(self.root4, Vec::new(), true),
            ],
        }
    }
}
