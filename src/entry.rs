//! Code for inserting elements and the entry pattern.

use ipnet::IpNet;

use crate::RoutingTable;

/// A mutable view into a single route of a table, which may be vacant or
/// occupied.
///
/// The entry is lazy: looking it up does not modify the table, so a
/// dropped entry leaves no trace. Only the consuming methods
/// ([`Entry::insert`], [`Entry::or_insert`], [`Entry::or_insert_with`],
/// [`Entry::or_default`]) descend mutably.
pub struct Entry<'a, V> {
    table: &'a mut RoutingTable<V>,
    prefix: IpNet,
}

impl<V> RoutingTable<V> {
    /// Get the entry for the route at `prefix`.
    ///
    /// ```
    /// # use stride_trie::RoutingTable;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut table: RoutingTable<u32> = RoutingTable::new();
    /// let prefix = "192.168.1.0/24".parse()?;
    /// *table.entry(prefix).or_insert(3) += 10;
    /// assert_eq!(table.get(&prefix), Some(&13));
    /// table.entry(prefix).and_modify(|v| *v += 1).or_insert(100);
    /// assert_eq!(table.get(&prefix), Some(&14));
    /// # Ok(())
    /// # }
    /// ```
    pub fn entry(&mut self, prefix: IpNet) -> Entry<'_, V> {
        Entry {
            prefix: prefix.trunc(),
            table: self,
        }
    }
}

impl<'a, V> Entry<'a, V> {
    /// The (masked) prefix of this entry.
    pub fn key(&self) -> &IpNet {
        &self.prefix
    }

    /// Get the value if the route exists.
    pub fn get(&self) -> Option<&V> {
        self.table.get(&self.prefix)
    }

    /// Get the value mutably if the route exists.
    pub fn get_mut(&mut self) -> Option<&mut V> {
        self.table.get_mut(&self.prefix)
    }

    /// Replace the route's value, returning the value that was stored
    /// before.
    pub fn insert(self, value: V) -> Option<V> {
        self.table.insert(self.prefix, value)
    }

    /// Ensure a value is in the entry by inserting `default` if the route
    /// is vacant, and return a mutable reference to the value.
    pub fn or_insert(self, default: V) -> &'a mut V {
        self.table.get_or_insert_with(self.prefix, || default)
    }

    /// Ensure a value is in the entry by inserting the result of `default`
    /// if the route is vacant, and return a mutable reference to the
    /// value.
    pub fn or_insert_with<F: FnOnce() -> V>(self, default: F) -> &'a mut V {
        self.table.get_or_insert_with(self.prefix, default)
    }

    /// Provide in-place mutable access to an occupied entry before any
    /// potential insert.
    pub fn and_modify<F: FnOnce(&mut V)>(mut self, f: F) -> Self {
        if let Some(value) = self.get_mut() {
            f(value);
        }
        self
    }
}

impl<'a, V> Entry<'a, V>
where
    V: Default,
{
    /// Ensure a value is in the entry by inserting the default value if
    /// the route is vacant, and return a mutable reference to the value.
    ///
    /// ```
    /// # use stride_trie::RoutingTable;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut counters: RoutingTable<u32> = RoutingTable::new();
    /// for addr in ["10.0.0.0/8", "10.1.0.0/16", "10.0.0.0/8"] {
    ///     *counters.entry(addr.parse()?).or_default() += 1;
    /// }
    /// assert_eq!(counters.get(&"10.0.0.0/8".parse()?), Some(&2));
    /// assert_eq!(counters.get(&"10.1.0.0/16".parse()?), Some(&1));
    /// # Ok(())
    /// # }
    /// ```
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(Default::default)
    }
}
