//! Formatting implementation for the RoutingTable

use std::fmt::{Debug, Formatter, Result};

use crate::RoutingTable;

impl<V: Debug> Debug for RoutingTable<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
