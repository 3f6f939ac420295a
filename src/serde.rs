//! Serialization and Deserialization implementation
//!
//! A table serializes as the sequence of its `(prefix, value)` pairs in
//! iteration order and deserializes through `FromIterator`, so any
//! self-describing format works.

use ::serde::{Deserialize, Deserializer, Serialize, Serializer};
use ipnet::IpNet;

use crate::RoutingTable;

impl<V: Serialize> Serialize for RoutingTable<V> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let routes: Vec<(IpNet, &V)> = Vec::from_iter(self);
        routes.serialize(serializer)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for RoutingTable<V> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let routes: Vec<(IpNet, V)> = Vec::deserialize(deserializer)?;
        Ok(Self::from_iter(routes))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[generic_tests::define]
    mod t {
        use super::*;
        use std::fmt::Debug;

        #[test]
        fn round_trip<V>()
        where
            V: Debug + Clone + PartialEq + From<u8> + Serialize + for<'de> Deserialize<'de>,
        {
            let table: RoutingTable<V> = RoutingTable::from_iter([
                ("0.0.0.0/0".parse().unwrap(), V::from(0)),
                ("10.0.0.0/8".parse().unwrap(), V::from(1)),
                ("10.1.0.0/16".parse().unwrap(), V::from(2)),
                ("10.2.0.0/16".parse().unwrap(), V::from(3)),
                ("10.2.1.0/24".parse().unwrap(), V::from(4)),
                ("2001:db8::/32".parse().unwrap(), V::from(5)),
                ("2001:db8:1::/48".parse().unwrap(), V::from(6)),
            ]);
            let s: String = serde_json::to_string(&table).unwrap();
            let restored: RoutingTable<V> = serde_json::from_str(&s).unwrap();
            assert_eq!(table, restored);
        }

        #[instantiate_tests(<u8>)]
        mod val_u8 {}

        #[instantiate_tests(<u32>)]
        mod val_u32 {}

        #[instantiate_tests(<i64>)]
        mod val_i64 {}
    }
}
