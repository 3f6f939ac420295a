use std::net::IpAddr;

use ipnet::IpNet;

use super::RoutingTable;

fn net(s: &str) -> IpNet {
    s.parse().unwrap()
}

fn addr(s: &str) -> IpAddr {
    s.parse().unwrap()
}

/// The prefixes force the longest possible backtracking on every stride:
/// each stride of the probe address matches only after shifting all the
/// way through its binary tree, and the next less specific route sits one
/// stride up.
const WORST_CASE_PFXS_V4: [&str; 8] = [
    "0.0.0.0/1",
    "254.0.0.0/8",
    "255.0.0.0/9",
    "255.254.0.0/16",
    "255.255.0.0/17",
    "255.255.254.0/24",
    "255.255.255.0/25",
    "255.255.255.255/32",
];

const WORST_CASE_PFXS_V6: [&str; 33] = [
    "::/1",
    "fe00::/8",
    "ff00::/9",
    "fffe::/16",
    "ffff::/17",
    "ffff:fe00::/24",
    "ffff:ff00::/25",
    "ffff:fffe::/32",
    "ffff:ffff::/33",
    "ffff:ffff:fe00::/40",
    "ffff:ffff:ff00::/41",
    "ffff:ffff:fffe::/48",
    "ffff:ffff:ffff::/49",
    "ffff:ffff:ffff:fe00::/56",
    "ffff:ffff:ffff:ff00::/57",
    "ffff:ffff:ffff:fffe::/64",
    "ffff:ffff:ffff:ffff::/65",
    "ffff:ffff:ffff:ffff:fe00::/72",
    "ffff:ffff:ffff:ffff:ff00::/73",
    "ffff:ffff:ffff:ffff:fffe::/80",
    "ffff:ffff:ffff:ffff:ffff::/81",
    "ffff:ffff:ffff:ffff:ffff:fe00::/88",
    "ffff:ffff:ffff:ffff:ffff:ff00::/89",
    "ffff:ffff:ffff:ffff:ffff:fffe::/96",
    "ffff:ffff:ffff:ffff:ffff:ffff::/97",
    "ffff:ffff:ffff:ffff:ffff:ffff:fe00::/104",
    "ffff:ffff:ffff:ffff:ffff:ffff:ff00::/105",
    "ffff:ffff:ffff:ffff:ffff:ffff:fffe:0/112",
    "ffff:ffff:ffff:ffff:ffff:ffff:ffff:0/113",
    "ffff:ffff:ffff:ffff:ffff:ffff:ffff:fe00/120",
    "ffff:ffff:ffff:ffff:ffff:ffff:ffff:ff00/121",
    "ffff:ffff:ffff:ffff:ffff:ffff:ffff:fffe/128",
    "ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff/128",
];

fn worst_case_table(prefixes: &[&str]) -> RoutingTable<String> {
    prefixes.iter().map(|&p| (net(p), p.to_string())).collect()
}

#[test]
fn insert_get_remove_round_trip() {
    let mut table: RoutingTable<u32> = RoutingTable::new();
    assert!(table.is_empty());
    assert_eq!(table.insert(net("10.0.0.0/8"), 1), None);
    assert_eq!(table.get(&net("10.0.0.0/8")), Some(&1));
    assert_eq!(table.len(), 1);

    // overwriting keeps the length and returns the old value
    assert_eq!(table.insert(net("10.0.0.0/8"), 2), Some(1));
    assert_eq!(table.len(), 1);

    assert_eq!(table.remove(&net("10.0.0.0/8")), Some(2));
    assert_eq!(table.get(&net("10.0.0.0/8")), None);
    assert_eq!(table.remove(&net("10.0.0.0/8")), None);
    assert!(table.is_empty());
}

#[test]
fn get_matches_exactly() {
    let mut table: RoutingTable<u32> = RoutingTable::new();
    table.insert(net("192.168.1.0/24"), 1);
    assert_eq!(table.get(&net("192.168.1.0/24")), Some(&1));
    assert_eq!(table.get(&net("192.168.1.0/25")), None);
    assert_eq!(table.get(&net("192.168.0.0/23")), None);
    assert_eq!(table.get(&net("192.168.0.0/16")), None);
}

#[test]
fn prefixes_are_masked_on_entry() {
    let mut table: RoutingTable<u32> = RoutingTable::new();
    table.insert(net("10.1.2.3/8"), 1);
    assert_eq!(table.get(&net("10.0.0.0/8")), Some(&1));
    assert_eq!(table.get(&net("10.99.0.0/8")), Some(&1));
    assert_eq!(table.keys().collect::<Vec<_>>(), vec![net("10.0.0.0/8")]);
    assert_eq!(table.remove(&net("10.255.255.255/8")), Some(1));
}

#[test]
fn lookup_prefers_the_most_specific_route() {
    let mut table: RoutingTable<&str> = RoutingTable::new();
    table.insert(net("10.0.0.0/8"), "A");
    table.insert(net("10.1.0.0/16"), "B");
    assert_eq!(table.lookup(&addr("10.1.2.3")), Some(&"B"));
    assert_eq!(table.lookup(&addr("10.2.2.3")), Some(&"A"));
    assert_eq!(table.lookup(&addr("11.0.0.1")), None);
    assert!(table.contains(&addr("10.1.2.3")));
    assert!(!table.contains(&addr("11.0.0.1")));
}

#[test]
fn default_routes_match_everything_in_their_family() {
    let mut table: RoutingTable<&str> = RoutingTable::new();
    table.insert(net("0.0.0.0/0"), "v4");
    assert_eq!(table.lookup(&addr("1.2.3.4")), Some(&"v4"));
    assert_eq!(table.lookup(&addr("255.255.255.255")), Some(&"v4"));
    // the v4 default route does not leak into the v6 trie
    assert_eq!(table.lookup(&addr("::1")), None);

    table.insert(net("::/0"), "v6");
    assert_eq!(table.lookup(&addr("::1")), Some(&"v6"));
    assert_eq!(table.lookup(&addr("2001:db8::1")), Some(&"v6"));
    assert_eq!(table.len(), 2);
}

#[test]
fn host_routes() {
    let mut table: RoutingTable<u32> = RoutingTable::new();
    table.insert(net("10.1.2.3/32"), 1);
    table.insert(net("2001:db8::1/128"), 2);
    assert_eq!(table.lookup(&addr("10.1.2.3")), Some(&1));
    assert_eq!(table.lookup(&addr("10.1.2.4")), None);
    assert_eq!(table.lookup(&addr("2001:db8::1")), Some(&2));
    assert_eq!(table.lookup(&addr("2001:db8::2")), None);
}

#[test]
fn routes_on_every_stride_boundary() {
    let mut table: RoutingTable<&str> = RoutingTable::new();
    table.insert(net("10.0.0.0/8"), "8");
    table.insert(net("10.1.0.0/16"), "16");
    table.insert(net("10.1.2.0/24"), "24");
    table.insert(net("10.1.2.3/32"), "32");

    assert_eq!(table.lookup(&addr("10.1.2.3")), Some(&"32"));
    assert_eq!(table.lookup(&addr("10.1.2.4")), Some(&"24"));
    assert_eq!(table.lookup(&addr("10.1.3.1")), Some(&"16"));
    assert_eq!(table.lookup(&addr("10.9.9.9")), Some(&"8"));
    assert_eq!(table.lookup(&addr("11.0.0.1")), None);

    for prefix in ["10.0.0.0/8", "10.1.0.0/16", "10.1.2.0/24", "10.1.2.3/32"] {
        assert!(table.get(&net(prefix)).is_some());
    }
}

#[test]
fn worst_case_v4_match() {
    let table = worst_case_table(&WORST_CASE_PFXS_V4);
    let probe = addr("255.255.255.255");
    let probe_pfx = net("255.255.255.255/32");

    assert!(table.contains(&probe));
    assert_eq!(table.lookup(&probe), Some(&"255.255.255.255/32".to_string()));
    assert_eq!(
        table.lookup_prefix(&probe_pfx),
        Some(&"255.255.255.255/32".to_string())
    );
    assert_eq!(
        table.lookup_prefix_lpm(&probe_pfx),
        Some((probe_pfx, &"255.255.255.255/32".to_string()))
    );
}

#[test]
fn worst_case_v4_miss() {
    let mut table = worst_case_table(&WORST_CASE_PFXS_V4);
    assert!(table.remove(&net("255.255.255.255/32")).is_some());

    let probe = addr("255.255.255.255");
    let probe_pfx = net("255.255.255.255/32");
    assert!(!table.contains(&probe));
    assert_eq!(table.lookup(&probe), None);
    assert_eq!(table.lookup_prefix(&probe_pfx), None);
    assert_eq!(table.lookup_prefix_lpm(&probe_pfx), None);
}

#[test]
fn worst_case_v6_match() {
    let table = worst_case_table(&WORST_CASE_PFXS_V6);
    let probe = addr("ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff");
    let probe_pfx = net("ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff/128");

    assert!(table.contains(&probe));
    assert_eq!(
        table.lookup(&probe),
        Some(&"ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff/128".to_string())
    );
    assert_eq!(
        table.lookup_prefix_lpm(&probe_pfx),
        Some((
            probe_pfx,
            &"ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff/128".to_string()
        ))
    );
}

#[test]
fn worst_case_v6_miss() {
    let mut table = worst_case_table(&WORST_CASE_PFXS_V6);
    assert!(table
        .remove(&net("ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff/128"))
        .is_some());

    let probe = addr("ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff");
    let probe_pfx = net("ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff/128");
    assert!(!table.contains(&probe));
    assert_eq!(table.lookup(&probe), None);
    assert_eq!(table.lookup_prefix(&probe_pfx), None);
    assert_eq!(table.lookup_prefix_lpm(&probe_pfx), None);
}

#[test]
fn update_inserts_and_modifies() {
    let mut table: RoutingTable<u32> = RoutingTable::new();
    assert_eq!(table.update(net("10.0.0.0/8"), |v| v.unwrap_or(0) + 1), &1);
    assert_eq!(table.update(net("10.0.0.0/8"), |v| v.unwrap_or(0) + 1), &2);
    assert_eq!(table.len(), 1);
    assert_eq!(table.get(&net("10.0.0.0/8")), Some(&2));

    // the callback sees the old value exactly once
    let seen = table.update(net("10.0.0.0/8"), |v| {
        assert_eq!(v, Some(2));
        7
    });
    assert_eq!(seen, &7);
}

#[test]
fn entry_is_lazy() {
    let mut table: RoutingTable<u32> = RoutingTable::new();
    table.insert(net("10.0.0.0/8"), 1);
    let snapshot = table.clone();

    // a dropped entry must not change the table, not even its shape
    assert_eq!(table.entry(net("10.1.2.0/24")).get(), None);
    assert_eq!(table, snapshot);

    *table.entry(net("10.1.2.0/24")).or_insert(5) += 1;
    assert_eq!(table.get(&net("10.1.2.0/24")), Some(&6));
    assert_eq!(table.len(), 2);

    assert_eq!(table.entry(net("10.0.0.0/8")).insert(10), Some(1));
    assert_eq!(table.len(), 2);
}

#[test]
fn overlaps_is_symmetric() {
    let mut a: RoutingTable<u32> = RoutingTable::new();
    let mut b: RoutingTable<u32> = RoutingTable::new();
    a.insert(net("10.0.0.0/8"), 1);
    b.insert(net("10.0.0.0/8"), 2);
    assert!(a.overlaps(&b));
    assert!(b.overlaps(&a));

    let mut c: RoutingTable<u32> = RoutingTable::new();
    c.insert(net("11.0.0.0/8"), 3);
    assert!(!a.overlaps(&c));
    assert!(!c.overlaps(&a));

    // nested routes overlap as well
    let mut d: RoutingTable<u32> = RoutingTable::new();
    d.insert(net("10.1.2.0/24"), 4);
    assert!(a.overlaps(&d));
    assert!(d.overlaps(&a));

    // a non-empty table overlaps itself, the empty table does not
    assert!(a.overlaps(&a));
    let empty: RoutingTable<u32> = RoutingTable::new();
    assert!(!empty.overlaps(&empty));
    assert!(!a.overlaps(&empty));
}

#[test]
fn overlap_does_not_cross_families() {
    let mut a: RoutingTable<u32> = RoutingTable::new();
    let mut b: RoutingTable<u32> = RoutingTable::new();
    a.insert(net("0.0.0.0/0"), 1);
    b.insert(net("::/0"), 2);
    assert!(!a.overlaps(&b));
    assert!(!b.overlaps(&a));
}

#[test]
fn overlaps_prefix_in_both_directions() {
    let mut table: RoutingTable<u32> = RoutingTable::new();
    table.insert(net("10.1.0.0/16"), 1);
    // the stored route contains the prefix
    assert!(table.overlaps_prefix(&net("10.1.2.0/24")));
    // the prefix contains the stored route
    assert!(table.overlaps_prefix(&net("10.0.0.0/8")));
    assert!(table.overlaps_prefix(&net("0.0.0.0/0")));
    // disjoint
    assert!(!table.overlaps_prefix(&net("10.2.0.0/16")));
    assert!(!table.overlaps_prefix(&net("11.0.0.0/8")));
}

#[test]
fn overlaps_prefix_after_remove() {
    let mut table: RoutingTable<u32> = RoutingTable::new();
    table.insert(net("10.1.2.0/24"), 1);
    assert!(table.overlaps_prefix(&net("10.1.0.0/16")));
    table.remove(&net("10.1.2.0/24"));
    // pruning keeps the overlap test exact after deletions
    assert!(!table.overlaps_prefix(&net("10.1.0.0/16")));
    assert!(!table.overlaps_prefix(&net("0.0.0.0/0")));
}

#[test]
fn subnets_in_canonical_order() {
    let mut table: RoutingTable<u32> = RoutingTable::new();
    table.insert(net("10.1.0.0/16"), 1);
    table.insert(net("10.1.2.0/24"), 2);
    table.insert(net("11.0.0.0/8"), 3);
    assert_eq!(
        table.subnets(&net("10.0.0.0/8")),
        vec![net("10.1.0.0/16"), net("10.1.2.0/24")]
    );
    assert_eq!(table.subnets(&net("10.1.2.0/24")), vec![net("10.1.2.0/24")]);
    assert_eq!(table.subnets(&net("10.2.0.0/16")), Vec::<IpNet>::new());
}

#[test]
fn subnets_sorts_across_prefix_lengths() {
    let mut table: RoutingTable<u32> = RoutingTable::new();
    table.insert(net("128.0.0.0/1"), 1);
    table.insert(net("0.0.0.0/8"), 2);
    // discovery order within the stride is shortest prefix first
    assert_eq!(
        table.subnets(&net("0.0.0.0/0")),
        vec![net("0.0.0.0/8"), net("128.0.0.0/1")]
    );
}

#[test]
fn supernets_walks_the_covering_chain() {
    let mut table: RoutingTable<u32> = RoutingTable::new();
    table.insert(net("0.0.0.0/0"), 0);
    table.insert(net("10.0.0.0/8"), 1);
    table.insert(net("10.1.0.0/16"), 2);
    table.insert(net("10.2.0.0/16"), 3);
    assert_eq!(
        table.supernets(&net("10.1.2.0/24")),
        vec![net("0.0.0.0/0"), net("10.0.0.0/8"), net("10.1.0.0/16")]
    );
    // includes the prefix itself when stored
    assert_eq!(
        table.supernets(&net("10.1.0.0/16")),
        vec![net("0.0.0.0/0"), net("10.0.0.0/8"), net("10.1.0.0/16")]
    );
    assert_eq!(table.supernets(&net("11.1.0.0/16")), vec![net("0.0.0.0/0")]);
}

#[test]
fn union_prefers_the_other_table() {
    let mut a: RoutingTable<&str> = RoutingTable::new();
    a.insert(net("10.0.0.0/8"), "a");
    a.insert(net("192.168.0.0/16"), "a");

    let mut b: RoutingTable<&str> = RoutingTable::new();
    b.insert(net("10.0.0.0/8"), "b");
    b.insert(net("10.1.0.0/16"), "b");
    b.insert(net("2001:db8::/32"), "b");

    a.union(&b);
    assert_eq!(a.len(), 4);
    assert_eq!(a.get(&net("10.0.0.0/8")), Some(&"b"));
    assert_eq!(a.get(&net("192.168.0.0/16")), Some(&"a"));
    assert_eq!(a.get(&net("10.1.0.0/16")), Some(&"b"));
    assert_eq!(a.get(&net("2001:db8::/32")), Some(&"b"));
}

#[test]
fn union_clones_deeply() {
    let mut a: RoutingTable<u32> = RoutingTable::new();
    let mut b: RoutingTable<u32> = RoutingTable::new();
    b.insert(net("10.1.2.0/24"), 1);
    a.union(&b);

    // the union must not share structure with `b`
    b.insert(net("10.1.3.0/24"), 2);
    *b.get_mut(&net("10.1.2.0/24")).unwrap() = 99;
    assert_eq!(a.get(&net("10.1.2.0/24")), Some(&1));
    assert_eq!(a.get(&net("10.1.3.0/24")), None);
    assert_eq!(a.len(), 1);
}

#[test]
fn clone_is_independent() {
    let mut table: RoutingTable<u32> = RoutingTable::new();
    table.insert(net("10.0.0.0/8"), 1);
    table.insert(net("2001:db8::/32"), 2);

    let clone = table.clone();
    assert_eq!(table, clone);
    assert_eq!(
        table.iter().collect::<Vec<_>>(),
        clone.iter().collect::<Vec<_>>()
    );

    table.insert(net("10.1.0.0/16"), 3);
    table.remove(&net("2001:db8::/32"));
    assert_eq!(clone.len(), 2);
    assert_eq!(clone.get(&net("2001:db8::/32")), Some(&2));
    assert_eq!(clone.get(&net("10.1.0.0/16")), None);
}

#[test]
fn equality_ignores_operation_history() {
    let mut a: RoutingTable<u32> = RoutingTable::new();
    a.insert(net("10.0.0.0/8"), 1);
    a.insert(net("10.1.2.0/24"), 2);

    let mut b: RoutingTable<u32> = RoutingTable::new();
    b.insert(net("10.1.2.0/24"), 2);
    b.insert(net("10.0.0.0/8"), 1);
    b.insert(net("172.16.33.0/24"), 9);
    b.remove(&net("172.16.33.0/24"));

    assert_eq!(a, b);

    b.insert(net("10.0.0.0/8"), 7);
    assert_ne!(a, b);
}

#[test]
fn iteration_is_complete_and_deterministic() {
    let routes = [
        (net("10.0.0.0/8"), 1),
        (net("10.1.0.0/16"), 2),
        (net("10.2.0.0/16"), 3),
        (net("192.168.0.0/16"), 4),
        (net("::/0"), 5),
        (net("2001:db8::/32"), 6),
    ];
    let table: RoutingTable<u32> = routes.iter().cloned().collect();

    // v4 before v6, within a stride shorter prefixes first
    let walked: Vec<(IpNet, u32)> = table.iter().map(|(p, v)| (p, *v)).collect();
    assert_eq!(walked, routes.to_vec());

    assert_eq!(table.keys().count(), 6);
    assert_eq!(table.values().sum::<u32>(), 21);

    // the consuming iterator yields the same sequence
    let owned: Vec<(IpNet, u32)> = table.clone().into_iter().collect();
    assert_eq!(owned, walked);

    // and so does walk
    let mut via_walk = Vec::new();
    table
        .walk(|p, v| {
            via_walk.push((p, *v));
            Ok::<(), ()>(())
        })
        .unwrap();
    assert_eq!(via_walk, walked);
}

#[test]
fn walk_aborts_on_error() {
    let table: RoutingTable<u32> = RoutingTable::from_iter([
        (net("10.0.0.0/8"), 1),
        (net("10.1.0.0/16"), 2),
        (net("10.2.0.0/16"), 3),
    ]);
    let mut seen = 0;
    let result = table.walk(|_, v| {
        seen += 1;
        if *v == 2 {
            Err("stop")
        } else {
            Ok(())
        }
    });
    assert_eq!(result, Err("stop"));
    assert_eq!(seen, 2);
}

#[test]
fn clear_resets_everything() {
    let mut table: RoutingTable<u32> = RoutingTable::new();
    table.insert(net("10.0.0.0/8"), 1);
    table.insert(net("2001:db8::/32"), 2);
    table.clear();
    assert!(table.is_empty());
    assert_eq!(table.iter().count(), 0);
    assert_eq!(table, RoutingTable::new());
}

#[test]
fn deep_v6_routes() {
    let mut table: RoutingTable<u32> = RoutingTable::new();
    table.insert(net("2001:db8::/32"), 1);
    table.insert(net("2001:db8:0:0:8000::/65"), 2);
    table.insert(net("2001:db8::8000:0:0:1/128"), 3);

    assert_eq!(table.lookup(&addr("2001:db8::1")), Some(&1));
    assert_eq!(table.lookup(&addr("2001:db8:0:0:8000::99")), Some(&2));
    assert_eq!(table.lookup(&addr("2001:db8::8000:0:0:1")), Some(&3));
    assert_eq!(table.lookup(&addr("2001:db9::1")), None);
}

#[test]
fn queries_on_the_empty_table() {
    let table: RoutingTable<u32> = RoutingTable::new();
    assert_eq!(table.lookup(&addr("10.0.0.1")), None);
    assert_eq!(table.lookup(&addr("::1")), None);
    assert!(!table.contains(&addr("10.0.0.1")));
    assert_eq!(table.get(&net("10.0.0.0/8")), None);
    assert_eq!(table.lookup_prefix_lpm(&net("10.0.0.0/8")), None);
    assert_eq!(table.iter().count(), 0);
    assert_eq!(table.subnets(&net("0.0.0.0/0")), Vec::<IpNet>::new());
    assert_eq!(table.supernets(&net("10.0.0.0/8")), Vec::<IpNet>::new());
    assert!(!table.overlaps_prefix(&net("0.0.0.0/0")));
}

#[generic_tests::define]
mod generic {
    use super::*;
    use std::fmt::Debug;

    #[test]
    fn values_of_any_type<V: From<u8> + Clone + PartialEq + Debug>() {
        let mut table: RoutingTable<V> = RoutingTable::new();
        table.insert(net("10.0.0.0/8"), V::from(1));
        table.insert(net("10.1.0.0/16"), V::from(2));
        assert_eq!(table.lookup(&addr("10.1.2.3")), Some(&V::from(2)));
        assert_eq!(table.lookup(&addr("10.200.0.1")), Some(&V::from(1)));
        assert_eq!(table.remove(&net("10.1.0.0/16")), Some(V::from(2)));
        assert_eq!(table.lookup(&addr("10.1.2.3")), Some(&V::from(1)));
    }

    #[test]
    fn worst_case_chain<V: From<u8> + Clone + PartialEq + Debug>() {
        let mut table: RoutingTable<V> = RoutingTable::new();
        for (i, prefix) in super::WORST_CASE_PFXS_V4.iter().enumerate() {
            table.insert(prefix.parse().unwrap(), V::from(i as u8));
        }
        assert_eq!(
            table.lookup(&addr("255.255.255.255")),
            Some(&V::from(7))
        );
        table.remove(&net("255.255.255.255/32"));
        assert_eq!(table.lookup(&addr("255.255.255.255")), None);
    }

    #[instantiate_tests(<u8>)]
    mod val_u8 {}

    #[instantiate_tests(<u32>)]
    mod val_u32 {}

    #[instantiate_tests(<u128>)]
    mod val_u128 {}

    #[instantiate_tests(<i64>)]
    mod val_i64 {}
}
