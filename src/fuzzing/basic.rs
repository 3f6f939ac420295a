use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};

use super::*;
use crate::RoutingTable;

qc!(mods_match_btreemap, _mods_match_btreemap);
fn _mods_match_btreemap(ops: Vec<Operation<Pfx4, u32>>) -> bool {
    let mut table: RoutingTable<u32> = RoutingTable::new();
    let mut model: BTreeMap<Ipv4Net, u32> = BTreeMap::new();

    for op in &ops {
        match *op {
            Operation::Add(Pfx4(p), v) => {
                if table.insert(IpNet::V4(p), v) != model.insert(p, v) {
                    return false;
                }
            }
            Operation::Remove(Pfx4(p)) => {
                if table.remove(&IpNet::V4(p)) != model.remove(&p) {
                    return false;
                }
            }
        }
        if table.len() != model.len() {
            return false;
        }
    }

    let mut got: Vec<(IpNet, u32)> = table.iter().map(|(p, v)| (p, *v)).collect();
    got.sort();
    let want: Vec<(IpNet, u32)> = model.iter().map(|(p, v)| (IpNet::V4(*p), *v)).collect();
    got == want
}

qc!(mods_match_btreemap_v6, _mods_match_btreemap_v6);
fn _mods_match_btreemap_v6(ops: Vec<Operation<Pfx6, u32>>) -> bool {
    let mut table: RoutingTable<u32> = RoutingTable::new();
    let mut model: BTreeMap<Ipv6Net, u32> = BTreeMap::new();

    for op in &ops {
        match *op {
            Operation::Add(Pfx6(p), v) => {
                if table.insert(IpNet::V6(p), v) != model.insert(p, v) {
                    return false;
                }
            }
            Operation::Remove(Pfx6(p)) => {
                if table.remove(&IpNet::V6(p)) != model.remove(&p) {
                    return false;
                }
            }
        }
    }

    let mut got: Vec<(IpNet, u32)> = table.iter().map(|(p, v)| (p, *v)).collect();
    got.sort();
    let want: Vec<(IpNet, u32)> = model.iter().map(|(p, v)| (IpNet::V6(*p), *v)).collect();
    got == want
}

qc!(get_matches_btreemap, _get_matches_btreemap);
fn _get_matches_btreemap(entries: Vec<(Pfx4, u32)>) -> bool {
    let table: RoutingTable<u32> = entries.iter().map(|&(p, v)| (p.into(), v)).collect();
    let model: BTreeMap<Ipv4Net, u32> = entries.iter().map(|&(Pfx4(p), v)| (p, v)).collect();
    model
        .iter()
        .all(|(p, v)| table.get(&IpNet::V4(*p)) == Some(v))
}

qc!(entry_matches_insert, _entry_matches_insert);
fn _entry_matches_insert(entries: Vec<(Pfx4, u32)>) -> bool {
    let mut with_insert: RoutingTable<u32> = RoutingTable::new();
    let mut with_entry: RoutingTable<u32> = RoutingTable::new();
    for &(p, v) in &entries {
        with_insert.insert(p.into(), v);
        with_entry.entry(p.into()).insert(v);
    }
    with_insert == with_entry
}

qc!(lookup_matches_linear_scan, _lookup_matches_linear_scan);
fn _lookup_matches_linear_scan((entries, probes): (Vec<(Pfx4, u32)>, Vec<u32>)) -> bool {
    let table: RoutingTable<u32> = entries.iter().map(|&(p, v)| (p.into(), v)).collect();
    let model: BTreeMap<Ipv4Net, u32> = entries.iter().map(|&(Pfx4(p), v)| (p, v)).collect();

    for &probe in &probes {
        let addr = Ipv4Addr::from(probe);
        let want = model
            .iter()
            .filter(|(p, _)| p.contains(&addr))
            .max_by_key(|(p, _)| p.prefix_len())
            .map(|(_, v)| v);
        if table.lookup(&IpAddr::V4(addr)) != want {
            return false;
        }
        if table.contains(&IpAddr::V4(addr)) != want.is_some() {
            return false;
        }
    }
    true
}

qc!(lookup_prefix_matches_linear_scan, _lookup_prefix_matches_linear_scan);
fn _lookup_prefix_matches_linear_scan((entries, queries): (Vec<(Pfx4, u32)>, Vec<Pfx4>)) -> bool {
    let table: RoutingTable<u32> = entries.iter().map(|&(p, v)| (p.into(), v)).collect();
    let model: BTreeMap<Ipv4Net, u32> = entries.iter().map(|&(Pfx4(p), v)| (p, v)).collect();

    for &Pfx4(query) in &queries {
        // the most specific stored prefix containing the whole query
        let want = model
            .iter()
            .filter(|(p, _)| p.contains(&query))
            .max_by_key(|(p, _)| p.prefix_len());
        let got = table.lookup_prefix_lpm(&IpNet::V4(query));
        match (want, got) {
            (None, None) => {}
            (Some((p, v)), Some((got_p, got_v))) => {
                if IpNet::V4(*p) != got_p || v != got_v {
                    return false;
                }
            }
            _ => return false,
        }
    }
    true
}
