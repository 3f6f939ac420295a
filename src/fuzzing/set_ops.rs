use std::collections::BTreeMap;

use super::*;
use crate::RoutingTable;

qc!(overlaps_matches_naive, _overlaps_matches_naive);
fn _overlaps_matches_naive((a, b): (Vec<Pfx4>, Vec<Pfx4>)) -> bool {
    let table_a: RoutingTable<()> = a.iter().map(|&p| (p.into(), ())).collect();
    let table_b: RoutingTable<()> = b.iter().map(|&p| (p.into(), ())).collect();

    let want = a
        .iter()
        .any(|&Pfx4(pa)| b.iter().any(|&Pfx4(pb)| pa.contains(&pb) || pb.contains(&pa)));

    table_a.overlaps(&table_b) == want && table_b.overlaps(&table_a) == want
}

qc!(overlaps_prefix_matches_naive, _overlaps_prefix_matches_naive);
fn _overlaps_prefix_matches_naive((entries, queries): (Vec<Pfx4>, Vec<Pfx4>)) -> bool {
    let table: RoutingTable<()> = entries.iter().map(|&p| (p.into(), ())).collect();

    for &Pfx4(query) in &queries {
        let want = entries
            .iter()
            .any(|&Pfx4(p)| p.contains(&query) || query.contains(&p));
        if table.overlaps_prefix(&IpNet::V4(query)) != want {
            return false;
        }
    }
    true
}

qc!(union_matches_model, _union_matches_model);
fn _union_matches_model((a, b): (Vec<(Pfx4, u32)>, Vec<(Pfx4, u32)>)) -> bool {
    let mut table_a: RoutingTable<u32> = a.iter().map(|&(p, v)| (p.into(), v)).collect();
    let table_b: RoutingTable<u32> = b.iter().map(|&(p, v)| (p.into(), v)).collect();

    let mut model: BTreeMap<Ipv4Net, u32> = a.iter().map(|&(Pfx4(p), v)| (p, v)).collect();
    // on duplicates, the other table wins
    model.extend(b.iter().map(|&(Pfx4(p), v)| (p, v)));

    table_a.union(&table_b);
    if table_a.len() != model.len() {
        return false;
    }

    let mut got: Vec<(IpNet, u32)> = table_a.iter().map(|(p, v)| (p, *v)).collect();
    got.sort();
    let want: Vec<(IpNet, u32)> = model.iter().map(|(p, v)| (IpNet::V4(*p), *v)).collect();
    got == want
}

qc!(union_keeps_self_overlap, _union_keeps_self_overlap);
fn _union_keeps_self_overlap((a, b): (Vec<(Pfx4, u32)>, Vec<(Pfx4, u32)>)) -> bool {
    let mut table_a: RoutingTable<u32> = a.iter().map(|&(p, v)| (p.into(), v)).collect();
    let table_b: RoutingTable<u32> = b.iter().map(|&(p, v)| (p.into(), v)).collect();
    table_a.union(&table_b);

    // everything in b must now overlap a
    table_b.is_empty() || table_a.overlaps(&table_b)
}

qc!(subnets_matches_filter, _subnets_matches_filter);
fn _subnets_matches_filter((entries, query): (Vec<(Pfx4, u32)>, Pfx4)) -> bool {
    let table: RoutingTable<u32> = entries.iter().map(|&(p, v)| (p.into(), v)).collect();
    let model: BTreeMap<Ipv4Net, u32> = entries.iter().map(|&(Pfx4(p), v)| (p, v)).collect();
    let Pfx4(query) = query;

    let want: Vec<IpNet> = model
        .keys()
        .filter(|p| query.contains(*p))
        .map(|p| IpNet::V4(*p))
        .collect();
    table.subnets(&IpNet::V4(query)) == want
}

qc!(supernets_matches_filter, _supernets_matches_filter);
fn _supernets_matches_filter((entries, query): (Vec<(Pfx4, u32)>, Pfx4)) -> bool {
    let table: RoutingTable<u32> = entries.iter().map(|&(p, v)| (p.into(), v)).collect();
    let model: BTreeMap<Ipv4Net, u32> = entries.iter().map(|&(Pfx4(p), v)| (p, v)).collect();
    let Pfx4(query) = query;

    let want: Vec<IpNet> = model
        .keys()
        .filter(|p| p.contains(&query))
        .map(|p| IpNet::V4(*p))
        .collect();
    table.supernets(&IpNet::V4(query)) == want
}
