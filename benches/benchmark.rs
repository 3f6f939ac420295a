use criterion::{criterion_group, criterion_main, Criterion};
use ipnet::IpNet;
use rand::prelude::*;
use std::net::IpAddr;
use stride_trie::RoutingTable;

fn do_random_inserts() {
    let mut table = RoutingTable::<u32>::new();

    let mut rng = thread_rng();

    for _ in 0..1_000 {
        let addr: u32 = rng.gen::<u32>() & 0xfff0_0000;
        let len = rng.gen_range(1..=12);
        let prefix: IpNet = IpNet::V4(ipnet::Ipv4Net::new(addr.into(), len).unwrap());

        let value: u32 = rng.gen::<u8>() as u32;
        table.insert(prefix, value);
    }
}

pub fn random_inserts(c: &mut Criterion) {
    c.bench_function("randomized inserts", |b| b.iter(do_random_inserts));
}

/// Every stride of the probe backtracks through the full binary tree
/// before the match is found one level up.
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

fn worst_case_table() -> RoutingTable<String> {
    WORST_CASE_PFXS_V4
        .iter()
        .map(|p| (p.parse::<IpNet>().unwrap(), p.to_string()))
        .collect()
}

pub fn worst_case_match(c: &mut Criterion) {
    let table = worst_case_table();
    let probe: IpAddr = "255.255.255.255".parse().unwrap();
    let probe_pfx: IpNet = "255.255.255.255/32".parse().unwrap();

    c.bench_function("worst case match contains", |b| {
        b.iter(|| table.contains(&probe))
    });
    c.bench_function("worst case match lookup", |b| b.iter(|| table.lookup(&probe)));
    c.bench_function("worst case match lookup_prefix", |b| {
        b.iter(|| table.lookup_prefix(&probe_pfx))
    });
}

pub fn worst_case_miss(c: &mut Criterion) {
    let mut table = worst_case_table();
    table.remove(&"255.255.255.255/32".parse().unwrap());
    let probe: IpAddr = "255.255.255.255".parse().unwrap();
    let probe_pfx: IpNet = "255.255.255.255/32".parse().unwrap();

    c.bench_function("worst case miss contains", |b| {
        b.iter(|| table.contains(&probe))
    });
    c.bench_function("worst case miss lookup", |b| b.iter(|| table.lookup(&probe)));
    c.bench_function("worst case miss lookup_prefix", |b| {
        b.iter(|| table.lookup_prefix(&probe_pfx))
    });
}

criterion_group!(benches, random_inserts, worst_case_match, worst_case_miss);
criterion_main!(benches);
