//! Module for testing using fuzzing (quickcheck)
#![allow(clippy::type_complexity)]

use std::fmt::Debug;
use std::net::{Ipv4Addr, Ipv6Addr};

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use quickcheck::Arbitrary;

mod basic;
mod set_ops;

#[derive(Debug, PartialEq, Clone, Copy)]
enum Operation<P, T> {
    Add(P, T),
    Remove(P),
}

const DEFAULT_NUM_TESTS: usize = 1000;
const DEFAULT_GEN_SIZE: usize = 60;

fn proptest_runner<A: Arbitrary + Debug + PartialEq, F: Fn(A) -> bool>(f: F) {
    let num_tests: usize = std::env::var("QUICKCHECK_TESTS")
        .ok()
        .and_then(|x| x.parse::<usize>().ok())
        .unwrap_or(DEFAULT_NUM_TESTS);

    let gen_size: usize = std::env::var("QUICKCHECK_GENERATOR_SIZE")
        .ok()
        .and_then(|x| x.parse::<usize>().ok())
        .unwrap_or(DEFAULT_GEN_SIZE);

    let mut gen = quickcheck::Gen::new(gen_size);

    // sample all inputs
    for _ in 0..num_tests {
        let input = A::arbitrary(&mut gen);
        let input_c = input.clone();
        let success = f(input_c);
        if !success {
            shrink_failure(f, input)
        }
    }
}

fn shrink_failure<A: Arbitrary + Debug + PartialEq, F: Fn(A) -> bool>(f: F, input: A) -> ! {
    for i in input.shrink() {
        let i_c = i.clone();
        let success = f(i_c);
        if !success {
            shrink_failure(f, i)
        }
    }
    // if we reach this point, then all shrunken inputs work. Therefore, `input` is the minimal
    // input
    panic!(
        "[QUICKCHECK] Test case failed!\n  Minimal input:\n    {:?}",
        input
    );
}

macro_rules! qc {
    ($name:ident, $f:ident) => {
        #[test]
        fn $name() {
            proptest_runner($f)
        }
    };
}
pub(crate) use qc;

/// Stride-boundary lengths get extra weight so that routes regularly land
/// exactly on a node boundary or as a host route.
const LENS_V4: [u8; 37] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25,
    26, 27, 28, 29, 30, 31, 32, 8, 16, 24, 32,
];

/// An arbitrary IPv4 prefix, always in canonical (masked) form.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
struct Pfx4(Ipv4Net);

impl Debug for Pfx4 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Arbitrary for Pfx4 {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        let len = *g.choose(&LENS_V4).unwrap();
        let addr = Ipv4Addr::from(u32::arbitrary(g));
        Self(Ipv4Net::new(addr, len).unwrap().trunc())
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        if self.0.prefix_len() == 0 {
            quickcheck::empty_shrinker()
        } else {
            let shorter = Ipv4Net::new(self.0.addr(), self.0.prefix_len() - 1)
                .unwrap()
                .trunc();
            quickcheck::single_shrinker(Self(shorter))
        }
    }
}

/// An arbitrary IPv6 prefix. The address is built from a small set of
/// octet patterns so that prefixes share paths often enough to exercise
/// deep nodes.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
struct Pfx6(Ipv6Net);

impl Debug for Pfx6 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Arbitrary for Pfx6 {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        let len = u8::arbitrary(g) % 129;
        let mut octets = [0u8; 16];
        for octet in octets.iter_mut() {
            *octet = *g.choose(&[0x00, 0x01, 0x20, 0x80, 0xfe, 0xff]).unwrap();
        }
        Self(Ipv6Net::new(Ipv6Addr::from(octets), len).unwrap().trunc())
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        if self.0.prefix_len() == 0 {
            quickcheck::empty_shrinker()
        } else {
            let shorter = Ipv6Net::new(self.0.addr(), self.0.prefix_len() - 1)
                .unwrap()
                .trunc();
            quickcheck::single_shrinker(Self(shorter))
        }
    }
}

impl From<Pfx4> for IpNet {
    fn from(p: Pfx4) -> Self {
        IpNet::V4(p.0)
    }
}

impl From<Pfx6> for IpNet {
    fn from(p: Pfx6) -> Self {
        IpNet::V6(p.0)
    }
}

impl<P: Arbitrary, T: Arbitrary> Arbitrary for Operation<P, T> {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        let p = P::arbitrary(g);
        if g.choose(&[
            true, true, true, true, true, true, true, false, false, false,
        ])
        .copied()
        .unwrap_or_default()
        {
            let t = T::arbitrary(g);
            Self::Add(p, t)
        } else {
            Self::Remove(p)
        }
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        match self {
            Operation::Add(p, t) => {
                let t = t.clone();
                Box::new(
                    p.clone()
                        .shrink()
                        .map(move |p| Operation::Add(p, t.clone())),
                )
            }
            Operation::Remove(p) => Box::new(p.clone().shrink().map(|p| Operation::Remove(p))),
        }
    }
}
