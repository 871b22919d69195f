// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use weft_core::{Locator, TopicId, TopicMap};

/// XSD string datatype locator used by most fixtures.
pub fn xsd_string() -> Locator {
    Locator::new("http://www.w3.org/2001/XMLSchema#string")
}

/// Creates a topic carrying a single subject identifier.
pub fn topic_with_sid(map: &mut TopicMap, iri: &str) -> TopicId {
    let topic = map.create_topic();
    map.add_subject_identifier(topic, Locator::new(iri))
        .expect("adding a subject identifier to a fresh topic");
    topic
}

/// Tiny deterministic RNG (xorshift64*) so tests don't need `rand`.
#[derive(Clone)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Creates a new PRNG with the given seed (zero is replaced with 1).
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    /// Returns the next pseudo-random `u64` in the xorshift64* sequence.
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Returns a pseudo-random value in `[0, upper)`.
    pub fn gen_range_usize(&mut self, upper: usize) -> usize {
        if upper <= 1 {
            return 0;
        }
        (self.next_u64() as usize) % upper
    }
}

/// Fisher–Yates shuffle (deterministic).
pub fn shuffle<T>(rng: &mut XorShift64, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range_usize(i + 1);
        items.swap(i, j);
    }
}

/// Calls `f` for every permutation of `items` in-place (Heap's algorithm).
pub fn for_each_permutation<T: Clone>(items: &mut [T], mut f: impl FnMut(&[T])) {
    let n = items.len();
    if n == 0 {
        f(items);
        return;
    }
    let mut c = vec![0usize; n];
    f(items);
    let mut i = 0usize;
    while i < n {
        if c[i] < i {
            if i % 2 == 0 {
                items.swap(0, i);
            } else {
                items.swap(c[i], i);
            }
            f(items);
            c[i] += 1;
            i = 0;
        } else {
            c[i] = 0;
            i += 1;
        }
    }
}

/// Seeds for determinism drills.
pub const SEEDS: &[u64] = &[
    0x0000_0000_0000_0001,
    0x1234_5678_9ABC_DEF0,
    0xDEAD_BEEF_CAFE_BABE,
    0xFEED_FACE_0123_4567,
];

/// Asserts two canonical byte forms are equal, with a readable diff of the
/// first differing line on failure.
pub fn assert_canon_eq(a: &[u8], b: &[u8], msg: &str) {
    if a == b {
        return;
    }
    let a = String::from_utf8_lossy(a);
    let b = String::from_utf8_lossy(b);
    for (line_a, line_b) in a.lines().zip(b.lines()) {
        assert_eq!(line_a, line_b, "{msg}");
    }
    panic!("{msg}: canonical forms differ in length\n--- a ---\n{a}\n--- b ---\n{b}");
}
