//! Portable string-seeded pseudo-random numbers.
//!
//! [`SeedRandom`] reproduces the ARC4 generator of the widely used
//! `seedrandom` JavaScript library bit for bit, so a seed key such as
//! `"player-1 1700000000000"` yields the same draw here, in a browser, or in
//! an analytics notebook. Template selection depends on this: given a logged
//! `userId` and `timestamp`, anyone can recompute which prompt was used.
//!
//! Algorithm:
//! 1. Key schedule input: the seed's UTF-16 code units are folded into a key
//!    of at most 256 bytes (`key[j & 255] = (smear ^= key[j & 255] * 19) + unit`).
//! 2. Standard RC4 key scheduling over that key, then 256 output bytes are
//!    discarded (RC4-drop\[256\]).
//! 3. Each float draws 6 bytes as a 48-bit numerator, then keeps appending
//!    bytes until 52 significant bits are filled, yielding a value in `[0, 1)`.

const WIDTH: usize = 256;
const MASK: usize = WIDTH - 1;
const CHUNKS: u32 = 6;
/// 2^48: denominator for the initial 6-byte numerator.
const START_DENOM: f64 = 281_474_976_710_656.0;
/// 2^52: the number of significant bits to fill.
const SIGNIFICANCE: f64 = 4_503_599_627_370_496.0;
/// 2^53: one bit past f64 precision.
const OVERFLOW: f64 = 9_007_199_254_740_992.0;

/// Seeded ARC4 generator compatible with `seedrandom(seed)`.
#[derive(Clone)]
pub struct SeedRandom {
    s: [u8; WIDTH],
    i: usize,
    j: usize,
}

impl std::fmt::Debug for SeedRandom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedRandom")
            .field("i", &self.i)
            .field("j", &self.j)
            .finish_non_exhaustive()
    }
}

impl SeedRandom {
    /// Create a generator from a seed string.
    pub fn new(seed: &str) -> Self {
        let key = mix_key(seed);
        let mut rng = Self::from_key(&key);
        // RC4-drop[256].
        rng.next_bytes(WIDTH as u32);
        rng
    }

    fn from_key(key: &[u8]) -> Self {
        // An empty key behaves as a single zero byte.
        let key: &[u8] = if key.is_empty() { &[0] } else { key };

        let mut s = [0u8; WIDTH];
        for (i, slot) in s.iter_mut().enumerate() {
            *slot = i as u8;
        }

        let mut j = 0usize;
        for i in 0..WIDTH {
            let t = s[i];
            j = MASK & (j + key[i % key.len()] as usize + t as usize);
            s[i] = s[j];
            s[j] = t;
        }

        Self { s, i: 0, j: 0 }
    }

    /// Produce the next `count` keystream bytes as a big-endian number.
    ///
    /// Only counts up to 6 are exact; larger counts are used solely to
    /// advance the stream.
    fn next_bytes(&mut self, count: u32) -> f64 {
        let mut r = 0.0;
        for _ in 0..count {
            self.i = MASK & (self.i + 1);
            let t = self.s[self.i];
            self.j = MASK & (self.j + t as usize);
            self.s[self.i] = self.s[self.j];
            self.s[self.j] = t;
            let idx = MASK & (self.s[self.i] as usize + self.s[self.j] as usize);
            r = r * WIDTH as f64 + self.s[idx] as f64;
        }
        r
    }

    /// Next float in `[0, 1)` with 52 bits of randomness.
    pub fn next_f64(&mut self) -> f64 {
        let mut n = self.next_bytes(CHUNKS);
        let mut d = START_DENOM;
        let mut x: u32 = 0;
        while n < SIGNIFICANCE {
            n = (n + x as f64) * WIDTH as f64;
            d *= WIDTH as f64;
            x = self.next_bytes(1) as u32;
        }
        while n >= OVERFLOW {
            n /= 2.0;
            d /= 2.0;
            x >>= 1;
        }
        (n + x as f64) / d
    }
}

/// Fold the seed's UTF-16 code units into an RC4 key.
fn mix_key(seed: &str) -> Vec<u8> {
    let mut key: Vec<u8> = Vec::new();
    let mut smear: u32 = 0;
    for (j, unit) in seed.encode_utf16().enumerate() {
        let idx = MASK & j;
        if idx == key.len() {
            key.push(0);
        }
        smear ^= key[idx] as u32 * 19;
        key[idx] = (MASK as u32 & smear.wrapping_add(unit as u32)) as u8;
    }
    key
}

/// Seed key for a user and timestamp: `"{userId or abc} {timestamp}"`.
pub fn seed_key(user_id: Option<&str>, timestamp: i64) -> String {
    let user = match user_id {
        Some(u) if !u.is_empty() => u,
        _ => "abc",
    };
    format!("{user} {timestamp}")
}

/// Pick an index in `0..len` from the first draw of `seed`.
///
/// Returns `None` for an empty list. The index is `floor(draw * len)`,
/// clamped to `len - 1`.
pub fn pick_index(seed: &str, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let draw = SeedRandom::new(seed).next_f64();
    let index = (draw * len as f64).floor() as usize;
    Some(index.min(len - 1))
}
