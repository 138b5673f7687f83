use std::collections::HashMap;
use std::sync::OnceLock;

use rand::Rng;

/// Character emitted when no layout is available to pick a neighbor from.
pub const FALLBACK_TYPO_CHAR: char = 'x';

// Hand-authored US QWERTY adjacency. Lowercase letters are mirrored to
// uppercase when the layout is built.
const QWERTY_NEIGHBORS: &[(char, &str)] = &[
    ('q', "wa"),
    ('w', "qase"),
    ('e', "wsdr"),
    ('r', "edft"),
    ('t', "rfgy"),
    ('y', "tghu"),
    ('u', "yhji"),
    ('i', "ujko"),
    ('o', "iklp"),
    ('p', "ol"),
    ('a', "qwsz"),
    ('s', "awedxz"),
    ('d', "swerfcx"),
    ('f', "dertgv"),
    ('g', "frthvb"),
    ('h', "gtyjbn"),
    ('j', "huyknm"),
    ('k', "jiolm"),
    ('l', "kop"),
    ('z', "asx"),
    ('x', "zsdc"),
    ('c', "xdfv"),
    ('v', "cfgb"),
    ('b', "vghn"),
    ('n', "bhjm"),
    ('m', "njk"),
    ('1', "2q"),
    ('2', "13wq"),
    ('3', "24ew"),
    ('4', "35re"),
    ('5', "46tr"),
    ('6', "57ty"),
    ('7', "68uy"),
    ('8', "79iu"),
    ('9', "80oi"),
    ('0', "9p"),
    ('-', "0p"),
    ('=', "-"),
    ('`', "1"),
    ('~', "`1"),
    ('!', "`12q"),
    ('@', "123wq"),
    ('#', "234ew"),
    ('$', "345re"),
    ('%', "456tr"),
    ('^', "567ty"),
    ('&', "678uy"),
    ('*', "789iu"),
    ('(', "890oi"),
    (')', "90p"),
    ('_', "-0p"),
    ('+', "-="),
    (',', "ml"),
    ('.', ",m"),
    ('/', "."),
    (' ', "cvbnm"),
];

/// Static "fat-finger" adjacency map used for typo injection.
#[derive(Debug, Clone)]
pub struct KeyboardLayout {
    neighbors: HashMap<char, Vec<char>>,
}

impl KeyboardLayout {
    pub fn build_us_qwerty() -> Self {
        let mut neighbors: HashMap<char, Vec<char>> = HashMap::new();

        for &(key, adjacent) in QWERTY_NEIGHBORS {
            neighbors.insert(key, adjacent.chars().collect());
        }

        for &(key, adjacent) in QWERTY_NEIGHBORS {
            if key.is_ascii_lowercase() {
                neighbors.insert(
                    key.to_ascii_uppercase(),
                    adjacent.chars().map(|c| c.to_ascii_uppercase()).collect(),
                );
            }
        }

        Self { neighbors }
    }

    /// Shared instance, built on first use.
    pub fn us_qwerty() -> &'static KeyboardLayout {
        static LAYOUT: OnceLock<KeyboardLayout> = OnceLock::new();
        LAYOUT.get_or_init(Self::build_us_qwerty)
    }

    /// Neighbors of `c`; empty for characters the table does not cover.
    pub fn neighbors(&self, c: char) -> &[char] {
        self.neighbors.get(&c).map(Vec::as_slice).unwrap_or(&[])
    }

    /// A uniformly chosen neighbor of `c`, or `c` itself if it has none.
    pub fn nearby_char(&self, c: char, rng: &mut impl Rng) -> char {
        let options = self.neighbors(c);
        if options.is_empty() {
            return c;
        }
        options[rng.gen_range(0..options.len())]
    }
}

/// Typo substitution for `c`.
///
/// A missing layout is not an error: the typo degrades to
/// [`FALLBACK_TYPO_CHAR`] so a session can still run.
pub fn nearby_char(layout: Option<&KeyboardLayout>, c: char, rng: &mut impl Rng) -> char {
    match layout {
        Some(layout) => layout.nearby_char(c, rng),
        None => FALLBACK_TYPO_CHAR,
    }
}
