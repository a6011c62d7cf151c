//! Typosquatting variation engine.
//!
//! This module expands one registrable name into tagged look-alike candidates.
//! Each mutation family is a pure function of the name, the suffix and a
//! seeded RNG; their outputs are merged in declared family order so the first
//! family to produce a name owns it.
//!
//! # Examples
//!
//! ```
//! use typoscan_lib::generate::{generate, GeneratorOptions};
//! use typoscan_lib::MutationFamily;
//!
//! let options = GeneratorOptions::default().with_families(vec![MutationFamily::Omission]);
//! let names: Vec<String> = generate("example", "com", &options)
//!     .into_iter()
//!     .map(|c| c.name)
//!     .collect();
//!
//! assert!(names.contains(&"xample.com".to_string()));
//! assert!(names.contains(&"exampl.com".to_string()));
//! ```

use crate::error::ScanError;
use crate::types::{CandidateDomain, MutationFamily, ScanConfig};
use crate::utils::split_domain;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;

/// Symbols tried by Replacement. Upper-case letters collapse to lower case.
const REPLACEMENT_CHARS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_";

/// Symbols tried by Insertion.
const INSERTION_CHARS: &str = "abcdefghijklmnopqrstuvwxyz0123456789";

const VOWELS: &str = "aeiou";

const HOMOGLYPHS: &[(char, &str)] = &[
    ('o', "0ø"),
    ('l', "1|"),
    ('e', "3€"),
    ('a', "4@"),
    ('s', "5$"),
    ('t', "7+"),
    ('b', "8ß"),
    ('g', "9q"),
    ('i', "!|1"),
    ('z', "2"),
    ('c', "("),
];

const KEYBOARD_ADJACENT: &[(char, &str)] = &[
    ('a', "qwsz"),
    ('b', "vghn"),
    ('c', "xdfv"),
    ('d', "erfcxs"),
    ('e', "rdsw"),
    ('f', "rtgvcd"),
    ('g', "tyhbvf"),
    ('h', "yujnbg"),
    ('i', "uojk"),
    ('j', "uiklhn"),
    ('k', "ijolm"),
    ('l', "kop"),
    ('m', "njk"),
    ('n', "bhjm"),
    ('o', "ipkl"),
    ('p', "ol"),
    ('q', "wa"),
    ('r', "tfd"),
    ('s', "wedxz"),
    ('t', "ygfr"),
    ('u', "yihj"),
    ('v', "cfgb"),
    ('w', "qase"),
    ('x', "zsdc"),
    ('y', "tuhg"),
    ('z', "asx"),
];

/// Suffixes tried by TLD swap.
pub const SWAP_SUFFIXES: &[&str] = &[
    "com", "net", "org", "info", "biz", "co", "io", "ai", "app", "in", "xyz", "site", "tech",
    "dev", "me", "us", "store", "online",
];

/// Labels prepended by Subdomain.
pub const SUBDOMAIN_LABELS: &[&str] = &["www", "mail", "secure", "admin", "cpanel", "ftp"];

/// Keywords attached by Addition (combosquatting).
pub const ADDITION_KEYWORDS: &[&str] = &[
    "login", "secure", "app", "store", "web", "site", "my", "online", "home", "cloud", "account",
    "dashboard", "portal", "checkout", "signin", "verify", "access", "system", "manage", "control",
    "update", "confirm", "security", "auth", "connect", "client",
];

/// Known misspellings of frequently targeted brands.
const DICTIONARY: &[(&str, &[&str])] = &[
    ("google", &["goggle", "goolge", "gooogle"]),
    ("amazon", &["amason", "amazn", "amzon"]),
    ("facebook", &["facebok", "facbook", "faecbook"]),
    ("youtube", &["youtub", "yutube", "yooutube"]),
    ("microsoft", &["microsft", "mircosoft", "microsfot"]),
    ("paypal", &["paypall", "payapl", "paypl"]),
    ("apple", &["aple", "appel", "applle"]),
    ("netflix", &["netflx", "netlfix", "neflix"]),
];

/// Options for a generation run.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Maximum number of candidates, excluding the original. None = no cap.
    pub cap: Option<usize>,
    /// Seed for the Shuffle family and cap sampling
    pub seed: u64,
    /// Number of random permutations drawn by Shuffle
    pub shuffle_rounds: usize,
    /// Families to run; all when None
    pub families: Option<Vec<MutationFamily>>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            cap: Some(1000),
            seed: 0,
            shuffle_rounds: 120,
            families: None,
        }
    }
}

impl GeneratorOptions {
    /// Options matching a scan configuration, with the seed already resolved.
    pub fn from_config(config: &ScanConfig, seed: u64) -> Self {
        Self {
            cap: config.cap,
            seed,
            shuffle_rounds: config.shuffle_rounds,
            families: config.families.clone(),
        }
    }

    pub fn with_cap(mut self, cap: Option<usize>) -> Self {
        self.cap = cap;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_shuffle_rounds(mut self, rounds: usize) -> Self {
        self.shuffle_rounds = rounds;
        self
    }

    pub fn with_families(mut self, families: Vec<MutationFamily>) -> Self {
        self.families = Some(families);
        self
    }

    fn runs(&self, family: MutationFamily) -> bool {
        match &self.families {
            Some(families) => families.contains(&family),
            None => true,
        }
    }
}

/// One-line description of what a family produces.
pub fn family_description(family: MutationFamily) -> &'static str {
    match family {
        MutationFamily::Original => "the input domain itself",
        MutationFamily::Omission => "drop one character",
        MutationFamily::Replacement => "replace one character with a letter, digit, '-' or '_'",
        MutationFamily::Insertion => "insert a letter or digit at any position",
        MutationFamily::Repetition => "double one character",
        MutationFamily::DoubleRepetition => "triple one character",
        MutationFamily::Transposition => "swap two adjacent characters",
        MutationFamily::Homoglyph => "replace a character with a look-alike symbol",
        MutationFamily::Bitsquatting => "flip one bit of a character",
        MutationFamily::Hyphenation => "insert a hyphen inside the name",
        MutationFamily::VowelSwap => "replace a vowel with another vowel",
        MutationFamily::KeyboardProximity => "replace a character with a neighbouring key",
        MutationFamily::TldSwap => "keep the name under a different suffix",
        MutationFamily::Subdomain => "prepend a service label such as www or mail",
        MutationFamily::Dictionary => "known misspellings of popular brands",
        MutationFamily::Addition => "attach a keyword such as login or secure",
        MutationFamily::Plural => "append s or es",
        MutationFamily::Shuffle => "random permutations of the characters",
    }
}

fn with_suffix(labels: impl IntoIterator<Item = String>, suffix: &str) -> Vec<String> {
    labels
        .into_iter()
        .map(|label| format!("{}.{}", label, suffix))
        .collect()
}

/// Replace the character at `index` with each candidate symbol.
fn substitutions(chars: &[char], index: usize, symbols: impl Iterator<Item = char>) -> Vec<String> {
    symbols
        .filter(|&symbol| symbol != chars[index])
        .map(|symbol| {
            let mut mutated = chars.to_vec();
            mutated[index] = symbol;
            mutated.into_iter().collect()
        })
        .collect()
}

fn omission(chars: &[char]) -> Vec<String> {
    (0..chars.len())
        .map(|i| {
            chars
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, c)| c)
                .collect()
        })
        .collect()
}

fn replacement(chars: &[char]) -> Vec<String> {
    (0..chars.len())
        .flat_map(|i| substitutions(chars, i, REPLACEMENT_CHARS.chars()))
        .collect()
}

fn insertion(chars: &[char]) -> Vec<String> {
    (0..=chars.len())
        .flat_map(|i| {
            INSERTION_CHARS.chars().map(move |symbol| {
                let mut mutated = chars.to_vec();
                mutated.insert(i, symbol);
                mutated.into_iter().collect::<String>()
            })
        })
        .collect()
}

/// Repeat the character at each position `extra` more times.
fn repetition(chars: &[char], extra: usize) -> Vec<String> {
    (0..chars.len())
        .map(|i| {
            let mut mutated = chars[..=i].to_vec();
            mutated.extend(std::iter::repeat(chars[i]).take(extra));
            mutated.extend_from_slice(&chars[i + 1..]);
            mutated.into_iter().collect()
        })
        .collect()
}

fn transposition(chars: &[char]) -> Vec<String> {
    (0..chars.len().saturating_sub(1))
        .map(|i| {
            let mut mutated = chars.to_vec();
            mutated.swap(i, i + 1);
            mutated.into_iter().collect()
        })
        .collect()
}

fn homoglyph(chars: &[char]) -> Vec<String> {
    (0..chars.len())
        .flat_map(|i| {
            let glyphs = HOMOGLYPHS
                .iter()
                .find(|(c, _)| *c == chars[i])
                .map_or("", |(_, glyphs)| *glyphs);
            substitutions(chars, i, glyphs.chars())
        })
        .collect()
}

fn bitsquatting(chars: &[char]) -> Vec<String> {
    (0..chars.len())
        .flat_map(|i| {
            let code = chars[i] as u32;
            let flipped = (0..8)
                .filter_map(move |bit| char::from_u32(code ^ (1 << bit)))
                .filter(|c| c.is_ascii_alphanumeric());
            substitutions(chars, i, flipped)
        })
        .collect()
}

fn hyphenation(chars: &[char]) -> Vec<String> {
    (1..chars.len())
        .map(|i| {
            let mut mutated = chars.to_vec();
            mutated.insert(i, '-');
            mutated.into_iter().collect()
        })
        .collect()
}

fn vowel_swap(chars: &[char]) -> Vec<String> {
    (0..chars.len())
        .filter(|&i| VOWELS.contains(chars[i]))
        .flat_map(|i| substitutions(chars, i, VOWELS.chars()))
        .collect()
}

fn keyboard_proximity(chars: &[char]) -> Vec<String> {
    (0..chars.len())
        .flat_map(|i| {
            let neighbours = KEYBOARD_ADJACENT
                .iter()
                .find(|(c, _)| *c == chars[i])
                .map_or("", |(_, keys)| *keys);
            substitutions(chars, i, neighbours.chars())
        })
        .collect()
}

fn dictionary(name: &str) -> Vec<String> {
    DICTIONARY
        .iter()
        .find(|(brand, _)| *brand == name)
        .map(|(_, typos)| typos.iter().map(|t| t.to_string()).collect())
        .unwrap_or_default()
}

fn addition(name: &str) -> Vec<String> {
    ADDITION_KEYWORDS
        .iter()
        .flat_map(|keyword| [format!("{}{}", keyword, name), format!("{}{}", name, keyword)])
        .collect()
}

fn plural(name: &str) -> Vec<String> {
    if name.ends_with('s') {
        return Vec::new();
    }

    let mut plurals = vec![format!("{}s", name)];
    if ["sh", "ch", "x", "z"].iter().any(|ending| name.ends_with(ending)) {
        plurals.push(format!("{}es", name));
    }
    plurals
}

fn shuffle(chars: &[char], rounds: usize, rng: &mut StdRng) -> Vec<String> {
    (0..rounds)
        .map(|_| {
            let mut mutated = chars.to_vec();
            mutated.shuffle(rng);
            mutated.into_iter().collect()
        })
        .collect()
}

/// Raw output of one family, as full domain names.
fn run_family(
    family: MutationFamily,
    name: &str,
    suffix: &str,
    options: &GeneratorOptions,
    rng: &mut StdRng,
) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();

    match family {
        MutationFamily::Original => Vec::new(),
        MutationFamily::Omission => with_suffix(omission(&chars), suffix),
        MutationFamily::Replacement => with_suffix(replacement(&chars), suffix),
        MutationFamily::Insertion => with_suffix(insertion(&chars), suffix),
        MutationFamily::Repetition => with_suffix(repetition(&chars, 1), suffix),
        MutationFamily::DoubleRepetition => with_suffix(repetition(&chars, 2), suffix),
        MutationFamily::Transposition => with_suffix(transposition(&chars), suffix),
        MutationFamily::Homoglyph => with_suffix(homoglyph(&chars), suffix),
        MutationFamily::Bitsquatting => with_suffix(bitsquatting(&chars), suffix),
        MutationFamily::Hyphenation => with_suffix(hyphenation(&chars), suffix),
        MutationFamily::VowelSwap => with_suffix(vowel_swap(&chars), suffix),
        MutationFamily::KeyboardProximity => with_suffix(keyboard_proximity(&chars), suffix),
        MutationFamily::TldSwap => SWAP_SUFFIXES
            .iter()
            .filter(|&&s| s != suffix)
            .map(|s| format!("{}.{}", name, s))
            .collect(),
        MutationFamily::Subdomain => SUBDOMAIN_LABELS
            .iter()
            .map(|label| format!("{}.{}.{}", label, name, suffix))
            .collect(),
        MutationFamily::Dictionary => with_suffix(dictionary(name), suffix),
        MutationFamily::Addition => with_suffix(addition(name), suffix),
        MutationFamily::Plural => with_suffix(plural(name), suffix),
        MutationFamily::Shuffle => with_suffix(shuffle(&chars, options.shuffle_rounds, rng), suffix),
    }
}

/// Whether a generated name has a sane label structure: non-empty labels of
/// at most 63 bytes that do not start or end with a hyphen.
pub fn is_well_formed(domain: &str) -> bool {
    !domain.is_empty()
        && domain.len() <= 253
        && domain.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && !label.chars().any(char::is_whitespace)
        })
}

/// Generate candidates for `name` under `suffix`, excluding the original.
///
/// Output is deduplicated (first family in declared order wins), sampled
/// down to `options.cap` with a seeded RNG, and sorted by family then name.
pub fn generate(name: &str, suffix: &str, options: &GeneratorOptions) -> Vec<CandidateDomain> {
    let name = name.to_lowercase();
    let suffix = suffix.to_lowercase();
    let original = format!("{}.{}", name, suffix);
    let mut rng = StdRng::seed_from_u64(options.seed);

    // Insertion-ordered union keyed by name
    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates: Vec<CandidateDomain> = Vec::new();

    for family in MutationFamily::ALL {
        if !options.runs(family) {
            continue;
        }

        for domain in run_family(family, &name, &suffix, options, &mut rng) {
            let domain = domain.to_lowercase();
            if domain == original || !is_well_formed(&domain) || !seen.insert(domain.clone()) {
                continue;
            }
            candidates.push(CandidateDomain::new(domain, family));
        }
    }

    if let Some(cap) = options.cap {
        if candidates.len() > cap {
            tracing::debug!(
                "Sampling {} of {} generated candidates for {}",
                cap,
                candidates.len(),
                original
            );
            candidates = candidates.choose_multiple(&mut rng, cap).cloned().collect();
        }
    }

    candidates.sort_by(|a, b| a.family.cmp(&b.family).then_with(|| a.name.cmp(&b.name)));
    candidates
}

/// Split `domain` and generate its candidates, with the Original entry first.
///
/// # Errors
///
/// Returns an input error when `domain` is empty or has no registrable name.
pub fn generate_for_domain(
    domain: &str,
    options: &GeneratorOptions,
) -> Result<Vec<CandidateDomain>, ScanError> {
    let (name, suffix) = split_domain(domain)?;

    let mut candidates = vec![CandidateDomain::new(
        format!("{}.{}", name, suffix),
        MutationFamily::Original,
    )];
    candidates.extend(generate(&name, &suffix, options));

    Ok(candidates)
}
