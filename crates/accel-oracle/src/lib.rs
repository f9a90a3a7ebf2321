//! Software reference used to check the accelerator's answers and to
//! generate randomized dictionaries/probes for the round-trip test.
//!
//! Nothing here touches a bus; this crate exists purely so the
//! correctness check lives in one place instead of being reimplemented
//! by both the test driver and the in-process device model.

use rand::Rng;
use rand::seq::IndexedRandom;

/// Classic Wagner-Fischer edit distance, single-row rolling buffer.
#[must_use]
pub fn levenshtein(a: &[u8], b: &[u8]) -> u32 {
    if a.is_empty() {
        return b.len() as u32;
    }
    if b.is_empty() {
        return a.len() as u32;
    }

    let mut previous: Vec<u32> = (0..=b.len() as u32).collect();
    let mut current = vec![0u32; b.len() + 1];

    for (i, &ac) in a.iter().enumerate() {
        current[0] = i as u32 + 1;
        for (j, &bc) in b.iter().enumerate() {
            let cost = u32::from(ac != bc);
            current[j + 1] = (previous[j] + cost)
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Picks the dictionary entry closest to `probe`, breaking ties toward
/// the lowest index - mirroring the tie-breaking the accelerator itself
/// exhibits.
#[must_use]
pub fn best_match(probe: &[u8], dictionary: &[Vec<u8>]) -> Option<(u16, u8)> {
    dictionary
        .iter()
        .enumerate()
        .map(|(i, word)| (i as u16, levenshtein(probe, word).min(255) as u8))
        .min_by_key(|&(i, d)| (d, i))
}

/// Bounded alphabet and length ranges for generated words.
#[derive(Debug, Clone, Copy)]
pub struct CorpusParams {
    pub alphabet: &'static [u8],
    pub word_len: std::ops::RangeInclusive<usize>,
    pub probe_len: std::ops::RangeInclusive<usize>,
}

impl Default for CorpusParams {
    fn default() -> Self {
        Self {
            alphabet: b"abcdef",
            word_len: 1..=32,
            probe_len: 1..=16,
        }
    }
}

/// A random dictionary and a random batch of probes drawn from the same
/// alphabet, used by `accel-runner --test`.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub dictionary: Vec<Vec<u8>>,
    pub probes: Vec<Vec<u8>>,
}

/// Builds a randomized corpus. `rng` is threaded through explicitly so
/// callers can reproduce a failing run by fixing the seed.
pub fn generate_corpus(
    rng: &mut impl Rng,
    params: &CorpusParams,
    dictionary_size: usize,
    probe_count: usize,
) -> Corpus {
    let dictionary = (0..dictionary_size)
        .map(|_| random_word(rng, params.alphabet, params.word_len.clone()))
        .collect();
    let probes = (0..probe_count)
        .map(|_| random_word(rng, params.alphabet, params.probe_len.clone()))
        .collect();
    Corpus { dictionary, probes }
}

fn random_word(
    rng: &mut impl Rng,
    alphabet: &[u8],
    len_range: std::ops::RangeInclusive<usize>,
) -> Vec<u8> {
    let len = rng.random_range(len_range);
    (0..len)
        .map(|_| *alphabet.choose(rng).expect("alphabet must not be empty"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(levenshtein(b"hest", b"hest"), 0);
    }

    #[test]
    fn distance_is_symmetric() {
        assert_eq!(levenshtein(b"kitten", b"sitting"), levenshtein(b"sitting", b"kitten"));
        assert_eq!(levenshtein(b"kitten", b"sitting"), 3);
    }

    #[test]
    fn distance_against_empty_is_length() {
        assert_eq!(levenshtein(b"", b"abc"), 3);
        assert_eq!(levenshtein(b"abc", b""), 3);
    }

    #[test]
    fn best_match_breaks_ties_toward_lowest_index() {
        let dictionary = vec![b"cat".to_vec(), b"cot".to_vec(), b"dog".to_vec()];
        let (index, distance) = best_match(b"cog", &dictionary).unwrap();
        assert_eq!(index, 0);
        assert_eq!(distance, 1);
    }

    #[test]
    fn best_match_finds_exact_entry() {
        let dictionary = vec![b"h".to_vec(), b"he".to_vec(), b"hest".to_vec()];
        let (index, distance) = best_match(b"hest", &dictionary).unwrap();
        assert_eq!(index, 2);
        assert_eq!(distance, 0);
    }

    #[test]
    fn generated_corpus_respects_length_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let params = CorpusParams::default();
        let corpus = generate_corpus(&mut rng, &params, 64, 32);
        assert_eq!(corpus.dictionary.len(), 64);
        assert_eq!(corpus.probes.len(), 32);
        for word in &corpus.dictionary {
            assert!(params.word_len.contains(&word.len()));
            assert!(word.iter().all(|b| params.alphabet.contains(b)));
        }
        for probe in &corpus.probes {
            assert!(params.probe_len.contains(&probe.len()));
        }
    }
}
