//! Randomized round-trip test: builds a dictionary/probe corpus with a
//! bounded alphabet, loads and verifies it, searches every probe, and
//! checks the accelerator's answer against the software oracle.

use std::time::{Duration, Instant};

use accel_client::ClientError;
use accel_oracle::{CorpusParams, best_match, generate_corpus, levenshtein};
use rand::Rng;

use crate::Client;
use crate::executor::block_on;

/// One probe whose returned `(index, distance)` didn't match the
/// oracle, or that the device itself rejected.
#[derive(Debug, Clone)]
pub enum RoundTripFailure {
    /// `search` itself returned an error.
    Client { probe: Vec<u8>, error: ClientError },
    /// The device returned an index past the end of the dictionary.
    IndexOutOfRange {
        probe: Vec<u8>,
        index: u16,
        dictionary_len: usize,
    },
    /// The device's distance didn't match `levenshtein(probe, dict[index])`,
    /// or a strictly better match exists elsewhere in the dictionary.
    DistanceMismatch {
        probe: Vec<u8>,
        index: u16,
        got_distance: u8,
        expected_distance: u8,
    },
}

impl std::fmt::Display for RoundTripFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundTripFailure::Client { probe, error } => {
                write!(f, "search({:?}) failed: {error}", String::from_utf8_lossy(probe))
            }
            RoundTripFailure::IndexOutOfRange {
                probe,
                index,
                dictionary_len,
            } => write!(
                f,
                "search({:?}) returned index {index}, out of range for a {dictionary_len}-word dictionary",
                String::from_utf8_lossy(probe)
            ),
            RoundTripFailure::DistanceMismatch {
                probe,
                index,
                got_distance,
                expected_distance,
            } => write!(
                f,
                "search({:?}) returned (index={index}, distance={got_distance}), oracle expects distance={expected_distance}",
                String::from_utf8_lossy(probe)
            ),
        }
    }
}

/// Outcome of one `run_round_trip_test` invocation.
#[derive(Debug, Clone)]
pub struct RoundTripSummary {
    pub dictionary_len: usize,
    pub probe_durations: Vec<Duration>,
    pub failures: Vec<RoundTripFailure>,
}

impl RoundTripSummary {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    #[must_use]
    pub fn probes_run(&self) -> usize {
        self.probe_durations.len()
    }
}

/// Builds a randomized corpus, loads it onto `client`, and checks every
/// probe's search result against the reference Levenshtein distance.
pub fn run_round_trip_test(
    client: &mut Client,
    rng: &mut impl Rng,
    params: &CorpusParams,
    dictionary_size: usize,
    probe_count: usize,
) -> Result<RoundTripSummary, ClientError> {
    let corpus = generate_corpus(rng, params, dictionary_size, probe_count);
    if corpus.dictionary.is_empty() {
        return Ok(RoundTripSummary {
            dictionary_len: 0,
            probe_durations: Vec::new(),
            failures: Vec::new(),
        });
    }

    block_on(client.init())?;
    block_on(client.load_dictionary(&to_strings(&corpus.dictionary)))?;
    block_on(client.verify_dictionary(&to_strings(&corpus.dictionary)))?;

    let mut failures = Vec::new();
    let mut probe_durations = Vec::with_capacity(corpus.probes.len());

    for probe in &corpus.probes {
        let started = Instant::now();
        let outcome = block_on(client.search(probe));
        probe_durations.push(started.elapsed());

        match outcome {
            Err(error) => failures.push(RoundTripFailure::Client {
                probe: probe.clone(),
                error,
            }),
            Ok(result) => {
                if result.index as usize >= corpus.dictionary.len() {
                    failures.push(RoundTripFailure::IndexOutOfRange {
                        probe: probe.clone(),
                        index: result.index,
                        dictionary_len: corpus.dictionary.len(),
                    });
                    continue;
                }
                let Some((_, oracle_distance)) = best_match(probe, &corpus.dictionary) else {
                    continue;
                };
                let expected_distance =
                    levenshtein(probe, &corpus.dictionary[result.index as usize]).min(255) as u8;
                if expected_distance != oracle_distance || result.distance != expected_distance {
                    failures.push(RoundTripFailure::DistanceMismatch {
                        probe: probe.clone(),
                        index: result.index,
                        got_distance: result.distance,
                        expected_distance: oracle_distance,
                    });
                }
            }
        }
    }

    Ok(RoundTripSummary {
        dictionary_len: corpus.dictionary.len(),
        probe_durations,
        failures,
    })
}

fn to_strings(words: &[Vec<u8>]) -> Vec<String> {
    words
        .iter()
        .map(|w| String::from_utf8_lossy(w).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CANONICAL_REVISION;
    use accel_transport_spi::SimulatedSpi;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn simulated_client() -> Client {
        Client::Simulated(accel_client::AcceleratorClient::new(
            SimulatedSpi::new(CANONICAL_REVISION),
            CANONICAL_REVISION,
        ))
    }

    #[test]
    fn round_trip_against_the_simulated_device_passes() {
        let mut client = simulated_client();
        let mut rng = StdRng::seed_from_u64(7);
        let params = CorpusParams::default();
        let summary = run_round_trip_test(&mut client, &mut rng, &params, 64, 32).unwrap();
        assert!(summary.passed(), "failures: {:?}", summary.failures);
        assert_eq!(summary.probes_run(), 32);
        assert_eq!(summary.dictionary_len, 64);
    }

    #[test]
    fn larger_corpus_matches_the_concrete_scenario_bounds() {
        let mut client = simulated_client();
        let mut rng = StdRng::seed_from_u64(1024);
        let params = CorpusParams::default();
        let summary = run_round_trip_test(&mut client, &mut rng, &params, 1024, 256).unwrap();
        assert!(summary.passed(), "failures: {:?}", summary.failures);
    }
}
