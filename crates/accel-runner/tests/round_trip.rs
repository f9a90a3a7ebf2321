//! End-to-end round-trip test driven entirely through `accel-runner`'s
//! public API, exercising the same path the `--test` CLI flag takes.

use accel_oracle::CorpusParams;
use accel_runner::{CANONICAL_REVISION, Client, run_round_trip_test};
use accel_transport_spi::SimulatedSpi;
use rand::SeedableRng;
use rand::rngs::StdRng;

#[test]
fn randomized_round_trip_matches_the_software_oracle() {
    let mut client = Client::Simulated(accel_client::AcceleratorClient::new(
        SimulatedSpi::new(CANONICAL_REVISION),
        CANONICAL_REVISION,
    ));
    let mut rng = StdRng::seed_from_u64(2026);
    let params = CorpusParams::default();

    let summary = run_round_trip_test(&mut client, &mut rng, &params, 256, 64).unwrap();
    assert!(summary.passed(), "failures: {:?}", summary.failures);
    assert_eq!(summary.probes_run(), 64);
}
