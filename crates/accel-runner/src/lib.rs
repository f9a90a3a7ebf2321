//! Test driver for the Levenshtein accelerator: sequences init → load →
//! search → verify against either backend, and runs the randomized
//! round-trip test against the software oracle.
//!
//! Split into a library so the CLI's `main.rs` stays a thin argument-
//! parsing shell, and so integration tests can exercise the driver
//! directly without shelling out to the binary.

pub mod config;
mod dictionary;
mod executor;
pub mod test_driver;

pub use config::{Action, DeviceBackend, RunnerConfig};
pub use dictionary::read_dictionary_file;
pub use executor::block_on;
pub use test_driver::{RoundTripFailure, RoundTripSummary, run_round_trip_test};

use accel_client::{AcceleratorClient, ClientError};
use accel_transport_spi::SimulatedSpi;
#[cfg(feature = "hardware")]
use accel_transport_spi::RealSpi;
use accel_types::Revision;

/// The revision this CLI targets. Both register-map revisions are
/// fully implemented and tested (see `accel-protocol`); the runner
/// pins the newer, direct-register one as its canonical default,
/// matching the repository's own drift from Wishbone to direct access.
pub const CANONICAL_REVISION: Revision = Revision::Direct;

/// Either backend wrapped in one enum so `main` doesn't need to be
/// generic over `Transport` just to pick a device. The `Hardware`
/// variant only exists when built with the `hardware` feature, so a
/// default build never needs `libftdi1` to link.
pub enum Client {
    Simulated(AcceleratorClient<SimulatedSpi>),
    #[cfg(feature = "hardware")]
    Hardware(AcceleratorClient<RealSpi>),
}

impl Client {
    pub fn connect(config: &RunnerConfig) -> Result<Self, String> {
        match config.device {
            DeviceBackend::Verilator => Ok(Client::Simulated(AcceleratorClient::new(
                SimulatedSpi::new(CANONICAL_REVISION),
                CANONICAL_REVISION,
            ))),
            #[cfg(feature = "hardware")]
            DeviceBackend::Icestick => {
                let transport = RealSpi::open(config.chip_select)
                    .map_err(|e| format!("failed to open iCEstick SPI bridge: {e}"))?;
                Ok(Client::Hardware(AcceleratorClient::new(
                    transport,
                    CANONICAL_REVISION,
                )))
            }
            #[cfg(not(feature = "hardware"))]
            DeviceBackend::Icestick => Err(
                "--device icestick requires this binary to be built with the `hardware` feature \
                 (it links libftdi1 and is off by default)"
                    .to_string(),
            ),
        }
    }

    pub async fn init(&mut self) -> Result<(), ClientError> {
        match self {
            Client::Simulated(c) => c.init().await,
            #[cfg(feature = "hardware")]
            Client::Hardware(c) => c.init().await,
        }
    }

    pub async fn load_dictionary(&mut self, words: &[String]) -> Result<(), ClientError> {
        match self {
            Client::Simulated(c) => c.load_dictionary(words).await,
            #[cfg(feature = "hardware")]
            Client::Hardware(c) => c.load_dictionary(words).await,
        }
    }

    pub async fn verify_dictionary(&mut self, words: &[String]) -> Result<(), ClientError> {
        match self {
            Client::Simulated(c) => c.verify_dictionary(words).await,
            #[cfg(feature = "hardware")]
            Client::Hardware(c) => c.verify_dictionary(words).await,
        }
    }

    pub async fn search(
        &mut self,
        probe: &[u8],
    ) -> Result<accel_types::SearchResult, ClientError> {
        match self {
            Client::Simulated(c) => c.search(probe).await,
            #[cfg(feature = "hardware")]
            Client::Hardware(c) => c.search(probe).await,
        }
    }
}
