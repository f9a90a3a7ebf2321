//! Construction-time configuration for the runner: which transport
//! backend, which chip-select pin, whether to skip `init`, and so on.
//! Plain struct with a `Default` impl and builder-style setters; there
//! is no external configuration-file format here either.

use std::path::PathBuf;

use accel_types::ChipSelect;

/// Which physical (or simulated) link the client talks over.
///
/// Both variants speak the same SPI wire framing (§4.5); the
/// difference is only which [`accel_bus::Transport`] implementation
/// backs it. `Verilator` drives the in-process simulated device model,
/// standing in for a synthesised-RTL cosimulation binary; `Icestick`
/// opens a real FTDI MPSSE bridge to a physical board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceBackend {
    #[default]
    Verilator,
    Icestick,
}

impl std::str::FromStr for DeviceBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "verilator" => Ok(DeviceBackend::Verilator),
            "icestick" => Ok(DeviceBackend::Icestick),
            other => Err(format!("unknown --device '{other}' (expected verilator|icestick)")),
        }
    }
}

/// What the runner does after bringing the device up.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Action {
    /// No `--search`/`--test` given: bring the device up and stop.
    #[default]
    None,
    Search(String),
    Test,
}

/// Full set of knobs accepted by the `accel-runner` binary.
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    pub device: DeviceBackend,
    pub chip_select: ChipSelect,
    pub vcd_file: Option<PathBuf>,
    pub no_init: bool,
    pub load_dictionary: Option<PathBuf>,
    pub action: Action,
}

impl RunnerConfig {
    #[must_use]
    pub fn with_device(mut self, device: DeviceBackend) -> Self {
        self.device = device;
        self
    }

    #[must_use]
    pub fn with_chip_select(mut self, chip_select: ChipSelect) -> Self {
        self.chip_select = chip_select;
        self
    }

    #[must_use]
    pub fn with_vcd_file(mut self, path: PathBuf) -> Self {
        self.vcd_file = Some(path);
        self
    }

    #[must_use]
    pub fn with_no_init(mut self, no_init: bool) -> Self {
        self.no_init = no_init;
        self
    }

    #[must_use]
    pub fn with_load_dictionary(mut self, path: PathBuf) -> Self {
        self.load_dictionary = Some(path);
        self
    }

    #[must_use]
    pub fn with_action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_device_names() {
        assert_eq!("verilator".parse(), Ok(DeviceBackend::Verilator));
        assert_eq!("icestick".parse(), Ok(DeviceBackend::Icestick));
    }

    #[test]
    fn rejects_unknown_device_name() {
        assert!("fpga9000".parse::<DeviceBackend>().is_err());
    }

    #[test]
    fn builder_methods_compose() {
        let config = RunnerConfig::default()
            .with_device(DeviceBackend::Icestick)
            .with_chip_select(ChipSelect::Cs2)
            .with_no_init(true);
        assert_eq!(config.device, DeviceBackend::Icestick);
        assert_eq!(config.chip_select, ChipSelect::Cs2);
        assert!(config.no_init);
    }
}
