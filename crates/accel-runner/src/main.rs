//! CLI test driver: `init` → (optional) `load-dictionary` → (optional)
//! `search` or `--test`. Argument parsing is hand-rolled over
//! `std::env::args` rather than pulling in an argument-parsing crate.

use std::path::PathBuf;
use std::process::ExitCode;

use accel_runner::{Action, Client, DeviceBackend, RunnerConfig, block_on, read_dictionary_file};
use accel_types::ChipSelect;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match parse_args(&args) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{message}");
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    if let Err(message) = run(config) {
        eprintln!("error: {message}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run(config: RunnerConfig) -> Result<(), String> {
    if let Some(vcd_path) = &config.vcd_file {
        println!(
            "note: --vcd-file {} accepted, but this build has no VCD-capable simulator binary attached",
            vcd_path.display()
        );
    }

    let mut client = Client::connect(&config)?;

    if !config.no_init {
        block_on(client.init()).map_err(|e| e.to_string())?;
    }

    let dictionary = match &config.load_dictionary {
        Some(path) => {
            let words = read_dictionary_file(path).map_err(|e| format!("{}: {e}", path.display()))?;
            block_on(client.load_dictionary(&words)).map_err(|e| e.to_string())?;
            block_on(client.verify_dictionary(&words)).map_err(|e| e.to_string())?;
            println!("loaded and verified {} dictionary word(s)", words.len());
            Some(words)
        }
        None => None,
    };

    match &config.action {
        Action::None => {}
        Action::Search(word) => {
            let result = block_on(client.search(word.as_bytes())).map_err(|e| e.to_string())?;
            let matched = dictionary
                .as_ref()
                .and_then(|words| words.get(result.index as usize))
                .cloned()
                .unwrap_or_default();
            println!(
                "search({word:?}) -> index={}, distance={} ({matched:?})",
                result.index, result.distance
            );
        }
        Action::Test => {
            let mut rng = StdRng::from_os_rng();
            let params = accel_oracle::CorpusParams::default();
            let summary = accel_runner::run_round_trip_test(&mut client, &mut rng, &params, 1024, 256)
                .map_err(|e| e.to_string())?;

            let total: std::time::Duration = summary.probe_durations.iter().sum();
            let average = total / summary.probe_durations.len().max(1) as u32;
            println!(
                "ran {} probes against a {}-word dictionary in {total:?} (avg {average:?}/probe)",
                summary.probes_run(),
                summary.dictionary_len
            );

            if !summary.passed() {
                for failure in &summary.failures {
                    eprintln!("  FAIL: {failure}");
                }
                return Err(format!("{} of {} probes disagreed with the oracle", summary.failures.len(), summary.probes_run()));
            }
            println!("all probes matched the software oracle");
        }
    }

    Ok(())
}

fn parse_args(args: &[String]) -> Result<RunnerConfig, String> {
    let mut config = RunnerConfig::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--device" => {
                let value = value_of("--device", args, &mut i)?;
                config = config.with_device(value.parse()?);
            }
            "--chip-select" => {
                let value = value_of("--chip-select", args, &mut i)?;
                config = config.with_chip_select(parse_chip_select(&value)?);
            }
            "--vcd-file" => {
                let value = value_of("--vcd-file", args, &mut i)?;
                config = config.with_vcd_file(PathBuf::from(value));
            }
            "--no-init" => {
                config = config.with_no_init(true);
                i += 1;
            }
            "--load-dictionary" => {
                let value = value_of("--load-dictionary", args, &mut i)?;
                config = config.with_load_dictionary(PathBuf::from(value));
            }
            "--search" => {
                let value = value_of("--search", args, &mut i)?;
                config = config.with_action(Action::Search(value));
            }
            "--test" => {
                config = config.with_action(Action::Test);
                i += 1;
            }
            other => return Err(format!("unrecognized argument '{other}'")),
        }
    }
    Ok(config)
}

/// Consumes the flag at `args[*i]` plus its value at `args[*i + 1]`,
/// advancing `i` past both.
fn value_of(flag: &str, args: &[String], i: &mut usize) -> Result<String, String> {
    let value = args
        .get(*i + 1)
        .ok_or_else(|| format!("'{flag}' requires a value"))?
        .clone();
    *i += 2;
    Ok(value)
}

fn parse_chip_select(value: &str) -> Result<ChipSelect, String> {
    match value {
        "none" => Ok(ChipSelect::None),
        "cs" => Ok(ChipSelect::Cs),
        "cs2" => Ok(ChipSelect::Cs2),
        "cs3" => Ok(ChipSelect::Cs3),
        other => Err(format!("unknown --chip-select '{other}' (expected none|cs|cs2|cs3)")),
    }
}

fn print_usage() {
    eprintln!(
        "usage: accel-runner [--device <verilator|icestick>] [--chip-select <none|cs|cs2|cs3>]
                     [--vcd-file <path>] [--no-init]
                     [--load-dictionary <path>] [--search <word>] [--test]"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_command_line() {
        let args: Vec<String> = [
            "--device", "icestick", "--chip-select", "cs2", "--no-init",
            "--load-dictionary", "words.txt", "--search", "hest",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let config = parse_args(&args).unwrap();
        assert_eq!(config.device, DeviceBackend::Icestick);
        assert_eq!(config.chip_select, ChipSelect::Cs2);
        assert!(config.no_init);
        assert_eq!(config.load_dictionary, Some(PathBuf::from("words.txt")));
        assert_eq!(config.action, Action::Search("hest".to_string()));
    }

    #[test]
    fn defaults_to_verilator_with_no_action() {
        let config = parse_args(&[]).unwrap();
        assert_eq!(config.device, DeviceBackend::Verilator);
        assert_eq!(config.action, Action::None);
    }

    #[test]
    fn rejects_unknown_flag() {
        let args = vec!["--bogus".to_string()];
        assert!(parse_args(&args).is_err());
    }

    #[test]
    fn rejects_flag_missing_its_value() {
        let args = vec!["--search".to_string()];
        assert!(parse_args(&args).is_err());
    }
}
