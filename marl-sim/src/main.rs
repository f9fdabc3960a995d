//! MARL Sim - Piconet coexistence simulator
//!
//! This CLI drives the MARL hopping core:
//! - `run` - Run a named scenario or a JSON configuration
//! - `sweep` - Sweep band size, hopping mode and map size
//! - `hop` - Print the hop sequence of one device address

mod metrics;
mod scenarios;
mod sweep;

use clap::{Parser, Subcommand};
use marl_core::hopping::compute_hop;
use marl_core::{ChannelMap, DeviceAddress, HoppingMode, NullSink, StatisticsSink, NUM_CHANNELS};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "marl-sim")]
#[command(about = "Piconet coexistence simulator for learned frequency hopping")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single simulation
    Run {
        /// Scenario to run
        #[arg(short, long, default_value = "legacy")]
        scenario: String,

        /// JSON configuration, overrides the scenario
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of piconets
        #[arg(short = 'n', long, default_value = "10")]
        agents: usize,

        /// Number of channels in the band
        #[arg(long, default_value = "79")]
        channels: usize,

        /// Steps to simulate
        #[arg(long, default_value = "100000")]
        steps: u64,

        /// Steps excluded from the statistics
        #[arg(long, default_value = "2000")]
        warmup: u64,

        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Largest DFH-RL exploration offset
        #[arg(long, default_value = "2")]
        max_offset: u8,

        /// AFH usable-channel target
        #[arg(long, default_value = "20")]
        usable_target: usize,

        /// Output directory for results
        #[arg(short = 'd', long, default_value = "./results")]
        output_dir: PathBuf,

        /// Record the channel heatmap and collision graph
        #[arg(long)]
        heatmap: bool,
    },

    /// Run a parameter sweep
    Sweep {
        /// Band sizes (default 20..=79 step 10)
        #[arg(long, value_delimiter = ',')]
        channels: Vec<usize>,

        /// Modes to sweep (default all)
        #[arg(long, value_delimiter = ',')]
        modes: Vec<String>,

        /// Number of piconets
        #[arg(short = 'n', long, default_value = "10")]
        agents: usize,

        /// Steps per run
        #[arg(long, default_value = "100000")]
        steps: u64,

        /// Steps excluded from the statistics
        #[arg(long, default_value = "2000")]
        warmup: u64,

        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// DFH-RL offset bounds
        #[arg(long, value_delimiter = ',', default_value = "5,3,2")]
        offsets: Vec<u8>,

        /// Also sweep the AFH map size
        #[arg(long)]
        map_sweep: bool,

        /// Run this many DFH-RL piconets next to each swept mode
        #[arg(long)]
        coexist: Option<usize>,

        /// Add WiFi channels 1, 6 and 11 between 30% and 70% of each run
        #[arg(long)]
        wifi: bool,

        /// Output directory for results
        #[arg(short = 'd', long, default_value = "./results")]
        output_dir: PathBuf,
    },

    /// Print the hop sequence of a device address
    Hop {
        /// Device address in hex
        #[arg(short, long, default_value = "2a96ef25")]
        address: String,

        /// First native clock value
        #[arg(long, default_value = "0")]
        clock: u32,

        /// Clock increment between hops
        #[arg(long, default_value = "4")]
        clock_step: u32,

        /// Number of hops to print
        #[arg(short = 'c', long, default_value = "16")]
        count: usize,

        /// Usable channels as a bit string, channel 0 first
        #[arg(long)]
        map: Option<String>,
    },
}

fn parse_map(bits: &str) -> Result<ChannelMap, String> {
    if bits.len() > NUM_CHANNELS {
        return Err(format!("channel map has {} bits, at most {}", bits.len(), NUM_CHANNELS));
    }
    let mut map = ChannelMap::empty();
    for (i, c) in bits.chars().enumerate() {
        match c {
            '1' => map.set(i as u8, true).map_err(|e| e.to_string())?,
            '0' => {}
            other => return Err(format!("invalid map character '{}'", other)),
        }
    }
    Ok(map)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            config,
            agents,
            channels,
            steps,
            warmup,
            seed,
            max_offset,
            usable_target,
            output_dir,
            heatmap,
        } => {
            let (name, sim_config) = match config {
                Some(path) => {
                    info!("Loading configuration: {}", path.display());
                    let name = path
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "config".to_string());
                    (name, scenarios::load_config(&path)?)
                }
                None => {
                    let scenario_config = scenarios::get_scenario(&scenario).map_err(|e| {
                        eprintln!("Available scenarios: {}", scenarios::all_scenarios().join(", "));
                        e
                    })?;
                    info!("Scenario {}: {}", scenario_config.name, scenario_config.description);
                    let params = scenarios::RunParams {
                        agents,
                        channels,
                        steps,
                        warmup,
                        seed,
                        max_offset,
                        usable_target,
                    };
                    let built = scenarios::build_config(&scenario_config, &params);
                    (scenario_config.name, built)
                }
            };

            let mut recorder = metrics::HeatmapRecorder::new(sim_config.num_channels, metrics::DEFAULT_WINDOW);
            let mut null = NullSink;
            let sink: &mut dyn StatisticsSink = if heatmap { &mut recorder } else { &mut null };
            let results = scenarios::run_scenario(&name, sim_config.clone(), sink)?;

            // Ensure output directory exists
            std::fs::create_dir_all(&output_dir)?;

            // Write summary
            let summary_path = output_dir.join(format!("{}-summary.json", name));
            let summary = serde_json::json!({
                "scenario": results.scenario,
                "piconets": sim_config.piconets.len(),
                "channels": sim_config.num_channels,
                "steps": sim_config.steps,
                "warmup": sim_config.warmup_steps,
                "seed": sim_config.seed,
                "duration_ms": results.duration_ms,
                "result": results.summary,
            });
            std::fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
            info!("Summary written to: {}", summary_path.display());

            if heatmap {
                let heatmap_path = output_dir.join(format!("{}-heatmap.json", name));
                std::fs::write(&heatmap_path, recorder.export_json(&name))?;
                let csv_path = output_dir.join(format!("{}-heatmap.csv", name));
                std::fs::write(&csv_path, recorder.export_csv())?;
                info!("Heatmap written to: {}", heatmap_path.display());
            }

            println!("\nCollision Probability:");
            println!("  Mean: {:.6}", results.summary.mean_pcol);
            if !sim_config.wifi_bands.is_empty() {
                println!("  WiFi window: {:.6}", results.summary.wifi_pcol);
            }
            for (i, p) in results.summary.per_agent_pcol.iter().enumerate() {
                println!("  Piconet {:>2}: {:.6}", i + 1, p);
            }
        }

        Commands::Sweep {
            channels,
            modes,
            agents,
            steps,
            warmup,
            seed,
            offsets,
            map_sweep,
            coexist,
            wifi,
            output_dir,
        } => {
            let defaults = sweep::SweepOptions::default();
            let modes = if modes.is_empty() {
                defaults.modes.clone()
            } else {
                modes
                    .iter()
                    .map(|m| m.parse::<HoppingMode>())
                    .collect::<Result<Vec<_>, _>>()?
            };
            let opts = sweep::SweepOptions {
                channels: if channels.is_empty() { defaults.channels } else { channels },
                modes,
                agents,
                steps,
                warmup,
                seed,
                dfh_offsets: offsets,
                map_sweep,
                coexist,
                wifi,
            };

            let points = sweep::build_grid(&opts)?;
            info!("Sweeping {} parameter points", points.len());
            let outcome = sweep::run_sweep(&points, &opts, &output_dir, chrono::Utc::now())?;

            println!("\nSweep Results:");
            println!("  Points: {}", outcome.results.len());
            println!("  Lines: {}", outcome.text_path.display());
            println!("  Summary: {}", outcome.json_path.display());
        }

        Commands::Hop {
            address,
            clock,
            clock_step,
            count,
            map,
        } => {
            let address: DeviceAddress = address.parse()?;
            let map = match map {
                Some(bits) => parse_map(&bits)?,
                None => ChannelMap::full(),
            };
            let usable = map.usable_count();
            info!("Hop sequence for {} over {} usable channels", address, usable);

            for i in 0..count {
                let clk = clock.wrapping_add(clock_step.wrapping_mul(i as u32));
                let hop = compute_hop(address, clk, &map, usable)?;
                if hop.remapped {
                    println!("0x{:07x} {:>2} (remapped from {})", clk, hop.channel, hop.basic);
                } else {
                    println!("0x{:07x} {:>2}", clk, hop.channel);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_map() {
        let map = parse_map("1010").unwrap();
        assert_eq!(map.usable_count(), 2);
        assert!(map.is_usable(0) && map.is_usable(2));
        assert!(parse_map("10x").is_err());
        assert!(parse_map(&"1".repeat(80)).is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["marl-sim", "sweep", "--channels", "20,40", "--modes", "afh,dfh"]).unwrap();
        match cli.command {
            Commands::Sweep { channels, modes, .. } => {
                assert_eq!(channels, vec![20, 40]);
                assert_eq!(modes, vec!["afh".to_string(), "dfh".to_string()]);
            }
            _ => panic!("expected sweep"),
        }
    }
}
