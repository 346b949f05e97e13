//! Command-line interface for pmu-log
//! Parses a Siemens PMU log and prints it as JSON or as a short summary.
//!
//! Usage:
//!   pmu `<path>` [--config `<file>`] [--params `<n>`] [--format json|summary] [--compact]
//!
//! Set `RUST_LOG=debug` to see what the parser detected.

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::fmt::{self, Write as _};

use pmu_log::pmu::config::{Loader, OutputFormat, PmuConfig};
use pmu_log::pmu::{loader, Channel, Clock, LogTime, PhysioLog};

fn main() {
    env_logger::init();

    let matches = Command::new("pmu")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Parse Siemens PMU physiological logs")
        .arg_required_else_help(true)
        .arg(
            Arg::new("path")
                .help("Path to the PMU log (.puls, .resp, .ecg, .ext)")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("TOML file layered over the built-in defaults"),
        )
        .arg(
            Arg::new("params")
                .long("params")
                .short('p')
                .help("Number of leading acquisition parameters (detected when omitted)")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .short('f')
                .help("Output format")
                .value_parser(["json", "summary"]),
        )
        .arg(
            Arg::new("compact")
                .long("compact")
                .help("Print JSON on a single line")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let config = load_config(&matches).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });
    let path = matches
        .get_one::<String>("path")
        .expect("path is a required argument");

    let log = loader::from_path_with(path, &config.parse_options()).unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    });

    let output = match config.output.format {
        OutputFormat::Json if config.output.pretty => {
            serde_json::to_string_pretty(&log).map_err(|e| e.to_string())
        }
        OutputFormat::Json => serde_json::to_string(&log).map_err(|e| e.to_string()),
        OutputFormat::Summary => summary(&log).map_err(|e| e.to_string()),
    };
    match output {
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("Error formatting output: {}", e);
            std::process::exit(1);
        }
    }
}

/// Layer the config file and command-line flags over the defaults.
fn load_config(matches: &ArgMatches) -> Result<PmuConfig, config::ConfigError> {
    let mut loader = Loader::new();
    if let Some(file) = matches.get_one::<String>("config") {
        loader = loader.with_file(file);
    }
    if let Some(count) = matches.get_one::<u32>("params") {
        loader = loader.set_override("parsing.param_count", i64::from(*count))?;
    }
    if let Some(format) = matches.get_one::<String>("format") {
        loader = loader.set_override("output.format", format.as_str())?;
    }
    if matches.get_flag("compact") {
        loader = loader.set_override("output.pretty", false)?;
    }
    loader.build()
}

fn summary(log: &PhysioLog) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write_summary(&mut out, log)?;
    Ok(out.trim_end().to_string())
}

fn write_summary(out: &mut String, log: &PhysioLog) -> fmt::Result {
    writeln!(out, "format:   {:?}", log.format())?;
    writeln!(out, "params:   {:?}", log.params())?;
    writeln!(out, "rate:     {}", log.rate())?;
    writeln!(out, "samples:  {}", log.ts().len())?;
    writeln!(out, "triggers: {}", log.triggers().len())?;
    for info in log.info() {
        writeln!(out, "info:     {}", info.replace('\n', " / "))?;
    }
    for channel in Channel::ALL {
        if let Some(s) = log.channel(channel) {
            writeln!(
                out,
                "{:<5} freq {} per {} min {} max {} avg {} std_diff {}",
                channel, s.freq, s.per, s.min, s.max, s.avg, s.std_diff
            )?;
        }
    }
    let nr = log.nr();
    writeln!(
        out,
        "NrTrig {} NrMP {} NrArr {} AcqWin {}",
        nr.nr_trig, nr.nr_m_p, nr.nr_arr, nr.acq_win
    )?;
    for clock in [Clock::Mdh, Clock::Mpcu] {
        writeln!(out, "{:<5} {}", clock.label(), clock_range(log.clock(clock)))?;
    }
    Ok(())
}

fn clock_range(time: &LogTime) -> String {
    let show = |ticks: i64, wall: Option<chrono::NaiveTime>| match wall {
        Some(wall) => format!("{} ({})", wall.format("%H:%M:%S%.3f"), ticks),
        None => ticks.to_string(),
    };
    format!(
        "{} .. {}",
        show(time.start, time.start_time()),
        show(time.stop, time.stop_time())
    )
}
