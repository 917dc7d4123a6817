use clap::{App, Arg, ArgMatches};
use colored::*;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thermolink::clock::StdDelay;
use thermolink::config::Config;
use thermolink::handoff::{self, Received};
use thermolink::sampler::{Sample, Sampler, SamplerStats};
use thermolink::simulator::{simulated_max31855, InjectedFault};
use thermolink::transactor::{BusSession, MODE};
use thermolink::InitError;
use tracing::{debug, info, Level};

const DEFAULT_TEMP_C: &str = "24.5";
const DEFAULT_COLD_JUNCTION_C: &str = "22.0625";

#[derive(Debug, Clone, Copy)]
enum OutputFormat {
    Table,
    Json,
    Compact,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("thermolink")
        .version("0.1.0")
        .about("🌡️  MAX31855 thermocouple sampler running against a simulated device")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("JSON configuration file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("clock")
                .long("clock")
                .value_name("HZ")
                .help("SPI clock in Hz (max 5000000)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("interval")
                .short("i")
                .long("interval")
                .value_name("MS")
                .help("Sampling period in milliseconds (min 100)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("capacity")
                .long("capacity")
                .value_name("N")
                .help("Handoff queue capacity")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("timeout")
                .long("timeout")
                .value_name("MS")
                .help("Consumer wait per sample before idling")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("pause")
                .long("pause")
                .value_name("MS")
                .help("Consumer pause after each sample")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("count")
                .short("n")
                .long("count")
                .value_name("N")
                .help("Stop after N acquisition cycles")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("temp")
                .short("t")
                .long("temp")
                .value_name("CELSIUS")
                .help("Simulated thermocouple temperature")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value(DEFAULT_TEMP_C),
        )
        .arg(
            Arg::with_name("cold-junction")
                .long("cold-junction")
                .value_name("CELSIUS")
                .help("Simulated cold-junction temperature")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value(DEFAULT_COLD_JUNCTION_C),
        )
        .arg(
            Arg::with_name("inject-fault")
                .long("inject-fault")
                .value_name("KIND")
                .help("Put the simulated probe into a fault condition")
                .takes_value(true)
                .possible_values(&["open", "gnd", "vcc", "unknown", "no-response", "bus"]),
        )
        .arg(
            Arg::with_name("format")
                .short("f")
                .long("format")
                .value_name("FORMAT")
                .help("Output format")
                .takes_value(true)
                .possible_values(&["table", "json", "compact"])
                .default_value("table"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Log every frame"),
        )
        .get_matches();

    let level = if matches.is_present("verbose") { Level::TRACE } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = build_config(&matches)?;
    let format = match matches.value_of("format") {
        Some("json") => OutputFormat::Json,
        Some("compact") => OutputFormat::Compact,
        _ => OutputFormat::Table,
    };
    let count = parse_opt::<u64>(&matches, "count")?;
    let temp_c = parse_opt::<f32>(&matches, "temp")?.unwrap_or_default();
    let cold_junction_c = parse_opt::<f32>(&matches, "cold-junction")?.unwrap_or_default();

    let (probe, mut spi, cs) = simulated_max31855(temp_c, cold_junction_c);
    spi.set_mode(MODE);
    if let Some(kind) = matches.value_of("inject-fault") {
        probe.set_fault(Some(kind.parse::<InjectedFault>()?));
    }

    debug!(config = %serde_json::to_string(&config)?, "effective configuration");
    println!("{}", "🌡️  thermolink - MAX31855 sampler".bright_blue().bold());
    info!(
        interval_ms = config.sampler.interval_ms,
        capacity = config.sampler.channel_capacity,
        "starting sampler"
    );

    let (sender, mut receiver) = handoff::channel(config.sampler.channel_capacity);
    let running = Arc::new(AtomicBool::new(true));

    // The acquisition cycle blocks for the conversion time, so the producer
    // lives on the blocking pool.
    let producer_running = Arc::clone(&running);
    let bus = config.bus;
    let interval_ms = config.sampler.interval_ms;
    let producer = tokio::task::spawn_blocking(move || -> Result<SamplerStats, InitError> {
        let session = BusSession::initialize(spi, cs, StdDelay, &bus)?;
        let mut sampler = Sampler::new(session, StdDelay, interval_ms);
        Ok(sampler.run(&sender, &producer_running, count))
    });

    let signal_running = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received; stopping after the current cycle");
            signal_running.store(false, Ordering::Relaxed);
        }
    });

    let timeout = Duration::from_millis(u64::from(config.sampler.receive_timeout_ms));
    let pause = Duration::from_millis(u64::from(config.sampler.consumer_pause_ms));
    loop {
        match receiver.recv_timeout(timeout).await {
            Received::Sample(sample) => {
                print_sample(&sample, format)?;
                if !pause.is_zero() {
                    tokio::time::sleep(pause).await;
                }
            }
            Received::Idle => debug!(?timeout, "no sample received"),
            Received::Closed => break,
        }
    }

    let stats = producer.await??;
    print_summary(&stats, receiver.dropped(), probe.frames_served(), format)?;
    Ok(())
}

fn build_config(matches: &ArgMatches<'_>) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match matches.value_of("config") {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(clock_hz) = parse_opt(matches, "clock")? {
        config.bus.clock_hz = clock_hz;
    }
    if let Some(interval_ms) = parse_opt(matches, "interval")? {
        config.sampler.interval_ms = interval_ms;
    }
    if let Some(capacity) = parse_opt(matches, "capacity")? {
        config.sampler.channel_capacity = capacity;
    }
    if let Some(timeout_ms) = parse_opt(matches, "timeout")? {
        config.sampler.receive_timeout_ms = timeout_ms;
    }
    if let Some(pause_ms) = parse_opt(matches, "pause")? {
        config.sampler.consumer_pause_ms = pause_ms;
    }

    config.validate()?;
    Ok(config)
}

fn parse_opt<T>(matches: &ArgMatches<'_>, name: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: Display,
{
    matches
        .value_of(name)
        .map(|value| value.parse::<T>().map_err(|e| format!("invalid --{name} '{value}': {e}")))
        .transpose()
}

fn print_sample(sample: &Sample, format: OutputFormat) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(sample)?),
        OutputFormat::Compact => match sample {
            Sample::Reading(reading) => {
                println!("{:.2} {:.4}", reading.thermocouple_c(), reading.cold_junction_c());
            }
            Sample::Fault { code, frame } => println!("FAULT {} {}", code.code(), frame),
        },
        OutputFormat::Table => match sample {
            Sample::Reading(reading) => println!(
                "{} TC {:>8.2}°C {:>8.2}°F | CJ {:>9.4}°C {:>9.4}°F",
                "OK   ".green().bold(),
                reading.thermocouple_c(),
                reading.thermocouple_f(),
                reading.cold_junction_c(),
                reading.cold_junction_f(),
            ),
            Sample::Fault { code, frame } => println!(
                "{} {} (frame {} = {})",
                "FAULT".red().bold(),
                code.to_string().bright_red(),
                frame,
                frame.bit_pattern(),
            ),
        },
    }
    Ok(())
}

fn print_summary(
    stats: &SamplerStats,
    dropped: u64,
    frames_served: u32,
    format: OutputFormat,
) -> Result<(), serde_json::Error> {
    if matches!(format, OutputFormat::Json) {
        let summary = serde_json::json!({ "stats": stats, "dropped": dropped, "frames_served": frames_served });
        println!("{}", serde_json::to_string(&summary)?);
        return Ok(());
    }

    println!("{}", "📊 Sampling summary".bright_blue().bold());
    println!("  cycles:        {}", stats.cycles);
    println!("  readings:      {}", stats.readings.to_string().bright_green());
    println!("  faults:        {}", stats.faults.to_string().bright_yellow());
    println!("  bus errors:    {}", stats.bus_errors.to_string().bright_red());
    println!("  dropped:       {dropped}");
    println!("  frames served: {frames_served}");
    Ok(())
}
