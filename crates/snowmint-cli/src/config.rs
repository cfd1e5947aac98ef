use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use core::time::Duration;
use snowmint::{CUSTOM_EPOCH, Config, SystemClock, TimeSource};

/// Command-line and environment settings for the `snowmint` binary.
///
/// Layout flags are global so the same values apply to `generate` and
/// `decode`; an ID must be decoded with the layout it was minted under. Each
/// flag falls back to an environment variable, and a `.env` file in the
/// working directory is loaded first.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "snowmint",
    version,
    about = "Mint and decode Snowflake-style 64-bit IDs"
)]
pub struct CliArgs {
    /// Base timestamp in milliseconds since the Unix epoch. Must not be in
    /// the future when generating.
    ///
    /// Environment variable: `SNOWMINT_EPOCH`
    #[arg(long, global = true, env = "SNOWMINT_EPOCH", default_value_t = CUSTOM_EPOCH)]
    pub epoch: u64,

    /// Width of the worker ID field.
    ///
    /// Environment variable: `SNOWMINT_WORKER_BITS`
    #[arg(long, global = true, env = "SNOWMINT_WORKER_BITS", default_value_t = 5)]
    pub worker_bits: u8,

    /// Width of the machine ID field.
    ///
    /// Environment variable: `SNOWMINT_MACHINE_BITS`
    #[arg(long, global = true, env = "SNOWMINT_MACHINE_BITS", default_value_t = 5)]
    pub machine_bits: u8,

    /// Width of the per-millisecond sequence field.
    ///
    /// Environment variable: `SNOWMINT_SEQUENCE_BITS`
    #[arg(long, global = true, env = "SNOWMINT_SEQUENCE_BITS", default_value_t = 12)]
    pub sequence_bits: u8,

    /// Pause in microseconds between clock samples while waiting for the
    /// next millisecond. Zero spins. Must stay below 1000.
    ///
    /// Environment variable: `SNOWMINT_POLL_INTERVAL_US`
    #[arg(long, global = true, env = "SNOWMINT_POLL_INTERVAL_US", default_value_t = 0)]
    pub poll_interval_us: u64,

    /// Time source used by generators.
    ///
    /// Environment variable: `SNOWMINT_CLOCK`
    #[arg(long, global = true, env = "SNOWMINT_CLOCK", value_enum, default_value_t = ClockKind::System)]
    pub clock: ClockKind,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockKind {
    /// Operating system wall clock; regressions are reported as errors.
    System,
    /// Ticker anchored at startup that never goes backwards.
    Monotonic,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Mint IDs and print one per line.
    Generate {
        /// Worker identifier assigned to this process.
        ///
        /// Environment variable: `SNOWMINT_WORKER_ID`
        #[arg(long, env = "SNOWMINT_WORKER_ID")]
        worker_id: u64,

        /// Machine identifier assigned to this process.
        ///
        /// Environment variable: `SNOWMINT_MACHINE_ID`
        #[arg(long, env = "SNOWMINT_MACHINE_ID")]
        machine_id: u64,

        /// Number of IDs to mint.
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,

        /// Threads sharing the generator. Output is sorted when above one.
        #[arg(short, long, default_value_t = 1)]
        threads: usize,

        /// Print the decoded fields next to each ID.
        #[arg(short, long, default_value_t = false)]
        decode: bool,
    },
    /// Print the fields of existing IDs.
    Decode {
        #[arg(required = true, allow_negative_numbers = true)]
        ids: Vec<i64>,
    },
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub layout: Config,
    pub clock: ClockKind,
    pub command: Command,
}

impl TryFrom<CliArgs> for AppConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let layout = Config::new(
            args.epoch,
            args.worker_bits,
            args.machine_bits,
            args.sequence_bits,
        )
        .with_poll_interval(Duration::from_micros(args.poll_interval_us));
        layout.validate().context("invalid ID layout")?;

        if let Command::Generate { count, threads, .. } = &args.command {
            if *count == 0 {
                bail!("COUNT must be greater than 0");
            }
            if *threads == 0 {
                bail!("THREADS must be greater than 0");
            }
            if threads > count {
                bail!("THREADS ({threads}) exceeds COUNT ({count})");
            }
            // Parallel output is collected and sorted before printing.
            let fits = count
                .checked_mul(size_of::<i64>())
                .is_some_and(|bytes| bytes <= isize::MAX as usize);
            if *threads > 1 && !fits {
                bail!("COUNT ({count}) is too large to collect across threads; use --threads 1");
            }
            let now = SystemClock.current_millis();
            if args.epoch > now {
                bail!("SNOWMINT_EPOCH ({}) is in the future (now = {now})", args.epoch);
            }
        }

        Ok(Self {
            layout,
            clock: args.clock,
            command: args.command,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<AppConfig> {
        let args = CliArgs::try_parse_from(core::iter::once("snowmint").chain(args.iter().copied()))?;
        AppConfig::try_from(args)
    }

    #[test]
    fn defaults_match_library_default_layout() {
        let config = parse(&["generate", "--worker-id", "1", "--machine-id", "2"]).unwrap();
        assert_eq!(config.layout, Config::default());
        assert_eq!(config.clock, ClockKind::System);
        assert_eq!(
            config.command,
            Command::Generate {
                worker_id: 1,
                machine_id: 2,
                count: 1,
                threads: 1,
                decode: false,
            }
        );
    }

    #[test]
    fn layout_flags_are_global() {
        let config = parse(&[
            "decode",
            "12345",
            "--epoch",
            "0",
            "--worker-bits",
            "3",
            "--machine-bits",
            "7",
            "--sequence-bits",
            "10",
            "--clock",
            "monotonic",
        ])
        .unwrap();
        assert_eq!(config.layout, Config::new(0, 3, 7, 10));
        assert_eq!(config.clock, ClockKind::Monotonic);
        assert_eq!(config.command, Command::Decode { ids: vec![12345] });
    }

    #[test]
    fn rejects_invalid_layout() {
        let err = parse(&["decode", "1", "--worker-bits", "40", "--machine-bits", "20"])
            .unwrap_err();
        assert!(err.to_string().contains("invalid ID layout"));
    }

    #[test]
    fn rejects_coarse_poll_interval() {
        assert!(parse(&["decode", "1", "--poll-interval-us", "1000"]).is_err());
        assert!(parse(&["decode", "1", "--poll-interval-us", "999"]).is_ok());
    }

    #[test]
    fn rejects_bad_generate_counts() {
        let base = ["generate", "--worker-id", "0", "--machine-id", "0"];
        let with = |extra: &[&str]| {
            let mut args = base.to_vec();
            args.extend_from_slice(extra);
            parse(&args)
        };

        assert!(with(&["--count", "0"]).is_err());
        assert!(with(&["--threads", "0"]).is_err());
        assert!(with(&["--count", "2", "--threads", "3"]).is_err());
        assert!(with(&["--count", "8", "--threads", "4"]).is_ok());
    }

    #[test]
    fn huge_count_streams_single_threaded_but_not_in_parallel() {
        let huge = usize::MAX.to_string();
        let base = ["generate", "--worker-id", "0", "--machine-id", "0", "--count", &huge];
        let with = |threads: &str| {
            let mut args = base.to_vec();
            args.extend_from_slice(&["--threads", threads]);
            parse(&args)
        };

        assert!(with("1").is_ok());
        let err = with("2").unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn rejects_future_epoch_when_generating() {
        let future = (SystemClock.current_millis() + 86_400_000).to_string();
        assert!(
            parse(&["generate", "--worker-id", "0", "--machine-id", "0", "--epoch", &future])
                .is_err()
        );
        assert!(parse(&["decode", "1", "--epoch", &future]).is_ok());
    }
}
