use anyhow::{Context, anyhow, bail};
use snowmint::{Config, Registry, SnowflakeGenerator, TimeSource};
use std::{
    io::{self, BufWriter, Write},
    thread::scope,
    time::Instant,
};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateRequest {
    pub worker_id: u64,
    pub machine_id: u64,
    pub count: usize,
    pub threads: usize,
    pub decode: bool,
}

/// Mints `request.count` IDs to stdout.
pub fn generate<T>(
    registry: &Registry<T>,
    layout: Config,
    request: &GenerateRequest,
) -> anyhow::Result<()>
where
    T: TimeSource + Clone + Send + Sync,
{
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    generate_to(registry, layout, request, &mut out)?;
    out.flush().context("failed to flush stdout")
}

/// Prints the decoded fields of each ID to stdout.
pub fn decode(layout: Config, ids: &[i64]) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    decode_to(layout, ids, &mut out)?;
    out.flush().context("failed to flush stdout")
}

fn generate_to<T, W>(
    registry: &Registry<T>,
    layout: Config,
    request: &GenerateRequest,
    out: &mut W,
) -> anyhow::Result<()>
where
    T: TimeSource + Clone + Send + Sync,
    W: Write,
{
    let generator = registry
        .get_or_create(request.worker_id, request.machine_id, layout)
        .context("failed to create generator")?;
    if generator.machine_id() != request.machine_id {
        warn!(
            worker_id = request.worker_id,
            requested = request.machine_id,
            registered = generator.machine_id(),
            "worker already registered with another machine id"
        );
    }

    info!(
        worker_id = request.worker_id,
        machine_id = generator.machine_id(),
        count = request.count,
        threads = request.threads,
        "generating ids"
    );
    let start = Instant::now();

    let minted = if request.threads <= 1 {
        for _ in 0..request.count {
            write_id(out, &generator, generator.next_id()?, request.decode)?;
        }
        request.count
    } else {
        let ids = mint_parallel(&generator, request.count, request.threads)?;
        for &id in &ids {
            write_id(out, &generator, id, request.decode)?;
        }
        ids.len()
    };

    info!(count = minted, elapsed = ?start.elapsed(), "done");
    Ok(())
}

fn write_id<T, W>(
    out: &mut W,
    generator: &SnowflakeGenerator<T>,
    id: i64,
    decode: bool,
) -> io::Result<()>
where
    T: TimeSource,
    W: Write,
{
    if decode {
        writeln!(out, "{id}\t{}", generator.decode(id))
    } else {
        writeln!(out, "{id}")
    }
}

// Grows as IDs arrive; the buffer is never sized from `count` up front.
fn mint<T>(generator: &SnowflakeGenerator<T>, count: usize) -> anyhow::Result<Vec<i64>>
where
    T: TimeSource,
{
    let ids = (0..count)
        .map(|_| generator.next_id())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

/// Splits `count` across `threads` callers of one generator and returns the
/// IDs in ascending order.
fn mint_parallel<T>(
    generator: &SnowflakeGenerator<T>,
    count: usize,
    threads: usize,
) -> anyhow::Result<Vec<i64>>
where
    T: TimeSource + Sync,
{
    let base = count / threads;
    let extra = count % threads;

    let batches = scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|i| {
                let share = base + usize::from(i < extra);
                s.spawn(move || mint(generator, share))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().map_err(|_| anyhow!("generator thread panicked"))?)
            .collect::<anyhow::Result<Vec<_>>>()
    })?;

    let mut ids: Vec<i64> = batches.into_iter().flatten().collect();
    ids.sort_unstable();
    Ok(ids)
}

fn decode_to<W: Write>(layout: Config, ids: &[i64], out: &mut W) -> anyhow::Result<()> {
    for &id in ids {
        if id < 0 {
            bail!("{id} is negative; generated IDs never set the sign bit");
        }
        writeln!(out, "{id}\t{}", layout.decompose(id))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    };

    #[derive(Clone, Default)]
    struct MockTime {
        millis: Arc<AtomicU64>,
    }

    impl TimeSource for MockTime {
        fn current_millis(&self) -> u64 {
            self.millis.load(Ordering::SeqCst)
        }
    }

    fn request(count: usize, threads: usize, decode: bool) -> GenerateRequest {
        GenerateRequest {
            worker_id: 2,
            machine_id: 3,
            count,
            threads,
            decode,
        }
    }

    fn lines(out: Vec<u8>) -> Vec<String> {
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn generates_requested_number_of_sorted_unique_ids() {
        let registry = Registry::new();
        let mut out = Vec::new();
        generate_to(&registry, Config::default(), &request(1_000, 4, false), &mut out).unwrap();

        let ids: Vec<i64> = lines(out).iter().map(|l| l.parse().unwrap()).collect();
        assert_eq!(ids.len(), 1_000);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 1_000);
    }

    #[test]
    fn decode_flag_appends_fields() {
        let time = MockTime::default();
        time.millis.store(5_000, Ordering::SeqCst);
        let registry = Registry::with_time_source(time);
        let mut out = Vec::new();
        generate_to(&registry, Config::new(0, 5, 5, 12), &request(2, 1, true), &mut out).unwrap();

        let lines = lines(out);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("timestamp=5000 worker_id=2 machine_id=3 sequence=0"));
        assert!(lines[1].ends_with("timestamp=5000 worker_id=2 machine_id=3 sequence=1"));
    }

    #[test]
    fn reuses_registered_generator() {
        let registry = Registry::new();
        let mut out = Vec::new();
        generate_to(&registry, Config::default(), &request(1, 1, false), &mut out).unwrap();

        let mut other = request(1, 1, false);
        other.machine_id = 9;
        generate_to(&registry, Config::default(), &other, &mut out).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(2).unwrap().machine_id(), 3);
    }

    #[test]
    fn clock_errors_surface_to_the_caller() {
        let time = MockTime::default();
        time.millis.store(5_000, Ordering::SeqCst);
        let registry = Registry::with_time_source(time.clone());
        let mut out = Vec::new();
        generate_to(&registry, Config::new(0, 5, 5, 12), &request(1, 1, false), &mut out).unwrap();

        time.millis.store(4_000, Ordering::SeqCst);
        let err = generate_to(&registry, Config::new(0, 5, 5, 12), &request(1, 1, false), &mut out)
            .unwrap_err();
        assert!(err.to_string().contains("clock moved backwards"));
    }

    /// Accepts `limit` bytes, then fails every write.
    struct BoundedSink {
        written: usize,
        limit: usize,
    }

    impl Write for BoundedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.written + buf.len() > self.limit {
                return Err(io::Error::other("sink full"));
            }
            self.written += buf.len();
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn single_thread_output_is_streamed_as_ids_are_minted() {
        let registry = Registry::new();
        let mut sink = BoundedSink {
            written: 0,
            limit: 200,
        };

        // Nothing is buffered up front, so a huge count fails on the first
        // rejected write instead of allocating.
        let err = generate_to(
            &registry,
            Config::default(),
            &request(usize::MAX, 1, false),
            &mut sink,
        )
        .unwrap_err();

        assert!(err.to_string().contains("sink full"));
        assert!(sink.written > 0);
    }

    #[test]
    fn decode_prints_fields_and_rejects_negative_ids() {
        let layout = Config::new(0, 5, 5, 12);
        let id = layout.compose(77, 1, 2, 3).unwrap();

        let mut out = Vec::new();
        decode_to(layout, &[id], &mut out).unwrap();
        assert_eq!(
            lines(out),
            vec![format!("{id}\ttimestamp=77 worker_id=1 machine_id=2 sequence=3")]
        );

        assert!(decode_to(layout, &[-1], &mut Vec::new()).is_err());
    }
}
