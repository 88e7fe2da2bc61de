//! Worker-pool sweep: a fixed set of workers drains one address queue and
//! streams a result for every host that answers.

use crate::AddressRange;
use netsweep_core::{HostProber, PortEntry, Result, ScanResult};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, trace, warn};

#[derive(Debug, Clone)]
pub struct SweepOptions {
    /// Number of concurrent workers; zero is treated as one.
    pub workers: usize,
    pub ports: Vec<PortEntry>,
    pub skip_hostname: bool,
    pub skip_ports: bool,
    pub port_timeout: Duration,
}

impl Default for SweepOptions {
    fn default() -> Self {
        SweepOptions {
            workers: 200,
            ports: port_scan::default_ports(),
            skip_hostname: false,
            skip_ports: false,
            port_timeout: port_scan::DEFAULT_PORT_TIMEOUT,
        }
    }
}

/// A running sweep. Results arrive in completion order; `next` returns
/// `None` once every worker has finished.
#[derive(Debug)]
pub struct Sweep {
    total: u64,
    probed: Arc<AtomicU64>,
    results: mpsc::UnboundedReceiver<ScanResult>,
}

impl Sweep {
    pub async fn next(&mut self) -> Option<ScanResult> {
        self.results.recv().await
    }

    /// Addresses queued for this sweep.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Addresses whose pipeline has completed, answered or not.
    pub fn probed(&self) -> u64 {
        self.probed.load(Ordering::Relaxed)
    }

    /// Drain the stream.
    pub async fn collect(mut self) -> Vec<ScanResult> {
        let mut out = Vec::new();
        while let Some(r) = self.next().await {
            out.push(r);
        }
        out
    }
}

/// Run the per-host pipeline: reachability, then optionally hostname and
/// ports. Unreachable hosts produce nothing.
pub async fn probe_host<P: HostProber + ?Sized>(addr: Ipv4Addr, prober: &P, opts: &SweepOptions) -> Option<ScanResult> {
    let start = Instant::now();
    if !prober.is_reachable(addr).await {
        trace!(%addr, "no reply");
        return None;
    }
    let latency = start.elapsed();

    let hostname = if opts.skip_hostname { None } else { prober.resolve_hostname(addr).await };

    let open_ports = if opts.skip_ports {
        None
    } else {
        let mut open = Vec::new();
        for entry in &opts.ports {
            if prober.is_port_open(addr, entry.number, opts.port_timeout).await {
                open.push(entry.clone());
            }
        }
        Some(open)
    };

    debug!(%addr, ?latency, hostname = ?hostname, "host up");
    Some(ScanResult { address: addr, reachable: true, hostname, open_ports, latency })
}

/// Start sweeping `cidr`. Must be called from within a Tokio runtime.
///
/// Fails only when the range does not parse; nothing is probed in that case.
pub fn start_sweep<P: HostProber + ?Sized>(cidr: &str, opts: SweepOptions, prober: Arc<P>) -> Result<Sweep> {
    let range = AddressRange::parse(cidr)?;
    let total = range.len();
    let workers = opts.workers.max(1);

    // Sized to the whole range so the producer never waits on workers.
    let capacity = usize::try_from(total).unwrap_or(usize::MAX).clamp(1, tokio::sync::Semaphore::MAX_PERMITS);
    let (job_tx, job_rx) = mpsc::channel::<Ipv4Addr>(capacity);
    let (res_tx, res_rx) = mpsc::unbounded_channel::<ScanResult>();
    let jobs = Arc::new(Mutex::new(job_rx));
    let probed = Arc::new(AtomicU64::new(0));
    let opts = Arc::new(opts);

    debug!(range = %range.network(), total, workers, "starting sweep");
    let probed_c = probed.clone();
    tokio::spawn(async move {
        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            handles.push(tokio::spawn(run_worker(id, jobs.clone(), res_tx.clone(), prober.clone(), opts.clone(), probed_c.clone())));
        }

        for addr in range.hosts() {
            if job_tx.send(addr).await.is_err() {
                break;
            }
        }
        drop(job_tx);

        for h in handles {
            if let Err(e) = h.await {
                warn!(error = %e, "sweep worker aborted");
            }
        }
        // Every sender clone lived in a worker; this is the last one.
        drop(res_tx);
        debug!("sweep finished");
    });

    Ok(Sweep { total, probed, results: res_rx })
}

async fn run_worker<P: HostProber + ?Sized>(
    id: usize,
    jobs: Arc<Mutex<mpsc::Receiver<Ipv4Addr>>>,
    results: mpsc::UnboundedSender<ScanResult>,
    prober: Arc<P>,
    opts: Arc<SweepOptions>,
    probed: Arc<AtomicU64>,
) {
    loop {
        let next = jobs.lock().await.recv().await;
        let Some(addr) = next else { break };
        let result = probe_host(addr, prober.as_ref(), &opts).await;
        probed.fetch_add(1, Ordering::Relaxed);
        if let Some(r) = result {
            if results.send(r).is_err() {
                trace!(worker = id, "result stream dropped, stopping");
                break;
            }
        }
    }
}
