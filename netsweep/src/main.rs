use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use host_discovery::{start_sweep, SweepOptions, SystemProber};
use indicatif::{ProgressBar, ProgressStyle};
use neighbor_table::SystemNeighbors;
use netsweep_core::NeighborSource;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vendor_db::VendorDb;

mod config;
mod report;

use report::HostRow;

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|_| String::new())
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat { Text, Json, Jsonl }

impl OutputFormat {
    fn from_name(name: &str) -> Self {
        match name { "json" => OutputFormat::Json, "jsonl" => OutputFormat::Jsonl, _ => OutputFormat::Text }
    }
}

#[derive(Debug, Parser)]
#[command(name = "netsweep", version, about = "Local network host discovery with port checks and MAC vendor lookup")]
struct Cli {
    /// Optional config file (YAML). If omitted, loads ./netsweep.yaml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log more (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print version information
    Version,
    /// Find live hosts in a range, then resolve names, check ports and look up vendors
    Sweep(SweepArgs),
    /// Print the OS neighbor (ARP) table
    Neighbors {
        /// Output format: text, json, or jsonl
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Download the MAC vendor database
    UpdateVendors {
        #[arg(long, default_value = vendor_db::DATABASE_URL)]
        url: String,
        /// Where to store the database
        #[arg(long, value_name = "FILE")]
        vendor_db: Option<PathBuf>,
    },
}

#[derive(Debug, Args, Default)]
struct SweepArgs {
    /// CIDR range (e.g., 192.168.1.0/24). Default: the local interface network.
    #[arg(short, long)]
    net: Option<String>,
    /// Concurrent workers [default: 200]
    #[arg(short, long)]
    workers: Option<usize>,
    /// Ports: "default" or a comma list of service names and numbers (e.g., ssh,http,8080)
    #[arg(short, long)]
    ports: Option<String>,
    /// Timeout per port in milliseconds [default: 500]
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Ping wait in milliseconds [default: 1000]
    #[arg(long)]
    ping_timeout_ms: Option<u64>,
    /// Export results; .csv writes semicolon CSV, anything else plain text
    #[arg(short, long, value_name = "FILE")]
    out: Option<PathBuf>,
    /// Download the vendor database before scanning
    #[arg(long)]
    update_vendors: bool,
    /// Skip MAC vendor lookup
    #[arg(long)]
    skip_vendor: bool,
    /// Skip reverse hostname lookup
    #[arg(long)]
    skip_hostname: bool,
    /// Skip port checks
    #[arg(long)]
    skip_ports: bool,
    /// Vendor database file [default: manuf.txt]
    #[arg(long, value_name = "FILE")]
    vendor_db: Option<PathBuf>,
    /// Output format: text, json, or jsonl
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
}

/// Sweep parameters after merging flags, config file and defaults.
#[derive(Debug, Clone, PartialEq)]
struct SweepSettings {
    net: Option<String>,
    workers: usize,
    ports: String,
    port_timeout: Duration,
    ping_timeout: Duration,
    skip_vendor: bool,
    skip_hostname: bool,
    skip_ports: bool,
    vendor_db: PathBuf,
    format: OutputFormat,
}

impl SweepSettings {
    fn resolve(args: &SweepArgs, cfg: Option<&config::SweepConfig>) -> Self {
        let c = cfg.cloned().unwrap_or_default();
        SweepSettings {
            net: args.net.clone().or(c.net),
            workers: args.workers.or(c.workers).unwrap_or(200),
            ports: args.ports.clone().or(c.ports).unwrap_or_else(|| "default".into()),
            port_timeout: Duration::from_millis(args.timeout_ms.or(c.timeout_ms).unwrap_or(500)),
            ping_timeout: Duration::from_millis(args.ping_timeout_ms.or(c.ping_timeout_ms).unwrap_or(1000)),
            skip_vendor: args.skip_vendor || c.skip_vendor.unwrap_or(false),
            skip_hostname: args.skip_hostname || c.skip_hostname.unwrap_or(false),
            skip_ports: args.skip_ports || c.skip_ports.unwrap_or(false),
            vendor_db: args.vendor_db.clone().or(c.vendor_db.map(PathBuf::from)).unwrap_or_else(|| vendor_db::DEFAULT_PATH.into()),
            format: args.format.or(c.format.as_deref().map(OutputFormat::from_name)).unwrap_or(OutputFormat::Text),
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose { 0 => "warn", 1 => "debug", _ => "trace" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let loaded_cfg = config::load_config(cli.config.as_deref());
    match cli.command {
        Commands::Version => {
            println!("netsweep {} (core {})", env!("CARGO_PKG_VERSION"), netsweep_core::version());
        }
        Commands::UpdateVendors { url, vendor_db: db_path } => {
            let path = db_path
                .or_else(|| loaded_cfg.as_ref().and_then(|c| c.sweep.as_ref()).and_then(|s| s.vendor_db.clone()).map(PathBuf::from))
                .unwrap_or_else(|| vendor_db::DEFAULT_PATH.into());
            let rt = tokio::runtime::Runtime::new()?;
            let bytes = rt.block_on(vendor_db::download(&url, &path))?;
            println!("vendor database saved to {} ({} bytes)", path.display(), bytes);
        }
        Commands::Neighbors { format } => {
            let rt = tokio::runtime::Runtime::new()?;
            let table = rt.block_on(SystemNeighbors.fetch_neighbor_table());
            let mut entries: Vec<_> = table.into_iter().collect();
            entries.sort();
            match format {
                OutputFormat::Text => {
                    for (ip, mac) in &entries { println!("{:<15} {}", ip, mac); }
                }
                OutputFormat::Json => {
                    let obj: serde_json::Map<String, serde_json::Value> =
                        entries.iter().map(|(ip, mac)| (ip.to_string(), serde_json::Value::from(mac.as_str()))).collect();
                    println!("{}", serde_json::to_string(&obj)?);
                }
                OutputFormat::Jsonl => {
                    for (ip, mac) in &entries { println!("{}", serde_json::json!({ "address": ip, "mac": mac })); }
                }
            }
        }
        Commands::Sweep(args) => {
            let settings = SweepSettings::resolve(&args, loaded_cfg.as_ref().and_then(|c| c.sweep.as_ref()));
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_sweep(settings, args.update_vendors, args.out))?;
        }
    }
    Ok(())
}

async fn run_sweep(settings: SweepSettings, update_vendors: bool, out: Option<PathBuf>) -> Result<()> {
    let net = match settings.net.clone() {
        Some(n) => n,
        None => host_discovery::local::local_subnet()
            .map(|n| n.to_string())
            .ok_or_else(|| anyhow!("could not determine the local subnet; pass --net <CIDR>"))?,
    };
    let text = settings.format == OutputFormat::Text;

    if update_vendors {
        if let Err(e) = vendor_db::download(vendor_db::DATABASE_URL, &settings.vendor_db).await {
            warn!(error = %e, "vendor database update failed");
        }
    }
    let vendors = if settings.skip_vendor {
        None
    } else {
        let db = Arc::new(VendorDb::new(settings.vendor_db.clone()));
        let loader = db.clone();
        tokio::task::spawn_blocking(move || loader.load()).await?;
        Some(db)
    };

    let opts = SweepOptions {
        workers: settings.workers,
        ports: port_scan::parse_ports(&settings.ports),
        skip_hostname: settings.skip_hostname,
        skip_ports: settings.skip_ports,
        port_timeout: settings.port_timeout,
    };
    let prober = Arc::new(SystemProber { ping_timeout: settings.ping_timeout, ..SystemProber::default() });
    let started = Instant::now();
    let started_at = now_rfc3339();
    let mut sweep = start_sweep(&net, opts, prober)?;
    info!(range = %net, hosts = sweep.total(), workers = settings.workers, "sweep started");
    if text {
        println!("Sweeping {} ({} addresses, {} workers)", net, sweep.total(), settings.workers.max(1));
    }

    // Read once while the workers are already probing.
    let neighbors = SystemNeighbors.fetch_neighbor_table().await;

    let progress = if text { ProgressBar::new(sweep.total()) } else { ProgressBar::hidden() };
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}").unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut rows = Vec::new();
    let mut tick = tokio::time::interval(Duration::from_millis(100));
    loop {
        tokio::select! {
            next = sweep.next() => {
                let Some(result) = next else { break };
                let row = HostRow::new(result, &neighbors, vendors.as_deref());
                match settings.format {
                    OutputFormat::Text => progress.println(format!("Found active host: {}", row.address)),
                    OutputFormat::Jsonl => println!("{}", serde_json::to_string(&row)?),
                    OutputFormat::Json => {}
                }
                progress.set_position(sweep.probed());
                rows.push(row);
            }
            _ = tick.tick() => progress.set_position(sweep.probed()),
        }
    }
    progress.finish_and_clear();
    rows.sort_by_key(|r| r.address);
    let duration = started.elapsed();

    match settings.format {
        OutputFormat::Text => {
            if rows.is_empty() {
                println!("No active devices found in the specified range.");
            } else {
                println!("\nScan Summary\n");
                print!("{}", report::render_table(&report::table_rows(&rows)));
            }
            println!("\nScan duration: {} ms", duration.as_millis());
            println!("{}", report::completion_quip());
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "range": net,
                "scanned": sweep.total(),
                "hosts": &rows,
                "workers": settings.workers,
                "duration_ms": duration.as_millis() as u64,
                "started_at": started_at,
                "ended_at": now_rfc3339(),
            });
            println!("{}", serde_json::to_string(&obj)?);
        }
        OutputFormat::Jsonl => {}
    }

    if let Some(path) = out {
        match results_export::export_rows(&path, &report::table_rows(&rows)) {
            Ok(_) if text => println!("Results saved to: {}", path.display()),
            Ok(_) => info!(path = %path.display(), "results saved"),
            Err(e) => warn!(error = %e, "export failed"),
        }
    }
    Ok(())
}
