// Tue Jan 13 2026 - Alex

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rbx_remote::{
    bytecode::ScriptBytecode,
    config::Config,
    instance::{Instance, Session},
    memory,
    offsets::{OffsetTable, VersionStatus},
    sync::{InstanceSource, SyncEvent, TreeSynchronizer},
    utils::{self, logging, ScopedTimer, SearchFilter},
    worker::{run_loop, CancellationToken, PollObserver, Poller, Status},
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author = "Alex")]
#[command(version = "1.0.0")]
#[command(about = "Live instance tree reader for a running Roblox client", long_about = None)]
struct Cli {
    /// More output; repeat for trace.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log level by name (error, warn, info, debug, trace, off); overrides -v/-q.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Target process name.
    #[arg(short, long, global = true)]
    process: Option<String>,

    /// Offset document.
    #[arg(short, long, global = true)]
    offsets: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Attach and print the DataModel tree.
    Tree {
        /// Start from this service instead of the DataModel.
        #[arg(short, long)]
        service: Option<String>,

        #[arg(short, long)]
        depth: Option<usize>,

        /// Only print nodes matching these words.
        #[arg(short, long)]
        filter: Option<String>,

        /// Treat the filter as a regular expression.
        #[arg(long)]
        regex: bool,
    },
    /// Print the typed properties of a dot-separated instance path.
    Inspect { path: String },
    /// Keep the configured services in sync and log every change.
    Watch {
        /// Stop after this many ticks.
        #[arg(short, long)]
        ticks: Option<u64>,
    },
    /// Wrap raw bytecode in a container.
    Encode { input: PathBuf, output: PathBuf },
    /// Unwrap a bytecode container.
    Decode { input: PathBuf, output: PathBuf },
    /// Load an offset document and report it.
    Offsets { file: PathBuf },
}

fn main() {
    let cli = Cli::parse();
    let level = match cli.log_level.as_deref() {
        Some(name) => logging::level_from_str(name),
        None => logging::level_from_verbosity(cli.verbose, cli.quiet),
    };
    logging::init(level);

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "[!]".red(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    match cli.command {
        Command::Tree {
            service,
            depth,
            filter,
            regex,
        } => {
            let filter = match filter {
                Some(query) if regex => SearchFilter::regex(&query).context("invalid filter pattern")?,
                Some(query) => SearchFilter::new(&query),
                None => SearchFilter::default(),
            };
            print_tree(&config, service.as_deref(), depth, &filter)
        }
        Command::Inspect { path } => inspect(&config, &path),
        Command::Watch { ticks } => watch(config, ticks),
        Command::Encode { input, output } => encode(&input, &output),
        Command::Decode { input, output } => decode(&input, &output),
        Command::Offsets { file } => report_offsets(&config, &file),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(process) = &cli.process {
        config = config.with_process_name(process.clone());
    }
    if let Some(offsets) = &cli.offsets {
        config = config.with_offsets_path(offsets.clone());
    }
    config.validate()?;
    Ok(config)
}

fn load_offsets(config: &Config) -> Result<Arc<OffsetTable>> {
    let offsets = OffsetTable::load(&config.offsets_path)
        .with_context(|| format!("loading offsets from {}", config.offsets_path.display()))?;
    if let Some(path) = memory::process_path(&config.process_name) {
        if offsets.version_status(&path) == VersionStatus::Mismatch {
            println!("{} Offsets were generated for another client version", "[!]".yellow());
        }
    }
    Ok(Arc::new(offsets))
}

fn connect(config: &Config) -> Result<Arc<Session>> {
    let offsets = load_offsets(config)?;
    println!("{} Attaching to {}", "[*]".blue(), config.process_name);
    let remote = memory::attach(&config.process_name)?;
    println!("{} Attached (pid {})", "[+]".green(), remote.pid());
    Ok(Session::with_thread_timeout(remote, offsets, config.thread_timeout()))
}

fn data_model_root(session: &Arc<Session>) -> Result<Instance> {
    let game = session.scheduler().try_data_model().context("DataModel not reachable")?;
    Ok(game.into_instance())
}

fn print_tree(config: &Config, service: Option<&str>, depth: Option<usize>, filter: &SearchFilter) -> Result<()> {
    let session = connect(config)?;
    let game = data_model_root(&session)?;
    let root = match service {
        Some(name) => game.find_first_child(name, false),
        None => game,
    };
    if root.is_null() {
        bail!("service {} not found", service.unwrap_or_default());
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Walking {}", root.name()));
    spinner.enable_steady_tick(Duration::from_millis(80));
    let mut tree = TreeSynchronizer::new();
    {
        let _timer = ScopedTimer::new("tree walk");
        tree.tick(&InstanceSource::new(root.clone()));
    }
    spinner.finish_and_clear();

    println!("{} ({})", root.name().cyan().bold(), root.class_name());
    let mut shown = 0;
    for (level, record) in tree.flatten() {
        if depth.is_some_and(|max| level >= max) {
            continue;
        }
        if !filter.matches(&record.name, &record.class_name, record.address) {
            continue;
        }
        shown += 1;
        println!(
            "{}{} {} {}",
            "  ".repeat(level + 1),
            record.name,
            format!("({})", record.class_name).dimmed(),
            format!("{}", record.address).dimmed()
        );
    }
    println!();
    println!("{} {} shown", "[+]".green(), utils::pluralize(shown, "instance", "instances"));
    Ok(())
}

fn inspect(config: &Config, path: &str) -> Result<()> {
    let session = connect(config)?;
    let game = data_model_root(&session)?;
    let instance = game.find_path(path);
    if instance.is_null() {
        bail!("no instance at {}", path);
    }

    println!("{}", instance.full_name().cyan().bold());
    println!("  {:<12} {}", "Class", instance.class_name());
    println!("  {:<12} {}", "Address", instance.address());
    println!("  {:<12} {}", "Parent", instance.parent().address());
    println!("  {:<12} {}", "Children", instance.children().len());
    let typed = instance.typed();
    for (name, value) in typed.properties() {
        println!("  {:<12} {}", name, value.to_string().green());
    }
    Ok(())
}

/// Prints poll loop output above a status spinner.
struct ConsoleObserver {
    progress: ProgressBar,
}

impl PollObserver for ConsoleObserver {
    fn status(&mut self, status: Status) {
        let line = match status {
            Status::Connected => format!("{} {}", "[+]".green(), status),
            Status::Connecting { .. } => format!("{} {}", "[*]".blue(), status),
            Status::Failed { .. } => format!("{} {}", "[!]".red(), status),
        };
        self.progress.println(line);
        self.progress.set_message(status.to_string());
    }

    fn events(&mut self, service: &str, tree: &TreeSynchronizer, events: &[SyncEvent]) {
        for event in events {
            let line = match event {
                SyncEvent::Added { address, .. } => {
                    let name = tree.record(*address).map(|r| r.name.as_str()).unwrap_or_default();
                    format!("{} {} {} {}", "+".green(), service, name, address)
                }
                SyncEvent::Removed { address } => format!("{} {} {}", "-".red(), service, address),
                SyncEvent::Updated { .. } => continue,
            };
            self.progress.println(line);
        }
    }
}

fn watch(config: Config, ticks: Option<u64>) -> Result<()> {
    let offsets = load_offsets(&config)?;
    let progress = match ticks {
        Some(n) => {
            let pb = ProgressBar::new(n);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                    .progress_chars("#>-"),
            );
            pb
        }
        None => ProgressBar::new_spinner(),
    };
    progress.enable_steady_tick(Duration::from_millis(120));

    let observer = ConsoleObserver {
        progress: progress.clone(),
    };
    let interval = config.tick_interval();
    let mut poller = Poller::for_process(config, offsets).with_observer(Box::new(observer));
    let token = CancellationToken::new();
    let interrupt = token.clone();
    ctrlc::set_handler(move || {
        log::info!("interrupted, stopping watch");
        interrupt.cancel();
    })
    .context("installing Ctrl-C handler")?;
    run_loop(&token, interval, || {
        poller.tick();
        progress.set_position(poller.ticks());
        ticks.map_or(true, |limit| poller.ticks() < limit)
    });

    progress.finish_and_clear();
    println!("{} Stopped after {} ticks", "[+]".green(), poller.ticks());
    Ok(())
}

fn encode(input: &Path, output: &Path) -> Result<()> {
    let raw = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let container = ScriptBytecode::encode(&raw)?;
    fs::write(output, &container).with_context(|| format!("writing {}", output.display()))?;
    println!(
        "{} {} -> {} ({})",
        "[+]".green(),
        utils::format_bytes(raw.len() as u64),
        utils::format_bytes(container.len() as u64),
        utils::hex_preview(&container, 8)
    );
    Ok(())
}

fn decode(input: &Path, output: &Path) -> Result<()> {
    let container = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let raw = ScriptBytecode::decode(&container).context("container rejected")?;
    fs::write(output, &raw).with_context(|| format!("writing {}", output.display()))?;
    println!(
        "{} {} -> {} ({})",
        "[+]".green(),
        utils::format_bytes(container.len() as u64),
        utils::format_bytes(raw.len() as u64),
        utils::hex_preview(&raw, 8)
    );
    Ok(())
}

fn report_offsets(config: &Config, file: &Path) -> Result<()> {
    let offsets = OffsetTable::load(file).with_context(|| format!("loading {}", file.display()))?;

    println!("{}", "Offsets".cyan().bold());
    println!("{}", "-".repeat(40).cyan());
    for (name, value) in offsets.iter() {
        println!("  {:<40} 0x{:x}", name, value);
    }
    println!();
    println!("{} {}", "[+]".green(), utils::pluralize(offsets.len(), "offset", "offsets"));
    if !offsets.skipped().is_empty() {
        println!("{} Ignored non-offset keys: {}", "[!]".yellow(), offsets.skipped().join(", "));
    }

    if offsets.versions().is_empty() {
        println!("{} Document has no version entry", "[*]".blue());
    } else {
        println!("{} Built for {}", "[*]".blue(), offsets.versions().join(", "));
    }
    match memory::process_path(&config.process_name) {
        Some(path) => match offsets.version_status(&path) {
            VersionStatus::Matching => println!("{} Matches the running client", "[+]".green()),
            VersionStatus::Mismatch => println!("{} Running client is a different version", "[!]".yellow()),
            VersionStatus::Unknown => println!("{} Version could not be checked", "[*]".blue()),
        },
        None => println!("{} {} is not running", "[*]".blue(), config.process_name),
    }
    Ok(())
}
