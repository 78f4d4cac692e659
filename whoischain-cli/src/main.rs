mod display;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use whoischain_core::bulk::{parse_queries_from_file, ProgressCallback};
use whoischain_core::output::{get_formatter, OutputFormat};
use whoischain_core::{
    BulkExecutor, HostName, RetryPolicy, TextEncoding, WhoisLookup, WhoisOptions, WhoisResponse,
};

use display::{clear_bulk_progress_bar, set_bulk_progress_bar, ProgressWriterFactory, Spinner};

#[derive(Parser)]
#[command(name = "whoischain")]
#[command(about = "WHOIS lookups that follow referrals and show every server on the way")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (human or json)
    #[arg(short, long, default_value = "human", global = true)]
    format: OutputFormat,

    /// Per-server timeout in seconds
    #[arg(short, long, default_value_t = 10, global = true)]
    timeout: u64,

    /// Decode responses as Latin-1 instead of UTF-8
    #[arg(long, global = true)]
    latin1: bool,

    /// Stop at the first response instead of following referrals
    #[arg(long, global = true)]
    no_follow: bool,

    /// Referral target that ends the chain instead of being contacted (repeatable)
    #[arg(long = "ignore", value_name = "SERVER", global = true)]
    ignored: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up a domain, TLD or IP address
    Lookup {
        /// Domain name, TLD (e.g. .com) or IP address
        query: String,
        /// Start at this server instead of the root server
        #[arg(short, long)]
        server: Option<String>,
        /// Use blocking sockets instead of the async runtime
        #[arg(long)]
        blocking: bool,
        /// Print the raw text of the last response
        #[arg(long)]
        raw: bool,
    },
    /// Look up every query in a file
    Bulk {
        /// One query per line, # for comments, or CSV (uses first column)
        file: PathBuf,
        /// Lookups in flight at once
        #[arg(short, long, default_value_t = 10)]
        concurrency: usize,
        /// Attempts per query when a server cannot be reached
        #[arg(short, long, default_value_t = 1)]
        attempts: usize,
        /// Pause before each lookup, in milliseconds
        #[arg(long, default_value_t = 100)]
        rate_limit_ms: u64,
    },
}

impl Cli {
    fn options(&self) -> anyhow::Result<WhoisOptions> {
        let encoding = if self.latin1 {
            TextEncoding::Latin1
        } else {
            TextEncoding::Utf8
        };
        let mut options = WhoisOptions::new()
            .with_encoding(encoding)
            .with_timeout(Duration::from_secs(self.timeout))
            .with_follow_referrer(!self.no_follow);
        for server in &self.ignored {
            options = options.with_ignored_server(HostName::parse(server)?);
        }
        Ok(options)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(ProgressWriterFactory)
        .init();

    let cli = Cli::parse();
    let lookup = Arc::new(WhoisLookup::with_options(cli.options()?));

    match cli.command {
        Commands::Lookup {
            query,
            server,
            blocking,
            raw,
        } => run_lookup(lookup, &query, server.as_deref(), blocking, raw, cli.format).await,
        Commands::Bulk {
            file,
            concurrency,
            attempts,
            rate_limit_ms,
        } => {
            let executor = BulkExecutor::new(lookup)
                .with_concurrency(concurrency)
                .with_rate_limit(Duration::from_millis(rate_limit_ms))
                .with_retry_policy(RetryPolicy::new().with_max_attempts(attempts));
            run_bulk(executor, &file, cli.format).await
        }
    }
}

async fn run_lookup(
    lookup: Arc<WhoisLookup>,
    query: &str,
    server: Option<&str>,
    blocking: bool,
    raw: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut request = lookup.request(query)?;
    if let Some(server) = server {
        request = request.with_whois_server(HostName::parse(server)?);
    }

    let spinner = if std::io::stderr().is_terminal() {
        Spinner::new(&format!("Looking up WHOIS for {}", request.host_name()))
    } else {
        Spinner::hidden()
    };

    debug!(query = %request.query(), blocking = blocking, "Starting lookup");
    let result = if blocking {
        let engine = lookup.clone();
        let request = request.clone();
        tokio::task::spawn_blocking(move || engine.lookup_request_blocking(&request)).await?
    } else {
        lookup.lookup_request(&request).await
    };
    spinner.finish();

    match result {
        Ok(response) => {
            print_response(&response, raw, format);
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn print_response(response: &WhoisResponse, raw: bool, format: OutputFormat) {
    match (raw, response.content.as_deref()) {
        (true, Some(content)) => print!("{}", content),
        _ => println!("{}", get_formatter(format).format_response(response)),
    }
}

async fn run_bulk(
    executor: BulkExecutor,
    file: &Path,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)?;
    let queries = parse_queries_from_file(&content);
    debug!(file = %file.display(), queries = queries.len(), "Loaded bulk queries");

    if queries.is_empty() {
        eprintln!(
            "{} No queries found in {}. Expected one query per line, # for comments, or CSV (first column)",
            "Error:".red().bold(),
            file.display()
        );
        std::process::exit(1);
    }

    let bar = if std::io::stderr().is_terminal() {
        ProgressBar::new(queries.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .map(|style| style.progress_chars("█▓░"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    set_bulk_progress_bar(bar.clone());

    let progress_bar = bar.clone();
    let progress: ProgressCallback = Box::new(move |done, _total, query| {
        progress_bar.set_position(done as u64);
        progress_bar.set_message(query.to_string());
    });

    let results = executor.execute(queries, Some(progress)).await;

    bar.finish_and_clear();
    clear_bulk_progress_bar();

    let succeeded = results.iter().filter(|r| r.success).count();
    info!(
        total = results.len(),
        succeeded = succeeded,
        failed = results.len() - succeeded,
        "Bulk run finished"
    );

    println!("{}", get_formatter(format).format_bulk(&results));
    Ok(())
}
