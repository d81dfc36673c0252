//! spider-detect: CLI tool for inspecting spider rule sets and classifying requests.

use clap::{Parser, Subcommand};
use spiderdetect::{read_patterns, SpiderConfig, SpiderDetector};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "spider-detect")]
#[command(version = "0.1.0")]
#[command(about = "Inspect spider rule sets and classify requests", long_about = None)]
struct Cli {
    /// YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Spider rules directory (overrides the config file)
    #[arg(short, long, global = true)]
    spiders_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a single request signature
    Check {
        /// Client IP address
        ip: String,

        /// X-Forwarded-For chain
        #[arg(long)]
        forwarded_for: Option<String>,

        /// Reverse-resolved hostname
        #[arg(long)]
        hostname: Option<String>,

        /// User-Agent header
        #[arg(long)]
        agent: Option<String>,
    },

    /// Print every entry of the spider IP table
    ListIps {
        /// Print as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Print the patterns read from one file
    Patterns {
        /// Pattern file
        file: PathBuf,
    },

    /// Print the statistics filter clause excluding spider addresses
    FilterQuery,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => SpiderConfig::load(path)?,
        None => SpiderConfig::default(),
    };
    if let Some(dir) = cli.spiders_dir {
        config.spiders_dir = dir;
    }

    match cli.command {
        Commands::Check {
            ip,
            forwarded_for,
            hostname,
            agent,
        } => {
            let detector = SpiderDetector::new(config);
            let spider = detector.is_spider(
                &ip,
                forwarded_for.as_deref(),
                hostname.as_deref(),
                agent.as_deref(),
            );
            println!("{}", if spider { "spider" } else { "not a spider" });
        }
        Commands::ListIps { json } => {
            let detector = SpiderDetector::new(config);
            let ips = detector.spider_ip_addresses();
            if json {
                println!("{}", serde_json::to_string_pretty(&ips)?);
            } else {
                for ip in ips {
                    println!("{}", ip);
                }
            }
        }
        Commands::Patterns { file } => {
            for pattern in read_patterns(&file)? {
                println!("{}", pattern);
            }
        }
        Commands::FilterQuery => {
            let detector = SpiderDetector::new(config);
            println!("{}", detector.exclusion_filter());
        }
    }

    Ok(())
}
