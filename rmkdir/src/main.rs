use anyhow::{Result, anyhow};
use clap::Parser;
use tracing::instrument;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rmkdir",
    version,
    about = "Create directories on local disk, SFTP or FTP servers - equivalent to `mkdir -p`",
    long_about = "`rmkdir` creates a directory together with every missing parent, through one interface for
local disk, SFTP and FTP servers. Directories that already exist are not an error; a path that
exists as a file is.

EXAMPLE:
    # Create a release directory on an SFTP server
    rmkdir sftp://deploy@files.example.com/srv/releases/2024-06-01/assets"
)]
struct Args {
    /// Exit on first error
    #[arg(short = 'e', long = "fail-early", help_heading = "Creation options")]
    fail_early: bool,

    #[command(flatten)]
    connection: remote::ConnectionArgs,

    // Progress & output
    /// Verbose level (implies "summary"): -v INFO / -vv DEBUG / -vvv TRACE (default: ERROR)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Progress & output")]
    verbose: u8,

    /// Print summary at the end
    #[arg(long, help_heading = "Progress & output")]
    summary: bool,

    /// Quiet mode, don't report errors
    #[arg(short = 'q', long = "quiet", help_heading = "Progress & output")]
    quiet: bool,

    // Advanced settings
    /// Number of worker threads, 0 means number of cores
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        help_heading = "Advanced settings"
    )]
    max_workers: usize,

    /// Number of blocking worker threads, 0 means Tokio runtime default (512)
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        help_heading = "Advanced settings"
    )]
    max_blocking_threads: usize,

    // ARGUMENTS
    /// Directory location(s) to create: a local path, sftp://[user@]host[:port]/path or
    /// ftp://[user@]host[:port]/path
    #[arg(required = true, value_parser = remote::parse_location)]
    locations: Vec<remote::Location>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Summary {
    directories_ensured: usize,
    failed: usize,
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "directories ensured: {}\n\
            failed: {}\n",
            self.directories_ensured, self.failed
        )
    }
}

async fn make_location(location: &remote::Location, args: &Args) -> Result<()> {
    let backend = remote::connect(location, &args.connection).await?;
    common::make_dir_all(&backend, location.path())
        .await
        .map_err(common::Error::into_anyhow)
}

#[instrument]
async fn async_main(args: Args) -> Result<Summary> {
    let mut summary = Summary::default();
    for location in &args.locations {
        match make_location(location, &args).await {
            Ok(()) => summary.directories_ensured += 1,
            Err(error) => {
                tracing::error!("{}: {:#}", location, &error);
                summary.failed += 1;
                if args.fail_early {
                    return Err(error.context(format!("failed creating {location}")));
                }
            }
        }
    }
    if summary.failed > 0 {
        if args.summary {
            return Err(anyhow!("rmkdir encountered errors\n\n{}", &summary));
        }
        return Err(anyhow!("rmkdir encountered errors"));
    }
    Ok(summary)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let func = {
        let args = args.clone();
        || async_main(args)
    };
    let output = common::OutputConfig {
        quiet: args.quiet,
        verbose: args.verbose,
        print_summary: args.summary,
    };
    let runtime = common::RuntimeConfig {
        max_workers: args.max_workers,
        max_blocking_threads: args.max_blocking_threads,
    };
    let res = common::run(output, runtime, func);
    if res.is_none() {
        std::process::exit(1);
    }
    Ok(())
}
