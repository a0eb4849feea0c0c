use anyhow::{Result, anyhow};
use clap::Parser;
use tracing::instrument;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rrm",
    version,
    about = "Remove directory trees on local disk, SFTP or FTP servers - equivalent to `rm -rf`",
    long_about = "`rrm` removes files and whole directory trees through one interface, whether they live on
local disk, an SFTP server or an FTP server. Entries that disappear while the tree is walked are
not errors; entries that cannot be removed are retried a bounded number of times and reported.

EXAMPLE:
    # Remove a remote directory tree and print what was removed
    rrm sftp://deploy@files.example.com/srv/releases/old --summary

    # Remove over FTP, password taken from the environment
    RFS_FTP_PASSWORD=... rrm ftp://upload@ftp.example.com/incoming/tmp

Note: Like `rm -rf`, this is a destructive operation. Use with caution."
)]
struct Args {
    // Removal options
    /// Exit on first error
    #[arg(short = 'e', long = "fail-early", help_heading = "Removal options")]
    fail_early: bool,

    /// Listing passes without any progress after which a directory is given up on
    ///
    /// A directory is listed and its children removed repeatedly until it is empty. A pass in
    /// which nothing at all could be removed counts as stalled; any progress resets the count.
    #[arg(
        long,
        default_value = "3",
        value_name = "N",
        help_heading = "Removal options"
    )]
    max_stalled_passes: usize,

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
    /// Location(s) to remove: a local path, sftp://[user@]host[:port]/path or
    /// ftp://[user@]host[:port]/path
    #[arg(required = true, value_parser = remote::parse_location)]
    locations: Vec<remote::Location>,
}

#[instrument]
async fn async_main(args: Args) -> Result<common::rm::Summary> {
    let settings = common::rm::Settings {
        max_stalled_passes: args.max_stalled_passes,
        fail_early: args.fail_early,
    };
    let mut success = true;
    let mut rm_summary = common::rm::Summary::default();
    // one connection per location, each owned by a single removal at a time
    for location in &args.locations {
        let backend = match remote::connect(location, &args.connection).await {
            Ok(backend) => backend,
            Err(error) => {
                tracing::error!("{}: {:#}", location, &error);
                if args.fail_early {
                    return Err(error.context(format!("cannot connect for {location}")));
                }
                success = false;
                continue;
            }
        };
        match common::remove_all(&backend, location.path(), &settings).await {
            Ok(summary) => rm_summary = rm_summary + summary,
            Err(error) => {
                tracing::error!("{}: {}", location, &error);
                rm_summary = rm_summary + error.summary;
                if args.fail_early {
                    if args.summary {
                        return Err(anyhow!("{}: {}\n\n{}", location, error, &rm_summary));
                    }
                    return Err(anyhow!("{}: {}", location, error));
                }
                success = false;
            }
        }
    }
    if !success {
        if args.summary {
            return Err(anyhow!("rrm encountered errors\n\n{}", &rm_summary));
        }
        return Err(anyhow!("rrm encountered errors"));
    }
    Ok(rm_summary)
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
