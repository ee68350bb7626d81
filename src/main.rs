use clap::Parser;
use fs_parity::{catalog, run_suite, HarnessConfig, HarnessError, BANNER};
use log::error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "fs-parity", about = "Check a mounted filesystem against the host filesystem")]
struct Cli {
    /// Root of the mounted candidate filesystem [env: FS_PARITY_CANDIDATE]
    candidate: Option<PathBuf>,

    /// Where per-scenario reference roots are created [env: FS_PARITY_REFERENCE_PARENT]
    #[arg(long, value_name = "DIR")]
    reference_parent: Option<PathBuf>,

    /// Run only this scenario; repeatable
    #[arg(long = "scenario", value_name = "NAME")]
    scenarios: Vec<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// List the catalog and exit
    #[arg(long)]
    list: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if cli.list {
        for scenario in catalog() {
            println!("{:<34} {}", scenario.name, scenario.description);
        }
        return ExitCode::SUCCESS;
    }

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("{e}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<bool, HarnessError> {
    let mut config = HarnessConfig::from_env();
    if let Some(candidate) = cli.candidate {
        config.candidate_root = candidate;
    }
    if let Some(parent) = cli.reference_parent {
        config.reference_parent = parent;
    }
    config.only = cli.scenarios;

    let report = run_suite(config)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{BANNER}");
        println!("{report}");
    }
    Ok(report.all_passed())
}
