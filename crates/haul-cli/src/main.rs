use clap::{Parser, Subcommand, ValueEnum};
use haul_model::{
    DataSource, JsonDataSource, Report, RunConfig, RunError, SimplexAdapter, formulate, run_scenario,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "haul")]
#[command(about = "Least-cost transportation planning with sensitivity analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve one or more scenario files and report the plan and its sensitivity
    Solve {
        /// Scenario data files, solved in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output format
        #[arg(short, long, value_enum, default_value = "pretty")]
        format: Format,
        /// TOML run configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the solver iteration limit
        #[arg(long)]
        max_iterations: Option<usize>,
        /// Override the solver numerical tolerance
        #[arg(long)]
        tolerance: Option<f64>,
        /// Wall-clock limit per solve, in seconds
        #[arg(long)]
        time_limit: Option<f64>,
    },
    /// Check a scenario file for errors without solving it
    Check {
        /// The file to check
        file: PathBuf,
    },
    /// Print the linear program built from a scenario file
    Formulate {
        /// The file to formulate
        file: PathBuf,
        /// Output format
        #[arg(short, long, value_enum, default_value = "pretty")]
        format: Format,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            files,
            format,
            config,
            max_iterations,
            tolerance,
            time_limit,
        } => {
            let mut config = match config {
                Some(path) => match RunConfig::load(&path) {
                    Ok(c) => c,
                    Err(e) => {
                        eprintln!("Config error: {}", e);
                        std::process::exit(1);
                    }
                },
                None => RunConfig::default(),
            };
            if let Some(n) = max_iterations {
                config.solver.max_iterations = n;
            }
            if let Some(t) = tolerance {
                config.solver.tolerance = t;
            }
            if let Some(secs) = time_limit {
                config.solver.time_limit_secs = Some(secs);
            }

            let solver = match SimplexAdapter::from_config(&config.solver) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Config error: {}", e);
                    std::process::exit(1);
                }
            };

            let data_source = JsonDataSource::new();
            let mut failed = false;
            let mut reports = Vec::new();

            for (i, file) in files.iter().enumerate() {
                let scenario = file.to_string_lossy();
                let run = match run_scenario(&data_source, &scenario, &solver) {
                    Ok(run) => run,
                    Err(e) => {
                        report_error(file, &e);
                        failed = true;
                        continue;
                    }
                };
                failed |= !run.is_optimal();

                let report = Report::from_run(&run);
                match format {
                    Format::Pretty => {
                        if i > 0 {
                            println!();
                        }
                        print!("{}", report);
                    }
                    Format::Json => reports.push(report),
                }
            }

            if let Format::Json = format {
                match serde_json::to_string_pretty(&reports) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error serializing report: {}", e);
                        std::process::exit(1);
                    }
                }
            }

            if failed {
                std::process::exit(1);
            }
        }
        Commands::Check { file } => {
            let data = match JsonDataSource::new().load(&file.to_string_lossy()) {
                Ok(d) => d,
                Err(e) => {
                    eprintln!("✗ {} has errors:", file.display());
                    eprintln!("  {}", e);
                    std::process::exit(1);
                }
            };

            match formulate(data) {
                Ok(instance) => {
                    println!("✓ {} is valid", file.display());
                    println!("  {} sources", instance.sources().len());
                    println!("  {} customers", instance.customers().len());
                    println!("  {} arcs", instance.arcs().len());
                    println!("  {} constraints", instance.constraint_ids().len());
                }
                Err(e) => {
                    eprintln!("✗ {} has errors:", file.display());
                    eprintln!("  {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Formulate { file, format } => {
            let instance = match JsonDataSource::new()
                .load(&file.to_string_lossy())
                .map_err(RunError::from)
                .and_then(|data| formulate(data).map_err(RunError::from))
            {
                Ok(i) => i,
                Err(e) => {
                    report_error(&file, &e);
                    std::process::exit(1);
                }
            };

            match format {
                Format::Pretty => print!("{}", instance),
                Format::Json => match serde_json::to_string_pretty(instance.lp()) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error serializing model: {}", e);
                        std::process::exit(1);
                    }
                },
            }
        }
    }
}

fn report_error(file: &Path, error: &RunError) {
    eprintln!("Error in {}: {}", file.display(), error);
}
