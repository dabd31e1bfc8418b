use std::process::ExitCode;
use clap::Parser;
use track_tagger::{
    cli::commands::{Cli, Commands, CommonArgs, OracleArgs},
    pipeline::RunReport,
    utils::{parallel::ParallelProcessor, reporting::Reporter},
    OpenAiOracle, Result, TaggerConfig, Tagger,
};

struct Runtime;

impl ParallelProcessor for Runtime {}

fn load_config(common: &CommonArgs, oracle: Option<&OracleArgs>) -> Result<TaggerConfig> {
    let mut config = TaggerConfig::load(common.config.as_deref())?;
    if common.dry_run {
        config.dry_run = true;
    }
    if let Some(threads) = common.threads {
        config.threads = threads;
    }
    if let Some(oracle) = oracle {
        if let Some(batch_size) = oracle.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(model) = &oracle.model {
            config.oracle.model = model.clone();
        }
        if let Some(parallel) = oracle.parallel_batches {
            config.oracle.parallel_batches = parallel;
        }
    }
    config.validate()?;
    Ok(config)
}

fn finish_tagging(report: &RunReport, common: &CommonArgs) -> ExitCode {
    let reporter = Reporter::new();
    reporter.print_summary(report);

    if let Some(path) = &common.report {
        match reporter.write_csv(report, path) {
            Ok(_) => println!("Report saved to: {}", path.display()),
            Err(e) => eprintln!("Error generating report: {}", e),
        }
    }

    if report.tracks_found == 0 {
        println!("No tracks found. Exiting.");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn oracle_pass(tagger: &Tagger, common: &CommonArgs) -> Result<ExitCode> {
    let config = tagger.config();
    let oracle = OpenAiOracle::new(&config.oracle, config.api_key()?)?;

    println!("\nAnalyzing tracks in {} using {}...", config.output_dir.display(), config.oracle.model);
    let report = tagger.tag_with_oracle(oracle)?;
    Ok(finish_tagging(&report, common))
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Convert { common, input, output } => {
            let mut config = load_config(&common, None)?;
            if let Some(input) = input {
                config.downloads_dir = input;
            }
            if let Some(output) = output {
                config.output_dir = output;
            }
            Runtime::init_parallel_processing(config.worker_threads());

            println!("=== Converting downloads to WAV ===");
            println!("Input directory: {}", config.downloads_dir.display());
            println!("Output directory: {}", config.output_dir.display());

            let report = Tagger::new(config).convert()?;
            Reporter::new().print_conversion_summary(&report);
            if report.found == 0 {
                println!("No files found. Exiting.");
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Tag { common, oracle, dir } => {
            let mut config = load_config(&common, Some(&oracle))?;
            if let Some(dir) = dir {
                config.output_dir = dir;
            }
            println!("=== Tagging tracks with key and BPM ===");
            oracle_pass(&Tagger::new(config), &common)
        }

        Commands::Keys { common, dir } => {
            let mut config = load_config(&common, None)?;
            if let Some(dir) = dir {
                config.output_dir = dir;
            }
            Runtime::init_parallel_processing(config.worker_threads());

            println!("=== Estimating keys locally ===");
            let report = Tagger::new(config).tag_with_local_keys()?;
            Ok(finish_tagging(&report, &common))
        }

        Commands::Run { common, oracle } => {
            let config = load_config(&common, Some(&oracle))?;
            Runtime::init_parallel_processing(config.worker_threads());
            let tagger = Tagger::new(config);

            println!("=== Converting downloads to WAV ===");
            let conversion = tagger.convert()?;
            Reporter::new().print_conversion_summary(&conversion);
            if conversion.found == 0 {
                println!("No files found. Exiting.");
                return Ok(ExitCode::FAILURE);
            }

            if tagger.config().dry_run {
                println!("\nSkipping oracle analysis (dry-run mode).");
                return Ok(ExitCode::SUCCESS);
            }
            oracle_pass(&tagger, &common)
        }
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
