use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{error, info, LevelFilter};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tsmerge_core::{
    read_extraction, CatalogFile, CatalogStatistics, ChangeReport, ExtractedMessage, MergeConfig,
    MergeResolver,
};

#[derive(Parser)]
#[command(name = "tsmerge", version, about = "Merge extracted messages into Qt .ts catalogs")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Merge one extraction pass into each catalog
    Merge(MergeArgs),
    /// Print translation statistics per catalog
    Stats {
        #[arg(required = true)]
        catalogs: Vec<PathBuf>,
    },
}

#[derive(Args)]
struct MergeArgs {
    /// Extractor output (.json array or .jsonl)
    #[arg(long)]
    extracted: PathBuf,

    /// Catalogs to update; missing files are created
    #[arg(long = "catalog", required = true)]
    catalogs: Vec<PathBuf>,

    /// Language for newly created catalogs (default: file-name suffix)
    #[arg(long)]
    language: Option<String>,

    /// Merge configuration (YAML, or JSON by extension)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the change reports to this JSON file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Fail on languages without a plural rule
    #[arg(long)]
    strict: bool,

    /// Merge and report without writing catalogs
    #[arg(long)]
    dry_run: bool,

    /// Do not keep a backup of replaced catalogs
    #[arg(long)]
    no_backup: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Merge(args) => run_merge(&args),
        Command::Stats { catalogs } => run_stats(&catalogs),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn load_config(args: &MergeArgs) -> Result<MergeConfig> {
    let mut config = match &args.config {
        Some(path) => MergeConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => MergeConfig::default(),
    };
    if args.strict {
        config.language.strict = true;
    }
    if args.no_backup {
        config.output.backup = false;
    }
    Ok(config)
}

fn run_merge(args: &MergeArgs) -> Result<()> {
    let config = load_config(args)?;
    let extracted = read_extraction(&args.extracted)?;
    info!("{} extracted messages from {}", extracted.len(), args.extracted.display());

    let files = args
        .catalogs
        .iter()
        .map(|path| CatalogFile::load_or_create(path, args.language.as_deref()))
        .collect::<Result<Vec<_>, _>>()?;

    let plural = config.plural_table();
    let policy = config.similarity_policy();
    let resolver = MergeResolver::new(&plural, policy.as_ref()).with_options(config.merge_options());

    let results: Vec<Result<ChangeReport>> = files
        .par_iter()
        .map(|file| merge_file(&resolver, &config, &extracted, file, args.dry_run))
        .collect();

    let mut reports = Vec::new();
    let mut failures = 0usize;
    for (file, result) in files.iter().zip(results) {
        match result {
            Ok(report) => reports.push(report),
            Err(err) => {
                failures += 1;
                error!("{}: {err:#}", file.path.display());
            }
        }
    }

    if let Some(path) = &args.report {
        write_reports(path, &reports)?;
    }
    if failures > 0 {
        bail!("{failures} of {} catalogs failed to merge", files.len());
    }
    Ok(())
}

fn merge_file(
    resolver: &MergeResolver<'_>,
    config: &MergeConfig,
    extracted: &[ExtractedMessage],
    file: &CatalogFile,
    dry_run: bool,
) -> Result<ChangeReport> {
    let outcome = resolver.merge(extracted, &file.catalog)?;
    info!("{}: {}", file.path.display(), outcome.report.summary());

    if dry_run {
        return Ok(outcome.report);
    }
    let saved = file.save(&outcome.catalog, config.output.preserve_encoding, config.output.backup)?;
    if let Some(backup) = saved.backup_path {
        info!("backup written to {}", backup.display());
    }
    Ok(outcome.report)
}

fn write_reports(path: &Path, reports: &[ChangeReport]) -> Result<()> {
    let json = serde_json::to_string_pretty(reports)?;
    std::fs::write(path, json).with_context(|| format!("writing report {}", path.display()))?;
    Ok(())
}

fn run_stats(paths: &[PathBuf]) -> Result<()> {
    for path in paths {
        let file = CatalogFile::load(path)?;
        let stats = CatalogStatistics::collect(&file.catalog);
        println!(
            "{} [{}]: {} translated, {} unfinished, {} obsolete, {} vanished ({:.1}% complete)",
            path.display(),
            stats.language,
            stats.translated,
            stats.unfinished,
            stats.obsolete,
            stats.vanished,
            stats.completion_ratio() * 100.0
        );
    }
    Ok(())
}
