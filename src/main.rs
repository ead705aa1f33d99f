//! Scorecard Reader command line.
//!
//! `process` reads result screenshots and identifies their songs; `calc`
//! computes a play rating by hand.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use scorecard_reader::analysis::csv_writer::{append_to_csv, init_csv};
use scorecard_reader::analysis::{
    export_to_json, play_rating, BatchReport, Grade, ReportItem, ScoreBoard, ScoreEntry,
    UpdateResult,
};
use scorecard_reader::{load_config, logging, JsonCatalog, ScorecardReader, ScorecardReport};

#[derive(Parser, Debug)]
#[command(name = "scorecard-reader")]
#[command(version, about = "Reads rhythm game result screenshots", long_about = None)]
struct Cli {
    /// Config file (defaults to config.json next to the executable)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Recognize scorecards and match them against the song catalog
    Process {
        /// Screenshot files
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Song list JSON
        #[arg(long)]
        catalog: PathBuf,

        /// Directory of reference covers named `<song id>.png`
        #[arg(long)]
        covers: PathBuf,

        /// Append results to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Record matched plays in this personal best board
        #[arg(long)]
        board: Option<PathBuf>,

        /// Write a JSON report of the batch
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Calculate the play rating of a score
    Calc {
        /// The score to rate
        #[arg(long)]
        score: u32,

        /// Chart constant
        #[arg(long)]
        cc: f64,
    },
}

fn main() -> Result<()> {
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();
        error!("[PANIC]{} {}", location, msg);
        eprintln!("[PANIC]{} {}", location, msg);
    }));

    let cli = Cli::parse();

    match cli.command {
        Commands::Calc { score, cc } => {
            println!(
                "Play rating: {:.4} ({})",
                play_rating(score, cc),
                Grade::from_score(score)
            );
            Ok(())
        }
        Commands::Process {
            images,
            catalog,
            covers,
            csv,
            board,
            report,
        } => {
            logging::init_logging()?;
            let options = OutputOptions {
                csv: csv.as_deref(),
                board: board.as_deref(),
                report: report.as_deref(),
            };
            run_process(cli.config.as_deref(), &images, catalog, covers, &options)
        }
    }
}

struct OutputOptions<'a> {
    csv: Option<&'a Path>,
    board: Option<&'a Path>,
    report: Option<&'a Path>,
}

fn run_process(
    config_path: Option<&Path>,
    images: &[PathBuf],
    catalog_path: PathBuf,
    covers: PathBuf,
    outputs: &OutputOptions<'_>,
) -> Result<()> {
    let config = load_config(config_path);
    let reader = ScorecardReader::new(config)?;
    let catalog = JsonCatalog::new(catalog_path, covers);

    let mut sources = Vec::with_capacity(images.len());
    let mut inputs = Vec::with_capacity(images.len());
    for path in images {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        sources.push(path.display().to_string());
        inputs.push(bytes);
    }

    info!("Processing {} scorecards", inputs.len());
    let results = reader.process_batch(&inputs, &catalog);

    if let Some(csv) = outputs.csv {
        init_csv(csv)?;
    }
    let mut board = outputs.board.map(ScoreBoard::load).transpose()?;

    let mut items = Vec::with_capacity(results.len());
    for (source, outcome) in sources.into_iter().zip(results) {
        match &outcome {
            Ok(report) => {
                print_report(&source, report);
                if let Some(csv) = outputs.csv {
                    append_to_csv(csv, &source, report)?;
                }
                if let Some(board) = board.as_mut() {
                    record_best(board, report);
                }
            }
            Err(e) => {
                warn!("{}: {}", source, e);
                println!("{}: {}", source, e);
            }
        }
        items.push(ReportItem::new(source, outcome));
    }

    if let (Some(board), Some(path)) = (&board, outputs.board) {
        board.save(path)?;
        info!("Score board saved: {}", path.display());
    }

    let report = BatchReport::new(items);
    if let Some(path) = outputs.report {
        export_to_json(&report, path)?;
        info!("Report saved: {}", path.display());
    }

    if report.failed == report.processed {
        bail!("No scorecard could be read");
    }
    Ok(())
}

fn print_report(source: &str, report: &ScorecardReport) {
    let result = &report.result;
    println!(
        "{}: {} {} combo {} ({} layout)",
        source,
        result.difficulty(),
        result.score(),
        result.combo(),
        result.format()
    );

    match (&report.song, &report.analysis) {
        (Some(song), Some(analysis)) => println!(
            "  {} [{}] diff {}: rating {:.4}, {} {}",
            song.entry.display.name,
            song.entry.song_id,
            song.diff,
            analysis.rating,
            analysis.grade,
            analysis.clear_type
        ),
        _ => match &report.catalog_error {
            Some(e) => println!("  song lookup failed: {}", e),
            None => println!("  song not found"),
        },
    }
}

fn record_best(board: &mut ScoreBoard, report: &ScorecardReport) {
    let (Some(song), Some(analysis)) = (&report.song, &report.analysis) else {
        return;
    };

    let entry = ScoreEntry::new(&song.entry, &report.result, analysis);
    match board.add_score(entry) {
        UpdateResult::NewScore { new_idx } => {
            println!("  new score, #{} on the board", new_idx + 1)
        }
        UpdateResult::ReplaceScore {
            old_idx,
            new_idx,
            old_score,
            ..
        } => println!(
            "  improved from {} (#{} -> #{})",
            old_score,
            old_idx + 1,
            new_idx + 1
        ),
        UpdateResult::NoChange { old_score, .. } => {
            println!("  best is still {}", old_score)
        }
    }
}
