use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use asciivid::{AppConfig, AsciiConverter, OutputFormat, Progress, ProgressPhase};
use clap::Parser;
use dialoguer::{Confirm, FuzzySelect};
use indicatif::{ProgressBar, ProgressStyle};
use walkdir::WalkDir;

mod cli;

use cli::Args;

const MEDIA_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "avi", "webm", "gif", "png", "jpg", "jpeg", "bmp"];

fn main() -> Result<()> {
    let mut args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .init();

    let interactive = std::io::stdin().is_terminal();
    let cfg = AppConfig::load(args.config.as_deref()).context("loading config")?;

    // --- Input selection ---
    if args.input.is_none() {
        if !interactive {
            bail!("Input file must be provided when not running in a terminal.");
        }
        let files = find_media_files(Path::new("."));
        if files.is_empty() {
            bail!("No media files found in current directory.");
        }
        let selection = FuzzySelect::with_theme(&dialoguer::theme::ColorfulTheme::default())
            .with_prompt("Choose an input file")
            .default(0)
            .items(&files)
            .interact()?;
        args.input = Some(PathBuf::from(&files[selection]));
    }
    let input = args.input.clone().ok_or_else(|| anyhow!("no input selected"))?;

    let format = OutputFormat::from(args.format);
    let output = args.output.clone().unwrap_or_else(|| format.default_output(&input));

    let options = args.convert_options(&cfg)?;
    let style = args.style(&cfg)?;
    let converter = AsciiConverter::with_config(cfg)?;

    // --- Existing output ---
    if output_exists(&output, format) {
        if !args.yes {
            if !interactive {
                bail!("{} already exists; pass --yes to overwrite", output.display());
            }
            let overwrite = Confirm::new()
                .with_prompt(format!("{} already exists. Overwrite?", output.display()))
                .default(false)
                .interact()?;
            if !overwrite {
                println!("Operation cancelled.");
                return Ok(());
            }
        }
        if format.is_directory() {
            remove_frames(&output)?;
        }
    }

    // --- Execution ---
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    let report = |progress: Progress| match progress.phase {
        ProgressPhase::Probing | ProgressPhase::EstimatingRange => pb.set_message(progress.message),
        ProgressPhase::ConvertingFrames | ProgressPhase::Writing => {
            if pb.length() != Some(progress.total as u64) {
                pb.set_length(progress.total as u64);
                pb.set_message(match progress.phase {
                    ProgressPhase::Writing => "Writing",
                    _ => "Converting frames",
                });
            }
            pb.set_position(progress.completed as u64);
        }
        ProgressPhase::Complete => pb.finish_with_message("Done"),
    };

    let summary = converter
        .convert_file(&input, &output, format, &args.span(), &options, &style, report)
        .with_context(|| format!("converting {}", input.display()));
    if summary.is_err() {
        pb.abandon();
    }
    let summary = summary?;

    println!(
        "\nGenerated {} frames ({}x{} @ {:.3} fps) in {}",
        summary.frames,
        summary.size.width,
        summary.size.height,
        summary.fps,
        output.display()
    );

    // --- Create details.md ---
    if format.is_directory() {
        let details = cli::details(
            summary.frames,
            summary.fps,
            summary.size.width,
            summary.size.height,
            summary.range,
            &options.ramp,
        );
        fs::write(output.join("details.md"), details).context("writing details file")?;
    }

    Ok(())
}

fn find_media_files(dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path().is_file()
                && e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| MEDIA_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .map(|e| e.path().display().to_string())
        .collect();
    files.sort();
    files
}

fn is_frame_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .is_some_and(|name| name.starts_with("frame_") && (name.ends_with(".png") || name.ends_with(".txt")))
}

fn output_exists(output: &Path, format: OutputFormat) -> bool {
    if !format.is_directory() {
        return output.exists();
    }
    WalkDir::new(output)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .any(|e| is_frame_file(e.path()))
}

/// Clears frames of an earlier run so no stale frame outlives a shorter one.
fn remove_frames(dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if is_frame_file(&path) {
            fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        }
    }
    Ok(())
}
