use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};

use ccd_calib_rs::image_pipeline::{
    CcdImage, CombineMethod, CombineOptions, FitsReader, FitsioReader, FrameType, Histogram,
    ImageCollection, ImageStatistics, MasterFramePipeline, Notation, OverscanModel,
    OverscanOptions, OverscanStatistic, OverscanTrimPipeline, PreviewConfig, ReductionConfig,
    Region, Section, SigmaClip, StandardTiffPreviewWriter, TiffCompression, TiffPreviewWriter,
};
use ccd_calib_rs::logger;

use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "ccd_calib", version, about = "Overscan subtraction, trimming and stacking of CCD calibration frames")]
struct Cli {
    /// More log output (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the FITS images in a directory with their key header values
    Summary {
        dir: PathBuf,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Subtract the overscan and trim every selected image in a directory
    Reduce(ReduceArgs),
    /// Combine the selected frames of a directory into a master frame
    Combine(CombineArgs),
    /// Print header, statistics and a histogram of one image
    Inspect(InspectArgs),
}

#[derive(Args)]
struct OverscanArgs {
    /// Overscan section (default: the BIASSEC keyword)
    #[arg(long)]
    overscan: Option<String>,

    /// Region to keep (default: TRIMSEC/DATASEC, else everything but the overscan)
    #[arg(long)]
    trim: Option<String>,

    /// Subtract the overscan level without cropping
    #[arg(long)]
    no_trim: bool,

    /// Read sections as 0-based `[rows, cols]` slices instead of FITS notation
    #[arg(long)]
    python_slices: bool,

    #[arg(long, default_value = "median")]
    statistic: OverscanStatistic,

    /// scalar, per-row, per-column or auto
    #[arg(long, default_value = "scalar")]
    model: OverscanModel,
}

impl OverscanArgs {
    fn notation(&self) -> Notation {
        if self.python_slices {
            Notation::Python
        } else {
            Notation::Fits
        }
    }

    fn section(&self, text: Option<&str>) -> Result<Option<Section>> {
        text.map(|t| Section::parse(t, self.notation()))
            .transpose()
            .context("invalid section argument")
    }

    fn config(&self, overwrite: bool, continue_on_error: bool) -> Result<ReductionConfig> {
        Ok(ReductionConfig::builder()
            .overscan(self.section(self.overscan.as_deref())?)
            .trim(self.section(self.trim.as_deref())?)
            .trim_enabled(!self.no_trim)
            .overscan_options(OverscanOptions {
                statistic: self.statistic,
                model: self.model,
            })
            .overwrite(overwrite)
            .continue_on_error(continue_on_error)
            .build())
    }
}

#[derive(Args)]
struct ReduceArgs {
    dir: PathBuf,

    /// Output directory; created if missing
    #[arg(short, long)]
    output: PathBuf,

    /// Only reduce images of this type (bias, dark, flat, light)
    #[arg(long)]
    frame_type: Option<FrameType>,

    #[command(flatten)]
    overscan: OverscanArgs,

    #[arg(long)]
    overwrite: bool,

    #[arg(long)]
    continue_on_error: bool,
}

#[derive(Args)]
struct CombineArgs {
    dir: PathBuf,

    /// Master frame file to write
    #[arg(short, long)]
    output: PathBuf,

    #[arg(long, default_value = "bias")]
    frame_type: FrameType,

    #[arg(long, default_value = "median")]
    method: CombineMethod,

    /// Reject values beyond SIGMA (or LOW,HIGH) standard deviations
    #[arg(long)]
    sigma_clip: Option<SigmaClip>,

    /// Subtract the overscan and trim each frame before combining
    #[arg(long)]
    reduce_first: bool,

    #[command(flatten)]
    reduction: ReduceFirstArgs,

    #[arg(long)]
    overwrite: bool,
}

/// The overscan options of `combine`; each one is only accepted with `--reduce-first`.
#[derive(Args)]
struct ReduceFirstArgs {
    /// Overscan section (default: the BIASSEC keyword)
    #[arg(long, requires = "reduce_first")]
    overscan: Option<String>,

    /// Region to keep (default: TRIMSEC/DATASEC, else everything but the overscan)
    #[arg(long, requires = "reduce_first")]
    trim: Option<String>,

    /// Subtract the overscan level without cropping
    #[arg(long, requires = "reduce_first")]
    no_trim: bool,

    /// Read sections as 0-based `[rows, cols]` slices instead of FITS notation
    #[arg(long, requires = "reduce_first")]
    python_slices: bool,

    /// mean or median [default: median]
    #[arg(long, requires = "reduce_first")]
    statistic: Option<OverscanStatistic>,

    /// scalar, per-row, per-column or auto [default: scalar]
    #[arg(long, requires = "reduce_first")]
    model: Option<OverscanModel>,
}

impl ReduceFirstArgs {
    fn overscan_args(&self) -> OverscanArgs {
        OverscanArgs {
            overscan: self.overscan.clone(),
            trim: self.trim.clone(),
            no_trim: self.no_trim,
            python_slices: self.python_slices,
            statistic: self.statistic.unwrap_or_default(),
            model: self.model.unwrap_or_default(),
        }
    }
}

#[derive(Args)]
struct InspectArgs {
    file: PathBuf,

    /// Restrict statistics to this section
    #[arg(long)]
    section: Option<String>,

    #[arg(long)]
    python_slices: bool,

    #[arg(long, default_value_t = 20)]
    bins: usize,

    /// Write a stretched 16-bit TIFF preview of the inspected region
    #[arg(long)]
    preview: Option<PathBuf>,

    /// none, lzw, deflate-fast, deflate or deflate-best
    #[arg(long, default_value = "deflate")]
    compression: TiffCompression,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init_with_default(logger::level_for_verbosity(cli.verbose));

    match cli.command {
        Command::Summary { dir, json } => summary(&dir, json),
        Command::Reduce(args) => reduce(&args),
        Command::Combine(args) => combine(&args),
        Command::Inspect(args) => inspect(&args),
    }
}

fn scan(dir: &Path) -> Result<ImageCollection> {
    ImageCollection::scan(dir, &FitsioReader)
        .with_context(|| format!("failed to scan {}", dir.display()))
}

fn summary(dir: &Path, json: bool) -> Result<()> {
    let collection = scan(dir)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&collection.summary())?);
    } else {
        print!("{}", collection.render_summary_table());
    }
    for (path, reason) in collection.skipped() {
        warn!("Not a readable FITS image: {} ({})", path.display(), reason);
    }
    Ok(())
}

fn reduce(args: &ReduceArgs) -> Result<()> {
    let collection = scan(&args.dir)?;
    let config = args.overscan.config(args.overwrite, args.continue_on_error)?;
    let pipeline = OverscanTrimPipeline::new(config);

    let report = pipeline
        .reduce_collection(&collection, args.frame_type.as_ref(), &args.output)
        .context("reduction failed")?;

    info!(
        "Reduced {} image(s) into {}",
        report.succeeded(),
        args.output.display()
    );
    if !report.is_clean() {
        for (path, reason) in &report.failures {
            warn!("{}: {}", path.display(), reason);
        }
        bail!("{} image(s) could not be reduced", report.failed());
    }
    Ok(())
}

fn combine(args: &CombineArgs) -> Result<()> {
    let collection = scan(&args.dir)?;
    let options = CombineOptions {
        method: args.method,
        sigma_clip: args.sigma_clip,
    };

    let mut pipeline = MasterFramePipeline::new(options).overwrite(args.overwrite);
    if args.reduce_first {
        pipeline = pipeline.with_reduction(args.reduction.overscan_args().config(args.overwrite, false)?);
    }

    let master = pipeline
        .build_master(&collection, Some(&args.frame_type), &args.output)
        .with_context(|| format!("failed to build master {}", args.frame_type))?;

    let (rows, cols) = master.shape();
    info!("Master {} written to {} ({}x{})", args.frame_type, args.output.display(), rows, cols);
    Ok(())
}

fn inspect(args: &InspectArgs) -> Result<()> {
    let image = FitsioReader
        .read_image(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let region = match &args.section {
        Some(text) => {
            let notation = if args.python_slices { Notation::Python } else { Notation::Fits };
            Section::parse(text, notation)?.resolve(image.shape())?
        }
        None => Region::full(image.shape()),
    };
    let view = region.view(&image.data);

    println!("{} ({}x{})", image.display_name(), image.shape().0, image.shape().1);
    for card in image.header.cards() {
        println!("  {:<8} = {}", card.key, card.value);
    }

    println!("\nregion {}", region.to_fits_section());
    match ImageStatistics::compute(view) {
        Some(stats) => println!(
            "  count={} min={:.3} max={:.3} mean={:.3} median={:.3} std={:.3}",
            stats.count, stats.min, stats.max, stats.mean, stats.median, stats.std_dev
        ),
        None => println!("  no finite pixels"),
    }
    if let Some(histogram) = Histogram::compute(view, args.bins, None) {
        print!("{}", histogram.render(50));
    }

    if let Some(path) = &args.preview {
        let cropped = CcdImage::new(view.to_owned(), image.header.clone());
        let config = PreviewConfig::builder().compression(args.compression).build();
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        StandardTiffPreviewWriter.write_preview(&cropped, &mut file, &config)?;
        info!("Preview written to {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_combine_rejects_overscan_options_without_reduce_first() {
        for extra in [
            &["--overscan", "[5:6,1:4]"][..],
            &["--trim", "[1:4,1:4]"][..],
            &["--no-trim"][..],
            &["--model", "per-row"][..],
            &["--statistic", "mean"][..],
        ] {
            let mut argv = vec!["ccd_calib", "combine", "night", "-o", "master.fits"];
            argv.extend_from_slice(extra);
            assert!(Cli::try_parse_from(argv).is_err(), "accepted {extra:?}");
        }
    }

    #[test]
    fn test_combine_with_reduce_first_builds_reduction_config() {
        let cli = Cli::try_parse_from([
            "ccd_calib", "combine", "night", "-o", "master.fits",
            "--reduce-first", "--overscan", "[:, 4:]", "--python-slices", "--model", "per-row",
        ])
        .unwrap();

        let Command::Combine(args) = cli.command else {
            panic!("expected the combine subcommand");
        };
        assert!(args.reduce_first);
        let config = args.reduction.overscan_args().config(false, false).unwrap();
        let section = config.overscan.unwrap();
        assert_eq!(section.notation(), Notation::Python);
        assert_eq!(config.overscan_options.model, OverscanModel::PerRow);
        assert_eq!(config.overscan_options.statistic, OverscanStatistic::Median);
        assert!(config.trim_enabled);
    }

    #[test]
    fn test_reduce_accepts_overscan_options() {
        let cli = Cli::try_parse_from([
            "ccd_calib", "reduce", "night", "-o", "reduced", "--overscan", "[5:6,1:4]", "--no-trim",
        ])
        .unwrap();

        let Command::Reduce(args) = cli.command else {
            panic!("expected the reduce subcommand");
        };
        let config = args.overscan.config(false, false).unwrap();
        assert!(config.overscan.is_some());
        assert!(!config.trim_enabled);
    }
}
