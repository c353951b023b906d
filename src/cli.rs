// ============================================================================
// image-resizer CLI: headless resize, crop and packaging
// ============================================================================
//
// Usage examples:
//   image-resizer resize -i photo.jpg -o small.png --width 800
//   image-resizer crop -i photo.jpg -o face.png --x 120 --y 40 --width 300 --height 300
//   image-resizer package -i logo.png -o out/ --icons
//   image-resizer --config resizer.toml package -i photo.jpg -o out/ --sizes 640x480,320x240
//
// Every command drives the same editor session a UI would, then waits for
// the render to finish before writing.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};

use crate::config::EditorConfig;
use crate::engine::{write_atomic, ImageFile};
use crate::error::{ResizerError, Result};
use crate::export::{ExportSelection, ExportSize, SizeCategory};
use crate::notifications::Severity;
use crate::ops::{CropRegion, Dimensions, ResampleFilter};
use crate::session::Editor;

/// How long a single command may wait for its renders.
const RENDER_TIMEOUT: Duration = Duration::from_secs(600);

/// Headless image resizer.
#[derive(Parser, Debug)]
#[command(
    name = "image-resizer",
    version,
    about = "Resize, crop and package images from the command line",
    long_about = "Resize, crop and package images without a UI.\n\
                  Downscaling halves the image step by step for quality; output is PNG.\n\n\
                  Example:\n  \
                  image-resizer resize -i photo.jpg -o small.png --width 800"
)]
pub struct CliArgs {
    /// TOML file with editor settings (limits, history, png, filter).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// More logging; repeat for trace output. RUST_LOG overrides this.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resize to a width and/or height. A missing side follows the aspect ratio.
    Resize(ResizeArgs),
    /// Cut a region out of the image (source pixels).
    Crop(CropArgs),
    /// Zip a set of sizes: common sizes, icon sizes and/or explicit WxH.
    Package(PackageArgs),
}

#[derive(Args, Debug)]
pub struct ResizeArgs {
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Output PNG file.
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    #[arg(long, value_name = "PX")]
    pub width: Option<String>,

    #[arg(long, value_name = "PX")]
    pub height: Option<String>,

    /// bilinear, catmull-rom or lanczos3. Defaults to the config value.
    #[arg(long, value_name = "FILTER")]
    pub filter: Option<ResampleFilter>,
}

#[derive(Args, Debug)]
pub struct CropArgs {
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    #[arg(long)]
    pub x: u32,

    #[arg(long)]
    pub y: u32,

    #[arg(long)]
    pub width: u32,

    #[arg(long)]
    pub height: u32,
}

#[derive(Args, Debug)]
pub struct PackageArgs {
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Directory the archive is written to (created if missing).
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// Include the built-in common sizes.
    #[arg(long)]
    pub common: bool,

    /// Include iOS, Android and web icon sizes.
    #[arg(long)]
    pub icons: bool,

    /// Extra sizes, e.g. 640x480,320x240. They go with the common sizes.
    #[arg(long, value_delimiter = ',', value_name = "WxH")]
    pub sizes: Vec<Dimensions>,

    #[arg(long, value_name = "FILTER")]
    pub filter: Option<ResampleFilter>,
}

impl PackageArgs {
    fn export_sizes(&self) -> Vec<ExportSize> {
        let mut selection = ExportSelection::empty();
        selection.set(ExportSelection::COMMON, self.common);
        selection.set(ExportSelection::ICONS, self.icons);

        let mut sizes = selection.sizes();
        sizes.extend(
            self.sizes
                .iter()
                .map(|d| ExportSize::new(SizeCategory::Common, d.width(), d.height())),
        );
        sizes
    }
}

/// tracing filter directive for a `-v` count.
pub fn log_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "image_resizer=warn",
        1 => "image_resizer=info",
        2 => "image_resizer=debug",
        _ => "image_resizer=trace",
    }
}

/// Run the parsed command and return an OS exit code.
pub fn run(args: CliArgs) -> ExitCode {
    let started = Instant::now();
    match execute(&args) {
        Ok(written) => {
            info!(
                target: "image_resizer::cli",
                path = %written.display(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "done"
            );
            println!("{}", written.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EditorConfig> {
    match path {
        Some(path) => {
            // Nobody is typing: skip the debounce windows whatever the file says.
            let mut config = EditorConfig::load(path)?;
            config.resize_debounce_ms = 0;
            config.history.debounce_ms = 0;
            Ok(config)
        }
        None => Ok(EditorConfig::headless()),
    }
}

/// Run `args.command`; returns the path written.
pub fn execute(args: &CliArgs) -> Result<PathBuf> {
    let mut config = load_config(args.config.as_deref())?;
    let filter = match &args.command {
        Command::Resize(a) => a.filter,
        Command::Package(a) => a.filter,
        Command::Crop(_) => None,
    };
    if let Some(filter) = filter {
        config.filter = filter;
    }
    debug!(target: "image_resizer::cli", ?config, "configuration");

    let mut editor = Editor::new(config)?;
    match &args.command {
        Command::Resize(a) => resize(&mut editor, a),
        Command::Crop(a) => crop(&mut editor, a),
        Command::Package(a) => package(&mut editor, a),
    }
}

fn load(editor: &mut Editor, input: &Path) -> Result<Dimensions> {
    let file = ImageFile::open(input)?;
    editor.load_image(Some(&file))
}

fn settle(editor: &mut Editor) -> Result<()> {
    if !editor.settle(RENDER_TIMEOUT) {
        return Err(ResizerError::internal_panic("render did not finish in time"));
    }
    Ok(())
}

/// Render failures only surface as notifications; pick up the latest one.
fn last_failure(editor: &Editor) -> Option<String> {
    editor
        .notifications()
        .latest()
        .filter(|n| n.severity() != Severity::Success)
        .map(|n| n.message().to_string())
}

fn write_single(editor: &mut Editor, output: &Path) -> Result<PathBuf> {
    let file = editor.export_single()?;
    write_atomic(output, &file.bytes)?;
    Ok(output.to_path_buf())
}

fn resize(editor: &mut Editor, args: &ResizeArgs) -> Result<PathBuf> {
    let natural = load(editor, &args.input)?;
    match (args.width.as_deref(), args.height.as_deref()) {
        (Some(w), Some(h)) => {
            editor.toggle_lock();
            editor.set_width(w)?;
            editor.set_height(h)?;
        }
        (Some(w), None) => {
            editor.set_width(w)?;
        }
        (None, Some(h)) => {
            editor.set_height(h)?;
        }
        (None, None) => return Err(ResizerError::dimension_required()),
    }
    let target = editor.state().target().unwrap_or(natural);
    settle(editor)?;
    if editor.state().display_dimensions() != Some(target) {
        let message = last_failure(editor).unwrap_or_else(|| "render was dropped".to_string());
        return Err(ResizerError::resize_failed(
            natural.as_tuple(),
            target.as_tuple(),
            message,
        ));
    }
    info!(target: "image_resizer::cli", from = %natural, to = %target, "resized");
    write_single(editor, &args.output)
}

fn crop(editor: &mut Editor, args: &CropArgs) -> Result<PathBuf> {
    load(editor, &args.input)?;
    let region = CropRegion::new(args.x, args.y, args.width, args.height);
    let cropped = editor.crop(region)?;
    info!(target: "image_resizer::cli", ?region, to = %cropped, "cropped");
    write_single(editor, &args.output)
}

fn package(editor: &mut Editor, args: &PackageArgs) -> Result<PathBuf> {
    load(editor, &args.input)?;
    let package = editor.export_package(&args.export_sizes())?;
    std::fs::create_dir_all(&args.output)
        .map_err(|e| ResizerError::file_write_failed(args.output.display().to_string(), e))?;
    package.file.write_to(&args.output)
}
