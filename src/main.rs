use anyhow::{anyhow, Context, Result};
use camola_stage::capture::{CaptureSource, WebcamCapture};
use camola_stage::output::{OutputSink, V4L2Output};
use camola_stage::overlay::{align_to_corner, presets, Corner, ImageAsset, ALIGN_MARGIN};
use camola_stage::persistence::BackgroundLibrary;
use camola_stage::profile::{EmployeeProfile, PrivacyLevel};
use camola_stage::render::FontBook;
use camola_stage::segmentation::{BackgroundWatch, EngineConfig, SegmentationEngine};
use camola_stage::Pipeline;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input webcam device index
    #[arg(short, long, default_value_t = 0)]
    input_device: u32,

    /// Output v4l2loopback device path
    #[arg(short, long, default_value = "/dev/video10")]
    output_device: String,

    /// Capture resolution width
    #[arg(long, default_value_t = 1280)]
    capture_width: u32,

    /// Capture resolution height
    #[arg(long, default_value_t = 720)]
    capture_height: u32,

    /// Output resolution width
    #[arg(long, default_value_t = 1280)]
    output_width: u32,

    /// Output resolution height
    #[arg(long, default_value_t = 720)]
    output_height: u32,

    /// Target frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Path to the Robust Video Matting model (ONNX file)
    /// If not provided, runs in passthrough mode without segmentation
    #[arg(long, requires = "background")]
    model: Option<PathBuf>,

    /// Replacement background image
    #[arg(long, requires = "model")]
    background: Option<PathBuf>,

    /// Run inference on every Nth frame only (0 = every frame)
    #[arg(long, default_value_t = 0)]
    frame_skip: u32,

    /// Model-internal downsample ratio
    #[arg(long, default_value_t = 0.4)]
    downsample_ratio: f32,

    /// Resize frames to WIDTHxHEIGHT before inference
    #[arg(long, value_parser = parse_size)]
    model_input_size: Option<(u32, u32)>,

    /// Re-read the background file at most this often (0 = never)
    #[arg(long, default_value_t = 1000)]
    background_reload_ms: u64,

    /// Directory of preset backgrounds
    #[arg(long, default_value = "backgrounds")]
    presets_dir: PathBuf,

    /// Copy this preset over the background file before starting
    #[arg(long, requires = "background")]
    preset: Option<String>,

    /// Write this base64 PNG (or data URL) file over the background before starting
    #[arg(long, requires = "background")]
    background_data: Option<PathBuf>,

    /// List preset backgrounds and exit
    #[arg(long)]
    list_presets: bool,

    /// Font for overlay text, as FAMILY=PATH (repeatable)
    #[arg(long = "font", value_parser = parse_font)]
    fonts: Vec<(String, PathBuf)>,

    /// Employee profile JSON for the privacy label
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Override the profile's privacy level
    #[arg(long, value_enum)]
    privacy: Option<PrivacyLevel>,

    /// QR code link (defaults to the profile contact)
    #[arg(long)]
    qr: Option<String>,

    /// Corner to pin the QR code to
    #[arg(long, value_enum)]
    qr_corner: Option<Corner>,

    /// Logo image (defaults to the profile logo)
    #[arg(long)]
    logo: Option<PathBuf>,

    /// Announcement text
    #[arg(long)]
    announce: Option<String>,

    /// Show the announcement as a scrolling ticker
    #[arg(long, requires = "announce")]
    ticker: bool,
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {:?}", s))?;
    let w = w.parse().map_err(|e| format!("bad width: {}", e))?;
    let h = h.parse().map_err(|e| format!("bad height: {}", e))?;
    Ok((w, h))
}

fn parse_font(s: &str) -> Result<(String, PathBuf), String> {
    let (family, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FAMILY=PATH, got {:?}", s))?;
    Ok((family.to_string(), PathBuf::from(path)))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    if args.list_presets {
        let library = BackgroundLibrary::new(&args.presets_dir, "");
        for name in library.list_presets().context("Failed to list presets")? {
            println!("{}", name);
        }
        return Ok(());
    }

    tracing::info!("Camola Stage starting");
    tracing::info!("Capture: {}x{}", args.capture_width, args.capture_height);
    tracing::info!("Output: {}x{}", args.output_width, args.output_height);
    tracing::info!("Target FPS: {}", args.fps);

    if let Some(background) = &args.background {
        prepare_background(&args, background)?;
    }

    let mut fonts = FontBook::new();
    for (family, path) in &args.fonts {
        fonts.load_file(family, path)?;
    }
    if fonts.is_empty() {
        tracing::info!("No fonts loaded; overlay text is measured but not drawn");
    }

    let segmenter = build_engine(&args)?;
    let mut pipeline = Pipeline::new(segmenter, fonts);
    add_overlays(&args, &mut pipeline)?;

    // Initialize capture
    let mut capture = WebcamCapture::new(
        args.input_device,
        args.capture_width,
        args.capture_height,
    )
    .context("Failed to initialize webcam capture")?;

    // Initialize output
    let mut output = V4L2Output::new(&args.output_device, args.output_width, args.output_height)
        .context("Failed to initialize v4l2loopback output")?;

    let result = run_pipeline(&mut capture, &mut output, &mut pipeline, args.fps);
    pipeline.shutdown();
    result
}

fn prepare_background(args: &Args, background: &Path) -> Result<()> {
    let library = BackgroundLibrary::new(&args.presets_dir, background);
    if let Some(name) = &args.preset {
        library
            .apply_preset(name)
            .with_context(|| format!("Failed to apply preset {}", name))?;
    }
    if let Some(path) = &args.background_data {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        library
            .save_encoded(&data)
            .context("Failed to save background")?;
    }
    Ok(())
}

fn build_engine(args: &Args) -> Result<Option<SegmentationEngine>> {
    let (Some(model_path), Some(background)) = (&args.model, &args.background) else {
        tracing::info!("Running in passthrough mode (no segmentation)");
        return Ok(None);
    };

    let background_watch = (args.background_reload_ms > 0).then(|| BackgroundWatch {
        path: background.clone(),
        min_interval: Duration::from_millis(args.background_reload_ms),
    });
    let config = EngineConfig {
        downsample_ratio: args.downsample_ratio,
        frame_skip: args.frame_skip,
        input_size: args.model_input_size,
        background_watch,
    };
    tracing::info!(
        "Segmentation: downsample_ratio={}, frame_skip={}, input_size={:?}",
        config.downsample_ratio,
        config.frame_skip,
        config.input_size
    );

    let mut engine = SegmentationEngine::new(config);

    tracing::info!("Loading matting model from {}", model_path.display());
    engine
        .load_model(model_path)
        .context("Failed to load segmentation model")?;
    tracing::info!("Matting model loaded successfully");

    engine
        .set_background(background)
        .context("Failed to load background")?;

    Ok(Some(engine))
}

fn add_overlays(args: &Args, pipeline: &mut Pipeline) -> Result<()> {
    let profile = args
        .profile
        .as_ref()
        .map(EmployeeProfile::load)
        .transpose()?;

    if let Some(profile) = &profile {
        let level = args.privacy.unwrap_or(profile.privacy_level);
        let text = profile.privacy_text(level);
        presets::set_privacy_label(pipeline.overlays_mut(), &text);
        tracing::info!("Privacy label for {} ({:?})", profile.full_name, level);
    }

    let logo = args
        .logo
        .clone()
        .or_else(|| profile.as_ref().and_then(|p| p.logo_url()).map(PathBuf::from));
    if let Some(path) = logo {
        let source = path.display().to_string();
        presets::add_image(
            pipeline.overlays_mut(),
            &source,
            ImageAsset::load(path),
            presets::GROUP_LOGO,
        );
    }

    let link = args
        .qr
        .clone()
        .or_else(|| profile.as_ref().and_then(|p| p.contact_link()).map(str::to_string));
    if let Some(link) = link {
        let id = presets::add_qr(pipeline.overlays_mut(), &link, presets::GROUP_CUSTOM)
            .map_err(|e| anyhow!("Failed to encode QR code for {}: {}", link, e))?;
        if let (Some(id), Some(corner)) = (id, args.qr_corner) {
            let overlay = pipeline
                .overlays()
                .get(id)
                .ok_or_else(|| anyhow!("QR overlay {} vanished", id))?;
            let patch = align_to_corner(overlay, corner, ALIGN_MARGIN, pipeline.fonts());
            pipeline.overlays_mut().update(id, &patch);
        }
    }

    if let Some(text) = &args.announce {
        presets::add_announcement(pipeline.overlays_mut(), text, args.ticker);
    }

    tracing::info!("{} overlays active", pipeline.overlays().len());
    Ok(())
}

fn run_pipeline<C, O>(
    capture: &mut C,
    output: &mut O,
    pipeline: &mut Pipeline,
    target_fps: u32,
) -> Result<()>
where
    C: CaptureSource,
    O: OutputSink,
{
    let frame_duration = Duration::from_secs_f32(1.0 / target_fps.max(1) as f32);
    let mut frame_count = 0u64;
    let mut total_capture_time = Duration::ZERO;
    let mut total_process_time = Duration::ZERO;
    let mut total_output_time = Duration::ZERO;

    tracing::info!("Starting main pipeline loop");
    tracing::info!("Press Ctrl+C to stop");

    loop {
        let loop_start = Instant::now();

        // Capture frame
        let capture_start = Instant::now();
        let frame = capture
            .capture_frame()
            .context("Failed to capture frame")?;
        total_capture_time += capture_start.elapsed();

        // Segment, composite and draw overlays
        let process_start = Instant::now();
        let output_frame = pipeline
            .process(frame)
            .context("Failed to process frame")?;
        total_process_time += process_start.elapsed();

        // Output frame
        let output_start = Instant::now();
        output
            .write_frame(output_frame)
            .context("Failed to write frame")?;
        total_output_time += output_start.elapsed();

        frame_count += 1;

        // Log stats every 30 frames
        if frame_count % 30 == 0 {
            let avg_capture_ms = total_capture_time.as_secs_f64() * 1000.0 / frame_count as f64;
            let avg_process_ms = total_process_time.as_secs_f64() * 1000.0 / frame_count as f64;
            let avg_output_ms = total_output_time.as_secs_f64() * 1000.0 / frame_count as f64;
            let total_ms = avg_capture_ms + avg_process_ms + avg_output_ms;
            let actual_fps = 1000.0 / total_ms;

            match pipeline.segmenter() {
                Some(engine) => tracing::info!(
                    "Frame {}: capture={:.1}ms, process={:.1}ms, output={:.1}ms, total={:.1}ms, fps={:.1}, inferences={}, passthrough={}",
                    frame_count,
                    avg_capture_ms,
                    avg_process_ms,
                    avg_output_ms,
                    total_ms,
                    actual_fps,
                    engine.inference_count(),
                    pipeline.recovered_failures()
                ),
                None => tracing::info!(
                    "Frame {}: capture={:.1}ms, overlays={:.1}ms, output={:.1}ms, total={:.1}ms, fps={:.1}",
                    frame_count,
                    avg_capture_ms,
                    avg_process_ms,
                    avg_output_ms,
                    total_ms,
                    actual_fps
                ),
            }
        }

        // Frame rate limiting
        let elapsed = loop_start.elapsed();
        if elapsed < frame_duration {
            std::thread::sleep(frame_duration - elapsed);
        }
    }
}
