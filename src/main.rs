//! GhostYUV CLI
//!
//! Command-line tools for raw video files.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use ghostyuv::{
    format::{bytes_per_frame, format_names},
    types::STANDARD_RESOLUTIONS,
    Direction, Endianness, Frame, HistogramChannel, PixelFormat, QualityMetric, Stream,
    StreamConfig, StreamWorker, QUALITY_METRICS,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "ghostyuv")]
#[command(about = "Raw video frame engine - inspect and measure uncompressed video")]
#[command(version)]
struct Cli {
    /// Only report warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// TOML file with default stream settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Geometry of headerless inputs
#[derive(Args, Debug, Clone, Default)]
struct InputArgs {
    /// Size (WxH or a standard name such as CIF)
    #[arg(short, long)]
    size: Option<String>,

    /// Pixel format (see `formats`)
    #[arg(short, long = "pel-fmt")]
    pel_fmt: Option<String>,

    /// Bits per sample
    #[arg(long)]
    bits: Option<u32>,

    /// Byte order of 16-bit samples (big, little)
    #[arg(long)]
    endianness: Option<String>,

    /// Samples are signed values stored around the half value
    #[arg(long)]
    has_negative: bool,

    /// Nominal frame rate
    #[arg(long)]
    fps: Option<u32>,
}

impl InputArgs {
    /// Merge command line values over the configuration file
    fn stream_config(&self, base: &StreamConfig) -> anyhow::Result<StreamConfig> {
        let mut config = base.clone();
        if let Some(size) = &self.size {
            let res = ghostyuv::Resolution::parse(size)?;
            config = config.with_resolution(res.width, res.height);
        }
        if let Some(fmt) = &self.pel_fmt {
            config.format = PixelFormat::from_name(fmt)?;
        }
        if let Some(bits) = self.bits {
            config.bits_per_sample = bits;
        }
        if let Some(endianness) = &self.endianness {
            config.endianness = endianness.parse()?;
        }
        if self.has_negative {
            config.has_negative_values = true;
        }
        if let Some(fps) = self.fps {
            config = config.with_fps(fps);
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show stream information for each input
    Info {
        /// Input files
        #[arg(short, long = "input", required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        input: InputArgs,
    },

    /// List pixel formats, quality metrics and file formats
    Formats,

    /// Save one frame of the input to an image or raw file
    Save {
        #[arg(short, long)]
        input: PathBuf,

        /// Output file, format chosen by extension
        #[arg(short, long)]
        output: PathBuf,

        /// Frame to save
        #[arg(short, long, default_value = "0")]
        frame: u64,

        #[command(flatten)]
        args: InputArgs,
    },

    /// Keep every n-th frame
    RateReduction {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Reduction factor
        #[arg(long, default_value = "2")]
        factor: u64,

        /// Output byte order (big, little)
        #[arg(long, default_value = "little")]
        out_endianness: String,

        #[command(flatten)]
        args: InputArgs,
    },

    /// Compare inputs against the first one
    Quality {
        /// Quality metric (PSNR, MSE, SSIM, WS-PSNR)
        #[arg(short, long, default_value = "PSNR")]
        metric: String,

        /// Reference first, then the inputs to measure
        #[arg(short, long = "input", num_args = 1.., required = true)]
        inputs: Vec<PathBuf>,

        /// Number of frames to measure (default: all)
        #[arg(short, long)]
        frames: Option<u64>,

        #[command(flatten)]
        args: InputArgs,
    },

    /// Per-frame histogram statistics
    Stats {
        #[arg(short, long = "input", required = true)]
        inputs: Vec<PathBuf>,

        /// Number of frames to analyse (default: all)
        #[arg(short, long)]
        frames: Option<u64>,

        #[command(flatten)]
        args: InputArgs,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.quiet { "ghostyuv=warn" } else { "ghostyuv=info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.parse()?))
        .init();

    let base = match &cli.config {
        Some(path) => StreamConfig::load(path)?,
        None => StreamConfig::default(),
    };

    match cli.command {
        Commands::Info { inputs, input } => cmd_info(&inputs, &input.stream_config(&base)?),
        Commands::Formats => cmd_formats(),
        Commands::Save {
            input,
            output,
            frame,
            args,
        } => cmd_save(&input, &output, frame, &args.stream_config(&base)?),
        Commands::RateReduction {
            input,
            output,
            factor,
            out_endianness,
            args,
        } => cmd_rate_reduction(&input, &output, factor, out_endianness.parse()?, &args.stream_config(&base)?),
        Commands::Quality {
            metric,
            inputs,
            frames,
            args,
        } => cmd_quality(&metric, &inputs, frames, &args.stream_config(&base)?),
        Commands::Stats { inputs, frames, args } => cmd_stats(&inputs, frames, &args.stream_config(&base)?),
    }
}

/// Input stream with its read-ahead thread
struct Input {
    stream: Arc<Stream>,
    _reader: StreamWorker,
}

impl std::ops::Deref for Input {
    type Target = Stream;

    fn deref(&self) -> &Stream {
        &self.stream
    }
}

fn open_input(path: &Path, config: &StreamConfig) -> anyhow::Result<Input> {
    let stream = Arc::new(Stream::new());
    stream
        .open(path, config, Direction::Input)
        .with_context(|| format!("Cannot open input {}", path.display()))?;
    let reader = stream.spawn_reader();
    Ok(Input {
        stream,
        _reader: reader,
    })
}

fn open_inputs(paths: &[PathBuf], config: &StreamConfig) -> anyhow::Result<Vec<Input>> {
    paths.iter().map(|p| open_input(p, config)).collect()
}

/// Step to the next frame; `true` at the end of the sequence
fn advance(stream: &Stream) -> anyhow::Result<bool> {
    Ok(stream.set_next_frame()?)
}

fn current(stream: &Stream) -> anyhow::Result<Arc<Frame>> {
    stream
        .current_frame()
        .with_context(|| format!("{}: no frame available", stream.file_name()))
}

fn print_stream_info(label: &str, stream: &Stream) {
    println!("{} {}", label, stream.file_name());
    println!("  Backend:    {}", stream.backend_name().unwrap_or("none"));
    println!("  Format:     {} ({})", stream.format_name(), stream.codec_name());
    println!("  Resolution: {}x{}", stream.width(), stream.height());
    if let Some(fmt) = stream.format() {
        println!("  Pixel fmt:  {} ({})", fmt, fmt.color_space().name());
    }
    println!("  Bits:       {}", stream.bits_per_sample());
    println!("  Frame rate: {}", stream.frame_rate());
    println!("  Frames:     {}", stream.frame_count());
    if !stream.is_native() {
        println!("  Note:       converted from a foreign sample layout");
    }
}

fn cmd_info(inputs: &[PathBuf], config: &StreamConfig) -> anyhow::Result<()> {
    println!("GhostYUV v{}\n", ghostyuv::VERSION);
    for (i, stream) in open_inputs(inputs, config)?.iter().enumerate() {
        print_stream_info(&format!("Input {}:", i), stream);
        if let Some(fmt) = stream.format() {
            let bpf = bytes_per_frame(stream.width(), stream.height(), fmt, stream.bits_per_sample());
            println!("  Frame size: {} bytes", bpf);
        }
        println!();
    }
    Ok(())
}

fn cmd_formats() -> anyhow::Result<()> {
    println!("Pixel formats:");
    for (id, name) in format_names().iter().enumerate() {
        let fmt = PixelFormat::from_id(id)?;
        println!("  {:2}  {:<10} {}", id, name, fmt.color_space().name());
    }

    println!("\nQuality metrics:");
    for metric in QUALITY_METRICS {
        println!("  {:<8} {}", metric.name(), metric.unit());
    }

    println!("\nReadable files:");
    for f in ghostyuv::supported_read_formats() {
        println!("  {:<34} {:<12} [{}]", f.name, f.extensions.join(", "), f.backend.name());
    }

    println!("\nWritable files:");
    for f in ghostyuv::supported_write_formats() {
        println!("  {:<34} {:<12} [{}]", f.name, f.extensions.join(", "), f.backend.name());
    }

    println!("\nStandard resolutions:");
    for r in STANDARD_RESOLUTIONS {
        println!("  {:<8} {}", r.name, r.resolution);
    }

    if !ghostyuv::has_libav() {
        println!("\nBuilt without libav: compressed video is not available");
    }
    Ok(())
}

fn cmd_save(input: &Path, output: &Path, frame: u64, config: &StreamConfig) -> anyhow::Result<()> {
    let stream = open_input(input, config)?;
    stream
        .seek(frame)
        .with_context(|| format!("Cannot seek {} to frame {}", input.display(), frame))?;
    Stream::save_frame(output, &*current(&stream)?)?;
    tracing::info!("Saved frame {} of {} to {}", frame, input.display(), output.display());
    Ok(())
}

fn cmd_rate_reduction(
    input: &Path,
    output: &Path,
    factor: u64,
    endianness: Endianness,
    config: &StreamConfig,
) -> anyhow::Result<()> {
    if factor == 0 {
        bail!("Invalid frame rate reduction factor: {}", factor);
    }
    let stream = open_input(input, config)?;
    let first = current(&stream)?;

    let out_config = StreamConfig::default()
        .with_resolution(first.width(), first.height())
        .with_format(first.format())
        .with_bits(first.bits())
        .with_endianness(endianness)
        .with_fps(1);
    let out = Stream::new();
    out.open(output, &out_config, Direction::Output)
        .with_context(|| format!("Cannot open output {}", output.display()))?;
    print_stream_info("Output", &out);

    let total = stream.frame_count();
    tracing::info!("Reducing frame rate by a factor of {}", factor);
    let mut written = 0u64;
    for frame in 0..total {
        if frame % factor == 0 {
            out.write_frame(&*current(&stream)?)?;
            written += 1;
        }
        if advance(&stream)? {
            break;
        }
    }
    out.close();
    println!("Wrote {} of {} frames to {}", written, total, output.display());
    Ok(())
}

fn cmd_quality(metric: &str, inputs: &[PathBuf], frames: Option<u64>, config: &StreamConfig) -> anyhow::Result<()> {
    let metric: QualityMetric = metric.parse()?;
    if inputs.len() < 2 {
        bail!("Quality needs a reference and at least one input");
    }
    let streams = open_inputs(inputs, config)?;
    let available = streams.iter().map(|s| s.frame_count()).min().unwrap_or(0);
    let frames = frames.map_or(available, |f| f.min(available));
    let channels = current(&streams[0])?.channels();

    print!("# Frame ");
    for s in 1..streams.len() {
        for c in 0..channels {
            print!(" {:>9}", format!("{}_{}_{}", metric.name(), s, c));
        }
        print!("  ");
    }
    println!();

    let mut average = vec![vec![0f64; channels]; streams.len() - 1];
    for frame in 0..frames {
        print!("  {:5} ", frame);
        let reference = current(&streams[0])?;
        for (s, stream) in streams.iter().enumerate().skip(1) {
            let decoded = current(stream)?;
            for c in 0..channels {
                let q = decoded.try_quality(metric, &reference, c)?;
                average[s - 1][c] = (average[s - 1][c] * frame as f64 + q) / (frame + 1) as f64;
                print!(" {:>9}", format_quality(metric, q));
            }
            print!("  ");
        }
        println!();
        for stream in &streams {
            advance(stream)?;
        }
    }

    println!("\n  Mean values:");
    print!("        ");
    for row in &average {
        for q in row {
            print!(" {:>9}", format_quality(metric, *q));
        }
        print!("  ");
    }
    println!();
    Ok(())
}

fn format_quality(metric: QualityMetric, value: f64) -> String {
    match metric {
        QualityMetric::Ssim => format!("{:.4}", value),
        QualityMetric::Mse => format!("{:.2}", value),
        QualityMetric::Psnr | QualityMetric::WsPsnr => format!("{:.3}", value),
    }
}

fn cmd_stats(inputs: &[PathBuf], frames: Option<u64>, config: &StreamConfig) -> anyhow::Result<()> {
    for (i, stream) in open_inputs(inputs, config)?.iter().enumerate() {
        println!("Input {}: {}", i, stream.file_name());
        println!("  Frames: {}", stream.frame_count());
        println!("  Pixels: {}", u64::from(stream.width()) * u64::from(stream.height()));

        let total = frames.map_or(stream.frame_count(), |f| f.min(stream.frame_count()));
        for n in 0..total {
            let frame = current(stream)?;
            print_frame_stats(n, &frame);
            if advance(stream)? {
                break;
            }
        }
        println!();
    }
    Ok(())
}

fn print_frame_stats(n: u64, frame: &Frame) {
    frame.calc_histogram();
    let channels: Vec<HistogramChannel> = (0..frame.channels()).map(HistogramChannel::from).collect();
    let range = |c: HistogramChannel| {
        let min = frame.min_pel_value(c).unwrap_or(0) as usize;
        let max = frame.max_pel_value(c).unwrap_or(0) as usize;
        (min, max)
    };

    println!("  Frame {}", n);
    let row = |label: &str, cell: &dyn Fn(HistogramChannel) -> String| {
        print!("    {:<16}", label);
        for &c in &channels {
            print!("| {:>13} ", cell(c));
        }
        println!("|");
    };

    row("Channel:", &|c| match c {
        HistogramChannel::Index(i) => i.to_string(),
        other => format!("{:?}", other),
    });
    row("Range:", &|c| {
        let (min, max) = range(c);
        format!("[{}:{}]", min, max)
    });
    row("Non empty bins:", &|c| frame.non_empty_bins(c).to_string());
    row("Mean:", &|c| {
        let (min, max) = range(c);
        format!("{:.1}", frame.mean(c, min, max))
    });
    row("Std. deviation:", &|c| {
        let (min, max) = range(c);
        format!("{:.1}", frame.std_dev(c, min, max))
    });
    row("Median:", &|c| {
        let (min, max) = range(c);
        frame.median(c, min, max).to_string()
    });
    row("Entropy:", &|c| {
        let (min, max) = range(c);
        format!("{:.2}", frame.entropy(c, min, max))
    });
}
