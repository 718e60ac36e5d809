mod config;
mod profile;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use facemask_core::detector::detect_faces;
use facemask_core::{
    Dimension, FaceMask, LowPolyRenderer, Options, ResizeAlgorithm, RustfaceDetector, StylePolicy,
};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, ImageReader, RgbaImage};
use profile::StyleProfile;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "facemask", version, about = "Low-poly face mask filter")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mask every detected face and write the result
    Apply {
        input: PathBuf,
        /// Output file; its extension picks the format
        output: PathBuf,
        /// Output height in pixels ("120") or percent ("50%")
        #[arg(long)]
        height: Option<Dimension>,
        /// Output width in pixels ("120") or percent ("50%")
        #[arg(long)]
        width: Option<Dimension>,
        /// content-aware (seam carving), nearest, approx-bilinear, bilinear, catmull-rom
        #[arg(long, default_value_t = ResizeAlgorithm::ContentAware)]
        resize_alg: ResizeAlgorithm,
        /// JPEG quality (1-100)
        #[arg(long, default_value_t = 90, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: u8,
        /// Face worker threads (overrides FACEMASK_WORKERS)
        #[arg(long)]
        workers: Option<usize>,
        /// TOML style profile (overrides FACEMASK_STYLE_FILE)
        #[arg(long)]
        style: Option<PathBuf>,
    },
    /// Print detected faces as JSON, best first
    Detect { input: PathBuf },
}

fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("facemask=info,facemask_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Apply {
            input,
            output,
            height,
            width,
            resize_alg,
            quality,
            workers,
            style,
        } => {
            let policy: Arc<dyn StylePolicy> = match style.or(config.style_file.clone()) {
                Some(path) => Arc::new(StyleProfile::load(&path)?),
                None => Arc::new(StyleProfile::default()),
            };
            let filter = FaceMask::new(Arc::new(load_detector(&config)?), Arc::new(LowPolyRenderer))
                .workers(workers.unwrap_or(config.workers))?;
            let options = Options {
                target_height: height,
                target_width: width,
                resize_algorithm: resize_alg,
                policy: Some(policy),
            };

            let reader = BufReader::new(
                File::open(&input).with_context(|| format!("opening {}", input.display()))?,
            );
            let (masked, input_format) = filter
                .apply_reader(reader, &options)
                .with_context(|| format!("masking {}", input.display()))?;

            let format = ImageFormat::from_path(&output).unwrap_or(input_format);
            write_image(masked, &output, format, quality)?;
            tracing::info!(output = %output.display(), ?format, "image written");
        }
        Commands::Detect { input } => {
            let detector = load_detector(&config)?;
            let image = ImageReader::open(&input)
                .with_context(|| format!("opening {}", input.display()))?
                .with_guessed_format()?
                .decode()
                .with_context(|| format!("decoding {}", input.display()))?;

            let detections = detect_faces(&detector, &image.into_rgba8())?;
            let faces: Vec<_> = detections
                .iter()
                .enumerate()
                .map(|(rank, d)| {
                    let b = d.face_box();
                    serde_json::json!({
                        "rank": rank,
                        "center_x": d.center_x,
                        "center_y": d.center_y,
                        "scale": d.scale,
                        "confidence": d.confidence,
                        "box": [b.min_x, b.min_y, b.max_x, b.max_y],
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "faces": faces }))?);
        }
    }

    Ok(())
}

fn load_detector(config: &Config) -> Result<RustfaceDetector> {
    RustfaceDetector::from_file(&config.model_path).with_context(|| {
        format!(
            "loading face model (set FACEMASK_MODEL_PATH; tried {})",
            config.model_path.display()
        )
    })
}

fn write_image(image: RgbaImage, path: &Path, format: ImageFormat, quality: u8) -> Result<()> {
    if format == ImageFormat::Jpeg {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let rgb = image::DynamicImage::ImageRgba8(image).into_rgb8();
        JpegEncoder::new_with_quality(BufWriter::new(file), quality)
            .encode_image(&rgb)
            .with_context(|| format!("encoding {}", path.display()))?;
        return Ok(());
    }
    image
        .save_with_format(path, format)
        .with_context(|| format!("writing {}", path.display()))
}
