use clap::{Parser, Subcommand};
use ridgekit::io::{load_gray_raster, save_gray_raster};
use ridgekit::{
    CropGuide, EnhancementPipeline, FeatureExtractor, LivenessDetector, Matcher, QualityAssessor,
    QualityResult, RasterBuffer, Rect,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Ridgekit finger-photo pipeline CLI (JSON output)")]
struct Cli {
    /// Enable tracing output for pipeline diagnostics.
    #[arg(long, global = true)]
    trace: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score the capture quality of an image.
    Quality {
        /// Path to the captured image.
        image: PathBuf,
    },
    /// Run the ridge-enhancement pipeline over an image.
    Enhance {
        /// Path to the captured image.
        image: PathBuf,
        /// Where to write the enhanced image.
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
        /// Optional guide rectangle as x,y,width,height in preview coordinates.
        #[arg(long, value_name = "X,Y,W,H", value_parser = parse_rect)]
        guide: Option<Rect>,
        /// Preview size as WxH; required with --guide.
        #[arg(long, value_name = "WxH", value_parser = parse_size)]
        preview: Option<(u32, u32)>,
        /// Also write a fixed-format export (long side 500) next to the output.
        #[arg(long, value_name = "FILE")]
        export: Option<PathBuf>,
    },
    /// Extract the similarity feature vector of an (enhanced) image.
    Extract {
        /// Path to the enhanced image.
        image: PathBuf,
    },
    /// Match a probe image against one or more reference images.
    Match {
        /// Path to the probe image.
        probe: PathBuf,
        /// Paths to the enrolled reference images.
        #[arg(required = true)]
        references: Vec<PathBuf>,
    },
    /// Judge liveness over an ordered burst of frame images.
    Liveness {
        /// Frame paths in capture order.
        #[arg(required = true)]
        frames: Vec<PathBuf>,
        /// Milliseconds between consecutive frames.
        #[arg(long, default_value_t = 33)]
        frame_interval_ms: u64,
    },
}

fn parse_rect(value: &str) -> Result<Rect, String> {
    let parts: Vec<u32> = value
        .split(',')
        .map(|part| part.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .map_err(|err| err.to_string())?;
    match parts.as_slice() {
        [x, y, w, h] => Ok(Rect::new(*x, *y, *w, *h)),
        _ => Err("expected x,y,width,height".to_string()),
    }
}

fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WxH".to_string())?;
    let w = w.trim().parse::<u32>().map_err(|err| err.to_string())?;
    let h = h.trim().parse::<u32>().map_err(|err| err.to_string())?;
    Ok((w, h))
}

#[derive(Debug, Serialize)]
struct QualityReport {
    blur_score: f32,
    illumination_score: f32,
    coverage_score: f32,
    orientation_score: f32,
    overall_score: f32,
    passed: bool,
}

impl From<QualityResult> for QualityReport {
    fn from(value: QualityResult) -> Self {
        Self {
            blur_score: value.blur_score,
            illumination_score: value.illumination_score,
            coverage_score: value.coverage_score,
            orientation_score: value.orientation_score,
            overall_score: value.overall_score,
            passed: value.passed,
        }
    }
}

#[derive(Debug, Serialize)]
struct EnhanceReport {
    output: String,
    crop: [u32; 4],
    degraded: bool,
    export: Option<String>,
}

#[derive(Debug, Serialize)]
struct FeatureReport {
    orientation_histogram: Vec<f32>,
    texture_vector: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct MatchReport {
    similarity: f32,
    is_match: bool,
    confidence: f32,
    references: usize,
}

#[derive(Debug, Serialize)]
struct LivenessReport {
    motion_score: f32,
    texture_score: f32,
    consistency_score: f32,
    confidence: f32,
    is_live: bool,
    blocking: bool,
    frames: usize,
}

fn extract_features(path: &PathBuf) -> Result<ridgekit::FeatureVector, Box<dyn std::error::Error>> {
    let image = load_gray_raster(path)?;
    let enhanced = EnhancementPipeline::default().enhance(&image, None);
    Ok(FeatureExtractor::default().extract(&enhanced.image)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("ridgekit=info".parse()?))
            .with_target(false)
            .init();
    }

    let json = match cli.command {
        Command::Quality { image } => {
            let raster = load_gray_raster(&image)?;
            let result = QualityAssessor::default().assess(&raster);
            serde_json::to_string_pretty(&QualityReport::from(result))?
        }
        Command::Enhance {
            image,
            output,
            guide,
            preview,
            export,
        } => {
            let raster = load_gray_raster(&image)?;
            let guide = match (guide, preview) {
                (Some(rect), Some((w, h))) => Some(CropGuide::new(rect, w, h)),
                (Some(_), None) => {
                    return Err("--guide requires --preview".into());
                }
                _ => None,
            };
            let pipeline = EnhancementPipeline::default();
            let result = pipeline.enhance(&raster, guide.as_ref());
            save_gray_raster(&result.image, &output)?;
            let export_path = match export {
                Some(path) => {
                    let exported = pipeline.export_fixed(&result.image)?;
                    save_gray_raster(&exported, &path)?;
                    Some(path.display().to_string())
                }
                None => None,
            };
            serde_json::to_string_pretty(&EnhanceReport {
                output: output.display().to_string(),
                crop: [
                    result.crop.x,
                    result.crop.y,
                    result.crop.width,
                    result.crop.height,
                ],
                degraded: result.degraded,
                export: export_path,
            })?
        }
        Command::Extract { image } => {
            let features = extract_features(&image)?;
            serde_json::to_string_pretty(&FeatureReport {
                orientation_histogram: features.orientation_histogram,
                texture_vector: features.texture_vector,
            })?
        }
        Command::Match { probe, references } => {
            let probe_features = extract_features(&probe)?;
            let reference_features = references
                .iter()
                .map(extract_features)
                .collect::<Result<Vec<_>, _>>()?;
            let matcher = Matcher::default();
            let best = matcher
                .best_match(&probe_features, &reference_features)?
                .ok_or("no reference images supplied")?;
            serde_json::to_string_pretty(&MatchReport {
                similarity: best.similarity,
                is_match: best.is_match,
                confidence: best.confidence,
                references: reference_features.len(),
            })?
        }
        Command::Liveness {
            frames,
            frame_interval_ms,
        } => {
            let frame_interval_ms = frame_interval_ms.max(1);
            let burst: Vec<ridgekit::Frame> = frames
                .iter()
                .enumerate()
                .map(|(i, path)| -> Result<_, Box<dyn std::error::Error>> {
                    let raster: RasterBuffer = load_gray_raster(path)?;
                    Ok(ridgekit::Frame::new(
                        raster,
                        (i as u64 + 1) * frame_interval_ms,
                    ))
                })
                .collect::<Result<_, _>>()?;
            let detector = LivenessDetector::default();
            let result = detector.evaluate(&burst);
            serde_json::to_string_pretty(&LivenessReport {
                motion_score: result.motion_score,
                texture_score: result.texture_score,
                consistency_score: result.consistency_score,
                confidence: result.confidence,
                is_live: result.is_live,
                blocking: detector.should_block(&result),
                frames: burst.len(),
            })?
        }
    };

    println!("{json}");
    Ok(())
}
