//! Randomized FFmpeg command construction.
//!
//! This module builds complete ffmpeg command lines that apply subtle,
//! randomized video and audio variations while keeping visual quality high
//! (CRF 22-24, veryfast). Parameters are sampled fresh per invocation so no
//! two command lines look alike; filters whose sampled value is an identity
//! are omitted from the chain entirely.

use crate::error::CoreResult;
use crate::external::ffmpeg_executor::{supports_filter, FfmpegRunner};
use crate::temp_files;

use log::warn;
use rand::Rng;

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Pitch-preserving time-stretch filter probed for before building the
/// audio chain. Not all ffmpeg builds ship it.
const RUBBERBAND_FILTER: &str = "rubberband";

/// Crop / pad / drawbox step kept for compatibility with watermark-stripped
/// sources; runs after geometry but before noise injection.
const CROP_PAD_DRAW: &str =
    "crop=iw-2:ih-2,pad=iw+2:ih+2:1:1,drawbox=x=10:y=10:w=5:h=5:color=white@0.001:t=fill";

const CRF_CHOICES: [u32; 3] = [22, 23, 24];
const KEYINT_CHOICES: [u32; 3] = [24, 48, 72];

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn round4(value: f64) -> f64 {
    (value * 10000.0).round() / 10000.0
}

/// Randomized per-request transform parameters.
///
/// Values are sampled independently and uniformly; nothing links one
/// request's parameters to another's. Sampling is generic over `Rng` so
/// tests can seed a `StdRng` while production uses a fresh `thread_rng()`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterParameters {
    /// Constant rate factor, lower is higher quality
    pub crf: u32,
    /// Keyframe interval, breaks fixed-GOP fingerprints
    pub keyint: u32,
    /// Zoom-crop ratio, defeats spatial-hash matching
    pub zoom: f64,
    /// Whole-frame time shift; 0 means the filter is omitted
    pub frame_shift: i32,
    /// Low-gain temporal noise amplitude
    pub noise_strength: u32,
    /// `eq` brightness delta around 0
    pub brightness: f64,
    /// `eq` contrast around 1.0
    pub contrast: f64,
    /// `eq` saturation around 1.0
    pub saturation: f64,
    /// Audio tempo factor
    pub tempo: f64,
    /// Optional micro pitch-shift layered on top of the tempo change;
    /// costs the pitch-preserved claim when present
    pub pitch_shift: Option<f64>,
    /// Optional horizontal-flip blend period in frames
    pub flip_interval: Option<u32>,
    /// Whether to generate a per-call color lookup table
    pub use_lut: bool,
}

impl FilterParameters {
    pub fn sample<G: Rng + ?Sized>(rng: &mut G) -> Self {
        let pitch_shift = if rng.gen_bool(0.5) {
            let pitch = round4(rng.gen_range(0.9993..=1.0007));
            // A shift that rounds to exactly 1.0 is an identity; drop it
            // rather than emit a no-op.
            (pitch != 1.0).then_some(pitch)
        } else {
            None
        };

        Self {
            crf: CRF_CHOICES[rng.gen_range(0..CRF_CHOICES.len())],
            keyint: KEYINT_CHOICES[rng.gen_range(0..KEYINT_CHOICES.len())],
            zoom: round3(rng.gen_range(1.005..=1.035)),
            frame_shift: rng.gen_range(-3..=3),
            noise_strength: rng.gen_range(5..=10),
            brightness: round4(rng.gen_range(-0.01..=0.01)),
            contrast: round3(rng.gen_range(1.0..=1.03)),
            saturation: round3(rng.gen_range(0.99..=1.01)),
            tempo: round3(rng.gen_range(0.987..=1.013)),
            pitch_shift,
            flip_interval: if rng.gen_bool(0.35) {
                Some(rng.gen_range(90..=120))
            } else {
                None
            },
            use_lut: rng.gen_bool(0.35),
        }
    }
}

/// A fully assembled engine invocation: the argument vector (program name
/// excluded) plus whether pitch survived the tempo change. Immutable once
/// built.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineInvocation {
    pub args: Vec<String>,
    pub pitch_preserved: bool,
}

impl EngineInvocation {
    /// Renders the full command line for responses and logs.
    pub fn command_line(&self) -> String {
        format!("ffmpeg {}", self.args.join(" "))
    }
}

/// Builder for constructing filter chains, dropping empty entries so
/// identity steps never reach the engine.
#[derive(Default)]
struct FilterChain {
    filters: Vec<String>,
}

impl FilterChain {
    fn new() -> Self {
        Self::default()
    }

    fn add(mut self, filter: String) -> Self {
        if !filter.is_empty() {
            self.filters.push(filter);
        }
        self
    }

    fn build(self) -> String {
        self.filters.join(",")
    }
}

/// Samples fresh parameters, probes the engine for the pitch-preserving
/// time-stretch capability, writes the optional per-call lookup table, and
/// assembles the invocation.
///
/// Never fails: a failed capability probe selects the approximate-resample
/// audio path, and a failed LUT write degrades to "no LUT". The second
/// tuple element is the path of the auxiliary LUT file when one was
/// written; the caller owns its cleanup.
pub fn build_invocation<R, G>(
    runner: &R,
    rng: &mut G,
    input_path: &Path,
    output_path: &Path,
    scratch_dir: &Path,
) -> (EngineInvocation, Option<PathBuf>)
where
    R: FfmpegRunner + ?Sized,
    G: Rng + ?Sized,
{
    let params = FilterParameters::sample(rng);
    let pitch_capable = supports_filter(runner, RUBBERBAND_FILTER);

    let lut_path = if params.use_lut {
        match write_random_lut(scratch_dir, rng) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Skipping color LUT, failed to write table: {}", e);
                None
            }
        }
    } else {
        None
    };

    let invocation = assemble_invocation(
        &params,
        pitch_capable,
        input_path,
        output_path,
        lut_path.as_deref(),
    );
    (invocation, lut_path)
}

/// Deterministic assembly of an invocation from already-sampled parameters.
///
/// Ordering constraints: geometry (zoom scale/crop) runs first, then the
/// fixed crop/pad/drawbox step, then noise, then color adjustment and
/// sharpening, then the pixel-format normalization. The lookup table and
/// the flip blend sit after normalization so they operate on a consistent
/// decoded color representation.
pub fn assemble_invocation(
    params: &FilterParameters,
    pitch_capable: bool,
    input_path: &Path,
    output_path: &Path,
    lut_path: Option<&Path>,
) -> EngineInvocation {
    let zoom = params.zoom;

    let chain = FilterChain::new()
        .add(format!("scale=iw*{zoom}:ih*{zoom},crop=iw/{zoom}:ih/{zoom}"))
        .add(frame_shift_filter(params.frame_shift))
        .add(CROP_PAD_DRAW.to_string())
        .add(format!("noise=alls={}:allf=t+u", params.noise_strength))
        .add(format!(
            "eq=brightness={}:contrast={}:saturation={}",
            params.brightness, params.contrast, params.saturation
        ))
        .add("hue=s=1.01".to_string())
        .add("unsharp=5:5:0.8:5:5:0.0".to_string())
        .add("deband".to_string())
        .add("format=yuv420p".to_string())
        .add(match lut_path {
            Some(path) => format!("lut3d=file='{}'", path.display()),
            None => String::new(),
        });

    let mut vfilter = chain.build();
    if let Some(period) = params.flip_interval {
        // One mirrored frame per period, blended in through a timeline-gated
        // overlay; hflip itself has no timeline support.
        let _ = write!(
            vfilter,
            ",split[fv0][fv1];[fv1]hflip[fvf];[fv0][fvf]overlay=enable='lt(mod(n,{period}),1)'"
        );
    }

    let (afilter, pitch_preserved) = audio_filter(params, pitch_capable);

    let args = vec![
        "-hide_banner".to_string(),
        "-y".to_string(),
        "-i".to_string(),
        input_path.to_string_lossy().into_owned(),
        "-vf".to_string(),
        vfilter,
        "-af".to_string(),
        afilter,
        "-map_metadata".to_string(),
        "-1".to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "veryfast".to_string(),
        "-crf".to_string(),
        params.crf.to_string(),
        "-g".to_string(),
        params.keyint.to_string(),
        "-x264-params".to_string(),
        "no-scenecut=1:qcomp=0.70".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "128k".to_string(),
        output_path.to_string_lossy().into_owned(),
    ];

    EngineInvocation {
        args,
        pitch_preserved,
    }
}

fn frame_shift_filter(shift: i32) -> String {
    if shift == 0 {
        // Identity shift: omit rather than encode a no-op.
        String::new()
    } else if shift > 0 {
        format!("setpts=PTS+{shift}/TB")
    } else {
        format!("setpts=PTS-{}/TB", shift.abs())
    }
}

/// Builds the audio chain and reports whether pitch was preserved.
///
/// Tempo adjustment comes first: rubberband when the engine has it, else a
/// plain atempo with a compensating resample approximating the original
/// pitch. Equalization and a small DC offset follow to nudge low-level
/// audio statistics without audible effect.
fn audio_filter(params: &FilterParameters, pitch_capable: bool) -> (String, bool) {
    let tempo = params.tempo;
    let mut filters: Vec<String> = Vec::new();
    let pitch_preserved;

    if pitch_capable {
        let mut stretch = format!("rubberband=tempo={tempo}");
        if let Some(pitch) = params.pitch_shift {
            let _ = write!(stretch, ":pitch={pitch}");
        }
        filters.push(stretch);
        pitch_preserved = params.pitch_shift.is_none();
    } else {
        filters.push(format!("atempo={tempo}"));
        filters.push(format!("asetrate=44100/{tempo},aresample=44100"));
        pitch_preserved = false;
    }

    filters.push("equalizer=f=200:t=q:w=1:g=1".to_string());
    filters.push("dcshift=0.01:0".to_string());

    (filters.join(","), pitch_preserved)
}

/// Writes a 2x2x2 `.cube` lookup table whose corner samples carry sub-1%
/// random RGB deltas, and returns its path.
pub fn write_random_lut<G: Rng + ?Sized>(scratch_dir: &Path, rng: &mut G) -> CoreResult<PathBuf> {
    let path = temp_files::create_scratch_file_path(scratch_dir, "lut", "cube");

    let mut contents = String::from("LUT_3D_SIZE 2\n");
    let mut corner = |on: u32| -> f64 {
        (f64::from(on) + rng.gen_range(-0.008..=0.008)).clamp(0.0, 1.0)
    };
    // Red varies fastest, per the .cube layout.
    for b in [0u32, 1] {
        for g in [0u32, 1] {
            for r in [0u32, 1] {
                let (rv, gv, bv) = (corner(r), corner(g), corner(b));
                let _ = writeln!(contents, "{rv:.6} {gv:.6} {bv:.6}");
            }
        }
    }

    fs::write(&path, contents)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::path::PathBuf;

    fn sample_with_seed(seed: u64) -> FilterParameters {
        let mut rng = StdRng::seed_from_u64(seed);
        FilterParameters::sample(&mut rng)
    }

    fn assemble(params: &FilterParameters, pitch_capable: bool) -> EngineInvocation {
        assemble_invocation(
            params,
            pitch_capable,
            Path::new("/scratch/in_x.mp4"),
            Path::new("/scratch/out_x.mp4"),
            None,
        )
    }

    #[test]
    fn test_filter_chain_drops_empty_entries() {
        let chain = FilterChain::new()
            .add(String::new())
            .add("deband".to_string())
            .add(String::new())
            .add("format=yuv420p".to_string());
        assert_eq!(chain.build(), "deband,format=yuv420p");
    }

    #[test]
    fn test_sampled_parameters_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let p = FilterParameters::sample(&mut rng);
            assert!([22, 23, 24].contains(&p.crf));
            assert!([24, 48, 72].contains(&p.keyint));
            assert!(p.zoom >= 1.005 && p.zoom <= 1.035);
            assert!(p.frame_shift >= -3 && p.frame_shift <= 3);
            assert!(p.noise_strength >= 5 && p.noise_strength <= 10);
            assert!(p.brightness >= -0.01 && p.brightness <= 0.01);
            assert!(p.contrast >= 1.0 && p.contrast <= 1.03);
            assert!(p.saturation >= 0.99 && p.saturation <= 1.01);
            assert!(p.tempo >= 0.987 && p.tempo <= 1.013);
            if let Some(pitch) = p.pitch_shift {
                assert!(pitch >= 0.9993 && pitch <= 1.0007);
                assert!(pitch != 1.0);
            }
            if let Some(period) = p.flip_interval {
                assert!((90..=120).contains(&period));
            }
        }
    }

    #[test]
    fn test_sampling_is_deterministic_for_fixed_seed() {
        assert_eq!(sample_with_seed(42), sample_with_seed(42));
        assert_ne!(sample_with_seed(42), sample_with_seed(43));
    }

    #[test]
    fn test_invocation_ends_with_output_path() {
        let params = sample_with_seed(1);
        let inv = assemble(&params, true);
        assert!(!inv.args.is_empty());
        assert_eq!(inv.args.last().unwrap(), "/scratch/out_x.mp4");
        assert!(inv.command_line().starts_with("ffmpeg -hide_banner -y -i "));
    }

    #[test]
    fn test_video_filter_ordering() {
        let params = sample_with_seed(1);
        let inv = assemble(&params, true);
        let vf_pos = inv.args.iter().position(|a| a == "-vf").unwrap();
        let vf = &inv.args[vf_pos + 1];

        let scale = vf.find("scale=iw*").unwrap();
        let crop_pad = vf.find("crop=iw-2").unwrap();
        let noise = vf.find("noise=alls=").unwrap();
        let eq = vf.find("eq=brightness=").unwrap();
        let sharpen = vf.find("unsharp=").unwrap();
        let format = vf.find("format=yuv420p").unwrap();
        assert!(scale < crop_pad);
        assert!(crop_pad < noise);
        assert!(noise < eq);
        assert!(eq < sharpen);
        assert!(sharpen < format);
    }

    #[test]
    fn test_zero_frame_shift_is_omitted() {
        let mut params = sample_with_seed(3);
        params.frame_shift = 0;
        let inv = assemble(&params, true);
        assert!(!inv.command_line().contains("setpts"));

        params.frame_shift = 2;
        let inv = assemble(&params, true);
        assert!(inv.command_line().contains("setpts=PTS+2/TB"));

        params.frame_shift = -3;
        let inv = assemble(&params, true);
        assert!(inv.command_line().contains("setpts=PTS-3/TB"));
    }

    #[test]
    fn test_flip_blend_is_optional_and_timeline_gated() {
        let mut params = sample_with_seed(4);
        params.flip_interval = None;
        let inv = assemble(&params, true);
        assert!(!inv.command_line().contains("hflip"));

        params.flip_interval = Some(105);
        let inv = assemble(&params, true);
        let cmd = inv.command_line();
        assert!(cmd.contains("split[fv0][fv1]"));
        assert!(cmd.contains("overlay=enable='lt(mod(n,105),1)'"));
    }

    #[test]
    fn test_lut_is_referenced_after_format_normalization() {
        let mut params = sample_with_seed(5);
        params.flip_interval = None;
        let lut = PathBuf::from("/scratch/lut_x.cube");
        let inv = assemble_invocation(
            &params,
            true,
            Path::new("/scratch/in_x.mp4"),
            Path::new("/scratch/out_x.mp4"),
            Some(&lut),
        );
        let vf_pos = inv.args.iter().position(|a| a == "-vf").unwrap();
        let vf = &inv.args[vf_pos + 1];
        let format = vf.find("format=yuv420p").unwrap();
        let lut_ref = vf.find("lut3d=file='/scratch/lut_x.cube'").unwrap();
        assert!(format < lut_ref);
    }

    #[test]
    fn test_pitch_preserved_flag() {
        let mut params = sample_with_seed(6);

        params.pitch_shift = None;
        assert!(assemble(&params, true).pitch_preserved);

        params.pitch_shift = Some(1.0004);
        assert!(!assemble(&params, true).pitch_preserved);

        params.pitch_shift = None;
        assert!(!assemble(&params, false).pitch_preserved);
    }

    #[test]
    fn test_audio_chain_orders_tempo_first() {
        let mut params = sample_with_seed(8);
        params.tempo = 1.008;
        params.pitch_shift = Some(1.0004);

        let inv = assemble(&params, true);
        let af_pos = inv.args.iter().position(|a| a == "-af").unwrap();
        let af = &inv.args[af_pos + 1];
        assert!(af.starts_with("rubberband=tempo=1.008:pitch=1.0004"));
        assert!(af.contains("equalizer=f=200"));
        assert!(af.ends_with("dcshift=0.01:0"));
        assert!(!af.contains("atempo"));

        let inv = assemble(&params, false);
        let af_pos = inv.args.iter().position(|a| a == "-af").unwrap();
        let af = &inv.args[af_pos + 1];
        assert!(af.starts_with("atempo=1.008,asetrate=44100/1.008,aresample=44100"));
        assert!(!af.contains("rubberband"));
    }

    #[test]
    fn test_metadata_stripped_and_codecs_fixed() {
        let params = sample_with_seed(9);
        let inv = assemble(&params, true);
        let cmd = inv.command_line();
        assert!(cmd.contains("-map_metadata -1"));
        assert!(cmd.contains("-c:v libx264"));
        assert!(cmd.contains("-preset veryfast"));
        assert!(cmd.contains("-c:a aac"));
        assert!(cmd.contains("-b:a 128k"));
        assert!(cmd.contains("-x264-params no-scenecut=1:qcomp=0.70"));
    }

    #[test]
    fn test_different_seeds_give_different_command_lines() {
        let a = assemble(&sample_with_seed(100), true);
        let b = assemble(&sample_with_seed(101), true);
        assert_ne!(a.command_line(), b.command_line());
    }

    #[test]
    fn test_write_random_lut_shape() {
        let dir = tempfile::tempdir().unwrap();
        let mut rng = StdRng::seed_from_u64(10);
        let path = write_random_lut(dir.path(), &mut rng).unwrap();
        assert_eq!(path.extension().unwrap(), "cube");

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "LUT_3D_SIZE 2");
        assert_eq!(lines.len(), 9);
        for line in &lines[1..] {
            for component in line.split_whitespace() {
                let value: f64 = component.parse().unwrap();
                assert!((0.0..=1.0).contains(&value));
                // Each corner stays within 1% of its identity value.
                assert!(value < 0.01 || value > 0.99);
            }
        }
    }
}
