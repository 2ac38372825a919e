// demos/blur_image.rs — Blur an image file on the GPU.
//
//   cargo run --example blur_image -- <input> <radius> <sigma> [output]
//
// Decodes the input with the `image` crate, forces RGBA (the kernel
// assumes exactly 4 channels per pixel), blurs on the GPU, and saves a
// PNG — PNG because it preserves the alpha channel the conversion added.
// If no output path is given, a filename embedding radius and sigma plus
// a distinguishing suffix is generated next to the working directory.

use std::env;
use std::path::PathBuf;
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use gridblur::gpu::blur::GpuBlurPipeline;
use gridblur::gpu::device::GpuDevice;
use gridblur::image::Image;
use gridblur::params::BlurParams;

fn main() {
    let mut args = env::args().skip(1);
    let (input_path, radius, sigma, output_path) = match parse_args(&mut args) {
        Ok(parsed) => parsed,
        Err(msg) => {
            eprintln!("error: {msg}");
            eprintln!("usage: blur_image <input> <radius> <sigma> [output]");
            process::exit(2);
        }
    };

    if let Err(e) = run(&input_path, radius, sigma, output_path) {
        eprintln!("error: {e}");
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("caused by: {cause}");
            source = cause.source();
        }
        process::exit(1);
    }
}

fn parse_args(
    args: &mut impl Iterator<Item = String>,
) -> Result<(PathBuf, u32, f32, Option<PathBuf>), String> {
    let input = args.next().ok_or("input path not specified")?;
    let radius: u32 = args
        .next()
        .ok_or("radius not specified")?
        .parse()
        .map_err(|_| "radius must be a non-negative integer")?;
    let sigma: f32 = args
        .next()
        .ok_or("sigma not specified")?
        .parse()
        .map_err(|_| "sigma must be a number")?;
    let output = args.next().map(PathBuf::from);
    Ok((PathBuf::from(input), radius, sigma, output))
}

fn run(
    input_path: &PathBuf,
    radius: u32,
    sigma: f32,
    output_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let params = BlurParams::new(radius, sigma);
    params.validate()?;

    // Decode and force RGBA: sources without an alpha channel get an
    // opaque one so the buffer-layout invariant (w * h * 4) holds.
    let decoded = image::open(input_path)?.to_rgba8();
    let (width, height) = decoded.dimensions();
    let src = Image::from_raw_bytes(width as usize, height as usize, decoded.into_raw())?;
    eprintln!("[gridblur] loaded {} ({width}×{height})", input_path.display());

    let gpu = GpuDevice::new()?;
    eprintln!("[gridblur] using {}", gpu.adapter_info);

    let pipeline = GpuBlurPipeline::new(&gpu);
    let out = pipeline.run(&gpu, &src, &params)?;

    let output_path = output_path.unwrap_or_else(|| generated_filename(radius, sigma));
    let buf = image::RgbaImage::from_raw(width, height, out.as_bytes().to_vec())
        .expect("output buffer length matches dimensions");
    buf.save(&output_path)?;

    println!("{}", output_path.display());
    Ok(())
}

/// Filename embedding the blur parameters, plus a four-digit suffix so
/// repeated runs on the same input don't overwrite each other.
fn generated_filename(radius: u32, sigma: f32) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_micros() % 10_000)
        .unwrap_or(0);
    PathBuf::from(format!(
        "GaussianBlur_Radius{radius}_Sigma{sigma}_{suffix:04}.png"
    ))
}
