use clap::*;
use log::*;

use lux_rs::core::prelude::*;
use lux_rs::samplers::*;

use rayon::iter::IntoParallelIterator;
use rayon::iter::ParallelIterator;

use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::available_parallelism;

const PROGRESS_BATCH: u64 = 4096;

#[derive(Debug, Parser)]
#[clap(author, about, version)]
struct CommandOptions {
    /// Image width in pixels.
    #[arg(long, default_value = "384")]
    pub width: u32,

    /// Image height in pixels.
    #[arg(long, default_value = "256")]
    pub height: u32,

    /// Sampler to use: lowdiscrepancy, sobol or metropolis.
    #[arg(short, long, default_value = "metropolis")]
    pub sampler: String,

    /// Samples per pixel; for the metropolis sampler this sets the
    /// total proposal budget.
    #[arg(long, default_value = "32")]
    pub pixelsamples: u32,

    /// Pixel visitation order for the lowdiscrepancy sampler:
    /// linear, tile or hilbert.
    #[arg(long, default_value = "hilbert")]
    pub pixelorder: String,

    /// Probability of a large mutation.
    #[arg(long, default_value = "0.4")]
    pub largemutationprob: f32,

    /// Mutation range in pixels.
    #[arg(long, value_name = "pixels")]
    pub mutationrange: Option<f32>,

    /// Maximum consecutive rejections before a forced accept.
    #[arg(long, default_value = "512")]
    pub maxconsecrejects: u32,

    /// Disable the metropolis start-up cooldown phase.
    #[arg(long, default_value = "false")]
    pub nocooldown: bool,

    /// Grayscale image installed as the user sampling map.
    #[arg(long, value_name = "filename")]
    pub samplingmap: Option<PathBuf>,

    /// Use specified number of threads for rendering.
    #[arg(short = 'j', long = "nthreads", value_name = "num")]
    pub nthreads: Option<usize>,

    /// Write the rendered image to the given filename.
    #[arg(short, long, default_value = "luxrs.png")]
    pub outfile: PathBuf,

    /// Suppress all text output other than error messages.
    #[arg(long, default_value = "false")]
    pub quiet: bool,
}

/// Procedural stand-in for the light transport integrator: a few
/// emitters over the image plane, defocused by the lens coordinates,
/// tinted by the wavelength coordinate and jittered by one lazy bounce
/// sub-vector.
fn evaluate_radiance(sampler: &Sampler, sample: &mut Sample, width: u32, height: u32) -> Contribution {
    let u = sample.image_x / width as Float;
    let v = sample.image_y / height as Float;
    let defocus = sampler.get_2d(sample, 0, 0);
    let glow = sampler.get_1d(sample, 0, 0);
    let bounce_index = usize::min((sample.time * 4.0) as usize, 3);
    let bounce = sampler.get_lazy_values(sample, 0, bounce_index);
    let (bx, by) = (bounce[0], bounce[1]);

    let mut value = 0.0;
    let emitters: [(Float, Float, Float, Float); 3] = [
        (0.30, 0.40, 0.055, 3.0),
        (0.68, 0.55, 0.035, 5.0),
        (0.52, 0.25, 0.020, 8.0),
    ];
    for (ex, ey, radius, power) in emitters {
        let dx = u - ex + 0.01 * (defocus.x - 0.5) + 0.02 * (bx - 0.5);
        let dy = v - ey + 0.01 * (defocus.y - 0.5) + 0.02 * (by - 0.5);
        let d2 = dx * dx + dy * dy;
        value += power * Float::exp(-d2 / (radius * radius));
    }
    value += 0.05 + 0.1 * glow * (1.0 - v);

    // Map the wavelength coordinate to a warm/cold tint.
    let w = sample.wavelengths;
    let color = RGBColor::new(
        value * (0.6 + 0.4 * w),
        value * 0.8,
        value * (1.0 - 0.4 * w),
    );
    return Contribution::new(sample.image_x, sample.image_y, color);
}

fn render(sampler: &Arc<Sampler>, film: &Arc<Film>, opts: &CommandOptions) {
    let total_samples =
        (opts.width as u64) * (opts.height as u64) * u64::max(opts.pixelsamples as u64, 1);
    let n_threads = opts
        .nthreads
        .unwrap_or_else(|| available_parallelism().map(|n| n.get()).unwrap_or(1));
    let n_threads = usize::max(n_threads, 1);
    info!(
        "Rendering {} samples with the {} sampler on {} threads.",
        total_samples, opts.sampler, n_threads
    );
    let reporter = if opts.quiet {
        Arc::new(ProgressReporter::hidden())
    } else {
        Arc::new(ProgressReporter::new(total_samples as usize, "Rendering"))
    };
    let taken = Arc::new(AtomicU64::new(0));
    let width = opts.width;
    let height = opts.height;
    let is_mutating = sampler.is_mutating();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build()
        .unwrap();
    pool.install(|| {
        (0..n_threads as u64).into_par_iter().for_each(|thread_index| {
            let sampler = sampler.clone();
            let film = film.clone();
            let reporter = reporter.clone();
            let taken = taken.clone();
            let mut sample = sampler.init_sample(thread_index);
            let mut local: u64 = 0;
            loop {
                let done = taken.fetch_add(1, Ordering::Relaxed);
                if done >= total_samples {
                    film.set_enough_samples(true);
                }
                if !sampler.get_next_sample(&mut sample) {
                    break;
                }
                let contribution = evaluate_radiance(&sampler, &mut sample, width, height);
                if is_mutating {
                    sample.add_contribution(contribution);
                    sampler.add_sample(&mut sample);
                } else {
                    film.add_contribution(&contribution, 1.0);
                    film.add_sample_count(1);
                }
                local += 1;
                if local % PROGRESS_BATCH == 0 {
                    reporter.update(PROGRESS_BATCH as usize);
                }
            }
            reporter.update((local % PROGRESS_BATCH) as usize);
        });
    });
    reporter.done();
}

fn write_image(film: &Film, opts: &CommandOptions, is_mutating: bool) -> Result<(), LuxError> {
    let pixels = film.pixels();
    let width = film.width();
    let height = film.height();
    // The metropolis buffer stores unnormalized chain mass; expose it
    // relative to its peak. The other samplers average by weight.
    let mut values = vec![[0.0 as Float; 3]; pixels.len()];
    let mut peak: Float = 0.0;
    for (i, pixel) in pixels.iter().enumerate() {
        let c = if is_mutating {
            pixel.c
        } else if pixel.weight_sum > 0.0 {
            [
                pixel.c[0] / pixel.weight_sum,
                pixel.c[1] / pixel.weight_sum,
                pixel.c[2] / pixel.weight_sum,
            ]
        } else {
            [0.0, 0.0, 0.0]
        };
        peak = Float::max(peak, Float::max(c[0], Float::max(c[1], c[2])));
        values[i] = c;
    }
    let scale = if is_mutating && peak > 0.0 {
        1.0 / peak
    } else {
        1.0
    };
    let mut image = image::RgbImage::new(width as u32, height as u32);
    for (i, value) in values.iter().enumerate() {
        let x = (i % width) as u32;
        let y = (i / width) as u32;
        let mut rgb = [0u8; 3];
        for k in 0..3 {
            let v = gamma_correct(Float::clamp(value[k] * scale, 0.0, 1.0));
            rgb[k] = (v * 255.0 + 0.5) as u8;
        }
        image.put_pixel(x, y, image::Rgb(rgb));
    }
    image.save(&opts.outfile)?;
    info!("Wrote {}.", opts.outfile.display());
    Ok(())
}

fn load_sampling_map(film: &Film, path: &PathBuf) -> Result<(), LuxError> {
    let img = image::open(path)?.to_luma32f();
    let (w, h) = (img.width() as usize, img.height() as usize);
    let func: Vec<Float> = img.into_raw().iter().map(|v| *v as Float).collect();
    film.set_user_sampling_map(&func, w, h)?;
    info!("Installed user sampling map from {}.", path.display());
    Ok(())
}

fn run(opts: &CommandOptions) -> Result<(), LuxError> {
    if opts.width == 0 || opts.height == 0 {
        return Err(LuxError::error("Image resolution must be non-zero."));
    }
    let bounds = Bounds2i::from(((0, 0), (opts.width as i32, opts.height as i32)));
    let film = Arc::new(Film::new(&bounds));
    if let Some(path) = &opts.samplingmap {
        load_sampling_map(&film, path)?;
    }

    // The transport stand-in requests one 1D stream, one 2D stream and
    // one lazy bounce stream before rendering starts.
    let mut layout = SampleLayout::new();
    layout.add_1d(1);
    layout.add_2d(1);
    layout.add_lazy(2, 4);
    let layout = layout.freeze();

    let mut params = ParamSet::new();
    params.add_int("pixelsamples", opts.pixelsamples as i32);
    params.add_string("pixelsampler", &opts.pixelorder);
    params.add_float("largemutationprob", opts.largemutationprob as Float);
    params.add_int("maxconsecrejects", opts.maxconsecrejects as i32);
    params.add_bool("usecooldown", !opts.nocooldown);
    if let Some(range) = opts.mutationrange {
        params.add_float("mutationrange", range as Float);
    }
    let sampler = Arc::new(create_sampler(&opts.sampler, &params, &layout, &film)?);

    render(&sampler, &film, opts);
    write_image(&film, opts, sampler.is_mutating())?;
    Ok(())
}

fn main() {
    let opts = CommandOptions::parse();
    let level = if opts.quiet { "error" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    if let Err(e) = run(&opts) {
        error!("{}", e);
        process::exit(1);
    }
}
