use crate::core::prelude::*;

use super::sample::*;
use super::MapCache;
use super::Sampler;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Sobol sequence sampler: one sample per monotonically increasing
/// pass index from a single shared sequence, no per-pixel batching.
#[derive(Debug)]
pub struct SobolSampler {
    layout: Arc<SampleLayout>,
    film: Arc<Film>,
    pixel_bounds: Bounds2i,
    pass: AtomicU64,
}

/// Per-sample state of the Sobol sampler: the pass in flight, the two
/// fixed rotation scalars and scratch room for the requested streams.
#[derive(Debug, Clone)]
pub struct SobolData {
    rng0: Float,
    rng1: Float,
    pass: u64,
    values_1d: Vec<Vec<Float>>,
    values_2d: Vec<Vec<Point2f>>,
    values_lazy: Vec<Vec<Float>>,
    lazy_filled: Vec<bool>,
    map: MapCache,
}

#[inline]
fn rotated_dim(pass: u64, rng0: Float, rng1: Float, dim: u32) -> Float {
    let v = sobol_sample(pass, dim);
    let r = if dim & 1 == 0 { rng0 } else { rng1 };
    return cranley_patterson(v, r);
}

impl SobolSampler {
    pub fn new(pixel_bounds: &Bounds2i, layout: &Arc<SampleLayout>, film: &Arc<Film>) -> Self {
        SobolSampler {
            layout: layout.clone(),
            film: film.clone(),
            pixel_bounds: *pixel_bounds,
            pass: AtomicU64::new(0),
        }
    }

    pub(crate) fn init_sample(&self, seed: u64) -> Sample {
        let mut rng = RNG::new_sequence(seed);
        let layout = &self.layout;
        // The Cranley-Patterson rotation scalars are drawn once for the
        // lifetime of this state.
        let rng0 = rng.uniform_float();
        let rng1 = rng.uniform_float();
        let data = SobolData {
            rng0,
            rng1,
            pass: 0,
            values_1d: (0..layout.n_1d_streams())
                .map(|i| vec![0.0; layout.count_1d(i) as usize])
                .collect(),
            values_2d: (0..layout.n_2d_streams())
                .map(|i| vec![Point2f::zero(); layout.count_2d(i) as usize])
                .collect(),
            values_lazy: (0..layout.n_lazy_streams())
                .map(|i| vec![0.0; (layout.lazy_width(i) * layout.lazy_max_instances(i)) as usize])
                .collect(),
            lazy_filled: vec![false; layout.n_lazy_streams()],
            map: MapCache::default(),
        };
        return Sample::new(rng, SamplerData::Sobol(data));
    }

    pub(crate) fn get_next_sample(&self, sample: &mut Sample) -> bool {
        if self.film.enough_samples() {
            return false;
        }
        let SamplerData::Sobol(data) = &mut sample.data else {
            panic!("sample was not created by this sampler");
        };
        data.pass = self.pass.fetch_add(1, Ordering::Relaxed);
        data.map.refresh(&self.film);
        let (pass, rng0, rng1) = (data.pass, data.rng0, data.rng1);
        let u0 = rotated_dim(pass, rng0, rng1, 0);
        let u1 = rotated_dim(pass, rng0, rng1, 1);
        let bounds = self.pixel_bounds.to_float();
        let p = if let Some(map) = data.map.map() {
            let (p, _pdf) = map.sample_continuous(&Point2f::new(u0, u1));
            bounds.lerp(&p)
        } else {
            bounds.lerp(&Point2f::new(u0, u1))
        };
        sample.image_x = clamp_half_open(p.x, bounds.min.x, bounds.max.x);
        sample.image_y = clamp_half_open(p.y, bounds.min.y, bounds.max.y);
        sample.lens_u = rotated_dim(pass, rng0, rng1, 2);
        sample.lens_v = rotated_dim(pass, rng0, rng1, 3);
        sample.time = rotated_dim(pass, rng0, rng1, 4);
        sample.wavelengths = rotated_dim(pass, rng0, rng1, 5);
        let layout = &self.layout;
        for num in 0..layout.n_1d_streams() {
            for pos in 0..layout.count_1d(num) as usize {
                data.values_1d[num][pos] =
                    rotated_dim(pass, rng0, rng1, layout.offset_1d(num, pos));
            }
        }
        for num in 0..layout.n_2d_streams() {
            for pos in 0..layout.count_2d(num) as usize {
                let dim = layout.offset_2d(num, pos);
                data.values_2d[num][pos] = Point2f::new(
                    rotated_dim(pass, rng0, rng1, dim),
                    rotated_dim(pass, rng0, rng1, dim + 1),
                );
            }
        }
        for filled in data.lazy_filled.iter_mut() {
            *filled = false;
        }
        return true;
    }

    pub(crate) fn get_1d(&self, sample: &Sample, num: usize, pos: usize) -> Float {
        let SamplerData::Sobol(data) = &sample.data else {
            panic!("sample was not created by this sampler");
        };
        return data.values_1d[num][pos];
    }

    pub(crate) fn get_2d(&self, sample: &Sample, num: usize, pos: usize) -> Point2f {
        let SamplerData::Sobol(data) = &sample.data else {
            panic!("sample was not created by this sampler");
        };
        return data.values_2d[num][pos];
    }

    pub(crate) fn get_lazy_values<'a>(
        &self,
        sample: &'a mut Sample,
        num: usize,
        pos: usize,
    ) -> &'a [Float] {
        let SamplerData::Sobol(data) = &mut sample.data else {
            panic!("sample was not created by this sampler");
        };
        let layout = &self.layout;
        let width = layout.lazy_width(num) as usize;
        if !data.lazy_filled[num] {
            let (pass, rng0, rng1) = (data.pass, data.rng0, data.rng1);
            for instance in 0..layout.lazy_max_instances(num) as usize {
                let dim = layout.offset_lazy(num, instance);
                for i in 0..width {
                    data.values_lazy[num][instance * width + i] =
                        rotated_dim(pass, rng0, rng1, dim + i as u32);
                }
            }
            data.lazy_filled[num] = true;
        }
        return &data.values_lazy[num][(pos * width)..((pos + 1) * width)];
    }
}

pub fn create_sobol_sampler(
    params: &ParamSet,
    layout: &Arc<SampleLayout>,
    film: &Arc<Film>,
) -> Result<Sampler, LuxError> {
    if params.find_one_bool("noiseaware", false) {
        film.enable_noise_aware_map();
    }
    let bounds = film.pixel_bounds();
    return Ok(Sampler::Sobol(SobolSampler::new(&bounds, layout, film)));
}
