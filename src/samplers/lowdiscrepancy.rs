use crate::core::prelude::*;

use super::pixel_order::*;
use super::sample::*;
use super::MapCache;
use super::Sampler;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Stratified low-discrepancy sampler: walks a shared pixel visitation
/// order and emits a full scrambled-shuffled sample batch per pixel.
#[derive(Debug)]
pub struct LDSampler {
    layout: Arc<SampleLayout>,
    film: Arc<Film>,
    pixel_bounds: Bounds2i,
    pixel_samples: u32,
    order: PixelOrder,
    // Shared visitation cursor; fetch-and-increment hands out the next
    // unvisited pixel index modulo the pixel count.
    pixel_cursor: AtomicUsize,
}

/// Per-sample batch state of the LD sampler.
#[derive(Debug, Clone)]
pub struct LDData {
    pixel: Point2i,
    batch_pos: u32,
    image_samples: Vec<Point2f>,
    lens_samples: Vec<Point2f>,
    time_samples: Vec<Float>,
    wavelengths_samples: Vec<Float>,
    samples_1d: Vec<Vec<Float>>,
    samples_2d: Vec<Vec<Point2f>>,
    samples_lazy: Vec<Vec<Float>>,
    map: MapCache,
}

impl LDSampler {
    pub fn new(
        pixel_bounds: &Bounds2i,
        pixel_samples: u32,
        pixel_order: PixelOrderKind,
        layout: &Arc<SampleLayout>,
        film: &Arc<Film>,
    ) -> Self {
        let rounded = round_up_pow2(u32::max(pixel_samples, 1));
        if !is_power_of_2(pixel_samples) {
            log::warn!(
                "Pixel samples being rounded up to power of 2 (from {} to {}).",
                pixel_samples,
                rounded
            );
        }
        LDSampler {
            layout: layout.clone(),
            film: film.clone(),
            pixel_bounds: *pixel_bounds,
            pixel_samples: rounded,
            order: PixelOrder::new(pixel_order, pixel_bounds),
            pixel_cursor: AtomicUsize::new(0),
        }
    }

    pub fn pixel_samples(&self) -> u32 {
        return self.pixel_samples;
    }

    pub(crate) fn init_sample(&self, seed: u64) -> Sample {
        let batch = self.pixel_samples as usize;
        let layout = &self.layout;
        let data = LDData {
            pixel: self.pixel_bounds.min,
            // One past the last slot, so the first call opens a batch.
            batch_pos: self.pixel_samples,
            image_samples: vec![Point2f::zero(); batch],
            lens_samples: vec![Point2f::zero(); batch],
            time_samples: vec![0.0; batch],
            wavelengths_samples: vec![0.0; batch],
            samples_1d: (0..layout.n_1d_streams())
                .map(|i| vec![0.0; layout.count_1d(i) as usize * batch])
                .collect(),
            samples_2d: (0..layout.n_2d_streams())
                .map(|i| vec![Point2f::zero(); layout.count_2d(i) as usize * batch])
                .collect(),
            samples_lazy: (0..layout.n_lazy_streams())
                .map(|i| {
                    vec![
                        0.0;
                        (layout.lazy_width(i) * layout.lazy_max_instances(i)) as usize * batch
                    ]
                })
                .collect(),
            map: MapCache::default(),
        };
        return Sample::new(RNG::new_sequence(seed), SamplerData::LowDiscrepancy(data));
    }

    pub(crate) fn get_next_sample(&self, sample: &mut Sample) -> bool {
        let SamplerData::LowDiscrepancy(data) = &mut sample.data else {
            panic!("sample was not created by this sampler");
        };
        data.batch_pos += 1;
        if data.batch_pos >= self.pixel_samples {
            let index = self.pixel_cursor.fetch_add(1, Ordering::Relaxed);
            if index >= self.order.len() && self.film.enough_samples() {
                return false;
            }
            data.map.refresh(&self.film);
            data.pixel = if let Some(map) = data.map.map() {
                // Sticky: once a map version has been observed for this
                // state, enumeration is never resumed.
                let u = Point2f::new(sample.rng.uniform_float(), sample.rng.uniform_float());
                let (p, _pdf) = map.sample_continuous(&u);
                let fp = self.pixel_bounds.to_float().lerp(&p);
                Point2i::new(
                    i32::min(fp.x.floor() as i32, self.pixel_bounds.max.x - 1),
                    i32::min(fp.y.floor() as i32, self.pixel_bounds.max.y - 1),
                )
            } else {
                self.order.pixel(index)
            };
            self.generate_batch(data, &mut sample.rng);
            data.batch_pos = 0;
        }
        let i = data.batch_pos as usize;
        sample.image_x = clamp_half_open(
            data.pixel.x as Float + data.image_samples[i].x,
            data.pixel.x as Float,
            (data.pixel.x + 1) as Float,
        );
        sample.image_y = clamp_half_open(
            data.pixel.y as Float + data.image_samples[i].y,
            data.pixel.y as Float,
            (data.pixel.y + 1) as Float,
        );
        sample.lens_u = data.lens_samples[i].x;
        sample.lens_v = data.lens_samples[i].y;
        sample.time = data.time_samples[i];
        sample.wavelengths = data.wavelengths_samples[i];
        return true;
    }

    fn generate_batch(&self, data: &mut LDData, rng: &mut RNG) {
        let batch = self.pixel_samples as usize;
        let layout = &self.layout;
        ld_shuffle_scrambled_2d(1, batch, &mut data.image_samples, rng);
        ld_shuffle_scrambled_2d(1, batch, &mut data.lens_samples, rng);
        ld_shuffle_scrambled_1d(1, batch, &mut data.time_samples, rng);
        ld_shuffle_scrambled_1d(1, batch, &mut data.wavelengths_samples, rng);
        for i in 0..layout.n_1d_streams() {
            ld_shuffle_scrambled_1d(
                layout.count_1d(i) as usize,
                batch,
                &mut data.samples_1d[i],
                rng,
            );
        }
        for i in 0..layout.n_2d_streams() {
            ld_shuffle_scrambled_2d(
                layout.count_2d(i) as usize,
                batch,
                &mut data.samples_2d[i],
                rng,
            );
        }
        for i in 0..layout.n_lazy_streams() {
            ld_shuffle_scrambled_1d(
                (layout.lazy_width(i) * layout.lazy_max_instances(i)) as usize,
                batch,
                &mut data.samples_lazy[i],
                rng,
            );
        }
    }

    pub(crate) fn get_1d(&self, sample: &Sample, num: usize, pos: usize) -> Float {
        let SamplerData::LowDiscrepancy(data) = &sample.data else {
            panic!("sample was not created by this sampler");
        };
        let width = self.layout.count_1d(num) as usize;
        return data.samples_1d[num][data.batch_pos as usize * width + pos];
    }

    pub(crate) fn get_2d(&self, sample: &Sample, num: usize, pos: usize) -> Point2f {
        let SamplerData::LowDiscrepancy(data) = &sample.data else {
            panic!("sample was not created by this sampler");
        };
        let width = self.layout.count_2d(num) as usize;
        return data.samples_2d[num][data.batch_pos as usize * width + pos];
    }

    pub(crate) fn get_lazy_values<'a>(
        &self,
        sample: &'a mut Sample,
        num: usize,
        pos: usize,
    ) -> &'a [Float] {
        let SamplerData::LowDiscrepancy(data) = &sample.data else {
            panic!("sample was not created by this sampler");
        };
        let width = self.layout.lazy_width(num) as usize;
        let stride = width * self.layout.lazy_max_instances(num) as usize;
        let start = data.batch_pos as usize * stride + pos * width;
        return &data.samples_lazy[num][start..(start + width)];
    }
}

pub fn create_lowdiscrepancy_sampler(
    params: &ParamSet,
    layout: &Arc<SampleLayout>,
    film: &Arc<Film>,
) -> Result<Sampler, LuxError> {
    let nsamp = i32::max(params.find_one_int("pixelsamples", 4), 1) as u32;
    let order_name = params.find_one_string("pixelsampler", "hilbert");
    let order = parse_pixel_order(&order_name)?;
    if params.find_one_bool("noiseaware", false) {
        film.enable_noise_aware_map();
    }
    let bounds = film.pixel_bounds();
    return Ok(Sampler::LowDiscrepancy(LDSampler::new(
        &bounds, nsamp, order, layout, film,
    )));
}
