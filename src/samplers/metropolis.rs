use crate::core::prelude::*;

use super::sample::*;
use super::MapCache;
use super::Sampler;

use std::sync::Arc;

const STAMP_NEVER: u32 = u32::MAX;

const MUTATE_S1: Float = 1.0 / 1024.0;
const MUTATE_S2: Float = 1.0 / 64.0;
const MUTATE_SCALED_S1: Float = 32.0;

/// Two-scale symmetric perturbation on [0, 1) with wraparound; the
/// magnitude itself comes from the uniform input, so most steps are
/// small with an occasional large jump.
fn mutate(x: Float, u: Float) -> Float {
    let dx = MUTATE_S1 / (MUTATE_S1 / MUTATE_S2 + Float::abs(2.0 * u - 1.0))
        - MUTATE_S1 / (MUTATE_S1 / MUTATE_S2 + 1.0);
    let mutated = if u < 0.5 {
        let x1 = x + dx;
        if x1 < 1.0 {
            x1
        } else {
            x1 - 1.0
        }
    } else {
        let x1 = x - dx;
        if x1 < 0.0 {
            x1 + 1.0
        } else {
            x1
        }
    };
    if (0.0..1.0).contains(&mutated) {
        return mutated;
    }
    return x;
}

/// Bounded variant: perturb within [lo, hi) with a caller-supplied
/// radius, wrapping at the interval ends.
fn mutate_scaled(x: Float, u: Float, lo: Float, hi: Float, range: Float) -> Float {
    let range = Float::min(range, hi - lo);
    let s1 = MUTATE_SCALED_S1;
    let dx = range / (s1 / (1.0 + s1) + (s1 * s1) / (1.0 + s1) * Float::abs(2.0 * u - 1.0))
        - range / s1;
    let mutated = if u < 0.5 {
        let x1 = x + dx;
        if x1 < hi {
            x1
        } else {
            lo + (x1 - hi)
        }
    } else {
        let x1 = x - dx;
        if x1 < lo {
            hi - (lo - x1)
        } else {
            x1
        }
    };
    if mutated >= lo && mutated < hi {
        return mutated;
    }
    return x;
}

/// Metropolis-Hastings sampler over the random-number vector defining
/// one transport sample. One chain per in-flight `Sample`; chains never
/// share state.
#[derive(Debug)]
pub struct MetropolisSampler {
    layout: Arc<SampleLayout>,
    film: Arc<Film>,
    pixel_bounds: Bounds2i,
    max_consec_rejects: u32,
    large_mutation_prob: Float,
    mutation_range: Float,
    use_variance: bool,
    use_cooldown: bool,
    // Large samples per chain before the start-up phase ends.
    cooldown_threshold: u64,
}

/// One Markov chain: proposed and accepted state vectors, lazy stamp
/// arrays, and the accept/reject bookkeeping.
#[derive(Debug, Clone)]
pub struct MetropolisData {
    seq: RotatedSequence,
    sample_image: Vec<Float>,
    current_image: Vec<Float>,
    time_image: Vec<u32>,
    current_time_image: Vec<u32>,
    stamp: u32,
    current_stamp: u32,
    rng_origin: u32,
    current_rng_origin: u32,
    large: bool,
    next_large: bool,
    weight: Float,
    ly: Float,
    total_ly: f64,
    large_count: u64,
    consec_rejects: u32,
    cooling_down: bool,
    current_contributions: Vec<Contribution>,
    map: MapCache,
}

impl MetropolisSampler {
    pub fn new(
        pixel_bounds: &Bounds2i,
        max_consec_rejects: u32,
        large_mutation_prob: Float,
        mutation_range: Float,
        use_variance: bool,
        use_cooldown: bool,
        layout: &Arc<SampleLayout>,
        film: &Arc<Film>,
    ) -> Self {
        let area = i32::max(pixel_bounds.area(), 1) as u64;
        let large_mutation_prob = Float::clamp(large_mutation_prob, 0.01, 1.0);
        let cooldown_threshold = u64::max(
            Float::ceil(area as Float * large_mutation_prob) as u64,
            1,
        );
        MetropolisSampler {
            layout: layout.clone(),
            film: film.clone(),
            pixel_bounds: *pixel_bounds,
            max_consec_rejects,
            large_mutation_prob,
            mutation_range,
            use_variance,
            use_cooldown,
            cooldown_threshold,
        }
    }

    pub(crate) fn init_sample(&self, seed: u64) -> Sample {
        let mut rng = RNG::new_sequence(seed);
        let total = self.layout.total_dims() as usize;
        let instances = self.layout.lazy_instance_count() as usize;
        let data = MetropolisData {
            seq: RotatedSequence::new(self.layout.total_dims(), &mut rng),
            sample_image: vec![0.0; total],
            current_image: vec![0.0; total],
            time_image: vec![STAMP_NEVER; instances],
            current_time_image: vec![STAMP_NEVER; instances],
            stamp: 0,
            current_stamp: 0,
            rng_origin: 0,
            current_rng_origin: 0,
            large: true,
            next_large: true,
            weight: 0.0,
            ly: 0.0,
            total_ly: 0.0,
            large_count: 0,
            consec_rejects: 0,
            cooling_down: self.use_cooldown,
            current_contributions: Vec::new(),
            map: MapCache::default(),
        };
        return Sample::new(rng, SamplerData::Metropolis(data));
    }

    pub(crate) fn get_next_sample(&self, sample: &mut Sample) -> bool {
        if self.film.enough_samples() {
            return false;
        }
        let SamplerData::Metropolis(data) = &mut sample.data else {
            panic!("sample was not created by this sampler");
        };
        data.large = data.next_large;
        data.seq.advance(&mut sample.rng);
        let bounds = self.pixel_bounds.to_float();
        let normal_dims = self.layout.normal_dims() as usize;
        if data.large {
            // Full independent redraw; lazy sub-vectors are only marked
            // and reconciled on demand.
            data.stamp = 0;
            data.rng_origin = data.seq.base();
            for t in data.time_image.iter_mut() {
                *t = STAMP_NEVER;
            }
            data.map.refresh(&self.film);
            let u0 = data.seq.get(0);
            let u1 = data.seq.get(1);
            let p = if let Some(map) = data.map.map() {
                let (p, _pdf) = map.sample_continuous(&Point2f::new(u0, u1));
                bounds.lerp(&p)
            } else {
                bounds.lerp(&Point2f::new(u0, u1))
            };
            data.sample_image[0] = clamp_half_open(p.x, bounds.min.x, bounds.max.x);
            data.sample_image[1] = clamp_half_open(p.y, bounds.min.y, bounds.max.y);
            for dim in 2..normal_dims {
                data.sample_image[dim] = data.seq.get(dim as u32);
            }
        } else {
            data.stamp = data.current_stamp + 1;
            data.sample_image[0] = mutate_scaled(
                data.current_image[0],
                data.seq.get(0),
                bounds.min.x,
                bounds.max.x,
                self.mutation_range,
            );
            data.sample_image[1] = mutate_scaled(
                data.current_image[1],
                data.seq.get(1),
                bounds.min.y,
                bounds.max.y,
                self.mutation_range,
            );
            for dim in 2..SAMPLE_BASE_DIMS as usize {
                data.sample_image[dim] =
                    mutate_scaled(data.current_image[dim], data.seq.get(dim as u32), 0.0, 1.0, 0.5);
            }
            for dim in SAMPLE_BASE_DIMS as usize..normal_dims {
                data.sample_image[dim] = mutate(data.current_image[dim], data.seq.get(dim as u32));
            }
        }
        sample.image_x = data.sample_image[0];
        sample.image_y = data.sample_image[1];
        sample.lens_u = data.sample_image[2];
        sample.lens_v = data.sample_image[3];
        sample.time = data.sample_image[4];
        sample.wavelengths = data.sample_image[5];
        return true;
    }

    pub(crate) fn get_1d(&self, sample: &Sample, num: usize, pos: usize) -> Float {
        let SamplerData::Metropolis(data) = &sample.data else {
            panic!("sample was not created by this sampler");
        };
        return data.sample_image[self.layout.offset_1d(num, pos) as usize];
    }

    pub(crate) fn get_2d(&self, sample: &Sample, num: usize, pos: usize) -> Point2f {
        let SamplerData::Metropolis(data) = &sample.data else {
            panic!("sample was not created by this sampler");
        };
        let dim = self.layout.offset_2d(num, pos) as usize;
        return Point2f::new(data.sample_image[dim], data.sample_image[dim + 1]);
    }

    /// Reconcile one lazy sub-vector with the proposal in flight, then
    /// return it. On a large proposal it is redrawn; on small proposals
    /// it is seeded or advanced one keyed perturbation per missing
    /// stamp, so the result is the same whether or not earlier
    /// proposals consumed it.
    pub(crate) fn get_lazy_values<'a>(
        &self,
        sample: &'a mut Sample,
        num: usize,
        pos: usize,
    ) -> &'a [Float] {
        let SamplerData::Metropolis(data) = &mut sample.data else {
            panic!("sample was not created by this sampler");
        };
        let off = self.layout.offset_lazy(num, pos) as usize;
        let width = self.layout.lazy_width(num) as usize;
        let t = self.layout.time_offset_lazy(num, pos) as usize;
        if data.time_image[t] != data.stamp {
            if data.large {
                // Uniform redraw, addressed exactly as if the large
                // step had drawn these dimensions eagerly.
                for i in 0..width {
                    data.sample_image[off + i] =
                        data.seq.get_keyed(data.rng_origin, 0, (off + i) as u32);
                }
            } else {
                let mut time;
                if data.current_time_image[t] == STAMP_NEVER {
                    // Never consumed this epoch: reconstruct the
                    // epoch's seed, then replay every missed step.
                    for i in 0..width {
                        data.sample_image[off + i] =
                            data.seq.get_keyed(data.rng_origin, 0, (off + i) as u32);
                    }
                    time = 0;
                } else {
                    for i in 0..width {
                        data.sample_image[off + i] = data.current_image[off + i];
                    }
                    time = data.current_time_image[t];
                }
                // Keyed draws make the catch-up identical to having
                // mutated this sub-vector on every proposal.
                while time < data.stamp {
                    time += 1;
                    for i in 0..width {
                        let u = data.seq.get_keyed(data.rng_origin, time, (off + i) as u32);
                        data.sample_image[off + i] = mutate(data.sample_image[off + i], u);
                    }
                }
            }
            data.time_image[t] = data.stamp;
        }
        return &data.sample_image[off..(off + width)];
    }

    /// Accept/reject step: weighs the proposal against the last
    /// accepted sample, flushes whichever side loses its pending
    /// weight, and picks the next mutation kind.
    pub(crate) fn add_sample(&self, sample: &mut Sample) {
        let SamplerData::Metropolis(data) = &mut sample.data else {
            panic!("sample was not created by this sampler");
        };
        let bounds = self.pixel_bounds.to_float();
        // Sum luminances; non-finite or non-positive entries become
        // zero-weight bins and are excluded from the sum.
        let mut new_ly: f64 = 0.0;
        for contribution in sample.contributions.iter_mut() {
            let l = contribution.color.y();
            if l.is_finite() && l > 0.0 {
                let mut w = l;
                if self.use_variance && contribution.variance > 0.0 {
                    w *= contribution.variance;
                }
                if let Some(map) = data.map.map() {
                    let p = bounds.offset(&Point2f::new(
                        contribution.image_x,
                        contribution.image_y,
                    ));
                    w *= map.density(&p);
                }
                new_ly += w as f64;
            } else {
                contribution.color = RGBColor::zero();
            }
        }
        let new_ly = new_ly as Float;
        if data.large {
            data.total_ly += new_ly as f64;
            data.large_count += 1;
        }
        let mean_intensity = if data.large_count > 0 && data.total_ly > 0.0 {
            (data.total_ly / data.large_count as f64) as Float
        } else {
            1.0
        };
        let accept_prob = if data.ly > 0.0 && data.consec_rejects < self.max_consec_rejects {
            Float::min(1.0, new_ly / data.ly)
        } else {
            1.0
        };
        let candidate_weight = accept_prob + if data.large { 1.0 } else { 0.0 };
        data.weight += 1.0 - accept_prob;
        let p_large_eff = if data.cooling_down {
            0.5
        } else {
            self.large_mutation_prob
        };
        let accepted = accept_prob == 1.0 || sample.rng.uniform_float() < accept_prob;
        if accepted {
            // Flush the sample accepted one step back; its pending
            // weight carries the chain's dwell time.
            let norm = data.ly / mean_intensity + p_large_eff;
            if norm > 0.0 && norm.is_finite() {
                let flush_weight = data.weight / norm;
                if flush_weight > 0.0 && flush_weight.is_finite() {
                    for contribution in data.current_contributions.iter() {
                        self.film.add_contribution(contribution, flush_weight);
                    }
                }
            }
            data.weight = candidate_weight;
            data.ly = new_ly;
            std::mem::swap(&mut data.sample_image, &mut data.current_image);
            std::mem::swap(&mut data.time_image, &mut data.current_time_image);
            data.current_stamp = data.stamp;
            data.current_rng_origin = data.rng_origin;
            data.current_contributions.clear();
            data.current_contributions.append(&mut sample.contributions);
            data.consec_rejects = 0;
        } else {
            // The rejected proposal flushes immediately with its own
            // candidate weight.
            let norm = new_ly / mean_intensity + p_large_eff;
            if norm > 0.0 && norm.is_finite() {
                let flush_weight = candidate_weight / norm;
                if flush_weight > 0.0 && flush_weight.is_finite() {
                    for contribution in sample.contributions.iter() {
                        self.film.add_contribution(contribution, flush_weight);
                    }
                }
            }
            data.stamp = data.current_stamp;
            data.rng_origin = data.current_rng_origin;
            sample.contributions.clear();
            data.consec_rejects += 1;
        }
        self.film.add_sample_count(1);
        if data.cooling_down && data.large_count >= self.cooldown_threshold {
            data.cooling_down = false;
        }
        let p_next = if data.cooling_down {
            0.5
        } else {
            self.large_mutation_prob
        };
        data.next_large = sample.rng.uniform_float() < p_next;
    }
}

pub fn create_metropolis_sampler(
    params: &ParamSet,
    layout: &Arc<SampleLayout>,
    film: &Arc<Film>,
) -> Result<Sampler, LuxError> {
    let bounds = film.pixel_bounds();
    let diag = bounds.diagonal();
    let max_consec_rejects = i32::max(params.find_one_int("maxconsecrejects", 512), 0) as u32;
    let large_mutation_prob = params.find_one_float("largemutationprob", 0.4);
    let default_range = (diag.x + diag.y) as Float / 32.0;
    let mut mutation_range = params.find_one_float("mutationrange", default_range);
    if !(mutation_range > 0.0) {
        log::warn!(
            "Non-positive mutation range replaced by the default of {}.",
            default_range
        );
        mutation_range = default_range;
    }
    let use_variance = params.find_one_bool("usevariance", false);
    let use_cooldown = params.find_one_bool("usecooldown", true);
    if params.find_one_bool("noiseaware", false) {
        film.enable_noise_aware_map();
    }
    return Ok(Sampler::Metropolis(MetropolisSampler::new(
        &bounds,
        max_consec_rejects,
        large_mutation_prob,
        mutation_range,
        use_variance,
        use_cooldown,
        layout,
        film,
    )));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samplers::Sampler;

    fn build(
        bounds: Bounds2i,
        max_rejects: u32,
        p_large: Float,
        use_cooldown: bool,
    ) -> (Sampler, Arc<Film>) {
        let mut layout = SampleLayout::new();
        layout.add_1d(2);
        layout.add_2d(1);
        layout.add_lazy(3, 2);
        let layout = layout.freeze();
        let film = Arc::new(Film::new(&bounds));
        let sampler = Sampler::Metropolis(MetropolisSampler::new(
            &bounds,
            max_rejects,
            p_large,
            4.0,
            false,
            use_cooldown,
            &layout,
            &film,
        ));
        return (sampler, film);
    }

    #[test]
    fn test_mutate_stays_in_unit_interval() {
        let mut rng = RNG::new_sequence(21);
        let mut x = 0.37;
        for _ in 0..10000 {
            x = mutate(x, rng.uniform_float());
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn test_mutate_scaled_stays_in_bounds() {
        let mut rng = RNG::new_sequence(22);
        for (lo, hi, range) in [
            (0.0, 1.0, 0.5),
            (3.0, 7.0, 2.0),
            (-4.0, -1.0, 10.0),
            (0.0, 640.0, 50.0),
        ] {
            let mut x = lo + 0.321 * (hi - lo);
            for _ in 0..10000 {
                x = mutate_scaled(x, rng.uniform_float(), lo, hi, range);
                assert!(x >= lo && x < hi, "{} outside [{}, {})", x, lo, hi);
            }
        }
    }

    #[test]
    fn test_mutate_is_two_scale() {
        // u = 0.5 gives the largest step, u near the ends almost none.
        let big = mutate_scaled(0.5, 0.5, 0.0, 1.0, 0.5) - 0.5;
        let small = mutate_scaled(0.5, 0.999999, 0.0, 1.0, 0.5) - 0.5;
        assert!(big.abs() > 0.2);
        assert!(small.abs() < 0.01);
    }

    fn drive_chain(eager: bool, iterations: usize) -> Vec<Float> {
        let bounds = Bounds2i::from(((0, 0), (8, 8)));
        let (sampler, _film) = build(bounds, 16, 0.3, false);
        let mut sample = sampler.init_sample(77);
        let mut last = Vec::new();
        for i in 0..iterations {
            assert!(sampler.get_next_sample(&mut sample));
            if eager || i + 1 == iterations {
                let v0 = sampler.get_lazy_values(&mut sample, 0, 0).to_vec();
                let v0_again = sampler.get_lazy_values(&mut sample, 0, 0).to_vec();
                // Same proposal, same position: identical values.
                assert_eq!(v0, v0_again);
                let v1 = sampler.get_lazy_values(&mut sample, 0, 1).to_vec();
                last = [v0, v1].concat();
            }
            // Luminance must not depend on the lazy values so that the
            // two call patterns replay identical chains.
            let l = 0.05 + modulo_1(sample.image_x * 0.193 + sample.lens_u * 0.71);
            sample.add_contribution(Contribution::new(
                sample.image_x,
                sample.image_y,
                RGBColor::new(l, l, l),
            ));
            sampler.add_sample(&mut sample);
        }
        return last;
    }

    #[test]
    fn test_lazy_catch_up_matches_eager_evaluation() {
        for iterations in [3, 17, 40] {
            let eager = drive_chain(true, iterations);
            let lazy = drive_chain(false, iterations);
            assert_eq!(eager, lazy, "diverged after {} proposals", iterations);
        }
    }

    #[test]
    fn test_cooldown_fraction() {
        let bounds = Bounds2i::from(((0, 0), (100, 100)));
        let (sampler, _film) = build(bounds, 512, 0.4, true);
        let mut sample = sampler.init_sample(3);
        let mut cooling = [0u64; 2];
        let mut cooling_large = [0u64; 2];
        for _ in 0..40000 {
            assert!(sampler.get_next_sample(&mut sample));
            sample.add_contribution(Contribution::new(
                sample.image_x,
                sample.image_y,
                RGBColor::new(1.0, 1.0, 1.0),
            ));
            sampler.add_sample(&mut sample);
            let SamplerData::Metropolis(data) = &sample.data else {
                unreachable!();
            };
            let phase = if data.cooling_down { 0 } else { 1 };
            cooling[phase] += 1;
            if data.next_large {
                cooling_large[phase] += 1;
            }
        }
        assert!(cooling[0] > 1000);
        assert!(cooling[1] > 10000);
        let f0 = cooling_large[0] as f64 / cooling[0] as f64;
        let f1 = cooling_large[1] as f64 / cooling[1] as f64;
        assert!((f0 - 0.5).abs() < 0.04, "cooldown fraction {}", f0);
        assert!((f1 - 0.4).abs() < 0.03, "post cooldown fraction {}", f1);
    }

    #[test]
    fn test_forced_accept_breaks_rejection_stall() {
        let max_rejects = 5;
        let bounds = Bounds2i::from(((0, 0), (4, 4)));
        let (sampler, _film) = build(bounds, max_rejects, 0.2, false);
        let mut sample = sampler.init_sample(11);
        // Seed the chain with one bright accepted sample.
        assert!(sampler.get_next_sample(&mut sample));
        sample.add_contribution(Contribution::new(
            sample.image_x,
            sample.image_y,
            RGBColor::new(1.0, 1.0, 1.0),
        ));
        sampler.add_sample(&mut sample);
        // All later proposals carry zero luminance; the rejection
        // streak must break within the cap plus one.
        let mut accepted_at = None;
        for i in 0..(max_rejects + 1) {
            assert!(sampler.get_next_sample(&mut sample));
            sampler.add_sample(&mut sample);
            let SamplerData::Metropolis(data) = &sample.data else {
                unreachable!();
            };
            if data.consec_rejects == 0 {
                accepted_at = Some(i);
                break;
            }
        }
        assert_eq!(accepted_at, Some(max_rejects));
    }

    #[test]
    fn test_variance_weights_luminance() {
        let bounds = Bounds2i::from(((0, 0), (4, 4)));
        let layout = SampleLayout::new().freeze();
        let film = Arc::new(Film::new(&bounds));
        for (use_variance, expected_ly) in [(false, 1.0), (true, 4.0)] {
            let sampler = Sampler::Metropolis(MetropolisSampler::new(
                &bounds,
                8,
                0.3,
                4.0,
                use_variance,
                false,
                &layout,
                &film,
            ));
            let mut sample = sampler.init_sample(2);
            assert!(sampler.get_next_sample(&mut sample));
            sample.add_contribution(
                Contribution::new(1.0, 1.0, RGBColor::new(1.0, 1.0, 1.0)).with_variance(4.0),
            );
            sampler.add_sample(&mut sample);
            let SamplerData::Metropolis(data) = &sample.data else {
                unreachable!();
            };
            assert!(
                (data.ly - expected_ly).abs() < 1e-4,
                "weighted luminance {} with usevariance {}",
                data.ly,
                use_variance
            );
        }
    }

    #[test]
    fn test_first_proposal_is_large_and_accepted() {
        let bounds = Bounds2i::from(((0, 0), (4, 4)));
        let (sampler, film) = build(bounds, 8, 0.3, false);
        let mut sample = sampler.init_sample(1);
        assert!(sampler.get_next_sample(&mut sample));
        {
            let SamplerData::Metropolis(data) = &sample.data else {
                unreachable!();
            };
            assert!(data.large);
        }
        sample.add_contribution(Contribution::new(1.0, 1.0, RGBColor::new(0.5, 0.5, 0.5)));
        sampler.add_sample(&mut sample);
        let SamplerData::Metropolis(data) = &sample.data else {
            unreachable!();
        };
        assert_eq!(data.consec_rejects, 0);
        assert!(data.ly > 0.0);
        assert!(sample.contributions.is_empty());
        assert_eq!(film.total_sample_count(), 1);
    }
}
