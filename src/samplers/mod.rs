pub mod lowdiscrepancy;
pub mod metropolis;
pub mod pixel_order;
pub mod sample;
pub mod sobol;

pub use lowdiscrepancy::*;
pub use metropolis::*;
pub use pixel_order::*;
pub use sample::*;
pub use sobol::*;

use crate::core::base::{Float, Point2f};
use crate::core::error::*;
use crate::core::film::{Film, SamplingMap};
use crate::core::param_set::ParamSet;

use std::sync::Arc;

/// Per-SamplerData cache of the film's importance map, refreshed with
/// the copy-and-compare-version protocol. Once any map version has been
/// observed the cache stays active; the switch never reverts.
#[derive(Debug, Default, Clone)]
pub struct MapCache {
    map: Option<Arc<SamplingMap>>,
    version: u32,
}

impl MapCache {
    /// Fetch a newer map if one exists. A user-supplied map takes
    /// precedence over the noise-aware map.
    pub fn refresh(&mut self, film: &Film) {
        if film.has_user_sampling_map() {
            if let Some(map) = film.user_sampling_map(self.version) {
                self.version = map.version();
                self.map = Some(map);
            }
        } else if film.noise_aware_map_enabled() {
            if let Some(map) = film.noise_aware_map(self.version) {
                self.version = map.version();
                self.map = Some(map);
            }
        }
    }

    pub fn map(&self) -> Option<&Arc<SamplingMap>> {
        return self.map.as_ref();
    }
}

/// The closed set of sample generators. The variant is chosen once at
/// scene-setup time by [`create_sampler`]; all per-call dispatch is a
/// plain match.
#[derive(Debug)]
pub enum Sampler {
    LowDiscrepancy(LDSampler),
    Sobol(SobolSampler),
    Metropolis(MetropolisSampler),
}

impl Sampler {
    /// Create the per-thread state for one in-flight sample. The state
    /// is owned by the returned [`Sample`] and released when it drops.
    pub fn init_sample(&self, seed: u64) -> Sample {
        match self {
            Sampler::LowDiscrepancy(s) => s.init_sample(seed),
            Sampler::Sobol(s) => s.init_sample(seed),
            Sampler::Metropolis(s) => s.init_sample(seed),
        }
    }

    /// Fill `sample` with the next candidate's image, lens, time and
    /// wavelength coordinates. Returns false once the film reports that
    /// enough samples have been taken.
    pub fn get_next_sample(&self, sample: &mut Sample) -> bool {
        match self {
            Sampler::LowDiscrepancy(s) => s.get_next_sample(sample),
            Sampler::Sobol(s) => s.get_next_sample(sample),
            Sampler::Metropolis(s) => s.get_next_sample(sample),
        }
    }

    /// Element `pos` of 1D stream `num` for the sample in flight.
    pub fn get_1d(&self, sample: &Sample, num: usize, pos: usize) -> Float {
        match self {
            Sampler::LowDiscrepancy(s) => s.get_1d(sample, num, pos),
            Sampler::Sobol(s) => s.get_1d(sample, num, pos),
            Sampler::Metropolis(s) => s.get_1d(sample, num, pos),
        }
    }

    /// Element `pos` of 2D stream `num` for the sample in flight.
    pub fn get_2d(&self, sample: &Sample, num: usize, pos: usize) -> Point2f {
        match self {
            Sampler::LowDiscrepancy(s) => s.get_2d(sample, num, pos),
            Sampler::Sobol(s) => s.get_2d(sample, num, pos),
            Sampler::Metropolis(s) => s.get_2d(sample, num, pos),
        }
    }

    /// Instance `pos` of lazy stream `num`, materialized on demand.
    pub fn get_lazy_values<'a>(
        &self,
        sample: &'a mut Sample,
        num: usize,
        pos: usize,
    ) -> &'a [Float] {
        match self {
            Sampler::LowDiscrepancy(s) => s.get_lazy_values(sample, num, pos),
            Sampler::Sobol(s) => s.get_lazy_values(sample, num, pos),
            Sampler::Metropolis(s) => s.get_lazy_values(sample, num, pos),
        }
    }

    /// Run the accept/reject step on an evaluated proposal and flush
    /// weighted contributions. The low-discrepancy and Sobol samplers
    /// push contributions directly instead and treat this as a no-op.
    pub fn add_sample(&self, sample: &mut Sample) {
        match self {
            Sampler::Metropolis(s) => s.add_sample(sample),
            _ => {}
        }
    }

    pub fn is_mutating(&self) -> bool {
        return matches!(self, Sampler::Metropolis(_));
    }
}

pub fn create_sampler(
    name: &str,
    params: &ParamSet,
    layout: &Arc<SampleLayout>,
    film: &Arc<Film>,
) -> Result<Sampler, LuxError> {
    match name {
        "lowdiscrepancy" | "ld" => create_lowdiscrepancy_sampler(params, layout, film),
        "sobol" => create_sobol_sampler(params, layout, film),
        "metropolis" => create_metropolis_sampler(params, layout, film),
        _ => {
            return Err(LuxError::warning(&format!(
                "Sampler \"{}\" unknown.",
                name
            )));
        }
    }
}
