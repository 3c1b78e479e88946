use crate::core::base::*;
use crate::core::film::Contribution;
use crate::core::rng::RNG;

use super::lowdiscrepancy::LDData;
use super::metropolis::MetropolisData;
use super::sobol::SobolData;

use std::sync::Arc;

/// Scalar dimensions every sample carries: image x/y, lens u/v, time
/// and wavelengths.
pub const SAMPLE_BASE_DIMS: u32 = 6;

/// The dimension-request table: how many 1D, 2D and lazy value streams
/// the transport collaborator consumes per sample, and how wide each
/// one is. Populated once before rendering through the `add_*` calls,
/// then frozen; every sampler sizes its buffers from the frozen table
/// exactly once.
#[derive(Debug, Default, Clone)]
pub struct SampleLayout {
    n1d: Vec<u32>,
    n2d: Vec<u32>,
    lazy_widths: Vec<u32>,
    lazy_max_instances: Vec<u32>,
    // Precomputed at freeze time.
    offsets_1d: Vec<u32>,
    offsets_2d: Vec<u32>,
    offsets_lazy: Vec<u32>,
    time_offsets_lazy: Vec<u32>,
    normal_dims: u32,
    total_dims: u32,
    lazy_instances: u32,
}

impl SampleLayout {
    pub fn new() -> Self {
        SampleLayout::default()
    }

    /// Request a 1D stream of `count` values per sample; returns the
    /// stream id used with `Sampler::get_1d`.
    pub fn add_1d(&mut self, count: u32) -> usize {
        self.n1d.push(u32::max(count, 1));
        return self.n1d.len() - 1;
    }

    /// Request a 2D stream of `count` points per sample.
    pub fn add_2d(&mut self, count: u32) -> usize {
        self.n2d.push(u32::max(count, 1));
        return self.n2d.len() - 1;
    }

    /// Request a lazy stream: up to `max_instances` sub-vectors of
    /// `width` values each, materialized only when consumed.
    pub fn add_lazy(&mut self, width: u32, max_instances: u32) -> usize {
        self.lazy_widths.push(u32::max(width, 1));
        self.lazy_max_instances.push(u32::max(max_instances, 1));
        return self.lazy_widths.len() - 1;
    }

    /// Freeze the table and precompute every dimension offset. The
    /// returned layout is immutable; requests cannot be added after
    /// any sampler observed it.
    pub fn freeze(mut self) -> Arc<SampleLayout> {
        let mut dim = SAMPLE_BASE_DIMS;
        self.offsets_1d = Vec::with_capacity(self.n1d.len());
        for n in self.n1d.iter() {
            self.offsets_1d.push(dim);
            dim += n;
        }
        self.offsets_2d = Vec::with_capacity(self.n2d.len());
        for n in self.n2d.iter() {
            self.offsets_2d.push(dim);
            dim += 2 * n;
        }
        self.normal_dims = dim;
        self.offsets_lazy = Vec::with_capacity(self.lazy_widths.len());
        for i in 0..self.lazy_widths.len() {
            self.offsets_lazy.push(dim);
            dim += self.lazy_widths[i] * self.lazy_max_instances[i];
        }
        self.total_dims = dim;
        let mut t = 0;
        self.time_offsets_lazy = Vec::with_capacity(self.lazy_max_instances.len());
        for n in self.lazy_max_instances.iter() {
            self.time_offsets_lazy.push(t);
            t += n;
        }
        self.lazy_instances = t;
        return Arc::new(self);
    }

    pub fn n_1d_streams(&self) -> usize {
        return self.n1d.len();
    }

    pub fn n_2d_streams(&self) -> usize {
        return self.n2d.len();
    }

    pub fn n_lazy_streams(&self) -> usize {
        return self.lazy_widths.len();
    }

    pub fn count_1d(&self, num: usize) -> u32 {
        return self.n1d[num];
    }

    pub fn count_2d(&self, num: usize) -> u32 {
        return self.n2d[num];
    }

    pub fn lazy_width(&self, num: usize) -> u32 {
        return self.lazy_widths[num];
    }

    pub fn lazy_max_instances(&self, num: usize) -> u32 {
        return self.lazy_max_instances[num];
    }

    /// Dimension of element `pos` of 1D stream `num`.
    pub fn offset_1d(&self, num: usize, pos: usize) -> u32 {
        return self.offsets_1d[num] + pos as u32;
    }

    /// Dimension of the x component of element `pos` of 2D stream
    /// `num`; the y component follows it.
    pub fn offset_2d(&self, num: usize, pos: usize) -> u32 {
        return self.offsets_2d[num] + 2 * pos as u32;
    }

    /// First dimension of instance `pos` of lazy stream `num`.
    pub fn offset_lazy(&self, num: usize, pos: usize) -> u32 {
        return self.offsets_lazy[num] + self.lazy_widths[num] * pos as u32;
    }

    /// Stamp slot of instance `pos` of lazy stream `num`.
    pub fn time_offset_lazy(&self, num: usize, pos: usize) -> u32 {
        return self.time_offsets_lazy[num] + pos as u32;
    }

    /// Dimensions mutated eagerly on every proposal.
    pub fn normal_dims(&self) -> u32 {
        return self.normal_dims;
    }

    /// Full state vector length, lazy dimensions included.
    pub fn total_dims(&self) -> u32 {
        return self.total_dims;
    }

    /// Number of lazy sub-vector instances across all streams.
    pub fn lazy_instance_count(&self) -> u32 {
        return self.lazy_instances;
    }
}

/// Per-sampler state exclusively owned by one in-flight [`Sample`].
#[derive(Debug, Clone)]
pub enum SamplerData {
    LowDiscrepancy(LDData),
    Sobol(SobolData),
    Metropolis(MetropolisData),
}

/// One transport sample in flight on a render thread. Created by
/// `Sampler::init_sample` and released when dropped, on every exit
/// path.
#[derive(Debug, Clone)]
pub struct Sample {
    pub image_x: Float,
    pub image_y: Float,
    pub lens_u: Float,
    pub lens_v: Float,
    pub time: Float,
    pub wavelengths: Float,
    pub contributions: Vec<Contribution>,
    pub rng: RNG,
    pub(crate) data: SamplerData,
}

impl Sample {
    pub(crate) fn new(rng: RNG, data: SamplerData) -> Self {
        Sample {
            image_x: 0.0,
            image_y: 0.0,
            lens_u: 0.0,
            lens_v: 0.0,
            time: 0.0,
            wavelengths: 0.0,
            contributions: Vec::new(),
            rng,
            data,
        }
    }

    pub fn add_contribution(&mut self, contribution: Contribution) {
        self.contributions.push(contribution);
    }
}
