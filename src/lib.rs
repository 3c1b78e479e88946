//! Sample generation core for a Monte Carlo light transport renderer.
//!
//! Three interchangeable sample generators share one contract with the
//! surrounding renderer: a stratified low-discrepancy sampler, a Sobol
//! sequence sampler and a Metropolis-Hastings Markov chain sampler.
//! The light transport integrator, tonemapping and scene parsing live
//! outside this crate; the [`core::film`] module carries the
//! contribution buffer surface those collaborators talk to.

pub mod core;
pub mod samplers;
