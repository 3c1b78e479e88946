use crate::core::base::*;
use crate::core::error::*;
use crate::core::film::contribution::Contribution;
use crate::core::film::sampling_map::SamplingMap;

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

#[derive(Debug, PartialEq, Default, Copy, Clone)]
pub struct FilmPixel {
    pub c: [Float; 3],
    pub weight_sum: Float,
}

/// The contribution buffer the samplers flush into, together with the
/// versioned importance maps and the external enough-samples flag.
///
/// Map readers follow a copy-and-compare-version protocol: a fetch with
/// the reader's last seen version returns a new `Arc` only when a newer
/// map exists, so readers never wait on a rebuild.
#[derive(Debug)]
pub struct Film {
    pixel_bounds: Bounds2i,
    width: usize,
    height: usize,
    pixels: Mutex<Vec<FilmPixel>>,
    sample_count: AtomicU64,
    enough_samples: AtomicBool,
    noise_aware_enabled: AtomicBool,
    map_version: AtomicU32,
    user_map: RwLock<Option<Arc<SamplingMap>>>,
    noise_map: RwLock<Option<Arc<SamplingMap>>>,
}

impl Film {
    pub fn new(pixel_bounds: &Bounds2i) -> Self {
        let diag = pixel_bounds.diagonal();
        let width = i32::max(diag.x, 0) as usize;
        let height = i32::max(diag.y, 0) as usize;
        Film {
            pixel_bounds: *pixel_bounds,
            width,
            height,
            pixels: Mutex::new(vec![FilmPixel::default(); width * height]),
            sample_count: AtomicU64::new(0),
            enough_samples: AtomicBool::new(false),
            noise_aware_enabled: AtomicBool::new(false),
            map_version: AtomicU32::new(0),
            user_map: RwLock::new(None),
            noise_map: RwLock::new(None),
        }
    }

    pub fn pixel_bounds(&self) -> Bounds2i {
        return self.pixel_bounds;
    }

    /// Append one weighted contribution into its pixel bin. Non-finite
    /// weights or colors are dropped so a broken sample cannot corrupt
    /// the buffer.
    pub fn add_contribution(&self, contrib: &Contribution, weight: Float) {
        if !weight.is_finite() || weight <= 0.0 || contrib.color.has_nan() {
            return;
        }
        if !contrib.image_x.is_finite() || !contrib.image_y.is_finite() {
            return;
        }
        let x = (contrib.image_x.floor() as i64) - self.pixel_bounds.min.x as i64;
        let y = (contrib.image_y.floor() as i64) - self.pixel_bounds.min.y as i64;
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let index = (y as usize) * self.width + (x as usize);
        let mut pixels = self.pixels.lock().unwrap();
        let pixel = &mut pixels[index];
        for i in 0..3 {
            pixel.c[i] += contrib.color.c[i] * weight;
        }
        pixel.weight_sum += weight;
    }

    pub fn add_sample_count(&self, count: u64) {
        self.sample_count.fetch_add(count, Ordering::Relaxed);
    }

    pub fn total_sample_count(&self) -> u64 {
        return self.sample_count.load(Ordering::Relaxed);
    }

    pub fn enough_samples(&self) -> bool {
        return self.enough_samples.load(Ordering::Relaxed);
    }

    pub fn set_enough_samples(&self, enough: bool) {
        self.enough_samples.store(enough, Ordering::Relaxed);
    }

    pub fn enable_noise_aware_map(&self) {
        self.noise_aware_enabled.store(true, Ordering::Relaxed);
    }

    pub fn noise_aware_map_enabled(&self) -> bool {
        return self.noise_aware_enabled.load(Ordering::Relaxed);
    }

    pub fn has_user_sampling_map(&self) -> bool {
        return self.user_map.read().unwrap().is_some();
    }

    /// Install or replace the user-supplied map; bumps the shared map
    /// version so readers pick the new map up on their next fetch.
    pub fn set_user_sampling_map(
        &self,
        func: &[Float],
        width: usize,
        height: usize,
    ) -> Result<(), LuxError> {
        let version = self.map_version.fetch_add(1, Ordering::Relaxed) + 1;
        let map = Arc::new(SamplingMap::new(version, func, width, height)?);
        *self.user_map.write().unwrap() = Some(map);
        Ok(())
    }

    /// Replace the noise-aware map, built by the embedding system from
    /// its error estimate over the pixel rectangle.
    pub fn update_noise_aware_map(&self, func: &[Float]) -> Result<(), LuxError> {
        let version = self.map_version.fetch_add(1, Ordering::Relaxed) + 1;
        let map = Arc::new(SamplingMap::new(version, func, self.width, self.height)?);
        *self.noise_map.write().unwrap() = Some(map);
        Ok(())
    }

    /// Versioned fetch: `Some` only when a map newer than
    /// `known_version` exists.
    pub fn user_sampling_map(&self, known_version: u32) -> Option<Arc<SamplingMap>> {
        let map = self.user_map.read().unwrap();
        match map.as_ref() {
            Some(m) if m.version() > known_version => Some(m.clone()),
            _ => None,
        }
    }

    pub fn noise_aware_map(&self, known_version: u32) -> Option<Arc<SamplingMap>> {
        let map = self.noise_map.read().unwrap();
        match map.as_ref() {
            Some(m) if m.version() > known_version => Some(m.clone()),
            _ => None,
        }
    }

    pub fn pixel(&self, x: i32, y: i32) -> FilmPixel {
        let ix = (x - self.pixel_bounds.min.x) as usize;
        let iy = (y - self.pixel_bounds.min.y) as usize;
        let pixels = self.pixels.lock().unwrap();
        return pixels[iy * self.width + ix];
    }

    pub fn pixels(&self) -> Vec<FilmPixel> {
        return self.pixels.lock().unwrap().clone();
    }

    pub fn width(&self) -> usize {
        return self.width;
    }

    pub fn height(&self) -> usize {
        return self.height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spectrum::RGBColor;

    #[test]
    fn test_add_contribution() {
        let film = Film::new(&Bounds2i::from(((0, 0), (2, 2))));
        let c = Contribution::new(0.5, 1.5, RGBColor::new(1.0, 2.0, 3.0));
        film.add_contribution(&c, 0.5);
        let p = film.pixel(0, 1);
        assert_eq!(p.c, [0.5, 1.0, 1.5]);
        assert_eq!(p.weight_sum, 0.5);
        // Out of bounds and non-finite contributions are dropped.
        film.add_contribution(&Contribution::new(-1.0, 0.0, RGBColor::new(1.0, 1.0, 1.0)), 1.0);
        film.add_contribution(&c, Float::NAN);
        assert_eq!(film.pixel(0, 1).weight_sum, 0.5);
    }

    #[test]
    fn test_versioned_map_fetch() {
        let film = Film::new(&Bounds2i::from(((0, 0), (2, 2))));
        assert!(!film.has_user_sampling_map());
        assert!(film.user_sampling_map(0).is_none());
        film.set_user_sampling_map(&[1.0, 2.0, 3.0, 4.0], 2, 2).unwrap();
        let m = film.user_sampling_map(0).unwrap();
        // Known version suppresses the fetch until a newer map lands.
        assert!(film.user_sampling_map(m.version()).is_none());
        film.set_user_sampling_map(&[4.0, 3.0, 2.0, 1.0], 2, 2).unwrap();
        let m2 = film.user_sampling_map(m.version()).unwrap();
        assert!(m2.version() > m.version());
    }
}
