use crate::core::base::*;
use crate::core::error::*;
use crate::core::sampling::Distribution2D;

/// A versioned 2D importance function over the image plane, with a
/// prebuilt inverse CDF. Negative or non-finite entries are clamped to
/// zero at construction so a bad map degrades to fewer samples instead
/// of corrupting placement.
#[derive(Debug, Clone)]
pub struct SamplingMap {
    version: u32,
    width: usize,
    height: usize,
    func: Vec<Float>,
    distribution: Distribution2D,
    inv_average: Float,
}

impl SamplingMap {
    pub fn new(version: u32, func: &[Float], width: usize, height: usize) -> Result<Self, LuxError> {
        if width == 0 || height == 0 || func.len() != width * height {
            return Err(LuxError::error(&format!(
                "Sampling map size mismatch: {} values for {}x{}.",
                func.len(),
                width,
                height
            )));
        }
        let func: Vec<Float> = func
            .iter()
            .map(|v| if v.is_finite() && *v > 0.0 { *v } else { 0.0 })
            .collect();
        let sum: Float = func.iter().sum();
        let inv_average = if sum > 0.0 {
            (func.len() as Float) / sum
        } else {
            1.0
        };
        let distribution = Distribution2D::new(&func, width, height);
        Ok(SamplingMap {
            version,
            width,
            height,
            func,
            distribution,
            inv_average,
        })
    }

    pub fn version(&self) -> u32 {
        return self.version;
    }

    pub fn width(&self) -> usize {
        return self.width;
    }

    pub fn height(&self) -> usize {
        return self.height;
    }

    pub fn func(&self) -> &[Float] {
        return &self.func;
    }

    /// Inverse-CDF sample: maps a uniform point in [0, 1)^2 to a map
    /// point in [0, 1)^2 plus its pdf.
    pub fn sample_continuous(&self, u: &Point2f) -> (Point2f, Float) {
        return self.distribution.sample_continuous(u);
    }

    /// Map density at a normalized image position, scaled to average 1
    /// over the plane.
    pub fn density(&self, p: &Point2f) -> Float {
        let ix = usize::min((p.x * self.width as Float) as usize, self.width - 1);
        let iy = usize::min((p.y * self.height as Float) as usize, self.height - 1);
        return self.func[iy * self.width + ix] * self.inv_average;
    }
}
