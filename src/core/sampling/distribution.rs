use crate::core::base::*;

/// Piecewise-constant 1D distribution with a precomputed CDF.
#[derive(Debug, Default, Clone)]
pub struct Distribution1D {
    pub func: Vec<Float>,
    pub cdf: Vec<Float>,
    pub func_int: Float,
    inv_count: Float,
}

#[inline(always)]
fn find_interval_cdf(cdf: &[Float], u: Float) -> usize {
    let mut first = 0usize;
    let mut len = cdf.len();
    while len > 0 {
        let half = len >> 1;
        let middle = first + half;
        if cdf[middle] <= u {
            first = middle + 1;
            len -= half + 1;
        } else {
            len = half;
        }
    }
    let idx = first.saturating_sub(1);
    return usize::min(idx, cdf.len() - 2);
}

impl Distribution1D {
    pub fn new(f: &[Float]) -> Self {
        let n = f.len();
        let func = Vec::from(f);
        let mut cdf = vec![0.0; n + 1];
        for i in 1..(n + 1) {
            cdf[i] = cdf[i - 1] + func[i - 1] / (n as Float);
        }
        let func_int = cdf[n];
        if func_int == 0.0 {
            // Degenerate function; fall back to a uniform CDF.
            for i in 1..(n + 1) {
                cdf[i] = (i as Float) / (n as Float);
            }
        } else {
            for i in 1..(n + 1) {
                cdf[i] /= func_int;
            }
        }
        Distribution1D {
            func,
            cdf,
            func_int,
            inv_count: 1.0 / (n as Float),
        }
    }

    pub fn count(&self) -> usize {
        return self.func.len();
    }

    /// Returns (value, pdf, offset).
    pub fn sample_continuous(&self, u: Float) -> (Float, Float, usize) {
        let offset = find_interval_cdf(&self.cdf, u);
        let cdf0 = self.cdf[offset];
        let cdf1 = self.cdf[offset + 1];
        let mut du = u - cdf0;
        if cdf1 - cdf0 > 0.0 {
            du /= cdf1 - cdf0;
        }
        let pdf = if self.func_int > 0.0 {
            self.func[offset] / self.func_int
        } else {
            0.0
        };
        let value = ((offset as Float) + du) * self.inv_count;
        return (Float::min(value, ONE_MINUS_EPSILON), pdf, offset);
    }
}

/// Piecewise-constant 2D distribution built from a row-major function,
/// sampled through its marginal and conditional CDFs.
#[derive(Debug, Default, Clone)]
pub struct Distribution2D {
    pub conditional_v: Vec<Distribution1D>,
    pub marginal: Distribution1D,
}

impl Distribution2D {
    pub fn new(data: &[Float], nu: usize, nv: usize) -> Self {
        let mut conditional_v = Vec::with_capacity(nv);
        for v in 0..nv {
            conditional_v.push(Distribution1D::new(&data[(v * nu)..((v + 1) * nu)]));
        }
        let marginal_func: Vec<Float> = conditional_v.iter().map(|c| c.func_int).collect();
        Distribution2D {
            conditional_v,
            marginal: Distribution1D::new(&marginal_func),
        }
    }

    /// Returns a point in [0, 1)^2 and its pdf.
    pub fn sample_continuous(&self, u: &Point2f) -> (Point2f, Float) {
        let (d1, pdf1, v) = self.marginal.sample_continuous(u.y);
        let (d0, pdf0, _) = self.conditional_v[v].sample_continuous(u.x);
        return (Point2f::new(d0, d1), pdf0 * pdf1);
    }

    pub fn pdf(&self, p: &Point2f) -> Float {
        let ucount = self.conditional_v[0].count();
        let vcount = self.marginal.count();
        let iu = usize::min((p.x * ucount as Float) as usize, ucount - 1);
        let iv = usize::min((p.y * vcount as Float) as usize, vcount - 1);
        if self.marginal.func_int == 0.0 {
            return 0.0;
        }
        return self.conditional_v[iv].func[iu] / self.marginal.func_int;
    }
}
