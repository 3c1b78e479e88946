use crate::core::base::*;
use std::ops;

const YWEIGHT: [Float; 3] = [0.212671, 0.715160, 0.072169];

#[derive(Debug, PartialEq, Default, Copy, Clone)]
pub struct RGBColor {
    pub c: [Float; 3],
}

impl RGBColor {
    #[inline]
    pub fn new(r: Float, g: Float, b: Float) -> Self {
        RGBColor { c: [r, g, b] }
    }

    #[inline]
    pub fn zero() -> Self {
        RGBColor { c: [0.0, 0.0, 0.0] }
    }

    /// CIE luminance of the color.
    #[inline]
    pub fn y(&self) -> Float {
        let c = &self.c;
        return YWEIGHT[0] * c[0] + YWEIGHT[1] * c[1] + YWEIGHT[2] * c[2];
    }

    pub fn is_black(&self) -> bool {
        return self.c.iter().all(|v| *v == 0.0);
    }

    pub fn has_nan(&self) -> bool {
        return self.c.iter().any(|v| !v.is_finite());
    }
}

impl ops::Add<RGBColor> for RGBColor {
    type Output = RGBColor;
    #[inline]
    fn add(self, rhs: RGBColor) -> RGBColor {
        return RGBColor::new(
            self.c[0] + rhs.c[0],
            self.c[1] + rhs.c[1],
            self.c[2] + rhs.c[2],
        );
    }
}

impl ops::Mul<Float> for RGBColor {
    type Output = RGBColor;
    #[inline]
    fn mul(self, rhs: Float) -> RGBColor {
        return RGBColor::new(self.c[0] * rhs, self.c[1] * rhs, self.c[2] * rhs);
    }
}
