use super::vector2::Vector2;
use crate::core::base::*;
use crate::core::misc::lerp;

#[derive(Debug, PartialEq, Default, Copy, Clone)]
pub struct Bounds2<T> {
    pub min: Vector2<T>,
    pub max: Vector2<T>,
}

impl<T: Copy> Bounds2<T> {
    pub fn new(min: &Vector2<T>, max: &Vector2<T>) -> Self {
        Bounds2::<T> {
            min: *min,
            max: *max,
        }
    }
}

impl<
        T: Copy
            + PartialOrd
            + std::ops::Add<Output = T>
            + std::ops::Sub<Output = T>
            + std::ops::Mul<Output = T>
            + std::ops::Div<Output = T>,
    > Bounds2<T>
{
    pub fn area(&self) -> T {
        return (self.max.x - self.min.x) * (self.max.y - self.min.y);
    }

    pub fn diagonal(&self) -> Vector2<T> {
        return self.max - self.min;
    }

    pub fn offset(&self, p: &Vector2<T>) -> Vector2<T> {
        let mut o = *p - self.min;
        if self.max.x > self.min.x {
            o.x = o.x / (self.max.x - self.min.x);
        }
        if self.max.y > self.min.y {
            o.y = o.y / (self.max.y - self.min.y);
        }
        return o;
    }

    pub fn inside_exclusive(&self, p: &Vector2<T>) -> bool {
        return p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y;
    }
}

impl Bounds2f {
    pub fn lerp(&self, t: &Point2f) -> Point2f {
        return Point2f::new(
            lerp(t.x, self.min.x, self.max.x),
            lerp(t.y, self.min.y, self.max.y),
        );
    }
}

impl Bounds2i {
    pub fn to_float(&self) -> Bounds2f {
        return Bounds2f {
            min: Point2f::new(self.min.x as Float, self.min.y as Float),
            max: Point2f::new(self.max.x as Float, self.max.y as Float),
        };
    }
}

impl<T: Copy> From<((T, T), (T, T))> for Bounds2<T> {
    fn from(value: ((T, T), (T, T))) -> Self {
        Bounds2::<T> {
            min: Vector2::<T>::from(value.0),
            max: Vector2::<T>::from(value.1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_001() {
        let b = Bounds2i::from(((2, 3), (6, 8)));
        assert_eq!(b.area(), 20);
        assert_eq!(b.diagonal(), Vector2::<i32>::new(4, 5));
    }

    #[test]
    fn test_002() {
        let b = Bounds2f::from(((0.0, 0.0), (4.0, 2.0)));
        let p = b.lerp(&Point2f::new(0.5, 0.5));
        assert_eq!(p, Point2f::new(2.0, 1.0));
        let o = b.offset(&p);
        assert_eq!(o, Point2f::new(0.5, 0.5));
    }
}
