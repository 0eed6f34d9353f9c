use serde::{Deserialize, Serialize};

/// Epsilon below which a vector's magnitude is treated as zero.
pub const EPSILON: f32 = 1e-6;

/// A point or displacement in meters on the pitch plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn add(&self, other: Vector2) -> Vector2 {
        Vector2::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(&self, other: Vector2) -> Vector2 {
        Vector2::new(self.x - other.x, self.y - other.y)
    }

    pub fn scale(&self, scalar: f32) -> Vector2 {
        Vector2::new(self.x * scalar, self.y * scalar)
    }

    pub fn dot(&self, other: Vector2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(&self, other: Vector2) -> f32 {
        self.sub(other).magnitude()
    }

    /// Returns the zero vector if magnitude is below `EPSILON`.
    pub fn normalize(&self) -> Vector2 {
        let mag = self.magnitude();
        if mag < EPSILON {
            Vector2::ZERO
        } else {
            self.scale(1.0 / mag)
        }
    }

    /// Linear interpolation toward `target` by `t` (clamped to [0, 1]).
    pub fn lerp(&self, target: Vector2, t: f32) -> Vector2 {
        let t = t.clamp(0.0, 1.0);
        Vector2::new(
            self.x + (target.x - self.x) * t,
            self.y + (target.y - self.y) * t,
        )
    }

    pub fn clamp(&self, min: Vector2, max: Vector2) -> Vector2 {
        Vector2::new(self.x.clamp(min.x, max.x), self.y.clamp(min.y, max.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_of_zero_is_zero() {
        assert_eq!(Vector2::ZERO.normalize(), Vector2::ZERO);
    }

    #[test]
    fn normalize_has_unit_magnitude() {
        let v = Vector2::new(3.0, 4.0).normalize();
        assert!((v.magnitude() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn lerp_clamps_t() {
        let a = Vector2::new(0.0, 0.0);
        let b = Vector2::new(10.0, 0.0);
        assert_eq!(a.lerp(b, 2.0), b);
        assert_eq!(a.lerp(b, -1.0), a);
    }

    #[test]
    fn clamp_restricts_to_bounds() {
        let v = Vector2::new(-5.0, 50.0);
        let clamped = v.clamp(Vector2::ZERO, Vector2::new(10.0, 10.0));
        assert_eq!(clamped, Vector2::new(0.0, 10.0));
    }
}
