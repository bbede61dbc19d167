use std::fmt;

use crate::GeometryError;

const WALL_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;

        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f64; 3]> for Point {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Extent of an axis-aligned box room with one corner in the origin.
///
/// `width` runs along x, `depth` along y and `height` along z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimensions {
    width: f64,
    depth: f64,
    height: f64,
}

impl Dimensions {
    pub fn new(width: f64, depth: f64, height: f64) -> Result<Self, GeometryError> {
        let valid = |l: f64| l.is_finite() && l > 0.0;

        if valid(width) && valid(depth) && valid(height) {
            Ok(Self {
                width,
                depth,
                height,
            })
        } else {
            Err(GeometryError::InvalidDimensions(vec![width, depth, height]))
        }
    }

    pub fn from_slice(lengths: &[f64]) -> Result<Self, GeometryError> {
        match *lengths {
            [width, depth, height] => Self::new(width, depth, height),
            _ => Err(GeometryError::InvalidDimensions(lengths.to_vec())),
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn depth(&self) -> f64 {
        self.depth
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.width, self.depth, self.height]
    }

    pub fn volume(&self) -> f64 {
        self.width * self.depth * self.height
    }

    pub fn surface(&self) -> f64 {
        2.0 * (self.width * self.depth + self.width * self.height + self.depth * self.height)
    }

    pub fn min_side(&self) -> f64 {
        self.width.min(self.depth).min(self.height)
    }

    /// Points on a wall count as inside.
    pub fn contains(&self, point: &Point) -> bool {
        point
            .as_array()
            .iter()
            .zip(self.as_array())
            .all(|(&c, l)| (-WALL_TOLERANCE..=l + WALL_TOLERANCE).contains(&c))
    }

    pub fn edges(&self) -> [(Point, Point); 12] {
        let (w, d, h) = (self.width, self.depth, self.height);
        let corner = |x: f64, y: f64, z: f64| Point::new(x, y, z);

        [
            (corner(0.0, 0.0, 0.0), corner(w, 0.0, 0.0)),
            (corner(0.0, d, 0.0), corner(w, d, 0.0)),
            (corner(0.0, 0.0, h), corner(w, 0.0, h)),
            (corner(0.0, d, h), corner(w, d, h)),
            (corner(0.0, 0.0, 0.0), corner(0.0, d, 0.0)),
            (corner(w, 0.0, 0.0), corner(w, d, 0.0)),
            (corner(0.0, 0.0, h), corner(0.0, d, h)),
            (corner(w, 0.0, h), corner(w, d, h)),
            (corner(0.0, 0.0, 0.0), corner(0.0, 0.0, h)),
            (corner(w, 0.0, 0.0), corner(w, 0.0, h)),
            (corner(0.0, d, 0.0), corner(0.0, d, h)),
            (corner(w, d, 0.0), corner(w, d, h)),
        ]
    }
}

impl TryFrom<[f64; 3]> for Dimensions {
    type Error = GeometryError;

    fn try_from([width, depth, height]: [f64; 3]) -> Result<Self, Self::Error> {
        Self::new(width, depth, height)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_degenerate_boxes() {
        assert!(Dimensions::new(10.0, 0.0, 10.0).is_err());
        assert!(Dimensions::new(-1.0, 10.0, 10.0).is_err());
        assert!(Dimensions::new(f64::NAN, 10.0, 10.0).is_err());
        assert!(Dimensions::from_slice(&[10.0, 10.0]).is_err());
        assert!(Dimensions::from_slice(&[10.0, 10.0, 10.0]).is_ok());
    }

    #[test]
    fn volume_and_surface() {
        let dims = Dimensions::new(2.0, 3.0, 4.0).unwrap();

        assert_eq!(dims.volume(), 24.0);
        assert_eq!(dims.surface(), 52.0);
        assert_eq!(dims.min_side(), 2.0);
    }

    #[test]
    fn walls_are_inside() {
        let dims = Dimensions::new(10.0, 10.0, 10.0).unwrap();

        assert!(dims.contains(&Point::new(2.5, 0.0, 5.0)));
        assert!(dims.contains(&Point::new(10.0, 10.0, 10.0)));
        assert!(!dims.contains(&Point::new(2.5, -0.1, 5.0)));
        assert!(!dims.contains(&Point::new(5.0, 5.0, 10.5)));
    }

    #[test]
    fn edges_have_box_lengths() {
        let dims = Dimensions::new(1.0, 2.0, 3.0).unwrap();
        let mut lengths: Vec<_> = dims.edges().iter().map(|(a, b)| a.distance(b)).collect();
        lengths.sort_by(f64::total_cmp);

        assert_eq!(
            lengths,
            [1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0, 3.0]
        );
    }
}
