use std::fmt;
use std::ops::Add;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

/// A detail's size, normalized so that `long >= short`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rect {
    long: u32,
    short: u32,
}

impl Rect {
    pub fn new(a: u32, b: u32) -> Self {
        Self {
            long: a.max(b),
            short: a.min(b),
        }
    }

    pub fn long(&self) -> u32 {
        self.long
    }

    pub fn short(&self) -> u32 {
        self.short
    }

    pub fn area(&self) -> u64 {
        self.long as u64 * self.short as u64
    }

    /// Whether the detail can be laid in a strip of width `limit` in some orientation.
    pub fn fits(&self, limit: u32) -> bool {
        self.short <= limit
    }

    pub fn repeat(self, n: usize) -> Vec<Rect> {
        vec![self; n]
    }

    pub fn maybe(self, include: bool) -> Vec<Rect> {
        if include { vec![self] } else { Vec::new() }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.long, self.short)
    }
}

/// Absolute lower-left corner of a piece of the strip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Offset {
    pub x: u32,
    /// Along the strip length, which can exceed any single detail side.
    pub y: u64,
}

impl Offset {
    pub fn new(x: u32, y: u64) -> Self {
        Self { x, y }
    }
}

impl Add for Offset {
    type Output = Offset;

    fn add(self, other: Offset) -> Offset {
        Offset {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A detail laid out at an absolute position on the strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub rect: Rect,
    pub x: u32,
    pub y: u64,
    /// Extent along the strip width.
    pub width: u32,
    /// Extent along the strip length.
    pub height: u32,
}

impl Placement {
    /// True when the long side runs along the strip length.
    pub fn rotated(&self) -> bool {
        self.rect.long() != self.rect.short() && self.height == self.rect.long()
    }

    pub fn overlaps(&self, other: &Placement) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height as u64
            && other.y < self.y + self.height as u64
    }
}

/// Which vertical cut positions the solver tries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CutPositions {
    /// Single side lengths of the details being split.
    #[default]
    ItemSides,
    /// Every sum of side lengths the details being split can form.
    Combinations,
}

/// Accepts JSON numbers like `3` or `3.0` for integral fields.
pub fn deserialize_u32_from_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    struct U32Visitor;

    impl<'de> Visitor<'de> for U32Visitor {
        type Value = u32;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative integer")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u32, E> {
            u32::try_from(v).map_err(|_| E::custom(format!("{v} is out of range")))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u32, E> {
            u32::try_from(v).map_err(|_| E::custom(format!("{v} is out of range")))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<u32, E> {
            if v.fract() == 0.0 && v >= 0.0 && v <= u32::MAX as f64 {
                Ok(v as u32)
            } else {
                Err(E::custom(format!("{v} is not a non-negative integer")))
            }
        }
    }

    deserializer.deserialize_any(U32Visitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        for (p, q) in [(3, 1), (1, 3), (2, 2), (7, 5), (5, 7)] {
            let r = Rect::new(p, q);
            assert!(r.long() >= r.short());
            assert_eq!(r.long(), p.max(q));
            assert_eq!(r.short(), p.min(q));
        }
        assert_eq!(Rect::new(1, 3), Rect::new(3, 1));
    }

    #[test]
    fn test_area_and_fits() {
        let r = Rect::new(2, 5);
        assert_eq!(r.area(), 10);
        assert!(r.fits(2));
        assert!(r.fits(4));
        assert!(!r.fits(1));
    }

    #[test]
    fn test_repeat_and_maybe() {
        let r = Rect::new(3, 1);
        assert_eq!(r.repeat(3), vec![r, r, r]);
        assert!(r.repeat(0).is_empty());
        assert_eq!(r.maybe(true), vec![r]);
        assert!(r.maybe(false).is_empty());
    }

    #[test]
    fn test_offset_add() {
        let o = Offset::new(1, 2) + Offset::new(3, 0);
        assert_eq!(o, Offset::new(4, 2));
        assert_eq!(Offset::default(), Offset::new(0, 0));
    }

    #[test]
    fn test_placement_overlap_and_rotation() {
        let a = Placement { rect: Rect::new(3, 1), x: 0, y: 0, width: 3, height: 1 };
        let b = Placement { rect: Rect::new(3, 1), x: 0, y: 1, width: 1, height: 3 };
        let c = Placement { rect: Rect::new(2, 2), x: 2, y: 0, width: 2, height: 2 };
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(!a.rotated());
        assert!(b.rotated());
        assert!(!c.rotated());
    }

    #[test]
    fn test_cut_positions_serde() {
        let parsed: CutPositions = serde_json::from_str("\"combinations\"").unwrap();
        assert_eq!(parsed, CutPositions::Combinations);
        assert_eq!(
            serde_json::to_string(&CutPositions::ItemSides).unwrap(),
            "\"item-sides\""
        );
    }

    #[test]
    fn test_deserialize_u32_from_number() {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(deserialize_with = "deserialize_u32_from_number")]
            value: u32,
        }

        let w: Wrapper = serde_json::from_str(r#"{"value": 4}"#).unwrap();
        assert_eq!(w.value, 4);
        let w: Wrapper = serde_json::from_str(r#"{"value": 4.0}"#).unwrap();
        assert_eq!(w.value, 4);
        assert!(serde_json::from_str::<Wrapper>(r#"{"value": 4.5}"#).is_err());
        assert!(serde_json::from_str::<Wrapper>(r#"{"value": -1}"#).is_err());
    }
}
