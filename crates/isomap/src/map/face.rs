/// Quadrant coverage bits of a face image.
///
/// A face with a companion overlay asset paints the parts of its overlay
/// named by these bits: `NORTHEAST` the upper half, `NORTH` the lower-left
/// quarter and `EAST` the lower-right quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coverage(u8);

impl Coverage {
    pub const NONE: Self = Self(0);
    pub const NORTH: Self = Self(1);
    pub const NORTHEAST: Self = Self(2);
    pub const EAST: Self = Self(4);
    pub const ALL: Self = Self(7);

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for Coverage {
    fn default() -> Self {
        Self::ALL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Face {
    pub num: u32,
    pub coverage: Coverage,
}

impl Face {
    pub const fn new(num: u32) -> Self {
        Self {
            num,
            coverage: Coverage::ALL,
        }
    }

    pub const fn with_coverage(num: u32, coverage: Coverage) -> Self {
        Self { num, coverage }
    }
}
