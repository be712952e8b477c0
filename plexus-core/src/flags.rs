//! Event and transfer flag sets.
//!
//! `Events` is the interest / observed mask of a watch entry. `Flags`
//! qualifies a single-frame send or receive.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Readiness event mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Events(u16);

impl Events {
    /// No events.
    pub const NONE: Self = Self(0);
    /// Readable: a receive would not block.
    pub const IN: Self = Self(1);
    /// Writable: a send would not block.
    pub const OUT: Self = Self(2);
    /// Error condition, reported for descriptors only.
    pub const ERROR: Self = Self(4);

    const ALL: u16 = 1 | 2 | 4;

    /// Raw bit representation.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Build a mask from raw bits, dropping unknown bits.
    #[must_use]
    pub const fn from_bits_truncate(bits: u16) -> Self {
        Self(bits & Self::ALL)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every bit of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when `self` and `other` share at least one bit.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl BitOr for Events {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for Events {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Events {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}

impl fmt::Display for Events {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        let mut first = true;
        for (flag, name) in [(Self::IN, "IN"), (Self::OUT, "OUT"), (Self::ERROR, "ERROR")] {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Single-frame send / receive flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Flags(i32);

impl Flags {
    /// Default transfer, no flags set.
    pub const NORMAL: Self = Self(0);
    /// Do not block if the transfer is not currently possible.
    pub const DONT_WAIT: Self = Self(1);
    /// More parts of the same message follow this one.
    pub const SEND_MORE: Self = Self(2);

    #[must_use]
    pub const fn bits(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether this transfer must not block.
    #[must_use]
    pub const fn is_dont_wait(self) -> bool {
        self.contains(Self::DONT_WAIT)
    }

    /// Whether more frames follow.
    #[must_use]
    pub const fn is_send_more(self) -> bool {
        self.contains(Self::SEND_MORE)
    }
}

impl BitOr for Flags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}
