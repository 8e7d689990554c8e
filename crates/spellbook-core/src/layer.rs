//! Layer and label types.
//!
//! A [`Layer`] is what one energize command adds: a covered range plus a
//! [`Label`]. The label is the part the range engine stores per span, and it
//! alone decides the sign and size of a covered position's contribution.

use std::fmt;

/// Parity mode of a layer.
///
/// On the wire `0` is [`Parity::Even`] and `1` is [`Parity::Odd`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Parity {
    /// Positive while the coverage count is even.
    #[default]
    Even,
    /// Positive while the coverage count is odd.
    Odd,
}

impl Parity {
    /// Decode the wire bit.
    pub fn from_bit(bit: u8) -> Option<Self> {
        match bit {
            0 => Some(Parity::Even),
            1 => Some(Parity::Odd),
            _ => None,
        }
    }

    /// Encode as the wire bit.
    pub fn bit(&self) -> u8 {
        match self {
            Parity::Even => 0,
            Parity::Odd => 1,
        }
    }

    /// Parity class of a coverage count.
    pub fn of(count: i64) -> Self {
        if count.rem_euclid(2) == 0 { Parity::Even } else { Parity::Odd }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parity::Even => write!(f, "even"),
            Parity::Odd => write!(f, "odd"),
        }
    }
}

/// The winning part of a layer: identifier, parity mode and magnitude.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Label {
    /// Dominance identifier. Higher wins.
    pub key: i64,
    pub parity: Parity,
    /// Non-negative magnitude.
    pub magnitude: i64,
}

impl Label {
    pub fn new(key: i64, parity: Parity, magnitude: i64) -> Self {
        Self { key, parity, magnitude }
    }

    /// Contribution of one position with the given coverage count.
    pub fn contribution(&self, coverage: i64) -> i128 {
        if Parity::of(coverage) == self.parity {
            self.magnitude as i128
        } else {
            -(self.magnitude as i128)
        }
    }

    /// Contribution of a span fully won by this label.
    ///
    /// `even` and `odd` count the span's positions by coverage parity.
    pub fn span_energy(&self, even: u32, odd: u32) -> i128 {
        let (matching, opposing) = match self.parity {
            Parity::Even => (even, odd),
            Parity::Odd => (odd, even),
        };
        self.magnitude as i128 * (matching as i128 - opposing as i128)
    }
}

/// One energize command's layer over positions `start..=end` (1-based).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Layer {
    pub start: usize,
    pub end: usize,
    pub label: Label,
}

impl Layer {
    pub fn new(start: usize, end: usize, label: Label) -> Self {
        Self { start, end, label }
    }

    /// Check whether the range is non-empty and fits `1..=len`.
    pub fn fits(&self, len: usize) -> bool {
        1 <= self.start && self.start <= self.end && self.end <= len
    }

    /// Check whether `pos` lies in the layer's range.
    pub fn covers(&self, pos: usize) -> bool {
        self.start <= pos && pos <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parity_wire_bits() {
        assert_eq!(Parity::from_bit(0), Some(Parity::Even));
        assert_eq!(Parity::from_bit(1), Some(Parity::Odd));
        assert_eq!(Parity::from_bit(2), None);
        assert_eq!(Parity::Odd.bit(), 1);
    }

    #[test]
    fn test_contribution_sign() {
        let even = Label::new(1, Parity::Even, 4);
        assert_eq!(even.contribution(2), 4);
        assert_eq!(even.contribution(1), -4);

        let odd = Label::new(1, Parity::Odd, 4);
        assert_eq!(odd.contribution(3), 4);
        assert_eq!(odd.contribution(2), -4);
    }

    #[test]
    fn test_span_energy() {
        let label = Label::new(7, Parity::Odd, 3);
        // 2 even positions, 5 odd positions
        assert_eq!(label.span_energy(2, 5), 9);
        assert_eq!(Label::new(7, Parity::Even, 3).span_energy(2, 5), -9);
    }

    #[test]
    fn test_layer_fits() {
        let label = Label::new(1, Parity::Even, 1);
        assert!(Layer::new(1, 4, label).fits(4));
        assert!(!Layer::new(0, 2, label).fits(4));
        assert!(!Layer::new(3, 2, label).fits(4));
        assert!(!Layer::new(2, 5, label).fits(4));
    }
}
