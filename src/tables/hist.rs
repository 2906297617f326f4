//! Binned correction histograms.
//!
//! Bin numbering follows the ROOT convention: bin 0 is underflow, bins
//! `1..=n` cover the axis and bin `n + 1` is overflow.

use serde::{Deserialize, Serialize};

use crate::error::{RwgtError, RwgtResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum AxisRepr {
    Edges { edges: Vec<f64> },
    Uniform { bins: usize, min: f64, max: f64 },
}

/// Bin edges of one histogram axis, strictly increasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AxisRepr")]
pub struct Axis {
    edges: Vec<f64>,
}

impl Axis {
    pub fn from_edges(edges: Vec<f64>) -> RwgtResult<Self> {
        if edges.len() < 2 {
            return Err(RwgtError::Conversion("an axis needs at least two edges".into()));
        }
        if edges.iter().any(|e| !e.is_finite()) || edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(RwgtError::Conversion(
                "axis edges must be finite and strictly increasing".into(),
            ));
        }
        Ok(Self { edges })
    }

    pub fn uniform(bins: usize, min: f64, max: f64) -> RwgtResult<Self> {
        if bins == 0 {
            return Err(RwgtError::Conversion("an axis needs at least one bin".into()));
        }
        let width = (max - min) / bins as f64;
        let edges = (0..=bins).map(|i| min + width * i as f64).collect();
        Self::from_edges(edges)
    }

    pub fn bins(&self) -> usize {
        self.edges.len() - 1
    }

    pub fn min(&self) -> f64 {
        self.edges[0]
    }

    pub fn max(&self) -> f64 {
        self.edges[self.edges.len() - 1]
    }

    /// Bin containing `x`; NaN lands in overflow.
    pub fn find_bin(&self, x: f64) -> usize {
        if x < self.min() {
            return 0;
        }
        if !(x < self.max()) {
            return self.bins() + 1;
        }
        // edges[i - 1] <= x < edges[i]
        self.edges.partition_point(|e| *e <= x)
    }
}

impl TryFrom<AxisRepr> for Axis {
    type Error = RwgtError;

    fn try_from(repr: AxisRepr) -> Result<Self, Self::Error> {
        match repr {
            AxisRepr::Edges { edges } => Axis::from_edges(edges),
            AxisRepr::Uniform { bins, min, max } => Axis::uniform(bins, min, max),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Hist1DRepr {
    axis: Axis,
    contents: Vec<f64>,
    #[serde(default)]
    underflow: f64,
    #[serde(default)]
    overflow: f64,
}

/// One-dimensional histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Hist1DRepr")]
pub struct Hist1D {
    axis: Axis,
    /// In-range bin contents, `contents[i]` is bin `i + 1`.
    contents: Vec<f64>,
    underflow: f64,
    overflow: f64,
}

impl Hist1D {
    pub fn new(axis: Axis, contents: Vec<f64>) -> RwgtResult<Self> {
        if contents.len() != axis.bins() {
            return Err(RwgtError::Conversion(format!(
                "histogram has {} bins but {} contents",
                axis.bins(),
                contents.len()
            )));
        }
        Ok(Self {
            axis,
            contents,
            underflow: 0.0,
            overflow: 0.0,
        })
    }

    pub fn axis(&self) -> &Axis {
        &self.axis
    }

    pub fn bin_content(&self, bin: usize) -> f64 {
        match bin {
            0 => self.underflow,
            b if b <= self.contents.len() => self.contents[b - 1],
            _ => self.overflow,
        }
    }

    pub fn value(&self, x: f64) -> f64 {
        self.bin_content(self.axis.find_bin(x))
    }
}

impl TryFrom<Hist1DRepr> for Hist1D {
    type Error = RwgtError;

    fn try_from(repr: Hist1DRepr) -> Result<Self, Self::Error> {
        let mut hist = Hist1D::new(repr.axis, repr.contents)?;
        hist.underflow = repr.underflow;
        hist.overflow = repr.overflow;
        Ok(hist)
    }
}

/// Inclusive bin-number window. `last: None` means the last in-range bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinRange {
    pub first: usize,
    pub last: Option<usize>,
}

impl BinRange {
    /// Every in-range bin, excluding underflow and overflow.
    pub const FULL: BinRange = BinRange {
        first: 1,
        last: None,
    };

    pub fn new(first: usize, last: usize) -> Self {
        Self {
            first,
            last: Some(last),
        }
    }

    fn pin(&self, bin: usize, nbins: usize) -> usize {
        let last = self.last.unwrap_or(nbins);
        if bin > last {
            last
        } else if bin < self.first {
            self.first
        } else {
            bin
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Hist2DRepr {
    x: Axis,
    y: Axis,
    contents: Vec<Vec<f64>>,
}

/// Two-dimensional histogram; bins outside the axes read as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Hist2DRepr")]
pub struct Hist2D {
    x: Axis,
    y: Axis,
    /// `contents[ix - 1][iy - 1]` for in-range bins.
    contents: Vec<Vec<f64>>,
}

impl Hist2D {
    pub fn new(x: Axis, y: Axis, contents: Vec<Vec<f64>>) -> RwgtResult<Self> {
        if contents.len() != x.bins() || contents.iter().any(|row| row.len() != y.bins()) {
            return Err(RwgtError::Conversion(format!(
                "2D histogram contents must be {} rows of {} values",
                x.bins(),
                y.bins()
            )));
        }
        Ok(Self { x, y, contents })
    }

    pub fn x_axis(&self) -> &Axis {
        &self.x
    }

    pub fn y_axis(&self) -> &Axis {
        &self.y
    }

    pub fn bin_content(&self, ix: usize, iy: usize) -> f64 {
        if ix == 0 || iy == 0 || ix > self.x.bins() || iy > self.y.bins() {
            return 0.0;
        }
        self.contents[ix - 1][iy - 1]
    }

    pub fn value(&self, x: f64, y: f64) -> f64 {
        self.bin_content(self.x.find_bin(x), self.y.find_bin(y))
    }

    /// First y bin in which any x bin exceeds `threshold`.
    pub fn first_y_bin_above(&self, threshold: f64) -> Option<usize> {
        (1..=self.y.bins()).find(|&iy| (1..=self.x.bins()).any(|ix| self.bin_content(ix, iy) > threshold))
    }

    /// Look up `(x, y)` with bin numbers pinned into the given windows and
    /// the result pinned into `[lo, hi]`.
    pub fn value_in_range(
        &self,
        x: f64,
        y: f64,
        x_bins: BinRange,
        y_bins: BinRange,
        (lo, hi): (f64, f64),
    ) -> f64 {
        let ix = x_bins.pin(self.x.find_bin(x), self.x.bins());
        let iy = y_bins.pin(self.y.find_bin(y), self.y.bins());
        let val = self.bin_content(ix, iy);
        if val < lo {
            lo
        } else if val > hi {
            hi
        } else {
            val
        }
    }
}

impl TryFrom<Hist2DRepr> for Hist2D {
    type Error = RwgtError;

    fn try_from(repr: Hist2DRepr) -> Result<Self, Self::Error> {
        Hist2D::new(repr.x, repr.y, repr.contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Hist2D {
        // x: [0,1,2], y: [0,1,2,3]; the first y bin is empty.
        Hist2D::new(
            Axis::uniform(2, 0.0, 2.0).unwrap(),
            Axis::uniform(3, 0.0, 3.0).unwrap(),
            vec![vec![0.0, 1.1, 1.2], vec![0.0, 2.5, 0.9]],
        )
        .unwrap()
    }

    #[test]
    fn test_find_bin_root_numbering() {
        let axis = Axis::from_edges(vec![0.0, 0.5, 2.0]).unwrap();
        assert_eq!(axis.find_bin(-0.1), 0);
        assert_eq!(axis.find_bin(0.0), 1);
        assert_eq!(axis.find_bin(0.49), 1);
        assert_eq!(axis.find_bin(0.5), 2);
        assert_eq!(axis.find_bin(2.0), 3);
        assert_eq!(axis.find_bin(f64::NAN), 3);
    }

    #[test]
    fn test_axis_validation() {
        assert!(Axis::from_edges(vec![1.0]).is_err());
        assert!(Axis::from_edges(vec![0.0, 0.0, 1.0]).is_err());
        assert!(Axis::uniform(0, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_hist1d_value() {
        let h = Hist1D::new(Axis::uniform(2, 0.0, 1.0).unwrap(), vec![0.8, 0.95]).unwrap();
        assert_eq!(h.value(0.1), 0.8);
        assert_eq!(h.value(0.7), 0.95);
        assert_eq!(h.value(5.0), 0.0);
    }

    #[test]
    fn test_first_y_bin_above() {
        assert_eq!(grid().first_y_bin_above(0.0), Some(2));
    }

    #[test]
    fn test_value_in_range_pins_bins_and_values() {
        let h = grid();
        // Far outside in x and below the minimum y bin.
        assert_eq!(h.value_in_range(10.0, 0.2, BinRange::FULL, BinRange::new(2, 3), (0.0, 2.0)), 2.0);
        assert_eq!(h.value_in_range(-1.0, 0.2, BinRange::FULL, BinRange::new(2, 3), (0.0, 2.0)), 1.1);
        assert_eq!(h.value_in_range(1.5, 9.0, BinRange::FULL, BinRange::FULL, (0.0, 2.0)), 0.9);
        assert_eq!(h.value(10.0, 0.2), 0.0);
    }

    #[test]
    fn test_deserialize_uniform_axis() {
        let h: Hist1D = serde_json::from_str(
            r#"{"axis": {"bins": 2, "min": 0.0, "max": 2.0}, "contents": [1.0, 2.0], "overflow": 3.0}"#,
        )
        .unwrap();
        assert_eq!(h.value(1.5), 2.0);
        assert_eq!(h.value(7.0), 3.0);
    }

    #[test]
    fn test_deserialize_rejects_shape_mismatch() {
        let res: Result<Hist2D, _> = serde_json::from_str(
            r#"{"x": {"edges": [0, 1]}, "y": {"edges": [0, 1, 2]}, "contents": [[1.0]]}"#,
        );
        assert!(res.is_err());
    }
}
