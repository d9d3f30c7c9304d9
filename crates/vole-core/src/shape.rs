use std::fmt;

// Shape - N-dimensional shape representation
//
// A Shape describes the size of each dimension of a tensor:
//   - Scalar: Shape([])          - 0 dimensions, 1 element
//   - Vector: Shape([5])         - 1 dimension, 5 elements
//   - Column: Shape([5, 1])      - a vector written as a 5x1 matrix
//   - Row:    Shape([1, 5])      - a vector written as a 1x5 matrix
//   - Matrix: Shape([3, 4])      - 2 dimensions, 12 elements
//   - Image:  Shape([2, 3, 4, 4]) - batch, channel, height, width
//
// Vector orientation matters to `dot`, so the classification helpers below
// are part of the public contract.

/// N-dimensional shape of a tensor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape(Vec<usize>);

impl Shape {
    /// Create a new shape from a vector of dimension sizes.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape(dims)
    }

    /// The dimension sizes as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Number of dimensions (0 for scalar, 1 for vector, 2 for matrix, etc.).
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Total number of elements (product of all dimensions).
    /// A scalar shape [] has 1 element; any zero dimension gives 0.
    pub fn elem_count(&self) -> usize {
        self.0.iter().product::<usize>()
    }

    /// Compute the contiguous (row-major / C-order) strides for this shape.
    ///
    /// For shape [2, 3, 4], strides are [12, 4, 1].
    pub fn stride_contiguous(&self) -> Vec<usize> {
        let mut strides = vec![0usize; self.rank()];
        if self.rank() > 0 {
            strides[self.rank() - 1] = 1;
            for i in (0..self.rank() - 1).rev() {
                strides[i] = strides[i + 1] * self.0[i + 1];
            }
        }
        strides
    }

    // Classification

    /// Rank 0, or a rank-1 shape holding a single element.
    pub fn is_scalar(&self) -> bool {
        self.0.is_empty() || (self.0.len() == 1 && self.0[0] == 1)
    }

    /// `(n, 1)` with `n > 1`.
    pub fn is_col_vec(&self) -> bool {
        self.0.len() == 2 && self.0[1] == 1 && self.0[0] > 1
    }

    /// `(1, n)` with `n > 1`.
    pub fn is_row_vec(&self) -> bool {
        self.0.len() == 2 && self.0[0] == 1 && self.0[1] > 1
    }

    /// A rank-1 non-scalar shape, or a row/column vector.
    pub fn is_vector(&self) -> bool {
        (self.0.len() == 1 && self.0[0] != 1) || self.is_col_vec() || self.is_row_vec()
    }

    /// Rank 2 and not a vector.
    pub fn is_matrix(&self) -> bool {
        self.0.len() == 2 && !self.is_vector()
    }

    /// Length of the vector this shape describes, if it describes one.
    ///
    /// Unlike [`Shape::is_vector`] this accepts every rank-1 shape and any
    /// rank-2 shape with a unit dimension, including `(1, 1)`.
    pub fn vector_len(&self) -> Option<usize> {
        match self.0.as_slice() {
            [n] => Some(*n),
            [n, 1] => Some(*n),
            [1, n] => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

// Convenient From implementations
// These let you write: Shape::from((3, 4)) instead of Shape::new(vec![3, 4])

impl From<()> for Shape {
    /// Scalar shape (0 dimensions).
    fn from(_: ()) -> Self {
        Shape(vec![])
    }
}

impl From<usize> for Shape {
    /// 1-D shape.
    fn from(d: usize) -> Self {
        Shape(vec![d])
    }
}

impl From<(usize, usize)> for Shape {
    fn from((d0, d1): (usize, usize)) -> Self {
        Shape(vec![d0, d1])
    }
}

impl From<(usize, usize, usize)> for Shape {
    fn from((d0, d1, d2): (usize, usize, usize)) -> Self {
        Shape(vec![d0, d1, d2])
    }
}

impl From<(usize, usize, usize, usize)> for Shape {
    fn from((d0, d1, d2, d3): (usize, usize, usize, usize)) -> Self {
        Shape(vec![d0, d1, d2, d3])
    }
}

impl From<[usize; 4]> for Shape {
    fn from(dims: [usize; 4]) -> Self {
        Shape(dims.to_vec())
    }
}

impl From<Vec<usize>> for Shape {
    fn from(v: Vec<usize>) -> Self {
        Shape(v)
    }
}

impl From<&[usize]> for Shape {
    fn from(s: &[usize]) -> Self {
        Shape(s.to_vec())
    }
}

impl From<&Shape> for Shape {
    fn from(s: &Shape) -> Self {
        s.clone()
    }
}
