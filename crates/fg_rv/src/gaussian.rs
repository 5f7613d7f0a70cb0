//! Gaussian random variables.
//!
//! Stored in information form: the precision matrix `W = Σ⁻¹` and the
//! precision-mean vector `Wm = Σ⁻¹·μ`. The product of two densities is the
//! sum of their information forms, which is what makes this the natural
//! parametrization for message passing.

use ndarray::Axis;
use ndarray_inverse::Inverse;

use crate::{Float, Matrix, RandomVariableError, Result, VariableId, Vector};

fn allclose<'a>(
    a: impl IntoIterator<Item = &'a Float>,
    b: impl IntoIterator<Item = &'a Float>,
) -> bool {
    a.into_iter()
        .zip(b)
        .all(|(x, y)| x == y || (x - y).abs() <= 1.0e-8 + 1.0e-5 * y.abs())
}

#[derive(Debug, Clone)]
pub struct Gaussian {
    /// Precision-mean vector `Wm`.
    information: Vector<Float>,
    /// Precision matrix `W`.
    precision: Matrix<Float>,
    dims: Vec<VariableId>,
}

impl Gaussian {
    /// Create a gaussian random variable from its mean vector and covariance
    /// matrix.
    pub fn from_mean_and_covariance(
        mean: Vector<Float>,
        covariance: Matrix<Float>,
        dims: Vec<VariableId>,
    ) -> Result<Self> {
        if !covariance.is_square() {
            return Err(RandomVariableError::NonSquarePrecisionMatrix(
                covariance.nrows(),
                covariance.ncols(),
            ));
        }
        if mean.len() != covariance.nrows() || mean.len() != covariance.ncols() {
            return Err(RandomVariableError::VectorLengthNotEqualMatrixShape(
                mean.len(),
                covariance.nrows(),
                covariance.ncols(),
            ));
        }
        if dims.len() != mean.len() {
            return Err(RandomVariableError::DimensionMismatch {
                rank: mean.len(),
                dims: dims.len(),
            });
        }
        let Some(precision) = covariance.inv() else {
            return Err(RandomVariableError::NonInvertibleCovarianceMatrix);
        };
        let information = precision.dot(&mean);
        Ok(Self {
            information,
            precision,
            dims,
        })
    }

    /// Create a gaussian random variable in information form.
    ///
    /// A zero precision matrix is permitted; that is the multiplicative
    /// identity, see [`Self::unity`].
    pub fn from_information_and_precision(
        information: Vector<Float>,
        precision: Matrix<Float>,
        dims: Vec<VariableId>,
    ) -> Result<Self> {
        if !precision.is_square() {
            return Err(RandomVariableError::NonSquarePrecisionMatrix(
                precision.nrows(),
                precision.ncols(),
            ));
        }
        if information.len() != precision.nrows() || information.len() != precision.ncols() {
            return Err(RandomVariableError::VectorLengthNotEqualMatrixShape(
                information.len(),
                precision.nrows(),
                precision.ncols(),
            ));
        }
        if dims.len() != information.len() {
            return Err(RandomVariableError::DimensionMismatch {
                rank: information.len(),
                dims: dims.len(),
            });
        }
        Ok(Self {
            information,
            precision,
            dims,
        })
    }

    /// The multiplicative identity over the given dimensions: zero mean and
    /// infinite covariance, i.e. zero precision in information form.
    #[must_use]
    pub fn unity(dims: &[VariableId]) -> Self {
        let n = dims.len();
        Self {
            information: Vector::zeros(n),
            precision: Matrix::zeros((n, n)),
            dims: dims.to_vec(),
        }
    }

    #[must_use]
    pub fn dims(&self) -> &[VariableId] {
        &self.dims
    }

    /// Get the precision-mean vector `Wm` of the gaussian.
    #[inline]
    #[must_use]
    pub fn information_vector(&self) -> &Vector<Float> {
        &self.information
    }

    /// Get the precision matrix `W` of the gaussian.
    #[inline]
    #[must_use]
    pub fn precision_matrix(&self) -> &Matrix<Float> {
        &self.precision
    }

    /// The mean vector `W⁻¹·Wm`.
    pub fn mean(&self) -> Result<Vector<Float>> {
        let covariance = self.covariance()?;
        Ok(covariance.dot(&self.information))
    }

    /// The covariance matrix `W⁻¹`. Not stored internally, so an owned value
    /// is returned.
    pub fn covariance(&self) -> Result<Matrix<Float>> {
        self.precision
            .inv()
            .ok_or(RandomVariableError::NonInvertiblePrecisionMatrix)
    }

    /// Product of two gaussian densities: the information forms add. The
    /// operands must share their dimension tuple.
    pub fn product(&self, other: &Self) -> Result<Self> {
        if self.dims != other.dims {
            return Err(RandomVariableError::DimsDisagree);
        }
        Ok(Self {
            information: &self.information + &other.information,
            precision: &self.precision + &other.precision,
            dims: self.dims.clone(),
        })
    }

    /// The distribution of the sum of two independent gaussian variables:
    /// means and covariances add in moment form.
    pub fn sum(&self, other: &Self) -> Result<Self> {
        if self.dims != other.dims {
            return Err(RandomVariableError::DimsDisagree);
        }
        Self::from_mean_and_covariance(
            self.mean()? + other.mean()?,
            self.covariance()? + other.covariance()?,
            self.dims.clone(),
        )
    }

    /// The distribution of the difference of two independent gaussian
    /// variables.
    pub fn difference(&self, other: &Self) -> Result<Self> {
        if self.dims != other.dims {
            return Err(RandomVariableError::DimsDisagree);
        }
        Self::from_mean_and_covariance(
            self.mean()? - other.mean()?,
            self.covariance()? - other.covariance()?,
            self.dims.clone(),
        )
    }

    /// Project the joint onto the dimensions not named in `over`: the mean
    /// and covariance are sliced to the retained axes.
    pub fn marginalize(&self, over: &[VariableId]) -> Result<Self> {
        for d in over {
            if !self.dims.contains(d) {
                return Err(RandomVariableError::UnknownDim(*d));
            }
        }
        let retained: Vec<usize> = self
            .dims
            .iter()
            .enumerate()
            .filter(|(_, d)| !over.contains(d))
            .map(|(i, _)| i)
            .collect();
        let dims: Vec<VariableId> = retained.iter().map(|&i| self.dims[i]).collect();
        let mean = self.mean()?.select(Axis(0), &retained);
        let covariance = self
            .covariance()?
            .select(Axis(0), &retained)
            .select(Axis(1), &retained);
        Self::from_mean_and_covariance(mean, covariance, dims)
    }

    /// The maximizer of a gaussian is its mean, so maximizing out dimensions
    /// is the same shape transform as marginalizing them out.
    pub fn maximize(&self, over: &[VariableId]) -> Result<Self> {
        self.marginalize(over)
    }

    /// The peak density `(2π)^{d/2}·√det(Σ)` of the distribution.
    pub fn max(&self) -> Result<Float> {
        let covariance = self.covariance()?;
        #[allow(clippy::cast_precision_loss)]
        let d = self.dims.len() as Float;
        Ok((2.0 * std::f64::consts::PI).powf(d / 2.0) * covariance.det().sqrt())
    }

    /// The peak density of the marginal over dimension `dim`.
    pub fn max_over(&self, dim: VariableId) -> Result<Float> {
        self.marginal_over(dim)?.max()
    }

    /// The maximizing assignment: the mean vector.
    pub fn argmax(&self) -> Result<Vector<Float>> {
        self.mean()
    }

    /// The maximizing assignment of dimension `dim`: its marginal mean.
    pub fn argmax_over(&self, dim: VariableId) -> Result<Float> {
        let position = self
            .dims
            .iter()
            .position(|d| *d == dim)
            .ok_or(RandomVariableError::UnknownDim(dim))?;
        Ok(self.mean()?[position])
    }

    fn marginal_over(&self, dim: VariableId) -> Result<Self> {
        if !self.dims.contains(&dim) {
            return Err(RandomVariableError::UnknownDim(dim));
        }
        let others: Vec<VariableId> = self.dims.iter().filter(|d| **d != dim).copied().collect();
        self.marginalize(&others)
    }
}

impl PartialEq for Gaussian {
    fn eq(&self, other: &Self) -> bool {
        self.dims == other.dims
            && self.precision.shape() == other.precision.shape()
            && allclose(&self.information, &other.information)
            && allclose(&self.precision, &other.precision)
    }
}
