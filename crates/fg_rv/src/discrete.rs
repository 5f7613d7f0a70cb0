//! Discrete random variables.
//!
//! A discrete random variable stores a probability mass tensor of rank `r`
//! together with the `r` dimension ids naming its axes. The mass need not be
//! normalized; the message passing algorithms defer normalization to belief
//! time to keep the algebraic identities intact.

use ndarray::{Axis, IxDyn};

use crate::{Float, RandomVariableError, Result, Tensor, VariableId};

/// Elementwise `allclose` with the usual absolute and relative tolerances.
fn allclose(a: &Tensor<Float>, b: &Tensor<Float>) -> bool {
    a.shape() == b.shape()
        && a.iter()
            .zip(b.iter())
            .all(|(x, y)| x == y || (x - y).abs() <= 1.0e-8 + 1.0e-5 * y.abs())
}

/// Discrete convolution of two sequences, trimmed to `max(|a|, |b|)` centered
/// entries of the full convolution.
fn convolve_same(a: &[Float], b: &[Float]) -> Vec<Float> {
    let (m, n) = (a.len(), b.len());
    let mut full = vec![0.0; m + n - 1];
    for (i, &x) in a.iter().enumerate() {
        for (j, &y) in b.iter().enumerate() {
            full[i + j] += x * y;
        }
    }
    let offset = (m.min(n) - 1) / 2;
    full[offset..offset + m.max(n)].to_vec()
}

#[derive(Debug, Clone)]
pub struct Discrete {
    pmf: Tensor<Float>,
    dims: Vec<VariableId>,
}

impl Discrete {
    /// Create a discrete random variable from a probability mass tensor and
    /// the ids naming its axes.
    ///
    /// The mass does not have to sum to one, but every entry must be finite
    /// and nonnegative.
    pub fn new(pmf: Tensor<Float>, dims: Vec<VariableId>) -> Result<Self> {
        if pmf.ndim() != dims.len() {
            return Err(RandomVariableError::DimensionMismatch {
                rank: pmf.ndim(),
                dims: dims.len(),
            });
        }
        if pmf.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(RandomVariableError::InvalidMass);
        }
        Ok(Self { pmf, dims })
    }

    /// The multiplicative identity over the given dimensions: an all-ones
    /// tensor of singleton shape, stretched on demand by broadcast-expansion.
    #[must_use]
    pub fn unity(dims: &[VariableId]) -> Self {
        Self {
            pmf: Tensor::ones(IxDyn(&vec![1; dims.len()])),
            dims: dims.to_vec(),
        }
    }

    /// A distribution placing unit mass on a single state, used as the init
    /// of observed variable nodes.
    pub fn delta(states: usize, state: usize, dim: VariableId) -> Result<Self> {
        if state >= states {
            return Err(RandomVariableError::StateOutOfRange { state, states });
        }
        let mut pmf = Tensor::zeros(IxDyn(&[states]));
        pmf[state] = 1.0;
        Ok(Self {
            pmf,
            dims: vec![dim],
        })
    }

    #[must_use]
    pub fn pmf(&self) -> &Tensor<Float> {
        &self.pmf
    }

    #[must_use]
    pub fn dims(&self) -> &[VariableId] {
        &self.dims
    }

    fn position(&self, dim: VariableId) -> Option<usize> {
        self.dims.iter().position(|d| *d == dim)
    }

    /// Align this pmf to a superset dimension tuple: axes already present are
    /// permuted into the target's relative order, missing axes are inserted
    /// as singletons in ascending target position and tiled up to the target
    /// state space.
    fn expanded(&self, target_dims: &[VariableId], target_shape: &[usize]) -> Result<Tensor<Float>> {
        let mut positions = Vec::with_capacity(self.dims.len());
        for d in &self.dims {
            let Some(p) = target_dims.iter().position(|t| t == d) else {
                return Err(RandomVariableError::UnknownDim(*d));
            };
            positions.push(p);
        }
        let mut order: Vec<usize> = (0..self.dims.len()).collect();
        order.sort_by_key(|&i| positions[i]);
        let mut pmf = self.pmf.clone().permuted_axes(IxDyn(&order));
        for (i, d) in target_dims.iter().enumerate() {
            if !self.dims.contains(d) {
                pmf = pmf.insert_axis(Axis(i));
            }
        }
        let pmf = pmf
            .broadcast(IxDyn(target_shape))
            .ok_or(RandomVariableError::DimsDisagree)?
            .to_owned();
        Ok(pmf)
    }

    /// Combine two operands elementwise after aligning them to the superset
    /// of their dimension tuples. The longer operand's dim order wins; ties
    /// go to the left operand.
    fn combined(&self, other: &Self, op: impl Fn(Float, Float) -> Float) -> Result<Self> {
        let leader = if self.dims.len() >= other.dims.len() {
            self
        } else {
            other
        };
        let follower = if std::ptr::eq(leader, self) { other } else { self };
        let mut target_dims = leader.dims.clone();
        for d in &follower.dims {
            if !target_dims.contains(d) {
                target_dims.push(*d);
            }
        }
        let mut target_shape = Vec::with_capacity(target_dims.len());
        for d in &target_dims {
            let sa = self.position(*d).map_or(1, |i| self.pmf.shape()[i]);
            let sb = other.position(*d).map_or(1, |i| other.pmf.shape()[i]);
            if sa != sb && sa.min(sb) != 1 {
                return Err(RandomVariableError::IncompatibleStateSpace(*d));
            }
            target_shape.push(sa.max(sb));
        }
        let a = self.expanded(&target_dims, &target_shape)?;
        let b = other.expanded(&target_dims, &target_shape)?;
        let mut pmf = a;
        pmf.zip_mut_with(&b, |x, &y| *x = op(*x, y));
        Ok(Self {
            pmf,
            dims: target_dims,
        })
    }

    /// Pointwise product. The result is **not** normalized; callers
    /// normalize beliefs explicitly.
    pub fn product(&self, other: &Self) -> Result<Self> {
        self.combined(other, |a, b| a * b)
    }

    /// Pointwise addition of log masses: the product in the log domain, used
    /// by the max-sum message operators.
    pub fn log_product(&self, other: &Self) -> Result<Self> {
        self.combined(other, |a, b| a + b)
    }

    /// The distribution of the sum of two independent integer-valued
    /// variables over the same dimension: a discrete convolution trimmed to
    /// the length of the operands.
    pub fn sum(&self, other: &Self) -> Result<Self> {
        self.convolved(other, false)
    }

    /// The distribution of the difference of two independent integer-valued
    /// variables over the same dimension.
    pub fn difference(&self, other: &Self) -> Result<Self> {
        self.convolved(other, true)
    }

    fn convolved(&self, other: &Self, reversed: bool) -> Result<Self> {
        if self.dims != other.dims {
            return Err(RandomVariableError::DimsDisagree);
        }
        if self.pmf.ndim() != 1 || other.pmf.ndim() != 1 {
            return Err(RandomVariableError::NotOneDimensional);
        }
        let mut a: Vec<Float> = self.pmf.iter().copied().collect();
        if reversed {
            a.reverse();
        }
        let b: Vec<Float> = other.pmf.iter().copied().collect();
        let pmf = ndarray::Array1::from_vec(convolve_same(&a, &b)).into_dyn();
        Ok(Self {
            pmf,
            dims: self.dims.clone(),
        })
    }

    fn reduced(
        &self,
        over: &[VariableId],
        normalize: bool,
        fold: impl Fn(&Tensor<Float>, Axis) -> Tensor<Float>,
    ) -> Result<Self> {
        let mut axes = Vec::with_capacity(over.len());
        for d in over {
            axes.push(
                self.position(*d)
                    .ok_or(RandomVariableError::UnknownDim(*d))?,
            );
        }
        axes.sort_unstable();
        axes.dedup();
        let mut pmf = self.pmf.clone();
        for &ax in axes.iter().rev() {
            pmf = fold(&pmf, Axis(ax));
        }
        let dims = self
            .dims
            .iter()
            .filter(|d| !over.contains(d))
            .copied()
            .collect();
        let out = Self { pmf, dims };
        if normalize {
            out.normalized()
        } else {
            Ok(out)
        }
    }

    /// Sum out the named dimensions; the remaining dimensions keep their
    /// order.
    pub fn marginalize(&self, over: &[VariableId], normalize: bool) -> Result<Self> {
        self.reduced(over, normalize, |pmf, axis| pmf.sum_axis(axis))
    }

    /// Maximize out the named dimensions; the remaining dimensions keep
    /// their order.
    pub fn maximize(&self, over: &[VariableId], normalize: bool) -> Result<Self> {
        self.reduced(over, normalize, |pmf, axis| {
            pmf.fold_axis(axis, Float::NEG_INFINITY, |acc, x| acc.max(*x))
        })
    }

    /// The largest mass in the tensor.
    #[must_use]
    pub fn max(&self) -> Float {
        self.pmf.iter().copied().fold(Float::NEG_INFINITY, Float::max)
    }

    /// The largest mass of the normalized marginal over dimension `dim`.
    pub fn max_over(&self, dim: VariableId) -> Result<Float> {
        let others = self.others(dim)?;
        Ok(self.marginalize(&others, true)?.max())
    }

    /// The multi-index of the global maximum, in dimension order. On ties
    /// the first occurrence in row-major order wins.
    #[must_use]
    pub fn argmax(&self) -> Vec<usize> {
        let mut best = (0, Float::NEG_INFINITY);
        for (i, &v) in self.pmf.iter().enumerate() {
            if v > best.1 {
                best = (i, v);
            }
        }
        let shape = self.pmf.shape();
        let mut index = vec![0; shape.len()];
        let mut rest = best.0;
        for (i, &s) in shape.iter().enumerate().rev() {
            index[i] = rest % s;
            rest /= s;
        }
        index
    }

    /// The state index maximizing the marginal over dimension `dim`, with
    /// every other dimension summed out.
    pub fn argmax_over(&self, dim: VariableId) -> Result<usize> {
        let others = self.others(dim)?;
        let marginal = self.marginalize(&others, false)?;
        Ok(marginal.argmax()[0])
    }

    fn others(&self, dim: VariableId) -> Result<Vec<VariableId>> {
        if !self.dims.contains(&dim) {
            return Err(RandomVariableError::UnknownDim(dim));
        }
        Ok(self.dims.iter().filter(|d| **d != dim).copied().collect())
    }

    /// Divide by the total mass.
    pub fn normalized(&self) -> Result<Self> {
        let total = self.pmf.sum();
        if total == 0.0 {
            return Err(RandomVariableError::ZeroMass);
        }
        Ok(Self {
            pmf: &self.pmf / total,
            dims: self.dims.clone(),
        })
    }

    /// The natural logarithm of the mass tensor. The result is no longer a
    /// probability mass function but is a valid log-domain message.
    #[must_use]
    pub fn log(&self) -> Self {
        Self {
            pmf: self.pmf.mapv(Float::ln),
            dims: self.dims.clone(),
        }
    }

    /// The elementwise exponential, undoing [`Self::log`].
    #[must_use]
    pub fn exp(&self) -> Self {
        Self {
            pmf: self.pmf.mapv(Float::exp),
            dims: self.dims.clone(),
        }
    }

    /// Clip every mass up to at least `floor`, so that a subsequent [`log`]
    /// stays finite.
    ///
    /// [`log`]: Self::log
    #[must_use]
    pub fn floored(&self, floor: Float) -> Self {
        Self {
            pmf: self.pmf.mapv(|p| p.max(floor)),
            dims: self.dims.clone(),
        }
    }
}

impl PartialEq for Discrete {
    fn eq(&self, other: &Self) -> bool {
        self.dims == other.dims && allclose(&self.pmf, &other.pmf)
    }
}
