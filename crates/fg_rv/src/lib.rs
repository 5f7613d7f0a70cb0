//! Random variable algebra for factor graph message passing.
//!
//! Messages and factors are random variables over a tuple of named
//! dimensions. Two kinds exist: [`Discrete`] stores a probability mass
//! tensor, [`Gaussian`] stores a multivariate normal in information form.
//! Both support the capability set the message passing algorithms rely on:
//! multiply, marginalize, maximize, argmax, normalize and the log channel.

pub mod discrete;
pub mod gaussian;

pub use discrete::Discrete;
pub use gaussian::Gaussian;

pub mod prelude {
    pub use super::{
        Discrete, Float, Gaussian, Matrix, RandomVariable, RandomVariableError, Result, RvKind,
        VariableId, Vector,
    };
}

/// The precision of the floating point type used for probability masses,
/// means and precisions.
pub type Float = f64;

pub type Vector<T> = ndarray::Array1<T>;
pub type Matrix<T> = ndarray::Array2<T>;
/// Dynamic-rank tensor used for discrete probability mass functions.
pub type Tensor<T> = ndarray::ArrayD<T>;

/// Stable integer id tagging one axis of a joint distribution.
///
/// Every variable node of a factor graph is assigned one id when it is
/// inserted; random variables align their tensor axes through these ids,
/// never through labels.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    derive_more::From,
    derive_more::Display,
)]
pub struct VariableId(pub usize);

#[derive(Debug, thiserror::Error)]
pub enum RandomVariableError {
    #[error("the pmf has rank {rank}, but {dims} dimension(s) were named")]
    DimensionMismatch { rank: usize, dims: usize },
    #[error("probability masses must be finite and nonnegative")]
    InvalidMass,
    #[error("dimension {0} is not part of this random variable")]
    UnknownDim(VariableId),
    #[error("the state spaces disagree on dimension {0}")]
    IncompatibleStateSpace(VariableId),
    #[error("the operands are defined over different dimension tuples")]
    DimsDisagree,
    #[error("the operands are random variables of different kinds")]
    KindMismatch,
    #[error("cannot normalize a distribution with zero total mass")]
    ZeroMass,
    #[error("state {state} is out of range for a variable with {states} states")]
    StateOutOfRange { state: usize, states: usize },
    #[error("the sum of random variables is only defined for one-dimensional pmfs")]
    NotOneDimensional,
    #[error("the maximizing state of this random variable kind is not a state index")]
    ArgmaxNotIndexed,
    #[error("the natural logarithm is not defined for a gaussian random variable")]
    LogNotDefined,
    #[error("the precision matrix is not square, it has shape {0}x{1}")]
    NonSquarePrecisionMatrix(usize, usize),
    #[error(
        "the length of the vector ({0}) is not equal to the number of rows ({1}) or columns ({2}) \
         of the matrix"
    )]
    VectorLengthNotEqualMatrixShape(usize, usize, usize),
    #[error("the covariance matrix is not invertible, which is required to calculate the precision matrix")]
    NonInvertibleCovarianceMatrix,
    #[error("the precision matrix is not invertible, which is required to calculate the covariance matrix")]
    NonInvertiblePrecisionMatrix,
}

pub type Result<T> = std::result::Result<T, RandomVariableError>;

/// The kind of random variable a variable node ranges over.
///
/// Used to mint the multiplicative identity for freshly created edges and
/// unobserved variable nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RvKind {
    Discrete,
    Gaussian,
}

impl RvKind {
    /// The multiplicative identity of this kind over the given dimensions.
    #[must_use]
    pub fn unity(self, dims: &[VariableId]) -> RandomVariable {
        match self {
            Self::Discrete => RandomVariable::Discrete(Discrete::unity(dims)),
            Self::Gaussian => RandomVariable::Gaussian(Gaussian::unity(dims)),
        }
    }
}

/// A message or factor value: a tagged union over the supported random
/// variable kinds.
///
/// Binary operations require both operands to be of the same kind and
/// surface [`RandomVariableError::KindMismatch`] otherwise.
#[derive(Debug, Clone, PartialEq, derive_more::IsVariant)]
pub enum RandomVariable {
    Discrete(Discrete),
    Gaussian(Gaussian),
}

impl RandomVariable {
    #[must_use]
    pub fn kind(&self) -> RvKind {
        match self {
            Self::Discrete(_) => RvKind::Discrete,
            Self::Gaussian(_) => RvKind::Gaussian,
        }
    }

    /// The ordered dimension tuple of this random variable.
    #[must_use]
    pub fn dims(&self) -> &[VariableId] {
        match self {
            Self::Discrete(d) => d.dims(),
            Self::Gaussian(g) => g.dims(),
        }
    }

    /// Returns `Some(&Discrete)` if the variant is [`Discrete`], otherwise
    /// `None`.
    ///
    /// [`Discrete`]: RandomVariable::Discrete
    #[must_use]
    pub fn as_discrete(&self) -> Option<&Discrete> {
        if let Self::Discrete(ref d) = self {
            Some(d)
        } else {
            None
        }
    }

    /// Returns `Some(&Gaussian)` if the variant is [`Gaussian`], otherwise
    /// `None`.
    ///
    /// [`Gaussian`]: RandomVariable::Gaussian
    #[must_use]
    pub fn as_gaussian(&self) -> Option<&Gaussian> {
        if let Self::Gaussian(ref g) = self {
            Some(g)
        } else {
            None
        }
    }

    /// Pointwise product of two random variables of the same kind.
    ///
    /// Discrete operands are aligned by broadcast-expansion; gaussian
    /// operands must share their dimension tuple. The result is never
    /// normalized.
    pub fn product(&self, other: &Self) -> Result<Self> {
        match (self, other) {
            (Self::Discrete(a), Self::Discrete(b)) => a.product(b).map(Self::Discrete),
            (Self::Gaussian(a), Self::Gaussian(b)) => a.product(b).map(Self::Gaussian),
            _ => Err(RandomVariableError::KindMismatch),
        }
    }

    /// The distribution of the sum of two independent random variables of
    /// the same kind over the same dimensions.
    pub fn sum(&self, other: &Self) -> Result<Self> {
        match (self, other) {
            (Self::Discrete(a), Self::Discrete(b)) => a.sum(b).map(Self::Discrete),
            (Self::Gaussian(a), Self::Gaussian(b)) => a.sum(b).map(Self::Gaussian),
            _ => Err(RandomVariableError::KindMismatch),
        }
    }

    /// The distribution of the difference of two independent random
    /// variables of the same kind over the same dimensions.
    pub fn difference(&self, other: &Self) -> Result<Self> {
        match (self, other) {
            (Self::Discrete(a), Self::Discrete(b)) => a.difference(b).map(Self::Discrete),
            (Self::Gaussian(a), Self::Gaussian(b)) => a.difference(b).map(Self::Gaussian),
            _ => Err(RandomVariableError::KindMismatch),
        }
    }

    /// The log-domain counterpart of [`Self::product`]: elementwise addition
    /// of log masses. Only defined for the discrete kind, since the gaussian
    /// log channel is unsupported.
    pub fn log_product(&self, other: &Self) -> Result<Self> {
        match (self, other) {
            (Self::Discrete(a), Self::Discrete(b)) => a.log_product(b).map(Self::Discrete),
            (Self::Gaussian(_), Self::Gaussian(_)) => Err(RandomVariableError::LogNotDefined),
            _ => Err(RandomVariableError::KindMismatch),
        }
    }

    /// Remove the named dimensions by summation (discrete) or projection
    /// (gaussian).
    pub fn marginalize(&self, over: &[VariableId], normalize: bool) -> Result<Self> {
        match self {
            Self::Discrete(d) => d.marginalize(over, normalize).map(Self::Discrete),
            Self::Gaussian(g) => g.marginalize(over).map(Self::Gaussian),
        }
    }

    /// Remove the named dimensions by maximization (discrete) or projection
    /// (gaussian).
    pub fn maximize(&self, over: &[VariableId], normalize: bool) -> Result<Self> {
        match self {
            Self::Discrete(d) => d.maximize(over, normalize).map(Self::Discrete),
            Self::Gaussian(g) => g.maximize(over).map(Self::Gaussian),
        }
    }

    /// The global maximum: the largest probability mass, or the gaussian
    /// peak density.
    pub fn max(&self) -> Result<Float> {
        match self {
            Self::Discrete(d) => Ok(d.max()),
            Self::Gaussian(g) => g.max(),
        }
    }

    /// The state index maximizing the marginal over dimension `dim`.
    ///
    /// Only the discrete kind indexes its states; the gaussian maximizer is
    /// its mean and surfaces [`RandomVariableError::ArgmaxNotIndexed`].
    pub fn argmax_index(&self, dim: VariableId) -> Result<usize> {
        match self {
            Self::Discrete(d) => d.argmax_over(dim),
            Self::Gaussian(_) => Err(RandomVariableError::ArgmaxNotIndexed),
        }
    }

    /// Divide by the total mass. A no-op for the gaussian kind, whose
    /// information form is self-normalizing.
    pub fn normalize(&self) -> Result<Self> {
        match self {
            Self::Discrete(d) => d.normalized().map(Self::Discrete),
            Self::Gaussian(g) => Ok(Self::Gaussian(g.clone())),
        }
    }

    /// The natural logarithm of the random variable.
    pub fn log(&self) -> Result<Self> {
        match self {
            Self::Discrete(d) => Ok(Self::Discrete(d.log())),
            Self::Gaussian(_) => Err(RandomVariableError::LogNotDefined),
        }
    }

    /// The elementwise exponential, undoing [`Self::log`].
    pub fn exp(&self) -> Result<Self> {
        match self {
            Self::Discrete(d) => Ok(Self::Discrete(d.exp())),
            Self::Gaussian(_) => Err(RandomVariableError::LogNotDefined),
        }
    }
}

impl From<Discrete> for RandomVariable {
    fn from(d: Discrete) -> Self {
        Self::Discrete(d)
    }
}

impl From<Gaussian> for RandomVariable {
    fn from(g: Gaussian) -> Self {
        Self::Gaussian(g)
    }
}
