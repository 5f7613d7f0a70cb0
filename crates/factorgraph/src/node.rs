//! Nodes of a factor graph.
//!
//! Variable nodes carry an identity over one dimension of the joint
//! distribution; factor nodes carry a local factor over the variables they
//! connect to. Both provide one local message operator per algorithm:
//! `spa` (sum-product), `mpa` (max-product), `msa` (max-sum, log domain) and
//! `mf` (mean-field). The operators take the messages arriving from every
//! neighbor except the target, so they stay independent of the graph
//! structure itself.

use std::collections::HashMap;

use fg_rv::{Float, RandomVariable, RvKind, VariableId};

use crate::{Error, Result};

/// Smallest probability mass fed to a logarithm, so that zero-mass states
/// stay representable in the log domain.
const MIN_PROBA: Float = 1.0e-20;

/// A variable node: one dimension of the joint distribution.
#[derive(Debug)]
pub struct VNode {
    label: String,
    kind: RvKind,
    observed: bool,
    /// Outgoing init: the unity of `kind`, or the observed distribution.
    /// `None` until the node is added to a graph and has an id.
    init: Option<RandomVariable>,
    id: Option<VariableId>,
}

impl VNode {
    #[must_use]
    pub fn new(label: impl Into<String>, kind: RvKind) -> Self {
        Self {
            label: label.into(),
            kind,
            observed: false,
            init: None,
            id: None,
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn kind(&self) -> RvKind {
        self.kind
    }

    #[must_use]
    pub fn is_observed(&self) -> bool {
        self.observed
    }

    /// The dimension id of this variable.
    ///
    /// # Panics
    ///
    /// Panics if the node has not been added to a graph yet.
    #[must_use]
    pub fn id(&self) -> VariableId {
        match self.id {
            Some(id) => id,
            None => panic!("the variable has not been added to a graph"),
        }
    }

    /// The message this node emits before any information has arrived.
    ///
    /// # Panics
    ///
    /// Panics if the node has not been added to a graph yet.
    #[must_use]
    pub fn init(&self) -> &RandomVariable {
        match &self.init {
            Some(init) => init,
            None => panic!("the variable has not been added to a graph"),
        }
    }

    pub(crate) fn set_id(&mut self, id: VariableId) {
        if self.id.is_some() {
            panic!("the variable id is already set");
        }
        self.id = Some(id);
        self.init = Some(self.kind.unity(&[id]));
    }

    /// Mark the variable as observed, with the given distribution as its
    /// outgoing message. An observation is expected to be a delta placing
    /// unit mass on the observed state.
    pub fn observe(&mut self, init: RandomVariable) -> Result<()> {
        if init.kind() != self.kind || init.dims() != [self.id()] {
            return Err(Error::InvalidObservation(self.label.clone()));
        }
        self.observed = true;
        self.init = Some(init);
        Ok(())
    }

    /// Clear an observation; the outgoing init becomes unity again.
    pub fn unobserve(&mut self) {
        self.observed = false;
        if let Some(id) = self.id {
            self.init = Some(self.kind.unity(&[id]));
        }
    }

    /// Sum-product message: the product of the incoming messages, or the
    /// init when observed.
    pub fn spa(&self, msgs: &[RandomVariable]) -> Result<RandomVariable> {
        if self.observed {
            return Ok(self.init().clone());
        }
        let mut msg = self.init().clone();
        for m in msgs {
            msg = msg.product(m)?;
        }
        Ok(msg)
    }

    /// Max-product message: identical to the sum-product message, the
    /// incoming messages are already maximizations.
    pub fn mpa(&self, msgs: &[RandomVariable]) -> Result<RandomVariable> {
        self.spa(msgs)
    }

    /// Max-sum message: the log-domain analog of [`Self::spa`]. Incoming
    /// messages are already in the log domain on this algorithm's edges.
    pub fn msa(&self, msgs: &[RandomVariable]) -> Result<RandomVariable> {
        let mut msg = self.init().log()?;
        if !self.observed {
            for m in msgs {
                msg = msg.log_product(m)?;
            }
        }
        Ok(msg)
    }

    /// Mean-field message: the node's current belief. Unlike the other
    /// operators, `msgs` must hold the messages from *all* neighbors,
    /// including the target.
    pub fn mf(&self, msgs: &[RandomVariable]) -> Result<RandomVariable> {
        if self.observed {
            return Ok(self.init().clone());
        }
        self.belief(msgs, true, false)
    }

    /// The belief: the product (sum in the log domain) over all incoming
    /// messages.
    pub fn belief(
        &self,
        msgs: &[RandomVariable],
        normalize: bool,
        logarithmic: bool,
    ) -> Result<RandomVariable> {
        let mut iter = msgs.iter();
        let Some(first) = iter.next() else {
            return Ok(self.init().clone());
        };
        let mut belief = first.clone();
        for m in iter {
            belief = if logarithmic {
                belief.log_product(m)?
            } else {
                belief.product(m)?
            };
        }
        if normalize {
            belief = belief.normalize()?;
        }
        Ok(belief)
    }

    /// The largest mass of the belief.
    pub fn max(
        &self,
        msgs: &[RandomVariable],
        normalize: bool,
        logarithmic: bool,
    ) -> Result<Float> {
        Ok(self.belief(msgs, normalize, logarithmic)?.max()?)
    }

    /// The state maximizing the belief. On ties the first state wins.
    pub fn argmax(&self, msgs: &[RandomVariable], logarithmic: bool) -> Result<usize> {
        Ok(self.belief(msgs, false, logarithmic)?.argmax_index(self.id())?)
    }
}

/// A factor node: a local factor over the variables it connects to.
#[derive(Debug)]
pub struct FNode {
    label: String,
    factor: Option<RandomVariable>,
    /// Per-target back-tracking record written by the max-product and
    /// max-sum operators: for each collapsed incoming variable, the mode of
    /// its marginal at collapse time.
    record: HashMap<VariableId, HashMap<VariableId, usize>>,
}

impl FNode {
    #[must_use]
    pub fn new(label: impl Into<String>, factor: Option<RandomVariable>) -> Self {
        Self {
            label: label.into(),
            factor,
            record: HashMap::new(),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The local factor. May be (re-)assigned until inference begins.
    pub fn factor(&self) -> Result<&RandomVariable> {
        self.factor
            .as_ref()
            .ok_or_else(|| Error::FactorNotSet(self.label.clone()))
    }

    pub fn set_factor(&mut self, factor: RandomVariable) {
        self.factor = Some(factor);
    }

    /// The back-tracking record written while producing the message towards
    /// `target`, if any.
    #[must_use]
    pub fn record_for(&self, target: VariableId) -> Option<&HashMap<VariableId, usize>> {
        self.record.get(&target)
    }

    /// The factor dimensions other than `target`, i.e. the variables to
    /// collapse out of an outgoing message.
    fn others(&self, target: VariableId) -> Result<Vec<VariableId>> {
        let dims = self.factor()?.dims();
        if !dims.contains(&target) {
            return Err(Error::FactorDimsMismatch(self.label.clone()));
        }
        Ok(dims.iter().filter(|d| **d != target).copied().collect())
    }

    /// Sum-product message: the factor times every incoming message, with
    /// all variables but the target summed out. Normalization is deferred to
    /// belief time.
    pub fn spa(&self, target: VariableId, msgs: &[RandomVariable]) -> Result<RandomVariable> {
        let mut msg = self.factor()?.clone();
        for m in msgs {
            msg = msg.product(m)?;
        }
        let over = self.others(target)?;
        Ok(msg.marginalize(&over, false)?)
    }

    /// Max-product message: as [`Self::spa`] with maximization, recording
    /// the argmax of each collapsed variable for back-tracking.
    pub fn mpa(&mut self, target: VariableId, msgs: &[RandomVariable]) -> Result<RandomVariable> {
        let mut msg = self.factor()?.clone();
        for m in msgs {
            msg = msg.product(m)?;
        }
        self.maximize_with_record(target, msg)
    }

    /// Max-sum message: the log-domain analog of [`Self::mpa`].
    pub fn msa(&mut self, target: VariableId, msgs: &[RandomVariable]) -> Result<RandomVariable> {
        let mut msg = self.factor()?.log()?;
        for m in msgs {
            msg = msg.log_product(m)?;
        }
        self.maximize_with_record(target, msg)
    }

    fn maximize_with_record(
        &mut self,
        target: VariableId,
        mut msg: RandomVariable,
    ) -> Result<RandomVariable> {
        let over = self.others(target)?;
        let mut record = HashMap::with_capacity(over.len());
        for v in over {
            record.insert(v, msg.argmax_index(v)?);
            msg = msg.maximize(&[v], false)?;
        }
        self.record.insert(target, record);
        Ok(msg)
    }

    /// Mean-field message: the exponential of the expected log-factor under
    /// the incoming beliefs. Only defined for discrete factors; the gaussian
    /// log channel is unsupported.
    pub fn mf(&self, target: VariableId, msgs: &[RandomVariable]) -> Result<RandomVariable> {
        let factor = self.factor()?;
        let Some(discrete) = factor.as_discrete() else {
            return Err(fg_rv::RandomVariableError::LogNotDefined.into());
        };
        let mut msg = RandomVariable::Discrete(discrete.floored(MIN_PROBA).log());
        for belief in msgs {
            msg = msg.product(belief)?;
        }
        let over = self.others(target)?;
        msg = msg.marginalize(&over, false)?;
        Ok(msg.exp()?)
    }
}

/// A node of a factor graph: either a variable node or a factor node.
#[derive(Debug, derive_more::IsVariant)]
pub enum Node {
    Variable(VNode),
    Factor(FNode),
}

impl Node {
    /// Returns `Some(&VNode)` if the node's variant is [`Variable`],
    /// otherwise `None`.
    ///
    /// [`Variable`]: Node::Variable
    #[must_use]
    pub fn as_variable(&self) -> Option<&VNode> {
        if let Self::Variable(ref v) = self {
            Some(v)
        } else {
            None
        }
    }

    /// Returns `Some(&mut VNode)` if the node's variant is [`Variable`],
    /// otherwise `None`.
    ///
    /// [`Variable`]: Node::Variable
    #[must_use]
    pub fn as_variable_mut(&mut self) -> Option<&mut VNode> {
        if let Self::Variable(ref mut v) = self {
            Some(v)
        } else {
            None
        }
    }

    /// Returns `Some(&FNode)` if the node's variant is [`Factor`], otherwise
    /// `None`.
    ///
    /// [`Factor`]: Node::Factor
    #[must_use]
    pub fn as_factor(&self) -> Option<&FNode> {
        if let Self::Factor(ref f) = self {
            Some(f)
        } else {
            None
        }
    }

    /// Returns `Some(&mut FNode)` if the node's variant is [`Factor`],
    /// otherwise `None`.
    ///
    /// [`Factor`]: Node::Factor
    #[must_use]
    pub fn as_factor_mut(&mut self) -> Option<&mut FNode> {
        if let Self::Factor(ref mut f) = self {
            Some(f)
        } else {
            None
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Variable(v) => v.label(),
            Self::Factor(f) => f.label(),
        }
    }
}
