//! LP variable types.

/// Handle to a variable registered in an [`LpModel`](super::LpModel).
///
/// Handles are dense indices into the model's variable table, so they are
/// only meaningful for the model that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) usize);

impl VarId {
    /// Position of the variable in the model's variable table.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A continuous decision variable with a domain [min, max].
///
/// `max` may be `f64::INFINITY` for variables bounded only from below.
///
/// # Examples
///
/// ```
/// use u_fairrank::lp::LpVar;
///
/// let w = LpVar::unit("w[0][0]");
/// assert_eq!(w.min, 0.0);
/// assert_eq!(w.max, 1.0);
///
/// let dcg = LpVar::non_negative("dcg[0]");
/// assert!(!dcg.is_bounded());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LpVar {
    /// Variable name (diagnostics only).
    pub name: String,
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

impl LpVar {
    /// Creates a variable with explicit bounds.
    pub fn new(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            min,
            max,
        }
    }

    /// Creates a variable in `[0, +inf)`.
    pub fn non_negative(name: impl Into<String>) -> Self {
        Self::new(name, 0.0, f64::INFINITY)
    }

    /// Creates a variable in `[0, 1]`.
    pub fn unit(name: impl Into<String>) -> Self {
        Self::new(name, 0.0, 1.0)
    }

    /// Whether the upper bound is finite.
    pub fn is_bounded(&self) -> bool {
        self.max.is_finite()
    }

    /// Whether the domain collapses to a single value.
    pub fn is_fixed(&self) -> bool {
        self.min == self.max
    }

    /// Whether `value` lies in the domain, allowing `tolerance` slack.
    pub fn contains(&self, value: f64, tolerance: f64) -> bool {
        value >= self.min - tolerance && value <= self.max + tolerance
    }
}
