//! LP model definition.

use super::variables::{LpVar, VarId};

/// A linear expression `Σ coefficient·var + constant`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    /// (variable, coefficient) pairs. A variable may appear more than once;
    /// repeated terms are summed.
    pub terms: Vec<(VarId, f64)>,
    /// Constant offset.
    pub constant: f64,
}

impl LinearExpr {
    /// Creates an empty expression.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty expression with room for `n` terms.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            terms: Vec::with_capacity(n),
            constant: 0.0,
        }
    }

    /// Creates a single-term expression.
    pub fn term(var: VarId, coefficient: f64) -> Self {
        let mut expr = Self::with_capacity(1);
        expr.add_term(var, coefficient);
        expr
    }

    /// Adds `coefficient·var`. Zero coefficients are dropped.
    pub fn add_term(&mut self, var: VarId, coefficient: f64) {
        if coefficient != 0.0 {
            self.terms.push((var, coefficient));
        }
    }

    /// Adds a constant offset.
    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    /// Adds `factor·other` to this expression.
    pub fn add_scaled(&mut self, other: &LinearExpr, factor: f64) {
        if factor == 0.0 {
            return;
        }
        for &(var, coefficient) in &other.terms {
            self.add_term(var, coefficient * factor);
        }
        self.constant += other.constant * factor;
    }

    /// Evaluates the expression against a full assignment.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(var, coefficient)| coefficient * values[var.index()])
            .sum::<f64>()
            + self.constant
    }

    /// Number of stored terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether the expression has no variable terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Relation between a constraint's expression and its right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// `expr == rhs`
    Eq,
    /// `expr <= rhs`
    Le,
    /// `expr >= rhs`
    Ge,
}

/// A linear constraint row.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Row name (diagnostics only).
    pub name: String,
    /// Left-hand side.
    pub expr: LinearExpr,
    /// Relation to the right-hand side.
    pub relation: Relation,
    /// Right-hand side constant.
    pub rhs: f64,
}

impl Constraint {
    /// `expr == rhs`
    pub fn equal(name: impl Into<String>, expr: LinearExpr, rhs: f64) -> Self {
        Self {
            name: name.into(),
            expr,
            relation: Relation::Eq,
            rhs,
        }
    }

    /// `expr <= rhs`
    pub fn at_most(name: impl Into<String>, expr: LinearExpr, rhs: f64) -> Self {
        Self {
            name: name.into(),
            expr,
            relation: Relation::Le,
            rhs,
        }
    }

    /// `expr >= rhs`
    pub fn at_least(name: impl Into<String>, expr: LinearExpr, rhs: f64) -> Self {
        Self {
            name: name.into(),
            expr,
            relation: Relation::Ge,
            rhs,
        }
    }

    /// Whether the row holds for `values` within `tolerance`.
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.expr.evaluate(values);
        match self.relation {
            Relation::Eq => (lhs - self.rhs).abs() <= tolerance,
            Relation::Le => lhs <= self.rhs + tolerance,
            Relation::Ge => lhs >= self.rhs - tolerance,
        }
    }
}

/// Objective function for the LP model.
#[derive(Debug, Clone, PartialEq)]
pub enum Objective {
    /// Maximize a linear expression.
    Maximize(LinearExpr),
    /// Minimize a linear expression.
    Minimize(LinearExpr),
}

impl Objective {
    /// The underlying expression, regardless of direction.
    pub fn expr(&self) -> &LinearExpr {
        match self {
            Objective::Maximize(expr) | Objective::Minimize(expr) => expr,
        }
    }

    /// Evaluates the objective against a full assignment.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.expr().evaluate(values)
    }
}

/// A linear programming model over bounded continuous variables.
///
/// # Examples
///
/// ```
/// use u_fairrank::lp::{Constraint, LinearExpr, LpModel, LpVar, Objective};
///
/// let mut model = LpModel::new("example");
/// let x = model.add_var(LpVar::unit("x"));
/// let y = model.add_var(LpVar::unit("y"));
///
/// let mut both = LinearExpr::new();
/// both.add_term(x, 1.0);
/// both.add_term(y, 1.0);
/// model.add_constraint(Constraint::equal("pick_one", both, 1.0));
///
/// let mut objective = LinearExpr::new();
/// objective.add_term(x, 2.0);
/// objective.add_term(y, 1.0);
/// model.set_objective(Objective::Maximize(objective));
///
/// assert!(model.validate().is_ok());
/// assert_eq!(model.var_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct LpModel {
    /// Model name.
    pub name: String,
    /// Variables, indexed by [`VarId`].
    pub vars: Vec<LpVar>,
    /// Constraint rows.
    pub constraints: Vec<Constraint>,
    /// Objective function.
    pub objective: Option<Objective>,
}

impl LpModel {
    /// Creates a new empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vars: Vec::new(),
            constraints: Vec::new(),
            objective: None,
        }
    }

    /// Registers a variable and returns its handle.
    pub fn add_var(&mut self, var: LpVar) -> VarId {
        self.vars.push(var);
        VarId(self.vars.len() - 1)
    }

    /// Adds a constraint row.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Sets the objective function.
    pub fn set_objective(&mut self, objective: Objective) {
        self.objective = Some(objective);
    }

    /// Looks up a variable by handle.
    pub fn var(&self, id: VarId) -> Option<&LpVar> {
        self.vars.get(id.index())
    }

    /// Returns the number of variables.
    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    /// Returns the number of constraint rows.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Validates the model for consistency.
    ///
    /// Checks variable bounds, that every referenced handle exists, that
    /// every coefficient is finite, and that an objective is set.
    pub fn validate(&self) -> Result<(), String> {
        for var in &self.vars {
            if var.min.is_nan() || var.max.is_nan() || var.min > var.max {
                return Err(format!(
                    "variable {} has invalid bounds [{}, {}]",
                    var.name, var.min, var.max
                ));
            }
        }
        for constraint in &self.constraints {
            self.validate_expr(&constraint.expr)
                .map_err(|e| format!("constraint {}: {e}", constraint.name))?;
            if !constraint.rhs.is_finite() {
                return Err(format!(
                    "constraint {}: non-finite right-hand side",
                    constraint.name
                ));
            }
        }
        match &self.objective {
            Some(objective) => self
                .validate_expr(objective.expr())
                .map_err(|e| format!("objective: {e}")),
            None => Err("objective is not set".into()),
        }
    }

    fn validate_expr(&self, expr: &LinearExpr) -> Result<(), String> {
        if !expr.constant.is_finite() {
            return Err("non-finite constant".into());
        }
        for &(var, coefficient) in &expr.terms {
            if var.index() >= self.vars.len() {
                return Err(format!("undefined variable #{}", var.index()));
            }
            if !coefficient.is_finite() {
                return Err(format!(
                    "non-finite coefficient on {}",
                    self.vars[var.index()].name
                ));
            }
        }
        Ok(())
    }

    /// Names of the rows and variables violated by `values`.
    ///
    /// An empty result means the assignment is feasible within `tolerance`.
    pub fn violations(&self, values: &[f64], tolerance: f64) -> Vec<String> {
        let mut violated = Vec::new();
        if values.len() != self.vars.len() {
            violated.push(format!(
                "assignment has {} values for {} variables",
                values.len(),
                self.vars.len()
            ));
            return violated;
        }
        for (var, &value) in self.vars.iter().zip(values) {
            if !var.contains(value, tolerance) {
                violated.push(var.name.clone());
            }
        }
        for constraint in &self.constraints {
            if !constraint.is_satisfied(values, tolerance) {
                violated.push(constraint.name.clone());
            }
        }
        violated
    }
}
