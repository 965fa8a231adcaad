/// Step model - the closed set of setup step variants and the behavior
/// seams game catalogs implement
use crate::engine::{Instance, ResolveError};
use crate::query::DependencyQueries;
use crate::value::{Config, StepId, Value};
use rand::RngCore;

/// Raw externally supplied context for one resolution or query pass
///
/// Treated as immutable for the duration of a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawContext {
    pub players: Vec<String>,
    pub products: Vec<String>,
}

impl RawContext {
    pub fn new() -> Self {
        RawContext::default()
    }

    /// Set the active player identifiers
    pub fn with_players<I, S>(mut self, players: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.players = players.into_iter().map(Into::into).collect();
        self
    }

    /// Set the enabled product identifiers
    pub fn with_products<I, S>(mut self, products: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.products = products.into_iter().map(Into::into).collect();
        self
    }
}

/// Context handed to skip predicates and resolution functions
///
/// `ongoing` holds the values resolved so far in the current pass; steps
/// that appear later in the list are simply absent from it.
pub struct StepContext<'a> {
    /// Id of the step currently being evaluated
    pub step: &'a str,
    pub raw: &'a RawContext,
    pub ongoing: &'a Instance,
}

/// The raw context slice a meta step mirrors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaKind {
    Players,
    Products,
}

impl MetaKind {
    /// The value dependents see for this meta step
    pub fn value(&self, raw: &RawContext) -> Value {
        match self {
            MetaKind::Players => Value::Items(raw.players.clone()),
            MetaKind::Products => Value::Items(raw.products.clone()),
        }
    }
}

/// Outcome of reconciling a stored config against updated upstream
/// availability
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refresh {
    /// A normalized replacement config
    Updated(Config),
    /// The stored config is still fully valid
    Unchanged,
    /// No deterministic repair exists; reset or ask the user
    Unfixable,
}

/// Behavior of a random step
///
/// Implementations must be deterministic given the RNG: `resolve` performs
/// at most one draw, and `refresh` performs none at all - a repair is always
/// a filter against what dependency queries currently report as reachable.
pub trait RandomRule: Send + Sync {
    /// The config a template falls back to when it has no entry
    fn initial_config(&self) -> Config;

    /// Produce the concrete value, or `None` to opt out of the instance
    ///
    /// Dependency slots are absent when the dependency was skipped; rules
    /// must tolerate that and degrade rather than error.
    fn resolve(
        &self,
        config: &Config,
        deps: &DependencyValues,
        ctx: &StepContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Option<Value>, ResolveError>;

    /// Reconcile `config` against current dependency availability
    fn refresh(&self, _config: &Config, _deps: &DependencyQueries<'_>) -> Refresh {
        Refresh::Unchanged
    }

    /// Whether this step contributes a value under `config`
    fn has_value(&self, _config: &Config, _deps: &DependencyQueries<'_>) -> bool {
        true
    }

    /// Whether some config could make this step resolve to `candidate`
    fn can_resolve_to(&self, candidate: &Value, deps: &DependencyQueries<'_>) -> bool;

    /// The single value this step is forced to resolve to, if any
    fn only_resolvable_value(
        &self,
        _config: &Config,
        _deps: &DependencyQueries<'_>,
    ) -> Option<Value> {
        None
    }

    /// Validate a value recovered from a rehydrated instance
    fn extract(&self, stored: &Value, _ctx: &StepContext<'_>) -> Option<Value> {
        Some(stored.clone())
    }
}

/// Behavior of a derived step: a pure function of dependency values
pub trait DeriveRule: Send + Sync {
    /// Compute the value, or `None` to opt out
    ///
    /// Absent dependency slots mean the dependency was skipped; derivation
    /// must tolerate them.
    fn derive(
        &self,
        deps: &DependencyValues,
        ctx: &StepContext<'_>,
    ) -> Result<Option<Value>, ResolveError>;

    /// Whether `candidate` is reachable while dependencies are still
    /// undetermined
    ///
    /// Only consulted when some dependency's outcome is not yet known; the
    /// determined case is answered by running [`DeriveRule::derive`]
    /// directly.
    fn can_derive(&self, _candidate: &Value, _deps: &DependencyQueries<'_>) -> bool {
        false
    }
}

/// Body of a variable (boolean-valued) step
///
/// A variable step is a composite: it behaves as a random or derived step,
/// but the engine additionally enforces that it resolves to a boolean so
/// dependents can treat its slot uniformly as a toggle.
pub enum VariableBody {
    Random(Box<dyn RandomRule>),
    Derived(Box<dyn DeriveRule>),
}

/// The closed set of step variants
pub enum StepKind {
    /// Mirrors raw context; never written into the instance
    Meta(MetaKind),
    /// Resolves from a per-step config plus one random draw
    Random(Box<dyn RandomRule>),
    /// Pure function of dependency values
    Derived(Box<dyn DeriveRule>),
    /// Boolean-valued composite of either of the above
    Variable(VariableBody),
}

impl StepKind {
    fn name(&self) -> &'static str {
        match self {
            StepKind::Meta(_) => "meta",
            StepKind::Random(_) => "random",
            StepKind::Derived(_) => "derived",
            StepKind::Variable(_) => "variable",
        }
    }
}

type SkipFn = Box<dyn Fn(&StepContext<'_>) -> bool + Send + Sync>;

/// A named unit of setup logic
pub struct Step {
    id: StepId,
    dependencies: Vec<StepId>,
    kind: StepKind,
    skip: Option<SkipFn>,
}

impl Step {
    /// A meta step exposing a slice of raw context to dependents
    pub fn meta(id: impl Into<String>, kind: MetaKind) -> Self {
        Step {
            id: id.into(),
            dependencies: Vec::new(),
            kind: StepKind::Meta(kind),
            skip: None,
        }
    }

    /// A random step driven by `rule`
    pub fn random(id: impl Into<String>, rule: impl RandomRule + 'static) -> Self {
        Step {
            id: id.into(),
            dependencies: Vec::new(),
            kind: StepKind::Random(Box::new(rule)),
            skip: None,
        }
    }

    /// A derived step driven by `rule`
    pub fn derived(id: impl Into<String>, rule: impl DeriveRule + 'static) -> Self {
        Step {
            id: id.into(),
            dependencies: Vec::new(),
            kind: StepKind::Derived(Box::new(rule)),
            skip: None,
        }
    }

    /// A boolean variable step with a random body
    pub fn variable(id: impl Into<String>, rule: impl RandomRule + 'static) -> Self {
        Step {
            id: id.into(),
            dependencies: Vec::new(),
            kind: StepKind::Variable(VariableBody::Random(Box::new(rule))),
            skip: None,
        }
    }

    /// A boolean variable step with a derived body
    pub fn variable_derived(id: impl Into<String>, rule: impl DeriveRule + 'static) -> Self {
        Step {
            id: id.into(),
            dependencies: Vec::new(),
            kind: StepKind::Variable(VariableBody::Derived(Box::new(rule))),
            skip: None,
        }
    }

    /// Declare the steps this step reads values from, in slot order
    ///
    /// Dependencies must appear earlier in the game's step list; this is
    /// validated when the game is built.
    pub fn depends_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Exclude this step entirely whenever the predicate holds
    pub fn skip_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&StepContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.skip = Some(Box::new(predicate));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dependencies(&self) -> &[StepId] {
        &self.dependencies
    }

    pub fn kind(&self) -> &StepKind {
        &self.kind
    }

    /// The config used when the template carries no entry for this step
    pub fn initial_config(&self) -> Config {
        match &self.kind {
            StepKind::Random(rule) => rule.initial_config(),
            StepKind::Variable(VariableBody::Random(rule)) => rule.initial_config(),
            _ => Config::None,
        }
    }

    pub(crate) fn is_meta(&self) -> bool {
        matches!(self.kind, StepKind::Meta(_))
    }

    pub(crate) fn is_skipped(&self, ctx: &StepContext<'_>) -> bool {
        match &self.skip {
            Some(predicate) => predicate(ctx),
            None => false,
        }
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("kind", &self.kind.name())
            .field("dependencies", &self.dependencies)
            .field("skippable", &self.skip.is_some())
            .finish()
    }
}

/// Dependency slots handed to resolution functions
///
/// Slots follow the step's declared dependency order; a `None` slot is the
/// explicit marker for a skipped (or opted-out) dependency.
#[derive(Debug, Clone)]
pub struct DependencyValues {
    ids: Vec<StepId>,
    values: Vec<Option<Value>>,
}

impl DependencyValues {
    pub(crate) fn new(ids: Vec<StepId>, values: Vec<Option<Value>>) -> Self {
        DependencyValues { ids, values }
    }

    /// The value in slot `index`, absent if skipped or out of bounds
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(|slot| slot.as_ref())
    }

    /// The value for dependency `id`, absent if skipped or undeclared
    pub fn by_id(&self, id: &str) -> Option<&Value> {
        self.ids
            .iter()
            .position(|dep| dep == id)
            .and_then(|index| self.get(index))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
