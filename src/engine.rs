/// Resolution engine - folds an ordered step list plus a template and raw
/// context into a fresh instance
use crate::query::StepQuery;
use crate::step::{RawContext, Refresh, Step, StepContext, StepKind, VariableBody};
use crate::trace::{ResolutionTrace, StepOutcome, TraceEntry};
use crate::value::{Config, StepId, Value};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Errors raised while building a game definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    DuplicateStep { id: String },
    UnknownDependency { step: String, dependency: String },
    DependencyOrder { step: String, dependency: String },
    MetaDependencies { id: String },
}

impl std::fmt::Display for GameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameError::DuplicateStep { id } => write!(f, "Duplicate step id: {}", id),
            GameError::UnknownDependency { step, dependency } => {
                write!(f, "Step '{}' depends on unknown step '{}'", step, dependency)
            }
            GameError::DependencyOrder { step, dependency } => {
                write!(
                    f,
                    "Step '{}' depends on '{}', which appears later in the step list",
                    step, dependency
                )
            }
            GameError::MetaDependencies { id } => {
                write!(f, "Meta step '{}' must not declare dependencies", id)
            }
        }
    }
}

impl std::error::Error for GameError {}

/// Errors raised during a resolution or query pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    UnknownStep { id: String },
    InvalidConfig { step: String, message: String },
    NotBoolean { step: String },
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::UnknownStep { id } => write!(f, "Unknown step: {}", id),
            ResolveError::InvalidConfig { step, message } => {
                write!(f, "Invalid config for step '{}': {}", step, message)
            }
            ResolveError::NotBoolean { step } => {
                write!(f, "Variable step '{}' resolved to a non-boolean value", step)
            }
        }
    }
}

impl std::error::Error for ResolveError {}

/// User-authored partial configuration, mapping step ids to configs
///
/// Entries absent from the template default to the step's initial config.
/// Updates produce a new template value rather than mutating in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Template {
    configs: HashMap<StepId, Config>,
}

impl Template {
    pub fn new() -> Self {
        Template::default()
    }

    /// A copy of this template with `id` configured
    pub fn with_config(mut self, id: impl Into<String>, config: Config) -> Self {
        self.configs.insert(id.into(), config);
        self
    }

    /// A copy of this template with `id` back on its default config
    pub fn without_config(mut self, id: &str) -> Self {
        self.configs.remove(id);
        self
    }

    pub fn config(&self, id: &str) -> Option<&Config> {
        self.configs.get(id)
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

/// The fully resolved mapping from step id to concrete setup value
///
/// Skipped and opted-out steps have no entry. Backed by an ordered map so
/// iteration (and anything built on it) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instance {
    values: BTreeMap<StepId, Value>,
}

impl Instance {
    pub fn new() -> Self {
        Instance::default()
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.values.get(id)
    }

    pub fn insert(&mut self, id: impl Into<String>, value: Value) {
        self.values.insert(id.into(), value);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.values.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StepId, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

enum Outcome {
    Resolved(Value),
    Skipped,
    OptedOut,
}

/// An immutable game definition: the ordered step list plus an id index
///
/// Built once and reused read-only across resolution passes. Construction
/// validates that the list is a genuine topological order of the declared
/// dependencies instead of trusting the caller.
pub struct Game {
    steps: Vec<Step>,
    index: HashMap<StepId, usize>,
}

impl Game {
    /// Build a game from steps in dependency order
    pub fn new(steps: Vec<Step>) -> Result<Self, GameError> {
        let mut index = HashMap::with_capacity(steps.len());
        for (position, step) in steps.iter().enumerate() {
            if index.contains_key(step.id()) {
                return Err(GameError::DuplicateStep {
                    id: step.id().to_string(),
                });
            }
            if step.is_meta() && !step.dependencies().is_empty() {
                return Err(GameError::MetaDependencies {
                    id: step.id().to_string(),
                });
            }
            for dependency in step.dependencies() {
                if !index.contains_key(dependency.as_str()) {
                    let declared_later = steps.iter().any(|other| other.id() == dependency);
                    return Err(if declared_later {
                        GameError::DependencyOrder {
                            step: step.id().to_string(),
                            dependency: dependency.clone(),
                        }
                    } else {
                        GameError::UnknownDependency {
                            step: step.id().to_string(),
                            dependency: dependency.clone(),
                        }
                    });
                }
            }
            index.insert(step.id().to_string(), position);
        }
        Ok(Game { steps, index })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.index.get(id).map(|&position| &self.steps[position])
    }

    /// Resolve a fresh instance from a template and raw context
    ///
    /// A left fold over the step list: meta steps contribute nothing,
    /// skipped steps are omitted, and a step resolving to `None` opts out.
    /// Errors abort the pass with no partial result.
    pub fn resolve<R: Rng>(
        &self,
        template: &Template,
        raw: &RawContext,
        rng: &mut R,
    ) -> Result<Instance, ResolveError> {
        self.resolve_inner(template, raw, rng, None)
    }

    /// Resolve while recording a per-step trace of the pass
    pub fn resolve_traced<R: Rng>(
        &self,
        template: &Template,
        raw: &RawContext,
        rng: &mut R,
    ) -> Result<(Instance, ResolutionTrace), ResolveError> {
        let mut trace = ResolutionTrace::new();
        let instance = self.resolve_inner(template, raw, rng, Some(&mut trace))?;
        Ok((instance, trace))
    }

    fn resolve_inner<R: Rng>(
        &self,
        template: &Template,
        raw: &RawContext,
        rng: &mut R,
        mut trace: Option<&mut ResolutionTrace>,
    ) -> Result<Instance, ResolveError> {
        let mut ongoing = Instance::new();
        for step in &self.steps {
            if step.is_meta() {
                continue;
            }
            let config = template
                .config(step.id())
                .cloned()
                .unwrap_or_else(|| step.initial_config());

            let outcome = {
                let ctx = StepContext {
                    step: step.id(),
                    raw,
                    ongoing: &ongoing,
                };
                if step.is_skipped(&ctx) {
                    Outcome::Skipped
                } else {
                    let deps = self.dependency_values(step, raw, &ongoing);
                    let value = match step.kind() {
                        StepKind::Meta(_) => None,
                        StepKind::Random(rule) => rule.resolve(&config, &deps, &ctx, &mut *rng)?,
                        StepKind::Derived(rule) => rule.derive(&deps, &ctx)?,
                        StepKind::Variable(body) => {
                            let value = match body {
                                VariableBody::Random(rule) => {
                                    rule.resolve(&config, &deps, &ctx, &mut *rng)?
                                }
                                VariableBody::Derived(rule) => rule.derive(&deps, &ctx)?,
                            };
                            match value {
                                Some(Value::Bool(_)) | None => value,
                                Some(_) => {
                                    return Err(ResolveError::NotBoolean {
                                        step: step.id().to_string(),
                                    })
                                }
                            }
                        }
                    };
                    match value {
                        Some(value) => Outcome::Resolved(value),
                        None => Outcome::OptedOut,
                    }
                }
            };

            match outcome {
                Outcome::Resolved(value) => {
                    if let Some(trace) = trace.as_deref_mut() {
                        trace.record(
                            TraceEntry::new(step.id(), StepOutcome::Resolved)
                                .with_value(value.clone()),
                        );
                    }
                    ongoing.insert(step.id(), value);
                }
                Outcome::Skipped => {
                    if let Some(trace) = trace.as_deref_mut() {
                        trace.record(TraceEntry::new(step.id(), StepOutcome::Skipped));
                    }
                }
                Outcome::OptedOut => {
                    if let Some(trace) = trace.as_deref_mut() {
                        trace.record(TraceEntry::new(step.id(), StepOutcome::OptedOut));
                    }
                }
            }
        }
        Ok(ongoing)
    }

    /// Query one step without resolving anything
    pub fn query<'a>(
        &'a self,
        id: &str,
        template: &'a Template,
        raw: &'a RawContext,
    ) -> Result<StepQuery<'a>, ResolveError> {
        let step = self.step(id).ok_or_else(|| ResolveError::UnknownStep {
            id: id.to_string(),
        })?;
        Ok(StepQuery::new(self, step, template, raw))
    }

    /// Reconcile a stored config for `id` against current availability
    ///
    /// Deterministic: any repair is a filter against what dependency queries
    /// report as reachable. Steps without a config answer `Unchanged`.
    pub fn refresh(
        &self,
        id: &str,
        config: &Config,
        template: &Template,
        raw: &RawContext,
    ) -> Result<Refresh, ResolveError> {
        let step = self.step(id).ok_or_else(|| ResolveError::UnknownStep {
            id: id.to_string(),
        })?;
        let deps = StepQuery::new(self, step, template, raw).dependency_queries();
        Ok(match step.kind() {
            StepKind::Random(rule) | StepKind::Variable(VariableBody::Random(rule)) => {
                rule.refresh(config, &deps)
            }
            _ => Refresh::Unchanged,
        })
    }

    /// Rebuild an instance decoded from a token
    ///
    /// Random values are validated through each rule's `extract`; derived
    /// entries are recomputed from their dependencies; meta steps never
    /// materialize. Entries absent from `decoded` stay absent.
    pub fn rehydrate(&self, decoded: &Instance, raw: &RawContext) -> Instance {
        let mut ongoing = Instance::new();
        for step in &self.steps {
            if step.is_meta() || !decoded.contains(step.id()) {
                continue;
            }
            let ctx = StepContext {
                step: step.id(),
                raw,
                ongoing: &ongoing,
            };
            let value = match (step.kind(), decoded.get(step.id())) {
                (StepKind::Random(rule), Some(stored))
                | (StepKind::Variable(VariableBody::Random(rule)), Some(stored)) => {
                    rule.extract(stored, &ctx)
                }
                (StepKind::Derived(rule), Some(_))
                | (StepKind::Variable(VariableBody::Derived(rule)), Some(_)) => {
                    let deps = self.dependency_values(step, raw, &ongoing);
                    rule.derive(&deps, &ctx).ok().flatten()
                }
                _ => None,
            };
            if let Some(value) = value {
                ongoing.insert(step.id(), value);
            }
        }
        ongoing
    }

    /// Build the dependency slots for one step from the ongoing instance
    ///
    /// Meta dependencies are filled from raw context, since they never
    /// appear in the instance; everything else reads the ongoing map, with
    /// absence standing in for skipped dependencies.
    fn dependency_values(
        &self,
        step: &Step,
        raw: &RawContext,
        ongoing: &Instance,
    ) -> crate::step::DependencyValues {
        let values = step
            .dependencies()
            .iter()
            .map(|id| match self.step(id) {
                Some(dependency) => match dependency.kind() {
                    StepKind::Meta(kind) => Some(kind.value(raw)),
                    _ => ongoing.get(id).cloned(),
                },
                None => None,
            })
            .collect();
        crate::step::DependencyValues::new(step.dependencies().to_vec(), values)
    }
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game").field("steps", &self.steps).finish()
    }
}
