/// Query protocol - side-effect-free interrogation of a step's possible
/// outcomes, without performing resolution
use crate::engine::{Game, Instance, Template};
use crate::step::{
    DependencyValues, DeriveRule, RawContext, Step, StepContext, StepKind, VariableBody,
};
use crate::value::{Config, Value};

/// A borrow-only view answering what a step could or will resolve to
///
/// Queries never mutate anything and never draw randomness; they recurse
/// into dependency queries, which terminates because dependencies strictly
/// precede the step in the game's validated order.
pub struct StepQuery<'a> {
    game: &'a Game,
    step: &'a Step,
    template: &'a Template,
    raw: &'a RawContext,
}

impl<'a> StepQuery<'a> {
    pub(crate) fn new(
        game: &'a Game,
        step: &'a Step,
        template: &'a Template,
        raw: &'a RawContext,
    ) -> Self {
        StepQuery {
            game,
            step,
            template,
            raw,
        }
    }

    pub fn step_id(&self) -> &str {
        self.step.id()
    }

    /// True if some config would make this step resolve to `candidate`,
    /// given current dependency query results
    pub fn can_resolve_to(&self, candidate: &Value) -> bool {
        match self.step.kind() {
            StepKind::Meta(kind) => kind.value(self.raw) == *candidate,
            StepKind::Random(rule) | StepKind::Variable(VariableBody::Random(rule)) => {
                rule.can_resolve_to(candidate, &self.dependency_queries())
            }
            StepKind::Derived(rule) | StepKind::Variable(VariableBody::Derived(rule)) => {
                match self.predetermined(rule.as_ref()) {
                    Some(value) => value.as_ref() == Some(candidate),
                    None => rule.can_derive(candidate, &self.dependency_queries()),
                }
            }
        }
    }

    /// True if, under the current (or default) config, this step would
    /// contribute a value
    pub fn will_resolve(&self) -> bool {
        match self.step.kind() {
            StepKind::Meta(_) => true,
            StepKind::Random(rule) | StepKind::Variable(VariableBody::Random(rule)) => {
                rule.has_value(&self.config(), &self.dependency_queries())
            }
            StepKind::Derived(rule) | StepKind::Variable(VariableBody::Derived(rule)) => {
                match self.predetermined(rule.as_ref()) {
                    Some(value) => value.is_some(),
                    None => true,
                }
            }
        }
    }

    /// The single value this step can resolve to, or `None` if resolution
    /// is not fully determined ahead of time
    pub fn only_resolvable_value(&self) -> Option<Value> {
        match self.step.kind() {
            StepKind::Meta(kind) => Some(kind.value(self.raw)),
            StepKind::Random(rule) | StepKind::Variable(VariableBody::Random(rule)) => {
                rule.only_resolvable_value(&self.config(), &self.dependency_queries())
            }
            StepKind::Derived(rule) | StepKind::Variable(VariableBody::Derived(rule)) => {
                self.predetermined(rule.as_ref()).flatten()
            }
        }
    }

    /// Queries for this step's dependencies, in slot order
    pub fn dependency_queries(&self) -> DependencyQueries<'a> {
        let queries = self
            .step
            .dependencies()
            .iter()
            .map(|id| {
                self.game
                    .step(id)
                    .map(|step| StepQuery::new(self.game, step, self.template, self.raw))
            })
            .collect();
        DependencyQueries { queries }
    }

    fn config(&self) -> Config {
        self.template
            .config(self.step.id())
            .cloned()
            .unwrap_or_else(|| self.step.initial_config())
    }

    /// Run a derived rule ahead of time if every dependency is either
    /// determined or known-absent; `None` means some dependency is still
    /// undetermined.
    fn predetermined(&self, rule: &dyn DeriveRule) -> Option<Option<Value>> {
        let deps = self.dependency_queries();
        let mut inputs = Vec::with_capacity(deps.len());
        for slot in 0..deps.len() {
            match deps.get(slot) {
                None => inputs.push(None),
                Some(query) => {
                    if !query.will_resolve() {
                        inputs.push(None);
                    } else if let Some(value) = query.only_resolvable_value() {
                        inputs.push(Some(value));
                    } else {
                        return None;
                    }
                }
            }
        }

        let values = DependencyValues::new(self.step.dependencies().to_vec(), inputs);
        let empty = Instance::new();
        let ctx = StepContext {
            step: self.step.id(),
            raw: self.raw,
            ongoing: &empty,
        };
        match rule.derive(&values, &ctx) {
            Ok(value) => Some(value),
            Err(_) => Some(None),
        }
    }
}

/// Dependency queries in slot order, mirroring [`DependencyValues`]
pub struct DependencyQueries<'a> {
    queries: Vec<Option<StepQuery<'a>>>,
}

impl<'a> DependencyQueries<'a> {
    /// The query in slot `index`, if that dependency id is known
    pub fn get(&self, index: usize) -> Option<&StepQuery<'a>> {
        self.queries.get(index).and_then(|slot| slot.as_ref())
    }

    /// The query for dependency `id`
    pub fn by_id(&self, id: &str) -> Option<&StepQuery<'a>> {
        self.queries
            .iter()
            .flatten()
            .find(|query| query.step_id() == id)
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}
