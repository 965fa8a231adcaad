/// Built-in step rules
///
/// Game-agnostic rules covering the common shapes of setup steps: drawing a
/// constrained combination of items, flipping a variant toggle, and deriving
/// a count. Concrete game catalogs compose these or implement the rule
/// traits directly.
use crate::combinations::Combinations;
use crate::engine::ResolveError;
use crate::query::DependencyQueries;
use crate::step::{DependencyValues, DeriveRule, RandomRule, Refresh, StepContext};
use crate::value::{Config, PickConfig, Value};
use rand::{Rng, RngCore};

/// What a dependency query currently says about an item pool
enum PoolView {
    Known(Vec<String>),
    Undetermined,
    Absent,
}

fn pool_view(deps: &DependencyQueries<'_>, slot: usize) -> PoolView {
    match deps.get(slot) {
        None => PoolView::Absent,
        Some(query) => {
            if !query.will_resolve() {
                return PoolView::Absent;
            }
            match query.only_resolvable_value() {
                Some(Value::Items(items)) => PoolView::Known(items),
                Some(_) => PoolView::Absent,
                None => PoolView::Undetermined,
            }
        }
    }
}

/// Draws `count` items from the pool supplied by the first dependency
///
/// Configured with [`Config::Pick`]: `always` items are forced into the
/// draw, `never` items are excluded from it. The residual draw addresses a
/// single uniform index into the remaining combination space; the space is
/// never enumerated.
pub struct ItemDraw {
    count: usize,
}

impl ItemDraw {
    pub fn new(count: usize) -> Self {
        ItemDraw { count }
    }

    fn pick_from(&self, config: &Config, step: &str) -> Result<PickConfig, ResolveError> {
        match config {
            Config::Pick(pick) => Ok(pick.clone()),
            Config::None => Ok(PickConfig::default()),
            _ => Err(ResolveError::InvalidConfig {
                step: step.to_string(),
                message: "expected a pick config".to_string(),
            }),
        }
    }
}

impl RandomRule for ItemDraw {
    fn initial_config(&self) -> Config {
        Config::Pick(PickConfig::default())
    }

    fn resolve(
        &self,
        config: &Config,
        deps: &DependencyValues,
        ctx: &StepContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Option<Value>, ResolveError> {
        let pool = match deps.get(0).and_then(Value::as_items) {
            Some(pool) => pool,
            None => return Ok(None),
        };
        let pick = self.pick_from(config, ctx.step)?;

        // Forced items outside the current pool are stale config; they are
        // dropped here rather than erroring, matching refresh semantics.
        let forced: Vec<String> = pool
            .iter()
            .filter(|item| pick.always.contains(*item))
            .cloned()
            .collect();
        if forced.len() > self.count {
            return Err(ResolveError::InvalidConfig {
                step: ctx.step.to_string(),
                message: format!(
                    "{} forced items for a draw of {}",
                    forced.len(),
                    self.count
                ),
            });
        }

        let candidates: Vec<String> = pool
            .iter()
            .filter(|item| !pick.never.contains(*item) && !forced.contains(*item))
            .cloned()
            .collect();
        let combos = Combinations::new(candidates, self.count - forced.len()).map_err(|error| {
            ResolveError::InvalidConfig {
                step: ctx.step.to_string(),
                message: error.to_string(),
            }
        })?;
        if combos.is_empty() {
            return Ok(None);
        }

        let index = rng.gen_range(0..combos.len());
        let drawn = match combos.at(index as i128) {
            Some(drawn) => drawn,
            None => return Ok(None),
        };
        let mut items = forced;
        items.extend(drawn);
        items.sort();
        Ok(Some(Value::Items(items)))
    }

    fn refresh(&self, config: &Config, deps: &DependencyQueries<'_>) -> Refresh {
        let pick = match config {
            Config::Pick(pick) => pick,
            Config::None => return Refresh::Unchanged,
            _ => return Refresh::Unfixable,
        };
        let available = match pool_view(deps, 0) {
            PoolView::Known(items) => items,
            // Nothing to filter against until the pool is determined.
            PoolView::Undetermined | PoolView::Absent => return Refresh::Unchanged,
        };

        let filtered = PickConfig {
            always: pick
                .always
                .iter()
                .filter(|item| available.contains(*item))
                .cloned()
                .collect(),
            never: pick
                .never
                .iter()
                .filter(|item| available.contains(*item))
                .cloned()
                .collect(),
        };
        let admissible = available
            .iter()
            .filter(|item| !filtered.never.contains(*item))
            .count();
        if admissible < self.count {
            return Refresh::Unfixable;
        }
        if filtered == *pick {
            Refresh::Unchanged
        } else {
            Refresh::Updated(Config::Pick(filtered))
        }
    }

    fn has_value(&self, config: &Config, deps: &DependencyQueries<'_>) -> bool {
        let pool = match pool_view(deps, 0) {
            PoolView::Known(items) => items,
            PoolView::Undetermined => return true,
            PoolView::Absent => return false,
        };
        let pick = match config {
            Config::Pick(pick) => pick.clone(),
            _ => PickConfig::default(),
        };
        let forced = pool.iter().filter(|item| pick.always.contains(*item)).count();
        let admissible = pool.iter().filter(|item| !pick.never.contains(*item)).count();
        forced <= self.count && admissible >= self.count
    }

    fn can_resolve_to(&self, candidate: &Value, deps: &DependencyQueries<'_>) -> bool {
        let items = match candidate.as_items() {
            Some(items) => items,
            None => return false,
        };
        if items.len() != self.count {
            return false;
        }
        match pool_view(deps, 0) {
            // A config forcing exactly these items exists iff they are drawn
            // from the pool.
            PoolView::Known(pool) => {
                Combinations::with_duplicates(pool, items.len()).includes(items)
            }
            PoolView::Undetermined | PoolView::Absent => false,
        }
    }

    fn only_resolvable_value(
        &self,
        config: &Config,
        deps: &DependencyQueries<'_>,
    ) -> Option<Value> {
        let pool = match pool_view(deps, 0) {
            PoolView::Known(items) => items,
            _ => return None,
        };
        let pick = match config {
            Config::Pick(pick) => pick.clone(),
            _ => PickConfig::default(),
        };
        let admissible: Vec<String> = pool
            .iter()
            .filter(|item| !pick.never.contains(*item))
            .cloned()
            .collect();
        let forced: Vec<String> = admissible
            .iter()
            .filter(|item| pick.always.contains(*item))
            .cloned()
            .collect();

        let determined = if admissible.len() == self.count {
            admissible
        } else if forced.len() == self.count {
            forced
        } else {
            return None;
        };
        let mut items = determined;
        items.sort();
        Some(Value::Items(items))
    }

    fn extract(&self, stored: &Value, _ctx: &StepContext<'_>) -> Option<Value> {
        match stored.as_items() {
            Some(items) if items.len() == self.count => Some(stored.clone()),
            _ => None,
        }
    }
}

/// A boolean variant toggle
///
/// `Config::Flag` forces the outcome; the default config draws a fair coin.
#[derive(Debug, Clone, Copy, Default)]
pub struct Toggle;

impl Toggle {
    pub fn new() -> Self {
        Toggle
    }
}

impl RandomRule for Toggle {
    fn initial_config(&self) -> Config {
        Config::None
    }

    fn resolve(
        &self,
        config: &Config,
        _deps: &DependencyValues,
        ctx: &StepContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Option<Value>, ResolveError> {
        match config {
            Config::Flag(flag) => Ok(Some(Value::Bool(*flag))),
            Config::None => Ok(Some(Value::Bool(rng.gen_range(0..2) == 1))),
            _ => Err(ResolveError::InvalidConfig {
                step: ctx.step.to_string(),
                message: "expected a flag config".to_string(),
            }),
        }
    }

    fn refresh(&self, config: &Config, _deps: &DependencyQueries<'_>) -> Refresh {
        match config {
            Config::Flag(_) | Config::None => Refresh::Unchanged,
            _ => Refresh::Unfixable,
        }
    }

    fn can_resolve_to(&self, candidate: &Value, _deps: &DependencyQueries<'_>) -> bool {
        matches!(candidate, Value::Bool(_))
    }

    fn only_resolvable_value(
        &self,
        config: &Config,
        _deps: &DependencyQueries<'_>,
    ) -> Option<Value> {
        match config {
            Config::Flag(flag) => Some(Value::Bool(*flag)),
            _ => None,
        }
    }

    fn extract(&self, stored: &Value, _ctx: &StepContext<'_>) -> Option<Value> {
        match stored {
            Value::Bool(_) => Some(stored.clone()),
            _ => None,
        }
    }
}

/// Derives the number of items in the first dependency's value
///
/// Tolerates an absent dependency by opting out.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountItems;

impl CountItems {
    pub fn new() -> Self {
        CountItems
    }
}

impl DeriveRule for CountItems {
    fn derive(
        &self,
        deps: &DependencyValues,
        _ctx: &StepContext<'_>,
    ) -> Result<Option<Value>, ResolveError> {
        Ok(deps
            .get(0)
            .and_then(Value::as_items)
            .map(|items| Value::Number(items.len() as i64)))
    }

    fn can_derive(&self, candidate: &Value, _deps: &DependencyQueries<'_>) -> bool {
        matches!(candidate, Value::Number(n) if *n >= 0)
    }
}
