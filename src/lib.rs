/// Tabletop Setup - a deterministic game-setup generator
///
/// This library resolves a concrete setup instance for a configurable game
/// from a partial, user-authored template, by folding over a declared
/// dependency graph of setup steps - some random, some derived purely from
/// other steps, some mirroring externally supplied context.
///
/// # Example
///
/// ```
/// use tabletop_setup::rules::ItemDraw;
/// use tabletop_setup::{resolve_with_seed, Game, MetaKind, RawContext, Step, Template};
///
/// let game = Game::new(vec![
///     Step::meta("products", MetaKind::Products),
///     Step::random("map", ItemDraw::new(1)).depends_on(["products"]),
/// ])
/// .unwrap();
///
/// let ctx = RawContext::new().with_products(["base", "north"]);
/// let instance = resolve_with_seed(&game, &Template::new(), &ctx, 42).unwrap();
/// assert!(instance.contains("map"));
/// ```
pub mod codec;
pub mod combinations;
pub mod engine;
pub mod query;
pub mod step;
pub mod trace;
pub mod value;

#[cfg(feature = "builtin-rules")]
pub mod rules;

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Re-export main types for convenience
pub use codec::{CodecError, FieldKind, Schema, SchemaField};
pub use combinations::{binomial, Combinations, CombinationsError};
pub use engine::{Game, GameError, Instance, ResolveError, Template};
pub use query::{DependencyQueries, StepQuery};
pub use step::{
    DependencyValues, DeriveRule, MetaKind, RandomRule, RawContext, Refresh, Step, StepContext,
    StepKind, VariableBody,
};
pub use trace::{ResolutionTrace, StepOutcome, TraceEntry};
pub use value::{Config, PickConfig, StepId, Value};

/// Combined error type for the engine
#[derive(Debug)]
pub enum SetupError {
    Game(GameError),
    Resolve(ResolveError),
    Combinations(CombinationsError),
    Codec(CodecError),
}

impl std::fmt::Display for SetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupError::Game(e) => write!(f, "Game definition error: {}", e),
            SetupError::Resolve(e) => write!(f, "Resolution error: {}", e),
            SetupError::Combinations(e) => write!(f, "Combination error: {}", e),
            SetupError::Codec(e) => write!(f, "Codec error: {}", e),
        }
    }
}

impl std::error::Error for SetupError {}

impl From<GameError> for SetupError {
    fn from(e: GameError) -> Self {
        SetupError::Game(e)
    }
}

impl From<ResolveError> for SetupError {
    fn from(e: ResolveError) -> Self {
        SetupError::Resolve(e)
    }
}

impl From<CombinationsError> for SetupError {
    fn from(e: CombinationsError) -> Self {
        SetupError::Combinations(e)
    }
}

impl From<CodecError> for SetupError {
    fn from(e: CodecError) -> Self {
        SetupError::Codec(e)
    }
}

/// Resolve an instance deterministically from a seed
///
/// Identical (game, template, context, seed) inputs produce identical
/// instances.
///
/// # Example
/// ```
/// use tabletop_setup::rules::Toggle;
/// use tabletop_setup::{resolve_with_seed, Game, RawContext, Step, Template};
///
/// let game = Game::new(vec![Step::variable("night-mode", Toggle::new())]).unwrap();
/// let ctx = RawContext::new();
/// let one = resolve_with_seed(&game, &Template::new(), &ctx, 7).unwrap();
/// let two = resolve_with_seed(&game, &Template::new(), &ctx, 7).unwrap();
/// assert_eq!(one, two);
/// ```
pub fn resolve_with_seed(
    game: &Game,
    template: &Template,
    ctx: &RawContext,
    seed: u64,
) -> Result<Instance, SetupError> {
    let mut rng = StdRng::seed_from_u64(seed);
    game.resolve(template, ctx, &mut rng).map_err(Into::into)
}

/// Resolve with a seed while recording a per-step trace
pub fn resolve_traced_with_seed(
    game: &Game,
    template: &Template,
    ctx: &RawContext,
    seed: u64,
) -> Result<(Instance, ResolutionTrace), SetupError> {
    let mut rng = StdRng::seed_from_u64(seed);
    game.resolve_traced(template, ctx, &mut rng)
        .map_err(Into::into)
}
