/// End-to-end resolution and query behavior over a small fixture game
use tabletop_setup::rules::{CountItems, ItemDraw, Toggle};
use tabletop_setup::{
    resolve_with_seed, Config, DependencyValues, DeriveRule, Game, MetaKind, RandomRule,
    RawContext, ResolveError, Step, StepContext, Template, Value,
};

/// Reads the night-mode toggle, treating an absent slot as false.
struct NightBonus;

impl DeriveRule for NightBonus {
    fn derive(
        &self,
        deps: &DependencyValues,
        _ctx: &StepContext<'_>,
    ) -> Result<Option<Value>, ResolveError> {
        let night = deps
            .by_id("night-mode")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Ok(Some(Value::Bool(night)))
    }
}

fn fixture() -> Game {
    Game::new(vec![
        Step::meta("players", MetaKind::Players),
        Step::meta("products", MetaKind::Products),
        Step::derived("player-count", CountItems::new()).depends_on(["players"]),
        Step::random("map", ItemDraw::new(1)).depends_on(["products"]),
        Step::variable("night-mode", Toggle::new())
            .skip_when(|ctx| ctx.raw.players.len() < 3),
        Step::variable_derived("night-bonus", NightBonus).depends_on(["night-mode"]),
    ])
    .unwrap()
}

fn three_players() -> RawContext {
    RawContext::new()
        .with_players(["ana", "bo", "cleo"])
        .with_products(["base", "north", "south"])
}

#[test]
fn test_resolution_is_deterministic() {
    let game = fixture();
    let ctx = three_players();
    let template = Template::new();

    let one = resolve_with_seed(&game, &template, &ctx, 12345).unwrap();
    let two = resolve_with_seed(&game, &template, &ctx, 12345).unwrap();
    assert_eq!(one, two);
    assert_eq!(
        serde_json::to_string(&one).unwrap(),
        serde_json::to_string(&two).unwrap()
    );
}

#[test]
fn test_meta_steps_never_enter_the_instance() {
    let instance = resolve_with_seed(&fixture(), &Template::new(), &three_players(), 1).unwrap();
    assert!(!instance.contains("players"));
    assert!(!instance.contains("products"));
}

#[test]
fn test_meta_dependency_slots_read_raw_context() {
    let instance = resolve_with_seed(&fixture(), &Template::new(), &three_players(), 1).unwrap();
    assert_eq!(instance.get("player-count"), Some(&Value::Number(3)));
}

#[test]
fn test_random_step_draws_from_enabled_products() {
    for seed in 0..16 {
        let instance =
            resolve_with_seed(&fixture(), &Template::new(), &three_players(), seed).unwrap();
        let map = instance.get("map").unwrap().as_items().unwrap();
        assert_eq!(map.len(), 1);
        assert!(["base", "north", "south"].contains(&map[0].as_str()));
    }
}

#[test]
fn test_skip_excludes_step_and_dependents_see_absence() {
    // Two players: night-mode is skipped, night-bonus still resolves.
    let ctx = RawContext::new()
        .with_players(["ana", "bo"])
        .with_products(["base"]);
    let instance = resolve_with_seed(&fixture(), &Template::new(), &ctx, 5).unwrap();

    assert!(!instance.contains("night-mode"));
    assert_eq!(instance.get("night-bonus"), Some(&Value::Bool(false)));
}

#[test]
fn test_opt_out_leaves_no_entry() {
    // No products enabled: the map draw has an empty pool and opts out.
    let ctx = RawContext::new().with_players(["ana", "bo", "cleo"]);
    let instance = resolve_with_seed(&fixture(), &Template::new(), &ctx, 5).unwrap();
    assert!(!instance.contains("map"));
}

#[test]
fn test_template_config_overrides_default() {
    let template = Template::new().with_config("night-mode", Config::Flag(true));
    let instance = resolve_with_seed(&fixture(), &template, &three_players(), 5).unwrap();
    assert_eq!(instance.get("night-mode"), Some(&Value::Bool(true)));
    assert_eq!(instance.get("night-bonus"), Some(&Value::Bool(true)));
}

#[test]
fn test_variable_step_must_be_boolean() {
    struct Numeric;

    impl RandomRule for Numeric {
        fn initial_config(&self) -> Config {
            Config::None
        }

        fn resolve(
            &self,
            _config: &Config,
            _deps: &DependencyValues,
            _ctx: &StepContext<'_>,
            _rng: &mut dyn rand::RngCore,
        ) -> Result<Option<Value>, ResolveError> {
            Ok(Some(Value::Number(3)))
        }

        fn can_resolve_to(
            &self,
            _candidate: &Value,
            _deps: &tabletop_setup::DependencyQueries<'_>,
        ) -> bool {
            false
        }
    }

    let game = Game::new(vec![Step::variable("broken", Numeric)]).unwrap();
    let result = resolve_with_seed(&game, &Template::new(), &RawContext::new(), 1);
    assert!(matches!(
        result,
        Err(tabletop_setup::SetupError::Resolve(ResolveError::NotBoolean { .. }))
    ));
}

#[test]
fn test_query_will_resolve_tracks_pool_sufficiency() {
    let game = fixture();
    let template = Template::new();

    let full = three_players();
    assert!(game.query("map", &template, &full).unwrap().will_resolve());

    let empty = RawContext::new().with_players(["ana", "bo", "cleo"]);
    assert!(!game.query("map", &template, &empty).unwrap().will_resolve());
}

#[test]
fn test_query_can_resolve_to_is_config_agnostic() {
    let game = fixture();
    let template = Template::new().with_config(
        "map",
        Config::Pick(tabletop_setup::PickConfig::new().with_never(["north"])),
    );
    let ctx = three_players();
    let query = game.query("map", &template, &ctx).unwrap();

    // Some config reaches north even though the current one excludes it.
    assert!(query.can_resolve_to(&Value::Items(vec!["north".into()])));
    assert!(!query.can_resolve_to(&Value::Items(vec!["atlantis".into()])));
    assert!(!query.can_resolve_to(&Value::Bool(true)));
}

#[test]
fn test_query_only_resolvable_value() {
    let game = fixture();
    let template = Template::new();

    // A single enabled product forces the map draw.
    let forced = RawContext::new()
        .with_players(["ana", "bo", "cleo"])
        .with_products(["base"]);
    let query = game.query("map", &template, &forced).unwrap();
    assert_eq!(
        query.only_resolvable_value(),
        Some(Value::Items(vec!["base".into()]))
    );

    // Three products leave the draw undetermined.
    let ctx = three_players();
    let open = game.query("map", &template, &ctx).unwrap();
    assert_eq!(open.only_resolvable_value(), None);

    // A forced toggle is determined ahead of resolution.
    let toggled = Template::new().with_config("night-mode", Config::Flag(false));
    let query = game.query("night-mode", &toggled, &ctx).unwrap();
    assert_eq!(query.only_resolvable_value(), Some(Value::Bool(false)));
}

#[test]
fn test_query_unknown_step() {
    let game = fixture();
    let template = Template::new();
    let ctx = three_players();
    assert!(matches!(
        game.query("nowhere", &template, &ctx),
        Err(ResolveError::UnknownStep { .. })
    ));
}

#[test]
fn test_derived_query_is_predetermined_by_meta() {
    let game = fixture();
    let template = Template::new();
    let ctx = three_players();
    let query = game.query("player-count", &template, &ctx).unwrap();

    assert!(query.will_resolve());
    assert_eq!(query.only_resolvable_value(), Some(Value::Number(3)));
    assert!(query.can_resolve_to(&Value::Number(3)));
    assert!(!query.can_resolve_to(&Value::Number(4)));
}

#[test]
fn test_different_seeds_still_draw_legal_values() {
    let game = fixture();
    let ctx = three_players();
    for seed in 0..64 {
        let instance = resolve_with_seed(&game, &Template::new(), &ctx, seed).unwrap();
        assert!(instance.contains("map"));
        assert!(instance.contains("night-mode"));
        assert!(instance.contains("night-bonus"));
    }
}
