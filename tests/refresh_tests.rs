/// Config refresh - deterministic reconciliation of stored configs against
/// updated upstream availability
use tabletop_setup::rules::{ItemDraw, Toggle};
use tabletop_setup::{
    Config, Game, MetaKind, PickConfig, RawContext, Refresh, ResolveError, Step, Template,
};

fn game(draw: usize) -> Game {
    Game::new(vec![
        Step::meta("products", MetaKind::Products),
        Step::random("decks", ItemDraw::new(draw)).depends_on(["products"]),
        Step::variable("night-mode", Toggle::new()),
    ])
    .unwrap()
}

#[test]
fn test_refresh_filters_to_current_availability() {
    // {always: [red], never: [blue]} against [red, green]
    // => {always: [red], never: []}.
    let game = game(1);
    let ctx = RawContext::new().with_products(["red", "green"]);
    let stored = Config::Pick(
        PickConfig::new()
            .with_always(["red"])
            .with_never(["blue"]),
    );

    let refreshed = game
        .refresh("decks", &stored, &Template::new(), &ctx)
        .unwrap();
    assert_eq!(
        refreshed,
        Refresh::Updated(Config::Pick(PickConfig::new().with_always(["red"])))
    );
}

#[test]
fn test_refresh_is_idempotent_at_unchanged() {
    let game = game(1);
    let ctx = RawContext::new().with_products(["red", "green"]);
    let stored = Config::Pick(
        PickConfig::new()
            .with_always(["red"])
            .with_never(["blue"]),
    );

    let repaired = match game
        .refresh("decks", &stored, &Template::new(), &ctx)
        .unwrap()
    {
        Refresh::Updated(config) => config,
        other => panic!("expected a repair, got {:?}", other),
    };
    assert_eq!(
        game.refresh("decks", &repaired, &Template::new(), &ctx)
            .unwrap(),
        Refresh::Unchanged
    );
}

#[test]
fn test_refresh_reports_unfixable_when_pool_shrinks() {
    // A two-deck draw cannot be satisfied by a single remaining product.
    let game = game(2);
    let ctx = RawContext::new().with_products(["red"]);
    let stored = Config::Pick(PickConfig::new());

    assert_eq!(
        game.refresh("decks", &stored, &Template::new(), &ctx)
            .unwrap(),
        Refresh::Unfixable
    );
}

#[test]
fn test_refresh_reports_unfixable_for_foreign_config_kind() {
    let game = game(1);
    let ctx = RawContext::new().with_products(["red", "green"]);
    assert_eq!(
        game.refresh("decks", &Config::Flag(true), &Template::new(), &ctx)
            .unwrap(),
        Refresh::Unfixable
    );
    assert_eq!(
        game.refresh("night-mode", &Config::Count(3), &Template::new(), &ctx)
            .unwrap(),
        Refresh::Unfixable
    );
}

#[test]
fn test_refresh_keeps_valid_configs_verbatim() {
    let game = game(1);
    let ctx = RawContext::new().with_products(["red", "green"]);
    let stored = Config::Pick(PickConfig::new().with_never(["green"]));

    assert_eq!(
        game.refresh("decks", &stored, &Template::new(), &ctx)
            .unwrap(),
        Refresh::Unchanged
    );
    assert_eq!(
        game.refresh("night-mode", &Config::Flag(true), &Template::new(), &ctx)
            .unwrap(),
        Refresh::Unchanged
    );
}

#[test]
fn test_refresh_on_configless_steps_is_unchanged() {
    let game = Game::new(vec![Step::meta("products", MetaKind::Products)]).unwrap();
    let ctx = RawContext::new().with_products(["red"]);
    assert_eq!(
        game.refresh("products", &Config::None, &Template::new(), &ctx)
            .unwrap(),
        Refresh::Unchanged
    );
}

#[test]
fn test_refresh_unknown_step() {
    let game = game(1);
    let ctx = RawContext::new();
    assert!(matches!(
        game.refresh("nowhere", &Config::None, &Template::new(), &ctx),
        Err(ResolveError::UnknownStep { .. })
    ));
}
