mod common;

use common::*;
use serde_json::json;
use shared::model::Page;
use shared::search::{FilterChip, StatusFilter};
use shared::Event;

#[test]
fn startup_loads_the_session_and_the_home_list() {
    let (app, mut model) = (common::Tester::default(), shared::Model::default());
    let update = app.update(
        Event::AppStarted {
            api_base_url: Some(BASE.into()),
        },
        &mut model,
    );

    assert!(model.is_ready());
    assert!(update
        .effects
        .iter()
        .any(|e| matches!(e, shared::Effect::KeyValue(_))));
    assert_eq!(
        requests(&update.effects),
        vec![("GET".to_string(), format!("{BASE}/items/search"))]
    );
    assert!(app.view(&model).home.is_loading);
}

#[test]
fn missing_configuration_blocks_every_fetch() {
    let app = common::Tester::default();
    let mut model = shared::Model::default();
    app.update(
        Event::AppStarted {
            api_base_url: Some("   ".into()),
        },
        &mut model,
    );
    assert_eq!(model.state, shared::AppState::Misconfigured);

    let update = app.update(Event::Navigate(Page::Catalog), &mut model);
    assert!(requests(&update.effects).is_empty());
    assert!(matches!(
        app.view(&model).state,
        shared::view::ViewState::Misconfigured { .. }
    ));
}

#[test]
fn catalog_filters_drive_the_query_and_cards() {
    let (app, mut model) = started();
    app.update(Event::Navigate(Page::Catalog), &mut model);

    app.update(
        Event::FilterCategoryChanged(Some("Electronics".into())),
        &mut model,
    );
    let update = app.update(Event::FilterStatusToggled(StatusFilter::Found), &mut model);

    let sent = requests(&update.effects);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.ends_with("/items/search?category=Electronics&item_type=1"));

    let seq = model.catalog.controller.latest_seq().unwrap();
    app.update(
        Event::CatalogSearchResponse {
            seq,
            outcome: ok(list(vec![item(1, 1, "Laptop"), item(2, 1, "Phone")])),
        },
        &mut model,
    );

    let view = app.view(&model).catalog;
    assert_eq!(view.cards.len(), 2);
    assert!(view.cards.iter().all(|c| c.tag == "Found"));
    assert_eq!(
        view.cards[0].image_url.as_deref(),
        Some("http://api.test/uploads/items/img-1.jpg")
    );
    assert!(view.has_active_filters);
    assert_eq!(view.chips.len(), 2);
}

#[test]
fn only_the_latest_catalog_response_is_shown() {
    let (app, mut model) = started();
    app.update(Event::Navigate(Page::Catalog), &mut model);
    let first = model.catalog.controller.latest_seq().unwrap();

    app.update(Event::FilterColorToggled("Red".into()), &mut model);
    let second = model.catalog.controller.latest_seq().unwrap();
    assert!(second > first);

    app.update(
        Event::CatalogSearchResponse {
            seq: second,
            outcome: ok(list(vec![item(7, 0, "Red scarf")])),
        },
        &mut model,
    );
    let late = app.update(
        Event::CatalogSearchResponse {
            seq: first,
            outcome: ok(list(vec![item(1, 1, "a"), item(2, 1, "b")])),
        },
        &mut model,
    );

    assert!(!renders(&late.effects));
    let cards = app.view(&model).catalog.cards;
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].title, "Red scarf");
}

#[test]
fn only_the_first_color_reaches_the_query() {
    let (app, mut model) = started();
    app.update(Event::FilterColorToggled("Blue".into()), &mut model);
    let update = app.update(Event::FilterColorToggled("Red".into()), &mut model);

    let sent = requests(&update.effects);
    assert!(sent[0].1.ends_with("?color=Blue"));
    assert_eq!(model.catalog.selection.colors().len(), 2);
}

#[test]
fn removing_a_chip_and_clearing_refetch() {
    let (app, mut model) = started();
    app.update(Event::FilterKeywordsChanged("wallet".into()), &mut model);

    let update = app.update(
        Event::FilterChipRemoved(FilterChip::Keywords("wallet".into())),
        &mut model,
    );
    assert!(requests(&update.effects)[0].1.ends_with("/items/search"));

    // Nothing left to remove.
    let update = app.update(
        Event::FilterChipRemoved(FilterChip::Keywords("wallet".into())),
        &mut model,
    );
    assert!(requests(&update.effects).is_empty());

    app.update(Event::FilterStatusToggled(StatusFilter::Lost), &mut model);
    let update = app.update(Event::FiltersCleared, &mut model);
    let sent = requests(&update.effects);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.ends_with("/items/search"));
    assert!(!app.view(&model).catalog.has_active_filters);
}

#[test]
fn unknown_venue_is_rejected_without_a_request() {
    let (app, mut model) = started();
    let update = app.update(
        Event::FilterLocationChanged(Some("Moon".into())),
        &mut model,
    );
    assert!(requests(&update.effects).is_empty());
    assert!(model.active_toast.is_some());
}

#[test]
fn failed_search_surfaces_a_toast_and_keeps_old_results() {
    let (app, mut model) = started();
    app.update(Event::Navigate(Page::Catalog), &mut model);
    let seq = model.catalog.controller.latest_seq().unwrap();
    app.update(
        Event::CatalogSearchResponse {
            seq,
            outcome: ok(list(vec![item(1, 0, "Umbrella")])),
        },
        &mut model,
    );

    app.update(Event::FilterDateChanged(Some("2024-05-02".into())), &mut model);
    let seq = model.catalog.controller.latest_seq().unwrap();
    app.update(
        Event::CatalogSearchResponse {
            seq,
            outcome: Ok(shared::capabilities::ApiReply::json(
                500,
                &json!({ "status": false }),
            )),
        },
        &mut model,
    );

    assert!(model.active_toast.is_some());
    assert_eq!(app.view(&model).catalog.cards.len(), 1);
}

#[test]
fn quick_search_waits_for_the_debounce() {
    let (app, mut model) = started();

    let update = app.update(
        Event::QuickSearchKeywordsChanged {
            text: "lap".into(),
            now_ms: 1_000,
        },
        &mut model,
    );
    assert!(requests(&update.effects).is_empty());

    let update = app.update(
        Event::QuickSearchKeywordsChanged {
            text: "laptop".into(),
            now_ms: 1_200,
        },
        &mut model,
    );
    assert!(requests(&update.effects).is_empty());

    let update = app.update(Event::Tick { now_ms: 1_400 }, &mut model);
    assert!(requests(&update.effects).is_empty());

    let update = app.update(Event::Tick { now_ms: 1_500 }, &mut model);
    let sent = requests(&update.effects);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.ends_with("?keywords=laptop"));

    let update = app.update(Event::Tick { now_ms: 2_000 }, &mut model);
    assert!(requests(&update.effects).is_empty());
}

#[test]
fn home_pages_four_cards_at_a_time() {
    let (app, mut model) = started();
    let seq = model.home.controller.latest_seq().unwrap();
    let items = (1..=6).map(|i| item(i, 0, "thing")).collect();
    app.update(
        Event::HomeSearchResponse {
            seq,
            outcome: ok(list(items)),
        },
        &mut model,
    );

    let home = app.view(&model).home;
    assert_eq!(home.cards.len(), 4);
    assert!(home.has_more);

    app.update(Event::HomeShowMore, &mut model);
    let home = app.view(&model).home;
    assert_eq!(home.cards.len(), 6);
    assert!(!home.has_more);
}
