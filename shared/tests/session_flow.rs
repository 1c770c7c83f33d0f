mod common;

use common::*;
use serde_json::json;
use shared::auth::{SignInField, SignUpField};
use shared::capabilities::ApiReply;
use shared::event::Redacted;
use shared::model::{ItemId, Page};
use shared::view::NavAction;
use shared::{Effect, Event};

fn bearer_of(effects: &[Effect]) -> Option<String> {
    effects.iter().find_map(|e| match e {
        Effect::Http(req) => req
            .operation
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case("authorization"))
            .map(|h| h.value.clone()),
        _ => None,
    })
}

fn fill_sign_in(app: &Tester, model: &mut shared::Model) {
    app.update(Event::SignInDialogOpenChanged(true), model);
    app.update(
        Event::SignInFieldChanged(SignInField::Email("ada@campus.edu".into())),
        model,
    );
    app.update(
        Event::SignInFieldChanged(SignInField::Password(Redacted::new("secret1"))),
        model,
    );
}

#[test]
fn sign_in_flips_the_nav_and_persists_the_token() {
    let (app, mut model) = started();
    app.update(Event::SessionLoaded(Ok(None)), &mut model);
    assert_eq!(app.view(&model).nav, vec![NavAction::SignIn]);

    fill_sign_in(&app, &mut model);
    let update = app.update(Event::SignInSubmitted, &mut model);
    assert_eq!(
        requests(&update.effects),
        vec![("POST".to_string(), format!("{BASE}/auth/login"))]
    );
    assert!(app.view(&model).sign_in.submitting);

    let update = app.update(
        Event::SignInResponse(ok(json!({
            "status": true,
            "data": { "access_token": "tok-9" }
        }))),
        &mut model,
    );

    assert!(update
        .effects
        .iter()
        .any(|e| matches!(e, Effect::KeyValue(_))));
    let view = app.view(&model);
    assert!(view.signed_in);
    assert!(!view.sign_in.open);
    assert_eq!(
        view.nav,
        vec![NavAction::ReportItem, NavAction::MyItems, NavAction::SignOut]
    );
}

#[test]
fn rejected_credentials_stay_in_the_dialog() {
    let (app, mut model) = started();
    fill_sign_in(&app, &mut model);
    app.update(Event::SignInSubmitted, &mut model);

    app.update(
        Event::SignInResponse(Ok(ApiReply::json(
            401,
            &json!({ "status": false, "message": "Invalid email or password" }),
        ))),
        &mut model,
    );

    let view = app.view(&model);
    assert!(!view.signed_in);
    assert!(view.sign_in.open);
    assert_eq!(view.sign_in.error.as_deref(), Some("Invalid email or password"));
}

#[test]
fn invalid_sign_in_form_sends_nothing() {
    let (app, mut model) = started();
    app.update(Event::SignInDialogOpenChanged(true), &mut model);
    app.update(
        Event::SignInFieldChanged(SignInField::Email("not-an-email".into())),
        &mut model,
    );
    let update = app.update(Event::SignInSubmitted, &mut model);

    assert!(requests(&update.effects).is_empty());
    assert!(model.sign_in.error.is_some());
}

#[test]
fn sign_up_mismatch_never_reaches_the_server() {
    let (app, mut model) = started();
    app.update(Event::SignUpDialogOpenChanged(true), &mut model);
    for field in [
        SignUpField::Name("Ada".into()),
        SignUpField::Email("ada@campus.edu".into()),
        SignUpField::Password(Redacted::new("secret1")),
        SignUpField::ConfirmPassword(Redacted::new("secret2")),
        SignUpField::Age("20".into()),
        SignUpField::Phone("555".into()),
        SignUpField::Faculty("Science".into()),
    ] {
        app.update(Event::SignUpFieldChanged(field), &mut model);
    }

    let update = app.update(Event::SignUpSubmitted, &mut model);
    assert!(requests(&update.effects).is_empty());
    assert!(model.sign_up.error.is_some());

    app.update(
        Event::SignUpFieldChanged(SignUpField::ConfirmPassword(Redacted::new("secret1"))),
        &mut model,
    );
    let update = app.update(Event::SignUpSubmitted, &mut model);
    assert_eq!(
        requests(&update.effects),
        vec![("POST".to_string(), format!("{BASE}/auth/register"))]
    );

    // Registration returns the token at the top level.
    app.update(
        Event::SignUpResponse(ok(json!({ "status": true, "access_token": "tok-new" }))),
        &mut model,
    );
    assert!(model.session.is_authenticated());
}

#[test]
fn opening_sign_up_closes_sign_in() {
    let (app, mut model) = started();
    app.update(Event::SignInDialogOpenChanged(true), &mut model);
    app.update(Event::SignUpDialogOpenChanged(true), &mut model);

    let view = app.view(&model);
    assert!(view.sign_up.open);
    assert!(!view.sign_in.open);
}

#[test]
fn protected_requests_carry_the_bearer_token() {
    let (app, mut model) = signed_in();
    let update = app.update(Event::Navigate(Page::MyItems), &mut model);

    assert_eq!(
        requests(&update.effects),
        vec![("GET".to_string(), format!("{BASE}/items/my-items"))]
    );
    assert_eq!(bearer_of(&update.effects).as_deref(), Some("Bearer tok-1"));
}

#[test]
fn signed_out_users_are_kept_off_my_items() {
    let (app, mut model) = started();
    let update = app.update(Event::Navigate(Page::MyItems), &mut model);

    assert!(requests(&update.effects).is_empty());
    assert_eq!(model.page, Page::Home);
    assert!(model.active_toast.is_some());
}

#[test]
fn sign_out_clears_user_state_and_storage() {
    let (app, mut model) = signed_in();
    load_my_items(&app, &mut model, vec![item(1, 0, "Mine")]);
    app.update(Event::DeleteRequested(ItemId(1)), &mut model);

    let update = app.update(Event::SignOutRequested, &mut model);

    assert!(update
        .effects
        .iter()
        .any(|e| matches!(e, Effect::KeyValue(_))));
    let view = app.view(&model);
    assert!(!view.signed_in);
    assert_eq!(view.page, Page::Home);
    assert!(view.my_items.cards.is_empty());
    assert!(view.delete.is_none());
}

#[test]
fn unauthorized_reply_rereads_the_stored_token() {
    let (app, mut model) = signed_in();
    app.update(Event::Navigate(Page::MyItems), &mut model);
    let seq = model.my_items.controller.latest_seq().unwrap();

    let update = app.update(
        Event::MyItemsResponse {
            seq,
            outcome: Ok(ApiReply::json(401, &json!({ "status": false }))),
        },
        &mut model,
    );
    assert!(update
        .effects
        .iter()
        .any(|e| matches!(e, Effect::KeyValue(_))));

    // Storage no longer has a token: the session ends.
    app.update(Event::SessionLoaded(Ok(None)), &mut model);
    assert!(!model.session.is_authenticated());
    assert_eq!(model.page, Page::Home);
}

#[test]
fn server_rejection_text_survives_the_http_round_trip() {
    let (app, mut model) = started();
    fill_sign_in(&app, &mut model);
    let update = app.update(Event::SignInSubmitted, &mut model);

    answer_http(
        &app,
        &mut model,
        update.effects,
        401,
        json!({ "status": false, "message": "Account is locked" }),
    );

    let view = app.view(&model);
    assert!(!view.signed_in);
    assert!(!view.sign_in.submitting);
    assert_eq!(view.sign_in.error.as_deref(), Some("Account is locked"));
}

#[test]
fn successful_http_round_trip_signs_in() {
    let (app, mut model) = started();
    fill_sign_in(&app, &mut model);
    let update = app.update(Event::SignInSubmitted, &mut model);

    answer_http(
        &app,
        &mut model,
        update.effects,
        200,
        json!({ "status": true, "data": { "access_token": "tok-http" } }),
    );
    assert!(model.session.is_authenticated());
}
