#![allow(dead_code)]

use crux_core::testing::AppTester;
use crux_http::protocol::{HttpResponse, HttpResult};
use serde_json::{json, Value};
use shared::capabilities::ApiReply;
use shared::{App, Effect, Event, Model};

pub const BASE: &str = "http://api.test";

pub type Tester = AppTester<App, Effect>;

/// A started app with a configured server and no session.
pub fn started() -> (Tester, Model) {
    let app = Tester::default();
    let mut model = Model::default();
    app.update(
        Event::AppStarted {
            api_base_url: Some(BASE.to_string()),
        },
        &mut model,
    );
    (app, model)
}

/// A started app with a restored session.
pub fn signed_in() -> (Tester, Model) {
    let (app, mut model) = started();
    app.update(Event::SessionLoaded(Ok(Some("tok-1".into()))), &mut model);
    (app, model)
}

pub fn requests(effects: &[Effect]) -> Vec<(String, String)> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Http(req) => Some((req.operation.method.clone(), req.operation.url.clone())),
            _ => None,
        })
        .collect()
}

/// JSON body of the first HTTP request in `effects`.
pub fn json_body(effects: &[Effect]) -> Value {
    effects
        .iter()
        .find_map(|e| match e {
            Effect::Http(req) => serde_json::from_slice(&req.operation.body).ok(),
            _ => None,
        })
        .expect("a json request body")
}

pub fn renders(effects: &[Effect]) -> bool {
    effects.iter().any(|e| matches!(e, Effect::Render(_)))
}

pub fn ok(body: Value) -> Result<ApiReply, shared::AppError> {
    Ok(ApiReply::json(200, &body))
}

pub fn item(id: u64, item_type: u8, title: &str) -> Value {
    json!({
        "id": id,
        "item_type": item_type,
        "title": title,
        "category": "Electronics",
        "location": "Library",
        "date": "2024-05-01",
        "descs": "found near the entrance",
        "images": [{ "id": id * 10, "imagePath": format!("img-{id}.jpg") }]
    })
}

pub fn list(items: Vec<Value>) -> Value {
    json!({ "status": true, "data": items })
}

/// Load the dashboard with the given items.
pub fn load_my_items(app: &Tester, model: &mut Model, items: Vec<Value>) {
    app.update(Event::Navigate(shared::model::Page::MyItems), model);
    let seq = model
        .my_items
        .controller
        .latest_seq()
        .expect("dashboard fetch issued");
    app.update(
        Event::MyItemsResponse {
            seq,
            outcome: ok(list(items)),
        },
        model,
    );
}

/// Answer the first HTTP request in `effects` as the shell would, then feed
/// the resulting events back into the app.
pub fn answer_http(app: &Tester, model: &mut Model, effects: Vec<Effect>, status: u16, body: Value) {
    let mut request = effects
        .into_iter()
        .find_map(|e| match e {
            Effect::Http(req) => Some(req),
            _ => None,
        })
        .expect("an http request");
    let response = HttpResponse::status(status).json(body).build();
    let update = app
        .resolve(&mut request, HttpResult::Ok(response))
        .expect("request resolves");
    for event in update.events {
        app.update(event, model);
    }
}
