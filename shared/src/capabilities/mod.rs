mod http;
mod kv;

pub use self::http::{
    acknowledge, decode, extract_list, extract_record, Acknowledged, ApiOperation, ApiOutcome,
    ApiReply, ApiRequest, ContentType, HttpMethod, Multipart, RequestBody, RequestError,
    UPLOAD_FIELD_NAME,
};
pub use self::kv::{decode_token, KvError, KvResult, TokenStore};

pub use crux_core::render::Render;
pub use crux_http::Http;
pub use crux_kv::KeyValue;

#[allow(unused_imports)]
use crate::app::App;
use crate::event::Event;

pub type AppHttp = Http<Event>;
pub type AppKv = KeyValue<Event>;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub kv: KeyValue<Event>,
    pub render: Render<Event>,
}
