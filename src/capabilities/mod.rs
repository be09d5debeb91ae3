mod http;
mod kv;

pub use self::http::{
    api_result, api_unit, ApiError, ApiResult, BaseUrl, Endpoint, UrlError, DEFAULT_BASE_URL,
    MAX_URL_LENGTH,
};
pub use self::kv::{decode_ids, encode_ids, KvError, StorageKey, MAX_VALUE_SIZE};

pub use crux_core::render::Render;
pub use crux_http::Http;
pub use crux_kv::KeyValue;

use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub key_value: KeyValue<Event>,
    pub render: Render<Event>,
}
