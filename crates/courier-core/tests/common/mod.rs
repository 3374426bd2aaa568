//! Shared setup for channel integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use courier_core::{BindingElement, Channel, ChannelObserver, ProtocolVariant};
use courier_harness::{SimEnv, TestMessage, TestMessageFactory, TestSerializer};
use courier_proto::{HttpMethod, HttpRequest, Protections};
use url::Url;

pub fn op_endpoint() -> Url {
    Url::parse("https://op.example/server").unwrap()
}

pub fn rp_return() -> Url {
    Url::parse("https://rp.example/return").unwrap()
}

/// Channel with the given elements over the harness doubles.
pub fn channel<V: ProtocolVariant>(
    variant: V,
    factory: TestMessageFactory,
    elements: Vec<Box<dyn BindingElement>>,
) -> Channel<V> {
    Channel::builder(variant)
        .message_factory(Arc::new(factory))
        .serializer(Arc::new(TestSerializer))
        .environment(Arc::new(SimEnv::new()))
        .binding_elements(elements)
        .build()
        .unwrap()
}

/// Channel that also reports to `observer`.
pub fn observed_channel<V: ProtocolVariant>(
    variant: V,
    factory: TestMessageFactory,
    elements: Vec<Box<dyn BindingElement>>,
    observer: Arc<dyn ChannelObserver>,
) -> Channel<V> {
    Channel::builder(variant)
        .message_factory(Arc::new(factory))
        .serializer(Arc::new(TestSerializer))
        .environment(Arc::new(SimEnv::new()))
        .binding_elements(elements)
        .observer(observer)
        .build()
        .unwrap()
}

/// Factory whose incoming requests and responses both require `required`.
pub fn factory_requiring(required: Protections) -> TestMessageFactory {
    let request = TestMessage::indirect_request("", op_endpoint()).requiring(required);
    let response = TestMessage::direct_response("").requiring(required);
    TestMessageFactory::new(&request, &response)
}

/// Factory shaped for the server side of direct exchanges.
pub fn direct_server_factory() -> TestMessageFactory {
    let request = TestMessage::direct_request("", op_endpoint());
    let response = TestMessage::direct_response("");
    TestMessageFactory::new(&request, &response)
}

/// Request a browser makes when following a redirect.
pub fn follow_redirect(location: &str) -> HttpRequest {
    HttpRequest::new(HttpMethod::Get, Url::parse(location).unwrap())
}
