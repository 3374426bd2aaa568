//! Channels carrying the full set of standard elements, end to end.

use std::{sync::Arc, time::Duration};

use courier_bindings::{
    ExpirationConfig, ExpirationElement, ReplayConfig, ReplayElement, SigningElement,
};
use courier_core::{
    BindingElement, BindingError, Channel, ChannelError, FormUrlEncoded, KeyValueForm,
    ProtocolVariant, ProtocolViolation, Received,
};
use courier_harness::{LoopbackTransport, SimEnv, TestMessage, TestMessageFactory, TestSerializer};
use courier_proto::{
    HttpMethod, HttpRequest, HttpResponse, ProtectionKind, Protections, StatusCode,
};
use url::Url;

const KEY: &[u8; 32] = b"0123456789abcdef0123456789abcdef";

fn op_endpoint() -> Url {
    Url::parse("https://op.example/server").unwrap()
}

fn rp_return() -> Url {
    Url::parse("https://rp.example/return").unwrap()
}

fn standard_elements() -> Vec<Box<dyn BindingElement>> {
    vec![
        Box::new(SigningElement::new(KEY).unwrap()),
        Box::new(ExpirationElement::new(ExpirationConfig::default())),
        Box::new(ReplayElement::in_memory(ReplayConfig::default(), &ExpirationConfig::default())),
    ]
}

fn protected_channel<V: ProtocolVariant>(
    variant: V,
    factory: TestMessageFactory,
    env: &SimEnv,
) -> Channel<V> {
    Channel::builder(variant)
        .message_factory(Arc::new(factory))
        .serializer(Arc::new(TestSerializer))
        .environment(Arc::new(env.clone()))
        .binding_elements(standard_elements())
        .build()
        .unwrap()
}

fn relying_party(env: &SimEnv) -> Channel<FormUrlEncoded> {
    protected_channel(FormUrlEncoded::default(), TestMessageFactory::requiring(Protections::all()), env)
}

/// Browser request for the redirect produced by sending a signed assertion.
fn signed_assertion(channel: &Channel<FormUrlEncoded>) -> HttpRequest {
    let message = TestMessage::indirect_response("id_res", rp_return()).with_payload("alice");
    let response = channel.send(Box::new(message)).unwrap();
    HttpRequest::new(HttpMethod::Get, Url::parse(response.location().unwrap()).unwrap())
}

/// The element failure behind a rejected read.
fn rejection(received: Received) -> (Option<ProtectionKind>, BindingError) {
    match received {
        Received::Rejected(ProtocolViolation::BindingFailed { protection, source, .. }) => {
            (protection, source)
        },
        other => panic!("expected a binding failure, got {other:?}"),
    }
}

#[test]
fn sent_message_carries_every_protection() {
    let env = SimEnv::new();
    let channel = relying_party(&env);
    let request = signed_assertion(&channel);

    let query = request.url.query().unwrap();
    assert!(query.contains("created_at=1700000000"));
    assert!(query.contains("nonce="));
    assert!(query.contains("sig="));
}

#[test]
fn signed_assertion_round_trips() {
    let env = SimEnv::new();
    let channel = relying_party(&env);
    let request = signed_assertion(&channel);

    env.advance(Duration::from_secs(30));
    let message = channel.read_from_request(&request).into_message().unwrap();
    let message = message.downcast_ref::<TestMessage>().unwrap();
    assert_eq!(message.payload.as_deref(), Some("alice"));
}

#[test]
fn tampered_payload_is_rejected() {
    let env = SimEnv::new();
    let channel = relying_party(&env);
    let mut request = signed_assertion(&channel);

    let forged = request.url.as_str().replace("payload=alice", "payload=mallory");
    request.url = Url::parse(&forged).unwrap();

    let (protection, error) = rejection(channel.read_from_request(&request));
    assert_eq!(protection, Some(ProtectionKind::TamperProtection));
    assert_eq!(error, BindingError::InvalidSignature);
}

#[test]
fn stripped_signature_is_rejected() {
    let env = SimEnv::new();
    let channel = relying_party(&env);
    let mut request = signed_assertion(&channel);

    let pairs: Vec<(String, String)> = request
        .url
        .query_pairs()
        .filter(|(k, _)| k != "sig")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    request.url.query_pairs_mut().clear().extend_pairs(pairs);

    let (_, error) = rejection(channel.read_from_request(&request));
    assert_eq!(error, BindingError::MissingSignature);
}

#[test]
fn replayed_assertion_is_rejected() {
    let env = SimEnv::new();
    let channel = relying_party(&env);
    let request = signed_assertion(&channel);

    assert!(channel.read_from_request(&request).is_valid());
    let (protection, error) = rejection(channel.read_from_request(&request));
    assert_eq!(protection, Some(ProtectionKind::ReplayProtection));
    assert!(matches!(error, BindingError::ReplayDetected { .. }));
}

#[test]
fn short_replay_window_does_not_reopen_the_replay_gap() {
    let env = SimEnv::new();
    let expiration = ExpirationConfig::default();
    let channel = Channel::builder(FormUrlEncoded::default())
        .message_factory(Arc::new(TestMessageFactory::requiring(Protections::all())))
        .serializer(Arc::new(TestSerializer))
        .environment(Arc::new(env.clone()))
        .binding_element(SigningElement::new(KEY).unwrap())
        .binding_element(ExpirationElement::new(expiration))
        .binding_element(ReplayElement::in_memory(
            ReplayConfig { window: Duration::from_secs(60), ..ReplayConfig::default() },
            &expiration,
        ))
        .build()
        .unwrap();
    let request = signed_assertion(&channel);

    assert!(channel.read_from_request(&request).is_valid());
    env.advance(Duration::from_secs(120));
    let (protection, error) = rejection(channel.read_from_request(&request));
    assert_eq!(protection, Some(ProtectionKind::ReplayProtection));
    assert!(matches!(error, BindingError::ReplayDetected { .. }));
}

#[test]
fn stale_assertion_is_rejected() {
    let env = SimEnv::new();
    let channel = relying_party(&env);
    let request = signed_assertion(&channel);

    env.advance(Duration::from_secs(14 * 60));
    let (protection, error) = rejection(channel.read_from_request(&request));
    assert_eq!(protection, Some(ProtectionKind::Expiration));
    assert!(matches!(error, BindingError::Expired { .. }));
}

#[test]
fn assertion_from_the_future_is_rejected() {
    let env = SimEnv::new();
    let channel = relying_party(&env);
    let request = signed_assertion(&channel);

    env.rewind(Duration::from_secs(11 * 60));
    let (_, error) = rejection(channel.read_from_request(&request));
    assert!(matches!(error, BindingError::FromTheFuture { .. }));
}

#[test]
fn unsigned_channel_cannot_satisfy_a_protected_receiver() {
    let env = SimEnv::new();
    let sender = Channel::builder(FormUrlEncoded::default())
        .message_factory(Arc::new(TestMessageFactory::default()))
        .serializer(Arc::new(TestSerializer))
        .environment(Arc::new(env.clone()))
        .build()
        .unwrap();
    let receiver = relying_party(&env);

    let message = TestMessage::indirect_response("id_res", rp_return());
    let response = sender.send(Box::new(message)).unwrap();
    let request =
        HttpRequest::new(HttpMethod::Get, Url::parse(response.location().unwrap()).unwrap());

    let (protection, error) = rejection(receiver.read_from_request(&request));
    assert_eq!(protection, Some(ProtectionKind::TamperProtection));
    assert_eq!(error, BindingError::MissingSignature);
}

#[test]
fn protected_direct_exchange_over_key_value_form() {
    let env = SimEnv::new();
    let all = Protections::all();
    let server_factory = TestMessageFactory::new(
        &TestMessage::direct_request("", op_endpoint()).requiring(all),
        &TestMessage::direct_response("").requiring(all),
    );
    let server = protected_channel(KeyValueForm::default(), server_factory, &env);

    let transport = Arc::new(LoopbackTransport::new(move |request| {
        let incoming = match server.read_from_request(request) {
            Received::Valid(message) => message,
            _ => return Ok(HttpResponse::empty(StatusCode::BAD_REQUEST)),
        };
        let mut answer = TestMessage::direct_response("associated");
        answer.payload = incoming.downcast_ref::<TestMessage>().and_then(|m| m.payload.clone());
        let response = server
            .send(Box::new(answer))
            .map_err(|err| courier_core::TransportError::Rejected(err.to_string()))?;
        Ok(HttpResponse::new(response.status, response.body.unwrap_or_default()))
    }));

    let client = Channel::builder(KeyValueForm::default())
        .message_factory(Arc::new(TestMessageFactory::requiring(all)))
        .serializer(Arc::new(TestSerializer))
        .environment(Arc::new(env.clone()))
        .binding_elements(standard_elements())
        .web_request_handler(transport.clone())
        .build()
        .unwrap();

    let request = TestMessage::direct_request("associate", op_endpoint()).with_payload("dh");
    let response = client.request(Box::new(request)).unwrap();
    let response = response.downcast_ref::<TestMessage>().unwrap();
    assert_eq!(response.mode, "associated");
    assert_eq!(response.payload.as_deref(), Some("dh"));
    assert!(response.signature.is_some());

    let sent = transport.last_request().unwrap();
    assert_eq!(sent.method, HttpMethod::Post);
    let body = String::from_utf8_lossy(sent.body.as_deref().unwrap()).into_owned();
    assert!(body.contains("sig="));
}

#[test]
fn direct_response_signed_with_another_key_is_rejected() {
    let env = SimEnv::new();
    let forger = Channel::builder(KeyValueForm::default())
        .message_factory(Arc::new(TestMessageFactory::default()))
        .serializer(Arc::new(TestSerializer))
        .environment(Arc::new(env.clone()))
        .binding_element(SigningElement::new(b"not the shared key").unwrap())
        .build()
        .unwrap();

    let transport = Arc::new(LoopbackTransport::new(move |_request| {
        let response = forger
            .send(Box::new(TestMessage::direct_response("associated")))
            .map_err(|err| courier_core::TransportError::Rejected(err.to_string()))?;
        Ok(HttpResponse::new(response.status, response.body.unwrap_or_default()))
    }));

    let client = Channel::builder(KeyValueForm::default())
        .message_factory(Arc::new(TestMessageFactory::requiring(Protections::TAMPER_PROTECTION)))
        .serializer(Arc::new(TestSerializer))
        .environment(Arc::new(env))
        .binding_elements(standard_elements())
        .web_request_handler(transport)
        .build()
        .unwrap();

    let err = client
        .request(Box::new(TestMessage::direct_request("associate", op_endpoint())))
        .unwrap_err();
    let ChannelError::Protocol(ProtocolViolation::BindingFailed { source, .. }) = &err else {
        panic!("expected a binding failure, got {err:?}");
    };
    assert_eq!(*source, BindingError::InvalidSignature);
}
