//! Outgoing message routing and send-side checks.

mod common;

use std::sync::Arc;

use common::{channel, observed_channel, op_endpoint, rp_return};
use courier_core::{
    BindingElement, Channel, ChannelConfig, ChannelError, ConfigurationError, EncoderConfig,
    FormUrlEncoded, KeyValueForm, ProtocolViolation, UsageError,
};
use courier_harness::{
    Event, FailingElement, OrderLog, RecordingElement, RecordingObserver, TestMessage,
    TestMessageFactory, TestSerializer,
};
use courier_proto::{ProtectionKind, Protections, StatusCode};

fn plain_channel() -> Channel<FormUrlEncoded> {
    channel(FormUrlEncoded::default(), TestMessageFactory::default(), Vec::new())
}

/// Indirect request whose serialized wire size is exactly `size`.
///
/// `mode=m` is 7, `realm=https://rp.example/` is 26 and `payload=` adds 9,
/// so the payload text is `size - 42` bytes.
fn request_of_wire_size(size: usize) -> TestMessage {
    TestMessage::indirect_request("m", op_endpoint()).with_payload("p".repeat(size - 42))
}

#[test]
fn indirect_message_without_recipient_is_usage_error() {
    let message = TestMessage::indirect_request("checkid_setup", op_endpoint()).without_recipient();
    let err = plain_channel().send(Box::new(message)).unwrap_err();

    assert!(err.is_usage());
    assert!(matches!(err, ChannelError::Usage(UsageError::MissingRecipient { .. })));
}

#[test]
fn indirect_message_without_addressing_is_usage_error() {
    let message = TestMessage::indirect_request("checkid_setup", op_endpoint()).undirected();
    let err = plain_channel().send(Box::new(message)).unwrap_err();

    assert!(matches!(err, ChannelError::Usage(UsageError::NotDirected { .. })));
}

#[test]
fn direct_request_cannot_be_sent_as_a_response() {
    let message = TestMessage::direct_request("associate", op_endpoint());
    let err = plain_channel().send(Box::new(message)).unwrap_err();

    assert!(matches!(err, ChannelError::Usage(UsageError::DirectRequestViaSend { .. })));
}

#[test]
fn direct_response_needs_no_recipient() {
    let message = TestMessage::direct_response("id_res").with_payload("ok");
    let response = plain_channel().send(Box::new(message)).unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.location().is_none());
    assert_eq!(
        response.body_text().as_deref(),
        Some("mode=id_res&payload=ok&realm=https%3A%2F%2Frp.example%2F")
    );
}

#[test]
fn key_value_variant_writes_kvf_direct_responses() {
    let channel = channel(KeyValueForm::default(), TestMessageFactory::default(), Vec::new());
    let message = TestMessage::direct_response("error").with_extra("error", "unknown handle");

    let response = channel.send(Box::new(message)).unwrap();
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body_text().as_deref(),
        Some("mode:error\nrealm:https://rp.example/\nerror:unknown handle\n")
    );
}

#[test]
fn missing_protection_fails_before_dispatch() {
    let message = TestMessage::indirect_response("id_res", rp_return())
        .requiring(Protections::TAMPER_PROTECTION);
    let err = plain_channel().send(Box::new(message)).unwrap_err();

    let ChannelError::Protocol(violation) = &err else {
        panic!("expected a protocol violation, got {err:?}");
    };
    assert!(matches!(violation, ProtocolViolation::UnprotectedMessage { .. }));
    assert_eq!(violation.missing_protection(), Protections::TAMPER_PROTECTION);
}

#[test]
fn declining_element_does_not_count_as_protection() {
    let log = OrderLog::new();
    let elements: Vec<Box<dyn BindingElement>> = vec![Box::new(
        RecordingElement::providing(ProtectionKind::TamperProtection, &log).declining(),
    )];
    let channel = channel(FormUrlEncoded::default(), TestMessageFactory::default(), elements);

    let message = TestMessage::indirect_response("id_res", rp_return())
        .requiring(Protections::TAMPER_PROTECTION);
    let err = channel.send(Box::new(message)).unwrap_err();

    assert!(err.is_protocol_violation());
    assert_eq!(log.names("send"), vec!["tamper-protection"]);
}

#[test]
fn invalid_message_is_not_sent() {
    let message = TestMessage::indirect_request("", op_endpoint());
    let err = plain_channel().send(Box::new(message)).unwrap_err();

    assert!(matches!(
        err,
        ChannelError::Protocol(ProtocolViolation::InvalidMessage { ref reason, .. }) if reason == "mode is empty"
    ));
}

#[test]
fn element_failure_names_the_element() {
    let elements: Vec<Box<dyn BindingElement>> = vec![Box::new(FailingElement::new(None))];
    let channel = channel(FormUrlEncoded::default(), TestMessageFactory::default(), elements);

    let err = channel
        .send(Box::new(TestMessage::indirect_request("checkid_setup", op_endpoint())))
        .unwrap_err();
    let ChannelError::Protocol(ProtocolViolation::BindingFailed { element, protection, .. }) = &err
    else {
        panic!("expected a binding failure, got {err:?}");
    };
    assert_eq!(element, "failing");
    assert_eq!(*protection, None);
}

#[test]
fn payload_at_threshold_redirects() {
    let message = request_of_wire_size(2048);
    let response = plain_channel().send(Box::new(message)).unwrap();

    assert_eq!(response.status, StatusCode::FOUND);
    let location = response.location().unwrap();
    assert!(location.starts_with("https://op.example/server?mode=m&payload=ppp"));
    assert!(response.body.is_none());
}

#[test]
fn payload_above_threshold_posts_a_form() {
    let message = request_of_wire_size(2049);
    let response = plain_channel().send(Box::new(message)).unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.location().is_none());
    let body = response.body_text().unwrap();
    assert!(body.contains("action=\"https://op.example/server\""));
    assert!(body.contains("<input type=\"hidden\" name=\"mode\" value=\"m\" />"));
    assert_eq!(body.matches("type=\"hidden\"").count(), 3);
}

#[test]
fn configured_threshold_is_honored() {
    let channel = Channel::builder(FormUrlEncoded::default())
        .message_factory(Arc::new(TestMessageFactory::default()))
        .serializer(Arc::new(TestSerializer))
        .config(ChannelConfig {
            encoder: EncoderConfig { get_to_post_threshold: 50, ..EncoderConfig::default() },
        })
        .build()
        .unwrap();

    let response = channel.send(Box::new(request_of_wire_size(51))).unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.is_some());
}

#[test]
fn response_carries_the_prepared_message() {
    let log = OrderLog::new();
    let elements: Vec<Box<dyn BindingElement>> =
        vec![Box::new(RecordingElement::transform("stamp", &log))];
    let channel = channel(FormUrlEncoded::default(), TestMessageFactory::default(), elements);

    let mut response = channel
        .send(Box::new(TestMessage::indirect_request("checkid_setup", op_endpoint())))
        .unwrap();
    let message = response.take_original_message().unwrap();
    let message = message.downcast_ref::<TestMessage>().unwrap();
    assert_eq!(message.mode, "checkid_setup");
    assert!(response.original_message().is_none());
}

#[test]
fn observers_see_outgoing_messages() {
    let observer = Arc::new(RecordingObserver::new());
    let channel = observed_channel(
        FormUrlEncoded::default(),
        TestMessageFactory::default(),
        Vec::new(),
        observer.clone(),
    );

    channel.send(Box::new(TestMessage::indirect_request("checkid_setup", op_endpoint()))).unwrap();
    assert_eq!(observer.events(), vec![Event::Sending("TestMessage")]);
}

#[test]
fn builder_requires_factory_and_serializer() {
    let err = Channel::builder(FormUrlEncoded::default())
        .serializer(Arc::new(TestSerializer))
        .build()
        .unwrap_err();
    assert_eq!(err, ConfigurationError::MissingCollaborator("message factory"));

    let err = Channel::builder(FormUrlEncoded::default())
        .message_factory(Arc::new(TestMessageFactory::default()))
        .build()
        .unwrap_err();
    assert_eq!(err, ConfigurationError::MissingCollaborator("message serializer"));
}

#[test]
fn builder_rejects_duplicate_protection() {
    let log = OrderLog::new();
    let err = Channel::builder(FormUrlEncoded::default())
        .message_factory(Arc::new(TestMessageFactory::default()))
        .serializer(Arc::new(TestSerializer))
        .binding_element(RecordingElement::providing(ProtectionKind::TamperProtection, &log))
        .binding_element(RecordingElement::providing(ProtectionKind::TamperProtection, &log))
        .build()
        .unwrap_err();
    assert_eq!(err, ConfigurationError::DuplicateProtection(ProtectionKind::TamperProtection));
}

#[test]
fn builder_rejects_broken_dependency_chain() {
    let log = OrderLog::new();
    let err = Channel::builder(FormUrlEncoded::default())
        .message_factory(Arc::new(TestMessageFactory::default()))
        .serializer(Arc::new(TestSerializer))
        .binding_element(RecordingElement::providing(ProtectionKind::ReplayProtection, &log))
        .binding_element(RecordingElement::providing(ProtectionKind::TamperProtection, &log))
        .build()
        .unwrap_err();
    assert_eq!(err, ConfigurationError::MissingDependency {
        protection: ProtectionKind::ReplayProtection,
        missing: Protections::EXPIRATION,
    });
}

#[test]
fn channel_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Channel<FormUrlEncoded>>();
    assert_send_sync::<Channel<KeyValueForm>>();
}
