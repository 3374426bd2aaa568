//! Channel construction.
//!
//! All configuration errors surface here, once. A built channel has a valid
//! pipeline and every collaborator it needs.

use std::sync::Arc;

use courier_proto::{HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::Channel;
use crate::{
    binding::BindingElement,
    collaborators::{DirectWebRequestHandler, MessageFactory, MessageSerializer},
    encoder::{EncoderConfig, IndirectEncoder},
    env::{Environment, SystemEnv},
    error::{ConfigurationError, TransportError},
    observer::ChannelObserver,
    pipeline::BindingPipeline,
    variant::ProtocolVariant,
};

/// Serializable channel settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Indirect message encoding
    pub encoder: EncoderConfig,
}

/// Builder for [`Channel`].
///
/// The message factory and serializer are required. The environment
/// defaults to [`SystemEnv`]. Without a direct transport, every
/// [`Channel::request`] fails with a transport error.
pub struct ChannelBuilder<V> {
    variant: V,
    factory: Option<Arc<dyn MessageFactory>>,
    serializer: Option<Arc<dyn MessageSerializer>>,
    web_request_handler: Option<Arc<dyn DirectWebRequestHandler>>,
    env: Option<Arc<dyn Environment>>,
    elements: Vec<Box<dyn BindingElement>>,
    observers: Vec<Arc<dyn ChannelObserver>>,
    config: ChannelConfig,
}

impl<V: ProtocolVariant> ChannelBuilder<V> {
    pub(super) fn new(variant: V) -> Self {
        Self {
            variant,
            factory: None,
            serializer: None,
            web_request_handler: None,
            env: None,
            elements: Vec::new(),
            observers: Vec::new(),
            config: ChannelConfig::default(),
        }
    }

    /// Factory recognizing incoming messages
    #[must_use]
    pub fn message_factory(mut self, factory: Arc<dyn MessageFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Serializer converting messages to and from fields
    #[must_use]
    pub fn serializer(mut self, serializer: Arc<dyn MessageSerializer>) -> Self {
        self.serializer = Some(serializer);
        self
    }

    /// Transport for direct requests
    #[must_use]
    pub fn web_request_handler(mut self, handler: Arc<dyn DirectWebRequestHandler>) -> Self {
        self.web_request_handler = Some(handler);
        self
    }

    /// Clock and randomness for binding elements
    #[must_use]
    pub fn environment(mut self, env: Arc<dyn Environment>) -> Self {
        self.env = Some(env);
        self
    }

    /// Add a binding element. Order among protections is fixed by the
    /// channel; transformations keep the order they are added in.
    #[must_use]
    pub fn binding_element(mut self, element: impl BindingElement + 'static) -> Self {
        self.elements.push(Box::new(element));
        self
    }

    /// Add already boxed binding elements
    #[must_use]
    pub fn binding_elements(
        mut self,
        elements: impl IntoIterator<Item = Box<dyn BindingElement>>,
    ) -> Self {
        self.elements.extend(elements);
        self
    }

    /// Register a lifecycle observer
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn ChannelObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Replace the channel settings
    #[must_use]
    pub fn config(mut self, config: ChannelConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration and build the channel.
    ///
    /// # Errors
    ///
    /// - `MissingCollaborator` if the factory or serializer was not given
    /// - `DuplicateProtection` or `MissingDependency` if the binding
    ///   elements cannot form a pipeline
    pub fn build(self) -> Result<Channel<V>, ConfigurationError> {
        let factory =
            self.factory.ok_or(ConfigurationError::MissingCollaborator("message factory"))?;
        let serializer =
            self.serializer.ok_or(ConfigurationError::MissingCollaborator("message serializer"))?;
        let pipeline = BindingPipeline::new(self.elements)?;
        let web_request_handler: Arc<dyn DirectWebRequestHandler> = match self.web_request_handler {
            Some(handler) => handler,
            None => Arc::new(NoDirectTransport),
        };
        let env: Arc<dyn Environment> = match self.env {
            Some(env) => env,
            None => Arc::new(SystemEnv),
        };

        info!(
            variant = self.variant.name(),
            elements = ?pipeline.element_names(),
            protections = %pipeline.configured_protections(),
            threshold = self.config.encoder.get_to_post_threshold,
            "channel configured"
        );

        Ok(Channel {
            variant: self.variant,
            factory,
            serializer,
            web_request_handler,
            env,
            pipeline,
            encoder: IndirectEncoder::new(self.config.encoder),
            observers: self.observers,
        })
    }
}

/// Stand-in transport for channels that never make direct requests.
struct NoDirectTransport;

impl DirectWebRequestHandler for NoDirectTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        Err(TransportError::Rejected(format!(
            "no direct transport configured for {}",
            request.url
        )))
    }
}
