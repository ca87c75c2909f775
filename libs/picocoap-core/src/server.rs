//! Observe server (core logic)
//!
//! Owns the resource tree, the observer registry, the notification scheduler
//! and the adapters. Every entry point takes `&mut self` and returns without
//! blocking; the embedding runtime calls them from one event loop.

use log::{debug, error, info, trace, warn};

use crate::config::ServerConfig;
use crate::discovery::{self, DiscoveryDocument};
use crate::error::{ConfigError, ServerError};
use crate::handler::{self, light_representation, LightCommand, Reply, Representation};
use crate::observers::{Cursor, Observer, ObserverHandle, ObserverRegistry};
use crate::protocol::{
    Code, ContentFormat, ContentFormatSet, MessageConfig, MessageError, MessageType, Remote,
    Request,
};
use crate::resource::{Permissions, Resource, ResourceId, ResourceKind, ResourceTree};
use crate::scheduler::Scheduler;
use crate::traits::{Actuator, MessageExchange, MessageHandle, TransmissionStatus};

/// Observe server
///
/// # Generic Parameters
///
/// - `E`: message exchange adapter
/// - `A`: actuator behind the light resource
/// - `MAX_RESOURCES`: resource tree capacity, root included (at least 5)
/// - `MAX_OBSERVERS`: concurrent subscriptions
/// - `MAX_PENDING`: confirmable notifications awaiting their delivery outcome
/// - `MAX_PAYLOAD_SIZE`: payload capacity of requests and messages
/// - `DISCOVERY_SIZE`: `/.well-known/core` document capacity in bytes
#[derive(Debug)]
pub struct ObserveServer<
    E,
    A,
    const MAX_RESOURCES: usize,
    const MAX_OBSERVERS: usize,
    const MAX_PENDING: usize,
    const MAX_PAYLOAD_SIZE: usize,
    const DISCOVERY_SIZE: usize,
> {
    exchange: E,
    actuator: A,
    config: ServerConfig,
    tree: ResourceTree<MAX_RESOURCES>,
    observers: ObserverRegistry<MAX_OBSERVERS>,
    scheduler: Scheduler<MAX_PENDING>,
    sequence: u32,
    discovery: DiscoveryDocument<DISCOVERY_SIZE>,
    light: ResourceId,
}

impl<
        E,
        A,
        const MAX_RESOURCES: usize,
        const MAX_OBSERVERS: usize,
        const MAX_PENDING: usize,
        const MAX_PAYLOAD_SIZE: usize,
        const DISCOVERY_SIZE: usize,
    >
    ObserveServer<E, A, MAX_RESOURCES, MAX_OBSERVERS, MAX_PENDING, MAX_PAYLOAD_SIZE, DISCOVERY_SIZE>
where
    E: MessageExchange<MAX_PAYLOAD_SIZE>,
    A: Actuator,
{
    /// Build the resource tree and discovery document
    ///
    /// The tree is `/.well-known/core` plus `/<group_name>/<light_name>`.
    pub fn new(exchange: E, mut actuator: A, config: ServerConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut tree = ResourceTree::<MAX_RESOURCES>::new()?;
        let well_known = tree.add_child(
            ResourceId::ROOT,
            Resource::new(".well-known", ResourceKind::Container)?,
        )?;
        tree.add_child(
            well_known,
            Resource::new("core", ResourceKind::Discovery)?
                .with_permissions(Permissions::GET)
                .with_formats(ContentFormatSet::of(ContentFormat::LinkFormat)),
        )?;
        let group = tree.add_child(
            ResourceId::ROOT,
            Resource::new(config.group_name, ResourceKind::Container)?,
        )?;
        let light = tree.add_child(
            group,
            Resource::new(config.light_name, ResourceKind::Light)?
                .with_permissions(Permissions::GET | Permissions::PUT | Permissions::OBSERVE)
                .with_formats(
                    ContentFormatSet::of(ContentFormat::PlainText).with(ContentFormat::Json),
                )
                .with_max_age(config.max_age),
        )?;

        let discovery = discovery::generate::<MAX_RESOURCES, DISCOVERY_SIZE>(&tree)?;
        actuator.set(config.initial_light);

        info!(
            "Observe server ready: {} resources, discovery {} bytes",
            tree.len(),
            discovery.len()
        );

        Ok(Self {
            exchange,
            actuator,
            config,
            tree,
            observers: ObserverRegistry::new(),
            scheduler: Scheduler::new(config.reliable_every, config.notify_margin),
            sequence: 0,
            discovery,
            light,
        })
    }

    /// Dispatch one inbound request and send its response
    pub fn handle_request(
        &mut self,
        request: &Request<MAX_PAYLOAD_SIZE>,
    ) -> Result<(), ServerError> {
        debug!(
            "{} /{} from {} (mid {})",
            request.code, request.uri_path, request.remote, request.message_id
        );

        let Some((id, kind, permissions)) = self
            .tree
            .resolve(&request.uri_path)
            .and_then(|id| self.tree.get(id).map(|r| (id, r.kind(), r.permissions())))
        else {
            return self.reply(request, &Reply::status(Code::NotFound));
        };

        if !permissions.allows(request.code) {
            return self.reply(request, &Reply::status(Code::MethodNotAllowed));
        }

        match (kind, request.code) {
            (ResourceKind::Discovery, Code::Get) => {
                let reply = Reply::content(ContentFormat::LinkFormat, self.discovery.as_bytes());
                handler::send_reply(&mut self.exchange, request, &reply)
            }
            (ResourceKind::Light, Code::Get) => self.get_light(id, request),
            (ResourceKind::Light, Code::Put) => self.put_light(id, request),
            _ => self.reply(request, &Reply::status(Code::MethodNotAllowed)),
        }
    }

    /// Advance freshness by one tick and push notifications that fell due
    ///
    /// Returns the number of notifications sent.
    pub fn tick(&mut self) -> usize {
        let due = self.scheduler.due(&mut self.tree);
        let mut sent = 0;
        for id in due {
            let msg_type = self.scheduler.next_push_type();
            sent += self.notify(id, msg_type);
        }
        if sent > 0 {
            debug!("Tick pushed {} notifications", sent);
        }
        sent
    }

    /// Consume the delivery outcome of a confirmable notification
    ///
    /// Timeout and reset remove the subscription the notification was sent
    /// to, along with its other notifications still in flight. Returns true
    /// when a subscription was removed.
    pub fn handle_transmission_result(
        &mut self,
        message: MessageHandle,
        status: TransmissionStatus,
    ) -> bool {
        let Some(handle) = self.scheduler.complete(message) else {
            trace!("No pending notification for message {}", message);
            return false;
        };

        if !status.is_failure() {
            trace!("Notification {} delivered to observer {}", message, handle);
            return false;
        }

        self.scheduler.forget(handle);
        match self.observers.unregister(handle) {
            Ok(observer) => {
                info!(
                    "Observer {} dropped: notification {} ended with {:?}",
                    observer.remote, message, status
                );
                true
            }
            Err(_) => {
                debug!("Observer {} already gone", handle);
                false
            }
        }
    }

    /// Toggle the light from a local input and push the new state
    ///
    /// Returns the number of notifications sent.
    pub fn handle_button_press(&mut self) -> usize {
        self.actuator.toggle();
        info!("Button toggled light to {}", self.actuator.is_on());
        self.notify(self.light, MessageType::NonConfirmable)
    }

    /// Drop every subscription held by `remote`
    ///
    /// Returns the number of subscriptions removed.
    pub fn drop_remote(&mut self, remote: &Remote) -> usize {
        let removed = self.observers.unregister_remote(remote);
        if removed > 0 {
            self.scheduler.retain_registered(&self.observers);
            info!("Dropped {} subscriptions of {}", removed, remote);
        }
        removed
    }

    fn reply(
        &mut self,
        request: &Request<MAX_PAYLOAD_SIZE>,
        reply: &Reply<'_>,
    ) -> Result<(), ServerError> {
        handler::send_reply(&mut self.exchange, request, reply)
    }

    fn get_light(
        &mut self,
        id: ResourceId,
        request: &Request<MAX_PAYLOAD_SIZE>,
    ) -> Result<(), ServerError> {
        let Some((formats, expire_time, observable)) = self
            .tree
            .get(id)
            .map(|r| (r.formats(), r.expire_time(), r.is_observable()))
        else {
            return self.reply(request, &Reply::status(Code::NotFound));
        };

        let Some(format) = formats.select(&request.accept) else {
            debug!("No acceptable format in {:?}", request.accept.as_slice());
            return self.reply(request, &Reply::status(Code::UnsupportedContentFormat));
        };

        let representation = self.representation(ResourceKind::Light, format)?;
        let mut reply = Reply::content(format, representation.as_bytes());

        match request.observe {
            Some(0) if observable => {
                let observer = Observer {
                    remote: request.remote,
                    token: request.token.clone(),
                    resource: id,
                    content_format: format,
                };
                match self.observers.register(observer) {
                    Ok(handle) => {
                        info!(
                            "Observer {} registered as {} ({:?})",
                            request.remote, handle, format
                        );
                        reply = reply.with_observe(self.next_sequence(), expire_time);
                    }
                    Err(error) => {
                        warn!("{}, serving {} without observe", error, request.remote);
                    }
                }
            }
            Some(0) => {}
            Some(_) => self.deregister(&request.remote, id),
            None => {}
        }

        handler::send_reply(&mut self.exchange, request, &reply)
    }

    fn put_light(
        &mut self,
        id: ResourceId,
        request: &Request<MAX_PAYLOAD_SIZE>,
    ) -> Result<(), ServerError> {
        let Some(command) = LightCommand::parse(&request.payload) else {
            // light unchanged, observers are not notified
            debug!("Rejected light command from {}", request.remote);
            return self.reply(request, &Reply::status(Code::BadRequest));
        };

        command.apply(&mut self.actuator);
        info!("Light set to {} by {}", self.actuator.is_on(), request.remote);

        let result = self.reply(request, &Reply::status(Code::Changed));
        self.notify(id, MessageType::NonConfirmable);
        result
    }

    fn deregister(&mut self, remote: &Remote, id: ResourceId) {
        let Some(handle) = self.observers.find(remote, id) else {
            return;
        };
        if self.observers.unregister(handle).is_ok() {
            self.scheduler.forget(handle);
            info!("Observer {} deregistered", remote);
        }
    }

    fn representation(
        &self,
        kind: ResourceKind,
        format: ContentFormat,
    ) -> Result<Representation, MessageError> {
        match kind {
            ResourceKind::Light => {
                light_representation(self.config.light_name, self.actuator.is_on(), format)
            }
            _ => Ok(Representation::new()),
        }
    }

    /// Push the current state of `id` to each of its observers
    fn notify(&mut self, id: ResourceId, msg_type: MessageType) -> usize {
        let Some((kind, max_age)) = self.tree.get(id).map(|r| (r.kind(), r.max_age())) else {
            return 0;
        };

        let mut sent = 0;
        let mut cursor = Cursor::START;
        while let Some((handle, observer, next)) = self.observers.next(cursor, id) {
            cursor = next;
            let observer = observer.clone();
            match self.send_notification(handle, &observer, kind, max_age, msg_type) {
                Ok(()) => sent += 1,
                Err(error) => error!("Notification to {} failed: {}", observer.remote, error),
            }
        }
        sent
    }

    fn send_notification(
        &mut self,
        handle: ObserverHandle,
        observer: &Observer,
        kind: ResourceKind,
        max_age: u32,
        msg_type: MessageType,
    ) -> Result<(), ServerError> {
        let representation = self.representation(kind, observer.content_format)?;
        let msg_type = if msg_type.is_confirmable() && self.scheduler.is_pending_full() {
            warn!("Pending table full, notifying {} non-confirmable", observer.remote);
            MessageType::NonConfirmable
        } else {
            msg_type
        };
        let config = MessageConfig {
            msg_type,
            code: Code::Content,
            message_id: None,
            token: observer.token.clone(),
        };
        let mut message = self.exchange.new_message(config)?;
        message.set_remote(observer.remote);

        let reply = Reply::content(observer.content_format, representation.as_bytes())
            .with_observe(self.next_sequence(), max_age);
        let result = handler::write_reply(&mut message, &reply)
            .map_err(ServerError::from)
            .and_then(|_| self.exchange.send(&message).map_err(ServerError::from));
        self.exchange.release(message);

        let sent = result?;
        if msg_type.is_confirmable() {
            self.scheduler.track(sent, handle)?;
        }
        trace!(
            "Notified {} with {:?} {}",
            observer.remote,
            msg_type,
            sent
        );
        Ok(())
    }

    fn next_sequence(&mut self) -> u32 {
        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        sequence
    }

    /// Id of the light resource
    pub fn light(&self) -> ResourceId {
        self.light
    }

    /// Sequence number the next subscribe acknowledgement or notification gets
    pub fn sequence_number(&self) -> u32 {
        self.sequence
    }

    pub fn observer_count(&self, resource: ResourceId) -> usize {
        self.observers.count(resource)
    }

    pub fn observers(&self) -> &ObserverRegistry<MAX_OBSERVERS> {
        &self.observers
    }

    pub fn tree(&self) -> &ResourceTree<MAX_RESOURCES> {
        &self.tree
    }

    pub fn discovery_document(&self) -> &str {
        self.discovery.as_str()
    }

    /// Confirmable notifications awaiting their delivery outcome
    pub fn pending_notifications(&self) -> usize {
        self.scheduler.pending_len()
    }

    /// Scheduled pushes so far, button and PUT pushes excluded
    pub fn scheduled_pushes(&self) -> u32 {
        self.scheduler.pushes()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }

    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    pub fn exchange_mut(&mut self) -> &mut E {
        &mut self.exchange
    }
}
