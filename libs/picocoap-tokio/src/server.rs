use std::time::Duration;

use log::{debug, error, info, warn};
use picocoap_core::{
    Actuator, ConfigError, ExchangeError, MessageHandle, ObserveServer, Request, ServerConfig,
    ServerError, TransmissionStatus,
};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::exchange::{ChannelExchange, OutboundMessage};

/// Runtime settings of the tokio event loop
#[derive(Debug, Clone)]
pub struct TokioServerConfig {
    /// Scheduler tick period
    pub tick_interval_ms: u64,
    pub request_channel_capacity: usize,
    pub outbound_channel_capacity: usize,
    pub report_channel_capacity: usize,
    pub button_channel_capacity: usize,
}

impl Default for TokioServerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            request_channel_capacity: 16,
            outbound_channel_capacity: 32,
            report_channel_capacity: 16,
            button_channel_capacity: 4,
        }
    }
}

/// Delivery outcome of a confirmable message, as seen by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmissionReport {
    pub handle: MessageHandle,
    pub status: TransmissionStatus,
}

/// Sending side of the event loop's inputs
#[derive(Debug, Clone)]
pub struct ServerHandle<const MAX_PAYLOAD_SIZE: usize> {
    requests: mpsc::Sender<Request<MAX_PAYLOAD_SIZE>>,
    reports: mpsc::Sender<TransmissionReport>,
    buttons: mpsc::Sender<()>,
}

impl<const MAX_PAYLOAD_SIZE: usize> ServerHandle<MAX_PAYLOAD_SIZE> {
    pub async fn request(&self, request: Request<MAX_PAYLOAD_SIZE>) -> Result<(), ExchangeError> {
        self.requests
            .send(request)
            .await
            .map_err(|_| ExchangeError::Closed)
    }

    pub async fn report(
        &self,
        handle: MessageHandle,
        status: TransmissionStatus,
    ) -> Result<(), ExchangeError> {
        self.reports
            .send(TransmissionReport { handle, status })
            .await
            .map_err(|_| ExchangeError::Closed)
    }

    pub async fn press_button(&self) -> Result<(), ExchangeError> {
        self.buttons.send(()).await.map_err(|_| ExchangeError::Closed)
    }
}

/// Observe server driven by a tokio event loop
///
/// Ticks, inbound requests, delivery reports and button presses are consumed
/// one at a time by [`TokioObserveServer::run`]. When several are ready at
/// once they are taken in that order: tick, report, button, request.
pub struct TokioObserveServer<
    A,
    const MAX_RESOURCES: usize,
    const MAX_OBSERVERS: usize,
    const MAX_PENDING: usize,
    const MAX_PAYLOAD_SIZE: usize,
    const DISCOVERY_SIZE: usize,
> {
    server: ObserveServer<
        ChannelExchange,
        A,
        MAX_RESOURCES,
        MAX_OBSERVERS,
        MAX_PENDING,
        MAX_PAYLOAD_SIZE,
        DISCOVERY_SIZE,
    >,
    config: TokioServerConfig,
    requests: mpsc::Receiver<Request<MAX_PAYLOAD_SIZE>>,
    reports: mpsc::Receiver<TransmissionReport>,
    buttons: mpsc::Receiver<()>,
}

impl<
        A,
        const MAX_RESOURCES: usize,
        const MAX_OBSERVERS: usize,
        const MAX_PENDING: usize,
        const MAX_PAYLOAD_SIZE: usize,
        const DISCOVERY_SIZE: usize,
    >
    TokioObserveServer<
        A,
        MAX_RESOURCES,
        MAX_OBSERVERS,
        MAX_PENDING,
        MAX_PAYLOAD_SIZE,
        DISCOVERY_SIZE,
    >
where
    A: Actuator,
{
    /// Create the server and its channels
    ///
    /// Returns the server, the handle feeding it and the receiver of every
    /// message it sends.
    #[allow(clippy::type_complexity)]
    pub fn new(
        actuator: A,
        server_config: ServerConfig,
        config: TokioServerConfig,
    ) -> Result<
        (
            Self,
            ServerHandle<MAX_PAYLOAD_SIZE>,
            mpsc::Receiver<OutboundMessage>,
        ),
        ConfigError,
    > {
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_channel_capacity);
        let (request_tx, request_rx) = mpsc::channel(config.request_channel_capacity);
        let (report_tx, report_rx) = mpsc::channel(config.report_channel_capacity);
        let (button_tx, button_rx) = mpsc::channel(config.button_channel_capacity);

        let exchange = ChannelExchange::new(outbound_tx);
        let server = ObserveServer::new(exchange, actuator, server_config)?;

        let handle = ServerHandle {
            requests: request_tx,
            reports: report_tx,
            buttons: button_tx,
        };
        let this = Self {
            server,
            config,
            requests: request_rx,
            reports: report_rx,
            buttons: button_rx,
        };
        Ok((this, handle, outbound_rx))
    }

    /// Run until every [`ServerHandle`] is dropped
    ///
    /// Fails when the outbound channel is closed.
    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let period = Duration::from_millis(self.config.tick_interval_ms);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut reports_open = true;
        let mut buttons_open = true;

        info!(
            "Observe server running, tick every {} ms",
            self.config.tick_interval_ms
        );

        loop {
            tokio::select! {
                biased;

                _ = ticker.tick() => {
                    self.server.tick();
                }

                report = self.reports.recv(), if reports_open => {
                    match report {
                        Some(report) => {
                            debug!("{} reported {:?}", report.handle, report.status);
                            self.server.handle_transmission_result(report.handle, report.status);
                        }
                        None => {
                            warn!("Report channel closed");
                            reports_open = false;
                        }
                    }
                }

                press = self.buttons.recv(), if buttons_open => {
                    match press {
                        Some(()) => {
                            self.server.handle_button_press();
                        }
                        None => buttons_open = false,
                    }
                }

                request = self.requests.recv() => {
                    let Some(request) = request else {
                        info!("Request channel closed, stopping observe server");
                        return Ok(());
                    };
                    match self.server.handle_request(&request) {
                        Ok(()) => {}
                        Err(ServerError::Exchange(ExchangeError::Closed)) => {
                            error!("Outbound channel closed");
                            return Err(ExchangeError::Closed.into());
                        }
                        Err(e) => error!("Request from {} failed: {}", request.remote, e),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SharedLight;
    use crate::DefaultTokioObserveServer;
    use picocoap_core::protocol::OptionNumber;
    use picocoap_core::{Code, MessageType, Remote};

    fn client() -> Remote {
        Remote::new([0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2], 5683)
    }

    fn start() -> (
        ServerHandle<{ crate::DEFAULT_PAYLOAD_SIZE }>,
        mpsc::Receiver<OutboundMessage>,
        SharedLight,
        tokio::task::JoinHandle<Result<(), Box<dyn std::error::Error + Send + Sync>>>,
    ) {
        let light = SharedLight::default();
        let (server, handle, outbound) = DefaultTokioObserveServer::new(
            light.clone(),
            ServerConfig::default(),
            TokioServerConfig::default(),
        )
        .unwrap();
        let task = tokio::spawn(server.run());
        (handle, outbound, light, task)
    }

    fn get(message_id: u16) -> Request<{ crate::DEFAULT_PAYLOAD_SIZE }> {
        Request::new(MessageType::Confirmable, Code::Get, message_id, client())
            .with_token(&[0x5A])
            .unwrap()
            .with_path("lights/led3")
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_then_scheduled_notification() {
        let (handle, mut outbound, _light, _task) = start();

        handle.request(get(1).with_observe(0)).await.unwrap();
        let ack = outbound.recv().await.unwrap();
        assert_eq!(ack.msg_type, MessageType::Acknowledgement);
        assert_eq!(ack.message_id, 1);
        assert_eq!(ack.option(OptionNumber::Observe), Some(0));

        let started = Instant::now();
        let notification = outbound.recv().await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(14));
        assert!(notification.is_confirmable());
        assert_eq!(notification.token.as_ref(), &[0x5A]);
        assert_eq!(notification.option(OptionNumber::Observe), Some(1));
        assert_eq!(notification.payload_str(), "0");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_report_cancels_subscription() {
        let (handle, mut outbound, light, _task) = start();

        handle.request(get(1).with_observe(0)).await.unwrap();
        outbound.recv().await.unwrap();
        let notification = outbound.recv().await.unwrap();
        handle
            .report(notification.handle, TransmissionStatus::Timeout)
            .await
            .unwrap();

        handle.press_button().await.unwrap();
        handle.request(get(2)).await.unwrap();

        // no push for the button press, straight to the GET response
        let response = outbound.recv().await.unwrap();
        assert_eq!(response.message_id, 2);
        assert_eq!(response.payload_str(), "1");
        assert!(light.is_on());
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_pushes_to_observer() {
        let (handle, mut outbound, light, _task) = start();

        handle.request(get(1).with_observe(0)).await.unwrap();
        outbound.recv().await.unwrap();

        let put = Request::new(MessageType::NonConfirmable, Code::Put, 7, client())
            .with_path("lights/led3")
            .unwrap()
            .with_payload(b"1")
            .unwrap();
        handle.request(put).await.unwrap();

        let changed = outbound.recv().await.unwrap();
        assert_eq!(changed.code, Code::Changed);
        assert_eq!(changed.msg_type, MessageType::NonConfirmable);

        let push = outbound.recv().await.unwrap();
        assert_eq!(push.msg_type, MessageType::NonConfirmable);
        assert_eq!(push.code, Code::Content);
        assert_eq!(push.payload_str(), "1");
        assert!(light.is_on());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_when_handles_dropped() {
        let (handle, _outbound, _light, task) = start();
        drop(handle);
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_fails_when_outbound_closed() {
        let (handle, outbound, _light, task) = start();
        drop(outbound);
        handle.request(get(1)).await.unwrap();
        assert!(task.await.unwrap().is_err());
    }
}
