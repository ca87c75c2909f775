//! Observe server demo
//!
//! Runs the observe server on tokio with a loopback client instead of a
//! network. The client subscribes to `/lights/led3` in JSON, a second client
//! toggles the light now and then, and every confirmable notification is
//! acknowledged. Stop with Ctrl-C.

use std::time::Duration;

use log::{info, warn};
use picocoap_tokio::protocol::OptionNumber;
use picocoap_tokio::{
    Actuator, Code, DefaultTokioObserveServer, MessageType, OutboundMessage, Remote, Request,
    ServerConfig, ServerHandle, SharedLight, TokioServerConfig, TransmissionStatus,
    DEFAULT_PAYLOAD_SIZE,
};

const OBSERVER: Remote = Remote::new([0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2], 5683);
const SWITCH: Remote = Remote::new([0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 3], 5683);

type Handle = ServerHandle<DEFAULT_PAYLOAD_SIZE>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let light = SharedLight::default();
    let (server, handle, outbound) = DefaultTokioObserveServer::new(
        light.clone(),
        ServerConfig::default(),
        TokioServerConfig::default(),
    )?;
    let server_task = tokio::spawn(server.run());

    tokio::spawn(loopback(handle.clone(), outbound));
    tokio::spawn(switch(handle.clone()));

    let discover = Request::new(MessageType::Confirmable, Code::Get, 1, OBSERVER)
        .with_path(".well-known/core")?;
    handle.request(discover).await?;

    let subscribe = Request::new(MessageType::Confirmable, Code::Get, 2, OBSERVER)
        .with_token(&[0x0B, 0x5E])?
        .with_path("lights/led3")?
        .with_observe(0)
        .with_accept(50)?;
    handle.request(subscribe).await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down, light is {}", if light.is_on() { "on" } else { "off" });
    drop(handle);
    server_task.abort();
    Ok(())
}

/// Plays the network: prints everything the server sends and acknowledges
/// confirmable notifications
async fn loopback(handle: Handle, mut outbound: tokio::sync::mpsc::Receiver<OutboundMessage>) {
    while let Some(message) = outbound.recv().await {
        info!(
            "-> {} {:?} {} mid={} observe={:?} {}",
            message.remote,
            message.msg_type,
            message.code,
            message.message_id,
            message.option(OptionNumber::Observe),
            message.payload_str()
        );
        if message.is_confirmable() {
            if let Err(e) = handle.report(message.handle, TransmissionStatus::Ok).await {
                warn!("Could not acknowledge {}: {}", message.handle, e);
                return;
            }
        }
    }
}

/// Second client toggling the light, alternating between PUT and the button
async fn switch(handle: Handle) {
    let mut ticker = tokio::time::interval(Duration::from_secs(10));
    ticker.tick().await;
    let mut message_id = 100u16;
    loop {
        ticker.tick().await;
        message_id = message_id.wrapping_add(1);
        let result = if message_id % 2 == 0 {
            handle.press_button().await
        } else {
            match Request::new(MessageType::NonConfirmable, Code::Put, message_id, SWITCH)
                .with_path("lights/led3")
                .and_then(|r| r.with_payload(b"2"))
            {
                Ok(put) => handle.request(put).await,
                Err(e) => {
                    warn!("Could not build PUT: {}", e);
                    continue;
                }
            }
        };
        if result.is_err() {
            return;
        }
    }
}
