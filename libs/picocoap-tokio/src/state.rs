use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use picocoap_core::{Actuator, MessageHandle};

/// Message id and send handle generation
///
/// Message ids start at a time-derived offset so that a restarted server does
/// not reuse the ids of its previous run straight away.
#[derive(Debug)]
pub struct MessageIdGenerator {
    message_id: AtomicU32,
    handle: AtomicU32,
}

impl MessageIdGenerator {
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos() ^ d.as_secs() as u32)
            .unwrap_or_default();
        Self::starting_at(seed as u16)
    }

    pub fn starting_at(message_id: u16) -> Self {
        Self {
            message_id: AtomicU32::new(u32::from(message_id)),
            handle: AtomicU32::new(1),
        }
    }

    pub fn next_message_id(&self) -> u16 {
        self.message_id.fetch_add(1, Ordering::Relaxed) as u16
    }

    pub fn next_handle(&self) -> MessageHandle {
        MessageHandle(self.handle.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for MessageIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Light state shared between the server task and the rest of the process
#[derive(Debug, Clone, Default)]
pub struct SharedLight(Arc<AtomicBool>);

impl SharedLight {
    pub fn new(on: bool) -> Self {
        Self(Arc::new(AtomicBool::new(on)))
    }
}

impl Actuator for SharedLight {
    fn is_on(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn set(&mut self, on: bool) {
        self.0.store(on, Ordering::Relaxed);
    }

    fn toggle(&mut self) {
        self.0.fetch_xor(true, Ordering::Relaxed);
    }
}
