//! Notification scheduling
//!
//! Tracks the freshness sweep, the reliability cadence of scheduled pushes
//! and the confirmable notifications whose delivery outcome is still open.

use crate::error::ServerError;
use crate::observers::{ObserverHandle, ObserverRegistry};
use crate::protocol::MessageType;
use crate::resource::{ResourceId, ResourceTree};
use crate::traits::MessageHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    message: MessageHandle,
    observer: ObserverHandle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheduler<const MAX_PENDING: usize> {
    pushes: u32,
    reliable_every: u32,
    notify_margin: u32,
    pending: heapless::Vec<Pending, MAX_PENDING>,
}

impl<const MAX_PENDING: usize> Scheduler<MAX_PENDING> {
    pub fn new(reliable_every: u32, notify_margin: u32) -> Self {
        Self {
            pushes: 0,
            reliable_every,
            notify_margin,
            pending: heapless::Vec::new(),
        }
    }

    /// Advance every observable resource by one tick
    ///
    /// Returns the resources whose countdown reached the notify margin; those
    /// are re-armed to their max-age.
    pub fn due<const MAX_RESOURCES: usize>(
        &self,
        tree: &mut ResourceTree<MAX_RESOURCES>,
    ) -> heapless::Vec<ResourceId, MAX_RESOURCES> {
        let observable: heapless::Vec<ResourceId, MAX_RESOURCES> = tree.observable().collect();
        let mut due = heapless::Vec::new();
        for id in observable {
            let expired = tree
                .get_mut(id)
                .is_some_and(|r| r.tick_freshness(self.notify_margin));
            if expired {
                // capacities match, cannot overflow
                let _ = due.push(id);
            }
        }
        due
    }

    /// Message type of the next scheduled push
    ///
    /// Push `n` (counting from zero) is confirmable when
    /// `n % reliable_every == 0`.
    pub fn next_push_type(&mut self) -> MessageType {
        let index = self.pushes;
        self.pushes = self.pushes.wrapping_add(1);
        if index % self.reliable_every.max(1) == 0 {
            MessageType::Confirmable
        } else {
            MessageType::NonConfirmable
        }
    }

    /// Scheduled pushes so far
    pub fn pushes(&self) -> u32 {
        self.pushes
    }

    /// Remember a confirmable notification sent to `observer`
    ///
    /// Entries are keyed by message; one observer may have several
    /// notifications in flight.
    pub fn track(
        &mut self,
        message: MessageHandle,
        observer: ObserverHandle,
    ) -> Result<(), ServerError> {
        self.pending
            .push(Pending { message, observer })
            .map_err(|_| ServerError::MaxPendingReached {
                max_pending: MAX_PENDING,
            })
    }

    /// Consume the pending entry of `message`, returning its observer
    pub fn complete(&mut self, message: MessageHandle) -> Option<ObserverHandle> {
        let index = self.pending.iter().position(|p| p.message == message)?;
        Some(self.pending.swap_remove(index).observer)
    }

    /// Drop pending entries of an observer that no longer exists
    pub fn forget(&mut self, observer: ObserverHandle) {
        self.pending.retain(|p| p.observer != observer);
    }

    /// Drop pending entries whose observer is no longer registered
    pub fn retain_registered<const MAX_OBSERVERS: usize>(
        &mut self,
        observers: &ObserverRegistry<MAX_OBSERVERS>,
    ) {
        self.pending.retain(|p| observers.get(p.observer).is_some());
    }

    pub fn is_pending_full(&self) -> bool {
        self.pending.is_full()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observers::Observer;
    use crate::protocol::{ContentFormat, ContentFormatSet, Remote, Token};
    use crate::resource::{Permissions, Resource, ResourceKind};

    fn tree(max_age: u32) -> (ResourceTree<4>, ResourceId) {
        let mut tree = ResourceTree::<4>::new().unwrap();
        tree.add_child(
            ResourceId::ROOT,
            Resource::new("plain", ResourceKind::Container).unwrap(),
        )
        .unwrap();
        let led = tree
            .add_child(
                ResourceId::ROOT,
                Resource::new("led", ResourceKind::Light)
                    .unwrap()
                    .with_permissions(Permissions::GET | Permissions::OBSERVE)
                    .with_formats(ContentFormatSet::of(ContentFormat::PlainText))
                    .with_max_age(max_age),
            )
            .unwrap();
        (tree, led)
    }

    fn handles(count: u8) -> heapless::Vec<ObserverHandle, 4> {
        let mut registry = ObserverRegistry::<4>::new();
        (0..count)
            .map(|i| {
                registry
                    .register(Observer {
                        remote: Remote::new([i; 16], 5683),
                        token: Token::empty(),
                        resource: ResourceId::ROOT,
                        content_format: ContentFormat::PlainText,
                    })
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_reliable_cadence() {
        let mut scheduler = Scheduler::<4>::new(4, 2);
        let types: heapless::Vec<MessageType, 9> =
            (0..9).map(|_| scheduler.next_push_type()).collect();
        for (n, msg_type) in types.iter().enumerate() {
            assert_eq!(msg_type.is_confirmable(), n % 4 == 0, "push {}", n);
        }
        assert_eq!(scheduler.pushes(), 9);
    }

    #[test]
    fn test_due_after_countdown() {
        let (mut tree, led) = tree(5);
        let scheduler = Scheduler::<4>::new(4, 2);

        // 5 -> 4 -> 3 -> 2, then due
        for _ in 0..3 {
            assert!(scheduler.due(&mut tree).is_empty());
        }
        assert_eq!(tree.get(led).unwrap().expire_time(), 2);
        assert_eq!(scheduler.due(&mut tree).as_slice(), &[led]);
        assert_eq!(tree.get(led).unwrap().expire_time(), 5);
    }

    #[test]
    fn test_due_period() {
        let (mut tree, led) = tree(15);
        let scheduler = Scheduler::<4>::new(4, 2);
        let mut fired = 0;
        for _ in 0..(3 * 14) {
            fired += scheduler.due(&mut tree).len();
            let expire = tree.get(led).unwrap().expire_time();
            assert!(expire <= 15);
        }
        assert_eq!(fired, 3);
    }

    #[test]
    fn test_pending_lifecycle() {
        let observers = handles(2);
        let mut scheduler = Scheduler::<2>::new(4, 2);

        scheduler.track(MessageHandle(1), observers[0]).unwrap();
        scheduler.track(MessageHandle(2), observers[1]).unwrap();
        assert_eq!(scheduler.pending_len(), 2);

        assert_eq!(scheduler.complete(MessageHandle(2)), Some(observers[1]));
        assert_eq!(scheduler.complete(MessageHandle(2)), None);
        assert_eq!(scheduler.complete(MessageHandle(99)), None);
        assert_eq!(scheduler.pending_len(), 1);
    }

    #[test]
    fn test_several_in_flight_per_observer() {
        let observers = handles(1);
        let mut scheduler = Scheduler::<4>::new(4, 2);

        scheduler.track(MessageHandle(1), observers[0]).unwrap();
        scheduler.track(MessageHandle(5), observers[0]).unwrap();
        assert_eq!(scheduler.pending_len(), 2);
        assert_eq!(scheduler.complete(MessageHandle(1)), Some(observers[0]));
        assert_eq!(scheduler.complete(MessageHandle(5)), Some(observers[0]));
        assert_eq!(scheduler.pending_len(), 0);
    }

    #[test]
    fn test_track_full_and_forget() {
        let observers = handles(2);
        let mut scheduler = Scheduler::<1>::new(4, 2);

        scheduler.track(MessageHandle(1), observers[0]).unwrap();
        assert_eq!(
            scheduler.track(MessageHandle(2), observers[1]),
            Err(ServerError::MaxPendingReached { max_pending: 1 })
        );
        assert!(scheduler.is_pending_full());
        scheduler.forget(observers[0]);
        assert_eq!(scheduler.pending_len(), 0);
        assert!(scheduler.track(MessageHandle(2), observers[1]).is_ok());
    }

    #[test]
    fn test_retain_registered() {
        let mut registry = ObserverRegistry::<4>::new();
        let remote = |i| Remote::new([i; 16], 5683);
        let observer = |i| Observer {
            remote: remote(i),
            token: Token::empty(),
            resource: ResourceId::ROOT,
            content_format: ContentFormat::PlainText,
        };
        let first = registry.register(observer(1)).unwrap();
        let second = registry.register(observer(2)).unwrap();
        let mut scheduler = Scheduler::<4>::new(4, 2);
        scheduler.track(MessageHandle(1), first).unwrap();
        scheduler.track(MessageHandle(2), second).unwrap();
        scheduler.track(MessageHandle(3), first).unwrap();

        registry.unregister_remote(&remote(1));
        scheduler.retain_registered(&registry);
        assert_eq!(scheduler.pending_len(), 1);
        assert_eq!(scheduler.complete(MessageHandle(2)), Some(second));
    }
}
