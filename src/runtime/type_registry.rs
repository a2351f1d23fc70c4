//! Registry for creating typed channels dynamically
//!
//! The Pipeline only knows port types as `TypeId`s, but crossbeam channels
//! are generic. The registry stores, per registered type, a closure that
//! creates a `ChannelMessage<T>` channel pair and one that wraps a bundle of
//! sender halves into a type-erased [`OutputPort`]. Crate-native payload
//! types are pre-registered; applications carrying their own types call
//! [`register_type`] before building a pipeline.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Mutex;

use crossbeam_channel::{Sender as CrossbeamSender, bounded};
use lazy_static::lazy_static;

use super::ports::OutputPort;
use super::sender::{ChannelMessage, Sender};

type ChannelCreator =
    Box<dyn Fn(usize) -> (Box<dyn Any + Send>, Box<dyn Any + Send>) + Send + Sync>;
type OutputWrapper = Box<dyn Fn(Vec<Box<dyn Any + Send>>) -> Option<OutputPort> + Send + Sync>;

/// Maps `TypeId`s to channel-creation and port-wrapping closures.
pub struct TypeRegistry {
    channel_creators: HashMap<TypeId, ChannelCreator>,
    output_wrappers: HashMap<TypeId, OutputWrapper>,
}

impl TypeRegistry {
    fn new() -> Self {
        Self {
            channel_creators: HashMap::new(),
            output_wrappers: HashMap::new(),
        }
    }

    /// Register a payload type so pipelines can create channels carrying it.
    pub fn register<T: 'static + Send + Clone>(&mut self) {
        let type_id = TypeId::of::<T>();

        self.channel_creators.entry(type_id).or_insert_with(|| {
            Box::new(|buffer_size| {
                let (tx, rx) = bounded::<ChannelMessage<T>>(buffer_size);
                (
                    Box::new(tx) as Box<dyn Any + Send>,
                    Box::new(rx) as Box<dyn Any + Send>,
                )
            })
        });

        self.output_wrappers.entry(type_id).or_insert_with(|| {
            Box::new(|senders| {
                let mut destinations = Vec::with_capacity(senders.len());
                for boxed in senders {
                    let tx = boxed
                        .downcast::<CrossbeamSender<ChannelMessage<T>>>()
                        .ok()?;
                    destinations.push(*tx);
                }
                Some(OutputPort::new(Sender::new(destinations)))
            })
        });
    }

    /// Create a channel pair for `type_id` with the given buffer size.
    ///
    /// Returns boxed `(CrossbeamSender<ChannelMessage<T>>,
    /// CrossbeamReceiver<ChannelMessage<T>>)` halves, or None for an
    /// unregistered type.
    pub fn create_channel(
        &self,
        type_id: TypeId,
        buffer_size: usize,
    ) -> Option<(Box<dyn Any + Send>, Box<dyn Any + Send>)> {
        self.channel_creators
            .get(&type_id)
            .map(|create| create(buffer_size))
    }

    /// Bundle boxed sender halves of `type_id` into a broadcast [`OutputPort`].
    pub fn wrap_output(
        &self,
        type_id: TypeId,
        senders: Vec<Box<dyn Any + Send>>,
    ) -> Option<OutputPort> {
        self.output_wrappers.get(&type_id).and_then(|wrap| wrap(senders))
    }
}

lazy_static! {
    /// Global registry, pre-seeded with the crate's own payload types.
    pub static ref TYPE_REGISTRY: Mutex<TypeRegistry> = {
        let mut registry = TypeRegistry::new();
        registry.register::<super::sample::SampleVector>();
        registry.register::<crate::nodes::decoders::Annotation>();
        Mutex::new(registry)
    };
}

/// Register a payload type with the global registry.
pub fn register_type<T: 'static + Send + Clone>() {
    TYPE_REGISTRY.lock().unwrap().register::<T>();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::Receiver as CrossbeamReceiver;

    #[test]
    fn test_create_channel_for_registered_type() {
        let registry = TYPE_REGISTRY.lock().unwrap();
        let (tx, rx) = registry
            .create_channel(TypeId::of::<super::super::sample::SampleVector>(), 8)
            .unwrap();

        assert!(
            tx.downcast::<CrossbeamSender<ChannelMessage<super::super::sample::SampleVector>>>()
                .is_ok()
        );
        assert!(
            rx.downcast::<CrossbeamReceiver<ChannelMessage<super::super::sample::SampleVector>>>()
                .is_ok()
        );
    }

    #[test]
    fn test_unregistered_type_returns_none() {
        struct Unregistered;
        let registry = TYPE_REGISTRY.lock().unwrap();
        assert!(registry.create_channel(TypeId::of::<Unregistered>(), 8).is_none());
    }

    #[test]
    fn test_register_custom_type() {
        register_type::<u128>();
        let registry = TYPE_REGISTRY.lock().unwrap();
        let (tx, _rx) = registry.create_channel(TypeId::of::<u128>(), 4).unwrap();
        let port = registry
            .wrap_output(TypeId::of::<u128>(), vec![tx])
            .unwrap();
        assert!(port.get::<u128>().is_some());
    }
}
