/*!
 * Bridge
 * Shared connect-time and emission-time context, and object interning
 */

use super::atomic_stats::{BridgeStats, StatsSnapshot};
use super::object::{Object, ObjectBox};
use super::report::{CallbackFailure, FailureReporter, LogReporter};
use crate::closure::{ClosureRegistry, SignalTable};
use crate::core::config::BridgeConfig;
use crate::core::types::ObjectId;
use crate::core::{ShardManager, WorkloadProfile};
use crate::marshal::{ArgConverter, StandardConverter};
use crate::native::{NativeRuntime, ObjectRef};
use ahash::RandomState;
use dashmap::DashMap;
use log::{debug, info};
use std::sync::{Arc, Weak};

pub(crate) struct BridgeInner {
    runtime: Arc<dyn NativeRuntime>,
    converter: Arc<dyn ArgConverter>,
    reporter: Arc<dyn FailureReporter>,
    config: BridgeConfig,
    stats: Arc<BridgeStats>,
    objects: DashMap<ObjectId, Weak<ObjectBox>, RandomState>,
}

/// Entry point of the closure bridge
///
/// Owns the native runtime handle and the policies every wrapped object
/// shares. Cheap to clone.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

impl Bridge {
    /// Bridge with the standard converter, log reporter and default config
    pub fn new(runtime: Arc<dyn NativeRuntime>) -> Self {
        BridgeBuilder::new(runtime).build()
    }

    pub fn builder(runtime: Arc<dyn NativeRuntime>) -> BridgeBuilder {
        BridgeBuilder::new(runtime)
    }

    /// Wrap a native object
    ///
    /// Wrapping the same object again while a wrapper is alive returns that
    /// wrapper, so every handle to one object shares its registry.
    pub fn wrap(&self, object: ObjectRef) -> Object {
        let id = object.id();
        if let Some(existing) = self.inner.objects.get(&id).and_then(|w| w.upgrade()) {
            return Object::from_box(existing);
        }

        let boxed = Arc::new(ObjectBox::new(
            object,
            self.clone(),
            ClosureRegistry::new(),
            SignalTable::new(),
        ));

        let mut entry = self.inner.objects.entry(id).or_insert_with(Weak::new);
        if let Some(raced) = entry.upgrade() {
            return Object::from_box(raced);
        }
        *entry = Arc::downgrade(&boxed);
        drop(entry);

        debug!("Wrapped {}", boxed.object());
        Object::from_box(boxed)
    }

    pub fn runtime(&self) -> &Arc<dyn NativeRuntime> {
        &self.inner.runtime
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    pub fn converter(&self) -> &dyn ArgConverter {
        self.inner.converter.as_ref()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Number of live object wrappers
    pub fn object_count(&self) -> usize {
        self.inner
            .objects
            .iter()
            .filter(|entry| entry.value().strong_count() > 0)
            .count()
    }

    pub(crate) fn stats_handle(&self) -> &Arc<BridgeStats> {
        &self.inner.stats
    }

    pub(crate) fn report(&self, failure: CallbackFailure) {
        self.inner.reporter.report(failure);
    }

    /// Drop the intern entry of a wrapper that is being torn down
    pub(crate) fn forget(&self, id: ObjectId) {
        self.inner
            .objects
            .remove_if(&id, |_, weak| weak.strong_count() == 0);
    }
}

/// Builder for [`Bridge`]
pub struct BridgeBuilder {
    runtime: Arc<dyn NativeRuntime>,
    converter: Option<Arc<dyn ArgConverter>>,
    reporter: Option<Arc<dyn FailureReporter>>,
    config: Option<BridgeConfig>,
}

impl BridgeBuilder {
    pub fn new(runtime: Arc<dyn NativeRuntime>) -> Self {
        Self {
            runtime,
            converter: None,
            reporter: None,
            config: None,
        }
    }

    /// Replace the argument conversion table
    pub fn with_converter(mut self, converter: Arc<dyn ArgConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Send callback failures somewhere other than the log
    pub fn with_reporter(mut self, reporter: Arc<dyn FailureReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn with_config(mut self, config: BridgeConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Bridge {
        let config = self.config.unwrap_or_default();
        info!(
            "Closure bridge initialized (receiver check: {}, arity: {:?})",
            config.check_receiver, config.arity
        );

        Bridge {
            inner: Arc::new(BridgeInner {
                runtime: self.runtime,
                converter: self
                    .converter
                    .unwrap_or_else(|| Arc::new(StandardConverter)),
                reporter: self.reporter.unwrap_or_else(|| Arc::new(LogReporter)),
                config,
                stats: Arc::new(BridgeStats::new()),
                objects: DashMap::with_hasher_and_shard_amount(
                    RandomState::new(),
                    ShardManager::shards(WorkloadProfile::Runtime),
                ),
            }),
        }
    }
}
