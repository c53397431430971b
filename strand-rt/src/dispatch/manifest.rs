// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::dispatcher::Dispatcher;
use crate::actor::ActorInstance;

/// Factory materializing a fresh activation from an actor id.
pub type ActorFactory = dyn Fn(&str) -> Box<dyn ActorInstance> + Send + Sync;

/// Per-type registration options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActorTypeOptions {
    /// Whether a turn may call back into the same activation.
    ///
    /// Non-reentrant types (the default) fail such calls fast instead of
    /// enqueueing them behind the current turn, which would deadlock.
    pub reentrant: bool,
}

/// One actor type's registered artifacts: factory, dispatcher, options.
pub struct ActorTypeRegistration {
    type_name: String,
    factory: Box<ActorFactory>,
    dispatcher: Arc<dyn Dispatcher>,
    options: ActorTypeOptions,
}

impl ActorTypeRegistration {
    /// The registered type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Materialize a fresh activation for `actor_id`.
    pub fn create(&self, actor_id: &str) -> Box<dyn ActorInstance> {
        (self.factory)(actor_id)
    }

    /// The method switch for this type.
    pub fn dispatcher(&self) -> &Arc<dyn Dispatcher> {
        &self.dispatcher
    }

    /// Whether activations of this type accept re-entrant calls.
    pub fn reentrant(&self) -> bool {
        self.options.reentrant
    }
}

/// Static registration table: type name → factory + dispatcher + options.
///
/// Registration is bulk and happens once before silo start; the runtime
/// never consults type information at dispatch time, only this table. In a
/// generated-code setup the build emits one `register` call per declared
/// actor interface; hand-written hosts make the same calls directly.
///
/// # Example
/// ```rust,ignore
/// let mut manifest = ActorManifest::new();
/// manifest.register(
///     "Counter",
///     |_actor_id| Box::new(Counter::default()),
///     CounterDispatcher,
/// );
/// let manifest = Arc::new(manifest);
/// ```
#[derive(Default)]
pub struct ActorManifest {
    types: HashMap<String, Arc<ActorTypeRegistration>>,
}

impl ActorManifest {
    /// Create an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an actor type with default options.
    ///
    /// Re-registering a name replaces the previous entry; the table is only
    /// mutated during startup wiring, before any dispatch happens.
    pub fn register<F, D>(&mut self, type_name: impl Into<String>, factory: F, dispatcher: D)
    where
        F: Fn(&str) -> Box<dyn ActorInstance> + Send + Sync + 'static,
        D: Dispatcher + 'static,
    {
        self.register_with(type_name, factory, dispatcher, ActorTypeOptions::default());
    }

    /// Register an actor type with explicit options.
    pub fn register_with<F, D>(
        &mut self,
        type_name: impl Into<String>,
        factory: F,
        dispatcher: D,
        options: ActorTypeOptions,
    ) where
        F: Fn(&str) -> Box<dyn ActorInstance> + Send + Sync + 'static,
        D: Dispatcher + 'static,
    {
        let type_name = type_name.into();
        let registration = ActorTypeRegistration {
            type_name: type_name.clone(),
            factory: Box::new(factory),
            dispatcher: Arc::new(dispatcher),
            options,
        };
        self.types.insert(type_name, Arc::new(registration));
    }

    /// Look up a registered type.
    pub fn get(&self, type_name: &str) -> Option<Arc<ActorTypeRegistration>> {
        self.types.get(type_name).map(Arc::clone)
    }

    /// Registered type names.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no types are registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
