//! The bean container facade and its default in-process implementation.
//!
//! The wiring pipeline consumes a minimal dependency-resolution contract:
//! beans by id, beans by type, definition registration and message-bundle
//! lookup. [`DefaultBeanContainer`] implements it with a singleton cache
//! keyed by *definition identity* - two definitions registered under the
//! same id are distinct cache entries, so re-registration cleanly replaces
//! the resolvable bean while an already-instantiated older singleton stays
//! attached to its own definition.
//!
//! Resolution order when a dependency is requested: by id, then by type,
//! then - for types with an unambiguous `Default` - auto-registration of a
//! default-constructed singleton. The fallback refuses string and primitive
//! types: defaulting those silently would mask wiring mistakes.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::error::ConfigError;
use crate::message::{MessageBundle, MessageBundleRegistry};

new_key_type! {
    /// Identity of one registered bean definition.
    pub struct DefinitionId;
}

type BeanFactory = Arc<dyn Fn() -> Arc<dyn Any + Send + Sync> + Send + Sync>;

/// A registered bean definition.
pub struct BeanDefinition {
    id: String,
    type_id: TypeId,
    type_name: &'static str,
    singleton: bool,
    lazy: bool,
    factory: BeanFactory,
}

impl BeanDefinition {
    /// Create a definition for type `T`.
    pub fn new<T, F>(id: impl Into<String>, singleton: bool, lazy: bool, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            singleton,
            lazy,
            factory: Arc::new(move || Arc::new(factory()) as Arc<dyn Any + Send + Sync>),
        }
    }

    /// The bean id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The declared type's name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether the definition produces a shared singleton.
    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    /// Whether singleton instantiation is deferred to first use.
    pub fn is_lazy(&self) -> bool {
        self.lazy
    }
}

/// The dependency-resolution contract consumed by the pipeline.
pub trait BeanContainer: Send + Sync {
    /// Register a definition, returning its identity.
    fn add_definition(&self, definition: BeanDefinition) -> DefinitionId;

    /// Resolve a bean by id.
    fn get_by_id(&self, id: &str) -> Option<Arc<dyn Any + Send + Sync>>;

    /// Resolve a bean by its concrete type.
    fn get_by_type(&self, type_id: TypeId) -> Option<Arc<dyn Any + Send + Sync>>;

    /// Resolve a message bundle for a base name and locale.
    fn resolve_message_bundle(&self, base: &str, locale: &str) -> Option<Arc<MessageBundle>>;
}

/// The default in-process container.
#[derive(Default)]
pub struct DefaultBeanContainer {
    definitions: Mutex<SlotMap<DefinitionId, Arc<BeanDefinition>>>,
    by_id: Mutex<HashMap<String, DefinitionId>>,
    singletons: Mutex<HashMap<DefinitionId, Arc<dyn Any + Send + Sync>>>,
    messages: MessageBundleRegistry,
}

impl DefaultBeanContainer {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a singleton definition for `T`.
    pub fn register_singleton<T, F>(&self, id: impl Into<String>, lazy: bool, factory: F) -> DefinitionId
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.add_definition(BeanDefinition::new(id, true, lazy, factory))
    }

    /// Register a per-request (prototype) definition for `T`.
    pub fn register_prototype<T, F>(&self, id: impl Into<String>, factory: F) -> DefinitionId
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.add_definition(BeanDefinition::new(id, false, true, factory))
    }

    /// Register a message bundle.
    pub fn register_message_bundle(&self, bundle: MessageBundle) {
        self.messages.register(bundle);
    }

    /// Typed resolution by id.
    pub fn bean_by_id<T: Send + Sync + 'static>(&self, id: &str) -> Option<Arc<T>> {
        self.get_by_id(id).and_then(|b| b.downcast::<T>().ok())
    }

    /// Typed resolution by type.
    pub fn bean<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.get_by_type(TypeId::of::<T>())
            .and_then(|b| b.downcast::<T>().ok())
    }

    /// Full dependency resolution: by id, then by type, then the
    /// default-construction fallback.
    ///
    /// The fallback auto-registers a lazy singleton built from
    /// `T::default()` and retries. It never applies to string or primitive
    /// types.
    pub fn resolve<T>(&self, id: &str) -> Result<Arc<T>, ConfigError>
    where
        T: Default + Send + Sync + 'static,
    {
        if let Some(bean) = self.bean_by_id::<T>(id) {
            return Ok(bean);
        }
        if let Some(bean) = self.bean::<T>() {
            return Ok(bean);
        }
        if is_primitive_like(TypeId::of::<T>()) {
            return Err(ConfigError::UnresolvableBean {
                type_name: std::any::type_name::<T>(),
            });
        }
        tracing::debug!(
            target: "trellis::container",
            id,
            type_name = std::any::type_name::<T>(),
            "auto-registering default-constructed singleton"
        );
        self.register_singleton::<T, _>(id, true, T::default);
        self.bean_by_id::<T>(id).ok_or(ConfigError::UnresolvableBean {
            type_name: std::any::type_name::<T>(),
        })
    }

    /// The number of registered definitions.
    pub fn definition_count(&self) -> usize {
        self.definitions.lock().len()
    }

    fn instance_for(&self, definition_id: DefinitionId) -> Option<Arc<dyn Any + Send + Sync>> {
        let definition = self.definitions.lock().get(definition_id).cloned()?;
        if !definition.singleton {
            return Some((definition.factory)());
        }
        // Singleton cache keyed by definition identity, not by id string.
        let mut singletons = self.singletons.lock();
        if let Some(existing) = singletons.get(&definition_id) {
            return Some(Arc::clone(existing));
        }
        let instance = (definition.factory)();
        singletons.insert(definition_id, Arc::clone(&instance));
        Some(instance)
    }
}

impl BeanContainer for DefaultBeanContainer {
    fn add_definition(&self, definition: BeanDefinition) -> DefinitionId {
        let id = definition.id.clone();
        let eager = definition.singleton && !definition.lazy;
        let definition_id = self.definitions.lock().insert(Arc::new(definition));
        self.by_id.lock().insert(id.clone(), definition_id);
        tracing::debug!(target: "trellis::container", id = %id, eager, "registered bean definition");
        if eager {
            let _ = self.instance_for(definition_id);
        }
        definition_id
    }

    fn get_by_id(&self, id: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        let definition_id = *self.by_id.lock().get(id)?;
        self.instance_for(definition_id)
    }

    fn get_by_type(&self, type_id: TypeId) -> Option<Arc<dyn Any + Send + Sync>> {
        let definition_id = {
            let definitions = self.definitions.lock();
            definitions
                .iter()
                .find(|(_, d)| d.type_id == type_id)
                .map(|(k, _)| k)?
        };
        self.instance_for(definition_id)
    }

    fn resolve_message_bundle(&self, base: &str, locale: &str) -> Option<Arc<MessageBundle>> {
        self.messages.resolve(base, locale)
    }
}

fn is_primitive_like(type_id: TypeId) -> bool {
    type_id == TypeId::of::<String>()
        || type_id == TypeId::of::<&'static str>()
        || type_id == TypeId::of::<bool>()
        || type_id == TypeId::of::<char>()
        || type_id == TypeId::of::<i8>()
        || type_id == TypeId::of::<i16>()
        || type_id == TypeId::of::<i32>()
        || type_id == TypeId::of::<i64>()
        || type_id == TypeId::of::<i128>()
        || type_id == TypeId::of::<isize>()
        || type_id == TypeId::of::<u8>()
        || type_id == TypeId::of::<u16>()
        || type_id == TypeId::of::<u32>()
        || type_id == TypeId::of::<u64>()
        || type_id == TypeId::of::<u128>()
        || type_id == TypeId::of::<usize>()
        || type_id == TypeId::of::<f32>()
        || type_id == TypeId::of::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Service {
        marker: usize,
    }

    #[test]
    fn test_singleton_memoization() {
        static BUILT: AtomicUsize = AtomicUsize::new(0);
        let container = DefaultBeanContainer::new();
        container.register_singleton::<Service, _>("service", true, || {
            BUILT.fetch_add(1, Ordering::SeqCst);
            Service { marker: 1 }
        });

        let a = container.bean_by_id::<Service>("service").unwrap();
        let b = container.bean_by_id::<Service>("service").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(BUILT.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_prototype_creates_fresh_instances() {
        let container = DefaultBeanContainer::new();
        container.register_prototype::<Service, _>("service", || Service { marker: 2 });

        let a = container.bean_by_id::<Service>("service").unwrap();
        let b = container.bean_by_id::<Service>("service").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_eager_singleton_instantiated_at_registration() {
        static BUILT: AtomicUsize = AtomicUsize::new(0);
        let container = DefaultBeanContainer::new();
        container.register_singleton::<Service, _>("eager", false, || {
            BUILT.fetch_add(1, Ordering::SeqCst);
            Service::default()
        });
        assert_eq!(BUILT.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reregistration_is_a_distinct_cache_entry() {
        let container = DefaultBeanContainer::new();
        container.register_singleton::<Service, _>("service", true, || Service { marker: 1 });
        let first = container.bean_by_id::<Service>("service").unwrap();

        container.register_singleton::<Service, _>("service", true, || Service { marker: 2 });
        let second = container.bean_by_id::<Service>("service").unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.marker, 1);
        assert_eq!(second.marker, 2);
    }

    #[test]
    fn test_resolution_order_id_then_type() {
        let container = DefaultBeanContainer::new();
        container.register_singleton::<Service, _>("other-id", true, || Service { marker: 9 });

        // No bean under the requested id, but one of the right type exists.
        let bean = container.resolve::<Service>("wanted").unwrap();
        assert_eq!(bean.marker, 9);
    }

    #[test]
    fn test_default_construct_fallback() {
        let container = DefaultBeanContainer::new();
        let bean = container.resolve::<Service>("service").unwrap();
        assert_eq!(bean.marker, 0);
        // Registered as a singleton: subsequent resolution hits the cache.
        let again = container.resolve::<Service>("service").unwrap();
        assert!(Arc::ptr_eq(&bean, &again));
    }

    #[test]
    fn test_fallback_refuses_primitive_and_string_types() {
        let container = DefaultBeanContainer::new();
        assert!(matches!(
            container.resolve::<String>("text"),
            Err(ConfigError::UnresolvableBean { .. })
        ));
        assert!(matches!(
            container.resolve::<i64>("number"),
            Err(ConfigError::UnresolvableBean { .. })
        ));
    }
}
