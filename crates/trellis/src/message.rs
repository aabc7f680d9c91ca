//! Locale-aware message bundles.
//!
//! Validation declarations may carry a message *key* instead of literal
//! text; the key is resolved against the controller's bundle at wiring
//! time. Resolution falls back along the locale chain: `de-DE` → `de` →
//! the bundle registered without a locale.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// One bundle of keyed messages for a base name and locale.
#[derive(Debug, Default)]
pub struct MessageBundle {
    base: String,
    locale: String,
    messages: HashMap<String, String>,
}

impl MessageBundle {
    /// Create an empty bundle. An empty `locale` marks the default bundle.
    pub fn new(base: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            locale: locale.into(),
            messages: HashMap::new(),
        }
    }

    /// Add a message, builder-style.
    pub fn with_message(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.messages.insert(key.into(), text.into());
        self
    }

    /// Look up a message by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.messages.get(key).map(String::as_str)
    }

    /// The bundle's base name.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The bundle's locale tag (empty for the default bundle).
    pub fn locale(&self) -> &str {
        &self.locale
    }
}

/// A registry of message bundles keyed by base name and locale.
#[derive(Default)]
pub struct MessageBundleRegistry {
    bundles: Mutex<HashMap<(String, String), Arc<MessageBundle>>>,
}

impl MessageBundleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bundle, replacing any bundle with the same base and
    /// locale.
    pub fn register(&self, bundle: MessageBundle) {
        let key = (bundle.base().to_string(), bundle.locale().to_string());
        self.bundles.lock().insert(key, Arc::new(bundle));
    }

    /// Resolve a bundle for `base` and `locale`, walking the fallback
    /// chain: exact locale, language-only, default.
    pub fn resolve(&self, base: &str, locale: &str) -> Option<Arc<MessageBundle>> {
        let bundles = self.bundles.lock();
        for candidate in fallback_chain(locale) {
            if let Some(bundle) = bundles.get(&(base.to_string(), candidate.clone())) {
                return Some(Arc::clone(bundle));
            }
        }
        None
    }
}

fn fallback_chain(locale: &str) -> Vec<String> {
    let mut chain = Vec::with_capacity(3);
    if !locale.is_empty() {
        chain.push(locale.to_string());
        if let Some(language) = locale.split(['-', '_']).next()
            && language != locale
        {
            chain.push(language.to_string());
        }
    }
    chain.push(String::new());
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> MessageBundleRegistry {
        let registry = MessageBundleRegistry::new();
        registry.register(
            MessageBundle::new("validation", "").with_message("required", "Value is required"),
        );
        registry.register(
            MessageBundle::new("validation", "de").with_message("required", "Pflichtfeld"),
        );
        registry.register(
            MessageBundle::new("validation", "de-AT").with_message("required", "Pflichtfeld (AT)"),
        );
        registry
    }

    #[test]
    fn test_exact_locale_wins() {
        let bundle = registry().resolve("validation", "de-AT").unwrap();
        assert_eq!(bundle.get("required"), Some("Pflichtfeld (AT)"));
    }

    #[test]
    fn test_language_fallback() {
        let bundle = registry().resolve("validation", "de-DE").unwrap();
        assert_eq!(bundle.get("required"), Some("Pflichtfeld"));
    }

    #[test]
    fn test_default_fallback() {
        let bundle = registry().resolve("validation", "fr-FR").unwrap();
        assert_eq!(bundle.get("required"), Some("Value is required"));
    }

    #[test]
    fn test_unknown_base() {
        assert!(registry().resolve("other", "de").is_none());
    }
}
