//! Application state shared across order operations.

use std::sync::Arc;

use storekeep_core::{AddressFormatter, CountryDirectory, StaticCountryDirectory};

use crate::access::AccessPolicy;
use crate::checkout::CheckoutPipeline;
use crate::config::OrdersConfig;
use crate::db::OrderStore;
use crate::error::OrderError;
use crate::payment::{Check, CheckConfig, PaymentMethodRegistry};
use crate::registry::{RegistryConfig, StatusRegistry};
use crate::services::OrderService;

/// Application state shared across all callers.
///
/// This struct is cheaply cloneable via `Arc` and wires the registry,
/// payment methods, access policy, checkout pipeline and store together
/// from one configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: OrdersConfig,
    registry: Arc<StatusRegistry>,
    payments: Arc<PaymentMethodRegistry>,
    policy: Arc<AccessPolicy>,
    countries: Arc<StaticCountryDirectory>,
    checkout: CheckoutPipeline,
    orders: OrderService,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("checkout", &self.inner.checkout)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Orders configuration
    /// * `store` - Order persistence
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Configuration` if the custom statuses file cannot
    /// be loaded or clashes with the built-in registry.
    pub fn new(config: OrdersConfig, store: Arc<dyn OrderStore>) -> Result<Self, OrderError> {
        let registry = Arc::new(load_registry(&config)?);
        Self::with_registry(config, registry, store)
    }

    /// Create a new application state around an already built registry.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Configuration` if the checkout completion state
    /// has no statuses.
    pub fn with_registry(
        config: OrdersConfig,
        registry: Arc<StatusRegistry>,
        store: Arc<dyn OrderStore>,
    ) -> Result<Self, OrderError> {
        registry.default_status(&config.checkout_complete_state)?;

        let countries = Arc::new(StaticCountryDirectory::with_defaults());
        let formatter = AddressFormatter::new(countries.as_ref(), config.store_country)
            .capitalize(config.capitalize_addresses);
        let check = Check::new(CheckConfig::default(), &formatter);
        let payments = Arc::new(PaymentMethodRegistry::with_builtin(check));
        let policy = Arc::new(AccessPolicy::with_builtin_checks());

        let checkout = CheckoutPipeline::new(
            Arc::clone(&registry),
            Arc::clone(&payments),
            Arc::clone(&countries) as Arc<dyn CountryDirectory + Send + Sync>,
            config.store_country,
        )
        .with_builtin_panes()
        .completion_state(config.checkout_complete_state.clone())
        .capitalize_addresses(config.capitalize_addresses);

        let orders = OrderService::new(
            Arc::clone(&registry),
            Arc::clone(&payments),
            Arc::clone(&policy),
            store,
            config.store_currency,
        );

        tracing::info!(
            statuses = registry.statuses().len(),
            payment_methods = payments.enabled().count(),
            "Order services ready"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                registry,
                payments,
                policy,
                countries,
                checkout,
                orders,
            }),
        })
    }

    /// Get a reference to the orders configuration.
    #[must_use]
    pub fn config(&self) -> &OrdersConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<StatusRegistry> {
        &self.inner.registry
    }

    #[must_use]
    pub fn payments(&self) -> &Arc<PaymentMethodRegistry> {
        &self.inner.payments
    }

    #[must_use]
    pub fn policy(&self) -> &Arc<AccessPolicy> {
        &self.inner.policy
    }

    /// Country and zone lookup for address forms and formatting.
    #[must_use]
    pub fn countries(&self) -> &StaticCountryDirectory {
        &self.inner.countries
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutPipeline {
        &self.inner.checkout
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }
}

/// The built-in registry, merged with the configured statuses file if any.
///
/// # Errors
///
/// Returns `OrderError::Configuration` if the file cannot be read or clashes
/// with the built-in definitions.
pub fn load_registry(config: &OrdersConfig) -> Result<StatusRegistry, OrderError> {
    match &config.statuses_file {
        Some(path) => {
            let registry = StatusRegistry::with_config(RegistryConfig::load(path)?)?;
            tracing::info!(path = %path.display(), "Loaded custom order statuses");
            Ok(registry)
        }
        None => Ok(StatusRegistry::builtin()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryOrderStore;
    use crate::registry::StateId;

    #[test]
    fn test_builtin_wiring() {
        let state = AppState::new(OrdersConfig::default(), Arc::new(MemoryOrderStore::new())).unwrap();
        assert_eq!(
            state.checkout().pane_ids(),
            ["customer", "delivery", "billing", "payment", "comments"]
        );
        assert!(state.payments().get("check").is_some());
    }

    #[test]
    fn test_unknown_completion_state_is_rejected() {
        let config = OrdersConfig {
            checkout_complete_state: StateId::new("limbo"),
            ..OrdersConfig::default()
        };
        let err = AppState::new(config, Arc::new(MemoryOrderStore::new())).unwrap_err();
        assert!(matches!(err, OrderError::Configuration(_)));
    }
}
