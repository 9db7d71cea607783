//! Payment-system tag to gateway lookup.
//!
//! Built once at startup from configuration; handlers resolve the gateway
//! an order was placed with instead of branching on the provider.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::billing::{BillingError, PaymentSystem};
use crate::ports::PaymentGateway;

#[derive(Clone, Default)]
pub struct GatewayRegistry {
    gateways: HashMap<PaymentSystem, Arc<dyn PaymentGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `gateway` under the payment system it reports.
    pub fn with_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateways.insert(gateway.payment_system(), gateway);
        self
    }

    pub fn resolve(&self, system: PaymentSystem) -> Result<Arc<dyn PaymentGateway>, BillingError> {
        self.gateways
            .get(&system)
            .cloned()
            .ok_or_else(|| BillingError::UnsupportedPaymentSystem(system.to_string()))
    }

    /// Parses a client-supplied tag and resolves it.
    pub fn resolve_tag(
        &self,
        tag: &str,
    ) -> Result<(PaymentSystem, Arc<dyn PaymentGateway>), BillingError> {
        let system: PaymentSystem = tag.parse()?;
        Ok((system, self.resolve(system)?))
    }

    pub fn systems(&self) -> Vec<PaymentSystem> {
        self.gateways.keys().copied().collect()
    }
}

impl std::fmt::Debug for GatewayRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayRegistry")
            .field("systems", &self.systems())
            .finish()
    }
}
