// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Auxiliary hook contracts per destination chain
//!
//! When a destination has a registered hook contract and the caller supplied
//! no payload, the orchestrator asks a
//! [`HookDataGenerator`](crate::traits::HookDataGenerator) for one and forwards
//! it unmodified.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::info;

/// Input handed to a hook-data generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookContext {
    pub source_chain: String,
    pub destination_chain: String,
    pub destination_address: String,
    /// Smallest USDC unit
    pub amount: u64,
    /// Registered contract on the destination chain
    pub hook_contract: String,
}

/// Hook contract addresses keyed by chain identifier.
///
/// Owned by the orchestrator and updated through explicit calls.
#[derive(Debug, Default)]
pub struct HookRegistry {
    contracts: RwLock<HashMap<String, String>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole registry.
    pub async fn load(&self, entries: impl IntoIterator<Item = (String, String)>) {
        let mut contracts = self.contracts.write().await;
        *contracts = entries.into_iter().collect();
        info!(count = contracts.len(), event = "hook_registry_loaded");
    }

    /// Adds or replaces the contract for `chain_id`, returning the previous one.
    pub async fn register(
        &self,
        chain_id: impl Into<String>,
        contract: impl Into<String>,
    ) -> Option<String> {
        let chain_id = chain_id.into();
        let contract = contract.into();
        info!(chain_id = %chain_id, contract = %contract, event = "hook_contract_registered");
        self.contracts.write().await.insert(chain_id, contract)
    }

    pub async fn remove(&self, chain_id: &str) -> Option<String> {
        let removed = self.contracts.write().await.remove(chain_id);
        if removed.is_some() {
            info!(chain_id = %chain_id, event = "hook_contract_removed");
        }
        removed
    }

    pub async fn get(&self, chain_id: &str) -> Option<String> {
        self.contracts.read().await.get(chain_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_get_remove() {
        let registry = HookRegistry::new();
        assert!(registry.get("base").await.is_none());

        assert!(registry.register("base", "0xaaaa").await.is_none());
        assert_eq!(
            registry.register("base", "0xbbbb").await.as_deref(),
            Some("0xaaaa")
        );
        assert_eq!(registry.get("base").await.as_deref(), Some("0xbbbb"));

        assert_eq!(registry.remove("base").await.as_deref(), Some("0xbbbb"));
        assert!(registry.remove("base").await.is_none());
    }

    #[tokio::test]
    async fn test_load_replaces_entries() {
        let registry = HookRegistry::new();
        registry.register("ethereum", "0x1111").await;

        registry
            .load([("base".to_string(), "0x2222".to_string())])
            .await;

        assert!(registry.get("ethereum").await.is_none());
        assert_eq!(registry.get("base").await.as_deref(), Some("0x2222"));
    }
}
