use async_trait::async_trait;
use cimom_core::{CimName, CimNamespaceName};
use dashmap::DashMap;

/// Registered-provider lookup consulted when the routing table has no
/// route for a class.
/// Implementations: repository-backed registration (future), static map
/// (startup configuration, tests).
#[async_trait]
pub trait ProviderRegistry: Send + Sync {
    /// Provider module registered for `class_name` in `namespace`, if any.
    async fn lookup(
        &self,
        class_name: &CimName,
        namespace: &CimNamespaceName,
    ) -> anyhow::Result<Option<String>>;
}

/// In-memory provider registrations keyed by class and namespace.
#[derive(Debug, Default)]
pub struct StaticProviderRegistry {
    modules: DashMap<(CimNamespaceName, CimName), String>,
}

impl StaticProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `module` for a class, replacing any earlier registration.
    pub fn register(
        &self,
        class_name: CimName,
        namespace: CimNamespaceName,
        module: impl Into<String>,
    ) -> Option<String> {
        self.modules.insert((namespace, class_name), module.into())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[async_trait]
impl ProviderRegistry for StaticProviderRegistry {
    async fn lookup(
        &self,
        class_name: &CimName,
        namespace: &CimNamespaceName,
    ) -> anyhow::Result<Option<String>> {
        let key = (namespace.clone(), class_name.clone());
        Ok(self.modules.get(&key).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_is_case_insensitive() {
        let registry = StaticProviderRegistry::new();
        registry.register(
            CimName::new("CIM_ComputerSystem").unwrap(),
            CimNamespaceName::new("root/cimv2").unwrap(),
            "ComputerSystemModule",
        );

        let found = registry
            .lookup(
                &CimName::new("cim_computersystem").unwrap(),
                &CimNamespaceName::new("ROOT/CIMV2").unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(found.as_deref(), Some("ComputerSystemModule"));
    }

    #[tokio::test]
    async fn unregistered_class_is_none() {
        let registry = StaticProviderRegistry::new();
        let found = registry
            .lookup(
                &CimName::new("CIM_Foo").unwrap(),
                &CimNamespaceName::new("root/cimv2").unwrap(),
            )
            .await
            .unwrap();
        assert!(found.is_none());
        assert!(registry.is_empty());
    }
}
