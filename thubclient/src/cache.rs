//! Cache en mémoire des descripteurs de méthode
//!
//! Un descripteur est immuable une fois récupéré et vit pour la durée du
//! processus : le cache n'a volontairement aucun TTL. Un descripteur obsolète
//! côté service n'est remplacé que par un redémarrage ou un `clear_all()`
//! explicite. Les lectures et insertions concurrentes sont sûres ; deux
//! requêtes simultanées pour la même clé peuvent toutes deux déclencher un
//! fetch, la seconde insertion écrasant la première à l'identique.

use crate::models::MethodDescriptor;
use moka::future::Cache as MokaCache;
use std::sync::Arc;

/// Capacité par défaut (largement au-dessus du produit plateformes ×
/// opérations réel)
const DEFAULT_CAPACITY: u64 = 1000;

/// Cache des descripteurs, clé (plateforme, opération)
#[derive(Clone)]
pub struct DescriptorCache {
    descriptors: Arc<MokaCache<(String, String), MethodDescriptor>>,
}

impl DescriptorCache {
    /// Crée un nouveau cache avec les paramètres par défaut
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Crée un nouveau cache avec une capacité spécifique
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self {
            descriptors: Arc::new(
                MokaCache::builder()
                    .max_capacity(max_capacity)
                    // Pas de time_to_live : durée de vie du processus
                    .build(),
            ),
        }
    }

    /// Récupère un descripteur depuis le cache
    pub async fn get(&self, platform: &str, operation: &str) -> Option<MethodDescriptor> {
        self.descriptors
            .get(&(platform.to_string(), operation.to_string()))
            .await
    }

    /// Ajoute un descripteur au cache
    pub async fn put(&self, descriptor: MethodDescriptor) {
        let key = (descriptor.platform.clone(), descriptor.operation.clone());
        self.descriptors.insert(key, descriptor).await;
    }

    /// Invalide un descripteur précis
    pub async fn invalidate(&self, platform: &str, operation: &str) {
        self.descriptors
            .invalidate(&(platform.to_string(), operation.to_string()))
            .await;
    }

    /// Vide le cache entier
    pub fn clear_all(&self) {
        self.descriptors.invalidate_all();
    }

    /// Retourne des statistiques sur le cache
    pub async fn stats(&self) -> CacheStats {
        self.descriptors.run_pending_tasks().await;
        CacheStats {
            descriptors_count: self.descriptors.entry_count(),
        }
    }
}

impl Default for DescriptorCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistiques du cache
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheStats {
    /// Nombre de descripteurs en cache
    pub descriptors_count: u64,
}
