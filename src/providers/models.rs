//! Static model catalog.

use crate::providers::types::ModelInfo;

/// Every model id the bridge accepts, with the provider that serves it.
///
/// `gpt-4o` is an alias so that OpenAI clients with a hard-coded model name
/// still reach the Gemini backend.
pub const SUPPORTED_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "gemini-2.5-pro",
        created: 1_750_118_400,
        owned_by: "google",
        provider: "gemini",
    },
    ModelInfo {
        id: "gemini-2.5-flash",
        created: 1_750_118_400,
        owned_by: "google",
        provider: "gemini",
    },
    ModelInfo {
        id: "gemini-1.5-pro",
        created: 1_715_644_800,
        owned_by: "google",
        provider: "gemini",
    },
    ModelInfo {
        id: "gemini-1.5-flash",
        created: 1_715_644_800,
        owned_by: "google",
        provider: "gemini",
    },
    ModelInfo {
        id: "gpt-4o",
        created: 1_715_558_400,
        owned_by: "openai-alias",
        provider: "gemini",
    },
];

/// Catalog entries served by `provider`.
pub fn models_for_provider(provider: &str) -> Vec<ModelInfo> {
    SUPPORTED_MODELS
        .iter()
        .filter(|m| m.provider == provider)
        .copied()
        .collect()
}

/// Look up a catalog entry by id.
pub fn find_model(id: &str) -> Option<ModelInfo> {
    SUPPORTED_MODELS.iter().find(|m| m.id == id).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_models_for_provider() {
        let models = models_for_provider("gemini");
        assert_eq!(models.len(), SUPPORTED_MODELS.len());
        assert!(models.iter().any(|m| m.id == "gpt-4o"));
        assert!(models_for_provider("claude").is_empty());
    }

    #[test]
    fn test_find_model() {
        let model = find_model("gemini-1.5-pro").unwrap();
        assert_eq!(model.owned_by, "google");
        assert_eq!(model.created, 1_715_644_800);
        assert!(find_model("nope").is_none());
    }

    #[test]
    fn test_catalog_ids_unique() {
        let mut ids: Vec<_> = SUPPORTED_MODELS.iter().map(|m| m.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), SUPPORTED_MODELS.len());
    }
}
