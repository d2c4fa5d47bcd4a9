//! Chat model presets offered to the session's model selector.

use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModelTier {
    Production,
    System,
    Preview,
    Custom,
}

impl ModelTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::System => "system",
            Self::Preview => "preview",
            Self::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelPreset {
    pub id: &'static str,
    pub label: &'static str,
    pub tier: ModelTier,
}

pub const DEFAULT_MODEL_ID: &str = "llama-3.1-8b-instant";

pub const MODEL_PRESETS: &[ModelPreset] = &[
    ModelPreset {
        id: "llama-3.1-8b-instant",
        label: "Llama 3.1 8B (instant)",
        tier: ModelTier::Production,
    },
    ModelPreset {
        id: "llama-3.3-70b-versatile",
        label: "Llama 3.3 70B (versatile)",
        tier: ModelTier::Production,
    },
    ModelPreset {
        id: "openai/gpt-oss-20b",
        label: "GPT OSS 20B",
        tier: ModelTier::Production,
    },
    ModelPreset {
        id: "openai/gpt-oss-120b",
        label: "GPT OSS 120B",
        tier: ModelTier::Production,
    },
    ModelPreset {
        id: "groq/compound",
        label: "Groq Compound (system)",
        tier: ModelTier::System,
    },
    ModelPreset {
        id: "groq/compound-mini",
        label: "Groq Compound Mini (system)",
        tier: ModelTier::System,
    },
    ModelPreset {
        id: "qwen/qwen3-32b",
        label: "Qwen3 32B (preview)",
        tier: ModelTier::Preview,
    },
];

const DEFAULT_ENABLED_MODEL_IDS: &[&str] = &[
    "llama-3.1-8b-instant",
    "llama-3.3-70b-versatile",
    "openai/gpt-oss-20b",
];

/// Presets ordered production, system, preview, custom. Stable within a tier.
pub fn presets_by_tier() -> Vec<ModelPreset> {
    let mut presets = MODEL_PRESETS.to_vec();
    presets.sort_by_key(|preset| preset.tier);
    presets
}

/// The preferred default model, falling back to the first ordered preset.
pub fn default_model_id() -> &'static str {
    let presets = presets_by_tier();
    presets
        .iter()
        .find(|preset| preset.id == DEFAULT_MODEL_ID)
        .or_else(|| presets.first())
        .map(|preset| preset.id)
        .unwrap_or(DEFAULT_MODEL_ID)
}

pub fn default_enabled_model_ids() -> BTreeSet<&'static str> {
    DEFAULT_ENABLED_MODEL_IDS.iter().copied().collect()
}

pub fn find_preset(id: &str) -> Option<&'static ModelPreset> {
    MODEL_PRESETS.iter().find(|preset| preset.id == id.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_by_tier_groups_tiers_in_display_order() {
        let tiers: Vec<ModelTier> = presets_by_tier().iter().map(|preset| preset.tier).collect();
        let mut sorted = tiers.clone();
        sorted.sort();
        assert_eq!(tiers, sorted);
        assert_eq!(tiers.first(), Some(&ModelTier::Production));
        assert_eq!(tiers.last(), Some(&ModelTier::Preview));
    }

    #[test]
    fn default_model_is_the_instant_llama() {
        assert_eq!(default_model_id(), "llama-3.1-8b-instant");
    }

    #[test]
    fn enabled_ids_are_known_presets() {
        for id in default_enabled_model_ids() {
            assert!(find_preset(id).is_some(), "{id} should be a preset");
        }
    }

    #[test]
    fn tier_labels_are_lowercase() {
        assert_eq!(ModelTier::System.as_str(), "system");
        assert_eq!(find_preset(" qwen/qwen3-32b ").map(|p| p.tier), Some(ModelTier::Preview));
    }
}
