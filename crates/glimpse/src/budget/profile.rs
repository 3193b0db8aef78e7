//! Model profiles and the registry that holds them.
//!
//! A [`ModelProfile`] describes how a downstream model consumes a capture:
//! its context window, what one image costs, how many frames it works best
//! with, and how its attention should be split between what was on screen,
//! what changed in the code, and what the terminal said.
//!
//! Profiles live in an explicit [`ProfileRegistry`] owned by the caller. The
//! registry starts with a few built-ins and accepts custom profiles through
//! [`register`](ProfileRegistry::register) or a JSON file.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Name of the profile unknown lookups resolve to.
pub const DEFAULT_PROFILE: &str = "default";

/// Allowed deviation of a context bias sum from 1.0.
const BIAS_TOLERANCE: f64 = 0.01;

/// Weighting across the three signal categories. Should sum to about 1.0.
#[derive(Serialize, Deserialize, JsonSchema, Clone, Copy, Debug, PartialEq)]
pub struct ContextBias {
    /// Share of the budget for frames.
    pub visual: f64,
    /// Share of the budget for git diff and commits.
    pub code: f64,
    /// Share of the budget for terminal output.
    pub execution: f64,
}

impl ContextBias {
    pub fn sum(&self) -> f64 {
        self.visual + self.code + self.execution
    }

    pub fn is_normalized(&self) -> bool {
        (self.sum() - 1.0).abs() <= BIAS_TOLERANCE
    }
}

/// How much prose the formatter wraps around the capture.
#[derive(Serialize, Deserialize, JsonSchema, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Concise,
    Balanced,
    Detailed,
}

#[derive(Serialize, Deserialize, JsonSchema, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FocusLevel {
    Low,
    Medium,
    High,
}

/// Prompt shaping preferences for a model.
#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromptStyle {
    pub verbosity: Verbosity,
    /// Label each frame with its capture time.
    pub include_timestamps: bool,
    /// Label each frame with its selection reason.
    pub include_frame_reasons: bool,
    /// Split the report into headed sections.
    pub structured_sections: bool,
    /// Ask the model to walk the cause-and-effect chain explicitly.
    pub request_causal_chain: bool,
    /// How strongly the model should focus on what caused the failure.
    pub causal_focus_level: FocusLevel,
}

impl PromptStyle {
    /// Approximate token cost of the prompt scaffolding this style produces.
    pub fn estimated_tokens(&self) -> usize {
        let base = match self.verbosity {
            Verbosity::Concise => 150,
            Verbosity::Balanced => 300,
            Verbosity::Detailed => 600,
        };
        let flags = [
            self.include_timestamps,
            self.include_frame_reasons,
            self.structured_sections,
            self.request_causal_chain,
        ]
        .iter()
        .filter(|&&on| on)
        .count();
        let causal = if self.causal_focus_level == FocusLevel::High {
            100
        } else {
            0
        };
        base + flags * 50 + causal
    }
}

/// Everything the allocator needs to know about a target model.
#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelProfile {
    pub name: String,
    /// Context window in tokens.
    pub max_tokens: usize,
    /// Token cost of one full-quality frame.
    pub image_token_estimate: usize,
    /// Frame count the model reasons best with.
    pub preferred_frames: usize,
    /// Hard ceiling on frames.
    pub max_frames: usize,
    pub context_bias: ContextBias,
    pub prompt_style: PromptStyle,
}

impl ModelProfile {
    /// JSON Schema of a profile file (an array of profiles).
    pub fn file_schema() -> serde_json::Value {
        let schema = schemars::schema_for!(Vec<ModelProfile>);
        serde_json::to_value(schema).unwrap_or_else(|_| serde_json::json!({"type": "array"}))
    }
}

/// Owned collection of model profiles keyed by name.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: HashMap<String, ModelProfile>,
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ProfileRegistry {
    /// An empty registry. [`get_or_default`](Self::get_or_default) falls back
    /// to the built-in default profile when nothing is registered under
    /// [`DEFAULT_PROFILE`].
    pub fn empty() -> Self {
        Self {
            profiles: HashMap::new(),
        }
    }

    /// A registry pre-populated with the built-in profiles.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for profile in builtin_profiles() {
            registry.profiles.insert(profile.name.clone(), profile);
        }
        registry
    }

    /// Insert or replace a profile by name.
    pub fn register(&mut self, profile: ModelProfile) {
        if !profile.context_bias.is_normalized() {
            warn!(
                profile = %profile.name,
                sum = profile.context_bias.sum(),
                "context bias does not sum to 1.0"
            );
        }
        debug!(profile = %profile.name, "registered model profile");
        self.profiles.insert(profile.name.clone(), profile);
    }

    pub fn get(&self, name: &str) -> Option<&ModelProfile> {
        self.profiles.get(name)
    }

    /// Look up `name`, resolving unknown names to the default profile.
    pub fn get_or_default(&self, name: &str) -> &ModelProfile {
        if let Some(profile) = self.profiles.get(name) {
            return profile;
        }
        warn!(requested = name, "unknown model profile, using default");
        self.profiles
            .get(DEFAULT_PROFILE)
            .unwrap_or(&*FALLBACK_PROFILE)
    }

    /// Registered profile names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Register every profile in a JSON file containing an array of
    /// profiles. Returns how many were registered.
    pub fn load_file(&mut self, path: &Path) -> Result<usize, String> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read profiles from {}: {e}", path.display()))?;
        let profiles: Vec<ModelProfile> = serde_json::from_str(&data)
            .map_err(|e| format!("failed to parse profiles in {}: {e}", path.display()))?;
        let count = profiles.len();
        for profile in profiles {
            self.register(profile);
        }
        debug!("Loaded {count} model profile(s) from {}", path.display());
        Ok(count)
    }

    /// Write every registered profile to a JSON file, sorted by name.
    pub fn save_file(&self, path: &Path) -> Result<(), String> {
        let profiles: Vec<&ModelProfile> = self
            .names()
            .into_iter()
            .filter_map(|name| self.profiles.get(name))
            .collect();
        let data = serde_json::to_string_pretty(&profiles)
            .map_err(|e| format!("failed to serialize profiles: {e}"))?;
        std::fs::write(path, data)
            .map_err(|e| format!("failed to write profiles to {}: {e}", path.display()))?;
        debug!("Saved {} model profile(s) to {}", profiles.len(), path.display());
        Ok(())
    }
}

/// Used only when a registry has no `default` entry of its own.
static FALLBACK_PROFILE: std::sync::LazyLock<ModelProfile> =
    std::sync::LazyLock::new(default_profile);

fn default_profile() -> ModelProfile {
    ModelProfile {
        name: DEFAULT_PROFILE.into(),
        max_tokens: 100_000,
        image_token_estimate: 1_000,
        preferred_frames: 6,
        max_frames: 12,
        context_bias: ContextBias {
            visual: 0.4,
            code: 0.3,
            execution: 0.3,
        },
        prompt_style: PromptStyle {
            verbosity: Verbosity::Balanced,
            include_timestamps: true,
            include_frame_reasons: true,
            structured_sections: true,
            request_causal_chain: false,
            causal_focus_level: FocusLevel::Medium,
        },
    }
}

fn builtin_profiles() -> Vec<ModelProfile> {
    vec![
        ModelProfile {
            name: "claude".into(),
            max_tokens: 200_000,
            image_token_estimate: 1_600,
            preferred_frames: 8,
            max_frames: 20,
            context_bias: ContextBias {
                visual: 0.5,
                code: 0.3,
                execution: 0.2,
            },
            prompt_style: PromptStyle {
                verbosity: Verbosity::Detailed,
                include_timestamps: true,
                include_frame_reasons: true,
                structured_sections: true,
                request_causal_chain: true,
                causal_focus_level: FocusLevel::High,
            },
        },
        ModelProfile {
            name: "gpt-4o".into(),
            max_tokens: 128_000,
            image_token_estimate: 765,
            preferred_frames: 6,
            max_frames: 15,
            context_bias: ContextBias {
                visual: 0.4,
                code: 0.35,
                execution: 0.25,
            },
            prompt_style: PromptStyle {
                verbosity: Verbosity::Balanced,
                include_timestamps: true,
                include_frame_reasons: true,
                structured_sections: true,
                request_causal_chain: false,
                causal_focus_level: FocusLevel::Medium,
            },
        },
        ModelProfile {
            name: "gemini".into(),
            max_tokens: 1_000_000,
            image_token_estimate: 258,
            preferred_frames: 12,
            max_frames: 30,
            context_bias: ContextBias {
                visual: 0.6,
                code: 0.2,
                execution: 0.2,
            },
            prompt_style: PromptStyle {
                verbosity: Verbosity::Detailed,
                include_timestamps: true,
                include_frame_reasons: false,
                structured_sections: true,
                request_causal_chain: true,
                causal_focus_level: FocusLevel::Medium,
            },
        },
        default_profile(),
    ]
}
