//! Selectable model allowlist.

#[cfg(test)]
#[path = "models_test.rs"]
mod models_test;

/// One entry of the model picker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelOption {
    /// Identifier sent to the relay and forwarded upstream verbatim.
    pub id: &'static str,
    pub label: &'static str,
}

/// Models offered to the user. The first entry is the default.
pub const MODELS: &[ModelOption] = &[
    ModelOption { id: "gpt-4o-mini", label: "GPT-4o Mini" },
    ModelOption { id: "gpt-4o", label: "GPT-4o" },
];

#[must_use]
pub fn default_model() -> &'static ModelOption {
    &MODELS[0]
}

/// Look up an allowlisted model by id.
#[must_use]
pub fn find_model(id: &str) -> Option<&'static ModelOption> {
    MODELS.iter().find(|model| model.id == id)
}
