use typed_builder::TypedBuilder;

/// What to do when a region is added to a transaction while another active
/// transaction already owns some of its bytes.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrossTxPolicy {
    /// Accept the registration silently.
    Allow,
    /// Accept the registration and record a cross-transaction warning.
    #[default]
    Report,
}

/// Settings of a [`Checker`](super::Checker).
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct CheckerConfig {
    /// Only transaction consistency is checked: stores are not tracked for
    /// durability, and stores made outside any transaction are violations.
    #[builder(default)]
    pub transactions_only: bool,
    /// Capacity of each warning register.
    #[builder(default = 10_000)]
    pub warning_limit: usize,
    /// Report stores that overwrite bytes not yet flushed.
    #[builder(default)]
    pub track_multiple_stores: bool,
    /// Report flushes that cover no dirty byte.
    #[builder(default)]
    pub check_redundant_flushes: bool,
    #[builder(default)]
    pub cross_tx_policy: CrossTxPolicy,
    /// Number of store records summarized by one metadata slab.
    #[builder(default = 64)]
    pub slab_width: usize,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
