/// Errors produced by the `fuzzctl-core` crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum CoreError {
    /// The selected tmpfs size and RAM usage together fall outside the pool's
    /// RAM allowance.
    #[error("tmpfs size plus RAM usage must stay between {ram_min} and {ram_max} MiB")]
    RamTotalLimitsViolated { ram_min: u32, ram_max: u32 },

    /// A form field name did not match any known field.
    #[error("unknown form field '{name}'")]
    UnknownField { name: String },

    /// A slider was configured with a zero step.
    #[error("slider step must be positive")]
    ZeroStep,
}

impl CoreError {
    /// Translation key for errors that are shown to the user as form hints.
    ///
    /// The interpolation arguments are the variant's fields.
    #[must_use]
    pub fn message_key(&self) -> Option<&'static str> {
        match self {
            Self::RamTotalLimitsViolated { .. } => {
                Some("form.hint.version.ram_total_limits_violated")
            }
            Self::UnknownField { .. } | Self::ZeroStep => None,
        }
    }
}
