#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PackError {
    #[error("no items to pack")]
    Empty,
    #[error("total weight is zero; circle sizes are undefined")]
    ZeroTotalWeight,
    #[error("invalid weight {weight} for item {label:?}: weights must be finite and non-negative")]
    InvalidWeight { label: String, weight: f64 },
    #[error("weights cannot be scaled into the plot: total weight {total_weight}, scale factor {scale_factor}")]
    UnscalableWeights { total_weight: f64, scale_factor: f64 },
    #[error("invalid plot diameter {0}: must be finite and positive")]
    InvalidDiameter(f64),
    #[error("invalid spacing {0}: must be finite and non-negative")]
    InvalidSpacing(f64),
}
