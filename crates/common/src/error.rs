//! Common error types shared across crates.

use thiserror::Error;

/// Errors raised while interpreting route names and route weight lists.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The name does not identify one of the workload routes.
    #[error("unknown route: {0:?} (expected one of health, hello, slow, alloc)")]
    UnknownRoute(String),

    /// A `route=weight` entry could not be parsed.
    #[error("invalid route weight entry: {0:?}")]
    InvalidWeight(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_offending_value() {
        let e = ProtocolError::UnknownRoute("metrics".into());
        assert!(e.to_string().contains("\"metrics\""));

        let e = ProtocolError::InvalidWeight("slow=".into());
        assert!(e.to_string().contains("slow="));
    }
}
