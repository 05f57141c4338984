use std::cell::RefCell;

use thiserror::Error;

/// Errors in the problem definition. These are fatal: the driver reports
/// the message and aborts before transport starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Two or more materials use the same unique ID: {0}")]
    DuplicateMaterialId(i32),

    #[error("Need to specify a positive density on material {0}")]
    NonPositiveDensity(i32),

    #[error("Unknown units '{units}' specified on material {id}")]
    UnknownDensityUnits { id: i32, units: String },

    #[error("Cannot mix atom and weight percents in material {0}")]
    MixedPercents(i32),

    #[error("No nuclides or macroscopic data specified on material {0}")]
    EmptyMaterial(i32),

    #[error("Could not find nuclide {0} in the data library")]
    UnknownNuclide(String),

    #[error("Could not find element {0} in the data library")]
    UnknownElement(String),

    #[error("Could not find thermal scattering data {0} in the data library")]
    UnknownThermalTable(String),

    #[error("Macroscopic data cannot be used in continuous-energy mode (material {0})")]
    MacroscopicInCeMode(i32),

    #[error("Thermal scattering table {table} did not match any nuclide on material {id}")]
    ThermalTableUnmatched { id: i32, table: String },

    #[error(
        "{nuclide} in material {id} was found in multiple thermal scattering tables. \
         Each nuclide can appear in only one table per material."
    )]
    ThermalTableConflict { id: i32, nuclide: String },

    #[error("Duplicate cell ID {0}")]
    DuplicateCellId(i32),

    #[error("Duplicate surface ID {0}")]
    DuplicateSurfaceId(usize),

    #[error("Overlapping cells detected: {0}, {1} on universe {2}")]
    OverlappingCells(i32, i32, i32),
}

/// Recoverable errors returned across the driver boundary. Each maps to a
/// stable integer code; the message is also stored thread-locally so
/// callers that only see the code can retrieve it.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No material exists with ID={0}")]
    InvalidId(i32),

    #[error("Index {0} in materials array is out of bounds")]
    OutOfBounds(usize),

    #[error("{0}")]
    Allocate(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Unassigned(String),
}

impl ApiError {
    /// Stable error code for the C-style driver contract.
    pub fn code(&self) -> i32 {
        match self {
            ApiError::InvalidId(_) => -1,
            ApiError::OutOfBounds(_) => -2,
            ApiError::Allocate(_) => -3,
            ApiError::InvalidArgument(_) => -4,
            ApiError::Unassigned(_) => -5,
        }
    }
}

thread_local! {
    static LAST_ERROR: RefCell<String> = RefCell::new(String::new());
}

/// Record an API error message for later retrieval on this thread.
pub fn set_errmsg(err: &ApiError) {
    LAST_ERROR.with(|m| *m.borrow_mut() = err.to_string());
}

/// Message of the most recent API error on this thread.
pub fn last_errmsg() -> String {
    LAST_ERROR.with(|m| m.borrow().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_codes_are_distinct() {
        let errs = [
            ApiError::InvalidId(1),
            ApiError::OutOfBounds(9),
            ApiError::Allocate("a".into()),
            ApiError::InvalidArgument("b".into()),
            ApiError::Unassigned("c".into()),
        ];
        let mut codes: Vec<i32> = errs.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errs.len());
        assert!(codes.iter().all(|&c| c < 0));
    }

    #[test]
    fn test_errmsg_round_trip() {
        let err = ApiError::InvalidId(42);
        set_errmsg(&err);
        assert_eq!(last_errmsg(), "No material exists with ID=42");
    }

    #[test]
    fn test_config_error_messages_name_offenders() {
        let err = ConfigError::ThermalTableUnmatched {
            id: 3,
            table: "c_Graphite".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("c_Graphite"));
        assert!(msg.contains('3'));
    }
}
