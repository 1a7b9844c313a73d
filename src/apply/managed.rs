use std::fmt;

use super::{require_url, ApplyCapability, OtaApplier};
use crate::error::PotaError;

/// Failure reported by a platform update helper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedUpdateFailure {
    pub code: i32,
    pub message: String,
}

impl fmt::Display for ManagedUpdateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}): {}", self.code, self.message)
    }
}

/// Platform helper that downloads, writes and restarts on its own.
/// A successful return means the restart is imminent.
pub trait ManagedUpdatePrimitive {
    fn update(&mut self, url: &str) -> Result<(), ManagedUpdateFailure>;
}

pub struct ManagedApplier<P> {
    helper: P,
}

impl<P: ManagedUpdatePrimitive> ManagedApplier<P> {
    pub fn new(helper: P) -> Self {
        Self { helper }
    }

    pub fn helper(&self) -> &P {
        &self.helper
    }
}

impl<P: ManagedUpdatePrimitive> OtaApplier for ManagedApplier<P> {
    fn capability(&self) -> ApplyCapability {
        ApplyCapability::LibraryManaged
    }

    fn apply(&mut self, url: &str) -> Result<(), PotaError> {
        require_url(url)?;

        log::info!("Handing {} to the platform update helper", url);
        self.helper.update(url).map_err(|failure| {
            log::error!("OTA failed. Error {}", failure);
            PotaError::OtaFailed
        })?;

        log::info!("OTA update completed. Restarting...");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeHelper {
        result: Result<(), ManagedUpdateFailure>,
        calls: Vec<String>,
    }

    impl ManagedUpdatePrimitive for FakeHelper {
        fn update(&mut self, url: &str) -> Result<(), ManagedUpdateFailure> {
            self.calls.push(url.to_string());
            self.result.clone()
        }
    }

    #[test]
    fn test_helper_success() {
        let mut applier = ManagedApplier::new(FakeHelper {
            result: Ok(()),
            calls: Vec::new(),
        });
        assert_eq!(applier.capability(), ApplyCapability::LibraryManaged);
        assert_eq!(applier.apply("https://h/fw.bin"), Ok(()));
        assert_eq!(applier.helper().calls, vec!["https://h/fw.bin".to_string()]);
    }

    #[test]
    fn test_helper_failure_maps_to_generic() {
        let mut applier = ManagedApplier::new(FakeHelper {
            result: Err(ManagedUpdateFailure {
                code: -102,
                message: "Wrong HTTP Code".to_string(),
            }),
            calls: Vec::new(),
        });
        assert_eq!(applier.apply("https://h/fw.bin"), Err(PotaError::OtaFailed));
    }

    #[test]
    fn test_empty_url_never_reaches_helper() {
        let mut applier = ManagedApplier::new(FakeHelper {
            result: Ok(()),
            calls: Vec::new(),
        });
        assert_eq!(applier.apply(""), Err(PotaError::InvalidOtaUrl));
        assert!(applier.helper().calls.is_empty());
    }
}
