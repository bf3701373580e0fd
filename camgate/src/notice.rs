//! User-facing notices
//!
//! Short messages the host shows while permission is being acquired
//! (toasts on Android). Hosts may localize by matching on the variant and
//! ignoring [`Notice::message`].

use serde::Serialize;
use std::fmt;

/// A message for the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    /// Shown just before the OS permission dialog
    RequestingAccess,
    /// The user granted access in response to a prompt
    AccessGranted,
    /// The user denied access
    AccessDenied,
    /// The app is about to open its settings page
    OpeningSettings,
    /// The settings page could not be opened; manual steps follow
    SettingsUnavailable,
    /// Scanning stays disabled until access is granted
    FeatureUnavailable,
}

impl Notice {
    /// Default English text
    pub fn message(&self) -> &'static str {
        match self {
            Self::RequestingAccess => "Please allow camera access to enable barcode scanning",
            Self::AccessGranted => "Camera permission granted",
            Self::AccessDenied => {
                "Camera permission denied. App needs camera access to scan barcodes."
            }
            Self::OpeningSettings => "Please enable camera permission in app settings",
            Self::SettingsUnavailable => {
                "Open your device settings > Apps > Permissions and enable the camera for this app"
            }
            Self::FeatureUnavailable => {
                "Barcode scanning is unavailable until camera access is granted"
            }
        }
    }

    /// Whether the notice should stay visible rather than time out
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::FeatureUnavailable)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_feature_unavailable_persists() {
        assert!(Notice::FeatureUnavailable.is_persistent());
        assert!(!Notice::AccessDenied.is_persistent());
        assert!(!Notice::RequestingAccess.is_persistent());
    }

    #[test]
    fn test_display_uses_message() {
        assert_eq!(
            Notice::AccessGranted.to_string(),
            "Camera permission granted"
        );
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&Notice::OpeningSettings).unwrap();
        assert_eq!(json, r#""opening_settings""#);
    }
}
