//! Drive type enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of backend a drive talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "drive_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DriveType {
    /// Local filesystem.
    Local,
    /// S3-compatible object store.
    ObjectStore,
    /// Enterprise file-share REST service.
    EnterpriseShare,
    /// Cloud drive reachable over a graph API.
    CloudDrive,
}

impl DriveType {
    /// Return the drive type as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::ObjectStore => "object_store",
            Self::EnterpriseShare => "enterprise_share",
            Self::CloudDrive => "cloud_drive",
        }
    }
}

impl fmt::Display for DriveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DriveType {
    type Err = folio_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "local" => Ok(Self::Local),
            "object_store" | "s3" => Ok(Self::ObjectStore),
            "enterprise_share" => Ok(Self::EnterpriseShare),
            "cloud_drive" => Ok(Self::CloudDrive),
            _ => Err(folio_core::AppError::validation(format!(
                "Invalid drive type: '{s}'. Expected one of: local, object_store, enterprise_share, cloud_drive"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_str() {
        for kind in [
            DriveType::Local,
            DriveType::ObjectStore,
            DriveType::EnterpriseShare,
            DriveType::CloudDrive,
        ] {
            assert_eq!(kind.as_str().parse::<DriveType>().unwrap(), kind);
        }
        assert_eq!("S3".parse::<DriveType>().unwrap(), DriveType::ObjectStore);
    }
}
