//! Per-drive behaviour switches.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// What to do when folder creation reports that the target already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Surface a `Duplicate` error to the caller.
    Fail,
    /// Look up the existing folder and use it as if newly created.
    #[default]
    ReuseExisting,
}

impl DuplicatePolicy {
    /// Return the policy as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::ReuseExisting => "reuse_existing",
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DuplicatePolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "fail" => Ok(Self::Fail),
            "reuse_existing" | "reuse" => Ok(Self::ReuseExisting),
            _ => Err(AppError::validation(format!(
                "Invalid duplicate policy: '{s}'. Expected one of: fail, reuse_existing"
            ))),
        }
    }
}

/// How legal folder names are rendered on a drive.
///
/// `Underscored` is the base naming policy. `Spaced` turns underscores back
/// into single spaces for backends whose UI renders underscores poorly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderNameStyle {
    /// `CPA-10001_-_First_In_Human`
    #[default]
    Underscored,
    /// `CPA-10001 - First In Human`
    Spaced,
}

impl FolderNameStyle {
    /// Return the style as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Underscored => "underscored",
            Self::Spaced => "spaced",
        }
    }
}

impl fmt::Display for FolderNameStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FolderNameStyle {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "underscored" => Ok(Self::Underscored),
            "spaced" => Ok(Self::Spaced),
            _ => Err(AppError::validation(format!(
                "Invalid folder name style: '{s}'. Expected one of: underscored, spaced"
            ))),
        }
    }
}
