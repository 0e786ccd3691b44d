//! Folder naming policy.
//!
//! Turns entity metadata into a folder name every backend accepts. The base
//! rendering keeps `[A-Za-z0-9._-]` and replaces everything else with a
//! single `_`; the spaced style then swaps underscores back to spaces for
//! drives whose UI shows underscores poorly.

use folio_core::types::FolderNameStyle;
use folio_core::{AppError, AppResult};
use folio_entity::{EntityKind, EntityRecord};

/// Derives legal folder names from entities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderNamingPolicy {
    style: FolderNameStyle,
}

impl FolderNamingPolicy {
    /// Create a policy rendering names in the given style.
    pub fn new(style: FolderNameStyle) -> Self {
        Self { style }
    }

    /// The style this policy renders.
    pub fn style(&self) -> FolderNameStyle {
        self.style
    }

    /// Folder name for an entity.
    ///
    /// Programs use their display name; studies and assays are prefixed
    /// with their code as `<CODE> - <Name>` when they have one.
    pub fn name(&self, entity: &EntityRecord) -> AppResult<String> {
        let raw = match (entity.kind, entity.code.as_deref()) {
            (EntityKind::Program, _) | (_, None) => entity.name.clone(),
            (_, Some(code)) if code.trim().is_empty() => entity.name.clone(),
            (_, Some(code)) => format!("{} - {}", code.trim(), entity.name.trim()),
        };
        self.legal(&raw).map_err(|e| {
            AppError::configuration(format!(
                "Cannot derive a folder name for {} {}: {}",
                entity.kind, entity.id, e.message
            ))
        })
    }

    /// Render an arbitrary string as a legal folder name.
    pub fn legal(&self, raw: &str) -> AppResult<String> {
        let base = underscored(raw);
        let rendered = match self.style {
            FolderNameStyle::Underscored => base,
            FolderNameStyle::Spaced => spaced(&base),
        };
        match rendered.as_str() {
            "" | "." | ".." => Err(AppError::configuration(format!(
                "'{raw}' does not produce a usable folder name"
            ))),
            _ => Ok(rendered),
        }
    }
}

fn underscored(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            c
        } else {
            '_'
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    out
}

fn spaced(base: &str) -> String {
    base.split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn study(code: &str, name: &str) -> EntityRecord {
        EntityRecord::study(Uuid::new_v4(), name, code, Uuid::new_v4())
    }

    #[test]
    fn test_study_name_in_both_styles() {
        let entity = study("CPA-10001", "First In Human");
        assert_eq!(
            FolderNamingPolicy::default().name(&entity).unwrap(),
            "CPA-10001_-_First_In_Human"
        );
        assert_eq!(
            FolderNamingPolicy::new(FolderNameStyle::Spaced)
                .name(&entity)
                .unwrap(),
            "CPA-10001 - First In Human"
        );
    }

    #[test]
    fn test_program_uses_display_name_only() {
        let program = EntityRecord::program(Uuid::new_v4(), "Oncology / Phase 1", Some("ONC".into()));
        assert_eq!(
            FolderNamingPolicy::default().name(&program).unwrap(),
            "Oncology_Phase_1"
        );
    }

    #[test]
    fn test_naming_is_idempotent() {
        for style in [FolderNameStyle::Underscored, FolderNameStyle::Spaced] {
            let policy = FolderNamingPolicy::new(style);
            for raw in ["CPA-10001 - First In Human", "a//b\\c", "  Ünïcode?  ", "x.y_z"] {
                let once = policy.legal(raw).unwrap();
                assert_eq!(policy.legal(&once).unwrap(), once, "style {style:?}, input {raw:?}");
            }
        }
    }

    #[test]
    fn test_unusable_names_are_configuration_errors() {
        let policy = FolderNamingPolicy::new(FolderNameStyle::Spaced);
        assert_eq!(
            policy.legal("???").unwrap_err().kind,
            folio_core::ErrorKind::Configuration
        );
        assert!(FolderNamingPolicy::default().legal("..").is_err());
        assert!(FolderNamingPolicy::default().legal("").is_err());
    }
}
