//! # Institution Registry
//!
//! Read-only reference data: which wallets belong to which issuing
//! institutions, whether they pay a minting fee, and which grading scale each
//! one uses. Built once at startup (from the built-in table or a JSON file)
//! and passed by reference to whoever needs it. There is no global instance.
//!
//! ## File format
//!
//! ```json
//! {
//!   "fallbackScale": "Karachi University",
//!   "scales": [{ "name": "Karachi University", "tiers": [{ "min_marks": 85, "points": 4.0 }] }],
//!   "institutions": [{ "wallet": "M62N...", "name": "ABC University", "feeExempt": false,
//!                      "gradingScale": "ABC University" }]
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::FALLBACK_INSTITUTION;
use crate::grading::{GradingError, GradingPolicy, GradingScale};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read registry file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse registry: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("institution `{institution}` references unknown grading scale `{scale}`")]
    UnknownScale { institution: String, scale: String },

    #[error("fallback grading scale `{0}` is not defined")]
    UnknownFallback(String),

    #[error("wallet {0} is registered more than once")]
    DuplicateWallet(String),

    #[error(transparent)]
    InvalidScale(#[from] GradingError),
}

/// A registered issuing institution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Institution {
    pub wallet: String,
    pub name: String,
    #[serde(default)]
    pub fee_exempt: bool,
    /// Name of the grading scale; the fallback scale when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grading_scale: Option<String>,
}

impl Institution {
    /// First letter of every word, uppercased: "ABC University" → "AU".
    pub fn initials(&self) -> String {
        self.name
            .split_whitespace()
            .filter_map(|w| w.chars().next())
            .flat_map(char::to_uppercase)
            .collect()
    }
}

/// On-disk shape of the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    pub fallback_scale: String,
    pub scales: Vec<GradingScale>,
    pub institutions: Vec<Institution>,
}

impl Default for RegistryConfig {
    /// The institutions and scales AlgoCred shipped with.
    fn default() -> Self {
        let inst = |wallet: &str, name: &str, fee_exempt: bool, scale: Option<&str>| Institution {
            wallet: wallet.to_string(),
            name: name.to_string(),
            fee_exempt,
            grading_scale: scale.map(str::to_string),
        };
        Self {
            fallback_scale: FALLBACK_INSTITUTION.to_string(),
            scales: vec![
                GradingScale::karachi_university(),
                GradingScale::smiu(),
                GradingScale::abc_university(),
            ],
            institutions: vec![
                inst(
                    "M62NKUYCQT2ESAMEOSGJPTNFCEESEPKJAMSQCPCYNMFJQ4N7VSSKKS6EAM",
                    "Darul Uloom Memon",
                    true,
                    None,
                ),
                inst(
                    "37IWAMOV226G32SEBQEDGAK6HQAB5QNXAHWITB2BYLFLECG3OMEFIN77QI",
                    "Sindh Madressatul Islam University",
                    true,
                    Some("Sindh Madressatul Islam University"),
                ),
                inst(
                    "BY5TDHHKSB224JZVCNEEEVADRK7FWYKJAOCKB3KZYAVRL6QZW6OYAVK5NM",
                    "ABC University",
                    false,
                    Some("ABC University"),
                ),
                inst(
                    "FEYL3CZYH4MIILAD2S76YMQQOVLRCGWO4VFNLX3KCRG4WLAC7FAYDWJKVA",
                    "XYZ University",
                    true,
                    Some("ABC University"),
                ),
            ],
        }
    }
}

/// Validated, immutable registry.
#[derive(Debug, Clone)]
pub struct InstitutionRegistry {
    institutions: Vec<Institution>,
    scales: HashMap<String, GradingScale>,
    fallback_scale: String,
}

impl InstitutionRegistry {
    /// Validates a config: scale references resolve and wallets are unique.
    pub fn from_config(config: RegistryConfig) -> Result<Self, RegistryError> {
        let mut scales = HashMap::new();
        for scale in config.scales {
            // Re-run construction so file-provided tiers are sorted and checked.
            let scale = GradingScale::new(scale.name, scale.tiers)?;
            scales.insert(key(&scale.name), scale);
        }

        if !scales.contains_key(&key(&config.fallback_scale)) {
            return Err(RegistryError::UnknownFallback(config.fallback_scale));
        }

        let mut seen = Vec::with_capacity(config.institutions.len());
        for inst in &config.institutions {
            let wallet = inst.wallet.to_lowercase();
            if seen.contains(&wallet) {
                return Err(RegistryError::DuplicateWallet(inst.wallet.clone()));
            }
            seen.push(wallet);

            if let Some(scale) = &inst.grading_scale {
                if !scales.contains_key(&key(scale)) {
                    return Err(RegistryError::UnknownScale {
                        institution: inst.name.clone(),
                        scale: scale.clone(),
                    });
                }
            }
        }

        Ok(Self {
            institutions: config.institutions,
            scales,
            fallback_scale: config.fallback_scale,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        Self::from_config(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn institutions(&self) -> &[Institution] {
        &self.institutions
    }

    /// Case-insensitive wallet lookup.
    pub fn find_by_wallet(&self, wallet: &str) -> Option<&Institution> {
        let wallet = wallet.trim();
        self.institutions
            .iter()
            .find(|i| i.wallet.eq_ignore_ascii_case(wallet))
    }

    /// Case-insensitive, whitespace-trimmed name lookup.
    pub fn find_by_name(&self, name: &str) -> Option<&Institution> {
        let k = key(name);
        self.institutions.iter().find(|i| key(&i.name) == k)
    }

    /// The scale an institution grades with. Unknown institutions, and
    /// registered ones without an explicit scale, get a scale of the same
    /// name if one exists, then the fallback.
    pub fn scale_for(&self, institution: &str) -> &GradingScale {
        let named = self
            .find_by_name(institution)
            .and_then(|i| i.grading_scale.as_deref())
            .and_then(|s| self.scales.get(&key(s)));

        named
            .or_else(|| self.scales.get(&key(institution)))
            .unwrap_or_else(|| self.fallback())
    }

    /// Institution policy: the institution's scale, every course counted.
    pub fn policy_for(&self, institution: &str) -> GradingPolicy {
        GradingPolicy::institution(self.scale_for(institution).clone())
    }

    fn fallback(&self) -> &GradingScale {
        // from_config guarantees the fallback exists.
        &self.scales[&key(&self.fallback_scale)]
    }
}

impl Default for InstitutionRegistry {
    fn default() -> Self {
        let config = RegistryConfig::default();
        let scales = config
            .scales
            .into_iter()
            .map(|s| (key(&s.name), s))
            .collect();
        Self {
            institutions: config.institutions,
            scales,
            fallback_scale: config.fallback_scale,
        }
    }
}

fn key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_config_validates() {
        assert!(InstitutionRegistry::from_config(RegistryConfig::default()).is_ok());
    }

    #[test]
    fn test_find_by_wallet_is_case_insensitive() {
        let reg = InstitutionRegistry::default();
        let inst = reg
            .find_by_wallet("by5tdhhksb224jzvcneeevadrk7fwykjaockb3kzyavrl6qzw6oyavk5nm")
            .unwrap();
        assert_eq!(inst.name, "ABC University");
        assert!(!inst.fee_exempt);
        assert!(reg.find_by_wallet("UNKNOWN").is_none());
    }

    #[test]
    fn test_scale_resolution() {
        let reg = InstitutionRegistry::default();
        assert_eq!(reg.scale_for("ABC University").name, "ABC University");
        // XYZ shares ABC's table.
        assert_eq!(reg.scale_for("xyz university").name, "ABC University");
        assert_eq!(reg.scale_for("Sindh Madressatul Islam University").name, "Sindh Madressatul Islam University");
        // Registered without a scale, and not registered at all.
        assert_eq!(reg.scale_for("Darul Uloom Memon").name, "Karachi University");
        assert_eq!(reg.scale_for("Nowhere College").name, "Karachi University");
        // Not a registered issuer but has its own table.
        assert_eq!(reg.scale_for("Karachi University").name, "Karachi University");
    }

    #[test]
    fn test_policy_for_counts_every_course() {
        let reg = InstitutionRegistry::default();
        let p = reg.policy_for("ABC University");
        assert_eq!(p.failed_courses, crate::grading::FailedCourses::Counted);
    }

    #[test]
    fn test_initials() {
        let reg = InstitutionRegistry::default();
        assert_eq!(reg.find_by_name("abc university").unwrap().initials(), "AU");
        assert_eq!(
            reg.find_by_name("Sindh Madressatul Islam University").unwrap().initials(),
            "SMIU"
        );
    }

    #[test]
    fn test_rejects_unknown_scale_reference() {
        let mut cfg = RegistryConfig::default();
        cfg.institutions[0].grading_scale = Some("Imaginary".into());
        assert!(matches!(
            InstitutionRegistry::from_config(cfg),
            Err(RegistryError::UnknownScale { .. })
        ));
    }

    #[test]
    fn test_rejects_duplicate_wallets() {
        let mut cfg = RegistryConfig::default();
        let dup = cfg.institutions[0].clone();
        cfg.institutions.push(Institution {
            wallet: dup.wallet.to_lowercase(),
            ..dup
        });
        assert!(matches!(
            InstitutionRegistry::from_config(cfg),
            Err(RegistryError::DuplicateWallet(_))
        ));
    }

    #[test]
    fn test_rejects_missing_fallback() {
        let mut cfg = RegistryConfig::default();
        cfg.fallback_scale = "Nope".into();
        assert!(matches!(
            InstitutionRegistry::from_config(cfg),
            Err(RegistryError::UnknownFallback(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let json = r#"{
            "fallbackScale": "Flat",
            "scales": [{"name": "Flat", "tiers": [{"min_marks": 40, "points": 1.0}, {"min_marks": 80, "points": 4.0}]}],
            "institutions": [{"wallet": "W1", "name": "Test College"}]
        }"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let reg = InstitutionRegistry::load(file.path()).unwrap();
        assert_eq!(reg.institutions().len(), 1);
        assert!(!reg.institutions()[0].fee_exempt);
        let scale = reg.scale_for("Test College");
        assert_eq!(scale.tiers[0].min_marks, 80.0);
        assert_eq!(scale.grade_points(85.0), 4.0);
    }

    #[test]
    fn test_config_roundtrips_through_json() {
        let json = serde_json::to_string(&RegistryConfig::default()).unwrap();
        let reg = InstitutionRegistry::from_json_str(&json).unwrap();
        assert_eq!(reg.institutions().len(), 4);
    }
}
