//! Run options and their defaulting rules

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Time windows used by the date feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tolerances {
    /// Differences up to this many minutes count as the same moment
    pub exact_time_minutes: u32,
    /// Differences up to this many hours count as a close match
    pub fuzzy_time_hours: u32,
    /// Differences beyond this many days score nothing
    pub max_time_days: u32,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            exact_time_minutes: 5,
            fuzzy_time_hours: 2,
            max_time_days: 7,
        }
    }
}

impl Tolerances {
    pub fn exact(&self) -> Duration {
        Duration::minutes(i64::from(self.exact_time_minutes))
    }

    pub fn fuzzy(&self) -> Duration {
        Duration::hours(i64::from(self.fuzzy_time_hours))
    }

    pub fn max(&self) -> Duration {
        Duration::days(i64::from(self.max_time_days))
    }
}

/// Confidence cut-offs used by the decision classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    pub min_confidence_for_auto_link: u8,
    pub min_confidence_for_manual_review: u8,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_confidence_for_auto_link: 80,
            min_confidence_for_manual_review: 40,
        }
    }
}

/// Fully populated options for one reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationOptions {
    pub tolerances: Tolerances,
    pub thresholds: Thresholds,
    /// Compute and report decisions without writing links
    pub dry_run: bool,
    /// Recognized but not consulted by scoring.
    pub allow_amount_only_matching: bool,
    /// Recognized but not consulted by scoring.
    pub allow_date_range_matching: bool,
    /// Recognized but not consulted by scoring.
    pub allow_partial_matching: bool,
}

/// Options as supplied by a caller; unset fields fall back to defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReconciliationOptionsInput {
    pub exact_time_tolerance: Option<u32>,
    pub fuzzy_time_tolerance: Option<u32>,
    pub max_time_tolerance: Option<u32>,
    pub min_confidence_for_auto_link: Option<u8>,
    pub min_confidence_for_manual_review: Option<u8>,
    pub dry_run: Option<bool>,
    pub allow_amount_only_matching: Option<bool>,
    pub allow_date_range_matching: Option<bool>,
    pub allow_partial_matching: Option<bool>,
}

impl ReconciliationOptionsInput {
    /// Shorthand for a dry run with every other option defaulted
    pub fn dry_run() -> Self {
        Self {
            dry_run: Some(true),
            ..Default::default()
        }
    }

    /// Merge the supplied values over the defaults and validate the result
    pub fn resolve(&self) -> ReconResult<ReconciliationOptions> {
        let defaults = ReconciliationOptions::default();
        let options = ReconciliationOptions {
            tolerances: Tolerances {
                exact_time_minutes: self
                    .exact_time_tolerance
                    .unwrap_or(defaults.tolerances.exact_time_minutes),
                fuzzy_time_hours: self
                    .fuzzy_time_tolerance
                    .unwrap_or(defaults.tolerances.fuzzy_time_hours),
                max_time_days: self
                    .max_time_tolerance
                    .unwrap_or(defaults.tolerances.max_time_days),
            },
            thresholds: Thresholds {
                min_confidence_for_auto_link: self
                    .min_confidence_for_auto_link
                    .unwrap_or(defaults.thresholds.min_confidence_for_auto_link),
                min_confidence_for_manual_review: self
                    .min_confidence_for_manual_review
                    .unwrap_or(defaults.thresholds.min_confidence_for_manual_review),
            },
            dry_run: self.dry_run.unwrap_or(defaults.dry_run),
            allow_amount_only_matching: self
                .allow_amount_only_matching
                .unwrap_or(defaults.allow_amount_only_matching),
            allow_date_range_matching: self
                .allow_date_range_matching
                .unwrap_or(defaults.allow_date_range_matching),
            allow_partial_matching: self
                .allow_partial_matching
                .unwrap_or(defaults.allow_partial_matching),
        };
        options.validate()?;
        Ok(options)
    }
}

impl ReconciliationOptions {
    /// Check that thresholds and tolerances are coherent
    pub fn validate(&self) -> ReconResult<()> {
        let thresholds = &self.thresholds;
        if thresholds.min_confidence_for_auto_link > 100
            || thresholds.min_confidence_for_manual_review > 100
        {
            return Err(ReconError::InvalidOptions(
                "Confidence thresholds cannot exceed 100".to_string(),
            ));
        }

        if thresholds.min_confidence_for_manual_review > thresholds.min_confidence_for_auto_link {
            return Err(ReconError::InvalidOptions(format!(
                "Manual review threshold ({}) cannot exceed auto-link threshold ({})",
                thresholds.min_confidence_for_manual_review,
                thresholds.min_confidence_for_auto_link
            )));
        }

        let tolerances = &self.tolerances;
        if tolerances.exact() > tolerances.fuzzy() || tolerances.fuzzy() > tolerances.max() {
            return Err(ReconError::InvalidOptions(format!(
                "Time tolerances must widen: {} min, {} h, {} d",
                tolerances.exact_time_minutes,
                tolerances.fuzzy_time_hours,
                tolerances.max_time_days
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults() {
        let options = ReconciliationOptionsInput::default().resolve().unwrap();
        assert_eq!(options.tolerances.exact_time_minutes, 5);
        assert_eq!(options.tolerances.fuzzy_time_hours, 2);
        assert_eq!(options.tolerances.max_time_days, 7);
        assert_eq!(options.thresholds.min_confidence_for_auto_link, 80);
        assert_eq!(options.thresholds.min_confidence_for_manual_review, 40);
        assert!(!options.dry_run);
        assert!(!options.allow_partial_matching);
    }

    #[test]
    fn test_resolve_overrides_only_supplied_fields() {
        let input = ReconciliationOptionsInput {
            min_confidence_for_auto_link: Some(90),
            dry_run: Some(true),
            ..Default::default()
        };
        let options = input.resolve().unwrap();
        assert_eq!(options.thresholds.min_confidence_for_auto_link, 90);
        assert_eq!(options.thresholds.min_confidence_for_manual_review, 40);
        assert!(options.dry_run);
    }

    #[test]
    fn test_resolve_rejects_incoherent_values() {
        let inverted = ReconciliationOptionsInput {
            min_confidence_for_auto_link: Some(30),
            ..Default::default()
        };
        assert!(matches!(
            inverted.resolve(),
            Err(ReconError::InvalidOptions(_))
        ));

        let too_high = ReconciliationOptionsInput {
            min_confidence_for_auto_link: Some(101),
            ..Default::default()
        };
        assert!(too_high.resolve().is_err());

        // 200 minutes is wider than the 2 hour fuzzy window
        let narrowing = ReconciliationOptionsInput {
            exact_time_tolerance: Some(200),
            ..Default::default()
        };
        assert!(narrowing.resolve().is_err());
    }

    #[test]
    fn test_input_uses_documented_names_and_rejects_unknown_keys() {
        let input: ReconciliationOptionsInput =
            serde_json::from_str(r#"{"exactTimeTolerance": 10, "dryRun": true}"#).unwrap();
        assert_eq!(input.exact_time_tolerance, Some(10));
        assert_eq!(input.dry_run, Some(true));

        let unknown =
            serde_json::from_str::<ReconciliationOptionsInput>(r#"{"minConfidence": 50}"#);
        assert!(unknown.is_err());
    }
}
