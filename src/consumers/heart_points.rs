//! Heart points reduction
//!
//! Heart points accrue for time spent in heart-rate zones. Zone thresholds are a
//! percentage of maximum heart rate, or of heart-rate reserve when a resting heart
//! rate is configured. Time between two consecutive samples is credited to the zone
//! of the earlier sample; nothing is credited after the last sample.

use crate::error::PipelineError;
use crate::types::Stream;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Upper bound accepted for a configured maximum heart rate (bpm)
const MAX_HEART_RATE_LIMIT: u16 = 250;

/// Age-based estimate: `220 - age`
const AGE_FORMULA_BASE: u16 = 220;

const MAX_AGE: u16 = 120;

const MS_PER_MINUTE: f64 = 60_000.0;

/// A heart-rate zone defined relative to maximum heart rate (or reserve)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSpec {
    pub name: String,
    /// Lower bound as a fraction of max HR (or HR reserve), exclusive range (0, 1)
    pub threshold_pct: f64,
    pub points_per_minute: f64,
}

impl ZoneSpec {
    pub fn new(name: &str, threshold_pct: f64, points_per_minute: f64) -> Self {
        Self {
            name: name.to_string(),
            threshold_pct,
            points_per_minute,
        }
    }
}

/// Reducer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartPointsConfig {
    /// Explicit maximum heart rate; takes precedence over `age`
    pub max_heart_rate_override: Option<u16>,
    /// Age in years, used to estimate maximum heart rate
    pub age: Option<u16>,
    /// Resting heart rate; switches thresholds to heart-rate reserve
    pub resting_heart_rate: Option<u16>,
    /// Zones in ascending threshold order
    pub zones: Vec<ZoneSpec>,
}

impl Default for HeartPointsConfig {
    fn default() -> Self {
        Self {
            max_heart_rate_override: None,
            age: None,
            resting_heart_rate: None,
            zones: Self::default_zones(),
        }
    }
}

impl HeartPointsConfig {
    pub fn with_max_heart_rate(max_heart_rate: u16) -> Self {
        Self {
            max_heart_rate_override: Some(max_heart_rate),
            ..Default::default()
        }
    }

    pub fn with_age(age: u16) -> Self {
        Self {
            age: Some(age),
            ..Default::default()
        }
    }

    /// Moderate (60 %, 1 point/min) and vigorous (70 %, 2 points/min)
    pub fn default_zones() -> Vec<ZoneSpec> {
        vec![
            ZoneSpec::new("moderate", 0.6, 1.0),
            ZoneSpec::new("vigorous", 0.7, 2.0),
        ]
    }

    /// Default zones plus extra-vigorous (85 %, 3 points/min)
    pub fn three_tier_zones() -> Vec<ZoneSpec> {
        let mut zones = Self::default_zones();
        zones.push(ZoneSpec::new("extra_vigorous", 0.85, 3.0));
        zones
    }

    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Maximum heart rate from the override or the age estimate
    pub fn max_heart_rate(&self) -> Result<u16, PipelineError> {
        match (self.max_heart_rate_override, self.age) {
            (Some(max), _) => {
                if max == 0 || max > MAX_HEART_RATE_LIMIT {
                    return Err(PipelineError::Config(format!(
                        "max_heart_rate_override must be within 1..={MAX_HEART_RATE_LIMIT}, got {max}"
                    )));
                }
                Ok(max)
            }
            (None, Some(age)) => {
                if age == 0 || age > MAX_AGE {
                    return Err(PipelineError::Config(format!(
                        "age must be within 1..={MAX_AGE}, got {age}"
                    )));
                }
                Ok(AGE_FORMULA_BASE - age)
            }
            (None, None) => Err(PipelineError::Config(
                "either max_heart_rate_override or age is required".to_string(),
            )),
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        self.thresholds().map(|_| ())
    }

    /// Validate the configuration and compute absolute zone thresholds
    pub fn thresholds(&self) -> Result<Vec<ZoneThreshold>, PipelineError> {
        let max = f64::from(self.max_heart_rate()?);

        let resting = match self.resting_heart_rate {
            Some(rest) if rest == 0 || f64::from(rest) >= max => {
                return Err(PipelineError::Config(format!(
                    "resting_heart_rate must be within 1..{max}, got {rest}"
                )))
            }
            Some(rest) => f64::from(rest),
            None => 0.0,
        };

        if self.zones.is_empty() {
            return Err(PipelineError::Config("at least one zone is required".to_string()));
        }

        let mut previous_pct = 0.0;
        let mut thresholds = Vec::with_capacity(self.zones.len());
        for zone in &self.zones {
            if !(zone.threshold_pct > 0.0 && zone.threshold_pct < 1.0) {
                return Err(PipelineError::Config(format!(
                    "zone '{}' threshold_pct must be within (0, 1), got {}",
                    zone.name, zone.threshold_pct
                )));
            }
            if zone.threshold_pct <= previous_pct {
                return Err(PipelineError::Config(format!(
                    "zone '{}' must have a higher threshold than the zone before it",
                    zone.name
                )));
            }
            if !(zone.points_per_minute.is_finite() && zone.points_per_minute >= 0.0) {
                return Err(PipelineError::Config(format!(
                    "zone '{}' points_per_minute must be a non-negative number",
                    zone.name
                )));
            }
            previous_pct = zone.threshold_pct;

            thresholds.push(ZoneThreshold {
                name: zone.name.clone(),
                min_bpm: resting + zone.threshold_pct * (max - resting),
                points_per_minute: zone.points_per_minute,
            });
        }

        Ok(thresholds)
    }
}

/// A zone with its absolute lower bound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneThreshold {
    pub name: String,
    pub min_bpm: f64,
    pub points_per_minute: f64,
}

/// Time and points credited to one zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneTally {
    pub name: String,
    pub min_bpm: f64,
    pub minutes: f64,
    pub points: f64,
}

/// Heart points for one stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartPointsResult {
    pub total_points: f64,
    pub zones: Vec<ZoneTally>,
    /// Minutes spent below the lowest zone
    pub unzoned_minutes: f64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub calories: Option<u32>,
}

impl HeartPointsResult {
    /// Total rounded to whole points
    pub fn rounded_points(&self) -> u64 {
        self.total_points.round() as u64
    }
}

/// Validated heart points reducer
#[derive(Debug, Clone)]
pub struct HeartPoints {
    thresholds: Vec<ZoneThreshold>,
}

impl HeartPoints {
    pub fn new(config: &HeartPointsConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            thresholds: config.thresholds()?,
        })
    }

    pub fn thresholds(&self) -> &[ZoneThreshold] {
        &self.thresholds
    }

    /// Highest zone whose threshold `heart_rate` reaches
    pub fn zone_of(&self, heart_rate: u16) -> Option<usize> {
        let bpm = f64::from(heart_rate);
        self.thresholds.iter().rposition(|z| bpm >= z.min_bpm)
    }

    /// Fold a stream into heart points. An empty stream is an error, not zero.
    pub fn reduce(&self, stream: &Stream) -> Result<HeartPointsResult, PipelineError> {
        let (Some(start), Some(end)) = (stream.start(), stream.end()) else {
            return Err(PipelineError::EmptyStream);
        };

        let mut zones: Vec<ZoneTally> = self
            .thresholds
            .iter()
            .map(|z| ZoneTally {
                name: z.name.clone(),
                min_bpm: z.min_bpm,
                minutes: 0.0,
                points: 0.0,
            })
            .collect();
        let mut unzoned_minutes = 0.0;

        for pair in stream.samples().windows(2) {
            let minutes = (pair[1].timestamp - pair[0].timestamp).num_milliseconds() as f64
                / MS_PER_MINUTE;
            match self.zone_of(pair[0].heart_rate) {
                Some(index) => {
                    zones[index].minutes += minutes;
                    zones[index].points += minutes * self.thresholds[index].points_per_minute;
                }
                None => unzoned_minutes += minutes,
            }
        }

        let total_points = zones.iter().map(|z| z.points).sum();
        debug!(total_points, samples = stream.len(), "reduced heart points");

        Ok(HeartPointsResult {
            total_points,
            zones,
            unzoned_minutes,
            start,
            end,
            calories: stream.meta().calories,
        })
    }
}

/// Compute heart points for `stream` under `config`
pub fn heart_points(
    stream: &Stream,
    config: &HeartPointsConfig,
) -> Result<HeartPointsResult, PipelineError> {
    HeartPoints::new(config)?.reduce(stream)
}
