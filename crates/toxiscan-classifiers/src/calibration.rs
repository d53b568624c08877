//! Probability calibration and the toxic / not-toxic decision
//!
//! The trained classifier is poorly separated: raw toxic-class probabilities
//! for real comments cluster in roughly `[0.44, 0.50]`. A calibration
//! strategy re-expresses the raw probability as a display probability that a
//! person can read, and the decision is always taken from that display value
//! so the label and the number shown next to it can never disagree.
//!
//! | Strategy          | Default | Notes                                   |
//! |-------------------|---------|-----------------------------------------|
//! | [`RangeStretch`]  | yes     | Piecewise linear, bands 0.1/0.2/0.8/0.9 |
//! | [`Identity`]      | no      | Raw probability unchanged               |
//! | [`LinearAmplify`] | no      | Distance from 0.5 times a factor        |
//! | [`SqrtAmplify`]   | no      | Square-root stretch away from 0.5       |
//! | [`SigmoidAmplify`]| no      | Logistic curve centred on the band      |
//!
//! Every strategy is monotonic and bounded to `[0, 1]`.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use toxiscan_core::{Error, Result};

/// Minimum separation between the range-stretch bounds
pub const MIN_BAND_WIDTH: f64 = 0.001;

/// Display probability above which a text is labelled toxic
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Calibrated outcome for one raw probability
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Probability reported by the classifier
    pub raw_probability: f64,

    /// Rescaled toxic-class probability, in `[0, 1]`
    pub display_probability: f64,

    /// `1 - display_probability`
    pub complement_probability: f64,

    /// `display_probability > 0.5`
    pub is_toxic: bool,

    /// `max(display_probability, complement_probability)`, in `[0.5, 1]`
    pub confidence: f64,
}

impl Decision {
    /// Derive every field from the display probability
    pub fn from_display(raw_probability: f64, display_probability: f64) -> Self {
        let display_probability = display_probability.clamp(0.0, 1.0);
        let complement_probability = 1.0 - display_probability;

        Self {
            raw_probability,
            display_probability,
            complement_probability,
            is_toxic: display_probability > DECISION_THRESHOLD,
            confidence: display_probability.max(complement_probability),
        }
    }
}

/// Maps a raw toxic-class probability to a [`Decision`]
pub trait CalibrationStrategy: Send + Sync {
    /// Calibrate `raw` and decide.
    ///
    /// Fails with [`Error::InvalidArgument`] when `raw` is not a finite value in `[0, 1]`.
    fn decide(&self, raw: f64) -> Result<Decision>;

    /// Strategy name, reported in logs and `/health`
    fn name(&self) -> &'static str;
}

fn check_raw(raw: f64) -> Result<()> {
    if !raw.is_finite() || !(0.0..=1.0).contains(&raw) {
        return Err(Error::invalid_argument(format!(
            "raw probability must be a finite value in [0, 1], got {}",
            raw
        )));
    }
    Ok(())
}

/// Piecewise-linear stretch of the ambiguous `[low, high]` band.
///
/// - below `low_bound`: `[0.10, 0.20)`
/// - inside the band: `[0.20, 0.80]`
/// - above `high_bound`: `(0.80, 0.90]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RangeStretch {
    low_bound: f64,
    high_bound: f64,
}

impl RangeStretch {
    pub const DEFAULT_LOW: f64 = 0.44;
    pub const DEFAULT_HIGH: f64 = 0.48;

    /// Create a range-stretch strategy.
    ///
    /// Requires `0 < low_bound`, `high_bound < 1` and
    /// `high_bound - low_bound >= MIN_BAND_WIDTH`.
    pub fn new(low_bound: f64, high_bound: f64) -> Result<Self> {
        if !low_bound.is_finite() || !high_bound.is_finite() {
            return Err(Error::config("calibration bounds must be finite"));
        }
        if low_bound <= 0.0 || high_bound >= 1.0 {
            return Err(Error::config(format!(
                "calibration bounds must satisfy 0 < low < high < 1, got low={} high={}",
                low_bound, high_bound
            )));
        }
        if high_bound - low_bound < MIN_BAND_WIDTH {
            return Err(Error::config(format!(
                "calibration bounds must be at least {} apart, got low={} high={}",
                MIN_BAND_WIDTH, low_bound, high_bound
            )));
        }

        Ok(Self {
            low_bound,
            high_bound,
        })
    }

    pub fn low_bound(&self) -> f64 {
        self.low_bound
    }

    pub fn high_bound(&self) -> f64 {
        self.high_bound
    }

    fn stretch(&self, raw: f64) -> f64 {
        if raw < self.low_bound {
            0.10 + (raw / self.low_bound) * 0.10
        } else if raw > self.high_bound {
            (0.80 + ((raw - self.high_bound) / (1.0 - self.high_bound)) * 0.10).min(0.90)
        } else {
            0.20 + ((raw - self.low_bound) / (self.high_bound - self.low_bound)) * 0.60
        }
    }
}

impl Default for RangeStretch {
    fn default() -> Self {
        Self {
            low_bound: Self::DEFAULT_LOW,
            high_bound: Self::DEFAULT_HIGH,
        }
    }
}

impl CalibrationStrategy for RangeStretch {
    fn decide(&self, raw: f64) -> Result<Decision> {
        check_raw(raw)?;
        Ok(Decision::from_display(raw, self.stretch(raw)))
    }

    fn name(&self) -> &'static str {
        "range_stretch"
    }
}

/// Passthrough: the display probability is the raw probability
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity;

impl CalibrationStrategy for Identity {
    fn decide(&self, raw: f64) -> Result<Decision> {
        check_raw(raw)?;
        Ok(Decision::from_display(raw, raw))
    }

    fn name(&self) -> &'static str {
        "identity"
    }
}

/// Linear amplification of the distance from 0.5, clamped to `[floor, ceiling]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearAmplify {
    factor: f64,
    floor: f64,
    ceiling: f64,
}

impl LinearAmplify {
    pub fn new(factor: f64, floor: f64, ceiling: f64) -> Result<Self> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(Error::config(format!(
                "amplification factor must be positive, got {}",
                factor
            )));
        }
        if !(0.0..DECISION_THRESHOLD).contains(&floor)
            || !(ceiling > DECISION_THRESHOLD && ceiling <= 1.0)
        {
            return Err(Error::config(format!(
                "amplification clamp must satisfy 0 <= floor < 0.5 < ceiling <= 1, got [{}, {}]",
                floor, ceiling
            )));
        }
        Ok(Self {
            factor,
            floor,
            ceiling,
        })
    }
}

impl Default for LinearAmplify {
    fn default() -> Self {
        Self {
            factor: 3.0,
            floor: 0.10,
            ceiling: 0.90,
        }
    }
}

impl CalibrationStrategy for LinearAmplify {
    fn decide(&self, raw: f64) -> Result<Decision> {
        check_raw(raw)?;
        let display = (0.5 + (raw - 0.5) * self.factor).clamp(self.floor, self.ceiling);
        Ok(Decision::from_display(raw, display))
    }

    fn name(&self) -> &'static str {
        "linear_amplify"
    }
}

/// Square-root stretch: `0.5 ± 0.5·sqrt(|raw - 0.5| / 0.5)`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SqrtAmplify;

impl CalibrationStrategy for SqrtAmplify {
    fn decide(&self, raw: f64) -> Result<Decision> {
        check_raw(raw)?;
        let distance = raw - 0.5;
        let display = 0.5 + distance.signum() * (distance.abs() / 0.5).sqrt() * 0.5;
        Ok(Decision::from_display(raw, display))
    }

    fn name(&self) -> &'static str {
        "sqrt_amplify"
    }
}

/// Logistic curve `1 / (1 + exp(-steepness·(raw - center)))`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SigmoidAmplify {
    steepness: f64,
    center: f64,
}

impl SigmoidAmplify {
    pub fn new(steepness: f64, center: f64) -> Result<Self> {
        if !(steepness.is_finite() && steepness > 0.0) {
            return Err(Error::config(format!(
                "sigmoid steepness must be positive, got {}",
                steepness
            )));
        }
        if !(center.is_finite() && center > 0.0 && center < 1.0) {
            return Err(Error::config(format!(
                "sigmoid center must be in (0, 1), got {}",
                center
            )));
        }
        Ok(Self { steepness, center })
    }
}

impl Default for SigmoidAmplify {
    fn default() -> Self {
        Self {
            steepness: 40.0,
            center: 0.46,
        }
    }
}

impl CalibrationStrategy for SigmoidAmplify {
    fn decide(&self, raw: f64) -> Result<Decision> {
        check_raw(raw)?;
        let display = 1.0 / (1.0 + (-self.steepness * (raw - self.center)).exp());
        Ok(Decision::from_display(raw, display))
    }

    fn name(&self) -> &'static str {
        "sigmoid_amplify"
    }
}

/// Calibration strategy selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum CalibrationConfig {
    RangeStretch {
        #[serde(default = "default_low_bound")]
        low_bound: f64,
        #[serde(default = "default_high_bound")]
        high_bound: f64,
    },
    Identity,
    LinearAmplify {
        #[serde(default = "default_factor")]
        factor: f64,
        #[serde(default = "default_floor")]
        floor: f64,
        #[serde(default = "default_ceiling")]
        ceiling: f64,
    },
    SqrtAmplify,
    SigmoidAmplify {
        #[serde(default = "default_steepness")]
        steepness: f64,
        #[serde(default = "default_center")]
        center: f64,
    },
}

fn default_low_bound() -> f64 {
    RangeStretch::DEFAULT_LOW
}

fn default_high_bound() -> f64 {
    RangeStretch::DEFAULT_HIGH
}

fn default_factor() -> f64 {
    3.0
}

fn default_floor() -> f64 {
    0.10
}

fn default_ceiling() -> f64 {
    0.90
}

fn default_steepness() -> f64 {
    40.0
}

fn default_center() -> f64 {
    0.46
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self::RangeStretch {
            low_bound: default_low_bound(),
            high_bound: default_high_bound(),
        }
    }
}

impl CalibrationConfig {
    /// Validate and build the configured strategy
    pub fn build(&self) -> Result<Arc<dyn CalibrationStrategy>> {
        Ok(match *self {
            Self::RangeStretch {
                low_bound,
                high_bound,
            } => Arc::new(RangeStretch::new(low_bound, high_bound)?),
            Self::Identity => Arc::new(Identity),
            Self::LinearAmplify {
                factor,
                floor,
                ceiling,
            } => Arc::new(LinearAmplify::new(factor, floor, ceiling)?),
            Self::SqrtAmplify => Arc::new(SqrtAmplify),
            Self::SigmoidAmplify { steepness, center } => {
                Arc::new(SigmoidAmplify::new(steepness, center)?)
            }
        })
    }
}
