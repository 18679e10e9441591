use crate::{
    color::{ColorMetric, Rgb},
    error::ConfigError,
    region::RegionOfInterest,
};
use serde::{Deserialize, Serialize};

/// Options for redline detection. Deserializes from partial JSON, missing keys take
/// the `density` defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    pub marker_color: Rgb,
    pub metric: ColorMetric,
    pub color_tolerance: f64,
    pub match_threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_blob_size: Option<u64>,
    pub region: RegionOfInterest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_rows: Option<u32>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::density()
    }
}

impl FilterConfig {
    /// Flags pages whose share of near-red pixels reaches 0.1%.
    pub fn density() -> Self {
        Self {
            marker_color: Rgb::RED,
            metric: ColorMetric::Chebyshev,
            color_tolerance: 96.0,
            match_threshold: 0.001,
            min_blob_size: None,
            region: RegionOfInterest::FULL,
            top_rows: None,
        }
    }

    /// Flags pages where a clearly red stroke reaches the top rows of the upper quarter of
    /// the chart, i.e. the score line hitting the plot ceiling.
    pub fn touch_top() -> Self {
        Self {
            marker_color: Rgb::RED,
            metric: ColorMetric::Dominance,
            color_tolerance: 224.0,
            match_threshold: 0.0,
            min_blob_size: None,
            region: RegionOfInterest {
                left: 0.05,
                top: 0.0,
                right: 0.95,
                bottom: 0.25,
            },
            top_rows: Some(6),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let max = self.metric.max_distance();
        if !(0.0..=max).contains(&self.color_tolerance) {
            return Err(ConfigError::Tolerance {
                value: self.color_tolerance,
                max,
                metric: self.metric,
            });
        }
        if !(0.0..=1.0).contains(&self.match_threshold) {
            return Err(ConfigError::Threshold(self.match_threshold));
        }
        if self.min_blob_size == Some(0) {
            return Err(ConfigError::MinBlobSize);
        }
        if self.top_rows == Some(0) {
            return Err(ConfigError::TopRows);
        }
        self.region.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        assert_eq!(FilterConfig::density().validate(), Ok(()));
        assert_eq!(FilterConfig::touch_top().validate(), Ok(()));
    }

    #[test]
    fn tolerance_range_depends_on_metric() {
        let mut config = FilterConfig {
            color_tolerance: 300.0,
            ..FilterConfig::density()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Tolerance { .. })
        ));
        config.metric = ColorMetric::Euclidean;
        assert_eq!(config.validate(), Ok(()));
        config.color_tolerance = -1.0;
        assert!(config.validate().is_err());
        config.color_tolerance = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn threshold_outside_unit_interval_is_rejected() {
        for threshold in [-0.1, 1.01, f64::NAN] {
            let config = FilterConfig {
                match_threshold: threshold,
                ..FilterConfig::density()
            };
            assert!(matches!(config.validate(), Err(ConfigError::Threshold(_))));
        }
    }

    #[test]
    fn zero_blob_size_and_top_rows_are_rejected() {
        let config = FilterConfig {
            min_blob_size: Some(0),
            ..FilterConfig::density()
        };
        assert_eq!(config.validate(), Err(ConfigError::MinBlobSize));
        let config = FilterConfig {
            top_rows: Some(0),
            ..FilterConfig::density()
        };
        assert_eq!(config.validate(), Err(ConfigError::TopRows));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: FilterConfig =
            serde_json::from_str(r##"{"marker_color": "#CC0000", "match_threshold": 0.02}"##)
                .unwrap();
        assert_eq!(config.marker_color, Rgb::new(204, 0, 0));
        assert_eq!(config.match_threshold, 0.02);
        assert_eq!(config.metric, ColorMetric::Chebyshev);
        assert_eq!(config.region, RegionOfInterest::FULL);
    }

    #[test]
    fn unknown_json_keys_are_rejected() {
        let res: Result<FilterConfig, _> = serde_json::from_str(r##"{"colour": "#CC0000"}"##);
        assert!(res.is_err());
    }
}
