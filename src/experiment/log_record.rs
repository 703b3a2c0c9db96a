//! Log Record - tagged union over the three log kinds

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{DatasetRecord, MetricRecord, ParamRecord};
use crate::Error;

/// The three kinds of run logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    /// Overwrite-by-key scalar parameters
    Params,
    /// Append-only metrics
    Metrics,
    /// Overwrite-by-name dataset references
    Datasets,
}

impl LogKind {
    /// All kinds, in the fixed order logs are listed.
    pub const ALL: [Self; 3] = [Self::Params, Self::Metrics, Self::Datasets];

    /// Wire name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Params => "params",
            Self::Metrics => "metrics",
            Self::Datasets => "datasets",
        }
    }
}

impl FromStr for LogKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "params" => Ok(Self::Params),
            "metrics" => Ok(Self::Metrics),
            "datasets" => Ok(Self::Datasets),
            other => Err(Error::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a run's logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LogRecord {
    /// A parameter
    Param(ParamRecord),
    /// A metric data point
    Metric(MetricRecord),
    /// A dataset reference
    Dataset(DatasetRecord),
}

impl LogRecord {
    /// Which collection this entry belongs to.
    #[must_use]
    pub const fn kind(&self) -> LogKind {
        match self {
            Self::Param(_) => LogKind::Params,
            Self::Metric(_) => LogKind::Metrics,
            Self::Dataset(_) => LogKind::Datasets,
        }
    }

    /// Key of the entry within its collection.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Param(p) => p.name(),
            Self::Metric(m) => m.name(),
            Self::Dataset(d) => d.name(),
        }
    }

    /// Description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Param(p) => p.description(),
            Self::Metric(m) => m.description(),
            Self::Dataset(d) => d.description(),
        }
    }

    /// The param, if this is one.
    #[must_use]
    pub const fn as_param(&self) -> Option<&ParamRecord> {
        match self {
            Self::Param(p) => Some(p),
            _ => None,
        }
    }

    /// The metric, if this is one.
    #[must_use]
    pub const fn as_metric(&self) -> Option<&MetricRecord> {
        match self {
            Self::Metric(m) => Some(m),
            _ => None,
        }
    }

    /// The dataset, if this is one.
    #[must_use]
    pub const fn as_dataset(&self) -> Option<&DatasetRecord> {
        match self {
            Self::Dataset(d) => Some(d),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in LogKind::ALL {
            assert_eq!(kind.as_str().parse::<LogKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_kind() {
        let err = "artifacts".parse::<LogKind>().unwrap_err();
        assert!(matches!(err, Error::UnknownKind(ref k) if k == "artifacts"));
        assert!("Params".parse::<LogKind>().is_err());
    }

    #[test]
    fn test_log_record_accessors() {
        let record = LogRecord::Metric(MetricRecord::new("rval", 10.0, 4, "0"));
        assert_eq!(record.kind(), LogKind::Metrics);
        assert_eq!(record.name(), "rval");
        assert!(record.as_param().is_none());
        assert_eq!(record.as_metric().map(MetricRecord::step), Some(4));
    }
}
