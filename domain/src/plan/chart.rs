//! Chart specifications synthesized from described data points.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of chart rendered onto a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Bar,
    Line,
    Pie,
    Area,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Pie => "pie",
            ChartType::Area => "area",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bar" | "column" => Ok(ChartType::Bar),
            "line" => Ok(ChartType::Line),
            "pie" | "donut" => Ok(ChartType::Pie),
            "area" => Ok(ChartType::Area),
            _ => Err(DomainError::InvalidValue {
                field: "chart_type",
                value: s.to_string(),
            }),
        }
    }
}

/// A single described data point, as the planner's model supplies it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub label: String,
    pub value: f64,
    /// Series name; points without one belong to the default series.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
}

/// One named series of values aligned with [`ChartSpec::labels`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub name: String,
    pub values: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Render-ready chart configuration attached to a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub chart_type: ChartType,
    pub title: String,
    pub labels: Vec<String>,
    pub series: Vec<ChartSeries>,
}

const DEFAULT_SERIES: &str = "value";

impl ChartSpec {
    /// Build a chart from loose data points.
    ///
    /// Labels keep first-seen order. A series that has no point for some
    /// label gets `0.0` there so every series is aligned with `labels`.
    /// Series colors are taken from `palette` in order, cycling if needed.
    pub fn synthesize(
        chart_type: ChartType,
        title: impl Into<String>,
        points: &[DataPoint],
        palette: &[String],
    ) -> Result<Self, DomainError> {
        if points.is_empty() {
            return Err(DomainError::InvalidValue {
                field: "data_points",
                value: "empty".to_string(),
            });
        }
        if let Some(bad) = points.iter().find(|p| !p.value.is_finite()) {
            return Err(DomainError::InvalidValue {
                field: "data_points",
                value: format!("non-finite value for '{}'", bad.label),
            });
        }

        let mut labels: Vec<String> = Vec::new();
        let mut series_names: Vec<String> = Vec::new();
        for point in points {
            if !labels.contains(&point.label) {
                labels.push(point.label.clone());
            }
            let name = point.series.as_deref().unwrap_or(DEFAULT_SERIES);
            if !series_names.iter().any(|s| s == name) {
                series_names.push(name.to_string());
            }
        }

        if chart_type == ChartType::Pie {
            if series_names.len() > 1 {
                return Err(DomainError::InvalidValue {
                    field: "data_points",
                    value: "pie charts take a single series".to_string(),
                });
            }
            if points.iter().any(|p| p.value < 0.0) {
                return Err(DomainError::InvalidValue {
                    field: "data_points",
                    value: "pie charts cannot contain negative values".to_string(),
                });
            }
        }

        let series = series_names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let values = labels
                    .iter()
                    .map(|label| {
                        points
                            .iter()
                            .filter(|p| {
                                &p.label == label
                                    && p.series.as_deref().unwrap_or(DEFAULT_SERIES) == name
                            })
                            .map(|p| p.value)
                            .last()
                            .unwrap_or(0.0)
                    })
                    .collect();
                ChartSeries {
                    name: name.clone(),
                    values,
                    color: (!palette.is_empty()).then(|| palette[i % palette.len()].clone()),
                }
            })
            .collect();

        Ok(Self {
            chart_type,
            title: title.into(),
            labels,
            series,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(label: &str, value: f64, series: Option<&str>) -> DataPoint {
        DataPoint {
            label: label.to_string(),
            value,
            series: series.map(str::to_string),
        }
    }

    #[test]
    fn test_single_series_keeps_label_order() {
        let spec = ChartSpec::synthesize(
            ChartType::Bar,
            "Revenue",
            &[point("Q2", 20.0, None), point("Q1", 10.0, None)],
            &[],
        )
        .unwrap();
        assert_eq!(spec.labels, vec!["Q2", "Q1"]);
        assert_eq!(spec.series.len(), 1);
        assert_eq!(spec.series[0].values, vec![20.0, 10.0]);
        assert_eq!(spec.series[0].color, None);
    }

    #[test]
    fn test_multi_series_fills_missing_values() {
        let spec = ChartSpec::synthesize(
            ChartType::Line,
            "Users",
            &[
                point("2023", 5.0, Some("web")),
                point("2024", 8.0, Some("web")),
                point("2024", 3.0, Some("mobile")),
            ],
            &["#111111".to_string()],
        )
        .unwrap();
        assert_eq!(spec.series[1].name, "mobile");
        assert_eq!(spec.series[1].values, vec![0.0, 3.0]);
        assert_eq!(spec.series[1].color.as_deref(), Some("#111111"));
    }

    #[test]
    fn test_pie_rejects_multiple_series_and_negatives() {
        let multi = [point("a", 1.0, Some("x")), point("a", 2.0, Some("y"))];
        assert!(ChartSpec::synthesize(ChartType::Pie, "t", &multi, &[]).is_err());

        let negative = [point("a", -1.0, None)];
        assert!(ChartSpec::synthesize(ChartType::Pie, "t", &negative, &[]).is_err());
    }

    #[test]
    fn test_empty_points_rejected() {
        assert!(ChartSpec::synthesize(ChartType::Bar, "t", &[], &[]).is_err());
    }
}
