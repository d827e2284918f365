//! Radar charts comparing a record's statistics against population bounds.

use std::f64::consts::PI;

use plotters::coord::Shift;
use plotters::prelude::*;
use serde::Deserialize;
use tracing::debug;

use crate::config::deserialize_ordered;
use crate::dataset::Dataset;
use crate::preprocess::{adjust_per_90, quantile};
use crate::record::{find_record, RecordIndex, IDENTIFIER_COLUMNS};
use crate::vis::{VisError, RADAR_COLOURS};

pub const POSITION: &str = "position";

/// Quantile used for bounds that the configuration leaves out.
pub const AUTO_ALPHA: f64 = 0.05;

const RINGS: usize = 5;
/// Fraction of the radius left empty at the centre, so that the lowest values stay visible.
const HUB: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RadarStat {
    pub display: String,
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub lower_is_better: bool,
    /// Converts the statistic to a per-90-minute rate before plotting.
    #[serde(default)]
    pub normalize: bool,
}

/// The statistics on a radar, in drawing order (clockwise from the top).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RadarConfig {
    #[serde(deserialize_with = "deserialize_ordered")]
    pub columns: Vec<(String, RadarStat)>,
}

/// The `alpha` and `1 - alpha` quantiles of `column` among rows whose position starts with
/// `position`, such as the 10th and 90th percentiles for `alpha = 0.1`. `NaN` bounds signal
/// that no row matched.
pub fn estimate_limits_by_position(
    data: &Dataset,
    column: &str,
    position: &str,
    alpha: f64,
) -> Result<(f64, f64), VisError> {
    let positions = &data.column(POSITION)?.values;
    let values = data.numeric(column)?;
    let matching: Vec<_> = values
        .into_iter()
        .zip(positions)
        .filter(|(_, value)| value.as_str().map_or(false, |text| text.starts_with(position)))
        .map(|(value, _)| value)
        .collect();
    Ok((quantile(&matching, alpha), quantile(&matching, 1.0 - alpha)))
}

#[derive(Debug, Clone, PartialEq)]
pub struct RadarAxis {
    pub label: String,
    pub low: f64,
    pub high: f64,
    pub lower_is_better: bool,
}
impl RadarAxis {
    /// Where `value` sits between the bounds, in `[0, 1]`, with 1 always the better end.
    pub fn position(&self, value: f64) -> f64 {
        let fraction = if self.high > self.low {
            ((value - self.low) / (self.high - self.low)).clamp(0.0, 1.0)
        } else {
            0.5
        };
        if self.lower_is_better {
            1.0 - fraction
        } else {
            fraction
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RadarTrace {
    pub name: String,
    pub values: Vec<f64>,
}

/// Everything needed to draw a radar, resolved from a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct RadarChart {
    pub axes: Vec<RadarAxis>,
    pub subject: RadarTrace,
    pub compare: Option<RadarTrace>,
}
impl RadarChart {
    /// Resolves the configured statistics for the record at `index` and, optionally, a second
    /// record to compare against. Bounds left out of the configuration are taken from the
    /// population's [AUTO_ALPHA] quantiles, after any per-90 normalisation.
    pub fn prepare(
        data: &Dataset,
        config: &RadarConfig,
        index: &RecordIndex,
        compare: Option<&RecordIndex>,
    ) -> Result<Self, VisError> {
        if config.columns.is_empty() {
            return Err(VisError::Empty);
        }
        let normalize: Vec<_> = config
            .columns
            .iter()
            .filter(|(_, stat)| stat.normalize)
            .map(|(column, _)| column.as_str())
            .collect();
        let normalized;
        let data = if normalize.is_empty() {
            data
        } else {
            normalized = adjust_per_90(data, &normalize)?;
            &normalized
        };

        let mut axes = Vec::with_capacity(config.columns.len());
        let mut columns = Vec::with_capacity(config.columns.len());
        for (column, stat) in &config.columns {
            let values = data.numeric(column)?;
            let low = stat.low.unwrap_or_else(|| quantile(&values, AUTO_ALPHA));
            let high = stat.high.unwrap_or_else(|| quantile(&values, 1.0 - AUTO_ALPHA));
            debug!("radar axis {column}: [{low}, {high}]");
            axes.push(RadarAxis {
                label: stat.display.clone(),
                low,
                high,
                lower_is_better: stat.lower_is_better,
            });
            columns.push(values);
        }

        let trace = |index: &RecordIndex| -> Result<RadarTrace, VisError> {
            let row = find_record(data, index)?;
            Ok(RadarTrace {
                name: record_name(data, row).unwrap_or_else(|| index.to_string()),
                values: columns.iter().map(|values| values[row]).collect(),
            })
        };
        Ok(Self {
            subject: trace(index)?,
            compare: compare.map(&trace).transpose()?,
            axes,
        })
    }

    fn vertex(&self, axis: usize, radius: f64) -> (f64, f64) {
        let angle = PI / 2.0 - 2.0 * PI * axis as f64 / self.axes.len() as f64;
        (radius * angle.cos(), radius * angle.sin())
    }

    fn outline(&self, trace: &RadarTrace) -> Vec<(f64, f64)> {
        self.axes
            .iter()
            .zip(&trace.values)
            .enumerate()
            .map(|(index, (axis, &value))| {
                self.vertex(index, HUB + (1.0 - HUB) * axis.position(value))
            })
            .collect()
    }

    pub fn draw<DB: DrawingBackend>(&self, area: &DrawingArea<DB, Shift>) -> Result<(), VisError> {
        let caption = match &self.compare {
            Some(compare) => format!("{} vs {}", self.subject.name, compare.name),
            None => self.subject.name.clone(),
        };
        let mut chart = ChartBuilder::on(area)
            .caption(caption, ("sans-serif", 24))
            .margin(20)
            .build_cartesian_2d(-1.4..1.4, -1.4..1.4)?;

        for ring in (1..=RINGS).rev() {
            let radius = HUB + (1.0 - HUB) * ring as f64 / RINGS as f64;
            let vertices: Vec<_> = (0..self.axes.len()).map(|axis| self.vertex(axis, radius)).collect();
            let fill = RADAR_COLOURS[ring % 2];
            chart.draw_series(std::iter::once(Polygon::new(vertices, fill.filled())))?;
        }
        for axis in 0..self.axes.len() {
            chart.draw_series(std::iter::once(PathElement::new(
                vec![self.vertex(axis, HUB), self.vertex(axis, 1.0)],
                BLACK.mix(0.3).stroke_width(1),
            )))?;
        }

        let traces = [
            Some((&self.subject, RADAR_COLOURS[2])),
            self.compare.as_ref().map(|compare| (compare, RADAR_COLOURS[3])),
        ];
        for (trace, colour) in traces.into_iter().flatten() {
            let outline = self.outline(trace);
            chart.draw_series(std::iter::once(Polygon::new(outline.clone(), colour.mix(0.5).filled())))?;
            let mut closed = outline;
            if let Some(&first) = closed.first() {
                closed.push(first);
            }
            chart.draw_series(LineSeries::new(closed, colour.stroke_width(2)))?;
        }

        let label_font = ("sans-serif", 14).into_font();
        let range_font = ("sans-serif", 10).into_font().color(&BLACK.mix(0.6));
        for (index, axis) in self.axes.iter().enumerate() {
            let (worst, best) = if axis.lower_is_better {
                (axis.high, axis.low)
            } else {
                (axis.low, axis.high)
            };
            chart.draw_series([
                Text::new(axis.label.clone(), self.vertex(index, 1.2), label_font.clone()),
                Text::new(format!("{worst:.2}"), self.vertex(index, HUB), range_font.clone()),
                Text::new(format!("{best:.2}"), self.vertex(index, 1.0), range_font.clone()),
            ])?;
        }
        Ok(())
    }
}

fn record_name(data: &Dataset, row: usize) -> Option<String> {
    IDENTIFIER_COLUMNS
        .iter()
        .find_map(|column| data.value(row, column).ok())
        .and_then(|value| value.as_str().map(ToString::to_string))
}

#[cfg(test)]
mod tests {
    use assert_float_eq::*;

    use super::*;
    use crate::dataset;
    use crate::vis::render_svg_string;

    fn radar_data() -> Dataset {
        dataset! {
            "player" => ["Alice", "Bob", "Charlie", "Diana", "Eve"],
            "team" => ["Team A", "Team A", "Team B", "Team B", "Team C"],
            "position" => ["FW", "FW", "MF", "DF", "GK"],
            "minutes" => [1800, 1620, 1350, 2700, 2520],
            "goals" => [15, 12, 8, 2, 0],
            "assists" => [6, 9, 12, 3, 1],
            "shots" => [60, 50, 40, 10, 2],
            "tackles" => [15, 20, 55, 120, 10],
            "interceptions" => [8, 12, 30, 80, 5],
        }
    }

    fn radar_config() -> RadarConfig {
        serde_json::from_str(
            r#"{"columns": {
                "goals": {"display": "Goals", "low": 0, "high": 15, "normalize": true},
                "tackles": {"display": "Tackles", "low": 0, "high": 100},
                "shots": {"display": "Shots", "lower_is_better": true}
            }}"#,
        )
        .unwrap()
    }

    #[test]
    fn config_keeps_order_and_defaults() {
        let config = radar_config();
        let columns: Vec<_> = config.columns.iter().map(|(column, _)| column.as_str()).collect();
        assert_eq!(vec!["goals", "tackles", "shots"], columns);
        let (_, shots) = &config.columns[2];
        assert_eq!(None, shots.low);
        assert!(shots.lower_is_better);
        assert!(!shots.normalize);
    }

    #[test]
    fn limits_by_position() {
        let data = radar_data();
        let (low, high) = estimate_limits_by_position(&data, "goals", "FW", 0.1).unwrap();
        assert_float_absolute_eq!(12.3, low, 1e-9);
        assert_float_absolute_eq!(14.7, high, 1e-9);
        let (low_df, high_df) = estimate_limits_by_position(&data, "goals", "DF", 0.1).unwrap();
        assert_eq!((2.0, 2.0), (low_df, high_df));
        assert!(high > high_df);

        let (low_25, high_25) = estimate_limits_by_position(&data, "goals", "FW", 0.25).unwrap();
        assert!(high - low >= high_25 - low_25);

        let (none_low, none_high) = estimate_limits_by_position(&data, "goals", "ST", 0.1).unwrap();
        assert!(none_low.is_nan() && none_high.is_nan());
    }

    #[test]
    fn axis_positions() {
        let axis = RadarAxis {
            label: "Goals".into(),
            low: 0.0,
            high: 10.0,
            lower_is_better: false,
        };
        assert_float_absolute_eq!(0.25, axis.position(2.5));
        assert_float_absolute_eq!(1.0, axis.position(15.0));
        assert_float_absolute_eq!(0.0, axis.position(-1.0));
        let inverted = RadarAxis {
            lower_is_better: true,
            ..axis
        };
        assert_float_absolute_eq!(0.75, inverted.position(2.5));
    }

    #[test]
    fn prepare_normalises_and_resolves_bounds() {
        let data = radar_data();
        let chart = RadarChart::prepare(&data, &radar_config(), &"Bob".into(), Some(&RecordIndex::Position(3))).unwrap();
        assert_eq!(
            vec!["Goals", "Tackles", "Shots"],
            chart.axes.iter().map(|axis| axis.label.as_str()).collect::<Vec<_>>()
        );
        assert_eq!("Bob", chart.subject.name);
        // 12 goals in 1620 minutes
        assert_float_absolute_eq!(12.0 / 1620.0 * 90.0, chart.subject.values[0], 1e-9);
        assert_float_absolute_eq!(20.0, chart.subject.values[1]);
        let compare = chart.compare.unwrap();
        assert_eq!("Diana", compare.name);
        assert_float_absolute_eq!(120.0, compare.values[1]);

        // shots bounds come from the population: 0.05 and 0.95 quantiles of [2, 10, 40, 50, 60]
        let shots = &chart.axes[2];
        assert_float_absolute_eq!(3.6, shots.low, 1e-9);
        assert_float_absolute_eq!(58.0, shots.high, 1e-9);
        assert!(shots.lower_is_better);
    }

    #[test]
    fn prepare_unknown_record() {
        let result = RadarChart::prepare(&radar_data(), &radar_config(), &"Zed".into(), None);
        assert!(matches!(result, Err(VisError::Record(_))));
    }

    #[test]
    fn prepare_empty_config() {
        let result = RadarChart::prepare(&radar_data(), &RadarConfig::default(), &RecordIndex::Position(0), None);
        assert!(matches!(result, Err(VisError::Empty)));
    }

    #[test]
    fn draws_labels() {
        let chart = RadarChart::prepare(&radar_data(), &radar_config(), &"Alice".into(), Some(&"Eve".into())).unwrap();
        let svg = render_svg_string((600, 600), |area| chart.draw(area)).unwrap();
        for expected in ["Goals", "Tackles", "Shots", "Alice vs Eve"] {
            assert!(svg.contains(expected), "missing {expected}");
        }
    }
}
