//! Scatter and line charts.

use linregress::fit_low_level_regression_model;
use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::debug;

use crate::dataset::Dataset;
use crate::vis::{padded_range, VisError};

const FONT: &str = "sans-serif";
const MIN_MARKER: f64 = 3.0;
const MAX_MARKER: f64 = 12.0;

#[derive(Debug, Clone, Default)]
pub struct ScatterOptions {
    pub title: Option<String>,
    /// Text column annotating each point.
    pub label: Option<String>,
    /// Text column whose distinct values are coloured from `palette`, in order of appearance.
    pub colour: Option<String>,
    pub palette: Vec<RGBColor>,
    /// Numeric column mapped onto the marker radius.
    pub size: Option<String>,
    /// Draws a line through the mean of each axis.
    pub means: bool,
}

/// Assigns each row the palette colour of its group, cycling through the palette when there
/// are more groups than colours.
pub fn colour_groups(
    data: &Dataset,
    column: &str,
    palette: &[RGBColor],
) -> Result<Vec<RGBColor>, VisError> {
    if palette.is_empty() {
        return Err(VisError::MissingPalette(column.to_string()));
    }
    let mut groups: Vec<String> = vec![];
    let values = &data.column(column)?.values;
    Ok(values
        .iter()
        .map(|value| {
            let group = value.to_string();
            let index = match groups.iter().position(|existing| *existing == group) {
                Some(index) => index,
                None => {
                    groups.push(group);
                    groups.len() - 1
                }
            };
            palette[index % palette.len()]
        })
        .collect())
}

fn marker_sizes(values: &[f64]) -> Vec<f64> {
    let (low, high) = values
        .iter()
        .filter(|value| !value.is_nan())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), &value| {
            (low.min(value), high.max(value))
        });
    values
        .iter()
        .map(|&value| {
            if high > low && !value.is_nan() {
                MIN_MARKER + (value - low) / (high - low) * (MAX_MARKER - MIN_MARKER)
            } else {
                MIN_MARKER
            }
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    let present: Vec<_> = values.iter().filter(|value| !value.is_nan()).collect();
    present.iter().copied().sum::<f64>() / present.len() as f64
}

pub fn scatter<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    data: &Dataset,
    x: &str,
    y: &str,
    options: &ScatterOptions,
) -> Result<(), VisError> {
    let xs = data.numeric(x)?;
    let ys = data.numeric(y)?;
    let colours = match &options.colour {
        Some(column) => colour_groups(data, column, &options.palette)?,
        None => vec![BLUE; data.rows()],
    };
    let sizes = match &options.size {
        Some(column) => marker_sizes(&data.numeric(column)?),
        None => vec![5.0; data.rows()],
    };
    let (x_low, x_high) = padded_range(&xs).ok_or(VisError::Empty)?;
    let (y_low, y_high) = padded_range(&ys).ok_or(VisError::Empty)?;

    let mut chart = ChartBuilder::on(area)
        .caption(options.title.as_deref().unwrap_or_default(), (FONT, 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_low..x_high, y_low..y_high)?;
    chart.configure_mesh().x_desc(x).y_desc(y).draw()?;

    chart.draw_series((0..data.rows()).filter(|&row| !xs[row].is_nan() && !ys[row].is_nan()).map(
        |row| Circle::new((xs[row], ys[row]), sizes[row].round() as i32, colours[row].mix(0.7).filled()),
    ))?;

    if let Some(label) = &options.label {
        let labels = &data.column(label)?.values;
        chart.draw_series(
            (0..data.rows())
                .filter(|&row| !xs[row].is_nan() && !ys[row].is_nan())
                .map(|row| {
                    Text::new(
                        labels[row].to_string(),
                        (xs[row] + (x_high - x_low) * 0.005, ys[row]),
                        (FONT, 12).into_font(),
                    )
                }),
        )?;
    }

    if options.means {
        let (x_mean, y_mean) = (mean(&xs), mean(&ys));
        debug!("means: {x}={x_mean}, {y}={y_mean}");
        chart.draw_series(LineSeries::new(
            [(x_mean, y_low), (x_mean, y_high)],
            BLACK.mix(0.5).stroke_width(1),
        ))?;
        chart.draw_series(LineSeries::new(
            [(x_low, y_mean), (x_high, y_mean)],
            BLACK.mix(0.5).stroke_width(1),
        ))?;
    }
    Ok(())
}

/// A straight line fitted by ordinary least squares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trend {
    pub intercept: f64,
    pub slope: f64,
}
impl Trend {
    /// Fits `y = intercept + slope · x` over the points where both coordinates are present.
    pub fn fit(xs: &[f64], ys: &[f64]) -> Result<Self, String> {
        let points: Vec<(f64, f64)> = xs
            .iter()
            .zip(ys)
            .map(|(&x, &y)| (x, y))
            .filter(|(x, y)| !x.is_nan() && !y.is_nan())
            .collect();
        if points.len() < 3 {
            return Err(format!("{} points are too few to fit a trend", points.len()));
        }
        let mut rows = Vec::with_capacity(points.len() * 3);
        for &(x, y) in &points {
            rows.extend([y, 1.0, x]);
        }
        let model = fit_low_level_regression_model(&rows, points.len(), 3).map_err(|err| err.to_string())?;
        let parameters = model.parameters();
        Ok(Self {
            intercept: parameters[0],
            slope: parameters[1],
        })
    }

    pub fn at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// One line of a [lines] chart.
#[derive(Debug, Clone)]
pub struct LineSpec {
    pub x: String,
    pub y: String,
    pub colour: RGBColor,
    /// Legend entry; lines without one are left out of the legend.
    pub label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shading {
    /// The area between a line and the horizontal axis.
    Under(usize),
    /// The area between two lines, which must share their x values.
    Between(usize, usize),
}

#[derive(Debug, Clone, Default)]
pub struct LinesOptions {
    pub title: Option<String>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    /// Overlays a faint least-squares trend for every line.
    pub trends: bool,
    pub shading: Option<Shading>,
}

type Points = Vec<(f64, f64)>;

fn line_points(data: &Dataset, spec: &LineSpec) -> Result<Points, VisError> {
    let xs = data.numeric(&spec.x)?;
    let ys = data.numeric(&spec.y)?;
    Ok(xs
        .into_iter()
        .zip(ys)
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .collect())
}

/// Draws each line from its own x and y columns. Rows missing either value are skipped.
pub fn lines<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    data: &Dataset,
    specs: &[LineSpec],
    options: &LinesOptions,
) -> Result<(), VisError> {
    let series = specs
        .iter()
        .map(|spec| line_points(data, spec))
        .collect::<Result<Vec<_>, _>>()?;
    let trends = if options.trends {
        specs
            .iter()
            .zip(&series)
            .map(|(spec, points)| {
                let (xs, ys): (Vec<_>, Vec<_>) = points.iter().copied().unzip();
                Trend::fit(&xs, &ys).map_err(|reason| VisError::Trend {
                    series: spec.y.clone(),
                    reason,
                })
            })
            .collect::<Result<Vec<_>, _>>()?
    } else {
        vec![]
    };
    let shaded = match options.shading {
        Some(Shading::Under(index)) => vec![index],
        Some(Shading::Between(lower, upper)) => vec![lower, upper],
        None => vec![],
    };
    if let Some(&index) = shaded.iter().find(|&&index| index >= series.len()) {
        return Err(VisError::NoSuchSeries {
            index,
            available: series.len(),
        });
    }

    let (x_low, x_high) =
        padded_range(series.iter().flatten().map(|(x, _)| x)).ok_or(VisError::Empty)?;
    let (y_low, y_high) =
        padded_range(series.iter().flatten().map(|(_, y)| y)).ok_or(VisError::Empty)?;

    let mut chart = ChartBuilder::on(area)
        .caption(options.title.as_deref().unwrap_or_default(), (FONT, 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_low..x_high, y_low..y_high)?;
    chart
        .configure_mesh()
        .x_desc(options.x_label.as_deref().unwrap_or_default())
        .y_desc(options.y_label.as_deref().unwrap_or_default())
        .draw()?;

    match options.shading {
        Some(Shading::Under(index)) => {
            let baseline = 0f64.clamp(y_low, y_high);
            chart.draw_series(AreaSeries::new(
                series[index].iter().copied(),
                baseline,
                specs[index].colour.mix(0.2).filled(),
            ))?;
        }
        Some(Shading::Between(lower, upper)) => {
            let outline: Vec<_> = series[lower]
                .iter()
                .chain(series[upper].iter().rev())
                .copied()
                .collect();
            chart.draw_series(std::iter::once(Polygon::new(
                outline,
                specs[lower].colour.mix(0.2).filled(),
            )))?;
        }
        None => {}
    }

    let mut labelled = false;
    for (spec, points) in specs.iter().zip(&series) {
        let colour = spec.colour;
        let drawn = chart.draw_series(LineSeries::new(points.iter().copied(), colour.stroke_width(2)))?;
        if let Some(label) = &spec.label {
            labelled = true;
            drawn
                .label(label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], colour.stroke_width(2)));
        }
    }
    for (spec, trend) in specs.iter().zip(&trends) {
        debug!("trend for {}: {trend:?}", spec.y);
        let ends = [(x_low, trend.at(x_low)), (x_high, trend.at(x_high))];
        chart.draw_series(LineSeries::new(ends, spec.colour.mix(0.5).stroke_width(1)))?;
    }
    if labelled {
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_float_eq::*;

    use super::*;
    use crate::dataset;
    use crate::vis::render_svg_string;

    fn chart_data() -> Dataset {
        dataset! {
            "x" => [1, 2, 3, 4, 5, 6, 7, 8, 9, 10],
            "y1" => [1, 4, 9, 16, 25, 36, 49, 64, 81, 100],
            "y2" => [100, 81, 64, 49, 36, 25, 16, 9, 4, 1],
            "category" => ["A", "A", "B", "B", "C", "C", "D", "D", "E", "E"],
            "player" => ["P1", "P2", "P3", "P4", "P5", "P6", "P7", "P8", "P9", "P10"],
            "size" => [5, 10, 15, 20, 25, 30, 35, 40, 45, 50],
        }
    }

    fn spec(y: &str, colour: RGBColor, label: Option<&str>) -> LineSpec {
        LineSpec {
            x: "x".into(),
            y: y.into(),
            colour,
            label: label.map(ToString::to_string),
        }
    }

    #[test]
    fn colour_groups_by_first_appearance() {
        let palette = [RED, BLUE];
        let colours = colour_groups(&chart_data(), "category", &palette).unwrap();
        assert_eq!(vec![RED, RED, BLUE, BLUE, RED, RED, BLUE, BLUE, RED, RED], colours);
    }

    #[test]
    fn colour_requires_palette() {
        assert!(matches!(
            colour_groups(&chart_data(), "category", &[]),
            Err(VisError::MissingPalette(column)) if column == "category"
        ));
        let options = ScatterOptions {
            colour: Some("category".into()),
            ..ScatterOptions::default()
        };
        let result = render_svg_string((400, 300), |area| scatter(area, &chart_data(), "x", "y1", &options));
        assert!(matches!(result, Err(VisError::MissingPalette(_))));
    }

    #[test]
    fn scatter_with_everything() {
        let options = ScatterOptions {
            title: Some("Goals against shots".into()),
            label: Some("player".into()),
            colour: Some("category".into()),
            palette: vec![RED, BLUE, GREEN],
            size: Some("size".into()),
            means: true,
        };
        let svg = render_svg_string((600, 400), |area| scatter(area, &chart_data(), "x", "y1", &options)).unwrap();
        assert!(svg.contains("<circle"));
        assert!(svg.contains("P10"));
        assert!(svg.contains("Goals against shots"));
    }

    #[test]
    fn scatter_unknown_column() {
        let result = render_svg_string((400, 300), |area| {
            scatter(area, &chart_data(), "x", "xg", &ScatterOptions::default())
        });
        assert!(matches!(result, Err(VisError::Dataset(_))));
    }

    #[test]
    fn marker_sizes_span_range() {
        assert_eq!(vec![MIN_MARKER, 7.5, MAX_MARKER], marker_sizes(&[0.0, 5.0, 10.0]));
        assert_eq!(vec![MIN_MARKER, MIN_MARKER], marker_sizes(&[4.0, 4.0]));
    }

    #[test]
    fn trend_fit() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0, f64::NAN];
        let ys = [3.1, 4.9, 7.1, 8.9, 11.0, 100.0];
        let trend = Trend::fit(&xs, &ys).unwrap();
        assert_float_absolute_eq!(1.98, trend.slope, 1e-6);
        assert_float_absolute_eq!(1.06, trend.intercept, 1e-6);
        assert_float_absolute_eq!(1.06 + 1.98 * 10.0, trend.at(10.0), 1e-6);
        assert!(Trend::fit(&[1.0, 2.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn lines_with_trends_and_legend() {
        let data = chart_data();
        let specs = [
            spec("y1", BLUE, Some("rising")),
            spec("y2", RED, Some("falling")),
        ];
        let options = LinesOptions {
            title: Some("Test Chart".into()),
            trends: true,
            shading: Some(Shading::Between(0, 1)),
            ..LinesOptions::default()
        };
        let svg = render_svg_string((800, 600), |area| lines(area, &data, &specs, &options)).unwrap();
        assert!(svg.contains("rising"));
        assert!(svg.contains("falling"));
        assert!(svg.contains("<polygon") || svg.contains("<polyline"));
    }

    #[test]
    fn lines_shade_under() {
        let options = LinesOptions {
            shading: Some(Shading::Under(0)),
            ..LinesOptions::default()
        };
        let specs = [spec("y1", BLUE, None)];
        assert!(render_svg_string((400, 300), |area| lines(area, &chart_data(), &specs, &options)).is_ok());
    }

    #[test]
    fn lines_shade_missing_series() {
        let options = LinesOptions {
            shading: Some(Shading::Between(0, 2)),
            ..LinesOptions::default()
        };
        let specs = [spec("y1", BLUE, None), spec("y2", RED, None)];
        let result = render_svg_string((400, 300), |area| lines(area, &chart_data(), &specs, &options));
        assert!(matches!(result, Err(VisError::NoSuchSeries { index: 2, available: 2 })));
    }
}
