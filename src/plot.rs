/// SVG rendering of aggregator output.
///
/// Charts are drawn with `plotters` into an in-memory SVG string, so the
/// service never touches the filesystem to answer a plot request.
/// Displacements are stored in metres and plotted in millimetres.

use std::error::Error;
use std::ops::Range;

use plotters::prelude::*;

use crate::analysis::attenuation::AttenuationFit;
use crate::analysis::displacement::{AveragedPoint, AveragedSeries, DistancePoint};
use crate::error::GeoError;
use crate::model::EarthquakeEvent;

const AVERAGED_SIZE: (u32, u32) = (900, 900);
const DISTANCE_SIZE: (u32, u32) = (900, 600);

const PALETTE: [RGBColor; 8] = [
    RGBColor(0, 102, 204),
    RGBColor(204, 102, 0),
    RGBColor(34, 139, 34),
    RGBColor(160, 32, 240),
    RGBColor(200, 0, 100),
    RGBColor(0, 150, 150),
    RGBColor(120, 90, 30),
    RGBColor(90, 90, 90),
];

type DrawResult = Result<(), Box<dyn Error>>;

/// An event drawn on the distance chart, with its optional fitted curve.
#[derive(Debug, Clone, Copy)]
pub struct EventLayer<'a> {
    pub event: &'a EarthquakeEvent,
    pub fit: Option<AttenuationFit>,
}

fn to_mm(metres: f64) -> f64 {
    metres * 1000.0
}

/// Padded range over `values`, never empty.
fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return 0.0..1.0;
    }
    let pad = ((hi - lo) * 0.05).max(1e-3);
    (lo - pad)..(hi + pad)
}

// ---------------------------------------------------------------------------
// Displacement vs time
// ---------------------------------------------------------------------------

/// Three stacked panels (east, north, vertical) against day offset,
/// with a marker at offset 0.
pub fn render_averaged_displacement(series: &AveragedSeries, title: &str) -> Result<String, GeoError> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, AVERAGED_SIZE).into_drawing_area();
        draw_averaged(&root, &series.points, title).map_err(|e| GeoError::Render(e.to_string()))?;
    }
    Ok(svg)
}

fn draw_averaged<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    points: &[AveragedPoint],
    title: &str,
) -> DrawResult
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let root = root.titled(title, ("sans-serif", 22))?;
    let panels = root.split_evenly((3, 1));

    let x_range = padded_range(points.iter().map(|p| p.offset_days as f64));
    let axes: [(&str, fn(&AveragedPoint) -> f64); 3] = [
        ("East (mm)", |p| to_mm(p.east)),
        ("North (mm)", |p| to_mm(p.north)),
        ("Vertical (mm)", |p| to_mm(p.vertical)),
    ];

    for (idx, (panel, (label, value))) in panels.iter().zip(axes).enumerate() {
        let y_range = padded_range(points.iter().map(value));
        let mut chart = ChartBuilder::on(panel)
            .margin(10)
            .x_label_area_size(35)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range.clone(), y_range.clone())?;

        chart
            .configure_mesh()
            .x_desc(if idx == 2 { "Days from origin" } else { "" })
            .y_desc(label)
            .x_label_formatter(&|x| format!("{:.0}", x))
            .y_label_formatter(&|y| format!("{:.1}", y))
            .light_line_style(&WHITE)
            .draw()?;

        let color = PALETTE[idx];
        chart.draw_series(LineSeries::new(
            points.iter().map(|p| (p.offset_days as f64, value(p))),
            color.stroke_width(2),
        ))?;
        chart.draw_series(points.iter().map(|p| Circle::new((p.offset_days as f64, value(p)), 2, color.filled())))?;

        if x_range.contains(&0.0) {
            chart.draw_series(LineSeries::new(
                vec![(0.0, y_range.start), (0.0, y_range.end)],
                RED.stroke_width(1),
            ))?;
        }
    }

    root.present()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Displacement vs distance
// ---------------------------------------------------------------------------

/// Scatter of displacement against epicentral distance, one color per event.
pub fn render_distance_vs_displacement(
    points: &[DistancePoint],
    layers: &[EventLayer<'_>],
    title: &str,
) -> Result<String, GeoError> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, DISTANCE_SIZE).into_drawing_area();
        draw_distance(&root, points, layers, title).map_err(|e| GeoError::Render(e.to_string()))?;
    }
    Ok(svg)
}

fn draw_distance<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    points: &[DistancePoint],
    layers: &[EventLayer<'_>],
    title: &str,
) -> DrawResult
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let x_range = padded_range(points.iter().map(|p| p.distance_km));
    let x_range = x_range.start.max(0.0)..x_range.end;
    let y_range = padded_range(points.iter().map(|p| to_mm(p.displacement_m)));
    let y_range = y_range.start.max(0.0)..y_range.end;

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(65)
        .build_cartesian_2d(x_range.clone(), y_range.clone())?;

    chart
        .configure_mesh()
        .x_desc("Distance from epicenter (km)")
        .y_desc("Horizontal displacement (mm)")
        .x_label_formatter(&|x| format!("{:.0}", x))
        .y_label_formatter(&|y| format!("{:.1}", y))
        .light_line_style(&WHITE)
        .draw()?;

    for (idx, layer) in layers.iter().enumerate() {
        let color = PALETTE[idx % PALETTE.len()];
        let event_id = layer.event.event_id.as_str();

        chart
            .draw_series(
                points
                    .iter()
                    .filter(|p| p.event_id == event_id)
                    .map(|p| Circle::new((p.distance_km, to_mm(p.displacement_m)), 4, color.filled())),
            )?
            .label(format!("{} (M {:.1})", event_id, layer.event.magnitude))
            .legend(move |(x, y)| Circle::new((x + 10, y), 5, color.filled()));

        if let Some(fit) = layer.fit {
            let start = x_range.start.max(1e-3);
            let step = (x_range.end - start) / 99.0;
            let curve = (0..100)
                .map(|i| start + step * i as f64)
                .map(|d| (d, to_mm(fit.predict(d))))
                .filter(|(_, y)| y_range.contains(y));
            chart.draw_series(LineSeries::new(curve, color.stroke_width(1)))?;
        }
    }

    if !layers.is_empty() {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK)
            .position(SeriesLabelPosition::UpperRight)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crate::model::GeoPoint;

    fn event() -> EarthquakeEvent {
        EarthquakeEvent {
            event_id: "ev_mid".to_string(),
            magnitude: 6.1,
            epicenter: GeoPoint::new(0.0, 0.5),
            origin_time: Utc.with_ymd_and_hms(2020, 1, 5, 10, 0, 0).unwrap(),
            depth_km: None,
        }
    }

    fn point(distance_km: f64, displacement_m: f64) -> DistancePoint {
        DistancePoint {
            event_id: "ev_mid".to_string(),
            station_id: "AAAA".to_string(),
            distance_km,
            displacement_m,
            delta_east: 0.0,
            delta_north: 0.0,
            delta_vertical: 0.0,
        }
    }

    #[test]
    fn test_padded_range_handles_empty_and_flat_input() {
        assert_eq!(padded_range(std::iter::empty()), 0.0..1.0);
        let flat = padded_range([2.0, 2.0].into_iter());
        assert!(flat.start < 2.0 && flat.end > 2.0);
    }

    #[test]
    fn test_render_averaged_displacement_produces_svg() {
        let series = AveragedSeries {
            points: vec![
                AveragedPoint { offset_days: -1, east: 0.001, north: 0.002, vertical: 0.0, station_count: 2 },
                AveragedPoint { offset_days: 1, east: 0.031, north: 0.042, vertical: 0.0, station_count: 2 },
            ],
            resolved: vec!["AAAA".to_string(), "BBBB".to_string()],
            unresolved: Vec::new(),
        };

        let svg = render_averaged_displacement(&series, "Averaged displacement").unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Averaged displacement"));
        assert!(svg.contains("Days from origin"));
    }

    #[test]
    fn test_render_distance_includes_legend_entry() {
        let ev = event();
        let points = vec![point(20.0, 0.08), point(55.6, 0.05), point(90.0, 0.02)];
        let fit = crate::analysis::attenuation::fit_attenuation(&points);
        let layers = [EventLayer { event: &ev, fit }];

        let svg = render_distance_vs_displacement(&points, &layers, "Distance vs displacement").unwrap();
        assert!(svg.contains("ev_mid (M 6.1)"));
    }

    #[test]
    fn test_render_empty_chart_keeps_title() {
        let svg = render_distance_vs_displacement(&[], &[], "Nothing selected").unwrap();
        assert!(svg.contains("Nothing selected"));
    }
}
