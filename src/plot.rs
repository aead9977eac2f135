// src/plot.rs

use crate::comparison::{ChartRow, Codec, ComparisonRecord};
use crate::error::{Result, VqError};
use log::{info, warn};
use plotters::prelude::*;
use std::path::Path;

const H264_COLOR: RGBColor = RGBColor(0xD9, 0x16, 0x56);
const H265_COLOR: RGBColor = RGBColor(0x78, 0xB3, 0xCE);
const BAR_WIDTH: f64 = 0.35;

/// Draws a grouped bar chart (one group per metric, one bar per codec) as a PNG.
/// Refuses records that are not fully numeric on both sides.
pub fn generate_comparison_chart(record: &ComparisonRecord, output_path: &Path) -> Result<()> {
    let Some(rows) = record.chart_rows() else {
        warn!("Not enough data to plot a comparison");
        return Err(VqError::NotComparable(
            "both codecs need complete, numeric PSNR/SSIM/VMAF results".to_string(),
        ));
    };
    info!("Generating comparison chart: {}", output_path.display());

    let root = BitMapBackend::new(output_path, (1050, 450)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| VqError::Plot(format!("Failed to fill plot background: {}", e)))?;

    let x_range = -0.5..(rows.len() as f64 - 0.5);
    let y_max = y_upper_bound(&rows);

    let mut chart = ChartBuilder::on(&root)
        .caption("H.264 vs H.265 Comparison", ("sans-serif", 24).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, 0.0..y_max)
        .map_err(|e| VqError::Plot(format!("Failed to build chart: {}", e)))?;

    let x_label_format = |x: &f64| metric_label(&rows, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(rows.len() + 1)
        .x_label_formatter(&x_label_format)
        .x_desc("Metrics")
        .y_desc("Values")
        .axis_desc_style(("sans-serif", 16))
        .label_style(("sans-serif", 14))
        .draw()
        .map_err(|e| VqError::Plot(format!("Failed to draw mesh: {:?}", e)))?;

    for codec in Codec::ALL {
        let color = match codec {
            Codec::H264 => H264_COLOR,
            Codec::H265 => H265_COLOR,
        };
        chart
            .draw_series(rows.iter().enumerate().map(|(i, row)| {
                let (left, right) = bar_span(i, codec);
                let value = match codec {
                    Codec::H264 => row.h264,
                    Codec::H265 => row.h265,
                };
                Rectangle::new([(left, 0.0), (right, value)], color.filled())
            }))
            .map_err(|e| VqError::Plot(format!("Failed to draw {} bars: {:?}", codec, e)))?
            .label(codec.label())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .margin(10)
        .label_font(("sans-serif", 12))
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| VqError::Plot(format!("Failed to draw legend: {:?}", e)))?;

    root.present().map_err(|e| VqError::Plot(format!("Failed to save plot: {:?}", e)))?;
    info!("Successfully generated comparison chart: {}", output_path.display());

    Ok(())
}

/// Horizontal extent of one bar; the H.264 bar sits left of the group centre, H.265 right.
fn bar_span(index: usize, codec: Codec) -> (f64, f64) {
    let centre = index as f64;
    match codec {
        Codec::H264 => (centre - BAR_WIDTH, centre),
        Codec::H265 => (centre, centre + BAR_WIDTH),
    }
}

fn y_upper_bound(rows: &[ChartRow]) -> f64 {
    let max = rows
        .iter()
        .flat_map(|row| [row.h264, row.h265])
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);
    (max * 1.1).max(1.0)
}

// Only whole-number ticks that land on a group get a label.
fn metric_label(rows: &[ChartRow], x: f64) -> String {
    let rounded = x.round();
    if (x - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }
    rows.get(rounded as usize)
        .map(|row| row.metric.to_string())
        .unwrap_or_default()
}
