//! PAE heatmaps drawn with plotters on the SVG backend.

use super::scores::PaeMatrix;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters_svg::SVGBackend;

/// Largest number of cells drawn per axis; bigger matrices are averaged down.
pub const MAX_BINS: usize = 256;

const PLOT_SIZE_PX: u32 = 512;
const MARGIN_PX: u32 = 48;
const COLORBAR_WIDTH_PX: u32 = 16;
const LABEL_AREA_PX: u32 = 56;
const COLORBAR_STEPS: i32 = 64;

/// Samples of matplotlib's `magma` colour map, evenly spaced from 0 to 1.
const MAGMA: [(u8, u8, u8); 9] = [
    (0, 0, 4),
    (28, 16, 68),
    (79, 18, 123),
    (129, 37, 129),
    (181, 54, 122),
    (229, 80, 100),
    (251, 135, 97),
    (254, 194, 135),
    (252, 253, 191),
];

/// Colour for `t` in `[0, 1]`, linearly interpolated between the magma samples.
pub fn magma(t: f64) -> (u8, u8, u8) {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let scaled = t * (MAGMA.len() - 1) as f64;
    let lower = scaled.floor() as usize;
    if lower >= MAGMA.len() - 1 {
        return MAGMA[MAGMA.len() - 1];
    }
    let frac = scaled - lower as f64;
    let (a, b) = (MAGMA[lower], MAGMA[lower + 1]);
    let lerp = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
    (lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}

fn magma_color(t: f64) -> RGBColor {
    let (r, g, b) = magma(t);
    RGBColor(r, g, b)
}

fn bin_range(bin: usize, bins: usize, size: usize) -> std::ops::Range<usize> {
    (bin * size / bins)..((bin + 1) * size / bins)
}

/// `pae` averaged down to at most [`MAX_BINS`] cells per axis, row-major.
pub fn binned(pae: &PaeMatrix) -> Vec<Vec<f64>> {
    let size = pae.size();
    let bins = size.min(MAX_BINS);
    (0..bins)
        .map(|row| {
            let rows = bin_range(row, bins, size);
            (0..bins)
                .map(|col| pae.block_mean(rows.clone(), bin_range(col, bins, size)))
                .collect()
        })
        .collect()
}

/// Draws `pae` as an SVG heatmap, 0 Å dark and `vmax` Å bright, with the first residue
/// in the top-left corner.
pub fn render_pae_svg(
    pae: &PaeMatrix,
    vmax: f64,
    title: &str,
) -> Result<String, DrawingAreaErrorKind<std::io::Error>> {
    let cells = binned(pae);
    let vmax = if vmax > 0.0 { vmax } else { 1.0 };
    let width = MARGIN_PX * 3 + PLOT_SIZE_PX + COLORBAR_WIDTH_PX + LABEL_AREA_PX;
    let height = MARGIN_PX * 2 + PLOT_SIZE_PX;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
        draw_heatmap(&root, &cells, pae.size(), vmax, title)?;
        root.present()?;
    }
    Ok(svg)
}

fn draw_heatmap<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    cells: &[Vec<f64>],
    residues: usize,
    vmax: f64,
    title: &str,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let (width, _) = root.dim_in_pixel();
    root.fill(&WHITE)?;

    let text = ("sans-serif", 14).into_font().color(&BLACK);
    root.draw(&Text::new(
        title.to_string(),
        (MARGIN_PX as i32, (MARGIN_PX / 3) as i32),
        text.clone(),
    ))?;
    root.draw(&Text::new(
        format!("Aligned residue (rows) vs scored residue (columns), 1-{residues}"),
        (MARGIN_PX as i32, (MARGIN_PX + PLOT_SIZE_PX + 12) as i32),
        text.clone(),
    ))?;

    let plot_area = root.margin(
        MARGIN_PX,
        MARGIN_PX,
        MARGIN_PX,
        width - MARGIN_PX - PLOT_SIZE_PX,
    );
    let bins = cells.len() as i32;
    let mut chart = ChartBuilder::on(&plot_area).build_cartesian_2d(0..bins, 0..bins)?;
    chart.draw_series(cells.iter().enumerate().flat_map(|(row, values)| {
        values.iter().enumerate().map(move |(col, &value)| {
            let (x, y) = (col as i32, bins - 1 - row as i32);
            Rectangle::new([(x, y), (x + 1, y + 1)], magma_color(value / vmax).filled())
        })
    }))?;

    let bar_x = MARGIN_PX * 2 + PLOT_SIZE_PX;
    let bar_area = root.margin(
        MARGIN_PX,
        MARGIN_PX,
        bar_x,
        width - bar_x - COLORBAR_WIDTH_PX,
    );
    let mut bar = ChartBuilder::on(&bar_area).build_cartesian_2d(0..1, 0..COLORBAR_STEPS)?;
    bar.draw_series((0..COLORBAR_STEPS).map(|step| {
        let t = (step as f64 + 0.5) / COLORBAR_STEPS as f64;
        Rectangle::new([(0, step), (1, step + 1)], magma_color(t).filled())
    }))?;

    let label_x = (bar_x + COLORBAR_WIDTH_PX + 4) as i32;
    root.draw(&Text::new(
        format!("{vmax:.1} Å"),
        (label_x, MARGIN_PX as i32),
        text.clone(),
    ))?;
    root.draw(&Text::new(
        "0 Å".to_string(),
        (label_x, (MARGIN_PX + PLOT_SIZE_PX - 14) as i32),
        text,
    ))?;
    Ok(())
}
