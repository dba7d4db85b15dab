//! Iterative graph-cut foreground extraction seeded by a rectangle
//!
//! Pixels outside the rectangle are fixed background; pixels inside start as
//! probable foreground. Each round fits colour mixtures to both sides, builds
//! an 8-connected graph and relabels the probable pixels from its minimum cut.

use super::gmm::{GaussianMixture, COMPONENTS};
use super::maxflow::FlowGraph;
use image::{GrayImage, Luma, RgbImage};
use thiserror::Error;

/// Smoothness weight between neighbouring pixels
const GAMMA: f64 = 50.0;
/// Terminal weight pinning fixed pixels to their side
const LAMBDA: f64 = 9.0 * GAMMA;

/// Per-pixel classification during the cut
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Background,
    Foreground,
    ProbableBackground,
    ProbableForeground,
}

impl Label {
    fn is_foreground(self) -> bool {
        matches!(self, Self::Foreground | Self::ProbableForeground)
    }

    fn is_probable(self) -> bool {
        matches!(self, Self::ProbableBackground | Self::ProbableForeground)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrabCutError {
    #[error("Seed rectangle is empty for a {width}x{height} image with margin {margin}")]
    InvalidRect { width: u32, height: u32, margin: u32 },

    #[error("Not enough samples to fit colour models ({foreground} foreground, {background} background)")]
    TooFewSamples { foreground: usize, background: usize },
}

/// Run graph-cut segmentation with a seed rectangle inset by `margin` on every side
///
/// Returns a binary mask: 255 for foreground, 0 for background.
///
/// # Errors
/// - `InvalidRect` when the inset rectangle has no area
/// - `TooFewSamples` when either side has fewer pixels than mixture components
pub fn grab_cut(image: &RgbImage, margin: u32, iterations: u32) -> Result<GrayImage, GrabCutError> {
    let (width, height) = image.dimensions();
    let rect_width = i64::from(width) - 2 * i64::from(margin);
    let rect_height = i64::from(height) - 2 * i64::from(margin);
    if rect_width <= 0 || rect_height <= 0 {
        return Err(GrabCutError::InvalidRect {
            width,
            height,
            margin,
        });
    }

    let colors: Vec<[f64; 3]> = image
        .pixels()
        .map(|p| [f64::from(p[0]), f64::from(p[1]), f64::from(p[2])])
        .collect();

    let mut labels: Vec<Label> = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .map(|(x, y)| {
            let inside = x >= margin && x < width - margin && y >= margin && y < height - margin;
            if inside {
                Label::ProbableForeground
            } else {
                Label::Background
            }
        })
        .collect();

    let (mut foreground, mut background) = initial_models(&colors, &labels)?;
    let links = NeighbourLinks::new(&colors, width as usize, height as usize);

    for _ in 0..iterations {
        foreground = refit(&foreground, &colors, &labels, true);
        background = refit(&background, &colors, &labels, false);

        let mut graph = FlowGraph::new(colors.len(), links.count());
        for (node, (color, label)) in colors.iter().zip(&labels).enumerate() {
            let (from_source, to_sink) = match label {
                Label::Background => (0.0, LAMBDA),
                Label::Foreground => (LAMBDA, 0.0),
                _ => (
                    background.negative_log_likelihood(*color),
                    foreground.negative_log_likelihood(*color),
                ),
            };
            graph.add_terminal_weights(node, from_source, to_sink);
        }
        links.add_to(&mut graph);
        graph.max_flow();

        for (node, label) in labels.iter_mut().enumerate() {
            if label.is_probable() {
                *label = if graph.in_source_segment(node) {
                    Label::ProbableForeground
                } else {
                    Label::ProbableBackground
                };
            }
        }
    }

    let mut mask = GrayImage::new(width, height);
    for (pixel, label) in mask.pixels_mut().zip(&labels) {
        *pixel = Luma([if label.is_foreground() { 255 } else { 0 }]);
    }
    Ok(mask)
}

fn side_samples(colors: &[[f64; 3]], labels: &[Label], foreground: bool) -> Vec<[f64; 3]> {
    colors
        .iter()
        .zip(labels)
        .filter(|(_, label)| label.is_foreground() == foreground)
        .map(|(color, _)| *color)
        .collect()
}

fn initial_models(
    colors: &[[f64; 3]],
    labels: &[Label],
) -> Result<(GaussianMixture, GaussianMixture), GrabCutError> {
    let fg = side_samples(colors, labels, true);
    let bg = side_samples(colors, labels, false);
    if fg.len() < COMPONENTS || bg.len() < COMPONENTS {
        return Err(GrabCutError::TooFewSamples {
            foreground: fg.len(),
            background: bg.len(),
        });
    }

    let fg_model = GaussianMixture::learn(&fg, &GaussianMixture::initial_labels(&fg));
    let bg_model = GaussianMixture::learn(&bg, &GaussianMixture::initial_labels(&bg));
    Ok((fg_model, bg_model))
}

/// Reassign each sample to its most likely component and refit
fn refit(
    model: &GaussianMixture,
    colors: &[[f64; 3]],
    labels: &[Label],
    foreground: bool,
) -> GaussianMixture {
    let samples = side_samples(colors, labels, foreground);
    if samples.is_empty() {
        return model.clone();
    }
    let components: Vec<usize> = samples
        .iter()
        .map(|color| model.most_likely_component(*color))
        .collect();
    GaussianMixture::learn(&samples, &components)
}

/// Precomputed smoothness links of the 8-connected pixel grid
struct NeighbourLinks {
    /// `(a, b, weight)` for every undirected neighbour pair
    links: Vec<(usize, usize, f64)>,
}

impl NeighbourLinks {
    /// Offsets to the left, upper-left, upper and upper-right neighbours
    const OFFSETS: [(i64, i64); 4] = [(-1, 0), (-1, -1), (0, -1), (1, -1)];

    fn new(colors: &[[f64; 3]], width: usize, height: usize) -> Self {
        let mut pairs = Vec::with_capacity(colors.len() * 4);
        for y in 0..height as i64 {
            for x in 0..width as i64 {
                for (dx, dy) in Self::OFFSETS {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < 0 || ny < 0 || nx >= width as i64 {
                        continue;
                    }
                    let a = (y as usize) * width + x as usize;
                    let b = (ny as usize) * width + nx as usize;
                    let diagonal = dx != 0 && dy != 0;
                    pairs.push((a, b, diagonal, squared_difference(colors[a], colors[b])));
                }
            }
        }

        let beta = Self::beta(pairs.iter().map(|pair| pair.3));
        let links = pairs
            .into_iter()
            .map(|(a, b, diagonal, diff)| {
                let scale = if diagonal {
                    GAMMA / std::f64::consts::SQRT_2
                } else {
                    GAMMA
                };
                (a, b, scale * (-beta * diff).exp())
            })
            .collect();

        Self { links }
    }

    /// Inverse of twice the mean squared neighbour difference, or 0 for flat images
    fn beta(differences: impl Iterator<Item = f64>) -> f64 {
        let (sum, count) = differences.fold((0.0, 0usize), |(sum, count), d| (sum + d, count + 1));
        if count == 0 || sum <= f64::EPSILON {
            return 0.0;
        }
        1.0 / (2.0 * sum / count as f64)
    }

    fn count(&self) -> usize {
        self.links.len()
    }

    fn add_to(&self, graph: &mut FlowGraph) {
        for &(a, b, weight) in &self.links {
            graph.add_edge(a, b, weight, weight);
        }
    }
}

fn squared_difference(a: [f64; 3], b: [f64; 3]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}
