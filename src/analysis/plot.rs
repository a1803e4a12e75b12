use std::io::Cursor;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::coord::ranged1d::SegmentValue;
use plotters::prelude::LineSeries;
use plotters::prelude::*;
use crate::analysis::aggregate::{average_profiles, AverageProfile, WindowHistogram};
use crate::analysis::config::AlignmentPolicy;
use crate::analysis::error::SyncError;
use crate::analysis::label::SessionLabel;
use crate::analysis::spike_sync::SyncProfile;
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub foreground: RGBColor,
    pub palette: Vec<RGBColor>,
}
impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 500,
            background: RGBColor(10, 10, 10),
            foreground: WHITE,
            palette: vec![BLUE, RED, GREEN, CYAN, MAGENTA, YELLOW, WHITE],
        }
    }
}
/// What to draw around an averaged profile.
#[derive(Clone, Debug)]
pub struct ProfilePlotOptions {
    pub title: String,
    /// Visible part of the time axis.
    pub display: (f64, f64),
    pub stim_onset: Option<f64>,
    pub stim_end: Option<f64>,
}
/// An averaged profile together with its rendered PNG.
#[derive(Clone, Debug)]
pub struct ProfilePlot {
    pub average: AverageProfile,
    pub png: Vec<u8>,
}
/// One bar of the cross-session comparison.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSummary {
    pub label: SessionLabel,
    pub mean_sync: f64,
}
/// Averages `profiles` over `edges` and draws the mean as a line, with
/// vertical markers at stimulation onset and end.
pub fn plot_average_sync_profile<'a, I>(
    profiles: I,
    edges: (f64, f64),
    policy: AlignmentPolicy,
    options: &ProfilePlotOptions,
    style: &PlotStyle,
) -> Result<ProfilePlot, SyncError>
where
    I: IntoIterator<Item = &'a SyncProfile>,
{
    let average = average_profiles(profiles, edges, policy)?;
    let png = render_average_profile_png(&average, options, style)?;
    Ok(ProfilePlot { average, png })
}
pub fn render_average_profile_png(
    average: &AverageProfile,
    options: &ProfilePlotOptions,
    style: &PlotStyle,
) -> Result<Vec<u8>, SyncError> {
    if average.is_empty() {
        return Err(SyncError::Plot("average profile is empty".into()));
    }
    let (mut x0, mut x1) = options.display;
    let mut visible = average.points_within(x0, x1);
    if visible.is_empty() {
        log::warn!(
            "average profile has no points in [{x0}, {x1}]; drawing the whole window [{}, {}]",
            average.edges.0,
            average.edges.1
        );
        (x0, x1) = average.edges;
        visible = average.points_within(x0, x1);
    }
    if x1 <= x0 {
        return Err(SyncError::Plot(format!("empty time axis [{x0}, {x1}]")));
    }
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let y_max = visible.iter().map(|p| p.1).fold(0.0f64, f64::max).max(1e-3) * 1.1;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(&options.title, caption_font(style))
            .set_label_area_size(LabelAreaPosition::Left, 55)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(x0..x1, 0f64..y_max)?;
        chart
            .configure_mesh()
            .light_line_style(&style.foreground.mix(0.1))
            .label_style(label_font(style))
            .axis_desc_style(label_font(style))
            .x_desc("Time (s)")
            .y_desc("Synchronization")
            .draw()?;
        let line_color = style.palette[0];
        chart
            .draw_series(LineSeries::new(visible, &line_color))?
            .label(format!("Average sync profile (n={})", average.num_profiles))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &line_color));
        let markers = [
            (options.stim_onset, "Stimulation onset", RED),
            (options.stim_end, "Stimulation end", GREEN),
        ];
        for (at, name, color) in markers {
            let Some(at) = at.filter(|t| (x0..=x1).contains(t)) else {
                continue;
            };
            chart
                .draw_series(LineSeries::new(vec![(at, 0.0), (at, y_max)], &color))?
                .label(name)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
        }
        chart
            .configure_series_labels()
            .label_font(label_font(style))
            .border_style(&style.foreground.mix(0.2))
            .background_style(&style.background)
            .draw()?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
pub fn plot_adaptive_window_histogram(
    histogram: &WindowHistogram,
    title: &str,
    style: &PlotStyle,
) -> Result<Vec<u8>, SyncError> {
    if histogram.counts.is_empty() {
        return Err(SyncError::Plot("histogram has no bins".into()));
    }
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let y_max = histogram.counts.iter().copied().max().unwrap_or(0).max(1) as f64 * 1.1;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(title, caption_font(style))
            .set_label_area_size(LabelAreaPosition::Left, 55)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(histogram.binning.min..histogram.binning.max, 0f64..y_max)?;
        chart
            .configure_mesh()
            .light_line_style(&style.foreground.mix(0.1))
            .label_style(label_font(style))
            .axis_desc_style(label_font(style))
            .x_desc("Adaptive time window (s)")
            .y_desc("Frequency")
            .draw()?;
        let fill = MAGENTA.mix(0.7).filled();
        chart.draw_series(histogram.counts.iter().enumerate().map(|(bin, &count)| {
            let (lo, hi) = histogram.bin_edges(bin);
            Rectangle::new([(lo, 0.0), (hi, count as f64)], fill)
        }))?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
/// One bar per session, labelled by session date (or file name).
pub fn plot_session_comparison(
    summaries: &[SessionSummary],
    style: &PlotStyle,
) -> Result<Vec<u8>, SyncError> {
    if summaries.is_empty() {
        return Err(SyncError::Plot("no sessions to compare".into()));
    }
    let labels: Vec<&str> = summaries.iter().map(|s| s.label.text.as_str()).collect();
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let y_max = summaries
            .iter()
            .map(|s| s.mean_sync)
            .fold(0.0f64, f64::max)
            .max(1e-3)
            * 1.1;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(
                "Average Synchronization Across Entire Sessions",
                caption_font(style),
            )
            .set_label_area_size(LabelAreaPosition::Left, 55)
            .set_label_area_size(LabelAreaPosition::Bottom, 60)
            .build_cartesian_2d((0usize..summaries.len()).into_segmented(), 0f64..y_max)?;
        let format_session = |v: &SegmentValue<usize>| match v {
            SegmentValue::CenterOf(i) => labels.get(*i).map(|s| s.to_string()).unwrap_or_default(),
            _ => String::new(),
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .light_line_style(&style.foreground.mix(0.1))
            .label_style(label_font(style))
            .axis_desc_style(label_font(style))
            .x_labels(summaries.len())
            .x_label_formatter(&format_session)
            .x_desc("Session")
            .y_desc("Average synchronization")
            .draw()?;
        let fill = style.palette[0].filled();
        chart.draw_series(summaries.iter().enumerate().map(|(i, s)| {
            let mut bar = Rectangle::new(
                [
                    (SegmentValue::Exact(i), 0.0),
                    (SegmentValue::Exact(i + 1), s.mean_sync),
                ],
                fill,
            );
            bar.set_margin(0, 0, 8, 8);
            bar
        }))?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
fn caption_font(style: &PlotStyle) -> TextStyle<'static> {
    ("sans-serif", 20).into_font().color(&style.foreground)
}
fn label_font(style: &PlotStyle) -> TextStyle<'static> {
    ("sans-serif", 13).into_font().color(&style.foreground)
}
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, SyncError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| SyncError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
