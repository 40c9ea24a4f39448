use itertools::Itertools;
use mxi_gateway::types::BalanceSnapshot;
use std::fmt::Write;

pub const CHART_HEIGHT: f32 = 320.0;
pub const MIN_CHART_WIDTH: f32 = 320.0;
/// Fixed horizontal budget per data point; the chart widens as history
/// grows instead of compressing.
pub const POINT_SPACING: f32 = 80.0;

#[derive(Clone, Copy, Debug)]
pub struct Padding {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

pub const PADDING: Padding = Padding {
    top: 20.0,
    right: 10.0,
    bottom: 70.0,
    left: 60.0,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathCommand {
    MoveTo { x: f32, y: f32 },
    QuadTo { cx: f32, cy: f32, x: f32, y: f32 },
    LineTo { x: f32, y: f32 },
    Close,
}

/// A plotted data point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Marker {
    pub x: f32,
    pub y: f32,
    pub value: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisTick {
    pub y: f32,
    pub value: f64,
}

#[derive(Clone, Debug)]
pub struct ChartGeometry {
    pub width: f32,
    pub height: f32,
    /// Top of the y scale: twice the latest total, floored at 10.
    pub max_value: f64,
    pub markers: Vec<Marker>,
    pub line: Vec<PathCommand>,
    pub area: Vec<PathCommand>,
    pub ticks: Vec<AxisTick>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChangeSummary {
    pub change: f64,
    pub percentage: f64,
}

/// Lays the balance history out as line and area paths. `None` for an
/// empty history, which callers render as an empty state.
pub fn layout(history: &[BalanceSnapshot]) -> Option<ChartGeometry> {
    let last = history.last()?;
    let count = history.len();

    let width = MIN_CHART_WIDTH.max(count as f32 * POINT_SPACING);
    let plot_width = width - PADDING.left - PADDING.right;
    let plot_height = CHART_HEIGHT - PADDING.top - PADDING.bottom;
    // twice the current total for headroom; the floor avoids a degenerate
    // scale when the balance is still zero
    let max_value = (last.total_balance * 2.0).max(10.0);

    let x_at = |index: usize| -> f32 {
        if count == 1 {
            PADDING.left + plot_width / 2.0
        } else {
            PADDING.left + (index as f32 / (count - 1) as f32) * plot_width
        }
    };
    let y_at = |value: f64| -> f32 {
        PADDING.top + plot_height - (value / max_value) as f32 * plot_height
    };

    let markers: Vec<Marker> = history
        .iter()
        .enumerate()
        .map(|(index, snapshot)| Marker {
            x: x_at(index),
            y: y_at(snapshot.total_balance),
            value: snapshot.total_balance,
        })
        .collect();

    let first = markers[0];
    let mut line = vec![PathCommand::MoveTo {
        x: first.x,
        y: first.y,
    }];
    // each segment bends through the midpoint of the two x positions at
    // the previous point's height; kept exactly as the product renders it
    for (previous, next) in markers.iter().tuple_windows() {
        line.push(PathCommand::QuadTo {
            cx: (previous.x + next.x) / 2.0,
            cy: previous.y,
            x: next.x,
            y: next.y,
        });
    }

    let mut area = line.clone();
    let base_y = y_at(0.0);
    let last_marker = markers[markers.len() - 1];
    area.push(PathCommand::LineTo {
        x: last_marker.x,
        y: base_y,
    });
    area.push(PathCommand::LineTo {
        x: first.x,
        y: base_y,
    });
    area.push(PathCommand::Close);

    let ticks = [0.0f32, 0.25, 0.5, 0.75, 1.0]
        .into_iter()
        .map(|ratio| AxisTick {
            y: PADDING.top + plot_height * ratio,
            value: max_value * (1.0 - ratio as f64),
        })
        .collect();

    Some(ChartGeometry {
        width,
        height: CHART_HEIGHT,
        max_value,
        markers,
        line,
        area,
        ticks,
    })
}

/// SVG path-data rendering of a command list.
pub fn path_data(commands: &[PathCommand]) -> String {
    let mut data = String::new();
    for command in commands {
        match command {
            PathCommand::MoveTo { x, y } => {
                let _ = write!(data, "M {x} {y}");
            }
            PathCommand::QuadTo { cx, cy, x, y } => {
                let _ = write!(data, " Q {cx} {cy}, {x} {y}");
            }
            PathCommand::LineTo { x, y } => {
                let _ = write!(data, " L {x} {y}");
            }
            PathCommand::Close => data.push_str(" Z"),
        }
    }
    data
}

/// Absolute and relative movement between the first and last snapshots.
pub fn change_summary(history: &[BalanceSnapshot]) -> ChangeSummary {
    if history.len() < 2 {
        return ChangeSummary::default();
    }
    let first = history[0].total_balance;
    let last = history[history.len() - 1].total_balance;
    let change = last - first;
    let percentage = if first > 0.0 {
        change / first * 100.0
    } else {
        0.0
    };
    ChangeSummary { change, percentage }
}
