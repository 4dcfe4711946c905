use macroquad::prelude::*;
use tracing::info;

use tracer_motion::Rgb;

use crate::blackboard::{Blackboard, snapshot};
use crate::sim::{SimPose, SimSettings};

// Function to configure the macroquad window
pub fn window_conf() -> Conf {
    Conf {
        window_title: "Tracer Course Visualization".to_string(),
        window_width: 1000,
        window_height: 700,
        high_dpi: true,
        ..Default::default()
    }
}

const MARGIN: f32 = 40.0;
const ROBOT_SIZE: f32 = 12.0;

/// World-to-screen mapping; the world is in millimeters with y up.
struct View {
    min_x: f64,
    min_y: f64,
    scale: f32,
}

impl View {
    fn new(course: &SimSettings, scale: f32) -> Self {
        let xs = course.line.iter().map(|p| p[0]).chain([course.start.x]);
        let ys = course.line.iter().map(|p| p[1]).chain([course.start.y]);
        View {
            min_x: xs.fold(f64::INFINITY, f64::min),
            min_y: ys.fold(f64::INFINITY, f64::min),
            scale,
        }
    }

    fn to_screen(&self, p: [f64; 2]) -> Vec2 {
        Vec2::new(
            MARGIN + (p[0] - self.min_x) as f32 * self.scale,
            screen_height() - MARGIN - (p[1] - self.min_y) as f32 * self.scale,
        )
    }
}

fn color(rgb: Rgb) -> Color {
    let c = |v: u16| v.min(255) as u8;
    Color::from_rgba(c(rgb.r), c(rgb.g), c(rgb.b), 255)
}

fn draw_course(view: &View, course: &SimSettings) {
    let width = (course.line_width as f32 * view.scale).max(1.0);
    for seg in course.line.windows(2) {
        let (a, b) = (view.to_screen(seg[0]), view.to_screen(seg[1]));
        draw_line(a.x, a.y, b.x, b.y, width, color(course.line_color));
    }
    for marker in &course.markers {
        let c = view.to_screen(marker.center);
        draw_circle(c.x, c.y, marker.radius as f32 * view.scale, color(marker.color));
    }
    for slope in &course.slopes {
        let c = view.to_screen(slope.center);
        draw_circle_lines(c.x, c.y, slope.radius as f32 * view.scale, 1.0, ORANGE);
    }
    for wall in &course.walls {
        let (a, b) = (view.to_screen(wall.from), view.to_screen(wall.to));
        draw_line(a.x, a.y, b.x, b.y, 4.0, DARKBROWN);
    }
}

fn draw_robot(view: &View, pose: SimPose) {
    let at = view.to_screen([pose.x, pose.y]);
    // Screen y points down, so a right turn is a positive screen angle.
    let th = pose.heading.to_radians() as f32;
    let corner = |offset: f32| {
        Vec2::new(
            at.x + ROBOT_SIZE * (th + offset).cos(),
            at.y + ROBOT_SIZE * (th + offset).sin(),
        )
    };
    let third = 2.0 * std::f32::consts::PI / 3.0;
    let (p1, p2, p3) = (corner(0.0), corner(third), corner(-third));
    draw_triangle(p1, p2, p3, BLUE);
    draw_line(at.x, at.y, p1.x, p1.y, 2.0, DARKBLUE);
}

pub async fn run_visualization_loop(bb: Blackboard, course: SimSettings, scale: f32) {
    info!("Visualization loop starting inside graphics module...");
    let view = View::new(&course, scale);

    loop {
        let state = snapshot(&bb);
        let t = &state.telemetry;

        clear_background(color(course.floor));
        draw_course(&view, &course);
        for (from, to) in state.trail.iter().zip(state.trail.iter().skip(1)) {
            let (a, b) = (view.to_screen([from.x, from.y]), view.to_screen([to.x, to.y]));
            draw_line(a.x, a.y, b.x, b.y, 1.0, SKYBLUE);
        }
        draw_robot(&view, state.pose);

        let lines = [
            format!(
                "Mission: {}  phase: {}  tick: {} ({} ms)",
                t.mission, t.phase, t.tick, t.elapsed_ms
            ),
            format!("Odometry: distance={:.1} heading={:.1} speed={:.1}", t.distance, t.heading, t.speed),
            format!("Command: {}  reported: {}", t.command, t.reported),
            format!(
                "Sensors: rgb=({}, {}, {}) range={}cm gyro={}",
                t.rgb.r, t.rgb.g, t.rgb.b, t.range_cm, t.gyro_angle
            ),
            if state.running {
                "Running".to_string()
            } else {
                format!("Stopped {}", state.faults.join(", "))
            },
        ];
        for (i, line) in lines.iter().enumerate() {
            draw_text(line, 10.0, 20.0 + 20.0 * i as f32, 20.0, BLACK);
        }

        next_frame().await
    }
}
