use iced::{
    mouse,
    widget::canvas::{self, Frame, Geometry, LineDash, Path, Stroke, Text},
    Color, Point, Rectangle, Renderer, Theme,
};
use radarcore::scan::{fading, RadarProjector, RenderModel};

const RING_COUNT: usize = 5;
const RADIAL_STEP: u32 = 30;

fn green(alpha: f32) -> Color {
    Color::from_rgba(0.13, 0.77, 0.37, alpha)
}

fn red(alpha: f32) -> Color {
    Color::from_rgba(0.94, 0.27, 0.27, alpha)
}

fn point((x, y): (f64, f64)) -> Point {
    Point::new(x as f32, y as f32)
}

/// Semicircular radar plot for one render model.
pub struct RadarScope {
    pub model: RenderModel,
    pub projector: RadarProjector,
    /// 0..1 animation phase of the contact marker.
    pub pulse: f32,
}

impl RadarScope {
    fn draw_grid(&self, frame: &mut Frame) {
        let projector = &self.projector;
        let center = point((projector.center_x, projector.center_y));

        for radius in projector.ring_radii(RING_COUNT) {
            let ring = RadarProjector::new(projector.center_x, projector.center_y, radius);
            let arc = Path::new(|builder| {
                builder.move_to(point(ring.rim(0.0)));
                for angle in (3..=180).step_by(3) {
                    builder.line_to(point(ring.rim(angle as f64)));
                }
            });
            frame.stroke(&arc, Stroke::default().with_color(green(0.3)).with_width(1.0));
        }

        for (_, rim) in projector.radial_lines(RADIAL_STEP) {
            let line = Path::line(center, point(rim));
            frame.stroke(&line, Stroke::default().with_color(green(0.3)).with_width(1.0));
        }

        let baseline = Path::line(
            point(projector.rim(0.0)),
            point(projector.rim(180.0)),
        );
        frame.stroke(&baseline, Stroke::default().with_color(green(0.8)).with_width(2.0));

        let labels = RadarProjector::new(
            projector.center_x,
            projector.center_y,
            projector.plot_radius + 16.0,
        );
        for (angle, position) in labels.radial_lines(RADIAL_STEP) {
            frame.fill_text(Text {
                content: format!("{}°", angle),
                position: point(position),
                color: green(1.0),
                size: 12.0.into(),
                ..Text::default()
            });
        }

        for (ring, radius) in projector.ring_radii(RING_COUNT).into_iter().enumerate() {
            let distance = self.model.max_distance * (ring + 1) as f64 / RING_COUNT as f64;
            frame.fill_text(Text {
                content: format!("{:.0}cm", distance),
                position: Point::new(
                    (projector.center_x + radius - 15.0) as f32,
                    (projector.center_y - 14.0) as f32,
                ),
                color: green(0.6),
                size: 10.0.into(),
                ..Text::default()
            });
        }

        frame.fill(&Path::circle(center, 3.0), green(1.0));
    }

    fn draw_trail(&self, frame: &mut Frame) {
        for (sample, opacity) in fading(&self.model.trail) {
            let projection =
                self.projector
                    .project(sample.angle, sample.distance, self.model.max_distance);
            let dot = Path::circle(point(projection.point()), 4.0);
            frame.fill(&dot, green(opacity));
            frame.stroke(&dot, Stroke::default().with_color(green(1.0)).with_width(1.0));
        }
    }

    fn draw_current(&self, frame: &mut Frame) {
        let Some(sample) = &self.model.current_sample else {
            return;
        };
        let center = point((self.projector.center_x, self.projector.center_y));

        let bearing = Path::line(center, point(self.projector.rim(sample.angle)));
        frame.stroke(
            &bearing,
            Stroke {
                line_dash: LineDash {
                    segments: &[3.0, 3.0],
                    offset: 0,
                },
                ..Stroke::default().with_color(green(0.8)).with_width(2.0)
            },
        );

        if !self.model.has_contact() {
            return;
        }
        let projection =
            self.projector
                .project(sample.angle, sample.distance, self.model.max_distance);
        let target = point(projection.point());
        let radius = 8.0 + 4.0 * (self.pulse * std::f32::consts::PI).sin();
        frame.fill(&Path::circle(target, radius + 4.0), red(0.25));
        frame.fill(&Path::circle(target, radius), red(1.0));
        frame.stroke(
            &Path::line(center, target),
            Stroke {
                line_dash: LineDash {
                    segments: &[5.0, 5.0],
                    offset: 0,
                },
                ..Stroke::default().with_color(red(0.6)).with_width(2.0)
            },
        );
    }
}

impl<Message> canvas::Program<Message> for RadarScope {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        frame.fill_rectangle(Point::ORIGIN, bounds.size(), Color::BLACK);

        self.draw_grid(&mut frame);
        self.draw_trail(&mut frame);
        self.draw_current(&mut frame);

        vec![frame.into_geometry()]
    }
}
