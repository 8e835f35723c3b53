/// Servo-style sweep: 0 up to 180 and back, never repeating an endpoint.
#[derive(Debug, Clone)]
pub struct PingPong {
    angle: u32,
    step: u32,
    rising: bool,
}

impl PingPong {
    pub fn new(step: u32) -> Self {
        Self {
            angle: 0,
            step: step.clamp(1, 180),
            rising: true,
        }
    }
}

impl Iterator for PingPong {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let out = self.angle;
        if self.rising {
            self.angle = (self.angle + self.step).min(180);
            if self.angle == 180 {
                self.rising = false;
            }
        } else {
            self.angle = self.angle.saturating_sub(self.step);
            if self.angle == 0 {
                self.rising = true;
            }
        }
        Some(out)
    }
}
