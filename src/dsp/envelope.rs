//! Breakpoint envelopes for gain and frequency automation.
//!
//! A curve is a list of breakpoints in voice-local seconds. Each breakpoint
//! either jumps to a value or ramps to it (linearly or exponentially) from the
//! previous breakpoint; after the last breakpoint the value holds.

/// How a breakpoint is approached from the one before it.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Segment {
    Set,
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Breakpoint {
    time: f64,
    value: f64,
    segment: Segment,
}

/// Piecewise automation curve.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    points: Vec<Breakpoint>,
    /// Index of the breakpoint at or before the last evaluated time.
    cursor: usize,
}

impl Envelope {
    /// A curve that starts at `initial` at t = 0.
    pub fn new(initial: f64) -> Self {
        Envelope {
            points: vec![Breakpoint {
                time: 0.0,
                value: initial,
                segment: Segment::Set,
            }],
            cursor: 0,
        }
    }

    /// A curve that never changes.
    pub fn constant(value: f64) -> Self {
        Envelope::new(value)
    }

    /// Jump to `value` at `time`.
    pub fn set_at(self, time: f64, value: f64) -> Self {
        self.push(time, value, Segment::Set)
    }

    /// Ramp linearly from the previous breakpoint to `value` at `time`.
    pub fn linear_to(self, time: f64, value: f64) -> Self {
        self.push(time, value, Segment::Linear)
    }

    /// Ramp exponentially from the previous breakpoint to `value` at `time`.
    /// Both ends must be non-zero with the same sign, otherwise the previous
    /// value holds until `time`.
    pub fn exponential_to(self, time: f64, value: f64) -> Self {
        self.push(time, value, Segment::Exponential)
    }

    fn push(mut self, time: f64, value: f64, segment: Segment) -> Self {
        // Breakpoints must not go back in time.
        let last = self.last_time();
        self.points.push(Breakpoint {
            time: time.max(last),
            value,
            segment,
        });
        self
    }

    /// Time of the final breakpoint.
    pub fn last_time(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.time)
    }

    /// Value the curve settles on after its final breakpoint.
    pub fn final_value(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.value)
    }

    /// Evaluate the curve at `t` seconds.
    pub fn value_at(&self, t: f64) -> f64 {
        let idx = self.points.partition_point(|p| p.time <= t);
        self.interpolate(idx, t)
    }

    /// Evaluate at a time no earlier than the previous call. Voices render
    /// forward only, so this walks the breakpoint list once per voice.
    pub fn next_value(&mut self, t: f64) -> f64 {
        while self.cursor + 1 < self.points.len() && self.points[self.cursor + 1].time <= t {
            self.cursor += 1;
        }
        self.interpolate(self.cursor + 1, t)
    }

    /// `next` is the index of the first breakpoint strictly after `t`.
    fn interpolate(&self, next: usize, t: f64) -> f64 {
        if next == 0 {
            return self.points[0].value;
        }
        let prev = self.points[next - 1];
        let Some(target) = self.points.get(next) else {
            return prev.value;
        };

        let span = target.time - prev.time;
        if span <= 0.0 {
            return prev.value;
        }
        let frac = ((t - prev.time) / span).clamp(0.0, 1.0);

        match target.segment {
            Segment::Set => prev.value,
            Segment::Linear => prev.value + (target.value - prev.value) * frac,
            Segment::Exponential => {
                let same_sign = prev.value * target.value > 0.0;
                if same_sign {
                    prev.value * (target.value / prev.value).powf(frac)
                } else {
                    prev.value
                }
            }
        }
    }
}
