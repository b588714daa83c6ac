// Simulation Clock - calendar date carried alongside the orbit recurrence

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Days per frame at the slider's centre position
pub const BASE_SIM_SPEED: f64 = 1.0 / 2_592_000.0;

/// Slider value that maps to `BASE_SIM_SPEED`
pub const SLIDER_CENTER: f64 = 50.0;

/// Frames per second the displayed rate assumes
const DISPLAY_FRAMES_PER_SECOND: f64 = 40.0;

/// Map a 0-100 time slider to days per frame. Every two slider steps away
/// from the centre doubles the rate; below the centre time runs backwards.
pub fn sim_speed_from_slider(value: f64) -> f64 {
    let offset = value - SLIDER_CENTER;
    let magnitude = BASE_SIM_SPEED * 2f64.powf(offset.abs() / 2.0);
    if offset < 0.0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Rate label shown next to the slider (days per second)
pub fn days_per_second(sim_speed_days: f64) -> f64 {
    sim_speed_days * DISPLAY_FRAMES_PER_SECOND
}

/// Calendar date of the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationClock {
    date: DateTime<Utc>,
}

impl SimulationClock {
    pub fn new(date: DateTime<Utc>) -> Self {
        Self { date }
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    /// Move the date by `sim_speed_days`; zero leaves it untouched.
    /// Out-of-range results saturate at the current date.
    pub fn advance(&mut self, sim_speed_days: f64) {
        if sim_speed_days == 0.0 || !sim_speed_days.is_finite() {
            return;
        }
        let millis = (sim_speed_days * 86_400_000.0).round() as i64;
        if let Some(date) = self.date.checked_add_signed(Duration::milliseconds(millis)) {
            self.date = date;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn clock() -> SimulationClock {
        SimulationClock::new(Utc.with_ymd_and_hms(2024, 10, 5, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_slider_centre_and_doubling() {
        assert_relative_eq!(sim_speed_from_slider(50.0), BASE_SIM_SPEED);
        assert_relative_eq!(sim_speed_from_slider(52.0), 2.0 * BASE_SIM_SPEED);
        assert_relative_eq!(sim_speed_from_slider(100.0), BASE_SIM_SPEED * 2f64.powi(25));
        assert_relative_eq!(sim_speed_from_slider(46.0), -4.0 * BASE_SIM_SPEED);
    }

    #[test]
    fn test_days_per_second_label() {
        assert_relative_eq!(days_per_second(0.5), 20.0);
    }

    #[test]
    fn test_clock_moves_both_ways() {
        let mut c = clock();
        c.advance(1.5);
        assert_eq!(c.date(), Utc.with_ymd_and_hms(2024, 10, 6, 12, 0, 0).unwrap());
        c.advance(-2.0);
        assert_eq!(c.date(), Utc.with_ymd_and_hms(2024, 10, 4, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_zero_speed_keeps_date() {
        let mut c = clock();
        c.advance(0.0);
        c.advance(f64::NAN);
        assert_eq!(c, clock());
    }
}
