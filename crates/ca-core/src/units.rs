// ca-core/src/units.rs

use uom::si::f64::{ThermodynamicTemperature as UomTemperature, Time as UomTime};

use crate::{Real, SimTime};

pub type Temperature = UomTemperature;
pub type Time = UomTime;

/// Specific heat capacity of liquid water [J/(kg·K)].
pub const HEAT_CAPACITY_WATER: Real = 4.18e3;

#[inline]
pub fn degc(v: Real) -> Temperature {
    use uom::si::thermodynamic_temperature::degree_celsius;
    Temperature::new::<degree_celsius>(v)
}

#[inline]
pub fn celsius_to_kelvin(v: Real) -> Real {
    use uom::si::thermodynamic_temperature::kelvin;
    degc(v).get::<kelvin>()
}

#[inline]
pub fn kelvin_to_celsius(v: Real) -> Real {
    use uom::si::thermodynamic_temperature::{degree_celsius, kelvin};
    Temperature::new::<kelvin>(v).get::<degree_celsius>()
}

/// Length of `ticks` one-second ticks in hours.
#[inline]
pub fn ticks_to_hours(ticks: SimTime) -> Real {
    use uom::si::time::{hour, second};
    Time::new::<second>(ticks as Real).get::<hour>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Tolerances, nearly_equal};

    #[test]
    fn celsius_kelvin_round_trip() {
        let tol = Tolerances::default();
        assert!(nearly_equal(celsius_to_kelvin(0.0), 273.15, tol));
        assert!(nearly_equal(kelvin_to_celsius(celsius_to_kelvin(55.0)), 55.0, tol));
    }

    #[test]
    fn ten_minutes_in_hours() {
        assert!(nearly_equal(ticks_to_hours(600), 1.0 / 6.0, Tolerances::default()));
    }
}
