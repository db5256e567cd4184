//! Degree, microsecond and unit conversion
//!
//! Every servo carries a [`UnitConverter`] that maps external values to the
//! internal unit space of its transport. All intermediate products use i64,
//! so calibration end points and microsecond values never overflow.

use crate::config::{EasingConfig, MICROS_THRESHOLD};
use crate::traits::{UnitSpace, EXPANDER_STEPS_PER_PERIOD};

/// Integer division rounding half away from zero
fn div_round(numerator: i64, denominator: i64) -> i64 {
    if (numerator < 0) != (denominator < 0) {
        (numerator - denominator / 2) / denominator
    } else {
        (numerator + denominator / 2) / denominator
    }
}

/// Rounding linear map of `x` from `in_low..in_high` onto `out_low..out_high`
fn map_round(x: i64, in_low: i64, in_high: i64, out_low: i64, out_high: i64) -> i64 {
    out_low + div_round((x - in_low) * (out_high - out_low), in_high - in_low)
}

/// Unit values for logical 0 and 180 degree
///
/// Invariant: `unit0 != unit180`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    unit0: i32,
    unit180: i32,
}

impl Calibration {
    /// Create a calibration from unit end points
    ///
    /// Returns None if both end points are equal.
    pub const fn new(unit0: i32, unit180: i32) -> Option<Self> {
        if unit0 == unit180 {
            None
        } else {
            Some(Self { unit0, unit180 })
        }
    }

    /// Derive the 0/180 degree end points from two measured pulse widths
    ///
    /// The pulse widths belong to the logical angles `degree_low` and
    /// `degree_high`; the 0 and 180 degree values are inter- or extrapolated
    /// from them and converted into `space` units.
    pub fn from_micros(
        micros_low: i32,
        micros_high: i32,
        degree_low: i32,
        degree_high: i32,
        space: UnitSpace,
    ) -> Option<Self> {
        if degree_low == degree_high {
            return None;
        }
        let micros0 = map_round(
            0,
            degree_low as i64,
            degree_high as i64,
            micros_low as i64,
            micros_high as i64,
        );
        let micros180 = map_round(
            180,
            degree_low as i64,
            degree_high as i64,
            micros_low as i64,
            micros_high as i64,
        );
        Self::new(
            micros_to_units(space, micros0 as i32),
            micros_to_units(space, micros180 as i32),
        )
    }

    /// Units at 0 degree
    pub const fn unit0(&self) -> i32 {
        self.unit0
    }

    /// Units at 180 degree
    pub const fn unit180(&self) -> i32 {
        self.unit180
    }

    /// Units between 0 and 180 degree (never zero, may be negative)
    pub const fn span(&self) -> i32 {
        self.unit180 - self.unit0
    }

    /// Mirror a unit value around the calibration midpoint
    pub const fn reverse(&self, units: i32) -> i32 {
        self.unit180 - (units - self.unit0)
    }
}

/// Convert microseconds into units of `space`
pub fn micros_to_units(space: UnitSpace, micros: i32) -> i32 {
    match space {
        UnitSpace::Microseconds => micros,
        UnitSpace::Expander {
            refresh_interval_us,
        } => {
            (micros as i64 * EXPANDER_STEPS_PER_PERIOD as i64 / refresh_interval_us as i64) as i32
        }
    }
}

/// Convert units of `space` into microseconds
pub fn units_to_micros(space: UnitSpace, units: i32) -> i32 {
    match space {
        UnitSpace::Microseconds => units,
        UnitSpace::Expander {
            refresh_interval_us,
        } => {
            (units as i64 * refresh_interval_us as i64 / EXPANDER_STEPS_PER_PERIOD as i64) as i32
        }
    }
}

/// Per-servo converter between external values and transport units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UnitConverter {
    calibration: Calibration,
    space: UnitSpace,
    micros_threshold: i32,
    micros_as_degree: bool,
}

impl UnitConverter {
    /// Create a converter with the default threshold
    pub const fn new(calibration: Calibration, space: UnitSpace) -> Self {
        Self {
            calibration,
            space,
            micros_threshold: MICROS_THRESHOLD,
            micros_as_degree: true,
        }
    }

    /// Create a converter honoring the threshold settings of `config`
    pub const fn with_config(
        calibration: Calibration,
        space: UnitSpace,
        config: &EasingConfig,
    ) -> Self {
        Self {
            calibration,
            space,
            micros_threshold: config.micros_threshold,
            micros_as_degree: config.micros_as_degree,
        }
    }

    /// Calibration end points
    pub const fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Unit space of the transport
    pub const fn unit_space(&self) -> UnitSpace {
        self.space
    }

    /// Check if `value` is interpreted as microseconds rather than degree
    pub const fn is_micros(&self, value: i32) -> bool {
        self.micros_as_degree && value >= self.micros_threshold
    }

    /// Map a (possibly negative) degree onto units, rounding to nearest
    pub fn degree_to_units(&self, degree: i32) -> i32 {
        map_round(
            degree as i64,
            0,
            180,
            self.calibration.unit0 as i64,
            self.calibration.unit180 as i64,
        ) as i32
    }

    /// Convert a degree or microsecond value into units
    pub fn degree_or_micros_to_units(&self, value: i32) -> i32 {
        if self.is_micros(value) {
            self.micros_to_units(value)
        } else {
            self.degree_to_units(value)
        }
    }

    /// Convert units back to degree
    ///
    /// Adds half a degree worth of units before dividing, so the exact
    /// calibration end points map to exactly 0 and 180.
    pub fn units_to_degree(&self, units: i32) -> i32 {
        let unit0 = self.calibration.unit0 as i64;
        let span = self.calibration.unit180 as i64 - unit0;
        let offset = units as i64 - unit0;
        ((offset * 180 + span / 2) / span).clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }

    /// Convert microseconds to degree, independent of the unit space
    pub fn micros_to_degree(&self, micros: i32) -> i32 {
        match self.space {
            UnitSpace::Microseconds => self.units_to_degree(micros),
            UnitSpace::Expander { .. } => {
                let micros0 = self.units_to_micros(self.calibration.unit0) as i64;
                let span = self.units_to_micros(self.calibration.span()) as i64;
                (((micros as i64 - micros0) * 180 + span / 2) / span) as i32
            }
        }
    }

    /// Convert microseconds to units (identity without an expander)
    pub fn micros_to_units(&self, micros: i32) -> i32 {
        micros_to_units(self.space, micros)
    }

    /// Convert units to microseconds (identity without an expander)
    pub fn units_to_micros(&self, units: i32) -> i32 {
        units_to_micros(self.space, units)
    }

    /// Signed unit offset equivalent to `degree` degrees
    pub fn degree_to_unit_offset(&self, degree: i32) -> i32 {
        if degree >= 0 {
            self.degree_to_units(degree) - self.calibration.unit0
        } else {
            -(self.degree_to_units(-degree) - self.calibration.unit0)
        }
    }

    /// Signed degree equivalent of a unit delta
    pub fn unit_offset_to_degree(&self, delta: i32) -> i32 {
        if delta >= 0 {
            self.units_to_degree(delta + self.calibration.unit0)
        } else {
            -self.units_to_degree(self.calibration.unit0 - delta)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn micros_converter() -> UnitConverter {
        let calibration = Calibration::from_micros(544, 2400, 0, 180, UnitSpace::Microseconds)
            .unwrap();
        UnitConverter::new(calibration, UnitSpace::Microseconds)
    }

    fn expander_converter() -> UnitConverter {
        let calibration = Calibration::from_micros(544, 2400, 0, 180, UnitSpace::expander())
            .unwrap();
        UnitConverter::new(calibration, UnitSpace::expander())
    }

    #[test]
    fn test_calibration_rejects_zero_span() {
        assert!(Calibration::new(1500, 1500).is_none());
        assert!(Calibration::from_micros(1000, 2000, 90, 90, UnitSpace::Microseconds).is_none());
        assert!(Calibration::from_micros(1500, 1500, 0, 180, UnitSpace::Microseconds).is_none());
    }

    #[test]
    fn test_calibration_from_default_micros() {
        let cal = micros_converter().calibration();
        assert_eq!(cal.unit0(), 544);
        assert_eq!(cal.unit180(), 2400);
        assert_eq!(cal.span(), 1856);

        let cal = expander_converter().calibration();
        assert_eq!(cal.unit0(), 111);
        assert_eq!(cal.unit180(), 491);
    }

    #[test]
    fn test_calibration_extrapolates_custom_range() {
        // -90..90 degree mapped onto 1000..2000 us
        let cal = Calibration::from_micros(1000, 2000, -90, 90, UnitSpace::Microseconds).unwrap();
        assert_eq!(cal.unit0(), 1500);
        assert_eq!(cal.unit180(), 2500);
    }

    #[test]
    fn test_degree_to_units_rounds() {
        let conv = micros_converter();
        assert_eq!(conv.degree_to_units(0), 544);
        assert_eq!(conv.degree_to_units(90), 1472);
        assert_eq!(conv.degree_to_units(180), 2400);
        // 1 degree = 10.311 us, rounds down; 2 degree = 20.62 us, rounds up
        assert_eq!(conv.degree_to_units(1), 554);
        assert_eq!(conv.degree_to_units(2), 565);
        // Negative degree extrapolates below the 0 degree end point
        assert_eq!(conv.degree_to_units(-10), 441);
    }

    #[test]
    fn test_threshold_selects_microseconds() {
        let conv = micros_converter();
        assert_eq!(conv.degree_or_micros_to_units(399), conv.degree_to_units(399));
        assert_eq!(conv.degree_or_micros_to_units(400), 400);
        assert_eq!(conv.degree_or_micros_to_units(1500), 1500);

        let conv = expander_converter();
        assert_eq!(conv.degree_or_micros_to_units(1500), 307);
    }

    #[test]
    fn test_micros_as_degree_disabled() {
        let config = EasingConfig {
            micros_as_degree: false,
            ..Default::default()
        };
        let conv = UnitConverter::with_config(
            micros_converter().calibration(),
            UnitSpace::Microseconds,
            &config,
        );
        assert!(!conv.is_micros(1500));
        assert_eq!(conv.degree_or_micros_to_units(450), conv.degree_to_units(450));
    }

    #[test]
    fn test_units_to_degree_end_points() {
        let conv = micros_converter();
        assert_eq!(conv.units_to_degree(544), 0);
        assert_eq!(conv.units_to_degree(2400), 180);
        assert_eq!(conv.units_to_degree(1472), 90);

        let conv = expander_converter();
        assert_eq!(conv.units_to_degree(111), 0);
        assert_eq!(conv.units_to_degree(491), 180);
    }

    #[test]
    fn test_expander_micros_round_trip() {
        let space = UnitSpace::expander();
        for micros in [544, 1000, 1500, 2000, 2400] {
            let units = micros_to_units(space, micros);
            let back = units_to_micros(space, units);
            // one unit is 4.88 us
            assert!((back - micros).abs() <= 5, "{} -> {} -> {}", micros, units, back);
        }
        assert_eq!(units_to_micros(space, 4096), 20_000);
    }

    #[test]
    fn test_micros_to_degree() {
        let conv = micros_converter();
        assert_eq!(conv.micros_to_degree(544), 0);
        assert_eq!(conv.micros_to_degree(2400), 180);

        let conv = expander_converter();
        assert_eq!(conv.micros_to_degree(conv.units_to_micros(111)), 0);
        assert_eq!(conv.micros_to_degree(2400), 180);
    }

    #[test]
    fn test_unit_offsets() {
        let conv = micros_converter();
        assert_eq!(conv.degree_to_unit_offset(10), 103);
        assert_eq!(conv.degree_to_unit_offset(-10), -103);
        assert_eq!(conv.unit_offset_to_degree(103), 10);
        assert_eq!(conv.unit_offset_to_degree(-103), -10);
    }

    #[test]
    fn test_reverse_mirrors_midpoint() {
        let conv = micros_converter();
        let cal = conv.calibration();
        assert_eq!(cal.reverse(conv.degree_to_units(45)), conv.degree_to_units(135));
        assert_eq!(cal.reverse(544), 2400);
    }

    #[test]
    fn test_wide_values_do_not_overflow() {
        let cal = Calibration::new(0, i32::MAX / 2).unwrap();
        let conv = UnitConverter::new(cal, UnitSpace::Microseconds);
        assert_eq!(conv.units_to_degree(i32::MAX / 2), 180);
        assert_eq!(conv.degree_to_units(180), i32::MAX / 2);
    }

    #[test]
    fn test_units_to_degree_extreme_units() {
        let conv = UnitConverter::new(Calibration::new(1000, 2000).unwrap(), UnitSpace::Microseconds);
        assert_eq!(conv.units_to_degree(i32::MIN), -386_547_236);

        let conv = UnitConverter::new(Calibration::new(0, 1).unwrap(), UnitSpace::Microseconds);
        assert_eq!(conv.units_to_degree(i32::MAX), i32::MAX);
        assert_eq!(conv.units_to_degree(i32::MIN), i32::MIN);
    }

    proptest! {
        #[test]
        fn prop_degree_round_trip_micros(
            degree in 0i32..=180,
            low in 400i32..1000,
            width in 800i32..2000,
        ) {
            let cal = Calibration::from_micros(low, low + width, 0, 180, UnitSpace::Microseconds)
                .unwrap();
            let conv = UnitConverter::new(cal, UnitSpace::Microseconds);
            prop_assert_eq!(conv.units_to_degree(conv.degree_to_units(degree)), degree);
        }

        #[test]
        fn prop_degree_round_trip_expander(degree in 0i32..=180) {
            let conv = expander_converter();
            prop_assert_eq!(conv.units_to_degree(conv.degree_to_units(degree)), degree);
        }
    }
}
