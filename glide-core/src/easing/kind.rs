//! Easing type selection
//!
//! An easing type combines a curve family with a call style. The byte
//! encoding (`family | style`) matches the codes used by existing
//! sketches, so stored or transmitted codes keep their meaning.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::curves::{self, EaseFn};

/// Mask selecting the curve family of an easing code
pub const EASE_TYPE_MASK: u8 = 0x0F;

/// Mask selecting the call style of an easing code
pub const CALL_STYLE_MASK: u8 = 0xE0;

/// Curve family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Curve {
    /// Constant speed, computed with integer arithmetic
    #[default]
    Linear = 0x00,
    Quadratic = 0x01,
    Cubic = 0x02,
    Quartic = 0x03,
    /// Curve registered with `register_user_ease_in_function`
    User = 0x06,
    /// Holds the current position for the move duration
    Dummy = 0x07,
    Sine = 0x08,
    Circular = 0x09,
    Back = 0x0A,
    Elastic = 0x0B,
    /// Canonical form is the "out" shape
    Bounce = 0x0C,
}

impl Curve {
    /// Decode the curve family bits of an easing code
    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code & EASE_TYPE_MASK {
            0x00 => Self::Linear,
            0x01 => Self::Quadratic,
            0x02 => Self::Cubic,
            0x03 => Self::Quartic,
            0x06 => Self::User,
            0x07 => Self::Dummy,
            0x08 => Self::Sine,
            0x09 => Self::Circular,
            0x0A => Self::Back,
            0x0B => Self::Elastic,
            0x0C => Self::Bounce,
            _ => return None,
        })
    }

    /// Evaluate the canonical curve
    ///
    /// `user` is only consulted for [`Curve::User`]; without a registered
    /// function the result is 0.0.
    pub fn evaluate(self, t: f32, user: Option<EaseFn>) -> f32 {
        match self {
            Self::Linear => t,
            Self::Quadratic => curves::quadratic_in(t),
            Self::Cubic => curves::cubic_in(t),
            Self::Quartic => curves::quartic_in(t),
            Self::User => user.map_or(0.0, |f| f(t)),
            Self::Dummy => 0.0,
            Self::Sine => curves::sine_in(t),
            Self::Circular => curves::circular_in(t),
            Self::Back => curves::back_in(t),
            Self::Elastic => curves::elastic_in(t),
            Self::Bounce => curves::bounce_out(t),
        }
    }

    /// Ease-in type of this curve
    pub const fn ease_in(self) -> EasingType {
        EasingType::new(self, CallStyle::Direct)
    }

    /// Ease-out type of this curve
    pub const fn ease_out(self) -> EasingType {
        EasingType::new(self, CallStyle::Out)
    }

    /// Ease-in-out type of this curve
    pub const fn ease_in_out(self) -> EasingType {
        EasingType::new(self, CallStyle::InOut)
    }

    /// Bouncing type of this curve: out to the target and back to the start
    pub const fn bouncing(self) -> EasingType {
        EasingType::new(self, CallStyle::BouncingOutIn)
    }
}

/// Transform applied to the canonical curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum CallStyle {
    /// `f(t)`
    #[default]
    Direct = 0x00,
    /// `1 - f(1 - t)`
    Out = 0x20,
    /// Half-speed `f` up to t = 0.5, mirrored afterwards
    InOut = 0x40,
    /// Out shape to the target in the first half, back to the start in the second
    BouncingOutIn = 0x60,
}

impl CallStyle {
    /// Decode the call style bits of an easing code
    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code & CALL_STYLE_MASK {
            0x00 => Self::Direct,
            0x20 => Self::Out,
            0x40 => Self::InOut,
            0x60 => Self::BouncingOutIn,
            _ => return None,
        })
    }

    /// Map a time fraction to a movement fraction using curve `f`
    pub fn apply(self, t: f32, f: impl Fn(f32) -> f32) -> f32 {
        match self {
            Self::Direct => f(t),
            Self::Out => 1.0 - f(1.0 - t),
            Self::InOut => {
                if t <= 0.5 {
                    0.5 * f(2.0 * t)
                } else {
                    1.0 - 0.5 * f(2.0 - 2.0 * t)
                }
            }
            Self::BouncingOutIn => {
                if t <= 0.5 {
                    1.0 - f(1.0 - 2.0 * t)
                } else {
                    1.0 - f(2.0 * t - 1.0)
                }
            }
        }
    }
}

/// Curve family plus call style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EasingType {
    pub curve: Curve,
    pub style: CallStyle,
}

impl EasingType {
    pub const LINEAR: Self = Curve::Linear.ease_in();

    pub const QUADRATIC_IN: Self = Curve::Quadratic.ease_in();
    pub const QUADRATIC_OUT: Self = Curve::Quadratic.ease_out();
    pub const QUADRATIC_IN_OUT: Self = Curve::Quadratic.ease_in_out();
    pub const QUADRATIC_BOUNCING: Self = Curve::Quadratic.bouncing();

    pub const CUBIC_IN: Self = Curve::Cubic.ease_in();
    pub const CUBIC_OUT: Self = Curve::Cubic.ease_out();
    pub const CUBIC_IN_OUT: Self = Curve::Cubic.ease_in_out();
    pub const CUBIC_BOUNCING: Self = Curve::Cubic.bouncing();

    pub const QUARTIC_IN: Self = Curve::Quartic.ease_in();
    pub const QUARTIC_OUT: Self = Curve::Quartic.ease_out();
    pub const QUARTIC_IN_OUT: Self = Curve::Quartic.ease_in_out();
    pub const QUARTIC_BOUNCING: Self = Curve::Quartic.bouncing();

    pub const USER_DIRECT: Self = Curve::User.ease_in();
    pub const USER_OUT: Self = Curve::User.ease_out();
    pub const USER_IN_OUT: Self = Curve::User.ease_in_out();
    pub const USER_BOUNCING: Self = Curve::User.bouncing();

    pub const DUMMY_MOVE: Self = Curve::Dummy.ease_in();

    pub const SINE_IN: Self = Curve::Sine.ease_in();
    pub const SINE_OUT: Self = Curve::Sine.ease_out();
    pub const SINE_IN_OUT: Self = Curve::Sine.ease_in_out();
    pub const SINE_BOUNCING: Self = Curve::Sine.bouncing();

    pub const CIRCULAR_IN: Self = Curve::Circular.ease_in();
    pub const CIRCULAR_OUT: Self = Curve::Circular.ease_out();
    pub const CIRCULAR_IN_OUT: Self = Curve::Circular.ease_in_out();
    pub const CIRCULAR_BOUNCING: Self = Curve::Circular.bouncing();

    pub const BACK_IN: Self = Curve::Back.ease_in();
    pub const BACK_OUT: Self = Curve::Back.ease_out();
    pub const BACK_IN_OUT: Self = Curve::Back.ease_in_out();
    pub const BACK_BOUNCING: Self = Curve::Back.bouncing();

    pub const ELASTIC_IN: Self = Curve::Elastic.ease_in();
    pub const ELASTIC_OUT: Self = Curve::Elastic.ease_out();
    pub const ELASTIC_IN_OUT: Self = Curve::Elastic.ease_in_out();
    pub const ELASTIC_BOUNCING: Self = Curve::Elastic.bouncing();

    /// Bounce is stored as "out", so mirroring it yields the "in" shape
    pub const BOUNCE_IN: Self = Curve::Bounce.ease_out();
    pub const BOUNCE_OUT: Self = Curve::Bounce.ease_in();

    /// Combine a curve family with a call style
    pub const fn new(curve: Curve, style: CallStyle) -> Self {
        Self { curve, style }
    }

    /// Packed byte code (`family | style`)
    pub const fn code(&self) -> u8 {
        self.curve as u8 | self.style as u8
    }

    /// Decode a packed byte code
    pub const fn from_code(code: u8) -> Option<Self> {
        let curve = match Curve::from_code(code) {
            Some(curve) => curve,
            None => return None,
        };
        let style = match CallStyle::from_code(code) {
            Some(style) => style,
            None => return None,
        };
        Some(Self { curve, style })
    }

    /// Plain linear movement takes the integer path of the stepper
    pub fn is_linear(&self) -> bool {
        *self == Self::LINEAR
    }

    /// Movement completion for a time completion fraction
    pub fn movement_completion(&self, t: f32, user: Option<EaseFn>) -> f32 {
        let curve = self.curve;
        self.style.apply(t, |x| curve.evaluate(x, user))
    }
}

impl From<EasingType> for u8 {
    fn from(easing: EasingType) -> u8 {
        easing.code()
    }
}

impl TryFrom<u8> for EasingType {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::curves::EASE_FUNCTION_DEGREE_INDICATOR_OFFSET;

    const EPSILON: f32 = 1e-4;

    fn user_half(_t: f32) -> f32 {
        0.5
    }

    fn user_degree(_t: f32) -> f32 {
        EASE_FUNCTION_DEGREE_INDICATOR_OFFSET + 45.0
    }

    #[test]
    fn test_known_codes() {
        assert_eq!(EasingType::LINEAR.code(), 0x00);
        assert_eq!(EasingType::QUADRATIC_IN.code(), 0x01);
        assert_eq!(EasingType::QUADRATIC_OUT.code(), 0x21);
        assert_eq!(EasingType::QUADRATIC_IN_OUT.code(), 0x41);
        assert_eq!(EasingType::QUADRATIC_BOUNCING.code(), 0x61);
        assert_eq!(EasingType::USER_DIRECT.code(), 0x06);
        assert_eq!(EasingType::DUMMY_MOVE.code(), 0x07);
        assert_eq!(EasingType::ELASTIC_IN_OUT.code(), 0x4B);
        assert_eq!(EasingType::BOUNCE_OUT.code(), 0x0C);
        assert_eq!(EasingType::BOUNCE_IN.code(), 0x2C);
    }

    #[test]
    fn test_code_decoding() {
        assert_eq!(EasingType::from_code(0x43), Some(EasingType::QUARTIC_IN_OUT));
        assert_eq!(EasingType::try_from(0x68), Ok(EasingType::SINE_BOUNCING));
        assert_eq!(u8::from(EasingType::CIRCULAR_OUT), 0x29);

        // Unassigned family and style bits
        assert_eq!(EasingType::from_code(0x05), None);
        assert_eq!(EasingType::from_code(0x81), None);
        assert_eq!(EasingType::try_from(0x0F), Err(0x0F));
    }

    #[test]
    fn test_only_plain_linear_is_linear() {
        assert!(EasingType::LINEAR.is_linear());
        assert!(EasingType::default().is_linear());
        assert!(!EasingType::QUADRATIC_IN.is_linear());
        assert!(!Curve::Linear.ease_out().is_linear());
    }

    #[test]
    fn test_out_style_mirrors_curve() {
        let v = EasingType::QUADRATIC_OUT.movement_completion(0.5, None);
        assert!((v - 0.75).abs() < EPSILON);
        let v = EasingType::QUADRATIC_OUT.movement_completion(1.0, None);
        assert!((v - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_in_out_style() {
        let easing = EasingType::CUBIC_IN_OUT;
        assert!(easing.movement_completion(0.0, None).abs() < EPSILON);
        assert!((easing.movement_completion(0.25, None) - 0.0625).abs() < EPSILON);
        assert!((easing.movement_completion(0.5, None) - 0.5).abs() < EPSILON);
        assert!((easing.movement_completion(0.75, None) - 0.9375).abs() < EPSILON);
        assert!((easing.movement_completion(1.0, None) - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_bouncing_style_returns_to_start() {
        let easing = EasingType::QUADRATIC_BOUNCING;
        assert!(easing.movement_completion(0.0, None).abs() < EPSILON);
        assert!((easing.movement_completion(0.5, None) - 1.0).abs() < EPSILON);
        assert!(easing.movement_completion(1.0, None).abs() < EPSILON);
        // Symmetric around the turning point
        let a = easing.movement_completion(0.3, None);
        let b = easing.movement_completion(0.7, None);
        assert!((a - b).abs() < EPSILON);
    }

    #[test]
    fn test_bounce_in_is_mirrored_out() {
        let v = EasingType::BOUNCE_IN.movement_completion(0.2, None);
        let expected = 1.0 - curves::bounce_out(0.8);
        assert!((v - expected).abs() < EPSILON);
    }

    #[test]
    fn test_user_curve() {
        assert_eq!(EasingType::USER_DIRECT.movement_completion(0.3, None), 0.0);
        assert_eq!(
            EasingType::USER_DIRECT.movement_completion(0.3, Some(user_half)),
            0.5
        );
        let v = EasingType::USER_DIRECT.movement_completion(0.3, Some(user_degree));
        assert_eq!(v, 245.0);
    }

    #[test]
    fn test_dummy_never_moves() {
        for t in [0.0, 0.5, 1.0] {
            assert_eq!(EasingType::DUMMY_MOVE.movement_completion(t, None), 0.0);
        }
    }
}
