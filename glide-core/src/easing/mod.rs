//! Easing curves and easing type selection

pub mod curves;
pub mod kind;

pub use curves::{EaseFn, EASE_FUNCTION_DEGREE_INDICATOR_OFFSET, EASE_FUNCTION_DEGREE_THRESHOLD};
pub use kind::{CallStyle, Curve, EasingType, CALL_STYLE_MASK, EASE_TYPE_MASK};
