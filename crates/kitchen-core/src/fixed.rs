use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Simulation time in seconds. Every timer in the kitchen runs on this type.
pub type Seconds = Fixed64;

/// Convert an f64 to Fixed64. Use only for initialization, never in the tick loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display and logging.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Whole seconds as [`Seconds`].
#[inline]
pub fn secs(whole: i32) -> Seconds {
    Seconds::from_num(whole)
}

/// Clamp a value into `[0, 1]`.
#[inline]
pub fn clamp_unit(v: Fixed64) -> Fixed64 {
    v.clamp(Fixed64::ZERO, Fixed64::ONE)
}

/// Range-checked f64 to Fixed64 for values read from data files.
fn checked_from_f64<E: serde::de::Error>(raw: f64) -> Result<Fixed64, E> {
    Fixed64::checked_from_num(raw)
        .ok_or_else(|| E::custom(format!("{raw} is outside the fixed-point range")))
}

fn non_negative<E: serde::de::Error>(raw: f64, what: &str) -> Result<Fixed64, E> {
    if raw.is_nan() || raw < 0.0 {
        return Err(E::custom(format!("expected a non-negative {what}, got {raw}")));
    }
    checked_from_f64(raw)
}

/// Serde helper: store [`Seconds`] as a plain float in config files.
pub mod serde_seconds {
    use super::{Seconds, fixed64_to_f64, non_negative};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Seconds, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(fixed64_to_f64(*v))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Seconds, D::Error> {
        non_negative(f64::deserialize(d)?, "number of seconds")
    }
}

/// Serde helper: a non-negative magnitude such as a speed or a distance.
pub mod serde_non_negative {
    use super::{Fixed64, fixed64_to_f64, non_negative};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Fixed64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(fixed64_to_f64(*v))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Fixed64, D::Error> {
        non_negative(f64::deserialize(d)?, "magnitude")
    }
}

/// Serde helper: store any [`Fixed64`] (e.g. a coordinate) as a plain float.
pub mod serde_fixed {
    use super::{Fixed64, checked_from_f64, fixed64_to_f64};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Fixed64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(fixed64_to_f64(*v))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Fixed64, D::Error> {
        checked_from_f64(f64::deserialize(d)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secs_are_exact() {
        assert_eq!(fixed64_to_f64(secs(4)), 4.0);
        assert_eq!(secs(3) + secs(1), secs(4));
    }

    #[test]
    fn quarter_second_is_exact() {
        let q = f64_to_fixed64(0.25);
        assert_eq!(q * secs(4), secs(1));
    }

    #[test]
    fn clamp_unit_bounds() {
        assert_eq!(clamp_unit(f64_to_fixed64(-0.5)), Fixed64::ZERO);
        assert_eq!(clamp_unit(f64_to_fixed64(1.5)), Fixed64::ONE);
        assert_eq!(clamp_unit(f64_to_fixed64(0.5)), f64_to_fixed64(0.5));
    }

    #[test]
    fn seconds_serde_as_float() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Wrap(#[serde(with = "serde_seconds")] Seconds);

        let json = serde_json::to_string(&Wrap(f64_to_fixed64(2.5))).unwrap();
        assert_eq!(json, "2.5");
        let back: Wrap = serde_json::from_str("0.25").unwrap();
        assert_eq!(back.0, f64_to_fixed64(0.25));
        assert!(serde_json::from_str::<Wrap>("-1.0").is_err());
        assert!(serde_json::from_str::<Wrap>("1e12").is_err());
    }

    #[test]
    fn out_of_range_values_are_errors() {
        #[derive(Debug, serde::Deserialize)]
        struct Coord(#[serde(with = "serde_fixed")] Fixed64);
        #[derive(Debug, serde::Deserialize)]
        struct Speed(#[serde(with = "serde_non_negative")] Fixed64);

        assert_eq!(serde_json::from_str::<Coord>("-3.5").unwrap().0, f64_to_fixed64(-3.5));
        assert!(serde_json::from_str::<Coord>("-1e15").is_err());
        assert!(serde_json::from_str::<Coord>("1e300").is_err());
        assert_eq!(serde_json::from_str::<Speed>("2").unwrap().0, secs(2));
        assert!(serde_json::from_str::<Speed>("-0.5").is_err());
        assert!(serde_json::from_str::<Speed>("5e9").is_err());
    }
}
