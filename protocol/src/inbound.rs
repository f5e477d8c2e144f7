use serde::{Deserialize, Serialize};

use crate::Payload;

/// Two numeric fields pulled from an inbound message. Either may be NaN.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    pub x: f32,
    pub y: f32,
}

impl Sample {
    pub const INVALID: Self = Self { x: f32::NAN, y: f32::NAN };

    pub fn is_valid(&self) -> bool {
        !self.x.is_nan() && !self.y.is_nan()
    }
}

/// Where the two numbers live in an inbound payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundFormat {
    /// `"x,y"`, each side read like an integer.
    #[default]
    CommaPair,
    /// A JSON object with two named number fields.
    NamedFields {
        #[serde(default = "default_x_field")]
        x_field: String,
        #[serde(default = "default_y_field")]
        y_field: String,
    },
}

fn default_x_field() -> String {
    "data_x".to_string()
}

fn default_y_field() -> String {
    "data_y".to_string()
}

impl InboundFormat {
    pub fn named_fields() -> Self {
        InboundFormat::NamedFields { x_field: default_x_field(), y_field: default_y_field() }
    }

    /// Never fails; unparseable parts come back as NaN.
    pub fn decode(&self, payload: &Payload) -> Sample {
        match self {
            InboundFormat::CommaPair => decode_pair(&payload.as_text()),
            InboundFormat::NamedFields { x_field, y_field } => {
                let parsed;
                let object = match payload {
                    Payload::Json(value) => value,
                    Payload::Text(text) => match serde_json::from_str::<serde_json::Value>(text) {
                        Ok(value) => {
                            parsed = value;
                            &parsed
                        }
                        Err(_) => return Sample::INVALID,
                    },
                };
                Sample { x: field_number(object, x_field), y: field_number(object, y_field) }
            }
        }
    }
}

fn decode_pair(text: &str) -> Sample {
    let mut parts = text.split(',');
    let x = parts.next().map(parse_int_lenient).unwrap_or(f32::NAN);
    let y = parts.next().map(parse_int_lenient).unwrap_or(f32::NAN);
    Sample { x, y }
}

fn field_number(object: &serde_json::Value, name: &str) -> f32 {
    match object.get(name) {
        Some(serde_json::Value::Number(n)) => n.as_f64().map(|v| v as f32).unwrap_or(f32::NAN),
        Some(serde_json::Value::String(s)) => parse_int_lenient(s),
        _ => f32::NAN,
    }
}

/// Integer prefix of `s` in base 10, or NaN when there is none.
///
/// Leading whitespace and one sign are accepted; parsing stops at the first
/// non-digit, so `"12.7"` reads as 12 and `"5px"` as 5.
pub fn parse_int_lenient(s: &str) -> f32 {
    let s = s.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return f32::NAN;
    }
    let value = rest[..digits]
        .bytes()
        .fold(0.0f64, |acc, b| acc * 10.0 + f64::from(b - b'0'));
    (if negative { -value } else { value }) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lenient_integer_prefixes() {
        assert_eq!(parse_int_lenient("42"), 42.0);
        assert_eq!(parse_int_lenient("  -17"), -17.0);
        assert_eq!(parse_int_lenient("+3"), 3.0);
        assert_eq!(parse_int_lenient("12.7"), 12.0);
        assert_eq!(parse_int_lenient(" 5px"), 5.0);
        assert!(parse_int_lenient("abc").is_nan());
        assert!(parse_int_lenient("-").is_nan());
        assert!(parse_int_lenient("").is_nan());
    }

    #[test]
    fn comma_pair_decodes_text_and_wrapped_strings() {
        let fmt = InboundFormat::CommaPair;
        assert_eq!(fmt.decode(&Payload::Text("10,-20".into())), Sample { x: 10.0, y: -20.0 });
        // Python-style "x, y" with a space
        assert_eq!(fmt.decode(&Payload::Text("3, 4".into())), Sample { x: 3.0, y: 4.0 });
        assert_eq!(
            fmt.decode(&Payload::Json(json!({"data": "7,8"}))),
            Sample { x: 7.0, y: 8.0 }
        );
    }

    #[test]
    fn malformed_pair_yields_nan_not_error() {
        let fmt = InboundFormat::CommaPair;
        let s = fmt.decode(&Payload::Text("hello".into()));
        assert!(s.x.is_nan() && s.y.is_nan());
        let s = fmt.decode(&Payload::Text("9".into()));
        assert_eq!(s.x, 9.0);
        assert!(s.y.is_nan());
        assert!(!s.is_valid());
    }

    #[test]
    fn named_fields_read_numbers_and_numeric_strings() {
        let fmt = InboundFormat::named_fields();
        let s = fmt.decode(&Payload::Json(json!({"data_x": 1.5, "data_y": "-2"})));
        assert_eq!(s, Sample { x: 1.5, y: -2.0 });
        let s = fmt.decode(&Payload::Text(r#"{"data_x": 4, "data_y": 5}"#.into()));
        assert_eq!(s, Sample { x: 4.0, y: 5.0 });
    }

    #[test]
    fn named_fields_missing_or_garbage_is_nan() {
        let fmt = InboundFormat::named_fields();
        let s = fmt.decode(&Payload::Json(json!({"data_x": 1})));
        assert_eq!(s.x, 1.0);
        assert!(s.y.is_nan());
        assert!(!fmt.decode(&Payload::Text("not json".into())).is_valid());
    }
}
