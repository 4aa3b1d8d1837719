use std::fmt;

use bytes::Bytes;

/// A reply produced by a command.
///
/// The variants mirror the reply types of the store being emulated, so a caller comparing
/// results against a real server sees the same shapes: status strings, integers, bulk strings,
/// the null reply and (nested) arrays. Command failures are not frames, they are returned as
/// errors.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    Null,
    Array(Vec<Frame>),
}

impl Frame {
    pub fn ok() -> Frame {
        Frame::Simple("OK".to_string())
    }

    pub fn bulk(value: impl Into<Bytes>) -> Frame {
        Frame::Bulk(value.into())
    }

    /// Bulk string or null, depending on whether there is a value.
    pub fn optional(value: Option<Bytes>) -> Frame {
        value.map(Frame::Bulk).unwrap_or(Frame::Null)
    }

    /// Array of bulk strings.
    pub fn bulks<I, T>(values: I) -> Frame
    where
        I: IntoIterator<Item = T>,
        T: Into<Bytes>,
    {
        Frame::Array(values.into_iter().map(|v| Frame::Bulk(v.into())).collect())
    }

    pub fn boolean(value: bool) -> Frame {
        Frame::Integer(value as i64)
    }

    /// Formats a float the way the store does in replies: integral values without a fractional
    /// part and infinities as `inf`/`-inf`.
    pub fn float(value: f64) -> Frame {
        Frame::Bulk(Bytes::from(format_float(value)))
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Frame::Bulk(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Frame::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Vec<Frame>> {
        match self {
            Frame::Array(frames) => Some(frames),
            _ => None,
        }
    }
}

pub fn format_float(value: f64) -> String {
    if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e17 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

impl From<&str> for Frame {
    fn from(value: &str) -> Self {
        Frame::Bulk(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<String> for Frame {
    fn from(value: String) -> Self {
        Frame::Bulk(Bytes::from(value))
    }
}

impl From<i64> for Frame {
    fn from(value: i64) -> Self {
        Frame::Integer(value)
    }
}

impl From<usize> for Frame {
    fn from(value: usize) -> Self {
        Frame::Integer(value as i64)
    }
}

// Renders the frame the way an interactive client would print it.
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

impl Frame {
    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        match self {
            Frame::Simple(s) => write!(f, "{}", s),
            Frame::Error(s) => write!(f, "(error) {}", s),
            Frame::Integer(i) => write!(f, "(integer) {}", i),
            Frame::Bulk(bytes) => write!(f, "\"{}\"", String::from_utf8_lossy(bytes)),
            Frame::Null => write!(f, "(nil)"),
            Frame::Array(arr) if arr.is_empty() => write!(f, "(empty array)"),
            Frame::Array(arr) => {
                for (i, frame) in arr.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                        write!(f, "{:width$}", "", width = depth * 3)?;
                    }
                    write!(f, "{}) ", i + 1)?;
                    frame.fmt_indented(f, depth + 1)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_scalars() {
        assert_eq!(Frame::ok().to_string(), "OK");
        assert_eq!(Frame::Integer(42).to_string(), "(integer) 42");
        assert_eq!(Frame::from("foo").to_string(), "\"foo\"");
        assert_eq!(Frame::Null.to_string(), "(nil)");
        assert_eq!(Frame::Array(vec![]).to_string(), "(empty array)");
    }

    #[test]
    fn display_nested_array() {
        let frame = Frame::Array(vec![
            Frame::from("0"),
            Frame::Array(vec![Frame::from("a"), Frame::from("b")]),
        ]);

        assert_eq!(frame.to_string(), "1) \"0\"\n2) 1) \"a\"\n   2) \"b\"");
    }

    #[test]
    fn float_formatting() {
        assert_eq!(format_float(3.0), "3");
        assert_eq!(format_float(-2.5), "-2.5");
        assert_eq!(format_float(f64::INFINITY), "inf");
        assert_eq!(format_float(f64::NEG_INFINITY), "-inf");
        assert_eq!(format_float(10.6), "10.6");
    }
}
