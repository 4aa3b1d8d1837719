use bytes::Bytes;
use std::fmt;

use crate::frame::format_float;

/// A command call: the command name followed by its arguments.
///
/// ```
/// use mockdis::command::cmd;
///
/// let set = cmd("SET").arg("counter").arg(10).arg("EX").arg(60);
/// assert_eq!(set.name(), "set");
/// assert_eq!(set.len(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cmd {
    args: Vec<Bytes>,
}

/// Starts a call of the command `name`.
pub fn cmd(name: &str) -> Cmd {
    Cmd::new(name)
}

impl Cmd {
    pub fn new(name: &str) -> Cmd {
        Cmd {
            args: vec![Bytes::copy_from_slice(name.as_bytes())],
        }
    }

    pub fn arg<T: ToArg>(mut self, arg: T) -> Cmd {
        self.args.push(arg.to_arg());
        self
    }

    pub fn args<I, T>(mut self, args: I) -> Cmd
    where
        I: IntoIterator<Item = T>,
        T: ToArg,
    {
        self.args.extend(args.into_iter().map(|arg| arg.to_arg()));
        self
    }

    /// Lowercased command name.
    pub fn name(&self) -> String {
        self.args
            .first()
            .map(|name| String::from_utf8_lossy(name).to_lowercase())
            .unwrap_or_default()
    }

    /// Number of parts, the name included.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn parts(&self) -> &[Bytes] {
        &self.args
    }

    pub fn into_parts(self) -> Vec<Bytes> {
        self.args
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", String::from_utf8_lossy(arg))?;
        }
        Ok(())
    }
}

impl<const N: usize> From<[&str; N]> for Cmd {
    fn from(parts: [&str; N]) -> Self {
        Cmd {
            args: parts.iter().map(|part| part.to_arg()).collect(),
        }
    }
}

impl From<Vec<&str>> for Cmd {
    fn from(parts: Vec<&str>) -> Self {
        Cmd {
            args: parts.iter().map(|part| part.to_arg()).collect(),
        }
    }
}

impl From<Vec<Bytes>> for Cmd {
    fn from(args: Vec<Bytes>) -> Self {
        Cmd { args }
    }
}

impl From<&str> for Cmd {
    fn from(line: &str) -> Self {
        Cmd {
            args: line.split_whitespace().map(|part| part.to_arg()).collect(),
        }
    }
}

/// Conversion of a value into a command argument.
pub trait ToArg {
    fn to_arg(&self) -> Bytes;
}

impl ToArg for &str {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl ToArg for String {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl ToArg for &String {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl ToArg for Bytes {
    fn to_arg(&self) -> Bytes {
        self.clone()
    }
}

impl ToArg for &[u8] {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl ToArg for Vec<u8> {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl ToArg for f64 {
    fn to_arg(&self) -> Bytes {
        Bytes::from(format_float(*self))
    }
}

macro_rules! integer_to_arg {
    ($($t:ty),*) => {
        $(
            impl ToArg for $t {
                fn to_arg(&self) -> Bytes {
                    Bytes::from(self.to_string())
                }
            }
        )*
    };
}

integer_to_arg!(i32, i64, u32, u64, usize);
