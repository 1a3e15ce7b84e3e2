//! Tokenizer for one line of the SDL `GameControllerDB` text format (§6.2).
//!
//! Splits a line on commas and classifies each field, handing back a
//! [`Token`] per call. Malformed individual fields are reported as
//! [`Error`] so the caller can warn-and-skip (§4.2 parsing rules) without
//! aborting the whole line.

use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Field had no `:` separator or an empty value; harmless, skip it.
    EmptyValue,
    /// `field:binding` had a `field` we don't recognise.
    UnknownField,
    /// The binding (`aN`, `bN`, `hH.B`) didn't parse.
    MalformedBinding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::EmptyValue => f.write_str("empty mapping field"),
            ErrorKind::UnknownField => f.write_str("unrecognised SDL mapping field name"),
            ErrorKind::MalformedBinding => f.write_str("malformed mapping binding"),
        }
    }
}

impl std::error::Error for Error {}

/// One input modifier, carried alongside a binding (§4.2 item 4-5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Modifier {
    #[default]
    None,
    /// `+`: constrain output range to `[0, 1]` (or read only the positive half of an axis).
    Positive,
    /// `-`: constrain output range to `[-1, 0]` (or read only the negative half of an axis).
    Negative,
}

/// A single parsed binding: which native element an SDL field refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Axis {
        native_index: u16,
        inverted: bool,
    },
    Button {
        native_index: u16,
    },
    Hat {
        hat: u8,
        bit: u8,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Guid(&'a str),
    Name(&'a str),
    Platform(&'a str),
    Field { name: &'a str, binding: Binding, output_modifier: Modifier },
}

pub struct Parser<'a> {
    fields: std::str::Split<'a, char>,
    seen_guid: bool,
    seen_name: bool,
}

impl<'a> Parser<'a> {
    pub fn new(line: &'a str) -> Self {
        Parser {
            fields: line.split(','),
            seen_guid: false,
            seen_name: false,
        }
    }

    pub fn next_token(&mut self) -> Option<Result<Token<'a>, Error>> {
        loop {
            let field = self.fields.next()?;
            if field.is_empty() {
                continue;
            }

            if !self.seen_guid {
                self.seen_guid = true;
                return Some(Ok(Token::Guid(field)));
            }
            if !self.seen_name {
                self.seen_name = true;
                return Some(Ok(Token::Name(field)));
            }

            return Some(Self::parse_field(field));
        }
    }

    fn parse_field(field: &'a str) -> Result<Token<'a>, Error> {
        let mut parts = field.splitn(2, ':');
        let name = parts.next().unwrap_or("");
        let value = match parts.next() {
            Some(v) if !v.is_empty() => v,
            _ => {
                return Err(Error {
                    kind: ErrorKind::EmptyValue,
                })
            }
        };

        if name == "platform" {
            return Ok(Token::Platform(value));
        }

        let (output_modifier, value) = match value.as_bytes().first() {
            Some(b'+') => (Modifier::Positive, &value[1..]),
            Some(b'-') => (Modifier::Negative, &value[1..]),
            _ => (Modifier::None, value),
        };

        let binding = Self::parse_binding(value)?;
        Ok(Token::Field {
            name,
            binding,
            output_modifier,
        })
    }

    fn parse_binding(value: &str) -> Result<Binding, Error> {
        let mut chars = value.chars();
        match chars.next() {
            Some('a') => {
                let rest = chars.as_str();
                let inverted = rest.ends_with('~');
                let digits = if inverted { &rest[..rest.len() - 1] } else { rest };
                let native_index: u16 = digits.parse().map_err(|_| Error {
                    kind: ErrorKind::MalformedBinding,
                })?;
                Ok(Binding::Axis {
                    native_index,
                    inverted,
                })
            }
            Some('b') => {
                let native_index: u16 = chars.as_str().parse().map_err(|_| Error {
                    kind: ErrorKind::MalformedBinding,
                })?;
                Ok(Binding::Button { native_index })
            }
            Some('h') => {
                let rest = chars.as_str();
                let mut hat_bit = rest.splitn(2, '.');
                let hat: u8 = hat_bit
                    .next()
                    .and_then(|s| s.parse().ok())
                    .ok_or(Error {
                        kind: ErrorKind::MalformedBinding,
                    })?;
                let bit: u8 = hat_bit
                    .next()
                    .and_then(|s| s.parse().ok())
                    .ok_or(Error {
                        kind: ErrorKind::MalformedBinding,
                    })?;
                Ok(Binding::Hat { hat, bit })
            }
            _ => Err(Error {
                kind: ErrorKind::MalformedBinding,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_guid_name_and_fields() {
        let line = "03000000260900008888000000010001,Foo Pad,a:b0,leftx:a0~,platform:Linux,";
        let mut p = Parser::new(line);
        assert_eq!(p.next_token().unwrap().unwrap(), Token::Guid("03000000260900008888000000010001"));
        assert_eq!(p.next_token().unwrap().unwrap(), Token::Name("Foo Pad"));
        assert_eq!(
            p.next_token().unwrap().unwrap(),
            Token::Field {
                name: "a",
                binding: Binding::Button { native_index: 0 },
                output_modifier: Modifier::None,
            }
        );
        assert_eq!(
            p.next_token().unwrap().unwrap(),
            Token::Field {
                name: "leftx",
                binding: Binding::Axis {
                    native_index: 0,
                    inverted: true,
                },
                output_modifier: Modifier::None,
            }
        );
        assert_eq!(p.next_token().unwrap().unwrap(), Token::Platform("Linux"));
        assert!(p.next_token().is_none());
    }

    #[test]
    fn hat_binding() {
        let line = "03000000260900008888000000010001,Foo,dpup:h0.1,";
        let mut p = Parser::new(line);
        p.next_token();
        p.next_token();
        assert_eq!(
            p.next_token().unwrap().unwrap(),
            Token::Field {
                name: "dpup",
                binding: Binding::Hat { hat: 0, bit: 1 },
                output_modifier: Modifier::None,
            }
        );
    }

    #[test]
    fn malformed_binding_is_reported_not_panicking() {
        let line = "03000000260900008888000000010001,Foo,a:garbage,";
        let mut p = Parser::new(line);
        p.next_token();
        p.next_token();
        let err = p.next_token().unwrap().unwrap_err();
        assert_eq!(*err.kind(), ErrorKind::MalformedBinding);
    }
}
