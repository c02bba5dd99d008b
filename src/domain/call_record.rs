/// Call records and their persisted line format.
///
/// One record per line: `<depth>#<calleeMethod>#<callerTest>`.

use std::fmt;
use std::str::FromStr;

use crate::error::TraceError;

pub const FIELD_SEPARATOR: char = '#';

/// A single observed call from a test case into target code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallRecord {
    pub depth: usize,
    pub callee_method: String,
    pub caller_test: String,
}

impl CallRecord {
    pub fn new(depth: usize, callee_method: impl Into<String>, caller_test: impl Into<String>) -> Self {
        Self {
            depth,
            callee_method: callee_method.into(),
            caller_test: caller_test.into(),
        }
    }

    /// Encode as a persisted line, without the terminator.
    pub fn to_line(&self) -> String {
        self.to_string()
    }

    pub fn parse_line(line: &str) -> Result<Self, TraceError> {
        line.parse()
    }
}

impl fmt::Display for CallRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.depth,
            self.callee_method,
            self.caller_test,
            sep = FIELD_SEPARATOR
        )
    }
}

impl FromStr for CallRecord {
    type Err = TraceError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &str| TraceError::MalformedRecord {
            line: line.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = line.trim_end_matches('\r');
        let mut fields = trimmed.splitn(3, FIELD_SEPARATOR);
        let depth = fields.next().unwrap_or_default();
        let (callee, caller) = match (fields.next(), fields.next()) {
            (Some(callee), Some(caller)) => (callee, caller),
            _ => return Err(malformed("missing field separator")),
        };

        let depth: usize = depth
            .trim()
            .parse()
            .map_err(|_| malformed("depth is not a non-negative integer"))?;
        if callee.is_empty() {
            return Err(malformed("empty callee method"));
        }
        if caller.is_empty() {
            return Err(malformed("empty caller test"));
        }

        Ok(CallRecord::new(depth, callee, caller))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_line() {
        let record = CallRecord::new(2, "shop::Cart::total", "shop::tests::test_total");
        assert_eq!(record.to_line(), "2#shop::Cart::total#shop::tests::test_total");
    }

    #[test]
    fn test_parse_line() {
        let record = CallRecord::parse_line("1#a::b#t::c\r").unwrap();
        assert_eq!(record, CallRecord::new(1, "a::b", "t::c"));
    }

    #[test]
    fn test_parse_rejects_missing_separator() {
        assert!(matches!(
            CallRecord::parse_line("1#only_method"),
            Err(TraceError::MalformedRecord { .. })
        ));
        assert!(CallRecord::parse_line("no separators at all").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_depth() {
        assert!(CallRecord::parse_line("x#m#t").is_err());
        assert!(CallRecord::parse_line("-1#m#t").is_err());
    }

    #[test]
    fn test_parse_rejects_empty_fields() {
        assert!(CallRecord::parse_line("1##t").is_err());
        assert!(CallRecord::parse_line("1#m#").is_err());
    }

    proptest! {
        #[test]
        fn line_round_trip(
            depth in 0usize..100_000,
            method in "[a-zA-Z_:<>{}]{1,40}",
            test in "[a-zA-Z_:]{1,40}",
        ) {
            let record = CallRecord::new(depth, method, test);
            let parsed = CallRecord::parse_line(&record.to_line()).unwrap();
            prop_assert_eq!(parsed, record);
        }
    }
}
