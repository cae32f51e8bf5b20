use std::fmt::Display;
use std::str::FromStr;

use crate::error::ValidationError;

/// Unit attached to a target output size. Lowercase `b` means bits,
/// uppercase `B` means bytes; prefixes are decimal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeUnit {
    Bit,
    Byte,
    Kilobit,
    Kilobyte,
    Megabit,
    Megabyte,
    Gigabit,
    Gigabyte,
}

impl SizeUnit {
    pub const ALL: [SizeUnit; 8] = [
        SizeUnit::Bit,
        SizeUnit::Byte,
        SizeUnit::Kilobit,
        SizeUnit::Kilobyte,
        SizeUnit::Megabit,
        SizeUnit::Megabyte,
        SizeUnit::Gigabit,
        SizeUnit::Gigabyte,
    ];

    pub fn bits_per_unit(self) -> u64 {
        match self {
            SizeUnit::Bit => 1,
            SizeUnit::Byte => 8,
            SizeUnit::Kilobit => 1_000,
            SizeUnit::Kilobyte => 8_000,
            SizeUnit::Megabit => 1_000_000,
            SizeUnit::Megabyte => 8_000_000,
            SizeUnit::Gigabit => 1_000_000_000,
            SizeUnit::Gigabyte => 8_000_000_000,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            SizeUnit::Bit => "b",
            SizeUnit::Byte => "B",
            SizeUnit::Kilobit => "Kb",
            SizeUnit::Kilobyte => "KB",
            SizeUnit::Megabit => "Mb",
            SizeUnit::Megabyte => "MB",
            SizeUnit::Gigabit => "Gb",
            SizeUnit::Gigabyte => "GB",
        }
    }
}

impl Default for SizeUnit {
    fn default() -> Self {
        SizeUnit::Megabyte
    }
}

impl FromStr for SizeUnit {
    type Err = ValidationError;

    // case matters: "mb" is neither megabits nor megabytes
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SizeUnit::ALL
            .into_iter()
            .find(|unit| unit.token() == s)
            .ok_or_else(|| ValidationError::UnknownSizeUnit(String::from(s)))
    }
}

impl Display for SizeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!("b".parse::<SizeUnit>().unwrap(), SizeUnit::Bit);
        assert_eq!("KB".parse::<SizeUnit>().unwrap(), SizeUnit::Kilobyte);
        assert_eq!("Mb".parse::<SizeUnit>().unwrap(), SizeUnit::Megabit);
        assert_eq!("GB".parse::<SizeUnit>().unwrap(), SizeUnit::Gigabyte);
    }

    #[test]
    fn test_from_str_is_case_sensitive() {
        assert_eq!("mb".parse::<SizeUnit>(), Err(ValidationError::UnknownSizeUnit(String::from("mb"))));
        assert_eq!("kB".parse::<SizeUnit>(), Err(ValidationError::UnknownSizeUnit(String::from("kB"))));
        assert!("".parse::<SizeUnit>().is_err());
        assert!("TB".parse::<SizeUnit>().is_err());
    }

    #[test]
    fn test_display_round_trips_token() {
        for unit in SizeUnit::ALL {
            assert_eq!(unit.to_string().parse::<SizeUnit>().unwrap(), unit);
        }
    }

    #[test]
    fn test_byte_units_are_eight_bits() {
        assert_eq!(SizeUnit::Byte.bits_per_unit(), 8 * SizeUnit::Bit.bits_per_unit());
        assert_eq!(SizeUnit::Kilobyte.bits_per_unit(), 8 * SizeUnit::Kilobit.bits_per_unit());
        assert_eq!(SizeUnit::Megabyte.bits_per_unit(), 8 * SizeUnit::Megabit.bits_per_unit());
        assert_eq!(SizeUnit::Gigabyte.bits_per_unit(), 8 * SizeUnit::Gigabit.bits_per_unit());
    }
}
