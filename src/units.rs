use crate::error::SubmitError;

/// Floor for derived memory overhead, in MiB.
pub const MINIMAL_OVERHEAD: u64 = 384;

/// Parse a human-readable memory size ("4G", "512m", "1.5GiB") into MiB.
///
/// Multipliers are binary (K = 1024) regardless of the suffix spelling, and
/// the result is truncated, so "1k" yields 0. A bare number with no unit is
/// rejected rather than guessed at.
pub fn parse_size(size: &str) -> Result<u64, SubmitError> {
    let invalid = || SubmitError::InvalidSize(size.to_string());
    let trimmed = size.trim();

    let split = trimmed
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .ok_or_else(invalid)?;
    let (number, unit) = trimmed.split_at(split);
    let value: f64 = number.parse().map_err(|_| invalid())?;

    let unit = unit.trim().to_ascii_lowercase();
    let mut chars = unit.chars();
    let exponent = match chars.next() {
        Some('k') => 1,
        Some('m') => 2,
        Some('g') => 3,
        Some('t') => 4,
        Some('p') => 5,
        _ => return Err(invalid()),
    };
    match chars.as_str() {
        "" | "b" | "ib" => {}
        _ => return Err(invalid()),
    }

    let bytes = value * 1024f64.powi(exponent);
    Ok(bytes as u64 / 1024 / 1024)
}

/// Derive a memory overhead (in MiB) from a memory size: a tenth of the
/// parsed value, never below [`MINIMAL_OVERHEAD`]. Unparsable input falls
/// back to the floor instead of failing, matching what the API would assign.
pub fn deduct_memory_overhead(size: &str) -> u64 {
    match parse_size(size) {
        Ok(value) => {
            let overhead = value / 10;
            if overhead > MINIMAL_OVERHEAD {
                overhead
            } else {
                MINIMAL_OVERHEAD
            }
        }
        Err(_) => MINIMAL_OVERHEAD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gibibytes_to_mib() {
        assert_eq!(parse_size("4G").unwrap(), 4096);
    }

    #[test]
    fn parses_single_mebibyte() {
        assert_eq!(parse_size("1M").unwrap(), 1);
    }

    #[test]
    fn parses_tebibytes() {
        assert_eq!(parse_size("1T").unwrap(), 1048576);
    }

    #[test]
    fn truncates_below_one_mib() {
        assert_eq!(parse_size("1k").unwrap(), 0);
    }

    #[test]
    fn accepts_byte_suffixes() {
        assert_eq!(parse_size("2GiB").unwrap(), 2048);
        assert_eq!(parse_size("512mb").unwrap(), 512);
    }

    #[test]
    fn rejects_bare_numbers() {
        assert!(parse_size("1").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_size("y32").is_err());
        assert!(parse_size("4X").is_err());
    }

    #[test]
    fn overhead_is_a_tenth_above_the_floor() {
        assert_eq!(deduct_memory_overhead("4G"), 409);
    }

    #[test]
    fn overhead_never_drops_below_the_floor() {
        assert_eq!(deduct_memory_overhead("1G"), MINIMAL_OVERHEAD);
    }

    #[test]
    fn overhead_falls_back_on_invalid_input() {
        assert_eq!(deduct_memory_overhead("y32"), MINIMAL_OVERHEAD);
    }
}
