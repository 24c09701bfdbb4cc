use thiserror::Error;

/// Most ids one `--ids` list may expand to.
pub const MAX_IDS: usize = 1_000_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Id list '{0}' is empty.")]
    Empty(String),

    #[error("Invalid id '{value}' in '{list}'. Expected a non-negative integer.")]
    InvalidId { value: String, list: String },

    #[error("Range '{start}-{end}' runs backwards. Expected 'start-end' with start <= end.")]
    ReversedRange { start: u64, end: u64 },

    #[error("Id list '{list}' expands to more than {max} ids.")]
    TooManyIds { list: String, max: usize },
}

/// Parses a comma-separated list of ids and inclusive ranges, e.g. `1-3,7,10-11`.
///
/// Ids are returned in the order given; duplicates are kept and left to the
/// build to account for.
pub fn parse_id_ranges(list: &str) -> Result<Vec<u64>, ParseError> {
    let parse_id = |value: &str| -> Result<u64, ParseError> {
        value.trim().parse().map_err(|_| ParseError::InvalidId {
            value: value.trim().to_string(),
            list: list.to_string(),
        })
    };

    let too_many = || ParseError::TooManyIds {
        list: list.to_string(),
        max: MAX_IDS,
    };

    let mut ids = Vec::new();
    for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let (start, end) = (parse_id(start)?, parse_id(end)?);
                if start > end {
                    return Err(ParseError::ReversedRange { start, end });
                }
                if end - start >= (MAX_IDS - ids.len()) as u64 {
                    return Err(too_many());
                }
                ids.extend(start..=end);
            }
            None => {
                if ids.len() == MAX_IDS {
                    return Err(too_many());
                }
                ids.push(parse_id(part)?);
            }
        }
    }

    if ids.is_empty() {
        return Err(ParseError::Empty(list.to_string()));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_ids_and_ranges_in_order() {
        assert_eq!(parse_id_ranges("5").unwrap(), vec![5]);
        assert_eq!(parse_id_ranges("1-3, 7,10-11").unwrap(), vec![1, 2, 3, 7, 10, 11]);
        assert_eq!(parse_id_ranges("4-4").unwrap(), vec![4]);
    }

    #[test]
    fn rejects_malformed_lists() {
        assert_eq!(parse_id_ranges(" , ").unwrap_err(), ParseError::Empty(" , ".to_string()));
        assert!(matches!(
            parse_id_ranges("1,x"),
            Err(ParseError::InvalidId { value, .. }) if value == "x"
        ));
        assert!(matches!(parse_id_ranges("-3"), Err(ParseError::InvalidId { .. })));
        assert_eq!(
            parse_id_ranges("9-2").unwrap_err(),
            ParseError::ReversedRange { start: 9, end: 2 }
        );
    }

    #[test]
    fn oversized_ranges_are_rejected_before_expansion() {
        assert!(matches!(
            parse_id_ranges("0-18446744073709551615"),
            Err(ParseError::TooManyIds { max: MAX_IDS, .. })
        ));
        let full = format!("1-{MAX_IDS}");
        assert_eq!(parse_id_ranges(&full).unwrap().len(), MAX_IDS);
        assert!(matches!(
            parse_id_ranges(&format!("{full},7")),
            Err(ParseError::TooManyIds { .. })
        ));
        assert!(matches!(
            parse_id_ranges(&format!("5,{full}")),
            Err(ParseError::TooManyIds { .. })
        ));
    }
}
