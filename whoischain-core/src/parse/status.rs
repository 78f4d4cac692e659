use crate::response::WhoisStatus;

/// Maps the first domain status code of a record to a lookup status.
///
/// With no status code the template's status (`current`) stands.
pub fn derive_status(first_status: Option<&str>, current: WhoisStatus) -> WhoisStatus {
    let Some(code) = first_status.map(str::trim).filter(|c| !c.is_empty()) else {
        return current;
    };

    let code = code.to_lowercase();
    if code.contains("reserved") {
        WhoisStatus::Reserved
    } else if matches!(code.as_str(), "free" | "available" | "no match" | "not found") {
        WhoisStatus::NotFound
    } else if code.contains("limited") || code.contains("quarantine") {
        WhoisStatus::Limited
    } else {
        WhoisStatus::Found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_status_keeps_current() {
        assert_eq!(derive_status(None, WhoisStatus::NotFound), WhoisStatus::NotFound);
        assert_eq!(derive_status(Some("  "), WhoisStatus::Throttled), WhoisStatus::Throttled);
    }

    #[test]
    fn test_codes() {
        assert_eq!(derive_status(Some("RESERVED"), WhoisStatus::Found), WhoisStatus::Reserved);
        assert_eq!(derive_status(Some("free"), WhoisStatus::Found), WhoisStatus::NotFound);
        assert_eq!(derive_status(Some("Available"), WhoisStatus::Found), WhoisStatus::NotFound);
        assert_eq!(derive_status(Some("quarantine"), WhoisStatus::Found), WhoisStatus::Limited);
        assert_eq!(
            derive_status(Some("clientTransferProhibited"), WhoisStatus::Unknown),
            WhoisStatus::Found
        );
    }
}
