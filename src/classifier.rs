/// Zero-based position of the routing digit inside an original item id.
pub const ROUTING_DIGIT_OFFSET: usize = 14;

/// Digit range dispatched to the FC channel.
pub const FC_DIGIT_RANGE: (u8, u8) = (0, 4);
/// Digit range dispatched to the EPH channel.
pub const EPH_DIGIT_RANGE: (u8, u8) = (5, 9);

/// Downstream channel a status-report item is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Fc,
    Eph,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Fc => "FC",
            Channel::Eph => "EPH",
        }
    }

    /// Target label on per-item audit rows.
    pub fn audit_target(&self) -> &'static str {
        match self {
            Channel::Fc => "DISPATCHED_FC",
            Channel::Eph => "DISPATCHED_EPH",
        }
    }

    /// Target label on per-channel tracker rows.
    pub fn dispatcher_target(&self) -> &'static str {
        match self {
            Channel::Fc => "DISPATCHER_FC",
            Channel::Eph => "DISPATCHER_EPH",
        }
    }

    /// Inclusive routing-digit range owned by this channel.
    pub fn digit_range(&self) -> (u8, u8) {
        match self {
            Channel::Fc => FC_DIGIT_RANGE,
            Channel::Eph => EPH_DIGIT_RANGE,
        }
    }
}

/// Routing digit at the fixed offset, if the identifier carries one.
///
/// Identifiers shorter than the offset, or with a non-digit character at it,
/// have no routing digit.
pub fn routing_digit(orgnl_itm_id: &str) -> Option<u8> {
    orgnl_itm_id
        .chars()
        .nth(ROUTING_DIGIT_OFFSET)
        .and_then(|c| c.to_digit(10))
        .map(|d| d as u8)
}

/// Routing digit with the degrade policy applied.
///
/// Identifiers without a valid digit resolve into the EPH range. That mirrors
/// the upstream system's observed behavior for short or malformed ids; the
/// policy lives here, and only here, so the classifier and the partitioner
/// cannot disagree on where such items land.
pub fn effective_routing_digit(orgnl_itm_id: &str) -> u8 {
    routing_digit(orgnl_itm_id).unwrap_or(EPH_DIGIT_RANGE.0)
}

/// Map an original item id to its channel. Total: never fails.
pub fn classify(orgnl_itm_id: &str) -> Channel {
    let digit = effective_routing_digit(orgnl_itm_id);
    if digit >= FC_DIGIT_RANGE.0 && digit <= FC_DIGIT_RANGE.1 {
        Channel::Fc
    } else {
        Channel::Eph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_with_digit(c: char) -> String {
        format!("ABCDEFGHIJKLMN{c}X")
    }

    #[test]
    fn test_digit_boundaries() {
        assert_eq!(classify(&id_with_digit('0')), Channel::Fc);
        assert_eq!(classify(&id_with_digit('4')), Channel::Fc);
        assert_eq!(classify(&id_with_digit('5')), Channel::Eph);
        assert_eq!(classify(&id_with_digit('9')), Channel::Eph);
    }

    #[test]
    fn test_short_identifier_degrades_to_eph() {
        assert_eq!(routing_digit("SHORTID"), None);
        assert_eq!(classify("SHORTID"), Channel::Eph);
        assert_eq!(classify(""), Channel::Eph);
    }

    #[test]
    fn test_exactly_fourteen_chars_has_no_digit() {
        let id = "ABCDEFGHIJKLMN"; // one char too short
        assert_eq!(id.len(), ROUTING_DIGIT_OFFSET);
        assert_eq!(routing_digit(id), None);
        assert_eq!(classify(id), Channel::Eph);
    }

    #[test]
    fn test_non_digit_character_degrades_to_eph() {
        assert_eq!(routing_digit(&id_with_digit('X')), None);
        assert_eq!(classify(&id_with_digit('X')), Channel::Eph);
    }

    #[test]
    fn test_effective_digit_lands_in_eph_range() {
        let digit = effective_routing_digit("SHORTID");
        assert!(digit >= EPH_DIGIT_RANGE.0 && digit <= EPH_DIGIT_RANGE.1);
    }
}
