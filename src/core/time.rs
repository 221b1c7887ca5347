use time::{
    format_description::well_known::Rfc3339, Duration, OffsetDateTime, PrimitiveDateTime,
    UtcOffset,
};

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    to_primitive_utc(OffsetDateTime::now_utc())
}

pub(crate) fn to_primitive_utc(value: OffsetDateTime) -> PrimitiveDateTime {
    let utc = value.to_offset(UtcOffset::UTC);
    PrimitiveDateTime::new(utc.date(), utc.time())
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

/// Whole seconds left until `deadline`, never negative.
pub(crate) fn remaining_seconds(deadline: PrimitiveDateTime, now: PrimitiveDateTime) -> i64 {
    (deadline - now).whole_seconds().max(0)
}

pub(crate) fn minutes(value: i32) -> Duration {
    Duration::minutes(i64::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn format_primitive_outputs_utc_z() {
        let value = datetime!(2025-01-02 10:20:30);
        assert_eq!(format_primitive(value), "2025-01-02T10:20:30Z");
    }

    #[test]
    fn to_primitive_utc_shifts_offset() {
        let value = datetime!(2025-01-02 13:20:30 +03:00);
        assert_eq!(to_primitive_utc(value), datetime!(2025-01-02 10:20:30));
    }

    #[test]
    fn remaining_seconds_clamps_at_zero() {
        let deadline = datetime!(2025-01-02 10:00:00);
        assert_eq!(remaining_seconds(deadline, datetime!(2025-01-02 09:58:30)), 90);
        assert_eq!(remaining_seconds(deadline, datetime!(2025-01-02 10:00:01)), 0);
    }
}
