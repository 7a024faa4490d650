//! Request timestamp parsing and formatting.

use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

const IMF_FIXDATE: &[BorrowedFormatItem<'static>] =
    format_description!("[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT");

const AMZ_DATE_TIME: &[BorrowedFormatItem<'static>] = format_description!("[year][month][day]T[hour][minute][second]Z");

/// Parses `Date`/`x-amz-date` header values. Accepts HTTP dates,
/// `YYYYMMDD'T'HHMMSS'Z'`, RFC 3339 and RFC 2822.
pub fn parse_request_date(value: &str) -> Option<OffsetDateTime> {
    if let Ok(t) = PrimitiveDateTime::parse(value, IMF_FIXDATE) {
        return Some(t.assume_utc());
    }
    if let Ok(t) = PrimitiveDateTime::parse(value, AMZ_DATE_TIME) {
        return Some(t.assume_utc());
    }
    if let Ok(t) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(t);
    }
    OffsetDateTime::parse(value, &Rfc2822).ok()
}

pub fn fmt_rfc3339(t: OffsetDateTime) -> String {
    t.format(&Rfc3339).unwrap_or_default()
}

pub fn fmt_http_date(t: OffsetDateTime) -> String {
    t.to_offset(time::UtcOffset::UTC).format(IMF_FIXDATE).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn http_date() {
        let parsed = parse_request_date("Tue, 27 Mar 2007 19:36:42 GMT").unwrap();
        assert_eq!(parsed, datetime!(2007-03-27 19:36:42 UTC));
        assert_eq!(fmt_http_date(parsed), "Tue, 27 Mar 2007 19:36:42 GMT");
    }

    #[test]
    fn amz_date() {
        let parsed = parse_request_date("20150830T123600Z").unwrap();
        assert_eq!(parsed, datetime!(2015-08-30 12:36:00 UTC));
    }

    #[test]
    fn rfc3339_date() {
        let parsed = parse_request_date("2015-08-30T12:36:00Z").unwrap();
        assert_eq!(parsed, datetime!(2015-08-30 12:36:00 UTC));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_request_date("not a date").is_none());
        assert!(parse_request_date("").is_none());
    }
}
