/// Parse an ISO-8601 duration as YouTube reports them (`PT5M30S`, `PT1H2M`,
/// `P1DT3H`) into whole seconds. Fractional parts and month/year designators
/// are not produced by the API and are rejected.
pub fn parse_seconds(input: &str) -> Option<u32> {
    let rest = input.strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((d, t)) => (d, t),
        None => (rest, ""),
    };

    let mut total: u64 = 0;

    for (value, unit) in components(date_part)? {
        total += match unit {
            'W' => value * 7 * 86_400,
            'D' => value * 86_400,
            _ => return None,
        };
    }

    for (value, unit) in components(time_part)? {
        total += match unit {
            'H' => value * 3_600,
            'M' => value * 60,
            'S' => value,
            _ => return None,
        };
    }

    u32::try_from(total).ok()
}

fn components(part: &str) -> Option<Vec<(u64, char)>> {
    let mut out = Vec::new();
    let mut digits = String::new();
    for c in part.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else {
            if digits.is_empty() {
                return None;
            }
            out.push((digits.parse().ok()?, c));
            digits.clear();
        }
    }
    // Trailing digits without a unit designator are malformed.
    if !digits.is_empty() {
        return None;
    }
    Some(out)
}
