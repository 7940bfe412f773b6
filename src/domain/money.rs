use thiserror::Error;

/// Money is represented as integer cents so that sums over many small
/// amounts stay exact. 1 unit = 100 cents, so R$ 50,00 = 5000 cents.
pub type Cents = i64;

/// Largest amount a single transaction may carry: one trillion units.
/// Far below `i64::MAX`, so monthly and yearly sums stay exact.
pub const MAX_AMOUNT: Cents = 100_000_000_000_000;

/// Format cents as a plain decimal string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs_cents / 100, abs_cents % 100)
}

/// Format cents for display in the given currency.
///
/// BRL follows the pt-BR convention (`R$ 1.234,56`), USD and EUR get their
/// symbol with `,` grouping, anything else is rendered as `1,234.56 XYZ`.
pub fn format_money(cents: Cents, currency: &str) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    let units = abs_cents / 100;
    let remainder = abs_cents % 100;

    match currency.to_uppercase().as_str() {
        "BRL" => format!("{}R$ {},{:02}", sign, group_thousands(units, '.'), remainder),
        "USD" => format!("{}${}.{:02}", sign, group_thousands(units, ','), remainder),
        "EUR" => format!("{}€{}.{:02}", sign, group_thousands(units, ','), remainder),
        other => format!(
            "{}{}.{:02} {}",
            sign,
            group_thousands(units, ','),
            remainder,
            other
        ),
    }
}

fn group_thousands(units: u64, separator: char) -> String {
    let digits = units.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}

/// Parse a decimal string into cents.
///
/// Accepts `.` or `,` as the decimal separator (but not both), at most two
/// fractional digits, and an optional leading `-`.
/// Example: "50.00" -> 5000, "12,5" -> 1250, "100" -> 10000
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseCentsError::Empty);
    }

    let (negative, body) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    if body.contains('.') && body.contains(',') {
        return Err(ParseCentsError::InvalidFormat(input.to_string()));
    }

    let mut parts = body.split(['.', ',']);
    let units_str = parts.next().unwrap_or("");
    let decimal_str = parts.next();
    if parts.next().is_some() {
        return Err(ParseCentsError::InvalidFormat(input.to_string()));
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else if units_str.chars().all(|c| c.is_ascii_digit()) {
        units_str
            .parse()
            .map_err(|_| ParseCentsError::Overflow(input.to_string()))?
    } else {
        return Err(ParseCentsError::InvalidFormat(input.to_string()));
    };

    let decimal_cents: i64 = match decimal_str {
        None | Some("") => 0,
        Some(d) if !d.chars().all(|c| c.is_ascii_digit()) => {
            return Err(ParseCentsError::InvalidFormat(input.to_string()));
        }
        // Single digit like "5" means 50 cents
        Some(d) if d.len() == 1 => d.parse::<i64>().unwrap_or(0) * 10,
        Some(d) if d.len() == 2 => d.parse::<i64>().unwrap_or(0),
        Some(_) => return Err(ParseCentsError::TooManyDecimals(input.to_string())),
    };

    if units_str.is_empty() && decimal_str.is_none_or(str::is_empty) {
        return Err(ParseCentsError::InvalidFormat(input.to_string()));
    }

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(decimal_cents))
        .ok_or_else(|| ParseCentsError::Overflow(input.to_string()))?;

    Ok(if negative { -cents } else { cents })
}

/// Parse a transaction amount: like [`parse_cents`], but negative values are
/// rejected since the transaction kind carries the sign, and so is anything
/// above [`MAX_AMOUNT`].
pub fn parse_amount(input: &str) -> Result<Cents, ParseCentsError> {
    let cents = parse_cents(input)?;
    if cents < 0 {
        return Err(ParseCentsError::Negative(input.trim().to_string()));
    }
    if cents > MAX_AMOUNT {
        return Err(ParseCentsError::TooLarge(input.trim().to_string()));
    }
    Ok(cents)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCentsError {
    #[error("empty amount")]
    Empty,
    #[error("invalid money format: '{0}'")]
    InvalidFormat(String),
    #[error("more than two decimal places: '{0}'")]
    TooManyDecimals(String),
    #[error("amount out of range: '{0}'")]
    Overflow(String),
    #[error("amount must not be negative: '{0}'")]
    Negative(String),
    #[error("amount above the {limit} limit: '{0}'", limit = format_cents(MAX_AMOUNT))]
    TooLarge(String),
}
