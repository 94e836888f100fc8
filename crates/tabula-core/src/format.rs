//! Number and load formatting for report cells.

use serde::{Deserialize, Serialize};

/// Working days per year used to convert loads into months and years
pub const YEARLY_WORKING_DAYS: f64 = 260.714;

/// Working days per week
pub const WEEKLY_WORKING_DAYS: f64 = 5.0;

/// Unit used to display effort-like values
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadUnit {
    Minutes,
    Hours,
    #[default]
    Days,
    Weeks,
    Months,
    Years,
    /// Shortest representation, with a one-letter unit suffix
    ShortAuto,
    /// Shortest representation, with a spelled-out unit
    LongAuto,
}

/// Fixed-point number formatting
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberFormat {
    /// Digits after the decimal point
    pub fraction_digits: usize,
    /// Inserted every three integer digits, if set
    #[serde(default)]
    pub thousands_separator: Option<char>,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            fraction_digits: 1,
            thousands_separator: None,
        }
    }
}

impl NumberFormat {
    pub fn new(fraction_digits: usize) -> Self {
        Self {
            fraction_digits,
            thousands_separator: None,
        }
    }

    pub fn thousands_separator(mut self, separator: char) -> Self {
        self.thousands_separator = Some(separator);
        self
    }

    pub fn format(&self, value: f64) -> String {
        let text = format!("{:.*}", self.fraction_digits, value);
        match self.thousands_separator {
            Some(sep) => group_thousands(&text, sep),
            None => text,
        }
    }
}

fn group_thousands(text: &str, sep: char) -> String {
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text),
    };
    let (int_part, frac_part) = match unsigned.find('.') {
        Some(pos) => unsigned.split_at(pos),
        None => (unsigned, ""),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(sep);
        }
        grouped.push(c);
    }
    format!("{}{}{}", sign, grouped, frac_part)
}

/// Formatting options handed to the value query evaluator
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormatOptions {
    pub load_unit: LoadUnit,
    pub number_format: NumberFormat,
    pub currency_format: NumberFormat,
    /// `strftime` format for dates
    pub time_format: String,
    /// Working hours of one day, used for unit conversion
    pub hours_per_day: f64,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            load_unit: LoadUnit::Days,
            number_format: NumberFormat::default(),
            currency_format: NumberFormat::new(2),
            time_format: "%Y-%m-%d".into(),
            hours_per_day: 8.0,
        }
    }
}

impl FormatOptions {
    /// Format a load given in working days according to the load unit.
    ///
    /// The automatic units try every unit and keep the shortest text. A
    /// unit is skipped if the scaled value rounds to zero or exceeds that
    /// unit's sensible maximum; days are always a candidate.
    pub fn format_load(&self, days: f64) -> String {
        let factors = [
            self.hours_per_day * 60.0,
            self.hours_per_day,
            1.0,
            1.0 / WEEKLY_WORKING_DAYS,
            12.0 / YEARLY_WORKING_DAYS,
            1.0 / YEARLY_WORKING_DAYS,
        ];
        let fixed = |index: usize| self.number_format.format(days * factors[index]);

        match self.load_unit {
            LoadUnit::Minutes => fixed(0),
            LoadUnit::Hours => fixed(1),
            LoadUnit::Days => fixed(2),
            LoadUnit::Weeks => fixed(3),
            LoadUnit::Months => fixed(4),
            LoadUnit::Years => fixed(5),
            LoadUnit::ShortAuto | LoadUnit::LongAuto => {
                // 0 means no upper limit
                let max = [60.0, 48.0, 0.0, 8.0, 24.0, 0.0];
                let options: Vec<Option<String>> = factors
                    .iter()
                    .zip(max)
                    .map(|(factor, limit)| {
                        let scaled = days * factor;
                        let text = self.number_format.format(scaled);
                        let zero = text.trim_start_matches('-').chars().all(|c| c == '0' || c == '.');
                        if (*factor != 1.0 && zero) || (limit != 0.0 && scaled > limit) {
                            None
                        } else {
                            Some(text)
                        }
                    })
                    .collect();

                let mut shortest = 2;
                for (i, option) in options.iter().enumerate() {
                    if let (Some(candidate), Some(best)) = (option, &options[shortest]) {
                        if candidate.len() < best.len() {
                            shortest = i;
                        }
                    }
                }
                let text = options[shortest].clone().unwrap_or_default();

                if self.load_unit == LoadUnit::LongAuto {
                    let units = if text == self.number_format.format(1.0) || text == "1" {
                        ["minute", "hour", "day", "week", "month", "year"]
                    } else {
                        ["minutes", "hours", "days", "weeks", "months", "years"]
                    };
                    format!("{} {}", text, units[shortest])
                } else {
                    format!("{}{}", text, ["min", "h", "d", "w", "m", "y"][shortest])
                }
            }
        }
    }

    /// Format a monetary amount
    pub fn format_currency(&self, amount: f64) -> String {
        self.currency_format.format(amount)
    }
}
