//! Desired allowlist state, loaded from the operator's local CSV.

use std::path::Path;

use csv::{QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};

use crate::error::{OnboardingError, OnboardingResult};

pub const IDENTITY_COLUMN: &str = "AccountId";
pub const SITES_COLUMN: &str = "AdtechSites";

/// Load the CSV at `path` and render it as sorted, header-less state text.
///
/// The result is what gets compared against, and finally stored as, the
/// remote state file.
pub fn load_desired_state(path: &Path) -> OnboardingResult<String> {
    let bytes = std::fs::read(path).map_err(|e| OnboardingError::io(path, e))?;
    desired_state_from_csv(&bytes)
}

pub fn desired_state_from_csv(bytes: &[u8]) -> OnboardingResult<String> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(bytes);

    let header = reader.headers()?.clone();
    if header.is_empty() {
        return Err(OnboardingError::EmptyDesiredState);
    }

    let expected = [IDENTITY_COLUMN, SITES_COLUMN];
    if header.iter().ne(expected) {
        return Err(OnboardingError::UnexpectedColumns {
            expected: expected.iter().map(|c| c.to_string()).collect(),
            actual: header.iter().map(str::to_string).collect(),
        });
    }

    let mut rows = reader
        .records()
        .map(|record| record.map(|r| (r[0].to_string(), r[1].to_string())))
        .collect::<Result<Vec<_>, _>>()?;
    rows.sort();

    render_rows(&rows)
}

fn render_rows(rows: &[(String, String)]) -> OnboardingResult<String> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for (account, sites) in rows {
        writer.write_record([account.as_str(), sites.as_str()])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| OnboardingError::io("<desired state>", e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
