use crate::errors::{IngestError, IngestResult};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Creates a spinner for work whose total size is not known up front.
///
/// Ingestion streams the document, so the number of records is only known at
/// the end; the spinner shows the running count in its message instead.
///
/// # Example
///
/// ```no_run
/// use xml_ingest::ui;
///
/// # fn main() -> Result<(), xml_ingest::errors::IngestError> {
/// let spinner = ui::create_spinner("data.xml")?;
/// spinner.set_message("1000 records");
/// spinner.finish_with_message("Done");
/// # Ok(())
/// # }
/// ```
pub fn create_spinner(prefix: &str) -> IngestResult<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {prefix} {msg}")
            .map_err(|e| IngestError::Io(format!("Failed to create spinner template: {e}")))?,
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

pub fn round_two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_duration_zero() {
        assert_eq!(format_duration(Duration::from_secs(0)), "00:00:00");
    }

    #[test]
    fn format_duration_rollover() {
        assert_eq!(format_duration(Duration::from_secs(61)), "00:01:01");
        assert_eq!(format_duration(Duration::from_secs(3661)), "01:01:01");
    }

    #[test]
    fn round_two_decimals_rounds() {
        assert_eq!(round_two_decimals(1.234), 1.23);
        assert_eq!(round_two_decimals(2.0), 2.0);
    }

    #[test]
    fn spinner_is_created() {
        let spinner = create_spinner("test").unwrap();
        spinner.set_message("3 records");
        spinner.finish_and_clear();
    }
}
