pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

pub fn std_dev(data: &[f64]) -> Option<f64> {
    let m = mean(data)?;
    let variance = data.iter().map(|v| (m - v) * (m - v)).sum::<f64>() / data.len() as f64;
    Some(variance.sqrt())
}

/// "1.50s" style rendering of a millisecond count for the countdown readout.
pub fn fmt_secs(ms: u64) -> String {
    format!("{:.2}s", ms as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_values() {
        assert_eq!(mean(&[10., 20., 30., 15., 22.]), Some(19.4));
        assert_eq!(mean(&[42.0]), Some(42.0));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn std_dev_of_values() {
        assert_eq!(
            std_dev(&[100., 120., 90., 102., 94.]),
            Some(10.322790320451151)
        );
        assert_eq!(std_dev(&[5.0, 5.0, 5.0, 5.0]), Some(0.0));
        assert_eq!(std_dev(&[]), None);
    }

    #[test]
    fn fmt_secs_rounds_to_hundredths() {
        assert_eq!(fmt_secs(2_000), "2.00s");
        assert_eq!(fmt_secs(1_234), "1.23s");
        assert_eq!(fmt_secs(0), "0.00s");
    }
}
