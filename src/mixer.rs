//! Volume handling: reading the mixer's `NNN%` report and turning MPRIS volumes into percents.

/// Returns the first percentage found in the output of `amixer get <control>`.
///
/// ```rust
/// use moc_mpris::mixer::parse_percentage;
///
/// let report = "Simple mixer control 'Digital',0\n  Front Left: Playback 151 [79%] [-20.50dB]\n";
/// assert_eq!(parse_percentage(report), Some(79));
/// ```
pub fn parse_percentage(report: &str) -> Option<u8> {
    report.lines().find_map(|line| {
        line.match_indices('%').find_map(|(index, _)| {
            let digits_start = line[..index]
                .rfind(|c: char| !c.is_ascii_digit())
                .map_or(0, |position| position + 1);
            line[digits_start..index]
                .parse::<u16>()
                .ok()
                .map(|percent| percent.min(100) as u8)
        })
    })
}

/// Convert a mixer percentage into an MPRIS volume.
pub fn percent_to_volume(percent: u8) -> f64 {
    f64::from(percent.min(100)) / 100.0
}

/// Convert an MPRIS volume into a mixer percentage, clamping to `0..=100`.
///
/// Returns `None` for NaN.
pub fn volume_to_percent(volume: f64) -> Option<u8> {
    if volume.is_nan() {
        None
    } else if volume <= 0.0 {
        Some(0)
    } else if volume >= 1.0 {
        Some(100)
    } else {
        Some((volume * 100.0).round() as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AMIXER: &str = "\
Simple mixer control 'Digital',0
  Capabilities: pvolume
  Playback channels: Front Left - Front Right
  Limits: Playback 0 - 207
  Mono:
  Front Left: Playback 130 [63%] [-38.50dB]
  Front Right: Playback 130 [63%] [-38.50dB]
";

    #[test]
    fn it_finds_the_first_percentage() {
        assert_eq!(parse_percentage(AMIXER), Some(63));
    }

    #[test]
    fn it_ignores_percent_signs_without_digits() {
        assert_eq!(parse_percentage("100% sure"), Some(100));
        assert_eq!(parse_percentage("[%] then [7%]"), Some(7));
        assert_eq!(parse_percentage("no volume here"), None);
        assert_eq!(parse_percentage(""), None);
    }

    #[test]
    fn it_clamps_volumes_into_percents() {
        assert_eq!(volume_to_percent(-0.5), Some(0));
        assert_eq!(volume_to_percent(1.7), Some(100));
        assert_eq!(volume_to_percent(0.42), Some(42));
        assert_eq!(volume_to_percent(0.29), Some(29));
        assert_eq!(volume_to_percent(f64::NAN), None);
    }

    #[test]
    fn it_converts_percents_into_volumes() {
        assert_eq!(percent_to_volume(0), 0.0);
        assert_eq!(percent_to_volume(50), 0.5);
        assert_eq!(percent_to_volume(100), 1.0);
    }
}
