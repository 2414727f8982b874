use crate::{LedMatrixError, Result};

/// Exclusive upper bound for a brightness level.
pub const BRIGHTNESS_MAX: u8 = 16;

/// Step applied by the relative `Up` / `Down` brightness adjustments.
const BRIGHTNESS_STEP: i32 = 3;

/// A parsed, validated unit of work derived from one command string.
///
/// Produced once per command, consumed exactly once by the executor; any
/// owned payload (engine directive, blink spec) dies with the action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    FullyOn,
    FullyOff,
    SetBrightness(u8),
    SetEngine(Option<String>),
    SetBlink(Option<String>),
    ShowTime,
    ShowWave(u16),
    ShowLove,
}

/// The working values the interpreter reads and commits while resolving
/// relative or out-of-range parameters. They live in the owning device's
/// locked state; committing here is a side effect of interpretation, not of
/// execution, so an invalid request still resolves to the stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceSettings {
    pub brightness: u8,
    pub degree: u16,
}

fn is_brightness(level: i32) -> bool {
    (0..i32::from(BRIGHTNESS_MAX)).contains(&level)
}

fn is_degree(degree: u16) -> bool {
    matches!(degree, 0 | 90 | 180 | 270)
}

/// Parses one command string against the device's working settings.
///
/// Prefixes are case-sensitive literals matched in table order. Parameter
/// offsets are byte positions past the literal and its delimiter; a
/// parameter is only read when at least one byte follows the delimiter.
pub fn parse(cmd: &str, settings: &mut DeviceSettings) -> Result<Action> {
    if cmd.starts_with("Fully On") {
        return Ok(Action::FullyOn);
    }

    if cmd.starts_with("Fully Off") {
        return Ok(Action::FullyOff);
    }

    if cmd.starts_with("Show Time") {
        return Ok(Action::ShowTime);
    }

    if cmd.starts_with("Show Wave") {
        if cmd.len() == 9 {
            settings.degree = 0;
        } else if let Some(rest) = suffix(cmd, 10) {
            if let Ok(degree) = rest.trim().parse::<u16>() {
                if is_degree(degree) {
                    settings.degree = degree;
                }
            }
        }
        return Ok(Action::ShowWave(settings.degree));
    }

    if cmd.starts_with("Show Love") {
        return Ok(Action::ShowLove);
    }

    if cmd.starts_with("Brightness") {
        if let Some(rest) = suffix(cmd, 11) {
            let current = i32::from(settings.brightness);
            let candidate = if rest.starts_with("Up") {
                (current + BRIGHTNESS_STEP).min(i32::from(BRIGHTNESS_MAX) - 1)
            } else if rest.starts_with("Down") {
                (current - BRIGHTNESS_STEP).max(0)
            } else {
                rest.trim().parse::<i32>().unwrap_or(-1)
            };

            if is_brightness(candidate) {
                settings.brightness = candidate as u8;
            }
        }
        return Ok(Action::SetBrightness(settings.brightness));
    }

    if cmd.starts_with("Engine") {
        return Ok(Action::SetEngine(suffix(cmd, 6).map(str::to_owned)));
    }

    if cmd.starts_with("Blink") {
        return Ok(Action::SetBlink(suffix(cmd, 6).map(str::to_owned)));
    }

    Err(LedMatrixError::InvalidCommand(cmd.to_owned()))
}

/// Non-empty remainder of `cmd` past byte `offset`, if any.
fn suffix(cmd: &str, offset: usize) -> Option<&str> {
    cmd.get(offset..).filter(|rest| !rest.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(brightness: u8, degree: u16) -> DeviceSettings {
        DeviceSettings { brightness, degree }
    }

    #[test]
    fn parses_the_fixed_commands() {
        let mut s = DeviceSettings::default();
        assert_eq!(parse("Fully On", &mut s).unwrap(), Action::FullyOn);
        assert_eq!(parse("Fully Off", &mut s).unwrap(), Action::FullyOff);
        assert_eq!(parse("Show Time", &mut s).unwrap(), Action::ShowTime);
        assert_eq!(parse("Show Love", &mut s).unwrap(), Action::ShowLove);
    }

    #[test]
    fn out_of_range_brightness_keeps_the_stored_value() {
        let mut s = settings(5, 0);
        let action = parse("Brightness 20", &mut s).unwrap();
        assert_eq!(action, Action::SetBrightness(5));
        assert_eq!(s.brightness, 5);
    }

    #[test]
    fn brightness_up_clamps_to_the_top() {
        let mut s = settings(14, 0);
        assert_eq!(parse("Brightness Up", &mut s).unwrap(), Action::SetBrightness(15));

        let mut s = settings(15, 0);
        assert_eq!(parse("Brightness Up", &mut s).unwrap(), Action::SetBrightness(15));
    }

    #[test]
    fn brightness_down_clamps_to_zero() {
        let mut s = settings(2, 0);
        let action = parse("Brightness Down", &mut s).unwrap();
        assert_eq!(action, Action::SetBrightness(0));
        assert_eq!(s.brightness, 0);
    }

    #[test]
    fn bare_brightness_reports_the_current_value() {
        let mut s = settings(7, 0);
        assert_eq!(parse("Brightness", &mut s).unwrap(), Action::SetBrightness(7));
        // A trailing delimiter with nothing after it reads nothing either.
        assert_eq!(parse("Brightness ", &mut s).unwrap(), Action::SetBrightness(7));
    }

    #[test]
    fn brightness_accepts_in_range_literals() {
        let mut s = settings(5, 0);
        let action = parse("Brightness 12", &mut s).unwrap();
        assert_eq!(action, Action::SetBrightness(12));
        assert_eq!(s.brightness, 12);
    }

    #[test]
    fn wave_degree_must_be_a_right_angle() {
        let mut s = settings(0, 180);
        let action = parse("Show Wave 45", &mut s).unwrap();
        assert_eq!(action, Action::ShowWave(180));
        assert_eq!(s.degree, 180);
    }

    #[test]
    fn wave_accepts_valid_degrees() {
        let mut s = settings(0, 0);
        assert_eq!(parse("Show Wave 90", &mut s).unwrap(), Action::ShowWave(90));
        assert_eq!(s.degree, 90);
        assert_eq!(parse("Show Wave 270", &mut s).unwrap(), Action::ShowWave(270));
    }

    #[test]
    fn bare_wave_resets_the_degree() {
        let mut s = settings(0, 270);
        assert_eq!(parse("Show Wave", &mut s).unwrap(), Action::ShowWave(0));
        assert_eq!(s.degree, 0);
    }

    #[test]
    fn wave_with_dangling_delimiter_keeps_the_degree() {
        let mut s = settings(0, 90);
        assert_eq!(parse("Show Wave ", &mut s).unwrap(), Action::ShowWave(90));
    }

    #[test]
    fn engine_suffix_runs_from_the_literal() {
        let mut s = DeviceSettings::default();
        assert_eq!(
            parse("Engine Setup", &mut s).unwrap(),
            Action::SetEngine(Some(" Setup".to_owned()))
        );
        assert_eq!(parse("Engine", &mut s).unwrap(), Action::SetEngine(None));
    }

    #[test]
    fn blink_suffix_skips_one_delimiter() {
        let mut s = DeviceSettings::default();
        assert_eq!(
            parse("Blink 1Hz", &mut s).unwrap(),
            Action::SetBlink(Some("1Hz".to_owned()))
        );
        assert_eq!(parse("Blink", &mut s).unwrap(), Action::SetBlink(None));
    }

    #[test]
    fn unknown_commands_fail_without_touching_settings() {
        let mut s = settings(9, 90);
        let err = parse("Dim The Lights", &mut s).unwrap_err();
        assert!(matches!(err, LedMatrixError::InvalidCommand(_)));
        assert_eq!(s, settings(9, 90));
    }
}
