use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;

/// One bounded depth-first search of the ejector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EjectorSchedule {
    /// The maximum length of a chain; `None` bounds it only by the number of meets and tasks.
    pub max_depth: Option<usize>,
    /// Whether a chain may change a meet or task which it changed before.
    pub may_revisit: bool,
    /// The maximum number of recorded operations of a chain.
    pub max_disruption: Option<usize>,
}

/// The schedules tried in order by one ejector, written as a comma-separated list such as
/// `"1+,2+,u-"`: a depth or `u` for unlimited, then `+` when revisiting is allowed or `-` when it
/// is not, then optionally `:` and a maximum disruption.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EjectorSchedules(pub Vec<EjectorSchedule>);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleParseError {
    #[error("an ejector schedule list needs at least one schedule")]
    Empty,
    #[error("'{0}' is not a depth; expected a positive number or 'u'")]
    InvalidDepth(String),
    #[error("schedule '{0}' must end its depth with '+' or '-'")]
    MissingRevisitFlag(String),
    #[error("'{0}' is not a disruption limit")]
    InvalidDisruption(String),
}

impl Default for EjectorSchedules {
    fn default() -> Self {
        EjectorSchedules(vec![
            EjectorSchedule {
                max_depth: Some(1),
                may_revisit: true,
                max_disruption: None,
            },
            EjectorSchedule {
                max_depth: None,
                may_revisit: false,
                max_disruption: None,
            },
        ])
    }
}

impl FromStr for EjectorSchedule {
    type Err = ScheduleParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        let (head, disruption) = match text.split_once(':') {
            Some((head, disruption)) => (head, Some(disruption)),
            None => (text, None),
        };

        let (depth, may_revisit) = if let Some(depth) = head.strip_suffix('+') {
            (depth, true)
        } else if let Some(depth) = head.strip_suffix('-') {
            (depth, false)
        } else {
            return Err(ScheduleParseError::MissingRevisitFlag(text.to_owned()));
        };

        let max_depth = match depth {
            "u" => None,
            _ => match depth.parse::<usize>() {
                Ok(depth) if depth > 0 => Some(depth),
                _ => return Err(ScheduleParseError::InvalidDepth(depth.to_owned())),
            },
        };

        let max_disruption = disruption
            .map(|disruption| {
                disruption
                    .parse::<usize>()
                    .map_err(|_| ScheduleParseError::InvalidDisruption(disruption.to_owned()))
            })
            .transpose()?;

        Ok(EjectorSchedule {
            max_depth,
            may_revisit,
            max_disruption,
        })
    }
}

impl FromStr for EjectorSchedules {
    type Err = ScheduleParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.trim().is_empty() {
            return Err(ScheduleParseError::Empty);
        }
        text.split(',')
            .map(EjectorSchedule::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map(EjectorSchedules)
    }
}

impl Display for EjectorSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.max_depth {
            Some(depth) => write!(f, "{depth}")?,
            None => write!(f, "u")?,
        }
        write!(f, "{}", if self.may_revisit { '+' } else { '-' })?;
        if let Some(disruption) = self.max_disruption {
            write!(f, ":{disruption}")?;
        }
        Ok(())
    }
}

impl Display for EjectorSchedules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, schedule) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, ",")?;
            }
            write!(f, "{schedule}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedules_parse_depth_revisit_and_disruption() {
        let schedules = "1+, 2-:10,u-".parse::<EjectorSchedules>().unwrap();

        assert_eq!(
            schedules.0,
            vec![
                EjectorSchedule {
                    max_depth: Some(1),
                    may_revisit: true,
                    max_disruption: None
                },
                EjectorSchedule {
                    max_depth: Some(2),
                    may_revisit: false,
                    max_disruption: Some(10)
                },
                EjectorSchedule {
                    max_depth: None,
                    may_revisit: false,
                    max_disruption: None
                },
            ]
        );
        assert_eq!(schedules.to_string(), "1+,2-:10,u-");
    }

    #[test]
    fn malformed_schedules_are_rejected() {
        assert_eq!("".parse::<EjectorSchedules>(), Err(ScheduleParseError::Empty));
        assert_eq!(
            "3".parse::<EjectorSchedules>(),
            Err(ScheduleParseError::MissingRevisitFlag("3".to_owned()))
        );
        assert_eq!(
            "0+".parse::<EjectorSchedules>(),
            Err(ScheduleParseError::InvalidDepth("0".to_owned()))
        );
        assert_eq!(
            "1+:x".parse::<EjectorSchedules>(),
            Err(ScheduleParseError::InvalidDisruption("x".to_owned()))
        );
    }

    #[test]
    fn default_is_one_then_unlimited() {
        assert_eq!(EjectorSchedules::default().to_string(), "1+,u-");
    }
}
