//! Line-oriented request layer for the host binary.
//!
//! Each stdin line is one request:
//!
//! | Line                                         | Request                   |
//! |----------------------------------------------|---------------------------|
//! | `{...}`                                      | sensor payload (JSON)     |
//! | `profile <id> <temp> <humi> <soil> <light>`  | activate crop setpoints   |
//! | `manual <module> on\|off`                    | manual control            |
//! | `release <module>`                           | end manual override       |
//! | `photo`                                      | photo capture             |
//! | `reset-light`                                | zero LED accumulated light|

use crate::model::{CropProfile, Module, Switch};

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleRequest {
    SensorPayload(String),
    Profile(CropProfile),
    Manual { module: Module, switch: Switch },
    Release(Module),
    Photo,
    ResetLight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleError {
    Empty,
    UnknownVerb(String),
    UnknownModule(String),
    BadArgument(&'static str),
}

impl core::fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty line"),
            Self::UnknownVerb(v) => write!(f, "unknown request '{}'", v),
            Self::UnknownModule(m) => write!(f, "unknown module '{}'", m),
            Self::BadArgument(usage) => write!(f, "usage: {}", usage),
        }
    }
}

impl std::error::Error for ConsoleError {}

const PROFILE_USAGE: &str = "profile <id> <temp> <humi> <soil> <light>";
const MANUAL_USAGE: &str = "manual <module> on|off";
const RELEASE_USAGE: &str = "release <module>";

pub fn parse_line(line: &str) -> Result<ConsoleRequest, ConsoleError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ConsoleError::Empty);
    }
    if line.starts_with('{') {
        return Ok(ConsoleRequest::SensorPayload(line.to_string()));
    }

    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();
    match (verb, args.as_slice()) {
        ("profile", [id, temp, humi, soil, light]) => {
            let num = |s: &str| s.parse::<f32>().map_err(|_| ConsoleError::BadArgument(PROFILE_USAGE));
            Ok(ConsoleRequest::Profile(CropProfile {
                crop_id: (*id).to_string(),
                target_temp: num(*temp)?,
                target_humi: num(*humi)?,
                target_soil: num(*soil)?,
                target_light: num(*light)?,
            }))
        }
        ("profile", _) => Err(ConsoleError::BadArgument(PROFILE_USAGE)),
        ("manual", [module, switch]) => Ok(ConsoleRequest::Manual {
            module: parse_module(module)?,
            switch: switch
                .parse()
                .map_err(|()| ConsoleError::BadArgument(MANUAL_USAGE))?,
        }),
        ("manual", _) => Err(ConsoleError::BadArgument(MANUAL_USAGE)),
        ("release", [module]) => Ok(ConsoleRequest::Release(parse_module(module)?)),
        ("release", _) => Err(ConsoleError::BadArgument(RELEASE_USAGE)),
        ("photo", []) => Ok(ConsoleRequest::Photo),
        ("reset-light", []) => Ok(ConsoleRequest::ResetLight),
        _ => Err(ConsoleError::UnknownVerb(verb.to_string())),
    }
}

fn parse_module(name: &str) -> Result<Module, ConsoleError> {
    name.parse()
        .map_err(|_| ConsoleError::UnknownModule(name.to_string()))
}
